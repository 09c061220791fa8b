//! The per-tick composition pipeline.
//!
//! One tick: promote pending activations, feed events to the active
//! app, realize its render output (rasterizing descriptions with the
//! manager's effects lent in), blend through the transition engine,
//! expand to panel size, and derive the LED strip. Transport and
//! pacing stay with the host loop.

use log::{error, warn};

use crate::app::{App, AppError, AppManager, Event};
use crate::display::{DisplayManager, HALF_WIDTH, PANEL_HEIGHT};
use crate::effects::{EffectKind, EffectManager, RainbowSync};
use crate::render::{Frame, FrameSource, RenderOutput, Renderer};
use crate::strip::LedStrip;
use crate::transition::{TransitionEngine, TransitionType};

/// What one tick hands to the transport: the panel frame and the LED
/// strip pixels.
#[derive(Debug)]
pub struct TickOutput {
    pub matrix: Frame,
    pub strip: Vec<u8>,
}

/// Owns every stage of the composition pipeline. All methods are called
/// from the single loop task; nothing here locks.
pub struct Pipeline {
    pub apps: AppManager,
    pub renderer: Renderer,
    pub effects: EffectManager,
    pub transitions: TransitionEngine,
    pub display: DisplayManager,
    pub strip: LedStrip,
    tick: u64,
    /// Rainbow seen while realizing this tick's descriptions; the LED
    /// strip follows it. Frames rendered by the app directly carry no
    /// effect list, so none is picked up for them.
    tick_rainbow: Option<RainbowSync>,
}

impl Pipeline {
    pub fn new(apps: Vec<Box<dyn App>>, led_count: usize) -> Self {
        Self {
            apps: AppManager::new(apps),
            renderer: Renderer::new(),
            effects: EffectManager::new(),
            transitions: TransitionEngine::new(),
            display: DisplayManager::new(),
            strip: LedStrip::new(led_count),
            tick: 0,
            tick_rainbow: None,
        }
    }

    /// Activate an app by name. With `with_transition` and a previous
    /// frame on record, the new app's first frame is rendered up front
    /// and a frame-level jump transition is submitted.
    pub fn activate_app(&mut self, name: &str, with_transition: bool) -> Result<(), AppError> {
        let had_previous = self.apps.activate(name)?;

        if let Some(app) = self.apps.active_mut() {
            let mode = app.mirror_mode();
            self.display.set_mirror_mode(mode);
        }

        if with_transition && had_previous && self.apps.last_frame().is_some() {
            if let Some(first) = self.render_active_output(0.0) {
                let from = self.apps.last_frame().cloned();
                self.transitions
                    .start_transition(from, &first, TransitionType::Jump, None, None);
            }
        }
        Ok(())
    }

    /// Run one tick. Returns `None` when there is nothing to show (no
    /// active app, or the app skipped the tick) — the host loop idles
    /// briefly in that case.
    pub fn tick(&mut self, dt: f32, events: &[Event]) -> Option<TickOutput> {
        if let Some(pending) = self.apps.take_pending() {
            if let Err(e) = self.activate_app(&pending, true) {
                error!("pending activation failed: {e}");
            }
        }

        let active = self.apps.active_mut()?;
        active.update(dt, events);

        self.tick_rainbow = None;
        let frame = self.render_active_output(dt)?;
        let rainbow = self.tick_rainbow;

        let frame = self.transitions.process(frame, dt);
        self.apps.save_last_frame(frame.clone());

        let matrix = self.display.process(frame);
        let strip = self.strip.derive(&matrix, rainbow);

        self.tick += 1;
        Some(TickOutput { matrix, strip })
    }

    /// Frame counter, advanced once per completed tick.
    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    /// Render whatever the active app produces right now.
    fn render_active_output(&mut self, dt: f32) -> Option<Frame> {
        let output = self.apps.active_mut()?.render()?;
        match output {
            RenderOutput::One(source) => Some(self.realize(source, dt)),
            RenderOutput::Split { left, right } => {
                let left = self.realize(left, dt);
                let right = self.realize(right, dt);
                if left.width() != HALF_WIDTH
                    || right.width() != HALF_WIDTH
                    || left.height() != PANEL_HEIGHT
                    || right.height() != PANEL_HEIGHT
                {
                    warn!(
                        "split render halves must be {}x{}, got {}x{} and {}x{}",
                        HALF_WIDTH,
                        PANEL_HEIGHT,
                        left.width(),
                        left.height(),
                        right.width(),
                        right.height()
                    );
                    return None;
                }
                Some(Frame::hstack(&left, &right))
            }
        }
    }

    /// Turn one frame source into pixels. Descriptions get the
    /// manager's effects appended for the pass and handed back after,
    /// so effect state accumulates across ticks.
    fn realize(&mut self, source: FrameSource, dt: f32) -> Frame {
        match source {
            FrameSource::Ready(frame) => frame,
            FrameSource::Description(mut desc) => {
                self.effects.reap_finished();
                self.effects.update_layers_cache(desc.layers.clone());

                let app_effect_count = desc.effects.len();
                desc.effects.append(&mut self.effects.lend());

                let frame = self.renderer.render_frame(&mut desc, dt, self.tick);

                let lent = desc.effects.split_off(app_effect_count);
                if self.tick_rainbow.is_none() {
                    self.tick_rainbow = desc
                        .effects
                        .iter()
                        .chain(lent.iter())
                        .find_map(rainbow_sync_of);
                }
                self.effects.reclaim(lent);
                frame
            }
        }
    }
}

fn rainbow_sync_of(effect: &crate::effects::Effect) -> Option<RainbowSync> {
    match &effect.kind {
        EffectKind::Rainbow(r) => Some(r.sync()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::{Query, QueryError};
    use crate::color::Rgba;
    use crate::display::MirrorMode;
    use crate::render::{FrameDescription, Layer};
    use serde_json::Value;

    /// Minimal app rendering a solid 64x32 fill.
    struct SolidApp {
        name: &'static str,
        color: Rgba,
        mirror: MirrorMode,
        skip: bool,
    }

    impl SolidApp {
        fn new(name: &'static str, color: Rgba) -> Self {
            Self {
                name,
                color,
                mirror: MirrorMode::None,
                skip: false,
            }
        }
    }

    impl App for SolidApp {
        fn name(&self) -> &str {
            self.name
        }

        fn mirror_mode(&self) -> MirrorMode {
            self.mirror
        }

        fn render(&mut self) -> Option<RenderOutput> {
            if self.skip {
                return None;
            }
            let mut desc = FrameDescription::new();
            desc.push_layer(Layer::fill(self.color));
            Some(desc.into())
        }

        fn handle_query(&mut self, query: &Query) -> Result<Value, QueryError> {
            match query.name.as_str() {
                "color" => Ok(serde_json::json!({
                    "color": [self.color.r, self.color.g, self.color.b]
                })),
                _ => Err(QueryError::Unsupported(query.name.clone())),
            }
        }
    }

    /// App producing a left/right pair of prebuilt frames.
    struct SplitApp;

    impl App for SplitApp {
        fn name(&self) -> &str {
            "split"
        }

        fn render(&mut self) -> Option<RenderOutput> {
            let mut left = Frame::new(64, 32);
            left.fill([10, 0, 0]);
            let mut right = Frame::new(64, 32);
            right.fill([0, 10, 0]);
            Some(RenderOutput::Split {
                left: FrameSource::Ready(left),
                right: FrameSource::Ready(right),
            })
        }
    }

    fn pipeline_with(apps: Vec<Box<dyn App>>) -> Pipeline {
        Pipeline::new(apps, 10)
    }

    #[test]
    fn no_active_app_skips_tick() {
        let mut p = pipeline_with(vec![Box::new(SolidApp::new("a", Rgba::rgb(50, 0, 0)))]);
        assert!(p.tick(0.016, &[]).is_none());
        assert_eq!(p.tick_count(), 0);
    }

    #[test]
    fn tick_produces_panel_frame_and_strip() {
        let mut p = pipeline_with(vec![Box::new(SolidApp::new("a", Rgba::rgb(200, 0, 0)))]);
        p.activate_app("a", false).unwrap();
        let out = p.tick(0.016, &[]).unwrap();
        assert_eq!(out.matrix.width(), 128);
        assert_eq!(out.matrix.height(), 32);
        assert_eq!(out.strip.len(), 30);
        // Dominant color of a solid red frame, quantized.
        assert_eq!(&out.strip[0..3], &[192, 0, 0]);
    }

    #[test]
    fn first_activation_has_no_transition() {
        let mut p = pipeline_with(vec![Box::new(SolidApp::new("a", Rgba::rgb(1, 2, 3)))]);
        p.activate_app("a", true).unwrap();
        assert!(!p.transitions.is_transitioning());
    }

    #[test]
    fn app_switch_submits_transition() {
        let mut p = pipeline_with(vec![
            Box::new(SolidApp::new("a", Rgba::rgb(200, 200, 200))),
            Box::new(SolidApp::new("b", Rgba::rgb(0, 0, 120))),
        ]);
        p.activate_app("a", true).unwrap();
        p.tick(0.016, &[]).unwrap();
        p.activate_app("b", true).unwrap();
        assert!(p.transitions.is_transitioning());
    }

    #[test]
    fn pending_activation_applies_at_tick_start() {
        let mut p = pipeline_with(vec![
            Box::new(SolidApp::new("a", Rgba::rgb(9, 9, 9))),
            Box::new(SolidApp::new("b", Rgba::rgb(90, 90, 90))),
        ]);
        p.activate_app("a", false).unwrap();
        p.tick(0.016, &[]).unwrap();

        p.apps.set_pending("b");
        p.tick(0.016, &[]).unwrap();
        assert_eq!(p.apps.active_name(), Some("b"));
    }

    #[test]
    fn split_output_concatenates_halves() {
        let mut p = pipeline_with(vec![Box::new(SplitApp)]);
        p.activate_app("split", false).unwrap();
        let out = p.tick(0.016, &[]).unwrap();
        assert_eq!(out.matrix.pixel(0, 0), [10, 0, 0]);
        assert_eq!(out.matrix.pixel(64, 0), [0, 10, 0]);
    }

    #[test]
    fn manager_effects_keep_state_across_ticks() {
        let mut p = pipeline_with(vec![Box::new(SolidApp::new("a", Rgba::rgb(255, 255, 255)))]);
        p.activate_app("a", false).unwrap();
        p.effects
            .add_by_name("Rainbow", &serde_json::json!({"fade_in_duration": 0.05}))
            .unwrap();

        let manager_phase = |p: &Pipeline| {
            p.effects
                .iter()
                .find_map(rainbow_sync_of)
                .map(|sync| sync.phase)
        };

        p.tick(0.1, &[]).unwrap();
        let phase_after_one = manager_phase(&p).unwrap();
        assert!(phase_after_one > 0.0);

        p.tick(0.1, &[]).unwrap();
        let phase_after_two = manager_phase(&p).unwrap();
        assert!(phase_after_two > phase_after_one);
        // Still owned by the manager after the passes.
        assert_eq!(p.effects.list().len(), 1);
    }

    #[test]
    fn mirror_mode_follows_the_app() {
        let mut mirrored = SolidApp::new("m", Rgba::rgb(5, 5, 5));
        mirrored.mirror = MirrorMode::Right;
        let mut p = pipeline_with(vec![Box::new(mirrored)]);
        p.activate_app("m", false).unwrap();
        assert_eq!(p.display.mirror_mode(), MirrorMode::Right);
    }

    #[test]
    fn app_skipping_render_yields_no_output() {
        let mut skipper = SolidApp::new("s", Rgba::rgb(1, 1, 1));
        skipper.skip = true;
        let mut p = pipeline_with(vec![Box::new(skipper)]);
        p.activate_app("s", false).unwrap();
        assert!(p.tick(0.016, &[]).is_none());
    }
}
