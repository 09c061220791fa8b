//! Full-screen error card, in the style of a crashed desktop.

use visor_engine::{App, FrameDescription, Layer, RenderOutput, Rgba};

const CARD_BLUE: Rgba = Rgba::rgb(8, 39, 149);

pub struct GlitchApp;

impl App for GlitchApp {
    fn name(&self) -> &str {
        "glitch"
    }

    fn render(&mut self) -> Option<RenderOutput> {
        let mut desc = FrameDescription::new();
        desc.push_layer(Layer::fill(CARD_BLUE));
        desc.push_layer(Layer::text(":(", 3.0, 1.0, 14.0, Rgba::WHITE));
        // Fake progress bar near the bottom.
        desc.push_layer(Layer::rect(3.0, 24.0, 40.0, 3.0, Rgba::new(255, 255, 255, 90)));
        desc.push_layer(Layer::rect(3.0, 24.0, 17.0, 3.0, Rgba::WHITE));
        Some(desc.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_a_description() {
        let mut app = GlitchApp;
        let output = app.render().unwrap();
        match output {
            RenderOutput::One(visor_engine::FrameSource::Description(desc)) => {
                assert_eq!(desc.width, 64);
                assert_eq!(desc.layers.len(), 4);
            }
            other => panic!("unexpected output: {other:?}"),
        }
    }
}
