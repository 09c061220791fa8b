//! Hardware test card. Renders prebuilt frames (no description pass)
//! and toggles between a single card and a split left/right pair on
//! button presses.

use visor_engine::{App, Event, Frame, FrameSource, RenderOutput};

pub struct PatternApp {
    split: bool,
}

impl PatternApp {
    pub fn new() -> Self {
        Self { split: false }
    }

    fn gradient_card() -> Frame {
        let mut frame = Frame::new(64, 32);
        for y in 0..32 {
            for x in 0..64 {
                frame.set_pixel(x, y, [(x * 4) as u8, (y * 8) as u8, 64]);
            }
        }
        // White border for alignment checks.
        for x in 0..64 {
            frame.set_pixel(x, 0, [255, 255, 255]);
            frame.set_pixel(x, 31, [255, 255, 255]);
        }
        for y in 0..32 {
            frame.set_pixel(0, y, [255, 255, 255]);
            frame.set_pixel(63, y, [255, 255, 255]);
        }
        frame
    }

    fn color_bars() -> Frame {
        let bars: [[u8; 3]; 8] = [
            [255, 255, 255],
            [255, 255, 0],
            [0, 255, 255],
            [0, 255, 0],
            [255, 0, 255],
            [255, 0, 0],
            [0, 0, 255],
            [0, 0, 0],
        ];
        let mut frame = Frame::new(64, 32);
        for y in 0..32 {
            for x in 0..64 {
                frame.set_pixel(x, y, bars[x / 8]);
            }
        }
        frame
    }
}

impl Default for PatternApp {
    fn default() -> Self {
        Self::new()
    }
}

impl App for PatternApp {
    fn name(&self) -> &str {
        "pattern"
    }

    fn update(&mut self, _dt: f32, events: &[Event]) {
        for _ in events.iter().filter(|e| e.name == "button") {
            self.split = !self.split;
        }
    }

    fn render(&mut self) -> Option<RenderOutput> {
        if self.split {
            Some(RenderOutput::Split {
                left: FrameSource::Ready(Self::gradient_card()),
                right: FrameSource::Ready(Self::color_bars()),
            })
        } else {
            Some(Self::gradient_card().into())
        }
    }
}
