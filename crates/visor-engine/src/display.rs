//! Display expansion: 64×32 sources become the full 128×32 panel, with
//! optional mirroring of either half.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::render::Frame;

pub const PANEL_WIDTH: usize = 128;
pub const HALF_WIDTH: usize = 64;
pub const PANEL_HEIGHT: usize = 32;

/// How a 64-wide source expands to the 128-wide panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MirrorMode {
    #[default]
    None,
    Left,
    Right,
}

impl MirrorMode {
    pub fn as_str(self) -> &'static str {
        match self {
            MirrorMode::None => "none",
            MirrorMode::Left => "left",
            MirrorMode::Right => "right",
        }
    }
}

impl FromStr for MirrorMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(MirrorMode::None),
            "left" => Ok(MirrorMode::Left),
            "right" => Ok(MirrorMode::Right),
            other => Err(format!(
                "unknown mirror mode '{other}', expected one of: none, left, right"
            )),
        }
    }
}

/// Expands frames to panel size and applies the mirror mode. Apps pick
/// the mode when they start; the control surface can change it live.
#[derive(Debug, Default)]
pub struct DisplayManager {
    mirror_mode: MirrorMode,
}

impl DisplayManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mirror_mode(&self) -> MirrorMode {
        self.mirror_mode
    }

    pub fn set_mirror_mode(&mut self, mode: MirrorMode) {
        self.mirror_mode = mode;
    }

    /// Expand a 64×32 frame to 128×32 (duplicating or mirroring), apply
    /// half-mirroring to frames already at panel size, and pass any
    /// other size through untouched.
    pub fn process(&self, frame: Frame) -> Frame {
        if frame.width() == HALF_WIDTH && frame.height() == PANEL_HEIGHT {
            return self.expand_and_mirror(&frame);
        }
        if frame.width() == PANEL_WIDTH && frame.height() == PANEL_HEIGHT {
            return match self.mirror_mode {
                MirrorMode::None => frame,
                MirrorMode::Left => {
                    let left = flip_horizontal(&copy_half(&frame, 0));
                    let right = copy_half(&frame, HALF_WIDTH);
                    Frame::hstack(&left, &right)
                }
                MirrorMode::Right => {
                    let left = copy_half(&frame, 0);
                    let right = flip_horizontal(&copy_half(&frame, HALF_WIDTH));
                    Frame::hstack(&left, &right)
                }
            };
        }
        frame
    }

    fn expand_and_mirror(&self, frame: &Frame) -> Frame {
        match self.mirror_mode {
            MirrorMode::None => Frame::hstack(frame, frame),
            MirrorMode::Left => Frame::hstack(&flip_horizontal(frame), frame),
            MirrorMode::Right => Frame::hstack(frame, &flip_horizontal(frame)),
        }
    }
}

fn copy_half(frame: &Frame, x_start: usize) -> Frame {
    let mut out = Frame::new(HALF_WIDTH, frame.height());
    for y in 0..frame.height() {
        for x in 0..HALF_WIDTH {
            out.set_pixel(x, y, frame.pixel(x_start + x, y));
        }
    }
    out
}

fn flip_horizontal(frame: &Frame) -> Frame {
    let mut out = Frame::new(frame.width(), frame.height());
    for y in 0..frame.height() {
        for x in 0..frame.width() {
            out.set_pixel(frame.width() - 1 - x, y, frame.pixel(x, y));
        }
    }
    out
}
