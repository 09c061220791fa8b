//! Transitions: time-bounded blends between frames and between
//! face-part states, plus the animation primitives that drive them.

pub mod anim;
mod engine;
mod parts;
pub mod similarity;

pub use anim::{
    bounce_interpolation, cosine_interpolation, interpolate, lerp, AnimatedParameter,
    DampedSpring, InterpolationMethod, RampFilter,
};
pub use engine::{FrameTransition, TransitionEngine, TransitionType, FRAME_SIMILARITY_THRESHOLD};
pub use parts::{PartTransition, PartTransitionManager, PART_SIMILARITY_THRESHOLD};
pub use similarity::{
    calculate_image_similarity, is_bright_to_dark, ImageView, PixelFormat, BRIGHT_FROM_MEAN,
    DARK_TO_MEAN,
};
