//! Frame model and rasterization.

pub mod description;
pub mod frame;
pub mod layer;
pub mod renderer;
pub mod subpixel;
pub mod text;

pub use description::{FrameDescription, FrameSource, RenderOutput};
pub use frame::Frame;
pub use layer::{
    AnimatedSpriteLayer, CompletionHook, FillLayer, Layer, LayerId, RectLayer, SpriteLayer,
    SpritePixels, TextLayer,
};
pub use renderer::Renderer;
pub use text::{AssetError, FontStore};
