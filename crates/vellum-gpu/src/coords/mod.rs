//! Plain geometry values shared by texture parts and the host backends.
//!
//! Space conventions:
//! - texel / pixel units, origin at row 0, +X right, +Y towards higher rows
//! - a render target's projection maps `(0, 0)..(w, h)` to NDC

mod rect;
mod vec2;

pub use rect::Rect;
pub use vec2::Vec2;
