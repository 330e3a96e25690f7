//! Host renderer backends.
//!
//! A [`HostRenderer`] is the native layer the registry drives: texture and
//! framebuffer lifetime, framebuffer/viewport binding, clears and the
//! textured-quad draw primitive.
//!
//! Backends:
//! - [`SoftwareHost`]: CPU rasterizer, deterministic, used by tests
//! - [`WgpuHost`]: headless wgpu device

pub mod software;
pub mod gpu;

pub use self::software::{HostStats, SoftwareHost};
pub use self::gpu::{WgpuHost, WgpuHostInit};

use crate::error::GfxResult;
use crate::texture::{FilterMode, TextureQuad};
use crate::transform::{ColorMatrix, GeometryMatrix};

/// Native rendering API driven by the registry.
///
/// All calls are expected to come from one logical rendering thread; the
/// `&self` receivers only make the backend shareable behind the registry.
/// Binding state (`bind_framebuffer`, `set_viewport`) persists until changed
/// and applies to subsequent `clear` / `draw_texture` calls.
pub trait HostRenderer {
    /// Native texture object.
    type Texture;
    /// Native framebuffer object.
    type Framebuffer;

    /// Allocates a `width` x `height` RGBA8 texture.
    ///
    /// `pixels` holds tightly packed rows (first row first); `None` leaves
    /// the contents undefined.
    fn create_texture(
        &self,
        width: u32,
        height: u32,
        pixels: Option<&[u8]>,
        filter: FilterMode,
    ) -> GfxResult<Self::Texture>;

    /// Replaces the full contents of `texture`.
    fn update_texture(
        &self,
        texture: &Self::Texture,
        width: u32,
        height: u32,
        pixels: &[u8],
    ) -> GfxResult<()>;

    fn delete_texture(&self, texture: Self::Texture);

    /// Creates a framebuffer rendering into `texture`.
    ///
    /// May change the bound framebuffer as a side effect.
    fn create_framebuffer(&self, texture: &Self::Texture) -> GfxResult<Self::Framebuffer>;

    fn delete_framebuffer(&self, framebuffer: Self::Framebuffer);

    fn bind_framebuffer(&self, framebuffer: &Self::Framebuffer);

    fn set_viewport(&self, x: i32, y: i32, width: u32, height: u32);

    /// Clears the bound framebuffer to a normalized RGBA color.
    fn clear(&self, rgba: [f32; 4]);

    /// Draws `quads` sampled from `texture` into the bound framebuffer.
    ///
    /// `projection` is column-major (`projection[i + j * 4]` is row `i`,
    /// column `j`). Each quad is transformed by `geometry`, then `projection`.
    fn draw_texture(
        &self,
        texture: &Self::Texture,
        projection: &[f32; 16],
        quads: &[TextureQuad],
        geometry: &GeometryMatrix,
        color: &ColorMatrix,
    );

    /// Reads back `width` x `height` RGBA8 pixels in framebuffer row order.
    ///
    /// Row 0 is NDC `y = -1`, which is draw-space `y = 0` for offscreen
    /// targets and the bottom row for flipped (screen) targets.
    fn read_pixels(
        &self,
        framebuffer: &Self::Framebuffer,
        width: u32,
        height: u32,
    ) -> GfxResult<Vec<u8>>;
}
