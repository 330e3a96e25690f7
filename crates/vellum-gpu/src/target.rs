//! Render target handle: one native framebuffer and its logical size.

use crate::error::GfxResult;
use crate::host::HostRenderer;
use crate::texture::{ensure_size, Texture};

/// Row-major 4x4 projection, `m[row][col]`.
pub type ProjectionMatrix = [[f64; 4]; 4];

/// A drawable surface.
///
/// The backing texture (if any) is owned by the registry, not by this handle.
#[derive(Debug)]
pub struct RenderTarget<F> {
    framebuffer: F,
    width: u32,
    height: u32,
    flip_y: bool,
}

impl<F> RenderTarget<F> {
    /// Wraps an existing framebuffer rendering into an offscreen texture.
    pub fn new(framebuffer: F, width: u32, height: u32) -> Self {
        Self { framebuffer, width, height, flip_y: false }
    }

    /// Wraps the default (screen) framebuffer, whose rows run top-down.
    pub fn screen(framebuffer: F, width: u32, height: u32) -> Self {
        Self { framebuffer, width, height, flip_y: true }
    }

    /// Creates a framebuffer attached to `texture`, sized like the texture.
    pub fn for_texture<H>(host: &H, texture: &Texture<H::Texture>) -> GfxResult<Self>
    where
        H: HostRenderer<Framebuffer = F>,
    {
        ensure_size(texture.width(), texture.height())?;
        let framebuffer = host.create_framebuffer(texture.native())?;
        Ok(Self::new(framebuffer, texture.width(), texture.height()))
    }

    /// Orthographic projection from `(0, 0)..(width, height)` to NDC.
    ///
    /// Rebuilt on every call.
    pub fn projection_matrix(&self) -> ProjectionMatrix {
        let mut m = ortho_projection(0.0, self.width as f64, 0.0, self.height as f64);
        if self.flip_y {
            m[1][1] *= -1.0;
            m[1][3] += 2.0;
        }
        m
    }

    /// Binds the framebuffer and sets the viewport to the full surface.
    pub fn set_as_viewport<H>(&self, host: &H)
    where
        H: HostRenderer<Framebuffer = F>,
    {
        host.bind_framebuffer(&self.framebuffer);
        host.set_viewport(0, 0, self.width, self.height);
    }

    /// Releases the framebuffer only.
    pub fn dispose<H>(self, host: &H)
    where
        H: HostRenderer<Framebuffer = F>,
    {
        host.delete_framebuffer(self.framebuffer);
    }

    #[inline]
    pub fn framebuffer(&self) -> &F {
        &self.framebuffer
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    #[inline]
    pub fn flip_y(&self) -> bool {
        self.flip_y
    }
}

fn ortho_projection(left: f64, right: f64, bottom: f64, top: f64) -> ProjectionMatrix {
    let e11 = 2.0 / (right - left);
    let e22 = 2.0 / (top - bottom);
    let e14 = -(right + left) / (right - left);
    let e24 = -(top + bottom) / (top - bottom);
    [
        [e11, 0.0, 0.0, e14],
        [0.0, e22, 0.0, e24],
        [0.0, 0.0, 1.0, 0.0],
        [0.0, 0.0, 0.0, 1.0],
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project(m: &ProjectionMatrix, x: f64, y: f64) -> (f64, f64) {
        (
            m[0][0] * x + m[0][1] * y + m[0][3],
            m[1][0] * x + m[1][1] * y + m[1][3],
        )
    }

    #[test]
    fn corners_map_to_opposite_ndc_corners() {
        let rt = RenderTarget::new((), 100, 200);
        let m = rt.projection_matrix();
        assert_eq!(project(&m, 0.0, 0.0), (-1.0, -1.0));
        assert_eq!(project(&m, 100.0, 200.0), (1.0, 1.0));
    }

    #[test]
    fn projection_is_deterministic() {
        let rt = RenderTarget::new((), 100, 200);
        assert_eq!(rt.projection_matrix(), rt.projection_matrix());
    }

    #[test]
    fn screen_target_puts_origin_at_top() {
        let rt = RenderTarget::screen((), 100, 200);
        let m = rt.projection_matrix();
        assert_eq!(project(&m, 0.0, 0.0), (-1.0, 1.0));
        assert_eq!(project(&m, 100.0, 200.0), (1.0, -1.0));
    }
}
