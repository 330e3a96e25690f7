//! Texture handle and the part/quad types used to draw from it.

mod quad;

pub use quad::{texture_quads, TexturePart, TextureQuad};

use crate::error::{GfxError, GfxResult};
use crate::host::HostRenderer;
use crate::source::ImageSource;

/// Sampling filter, passed through unchanged to the native texture.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub enum FilterMode {
    #[default]
    Nearest,
    Linear,
}

/// One native texture plus its logical size.
///
/// Texels are stored premultiplied; image sources are converted on upload.
///
/// The stored width/height are the sizes the caller asked for. A backend may
/// allocate more, but coordinate math always uses these values.
#[derive(Debug)]
pub struct Texture<T> {
    native: T,
    width: u32,
    height: u32,
    filter: FilterMode,
}

impl<T> Texture<T> {
    /// Allocates a texture with undefined contents.
    pub fn blank<H>(host: &H, width: u32, height: u32, filter: FilterMode) -> GfxResult<Self>
    where
        H: HostRenderer<Texture = T>,
    {
        ensure_size(width, height)?;
        let native = host.create_texture(width, height, None, filter)?;
        Ok(Self { native, width, height, filter })
    }

    /// Allocates a texture sized to `image` and uploads its pixels.
    pub fn from_image<H, I>(host: &H, image: &I, filter: FilterMode) -> GfxResult<Self>
    where
        H: HostRenderer<Texture = T>,
        I: ImageSource + ?Sized,
    {
        let (width, height) = image.dimensions();
        ensure_size(width, height)?;
        let pixels = image.to_premultiplied_rgba8();
        let native = host.create_texture(width, height, Some(&pixels), filter)?;
        Ok(Self { native, width, height, filter })
    }

    /// Replaces the full contents with `image`, which must match the stored size.
    pub fn upload<H, I>(&self, host: &H, image: &I) -> GfxResult<()>
    where
        H: HostRenderer<Texture = T>,
        I: ImageSource + ?Sized,
    {
        let (w, h) = image.dimensions();
        if (w, h) != (self.width, self.height) {
            return Err(GfxError::SizeMismatch {
                width: self.width,
                height: self.height,
                got_width: w,
                got_height: h,
            });
        }
        host.update_texture(&self.native, self.width, self.height, &image.to_premultiplied_rgba8())
    }

    /// Releases the native texture. Consumes the handle.
    pub fn dispose<H>(self, host: &H)
    where
        H: HostRenderer<Texture = T>,
    {
        host.delete_texture(self.native);
    }

    #[inline]
    pub fn native(&self) -> &T {
        &self.native
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
    pub fn filter(&self) -> FilterMode {
        self.filter
    }
}

pub(crate) fn ensure_size(width: u32, height: u32) -> GfxResult<()> {
    if width == 0 || height == 0 {
        return Err(GfxError::InvalidSize { width, height });
    }
    Ok(())
}
