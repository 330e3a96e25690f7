//! Error types for the registry and its host backends.

use thiserror::Error;

use crate::ids::{RenderTargetId, TextureId};

/// Errors reported by [`Registry`](crate::registry::Registry) operations and
/// [`HostRenderer`](crate::host::HostRenderer) implementations.
#[derive(Error, Debug)]
pub enum GfxError {
    /// Requested surface has a zero dimension.
    #[error("invalid size {width}x{height}")]
    InvalidSize { width: u32, height: u32 },

    /// Native texture allocation or upload failed.
    #[error("failed to create texture: {0}")]
    CreateTexture(String),

    /// Native framebuffer creation failed.
    #[error("failed to create framebuffer: {0}")]
    CreateFramebuffer(String),

    /// Reading pixels back from the GPU failed.
    #[error("failed to read pixels: {0}")]
    ReadPixels(String),

    /// No texture is registered under this id.
    #[error("unknown texture {0}")]
    UnknownTexture(TextureId),

    /// No render target is registered under this id.
    #[error("unknown render target {0}")]
    UnknownRenderTarget(RenderTargetId),

    /// The texture backs a render target and is released with it.
    #[error("{texture} backs {render_target}; delete the render target instead")]
    TextureInUse {
        texture: TextureId,
        render_target: RenderTargetId,
    },

    /// A render target cannot sample its own backing texture.
    #[error("{render_target} cannot draw from its own backing {texture}")]
    FeedbackLoop {
        texture: TextureId,
        render_target: RenderTargetId,
    },

    /// Pixel data does not match the texture's stored size.
    #[error("pixel data is {got_width}x{got_height}, texture is {width}x{height}")]
    SizeMismatch {
        width: u32,
        height: u32,
        got_width: u32,
        got_height: u32,
    },
}

/// Result type for registry and backend operations.
pub type GfxResult<T> = Result<T, GfxError>;
