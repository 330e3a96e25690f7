//! GPU texture and render target registry.
//!
//! Hands out ids for textures and render targets created on a
//! [`HostRenderer`], remembers which render target is bound so repeated fills
//! and draws skip redundant binds, and turns texture draws into one instanced
//! host draw with a GL-style projection.
//!
//! ```no_run
//! use vellum_gpu::{FilterMode, Registry, SoftwareHost};
//!
//! let registry = Registry::new(SoftwareHost::new());
//! let target = registry.create_render_target(256, 256, FilterMode::Nearest)?;
//! registry.fill_render_target(target, 0x20, 0x20, 0x20)?;
//! # Ok::<(), vellum_gpu::GfxError>(())
//! ```

pub mod logging;
pub mod coords;
pub mod transform;
pub mod source;

pub mod ids;
pub mod error;
pub mod texture;
pub mod target;
pub mod dispatch;
pub mod registry;
pub mod host;

pub use error::{GfxError, GfxResult};
pub use host::{HostRenderer, SoftwareHost, WgpuHost, WgpuHostInit};
pub use ids::{RenderTargetId, TextureId};
pub use registry::Registry;
pub use target::{ProjectionMatrix, RenderTarget};
pub use texture::{FilterMode, Texture, TexturePart, TextureQuad};
pub use transform::{ColorMatrix, GeometryMatrix};
