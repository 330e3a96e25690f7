//! Opaque identifiers handed out by the registry.
//!
//! Both kinds are drawn from one counter, so a `TextureId` and a
//! `RenderTargetId` never share a raw value. Zero is the unallocated
//! sentinel and cannot be represented.

use std::fmt;
use std::num::NonZeroU64;

/// Identifier of a texture owned by a [`Registry`](crate::registry::Registry).
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TextureId(NonZeroU64);

/// Identifier of a render target owned by a [`Registry`](crate::registry::Registry).
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RenderTargetId(NonZeroU64);

impl TextureId {
    #[inline]
    pub(crate) const fn new(raw: NonZeroU64) -> Self {
        Self(raw)
    }

    /// Raw identifier value (always `>= 1`).
    #[inline]
    pub const fn get(self) -> u64 {
        self.0.get()
    }
}

impl RenderTargetId {
    #[inline]
    pub(crate) const fn new(raw: NonZeroU64) -> Self {
        Self(raw)
    }

    /// Raw identifier value (always `>= 1`).
    #[inline]
    pub const fn get(self) -> u64 {
        self.0.get()
    }
}

impl fmt::Display for TextureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "texture#{}", self.0)
    }
}

impl fmt::Display for RenderTargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "render-target#{}", self.0)
    }
}

/// Monotonic id source. Never hands out the same value twice.
///
/// The range is `1..=u64::MAX`; running past it is an invariant failure
/// (at one id per nanosecond that takes over five centuries).
#[derive(Debug, Default)]
pub(crate) struct IdCounter {
    last: Option<NonZeroU64>,
}

impl IdCounter {
    pub(crate) fn next(&mut self) -> NonZeroU64 {
        let id = match self.last {
            None => NonZeroU64::MIN,
            Some(last) => last.checked_add(1).expect("id space exhausted"),
        };
        self.last = Some(id);
        id
    }

    pub(crate) fn next_texture(&mut self) -> TextureId {
        TextureId::new(self.next())
    }

    pub(crate) fn next_render_target(&mut self) -> RenderTargetId {
        RenderTargetId::new(self.next())
    }
}
