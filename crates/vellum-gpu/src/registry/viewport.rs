use crate::ids::RenderTargetId;

/// Which render target the host currently has bound, if known.
///
/// This is a cache over native binding state. `Unknown` forces the next
/// operation to rebind; anything that may disturb native binding must call
/// [`invalidate`](Self::invalidate).
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum ViewportCache {
    #[default]
    Unknown,
    Bound(RenderTargetId),
}

impl ViewportCache {
    #[inline]
    pub fn is_bound(self, id: RenderTargetId) -> bool {
        self == ViewportCache::Bound(id)
    }

    #[inline]
    pub fn bind(&mut self, id: RenderTargetId) {
        *self = ViewportCache::Bound(id);
    }

    #[inline]
    pub fn invalidate(&mut self) {
        *self = ViewportCache::Unknown;
    }

    #[inline]
    pub fn current(self) -> Option<RenderTargetId> {
        match self {
            ViewportCache::Bound(id) => Some(id),
            ViewportCache::Unknown => None,
        }
    }
}
