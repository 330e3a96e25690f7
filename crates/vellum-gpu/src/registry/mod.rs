//! Resource registry.
//!
//! Owns every live texture and render target, hands out identifiers, keeps
//! the render-target → backing-texture association and tracks which target
//! the host has bound so redundant framebuffer/viewport binds are skipped.
//!
//! Locking:
//! - one `RwLock` guards the three maps, the id counter and the viewport cache
//! - operations that bind or draw take the write lock for their duration
//! - native allocation for new resources runs before the lock is taken
//!
//! Native call ordering across threads is not serialized here; callers that
//! issue GPU work from several threads must do that themselves.

mod viewport;

pub use viewport::ViewportCache;

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::dispatch;
use crate::error::{GfxError, GfxResult};
use crate::host::HostRenderer;
use crate::ids::{IdCounter, RenderTargetId, TextureId};
use crate::source::ImageSource;
use crate::target::RenderTarget;
use crate::texture::{texture_quads, FilterMode, Texture, TexturePart};
use crate::transform::{ColorMatrix, GeometryMatrix};

struct State<H: HostRenderer> {
    textures: HashMap<TextureId, Texture<H::Texture>>,
    render_targets: HashMap<RenderTargetId, RenderTarget<H::Framebuffer>>,
    // Only targets created with a backing texture appear here.
    backing: HashMap<RenderTargetId, TextureId>,
    viewport: ViewportCache,
    ids: IdCounter,
}

impl<H: HostRenderer> Default for State<H> {
    fn default() -> Self {
        Self {
            textures: HashMap::new(),
            render_targets: HashMap::new(),
            backing: HashMap::new(),
            viewport: ViewportCache::Unknown,
            ids: IdCounter::default(),
        }
    }
}

/// Registry of GPU textures and render targets driven through a host backend.
pub struct Registry<H: HostRenderer> {
    host: H,
    state: RwLock<State<H>>,
}

impl<H: HostRenderer> Registry<H> {
    pub fn new(host: H) -> Self {
        Self {
            host,
            state: RwLock::new(State::default()),
        }
    }

    /// Backend this registry drives.
    #[inline]
    pub fn host(&self) -> &H {
        &self.host
    }

    // ── creation ──────────────────────────────────────────────────────────

    /// Uploads `image` into a new texture.
    ///
    /// No id is allocated if the native allocation fails.
    pub fn create_texture<I>(&self, image: &I, filter: FilterMode) -> GfxResult<TextureId>
    where
        I: ImageSource + ?Sized,
    {
        let texture = Texture::from_image(&self.host, image, filter)?;
        let (w, h) = texture.size();

        let mut state = self.state.write();
        let id = state.ids.next_texture();
        state.textures.insert(id, texture);

        log::debug!("created {id} ({w}x{h}, {filter:?})");
        Ok(id)
    }

    /// Creates an offscreen render target with its own backing texture.
    ///
    /// Allocates two ids: the backing texture first, then the render target.
    pub fn create_render_target(
        &self,
        width: u32,
        height: u32,
        filter: FilterMode,
    ) -> GfxResult<RenderTargetId> {
        let texture = Texture::blank(&self.host, width, height, filter)?;
        let target = match RenderTarget::for_texture(&self.host, &texture) {
            Ok(target) => target,
            Err(err) => {
                texture.dispose(&self.host);
                return Err(err);
            }
        };

        let mut state = self.state.write();
        // Framebuffer creation may have changed the native binding.
        state.viewport.invalidate();

        let texture_id = state.ids.next_texture();
        let target_id = state.ids.next_render_target();
        state.textures.insert(texture_id, texture);
        state.render_targets.insert(target_id, target);
        state.backing.insert(target_id, texture_id);

        log::debug!("created {target_id} ({width}x{height}) backed by {texture_id}");
        Ok(target_id)
    }

    /// Registers a pre-built render target, such as the screen.
    ///
    /// The target gets no backing texture and can never be drawn from.
    pub fn add_render_target(&self, target: RenderTarget<H::Framebuffer>) -> RenderTargetId {
        let (w, h) = target.size();
        let mut state = self.state.write();
        let id = state.ids.next_render_target();
        state.render_targets.insert(id, target);

        log::debug!("added {id} ({w}x{h}, no backing texture)");
        id
    }

    // ── deletion ──────────────────────────────────────────────────────────

    /// Releases a render target and, if it has one, its backing texture.
    ///
    /// All three map entries go away under a single write lock.
    pub fn delete_render_target(&self, id: RenderTargetId) -> GfxResult<()> {
        let mut state = self.state.write();

        let target = state
            .render_targets
            .remove(&id)
            .ok_or(GfxError::UnknownRenderTarget(id))?;
        let texture_id = state.backing.remove(&id);
        let texture = texture_id.and_then(|tid| state.textures.remove(&tid));
        if state.viewport.is_bound(id) {
            state.viewport.invalidate();
        }

        target.dispose(&self.host);
        if let Some(texture) = texture {
            texture.dispose(&self.host);
        }

        match texture_id {
            Some(tid) => log::debug!("deleted {id} and {tid}"),
            None => log::debug!("deleted {id}"),
        }
        Ok(())
    }

    /// Releases a standalone texture.
    ///
    /// Backing textures are refused; they go away with their render target.
    pub fn delete_texture(&self, id: TextureId) -> GfxResult<()> {
        let mut state = self.state.write();

        if let Some((&render_target, _)) = state.backing.iter().find(|(_, tid)| **tid == id) {
            return Err(GfxError::TextureInUse { texture: id, render_target });
        }
        let texture = state.textures.remove(&id).ok_or(GfxError::UnknownTexture(id))?;
        texture.dispose(&self.host);

        log::debug!("deleted {id}");
        Ok(())
    }

    // ── drawing ───────────────────────────────────────────────────────────

    /// Clears a render target to an opaque 8-bit color.
    pub fn fill_render_target(&self, id: RenderTargetId, r: u8, g: u8, b: u8) -> GfxResult<()> {
        let mut state = self.state.write();
        self.set_viewport_if_needed(&mut state, id)?;

        const MAX: f32 = u8::MAX as f32;
        self.host.clear([r as f32 / MAX, g as f32 / MAX, b as f32 / MAX, 1.0]);
        Ok(())
    }

    /// Draws `parts` of `texture` into `target`.
    ///
    /// Part coordinates are texels of the source texture; they are
    /// normalized with the texture's logical size before reaching the host.
    /// A target's own backing texture is rejected as a source.
    pub fn draw_texture(
        &self,
        target: RenderTargetId,
        texture: TextureId,
        parts: &[TexturePart],
        geometry: &GeometryMatrix,
        color: &ColorMatrix,
    ) -> GfxResult<()> {
        let mut state = self.state.write();

        let (tw, th) = state
            .textures
            .get(&texture)
            .ok_or(GfxError::UnknownTexture(texture))?
            .size();
        if state.backing.get(&target) == Some(&texture) {
            return Err(GfxError::FeedbackLoop { texture, render_target: target });
        }
        self.set_viewport_if_needed(&mut state, target)?;

        let projection = state
            .render_targets
            .get(&target)
            .ok_or(GfxError::UnknownRenderTarget(target))?
            .projection_matrix();
        let quads = texture_quads(parts, tw, th);
        let source = state
            .textures
            .get(&texture)
            .ok_or(GfxError::UnknownTexture(texture))?;

        log::trace!("draw {texture} -> {target}: {} quads", quads.len());
        dispatch::draw_quads(&self.host, &projection, source.native(), &quads, geometry, color);
        Ok(())
    }

    /// Re-uploads the full contents of a texture.
    pub fn replace_pixels<I>(&self, id: TextureId, image: &I) -> GfxResult<()>
    where
        I: ImageSource + ?Sized,
    {
        let state = self.state.read();
        let texture = state.textures.get(&id).ok_or(GfxError::UnknownTexture(id))?;
        texture.upload(&self.host, image)
    }

    /// Reads back the RGBA8 contents of a render target in framebuffer row order.
    pub fn read_pixels(&self, id: RenderTargetId) -> GfxResult<Vec<u8>> {
        let state = self.state.read();
        let target = state
            .render_targets
            .get(&id)
            .ok_or(GfxError::UnknownRenderTarget(id))?;
        self.host.read_pixels(target.framebuffer(), target.width(), target.height())
    }

    fn set_viewport_if_needed(&self, state: &mut State<H>, id: RenderTargetId) -> GfxResult<()> {
        let target = state
            .render_targets
            .get(&id)
            .ok_or(GfxError::UnknownRenderTarget(id))?;
        if !state.viewport.is_bound(id) {
            log::trace!("binding {id} ({}x{})", target.width(), target.height());
            target.set_as_viewport(&self.host);
            state.viewport.bind(id);
        }
        Ok(())
    }

    // ── queries ───────────────────────────────────────────────────────────

    /// Backing texture of a render target; `None` for added targets.
    pub fn texture_of(&self, id: RenderTargetId) -> Option<TextureId> {
        self.state.read().backing.get(&id).copied()
    }

    pub fn texture_size(&self, id: TextureId) -> Option<(u32, u32)> {
        self.state.read().textures.get(&id).map(Texture::size)
    }

    pub fn render_target_size(&self, id: RenderTargetId) -> Option<(u32, u32)> {
        self.state.read().render_targets.get(&id).map(RenderTarget::size)
    }

    pub fn len_textures(&self) -> usize {
        self.state.read().textures.len()
    }

    pub fn len_render_targets(&self) -> usize {
        self.state.read().render_targets.len()
    }

    /// Render target the registry believes is bound, if known.
    pub fn bound_render_target(&self) -> Option<RenderTargetId> {
        self.state.read().viewport.current()
    }

    /// Forgets the cached binding; the next fill or draw rebinds.
    ///
    /// Call after touching native framebuffer or viewport state directly.
    pub fn invalidate_viewport(&self) {
        self.state.write().viewport.invalidate();
    }

    // ── teardown ──────────────────────────────────────────────────────────

    /// Releases every registered resource. Ids are not reused afterwards.
    pub fn teardown(&self) {
        let mut state = self.state.write();
        let targets = state.render_targets.len();
        let textures = state.textures.len();

        for (_, target) in state.render_targets.drain() {
            target.dispose(&self.host);
        }
        for (_, texture) in state.textures.drain() {
            texture.dispose(&self.host);
        }
        state.backing.clear();
        state.viewport.invalidate();

        if targets + textures > 0 {
            log::debug!("teardown released {targets} render targets and {textures} textures");
        }
    }
}

impl<H: HostRenderer> Drop for Registry<H> {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::Vec2;
    use crate::host::SoftwareHost;
    use crate::logging::{init_logging, LoggingConfig};

    fn registry() -> Registry<SoftwareHost> {
        init_logging(LoggingConfig::for_tests());
        Registry::new(SoftwareHost::new())
    }

    fn pattern(w: u32, h: u32) -> image::RgbaImage {
        image::RgbaImage::from_fn(w, h, |x, y| {
            image::Rgba([(x * 8) as u8, (y * 8) as u8, ((x + y) * 4) as u8, 255])
        })
    }

    fn assert_consistent(state: &State<SoftwareHost>) {
        for (rt, tex) in &state.backing {
            assert!(state.render_targets.contains_key(rt), "{rt} missing");
            assert!(state.textures.contains_key(tex), "{tex} missing");
        }
        if let Some(bound) = state.viewport.current() {
            assert!(state.render_targets.contains_key(&bound));
        }
    }

    // ── ids ───────────────────────────────────────────────────────────────

    #[test]
    fn ids_are_unique_and_increasing() {
        let reg = registry();
        let img = pattern(2, 2);
        let mut last = 0;
        for i in 0..10 {
            let raw = if i % 3 == 0 {
                reg.create_render_target(4, 4, FilterMode::Nearest).unwrap().get()
            } else {
                reg.create_texture(&img, FilterMode::Linear).unwrap().get()
            };
            assert!(raw > last);
            last = raw;
        }
    }

    #[test]
    fn render_target_takes_two_ids_texture_first() {
        let reg = registry();
        let before = reg.create_texture(&pattern(1, 1), FilterMode::Nearest).unwrap();
        let rt = reg.create_render_target(8, 8, FilterMode::Nearest).unwrap();
        let backing = reg.texture_of(rt).unwrap();

        assert_eq!(backing.get(), before.get() + 1);
        assert_eq!(rt.get(), backing.get() + 1);
        assert_eq!(reg.texture_size(backing), Some((8, 8)));
    }

    #[test]
    fn first_id_is_one() {
        let reg = registry();
        let id = reg.create_texture(&pattern(1, 1), FilterMode::Nearest).unwrap();
        assert_eq!(id.get(), 1);
    }

    // ── failures ──────────────────────────────────────────────────────────

    #[test]
    fn failed_texture_allocates_no_id() {
        let reg = Registry::new(SoftwareHost::with_limits(Some(1), None));
        let img = pattern(2, 2);
        let a = reg.create_texture(&img, FilterMode::Nearest).unwrap();
        assert!(matches!(
            reg.create_texture(&img, FilterMode::Nearest),
            Err(GfxError::CreateTexture(_))
        ));
        reg.delete_texture(a).unwrap();
        let b = reg.create_texture(&img, FilterMode::Nearest).unwrap();
        assert_eq!(b.get(), a.get() + 1);
    }

    #[test]
    fn failed_framebuffer_leaves_nothing_behind() {
        let reg = Registry::new(SoftwareHost::with_limits(None, Some(0)));
        let err = reg.create_render_target(4, 4, FilterMode::Nearest).unwrap_err();
        assert!(matches!(err, GfxError::CreateFramebuffer(_)));
        assert_eq!(reg.len_textures(), 0);
        assert_eq!(reg.len_render_targets(), 0);
        assert_eq!(reg.host().stats().live_textures, 0);

        let id = reg.create_texture(&pattern(1, 1), FilterMode::Nearest).unwrap();
        assert_eq!(id.get(), 1);
    }

    #[test]
    fn zero_size_is_rejected() {
        let reg = registry();
        assert!(matches!(
            reg.create_render_target(0, 4, FilterMode::Nearest),
            Err(GfxError::InvalidSize { width: 0, height: 4 })
        ));
    }

    #[test]
    fn unknown_ids_are_reported() {
        let reg = registry();
        let rt = reg.create_render_target(4, 4, FilterMode::Nearest).unwrap();
        let tex = reg.texture_of(rt).unwrap();
        reg.delete_render_target(rt).unwrap();

        assert!(matches!(reg.fill_render_target(rt, 0, 0, 0), Err(GfxError::UnknownRenderTarget(_))));
        assert!(matches!(reg.delete_render_target(rt), Err(GfxError::UnknownRenderTarget(_))));
        assert!(matches!(reg.delete_texture(tex), Err(GfxError::UnknownTexture(_))));

        let other = reg.create_render_target(4, 4, FilterMode::Nearest).unwrap();
        let err = reg
            .draw_texture(other, tex, &[], &GeometryMatrix::identity(), &ColorMatrix::identity())
            .unwrap_err();
        assert!(matches!(err, GfxError::UnknownTexture(t) if t == tex));
    }

    // ── deletion ──────────────────────────────────────────────────────────

    #[test]
    fn delete_render_target_clears_all_maps() {
        let reg = registry();
        let rt = reg.create_render_target(16, 16, FilterMode::Nearest).unwrap();
        let tex = reg.texture_of(rt).unwrap();
        reg.fill_render_target(rt, 1, 2, 3).unwrap();

        reg.delete_render_target(rt).unwrap();

        let state = reg.state.read();
        assert!(!state.render_targets.contains_key(&rt));
        assert!(!state.textures.contains_key(&tex));
        assert!(!state.backing.contains_key(&rt));
        assert_eq!(state.viewport, ViewportCache::Unknown);
        drop(state);

        let stats = reg.host().stats();
        assert_eq!((stats.live_textures, stats.live_framebuffers), (0, 0));
    }

    #[test]
    fn deleting_added_target_releases_only_framebuffer() {
        let reg = registry();
        let standalone = reg.create_texture(&pattern(2, 2), FilterMode::Nearest).unwrap();
        let screen = reg.host().create_screen(8, 8);
        let id = reg.add_render_target(RenderTarget::screen(screen, 8, 8));

        reg.delete_render_target(id).unwrap();
        assert_eq!(reg.len_render_targets(), 0);
        assert_eq!(reg.texture_size(standalone), Some((2, 2)));
        assert_eq!(reg.host().stats().live_framebuffers, 0);
    }

    #[test]
    fn backing_texture_cannot_be_deleted_directly() {
        let reg = registry();
        let rt = reg.create_render_target(4, 4, FilterMode::Nearest).unwrap();
        let tex = reg.texture_of(rt).unwrap();
        let err = reg.delete_texture(tex).unwrap_err();
        assert!(matches!(err, GfxError::TextureInUse { texture, render_target } if texture == tex && render_target == rt));
        assert_eq!(reg.texture_size(tex), Some((4, 4)));
    }

    #[test]
    fn removal_is_atomic_for_readers() {
        let reg = registry();
        std::thread::scope(|scope| {
            scope.spawn(|| {
                for _ in 0..200 {
                    let rt = reg.create_render_target(2, 2, FilterMode::Nearest).unwrap();
                    reg.fill_render_target(rt, 9, 9, 9).unwrap();
                    reg.delete_render_target(rt).unwrap();
                }
            });
            for _ in 0..2 {
                scope.spawn(|| {
                    for _ in 0..500 {
                        assert_consistent(&reg.state.read());
                    }
                });
            }
        });
        assert_consistent(&reg.state.read());
        assert_eq!(reg.len_textures(), 0);
    }

    #[test]
    fn concurrent_creation_never_repeats_ids() {
        let reg = registry();
        let img = pattern(1, 1);
        let mut ids: Vec<u64> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..4)
                .map(|_| {
                    scope.spawn(|| {
                        (0..50)
                            .map(|_| reg.create_texture(&img, FilterMode::Nearest).unwrap().get())
                            .collect::<Vec<_>>()
                    })
                })
                .collect();
            handles.into_iter().flat_map(|h| h.join().unwrap()).collect()
        });
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 200);
    }

    // ── added targets ─────────────────────────────────────────────────────

    #[test]
    fn added_target_has_no_backing_texture() {
        let reg = registry();
        let screen = reg.host().create_screen(4, 4);
        let id = reg.add_render_target(RenderTarget::screen(screen, 4, 4));
        assert_eq!(reg.texture_of(id), None);
        assert!(reg.state.read().backing.is_empty());
        assert_eq!(reg.render_target_size(id), Some((4, 4)));
    }

    // ── viewport cache ────────────────────────────────────────────────────

    #[test]
    fn repeated_fill_binds_once() {
        let reg = registry();
        let rt = reg.create_render_target(4, 4, FilterMode::Nearest).unwrap();
        let before = reg.host().stats();

        reg.fill_render_target(rt, 1, 1, 1).unwrap();
        reg.fill_render_target(rt, 2, 2, 2).unwrap();

        let after = reg.host().stats();
        assert_eq!(after.framebuffer_binds - before.framebuffer_binds, 1);
        assert_eq!(after.viewport_sets - before.viewport_sets, 1);
        assert_eq!(after.clears - before.clears, 2);
    }

    #[test]
    fn alternating_fills_bind_every_time() {
        let reg = registry();
        let a = reg.create_render_target(4, 4, FilterMode::Nearest).unwrap();
        let b = reg.create_render_target(8, 8, FilterMode::Nearest).unwrap();

        for _ in 0..3 {
            reg.fill_render_target(a, 0, 0, 0).unwrap();
            reg.fill_render_target(b, 0, 0, 0).unwrap();
        }
        assert_eq!(reg.host().stats().framebuffer_binds, 6);
        assert_eq!(reg.host().binding().1, (0, 0, 8, 8));
    }

    #[test]
    fn creating_a_target_invalidates_binding() {
        let reg = registry();
        let a = reg.create_render_target(4, 4, FilterMode::Nearest).unwrap();
        reg.fill_render_target(a, 0, 0, 0).unwrap();
        assert_eq!(reg.bound_render_target(), Some(a));

        let _b = reg.create_render_target(4, 4, FilterMode::Nearest).unwrap();
        assert_eq!(reg.bound_render_target(), None);

        reg.fill_render_target(a, 0, 0, 0).unwrap();
        assert_eq!(reg.host().stats().framebuffer_binds, 2);
    }

    #[test]
    fn explicit_invalidation_forces_rebind() {
        let reg = registry();
        let a = reg.create_render_target(4, 4, FilterMode::Nearest).unwrap();
        reg.fill_render_target(a, 0, 0, 0).unwrap();
        reg.invalidate_viewport();
        reg.fill_render_target(a, 0, 0, 0).unwrap();
        assert_eq!(reg.host().stats().framebuffer_binds, 2);
    }

    // ── pixels ────────────────────────────────────────────────────────────

    #[test]
    fn red_fill_reads_back_opaque_red() {
        let reg = registry();
        let rt = reg.create_render_target(5, 3, FilterMode::Nearest).unwrap();
        reg.fill_render_target(rt, 255, 0, 0).unwrap();

        let px = reg.read_pixels(rt).unwrap();
        assert_eq!(px.len(), 5 * 3 * 4);
        assert!(px.chunks_exact(4).all(|p| p == [255, 0, 0, 255]));
    }

    #[test]
    fn fill_converts_channels_to_unit_range() {
        let reg = registry();
        let rt = reg.create_render_target(1, 1, FilterMode::Nearest).unwrap();
        reg.fill_render_target(rt, 0, 128, 255).unwrap();
        assert_eq!(reg.read_pixels(rt).unwrap(), vec![0, 128, 255, 255]);
    }

    #[test]
    fn draw_copies_texture_into_target() {
        let reg = registry();
        let src = pattern(32, 32);
        let tex = reg.create_texture(&src, FilterMode::Nearest).unwrap();
        let rt = reg.create_render_target(64, 64, FilterMode::Nearest).unwrap();
        let before = reg.read_pixels(rt).unwrap();

        reg.draw_texture(
            rt,
            tex,
            &[TexturePart::whole(Vec2::zero(), 32, 32)],
            &GeometryMatrix::identity(),
            &ColorMatrix::identity(),
        )
        .unwrap();
        let after = reg.read_pixels(rt).unwrap();

        for y in 0..64u32 {
            for x in 0..64u32 {
                let i = ((y * 64 + x) * 4) as usize;
                let got = &after[i..i + 4];
                if x < 32 && y < 32 {
                    assert_eq!(got, src.get_pixel(x, y).0, "drawn pixel ({x}, {y})");
                } else {
                    assert_eq!(got, &before[i..i + 4], "untouched pixel ({x}, {y})");
                }
            }
        }
        assert_eq!(reg.host().stats().draws, 1);
    }

    #[test]
    fn draw_honors_location_and_source_rect() {
        let reg = registry();
        let src = pattern(8, 8);
        let tex = reg.create_texture(&src, FilterMode::Nearest).unwrap();
        let rt = reg.create_render_target(16, 16, FilterMode::Nearest).unwrap();
        reg.fill_render_target(rt, 0, 0, 0).unwrap();

        let part = TexturePart::new(Vec2::new(10.0, 4.0), crate::coords::Rect::new(2.0, 3.0, 4.0, 2.0));
        reg.draw_texture(rt, tex, &[part], &GeometryMatrix::identity(), &ColorMatrix::identity())
            .unwrap();

        let px = reg.read_pixels(rt).unwrap();
        let at = |x: u32, y: u32| {
            let i = ((y * 16 + x) * 4) as usize;
            [px[i], px[i + 1], px[i + 2], px[i + 3]]
        };
        assert_eq!(at(10, 4), src.get_pixel(2, 3).0);
        assert_eq!(at(13, 5), src.get_pixel(5, 4).0);
        assert_eq!(at(9, 4), [0, 0, 0, 255]);
        assert_eq!(at(14, 4), [0, 0, 0, 255]);
    }

    #[test]
    fn one_host_draw_per_call() {
        let reg = registry();
        let tex = reg.create_texture(&pattern(4, 4), FilterMode::Nearest).unwrap();
        let rt = reg.create_render_target(32, 32, FilterMode::Nearest).unwrap();
        let parts: Vec<_> = (0..5)
            .map(|i| TexturePart::whole(Vec2::new(i as f32 * 4.0, 0.0), 4, 4))
            .collect();

        reg.draw_texture(rt, tex, &parts, &GeometryMatrix::identity(), &ColorMatrix::identity())
            .unwrap();
        reg.draw_texture(rt, tex, &parts, &GeometryMatrix::identity(), &ColorMatrix::identity())
            .unwrap();

        let stats = reg.host().stats();
        assert_eq!(stats.draws, 2);
        assert_eq!(stats.framebuffer_binds, 1);
    }

    #[test]
    fn render_target_texture_can_be_sampled() {
        let reg = registry();
        let a = reg.create_render_target(4, 4, FilterMode::Nearest).unwrap();
        let b = reg.create_render_target(4, 4, FilterMode::Nearest).unwrap();
        reg.fill_render_target(a, 0, 255, 0).unwrap();

        let a_tex = reg.texture_of(a).unwrap();
        reg.draw_texture(
            b,
            a_tex,
            &[TexturePart::whole(Vec2::zero(), 4, 4)],
            &GeometryMatrix::identity(),
            &ColorMatrix::identity(),
        )
        .unwrap();
        assert!(reg.read_pixels(b).unwrap().chunks_exact(4).all(|p| p == [0, 255, 0, 255]));
    }

    #[test]
    fn target_cannot_sample_its_own_texture() {
        let reg = registry();
        let rt = reg.create_render_target(4, 4, FilterMode::Nearest).unwrap();
        let own = reg.texture_of(rt).unwrap();

        let err = reg
            .draw_texture(
                rt,
                own,
                &[TexturePart::whole(Vec2::zero(), 4, 4)],
                &GeometryMatrix::identity(),
                &ColorMatrix::identity(),
            )
            .unwrap_err();
        assert!(matches!(
            err,
            GfxError::FeedbackLoop { texture, render_target } if texture == own && render_target == rt
        ));

        let stats = reg.host().stats();
        assert_eq!((stats.draws, stats.framebuffer_binds), (0, 0));
        assert_eq!(reg.bound_render_target(), None);
    }

    #[test]
    fn translucent_texel_blends_over_target() {
        let reg = registry();
        let src = image::RgbaImage::from_pixel(1, 1, image::Rgba([255, 0, 0, 128]));
        let tex = reg.create_texture(&src, FilterMode::Nearest).unwrap();
        let rt = reg.create_render_target(1, 1, FilterMode::Nearest).unwrap();
        let part = [TexturePart::whole(Vec2::zero(), 1, 1)];

        for color in [ColorMatrix::identity(), ColorMatrix::scale(1.0, 1.0, 1.0, 1.000_000_1)] {
            reg.fill_render_target(rt, 0, 0, 0).unwrap();
            reg.draw_texture(rt, tex, &part, &GeometryMatrix::identity(), &color).unwrap();
            assert_eq!(reg.read_pixels(rt).unwrap(), vec![128, 0, 0, 255], "{color:?}");
        }
    }

    #[test]
    fn translucent_texel_keeps_half_of_background() {
        let reg = registry();
        let src = image::RgbaImage::from_pixel(1, 1, image::Rgba([0, 0, 255, 128]));
        let tex = reg.create_texture(&src, FilterMode::Nearest).unwrap();
        let rt = reg.create_render_target(1, 1, FilterMode::Nearest).unwrap();
        reg.fill_render_target(rt, 255, 255, 255).unwrap();

        reg.draw_texture(
            rt,
            tex,
            &[TexturePart::whole(Vec2::zero(), 1, 1)],
            &GeometryMatrix::identity(),
            &ColorMatrix::identity(),
        )
        .unwrap();
        assert_eq!(reg.read_pixels(rt).unwrap(), vec![127, 127, 255, 255]);
    }

    // ── filtering ─────────────────────────────────────────────────────────

    /// Draws a 2x1 black→red ramp stretched over a 4x1 target; returns red per pixel.
    fn stretched_ramp(filter: FilterMode) -> Vec<u8> {
        let reg = registry();
        let src = image::RgbaImage::from_raw(2, 1, vec![0, 0, 0, 255, 255, 0, 0, 255]).unwrap();
        let tex = reg.create_texture(&src, filter).unwrap();
        let rt = reg.create_render_target(4, 1, FilterMode::Nearest).unwrap();

        reg.draw_texture(
            rt,
            tex,
            &[TexturePart::whole(Vec2::zero(), 2, 1)],
            &GeometryMatrix::scale(2.0, 1.0),
            &ColorMatrix::identity(),
        )
        .unwrap();
        reg.read_pixels(rt).unwrap().chunks_exact(4).map(|p| p[0]).collect()
    }

    #[test]
    fn linear_filter_interpolates_when_scaled() {
        assert_eq!(stretched_ramp(FilterMode::Linear), vec![0, 64, 191, 255]);
    }

    #[test]
    fn nearest_filter_replicates_when_scaled() {
        assert_eq!(stretched_ramp(FilterMode::Nearest), vec![0, 0, 255, 255]);
    }

    // ── screen ────────────────────────────────────────────────────────────

    #[test]
    fn screen_target_reads_back_bottom_row_first() {
        let reg = registry();
        // Red on row 0, blue on row 1.
        let src = image::RgbaImage::from_raw(1, 2, vec![255, 0, 0, 255, 0, 0, 255, 255]).unwrap();
        let tex = reg.create_texture(&src, FilterMode::Nearest).unwrap();
        let screen = reg.host().create_screen(1, 2);
        let rt = reg.add_render_target(RenderTarget::screen(screen, 1, 2));

        reg.draw_texture(
            rt,
            tex,
            &[TexturePart::whole(Vec2::zero(), 1, 2)],
            &GeometryMatrix::identity(),
            &ColorMatrix::identity(),
        )
        .unwrap();
        assert_eq!(reg.read_pixels(rt).unwrap(), vec![0, 0, 255, 255, 255, 0, 0, 255]);
    }

    #[test]
    fn replace_pixels_checks_size() {
        let reg = registry();
        let tex = reg.create_texture(&pattern(4, 4), FilterMode::Nearest).unwrap();
        assert!(reg.replace_pixels(tex, &pattern(4, 4)).is_ok());
        assert!(matches!(
            reg.replace_pixels(tex, &pattern(2, 4)),
            Err(GfxError::SizeMismatch { got_width: 2, .. })
        ));
    }

    // ── teardown ──────────────────────────────────────────────────────────

    #[test]
    fn teardown_releases_everything() {
        let reg = registry();
        reg.create_texture(&pattern(2, 2), FilterMode::Nearest).unwrap();
        reg.create_render_target(4, 4, FilterMode::Nearest).unwrap();
        let screen = reg.host().create_screen(4, 4);
        reg.add_render_target(RenderTarget::screen(screen, 4, 4));

        reg.teardown();

        let stats = reg.host().stats();
        assert_eq!((stats.live_textures, stats.live_framebuffers), (0, 0));
        assert_eq!(reg.len_textures() + reg.len_render_targets(), 0);

        let next = reg.create_texture(&pattern(1, 1), FilterMode::Nearest).unwrap();
        assert_eq!(next.get(), 5);
    }
}
