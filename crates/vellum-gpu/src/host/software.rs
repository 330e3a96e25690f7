//! CPU reference backend.
//!
//! Surfaces are RGBA8 buffers stored in framebuffer row order (row 0 is
//! NDC `y = -1`, as `glReadPixels` reports it). Colors are treated as
//! premultiplied and blended source-over. Every native call is counted in
//! [`HostStats`] so callers can observe binding traffic.

use std::collections::HashMap;

use parking_lot::Mutex;

use crate::coords::{Rect, Vec2};
use crate::error::{GfxError, GfxResult};
use crate::texture::{FilterMode, TextureQuad};
use crate::transform::{ColorMatrix, GeometryMatrix};

use super::HostRenderer;

/// Texture handle of [`SoftwareHost`].
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct SoftTexture(u32);

/// Framebuffer handle of [`SoftwareHost`].
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct SoftFramebuffer(u32);

/// Native call counters and live object counts.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct HostStats {
    pub framebuffer_binds: u64,
    pub viewport_sets: u64,
    pub clears: u64,
    pub draws: u64,
    pub live_textures: usize,
    pub live_framebuffers: usize,
}

struct Surface {
    width: u32,
    height: u32,
    filter: FilterMode,
    pixels: Vec<u8>,
}

impl Surface {
    fn new(width: u32, height: u32, filter: FilterMode) -> Self {
        Self {
            width,
            height,
            filter,
            pixels: vec![0; width as usize * height as usize * 4],
        }
    }

    fn texel(&self, x: i64, y: i64) -> [f32; 4] {
        let x = x.clamp(0, self.width as i64 - 1) as usize;
        let y = y.clamp(0, self.height as i64 - 1) as usize;
        let i = (y * self.width as usize + x) * 4;
        let p = &self.pixels[i..i + 4];
        [
            p[0] as f32 / 255.0,
            p[1] as f32 / 255.0,
            p[2] as f32 / 255.0,
            p[3] as f32 / 255.0,
        ]
    }

    fn sample(&self, u: f32, v: f32) -> [f32; 4] {
        let tx = u * self.width as f32;
        let ty = v * self.height as f32;
        match self.filter {
            FilterMode::Nearest => self.texel(tx.floor() as i64, ty.floor() as i64),
            FilterMode::Linear => {
                let (fx, fy) = (tx - 0.5, ty - 0.5);
                let (x0, y0) = (fx.floor(), fy.floor());
                let (wx, wy) = (fx - x0, fy - y0);
                let (x0, y0) = (x0 as i64, y0 as i64);
                let c00 = self.texel(x0, y0);
                let c10 = self.texel(x0 + 1, y0);
                let c01 = self.texel(x0, y0 + 1);
                let c11 = self.texel(x0 + 1, y0 + 1);
                let mut out = [0.0; 4];
                for k in 0..4 {
                    let top = c00[k] * (1.0 - wx) + c10[k] * wx;
                    let bottom = c01[k] * (1.0 - wx) + c11[k] * wx;
                    out[k] = top * (1.0 - wy) + bottom * wy;
                }
                out
            }
        }
    }

    fn blend(&mut self, x: u32, y: u32, src: [f32; 4]) {
        let i = (y as usize * self.width as usize + x as usize) * 4;
        let inv_a = 1.0 - src[3];
        for k in 0..4 {
            let dst = self.pixels[i + k] as f32 / 255.0;
            self.pixels[i + k] = to_u8(src[k] + dst * inv_a);
        }
    }
}

struct Framebuffer {
    surface: u32,
    // Screen framebuffers own their surface; texture framebuffers borrow it.
    owns_surface: bool,
}

#[derive(Default)]
struct State {
    surfaces: HashMap<u32, Surface>,
    framebuffers: HashMap<u32, Framebuffer>,
    next_handle: u32,
    bound: Option<u32>,
    viewport: (i32, i32, u32, u32),
    stats: HostStats,
    max_textures: Option<usize>,
    max_framebuffers: Option<usize>,
}

impl State {
    fn handle(&mut self) -> u32 {
        self.next_handle += 1;
        self.next_handle
    }
}

/// Deterministic CPU implementation of [`HostRenderer`].
#[derive(Default)]
pub struct SoftwareHost {
    state: Mutex<State>,
}

impl SoftwareHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Host whose allocations fail once the given live counts are reached.
    pub fn with_limits(max_textures: Option<usize>, max_framebuffers: Option<usize>) -> Self {
        let host = Self::default();
        {
            let mut s = host.state.lock();
            s.max_textures = max_textures;
            s.max_framebuffers = max_framebuffers;
        }
        host
    }

    /// Creates a framebuffer with its own surface, standing in for the window.
    ///
    /// Register it with [`RenderTarget::screen`](crate::target::RenderTarget::screen).
    pub fn create_screen(&self, width: u32, height: u32) -> SoftFramebuffer {
        let mut s = self.state.lock();
        let surface = s.handle();
        s.surfaces.insert(surface, Surface::new(width, height, FilterMode::Nearest));
        let fb = s.handle();
        s.framebuffers.insert(fb, Framebuffer { surface, owns_surface: true });
        s.stats.live_framebuffers += 1;
        SoftFramebuffer(fb)
    }

    pub fn stats(&self) -> HostStats {
        self.state.lock().stats
    }

    /// Currently bound framebuffer handle and viewport.
    pub fn binding(&self) -> (Option<u32>, (i32, i32, u32, u32)) {
        let s = self.state.lock();
        (s.bound, s.viewport)
    }
}

impl HostRenderer for SoftwareHost {
    type Texture = SoftTexture;
    type Framebuffer = SoftFramebuffer;

    fn create_texture(
        &self,
        width: u32,
        height: u32,
        pixels: Option<&[u8]>,
        filter: FilterMode,
    ) -> GfxResult<SoftTexture> {
        let mut s = self.state.lock();
        if s.max_textures.is_some_and(|max| s.stats.live_textures >= max) {
            return Err(GfxError::CreateTexture("texture limit reached".into()));
        }
        let mut surface = Surface::new(width, height, filter);
        if let Some(pixels) = pixels {
            if pixels.len() != surface.pixels.len() {
                return Err(GfxError::CreateTexture(format!(
                    "expected {} bytes of pixel data, got {}",
                    surface.pixels.len(),
                    pixels.len()
                )));
            }
            surface.pixels.copy_from_slice(pixels);
        }
        let id = s.handle();
        s.surfaces.insert(id, surface);
        s.stats.live_textures += 1;
        Ok(SoftTexture(id))
    }

    fn update_texture(
        &self,
        texture: &SoftTexture,
        width: u32,
        height: u32,
        pixels: &[u8],
    ) -> GfxResult<()> {
        let mut s = self.state.lock();
        let surface = s
            .surfaces
            .get_mut(&texture.0)
            .ok_or_else(|| GfxError::CreateTexture(format!("no surface {}", texture.0)))?;
        if (surface.width, surface.height) != (width, height) || pixels.len() != surface.pixels.len() {
            return Err(GfxError::CreateTexture("upload does not match texture size".into()));
        }
        surface.pixels.copy_from_slice(pixels);
        Ok(())
    }

    fn delete_texture(&self, texture: SoftTexture) {
        let mut s = self.state.lock();
        if s.surfaces.remove(&texture.0).is_some() {
            s.stats.live_textures -= 1;
        }
    }

    fn create_framebuffer(&self, texture: &SoftTexture) -> GfxResult<SoftFramebuffer> {
        let mut s = self.state.lock();
        if s.max_framebuffers.is_some_and(|max| s.stats.live_framebuffers >= max) {
            return Err(GfxError::CreateFramebuffer("framebuffer limit reached".into()));
        }
        if !s.surfaces.contains_key(&texture.0) {
            return Err(GfxError::CreateFramebuffer(format!("no surface {}", texture.0)));
        }
        let fb = s.handle();
        s.framebuffers.insert(fb, Framebuffer { surface: texture.0, owns_surface: false });
        s.stats.live_framebuffers += 1;
        // Mirrors GL drivers that leave the new framebuffer bound.
        s.bound = Some(fb);
        Ok(SoftFramebuffer(fb))
    }

    fn delete_framebuffer(&self, framebuffer: SoftFramebuffer) {
        let mut s = self.state.lock();
        if let Some(fb) = s.framebuffers.remove(&framebuffer.0) {
            if fb.owns_surface {
                s.surfaces.remove(&fb.surface);
            }
            s.stats.live_framebuffers -= 1;
        }
        if s.bound == Some(framebuffer.0) {
            s.bound = None;
        }
    }

    fn bind_framebuffer(&self, framebuffer: &SoftFramebuffer) {
        let mut s = self.state.lock();
        s.bound = Some(framebuffer.0);
        s.stats.framebuffer_binds += 1;
    }

    fn set_viewport(&self, x: i32, y: i32, width: u32, height: u32) {
        let mut s = self.state.lock();
        s.viewport = (x, y, width, height);
        s.stats.viewport_sets += 1;
    }

    fn clear(&self, rgba: [f32; 4]) {
        let mut s = self.state.lock();
        s.stats.clears += 1;
        let Some(surface_id) = s.bound.and_then(|fb| s.framebuffers.get(&fb)).map(|fb| fb.surface) else {
            log::warn!("SoftwareHost: clear with no framebuffer bound");
            return;
        };
        let Some(surface) = s.surfaces.get_mut(&surface_id) else { return };
        let px = rgba.map(to_u8);
        for chunk in surface.pixels.chunks_exact_mut(4) {
            chunk.copy_from_slice(&px);
        }
    }

    fn draw_texture(
        &self,
        texture: &SoftTexture,
        projection: &[f32; 16],
        quads: &[TextureQuad],
        geometry: &GeometryMatrix,
        color: &ColorMatrix,
    ) {
        let mut s = self.state.lock();
        s.stats.draws += 1;

        let Some(target_id) = s.bound.and_then(|fb| s.framebuffers.get(&fb)).map(|fb| fb.surface) else {
            log::warn!("SoftwareHost: draw with no framebuffer bound");
            return;
        };
        // Snapshot the source so drawing a surface into itself stays defined.
        let source = match s.surfaces.get(&texture.0) {
            Some(src) => Surface {
                width: src.width,
                height: src.height,
                filter: src.filter,
                pixels: src.pixels.clone(),
            },
            None => {
                log::warn!("SoftwareHost: draw from unknown texture {}", texture.0);
                return;
            }
        };
        let (vx, vy, vw, vh) = s.viewport;
        let Some(target) = s.surfaces.get_mut(&target_id) else { return };

        let to_window = geometry
            .concat(&projection_2d(projection))
            .concat(&viewport_transform(vx, vy, vw, vh));
        let Some(to_local) = to_window.invert() else {
            log::trace!("SoftwareHost: degenerate transform, nothing drawn");
            return;
        };

        let clip = Rect::of_size(target.width, target.height)
            .intersect(Rect::new(vx as f32, vy as f32, vw as f32, vh as f32));
        let Some(clip) = clip else { return };

        for quad in quads {
            rasterize(target, &source, quad, &to_window, &to_local, clip, color);
        }
    }

    fn read_pixels(
        &self,
        framebuffer: &SoftFramebuffer,
        width: u32,
        height: u32,
    ) -> GfxResult<Vec<u8>> {
        let s = self.state.lock();
        let surface = s
            .framebuffers
            .get(&framebuffer.0)
            .and_then(|fb| s.surfaces.get(&fb.surface))
            .ok_or_else(|| GfxError::ReadPixels(format!("no framebuffer {}", framebuffer.0)))?;
        if width > surface.width || height > surface.height {
            return Err(GfxError::ReadPixels(format!(
                "{width}x{height} exceeds surface {}x{}",
                surface.width, surface.height
            )));
        }
        let row = surface.width as usize * 4;
        let mut out = Vec::with_capacity(width as usize * height as usize * 4);
        for y in 0..height as usize {
            out.extend_from_slice(&surface.pixels[y * row..y * row + width as usize * 4]);
        }
        Ok(out)
    }
}

// ── rasterization ─────────────────────────────────────────────────────────

fn rasterize(
    target: &mut Surface,
    source: &Surface,
    quad: &TextureQuad,
    to_window: &GeometryMatrix,
    to_local: &GeometryMatrix,
    clip: Rect,
    color: &ColorMatrix,
) {
    let dst = quad.dst_rect();
    if dst.is_empty() {
        return;
    }

    let corners = [
        (dst.min().x, dst.min().y),
        (dst.max().x, dst.min().y),
        (dst.min().x, dst.max().y),
        (dst.max().x, dst.max().y),
    ]
    .map(|(x, y)| {
        let (wx, wy) = to_window.apply(x as f64, y as f64);
        Vec2::new(wx as f32, wy as f32)
    });
    let bounds = corners[1..]
        .iter()
        .fold(Rect::from_corners(corners[0], corners[0]), |acc, c| {
            Rect::from_corners(acc.min().min(*c), acc.max().max(*c))
        });
    let Some(area) = bounds.intersect(clip) else { return };

    let x0 = area.min().x.floor() as u32;
    let y0 = area.min().y.floor() as u32;
    let x1 = (area.max().x.ceil() as u32).min(target.width);
    let y1 = (area.max().y.ceil() as u32).min(target.height);

    for py in y0..y1 {
        for px in x0..x1 {
            let (lx, ly) = to_local.apply(px as f64 + 0.5, py as f64 + 0.5);
            let local = Vec2::new(lx as f32, ly as f32);
            if !dst.contains(local) {
                continue;
            }
            let s = (local.x - dst.origin.x) / dst.size.x;
            let t = (local.y - dst.origin.y) / dst.size.y;
            let u = quad.uv_min[0] + s * (quad.uv_max[0] - quad.uv_min[0]);
            let v = quad.uv_min[1] + t * (quad.uv_max[1] - quad.uv_min[1]);

            let sampled = source.sample(u, v);
            let shaded = if color.is_identity() { sampled } else { apply_color(color, sampled) };
            target.blend(px, py, shaded);
        }
    }
}

/// Applies `color` to a premultiplied sample, returning a premultiplied result.
fn apply_color(color: &ColorMatrix, premul: [f32; 4]) -> [f32; 4] {
    let a = premul[3];
    let straight = if a > 0.0 {
        [premul[0] / a, premul[1] / a, premul[2] / a, a]
    } else {
        [0.0; 4]
    };
    let [r, g, b, a] = color.apply(straight);
    [r * a, g * a, b * a, a]
}

/// x/y part of a column-major orthographic projection.
fn projection_2d(p: &[f32; 16]) -> GeometryMatrix {
    GeometryMatrix {
        elements: [
            [p[0] as f64, p[4] as f64, p[12] as f64],
            [p[1] as f64, p[5] as f64, p[13] as f64],
        ],
    }
}

/// NDC -> window pixels for the given viewport.
fn viewport_transform(x: i32, y: i32, width: u32, height: u32) -> GeometryMatrix {
    let hw = width as f64 / 2.0;
    let hh = height as f64 / 2.0;
    GeometryMatrix::scale(hw, hh).concat(&GeometryMatrix::translate(x as f64 + hw, y as f64 + hh))
}

#[inline]
fn to_u8(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}
