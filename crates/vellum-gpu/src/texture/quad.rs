use bytemuck::{Pod, Zeroable};

use crate::coords::{Rect, Vec2};

/// A region of a texture and where to place it.
///
/// `source` is in texels of the source texture; `location` is the top-left
/// corner of the destination in draw space. The destination has the same
/// size as `source`; scaling and rotation come from the geometry matrix.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct TexturePart {
    pub location: Vec2,
    pub source: Rect,
}

impl TexturePart {
    #[inline]
    pub const fn new(location: Vec2, source: Rect) -> Self {
        Self { location, source }
    }

    /// Whole `width` x `height` texture drawn at `location`.
    #[inline]
    pub fn whole(location: Vec2, width: u32, height: u32) -> Self {
        Self::new(location, Rect::of_size(width, height))
    }
}

/// Quad ready for the host: draw-space corners plus normalized UVs.
///
/// Layout (32 bytes) matches the instance buffer of the wgpu backend:
///
///  offset  0  dst_min  [f32; 2]
///  offset  8  dst_max  [f32; 2]
///  offset 16  uv_min   [f32; 2]
///  offset 24  uv_max   [f32; 2]
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, Pod, Zeroable)]
pub struct TextureQuad {
    pub dst_min: [f32; 2],
    pub dst_max: [f32; 2],
    pub uv_min: [f32; 2],
    pub uv_max: [f32; 2],
}

impl TextureQuad {
    #[inline]
    pub fn dst_rect(&self) -> Rect {
        Rect::from_corners(
            Vec2::new(self.dst_min[0], self.dst_min[1]),
            Vec2::new(self.dst_max[0], self.dst_max[1]),
        )
    }
}

/// Converts texel-space parts of a `width` x `height` texture to quads.
///
/// UVs are normalized by the texture's logical size.
pub fn texture_quads(parts: &[TexturePart], width: u32, height: u32) -> Vec<TextureQuad> {
    let w = width.max(1) as f32;
    let h = height.max(1) as f32;
    parts
        .iter()
        .map(|part| {
            let src_min = part.source.min();
            let src_max = part.source.max();
            let dst_min = part.location;
            let dst_max = part.location + part.source.size;
            TextureQuad {
                dst_min: [dst_min.x, dst_min.y],
                dst_max: [dst_max.x, dst_max.y],
                uv_min: [src_min.x / w, src_min.y / h],
                uv_max: [src_max.x / w, src_max.y / h],
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whole_texture_spans_unit_uv() {
        let quads = texture_quads(&[TexturePart::whole(Vec2::new(4.0, 8.0), 32, 16)], 32, 16);
        assert_eq!(
            quads,
            vec![TextureQuad {
                dst_min: [4.0, 8.0],
                dst_max: [36.0, 24.0],
                uv_min: [0.0, 0.0],
                uv_max: [1.0, 1.0],
            }]
        );
    }

    #[test]
    fn sub_region_normalizes_by_logical_size() {
        let part = TexturePart::new(Vec2::zero(), Rect::new(8.0, 4.0, 8.0, 4.0));
        let q = texture_quads(&[part], 32, 16)[0];
        assert_eq!(q.uv_min, [0.25, 0.25]);
        assert_eq!(q.uv_max, [0.5, 0.5]);
        assert_eq!(q.dst_max, [8.0, 4.0]);
    }

    #[test]
    fn one_quad_per_part_in_order() {
        let parts = [
            TexturePart::whole(Vec2::new(0.0, 0.0), 2, 2),
            TexturePart::whole(Vec2::new(10.0, 0.0), 2, 2),
        ];
        let quads = texture_quads(&parts, 2, 2);
        assert_eq!(quads.len(), 2);
        assert_eq!(quads[1].dst_min, [10.0, 0.0]);
    }

    #[test]
    fn quad_is_32_bytes() {
        assert_eq!(std::mem::size_of::<TextureQuad>(), 32);
    }
}
