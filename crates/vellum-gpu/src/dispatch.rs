//! Draw dispatcher: flattens the projection and forwards one draw to the host.

use crate::host::HostRenderer;
use crate::target::ProjectionMatrix;
use crate::texture::TextureQuad;
use crate::transform::{ColorMatrix, GeometryMatrix};

/// Flattens a row-major f64 matrix into the column-major f32 layout shaders take.
pub fn gl_matrix(matrix: &ProjectionMatrix) -> [f32; 16] {
    let mut out = [0.0f32; 16];
    for (i, row) in matrix.iter().enumerate() {
        for (j, value) in row.iter().enumerate() {
            out[i + j * 4] = *value as f32;
        }
    }
    out
}

/// Issues a single host draw covering every quad. An empty list draws nothing.
pub fn draw_quads<H: HostRenderer>(
    host: &H,
    projection: &ProjectionMatrix,
    texture: &H::Texture,
    quads: &[TextureQuad],
    geometry: &GeometryMatrix,
    color: &ColorMatrix,
) {
    if quads.is_empty() {
        log::trace!("draw skipped: no quads");
        return;
    }
    host.draw_texture(texture, &gl_matrix(projection), quads, geometry, color);
}
