/// Affine color transform: `out = M * [r, g, b, a] + t`.
///
/// Columns 0..4 of each row form `M`, column 4 is the translation `t`.
/// Inputs and outputs are straight (non-premultiplied) RGBA in `[0, 1]`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ColorMatrix {
    pub elements: [[f64; 5]; 4],
}

impl Default for ColorMatrix {
    fn default() -> Self {
        Self::identity()
    }
}

impl ColorMatrix {
    pub const fn identity() -> Self {
        Self {
            elements: [
                [1.0, 0.0, 0.0, 0.0, 0.0],
                [0.0, 1.0, 0.0, 0.0, 0.0],
                [0.0, 0.0, 1.0, 0.0, 0.0],
                [0.0, 0.0, 0.0, 1.0, 0.0],
            ],
        }
    }

    /// Per-channel multiply (tint / alpha fade).
    pub const fn scale(r: f64, g: f64, b: f64, a: f64) -> Self {
        Self {
            elements: [
                [r, 0.0, 0.0, 0.0, 0.0],
                [0.0, g, 0.0, 0.0, 0.0],
                [0.0, 0.0, b, 0.0, 0.0],
                [0.0, 0.0, 0.0, a, 0.0],
            ],
        }
    }

    /// Per-channel add.
    pub const fn translate(r: f64, g: f64, b: f64, a: f64) -> Self {
        Self {
            elements: [
                [1.0, 0.0, 0.0, 0.0, r],
                [0.0, 1.0, 0.0, 0.0, g],
                [0.0, 0.0, 1.0, 0.0, b],
                [0.0, 0.0, 0.0, 1.0, a],
            ],
        }
    }

    /// Returns the transform that applies `self` first, then `next`.
    pub fn concat(&self, next: &ColorMatrix) -> Self {
        let a = &next.elements;
        let b = &self.elements;
        let mut out = [[0.0; 5]; 4];
        for (i, row) in out.iter_mut().enumerate() {
            for (j, cell) in row.iter_mut().enumerate() {
                *cell = (0..4).map(|k| a[i][k] * b[k][j]).sum();
            }
            row[4] += a[i][4];
        }
        Self { elements: out }
    }

    /// Transforms one straight-alpha color, clamping the result to `[0, 1]`.
    pub fn apply(&self, rgba: [f32; 4]) -> [f32; 4] {
        let mut out = [0.0f32; 4];
        for (i, row) in self.elements.iter().enumerate() {
            let v = row[0] * rgba[0] as f64
                + row[1] * rgba[1] as f64
                + row[2] * rgba[2] as f64
                + row[3] * rgba[3] as f64
                + row[4];
            out[i] = v.clamp(0.0, 1.0) as f32;
        }
        out
    }

    #[inline]
    pub fn is_identity(&self) -> bool {
        *self == Self::identity()
    }

    /// Column-major `mat4x4` body plus translation, for uniform upload.
    pub fn to_f32(&self) -> ([[f32; 4]; 4], [f32; 4]) {
        let e = &self.elements;
        let mut body = [[0.0f32; 4]; 4];
        for (col, out) in body.iter_mut().enumerate() {
            for (row, cell) in out.iter_mut().enumerate() {
                *cell = e[row][col] as f32;
            }
        }
        let translation = [e[0][4] as f32, e[1][4] as f32, e[2][4] as f32, e[3][4] as f32];
        (body, translation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_is_passthrough() {
        let c = [0.25, 0.5, 0.75, 1.0];
        assert_eq!(ColorMatrix::identity().apply(c), c);
    }

    #[test]
    fn scale_then_translate() {
        let m = ColorMatrix::scale(0.5, 0.5, 0.5, 1.0).concat(&ColorMatrix::translate(0.25, 0.0, 0.0, 0.0));
        assert_eq!(m.apply([1.0, 1.0, 0.0, 1.0]), [0.75, 0.5, 0.0, 1.0]);
    }

    #[test]
    fn output_is_clamped() {
        let m = ColorMatrix::translate(2.0, -2.0, 0.0, 0.0);
        assert_eq!(m.apply([0.5, 0.5, 0.5, 1.0]), [1.0, 0.0, 0.5, 1.0]);
    }

    #[test]
    fn to_f32_is_column_major() {
        let mut m = ColorMatrix::identity();
        m.elements[0][3] = 0.5; // red += 0.5 * alpha
        let (body, t) = m.to_f32();
        assert_eq!(body[3][0], 0.5);
        assert_eq!(t, [0.0; 4]);
    }
}
