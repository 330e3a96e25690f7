/// 2D affine transform stored as the top two rows of a 3x3 matrix.
///
/// `x' = e[0][0] * x + e[0][1] * y + e[0][2]`
/// `y' = e[1][0] * x + e[1][1] * y + e[1][2]`
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct GeometryMatrix {
    pub elements: [[f64; 3]; 2],
}

impl Default for GeometryMatrix {
    fn default() -> Self {
        Self::identity()
    }
}

impl GeometryMatrix {
    #[inline]
    pub const fn identity() -> Self {
        Self {
            elements: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
        }
    }

    #[inline]
    pub const fn translate(tx: f64, ty: f64) -> Self {
        Self {
            elements: [[1.0, 0.0, tx], [0.0, 1.0, ty]],
        }
    }

    #[inline]
    pub const fn scale(sx: f64, sy: f64) -> Self {
        Self {
            elements: [[sx, 0.0, 0.0], [0.0, sy, 0.0]],
        }
    }

    /// Counter-clockwise rotation by `theta` radians (with +Y pointing up).
    pub fn rotate(theta: f64) -> Self {
        let (sin, cos) = theta.sin_cos();
        Self {
            elements: [[cos, -sin, 0.0], [sin, cos, 0.0]],
        }
    }

    /// Returns the transform that applies `self` first, then `next`.
    pub fn concat(&self, next: &GeometryMatrix) -> Self {
        let a = &next.elements;
        let b = &self.elements;
        let mut out = [[0.0; 3]; 2];
        for (i, row) in out.iter_mut().enumerate() {
            for (j, cell) in row.iter_mut().enumerate() {
                *cell = a[i][0] * b[0][j] + a[i][1] * b[1][j];
            }
            row[2] += a[i][2];
        }
        Self { elements: out }
    }

    #[inline]
    pub fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        let e = &self.elements;
        (
            e[0][0] * x + e[0][1] * y + e[0][2],
            e[1][0] * x + e[1][1] * y + e[1][2],
        )
    }

    #[inline]
    pub fn determinant(&self) -> f64 {
        let e = &self.elements;
        e[0][0] * e[1][1] - e[0][1] * e[1][0]
    }

    /// Inverse transform, or `None` when the matrix is singular.
    pub fn invert(&self) -> Option<Self> {
        let det = self.determinant();
        if det == 0.0 || !det.is_finite() {
            return None;
        }
        let [[a, b, tx], [c, d, ty]] = self.elements;
        let inv = 1.0 / det;
        let (ia, ib, ic, id) = (d * inv, -b * inv, -c * inv, a * inv);
        Some(Self {
            elements: [
                [ia, ib, -(ia * tx + ib * ty)],
                [ic, id, -(ic * tx + id * ty)],
            ],
        })
    }

    #[inline]
    pub fn is_identity(&self) -> bool {
        *self == Self::identity()
    }

    /// Columns of the 3x3 matrix in single precision, for uniform upload.
    pub fn to_columns_f32(&self) -> [[f32; 4]; 3] {
        let e = &self.elements;
        [
            [e[0][0] as f32, e[1][0] as f32, 0.0, 0.0],
            [e[0][1] as f32, e[1][1] as f32, 0.0, 0.0],
            [e[0][2] as f32, e[1][2] as f32, 1.0, 0.0],
        ]
    }
}
