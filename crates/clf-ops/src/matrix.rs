//! Matrix operator.

use crate::op::{Direction, OpBase};
use crate::{OpError, OpResult};

/// A matrix operator: a 4x4 row-major matrix plus per-channel offsets.
///
/// Files author 3x3 or 3x4 payloads (4x4 and 4x5 in pre-1.3 CTF); the
/// reader embeds them into the full RGBA form with an identity alpha.
/// After reading, values follow the normalized 32f contract; the original
/// file bit depths stay in `base` for round-trip.
#[derive(Debug, Clone, PartialEq)]
pub struct MatrixOp {
    /// Shared operator fields.
    pub base: OpBase,
    /// Apply as authored or inverted.
    pub direction: Direction,
    /// 4x4 row-major coefficients.
    pub matrix: [f64; 16],
    /// RGBA offsets added after the multiply.
    pub offsets: [f64; 4],
}

const IDENTITY: [f64; 16] = [
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 1.0, 0.0,
    0.0, 0.0, 0.0, 1.0,
];

impl Default for MatrixOp {
    fn default() -> Self {
        Self {
            base: OpBase::default(),
            direction: Direction::Forward,
            matrix: IDENTITY,
            offsets: [0.0; 4],
        }
    }
}

impl MatrixOp {
    /// Creates an identity matrix op.
    pub fn identity() -> Self {
        Self::default()
    }

    /// Embeds a 3x3 payload, leaving alpha as identity.
    pub fn set_rgb(&mut self, m: &[f64]) {
        debug_assert_eq!(m.len(), 9);
        for r in 0..3 {
            for c in 0..3 {
                self.matrix[r * 4 + c] = m[r * 3 + c];
            }
        }
    }

    /// Embeds a 4x4 RGBA payload.
    pub fn set_rgba(&mut self, m: &[f64]) {
        debug_assert_eq!(m.len(), 16);
        self.matrix.copy_from_slice(m);
    }

    /// Scales coefficients by `in_scale` and both coefficients and
    /// offsets by `out_scale`, the read-time normalization.
    pub fn scale(&mut self, in_scale: f64, out_scale: f64) {
        let k = in_scale * out_scale;
        for v in &mut self.matrix {
            *v *= k;
        }
        for o in &mut self.offsets {
            *o *= out_scale;
        }
    }

    /// True when any offset is non-zero.
    pub fn has_offsets(&self) -> bool {
        self.offsets.iter().any(|&o| o != 0.0)
    }

    /// True when the alpha row and column differ from identity.
    pub fn uses_alpha(&self) -> bool {
        self.offsets[3] != 0.0
            || self.matrix[15] != 1.0
            || self.matrix[3] != 0.0
            || self.matrix[7] != 0.0
            || self.matrix[11] != 0.0
            || self.matrix[12] != 0.0
            || self.matrix[13] != 0.0
            || self.matrix[14] != 0.0
    }

    /// True for an identity matrix with no offsets.
    pub fn is_identity(&self) -> bool {
        self.matrix == IDENTITY && self.offsets == [0.0; 4]
    }

    /// The affine inverse, failing when the matrix is singular.
    pub fn inverse(&self) -> OpResult<MatrixOp> {
        let inv = invert4(&self.matrix).ok_or(OpError::SingularMatrix)?;
        let mut offsets = [0.0; 4];
        for r in 0..4 {
            let mut acc = 0.0;
            for c in 0..4 {
                acc += inv[r * 4 + c] * self.offsets[c];
            }
            offsets[r] = -acc;
        }
        let mut out = self.clone();
        out.direction = Direction::Forward;
        out.matrix = inv;
        out.offsets = offsets;
        std::mem::swap(&mut out.base.in_depth, &mut out.base.out_depth);
        Ok(out)
    }

    /// Checks the record is legal: finite values, and invertible when the
    /// direction is inverse.
    pub fn validate(&self) -> OpResult<()> {
        if self.matrix.iter().chain(self.offsets.iter()).any(|v| !v.is_finite()) {
            return Err(OpError::validation("Matrix values must be finite"));
        }
        if self.direction == Direction::Inverse {
            self.inverse()?;
        }
        Ok(())
    }

    /// Applies the matrix (resolving an inverse direction) to one sample.
    pub fn apply(&self, rgba: &mut [f32; 4]) {
        let resolved;
        let (m, o) = match self.direction {
            Direction::Forward => (&self.matrix, &self.offsets),
            Direction::Inverse => match self.inverse() {
                Ok(inv) => {
                    resolved = inv;
                    (&resolved.matrix, &resolved.offsets)
                }
                Err(_) => return,
            },
        };
        let v = [rgba[0] as f64, rgba[1] as f64, rgba[2] as f64, rgba[3] as f64];
        for r in 0..4 {
            rgba[r] = (m[r * 4] * v[0] + m[r * 4 + 1] * v[1] + m[r * 4 + 2] * v[2]
                + m[r * 4 + 3] * v[3]
                + o[r]) as f32;
        }
    }
}

/// Inverts a 4x4 row-major matrix by Gauss-Jordan elimination with
/// partial pivoting. Returns `None` for a singular matrix.
fn invert4(m: &[f64; 16]) -> Option<[f64; 16]> {
    let mut a = *m;
    let mut inv = IDENTITY;

    for col in 0..4 {
        let mut pivot = col;
        for r in (col + 1)..4 {
            if a[r * 4 + col].abs() > a[pivot * 4 + col].abs() {
                pivot = r;
            }
        }
        let p = a[pivot * 4 + col];
        if p.abs() < 1e-12 {
            return None;
        }
        if pivot != col {
            for c in 0..4 {
                a.swap(col * 4 + c, pivot * 4 + c);
                inv.swap(col * 4 + c, pivot * 4 + c);
            }
        }
        let inv_p = 1.0 / a[col * 4 + col];
        for c in 0..4 {
            a[col * 4 + c] *= inv_p;
            inv[col * 4 + c] *= inv_p;
        }
        for r in 0..4 {
            if r == col {
                continue;
            }
            let f = a[r * 4 + col];
            if f != 0.0 {
                for c in 0..4 {
                    a[r * 4 + c] -= f * a[col * 4 + c];
                    inv[r * 4 + c] -= f * inv[col * 4 + c];
                }
            }
        }
    }
    Some(inv)
}
