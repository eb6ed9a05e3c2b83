//! Dense value arrays backing LUT and matrix operators.

use crate::{OpError, OpResult};

/// A dense tensor of 64-bit floats with an outer length and a channel
/// count.
///
/// The meaning of `length` depends on the owning operator: number of
/// entries for a 1D LUT, grid edge length for a 3D LUT, row/column count
/// for a matrix. `expected` is the total value count the declared `dim`
/// attribute promises; filling is tracked by the reader.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Array {
    /// Outer dimension.
    pub length: usize,
    /// Color components per entry (1 or 3 for LUTs).
    pub channels: usize,
    /// Total number of values the declared shape requires.
    pub expected: usize,
    /// Parsed values, at most `expected` of them.
    pub values: Vec<f64>,
}

impl Array {
    /// Creates an array sized for a 1D LUT of `length` entries with
    /// `channels` components each.
    pub fn for_lut1d(length: usize, channels: usize) -> Self {
        Self {
            length,
            channels,
            expected: length * channels,
            values: Vec::with_capacity(length * channels),
        }
    }

    /// Creates an array sized for a 3D LUT cube of edge `length`.
    pub fn for_lut3d(length: usize) -> Self {
        Self {
            length,
            channels: 3,
            expected: length * length * length * 3,
            values: Vec::with_capacity(length * length * length * 3),
        }
    }

    /// Creates an array sized for a `rows x cols` matrix payload.
    pub fn for_matrix(rows: usize, cols: usize) -> Self {
        Self {
            length: rows,
            channels: cols,
            expected: rows * cols,
            values: Vec::with_capacity(rows * cols),
        }
    }

    /// Appends one parsed value; fails once the declared count is
    /// exceeded.
    pub fn push(&mut self, v: f64) -> OpResult<()> {
        if self.values.len() >= self.expected {
            return Err(OpError::ArrayLength {
                expected: self.expected,
                found: self.values.len() + 1,
            });
        }
        self.values.push(v);
        Ok(())
    }

    /// Number of values parsed so far.
    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True when nothing has been parsed.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Checks the parsed count equals the declared count.
    pub fn check_complete(&self) -> OpResult<()> {
        if self.values.len() != self.expected {
            return Err(OpError::ArrayLength {
                expected: self.expected,
                found: self.values.len(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_respects_declared_count() {
        let mut a = Array::for_matrix(1, 3);
        a.push(1.0).unwrap();
        a.push(2.0).unwrap();
        assert!(a.check_complete().is_err());
        a.push(3.0).unwrap();
        assert!(a.check_complete().is_ok());
        assert!(a.push(4.0).is_err());
    }

    #[test]
    fn lut3d_expected_count() {
        let a = Array::for_lut3d(2);
        assert_eq!(a.expected, 24);
    }
}
