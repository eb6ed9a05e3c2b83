//! Range operator.

use clf_core::BitDepth;

use crate::op::{Direction, OpBase};
use crate::{OpError, OpResult};

/// Whether a Range clamps to its output bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RangeStyle {
    /// Scale and clamp to the output bounds.
    #[default]
    Clamp,
    /// Scale only; introduced in CTF 1.7 / the CLF spec.
    NoClamp,
}

impl RangeStyle {
    /// Parses a Range `style` attribute value.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "clamp" => Some(RangeStyle::Clamp),
            "noclamp" => Some(RangeStyle::NoClamp),
            _ => None,
        }
    }

    /// The attribute spelling written to files.
    pub fn as_str(self) -> &'static str {
        match self {
            RangeStyle::Clamp => "Clamp",
            RangeStyle::NoClamp => "noClamp",
        }
    }
}

/// A Range operator: an affine map between an input and an output
/// interval, optionally clamping.
///
/// Each bound may be absent; a min-only or max-only pair is a one-sided
/// clamp. Values are normalized at read time by the respective bit depth
/// scales.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RangeOp {
    /// Shared operator fields.
    pub base: OpBase,
    /// Apply as authored or inverted.
    pub direction: Direction,
    /// Clamping style.
    pub style: RangeStyle,
    /// Lower input bound.
    pub min_in: Option<f64>,
    /// Upper input bound.
    pub max_in: Option<f64>,
    /// Lower output bound.
    pub min_out: Option<f64>,
    /// Upper output bound.
    pub max_out: Option<f64>,
}

impl RangeOp {
    /// Materializes the Range equivalent of a legacy 2-entry IndexMap
    /// attached to a LUT of `lut_length` entries with input depth
    /// `in_depth`.
    ///
    /// The map's input values are scaled by the LUT input depth and the
    /// target indices by the last LUT index, yielding the rescale the
    /// IndexMap asked for in normalized space.
    pub fn from_index_map(
        pairs: &[(f32, f32)],
        lut_length: usize,
        in_depth: BitDepth,
    ) -> OpResult<Self> {
        if pairs.len() != 2 {
            return Err(OpError::validation(format!(
                "only an IndexMap with 2 entries is supported, found {}",
                pairs.len()
            )));
        }
        let in_scale = in_depth.scale();
        let out_scale = (lut_length - 1) as f64;
        Ok(Self {
            min_in: Some(pairs[0].0 as f64 / in_scale),
            max_in: Some(pairs[1].0 as f64 / in_scale),
            min_out: Some(pairs[0].1 as f64 / out_scale),
            max_out: Some(pairs[1].1 as f64 / out_scale),
            ..Default::default()
        })
    }

    /// Divides the input bounds by `in_scale` and the output bounds by
    /// `out_scale`, the read-time normalization.
    pub fn normalize(&mut self, in_scale: f64, out_scale: f64) {
        for v in [&mut self.min_in, &mut self.max_in] {
            if let Some(v) = v {
                *v /= in_scale;
            }
        }
        for v in [&mut self.min_out, &mut self.max_out] {
            if let Some(v) = v {
                *v /= out_scale;
            }
        }
    }

    /// The closed-form inverse: input and output intervals swap.
    pub fn inverse(&self) -> RangeOp {
        let mut out = self.clone();
        out.direction = Direction::Forward;
        std::mem::swap(&mut out.min_in, &mut out.min_out);
        std::mem::swap(&mut out.max_in, &mut out.max_out);
        std::mem::swap(&mut out.base.in_depth, &mut out.base.out_depth);
        out
    }

    /// Checks the record is legal.
    pub fn validate(&self) -> OpResult<()> {
        if self.min_in.is_some() != self.min_out.is_some() {
            return Err(OpError::validation(
                "Range min input and output values must both be set or both be absent",
            ));
        }
        if self.max_in.is_some() != self.max_out.is_some() {
            return Err(OpError::validation(
                "Range max input and output values must both be set or both be absent",
            ));
        }
        if self.min_in.is_none() && self.max_in.is_none() {
            return Err(OpError::validation("Range must define at least one bound pair"));
        }
        if let (Some(lo), Some(hi)) = (self.min_in, self.max_in) {
            if lo > hi {
                return Err(OpError::validation("Range min input value exceeds max input value"));
            }
        }
        if let (Some(lo), Some(hi)) = (self.min_out, self.max_out) {
            if lo > hi {
                return Err(OpError::validation("Range min output value exceeds max output value"));
            }
        }
        if self.style == RangeStyle::NoClamp
            && (self.min_in.is_none() || self.max_in.is_none())
        {
            return Err(OpError::validation(
                "Range with noClamp style requires all four values",
            ));
        }
        Ok(())
    }

    fn scale_and_offset(&self) -> (f64, f64) {
        match (self.min_in, self.max_in, self.min_out, self.max_out) {
            (Some(a), Some(b), Some(c), Some(d)) if b != a => {
                let scale = (d - c) / (b - a);
                (scale, c - scale * a)
            }
            (Some(a), _, Some(c), _) => (1.0, c - a),
            (_, Some(b), _, Some(d)) => (1.0, d - b),
            _ => (1.0, 0.0),
        }
    }

    /// Applies the range (resolving an inverse direction) to one sample;
    /// alpha passes through.
    pub fn apply(&self, rgba: &mut [f32; 4]) {
        let resolved;
        let op = match self.direction {
            Direction::Forward => self,
            Direction::Inverse => {
                resolved = self.inverse();
                &resolved
            }
        };
        let (scale, offset) = op.scale_and_offset();
        for ch in 0..3 {
            let mut v = rgba[ch] as f64 * scale + offset;
            if op.style == RangeStyle::Clamp {
                if let Some(lo) = op.min_out {
                    v = v.max(lo);
                }
                if let Some(hi) = op.max_out {
                    v = v.min(hi);
                }
            }
            rgba[ch] = v as f32;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn full(min_in: f64, max_in: f64, min_out: f64, max_out: f64) -> RangeOp {
        RangeOp {
            min_in: Some(min_in),
            max_in: Some(max_in),
            min_out: Some(min_out),
            max_out: Some(max_out),
            ..Default::default()
        }
    }

    #[test]
    fn rescale_and_clamp() {
        let r = full(0.0, 1.0, 0.0, 0.5);
        r.validate().unwrap();
        let mut px = [1.0, 0.5, -0.5, 1.0];
        r.apply(&mut px);
        assert_abs_diff_eq!(px[0], 0.5, epsilon = 1e-6);
        assert_abs_diff_eq!(px[1], 0.25, epsilon = 1e-6);
        assert_abs_diff_eq!(px[2], 0.0, epsilon = 1e-6);
    }

    #[test]
    fn no_clamp_extends() {
        let mut r = full(0.0, 1.0, 0.0, 2.0);
        r.style = RangeStyle::NoClamp;
        r.validate().unwrap();
        let mut px = [2.0, 0.5, -1.0, 1.0];
        r.apply(&mut px);
        assert_abs_diff_eq!(px[0], 4.0, epsilon = 1e-6);
        assert_abs_diff_eq!(px[2], -2.0, epsilon = 1e-6);
    }

    #[test]
    fn one_sided_clamp() {
        let r = RangeOp {
            min_in: Some(0.1),
            min_out: Some(0.1),
            ..Default::default()
        };
        r.validate().unwrap();
        let mut px = [0.0, 0.5, 0.05, 1.0];
        r.apply(&mut px);
        assert_abs_diff_eq!(px[0], 0.1, epsilon = 1e-6);
        assert_abs_diff_eq!(px[1], 0.5, epsilon = 1e-6);
        assert_abs_diff_eq!(px[2], 0.1, epsilon = 1e-6);
    }

    #[test]
    fn inverse_swaps_intervals() {
        let r = full(0.1, 0.9, 0.0, 1.0);
        let inv = r.inverse();
        let mut px = [0.5, 0.5, 0.5, 1.0];
        r.apply(&mut px);
        inv.apply(&mut px);
        assert_abs_diff_eq!(px[0], 0.5, epsilon = 1e-6);
    }

    #[test]
    fn validation_rules() {
        assert!(full(1.0, 0.0, 0.0, 1.0).validate().is_err());
        let half_pair = RangeOp { min_in: Some(0.0), ..Default::default() };
        assert!(half_pair.validate().is_err());
        let empty = RangeOp::default();
        assert!(empty.validate().is_err());

        let mut nc = RangeOp {
            min_in: Some(0.0),
            min_out: Some(0.0),
            ..Default::default()
        };
        nc.style = RangeStyle::NoClamp;
        assert!(nc.validate().is_err());
    }

    #[test]
    fn index_map_materialization() {
        let r = RangeOp::from_index_map(&[(64.0, 0.0), (940.0, 1023.0)], 1024, BitDepth::UInt10)
            .unwrap();
        assert_abs_diff_eq!(r.min_in.unwrap(), 64.0 / 1023.0, epsilon = 1e-9);
        assert_abs_diff_eq!(r.max_in.unwrap(), 940.0 / 1023.0, epsilon = 1e-9);
        assert_abs_diff_eq!(r.min_out.unwrap(), 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(r.max_out.unwrap(), 1.0, epsilon = 1e-9);

        assert!(RangeOp::from_index_map(&[(0.0, 0.0)], 2, BitDepth::UInt10).is_err());
    }
}
