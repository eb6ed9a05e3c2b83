//! Grading tone operator.

use crate::op::{Direction, OpBase};
use crate::{OpError, OpResult};

use super::{GradingRgbmsw, GradingStyle};

/// Grading tone controls: five tonal zones plus an S-contrast, each a
/// red/green/blue/master adjustment centered on its zone.
///
/// Zone positions use `start`/`width` for blacks, whites and midtones
/// (center/width) and `start`/`pivot` for shadows and highlights. The
/// linear style positions zones in stops around mid-gray.
#[derive(Debug, Clone, PartialEq)]
pub struct GradingToneOp {
    /// Shared operator fields.
    pub base: OpBase,
    /// Math family.
    pub style: GradingStyle,
    /// Apply as authored or inverted.
    pub direction: Direction,
    /// Deep shadow adjustment.
    pub blacks: GradingRgbmsw,
    /// Shadow adjustment.
    pub shadows: GradingRgbmsw,
    /// Midtone adjustment.
    pub midtones: GradingRgbmsw,
    /// Highlight adjustment.
    pub highlights: GradingRgbmsw,
    /// Specular/white adjustment.
    pub whites: GradingRgbmsw,
    /// S-shaped contrast around the zone pivot, 1.0 is neutral.
    pub s_contrast: f64,
    /// Marked overridable at evaluation time.
    pub dynamic: bool,
}

// How strongly a unit change of a zone value moves pixel values.
const ZONE_GAIN: f64 = 0.2;
const SCONTRAST_GAIN: f64 = 0.5;

impl GradingToneOp {
    /// Identity controls for the given style.
    pub fn identity(style: GradingStyle) -> Self {
        let lin = style == GradingStyle::Linear;
        Self {
            base: OpBase::default(),
            style,
            direction: Direction::Forward,
            blacks: GradingRgbmsw::identity(if lin { 0.0 } else { 0.4 }, if lin { 4.0 } else { 0.4 }),
            shadows: GradingRgbmsw::identity(if lin { 2.0 } else { 0.5 }, if lin { -7.0 } else { 0.0 }),
            midtones: GradingRgbmsw::identity(if lin { 0.0 } else { 0.4 }, if lin { 8.0 } else { 0.6 }),
            highlights: GradingRgbmsw::identity(if lin { -2.0 } else { 0.3 }, if lin { 9.0 } else { 1.0 }),
            whites: GradingRgbmsw::identity(if lin { 0.0 } else { 0.4 }, if lin { 8.0 } else { 0.5 }),
            s_contrast: 1.0,
            dynamic: false,
        }
    }

    /// Checks the parameter set is legal.
    pub fn validate(&self) -> OpResult<()> {
        let zones = [
            ("blacks", &self.blacks),
            ("shadows", &self.shadows),
            ("midtones", &self.midtones),
            ("highlights", &self.highlights),
            ("whites", &self.whites),
        ];
        for (name, z) in zones {
            for v in [z.red, z.green, z.blue, z.master] {
                if !(0.01..=1.99).contains(&v) {
                    return Err(OpError::validation(format!(
                        "{name} value {v} is outside [0.01, 1.99]"
                    )));
                }
            }
        }
        if !(0.01..=1.99).contains(&self.s_contrast) {
            return Err(OpError::validation(format!(
                "SContrast value {} is outside [0.01, 1.99]",
                self.s_contrast
            )));
        }
        Ok(())
    }

    /// True when every zone and the S-contrast are neutral.
    pub fn is_identity(&self) -> bool {
        self.blacks.is_identity()
            && self.shadows.is_identity()
            && self.midtones.is_identity()
            && self.highlights.is_identity()
            && self.whites.is_identity()
            && self.s_contrast == 1.0
    }

    /// Applies the tone adjustments to one sample; alpha passes through.
    pub fn apply(&self, rgba: &mut [f32; 4]) {
        for ch in 0..3 {
            let x = rgba[ch] as f64;
            rgba[ch] = match self.direction {
                Direction::Forward => self.forward(x, ch),
                Direction::Inverse => self.invert(x, ch),
            } as f32;
        }
    }

    fn forward(&self, mut x: f64, ch: usize) -> f64 {
        let pick = |z: &GradingRgbmsw| z.rgb_mul()[ch];

        x += ZONE_GAIN * (pick(&self.blacks) - 1.0) * low_weight(x, self.blacks.start, self.blacks.width);
        x += ZONE_GAIN
            * (pick(&self.shadows) - 1.0)
            * low_weight(x, self.shadows.start, (self.shadows.start - self.shadows.width).abs().max(1e-3));
        x += ZONE_GAIN * (pick(&self.midtones) - 1.0) * mid_weight(x, self.midtones.start, self.midtones.width);
        x += ZONE_GAIN
            * (pick(&self.highlights) - 1.0)
            * high_weight(x, self.highlights.start, (self.highlights.width - self.highlights.start).abs().max(1e-3));
        x += ZONE_GAIN * (pick(&self.whites) - 1.0) * high_weight(x, self.whites.start, self.whites.width);

        if self.s_contrast != 1.0 {
            let pivot = self.midtones.start;
            let spread = (self.midtones.width * 0.5).abs().max(1e-3);
            let d = x - pivot;
            x += SCONTRAST_GAIN * (self.s_contrast - 1.0) * d * bump(d.abs() / spread);
        }
        x
    }

    // The zone weights keep the slope bounded, so the forward curve is
    // monotone within the validated value range and bisection inverts it.
    fn invert(&self, y: f64, ch: usize) -> f64 {
        let mut lo = y - 2.0;
        let mut hi = y + 2.0;
        for _ in 0..64 {
            let mid = 0.5 * (lo + hi);
            if self.forward(mid, ch) < y {
                lo = mid;
            } else {
                hi = mid;
            }
        }
        0.5 * (lo + hi)
    }
}

fn smoothstep(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// 1 well below `start`, 0 above it, transitioning over `width`.
fn low_weight(x: f64, start: f64, width: f64) -> f64 {
    smoothstep((start - x) / width.abs().max(1e-3))
}

/// 0 below `start`, 1 well above it, transitioning over `width`.
fn high_weight(x: f64, start: f64, width: f64) -> f64 {
    smoothstep((x - start) / width.abs().max(1e-3))
}

/// A smooth bump centered on `center` with total extent `width`.
fn mid_weight(x: f64, center: f64, width: f64) -> f64 {
    bump((x - center).abs() / (width * 0.5).abs().max(1e-3))
}

fn bump(t: f64) -> f64 {
    smoothstep(1.0 - t)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn identity_passthrough() {
        for style in [GradingStyle::Log, GradingStyle::Linear, GradingStyle::Video] {
            let op = GradingToneOp::identity(style);
            assert!(op.is_identity());
            op.validate().unwrap();
            let mut px = [0.1, 0.4, 0.8, 1.0];
            op.apply(&mut px);
            assert_abs_diff_eq!(px[0], 0.1, epsilon = 1e-6);
            assert_abs_diff_eq!(px[1], 0.4, epsilon = 1e-6);
            assert_abs_diff_eq!(px[2], 0.8, epsilon = 1e-6);
        }
    }

    #[test]
    fn midtones_move_midtones_more_than_extremes() {
        let mut op = GradingToneOp::identity(GradingStyle::Log);
        op.midtones.master = 1.5;
        let mut mid = [0.4, 0.4, 0.4, 1.0];
        let mut dark = [0.02, 0.02, 0.02, 1.0];
        op.apply(&mut mid);
        op.apply(&mut dark);
        assert!(mid[0] > 0.4);
        assert!((dark[0] - 0.02).abs() < (mid[0] - 0.4).abs());
    }

    #[test]
    fn blacks_lift_shadows() {
        let mut op = GradingToneOp::identity(GradingStyle::Log);
        op.blacks.master = 1.5;
        let mut dark = [0.05, 0.05, 0.05, 1.0];
        let mut bright = [0.9, 0.9, 0.9, 1.0];
        op.apply(&mut dark);
        op.apply(&mut bright);
        assert!(dark[0] > 0.05);
        assert_abs_diff_eq!(bright[0], 0.9, epsilon = 1e-3);
    }

    #[test]
    fn scontrast_steepens_around_pivot() {
        let mut op = GradingToneOp::identity(GradingStyle::Log);
        op.s_contrast = 1.8;
        let mut lo = [0.3, 0.3, 0.3, 1.0];
        let mut hi = [0.5, 0.5, 0.5, 1.0];
        op.apply(&mut lo);
        op.apply(&mut hi);
        assert!(hi[0] - lo[0] > 0.2);
    }

    #[test]
    fn inverse_round_trips() {
        let mut op = GradingToneOp::identity(GradingStyle::Log);
        op.midtones.master = 1.4;
        op.blacks.red = 1.2;
        op.s_contrast = 1.3;
        let mut rev = op.clone();
        rev.direction = Direction::Inverse;

        let mut px = [0.15, 0.4, 0.75, 1.0];
        op.apply(&mut px);
        rev.apply(&mut px);
        assert_abs_diff_eq!(px[0], 0.15, epsilon = 1e-4);
        assert_abs_diff_eq!(px[1], 0.4, epsilon = 1e-4);
        assert_abs_diff_eq!(px[2], 0.75, epsilon = 1e-4);
    }

    #[test]
    fn validation_rules() {
        let mut op = GradingToneOp::identity(GradingStyle::Log);
        op.blacks.master = 2.5;
        assert!(op.validate().is_err());

        let mut op = GradingToneOp::identity(GradingStyle::Log);
        op.s_contrast = 0.0;
        assert!(op.validate().is_err());
    }
}
