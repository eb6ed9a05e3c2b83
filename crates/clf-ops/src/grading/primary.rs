//! Grading primary operator.

use crate::op::{Direction, OpBase};
use crate::{OpError, OpResult};

use super::{saturate, GradingRgbm, GradingStyle};

const MIN_DIVISOR: f64 = 1e-6;

/// Grading primary controls: the lift/gamma/gain family of adjustments,
/// with the active subset depending on the style.
#[derive(Debug, Clone, PartialEq)]
pub struct GradingPrimaryOp {
    /// Shared operator fields.
    pub base: OpBase,
    /// Math family.
    pub style: GradingStyle,
    /// Apply as authored or inverted.
    pub direction: Direction,
    /// Additive, log style.
    pub brightness: GradingRgbm,
    /// Multiplicative around the pivot.
    pub contrast: GradingRgbm,
    /// Power around the black/white pivots.
    pub gamma: GradingRgbm,
    /// Additive, linear and video styles.
    pub offset: GradingRgbm,
    /// Stops, linear style.
    pub exposure: GradingRgbm,
    /// Shadow control, video style.
    pub lift: GradingRgbm,
    /// Highlight control, video style.
    pub gain: GradingRgbm,
    /// Saturation, 1.0 is neutral.
    pub saturation: f64,
    /// Contrast pivot.
    pub pivot: f64,
    /// Gamma black pivot.
    pub pivot_black: f64,
    /// Gamma white pivot.
    pub pivot_white: f64,
    /// Low clamp; -inf disables.
    pub clamp_black: f64,
    /// High clamp; +inf disables.
    pub clamp_white: f64,
    /// Marked overridable at evaluation time.
    pub dynamic: bool,
}

impl GradingPrimaryOp {
    /// Identity controls for the given style.
    pub fn identity(style: GradingStyle) -> Self {
        Self {
            base: OpBase::default(),
            style,
            direction: Direction::Forward,
            brightness: GradingRgbm::zero(),
            contrast: GradingRgbm::one(),
            gamma: GradingRgbm::one(),
            offset: GradingRgbm::zero(),
            exposure: GradingRgbm::zero(),
            lift: GradingRgbm::zero(),
            gain: GradingRgbm::one(),
            saturation: 1.0,
            pivot: style.default_pivot(),
            pivot_black: 0.0,
            pivot_white: 1.0,
            clamp_black: f64::NEG_INFINITY,
            clamp_white: f64::INFINITY,
            dynamic: false,
        }
    }

    /// Checks the parameter set is legal.
    pub fn validate(&self) -> OpResult<()> {
        if self.saturation < 0.0 {
            return Err(OpError::validation("grading saturation must be non-negative"));
        }
        if self.clamp_black > self.clamp_white {
            return Err(OpError::validation("clamp black must not exceed clamp white"));
        }
        if self.pivot_black >= self.pivot_white {
            return Err(OpError::validation("pivot black must be below pivot white"));
        }
        for g in self.gamma.rgb_mul() {
            if g.abs() < MIN_DIVISOR {
                return Err(OpError::validation("grading gamma must be non-zero"));
            }
        }
        Ok(())
    }

    /// True when every control is at its identity value.
    pub fn is_identity(&self) -> bool {
        self.saturation == 1.0
            && self.brightness == GradingRgbm::zero()
            && self.contrast == GradingRgbm::one()
            && self.gamma == GradingRgbm::one()
            && self.offset == GradingRgbm::zero()
            && self.exposure == GradingRgbm::zero()
            && self.lift == GradingRgbm::zero()
            && self.gain == GradingRgbm::one()
            && self.clamp_black == f64::NEG_INFINITY
            && self.clamp_white == f64::INFINITY
    }

    /// Applies the grade to one sample; alpha passes through.
    pub fn apply(&self, rgba: &mut [f32; 4]) {
        let mut rgb = [rgba[0] as f64, rgba[1] as f64, rgba[2] as f64];
        match (self.style, self.direction) {
            (GradingStyle::Log, Direction::Forward) => self.log_fwd(&mut rgb),
            (GradingStyle::Log, Direction::Inverse) => self.log_rev(&mut rgb),
            (GradingStyle::Linear, Direction::Forward) => self.linear_fwd(&mut rgb),
            (GradingStyle::Linear, Direction::Inverse) => self.linear_rev(&mut rgb),
            (GradingStyle::Video, Direction::Forward) => self.video_fwd(&mut rgb),
            (GradingStyle::Video, Direction::Inverse) => self.video_rev(&mut rgb),
        }
        rgba[0] = rgb[0] as f32;
        rgba[1] = rgb[1] as f32;
        rgba[2] = rgb[2] as f32;
    }

    fn clamp(&self, rgb: &mut [f64; 3]) {
        for v in rgb.iter_mut() {
            *v = v.clamp(self.clamp_black, self.clamp_white);
        }
    }

    fn gamma_channel(&self, v: f64, gamma: f64) -> f64 {
        let range = (self.pivot_white - self.pivot_black).abs().max(MIN_DIVISOR);
        let shifted = v - self.pivot_black;
        shifted.signum() * (shifted.abs() / range).powf(gamma) * range + self.pivot_black
    }

    fn log_fwd(&self, rgb: &mut [f64; 3]) {
        let brightness = self.brightness.rgb_add();
        let contrast = self.contrast.rgb_mul();
        let gamma = self.gamma.rgb_mul();
        for ch in 0..3 {
            let mut v = rgb[ch] + brightness[ch];
            v = (v - self.pivot) * contrast[ch] + self.pivot;
            if gamma[ch] != 1.0 {
                v = self.gamma_channel(v, gamma[ch]);
            }
            rgb[ch] = v;
        }
        saturate(rgb, self.saturation);
        self.clamp(rgb);
    }

    fn log_rev(&self, rgb: &mut [f64; 3]) {
        self.clamp(rgb);
        if self.saturation != 0.0 {
            saturate(rgb, 1.0 / self.saturation);
        }
        let brightness = self.brightness.rgb_add();
        let contrast = self.contrast.rgb_mul();
        let gamma = self.gamma.rgb_mul();
        for ch in 0..3 {
            let mut v = rgb[ch];
            if gamma[ch] != 1.0 {
                v = self.gamma_channel(v, 1.0 / gamma[ch].abs().max(MIN_DIVISOR));
            }
            v = (v - self.pivot) / sign_max(contrast[ch]) + self.pivot;
            rgb[ch] = v - brightness[ch];
        }
    }

    fn linear_fwd(&self, rgb: &mut [f64; 3]) {
        let offset = self.offset.rgb_add();
        let exposure = self.exposure.rgb_add();
        let contrast = self.contrast.rgb_mul();
        let pivot = sign_max(self.pivot);
        for ch in 0..3 {
            let mut v = (rgb[ch] + offset[ch]) * 2f64.powf(exposure[ch]);
            if contrast[ch] != 1.0 {
                v = (v / pivot).abs().powf(contrast[ch]) * v.signum() * pivot;
            }
            rgb[ch] = v;
        }
        saturate(rgb, self.saturation);
        self.clamp(rgb);
    }

    fn linear_rev(&self, rgb: &mut [f64; 3]) {
        self.clamp(rgb);
        if self.saturation != 0.0 {
            saturate(rgb, 1.0 / self.saturation);
        }
        let offset = self.offset.rgb_add();
        let exposure = self.exposure.rgb_add();
        let contrast = self.contrast.rgb_mul();
        let pivot = sign_max(self.pivot);
        for ch in 0..3 {
            let mut v = rgb[ch];
            if contrast[ch] != 1.0 {
                v = (v / pivot).abs().powf(1.0 / sign_max(contrast[ch])) * v.signum() * pivot;
            }
            rgb[ch] = v / 2f64.powf(exposure[ch]) - offset[ch];
        }
    }

    fn video_fwd(&self, rgb: &mut [f64; 3]) {
        let lift = self.lift.rgb_add();
        let offset = self.offset.rgb_add();
        let gain = self.gain.rgb_mul();
        let gamma = self.gamma.rgb_mul();
        for ch in 0..3 {
            let mut v = rgb[ch] * gain[ch] + lift[ch] + offset[ch];
            if gamma[ch] != 1.0 {
                v = self.gamma_channel(v, gamma[ch]);
            }
            rgb[ch] = v;
        }
        saturate(rgb, self.saturation);
        self.clamp(rgb);
    }

    fn video_rev(&self, rgb: &mut [f64; 3]) {
        self.clamp(rgb);
        if self.saturation != 0.0 {
            saturate(rgb, 1.0 / self.saturation);
        }
        let lift = self.lift.rgb_add();
        let offset = self.offset.rgb_add();
        let gain = self.gain.rgb_mul();
        let gamma = self.gamma.rgb_mul();
        for ch in 0..3 {
            let mut v = rgb[ch];
            if gamma[ch] != 1.0 {
                v = self.gamma_channel(v, 1.0 / gamma[ch].abs().max(MIN_DIVISOR));
            }
            rgb[ch] = (v - lift[ch] - offset[ch]) / sign_max(gain[ch]);
        }
    }
}

fn sign_max(v: f64) -> f64 {
    if v.abs() < MIN_DIVISOR {
        if v < 0.0 { -MIN_DIVISOR } else { MIN_DIVISOR }
    } else {
        v
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn identity_passthrough() {
        for style in [GradingStyle::Log, GradingStyle::Linear, GradingStyle::Video] {
            let op = GradingPrimaryOp::identity(style);
            assert!(op.is_identity());
            op.validate().unwrap();
            let mut px = [0.2, 0.4, 0.6, 1.0];
            op.apply(&mut px);
            assert_abs_diff_eq!(px[0], 0.2, epsilon = 1e-6);
            assert_abs_diff_eq!(px[1], 0.4, epsilon = 1e-6);
            assert_abs_diff_eq!(px[2], 0.6, epsilon = 1e-6);
        }
    }

    #[test]
    fn log_brightness_adds() {
        let mut op = GradingPrimaryOp::identity(GradingStyle::Log);
        op.brightness.master = 0.1;
        let mut px = [0.5, 0.5, 0.5, 1.0];
        op.apply(&mut px);
        assert_abs_diff_eq!(px[0], 0.6, epsilon = 1e-6);
    }

    #[test]
    fn linear_exposure_in_stops() {
        let mut op = GradingPrimaryOp::identity(GradingStyle::Linear);
        op.exposure.master = 1.0;
        let mut px = [0.25, 0.25, 0.25, 1.0];
        op.apply(&mut px);
        assert_abs_diff_eq!(px[0], 0.5, epsilon = 1e-6);
    }

    #[test]
    fn forward_then_reverse_round_trips() {
        for style in [GradingStyle::Log, GradingStyle::Linear, GradingStyle::Video] {
            let mut op = GradingPrimaryOp::identity(style);
            op.contrast.master = 1.2;
            op.saturation = 1.1;
            op.offset.red = 0.05;
            op.brightness.green = 0.02;
            let mut rev = op.clone();
            rev.direction = Direction::Inverse;

            let mut px = [0.3, 0.45, 0.6, 1.0];
            op.apply(&mut px);
            rev.apply(&mut px);
            assert_abs_diff_eq!(px[0], 0.3, epsilon = 1e-4);
            assert_abs_diff_eq!(px[1], 0.45, epsilon = 1e-4);
            assert_abs_diff_eq!(px[2], 0.6, epsilon = 1e-4);
        }
    }

    #[test]
    fn clamping() {
        let mut op = GradingPrimaryOp::identity(GradingStyle::Log);
        op.clamp_black = 0.0;
        op.clamp_white = 1.0;
        let mut px = [-0.5, 0.5, 1.5, 1.0];
        op.apply(&mut px);
        assert_eq!(px[0], 0.0);
        assert_eq!(px[2], 1.0);
    }

    #[test]
    fn validation_rules() {
        let mut op = GradingPrimaryOp::identity(GradingStyle::Log);
        op.saturation = -1.0;
        assert!(op.validate().is_err());

        let mut op = GradingPrimaryOp::identity(GradingStyle::Log);
        op.clamp_black = 2.0;
        op.clamp_white = 1.0;
        assert!(op.validate().is_err());

        let mut op = GradingPrimaryOp::identity(GradingStyle::Log);
        op.gamma.master = 0.0;
        assert!(op.validate().is_err());
    }
}
