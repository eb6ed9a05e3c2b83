//! Grading RGB curve operator.

use crate::op::{Direction, OpBase};
use crate::OpResult;

use super::{BSplineCurve, GradingStyle};

/// Grading RGB curves: a spline per channel plus a master curve applied
/// to all three.
#[derive(Debug, Clone, PartialEq)]
pub struct GradingRgbCurveOp {
    /// Shared operator fields.
    pub base: OpBase,
    /// Math family.
    pub style: GradingStyle,
    /// Apply as authored or inverted.
    pub direction: Direction,
    /// Red curve.
    pub red: BSplineCurve,
    /// Green curve.
    pub green: BSplineCurve,
    /// Blue curve.
    pub blue: BSplineCurve,
    /// Master curve applied after the channel curves.
    pub master: BSplineCurve,
    /// Skip the lin-to-log conversion around the curves for the linear
    /// style.
    pub bypass_lin_to_log: bool,
    /// Marked overridable at evaluation time.
    pub dynamic: bool,
}

impl GradingRgbCurveOp {
    /// Identity curves for the given style.
    pub fn identity(style: GradingStyle) -> Self {
        Self {
            base: OpBase::default(),
            style,
            direction: Direction::Forward,
            red: BSplineCurve::identity(),
            green: BSplineCurve::identity(),
            blue: BSplineCurve::identity(),
            master: BSplineCurve::identity(),
            bypass_lin_to_log: false,
            dynamic: false,
        }
    }

    /// Checks every curve is usable.
    pub fn validate(&self) -> OpResult<()> {
        self.red.validate()?;
        self.green.validate()?;
        self.blue.validate()?;
        self.master.validate()?;
        Ok(())
    }

    /// True when every curve is the identity diagonal.
    pub fn is_identity(&self) -> bool {
        self.red.is_identity()
            && self.green.is_identity()
            && self.blue.is_identity()
            && self.master.is_identity()
    }

    /// Applies the curves to one sample; alpha passes through.
    ///
    /// The linear style evaluates in a log-like space unless bypassed.
    /// The inverse direction solves each curve numerically by bisection,
    /// which assumes the curve is increasing.
    pub fn apply(&self, rgba: &mut [f32; 4]) {
        let curves = [&self.red, &self.green, &self.blue];
        let to_log = self.style == GradingStyle::Linear && !self.bypass_lin_to_log;
        for ch in 0..3 {
            let mut v = rgba[ch] as f64;
            if to_log {
                v = lin_to_log(v);
            }
            v = match self.direction {
                Direction::Forward => self.master.evaluate(curves[ch].evaluate(v)),
                Direction::Inverse => invert_curve(curves[ch], invert_curve(&self.master, v)),
            };
            if to_log {
                v = log_to_lin(v);
            }
            rgba[ch] = v as f32;
        }
    }
}

// The linear grading style evaluates its curves in a log-like space so
// control points land at perceptually even positions. Mid-gray 0.18 maps
// to 0.5; below the break the curve continues with its tangent.
const LOG_X_BREAK: f64 = 0.0041318374739483946;

fn log_segment(x: f64) -> f64 {
    (x / 0.18).log2() / 10.5 + 0.5
}

fn log_break_slope() -> f64 {
    1.0 / (LOG_X_BREAK * std::f64::consts::LN_2 * 10.5)
}

fn lin_to_log(x: f64) -> f64 {
    if x < LOG_X_BREAK {
        log_segment(LOG_X_BREAK) + log_break_slope() * (x - LOG_X_BREAK)
    } else {
        log_segment(x)
    }
}

fn log_to_lin(y: f64) -> f64 {
    let y_break = log_segment(LOG_X_BREAK);
    if y < y_break {
        LOG_X_BREAK + (y - y_break) / log_break_slope()
    } else {
        0.18 * 2f64.powf((y - 0.5) * 10.5)
    }
}

fn invert_curve(curve: &BSplineCurve, y: f64) -> f64 {
    let (first, last) = match (curve.points.first(), curve.points.last()) {
        (Some(&f), Some(&l)) => (f, l),
        _ => return y,
    };
    // Bracket the answer, extending beyond the control range for the
    // linear extrapolation segments.
    let span = (last.0 - first.0).max(1e-3);
    let mut lo = first.0 - 2.0 * span;
    let mut hi = last.0 + 2.0 * span;
    for _ in 0..64 {
        let mid = 0.5 * (lo + hi);
        if curve.evaluate(mid) < y {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    0.5 * (lo + hi)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn identity_passthrough() {
        let op = GradingRgbCurveOp::identity(GradingStyle::Log);
        op.validate().unwrap();
        assert!(op.is_identity());
        let mut px = [0.1, 0.5, 0.9, 1.0];
        op.apply(&mut px);
        assert_abs_diff_eq!(px[0], 0.1, epsilon = 1e-5);
        assert_abs_diff_eq!(px[1], 0.5, epsilon = 1e-5);
        assert_abs_diff_eq!(px[2], 0.9, epsilon = 1e-5);
    }

    #[test]
    fn linear_style_log_space_round_trips() {
        let op = GradingRgbCurveOp::identity(GradingStyle::Linear);
        let mut px = [0.18, 0.02, 1.5, 1.0];
        op.apply(&mut px);
        assert_abs_diff_eq!(px[0], 0.18, epsilon = 1e-5);
        assert_abs_diff_eq!(px[1], 0.02, epsilon = 1e-5);
        assert_abs_diff_eq!(px[2], 1.5, epsilon = 1e-4);
    }

    #[test]
    fn channel_curve_applies_per_channel() {
        let mut op = GradingRgbCurveOp::identity(GradingStyle::Log);
        op.red = BSplineCurve {
            points: vec![(0.0, 0.0), (1.0, 2.0)],
            slopes: Vec::new(),
        };
        let mut px = [0.5, 0.5, 0.5, 1.0];
        op.apply(&mut px);
        assert_abs_diff_eq!(px[0], 1.0, epsilon = 1e-5);
        assert_abs_diff_eq!(px[1], 0.5, epsilon = 1e-5);
    }

    #[test]
    fn inverse_round_trips() {
        let mut op = GradingRgbCurveOp::identity(GradingStyle::Log);
        op.master = BSplineCurve {
            points: vec![(0.0, 0.0), (0.5, 0.6), (1.0, 1.0)],
            slopes: Vec::new(),
        };
        let mut rev = op.clone();
        rev.direction = Direction::Inverse;

        let mut px = [0.3, 0.5, 0.7, 1.0];
        op.apply(&mut px);
        rev.apply(&mut px);
        assert_abs_diff_eq!(px[0], 0.3, epsilon = 1e-4);
        assert_abs_diff_eq!(px[1], 0.5, epsilon = 1e-4);
        assert_abs_diff_eq!(px[2], 0.7, epsilon = 1e-4);
    }
}
