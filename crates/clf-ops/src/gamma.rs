//! Gamma (power curve) operator.

use crate::op::OpBase;
use crate::{OpError, OpResult};

/// Gamma application style.
///
/// The mirror and pass-through styles arrived with CTF 2.0 / CLF 3; the
/// reader enforces version availability, this record only checks the
/// parameters fit the style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GammaStyle {
    /// `max(0, x)^g`.
    #[default]
    BasicFwd,
    /// `max(0, x)^(1/g)`.
    BasicRev,
    /// Mirrored basic curve: `sign(x) * |x|^g`.
    BasicMirrorFwd,
    /// Mirrored basic curve, reversed.
    BasicMirrorRev,
    /// Basic curve for positives, negatives unchanged.
    BasicPassThruFwd,
    /// Basic curve reversed for positives, negatives unchanged.
    BasicPassThruRev,
    /// Monitor curve: power segment with a linear toe.
    MoncurveFwd,
    /// Monitor curve, reversed.
    MoncurveRev,
    /// Mirrored monitor curve.
    MoncurveMirrorFwd,
    /// Mirrored monitor curve, reversed.
    MoncurveMirrorRev,
}

impl GammaStyle {
    /// Parses a Gamma/Exponent `style` attribute value.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "basicfwd" => Some(GammaStyle::BasicFwd),
            "basicrev" => Some(GammaStyle::BasicRev),
            "basicmirrorfwd" => Some(GammaStyle::BasicMirrorFwd),
            "basicmirrorrev" => Some(GammaStyle::BasicMirrorRev),
            "basicpassthrufwd" => Some(GammaStyle::BasicPassThruFwd),
            "basicpassthrurev" => Some(GammaStyle::BasicPassThruRev),
            "moncurvefwd" => Some(GammaStyle::MoncurveFwd),
            "moncurverev" => Some(GammaStyle::MoncurveRev),
            "moncurvemirrorfwd" => Some(GammaStyle::MoncurveMirrorFwd),
            "moncurvemirrorrev" => Some(GammaStyle::MoncurveMirrorRev),
            _ => None,
        }
    }

    /// The attribute spelling written to files.
    pub fn as_str(self) -> &'static str {
        match self {
            GammaStyle::BasicFwd => "basicFwd",
            GammaStyle::BasicRev => "basicRev",
            GammaStyle::BasicMirrorFwd => "basicMirrorFwd",
            GammaStyle::BasicMirrorRev => "basicMirrorRev",
            GammaStyle::BasicPassThruFwd => "basicPassThruFwd",
            GammaStyle::BasicPassThruRev => "basicPassThruRev",
            GammaStyle::MoncurveFwd => "moncurveFwd",
            GammaStyle::MoncurveRev => "moncurveRev",
            GammaStyle::MoncurveMirrorFwd => "moncurveMirrorFwd",
            GammaStyle::MoncurveMirrorRev => "moncurveMirrorRev",
        }
    }

    /// True for the monitor-curve family, which requires an offset.
    pub fn is_moncurve(self) -> bool {
        matches!(
            self,
            GammaStyle::MoncurveFwd
                | GammaStyle::MoncurveRev
                | GammaStyle::MoncurveMirrorFwd
                | GammaStyle::MoncurveMirrorRev
        )
    }

    /// True when the style was introduced with CTF 2.0 / CLF 3.
    pub fn requires_v2(self) -> bool {
        matches!(
            self,
            GammaStyle::BasicMirrorFwd
                | GammaStyle::BasicMirrorRev
                | GammaStyle::BasicPassThruFwd
                | GammaStyle::BasicPassThruRev
                | GammaStyle::MoncurveMirrorFwd
                | GammaStyle::MoncurveMirrorRev
        )
    }
}

/// One channel's gamma parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GammaParams {
    /// Exponent.
    pub gamma: f64,
    /// Linear-toe offset; only meaningful for monitor-curve styles.
    pub offset: f64,
}

impl Default for GammaParams {
    fn default() -> Self {
        Self { gamma: 1.0, offset: 0.0 }
    }
}

impl GammaParams {
    /// Identity parameters.
    pub fn identity() -> Self {
        Self::default()
    }
}

/// A Gamma operator with per-channel (RGBA) parameters.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GammaOp {
    /// Shared operator fields.
    pub base: OpBase,
    /// Application style.
    pub style: GammaStyle,
    /// Parameters for R, G, B and A.
    pub params: [GammaParams; 4],
}

impl GammaOp {
    /// Checks the parameter set is legal for the chosen style.
    pub fn validate(&self) -> OpResult<()> {
        for (ch, p) in self.params.iter().enumerate() {
            if self.style.is_moncurve() {
                if !(1.0..=10.0).contains(&p.gamma) {
                    return Err(OpError::validation(format!(
                        "moncurve gamma {} for channel {ch} is outside [1, 10]",
                        p.gamma
                    )));
                }
                if !(0.0..=0.9).contains(&p.offset) {
                    return Err(OpError::validation(format!(
                        "moncurve offset {} for channel {ch} is outside [0, 0.9]",
                        p.offset
                    )));
                }
            } else {
                if !(0.01..=100.0).contains(&p.gamma) {
                    return Err(OpError::validation(format!(
                        "basic gamma {} for channel {ch} is outside [0.01, 100]",
                        p.gamma
                    )));
                }
                if p.offset != 0.0 {
                    return Err(OpError::validation(
                        "basic gamma styles do not accept an offset",
                    ));
                }
            }
        }
        Ok(())
    }

    /// True when every channel is identity.
    pub fn is_identity(&self) -> bool {
        self.params.iter().all(|p| p.gamma == 1.0 && p.offset == 0.0)
    }

    /// Applies the curve to one sample, alpha included.
    pub fn apply(&self, rgba: &mut [f32; 4]) {
        for ch in 0..4 {
            rgba[ch] = self.eval(rgba[ch] as f64, self.params[ch]) as f32;
        }
    }

    fn eval(&self, x: f64, p: GammaParams) -> f64 {
        match self.style {
            GammaStyle::BasicFwd => x.max(0.0).powf(p.gamma),
            GammaStyle::BasicRev => x.max(0.0).powf(1.0 / p.gamma),
            GammaStyle::BasicMirrorFwd => x.signum() * x.abs().powf(p.gamma),
            GammaStyle::BasicMirrorRev => x.signum() * x.abs().powf(1.0 / p.gamma),
            GammaStyle::BasicPassThruFwd => {
                if x < 0.0 { x } else { x.powf(p.gamma) }
            }
            GammaStyle::BasicPassThruRev => {
                if x < 0.0 { x } else { x.powf(1.0 / p.gamma) }
            }
            GammaStyle::MoncurveFwd => moncurve_fwd(x.max(0.0), p),
            GammaStyle::MoncurveRev => moncurve_rev(x.max(0.0), p),
            GammaStyle::MoncurveMirrorFwd => x.signum() * moncurve_fwd(x.abs(), p),
            GammaStyle::MoncurveMirrorRev => x.signum() * moncurve_rev(x.abs(), p),
        }
    }
}

fn moncurve_fwd(x: f64, p: GammaParams) -> f64 {
    if p.gamma <= 1.0 || p.offset == 0.0 {
        return x.powf(p.gamma);
    }
    let x_break = p.offset / (p.gamma - 1.0);
    if x >= x_break {
        ((x + p.offset) / (1.0 + p.offset)).powf(p.gamma)
    } else {
        let y_break =
            (p.gamma * p.offset / ((p.gamma - 1.0) * (1.0 + p.offset))).powf(p.gamma);
        x * (y_break / x_break)
    }
}

fn moncurve_rev(y: f64, p: GammaParams) -> f64 {
    if p.gamma <= 1.0 || p.offset == 0.0 {
        return y.powf(1.0 / p.gamma);
    }
    let x_break = p.offset / (p.gamma - 1.0);
    let y_break = (p.gamma * p.offset / ((p.gamma - 1.0) * (1.0 + p.offset))).powf(p.gamma);
    if y >= y_break {
        (1.0 + p.offset) * y.powf(1.0 / p.gamma) - p.offset
    } else {
        y * (x_break / y_break)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn op(style: GammaStyle, gamma: f64, offset: f64) -> GammaOp {
        GammaOp {
            style,
            params: [GammaParams { gamma, offset }; 4],
            ..Default::default()
        }
    }

    #[test]
    fn basic_forward_and_reverse() {
        let fwd = op(GammaStyle::BasicFwd, 2.0, 0.0);
        let mut px = [0.5, 0.5, 0.5, 0.5];
        fwd.apply(&mut px);
        assert_abs_diff_eq!(px[0], 0.25, epsilon = 1e-6);

        let rev = op(GammaStyle::BasicRev, 2.0, 0.0);
        rev.apply(&mut px);
        assert_abs_diff_eq!(px[0], 0.5, epsilon = 1e-6);
    }

    #[test]
    fn basic_clamps_negatives_mirror_does_not() {
        let basic = op(GammaStyle::BasicFwd, 2.0, 0.0);
        let mut px = [-0.5, 0.0, 0.0, 1.0];
        basic.apply(&mut px);
        assert_eq!(px[0], 0.0);

        let mirror = op(GammaStyle::BasicMirrorFwd, 2.0, 0.0);
        let mut px = [-0.5, 0.0, 0.0, 1.0];
        mirror.apply(&mut px);
        assert_abs_diff_eq!(px[0], -0.25, epsilon = 1e-6);

        let pass = op(GammaStyle::BasicPassThruFwd, 2.0, 0.0);
        let mut px = [-0.5, 0.0, 0.0, 1.0];
        pass.apply(&mut px);
        assert_abs_diff_eq!(px[0], -0.5, epsilon = 1e-6);
    }

    #[test]
    fn moncurve_matches_srgb_toe() {
        // gamma 2.4 / offset 0.055 is the sRGB EOTF shape.
        let fwd = op(GammaStyle::MoncurveFwd, 2.4, 0.055);
        let mut px = [0.5, 0.0, 0.0, 1.0];
        fwd.apply(&mut px);
        assert_abs_diff_eq!(px[0], 0.21404, epsilon = 1e-4);

        // The toe is linear with slope ~1/12.92.
        let mut px = [0.002, 0.0, 0.0, 1.0];
        fwd.apply(&mut px);
        assert_abs_diff_eq!(px[0], 0.002 / 12.92, epsilon = 1e-5);
    }

    #[test]
    fn moncurve_round_trip() {
        let fwd = op(GammaStyle::MoncurveFwd, 2.2, 0.1);
        let rev = op(GammaStyle::MoncurveRev, 2.2, 0.1);
        for x in [0.0, 0.01, 0.2, 0.7, 1.0] {
            let mut px = [x, x, x, 1.0];
            fwd.apply(&mut px);
            rev.apply(&mut px);
            assert_abs_diff_eq!(px[0], x, epsilon = 1e-5);
        }
    }

    #[test]
    fn validation_rules() {
        assert!(op(GammaStyle::BasicFwd, 2.2, 0.0).validate().is_ok());
        assert!(op(GammaStyle::BasicFwd, 0.0, 0.0).validate().is_err());
        assert!(op(GammaStyle::BasicFwd, 2.2, 0.1).validate().is_err());
        assert!(op(GammaStyle::MoncurveFwd, 2.4, 0.055).validate().is_ok());
        assert!(op(GammaStyle::MoncurveFwd, 0.5, 0.055).validate().is_err());
        assert!(op(GammaStyle::MoncurveFwd, 2.4, 1.5).validate().is_err());
    }

    #[test]
    fn style_parsing() {
        assert_eq!(GammaStyle::parse("basicFwd"), Some(GammaStyle::BasicFwd));
        assert_eq!(GammaStyle::parse("MONCURVEREV"), Some(GammaStyle::MoncurveRev));
        assert_eq!(GammaStyle::parse("cubic"), None);
        assert!(GammaStyle::BasicMirrorFwd.requires_v2());
        assert!(!GammaStyle::MoncurveFwd.requires_v2());
    }
}
