//! Exposure/contrast operator.

use crate::op::OpBase;
use crate::{OpError, OpResult};

/// Exposure/contrast application style; the spelling folds the
/// direction in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EcStyle {
    /// Scene-linear footage.
    #[default]
    Linear,
    /// Scene-linear, inverted.
    LinearRev,
    /// Display-referred footage.
    Video,
    /// Display-referred, inverted.
    VideoRev,
    /// Log-encoded footage.
    Log,
    /// Log-encoded, inverted.
    LogRev,
}

impl EcStyle {
    /// Parses an ExposureContrast `style` attribute value.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "linear" => Some(EcStyle::Linear),
            "linearrev" => Some(EcStyle::LinearRev),
            "video" => Some(EcStyle::Video),
            "videorev" => Some(EcStyle::VideoRev),
            "log" => Some(EcStyle::Log),
            "logrev" => Some(EcStyle::LogRev),
            _ => None,
        }
    }

    /// The attribute spelling written to files.
    pub fn as_str(self) -> &'static str {
        match self {
            EcStyle::Linear => "linear",
            EcStyle::LinearRev => "linearRev",
            EcStyle::Video => "video",
            EcStyle::VideoRev => "videoRev",
            EcStyle::Log => "log",
            EcStyle::LogRev => "logRev",
        }
    }

    fn is_reverse(self) -> bool {
        matches!(self, EcStyle::LinearRev | EcStyle::VideoRev | EcStyle::LogRev)
    }
}

/// An exposure/contrast operator.
///
/// Exposure is in stops, contrast and gamma multiply around the pivot.
/// The three adjustments may be flagged dynamic, allowing the evaluator
/// to override them per frame without re-reading the file.
#[derive(Debug, Clone, PartialEq)]
pub struct ExposureContrastOp {
    /// Shared operator fields.
    pub base: OpBase,
    /// Application style.
    pub style: EcStyle,
    /// Exposure in stops.
    pub exposure: f64,
    /// Contrast around the pivot.
    pub contrast: f64,
    /// Gamma, combined multiplicatively with contrast.
    pub gamma: f64,
    /// Pivot in scene-linear space.
    pub pivot: f64,
    /// Log-space size of one stop.
    pub log_exposure_step: f64,
    /// Log-space value of mid-gray.
    pub log_mid_gray: f64,
    /// Exposure may be overridden at evaluation time.
    pub exposure_dynamic: bool,
    /// Contrast may be overridden at evaluation time.
    pub contrast_dynamic: bool,
    /// Gamma may be overridden at evaluation time.
    pub gamma_dynamic: bool,
}

const VIDEO_OETF_POWER: f64 = 1.0 / 2.2;

impl Default for ExposureContrastOp {
    fn default() -> Self {
        Self {
            base: OpBase::default(),
            style: EcStyle::default(),
            exposure: 0.0,
            contrast: 1.0,
            gamma: 1.0,
            pivot: 0.18,
            log_exposure_step: 0.088,
            log_mid_gray: 0.435,
            exposure_dynamic: false,
            contrast_dynamic: false,
            gamma_dynamic: false,
        }
    }
}

impl ExposureContrastOp {
    /// Checks the parameter set is legal.
    pub fn validate(&self) -> OpResult<()> {
        if self.pivot <= 0.0 {
            return Err(OpError::validation("exposure/contrast pivot must be positive"));
        }
        if self.contrast <= 0.0 {
            return Err(OpError::validation("contrast must be positive"));
        }
        if self.gamma <= 0.0 {
            return Err(OpError::validation("gamma must be positive"));
        }
        if self.log_exposure_step <= 0.0 {
            return Err(OpError::validation("logExposureStep must be positive"));
        }
        Ok(())
    }

    /// True when no adjustment is active.
    pub fn is_identity(&self) -> bool {
        self.exposure == 0.0 && self.contrast == 1.0 && self.gamma == 1.0
    }

    /// Applies the adjustment to one sample; alpha passes through.
    pub fn apply(&self, rgba: &mut [f32; 4]) {
        for ch in 0..3 {
            let x = rgba[ch] as f64;
            rgba[ch] = if self.style.is_reverse() {
                self.reverse(x)
            } else {
                self.forward(x)
            } as f32;
        }
    }

    fn forward(&self, x: f64) -> f64 {
        let c = self.contrast * self.gamma;
        match self.style {
            EcStyle::Linear | EcStyle::LinearRev => {
                let scaled = x * 2f64.powf(self.exposure);
                apply_contrast(scaled, c, self.pivot)
            }
            EcStyle::Video | EcStyle::VideoRev => {
                let scaled = x * 2f64.powf(self.exposure).powf(VIDEO_OETF_POWER);
                apply_contrast(scaled, c, self.pivot.powf(VIDEO_OETF_POWER))
            }
            EcStyle::Log | EcStyle::LogRev => {
                let shifted = x + self.exposure * self.log_exposure_step;
                (shifted - self.log_mid_gray) * c + self.log_mid_gray
            }
        }
    }

    fn reverse(&self, y: f64) -> f64 {
        let c = self.contrast * self.gamma;
        match self.style {
            EcStyle::Linear | EcStyle::LinearRev => {
                let scaled = apply_contrast(y, 1.0 / c, self.pivot);
                scaled / 2f64.powf(self.exposure)
            }
            EcStyle::Video | EcStyle::VideoRev => {
                let scaled = apply_contrast(y, 1.0 / c, self.pivot.powf(VIDEO_OETF_POWER));
                scaled / 2f64.powf(self.exposure).powf(VIDEO_OETF_POWER)
            }
            EcStyle::Log | EcStyle::LogRev => {
                (y - self.log_mid_gray) / c + self.log_mid_gray
                    - self.exposure * self.log_exposure_step
            }
        }
    }
}

fn apply_contrast(v: f64, contrast: f64, pivot: f64) -> f64 {
    if contrast == 1.0 {
        v
    } else {
        (v / pivot).max(0.0).powf(contrast) * pivot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn identity_passthrough() {
        let op = ExposureContrastOp::default();
        assert!(op.is_identity());
        let mut px = [0.18, 0.5, 0.9, 1.0];
        op.apply(&mut px);
        assert_abs_diff_eq!(px[0], 0.18, epsilon = 1e-6);
        assert_abs_diff_eq!(px[1], 0.5, epsilon = 1e-6);
    }

    #[test]
    fn linear_exposure_doubles_per_stop() {
        let op = ExposureContrastOp { exposure: 1.0, ..Default::default() };
        let mut px = [0.25, 0.25, 0.25, 1.0];
        op.apply(&mut px);
        assert_abs_diff_eq!(px[0], 0.5, epsilon = 1e-6);
    }

    #[test]
    fn contrast_pivots_on_gray() {
        let op = ExposureContrastOp { contrast: 2.0, ..Default::default() };
        let mut px = [0.18, 0.36, 0.09, 1.0];
        op.apply(&mut px);
        // Pivot itself is unchanged.
        assert_abs_diff_eq!(px[0], 0.18, epsilon = 1e-6);
        assert!(px[1] > 0.36);
        assert!(px[2] < 0.09);
    }

    #[test]
    fn log_exposure_shifts_by_step() {
        let op = ExposureContrastOp {
            style: EcStyle::Log,
            exposure: 1.0,
            ..Default::default()
        };
        let mut px = [0.435, 0.435, 0.435, 1.0];
        op.apply(&mut px);
        assert_abs_diff_eq!(px[0], 0.435 + 0.088, epsilon = 1e-6);
    }

    #[test]
    fn reverse_styles_round_trip() {
        for (fwd, rev) in [
            (EcStyle::Linear, EcStyle::LinearRev),
            (EcStyle::Video, EcStyle::VideoRev),
            (EcStyle::Log, EcStyle::LogRev),
        ] {
            let f = ExposureContrastOp {
                style: fwd,
                exposure: 0.75,
                contrast: 1.3,
                gamma: 1.1,
                ..Default::default()
            };
            let r = ExposureContrastOp { style: rev, ..f.clone() };
            let mut px = [0.3, 0.18, 0.6, 1.0];
            f.apply(&mut px);
            r.apply(&mut px);
            assert_abs_diff_eq!(px[0], 0.3, epsilon = 1e-5);
            assert_abs_diff_eq!(px[1], 0.18, epsilon = 1e-5);
            assert_abs_diff_eq!(px[2], 0.6, epsilon = 1e-5);
        }
    }

    #[test]
    fn validation_rules() {
        let mut op = ExposureContrastOp::default();
        op.pivot = 0.0;
        assert!(op.validate().is_err());

        let mut op = ExposureContrastOp::default();
        op.contrast = -1.0;
        assert!(op.validate().is_err());
    }
}
