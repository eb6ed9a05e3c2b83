//! Log operator.

use crate::op::OpBase;
use crate::{OpError, OpResult};

/// Log application style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogStyle {
    /// `log10(x)`.
    #[default]
    Log10,
    /// `log2(x)`.
    Log2,
    /// `10^x`.
    AntiLog10,
    /// `2^x`.
    AntiLog2,
    /// Parameterized lin-to-log curve.
    LinToLog,
    /// Parameterized log-to-lin curve.
    LogToLin,
    /// Camera curve with a linear segment below the break, lin side in.
    CameraLinToLog,
    /// Camera curve with a linear segment below the break, log side in.
    CameraLogToLin,
}

impl LogStyle {
    /// Parses a Log `style` attribute value.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "log10" => Some(LogStyle::Log10),
            "log2" => Some(LogStyle::Log2),
            "antilog10" => Some(LogStyle::AntiLog10),
            "antilog2" => Some(LogStyle::AntiLog2),
            "lintolog" => Some(LogStyle::LinToLog),
            "logtolin" => Some(LogStyle::LogToLin),
            "cameralintolog" => Some(LogStyle::CameraLinToLog),
            "cameralogtolin" => Some(LogStyle::CameraLogToLin),
            _ => None,
        }
    }

    /// The attribute spelling written to files.
    pub fn as_str(self) -> &'static str {
        match self {
            LogStyle::Log10 => "log10",
            LogStyle::Log2 => "log2",
            LogStyle::AntiLog10 => "antiLog10",
            LogStyle::AntiLog2 => "antiLog2",
            LogStyle::LinToLog => "linToLog",
            LogStyle::LogToLin => "logToLin",
            LogStyle::CameraLinToLog => "cameraLinToLog",
            LogStyle::CameraLogToLin => "cameraLogToLin",
        }
    }

    /// True for the camera styles, which require a `linSideBreak`.
    pub fn is_camera(self) -> bool {
        matches!(self, LogStyle::CameraLinToLog | LogStyle::CameraLogToLin)
    }

    /// True when the style maps from the log side to the lin side.
    pub fn decodes_log(self) -> bool {
        matches!(
            self,
            LogStyle::AntiLog10 | LogStyle::AntiLog2 | LogStyle::LogToLin | LogStyle::CameraLogToLin
        )
    }

    /// True when the style was introduced with CTF 2.0 / CLF 3.
    pub fn requires_v2(self) -> bool {
        self.is_camera()
    }
}

/// One channel's log parameters, in the modern parameterization:
///
/// ```text
/// log = logSideSlope * log_base(linSideSlope * lin + linSideOffset) + logSideOffset
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LogParams {
    /// Multiplier on the linear side.
    pub lin_side_slope: f64,
    /// Offset on the linear side.
    pub lin_side_offset: f64,
    /// Multiplier on the log side.
    pub log_side_slope: f64,
    /// Offset on the log side.
    pub log_side_offset: f64,
    /// Linear-side value below which the camera styles go linear.
    pub lin_side_break: Option<f64>,
    /// Slope of the linear segment; derived for continuity when absent.
    pub linear_slope: Option<f64>,
}

impl Default for LogParams {
    fn default() -> Self {
        Self {
            lin_side_slope: 1.0,
            lin_side_offset: 0.0,
            log_side_slope: 1.0,
            log_side_offset: 0.0,
            lin_side_break: None,
            linear_slope: None,
        }
    }
}

impl LogParams {
    /// Converts the legacy Cineon parameterization (`gamma`, `refWhite`,
    /// `refBlack`, `highlight`, `shadow`) to the modern set with base 10.
    ///
    /// Reference white and black are 10-bit code values; highlight and
    /// shadow are normalized linear values.
    pub fn from_cineon(
        gamma: f64,
        ref_white: f64,
        ref_black: f64,
        highlight: f64,
        shadow: f64,
    ) -> LogParams {
        const DENSITY_PER_CODE: f64 = 0.002 / 0.6;

        // Negative by construction; keep it away from zero so the gain
        // below stays finite.
        let exponent = ((ref_black - ref_white) * DENSITY_PER_CODE * gamma).min(-0.0001);
        let black_offset = 10f64.powf(exponent);
        let gain = (highlight - shadow) / (1.0 - black_offset);

        LogParams {
            log_side_slope: 1.0 / (1023.0 * DENSITY_PER_CODE * gamma),
            log_side_offset: ref_white / 1023.0,
            lin_side_slope: 1.0 / gain,
            lin_side_offset: black_offset - shadow / gain,
            lin_side_break: None,
            linear_slope: None,
        }
    }
}

/// A Log operator with per-channel (RGB) parameters and a shared base.
#[derive(Debug, Clone, PartialEq)]
pub struct LogOp {
    /// Shared operator fields.
    pub base: OpBase,
    /// Application style.
    pub style: LogStyle,
    /// Logarithm base, identical across channels.
    pub log_base: f64,
    /// Parameters for R, G and B.
    pub params: [LogParams; 3],
}

impl Default for LogOp {
    fn default() -> Self {
        Self {
            base: OpBase::default(),
            style: LogStyle::default(),
            log_base: 2.0,
            params: [LogParams::default(); 3],
        }
    }
}

impl LogOp {
    /// Checks the parameter set is legal for the chosen style.
    pub fn validate(&self) -> OpResult<()> {
        if self.log_base <= 0.0 || self.log_base == 1.0 {
            return Err(OpError::validation(format!(
                "log base {} is not a valid base",
                self.log_base
            )));
        }
        for p in &self.params {
            if p.log_side_slope == 0.0 {
                return Err(OpError::validation("logSideSlope must be non-zero"));
            }
            if p.lin_side_slope == 0.0 {
                return Err(OpError::validation("linSideSlope must be non-zero"));
            }
            if self.style.is_camera() && p.lin_side_break.is_none() {
                return Err(OpError::validation(
                    "camera log styles require a linSideBreak parameter",
                ));
            }
            if !self.style.is_camera() && p.lin_side_break.is_some() {
                return Err(OpError::validation(
                    "linSideBreak is only allowed for the camera log styles",
                ));
            }
        }
        Ok(())
    }

    /// Applies the curve to one sample; alpha passes through.
    pub fn apply(&self, rgba: &mut [f32; 4]) {
        for ch in 0..3 {
            let x = rgba[ch] as f64;
            rgba[ch] = if self.style.decodes_log() {
                self.log_to_lin(x, &self.params[ch])
            } else {
                self.lin_to_log(x, &self.params[ch])
            } as f32;
        }
    }

    fn lin_to_log(&self, x: f64, p: &LogParams) -> f64 {
        if let Some(brk) = p.lin_side_break {
            if x <= brk {
                let (slope, offset) = self.linear_segment(p, brk);
                return slope * x + offset;
            }
        }
        let arg = (p.lin_side_slope * x + p.lin_side_offset).max(f64::MIN_POSITIVE);
        p.log_side_slope * arg.log(self.log_base) + p.log_side_offset
    }

    fn log_to_lin(&self, y: f64, p: &LogParams) -> f64 {
        if let Some(brk) = p.lin_side_break {
            let (slope, offset) = self.linear_segment(p, brk);
            let log_at_break = slope * brk + offset;
            if y <= log_at_break {
                return (y - offset) / slope;
            }
        }
        (self.log_base.powf((y - p.log_side_offset) / p.log_side_slope) - p.lin_side_offset)
            / p.lin_side_slope
    }

    fn linear_segment(&self, p: &LogParams, brk: f64) -> (f64, f64) {
        let arg = (p.lin_side_slope * brk + p.lin_side_offset).max(f64::MIN_POSITIVE);
        let slope = p.linear_slope.unwrap_or_else(|| {
            // Slope of the log segment at the break point.
            p.log_side_slope * p.lin_side_slope / (arg * self.log_base.ln())
        });
        let log_at_break = p.log_side_slope * arg.log(self.log_base) + p.log_side_offset;
        (slope, log_at_break - slope * brk)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn plain_log10() {
        let op = LogOp { style: LogStyle::Log10, log_base: 10.0, ..Default::default() };
        let mut px = [100.0, 10.0, 1.0, 1.0];
        op.apply(&mut px);
        assert_abs_diff_eq!(px[0], 2.0, epsilon = 1e-6);
        assert_abs_diff_eq!(px[1], 1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(px[2], 0.0, epsilon = 1e-6);
    }

    #[test]
    fn anti_log_round_trips() {
        let fwd = LogOp { style: LogStyle::Log2, log_base: 2.0, ..Default::default() };
        let rev = LogOp { style: LogStyle::AntiLog2, log_base: 2.0, ..Default::default() };
        let mut px = [0.18, 1.0, 4.0, 1.0];
        fwd.apply(&mut px);
        rev.apply(&mut px);
        assert_abs_diff_eq!(px[0], 0.18, epsilon = 1e-5);
        assert_abs_diff_eq!(px[2], 4.0, epsilon = 1e-4);
    }

    #[test]
    fn lin_to_log_with_params() {
        let params = LogParams {
            lin_side_slope: 2.0,
            lin_side_offset: 0.1,
            log_side_slope: 0.5,
            log_side_offset: 0.7,
            ..Default::default()
        };
        let op = LogOp {
            style: LogStyle::LinToLog,
            log_base: 10.0,
            params: [params; 3],
            ..Default::default()
        };
        let mut px = [0.45, 0.45, 0.45, 1.0];
        op.apply(&mut px);
        // 0.5 * log10(2*0.45 + 0.1) + 0.7 = 0.7
        assert_abs_diff_eq!(px[0], 0.7, epsilon = 1e-6);

        let rev = LogOp { style: LogStyle::LogToLin, ..op };
        rev.apply(&mut px);
        assert_abs_diff_eq!(px[0], 0.45, epsilon = 1e-6);
    }

    #[test]
    fn cineon_conversion_hits_reference_points() {
        // Classic Cineon: refWhite 685, refBlack 95, unity gamma at the
        // reference points.
        let p = LogParams::from_cineon(0.6, 685.0, 95.0, 1.0, 0.0);
        let op = LogOp {
            style: LogStyle::LogToLin,
            log_base: 10.0,
            params: [p; 3],
            ..Default::default()
        };

        // Reference white decodes to 1.0, reference black to 0.0.
        let mut px = [685.0 / 1023.0, 95.0 / 1023.0, 0.0, 1.0];
        op.apply(&mut px);
        assert_abs_diff_eq!(px[0], 1.0, epsilon = 1e-5);
        assert_abs_diff_eq!(px[1], 0.0, epsilon = 1e-5);
    }

    #[test]
    fn camera_styles_are_continuous_at_break() {
        let params = LogParams {
            lin_side_break: Some(0.01),
            ..Default::default()
        };
        let op = LogOp {
            style: LogStyle::CameraLinToLog,
            log_base: 2.0,
            params: [params; 3],
            ..Default::default()
        };
        let mut at_break = [0.01, 0.0, 0.0, 1.0];
        let mut above = [0.010001, 0.0, 0.0, 1.0];
        op.apply(&mut at_break);
        op.apply(&mut above);
        assert_abs_diff_eq!(at_break[0], above[0], epsilon = 1e-3);

        let rev = LogOp { style: LogStyle::CameraLogToLin, ..op };
        let mut px = [0.005, 0.0, 0.0, 1.0];
        let orig = px[0];
        let fwd = LogOp { style: LogStyle::CameraLinToLog, ..rev.clone() };
        fwd.apply(&mut px);
        rev.apply(&mut px);
        assert_abs_diff_eq!(px[0], orig, epsilon = 1e-6);
    }

    #[test]
    fn validation_rules() {
        let mut op = LogOp::default();
        op.log_base = 1.0;
        assert!(op.validate().is_err());

        let mut op = LogOp::default();
        op.params[0].log_side_slope = 0.0;
        assert!(op.validate().is_err());

        let mut op = LogOp { style: LogStyle::CameraLinToLog, ..Default::default() };
        assert!(op.validate().is_err());
        op.params = [LogParams { lin_side_break: Some(0.1), ..Default::default() }; 3];
        assert!(op.validate().is_ok());

        let mut op = LogOp::default();
        op.params[1].lin_side_break = Some(0.1);
        assert!(op.validate().is_err());
    }
}
