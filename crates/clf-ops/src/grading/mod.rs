//! CTF 2.0 grading operators.
//!
//! Three operators cover interactive grading controls: primaries
//! (brightness/contrast/gamma/offset/exposure/lift/gain), per-channel
//! spline curves, and tonal zone adjustments. All three support dynamic
//! overrides at evaluation time; the file only records the marker.

mod primary;
mod rgb_curve;
mod spline;
mod tone;

pub use primary::GradingPrimaryOp;
pub use rgb_curve::GradingRgbCurveOp;
pub use spline::BSplineCurve;
pub use tone::GradingToneOp;

use crate::op::Direction;

/// Grading math family, chosen by the kind of footage being graded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GradingStyle {
    /// Log-encoded footage.
    #[default]
    Log,
    /// Scene-linear footage.
    Linear,
    /// Display-referred footage.
    Video,
}

impl GradingStyle {
    /// Parses a grading `style` attribute value, which folds the
    /// direction into the spelling (`log`, `logRev`, ...).
    pub fn parse(s: &str) -> Option<(Self, Direction)> {
        match s.to_ascii_lowercase().as_str() {
            "log" => Some((GradingStyle::Log, Direction::Forward)),
            "logrev" => Some((GradingStyle::Log, Direction::Inverse)),
            "linear" => Some((GradingStyle::Linear, Direction::Forward)),
            "linearrev" => Some((GradingStyle::Linear, Direction::Inverse)),
            "video" => Some((GradingStyle::Video, Direction::Forward)),
            "videorev" => Some((GradingStyle::Video, Direction::Inverse)),
            _ => None,
        }
    }

    /// The attribute spelling written to files for the given direction.
    pub fn as_str(self, direction: Direction) -> &'static str {
        match (self, direction) {
            (GradingStyle::Log, Direction::Forward) => "log",
            (GradingStyle::Log, Direction::Inverse) => "logRev",
            (GradingStyle::Linear, Direction::Forward) => "linear",
            (GradingStyle::Linear, Direction::Inverse) => "linearRev",
            (GradingStyle::Video, Direction::Forward) => "video",
            (GradingStyle::Video, Direction::Inverse) => "videoRev",
        }
    }

    /// Default contrast pivot for the style.
    pub fn default_pivot(self) -> f64 {
        match self {
            GradingStyle::Log => -0.2,
            GradingStyle::Linear | GradingStyle::Video => 0.18,
        }
    }
}

/// A red/green/blue/master control. Master combines with the channels
/// additively or multiplicatively depending on the parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradingRgbm {
    /// Red adjustment.
    pub red: f64,
    /// Green adjustment.
    pub green: f64,
    /// Blue adjustment.
    pub blue: f64,
    /// Master adjustment applied to all channels.
    pub master: f64,
}

impl GradingRgbm {
    /// All channels zero (identity for additive controls).
    pub fn zero() -> Self {
        Self { red: 0.0, green: 0.0, blue: 0.0, master: 0.0 }
    }

    /// All channels one (identity for multiplicative controls).
    pub fn one() -> Self {
        Self { red: 1.0, green: 1.0, blue: 1.0, master: 1.0 }
    }

    /// Channel + master, for additive controls.
    #[inline]
    pub fn rgb_add(&self) -> [f64; 3] {
        [self.red + self.master, self.green + self.master, self.blue + self.master]
    }

    /// Channel * master, for multiplicative controls.
    #[inline]
    pub fn rgb_mul(&self) -> [f64; 3] {
        [self.red * self.master, self.green * self.master, self.blue * self.master]
    }
}

impl Default for GradingRgbm {
    fn default() -> Self {
        Self::zero()
    }
}

/// A red/green/blue/master control with a zone position: `start`/`width`
/// for blacks, whites and midtones, `start`/`pivot` for shadows and
/// highlights.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradingRgbmsw {
    /// Red adjustment.
    pub red: f64,
    /// Green adjustment.
    pub green: f64,
    /// Blue adjustment.
    pub blue: f64,
    /// Master adjustment applied to all channels.
    pub master: f64,
    /// Zone start (or center for midtones).
    pub start: f64,
    /// Zone width (or pivot for shadows/highlights).
    pub width: f64,
}

impl GradingRgbmsw {
    /// Identity control at the given zone position.
    pub fn identity(start: f64, width: f64) -> Self {
        Self { red: 1.0, green: 1.0, blue: 1.0, master: 1.0, start, width }
    }

    /// True when all four adjustments are 1.
    pub fn is_identity(&self) -> bool {
        self.red == 1.0 && self.green == 1.0 && self.blue == 1.0 && self.master == 1.0
    }

    /// Channel * master.
    #[inline]
    pub fn rgb_mul(&self) -> [f64; 3] {
        [self.red * self.master, self.green * self.master, self.blue * self.master]
    }
}

pub(crate) const LUMA_R: f64 = 0.2126;
pub(crate) const LUMA_G: f64 = 0.7152;
pub(crate) const LUMA_B: f64 = 0.0722;

pub(crate) fn saturate(rgb: &mut [f64; 3], saturation: f64) {
    if saturation != 1.0 {
        let luma = LUMA_R * rgb[0] + LUMA_G * rgb[1] + LUMA_B * rgb[2];
        for v in rgb.iter_mut() {
            *v = luma + (*v - luma) * saturation;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn style_parsing_folds_direction() {
        assert_eq!(GradingStyle::parse("log"), Some((GradingStyle::Log, Direction::Forward)));
        assert_eq!(
            GradingStyle::parse("videoRev"),
            Some((GradingStyle::Video, Direction::Inverse))
        );
        assert_eq!(GradingStyle::parse("loglog"), None);
    }

    #[test]
    fn rgbm_combinations() {
        let c = GradingRgbm { red: 0.1, green: 0.2, blue: 0.3, master: 0.5 };
        assert_eq!(c.rgb_add(), [0.6, 0.7, 0.8]);
        let c = GradingRgbm { red: 2.0, green: 1.0, blue: 0.5, master: 2.0 };
        assert_eq!(c.rgb_mul(), [4.0, 2.0, 1.0]);
    }
}
