//! Fixed function operator.
//!
//! Covers the ACES look modifiers (red modifier, glow, dark-to-dim), the
//! Rec.2100 surround compensation and the geometric color space
//! conversions. The math is fixed per style; only Rec2100Surround takes a
//! parameter.

use crate::op::OpBase;
use crate::{OpError, OpResult};

/// Fixed function style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[allow(missing_docs)]
pub enum FixedFunctionStyle {
    #[default]
    RedMod03Fwd,
    RedMod03Rev,
    RedMod10Fwd,
    RedMod10Rev,
    Glow03Fwd,
    Glow03Rev,
    Glow10Fwd,
    Glow10Rev,
    DarkToDim10Fwd,
    DarkToDim10Rev,
    Rec2100SurroundFwd,
    Rec2100SurroundRev,
    RgbToHsv,
    HsvToRgb,
    XyzToXyy,
    XyyToXyz,
    XyzToUvy,
    UvyToXyz,
    XyzToLuv,
    LuvToXyz,
}

impl FixedFunctionStyle {
    /// Parses a FixedFunction/ACES/Function `style` attribute value.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "redmod03fwd" => Some(Self::RedMod03Fwd),
            "redmod03rev" => Some(Self::RedMod03Rev),
            "redmod10fwd" => Some(Self::RedMod10Fwd),
            "redmod10rev" => Some(Self::RedMod10Rev),
            "glow03fwd" => Some(Self::Glow03Fwd),
            "glow03rev" => Some(Self::Glow03Rev),
            "glow10fwd" => Some(Self::Glow10Fwd),
            "glow10rev" => Some(Self::Glow10Rev),
            "darktodim10fwd" => Some(Self::DarkToDim10Fwd),
            "darktodim10rev" => Some(Self::DarkToDim10Rev),
            "rec2100surroundfwd" | "rec2100surround" => Some(Self::Rec2100SurroundFwd),
            "rec2100surroundrev" => Some(Self::Rec2100SurroundRev),
            "rgb_to_hsv" => Some(Self::RgbToHsv),
            "hsv_to_rgb" => Some(Self::HsvToRgb),
            "xyz_to_xyy" => Some(Self::XyzToXyy),
            "xyy_to_xyz" => Some(Self::XyyToXyz),
            "xyz_to_uvy" => Some(Self::XyzToUvy),
            "uvy_to_xyz" => Some(Self::UvyToXyz),
            "xyz_to_luv" => Some(Self::XyzToLuv),
            "luv_to_xyz" => Some(Self::LuvToXyz),
            _ => None,
        }
    }

    /// The attribute spelling written to files.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RedMod03Fwd => "RedMod03Fwd",
            Self::RedMod03Rev => "RedMod03Rev",
            Self::RedMod10Fwd => "RedMod10Fwd",
            Self::RedMod10Rev => "RedMod10Rev",
            Self::Glow03Fwd => "Glow03Fwd",
            Self::Glow03Rev => "Glow03Rev",
            Self::Glow10Fwd => "Glow10Fwd",
            Self::Glow10Rev => "Glow10Rev",
            Self::DarkToDim10Fwd => "DarkToDim10Fwd",
            Self::DarkToDim10Rev => "DarkToDim10Rev",
            Self::Rec2100SurroundFwd => "Rec2100SurroundFwd",
            Self::Rec2100SurroundRev => "Rec2100SurroundRev",
            Self::RgbToHsv => "RGB_TO_HSV",
            Self::HsvToRgb => "HSV_TO_RGB",
            Self::XyzToXyy => "XYZ_TO_xyY",
            Self::XyyToXyz => "xyY_TO_XYZ",
            Self::XyzToUvy => "XYZ_TO_uvY",
            Self::UvyToXyz => "uvY_TO_XYZ",
            Self::XyzToLuv => "XYZ_TO_LUV",
            Self::LuvToXyz => "LUV_TO_XYZ",
        }
    }

    /// Number of parameters the style requires.
    pub fn param_count(self) -> usize {
        match self {
            Self::Rec2100SurroundFwd | Self::Rec2100SurroundRev => 1,
            _ => 0,
        }
    }

    /// True when the style predates CTF 2.0 (usable via the `ACES`
    /// element from CTF 1.5).
    pub fn is_aces_look(self) -> bool {
        matches!(
            self,
            Self::RedMod03Fwd
                | Self::RedMod03Rev
                | Self::RedMod10Fwd
                | Self::RedMod10Rev
                | Self::Glow03Fwd
                | Self::Glow03Rev
                | Self::Glow10Fwd
                | Self::Glow10Rev
                | Self::DarkToDim10Fwd
                | Self::DarkToDim10Rev
        )
    }
}

/// A fixed function operator: a style plus its parameters.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FixedFunctionOp {
    /// Shared operator fields.
    pub base: OpBase,
    /// Application style.
    pub style: FixedFunctionStyle,
    /// Style parameters; only Rec2100Surround uses one.
    pub params: Vec<f64>,
}

impl FixedFunctionOp {
    /// Checks the parameter count fits the style.
    pub fn validate(&self) -> OpResult<()> {
        let expected = self.style.param_count();
        if self.params.len() != expected {
            return Err(OpError::validation(format!(
                "style {} expects {} parameter(s), found {}",
                self.style.as_str(),
                expected,
                self.params.len()
            )));
        }
        if let [gamma] = self.params[..] {
            if !(0.01..=100.0).contains(&gamma) {
                return Err(OpError::validation(format!(
                    "Rec2100Surround gamma {gamma} is outside [0.01, 100]"
                )));
            }
        }
        Ok(())
    }

    /// Applies the function to one sample; alpha passes through.
    pub fn apply(&self, rgba: &mut [f32; 4]) {
        let mut rgb = [rgba[0] as f64, rgba[1] as f64, rgba[2] as f64];
        match self.style {
            FixedFunctionStyle::RedMod03Fwd => red_mod(&mut rgb, 120.0, false),
            FixedFunctionStyle::RedMod03Rev => red_mod(&mut rgb, 120.0, true),
            FixedFunctionStyle::RedMod10Fwd => red_mod(&mut rgb, 135.0, false),
            FixedFunctionStyle::RedMod10Rev => red_mod(&mut rgb, 135.0, true),
            FixedFunctionStyle::Glow03Fwd => glow(&mut rgb, 0.075, false),
            FixedFunctionStyle::Glow03Rev => glow(&mut rgb, 0.075, true),
            FixedFunctionStyle::Glow10Fwd => glow(&mut rgb, 0.05, false),
            FixedFunctionStyle::Glow10Rev => glow(&mut rgb, 0.05, true),
            FixedFunctionStyle::DarkToDim10Fwd => dim_surround(&mut rgb, 0.9811),
            FixedFunctionStyle::DarkToDim10Rev => dim_surround(&mut rgb, 1.0 / 0.9811),
            FixedFunctionStyle::Rec2100SurroundFwd => {
                dim_surround(&mut rgb, self.params.first().copied().unwrap_or(1.0))
            }
            FixedFunctionStyle::Rec2100SurroundRev => {
                dim_surround(&mut rgb, 1.0 / self.params.first().copied().unwrap_or(1.0))
            }
            FixedFunctionStyle::RgbToHsv => rgb = rgb_to_hsv(rgb),
            FixedFunctionStyle::HsvToRgb => rgb = hsv_to_rgb(rgb),
            FixedFunctionStyle::XyzToXyy => rgb = xyz_to_xyy(rgb),
            FixedFunctionStyle::XyyToXyz => rgb = xyy_to_xyz(rgb),
            FixedFunctionStyle::XyzToUvy => rgb = xyz_to_uvy(rgb),
            FixedFunctionStyle::UvyToXyz => rgb = uvy_to_xyz(rgb),
            FixedFunctionStyle::XyzToLuv => rgb = xyz_to_luv(rgb),
            FixedFunctionStyle::LuvToXyz => rgb = luv_to_xyz(rgb),
        }
        rgba[0] = rgb[0] as f32;
        rgba[1] = rgb[1] as f32;
        rgba[2] = rgb[2] as f32;
    }
}

// ---- ACES look modifiers ---------------------------------------------------

const RED_SCALE: f64 = 0.82;
const RED_PIVOT: f64 = 0.03;

fn red_mod(rgb: &mut [f64; 3], hue_width: f64, reverse: bool) {
    let hue = rgb_to_hue(*rgb);
    let knot = center_hue(hue, 0.0);
    if knot.abs() >= hue_width * 0.5 {
        return;
    }
    let t = 1.0 - (2.0 * knot / hue_width).abs();
    let hue_weight = {
        let s = t * t * (3.0 - 2.0 * t);
        s * s
    };

    if !reverse {
        let sat = saturation(*rgb);
        rgb[0] += hue_weight * sat * (RED_PIVOT - rgb[0]) * (1.0 - RED_SCALE);
    } else {
        // Solve the forward update for the original red, using hue and
        // saturation from the modified pixel as the ACES inverse does.
        let sat = saturation(*rgb);
        let k = hue_weight * sat * (1.0 - RED_SCALE);
        if k < 1.0 {
            rgb[0] = (rgb[0] - k * RED_PIVOT) / (1.0 - k);
        }
    }
}

const GLOW_MID: f64 = 0.08;

fn glow(rgb: &mut [f64; 3], gain: f64, reverse: bool) {
    let sat = saturation(*rgb);
    let yc = yc(*rgb);
    let s = sigmoid_shaper((sat - 0.4) / 0.2);
    let scaled_gain = gain * s;

    let glow_factor = if !reverse {
        1.0 + glow_fwd(yc, scaled_gain, GLOW_MID)
    } else {
        1.0 / (1.0 + glow_inv(yc, scaled_gain, GLOW_MID))
    };
    for v in rgb.iter_mut() {
        *v *= glow_factor;
    }
}

fn glow_fwd(yc_in: f64, glow_gain: f64, glow_mid: f64) -> f64 {
    if yc_in <= 2.0 / 3.0 * glow_mid {
        glow_gain
    } else if yc_in >= 2.0 * glow_mid {
        0.0
    } else {
        glow_gain * (glow_mid / yc_in - 0.5)
    }
}

fn glow_inv(yc_out: f64, glow_gain: f64, glow_mid: f64) -> f64 {
    if yc_out <= (1.0 + glow_gain) * 2.0 / 3.0 * glow_mid {
        glow_gain
    } else if yc_out >= 2.0 * glow_mid {
        0.0
    } else {
        glow_gain * (glow_mid / yc_out - 0.5) / (1.0 - glow_gain * 0.5)
    }
}

fn sigmoid_shaper(x: f64) -> f64 {
    let t = (1.0 - x.abs()).max(0.0);
    let y = 1.0 + x.signum() * (1.0 - t * t);
    y * 0.5
}

fn yc(rgb: [f64; 3]) -> f64 {
    let (r, g, b) = (rgb[0], rgb[1], rgb[2]);
    let chroma = (b * (b - g) + g * (g - r) + r * (r - b)).max(0.0).sqrt();
    (r + g + b + 1.75 * chroma) / 3.0
}

fn saturation(rgb: [f64; 3]) -> f64 {
    let max = rgb[0].max(rgb[1]).max(rgb[2]);
    let min = rgb[0].min(rgb[1]).min(rgb[2]);
    (max - min) / max.abs().max(1e-2)
}

fn rgb_to_hue(rgb: [f64; 3]) -> f64 {
    if rgb[0] == rgb[1] && rgb[1] == rgb[2] {
        return 0.0;
    }
    let hue = (f64::sqrt(3.0) * (rgb[1] - rgb[2]))
        .atan2(2.0 * rgb[0] - rgb[1] - rgb[2])
        .to_degrees();
    if hue < 0.0 { hue + 360.0 } else { hue }
}

fn center_hue(hue: f64, center: f64) -> f64 {
    let mut centered = hue - center;
    if centered < -180.0 {
        centered += 360.0;
    } else if centered > 180.0 {
        centered -= 360.0;
    }
    centered
}

// The surround transforms raise luminance to a power while preserving
// chromaticity: every channel scales by Y^(gamma-1).
fn dim_surround(rgb: &mut [f64; 3], gamma: f64) {
    let y = 0.2126 * rgb[0] + 0.7152 * rgb[1] + 0.0722 * rgb[2];
    if y <= 0.0 {
        return;
    }
    let scale = y.powf(gamma) / y;
    for v in rgb.iter_mut() {
        *v *= scale;
    }
}

// ---- Geometric conversions -------------------------------------------------

fn rgb_to_hsv(rgb: [f64; 3]) -> [f64; 3] {
    let max = rgb[0].max(rgb[1]).max(rgb[2]);
    let min = rgb[0].min(rgb[1]).min(rgb[2]);
    let delta = max - min;
    let v = max;
    let s = if max != 0.0 { delta / max } else { 0.0 };
    let h = if delta == 0.0 {
        0.0
    } else if max == rgb[0] {
        ((rgb[1] - rgb[2]) / delta).rem_euclid(6.0)
    } else if max == rgb[1] {
        (rgb[2] - rgb[0]) / delta + 2.0
    } else {
        (rgb[0] - rgb[1]) / delta + 4.0
    } / 6.0;
    [h, s, v]
}

fn hsv_to_rgb(hsv: [f64; 3]) -> [f64; 3] {
    let (h, s, v) = (hsv[0].rem_euclid(1.0) * 6.0, hsv[1].clamp(0.0, 1.0), hsv[2]);
    let c = v * s;
    let x = c * (1.0 - (h.rem_euclid(2.0) - 1.0).abs());
    let m = v - c;
    let (r, g, b) = match h as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    [r + m, g + m, b + m]
}

fn xyz_to_xyy(xyz: [f64; 3]) -> [f64; 3] {
    let sum = xyz[0] + xyz[1] + xyz[2];
    if sum == 0.0 {
        return [0.0, 0.0, xyz[1]];
    }
    [xyz[0] / sum, xyz[1] / sum, xyz[1]]
}

fn xyy_to_xyz(xyy: [f64; 3]) -> [f64; 3] {
    let (x, y, big_y) = (xyy[0], xyy[1], xyy[2]);
    if y == 0.0 {
        return [0.0, 0.0, 0.0];
    }
    [big_y * x / y, big_y, big_y * (1.0 - x - y) / y]
}

fn xyz_to_uvy(xyz: [f64; 3]) -> [f64; 3] {
    let d = xyz[0] + 15.0 * xyz[1] + 3.0 * xyz[2];
    if d == 0.0 {
        return [0.0, 0.0, xyz[1]];
    }
    [4.0 * xyz[0] / d, 9.0 * xyz[1] / d, xyz[1]]
}

fn uvy_to_xyz(uvy: [f64; 3]) -> [f64; 3] {
    let (u, v, y) = (uvy[0], uvy[1], uvy[2]);
    if v == 0.0 {
        return [0.0, 0.0, 0.0];
    }
    let x = y * 9.0 * u / (4.0 * v);
    let z = y * (12.0 - 3.0 * u - 20.0 * v) / (4.0 * v);
    [x, y, z]
}

fn xyz_to_luv(xyz: [f64; 3]) -> [f64; 3] {
    let [u, v, y] = xyz_to_uvy(xyz);
    let l = if y > 216.0 / 24389.0 {
        116.0 * y.cbrt() - 16.0
    } else {
        24389.0 / 27.0 * y
    };
    [l / 100.0, 13.0 * l * (u - 0.1978398) / 100.0, 13.0 * l * (v - 0.4683363) / 100.0]
}

fn luv_to_xyz(luv: [f64; 3]) -> [f64; 3] {
    let l = luv[0] * 100.0;
    if l <= 0.0 {
        return [0.0, 0.0, 0.0];
    }
    let u = luv[1] * 100.0 / (13.0 * l) + 0.1978398;
    let v = luv[2] * 100.0 / (13.0 * l) + 0.4683363;
    let y = if l > 8.0 {
        ((l + 16.0) / 116.0).powi(3)
    } else {
        l * 27.0 / 24389.0
    };
    uvy_to_xyz([u, v, y])
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn hsv_round_trip() {
        let op = FixedFunctionOp { style: FixedFunctionStyle::RgbToHsv, ..Default::default() };
        let back = FixedFunctionOp { style: FixedFunctionStyle::HsvToRgb, ..Default::default() };
        let mut px = [0.8, 0.3, 0.1, 1.0];
        op.apply(&mut px);
        back.apply(&mut px);
        assert_abs_diff_eq!(px[0], 0.8, epsilon = 1e-5);
        assert_abs_diff_eq!(px[1], 0.3, epsilon = 1e-5);
        assert_abs_diff_eq!(px[2], 0.1, epsilon = 1e-5);
    }

    #[test]
    fn xyy_round_trip() {
        let fwd = FixedFunctionOp { style: FixedFunctionStyle::XyzToXyy, ..Default::default() };
        let rev = FixedFunctionOp { style: FixedFunctionStyle::XyyToXyz, ..Default::default() };
        let mut px = [0.4124, 0.2126, 0.0193, 1.0];
        fwd.apply(&mut px);
        rev.apply(&mut px);
        assert_abs_diff_eq!(px[0], 0.4124, epsilon = 1e-5);
        assert_abs_diff_eq!(px[1], 0.2126, epsilon = 1e-5);
        assert_abs_diff_eq!(px[2], 0.0193, epsilon = 1e-5);
    }

    #[test]
    fn uvy_round_trip() {
        let fwd = FixedFunctionOp { style: FixedFunctionStyle::XyzToUvy, ..Default::default() };
        let rev = FixedFunctionOp { style: FixedFunctionStyle::UvyToXyz, ..Default::default() };
        let mut px = [0.5, 0.4, 0.2, 1.0];
        fwd.apply(&mut px);
        rev.apply(&mut px);
        assert_abs_diff_eq!(px[0], 0.5, epsilon = 1e-5);
        assert_abs_diff_eq!(px[1], 0.4, epsilon = 1e-5);
        assert_abs_diff_eq!(px[2], 0.2, epsilon = 1e-5);
    }

    #[test]
    fn glow_brightens_dark_saturated_pixels() {
        let fwd = FixedFunctionOp { style: FixedFunctionStyle::Glow10Fwd, ..Default::default() };
        let mut dark_sat = [0.05, 0.005, 0.005, 1.0];
        let before = dark_sat[0];
        fwd.apply(&mut dark_sat);
        assert!(dark_sat[0] > before);

        // Neutral pixels are unaffected.
        let mut gray = [0.5, 0.5, 0.5, 1.0];
        fwd.apply(&mut gray);
        assert_abs_diff_eq!(gray[0], 0.5, epsilon = 1e-6);
    }

    #[test]
    fn red_mod_desaturates_red() {
        let fwd = FixedFunctionOp { style: FixedFunctionStyle::RedMod10Fwd, ..Default::default() };
        let mut red = [0.8, 0.1, 0.1, 1.0];
        fwd.apply(&mut red);
        assert!(red[0] < 0.8);

        let rev = FixedFunctionOp { style: FixedFunctionStyle::RedMod10Rev, ..Default::default() };
        rev.apply(&mut red);
        assert_abs_diff_eq!(red[0], 0.8, epsilon = 5e-3);
    }

    #[test]
    fn rec2100_requires_gamma() {
        let mut op = FixedFunctionOp {
            style: FixedFunctionStyle::Rec2100SurroundFwd,
            ..Default::default()
        };
        assert!(op.validate().is_err());
        op.params = vec![0.9];
        assert!(op.validate().is_ok());

        let mut bad = FixedFunctionOp { style: FixedFunctionStyle::Glow10Fwd, ..Default::default() };
        bad.params = vec![1.0];
        assert!(bad.validate().is_err());
    }

    #[test]
    fn style_parsing() {
        assert_eq!(
            FixedFunctionStyle::parse("RedMod03Fwd"),
            Some(FixedFunctionStyle::RedMod03Fwd)
        );
        assert_eq!(FixedFunctionStyle::parse("RGB_TO_HSV"), Some(FixedFunctionStyle::RgbToHsv));
        assert_eq!(FixedFunctionStyle::parse("nope"), None);
    }
}
