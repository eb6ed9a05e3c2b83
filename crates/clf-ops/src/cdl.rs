//! ASC CDL operator.

use crate::op::OpBase;
use crate::{OpError, OpResult};

const LUMA_R: f64 = 0.2126;
const LUMA_G: f64 = 0.7152;
const LUMA_B: f64 = 0.0722;

/// CDL application style.
///
/// The v1.2 styles clamp to [0,1] around the power function as the ASC
/// spec describes; the no-clamp styles skip clamping and pass negative
/// slope/offset results through the power untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CdlStyle {
    /// ASC v1.2 forward, clamping.
    #[default]
    Fwd,
    /// ASC v1.2 reverse, clamping.
    Rev,
    /// Forward without clamping.
    FwdNoClamp,
    /// Reverse without clamping.
    RevNoClamp,
}

impl CdlStyle {
    /// Parses a CDL `style` attribute value.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "fwd" | "v1.2_fwd" => Some(CdlStyle::Fwd),
            "rev" | "v1.2_rev" => Some(CdlStyle::Rev),
            "fwdnoclamp" | "noclampfwd" => Some(CdlStyle::FwdNoClamp),
            "revnoclamp" | "noclamprev" => Some(CdlStyle::RevNoClamp),
            _ => None,
        }
    }

    /// The attribute spelling written to files.
    pub fn as_str(self) -> &'static str {
        match self {
            CdlStyle::Fwd => "Fwd",
            CdlStyle::Rev => "Rev",
            CdlStyle::FwdNoClamp => "FwdNoClamp",
            CdlStyle::RevNoClamp => "RevNoClamp",
        }
    }

    fn is_reverse(self) -> bool {
        matches!(self, CdlStyle::Rev | CdlStyle::RevNoClamp)
    }

    fn clamps(self) -> bool {
        matches!(self, CdlStyle::Fwd | CdlStyle::Rev)
    }
}

/// An ASC CDL operator: slope/offset/power per channel plus saturation.
#[derive(Debug, Clone, PartialEq)]
pub struct CdlOp {
    /// Shared operator fields.
    pub base: OpBase,
    /// Application style.
    pub style: CdlStyle,
    /// Multiplier per channel.
    pub slope: [f64; 3],
    /// Additive offset per channel.
    pub offset: [f64; 3],
    /// Power per channel.
    pub power: [f64; 3],
    /// Saturation, 1.0 leaves the image unchanged.
    pub saturation: f64,
}

impl Default for CdlOp {
    fn default() -> Self {
        Self {
            base: OpBase::default(),
            style: CdlStyle::default(),
            slope: [1.0; 3],
            offset: [0.0; 3],
            power: [1.0; 3],
            saturation: 1.0,
        }
    }
}

impl CdlOp {
    /// Checks the parameter set is legal.
    pub fn validate(&self) -> OpResult<()> {
        if self.slope.iter().any(|&s| s < 0.0 || !s.is_finite()) {
            return Err(OpError::validation("CDL slope values must be non-negative"));
        }
        if self.power.iter().any(|&p| p <= 0.0 || !p.is_finite()) {
            return Err(OpError::validation("CDL power values must be greater than zero"));
        }
        if self.saturation < 0.0 || !self.saturation.is_finite() {
            return Err(OpError::validation("CDL saturation must be non-negative"));
        }
        if self.offset.iter().any(|o| !o.is_finite()) {
            return Err(OpError::validation("CDL offset values must be finite"));
        }
        Ok(())
    }

    /// True when the op leaves pixels unchanged (ignoring clamping).
    pub fn is_identity(&self) -> bool {
        self.slope == [1.0; 3]
            && self.offset == [0.0; 3]
            && self.power == [1.0; 3]
            && self.saturation == 1.0
    }

    /// Applies the CDL to one sample; alpha passes through.
    pub fn apply(&self, rgba: &mut [f32; 4]) {
        let mut rgb = [rgba[0] as f64, rgba[1] as f64, rgba[2] as f64];
        if self.style.is_reverse() {
            self.apply_reverse(&mut rgb);
        } else {
            self.apply_forward(&mut rgb);
        }
        rgba[0] = rgb[0] as f32;
        rgba[1] = rgb[1] as f32;
        rgba[2] = rgb[2] as f32;
    }

    fn apply_forward(&self, rgb: &mut [f64; 3]) {
        let clamps = self.style.clamps();
        for ch in 0..3 {
            let mut v = rgb[ch];
            if clamps {
                v = v.clamp(0.0, 1.0);
            }
            v = v * self.slope[ch] + self.offset[ch];
            v = apply_power(v, self.power[ch], clamps);
            rgb[ch] = v;
        }
        apply_saturation(rgb, self.saturation, clamps);
    }

    fn apply_reverse(&self, rgb: &mut [f64; 3]) {
        let clamps = self.style.clamps();
        if self.saturation != 0.0 {
            apply_saturation(rgb, 1.0 / self.saturation, clamps);
        }
        for ch in 0..3 {
            let mut v = rgb[ch];
            v = apply_power(v, 1.0 / self.power[ch], clamps);
            if self.slope[ch] != 0.0 {
                v = (v - self.offset[ch]) / self.slope[ch];
            }
            if clamps {
                v = v.clamp(0.0, 1.0);
            }
            rgb[ch] = v;
        }
    }
}

fn apply_power(v: f64, power: f64, clamps: bool) -> f64 {
    if clamps {
        v.clamp(0.0, 1.0).powf(power)
    } else if v > 0.0 {
        // No-clamp style leaves non-positive values linear.
        v.powf(power)
    } else {
        v
    }
}

fn apply_saturation(rgb: &mut [f64; 3], saturation: f64, clamps: bool) {
    if saturation != 1.0 {
        let luma = LUMA_R * rgb[0] + LUMA_G * rgb[1] + LUMA_B * rgb[2];
        for v in rgb.iter_mut() {
            *v = luma + (*v - luma) * saturation;
        }
    }
    if clamps {
        for v in rgb.iter_mut() {
            *v = v.clamp(0.0, 1.0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn identity_by_default() {
        let cdl = CdlOp::default();
        assert!(cdl.is_identity());
        let mut px = [0.4, 0.5, 0.6, 1.0];
        cdl.apply(&mut px);
        assert_abs_diff_eq!(px[0], 0.4, epsilon = 1e-6);
        assert_abs_diff_eq!(px[1], 0.5, epsilon = 1e-6);
        assert_abs_diff_eq!(px[2], 0.6, epsilon = 1e-6);
    }

    #[test]
    fn slope_offset_power() {
        let cdl = CdlOp {
            slope: [1.0, 1.0, 1.0],
            offset: [0.1, 0.0, 0.0],
            power: [1.0, 1.0, 2.0],
            ..Default::default()
        };
        let mut px = [0.5, 0.5, 0.5, 1.0];
        cdl.apply(&mut px);
        assert_abs_diff_eq!(px[0], 0.6, epsilon = 1e-6);
        assert_abs_diff_eq!(px[1], 0.5, epsilon = 1e-6);
        assert_abs_diff_eq!(px[2], 0.25, epsilon = 1e-6);
    }

    #[test]
    fn forward_clamps_but_no_clamp_does_not() {
        let base = CdlOp { slope: [2.0, 1.0, 1.0], ..Default::default() };

        let fwd = CdlOp { style: CdlStyle::Fwd, ..base.clone() };
        let mut px = [0.8, 0.0, 0.0, 1.0];
        fwd.apply(&mut px);
        assert_abs_diff_eq!(px[0], 1.0, epsilon = 1e-6);

        let nc = CdlOp { style: CdlStyle::FwdNoClamp, ..base };
        let mut px = [0.8, 0.0, 0.0, 1.0];
        nc.apply(&mut px);
        assert_abs_diff_eq!(px[0], 1.6, epsilon = 1e-6);
    }

    #[test]
    fn reverse_round_trips_no_clamp() {
        let fwd = CdlOp {
            style: CdlStyle::FwdNoClamp,
            slope: [1.2, 0.9, 1.05],
            offset: [0.05, -0.02, 0.0],
            power: [1.1, 1.0, 0.9],
            saturation: 1.2,
            ..Default::default()
        };
        let rev = CdlOp { style: CdlStyle::RevNoClamp, ..fwd.clone() };

        let mut px = [0.4, 0.5, 0.6, 1.0];
        fwd.apply(&mut px);
        rev.apply(&mut px);
        assert_abs_diff_eq!(px[0], 0.4, epsilon = 1e-4);
        assert_abs_diff_eq!(px[1], 0.5, epsilon = 1e-4);
        assert_abs_diff_eq!(px[2], 0.6, epsilon = 1e-4);
    }

    #[test]
    fn style_parsing() {
        assert_eq!(CdlStyle::parse("Fwd"), Some(CdlStyle::Fwd));
        assert_eq!(CdlStyle::parse("noClampRev"), Some(CdlStyle::RevNoClamp));
        assert_eq!(CdlStyle::parse("v1.2_Fwd"), Some(CdlStyle::Fwd));
        assert_eq!(CdlStyle::parse("sideways"), None);
    }

    #[test]
    fn validation_rules() {
        let mut cdl = CdlOp::default();
        cdl.power = [0.0, 1.0, 1.0];
        assert!(cdl.validate().is_err());

        let mut cdl = CdlOp::default();
        cdl.slope = [-1.0, 1.0, 1.0];
        assert!(cdl.validate().is_err());

        let mut cdl = CdlOp::default();
        cdl.saturation = -0.5;
        assert!(cdl.validate().is_err());
    }
}
