//! The operator sum type and fields shared by every operator.

use clf_core::{BitDepth, Metadata};

use crate::{
    CdlOp, ExposureContrastOp, FixedFunctionOp, GammaOp, GradingPrimaryOp, GradingRgbCurveOp,
    GradingToneOp, LogOp, Lut1dOp, Lut3dOp, MatrixOp, OpResult, RangeOp, ReferenceOp,
};

/// Whether an operator is applied as authored or inverted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    /// Apply the operator as authored.
    #[default]
    Forward,
    /// Apply the mathematical inverse.
    Inverse,
}

impl Direction {
    /// Parses an `inverted`/`direction` attribute value.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "forward" => Some(Direction::Forward),
            "inverse" => Some(Direction::Inverse),
            _ => None,
        }
    }
}

/// Fields every operator carries.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OpBase {
    /// Optional unique identifier.
    pub id: String,
    /// Optional human-readable name.
    pub name: String,
    /// Scaling of the parameters as authored, input side.
    pub in_depth: BitDepth,
    /// Scaling of the parameters as authored, output side.
    pub out_depth: BitDepth,
    /// Description elements, in order.
    pub descriptions: Vec<String>,
    /// Arbitrary metadata attached to the operator.
    pub metadata: Metadata,
}

/// One stage of a process list.
#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    /// ASC CDL slope/offset/power/saturation.
    Cdl(CdlOp),
    /// Exposure/contrast/gamma adjustment.
    ExposureContrast(ExposureContrastOp),
    /// Fixed formula transform (ACES red modifier, glow, ...).
    FixedFunction(FixedFunctionOp),
    /// Power curve.
    Gamma(GammaOp),
    /// Grading primary controls.
    GradingPrimary(GradingPrimaryOp),
    /// Grading RGB spline curves.
    GradingRgbCurve(GradingRgbCurveOp),
    /// Grading tone controls.
    GradingTone(GradingToneOp),
    /// Logarithmic transfer curve.
    Log(LogOp),
    /// 1D lookup table.
    Lut1d(Lut1dOp),
    /// 3D lookup table.
    Lut3d(Lut3dOp),
    /// Matrix plus offsets.
    Matrix(MatrixOp),
    /// Affine rescale with optional clamping.
    Range(RangeOp),
    /// Cross-file include, resolved by the caller.
    Reference(ReferenceOp),
}

impl Op {
    /// Shared fields of the operator.
    pub fn base(&self) -> &OpBase {
        match self {
            Op::Cdl(op) => &op.base,
            Op::ExposureContrast(op) => &op.base,
            Op::FixedFunction(op) => &op.base,
            Op::Gamma(op) => &op.base,
            Op::GradingPrimary(op) => &op.base,
            Op::GradingRgbCurve(op) => &op.base,
            Op::GradingTone(op) => &op.base,
            Op::Log(op) => &op.base,
            Op::Lut1d(op) => &op.base,
            Op::Lut3d(op) => &op.base,
            Op::Matrix(op) => &op.base,
            Op::Range(op) => &op.base,
            Op::Reference(op) => &op.base,
        }
    }

    /// Shared fields, mutable.
    pub fn base_mut(&mut self) -> &mut OpBase {
        match self {
            Op::Cdl(op) => &mut op.base,
            Op::ExposureContrast(op) => &mut op.base,
            Op::FixedFunction(op) => &mut op.base,
            Op::Gamma(op) => &mut op.base,
            Op::GradingPrimary(op) => &mut op.base,
            Op::GradingRgbCurve(op) => &mut op.base,
            Op::GradingTone(op) => &mut op.base,
            Op::Log(op) => &mut op.base,
            Op::Lut1d(op) => &mut op.base,
            Op::Lut3d(op) => &mut op.base,
            Op::Matrix(op) => &mut op.base,
            Op::Range(op) => &mut op.base,
            Op::Reference(op) => &mut op.base,
        }
    }

    /// A short human-readable type name for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Op::Cdl(_) => "CDL",
            Op::ExposureContrast(_) => "ExposureContrast",
            Op::FixedFunction(_) => "FixedFunction",
            Op::Gamma(_) => "Gamma",
            Op::GradingPrimary(_) => "GradingPrimary",
            Op::GradingRgbCurve(_) => "GradingRGBCurve",
            Op::GradingTone(_) => "GradingTone",
            Op::Log(_) => "Log",
            Op::Lut1d(_) => "LUT1D",
            Op::Lut3d(_) => "LUT3D",
            Op::Matrix(_) => "Matrix",
            Op::Range(_) => "Range",
            Op::Reference(_) => "Reference",
        }
    }

    /// Checks the parameter set is legal for the operator's style and
    /// direction.
    pub fn validate(&self) -> OpResult<()> {
        match self {
            Op::Cdl(op) => op.validate(),
            Op::ExposureContrast(op) => op.validate(),
            Op::FixedFunction(op) => op.validate(),
            Op::Gamma(op) => op.validate(),
            Op::GradingPrimary(op) => op.validate(),
            Op::GradingRgbCurve(op) => op.validate(),
            Op::GradingTone(op) => op.validate(),
            Op::Log(op) => op.validate(),
            Op::Lut1d(op) => op.validate(),
            Op::Lut3d(op) => op.validate(),
            Op::Matrix(op) => op.validate(),
            Op::Range(op) => op.validate(),
            Op::Reference(op) => op.validate(),
        }
    }

    /// Applies the operator to one RGBA sample.
    ///
    /// This is the scalar reference path; it honors the operator's
    /// direction wherever a closed form or prepared inverse exists.
    pub fn apply(&self, rgba: &mut [f32; 4]) {
        match self {
            Op::Cdl(op) => op.apply(rgba),
            Op::ExposureContrast(op) => op.apply(rgba),
            Op::FixedFunction(op) => op.apply(rgba),
            Op::Gamma(op) => op.apply(rgba),
            Op::GradingPrimary(op) => op.apply(rgba),
            Op::GradingRgbCurve(op) => op.apply(rgba),
            Op::GradingTone(op) => op.apply(rgba),
            Op::Log(op) => op.apply(rgba),
            Op::Lut1d(op) => op.apply(rgba),
            Op::Lut3d(op) => op.apply(rgba),
            Op::Matrix(op) => op.apply(rgba),
            Op::Range(op) => op.apply(rgba),
            Op::Reference(_) => {}
        }
    }
}
