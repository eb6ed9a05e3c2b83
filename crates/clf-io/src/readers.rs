//! Per-operator element readers.
//!
//! A reader (builder) is selected by `(operator tag, CTF version, CLF
//! dialect)` from a first-match-wins rule table, then driven by the
//! element-stack parser: attributes at the opening tag, sub-elements as
//! they close, finalization at the operator's closing tag. Finalization
//! normalizes parameters by the declared bit depths and runs the
//! operator's own validation.

use clf_core::scan::{self, ScanError};
use clf_core::{BitDepth, Version, V1_2, V1_3, V1_4, V1_5, V1_6, V1_8, V2_0, CTF_VERSION_MAX};
use clf_ops::{
    BSplineCurve, CdlOp, CdlStyle, Direction, EcStyle, ExposureContrastOp, FixedFunctionOp,
    FixedFunctionStyle, GammaOp, GammaParams, GammaStyle, GradingPrimaryOp, GradingRgbCurveOp,
    GradingRgbm, GradingRgbmsw, GradingStyle, GradingToneOp, HueAdjust, Interpolation, LogOp,
    LogParams, LogStyle, Lut1dOp, Lut3dOp, MatrixOp, Op, RangeOp, RangeStyle, ReferenceOp,
};
use clf_ops::Array;

use crate::error::ErrorKind;
use crate::tags::*;

/// A reader-side failure, contextualized by the parser with file/line.
#[derive(Debug)]
pub struct BuildError {
    /// Failure category.
    pub kind: ErrorKind,
    /// Description without location.
    pub message: String,
}

impl BuildError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into() }
    }
}

pub type BuildResult<T> = Result<T, BuildError>;

fn invalid_number(err: ScanError, what: &str) -> BuildError {
    BuildError::new(ErrorKind::InvalidNumber, format!("illegal {what}: {err}"))
}

/// Parses one scalar attribute value.
pub fn attr_f64(value: &str, what: &str) -> BuildResult<f64> {
    let t = scan::trim(value);
    scan::parse_number::<f64>(t.as_bytes(), 0, t.len()).map_err(|e| invalid_number(e, what))
}

/// Parses a whitespace-delimited list.
pub fn numbers_f64(value: &str, what: &str) -> BuildResult<Vec<f64>> {
    scan::get_numbers::<f64>(value.as_bytes()).map_err(|e| invalid_number(e, what))
}

fn warn_attr(element: &str, attr: &str) {
    tracing::warn!("unrecognized attribute '{attr}' on element '{element}'");
}

// ============================================================================
// Operator tags and reader selection
// ============================================================================

/// The seventeen operator element variants of the format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpTag {
    Aces,
    Cdl,
    ExposureContrast,
    FixedFunction,
    Function,
    Gamma,
    GradingPrimary,
    GradingRgbCurve,
    GradingTone,
    InvLut1d,
    InvLut3d,
    Log,
    Lut1d,
    Lut3d,
    Matrix,
    Range,
    Reference,
}

impl OpTag {
    /// Maps a ProcessList child element name to its operator tag.
    pub fn from_element(name: &str) -> Option<OpTag> {
        match name {
            TAG_ACES => Some(OpTag::Aces),
            TAG_CDL => Some(OpTag::Cdl),
            TAG_EXPOSURE_CONTRAST => Some(OpTag::ExposureContrast),
            TAG_FIXED_FUNCTION => Some(OpTag::FixedFunction),
            TAG_FUNCTION => Some(OpTag::Function),
            TAG_GAMMA | TAG_EXPONENT => Some(OpTag::Gamma),
            TAG_GRADING_PRIMARY => Some(OpTag::GradingPrimary),
            TAG_GRADING_RGB_CURVE => Some(OpTag::GradingRgbCurve),
            TAG_GRADING_TONE => Some(OpTag::GradingTone),
            TAG_INVLUT1D => Some(OpTag::InvLut1d),
            TAG_INVLUT3D => Some(OpTag::InvLut3d),
            TAG_LOG => Some(OpTag::Log),
            TAG_LUT1D => Some(OpTag::Lut1d),
            TAG_LUT3D => Some(OpTag::Lut3d),
            TAG_MATRIX => Some(OpTag::Matrix),
            TAG_RANGE => Some(OpTag::Range),
            TAG_REFERENCE => Some(OpTag::Reference),
            _ => None,
        }
    }
}

/// A version predicate in the rule table.
enum Pred {
    UpTo(Version),
    StartingAt(Version),
    Between(Version, Version),
    Default,
}

impl Pred {
    fn matches(&self, v: Version) -> bool {
        match *self {
            Pred::UpTo(hi) => v <= hi,
            Pred::StartingAt(lo) => v >= lo && v <= CTF_VERSION_MAX,
            Pred::Between(lo, hi) => v >= lo && v <= hi,
            Pred::Default => v <= CTF_VERSION_MAX,
        }
    }
}

struct Rule {
    tag: OpTag,
    ctf_only: bool,
    pred: Pred,
    make: fn() -> OpBuilder,
}

/// The registration table. Order matters: the first rule whose predicate
/// accepts the version wins, reproducing the original registration
/// sequence per operator.
fn rules() -> &'static [Rule] {
    use OpBuilder as B;
    static RULES: &[Rule] = &[
        Rule { tag: OpTag::Aces, ctf_only: true, pred: Pred::StartingAt(V1_5), make: || B::FixedFunction(FixedFunctionBuilder::aces()) },
        Rule { tag: OpTag::Cdl, ctf_only: false, pred: Pred::StartingAt(V1_3), make: || B::Cdl(CdlBuilder::default()) },
        Rule { tag: OpTag::ExposureContrast, ctf_only: true, pred: Pred::Default, make: || B::ExposureContrast(EcBuilder::default()) },
        Rule { tag: OpTag::FixedFunction, ctf_only: true, pred: Pred::StartingAt(V2_0), make: || B::FixedFunction(FixedFunctionBuilder::modern()) },
        Rule { tag: OpTag::Function, ctf_only: true, pred: Pred::StartingAt(V1_6), make: || B::FixedFunction(FixedFunctionBuilder::function()) },
        Rule { tag: OpTag::Gamma, ctf_only: true, pred: Pred::UpTo(V1_4), make: || B::Gamma(GammaBuilder::v1_2()) },
        Rule { tag: OpTag::Gamma, ctf_only: true, pred: Pred::UpTo(V1_8), make: || B::Gamma(GammaBuilder::v1_5()) },
        Rule { tag: OpTag::Gamma, ctf_only: true, pred: Pred::StartingAt(V2_0), make: || B::Gamma(GammaBuilder::ctf_2_0()) },
        Rule { tag: OpTag::Gamma, ctf_only: false, pred: Pred::StartingAt(V2_0), make: || B::Gamma(GammaBuilder::clf_3_0()) },
        Rule { tag: OpTag::GradingPrimary, ctf_only: true, pred: Pred::StartingAt(V2_0), make: || B::GradingPrimary(GradingPrimaryBuilder::default()) },
        Rule { tag: OpTag::GradingRgbCurve, ctf_only: true, pred: Pred::StartingAt(V2_0), make: || B::GradingRgbCurve(GradingRgbCurveBuilder::default()) },
        Rule { tag: OpTag::GradingTone, ctf_only: true, pred: Pred::StartingAt(V2_0), make: || B::GradingTone(GradingToneBuilder::default()) },
        Rule { tag: OpTag::InvLut1d, ctf_only: true, pred: Pred::StartingAt(V1_3), make: || B::Lut1d(Lut1dBuilder::inverse()) },
        Rule { tag: OpTag::InvLut3d, ctf_only: true, pred: Pred::StartingAt(V1_6), make: || B::Lut3d(Lut3dBuilder::inverse()) },
        Rule { tag: OpTag::Log, ctf_only: true, pred: Pred::Between(V1_3, V1_8), make: || B::Log(LogBuilder::legacy()) },
        Rule { tag: OpTag::Log, ctf_only: false, pred: Pred::StartingAt(V2_0), make: || B::Log(LogBuilder::v2()) },
        Rule { tag: OpTag::Lut1d, ctf_only: false, pred: Pred::UpTo(V1_3), make: || B::Lut1d(Lut1dBuilder::base()) },
        Rule { tag: OpTag::Lut1d, ctf_only: false, pred: Pred::UpTo(V1_4), make: || B::Lut1d(Lut1dBuilder::v1_4()) },
        Rule { tag: OpTag::Lut1d, ctf_only: false, pred: Pred::Default, make: || B::Lut1d(Lut1dBuilder::v1_7()) },
        Rule { tag: OpTag::Lut3d, ctf_only: false, pred: Pred::UpTo(V1_6), make: || B::Lut3d(Lut3dBuilder::base()) },
        Rule { tag: OpTag::Lut3d, ctf_only: false, pred: Pred::Default, make: || B::Lut3d(Lut3dBuilder::v1_7()) },
        Rule { tag: OpTag::Matrix, ctf_only: false, pred: Pred::UpTo(V1_2), make: || B::Matrix(MatrixBuilder::v1_2()) },
        Rule { tag: OpTag::Matrix, ctf_only: false, pred: Pred::Default, make: || B::Matrix(MatrixBuilder::v1_3()) },
        Rule { tag: OpTag::Range, ctf_only: false, pred: Pred::UpTo(V1_6), make: || B::Range(RangeBuilder::base()) },
        Rule { tag: OpTag::Range, ctf_only: false, pred: Pred::Default, make: || B::Range(RangeBuilder::v1_7()) },
        Rule { tag: OpTag::Reference, ctf_only: true, pred: Pred::Default, make: || B::Reference(ReferenceBuilder::default()) },
    ];
    RULES
}

/// Selects the reader for an operator element, or `None` when the
/// (type, version, dialect) combination is unsupported.
pub fn select_reader(tag: OpTag, version: Version, is_clf: bool) -> Option<OpBuilder> {
    rules()
        .iter()
        .filter(|r| r.tag == tag)
        .filter(|r| !(r.ctf_only && is_clf))
        .find(|r| r.pred.matches(version))
        .map(|r| (r.make)())
}

// ============================================================================
// Shared operator attribute handling
// ============================================================================

/// Attributes common to every operator element.
#[derive(Debug, Default)]
pub struct CommonAttrs {
    pub id: String,
    pub name: String,
    pub in_depth: BitDepth,
    pub out_depth: BitDepth,
}

impl CommonAttrs {
    /// Extracts the common attributes, consuming them from the list; the
    /// remainder is handed back for op-specific parsing.
    pub fn take(element: &str, attrs: &[(String, String)]) -> BuildResult<(Self, Vec<(String, String)>)> {
        let mut common = CommonAttrs::default();
        let mut rest = Vec::new();
        for (k, v) in attrs {
            match k.as_str() {
                ATTR_ID => common.id = v.clone(),
                ATTR_NAME => common.name = v.clone(),
                ATTR_IN_BIT_DEPTH => {
                    common.in_depth = BitDepth::parse(v).ok_or_else(|| {
                        BuildError::new(
                            ErrorKind::MissingAttribute,
                            format!("unknown bit depth '{v}' on element '{element}'"),
                        )
                    })?;
                }
                ATTR_OUT_BIT_DEPTH => {
                    common.out_depth = BitDepth::parse(v).ok_or_else(|| {
                        BuildError::new(
                            ErrorKind::MissingAttribute,
                            format!("unknown bit depth '{v}' on element '{element}'"),
                        )
                    })?;
                }
                _ => rest.push((k.clone(), v.clone())),
            }
        }
        if common.in_depth == BitDepth::Unknown {
            return Err(BuildError::new(
                ErrorKind::MissingAttribute,
                format!("required attribute 'inBitDepth' is missing on element '{element}'"),
            ));
        }
        if common.out_depth == BitDepth::Unknown {
            return Err(BuildError::new(
                ErrorKind::MissingAttribute,
                format!("required attribute 'outBitDepth' is missing on element '{element}'"),
            ));
        }
        Ok((common, rest))
    }

    fn install(self, base: &mut clf_ops::OpBase) {
        base.id = self.id;
        base.name = self.name;
        base.in_depth = self.in_depth;
        base.out_depth = self.out_depth;
    }
}

fn style_error(element: &str, value: &str) -> BuildError {
    BuildError::new(
        ErrorKind::UnknownStyle,
        format!("unknown style '{value}' on element '{element}'"),
    )
}

fn missing_style(element: &str) -> BuildError {
    BuildError::new(
        ErrorKind::MissingAttribute,
        format!("required attribute 'style' is missing on element '{element}'"),
    )
}

// ============================================================================
// Builders
// ============================================================================

/// The in-flight reader for one operator element.
#[derive(Debug)]
pub enum OpBuilder {
    Matrix(MatrixBuilder),
    Lut1d(Lut1dBuilder),
    Lut3d(Lut3dBuilder),
    Range(RangeBuilder),
    Cdl(CdlBuilder),
    Gamma(GammaBuilder),
    Log(LogBuilder),
    ExposureContrast(EcBuilder),
    FixedFunction(FixedFunctionBuilder),
    GradingPrimary(GradingPrimaryBuilder),
    GradingRgbCurve(GradingRgbCurveBuilder),
    GradingTone(GradingToneBuilder),
    Reference(ReferenceBuilder),
}

impl OpBuilder {
    /// The element name used in diagnostics.
    pub fn element_name(&self) -> &'static str {
        match self {
            OpBuilder::Matrix(_) => TAG_MATRIX,
            OpBuilder::Lut1d(b) => {
                if b.inverse { TAG_INVLUT1D } else { TAG_LUT1D }
            }
            OpBuilder::Lut3d(b) => {
                if b.inverse { TAG_INVLUT3D } else { TAG_LUT3D }
            }
            OpBuilder::Range(_) => TAG_RANGE,
            OpBuilder::Cdl(_) => TAG_CDL,
            OpBuilder::Gamma(_) => TAG_GAMMA,
            OpBuilder::Log(_) => TAG_LOG,
            OpBuilder::ExposureContrast(_) => TAG_EXPOSURE_CONTRAST,
            OpBuilder::FixedFunction(_) => TAG_FIXED_FUNCTION,
            OpBuilder::GradingPrimary(_) => TAG_GRADING_PRIMARY,
            OpBuilder::GradingRgbCurve(_) => TAG_GRADING_RGB_CURVE,
            OpBuilder::GradingTone(_) => TAG_GRADING_TONE,
            OpBuilder::Reference(_) => TAG_REFERENCE,
        }
    }

    /// Parses the opening tag's attributes.
    pub fn start(&mut self, element: &str, attrs: &[(String, String)]) -> BuildResult<()> {
        match self {
            OpBuilder::Matrix(b) => b.start(element, attrs),
            OpBuilder::Lut1d(b) => b.start(element, attrs),
            OpBuilder::Lut3d(b) => b.start(element, attrs),
            OpBuilder::Range(b) => b.start(element, attrs),
            OpBuilder::Cdl(b) => b.start(element, attrs),
            OpBuilder::Gamma(b) => b.start(element, attrs),
            OpBuilder::Log(b) => b.start(element, attrs),
            OpBuilder::ExposureContrast(b) => b.start(element, attrs),
            OpBuilder::FixedFunction(b) => b.start(element, attrs),
            OpBuilder::GradingPrimary(b) => b.start(element, attrs),
            OpBuilder::GradingRgbCurve(b) => b.start(element, attrs),
            OpBuilder::GradingTone(b) => b.start(element, attrs),
            OpBuilder::Reference(b) => b.start(element, attrs),
        }
    }

    /// Finalizes the operator; may produce more than one op (an
    /// IndexMap materializes a Range before its LUT).
    pub fn end(self) -> BuildResult<Vec<Op>> {
        match self {
            OpBuilder::Matrix(b) => b.end(),
            OpBuilder::Lut1d(b) => b.end(),
            OpBuilder::Lut3d(b) => b.end(),
            OpBuilder::Range(b) => b.end(),
            OpBuilder::Cdl(b) => b.end(),
            OpBuilder::Gamma(b) => b.end(),
            OpBuilder::Log(b) => b.end(),
            OpBuilder::ExposureContrast(b) => b.end(),
            OpBuilder::FixedFunction(b) => b.end(),
            OpBuilder::GradingPrimary(b) => b.end(),
            OpBuilder::GradingRgbCurve(b) => b.end(),
            OpBuilder::GradingTone(b) => b.end(),
            OpBuilder::Reference(b) => b.end(),
        }
    }

    /// Appends a description line to the operator.
    pub fn add_description(&mut self, text: String) {
        let base = self.base_mut();
        base.descriptions.push(text);
    }

    fn base_mut(&mut self) -> &mut clf_ops::OpBase {
        match self {
            OpBuilder::Matrix(b) => &mut b.op.base,
            OpBuilder::Lut1d(b) => &mut b.op.base,
            OpBuilder::Lut3d(b) => &mut b.op.base,
            OpBuilder::Range(b) => &mut b.op.base,
            OpBuilder::Cdl(b) => &mut b.op.base,
            OpBuilder::Gamma(b) => &mut b.op.base,
            OpBuilder::Log(b) => &mut b.op.base,
            OpBuilder::ExposureContrast(b) => &mut b.op.base,
            OpBuilder::FixedFunction(b) => &mut b.op.base,
            OpBuilder::GradingPrimary(b) => &mut b.op.base,
            OpBuilder::GradingRgbCurve(b) => &mut b.op.base,
            OpBuilder::GradingTone(b) => &mut b.op.base,
            OpBuilder::Reference(b) => &mut b.op.base,
        }
    }
}

fn validated(op: Op) -> BuildResult<Vec<Op>> {
    op.validate()
        .map_err(|e| BuildError::new(ErrorKind::Validation, e.to_string()))?;
    Ok(vec![op])
}

// ---- Matrix ----------------------------------------------------------------

#[derive(Debug)]
pub struct MatrixBuilder {
    pub op: MatrixOp,
    legacy_dims: bool,
    payload: Option<Array>,
    rows: usize,
    cols: usize,
}

impl MatrixBuilder {
    fn v1_2() -> Self {
        Self { op: MatrixOp::identity(), legacy_dims: true, payload: None, rows: 0, cols: 0 }
    }

    fn v1_3() -> Self {
        Self { op: MatrixOp::identity(), legacy_dims: false, payload: None, rows: 0, cols: 0 }
    }

    fn start(&mut self, element: &str, attrs: &[(String, String)]) -> BuildResult<()> {
        let (common, rest) = CommonAttrs::take(element, attrs)?;
        common.install(&mut self.op.base);
        for (k, _) in rest {
            warn_attr(element, &k);
        }
        Ok(())
    }

    /// Declares the array shape. Legal shapes are `3 3 3` / `4 4 3` for
    /// the 1.2 reader; `3 3 [3]`, `3 4 [3]`, `4 4 [4]`, `4 5 [4]` from
    /// 1.3 (the third number is redundant and optional).
    pub fn begin_array(&mut self, dims: &[usize]) -> BuildResult<()> {
        if self.rows != 0 {
            return Err(BuildError::new(
                ErrorKind::StructuralError,
                "only one Array per Matrix is supported",
            ));
        }
        let ok = if self.legacy_dims {
            matches!(dims, [3, 3, 3] | [4, 4, 3])
        } else {
            let shape_ok =
                matches!(&dims[..2.min(dims.len())], [3, 3] | [3, 4] | [4, 4] | [4, 5]);
            match dims.len() {
                2 => shape_ok,
                3 => shape_ok && dims[0] == dims[2],
                _ => false,
            }
        };
        if !ok {
            return Err(BuildError::new(
                ErrorKind::ArrayLength,
                format!("illegal 'Matrix' array dimensions {dims:?}"),
            ));
        }
        let (rows, cols) = if self.legacy_dims { (dims[0], dims[0]) } else { (dims[0], dims[1]) };
        self.rows = rows;
        self.cols = cols;
        self.payload = Some(Array::for_matrix(rows, cols));
        Ok(())
    }

    pub fn array_mut(&mut self) -> Option<&mut Array> {
        self.payload.as_mut()
    }

    /// Splits the payload into matrix and offsets.
    pub fn end_array(&mut self) -> BuildResult<()> {
        let payload = self.payload.take().ok_or_else(|| {
            BuildError::new(ErrorKind::StructuralError, "Matrix array closed before opening")
        })?;
        payload
            .check_complete()
            .map_err(|e| BuildError::new(ErrorKind::ArrayLength, e.to_string()))?;
        let v = &payload.values;
        if self.legacy_dims && self.rows == 4 {
            // The 1.2 format packs a 3x3 matrix plus an offset column
            // into a 4x4 payload.
            let mut m = [0.0; 9];
            for r in 0..3 {
                m[r * 3..r * 3 + 3].copy_from_slice(&v[r * 4..r * 4 + 3]);
                self.op.offsets[r] = v[r * 4 + 3];
            }
            self.op.set_rgb(&m);
            return Ok(());
        }
        match (self.rows, self.cols) {
            (3, 3) => self.op.set_rgb(v),
            (3, 4) => {
                let mut m = [0.0; 9];
                for r in 0..3 {
                    m[r * 3..r * 3 + 3].copy_from_slice(&v[r * 4..r * 4 + 3]);
                    self.op.offsets[r] = v[r * 4 + 3];
                }
                self.op.set_rgb(&m);
            }
            (4, 4) => self.op.set_rgba(v),
            (4, 5) => {
                let mut m = [0.0; 16];
                for r in 0..4 {
                    m[r * 4..r * 4 + 4].copy_from_slice(&v[r * 5..r * 5 + 4]);
                    self.op.offsets[r] = v[r * 5 + 4];
                }
                self.op.set_rgba(&m);
            }
            _ => unreachable!("shape checked in begin_array"),
        }
        Ok(())
    }

    fn end(mut self) -> BuildResult<Vec<Op>> {
        if self.payload.is_some() {
            return Err(BuildError::new(ErrorKind::StructuralError, "Matrix array was not closed"));
        }
        let in_scale = self.op.base.in_depth.scale();
        let out_scale = self.op.base.out_depth.scale();
        self.op.scale(in_scale, 1.0 / out_scale);
        validated(Op::Matrix(self.op))
    }
}

// ---- LUT 1D ----------------------------------------------------------------

#[derive(Debug)]
pub struct Lut1dBuilder {
    pub op: Lut1dOp,
    inverse: bool,
    allow_hue_adjust: bool,
    allow_index_map: bool,
    array_open: bool,
    array_seen: bool,
    pub index_map: IndexMapState,
}

/// IndexMap bookkeeping shared by the LUT builders.
#[derive(Debug, Default)]
pub struct IndexMapState {
    pub pairs: Vec<(f32, f32)>,
    pub declared: usize,
    pub open: bool,
    pub seen: bool,
    pub completed: bool,
}

impl IndexMapState {
    pub(crate) fn begin(&mut self, dims: &[usize]) -> BuildResult<()> {
        if self.seen {
            return Err(BuildError::new(
                ErrorKind::IndexMapMisuse,
                "only one IndexMap per LUT is supported",
            ));
        }
        if dims.len() != 1 || dims[0] == 0 {
            return Err(BuildError::new(
                ErrorKind::ArrayLength,
                format!("illegal IndexMap dimensions {dims:?}"),
            ));
        }
        self.declared = dims[0];
        self.open = true;
        self.seen = true;
        Ok(())
    }

    pub(crate) fn chars(&mut self, text: &str) -> BuildResult<()> {
        let bytes = text.as_bytes();
        let mut pos = 0;
        while let Some(pair) = scan::get_next_index_pair(bytes, &mut pos)
            .map_err(|e| invalid_number(e, "IndexMap values"))?
        {
            if self.pairs.len() >= self.declared {
                return Err(BuildError::new(
                    ErrorKind::ArrayLength,
                    format!("expected {} IndexMap values, found more", self.declared),
                ));
            }
            self.pairs.push(pair);
        }
        Ok(())
    }

    pub(crate) fn finish(&mut self) -> BuildResult<()> {
        self.open = false;
        if self.pairs.len() != self.declared {
            return Err(BuildError::new(
                ErrorKind::ArrayLength,
                format!("expected {} IndexMap values, found {}", self.declared, self.pairs.len()),
            ));
        }
        self.completed = true;
        Ok(())
    }
}

impl Lut1dBuilder {
    fn base() -> Self {
        Self {
            op: Lut1dOp::default(),
            inverse: false,
            allow_hue_adjust: false,
            allow_index_map: false,
            array_open: false,
            array_seen: false,
            index_map: IndexMapState::default(),
        }
    }

    fn v1_4() -> Self {
        Self { allow_hue_adjust: true, ..Self::base() }
    }

    fn v1_7() -> Self {
        Self { allow_hue_adjust: true, allow_index_map: true, ..Self::base() }
    }

    fn inverse() -> Self {
        let mut b = Self::v1_7();
        b.inverse = true;
        b.op.direction = Direction::Inverse;
        b
    }

    /// True when this reader accepts an IndexMap child at all.
    pub fn accepts_index_map(&self) -> bool {
        self.allow_index_map
    }

    fn start(&mut self, element: &str, attrs: &[(String, String)]) -> BuildResult<()> {
        let (common, rest) = CommonAttrs::take(element, attrs)?;
        common.install(&mut self.op.base);
        for (k, v) in rest {
            match k.as_str() {
                ATTR_INTERPOLATION => {
                    self.op.interpolation = Interpolation::parse_1d(&v)
                        .ok_or_else(|| style_error(element, &v))?;
                }
                ATTR_HALF_DOMAIN => {
                    if !v.eq_ignore_ascii_case("true") {
                        return Err(BuildError::new(
                            ErrorKind::Validation,
                            format!("illegal 'halfDomain' attribute '{v}' while parsing Lut1D"),
                        ));
                    }
                    self.op.half_domain = true;
                }
                ATTR_RAW_HALFS => {
                    if !v.eq_ignore_ascii_case("true") {
                        return Err(BuildError::new(
                            ErrorKind::Validation,
                            format!("illegal 'rawHalfs' attribute '{v}' while parsing Lut1D"),
                        ));
                    }
                    self.op.raw_halfs = true;
                }
                ATTR_HUE_ADJUST if self.allow_hue_adjust => {
                    if !v.eq_ignore_ascii_case("dw3") {
                        return Err(BuildError::new(
                            ErrorKind::Validation,
                            format!("illegal 'hueAdjust' attribute '{v}' while parsing Lut1D"),
                        ));
                    }
                    self.op.hue_adjust = HueAdjust::Dw3;
                }
                _ => warn_attr(element, &k),
            }
        }
        Ok(())
    }

    /// Declares the array shape: `L 3` or `L 1`.
    pub fn begin_array(&mut self, dims: &[usize]) -> BuildResult<()> {
        if self.array_seen {
            return Err(BuildError::new(
                ErrorKind::StructuralError,
                "only one Array per LUT is supported",
            ));
        }
        if dims.len() != 2 || (dims[1] != 3 && dims[1] != 1) || dims[0] < 2 {
            return Err(BuildError::new(
                ErrorKind::ArrayLength,
                format!("illegal 'LUT1D' array dimensions {dims:?}"),
            ));
        }
        self.op.array = Array::for_lut1d(dims[0], dims[1]);
        self.array_open = true;
        self.array_seen = true;
        Ok(())
    }

    pub fn array_mut(&mut self) -> Option<&mut Array> {
        self.array_open.then_some(&mut self.op.array)
    }

    /// Finishes the array: decode raw halfs, replicate single-channel
    /// data to three channels.
    pub fn end_array(&mut self) -> BuildResult<()> {
        self.array_open = false;
        if self.op.raw_halfs {
            self.op.decode_raw_halfs();
        }
        if self.op.array.channels == 1 {
            self.op.array.check_complete()
                .map_err(|e| BuildError::new(ErrorKind::ArrayLength, e.to_string()))?;
            let single = std::mem::take(&mut self.op.array.values);
            let length = self.op.array.length;
            self.op.array = Array::for_lut1d(length, 3);
            for v in single {
                for _ in 0..3 {
                    self.op.array.values.push(v);
                }
            }
        }
        self.op.array.check_complete()
            .map_err(|e| BuildError::new(ErrorKind::ArrayLength, e.to_string()))?;
        Ok(())
    }

    fn end(mut self) -> BuildResult<Vec<Op>> {
        if !self.array_seen {
            return Err(BuildError::new(
                ErrorKind::MissingAttribute,
                "LUT1D requires an Array child element",
            ));
        }
        // Under inversion the roles swap: entries are scaled by the
        // input depth and the inversion heuristic keys on it.
        let scale_depth = if self.inverse { self.op.base.in_depth } else { self.op.base.out_depth };
        self.op.scale_values(1.0 / scale_depth.scale());
        self.op.file_out_depth = scale_depth;

        self.op
            .validate()
            .map_err(|e| BuildError::new(ErrorKind::Validation, e.to_string()))?;

        let mut ops = Vec::new();
        if self.index_map.completed {
            let range = RangeOp::from_index_map(
                &self.index_map.pairs,
                self.op.length(),
                self.op.base.in_depth,
            )
            .map_err(|e| BuildError::new(ErrorKind::IndexMapMisuse, e.to_string()))?;
            let mut range = range;
            range.base.in_depth = self.op.base.in_depth;
            range.base.out_depth = self.op.base.in_depth;
            ops.push(Op::Range(range));
        }
        ops.push(Op::Lut1d(self.op));
        Ok(ops)
    }
}

// ---- LUT 3D ----------------------------------------------------------------

#[derive(Debug)]
pub struct Lut3dBuilder {
    pub op: Lut3dOp,
    inverse: bool,
    allow_index_map: bool,
    array_open: bool,
    array_seen: bool,
    pub index_map: IndexMapState,
}

impl Lut3dBuilder {
    fn base() -> Self {
        Self {
            op: Lut3dOp::default(),
            inverse: false,
            allow_index_map: false,
            array_open: false,
            array_seen: false,
            index_map: IndexMapState::default(),
        }
    }

    fn v1_7() -> Self {
        Self { allow_index_map: true, ..Self::base() }
    }

    fn inverse() -> Self {
        let mut b = Self::v1_7();
        b.inverse = true;
        b.op.direction = Direction::Inverse;
        b
    }

    /// True when this reader accepts an IndexMap child at all.
    pub fn accepts_index_map(&self) -> bool {
        self.allow_index_map
    }

    fn start(&mut self, element: &str, attrs: &[(String, String)]) -> BuildResult<()> {
        let (common, rest) = CommonAttrs::take(element, attrs)?;
        common.install(&mut self.op.base);
        for (k, v) in rest {
            match k.as_str() {
                ATTR_INTERPOLATION => {
                    self.op.interpolation = Interpolation::parse_3d(&v)
                        .ok_or_else(|| style_error(element, &v))?;
                }
                _ => warn_attr(element, &k),
            }
        }
        Ok(())
    }

    /// Declares the cube shape: `L L L 3`, or the `L L 3` shorthand.
    pub fn begin_array(&mut self, dims: &[usize]) -> BuildResult<()> {
        if self.array_seen {
            return Err(BuildError::new(
                ErrorKind::StructuralError,
                "only one Array per LUT is supported",
            ));
        }
        let ok = match dims.len() {
            4 => dims[0] == dims[1] && dims[1] == dims[2] && dims[3] == 3,
            3 => dims[0] == dims[1] && dims[2] == 3,
            _ => false,
        };
        if !ok || dims[0] < 2 {
            return Err(BuildError::new(
                ErrorKind::ArrayLength,
                format!("illegal 'LUT3D' array dimensions {dims:?}"),
            ));
        }
        self.op.array = Array::for_lut3d(dims[0]);
        self.array_open = true;
        self.array_seen = true;
        Ok(())
    }

    pub fn array_mut(&mut self) -> Option<&mut Array> {
        self.array_open.then_some(&mut self.op.array)
    }

    pub fn end_array(&mut self) -> BuildResult<()> {
        self.array_open = false;
        self.op.array.check_complete()
            .map_err(|e| BuildError::new(ErrorKind::ArrayLength, e.to_string()))
    }

    fn end(mut self) -> BuildResult<Vec<Op>> {
        if !self.array_seen {
            return Err(BuildError::new(
                ErrorKind::MissingAttribute,
                "LUT3D requires an Array child element",
            ));
        }
        let scale_depth = if self.inverse { self.op.base.in_depth } else { self.op.base.out_depth };
        self.op.scale_values(1.0 / scale_depth.scale());
        self.op.file_out_depth = scale_depth;

        self.op
            .validate()
            .map_err(|e| BuildError::new(ErrorKind::Validation, e.to_string()))?;

        let mut ops = Vec::new();
        if self.index_map.completed {
            let range = RangeOp::from_index_map(
                &self.index_map.pairs,
                self.op.length(),
                self.op.base.in_depth,
            )
            .map_err(|e| BuildError::new(ErrorKind::IndexMapMisuse, e.to_string()))?;
            let mut range = range;
            range.base.in_depth = self.op.base.in_depth;
            range.base.out_depth = self.op.base.in_depth;
            ops.push(Op::Range(range));
        }
        ops.push(Op::Lut3d(self.op));
        Ok(ops)
    }
}

// ---- Range -----------------------------------------------------------------

#[derive(Debug)]
pub struct RangeBuilder {
    pub op: RangeOp,
    allow_style: bool,
}

impl RangeBuilder {
    fn base() -> Self {
        Self { op: RangeOp::default(), allow_style: false }
    }

    fn v1_7() -> Self {
        Self { op: RangeOp::default(), allow_style: true }
    }

    fn start(&mut self, element: &str, attrs: &[(String, String)]) -> BuildResult<()> {
        let (common, rest) = CommonAttrs::take(element, attrs)?;
        common.install(&mut self.op.base);
        for (k, v) in rest {
            match k.as_str() {
                ATTR_STYLE if self.allow_style => {
                    self.op.style = RangeStyle::parse(&v).ok_or_else(|| style_error(element, &v))?;
                }
                _ => warn_attr(element, &k),
            }
        }
        Ok(())
    }

    /// Stores one of the four bound values by its element name.
    pub fn set_value(&mut self, tag: &str, text: &str) -> BuildResult<()> {
        let values = numbers_f64(text, "Range values")?;
        let [value] = values[..] else {
            return Err(BuildError::new(
                ErrorKind::InvalidNumber,
                "Range element: non-single value",
            ));
        };
        match tag {
            TAG_MIN_IN_VALUE => self.op.min_in = Some(value),
            TAG_MAX_IN_VALUE => self.op.max_in = Some(value),
            TAG_MIN_OUT_VALUE => self.op.min_out = Some(value),
            TAG_MAX_OUT_VALUE => self.op.max_out = Some(value),
            _ => {
                return Err(BuildError::new(
                    ErrorKind::StructuralError,
                    format!("unexpected Range value element '{tag}'"),
                ))
            }
        }
        Ok(())
    }

    fn end(mut self) -> BuildResult<Vec<Op>> {
        let in_scale = self.op.base.in_depth.scale();
        let out_scale = self.op.base.out_depth.scale();
        self.op.normalize(in_scale, out_scale);
        validated(Op::Range(self.op))
    }
}

// ---- CDL -------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct CdlBuilder {
    pub op: CdlOp,
}

impl CdlBuilder {
    fn start(&mut self, element: &str, attrs: &[(String, String)]) -> BuildResult<()> {
        let (common, rest) = CommonAttrs::take(element, attrs)?;
        common.install(&mut self.op.base);
        for (k, v) in rest {
            match k.as_str() {
                ATTR_STYLE => {
                    self.op.style = CdlStyle::parse(&v).ok_or_else(|| style_error(element, &v))?;
                }
                _ => warn_attr(element, &k),
            }
        }
        Ok(())
    }

    /// Stores a SOPNode/SatNode terminal value by its element name.
    pub fn set_value(&mut self, tag: &str, text: &str) -> BuildResult<()> {
        set_cdl_value(&mut self.op, tag, text)
    }

    fn end(self) -> BuildResult<Vec<Op>> {
        validated(Op::Cdl(self.op))
    }
}

/// Parses a Slope/Offset/Power triple or Saturation scalar into a CDL
/// record. Shared by the ProcessList op reader and the ASC CDL parsers.
pub fn set_cdl_value(op: &mut CdlOp, tag: &str, text: &str) -> BuildResult<()> {
    let values = numbers_f64(text, "CDL values")?;
    let triple = |values: &[f64]| -> BuildResult<[f64; 3]> {
        values.try_into().map_err(|_| {
            BuildError::new(
                ErrorKind::InvalidNumber,
                format!("expected 3 values in '{tag}', found {}", values.len()),
            )
        })
    };
    match tag {
        TAG_SLOPE => op.slope = triple(&values)?,
        TAG_OFFSET => op.offset = triple(&values)?,
        TAG_POWER => op.power = triple(&values)?,
        TAG_SATURATION => {
            let [s] = values[..] else {
                return Err(BuildError::new(
                    ErrorKind::InvalidNumber,
                    format!("expected 1 value in '{tag}', found {}", values.len()),
                ));
            };
            op.saturation = s;
        }
        _ => {
            return Err(BuildError::new(
                ErrorKind::StructuralError,
                format!("unexpected CDL value element '{tag}'"),
            ))
        }
    }
    Ok(())
}

// ---- Gamma -----------------------------------------------------------------

#[derive(Debug)]
pub struct GammaBuilder {
    pub op: GammaOp,
    alpha_params: bool,
    v2_styles: bool,
    any_params: bool,
}

impl GammaBuilder {
    fn v1_2() -> Self {
        Self { op: GammaOp::default(), alpha_params: false, v2_styles: false, any_params: false }
    }

    fn v1_5() -> Self {
        Self { alpha_params: true, ..Self::v1_2() }
    }

    fn ctf_2_0() -> Self {
        Self { alpha_params: true, v2_styles: true, ..Self::v1_2() }
    }

    fn clf_3_0() -> Self {
        Self { alpha_params: false, v2_styles: true, ..Self::v1_2() }
    }

    fn start(&mut self, element: &str, attrs: &[(String, String)]) -> BuildResult<()> {
        let (common, rest) = CommonAttrs::take(element, attrs)?;
        common.install(&mut self.op.base);
        let mut style_found = false;
        for (k, v) in rest {
            match k.as_str() {
                ATTR_STYLE => {
                    let style = GammaStyle::parse(&v).ok_or_else(|| style_error(element, &v))?;
                    if style.requires_v2() && !self.v2_styles {
                        return Err(style_error(element, &v));
                    }
                    self.op.style = style;
                    style_found = true;
                }
                _ => warn_attr(element, &k),
            }
        }
        if !style_found {
            return Err(missing_style(element));
        }
        Ok(())
    }

    /// Applies one GammaParams/ExponentParams element.
    pub fn params(&mut self, attrs: &[(String, String)]) -> BuildResult<()> {
        let mut channel: Option<usize> = None;
        let mut gamma: Option<f64> = None;
        let mut offset: Option<f64> = None;
        for (k, v) in attrs {
            match k.as_str() {
                ATTR_CHANNEL => {
                    channel = Some(match v.as_str() {
                        "R" => 0,
                        "G" => 1,
                        "B" => 2,
                        "A" if self.alpha_params => 3,
                        _ => {
                            return Err(BuildError::new(
                                ErrorKind::Validation,
                                format!("illegal channel attribute value '{v}'"),
                            ))
                        }
                    });
                }
                ATTR_GAMMA | "exponent" => gamma = Some(attr_f64(v, "gamma")?),
                "offset" => offset = Some(attr_f64(v, "offset")?),
                _ => warn_attr(TAG_GAMMA_PARAMS, k),
            }
        }
        let gamma = gamma.ok_or_else(|| {
            BuildError::new(ErrorKind::MissingAttribute, "required attribute 'gamma' is missing")
        })?;
        if offset.is_some() && !self.op.style.is_moncurve() {
            return Err(BuildError::new(
                ErrorKind::Validation,
                "'offset' is only legal for the moncurve styles",
            ));
        }
        let params = GammaParams { gamma, offset: offset.unwrap_or(0.0) };
        match channel {
            Some(ch) => self.op.params[ch] = params,
            None => {
                for ch in 0..3 {
                    self.op.params[ch] = params;
                }
                if self.alpha_params {
                    self.op.params[3] = GammaParams::identity();
                }
            }
        }
        self.any_params = true;
        Ok(())
    }

    fn end(mut self) -> BuildResult<Vec<Op>> {
        if !self.any_params {
            return Err(BuildError::new(
                ErrorKind::MissingAttribute,
                "Gamma requires at least one params element",
            ));
        }
        if !self.alpha_params {
            self.op.params[3] = GammaParams::identity();
        }
        validated(Op::Gamma(self.op))
    }
}

// ---- Log -------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LogParamType {
    Cineon,
    Modern,
}

#[derive(Debug)]
pub struct LogBuilder {
    pub op: LogOp,
    style: Option<LogStyle>,
    allow_modern: bool,
    allow_cineon: bool,
    param_type: Option<LogParamType>,
    base_set: bool,
    cineon: [Option<[f64; 5]>; 3],
}

impl LogBuilder {
    fn legacy() -> Self {
        Self {
            op: LogOp::default(),
            style: None,
            allow_modern: false,
            allow_cineon: true,
            param_type: None,
            base_set: false,
            cineon: [None; 3],
        }
    }

    fn v2() -> Self {
        Self { allow_modern: true, ..Self::legacy() }
    }

    /// Restricts CLF files to the modern parameterization.
    pub fn set_clf(&mut self, is_clf: bool) {
        if is_clf {
            self.allow_cineon = false;
        }
    }

    fn start(&mut self, element: &str, attrs: &[(String, String)]) -> BuildResult<()> {
        let (common, rest) = CommonAttrs::take(element, attrs)?;
        common.install(&mut self.op.base);
        for (k, v) in rest {
            match k.as_str() {
                ATTR_STYLE => {
                    let style = LogStyle::parse(&v).ok_or_else(|| style_error(element, &v))?;
                    if style.is_camera() && !self.allow_modern {
                        return Err(style_error(element, &v));
                    }
                    self.style = Some(style);
                }
                _ => warn_attr(element, &k),
            }
        }
        let style = self.style.ok_or_else(|| missing_style(element))?;
        self.op.style = style;
        Ok(())
    }

    fn set_base(&mut self, base: f64) -> BuildResult<()> {
        if self.base_set && self.op.log_base != base {
            return Err(BuildError::new(
                ErrorKind::Validation,
                format!(
                    "log base has to be the same on all components: current base {}, new base {}",
                    self.op.log_base, base
                ),
            ));
        }
        self.base_set = true;
        self.op.log_base = base;
        Ok(())
    }

    /// Applies one LogParams element.
    pub fn params(&mut self, attrs: &[(String, String)]) -> BuildResult<()> {
        let style = self.op.style;
        let camera = style.is_camera();

        let mut channel: Option<usize> = None;
        let mut cineon = [f64::NAN; 5];
        let mut modern = LogParams::default();
        let mut saw_cineon = false;
        let mut saw_modern = false;
        let mut base: Option<f64> = None;

        for (k, v) in attrs {
            let key = k.as_str();
            match key {
                ATTR_CHANNEL => {
                    channel = Some(match v.as_str() {
                        "R" => 0,
                        "G" => 1,
                        "B" => 2,
                        _ => {
                            return Err(BuildError::new(
                                ErrorKind::Validation,
                                format!("illegal channel attribute value '{v}'"),
                            ))
                        }
                    });
                }
                ATTR_GAMMA if self.allow_cineon => {
                    cineon[0] = attr_f64(v, "gamma")?;
                    saw_cineon = true;
                }
                ATTR_REF_WHITE if self.allow_cineon => {
                    cineon[1] = attr_f64(v, "refWhite")?;
                    saw_cineon = true;
                }
                ATTR_REF_BLACK if self.allow_cineon => {
                    cineon[2] = attr_f64(v, "refBlack")?;
                    saw_cineon = true;
                }
                ATTR_HIGHLIGHT if self.allow_cineon => {
                    cineon[3] = attr_f64(v, "highlight")?;
                    saw_cineon = true;
                }
                ATTR_SHADOW if self.allow_cineon => {
                    cineon[4] = attr_f64(v, "shadow")?;
                    saw_cineon = true;
                }
                ATTR_LIN_SIDE_SLOPE if self.allow_modern => {
                    modern.lin_side_slope = attr_f64(v, "linSideSlope")?;
                    saw_modern = true;
                }
                ATTR_LIN_SIDE_OFFSET if self.allow_modern => {
                    modern.lin_side_offset = attr_f64(v, "linSideOffset")?;
                    saw_modern = true;
                }
                ATTR_LOG_SIDE_SLOPE if self.allow_modern => {
                    modern.log_side_slope = attr_f64(v, "logSideSlope")?;
                    saw_modern = true;
                }
                ATTR_LOG_SIDE_OFFSET if self.allow_modern => {
                    modern.log_side_offset = attr_f64(v, "logSideOffset")?;
                    saw_modern = true;
                }
                ATTR_BASE if self.allow_modern => {
                    base = Some(attr_f64(v, "base")?);
                    saw_modern = true;
                }
                ATTR_LIN_SIDE_BREAK if self.allow_modern => {
                    if !camera {
                        return Err(BuildError::new(
                            ErrorKind::Validation,
                            "'linSideBreak' is only allowed for the camera log styles",
                        ));
                    }
                    modern.lin_side_break = Some(attr_f64(v, "linSideBreak")?);
                    saw_modern = true;
                }
                ATTR_LINEAR_SLOPE if self.allow_modern => {
                    if !camera {
                        return Err(BuildError::new(
                            ErrorKind::Validation,
                            "'linearSlope' is only allowed for the camera log styles",
                        ));
                    }
                    modern.linear_slope = Some(attr_f64(v, "linearSlope")?);
                    saw_modern = true;
                }
                _ => warn_attr(TAG_LOG_PARAMS, key),
            }
        }

        if saw_cineon && saw_modern {
            return Err(BuildError::new(
                ErrorKind::MixedLogParams,
                "CLF type and Cineon type parameters cannot be mixed",
            ));
        }
        let new_type = if saw_cineon { LogParamType::Cineon } else { LogParamType::Modern };
        if let Some(prev) = self.param_type {
            if prev != new_type {
                return Err(BuildError::new(
                    ErrorKind::MixedLogParams,
                    "CLF type and Cineon type parameters cannot be mixed",
                ));
            }
        }
        self.param_type = Some(new_type);

        if saw_cineon {
            for (i, name) in
                ["gamma", "refWhite", "refBlack", "highlight", "shadow"].iter().enumerate()
            {
                if cineon[i].is_nan() {
                    return Err(BuildError::new(
                        ErrorKind::MissingAttribute,
                        format!("required attribute '{name}' is missing"),
                    ));
                }
            }
            match channel {
                Some(ch) => self.cineon[ch] = Some(cineon),
                None => self.cineon = [Some(cineon); 3],
            }
            return Ok(());
        }

        if camera && modern.lin_side_break.is_none() {
            return Err(BuildError::new(
                ErrorKind::MissingAttribute,
                "'linSideBreak' should be defined for the camera log styles",
            ));
        }
        if let Some(b) = base {
            self.set_base(b)?;
        }
        match channel {
            Some(ch) => self.op.params[ch] = modern,
            None => self.op.params = [modern; 3],
        }
        Ok(())
    }

    fn end(mut self) -> BuildResult<Vec<Op>> {
        let style = self.op.style;
        match self.param_type {
            Some(LogParamType::Cineon) => {
                self.op.log_base = 10.0;
                for ch in 0..3 {
                    if let Some([gamma, white, black, highlight, shadow]) = self.cineon[ch] {
                        self.op.params[ch] =
                            LogParams::from_cineon(gamma, white, black, highlight, shadow);
                    }
                }
            }
            _ => {}
        }
        // The plain log/antilog styles fix their base by name.
        match style {
            LogStyle::Log2 | LogStyle::AntiLog2 => self.op.log_base = 2.0,
            LogStyle::Log10 | LogStyle::AntiLog10 => self.op.log_base = 10.0,
            _ => {}
        }
        validated(Op::Log(self.op))
    }
}

// ---- ExposureContrast ------------------------------------------------------

#[derive(Debug, Default)]
pub struct EcBuilder {
    pub op: ExposureContrastOp,
    params_seen: bool,
}

impl EcBuilder {
    fn start(&mut self, element: &str, attrs: &[(String, String)]) -> BuildResult<()> {
        let (common, rest) = CommonAttrs::take(element, attrs)?;
        common.install(&mut self.op.base);
        let mut style_found = false;
        for (k, v) in rest {
            match k.as_str() {
                ATTR_STYLE => {
                    self.op.style = EcStyle::parse(&v).ok_or_else(|| style_error(element, &v))?;
                    style_found = true;
                }
                _ => warn_attr(element, &k),
            }
        }
        if !style_found {
            return Err(missing_style(element));
        }
        Ok(())
    }

    /// Applies the ECParams element.
    pub fn params(&mut self, attrs: &[(String, String)]) -> BuildResult<()> {
        if self.params_seen {
            return Err(BuildError::new(
                ErrorKind::StructuralError,
                "only one ECParams element is allowed",
            ));
        }
        self.params_seen = true;
        for (k, v) in attrs {
            match k.as_str() {
                ATTR_EXPOSURE => self.op.exposure = attr_f64(v, "exposure")?,
                ATTR_CONTRAST => self.op.contrast = attr_f64(v, "contrast")?,
                ATTR_GAMMA => self.op.gamma = attr_f64(v, "gamma")?,
                ATTR_PIVOT => self.op.pivot = attr_f64(v, "pivot")?,
                ATTR_LOG_EXPOSURE_STEP => {
                    self.op.log_exposure_step = attr_f64(v, "logExposureStep")?
                }
                ATTR_LOG_MID_GRAY => self.op.log_mid_gray = attr_f64(v, "logMidGray")?,
                _ => warn_attr(TAG_EC_PARAMS, k),
            }
        }
        Ok(())
    }

    /// Applies a DynamicParameter element.
    pub fn dynamic_param(&mut self, attrs: &[(String, String)]) -> BuildResult<()> {
        let param = attrs
            .iter()
            .find(|(k, _)| k == ATTR_PARAM)
            .map(|(_, v)| v.as_str())
            .ok_or_else(|| {
                BuildError::new(ErrorKind::MissingAttribute, "required attribute 'param' is missing")
            })?;
        match param {
            "EXPOSURE" => self.op.exposure_dynamic = true,
            "CONTRAST" => self.op.contrast_dynamic = true,
            "GAMMA" => self.op.gamma_dynamic = true,
            _ => {
                return Err(BuildError::new(
                    ErrorKind::Validation,
                    format!("dynamic parameter '{param}' is not supported on ExposureContrast"),
                ))
            }
        }
        Ok(())
    }

    fn end(self) -> BuildResult<Vec<Op>> {
        if !self.params_seen {
            return Err(BuildError::new(
                ErrorKind::MissingAttribute,
                "ExposureContrast requires an ECParams element",
            ));
        }
        validated(Op::ExposureContrast(self.op))
    }
}

// ---- FixedFunction / ACES / Function ---------------------------------------

#[derive(Debug)]
pub struct FixedFunctionBuilder {
    pub op: FixedFunctionOp,
    /// ACES element: styles restricted to the look modifiers, parameters
    /// through an ACESParams child.
    aces_element: bool,
    /// Modern element: parameters through the `params` attribute.
    params_attr: bool,
}

impl FixedFunctionBuilder {
    fn aces() -> Self {
        Self { op: FixedFunctionOp::default(), aces_element: true, params_attr: false }
    }

    fn modern() -> Self {
        Self { op: FixedFunctionOp::default(), aces_element: false, params_attr: true }
    }

    fn function() -> Self {
        Self { op: FixedFunctionOp::default(), aces_element: false, params_attr: false }
    }

    /// True when an ACESParams child is legal.
    pub fn accepts_aces_params(&self) -> bool {
        self.aces_element
    }

    fn start(&mut self, element: &str, attrs: &[(String, String)]) -> BuildResult<()> {
        let (common, rest) = CommonAttrs::take(element, attrs)?;
        common.install(&mut self.op.base);
        let mut style_found = false;
        for (k, v) in rest {
            match k.as_str() {
                ATTR_STYLE => {
                    let style =
                        FixedFunctionStyle::parse(&v).ok_or_else(|| style_error(element, &v))?;
                    if self.aces_element && !style.is_aces_look() {
                        return Err(style_error(element, &v));
                    }
                    self.op.style = style;
                    style_found = true;
                }
                ATTR_PARAMS if self.params_attr => {
                    self.op.params = numbers_f64(&v, "FixedFunction params")?;
                }
                _ => warn_attr(element, &k),
            }
        }
        if !style_found {
            return Err(missing_style(element));
        }
        Ok(())
    }

    /// Applies an ACESParams child (`gamma` attribute).
    pub fn aces_params(&mut self, attrs: &[(String, String)]) -> BuildResult<()> {
        if !self.op.params.is_empty() {
            return Err(BuildError::new(
                ErrorKind::StructuralError,
                "ACES element expects only one ACESParams",
            ));
        }
        let gamma = attrs
            .iter()
            .find(|(k, _)| k == ATTR_GAMMA)
            .map(|(_, v)| attr_f64(v, "gamma"))
            .transpose()?
            .ok_or_else(|| {
                BuildError::new(ErrorKind::MissingAttribute, "required parameter 'gamma' is missing")
            })?;
        if self.op.style.param_count() == 0 {
            return Err(BuildError::new(
                ErrorKind::Validation,
                format!("style {} does not take any parameter", self.op.style.as_str()),
            ));
        }
        self.op.params = vec![gamma];
        Ok(())
    }

    fn end(self) -> BuildResult<Vec<Op>> {
        validated(Op::FixedFunction(self.op))
    }
}

// ---- Grading ops -----------------------------------------------------------

#[derive(Debug)]
pub struct GradingPrimaryBuilder {
    pub op: GradingPrimaryOp,
}

impl Default for GradingPrimaryBuilder {
    fn default() -> Self {
        Self { op: GradingPrimaryOp::identity(GradingStyle::Log) }
    }
}

impl GradingPrimaryBuilder {
    fn start(&mut self, element: &str, attrs: &[(String, String)]) -> BuildResult<()> {
        let (common, rest) = CommonAttrs::take(element, attrs)?;
        let mut style_found = false;
        for (k, v) in &rest {
            if k == ATTR_STYLE {
                let (style, dir) =
                    GradingStyle::parse(v).ok_or_else(|| style_error(element, v))?;
                self.op = GradingPrimaryOp::identity(style);
                self.op.direction = dir;
                style_found = true;
            }
        }
        common.install(&mut self.op.base);
        for (k, _) in rest.iter().filter(|(k, _)| k != ATTR_STYLE) {
            warn_attr(element, k);
        }
        if !style_found {
            return Err(missing_style(element));
        }
        Ok(())
    }

    /// Applies one named parameter element (Brightness, Pivot, ...).
    pub fn param(&mut self, tag: &str, attrs: &[(String, String)]) -> BuildResult<()> {
        match tag {
            TAG_PRIMARY_BRIGHTNESS => parse_rgbm(attrs, &mut self.op.brightness),
            TAG_PRIMARY_CONTRAST => parse_rgbm(attrs, &mut self.op.contrast),
            TAG_PRIMARY_GAMMA => parse_rgbm(attrs, &mut self.op.gamma),
            TAG_PRIMARY_OFFSET => parse_rgbm(attrs, &mut self.op.offset),
            TAG_PRIMARY_EXPOSURE => parse_rgbm(attrs, &mut self.op.exposure),
            TAG_PRIMARY_LIFT => parse_rgbm(attrs, &mut self.op.lift),
            TAG_PRIMARY_GAIN => parse_rgbm(attrs, &mut self.op.gain),
            TAG_PRIMARY_PIVOT => {
                for (k, v) in attrs {
                    match k.as_str() {
                        ATTR_CONTRAST => self.op.pivot = attr_f64(v, "pivot contrast")?,
                        ATTR_BLACK => self.op.pivot_black = attr_f64(v, "pivot black")?,
                        ATTR_WHITE => self.op.pivot_white = attr_f64(v, "pivot white")?,
                        _ => {
                            return Err(BuildError::new(
                                ErrorKind::Validation,
                                format!("illegal attribute '{k}' for 'Pivot'"),
                            ))
                        }
                    }
                }
                Ok(())
            }
            TAG_PRIMARY_SATURATION => {
                for (k, v) in attrs {
                    match k.as_str() {
                        ATTR_MASTER => self.op.saturation = attr_f64(v, "saturation")?,
                        _ => {
                            return Err(BuildError::new(
                                ErrorKind::Validation,
                                format!("illegal attribute '{k}' for 'Saturation'"),
                            ))
                        }
                    }
                }
                Ok(())
            }
            TAG_PRIMARY_CLAMP => {
                for (k, v) in attrs {
                    match k.as_str() {
                        ATTR_BLACK => self.op.clamp_black = attr_f64(v, "clamp black")?,
                        ATTR_WHITE => self.op.clamp_white = attr_f64(v, "clamp white")?,
                        _ => {
                            return Err(BuildError::new(
                                ErrorKind::Validation,
                                format!("illegal attribute '{k}' for 'Clamp'"),
                            ))
                        }
                    }
                }
                Ok(())
            }
            _ => Err(BuildError::new(
                ErrorKind::MisplacedElement,
                format!("unexpected GradingPrimary parameter '{tag}'"),
            )),
        }
    }

    /// Marks the whole primary dynamic.
    pub fn dynamic_param(&mut self, attrs: &[(String, String)]) -> BuildResult<()> {
        expect_dynamic_param(attrs, "PRIMARY")?;
        self.op.dynamic = true;
        Ok(())
    }

    fn end(self) -> BuildResult<Vec<Op>> {
        validated(Op::GradingPrimary(self.op))
    }
}

fn parse_rgbm(attrs: &[(String, String)], rgbm: &mut GradingRgbm) -> BuildResult<()> {
    let mut rgb_found = false;
    let mut master_found = false;
    for (k, v) in attrs {
        match k.as_str() {
            ATTR_RGB => {
                let values = numbers_f64(v, "rgb values")?;
                let [r, g, b] = values[..] else {
                    return Err(BuildError::new(
                        ErrorKind::InvalidNumber,
                        format!("illegal number of 'rgb' values: {}", values.len()),
                    ));
                };
                rgbm.red = r;
                rgbm.green = g;
                rgbm.blue = b;
                rgb_found = true;
            }
            ATTR_MASTER => {
                rgbm.master = attr_f64(v, "master")?;
                master_found = true;
            }
            _ => {
                return Err(BuildError::new(
                    ErrorKind::Validation,
                    format!("illegal attribute '{k}' for an rgb/master parameter"),
                ))
            }
        }
    }
    if !rgb_found {
        return Err(BuildError::new(ErrorKind::MissingAttribute, "missing 'rgb' attribute"));
    }
    if !master_found {
        return Err(BuildError::new(ErrorKind::MissingAttribute, "missing 'master' attribute"));
    }
    Ok(())
}

fn expect_dynamic_param(attrs: &[(String, String)], expected: &str) -> BuildResult<()> {
    let param = attrs
        .iter()
        .find(|(k, _)| k == ATTR_PARAM)
        .map(|(_, v)| v.as_str())
        .ok_or_else(|| {
            BuildError::new(ErrorKind::MissingAttribute, "required attribute 'param' is missing")
        })?;
    if param != expected {
        return Err(BuildError::new(
            ErrorKind::Validation,
            format!("dynamic parameter '{param}' is not supported here"),
        ));
    }
    Ok(())
}

#[derive(Debug)]
pub struct GradingRgbCurveBuilder {
    pub op: GradingRgbCurveOp,
}

impl Default for GradingRgbCurveBuilder {
    fn default() -> Self {
        Self { op: GradingRgbCurveOp::identity(GradingStyle::Log) }
    }
}

impl GradingRgbCurveBuilder {
    fn start(&mut self, element: &str, attrs: &[(String, String)]) -> BuildResult<()> {
        let (common, rest) = CommonAttrs::take(element, attrs)?;
        let mut style_found = false;
        let mut bypass = false;
        for (k, v) in &rest {
            match k.as_str() {
                ATTR_STYLE => {
                    let (style, dir) =
                        GradingStyle::parse(v).ok_or_else(|| style_error(element, v))?;
                    self.op = GradingRgbCurveOp::identity(style);
                    self.op.direction = dir;
                    style_found = true;
                }
                ATTR_BYPASS_LIN_TO_LOG => bypass = v.eq_ignore_ascii_case("true"),
                _ => warn_attr(element, k),
            }
        }
        common.install(&mut self.op.base);
        self.op.bypass_lin_to_log = bypass;
        if !style_found {
            return Err(missing_style(element));
        }
        Ok(())
    }

    /// Installs one finished channel curve.
    pub fn set_curve(&mut self, tag: &str, curve: BSplineCurve) -> BuildResult<()> {
        match tag {
            TAG_CURVE_RED => self.op.red = curve,
            TAG_CURVE_GREEN => self.op.green = curve,
            TAG_CURVE_BLUE => self.op.blue = curve,
            TAG_CURVE_MASTER => self.op.master = curve,
            _ => {
                return Err(BuildError::new(
                    ErrorKind::MisplacedElement,
                    format!("unexpected curve element '{tag}'"),
                ))
            }
        }
        Ok(())
    }

    /// Marks the curves dynamic.
    pub fn dynamic_param(&mut self, attrs: &[(String, String)]) -> BuildResult<()> {
        expect_dynamic_param(attrs, "RGB_CURVE")?;
        self.op.dynamic = true;
        Ok(())
    }

    fn end(self) -> BuildResult<Vec<Op>> {
        validated(Op::GradingRgbCurve(self.op))
    }
}

#[derive(Debug)]
pub struct GradingToneBuilder {
    pub op: GradingToneOp,
}

impl Default for GradingToneBuilder {
    fn default() -> Self {
        Self { op: GradingToneOp::identity(GradingStyle::Log) }
    }
}

impl GradingToneBuilder {
    fn start(&mut self, element: &str, attrs: &[(String, String)]) -> BuildResult<()> {
        let (common, rest) = CommonAttrs::take(element, attrs)?;
        let mut style_found = false;
        for (k, v) in &rest {
            if k == ATTR_STYLE {
                let (style, dir) =
                    GradingStyle::parse(v).ok_or_else(|| style_error(element, v))?;
                self.op = GradingToneOp::identity(style);
                self.op.direction = dir;
                style_found = true;
            } else {
                warn_attr(element, k);
            }
        }
        common.install(&mut self.op.base);
        if !style_found {
            return Err(missing_style(element));
        }
        Ok(())
    }

    /// Applies one named zone element or the SContrast scalar.
    pub fn param(&mut self, tag: &str, attrs: &[(String, String)]) -> BuildResult<()> {
        match tag {
            TAG_TONE_BLACKS => parse_rgbmsw(attrs, &mut self.op.blacks, false),
            TAG_TONE_SHADOWS => parse_rgbmsw(attrs, &mut self.op.shadows, true),
            TAG_TONE_MIDTONES => parse_rgbmsw(attrs, &mut self.op.midtones, false),
            TAG_TONE_HIGHLIGHTS => parse_rgbmsw(attrs, &mut self.op.highlights, true),
            TAG_TONE_WHITES => parse_rgbmsw(attrs, &mut self.op.whites, false),
            TAG_TONE_SCONTRAST => {
                for (k, v) in attrs {
                    match k.as_str() {
                        ATTR_MASTER => self.op.s_contrast = attr_f64(v, "SContrast")?,
                        _ => {
                            return Err(BuildError::new(
                                ErrorKind::Validation,
                                format!("illegal attribute '{k}' for 'SContrast'"),
                            ))
                        }
                    }
                }
                Ok(())
            }
            _ => Err(BuildError::new(
                ErrorKind::MisplacedElement,
                format!("unexpected GradingTone parameter '{tag}'"),
            )),
        }
    }

    /// Marks the tone controls dynamic.
    pub fn dynamic_param(&mut self, attrs: &[(String, String)]) -> BuildResult<()> {
        expect_dynamic_param(attrs, "TONE")?;
        self.op.dynamic = true;
        Ok(())
    }

    fn end(self) -> BuildResult<Vec<Op>> {
        validated(Op::GradingTone(self.op))
    }
}

fn parse_rgbmsw(
    attrs: &[(String, String)],
    zone: &mut GradingRgbmsw,
    uses_pivot: bool,
) -> BuildResult<()> {
    for (k, v) in attrs {
        match k.as_str() {
            ATTR_RGB => {
                let values = numbers_f64(v, "rgb values")?;
                let [r, g, b] = values[..] else {
                    return Err(BuildError::new(
                        ErrorKind::InvalidNumber,
                        format!("illegal number of 'rgb' values: {}", values.len()),
                    ));
                };
                zone.red = r;
                zone.green = g;
                zone.blue = b;
            }
            ATTR_MASTER => zone.master = attr_f64(v, "master")?,
            ATTR_START => zone.start = attr_f64(v, "start")?,
            ATTR_CENTER if !uses_pivot => zone.start = attr_f64(v, "center")?,
            ATTR_WIDTH if !uses_pivot => zone.width = attr_f64(v, "width")?,
            ATTR_PIVOT if uses_pivot => zone.width = attr_f64(v, "pivot")?,
            _ => {
                return Err(BuildError::new(
                    ErrorKind::Validation,
                    format!("illegal attribute '{k}' for a tone zone"),
                ))
            }
        }
    }
    Ok(())
}

// ---- Reference -------------------------------------------------------------

#[derive(Debug, Default)]
pub struct ReferenceBuilder {
    pub op: ReferenceOp,
}

impl ReferenceBuilder {
    fn start(&mut self, element: &str, attrs: &[(String, String)]) -> BuildResult<()> {
        let (common, rest) = CommonAttrs::take(element, attrs)?;
        common.install(&mut self.op.base);
        for (k, v) in rest {
            match k.as_str() {
                ATTR_PATH => self.op.path = v,
                ATTR_BASE_PATH => self.op.base_path = v,
                ATTR_ALIAS => {
                    if v.eq_ignore_ascii_case("currentMonitor") {
                        return Err(BuildError::new(
                            ErrorKind::Validation,
                            "the 'currentMonitor' alias is not supported",
                        ));
                    }
                    self.op.alias = v;
                }
                ATTR_INVERTED => {
                    if v.eq_ignore_ascii_case("true") {
                        self.op.direction = Direction::Inverse;
                    }
                }
                _ => warn_attr(element, &k),
            }
        }
        Ok(())
    }

    fn end(self) -> BuildResult<Vec<Op>> {
        validated(Op::Reference(self.op))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clf_core::V1_7;

    #[test]
    fn selection_honors_versions() {
        assert!(select_reader(OpTag::Lut1d, V1_2, false).is_some());
        assert!(select_reader(OpTag::FixedFunction, V1_7, false).is_none());
        assert!(select_reader(OpTag::FixedFunction, V2_0, false).is_some());
        assert!(select_reader(OpTag::GradingPrimary, V1_8, false).is_none());
        assert!(select_reader(OpTag::GradingPrimary, V2_0, false).is_some());
        assert!(select_reader(OpTag::Log, V1_2, false).is_none());
        assert!(select_reader(OpTag::Log, V1_3, false).is_some());
    }

    #[test]
    fn selection_honors_dialect() {
        // CTF-only ops never resolve in CLF.
        assert!(select_reader(OpTag::FixedFunction, V2_0, true).is_none());
        assert!(select_reader(OpTag::ExposureContrast, V2_0, true).is_none());
        assert!(select_reader(OpTag::InvLut1d, V2_0, true).is_none());
        assert!(select_reader(OpTag::Reference, V2_0, true).is_none());
        // Shared ops resolve in both.
        assert!(select_reader(OpTag::Matrix, V1_7, true).is_some());
        assert!(select_reader(OpTag::Cdl, V1_7, true).is_some());
        // CLF 3 gets a Gamma reader (the no-alpha variant) and Log.
        assert!(select_reader(OpTag::Gamma, V2_0, true).is_some());
        assert!(select_reader(OpTag::Gamma, V1_7, true).is_none());
        assert!(select_reader(OpTag::Log, V2_0, true).is_some());
        assert!(select_reader(OpTag::Log, V1_7, true).is_none());
    }

    #[test]
    fn lut1d_version_variants() {
        // hueAdjust only parses from 1.4.
        let mut b13 = match select_reader(OpTag::Lut1d, V1_3, false).unwrap() {
            OpBuilder::Lut1d(b) => b,
            _ => unreachable!(),
        };
        assert!(!b13.allow_hue_adjust);
        assert!(!b13.accepts_index_map());
        let attrs = vec![
            ("inBitDepth".to_string(), "32f".to_string()),
            ("outBitDepth".to_string(), "32f".to_string()),
        ];
        b13.start(TAG_LUT1D, &attrs).unwrap();

        let b17 = match select_reader(OpTag::Lut1d, V1_7, false).unwrap() {
            OpBuilder::Lut1d(b) => b,
            _ => unreachable!(),
        };
        assert!(b17.allow_hue_adjust);
        assert!(b17.accepts_index_map());
    }

    #[test]
    fn matrix_payload_shapes() {
        let mk = || {
            let mut b = MatrixBuilder::v1_3();
            let attrs = vec![
                ("inBitDepth".to_string(), "32f".to_string()),
                ("outBitDepth".to_string(), "32f".to_string()),
            ];
            b.start(TAG_MATRIX, &attrs).unwrap();
            b
        };

        // 3x4 payload splits into matrix + offsets.
        let mut b = mk();
        b.begin_array(&[3, 4, 3]).unwrap();
        let vals = [2.0, 0.0, 0.0, 0.5, 0.0, 2.0, 0.0, 0.5, 0.0, 0.0, 2.0, 0.5];
        for v in vals {
            b.array_mut().unwrap().push(v).unwrap();
        }
        b.end_array().unwrap();
        assert_eq!(b.op.offsets[0], 0.5);
        assert_eq!(b.op.matrix[0], 2.0);
        let ops = b.end().unwrap();
        assert_eq!(ops.len(), 1);

        // Bad dims are rejected.
        let mut b = mk();
        assert!(b.begin_array(&[2, 2]).is_err());
        let mut b = mk();
        assert!(b.begin_array(&[3, 3, 4]).is_err());
    }

    #[test]
    fn legacy_matrix_packs_offsets_in_the_fourth_column() {
        let mut b = MatrixBuilder::v1_2();
        let attrs = vec![
            ("inBitDepth".to_string(), "32f".to_string()),
            ("outBitDepth".to_string(), "32f".to_string()),
        ];
        b.start(TAG_MATRIX, &attrs).unwrap();
        b.begin_array(&[4, 4, 3]).unwrap();
        let vals = [
            1.0, 0.0, 0.0, 0.25,
            0.0, 1.0, 0.0, 0.5,
            0.0, 0.0, 1.0, 0.75,
            0.0, 0.0, 0.0, 1.0,
        ];
        for v in vals {
            b.array_mut().unwrap().push(v).unwrap();
        }
        b.end_array().unwrap();
        assert_eq!(b.op.offsets[..3], [0.25, 0.5, 0.75]);
        assert!(!b.op.uses_alpha());
        assert_eq!(b.op.matrix[0], 1.0);
    }

    #[test]
    fn missing_bit_depth_is_reported() {
        let mut b = MatrixBuilder::v1_3();
        let attrs = vec![("inBitDepth".to_string(), "32f".to_string())];
        let err = b.start(TAG_MATRIX, &attrs).unwrap_err();
        assert_eq!(err.kind, ErrorKind::MissingAttribute);
        assert!(err.message.contains("outBitDepth"));
    }

    #[test]
    fn gamma_alpha_handling() {
        let attrs = vec![
            ("inBitDepth".to_string(), "32f".to_string()),
            ("outBitDepth".to_string(), "32f".to_string()),
            ("style".to_string(), "basicFwd".to_string()),
        ];

        // 1.2 reader forces alpha identity and rejects v2 styles.
        let mut b = GammaBuilder::v1_2();
        b.start(TAG_GAMMA, &attrs).unwrap();
        b.params(&[("gamma".to_string(), "2.2".to_string())]).unwrap();
        let ops = b.end().unwrap();
        match &ops[0] {
            Op::Gamma(g) => {
                assert_eq!(g.params[0].gamma, 2.2);
                assert_eq!(g.params[3].gamma, 1.0);
            }
            _ => unreachable!(),
        }

        let mut b = GammaBuilder::v1_2();
        let mut v2 = attrs.clone();
        v2[2].1 = "basicMirrorFwd".to_string();
        assert_eq!(b.start(TAG_GAMMA, &v2).unwrap_err().kind, ErrorKind::UnknownStyle);

        let mut b = GammaBuilder::ctf_2_0();
        b.start(TAG_GAMMA, &v2).unwrap();
    }

    #[test]
    fn log_param_mixing_fails() {
        let attrs = vec![
            ("inBitDepth".to_string(), "32f".to_string()),
            ("outBitDepth".to_string(), "32f".to_string()),
            ("style".to_string(), "linToLog".to_string()),
        ];
        let mut b = LogBuilder::v2();
        b.start(TAG_LOG, &attrs).unwrap();
        let err = b
            .params(&[
                ("linSideSlope".to_string(), "1.0".to_string()),
                ("refWhite".to_string(), "685".to_string()),
            ])
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::MixedLogParams);
    }

    #[test]
    fn cineon_params_require_all_five() {
        let attrs = vec![
            ("inBitDepth".to_string(), "32f".to_string()),
            ("outBitDepth".to_string(), "32f".to_string()),
            ("style".to_string(), "logToLin".to_string()),
        ];
        let mut b = LogBuilder::legacy();
        b.start(TAG_LOG, &attrs).unwrap();
        let err = b
            .params(&[("gamma".to_string(), "0.6".to_string())])
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::MissingAttribute);

        let mut b = LogBuilder::legacy();
        b.start(TAG_LOG, &attrs).unwrap();
        b.params(&[
            ("gamma".to_string(), "0.6".to_string()),
            ("refWhite".to_string(), "685".to_string()),
            ("refBlack".to_string(), "95".to_string()),
            ("highlight".to_string(), "1.0".to_string()),
            ("shadow".to_string(), "0.0".to_string()),
        ])
        .unwrap();
        let ops = b.end().unwrap();
        match &ops[0] {
            Op::Log(l) => assert_eq!(l.log_base, 10.0),
            _ => unreachable!(),
        }
    }

    #[test]
    fn reference_rejects_current_monitor() {
        let mut b = ReferenceBuilder::default();
        let attrs = vec![
            ("inBitDepth".to_string(), "32f".to_string()),
            ("outBitDepth".to_string(), "32f".to_string()),
            ("alias".to_string(), "currentMonitor".to_string()),
        ];
        assert!(b.start(TAG_REFERENCE, &attrs).is_err());
    }
}
