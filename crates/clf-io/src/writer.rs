//! CLF/CTF writing.
//!
//! The writer walks a finished [`ProcessList`] and emits one element per
//! operator, restoring the bit-depth scaling the file dialect expects:
//! operator parameters are stored normalized, so values are multiplied
//! back up by the recorded file depths. Floats print in shortest
//! round-trip form, so re-reading a written file reproduces the same
//! normalized values.

use half::f16;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use clf_core::{Metadata, Version, V1_2, V1_3, V1_4, V1_5, V1_6, V1_7, V2_0};
use clf_ops::{
    Direction, GammaParams, Interpolation, LogStyle, Op, ProcessList, RangeStyle,
};

use crate::error::WriteError;
use crate::tags::*;

/// Output dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// Color Transform Format: every operator is representable.
    Ctf,
    /// Common LUT Format 3.0: the restricted operator set.
    Clf,
}

type WResult<T> = Result<T, WriteError>;

/// Serializes a process list to XML in the requested dialect.
pub fn write_process_list(pl: &ProcessList, dialect: Dialect) -> WResult<String> {
    pl.validate().map_err(|e| WriteError::Validation(e.to_string()))?;
    if dialect == Dialect::Clf {
        for op in &pl.ops {
            check_clf_representable(op)?;
        }
    }

    let mut buf = Vec::new();
    {
        let mut w = XmlOut { xml: Writer::new_with_indent(&mut buf, b' ', 4) };
        w.event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

        let mut root = BytesStart::new(TAG_PROCESS_LIST);
        root.push_attribute((ATTR_ID, pl.id.as_str()));
        match dialect {
            Dialect::Clf => {
                root.push_attribute((ATTR_COMP_CLF_VERSION, "3.0"));
            }
            Dialect::Ctf => {
                let version = minimum_ctf_version(pl);
                root.push_attribute((ATTR_VERSION, version.to_string().as_str()));
            }
        }
        if !pl.name.is_empty() {
            root.push_attribute((ATTR_NAME, pl.name.as_str()));
        }
        if !pl.inverse_of.is_empty() {
            root.push_attribute((ATTR_INVERSE_OF, pl.inverse_of.as_str()));
        }
        w.event(Event::Start(root))?;

        for d in &pl.descriptions {
            w.text_element(TAG_DESCRIPTION, d)?;
        }
        if !pl.input_descriptor.is_empty() {
            w.text_element(TAG_INPUT_DESCRIPTOR, &pl.input_descriptor)?;
        }
        if !pl.output_descriptor.is_empty() {
            w.text_element(TAG_OUTPUT_DESCRIPTOR, &pl.output_descriptor)?;
        }
        if !pl.info.is_empty() {
            w.metadata(&pl.info)?;
        }

        for op in &pl.ops {
            write_op(&mut w, op, dialect)?;
        }

        w.event(Event::End(BytesEnd::new(TAG_PROCESS_LIST)))?;
    }
    String::from_utf8(buf).map_err(|e| WriteError::Xml(e.to_string()))
}

/// The lowest CTF version whose readers accept every operator and style
/// in the list.
pub fn minimum_ctf_version(pl: &ProcessList) -> Version {
    let mut version = V1_2;
    for op in &pl.ops {
        let needed = match op {
            Op::Matrix(m) => {
                if m.has_offsets() || m.uses_alpha() { V1_3 } else { V1_2 }
            }
            Op::Lut1d(l) => {
                if l.direction == Direction::Inverse {
                    V1_3
                } else if l.hue_adjust != clf_ops::HueAdjust::None {
                    V1_4
                } else if l.half_domain || l.raw_halfs {
                    V1_3
                } else {
                    V1_2
                }
            }
            Op::Lut3d(l) => {
                if l.direction == Direction::Inverse { V1_6 } else { V1_2 }
            }
            Op::Range(r) => {
                if r.style == RangeStyle::NoClamp { V1_7 } else { V1_2 }
            }
            Op::Cdl(_) => V1_3,
            Op::Gamma(g) => {
                if g.style.requires_v2() {
                    V2_0
                } else if g.params[3] != GammaParams::identity() {
                    V1_5
                } else {
                    V1_2
                }
            }
            Op::Log(l) => {
                if l.style.is_camera() || has_modern_log_params(l) { V2_0 } else { V1_3 }
            }
            Op::ExposureContrast(_) => V1_3,
            Op::FixedFunction(_) => V2_0,
            Op::GradingPrimary(_) | Op::GradingRgbCurve(_) | Op::GradingTone(_) => V2_0,
            Op::Reference(_) => V1_2,
        };
        version = version.max(needed);
    }
    version
}

fn has_modern_log_params(l: &clf_ops::LogOp) -> bool {
    matches!(l.style, LogStyle::LinToLog | LogStyle::LogToLin)
        && l.params.iter().any(|p| {
            p.lin_side_slope != 1.0
                || p.lin_side_offset != 0.0
                || p.log_side_slope != 1.0
                || p.log_side_offset != 0.0
        })
}

fn check_clf_representable(op: &Op) -> WResult<()> {
    let ok = match op {
        Op::Matrix(m) => !m.uses_alpha() && m.direction == Direction::Forward,
        Op::Lut1d(l) => l.direction == Direction::Forward,
        Op::Lut3d(l) => l.direction == Direction::Forward,
        Op::Range(_) | Op::Cdl(_) => true,
        Op::Gamma(g) => g.params[3] == GammaParams::identity(),
        Op::Log(_) => true,
        Op::ExposureContrast(_)
        | Op::FixedFunction(_)
        | Op::GradingPrimary(_)
        | Op::GradingRgbCurve(_)
        | Op::GradingTone(_)
        | Op::Reference(_) => false,
    };
    if ok {
        Ok(())
    } else {
        Err(WriteError::UnsupportedInClf(op.kind().to_string()))
    }
}

// ============================================================================
// Emission helpers
// ============================================================================

struct XmlOut<W: std::io::Write> {
    xml: Writer<W>,
}

impl<W: std::io::Write> XmlOut<W> {
    fn event(&mut self, e: Event<'_>) -> WResult<()> {
        self.xml.write_event(e).map_err(|e| WriteError::Xml(format!("{e}")))
    }

    fn text_element(&mut self, name: &str, text: &str) -> WResult<()> {
        self.event(Event::Start(BytesStart::new(name)))?;
        self.event(Event::Text(BytesText::new(text)))?;
        self.event(Event::End(BytesEnd::new(name)))?;
        Ok(())
    }

    fn metadata(&mut self, node: &Metadata) -> WResult<()> {
        let mut start = BytesStart::new(node.name.as_str());
        for (k, v) in &node.attributes {
            start.push_attribute((k.as_str(), v.as_str()));
        }
        if node.children.is_empty() && node.value.is_empty() {
            self.event(Event::Empty(start))?;
            return Ok(());
        }
        self.event(Event::Start(start))?;
        if !node.value.is_empty() {
            self.event(Event::Text(BytesText::new(&node.value)))?;
        }
        for child in &node.children {
            self.metadata(child)?;
        }
        self.event(Event::End(BytesEnd::new(node.name.as_str())))?;
        Ok(())
    }
}

fn fmt(v: f64) -> String {
    v.to_string()
}

fn fmt3(v: [f64; 3]) -> String {
    format!("{} {} {}", v[0], v[1], v[2])
}

fn op_start<'a>(tag: &'a str, base: &clf_ops::OpBase) -> BytesStart<'a> {
    let mut start = BytesStart::new(tag);
    if !base.id.is_empty() {
        start.push_attribute((ATTR_ID, base.id.as_str()));
    }
    if !base.name.is_empty() {
        start.push_attribute((ATTR_NAME, base.name.as_str()));
    }
    start.push_attribute((ATTR_IN_BIT_DEPTH, base.in_depth.as_str()));
    start.push_attribute((ATTR_OUT_BIT_DEPTH, base.out_depth.as_str()));
    start
}

fn write_descriptions<W: std::io::Write>(
    w: &mut XmlOut<W>,
    base: &clf_ops::OpBase,
) -> WResult<()> {
    for d in &base.descriptions {
        w.text_element(TAG_DESCRIPTION, d)?;
    }
    Ok(())
}

fn write_op<W: std::io::Write>(w: &mut XmlOut<W>, op: &Op, dialect: Dialect) -> WResult<()> {
    match op {
        Op::Matrix(m) => {
            w.event(Event::Start(op_start(TAG_MATRIX, &m.base)))?;
            write_descriptions(w, &m.base)?;

            let in_scale = m.base.in_depth.scale();
            let out_scale = m.base.out_depth.scale();
            let alpha = m.uses_alpha();
            let offsets = m.has_offsets();
            let (rows, cols) = match (alpha, offsets) {
                (false, false) => (3, 3),
                (false, true) => (3, 4),
                (true, false) => (4, 4),
                (true, true) => (4, 5),
            };

            let mut arr = BytesStart::new(TAG_ARRAY);
            let dim = if dialect == Dialect::Clf {
                format!("{rows} {cols}")
            } else {
                format!("{rows} {cols} {rows}")
            };
            arr.push_attribute((ATTR_DIMENSION, dim.as_str()));
            w.event(Event::Start(arr))?;

            let k = out_scale / in_scale;
            let mut lines = Vec::with_capacity(rows);
            for r in 0..rows {
                let mut row = Vec::with_capacity(cols);
                for c in 0..(if alpha { 4 } else { 3 }) {
                    row.push(fmt(m.matrix[r * 4 + c] * k));
                }
                if offsets {
                    row.push(fmt(m.offsets[r] * out_scale));
                }
                lines.push(row.join(" "));
            }
            w.event(Event::Text(BytesText::new(&lines.join("\n"))))?;
            w.event(Event::End(BytesEnd::new(TAG_ARRAY)))?;
            w.event(Event::End(BytesEnd::new(TAG_MATRIX)))?;
        }

        Op::Lut1d(l) => {
            let tag = if l.direction == Direction::Inverse { TAG_INVLUT1D } else { TAG_LUT1D };
            let mut start = op_start(tag, &l.base);
            if l.interpolation != Interpolation::Default {
                start.push_attribute((ATTR_INTERPOLATION, l.interpolation.as_str()));
            }
            if l.half_domain {
                start.push_attribute((ATTR_HALF_DOMAIN, "true"));
            }
            if l.raw_halfs {
                start.push_attribute((ATTR_RAW_HALFS, "true"));
            }
            if l.hue_adjust == clf_ops::HueAdjust::Dw3 {
                start.push_attribute((ATTR_HUE_ADJUST, "dw3"));
            }
            w.event(Event::Start(start))?;
            write_descriptions(w, &l.base)?;

            let mut arr = BytesStart::new(TAG_ARRAY);
            let dim = format!("{} 3", l.length());
            arr.push_attribute((ATTR_DIMENSION, dim.as_str()));
            w.event(Event::Start(arr))?;

            let scale = l.file_out_depth.scale();
            let mut lines = Vec::with_capacity(l.length());
            for i in 0..l.length() {
                let entry: Vec<String> = (0..3)
                    .map(|ch| {
                        let v = l.array.values[i * 3 + ch] * scale;
                        if l.raw_halfs {
                            fmt(f16::from_f64(v).to_bits() as f64)
                        } else {
                            fmt(v)
                        }
                    })
                    .collect();
                lines.push(entry.join(" "));
            }
            w.event(Event::Text(BytesText::new(&lines.join("\n"))))?;
            w.event(Event::End(BytesEnd::new(TAG_ARRAY)))?;
            w.event(Event::End(BytesEnd::new(tag)))?;
        }

        Op::Lut3d(l) => {
            let tag = if l.direction == Direction::Inverse { TAG_INVLUT3D } else { TAG_LUT3D };
            let mut start = op_start(tag, &l.base);
            if l.interpolation != Interpolation::Default {
                start.push_attribute((ATTR_INTERPOLATION, l.interpolation.as_str()));
            }
            w.event(Event::Start(start))?;
            write_descriptions(w, &l.base)?;

            let n = l.length();
            let mut arr = BytesStart::new(TAG_ARRAY);
            let dim = if dialect == Dialect::Clf {
                format!("{n} {n} 3")
            } else {
                format!("{n} {n} {n} 3")
            };
            arr.push_attribute((ATTR_DIMENSION, dim.as_str()));
            w.event(Event::Start(arr))?;

            let scale = l.file_out_depth.scale();
            let mut lines = Vec::with_capacity(n * n * n);
            for i in 0..(n * n * n) {
                let entry: Vec<String> =
                    (0..3).map(|ch| fmt(l.array.values[i * 3 + ch] * scale)).collect();
                lines.push(entry.join(" "));
            }
            w.event(Event::Text(BytesText::new(&lines.join("\n"))))?;
            w.event(Event::End(BytesEnd::new(TAG_ARRAY)))?;
            w.event(Event::End(BytesEnd::new(tag)))?;
        }

        Op::Range(r) => {
            let mut start = op_start(TAG_RANGE, &r.base);
            if r.style == RangeStyle::NoClamp {
                start.push_attribute((ATTR_STYLE, r.style.as_str()));
            }
            w.event(Event::Start(start))?;
            write_descriptions(w, &r.base)?;
            let in_scale = r.base.in_depth.scale();
            let out_scale = r.base.out_depth.scale();
            if let Some(v) = r.min_in {
                w.text_element(TAG_MIN_IN_VALUE, &fmt(v * in_scale))?;
            }
            if let Some(v) = r.max_in {
                w.text_element(TAG_MAX_IN_VALUE, &fmt(v * in_scale))?;
            }
            if let Some(v) = r.min_out {
                w.text_element(TAG_MIN_OUT_VALUE, &fmt(v * out_scale))?;
            }
            if let Some(v) = r.max_out {
                w.text_element(TAG_MAX_OUT_VALUE, &fmt(v * out_scale))?;
            }
            w.event(Event::End(BytesEnd::new(TAG_RANGE)))?;
        }

        Op::Cdl(c) => {
            let mut start = op_start(TAG_CDL, &c.base);
            start.push_attribute((ATTR_STYLE, c.style.as_str()));
            w.event(Event::Start(start))?;
            write_descriptions(w, &c.base)?;
            w.event(Event::Start(BytesStart::new(TAG_SOPNODE)))?;
            w.text_element(TAG_SLOPE, &fmt3(c.slope))?;
            w.text_element(TAG_OFFSET, &fmt3(c.offset))?;
            w.text_element(TAG_POWER, &fmt3(c.power))?;
            w.event(Event::End(BytesEnd::new(TAG_SOPNODE)))?;
            w.event(Event::Start(BytesStart::new(TAG_SATNODE)))?;
            w.text_element(TAG_SATURATION, &fmt(c.saturation))?;
            w.event(Event::End(BytesEnd::new(TAG_SATNODE)))?;
            w.event(Event::End(BytesEnd::new(TAG_CDL)))?;
        }

        Op::Gamma(g) => {
            // CTF 2.0 / CLF 3 renamed the element and its params child.
            let modern = dialect == Dialect::Clf || g.style.requires_v2();
            let (tag, params_tag, value_attr) = if modern {
                (TAG_EXPONENT, TAG_EXPONENT_PARAMS, "exponent")
            } else {
                (TAG_GAMMA, TAG_GAMMA_PARAMS, ATTR_GAMMA)
            };
            let mut start = op_start(tag, &g.base);
            start.push_attribute((ATTR_STYLE, g.style.as_str()));
            w.event(Event::Start(start))?;
            write_descriptions(w, &g.base)?;

            let rgb_equal = g.params[0] == g.params[1] && g.params[1] == g.params[2];
            let alpha_identity = g.params[3] == GammaParams::identity();
            let write_params = |w: &mut XmlOut<W>, p: &GammaParams, channel: Option<&str>| {
                let mut e = BytesStart::new(params_tag);
                if let Some(ch) = channel {
                    e.push_attribute((ATTR_CHANNEL, ch));
                }
                e.push_attribute((value_attr, fmt(p.gamma).as_str()));
                if g.style.is_moncurve() {
                    e.push_attribute(("offset", fmt(p.offset).as_str()));
                }
                w.event(Event::Empty(e))
            };
            if rgb_equal && alpha_identity {
                write_params(w, &g.params[0], None)?;
            } else {
                for (ch, label) in ["R", "G", "B"].iter().enumerate() {
                    write_params(w, &g.params[ch], Some(label))?;
                }
                if !alpha_identity {
                    write_params(w, &g.params[3], Some("A"))?;
                }
            }
            w.event(Event::End(BytesEnd::new(tag)))?;
        }

        Op::Log(l) => {
            let mut start = op_start(TAG_LOG, &l.base);
            start.push_attribute((ATTR_STYLE, l.style.as_str()));
            w.event(Event::Start(start))?;
            write_descriptions(w, &l.base)?;

            let needs_params = !matches!(
                l.style,
                LogStyle::Log2 | LogStyle::Log10 | LogStyle::AntiLog2 | LogStyle::AntiLog10
            );
            if needs_params {
                let rgb_equal = l.params[0] == l.params[1] && l.params[1] == l.params[2];
                let channels: &[Option<&str>] = if rgb_equal {
                    &[None]
                } else {
                    &[Some("R"), Some("G"), Some("B")]
                };
                for (i, channel) in channels.iter().enumerate() {
                    let p = &l.params[i.min(2)];
                    let mut e = BytesStart::new(TAG_LOG_PARAMS);
                    if let Some(ch) = channel {
                        e.push_attribute((ATTR_CHANNEL, *ch));
                    }
                    if i == 0 {
                        e.push_attribute((ATTR_BASE, fmt(l.log_base).as_str()));
                    }
                    e.push_attribute((ATTR_LIN_SIDE_SLOPE, fmt(p.lin_side_slope).as_str()));
                    e.push_attribute((ATTR_LIN_SIDE_OFFSET, fmt(p.lin_side_offset).as_str()));
                    e.push_attribute((ATTR_LOG_SIDE_SLOPE, fmt(p.log_side_slope).as_str()));
                    e.push_attribute((ATTR_LOG_SIDE_OFFSET, fmt(p.log_side_offset).as_str()));
                    if let Some(b) = p.lin_side_break {
                        e.push_attribute((ATTR_LIN_SIDE_BREAK, fmt(b).as_str()));
                    }
                    if let Some(s) = p.linear_slope {
                        e.push_attribute((ATTR_LINEAR_SLOPE, fmt(s).as_str()));
                    }
                    w.event(Event::Empty(e))?;
                }
            }
            w.event(Event::End(BytesEnd::new(TAG_LOG)))?;
        }

        Op::ExposureContrast(ec) => {
            let mut start = op_start(TAG_EXPOSURE_CONTRAST, &ec.base);
            start.push_attribute((ATTR_STYLE, ec.style.as_str()));
            w.event(Event::Start(start))?;
            write_descriptions(w, &ec.base)?;

            let mut e = BytesStart::new(TAG_EC_PARAMS);
            e.push_attribute((ATTR_EXPOSURE, fmt(ec.exposure).as_str()));
            e.push_attribute((ATTR_CONTRAST, fmt(ec.contrast).as_str()));
            e.push_attribute((ATTR_GAMMA, fmt(ec.gamma).as_str()));
            e.push_attribute((ATTR_PIVOT, fmt(ec.pivot).as_str()));
            w.event(Event::Empty(e))?;

            for (flag, param) in [
                (ec.exposure_dynamic, "EXPOSURE"),
                (ec.contrast_dynamic, "CONTRAST"),
                (ec.gamma_dynamic, "GAMMA"),
            ] {
                if flag {
                    let mut e = BytesStart::new(TAG_DYNAMIC_PARAMETER);
                    e.push_attribute((ATTR_PARAM, param));
                    w.event(Event::Empty(e))?;
                }
            }
            w.event(Event::End(BytesEnd::new(TAG_EXPOSURE_CONTRAST)))?;
        }

        Op::FixedFunction(f) => {
            let mut start = op_start(TAG_FIXED_FUNCTION, &f.base);
            start.push_attribute((ATTR_STYLE, f.style.as_str()));
            if !f.params.is_empty() {
                let params: Vec<String> = f.params.iter().map(|p| fmt(*p)).collect();
                start.push_attribute((ATTR_PARAMS, params.join(" ").as_str()));
            }
            w.event(Event::Empty(start))?;
        }

        Op::GradingPrimary(g) => {
            let mut start = op_start(TAG_GRADING_PRIMARY, &g.base);
            start.push_attribute((ATTR_STYLE, g.style.as_str(g.direction)));
            w.event(Event::Start(start))?;
            write_descriptions(w, &g.base)?;

            let rgbm = |w: &mut XmlOut<W>, tag: &str, v: &clf_ops::GradingRgbm| {
                let mut e = BytesStart::new(tag);
                let rgb = format!("{} {} {}", v.red, v.green, v.blue);
                e.push_attribute((ATTR_RGB, rgb.as_str()));
                e.push_attribute((ATTR_MASTER, fmt(v.master).as_str()));
                w.event(Event::Empty(e))
            };
            let zero = clf_ops::GradingRgbm::zero();
            let one = clf_ops::GradingRgbm::one();
            if g.brightness != zero {
                rgbm(w, TAG_PRIMARY_BRIGHTNESS, &g.brightness)?;
            }
            if g.contrast != one {
                rgbm(w, TAG_PRIMARY_CONTRAST, &g.contrast)?;
            }
            if g.gamma != one {
                rgbm(w, TAG_PRIMARY_GAMMA, &g.gamma)?;
            }
            if g.offset != zero {
                rgbm(w, TAG_PRIMARY_OFFSET, &g.offset)?;
            }
            if g.exposure != zero {
                rgbm(w, TAG_PRIMARY_EXPOSURE, &g.exposure)?;
            }
            if g.lift != zero {
                rgbm(w, TAG_PRIMARY_LIFT, &g.lift)?;
            }
            if g.gain != one {
                rgbm(w, TAG_PRIMARY_GAIN, &g.gain)?;
            }
            {
                let mut e = BytesStart::new(TAG_PRIMARY_PIVOT);
                e.push_attribute((ATTR_CONTRAST, fmt(g.pivot).as_str()));
                if g.pivot_black != 0.0 {
                    e.push_attribute((ATTR_BLACK, fmt(g.pivot_black).as_str()));
                }
                if g.pivot_white != 1.0 {
                    e.push_attribute((ATTR_WHITE, fmt(g.pivot_white).as_str()));
                }
                w.event(Event::Empty(e))?;
            }
            if g.saturation != 1.0 {
                let mut e = BytesStart::new(TAG_PRIMARY_SATURATION);
                e.push_attribute((ATTR_MASTER, fmt(g.saturation).as_str()));
                w.event(Event::Empty(e))?;
            }
            if g.clamp_black.is_finite() || g.clamp_white.is_finite() {
                let mut e = BytesStart::new(TAG_PRIMARY_CLAMP);
                if g.clamp_black.is_finite() {
                    e.push_attribute((ATTR_BLACK, fmt(g.clamp_black).as_str()));
                }
                if g.clamp_white.is_finite() {
                    e.push_attribute((ATTR_WHITE, fmt(g.clamp_white).as_str()));
                }
                w.event(Event::Empty(e))?;
            }
            if g.dynamic {
                let mut e = BytesStart::new(TAG_DYNAMIC_PARAMETER);
                e.push_attribute((ATTR_PARAM, "PRIMARY"));
                w.event(Event::Empty(e))?;
            }
            w.event(Event::End(BytesEnd::new(TAG_GRADING_PRIMARY)))?;
        }

        Op::GradingRgbCurve(g) => {
            let mut start = op_start(TAG_GRADING_RGB_CURVE, &g.base);
            start.push_attribute((ATTR_STYLE, g.style.as_str(g.direction)));
            if g.bypass_lin_to_log {
                start.push_attribute((ATTR_BYPASS_LIN_TO_LOG, "true"));
            }
            w.event(Event::Start(start))?;
            write_descriptions(w, &g.base)?;

            for (tag, curve) in [
                (TAG_CURVE_RED, &g.red),
                (TAG_CURVE_GREEN, &g.green),
                (TAG_CURVE_BLUE, &g.blue),
                (TAG_CURVE_MASTER, &g.master),
            ] {
                if curve.is_identity() {
                    continue;
                }
                w.event(Event::Start(BytesStart::new(tag)))?;
                let points: Vec<String> =
                    curve.points.iter().map(|(x, y)| format!("{x} {y}")).collect();
                w.text_element(TAG_CURVE_CONTROL_POINTS, &points.join(" "))?;
                if !curve.slopes.is_empty() {
                    let slopes: Vec<String> = curve.slopes.iter().map(|s| fmt(*s)).collect();
                    w.text_element(TAG_CURVE_SLOPES, &slopes.join(" "))?;
                }
                w.event(Event::End(BytesEnd::new(tag)))?;
            }
            if g.dynamic {
                let mut e = BytesStart::new(TAG_DYNAMIC_PARAMETER);
                e.push_attribute((ATTR_PARAM, "RGB_CURVE"));
                w.event(Event::Empty(e))?;
            }
            w.event(Event::End(BytesEnd::new(TAG_GRADING_RGB_CURVE)))?;
        }

        Op::GradingTone(g) => {
            let mut start = op_start(TAG_GRADING_TONE, &g.base);
            start.push_attribute((ATTR_STYLE, g.style.as_str(g.direction)));
            w.event(Event::Start(start))?;
            write_descriptions(w, &g.base)?;

            for (tag, zone, uses_pivot) in [
                (TAG_TONE_BLACKS, &g.blacks, false),
                (TAG_TONE_SHADOWS, &g.shadows, true),
                (TAG_TONE_MIDTONES, &g.midtones, false),
                (TAG_TONE_HIGHLIGHTS, &g.highlights, true),
                (TAG_TONE_WHITES, &g.whites, false),
            ] {
                if zone.is_identity() {
                    continue;
                }
                let mut e = BytesStart::new(tag);
                let rgb = format!("{} {} {}", zone.red, zone.green, zone.blue);
                e.push_attribute((ATTR_RGB, rgb.as_str()));
                e.push_attribute((ATTR_MASTER, fmt(zone.master).as_str()));
                if tag == TAG_TONE_MIDTONES {
                    e.push_attribute((ATTR_CENTER, fmt(zone.start).as_str()));
                    e.push_attribute((ATTR_WIDTH, fmt(zone.width).as_str()));
                } else if uses_pivot {
                    e.push_attribute((ATTR_START, fmt(zone.start).as_str()));
                    e.push_attribute((ATTR_PIVOT, fmt(zone.width).as_str()));
                } else {
                    e.push_attribute((ATTR_START, fmt(zone.start).as_str()));
                    e.push_attribute((ATTR_WIDTH, fmt(zone.width).as_str()));
                }
                w.event(Event::Empty(e))?;
            }
            if g.s_contrast != 1.0 {
                let mut e = BytesStart::new(TAG_TONE_SCONTRAST);
                e.push_attribute((ATTR_MASTER, fmt(g.s_contrast).as_str()));
                w.event(Event::Empty(e))?;
            }
            if g.dynamic {
                let mut e = BytesStart::new(TAG_DYNAMIC_PARAMETER);
                e.push_attribute((ATTR_PARAM, "TONE"));
                w.event(Event::Empty(e))?;
            }
            w.event(Event::End(BytesEnd::new(TAG_GRADING_TONE)))?;
        }

        Op::Reference(r) => {
            let mut start = op_start(TAG_REFERENCE, &r.base);
            if !r.path.is_empty() {
                start.push_attribute((ATTR_PATH, r.path.as_str()));
            }
            if !r.alias.is_empty() {
                start.push_attribute((ATTR_ALIAS, r.alias.as_str()));
            }
            if !r.base_path.is_empty() {
                start.push_attribute((ATTR_BASE_PATH, r.base_path.as_str()));
            }
            if r.direction == Direction::Inverse {
                start.push_attribute((ATTR_INVERTED, "true"));
            }
            w.event(Event::Empty(start))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{parse_process_list, ParseOptions};
    use clf_core::BitDepth;
    use clf_ops::{CdlOp, Lut1dOp, MatrixOp, OpBase, RangeOp};

    fn base_32f() -> OpBase {
        OpBase {
            in_depth: BitDepth::F32,
            out_depth: BitDepth::F32,
            ..Default::default()
        }
    }

    fn reparse(xml: &str) -> ProcessList {
        parse_process_list(xml.as_bytes(), "roundtrip.ctf", ParseOptions::default()).unwrap()
    }

    #[test]
    fn matrix_round_trip() {
        let mut pl = ProcessList::new("rt");
        let mut m = MatrixOp { base: base_32f(), ..MatrixOp::identity() };
        m.set_rgb(&[0.5, 0.25, 0.0, 0.0, 0.75, 0.125, 0.0625, 0.0, 1.5]);
        m.offsets = [0.125, 0.0, -0.25, 0.0];
        pl.ops.push(Op::Matrix(m.clone()));

        let xml = write_process_list(&pl, Dialect::Ctf).unwrap();
        let back = reparse(&xml);
        match &back.ops[0] {
            Op::Matrix(m2) => {
                assert_eq!(m2.matrix, m.matrix);
                assert_eq!(m2.offsets, m.offsets);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn lut1d_round_trip_preserves_file_depth() {
        let mut pl = ProcessList::new("rt");
        let mut l = Lut1dOp::identity(16);
        l.base = OpBase {
            in_depth: BitDepth::UInt10,
            out_depth: BitDepth::UInt10,
            ..Default::default()
        };
        l.file_out_depth = BitDepth::UInt10;
        pl.ops.push(Op::Lut1d(l.clone()));

        let xml = write_process_list(&pl, Dialect::Ctf).unwrap();
        assert!(xml.contains("outBitDepth=\"10i\""));
        let back = reparse(&xml);
        match &back.ops[0] {
            Op::Lut1d(l2) => {
                assert_eq!(l2.file_out_depth, BitDepth::UInt10);
                assert_eq!(l2.array.values, l.array.values);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn version_is_the_minimum_needed() {
        let mut pl = ProcessList::new("v");
        let m = MatrixOp { base: base_32f(), ..MatrixOp::identity() };
        pl.ops.push(Op::Matrix(m));
        assert_eq!(minimum_ctf_version(&pl), V1_2);
        let xml = write_process_list(&pl, Dialect::Ctf).unwrap();
        assert!(xml.contains("version=\"1.2\""));

        let mut cdl = CdlOp::default();
        cdl.base = base_32f();
        pl.ops.push(Op::Cdl(cdl));
        assert_eq!(minimum_ctf_version(&pl), V1_3);

        let mut range = RangeOp {
            base: base_32f(),
            min_in: Some(0.0),
            max_in: Some(1.0),
            min_out: Some(0.0),
            max_out: Some(1.0),
            style: RangeStyle::NoClamp,
            ..Default::default()
        };
        range.base.in_depth = BitDepth::F32;
        pl.ops.push(Op::Range(range));
        assert_eq!(minimum_ctf_version(&pl), V1_7);
    }

    #[test]
    fn clf_rejects_ctf_only_ops() {
        let mut pl = ProcessList::new("x");
        let mut l = Lut1dOp::identity(4);
        l.base = base_32f();
        l.direction = Direction::Inverse;
        pl.ops.push(Op::Lut1d(l));
        match write_process_list(&pl, Dialect::Clf) {
            Err(WriteError::UnsupportedInClf(kind)) => assert_eq!(kind, "LUT1D"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn clf_header_uses_comp_clf_version() {
        let mut pl = ProcessList::new("x");
        let m = MatrixOp { base: base_32f(), ..MatrixOp::identity() };
        pl.ops.push(Op::Matrix(m));
        let xml = write_process_list(&pl, Dialect::Clf).unwrap();
        assert!(xml.contains("compCLFversion=\"3.0\""));
        // Only the XML declaration carries a version attribute.
        assert!(!xml.contains("<ProcessList id=\"x\" version="));
    }

    #[test]
    fn range_values_restore_file_scaling() {
        let mut pl = ProcessList::new("r");
        let mut range = RangeOp {
            min_in: Some(64.0 / 1023.0),
            max_in: Some(940.0 / 1023.0),
            min_out: Some(0.0),
            max_out: Some(1.0),
            ..Default::default()
        };
        range.base.in_depth = BitDepth::UInt10;
        range.base.out_depth = BitDepth::F32;
        pl.ops.push(Op::Range(range));

        let xml = write_process_list(&pl, Dialect::Ctf).unwrap();
        assert!(xml.contains("<minInValue>64</minInValue>"));
        assert!(xml.contains("<maxInValue>940</maxInValue>"));
    }
}
