//! The CLF/CTF element-stack parser.
//!
//! A SAX-style state machine over the XML event stream. Each open
//! element is an entry on a stack; children accumulate their own state
//! and merge into their parent when popped, so element lifetimes are
//! strictly LIFO and no parent back-pointers exist. Recognized elements
//! that appear in an illegal position, and unknown elements, become
//! `Dummy` entries that absorb their subtree with a warning so one pass
//! can surface every problem a file has.

use std::fs;
use std::path::Path;

use clf_core::{scan, Metadata, Version, V1_2, V2_0, CLF_VERSION_MAX};
use clf_ops::{BSplineCurve, ProcessList};

use crate::error::{CancelToken, Error, ErrorKind, IoResult};
use crate::events::{XmlEvent, XmlEvents};
use crate::readers::{self, BuildError, OpBuilder, OpTag};
use crate::tags::*;

/// How to parse a byte stream.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParseOptions<'a> {
    /// Treat the file as CLF: require `compCLFversion` and restrict the
    /// operator set. A `compCLFversion` attribute switches this on
    /// regardless.
    pub is_clf: bool,
    /// Abort signal checked between XML events.
    pub cancel: Option<&'a CancelToken>,
}

/// True when the first 5 KiB contain a `<ProcessList` tag, the
/// dialect-agnostic loadability sniff.
pub fn is_loadable(bytes: &[u8]) -> bool {
    let window = &bytes[..bytes.len().min(5 * 1024)];
    window.windows(b"<ProcessList".len()).any(|w| w == b"<ProcessList")
}

/// Reads a `.clf` file.
pub fn read_clf(path: &Path) -> IoResult<ProcessList> {
    read_file(path, true)
}

/// Reads a `.ctf` file.
pub fn read_ctf(path: &Path) -> IoResult<ProcessList> {
    read_file(path, false)
}

fn read_file(path: &Path, is_clf: bool) -> IoResult<ProcessList> {
    let name = path.display().to_string();
    let bytes = fs::read(path)
        .map_err(|e| Error::new(ErrorKind::Io, format!("cannot read file: {e}"), name.clone(), 0))?;
    parse_process_list(&bytes, &name, ParseOptions { is_clf, cancel: None })
}

/// Parses a CLF/CTF document into a finished [`ProcessList`].
///
/// On any failure the in-flight list is discarded; callers never see a
/// partially built pipeline.
pub fn parse_process_list(
    bytes: &[u8],
    file_name: &str,
    options: ParseOptions<'_>,
) -> IoResult<ProcessList> {
    let mut events = XmlEvents::new(bytes, file_name);
    let mut parser = Parser::new(file_name, options);
    while let Some(event) = events.next()? {
        if let Some(cancel) = options.cancel {
            if cancel.is_cancelled() {
                return Err(parser.error(ErrorKind::Cancelled, "parsing was cancelled", 0));
            }
        }
        parser.handle(event)?;
    }
    parser.finish(events.current_line())
}

// ============================================================================
// Stack elements
// ============================================================================

enum TextTarget {
    Description,
    InputDescriptor,
    OutputDescriptor,
}

enum Elt {
    /// The root ProcessList element.
    Transform,
    /// An operator element driving a reader.
    Op(OpBuilder),
    /// Info and anything nested below it, stored uninterpreted.
    Metadata(Metadata),
    /// A plain text element merged into the transform or operator.
    Text(TextTarget, String),
    /// A LUT or Matrix value block.
    Array,
    /// A legacy LUT index map.
    IndexMap,
    /// CDL SOPNode container.
    SopNode,
    /// CDL SatNode container.
    SatNode,
    /// A terminal numeric value: CDL Slope/Offset/Power/Saturation or a
    /// Range bound. The buffer collects its character data.
    Value(String),
    /// One grading curve (Red, Green, Blue, Master).
    Curve(BSplineCurve),
    /// ControlPoints or Slopes inside a curve; buffers character data.
    CurveData(String),
    /// A child fully handled at its opening tag.
    Passive,
    /// Absorbs an unknown or misplaced subtree.
    Dummy,
}

struct Entry {
    name: String,
    line: u32,
    elt: Elt,
}

struct Parser<'a> {
    file: String,
    options: ParseOptions<'a>,
    stack: Vec<Entry>,
    transform: Option<TransformState>,
    finished: bool,
}

struct TransformState {
    pl: ProcessList,
    /// Opening-tag line of each op, for late diagnostics.
    op_lines: Vec<u32>,
}

impl<'a> Parser<'a> {
    fn new(file: &str, options: ParseOptions<'a>) -> Self {
        Self {
            file: file.to_string(),
            options,
            stack: Vec::new(),
            transform: None,
            finished: false,
        }
    }

    fn error(&self, kind: ErrorKind, message: impl Into<String>, line: u32) -> Error {
        Error::new(kind, message, &self.file, line)
    }

    fn build_error(&self, err: BuildError, line: u32) -> Error {
        Error::new(err.kind, err.message, &self.file, line)
    }

    fn version(&self) -> Version {
        self.transform.as_ref().map_or(V1_2, |t| t.pl.ctf_version)
    }

    fn is_clf(&self) -> bool {
        self.transform.as_ref().map_or(self.options.is_clf, |t| t.pl.is_clf)
    }

    fn handle(&mut self, event: XmlEvent) -> IoResult<()> {
        match event {
            XmlEvent::Start { name, attrs, line, empty } => {
                self.start_element(&name, &attrs, line)?;
                if empty {
                    self.end_element(&name, line)?;
                }
                Ok(())
            }
            XmlEvent::End { name, line } => self.end_element(&name, line),
            XmlEvent::Chars { text, line } => self.chars(&text, line),
        }
    }

    fn push(&mut self, name: &str, line: u32, elt: Elt) {
        self.stack.push(Entry { name: name.to_string(), line, elt });
    }

    fn push_dummy(&mut self, name: &str, line: u32, recognized: bool) {
        let reason = if recognized { "is not valid in this context" } else { "is unknown" };
        tracing::warn!("{}({line}): element '{name}' {reason}", self.file);
        self.push(name, line, Elt::Dummy);
    }

    /// The nearest enclosing operator builder on the stack.
    fn op_builder_mut(&mut self) -> Option<&mut OpBuilder> {
        self.stack.iter_mut().rev().find_map(|e| match &mut e.elt {
            Elt::Op(b) => Some(b),
            _ => None,
        })
    }

    // ------------------------------------------------------------------
    // Start dispatch
    // ------------------------------------------------------------------

    fn start_element(
        &mut self,
        name: &str,
        attrs: &[(String, String)],
        line: u32,
    ) -> IoResult<()> {
        // A dummy swallows its whole subtree.
        if matches!(self.stack.last().map(|e| &e.elt), Some(Elt::Dummy)) {
            self.push(name, line, Elt::Dummy);
            return Ok(());
        }

        // Metadata subtrees store arbitrary nested XML untouched.
        if matches!(self.stack.last().map(|e| &e.elt), Some(Elt::Metadata(_))) {
            let mut node = Metadata::new(name);
            for (k, v) in attrs {
                node.add_attribute(k, v);
            }
            self.push(name, line, Elt::Metadata(node));
            return Ok(());
        }

        if name == TAG_PROCESS_LIST {
            if self.stack.is_empty() && self.transform.is_none() {
                self.start_transform(attrs, line)?;
                self.push(name, line, Elt::Transform);
            } else {
                self.push_dummy(name, line, true);
            }
            return Ok(());
        }

        let Some(top) = self.stack.last() else {
            // Root element of some other schema; keep going so the
            // termination check can report NoProcessList.
            self.push_dummy(name, line, false);
            return Ok(());
        };

        match &top.elt {
            Elt::Transform => self.start_in_transform(name, attrs, line),
            Elt::Op(_) => self.start_in_op(name, attrs, line),
            Elt::SopNode => {
                match name {
                    TAG_SLOPE | TAG_OFFSET | TAG_POWER => {
                        self.push(name, line, Elt::Value(String::new()))
                    }
                    TAG_DESCRIPTION => {
                        self.push(name, line, Elt::Text(TextTarget::Description, String::new()))
                    }
                    _ => self.push_dummy(name, line, false),
                }
                Ok(())
            }
            Elt::SatNode => {
                match name {
                    TAG_SATURATION => self.push(name, line, Elt::Value(String::new())),
                    _ => self.push_dummy(name, line, false),
                }
                Ok(())
            }
            Elt::Curve(_) => {
                match name {
                    TAG_CURVE_CONTROL_POINTS | TAG_CURVE_SLOPES => {
                        self.push(name, line, Elt::CurveData(String::new()))
                    }
                    _ => self.push_dummy(name, line, false),
                }
                Ok(())
            }
            // Plain elements hold only character data.
            _ => {
                self.push_dummy(name, line, OpTag::from_element(name).is_some());
                Ok(())
            }
        }
    }

    fn start_transform(&mut self, attrs: &[(String, String)], line: u32) -> IoResult<()> {
        let mut pl = ProcessList { is_clf: self.options.is_clf, ..Default::default() };

        let mut id_found = false;
        let mut version_found = false;
        let mut clf_version_found = false;
        let mut requested = V1_2;

        for (k, v) in attrs {
            match k.as_str() {
                ATTR_ID => {
                    if v.is_empty() {
                        return Err(self.error(
                            ErrorKind::MissingAttribute,
                            "required attribute 'id' does not have a value",
                            line,
                        ));
                    }
                    pl.id = v.clone();
                    id_found = true;
                }
                ATTR_NAME => pl.name = v.clone(),
                ATTR_INVERSE_OF => pl.inverse_of = v.clone(),
                ATTR_VERSION => {
                    if clf_version_found {
                        return Err(self.error(
                            ErrorKind::VersionConflict,
                            "'compCLFversion' and 'version' cannot both be present",
                            line,
                        ));
                    }
                    if version_found {
                        return Err(self.error(
                            ErrorKind::VersionConflict,
                            "'version' can only be there once",
                            line,
                        ));
                    }
                    let ver: Version = v
                        .parse()
                        .map_err(|e| self.error(ErrorKind::VersionConflict, format!("{e}"), line))?;
                    if ver > V2_0 {
                        return Err(self.error(
                            ErrorKind::VersionConflict,
                            format!("unsupported transform file version '{v}' supplied"),
                            line,
                        ));
                    }
                    requested = ver;
                    version_found = true;
                }
                ATTR_COMP_CLF_VERSION => {
                    if version_found {
                        return Err(self.error(
                            ErrorKind::VersionConflict,
                            "'compCLFversion' and 'version' cannot both be present",
                            line,
                        ));
                    }
                    let ver: Version = v
                        .parse()
                        .map_err(|e| self.error(ErrorKind::VersionConflict, format!("{e}"), line))?;
                    if ver > CLF_VERSION_MAX {
                        return Err(self.error(
                            ErrorKind::VersionConflict,
                            format!("unsupported transform file version '{v}' supplied"),
                            line,
                        ));
                    }
                    requested = ver.clf_to_ctf();
                    pl.clf_version = Some(ver);
                    pl.is_clf = true;
                    version_found = true;
                    clf_version_found = true;
                }
                "xmlns" => {}
                _ => tracing::warn!("unrecognized attribute '{k}' on element 'ProcessList'"),
            }
        }

        if !id_found {
            return Err(self.error(
                ErrorKind::MissingAttribute,
                "required attribute 'id' is missing",
                line,
            ));
        }
        if !version_found {
            if pl.is_clf {
                return Err(self.error(
                    ErrorKind::MissingAttribute,
                    "required attribute 'compCLFversion' is missing",
                    line,
                ));
            }
            // A CTF with no version attribute is the original 1.2 format.
            requested = V1_2;
        }
        pl.ctf_version = requested;

        self.transform = Some(TransformState { pl, op_lines: Vec::new() });
        Ok(())
    }

    fn start_in_transform(
        &mut self,
        name: &str,
        attrs: &[(String, String)],
        line: u32,
    ) -> IoResult<()> {
        match name {
            TAG_DESCRIPTION => {
                self.push(name, line, Elt::Text(TextTarget::Description, String::new()));
                return Ok(());
            }
            TAG_INPUT_DESCRIPTOR => {
                self.push(name, line, Elt::Text(TextTarget::InputDescriptor, String::new()));
                return Ok(());
            }
            TAG_OUTPUT_DESCRIPTOR => {
                self.push(name, line, Elt::Text(TextTarget::OutputDescriptor, String::new()));
                return Ok(());
            }
            TAG_INFO => {
                let mut node = Metadata::new(TAG_INFO);
                for (k, v) in attrs {
                    node.add_attribute(k, v);
                }
                self.push(name, line, Elt::Metadata(node));
                return Ok(());
            }
            _ => {}
        }

        match OpTag::from_element(name) {
            Some(tag) => {
                let version = self.version();
                let is_clf = self.is_clf();
                match readers::select_reader(tag, version, is_clf) {
                    Some(mut builder) => {
                        if let OpBuilder::Log(b) = &mut builder {
                            b.set_clf(is_clf);
                        }
                        builder.start(name, attrs).map_err(|e| self.build_error(e, line))?;
                        self.push(name, line, Elt::Op(builder));
                        Ok(())
                    }
                    None => Err(self.error(
                        ErrorKind::UnsupportedOperator,
                        format!(
                            "operator '{name}' is not supported in {} version {version}",
                            if is_clf { "CLF" } else { "CTF" }
                        ),
                        line,
                    )),
                }
            }
            None => {
                let recognized = matches!(
                    name,
                    TAG_ARRAY
                        | TAG_INDEX_MAP
                        | TAG_SOPNODE
                        | TAG_SATNODE
                        | TAG_SATNODE_ALT
                        | TAG_DYNAMIC_PARAMETER
                );
                self.push_dummy(name, line, recognized);
                Ok(())
            }
        }
    }

    fn start_in_op(&mut self, name: &str, attrs: &[(String, String)], line: u32) -> IoResult<()> {
        if name == TAG_DESCRIPTION {
            self.push(name, line, Elt::Text(TextTarget::Description, String::new()));
            return Ok(());
        }

        // Children handled entirely at their opening tag leave a Passive
        // entry behind; children with content push their own state.
        enum Plan {
            Push(Elt),
            Passive,
            WarnedDummy,
            Misplaced,
        }

        let file = self.file.clone();
        let version = self.version();
        let ctx = |e: BuildError| Error::new(e.kind, e.message, &file, line);

        let Some(Entry { elt: Elt::Op(builder), .. }) = self.stack.last_mut() else {
            unreachable!("caller checked the top is an op");
        };

        let plan = match (name, builder) {
            (TAG_ARRAY, OpBuilder::Matrix(b)) => {
                let dims = parse_dims(attrs).map_err(ctx)?;
                b.begin_array(&dims).map_err(ctx)?;
                Plan::Push(Elt::Array)
            }
            (TAG_ARRAY, OpBuilder::Lut1d(b)) => {
                let dims = parse_dims(attrs).map_err(ctx)?;
                b.begin_array(&dims).map_err(ctx)?;
                Plan::Push(Elt::Array)
            }
            (TAG_ARRAY, OpBuilder::Lut3d(b)) => {
                let dims = parse_dims(attrs).map_err(ctx)?;
                b.begin_array(&dims).map_err(ctx)?;
                Plan::Push(Elt::Array)
            }
            (TAG_INDEX_MAP, OpBuilder::Lut1d(b)) if b.accepts_index_map() => {
                if version >= V2_0 {
                    tracing::warn!(
                        "{file}({line}): element 'IndexMap' is not valid since CLF 3 (or CTF 2)"
                    );
                    Plan::WarnedDummy
                } else {
                    let dims = parse_dims(attrs).map_err(ctx)?;
                    b.index_map.begin(&dims).map_err(ctx)?;
                    Plan::Push(Elt::IndexMap)
                }
            }
            (TAG_INDEX_MAP, OpBuilder::Lut3d(b)) if b.accepts_index_map() => {
                if version >= V2_0 {
                    tracing::warn!(
                        "{file}({line}): element 'IndexMap' is not valid since CLF 3 (or CTF 2)"
                    );
                    Plan::WarnedDummy
                } else {
                    let dims = parse_dims(attrs).map_err(ctx)?;
                    b.index_map.begin(&dims).map_err(ctx)?;
                    Plan::Push(Elt::IndexMap)
                }
            }
            (
                TAG_MIN_IN_VALUE | TAG_MAX_IN_VALUE | TAG_MIN_OUT_VALUE | TAG_MAX_OUT_VALUE,
                OpBuilder::Range(_),
            ) => Plan::Push(Elt::Value(String::new())),
            (TAG_SOPNODE, OpBuilder::Cdl(_)) => Plan::Push(Elt::SopNode),
            (TAG_SATNODE | TAG_SATNODE_ALT, OpBuilder::Cdl(_)) => Plan::Push(Elt::SatNode),
            (TAG_GAMMA_PARAMS | TAG_EXPONENT_PARAMS, OpBuilder::Gamma(b)) => {
                b.params(attrs).map_err(ctx)?;
                Plan::Passive
            }
            (TAG_LOG_PARAMS, OpBuilder::Log(b)) => {
                b.params(attrs).map_err(ctx)?;
                Plan::Passive
            }
            (TAG_EC_PARAMS, OpBuilder::ExposureContrast(b)) => {
                b.params(attrs).map_err(ctx)?;
                Plan::Passive
            }
            (TAG_DYNAMIC_PARAMETER, OpBuilder::ExposureContrast(b)) => {
                b.dynamic_param(attrs).map_err(ctx)?;
                Plan::Passive
            }
            (TAG_ACES_PARAMS, OpBuilder::FixedFunction(b)) if b.accepts_aces_params() => {
                b.aces_params(attrs).map_err(ctx)?;
                Plan::Passive
            }
            (
                TAG_PRIMARY_BRIGHTNESS | TAG_PRIMARY_CONTRAST | TAG_PRIMARY_GAMMA
                | TAG_PRIMARY_OFFSET | TAG_PRIMARY_EXPOSURE | TAG_PRIMARY_LIFT
                | TAG_PRIMARY_GAIN | TAG_PRIMARY_PIVOT | TAG_PRIMARY_SATURATION
                | TAG_PRIMARY_CLAMP,
                OpBuilder::GradingPrimary(b),
            ) => {
                b.param(name, attrs).map_err(ctx)?;
                Plan::Passive
            }
            (TAG_DYNAMIC_PARAMETER, OpBuilder::GradingPrimary(b)) => {
                b.dynamic_param(attrs).map_err(ctx)?;
                Plan::Passive
            }
            (
                TAG_CURVE_RED | TAG_CURVE_GREEN | TAG_CURVE_BLUE | TAG_CURVE_MASTER,
                OpBuilder::GradingRgbCurve(_),
            ) => Plan::Push(Elt::Curve(BSplineCurve::default())),
            (TAG_DYNAMIC_PARAMETER, OpBuilder::GradingRgbCurve(b)) => {
                b.dynamic_param(attrs).map_err(ctx)?;
                Plan::Passive
            }
            (
                TAG_TONE_BLACKS | TAG_TONE_SHADOWS | TAG_TONE_MIDTONES | TAG_TONE_HIGHLIGHTS
                | TAG_TONE_WHITES | TAG_TONE_SCONTRAST,
                OpBuilder::GradingTone(b),
            ) => {
                b.param(name, attrs).map_err(ctx)?;
                Plan::Passive
            }
            (TAG_DYNAMIC_PARAMETER, OpBuilder::GradingTone(b)) => {
                b.dynamic_param(attrs).map_err(ctx)?;
                Plan::Passive
            }
            _ => Plan::Misplaced,
        };

        match plan {
            Plan::Push(elt) => self.push(name, line, elt),
            Plan::Passive => self.push(name, line, Elt::Passive),
            Plan::WarnedDummy => self.push(name, line, Elt::Dummy),
            Plan::Misplaced => {
                let recognized = matches!(
                    name,
                    TAG_ARRAY | TAG_INDEX_MAP | TAG_SOPNODE | TAG_SATNODE | TAG_SATNODE_ALT
                        | TAG_DYNAMIC_PARAMETER | TAG_GAMMA_PARAMS | TAG_EXPONENT_PARAMS
                        | TAG_LOG_PARAMS | TAG_EC_PARAMS | TAG_ACES_PARAMS
                ) || OpTag::from_element(name).is_some();
                self.push_dummy(name, line, recognized);
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Character data
    // ------------------------------------------------------------------

    fn chars(&mut self, text: &str, line: u32) -> IoResult<()> {
        enum Route {
            Buffer,
            MetadataValue,
            ArrayData,
            IndexMapData,
            Ignore,
        }

        let route = match self.stack.last().map(|e| &e.elt) {
            Some(Elt::Text(_, _)) | Some(Elt::Value(_)) | Some(Elt::CurveData(_)) => Route::Buffer,
            Some(Elt::Metadata(_)) => Route::MetadataValue,
            Some(Elt::Array) => Route::ArrayData,
            Some(Elt::IndexMap) => Route::IndexMapData,
            _ => Route::Ignore,
        };

        let file = self.file.clone();
        match route {
            Route::Buffer => {
                if let Some(entry) = self.stack.last_mut() {
                    match &mut entry.elt {
                        Elt::Text(_, buf) | Elt::Value(buf) | Elt::CurveData(buf) => {
                            buf.push_str(text)
                        }
                        _ => unreachable!(),
                    }
                }
            }
            Route::MetadataValue => {
                if let Some(Entry { elt: Elt::Metadata(node), .. }) = self.stack.last_mut() {
                    node.value.push_str(scan::trim(text));
                }
            }
            Route::ArrayData => {
                // Value blocks span many lines; point the diagnostic at
                // the offending token, not the start of the block.
                let token_line = |offset: usize| {
                    let upto = &text.as_bytes()[..offset.min(text.len())];
                    line + upto.iter().filter(|&&b| b == b'\n').count() as u32
                };
                let values = scan::get_numbers::<f64>(text.as_bytes()).map_err(|e| {
                    Error::new(
                        ErrorKind::InvalidNumber,
                        format!("illegal values in array: {e}"),
                        &file,
                        token_line(e.offset),
                    )
                })?;
                let Some(builder) = self.op_builder_mut() else {
                    return Err(Error::new(
                        ErrorKind::StructuralError,
                        "array outside an operator",
                        &file,
                        line,
                    ));
                };
                let array = match builder {
                    OpBuilder::Matrix(b) => b.array_mut(),
                    OpBuilder::Lut1d(b) => b.array_mut(),
                    OpBuilder::Lut3d(b) => b.array_mut(),
                    _ => None,
                };
                let Some(array) = array else {
                    return Err(Error::new(
                        ErrorKind::StructuralError,
                        "array data outside an open Array element",
                        &file,
                        line,
                    ));
                };
                for v in values {
                    array
                        .push(v)
                        .map_err(|e| Error::new(ErrorKind::ArrayLength, e.to_string(), &file, line))?;
                }
            }
            Route::IndexMapData => {
                let Some(builder) = self.op_builder_mut() else {
                    return Err(Error::new(
                        ErrorKind::StructuralError,
                        "index map outside an operator",
                        &file,
                        line,
                    ));
                };
                let state = match builder {
                    OpBuilder::Lut1d(b) => &mut b.index_map,
                    OpBuilder::Lut3d(b) => &mut b.index_map,
                    _ => {
                        return Err(Error::new(
                            ErrorKind::StructuralError,
                            "index map outside a LUT",
                            &file,
                            line,
                        ))
                    }
                };
                state.chars(text).map_err(|e| Error::new(e.kind, e.message, &file, line))?;
            }
            Route::Ignore => {}
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // End dispatch
    // ------------------------------------------------------------------

    fn end_element(&mut self, name: &str, line: u32) -> IoResult<()> {
        let Some(entry) = self.stack.pop() else {
            return Err(self.error(
                ErrorKind::TagMismatch,
                format!("unexpected closing tag '{name}'"),
                line,
            ));
        };
        if entry.name != name {
            return Err(self.error(
                ErrorKind::TagMismatch,
                format!("expected '</{}>', found '</{name}>'", entry.name),
                line,
            ));
        }

        let file = self.file.clone();
        let ctx = |e: BuildError, at: u32| Error::new(e.kind, e.message, &file, at);

        match entry.elt {
            Elt::Transform => self.end_transform(entry.line),
            Elt::Op(builder) => {
                let ops = builder.end().map_err(|e| ctx(e, entry.line))?;
                let transform = self.transform.as_mut().expect("op inside a transform");
                for op in ops {
                    transform.pl.ops.push(op);
                    transform.op_lines.push(entry.line);
                }
                Ok(())
            }
            Elt::Metadata(node) => {
                match self.stack.last_mut().map(|e| &mut e.elt) {
                    Some(Elt::Metadata(parent)) => {
                        parent.children.push(node);
                    }
                    Some(Elt::Transform) => {
                        self.transform.as_mut().expect("transform state").pl.info = node;
                    }
                    _ => {}
                }
                Ok(())
            }
            Elt::Text(target, buf) => {
                self.merge_text(target, buf);
                Ok(())
            }
            Elt::Array => {
                let Some(builder) = self.op_builder_mut() else {
                    return Err(Error::new(
                        ErrorKind::StructuralError,
                        "array outside an operator",
                        &file,
                        line,
                    ));
                };
                let result = match builder {
                    OpBuilder::Matrix(b) => b.end_array(),
                    OpBuilder::Lut1d(b) => b.end_array(),
                    OpBuilder::Lut3d(b) => b.end_array(),
                    _ => Err(BuildError::new(
                        ErrorKind::StructuralError,
                        "array outside an array-bearing operator",
                    )),
                };
                result.map_err(|e| ctx(e, entry.line))
            }
            Elt::IndexMap => {
                let Some(builder) = self.op_builder_mut() else {
                    return Err(Error::new(
                        ErrorKind::StructuralError,
                        "index map outside an operator",
                        &file,
                        line,
                    ));
                };
                let state = match builder {
                    OpBuilder::Lut1d(b) => &mut b.index_map,
                    OpBuilder::Lut3d(b) => &mut b.index_map,
                    _ => unreachable!("checked at start"),
                };
                state.finish().map_err(|e| ctx(e, entry.line))
            }
            Elt::SopNode | Elt::SatNode | Elt::Passive | Elt::Dummy => Ok(()),
            Elt::Value(buf) => {
                let Some(builder) = self.op_builder_mut() else {
                    return Err(Error::new(
                        ErrorKind::StructuralError,
                        "value element outside an operator",
                        &file,
                        line,
                    ));
                };
                let result = match builder {
                    OpBuilder::Cdl(b) => b.set_value(name, &buf),
                    OpBuilder::Range(b) => b.set_value(name, &buf),
                    _ => Err(BuildError::new(
                        ErrorKind::StructuralError,
                        format!("value element '{name}' under an unexpected operator"),
                    )),
                };
                result.map_err(|e| ctx(e, entry.line))
            }
            Elt::Curve(curve) => {
                curve
                    .validate()
                    .map_err(|e| Error::new(ErrorKind::Validation, e.to_string(), &file, entry.line))?;
                let Some(builder) = self.op_builder_mut() else {
                    return Err(Error::new(
                        ErrorKind::StructuralError,
                        "curve outside an operator",
                        &file,
                        line,
                    ));
                };
                match builder {
                    OpBuilder::GradingRgbCurve(b) => {
                        b.set_curve(name, curve).map_err(|e| ctx(e, entry.line))
                    }
                    _ => Err(Error::new(
                        ErrorKind::StructuralError,
                        "curve outside a GradingRGBCurve operator",
                        &file,
                        line,
                    )),
                }
            }
            Elt::CurveData(buf) => {
                let values = scan::get_numbers::<f64>(buf.as_bytes()).map_err(|e| {
                    Error::new(
                        ErrorKind::InvalidNumber,
                        format!("illegal values in '{name}': {e}"),
                        &file,
                        entry.line,
                    )
                })?;
                let Some(Entry { elt: Elt::Curve(curve), .. }) = self.stack.last_mut() else {
                    return Err(Error::new(
                        ErrorKind::StructuralError,
                        "curve data outside a curve",
                        &file,
                        line,
                    ));
                };
                if name == TAG_CURVE_CONTROL_POINTS {
                    *curve = BSplineCurve::from_flat(&values).map_err(|e| {
                        Error::new(ErrorKind::Validation, e.to_string(), &file, entry.line)
                    })?;
                } else {
                    curve.slopes = values;
                }
                Ok(())
            }
        }
    }

    fn merge_text(&mut self, target: TextTarget, buf: String) {
        enum Dest {
            Op,
            Transform,
            Skip,
        }
        let dest = match self.stack.last().map(|e| &e.elt) {
            Some(Elt::Op(_)) | Some(Elt::SopNode) => Dest::Op,
            Some(Elt::Transform) => Dest::Transform,
            _ => Dest::Skip,
        };
        match dest {
            Dest::Op => {
                if let Some(builder) = self.op_builder_mut() {
                    builder.add_description(buf);
                }
            }
            Dest::Transform => {
                let pl = &mut self.transform.as_mut().expect("transform state").pl;
                match target {
                    TextTarget::Description => pl.descriptions.push(buf),
                    TextTarget::InputDescriptor => pl.input_descriptor.push_str(&buf),
                    TextTarget::OutputDescriptor => pl.output_descriptor.push_str(&buf),
                }
            }
            Dest::Skip => {}
        }
    }

    fn end_transform(&mut self, line: u32) -> IoResult<()> {
        let transform = self.transform.as_ref().expect("transform state");
        if transform.pl.ops.is_empty() {
            return Err(self.error(
                ErrorKind::EmptyProcessList,
                "a ProcessList must contain at least one operator",
                line,
            ));
        }
        // The bit-depth chain invariant, reported at the offending op.
        for (i, pair) in transform.pl.ops.windows(2).enumerate() {
            let out = pair[0].base().out_depth;
            let next_in = pair[1].base().in_depth;
            if out != next_in {
                let at = transform.op_lines[i + 1];
                return Err(self.error(
                    ErrorKind::BitDepthMismatch,
                    format!(
                        "bit depth mismatch between operators: {} output '{out}' does not match {} input '{next_in}'",
                        pair[0].kind(),
                        pair[1].kind()
                    ),
                    at,
                ));
            }
        }
        self.finished = true;
        Ok(())
    }

    fn finish(mut self, last_line: u32) -> IoResult<ProcessList> {
        if let Some(entry) = self.stack.last() {
            return Err(self.error(
                ErrorKind::UnclosedElement,
                format!("element '{}' was not closed", entry.name),
                entry.line,
            ));
        }
        let Some(transform) = self.transform.take() else {
            return Err(self.error(
                ErrorKind::NoProcessList,
                "no ProcessList element was found",
                last_line,
            ));
        };
        if !self.finished {
            return Err(self.error(
                ErrorKind::UnclosedElement,
                "the ProcessList element was not closed",
                last_line,
            ));
        }
        Ok(transform.pl)
    }
}

fn parse_dims(attrs: &[(String, String)]) -> Result<Vec<usize>, BuildError> {
    let dim = attrs.iter().find(|(k, _)| k == ATTR_DIMENSION).map(|(_, v)| v.as_str());
    let Some(dim) = dim else {
        return Err(BuildError::new(
            ErrorKind::MissingAttribute,
            "required attribute 'dim' is missing",
        ));
    };
    scan::get_numbers::<usize>(dim.as_bytes())
        .map_err(|e| BuildError::new(ErrorKind::InvalidNumber, format!("illegal array dimensions: {e}")))
}
