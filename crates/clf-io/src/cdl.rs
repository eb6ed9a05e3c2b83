//! ASC CDL file parsing and writing.
//!
//! Three sibling XML schemas share the slope/offset/power/saturation
//! grammar:
//!
//! - `.cc` - a single `ColorCorrection`
//! - `.ccc` - a `ColorCorrectionCollection` of corrections
//! - `.cdl` - a `ColorDecisionList` of `ColorDecision`s, each wrapping a
//!   correction and an optional media reference
//!
//! The root element selects which dispatch table drives the parse; the
//! `SOPNode`/`SatNode` terminal readers are the ones the CLF/CTF `ASC_CDL`
//! operator uses.

use std::fs;
use std::path::Path;

use clf_core::scan;
use clf_ops::CdlOp;

use crate::error::{Error, ErrorKind, IoResult};
use crate::events::{XmlEvent, XmlEvents};
use crate::readers::set_cdl_value;
use crate::tags::*;

/// Which of the three schemas a document used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CdlFormat {
    /// A single ColorCorrection.
    Cc,
    /// A ColorCorrectionCollection.
    Ccc,
    /// A ColorDecisionList.
    Cdl,
}

/// One color decision: a correction plus its media reference.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ColorDecision {
    /// The wrapped correction.
    pub correction: CdlOp,
    /// `MediaRef ref=` attribute, when present.
    pub media_ref: String,
}

/// A parsed CDL document of any of the three schemas.
#[derive(Debug, Clone, PartialEq)]
pub struct CdlCollection {
    /// The schema the document used.
    pub format: CdlFormat,
    /// Collection-level descriptions.
    pub descriptions: Vec<String>,
    /// Input description, when present.
    pub input_description: String,
    /// Viewing description, when present.
    pub viewing_description: String,
    /// The corrections with their decision context, in document order.
    pub decisions: Vec<ColorDecision>,
}

impl CdlCollection {
    /// Corrections only, without decision context.
    pub fn corrections(&self) -> impl Iterator<Item = &CdlOp> {
        self.decisions.iter().map(|d| &d.correction)
    }

    /// Finds a correction by id.
    pub fn find(&self, id: &str) -> Option<&CdlOp> {
        self.corrections().find(|c| c.base.id == id)
    }
}

/// Reads any of the three CDL file kinds.
pub fn read_cdl_file(path: &Path) -> IoResult<CdlCollection> {
    let name = path.display().to_string();
    let bytes = fs::read(path)
        .map_err(|e| Error::new(ErrorKind::Io, format!("cannot read file: {e}"), name.clone(), 0))?;
    parse_cdl(&bytes, &name)
}

/// Parses a CC/CCC/CDL document.
pub fn parse_cdl(bytes: &[u8], file_name: &str) -> IoResult<CdlCollection> {
    let mut events = XmlEvents::new(bytes, file_name);
    let mut parser = CdlParser::new(file_name);
    while let Some(event) = events.next()? {
        parser.handle(event)?;
    }
    parser.finish(events.current_line())
}

// ============================================================================
// Parser
// ============================================================================

enum Elt {
    Root,
    Decision,
    Correction,
    SopNode,
    SatNode,
    /// Slope/Offset/Power/Saturation; buffers character data.
    Value(String),
    /// Description-like text at root, decision or correction level.
    Text(String),
    MediaRef,
    Dummy,
}

struct Entry {
    name: String,
    line: u32,
    elt: Elt,
}

struct CdlParser {
    file: String,
    stack: Vec<Entry>,
    format: Option<CdlFormat>,
    out: CdlCollection,
    current: Option<ColorDecision>,
    finished: bool,
}

impl CdlParser {
    fn new(file: &str) -> Self {
        Self {
            file: file.to_string(),
            stack: Vec::new(),
            format: None,
            out: CdlCollection {
                format: CdlFormat::Cc,
                descriptions: Vec::new(),
                input_description: String::new(),
                viewing_description: String::new(),
                decisions: Vec::new(),
            },
            current: None,
            finished: false,
        }
    }

    fn error(&self, kind: ErrorKind, message: impl Into<String>, line: u32) -> Error {
        Error::new(kind, message, &self.file, line)
    }

    fn push(&mut self, name: &str, line: u32, elt: Elt) {
        self.stack.push(Entry { name: name.to_string(), line, elt });
    }

    fn push_dummy(&mut self, name: &str, line: u32) {
        tracing::warn!("{}({line}): element '{name}' is not valid in this context", self.file);
        self.push(name, line, Elt::Dummy);
    }

    fn handle(&mut self, event: XmlEvent) -> IoResult<()> {
        match event {
            XmlEvent::Start { name, attrs, line, empty } => {
                self.start(&name, &attrs, line)?;
                if empty {
                    self.end(&name, line)?;
                }
                Ok(())
            }
            XmlEvent::End { name, line } => self.end(&name, line),
            XmlEvent::Chars { text, .. } => {
                if let Some(entry) = self.stack.last_mut() {
                    match &mut entry.elt {
                        Elt::Value(buf) | Elt::Text(buf) => buf.push_str(&text),
                        _ => {}
                    }
                }
                Ok(())
            }
        }
    }

    fn start(&mut self, name: &str, attrs: &[(String, String)], line: u32) -> IoResult<()> {
        if matches!(self.stack.last().map(|e| &e.elt), Some(Elt::Dummy)) {
            self.push(name, line, Elt::Dummy);
            return Ok(());
        }

        // The root element installs the dispatch table.
        let Some(top) = self.stack.last() else {
            let format = match name {
                CDL_TAG_COLOR_DECISION_LIST => CdlFormat::Cdl,
                CDL_TAG_COLOR_CORRECTION_COLLECTION => CdlFormat::Ccc,
                CDL_TAG_COLOR_CORRECTION => CdlFormat::Cc,
                _ => {
                    return Err(self.error(
                        ErrorKind::NoProcessList,
                        format!("'{name}' is not an ASC CDL root element"),
                        line,
                    ));
                }
            };
            if self.format.is_some() {
                return Err(self.error(
                    ErrorKind::StructuralError,
                    "more than one root element",
                    line,
                ));
            }
            self.format = Some(format);
            self.out.format = format;
            if format == CdlFormat::Cc {
                self.begin_correction(attrs);
                self.push(name, line, Elt::Correction);
            } else {
                self.push(name, line, Elt::Root);
            }
            return Ok(());
        };

        match &top.elt {
            Elt::Root => match (self.format.unwrap(), name) {
                (CdlFormat::Cdl, CDL_TAG_COLOR_DECISION) => {
                    self.current = Some(ColorDecision::default());
                    self.push(name, line, Elt::Decision);
                    Ok(())
                }
                (CdlFormat::Ccc, CDL_TAG_COLOR_CORRECTION) => {
                    self.begin_correction(attrs);
                    self.push(name, line, Elt::Correction);
                    Ok(())
                }
                (_, TAG_DESCRIPTION | CDL_TAG_INPUT_DESCRIPTION | CDL_TAG_VIEWING_DESCRIPTION) => {
                    self.push(name, line, Elt::Text(String::new()));
                    Ok(())
                }
                _ => {
                    self.push_dummy(name, line);
                    Ok(())
                }
            },
            Elt::Decision => match name {
                CDL_TAG_COLOR_CORRECTION => {
                    let current = self.current.as_mut().expect("decision in flight");
                    for (k, v) in attrs {
                        if k == ATTR_ID {
                            current.correction.base.id = v.clone();
                        }
                    }
                    self.push(name, line, Elt::Correction);
                    Ok(())
                }
                CDL_TAG_MEDIA_REF => {
                    let current = self.current.as_mut().expect("decision in flight");
                    for (k, v) in attrs {
                        if k == "ref" {
                            current.media_ref = v.clone();
                        }
                    }
                    self.push(name, line, Elt::MediaRef);
                    Ok(())
                }
                TAG_DESCRIPTION => {
                    self.push(name, line, Elt::Text(String::new()));
                    Ok(())
                }
                _ => {
                    self.push_dummy(name, line);
                    Ok(())
                }
            },
            Elt::Correction => match name {
                TAG_SOPNODE => {
                    self.push(name, line, Elt::SopNode);
                    Ok(())
                }
                TAG_SATNODE | TAG_SATNODE_ALT => {
                    self.push(name, line, Elt::SatNode);
                    Ok(())
                }
                TAG_DESCRIPTION | CDL_TAG_INPUT_DESCRIPTION | CDL_TAG_VIEWING_DESCRIPTION => {
                    self.push(name, line, Elt::Text(String::new()));
                    Ok(())
                }
                _ => {
                    self.push_dummy(name, line);
                    Ok(())
                }
            },
            Elt::SopNode => match name {
                TAG_SLOPE | TAG_OFFSET | TAG_POWER => {
                    self.push(name, line, Elt::Value(String::new()));
                    Ok(())
                }
                TAG_DESCRIPTION => {
                    self.push(name, line, Elt::Text(String::new()));
                    Ok(())
                }
                _ => {
                    self.push_dummy(name, line);
                    Ok(())
                }
            },
            Elt::SatNode => match name {
                TAG_SATURATION => {
                    self.push(name, line, Elt::Value(String::new()));
                    Ok(())
                }
                _ => {
                    self.push_dummy(name, line);
                    Ok(())
                }
            },
            _ => {
                self.push_dummy(name, line);
                Ok(())
            }
        }
    }

    fn begin_correction(&mut self, attrs: &[(String, String)]) {
        let mut decision = ColorDecision::default();
        for (k, v) in attrs {
            if k == ATTR_ID {
                decision.correction.base.id = v.clone();
            }
        }
        self.current = Some(decision);
    }

    fn end(&mut self, name: &str, line: u32) -> IoResult<()> {
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

        match entry.elt {
            Elt::Correction => {
                if self.format == Some(CdlFormat::Cdl) && !self.stack.is_empty() {
                    // Wait for the enclosing ColorDecision to close.
                    return Ok(());
                }
                let decision = self.current.take().expect("correction in flight");
                decision.correction.validate().map_err(|e| {
                    self.error(ErrorKind::Validation, e.to_string(), entry.line)
                })?;
                self.out.decisions.push(decision);
                if self.format == Some(CdlFormat::Cc) {
                    self.finished = true;
                }
                Ok(())
            }
            Elt::Decision => {
                let decision = self.current.take().expect("decision in flight");
                decision.correction.validate().map_err(|e| {
                    self.error(ErrorKind::Validation, e.to_string(), entry.line)
                })?;
                self.out.decisions.push(decision);
                Ok(())
            }
            Elt::Root => {
                self.finished = true;
                Ok(())
            }
            Elt::Value(buf) => {
                let current = self.current.as_mut().ok_or_else(|| {
                    Error::new(
                        ErrorKind::StructuralError,
                        "value outside a ColorCorrection",
                        &self.file,
                        line,
                    )
                })?;
                set_cdl_value(&mut current.correction, name, &buf)
                    .map_err(|e| Error::new(e.kind, e.message, &self.file, entry.line))?;
                Ok(())
            }
            Elt::Text(buf) => {
                let text = scan::trim(&buf).to_string();
                match name {
                    CDL_TAG_INPUT_DESCRIPTION => self.out.input_description = text,
                    CDL_TAG_VIEWING_DESCRIPTION => self.out.viewing_description = text,
                    _ => {
                        if let Some(current) = self.current.as_mut() {
                            current.correction.base.descriptions.push(text);
                        } else {
                            self.out.descriptions.push(text);
                        }
                    }
                }
                Ok(())
            }
            Elt::SopNode | Elt::SatNode | Elt::MediaRef | Elt::Dummy => Ok(()),
        }
    }

    fn finish(mut self, last_line: u32) -> IoResult<CdlCollection> {
        if let Some(entry) = self.stack.last() {
            return Err(self.error(
                ErrorKind::UnclosedElement,
                format!("element '{}' was not closed", entry.name),
                entry.line,
            ));
        }
        if self.format.is_none() || !self.finished {
            return Err(self.error(
                ErrorKind::NoProcessList,
                "no ASC CDL root element was found",
                last_line,
            ));
        }

        // Ids must be unique across a collection; every correction is
        // parsed before the check raises.
        for (i, d) in self.out.decisions.iter().enumerate() {
            let id = &d.correction.base.id;
            if id.is_empty() {
                continue;
            }
            if self.out.decisions[..i].iter().any(|p| &p.correction.base.id == id) {
                return Err(self.error(
                    ErrorKind::DuplicateId,
                    format!("duplicated ColorCorrection id '{id}'"),
                    last_line,
                ));
            }
        }
        self.current = None;
        Ok(self.out)
    }
}

// ============================================================================
// Writing
// ============================================================================

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

fn fmt3(v: [f64; 3]) -> String {
    format!("{} {} {}", v[0], v[1], v[2])
}

fn write_text_element<W: std::io::Write>(
    xml: &mut Writer<W>,
    name: &str,
    text: &str,
) -> Result<(), crate::error::WriteError> {
    let map = |e| crate::error::WriteError::Xml(format!("{e}"));
    xml.write_event(Event::Start(BytesStart::new(name))).map_err(map)?;
    xml.write_event(Event::Text(BytesText::new(text))).map_err(map)?;
    xml.write_event(Event::End(BytesEnd::new(name))).map_err(map)?;
    Ok(())
}

fn write_correction<W: std::io::Write>(
    xml: &mut Writer<W>,
    cc: &CdlOp,
) -> Result<(), crate::error::WriteError> {
    let map = |e| crate::error::WriteError::Xml(format!("{e}"));

    let mut start = BytesStart::new(CDL_TAG_COLOR_CORRECTION);
    if !cc.base.id.is_empty() {
        start.push_attribute((ATTR_ID, cc.base.id.as_str()));
    }
    xml.write_event(Event::Start(start)).map_err(map)?;

    xml.write_event(Event::Start(BytesStart::new(TAG_SOPNODE))).map_err(map)?;
    for d in &cc.base.descriptions {
        write_text_element(xml, TAG_DESCRIPTION, d)?;
    }
    write_text_element(xml, TAG_SLOPE, &fmt3(cc.slope))?;
    write_text_element(xml, TAG_OFFSET, &fmt3(cc.offset))?;
    write_text_element(xml, TAG_POWER, &fmt3(cc.power))?;
    xml.write_event(Event::End(BytesEnd::new(TAG_SOPNODE))).map_err(map)?;

    xml.write_event(Event::Start(BytesStart::new(TAG_SATNODE))).map_err(map)?;
    write_text_element(xml, TAG_SATURATION, &cc.saturation.to_string())?;
    xml.write_event(Event::End(BytesEnd::new(TAG_SATNODE))).map_err(map)?;

    xml.write_event(Event::End(BytesEnd::new(CDL_TAG_COLOR_CORRECTION))).map_err(map)?;
    Ok(())
}

/// Writes a single ColorCorrection (`.cc`) document.
pub fn write_cc(cc: &CdlOp) -> Result<String, crate::error::WriteError> {
    let mut buf = Vec::new();
    {
        let mut xml = Writer::new_with_indent(&mut buf, b' ', 4);
        let map = |e| crate::error::WriteError::Xml(format!("{e}"));
        xml.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
            .map_err(map)?;
        write_correction(&mut xml, cc)?;
    }
    String::from_utf8(buf).map_err(|e| crate::error::WriteError::Xml(e.to_string()))
}

/// Writes a ColorCorrectionCollection (`.ccc`) document.
pub fn write_ccc(collection: &CdlCollection) -> Result<String, crate::error::WriteError> {
    let mut buf = Vec::new();
    {
        let mut xml = Writer::new_with_indent(&mut buf, b' ', 4);
        let map = |e| crate::error::WriteError::Xml(format!("{e}"));
        xml.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
            .map_err(map)?;
        xml.write_event(Event::Start(BytesStart::new(CDL_TAG_COLOR_CORRECTION_COLLECTION)))
            .map_err(map)?;
        for d in &collection.descriptions {
            write_text_element(&mut xml, TAG_DESCRIPTION, d)?;
        }
        for decision in &collection.decisions {
            write_correction(&mut xml, &decision.correction)?;
        }
        xml.write_event(Event::End(BytesEnd::new(CDL_TAG_COLOR_CORRECTION_COLLECTION)))
            .map_err(map)?;
    }
    String::from_utf8(buf).map_err(|e| crate::error::WriteError::Xml(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_cc() {
        let xml = r#"<?xml version="1.0"?>
<ColorCorrection id="shot_042">
  <SOPNode>
    <Description>warm grade</Description>
    <Slope>1.1 1.0 0.95</Slope>
    <Offset>0.01 0.0 0.0</Offset>
    <Power>1.0 1.0 1.1</Power>
  </SOPNode>
  <SatNode>
    <Saturation>0.9</Saturation>
  </SatNode>
</ColorCorrection>"#;
        let c = parse_cdl(xml.as_bytes(), "g.cc").unwrap();
        assert_eq!(c.format, CdlFormat::Cc);
        assert_eq!(c.decisions.len(), 1);
        let cc = &c.decisions[0].correction;
        assert_eq!(cc.base.id, "shot_042");
        assert_eq!(cc.slope, [1.1, 1.0, 0.95]);
        assert_eq!(cc.saturation, 0.9);
        assert_eq!(cc.base.descriptions, vec!["warm grade"]);
    }

    #[test]
    fn collection_with_two_corrections() {
        let xml = r#"<ColorCorrectionCollection>
  <Description>dailies</Description>
  <ColorCorrection id="a">
    <SOPNode><Slope>1 1 1</Slope><Offset>0 0 0</Offset><Power>1 1 1</Power></SOPNode>
  </ColorCorrection>
  <ColorCorrection id="b">
    <SOPNode><Slope>2 2 2</Slope><Offset>0 0 0</Offset><Power>1 1 1</Power></SOPNode>
  </ColorCorrection>
</ColorCorrectionCollection>"#;
        let c = parse_cdl(xml.as_bytes(), "g.ccc").unwrap();
        assert_eq!(c.format, CdlFormat::Ccc);
        assert_eq!(c.descriptions, vec!["dailies"]);
        assert_eq!(c.decisions.len(), 2);
        assert_eq!(c.find("b").unwrap().slope, [2.0, 2.0, 2.0]);
    }

    #[test]
    fn decision_list_with_media_ref() {
        let xml = r#"<ColorDecisionList>
  <ColorDecision>
    <MediaRef ref="clips/A001.mov"/>
    <ColorCorrection id="a">
      <SOPNode><Slope>1 1 1</Slope><Offset>0 0 0</Offset><Power>1 1 1</Power></SOPNode>
      <SatNode><Saturation>1.2</Saturation></SatNode>
    </ColorCorrection>
  </ColorDecision>
</ColorDecisionList>"#;
        let c = parse_cdl(xml.as_bytes(), "g.cdl").unwrap();
        assert_eq!(c.format, CdlFormat::Cdl);
        assert_eq!(c.decisions.len(), 1);
        assert_eq!(c.decisions[0].media_ref, "clips/A001.mov");
        assert_eq!(c.decisions[0].correction.saturation, 1.2);
    }

    #[test]
    fn duplicate_ids_are_rejected_after_both_parse() {
        let xml = r#"<ColorCorrectionCollection>
  <ColorCorrection id="x">
    <SOPNode><Slope>1 1 1</Slope><Offset>0 0 0</Offset><Power>1 1 1</Power></SOPNode>
  </ColorCorrection>
  <ColorCorrection id="x">
    <SOPNode><Slope>2 2 2</Slope><Offset>0 0 0</Offset><Power>1 1 1</Power></SOPNode>
  </ColorCorrection>
</ColorCorrectionCollection>"#;
        let err = parse_cdl(xml.as_bytes(), "dup.ccc").unwrap_err();
        assert_eq!(err.kind, ErrorKind::DuplicateId);
        assert!(err.message.contains("'x'"));
    }

    #[test]
    fn wrong_root_is_rejected() {
        let err = parse_cdl(b"<ProcessList id=\"a\"/>", "x.cc").unwrap_err();
        assert_eq!(err.kind, ErrorKind::NoProcessList);
    }

    #[test]
    fn cc_round_trip() {
        let mut cc = CdlOp::default();
        cc.base.id = "rt".to_string();
        cc.slope = [1.2, 1.0, 0.8];
        cc.offset = [0.01, 0.02, 0.03];
        cc.power = [0.9, 1.0, 1.1];
        cc.saturation = 1.25;

        let xml = write_cc(&cc).unwrap();
        let parsed = parse_cdl(xml.as_bytes(), "rt.cc").unwrap();
        let back = &parsed.decisions[0].correction;
        assert_eq!(back.base.id, "rt");
        assert_eq!(back.slope, cc.slope);
        assert_eq!(back.offset, cc.offset);
        assert_eq!(back.power, cc.power);
        assert_eq!(back.saturation, cc.saturation);
    }

    #[test]
    fn ccc_round_trip() {
        let xml = r#"<ColorCorrectionCollection>
  <ColorCorrection id="a">
    <SOPNode><Slope>1.5 1 1</Slope><Offset>0 0 0</Offset><Power>1 1 1</Power></SOPNode>
  </ColorCorrection>
</ColorCorrectionCollection>"#;
        let c = parse_cdl(xml.as_bytes(), "rt.ccc").unwrap();
        let out = write_ccc(&c).unwrap();
        let c2 = parse_cdl(out.as_bytes(), "rt2.ccc").unwrap();
        assert_eq!(c.decisions[0].correction.slope, c2.decisions[0].correction.slope);
    }
}
