//! XML event adapter.
//!
//! Wraps the `quick-xml` pull reader into the small event vocabulary the
//! element-stack parser consumes, attaching 1-based line numbers derived
//! from byte offsets.

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::error::{Error, ErrorKind, IoResult};

/// One event handed to the parser.
#[derive(Debug)]
pub enum XmlEvent {
    /// An opening tag with its attributes.
    Start {
        /// Element name.
        name: String,
        /// Attributes in document order.
        attrs: Vec<(String, String)>,
        /// Line of the opening tag.
        line: u32,
        /// True for self-closing elements; the parser synthesizes the
        /// matching end itself.
        empty: bool,
    },
    /// A closing tag.
    End {
        /// Element name.
        name: String,
        /// Line of the closing tag.
        line: u32,
    },
    /// Character data between tags, entity-decoded.
    Chars {
        /// The decoded text.
        text: String,
        /// Line where the text begins.
        line: u32,
    },
}

/// Pull source of [`XmlEvent`]s over an in-memory document.
pub struct XmlEvents<'a> {
    reader: Reader<&'a [u8]>,
    bytes: &'a [u8],
    file: &'a str,
    line_starts: Vec<usize>,
    pending: Option<XmlEvent>,
}

impl<'a> XmlEvents<'a> {
    /// Creates an event source over `bytes`; `file` names the source in
    /// diagnostics.
    pub fn new(bytes: &'a [u8], file: &'a str) -> Self {
        let mut reader = Reader::from_reader(bytes);
        let config = reader.config_mut();
        config.check_end_names = true;

        let mut line_starts = vec![0usize];
        for (i, &b) in bytes.iter().enumerate() {
            if b == b'\n' {
                line_starts.push(i + 1);
            }
        }
        Self { reader, bytes, file, line_starts, pending: None }
    }

    /// 1-based line containing byte `offset`.
    pub fn line_of(&self, offset: usize) -> u32 {
        self.line_starts.partition_point(|&s| s <= offset) as u32
    }

    /// Line at the reader's current position.
    pub fn current_line(&self) -> u32 {
        let pos = (self.reader.buffer_position() as usize).min(self.bytes.len());
        self.line_of(pos.saturating_sub(1))
    }

    fn error(&self, kind: ErrorKind, message: String, line: u32) -> Error {
        Error::new(kind, message, self.file, line)
    }

    /// Pulls the next event, or `Ok(None)` at the end of the document.
    ///
    /// Adjacent text, CDATA and entity-reference events are coalesced into a
    /// single [`XmlEvent::Chars`] since `quick-xml` splits text runs at
    /// entity boundaries.
    pub fn next(&mut self) -> IoResult<Option<XmlEvent>> {
        if let Some(pending) = self.pending.take() {
            return Ok(Some(pending));
        }

        let mut text_buf: Option<String> = None;
        let mut text_line = 0u32;

        loop {
            let start_pos = self.reader.buffer_position() as usize;
            let line = self.line_of(start_pos.min(self.bytes.len().saturating_sub(1)));
            match self.reader.read_event() {
                Ok(Event::Start(e)) => {
                    let (name, attrs) = self.tag_parts(&e, line)?;
                    let ev = XmlEvent::Start { name, attrs, line, empty: false };
                    return Ok(Some(self.defer(ev, text_buf, text_line)));
                }
                Ok(Event::Empty(e)) => {
                    let (name, attrs) = self.tag_parts(&e, line)?;
                    let ev = XmlEvent::Start { name, attrs, line, empty: true };
                    return Ok(Some(self.defer(ev, text_buf, text_line)));
                }
                Ok(Event::End(e)) => {
                    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                    let ev = XmlEvent::End { name, line };
                    return Ok(Some(self.defer(ev, text_buf, text_line)));
                }
                Ok(Event::Text(e)) => {
                    let decoded = e.decode().map_err(|err| {
                        self.error(ErrorKind::Xml, format!("XML parsing error: {err}"), line)
                    })?;
                    let chunk = quick_xml::escape::unescape(&decoded).map_err(|err| {
                        self.error(ErrorKind::Xml, format!("XML parsing error: {err}"), line)
                    })?;
                    if text_buf.is_none() {
                        text_line = line;
                    }
                    text_buf.get_or_insert_with(String::new).push_str(&chunk);
                }
                Ok(Event::GeneralRef(e)) => {
                    let resolved = self.resolve_general_ref(&e, line)?;
                    if text_buf.is_none() {
                        text_line = line;
                    }
                    text_buf.get_or_insert_with(String::new).push_str(&resolved);
                }
                Ok(Event::CData(e)) => {
                    let chunk = String::from_utf8_lossy(e.as_ref()).into_owned();
                    if text_buf.is_none() {
                        text_line = line;
                    }
                    text_buf.get_or_insert_with(String::new).push_str(&chunk);
                }
                Ok(Event::Eof) => {
                    return Ok(text_buf.map(|text| XmlEvent::Chars { text, line: text_line }));
                }
                // Declarations, comments, doctypes and processing
                // instructions carry no transform content.
                Ok(_) => continue,
                Err(quick_xml::Error::IllFormed(
                    quick_xml::errors::IllFormedError::MismatchedEndTag { expected, found },
                )) => {
                    return Err(self.error(
                        ErrorKind::TagMismatch,
                        format!("XML parsing error: expected '</{expected}>', found '</{found}>'"),
                        self.current_line(),
                    ));
                }
                Err(err) => {
                    return Err(self.error(
                        ErrorKind::Xml,
                        format!("XML parsing error: {err}"),
                        self.current_line(),
                    ));
                }
            }
        }
    }

    /// If `text_buf` holds accumulated text, stashes `ev` as pending and
    /// returns the `Chars` event instead; otherwise returns `ev` directly.
    fn defer(&mut self, ev: XmlEvent, text_buf: Option<String>, text_line: u32) -> XmlEvent {
        match text_buf {
            Some(text) => {
                self.pending = Some(ev);
                XmlEvent::Chars { text, line: text_line }
            }
            None => ev,
        }
    }

    fn resolve_general_ref(
        &self,
        e: &quick_xml::events::BytesRef<'_>,
        line: u32,
    ) -> IoResult<String> {
        if let Some(ch) = e.resolve_char_ref().map_err(|err| {
            self.error(ErrorKind::Xml, format!("XML parsing error: {err}"), line)
        })? {
            return Ok(ch.to_string());
        }
        let decoded = e.decode().map_err(|err| {
            self.error(ErrorKind::Xml, format!("XML parsing error: {err}"), line)
        })?;
        if let Some(resolved) = quick_xml::escape::resolve_predefined_entity(&decoded) {
            return Ok(resolved.to_string());
        }
        Err(self.error(
            ErrorKind::Xml,
            format!("XML parsing error: unknown entity '&{decoded};'"),
            line,
        ))
    }

    fn tag_parts(
        &self,
        e: &quick_xml::events::BytesStart<'_>,
        line: u32,
    ) -> IoResult<(String, Vec<(String, String)>)> {
        let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
        let mut attrs = Vec::new();
        for attr in e.attributes() {
            let attr = attr.map_err(|err| {
                self.error(ErrorKind::Xml, format!("XML attribute error: {err}"), line)
            })?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr
                .unescape_value()
                .map_err(|err| {
                    self.error(ErrorKind::Xml, format!("XML attribute error: {err}"), line)
                })?
                .into_owned();
            attrs.push((key, value));
        }
        Ok((name, attrs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(xml: &str) -> Vec<XmlEvent> {
        let mut src = XmlEvents::new(xml.as_bytes(), "test.xml");
        let mut out = Vec::new();
        while let Some(e) = src.next().unwrap() {
            out.push(e);
        }
        out
    }

    #[test]
    fn events_carry_line_numbers() {
        let xml = "<a>\n  <b x=\"1\"/>\n  text\n</a>";
        let events = collect(xml);
        match &events[0] {
            XmlEvent::Start { name, line, .. } => {
                assert_eq!(name, "a");
                assert_eq!(*line, 1);
            }
            other => panic!("unexpected {other:?}"),
        }
        let b = events
            .iter()
            .find(|e| matches!(e, XmlEvent::Start { name, .. } if name == "b"))
            .unwrap();
        match b {
            XmlEvent::Start { line, empty, attrs, .. } => {
                assert_eq!(*line, 2);
                assert!(*empty);
                assert_eq!(attrs[0], ("x".into(), "1".into()));
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn mismatched_end_tag_is_reported() {
        let mut src = XmlEvents::new(b"<a><b></a>", "bad.xml");
        let mut err = None;
        loop {
            match src.next() {
                Ok(Some(_)) => continue,
                Ok(None) => break,
                Err(e) => {
                    err = Some(e);
                    break;
                }
            }
        }
        assert_eq!(err.unwrap().kind, ErrorKind::TagMismatch);
    }

    #[test]
    fn entities_are_decoded() {
        let events = collect("<a>x &amp; y</a>");
        let text = events
            .iter()
            .find_map(|e| match e {
                XmlEvent::Chars { text, .. } => Some(text.clone()),
                _ => None,
            })
            .unwrap();
        assert_eq!(text, "x & y");
    }
}
