//! Thin pull wrapper over the quick-xml event stream.
//!
//! The walker wants recursive descent over start/end tokens, so this
//! adapter exposes one current token at a time. Self-closing elements
//! surface as a Start with a synthesized End on the next advance. Text,
//! comments and processing instructions are consumed transparently.

use std::sync::Arc;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use rustc_hash::FxHashMap;

use crate::base::SourceRef;

use super::GirError;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum XmlToken {
    Start {
        name: String,
        attributes: FxHashMap<String, String>,
    },
    End {
        name: String,
    },
    Eof,
}

pub(crate) struct XmlPull<'a> {
    reader: Reader<&'a [u8]>,
    file: Arc<str>,
    line_starts: Vec<usize>,
    current: XmlToken,
    pending_end: Option<String>,
}

impl<'a> XmlPull<'a> {
    pub fn new(input: &'a str, file: Arc<str>) -> Result<Self, GirError> {
        let mut line_starts = vec![0];
        for (i, b) in input.bytes().enumerate() {
            if b == b'\n' {
                line_starts.push(i + 1);
            }
        }
        let mut reader = Reader::from_reader(input.as_bytes());
        reader.config_mut().trim_text(true);
        let mut pull = Self {
            reader,
            file,
            line_starts,
            current: XmlToken::Eof,
            pending_end: None,
        };
        pull.advance()?;
        Ok(pull)
    }

    pub fn current(&self) -> &XmlToken {
        &self.current
    }

    /// Position of the reader, for diagnostics.
    pub fn source(&self) -> SourceRef {
        let offset = self.reader.buffer_position() as usize;
        let line = self.line_starts.partition_point(|&s| s <= offset);
        let column = offset - self.line_starts[line - 1];
        SourceRef::point(self.file.clone(), line, column)
    }

    pub fn advance(&mut self) -> Result<(), GirError> {
        if let Some(name) = self.pending_end.take() {
            self.current = XmlToken::End { name };
            return Ok(());
        }
        loop {
            match self.reader.read_event() {
                Ok(Event::Start(e)) => {
                    self.current = self.start_token(&e)?;
                    return Ok(());
                }
                Ok(Event::Empty(e)) => {
                    let token = self.start_token(&e)?;
                    if let XmlToken::Start { name, .. } = &token {
                        self.pending_end = Some(name.clone());
                    }
                    self.current = token;
                    return Ok(());
                }
                Ok(Event::End(e)) => {
                    self.current = XmlToken::End {
                        name: String::from_utf8_lossy(e.name().as_ref()).into_owned(),
                    };
                    return Ok(());
                }
                Ok(Event::Eof) => {
                    self.current = XmlToken::Eof;
                    return Ok(());
                }
                Ok(_) => continue,
                Err(e) => return Err(GirError::Xml(e.to_string())),
            }
        }
    }

    fn start_token(&self, e: &BytesStart<'_>) -> Result<XmlToken, GirError> {
        let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
        let mut attributes = FxHashMap::default();
        for attr in e.attributes() {
            let attr = attr.map_err(|e| GirError::Xml(e.to_string()))?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr
                .unescape_value()
                .map_err(|e| GirError::Xml(e.to_string()))?
                .into_owned();
            attributes.insert(key, value);
        }
        Ok(XmlToken::Start { name, attributes })
    }

    /// Name of the current Start token, if any.
    pub fn start_name(&self) -> Option<&str> {
        match &self.current {
            XmlToken::Start { name, .. } => Some(name),
            _ => None,
        }
    }

    pub fn attributes(&self) -> Option<&FxHashMap<String, String>> {
        match &self.current {
            XmlToken::Start { attributes, .. } => Some(attributes),
            _ => None,
        }
    }

    /// Consume the current element and its whole subtree.
    pub fn skip_element(&mut self) -> Result<(), GirError> {
        debug_assert!(matches!(self.current, XmlToken::Start { .. }));
        let mut depth = 0usize;
        loop {
            match &self.current {
                XmlToken::Start { .. } => depth += 1,
                XmlToken::End { .. } => {
                    depth -= 1;
                    if depth == 0 {
                        return self.advance();
                    }
                }
                XmlToken::Eof => return Ok(()),
            }
            self.advance()?;
        }
    }
}
