//! Document Checker
//!
//! Single pass over a complete document. Tokenizing is done by `quick-xml`;
//! the rules it leaves to the caller (document element structure, entity and
//! character references, names, XML declaration) are enforced here.
//!
//! Defects that do not disturb tokenizing go to the error handler and the pass
//! continues. Anything that makes the rest of the document meaningless ends
//! the pass with a [`ParseError::Structural`].

use std::borrow::Cow;

use quick_xml::Reader;
use quick_xml::errors::{Error as XmlError, IllFormedError, SyntaxError};
use quick_xml::events::attributes::AttrError;
use quick_xml::events::{BytesDecl, BytesStart, Event};

use super::codes::ErrorCode;
use super::entities::{
    EntityTable, RefContext, check_internal_subset, doctype_name, scan_references,
};
use super::location::{Location, context_snippet};
use super::names::{find_illegal_char, is_valid_name, is_xml_whitespace};
use super::{ErrorHandler, ParseError};

/// Where the pass is relative to the document element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RootState {
    Before,
    Open,
    Closed,
}

struct Checker<'t, 'h, H: ?Sized> {
    text: &'t str,
    handler: &'h mut H,
    stack: Vec<String>,
    root: RootState,
    doctype_seen: bool,
    standalone: bool,
    entities: EntityTable,
}

/// Check a complete document, reporting recoverable defects to `handler`
pub fn check_document<H: ErrorHandler + ?Sized>(
    text: &str,
    handler: &mut H,
) -> Result<(), ParseError> {
    // U+FEFF is a signature, not content
    let text = text.strip_prefix('\u{FEFF}').unwrap_or(text);

    Checker {
        text,
        handler,
        stack: Vec::new(),
        root: RootState::Before,
        doctype_seen: false,
        standalone: false,
        entities: EntityTable::new(),
    }
    .run()
}

impl<'t, 'h, H: ErrorHandler + ?Sized> Checker<'t, 'h, H> {
    fn run(mut self) -> Result<(), ParseError> {
        if let Some((offset, c)) = find_illegal_char(self.text) {
            return Err(self.structural(
                ErrorCode::InvalidToken,
                offset,
                format!("illegal character U+{:04X}", c as u32),
            ));
        }

        let mut reader = Reader::from_str(self.text);
        let config = reader.config_mut();
        config.check_end_names = true;
        config.check_comments = true;

        loop {
            let start = reader.buffer_position() as usize;
            let event = match reader.read_event() {
                Ok(event) => event,
                Err(err) => {
                    let offset = reader.error_position() as usize;
                    return Err(self.tokenizer_failure(err, offset));
                }
            };

            match event {
                Event::Start(tag) => {
                    let name = self.check_element(&tag, start)?;
                    self.stack.push(name);
                    self.root = RootState::Open;
                }
                Event::Empty(tag) => {
                    self.check_element(&tag, start)?;
                    if self.stack.is_empty() {
                        self.root = RootState::Closed;
                    }
                }
                Event::End(_) => {
                    self.stack.pop();
                    if self.stack.is_empty() {
                        self.root = RootState::Closed;
                    }
                }
                Event::Text(text) => {
                    let raw = String::from_utf8_lossy(&text);
                    self.check_character_data(&raw, start)?;
                }
                Event::CData(_) => {
                    self.require_open_root(start, "CDATA section")?;
                }
                Event::Comment(_) => {}
                Event::Decl(decl) => self.check_declaration(&decl, start),
                Event::PI(pi) => {
                    let content = String::from_utf8_lossy(&pi);
                    self.check_processing_instruction(&content, start);
                }
                Event::DocType(doctype) => {
                    let content = String::from_utf8_lossy(&doctype);
                    self.check_doctype(&content, start)?;
                }
                Event::Eof => return self.finish(),
            }
        }
    }

    /// Validate a start or empty tag, returning its name
    fn check_element(&mut self, tag: &BytesStart, start: usize) -> Result<String, ParseError> {
        let name = String::from_utf8_lossy(tag.name().as_ref()).into_owned();

        if self.root == RootState::Closed {
            return Err(self.structural(
                ErrorCode::JunkAfterDocElement,
                start,
                format!("element <{}> after the document element", name),
            ));
        }

        if !is_valid_name(&name) {
            self.report(
                ErrorCode::InvalidToken,
                start,
                format!("invalid element name '{}'", name),
            );
        }

        let raw = tag.attributes_raw();
        let base = start + 1 + (tag.len() - raw.len());
        if let Some(offset) = missing_separator(raw) {
            self.report(
                ErrorCode::InvalidToken,
                base + offset,
                format!("attributes of element <{}> must be separated by white space", name),
            );
        }

        let spans = attribute_spans(raw);
        for (index, attribute) in tag.attributes().enumerate() {
            match attribute {
                Ok(attribute) => {
                    let key = String::from_utf8_lossy(attribute.key.as_ref()).into_owned();
                    let value = String::from_utf8_lossy(&attribute.value).into_owned();
                    let span = spans.get(index).map_or(
                        AttributeSpan {
                            name: start,
                            value: start,
                        },
                        |span| AttributeSpan {
                            name: base + span.name,
                            value: base + span.value,
                        },
                    );
                    self.check_attribute(&key, &value, span);
                }
                Err(AttrError::Duplicated(position, _)) => {
                    self.report(
                        ErrorCode::DuplicateAttribute,
                        start + 1 + position,
                        format!("duplicate attribute in element <{}>", name),
                    );
                }
                Err(err) => {
                    self.report(ErrorCode::InvalidToken, start, err.to_string());
                    break;
                }
            }
        }

        Ok(name)
    }

    /// `span` holds document offsets of the attribute name and value
    fn check_attribute(&mut self, key: &str, value: &str, span: AttributeSpan) {
        if !is_valid_name(key) {
            self.report(
                ErrorCode::InvalidToken,
                span.name,
                format!("invalid attribute name '{}'", key),
            );
        }
        if let Some(idx) = value.find('<') {
            self.report(
                ErrorCode::InvalidToken,
                span.value + idx,
                format!("'<' is not allowed in the value of attribute '{}'", key),
            );
        }
        for fault in scan_references(value, &self.entities, RefContext::AttributeValue) {
            self.report(fault.code, span.value + fault.offset, fault.message);
        }
    }

    fn check_character_data(&mut self, raw: &str, start: usize) -> Result<(), ParseError> {
        if self.root != RootState::Open {
            return match raw.find(|c: char| !is_xml_whitespace(c)) {
                Some(idx) => self.require_open_root(start + idx, "text"),
                None => Ok(()),
            };
        }

        if let Some(idx) = raw.find("]]>") {
            self.report(
                ErrorCode::InvalidToken,
                start + idx,
                "']]>' is not allowed in character data",
            );
        }
        for fault in scan_references(raw, &self.entities, RefContext::Content) {
            self.report(fault.code, start + fault.offset, fault.message);
        }
        Ok(())
    }

    /// Content that may only appear inside the document element
    fn require_open_root(&self, offset: usize, what: &str) -> Result<(), ParseError> {
        match self.root {
            RootState::Open => Ok(()),
            RootState::Before => Err(self.structural(
                ErrorCode::Syntax,
                offset,
                format!("{} before the document element", what),
            )),
            RootState::Closed => Err(self.structural(
                ErrorCode::JunkAfterDocElement,
                offset,
                format!("{} after the document element", what),
            )),
        }
    }

    fn check_declaration(&mut self, decl: &BytesDecl, start: usize) {
        if start != 0 {
            self.report(
                ErrorCode::MisplacedXmlPi,
                start,
                "XML declaration is only allowed at the start of the document",
            );
            return;
        }

        match decl.version() {
            Ok(version) => {
                let version = String::from_utf8_lossy(&version);
                if !is_valid_version(&version) {
                    self.report(
                        ErrorCode::XmlDecl,
                        start,
                        format!("unsupported version '{}'", version),
                    );
                }
            }
            Err(_) => self.report(ErrorCode::XmlDecl, start, "missing version"),
        }

        if let Some(encoding) = decl.encoding() {
            let valid = encoding
                .as_ref()
                .is_ok_and(|name| is_valid_encoding_name(&String::from_utf8_lossy(name)));
            if !valid {
                self.report(ErrorCode::XmlDecl, start, "invalid encoding name");
            }
        }

        if let Some(standalone) = decl.standalone() {
            match standalone.as_deref() {
                Ok(b"yes") => self.standalone = true,
                Ok(b"no") => {}
                _ => self.report(
                    ErrorCode::XmlDecl,
                    start,
                    "standalone must be 'yes' or 'no'",
                ),
            }
        }
    }

    fn check_processing_instruction(&mut self, content: &str, start: usize) {
        let target = content
            .split(|c: char| is_xml_whitespace(c))
            .next()
            .unwrap_or_default();

        if target.eq_ignore_ascii_case("xml") {
            self.report(
                ErrorCode::MisplacedXmlPi,
                start,
                format!("reserved processing instruction target '{}'", target),
            );
        } else if !is_valid_name(target) {
            self.report(
                ErrorCode::InvalidToken,
                start,
                format!("invalid processing instruction target '{}'", target),
            );
        }
    }

    fn check_doctype(&mut self, content: &str, start: usize) -> Result<(), ParseError> {
        if self.root != RootState::Before {
            return Err(self.structural(
                ErrorCode::Syntax,
                start,
                "DOCTYPE declaration after the document element".to_string(),
            ));
        }
        if self.doctype_seen {
            return Err(self.structural(
                ErrorCode::Syntax,
                start,
                "duplicate DOCTYPE declaration".to_string(),
            ));
        }
        self.doctype_seen = true;

        let name = doctype_name(content);
        if !is_valid_name(name) {
            self.report(
                ErrorCode::InvalidToken,
                start,
                format!("invalid DOCTYPE name '{}'", name),
            );
        }

        let content_offset = start + self.text[start..].find(content).unwrap_or_default();
        let faults = check_internal_subset(content).map_err(|fault| {
            self.structural(fault.code, content_offset + fault.offset, fault.message)
        })?;
        for fault in faults {
            self.report(fault.code, content_offset + fault.offset, fault.message);
        }

        self.entities = EntityTable::from_doctype(content, self.standalone);
        Ok(())
    }

    /// End-of-document conditions
    fn finish(self) -> Result<(), ParseError> {
        let end = self.text.len();
        match self.root {
            RootState::Closed => Ok(()),
            RootState::Before => Err(self.structural(
                ErrorCode::NoElements,
                end,
                "no element found".to_string(),
            )),
            RootState::Open => {
                let open = self.stack.last().map(String::as_str).unwrap_or_default();
                Err(self.structural(
                    ErrorCode::UnclosedToken,
                    end,
                    format!("element <{}> is never closed", open),
                ))
            }
        }
    }

    fn tokenizer_failure(&self, err: XmlError, offset: usize) -> ParseError {
        let code = match &err {
            XmlError::Io(_) => return ParseError::Internal(err.to_string()),
            XmlError::Syntax(SyntaxError::UnclosedCData) => ErrorCode::UnclosedCdataSection,
            XmlError::Syntax(SyntaxError::InvalidBangMarkup) => ErrorCode::Syntax,
            XmlError::Syntax(_) => ErrorCode::UnclosedToken,
            XmlError::IllFormed(
                IllFormedError::MismatchedEndTag { .. } | IllFormedError::UnmatchedEndTag(_),
            ) => ErrorCode::TagMismatch,
            XmlError::IllFormed(IllFormedError::MissingEndTag(_)) => ErrorCode::UnclosedToken,
            XmlError::IllFormed(_) => ErrorCode::InvalidToken,
            XmlError::InvalidAttr(AttrError::Duplicated(..)) => ErrorCode::DuplicateAttribute,
            XmlError::InvalidAttr(_) => ErrorCode::InvalidToken,
            _ => ErrorCode::Syntax,
        };
        self.structural(code, offset, err.to_string())
    }

    fn report<'m>(&mut self, code: ErrorCode, offset: usize, message: impl Into<Cow<'m, str>>) {
        let message = message.into();
        let location = Location::from_offset(self.text, offset);
        let context = context_snippet(self.text, offset);
        log::debug!(
            "{}:{}: {} ({})",
            location.line,
            location.column,
            message,
            code.description()
        );
        self.handler.on_error(
            code.code(),
            &message,
            location.line,
            location.column,
            &context,
        );
    }

    fn structural(&self, code: ErrorCode, offset: usize, description: String) -> ParseError {
        let location = Location::from_offset(self.text, offset);
        log::debug!(
            "{}:{}: aborting: {}",
            location.line,
            location.column,
            description
        );
        ParseError::Structural {
            code,
            description,
            line: location.line,
            column: location.column,
        }
    }
}

/// Offsets of an attribute's name and value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct AttributeSpan {
    name: usize,
    value: usize,
}

/// Name and value offsets of each attribute in the raw attribute part of a tag
fn attribute_spans(raw: &[u8]) -> Vec<AttributeSpan> {
    let mut spans = Vec::new();
    let mut quote = None;
    let mut name = None;

    for (idx, &b) in raw.iter().enumerate() {
        match quote {
            Some(open) if b == open => quote = None,
            Some(_) => {}
            None => match b {
                b'"' | b'\'' => {
                    quote = Some(b);
                    if let Some(name) = name.take() {
                        spans.push(AttributeSpan {
                            name,
                            value: idx + 1,
                        });
                    }
                }
                b'=' | b'/' | b' ' | b'\t' | b'\r' | b'\n' => {}
                _ => {
                    name.get_or_insert(idx);
                }
            },
        }
    }
    spans
}

/// Offset of the first attribute that directly follows a closing quote
fn missing_separator(raw: &[u8]) -> Option<usize> {
    let mut quote = None;
    for (idx, &b) in raw.iter().enumerate() {
        match quote {
            Some(open) if b == open => {
                quote = None;
                let next = raw.get(idx + 1).copied();
                if next.is_some_and(|n| !matches!(n, b' ' | b'\t' | b'\r' | b'\n' | b'/')) {
                    return Some(idx + 1);
                }
            }
            Some(_) => {}
            None if b == b'"' || b == b'\'' => quote = Some(b),
            None => {}
        }
    }
    None
}

/// `1.` followed by one or more digits
fn is_valid_version(version: &str) -> bool {
    version
        .strip_prefix("1.")
        .is_some_and(|minor| !minor.is_empty() && minor.bytes().all(|b| b.is_ascii_digit()))
}

/// `[A-Za-z] ([A-Za-z0-9._] | '-')*`
fn is_valid_encoding_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
}
