//! Entity Resolution
//!
//! General entities declared in the DOCTYPE internal subset, the structure
//! check of that subset, and the reference scanner used on character data and
//! attribute values.
//!
//! Entities are never expanded. Resolving a name computes the size its
//! expansion would have and caches the outcome, so every declared entity is
//! walked at most once per table.

use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::LazyLock;

use quick_xml::Reader;
use quick_xml::events::Event;
use regex::Regex;

use super::codes::ErrorCode;
use super::names::{is_valid_name, is_xml_char, is_xml_whitespace};

static ENTITY_DECL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?s)<!ENTITY\s+(%\s+)?([^\s%"']+)\s+(?:"([^"]*)"|'([^']*)'|((?:SYSTEM|PUBLIC)\b[^>]*))\s*>"#,
    )
    .expect("entity declaration pattern")
});

static EXTERNAL_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(?:SYSTEM|PUBLIC)\b").expect("external id pattern"));

static PE_REFERENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"%[^\s%;]+;").expect("parameter entity pattern"));

static NESTED_REFERENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&([^&;#\s]+);").expect("entity reference pattern"));

const PREDEFINED: [&str; 5] = ["amp", "lt", "gt", "apos", "quot"];

const DECLARATION_KEYWORDS: [&str; 4] = ["ENTITY", "ELEMENT", "ATTLIST", "NOTATION"];

/// Largest replacement text, in bytes, a single entity may expand to
pub const MAX_EXPANSION: usize = 8 * 1024 * 1024;

/// Where a reference appears; external entities are only legal in content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RefContext {
    Content,
    AttributeValue,
}

#[derive(Debug, Clone, PartialEq)]
enum EntityKind {
    Internal(String),
    External,
    Unparsed,
}

/// A reference that could not be resolved
#[derive(Debug, Clone, PartialEq)]
pub struct EntityFault {
    pub code: ErrorCode,
    pub message: String,
}

/// A defect found while scanning, offset relative to the scanned text
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceFault {
    pub offset: usize,
    pub code: ErrorCode,
    pub message: String,
}

type Resolution = Result<usize, EntityFault>;

/// General entities known to the document
#[derive(Debug, Clone, Default)]
pub struct EntityTable {
    entities: HashMap<String, EntityKind>,
    /// Declarations may live outside the document, so unknown names are tolerated
    lenient: bool,
    /// Expansion size or fault of every name resolved so far
    resolved: RefCell<HashMap<(String, RefContext), Resolution>>,
}

impl EntityTable {
    /// Table with only the predefined entities
    pub fn new() -> Self {
        Self::default()
    }

    /// Table that accepts any well-formed name
    fn permissive() -> Self {
        Self {
            lenient: true,
            ..Self::default()
        }
    }

    /// Collect declarations from the content of a `<!DOCTYPE ...>` declaration
    pub fn from_doctype(doctype: &str, standalone: bool) -> Self {
        let (head, subset) = split_doctype(doctype);
        let external_subset = EXTERNAL_ID.is_match(head);
        let pe_references = PE_REFERENCE.is_match(subset);

        let mut entities = HashMap::new();
        let declarations = markup_declarations(subset).unwrap_or_default();
        for caps in declarations
            .iter()
            .filter_map(|(_, decl)| ENTITY_DECL.captures(decl))
        {
            if caps.get(1).is_some() {
                // parameter entity
                continue;
            }
            let name = caps[2].to_string();
            let kind = if let Some(value) = caps.get(3).or_else(|| caps.get(4)) {
                EntityKind::Internal(value.as_str().to_string())
            } else if caps.get(5).is_some_and(|ext| ext.as_str().contains("NDATA")) {
                EntityKind::Unparsed
            } else {
                EntityKind::External
            };
            entities.entry(name).or_insert(kind);
        }

        log::debug!(
            "doctype declares {} general entities (external subset: {}, PE references: {})",
            entities.len(),
            external_subset,
            pe_references
        );

        Self {
            entities,
            lenient: (external_subset || pe_references) && !standalone,
            resolved: RefCell::default(),
        }
    }

    /// Check that `&name;` resolves, following nested references
    pub fn check_reference(&self, name: &str, context: RefContext) -> Result<(), EntityFault> {
        let mut visiting = Vec::new();
        self.resolve(name, context, &mut visiting).map(|_| ())
    }

    fn resolve(&self, name: &str, context: RefContext, visiting: &mut Vec<String>) -> Resolution {
        if PREDEFINED.contains(&name) {
            return Ok(1);
        }
        if visiting.iter().any(|open| open == name) {
            return Err(EntityFault {
                code: ErrorCode::RecursiveEntityRef,
                message: format!("entity '&{};' refers to itself", name),
            });
        }

        let key = (name.to_string(), context);
        if let Some(known) = self.resolved.borrow().get(&key) {
            return known.clone();
        }

        let resolution = self.expansion_size(name, context, visiting);
        self.resolved.borrow_mut().insert(key, resolution.clone());
        resolution
    }

    fn expansion_size(
        &self,
        name: &str,
        context: RefContext,
        visiting: &mut Vec<String>,
    ) -> Resolution {
        let value = match self.entities.get(name) {
            None if self.lenient => return Ok(0),
            None => {
                return Err(EntityFault {
                    code: ErrorCode::UndefinedEntity,
                    message: format!("undefined entity '&{};'", name),
                });
            }
            Some(EntityKind::Unparsed) => {
                return Err(EntityFault {
                    code: ErrorCode::BinaryEntityRef,
                    message: format!("reference to unparsed entity '&{};'", name),
                });
            }
            Some(EntityKind::External) => {
                return match context {
                    RefContext::Content => Ok(0),
                    RefContext::AttributeValue => Err(EntityFault {
                        code: ErrorCode::AttributeExternalEntityRef,
                        message: format!("external entity '&{};' in attribute value", name),
                    }),
                };
            }
            Some(EntityKind::Internal(value)) => value,
        };

        if value.contains('<') {
            match context {
                RefContext::AttributeValue => {
                    return Err(EntityFault {
                        code: ErrorCode::InvalidToken,
                        message: format!(
                            "entity '&{};' puts '<' into an attribute value",
                            name
                        ),
                    });
                }
                RefContext::Content if !is_balanced_content(value) => {
                    return Err(EntityFault {
                        code: ErrorCode::AsyncEntity,
                        message: format!("entity '&{};' does not contain balanced markup", name),
                    });
                }
                RefContext::Content => {}
            }
        }

        visiting.push(name.to_string());
        let mut size = value.len();
        for caps in NESTED_REFERENCE.captures_iter(value) {
            let nested = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
            size = size.saturating_add(self.resolve(nested, context, visiting)?);
        }
        visiting.pop();

        if size > MAX_EXPANSION {
            return Err(EntityFault {
                code: ErrorCode::AmplificationLimit,
                message: format!(
                    "entity '&{};' expands to more than {} bytes",
                    name, MAX_EXPANSION
                ),
            });
        }
        Ok(size)
    }
}

/// Whether replacement text is a sequence of complete elements and character data
fn is_balanced_content(value: &str) -> bool {
    let mut reader = Reader::from_str(value);
    reader.config_mut().check_end_names = true;

    let mut depth = 0usize;
    loop {
        match reader.read_event() {
            Ok(Event::Start(_)) => depth += 1,
            Ok(Event::End(_)) => match depth.checked_sub(1) {
                Some(open) => depth = open,
                None => return false,
            },
            Ok(Event::Decl(_) | Event::DocType(_)) => return false,
            Ok(Event::Eof) => return depth == 0,
            Ok(_) => {}
            Err(_) => return false,
        }
    }
}

/// Split DOCTYPE content into the part before `[` and the internal subset
fn split_doctype(doctype: &str) -> (&str, &str) {
    match doctype.find('[') {
        Some(open) => {
            let close = doctype.rfind(']').filter(|&c| c > open).unwrap_or(doctype.len());
            (&doctype[..open], &doctype[open + 1..close])
        }
        None => (doctype, ""),
    }
}

/// Check the internal subset of DOCTYPE content
///
/// `Err` is a defect that makes the subset unreadable. The `Ok` list holds
/// defects inside entity values. Offsets are relative to `doctype`.
pub fn check_internal_subset(doctype: &str) -> Result<Vec<ReferenceFault>, ReferenceFault> {
    let syntax = |offset: usize, message: &str| ReferenceFault {
        offset,
        code: ErrorCode::Syntax,
        message: message.to_string(),
    };

    let Some(open) = doctype.find('[') else {
        return Ok(Vec::new());
    };
    let Some(close) = doctype.rfind(']').filter(|&c| c > open) else {
        return Err(syntax(open, "internal subset is not closed"));
    };
    if let Some(junk) = doctype[close + 1..].find(|c: char| !is_xml_whitespace(c)) {
        return Err(syntax(close + 1 + junk, "unexpected content after the internal subset"));
    }

    let base = open + 1;
    let subset = &doctype[base..close];
    let declarations = markup_declarations(subset).map_err(|offset| {
        syntax(base + offset, "content not allowed in the internal subset")
    })?;

    let mut faults = Vec::new();
    for (offset, decl) in declarations {
        let keyword = decl[2..]
            .split(is_xml_whitespace)
            .next()
            .unwrap_or_default();
        if !DECLARATION_KEYWORDS.contains(&keyword) {
            return Err(syntax(base + offset, "unknown markup declaration"));
        }
        if keyword != "ENTITY" {
            continue;
        }

        let Some(caps) = ENTITY_DECL
            .captures(decl)
            .filter(|caps| caps.get(0).is_some_and(|m| m.len() == decl.len()))
        else {
            return Err(syntax(base + offset, "malformed entity declaration"));
        };
        if let Some(value) = caps.get(3).or_else(|| caps.get(4)) {
            faults.extend(
                check_entity_value(value.as_str())
                    .into_iter()
                    .map(|fault| ReferenceFault {
                        offset: base + offset + value.start() + fault.offset,
                        ..fault
                    }),
            );
        }
    }

    Ok(faults)
}

/// Defects in a literal entity value, which is checked when declared
fn check_entity_value(value: &str) -> Vec<ReferenceFault> {
    let mut faults = Vec::new();
    if let Some(percent) = value.find('%') {
        faults.push(ReferenceFault {
            offset: percent,
            code: ErrorCode::ParamEntityRef,
            message: "parameter entity reference in an entity value of the internal subset"
                .to_string(),
        });
    }
    faults.extend(scan_references(
        value,
        &EntityTable::permissive(),
        RefContext::Content,
    ));
    faults.sort_by_key(|fault| fault.offset);
    faults
}

/// Markup declarations of an internal subset with their offsets
///
/// Comments, processing instructions, parameter-entity references and white
/// space are skipped. `Err` carries the offset of anything else.
fn markup_declarations(subset: &str) -> Result<Vec<(usize, &str)>, usize> {
    let mut declarations = Vec::new();
    let mut cursor = 0;

    while cursor < subset.len() {
        let rest = &subset[cursor..];
        let consumed = if let Some(body) = rest.strip_prefix("<!--") {
            body.find("-->").map(|end| 4 + end + 3)
        } else if let Some(body) = rest.strip_prefix("<?") {
            body.find("?>").map(|end| 2 + end + 2)
        } else if rest.starts_with("<!") && !rest.starts_with("<![") {
            let len = declaration_len(rest);
            if let Some(len) = len {
                declarations.push((cursor, &rest[..len]));
            }
            len
        } else if let Some(body) = rest.strip_prefix('%') {
            body.find(';')
                .filter(|&end| is_valid_name(&body[..end]))
                .map(|end| end + 2)
        } else {
            let blank = rest.len() - rest.trim_start_matches(is_xml_whitespace).len();
            (blank > 0).then_some(blank)
        };

        match consumed {
            Some(len) => cursor += len,
            None => return Err(cursor),
        }
    }

    Ok(declarations)
}

/// Length of a `<!...>` declaration up to its unquoted `>`
fn declaration_len(markup: &str) -> Option<usize> {
    let mut quote = None;
    for (idx, c) in markup.char_indices() {
        match quote {
            Some(open) if c == open => quote = None,
            Some(_) => {}
            None if c == '"' || c == '\'' => quote = Some(c),
            None if c == '>' => return Some(idx + 1),
            None => {}
        }
    }
    None
}

/// Name declared by a DOCTYPE
pub fn doctype_name(doctype: &str) -> &str {
    doctype
        .trim_start()
        .split(|c: char| c.is_whitespace() || c == '[')
        .next()
        .unwrap_or_default()
}

/// Scan raw (unescaped) text for entity and character references
pub fn scan_references(raw: &str, table: &EntityTable, context: RefContext) -> Vec<ReferenceFault> {
    let mut faults = Vec::new();
    let mut cursor = 0;

    while let Some(found) = raw[cursor..].find('&') {
        let amp = cursor + found;
        let after = &raw[amp + 1..];
        let end = after.find(|c: char| c == ';' || c == '&' || c == '<' || c.is_whitespace());

        match end {
            Some(len) if after[len..].starts_with(';') => {
                let reference = &after[..len];
                if let Some((code, message)) = check_reference_text(reference, table, context) {
                    faults.push(ReferenceFault {
                        offset: amp,
                        code,
                        message,
                    });
                }
                cursor = amp + len + 2;
            }
            _ => {
                faults.push(ReferenceFault {
                    offset: amp,
                    code: ErrorCode::InvalidToken,
                    message: "'&' does not start a complete reference".to_string(),
                });
                cursor = amp + 1;
            }
        }
    }

    faults
}

fn check_reference_text(
    reference: &str,
    table: &EntityTable,
    context: RefContext,
) -> Option<(ErrorCode, String)> {
    if let Some(number) = reference.strip_prefix('#') {
        let value = match number.strip_prefix('x') {
            Some(hex) => u32::from_str_radix(hex, 16).ok(),
            None => number.parse::<u32>().ok(),
        };
        let legal = value
            .filter(|_| number.chars().all(|c| c.is_ascii_alphanumeric()))
            .and_then(char::from_u32)
            .is_some_and(is_xml_char);
        return (!legal).then(|| {
            (
                ErrorCode::BadCharRef,
                format!("invalid character reference '&{};'", reference),
            )
        });
    }

    if !is_valid_name(reference) {
        return Some((
            ErrorCode::InvalidToken,
            format!("invalid entity name '&{};'", reference),
        ));
    }

    table
        .check_reference(reference, context)
        .err()
        .map(|fault| (fault.code, fault.message))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codes(raw: &str, table: &EntityTable) -> Vec<ErrorCode> {
        scan_references(raw, table, RefContext::Content)
            .into_iter()
            .map(|f| f.code)
            .collect()
    }

    #[test]
    fn test_predefined_and_char_refs_resolve() {
        let table = EntityTable::new();
        assert!(codes("a &amp; b &lt;&gt;&apos;&quot; &#65; &#x41;", &table).is_empty());
    }

    #[test]
    fn test_undefined_entity() {
        let table = EntityTable::new();
        let faults = scan_references("x &undefined; y", &table, RefContext::Content);
        assert_eq!(faults.len(), 1);
        assert_eq!(faults[0].code, ErrorCode::UndefinedEntity);
        assert_eq!(faults[0].offset, 2);
    }

    #[test]
    fn test_bare_ampersand() {
        let table = EntityTable::new();
        assert_eq!(codes("fish & chips", &table), vec![ErrorCode::InvalidToken]);
        assert_eq!(codes("&amp", &table), vec![ErrorCode::InvalidToken]);
    }

    #[test]
    fn test_bad_char_refs() {
        let table = EntityTable::new();
        assert_eq!(codes("&#0;", &table), vec![ErrorCode::BadCharRef]);
        assert_eq!(codes("&#xZZ;", &table), vec![ErrorCode::BadCharRef]);
        assert_eq!(codes("&#;", &table), vec![ErrorCode::BadCharRef]);
        assert_eq!(codes("&#xD800;", &table), vec![ErrorCode::BadCharRef]);
    }

    #[test]
    fn test_declared_entities() {
        let table = EntityTable::from_doctype(
            r#"note [<!ENTITY writer "Donald"> <!ENTITY logo SYSTEM "logo.gif" NDATA gif> <!ENTITY chap SYSTEM "chap.xml">]"#,
            false,
        );
        assert!(codes("&writer;", &table).is_empty());
        assert!(codes("&chap;", &table).is_empty());
        assert_eq!(codes("&logo;", &table), vec![ErrorCode::BinaryEntityRef]);

        let faults = scan_references("&chap;", &table, RefContext::AttributeValue);
        assert_eq!(faults[0].code, ErrorCode::AttributeExternalEntityRef);
    }

    #[test]
    fn test_recursive_entities() {
        let table =
            EntityTable::from_doctype(r#"doc [<!ENTITY a "x&b;"><!ENTITY b "&a;y">]"#, false);
        assert_eq!(codes("&a;", &table), vec![ErrorCode::RecursiveEntityRef]);
    }

    #[test]
    fn test_nested_undefined_entity() {
        let table = EntityTable::from_doctype(r#"doc [<!ENTITY a "&missing;">]"#, false);
        assert_eq!(codes("&a;", &table), vec![ErrorCode::UndefinedEntity]);
    }

    #[test]
    fn test_external_subset_tolerates_unknown_entities() {
        let table = EntityTable::from_doctype(r#"html PUBLIC "-//W3C//DTD XHTML 1.0//EN" "x.dtd""#, false);
        assert!(codes("&nbsp;", &table).is_empty());

        let standalone = EntityTable::from_doctype(r#"html SYSTEM "x.dtd""#, true);
        assert_eq!(codes("&nbsp;", &standalone), vec![ErrorCode::UndefinedEntity]);
    }

    fn entity_chain(levels: usize, fan_out: usize) -> String {
        let mut subset = String::from("<!ENTITY e0 \"x\">");
        for level in 1..=levels {
            let value = format!("&e{};", level - 1).repeat(fan_out);
            subset.push_str(&format!("<!ENTITY e{} \"{}\">", level, value));
        }
        format!("doc [{}]", subset)
    }

    #[test]
    fn test_entity_chain_is_checked_once_per_name() {
        let table = EntityTable::from_doctype(&entity_chain(5, 10), false);
        for _ in 0..1_000 {
            assert!(codes("&e5;", &table).is_empty());
        }
        assert_eq!(table.resolved.borrow().len(), 6);
    }

    #[test]
    fn test_entity_amplification_is_capped() {
        let table = EntityTable::from_doctype(&entity_chain(12, 10), false);
        assert_eq!(codes("&e12;", &table), vec![ErrorCode::AmplificationLimit]);
        assert!(codes("&e3;", &table).is_empty());
    }

    #[test]
    fn test_markup_in_replacement_text() {
        let table = EntityTable::from_doctype(
            r#"doc [<!ENTITY open "<b>"><!ENTITY whole "<b>x</b>"><!ENTITY close "</b>">]"#,
            false,
        );
        assert_eq!(codes("&open;", &table), vec![ErrorCode::AsyncEntity]);
        assert_eq!(codes("&close;", &table), vec![ErrorCode::AsyncEntity]);
        assert!(codes("&whole;", &table).is_empty());

        let faults = scan_references("&whole;", &table, RefContext::AttributeValue);
        assert_eq!(faults[0].code, ErrorCode::InvalidToken);
    }

    #[test]
    fn test_internal_subset_structure() {
        let accepted = [
            "doc",
            "doc []",
            r#"doc [ <!-- note --> <?pi data?> <!ELEMENT doc (#PCDATA)> <!ATTLIST doc id CDATA #IMPLIED> ]"#,
            r#"doc [<!ENTITY % pe "x"> %pe; <!ENTITY gt2 '>'>]"#,
            r#"doc SYSTEM "doc.dtd" [<!NOTATION gif SYSTEM "image/gif">] "#,
        ];
        for doctype in accepted {
            assert_eq!(check_internal_subset(doctype), Ok(Vec::new()), "{}", doctype);
        }

        let fault = check_internal_subset("a [ junk ]").unwrap_err();
        assert_eq!((fault.code, fault.offset), (ErrorCode::Syntax, 4));

        let rejected = [
            "a [<!BOGUS a>]",
            "a [<!ENTITY e>]",
            "a [<!ENTITY e \"x\">",
            "a [] junk",
            "a [<![INCLUDE[ ]]>]",
            "a [<!-- open ]",
        ];
        for doctype in rejected {
            let fault = check_internal_subset(doctype).unwrap_err();
            assert_eq!(fault.code, ErrorCode::Syntax, "{}", doctype);
        }
    }

    #[test]
    fn test_entity_values_are_checked_when_declared() {
        let faults = check_internal_subset(r#"a [<!ENTITY e "fish & chips">]"#).unwrap();
        assert_eq!(faults.len(), 1);
        assert_eq!(faults[0].code, ErrorCode::InvalidToken);
        assert_eq!(faults[0].offset, 20);

        let faults = check_internal_subset(r#"a [<!ENTITY e "&#0;"><!ENTITY f "100%">]"#).unwrap();
        let codes: Vec<ErrorCode> = faults.iter().map(|f| f.code).collect();
        assert_eq!(codes, vec![ErrorCode::BadCharRef, ErrorCode::ParamEntityRef]);
    }

    #[test]
    fn test_comments_do_not_declare_entities() {
        let table = EntityTable::from_doctype(r#"doc [<!-- <!ENTITY hidden "x"> -->]"#, false);
        assert_eq!(codes("&hidden;", &table), vec![ErrorCode::UndefinedEntity]);
    }

    #[test]
    fn test_doctype_name() {
        assert_eq!(doctype_name(" note [<!ENTITY a 'b'>]"), "note");
        assert_eq!(doctype_name("html PUBLIC \"x\""), "html");
        assert_eq!(doctype_name("root[]"), "root");
    }
}
