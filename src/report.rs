//! Report Formatting
//!
//! Text and JSON renderings of validation results. The text layout is fixed;
//! tools downstream match on it literally.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::validation::ValidationError;

const RULE_WIDTH: usize = 60;
/// Only this many leading characters are searched for an XML declaration
const DECLARATION_WINDOW: usize = 100;

static DECLARED_ENCODING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*<\?xml\s[^>]*?\bencoding\s*=\s*["']([^"']+)["']"#)
        .expect("encoding declaration pattern")
});

/// Format the errors of one validation run
pub fn format_report(errors: &[ValidationError]) -> String {
    if errors.is_empty() {
        return "✓ XML is valid and well-formed.".to_string();
    }

    let mut lines = vec!["✗ XML VALIDATION ERRORS".to_string(), "=".repeat(RULE_WIDTH)];

    for (index, error) in errors.iter().enumerate() {
        lines.push(format!("\nERROR {}:", index + 1));
        lines.push(format!("  Type:    {}", error.message));
        if error.line > 0 {
            lines.push(format!("  Line:    {}", error.line));
        }
        if error.column > 0 {
            lines.push(format!("  Column:  {}", error.column));
        }
        if error.has_context() {
            lines.push(format!("  Context: {}", error.context));
        }
    }

    lines.push(format!("\n{}", "=".repeat(RULE_WIDTH)));
    lines.join("\n")
}

/// Rough statistics about a well-formed document
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentStats {
    pub lines: usize,
    /// Count of `<` minus `<?` and `<!`; end tags are included
    pub elements: usize,
    pub has_declaration: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub declared_encoding: Option<String>,
}

impl DocumentStats {
    pub fn collect(text: &str) -> Self {
        let head = match text.char_indices().nth(DECLARATION_WINDOW) {
            Some((idx, _)) => &text[..idx],
            None => text,
        };

        Self {
            lines: text.matches('\n').count() + 1,
            elements: text.matches('<').count()
                - text.matches("<?").count()
                - text.matches("<!").count(),
            has_declaration: head.contains("<?xml"),
            declared_encoding: DECLARED_ENCODING
                .captures(text)
                .map(|caps| caps[1].to_string()),
        }
    }
}

/// How far validation of a file got
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Missing,
    MetadataUnavailable,
    Unreadable {
        reason: String,
    },
    Validated {
        encoding: &'static str,
        characters: usize,
        valid: bool,
        errors: Vec<ValidationError>,
        #[serde(skip_serializing_if = "Option::is_none")]
        stats: Option<DocumentStats>,
    },
}

/// Everything known about one validated file
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileReport {
    pub file: String,
    pub directory: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(flatten)]
    pub outcome: Outcome,
}

impl FileReport {
    /// True only for a file that was read and is well-formed
    pub fn is_valid(&self) -> bool {
        matches!(self.outcome, Outcome::Validated { valid: true, .. })
    }

    pub fn render_text(&self) -> String {
        let rule = "-".repeat(RULE_WIDTH);
        let mut lines = vec![
            format!("File: {}", self.file),
            format!("Path: {}", self.directory),
            rule.clone(),
        ];

        match &self.outcome {
            Outcome::Missing => lines.push("✗ File does not exist".to_string()),
            Outcome::MetadataUnavailable => {
                lines.push("✗ Cannot access file metadata".to_string())
            }
            Outcome::Unreadable { .. } => {
                self.push_size(&mut lines);
                lines.push("✗ Cannot read file (encoding issue or file corruption)".to_string());
            }
            Outcome::Validated {
                encoding,
                characters,
                valid,
                errors,
                stats,
            } => {
                self.push_size(&mut lines);
                lines.push(format!("Encoding detected: {}", encoding));
                lines.push(format!(
                    "Content length: {} characters",
                    group_digits(*characters as u64)
                ));
                lines.push(rule);
                lines.push(format_report(errors));

                if *valid {
                    lines.push("\n✓ VALIDATION SUCCESSFUL".to_string());
                    if let Some(stats) = stats {
                        lines.push(format!("  Document lines: {}", stats.lines));
                        lines.push(format!("  XML elements: {}", stats.elements));
                        if stats.has_declaration {
                            lines.push("  XML declaration: Present".to_string());
                        }
                    }
                } else {
                    lines.push("\n✗ VALIDATION FAILED".to_string());
                    lines.push(format!("  Error count: {}", errors.len()));
                }
            }
        }

        lines.join("\n")
    }

    fn push_size(&self, lines: &mut Vec<String>) {
        if let Some(size) = self.size {
            lines.push(format!("Size: {} bytes", group_digits(size)));
        }
    }
}

/// `1234567` -> `1,234,567`
pub fn group_digits(value: u64) -> String {
    let digits = value.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (idx, digit) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    grouped
}
