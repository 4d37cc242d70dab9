//! Validation Engine
//!
//! Drives the well-formedness parser over a document and collects every
//! defect it reports into an ordered list of [`ValidationError`]s.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use serde::Serialize;

use crate::parser::{ParseError, SENTINEL_CODE, XmlParser, describe};

/// Context placeholder when no snippet is available
pub const UNKNOWN_CONTEXT: &str = "Unknown";
/// Context label for errors synthesized from a structural failure
pub const STRUCTURAL_CONTEXT: &str = "structural-failure";
/// Context label for failures that did not come from the document
pub const PARSER_CONTEXT: &str = "Parser";

/// One defect found during a validation pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    pub code: i32,
    pub message: String,
    /// 1-based, 0 when unknown
    pub line: usize,
    /// 1-based, 0 when unknown
    pub column: usize,
    pub context: String,
}

impl ValidationError {
    /// Build an error from a parser report, prefixing the canonical description
    pub fn new(code: i32, detail: &str, line: usize, column: usize, context: &str) -> Self {
        let description = describe(code);
        let message = if !detail.is_empty() && detail != description {
            format!("{}: {}", description, detail)
        } else {
            description.into_owned()
        };

        Self {
            code,
            message,
            line,
            column,
            context: if context.is_empty() {
                UNKNOWN_CONTEXT.to_string()
            } else {
                context.to_string()
            },
        }
    }

    /// A failure that was not caused by the document itself
    pub fn unexpected(description: &str) -> Self {
        Self {
            code: SENTINEL_CODE,
            message: format!("Parser exception: {}", description),
            line: 0,
            column: 0,
            context: PARSER_CONTEXT.to_string(),
        }
    }

    /// Whether `context` holds a real snippet rather than a placeholder label
    pub fn has_context(&self) -> bool {
        !self.context.is_empty()
            && ![UNKNOWN_CONTEXT, PARSER_CONTEXT, STRUCTURAL_CONTEXT].contains(&self.context.as_str())
    }
}

/// Well-formedness validator
///
/// Owns its parser and the errors of the most recent [`validate`] call.
/// Validation takes `&mut self`, so one instance serves one document at a
/// time; use one validator per thread.
///
/// [`validate`]: XmlValidator::validate
#[derive(Debug, Default)]
pub struct XmlValidator {
    parser: XmlParser,
    errors: Vec<ValidationError>,
}

impl XmlValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget the previous run
    pub fn reset(&mut self) {
        self.parser.reset();
        self.errors.clear();
    }

    /// Check `text`; true iff no defect was found
    ///
    /// Malformed input never fails this call: every defect ends up in
    /// [`errors`](XmlValidator::errors).
    pub fn validate(&mut self, text: &str) -> bool {
        self.reset();

        let parser = &mut self.parser;
        let errors = &mut self.errors;
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            parser.parse(
                text,
                true,
                &mut |code: i32, message: &str, line: usize, column: usize, context: &str| {
                    errors.push(ValidationError::new(code, message, line, column, context));
                },
            )
        }));

        match outcome {
            Ok(Ok(())) => {}
            Ok(Err(ParseError::Structural {
                code,
                description,
                line,
                column,
            })) => {
                if self.errors.is_empty() {
                    self.errors.push(ValidationError::new(
                        code.code(),
                        &description,
                        line,
                        column,
                        STRUCTURAL_CONTEXT,
                    ));
                }
            }
            Ok(Err(ParseError::Internal(description))) => {
                log::error!("parser failed: {}", description);
                self.errors.push(ValidationError::unexpected(&description));
            }
            Err(payload) => {
                let description = panic_message(payload.as_ref());
                log::error!("parser panicked: {}", description);
                self.errors.push(ValidationError::unexpected(&description));
            }
        }

        log::info!("validation finished with {} error(s)", self.errors.len());
        self.errors.is_empty()
    }

    /// Errors from the most recent run, in the order they were found
    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }

    /// Human-readable report for the most recent run
    pub fn error_report(&self) -> String {
        crate::report::format_report(&self.errors)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
