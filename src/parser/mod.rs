//! XML Well-Formedness Parser
//!
//! The checking primitive behind the validator. It reports defects on two
//! channels: recoverable defects go to an [`ErrorHandler`] while the pass
//! continues, and a defect that ends the pass comes back as a [`ParseError`].

pub mod checker;
pub mod codes;
pub mod entities;
pub mod location;
pub mod names;

use thiserror::Error;

pub use codes::{ErrorCode, SENTINEL_CODE, describe};
pub use location::Location;

/// Receives every recoverable defect found during a pass
pub trait ErrorHandler {
    fn on_error(&mut self, code: i32, message: &str, line: usize, column: usize, context: &str);
}

impl<F> ErrorHandler for F
where
    F: FnMut(i32, &str, usize, usize, &str),
{
    fn on_error(&mut self, code: i32, message: &str, line: usize, column: usize, context: &str) {
        self(code, message, line, column, context)
    }
}

/// A failure that ended the pass
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    /// The document cannot be parsed any further
    #[error("{description} (line {line}, column {column})")]
    Structural {
        code: ErrorCode,
        description: String,
        line: usize,
        column: usize,
    },
    /// Something other than the document went wrong
    #[error("{0}")]
    Internal(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum ParserState {
    #[default]
    Ready,
    Buffering,
    Finished,
}

/// Buffers input until the final chunk, then checks it in one pass
///
/// A parser is single-use: after the final chunk it must be [`reset`] before
/// it accepts another document.
///
/// [`reset`]: XmlParser::reset
#[derive(Debug, Default)]
pub struct XmlParser {
    buffer: String,
    state: ParserState,
}

impl XmlParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop any buffered input and accept a new document
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.state = ParserState::Ready;
    }

    pub fn is_finished(&self) -> bool {
        self.state == ParserState::Finished
    }

    /// Feed a chunk; the document is checked when `is_final` is set
    pub fn parse<H: ErrorHandler + ?Sized>(
        &mut self,
        chunk: &str,
        is_final: bool,
        handler: &mut H,
    ) -> Result<(), ParseError> {
        if self.state == ParserState::Finished {
            return Err(ParseError::Structural {
                code: ErrorCode::Finished,
                description: "parser already finished; reset it before parsing again".to_string(),
                line: 0,
                column: 0,
            });
        }

        self.buffer.push_str(chunk);
        if !is_final {
            self.state = ParserState::Buffering;
            return Ok(());
        }

        self.state = ParserState::Finished;
        let document = std::mem::take(&mut self.buffer);
        log::debug!("checking document of {} bytes", document.len());
        checker::check_document(&document, handler)
    }
}
