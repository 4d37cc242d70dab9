//! XML Validator
//!
//! Well-formedness checking for XML files with structured, position-aware
//! error reporting.
//!
//! This library provides:
//! - Best-effort text decoding of raw file bytes
//! - A well-formedness parser with a callback error channel
//! - The validator collecting every defect of a run
//! - Report formatting and file-level orchestration

pub mod cli;
pub mod config;
pub mod decoder;
pub mod parser;
pub mod report;
pub mod validation;

// Re-exports for clean public API
pub use config::{Config, OutputFormat};
pub use decoder::{DecodedDocument, decode, read_document};
pub use report::format_report;
pub use validation::{ValidationError, XmlValidator};
