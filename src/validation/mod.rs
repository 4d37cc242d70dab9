//! Validation Engine
//!
//! Structured, position-aware well-formedness validation.

pub mod engine;

pub use engine::{
    PARSER_CONTEXT, STRUCTURAL_CONTEXT, UNKNOWN_CONTEXT, ValidationError, XmlValidator,
};
