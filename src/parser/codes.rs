//! Error Code Taxonomy
//!
//! Closed mapping from well-formedness defect codes to canonical descriptions.

use std::borrow::Cow;

/// Code reserved for failures that did not come from the XML checker itself
pub const SENTINEL_CODE: i32 = -1;

/// Every defect or lifecycle condition the parser can report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    Syntax = 1,
    NoElements = 2,
    InvalidToken = 3,
    UnclosedToken = 4,
    PartialChar = 5,
    TagMismatch = 6,
    DuplicateAttribute = 7,
    JunkAfterDocElement = 8,
    ParamEntityRef = 9,
    UndefinedEntity = 10,
    RecursiveEntityRef = 11,
    AsyncEntity = 12,
    BadCharRef = 13,
    BinaryEntityRef = 14,
    AttributeExternalEntityRef = 16,
    MisplacedXmlPi = 17,
    UnknownEncoding = 18,
    IncorrectEncoding = 19,
    UnclosedCdataSection = 20,
    ExternalEntityHandling = 21,
    NotStandalone = 22,
    UnexpectedState = 23,
    EntityDeclaredInPe = 24,
    FeatureRequiresDtd = 25,
    CantChangeFeatureOnceParsing = 26,
    UnboundPrefix = 27,
    UndeclaringPrefix = 28,
    IncompletePe = 29,
    XmlDecl = 30,
    TextDecl = 31,
    PublicId = 32,
    Suspended = 33,
    NotSuspended = 34,
    Aborted = 35,
    Finished = 36,
    SuspendedPe = 37,
    AmplificationLimit = 43,
}

impl ErrorCode {
    const ALL: [ErrorCode; 37] = [
        ErrorCode::Syntax,
        ErrorCode::NoElements,
        ErrorCode::InvalidToken,
        ErrorCode::UnclosedToken,
        ErrorCode::PartialChar,
        ErrorCode::TagMismatch,
        ErrorCode::DuplicateAttribute,
        ErrorCode::JunkAfterDocElement,
        ErrorCode::ParamEntityRef,
        ErrorCode::UndefinedEntity,
        ErrorCode::RecursiveEntityRef,
        ErrorCode::AsyncEntity,
        ErrorCode::BadCharRef,
        ErrorCode::BinaryEntityRef,
        ErrorCode::AttributeExternalEntityRef,
        ErrorCode::MisplacedXmlPi,
        ErrorCode::UnknownEncoding,
        ErrorCode::IncorrectEncoding,
        ErrorCode::UnclosedCdataSection,
        ErrorCode::ExternalEntityHandling,
        ErrorCode::NotStandalone,
        ErrorCode::UnexpectedState,
        ErrorCode::EntityDeclaredInPe,
        ErrorCode::FeatureRequiresDtd,
        ErrorCode::CantChangeFeatureOnceParsing,
        ErrorCode::UnboundPrefix,
        ErrorCode::UndeclaringPrefix,
        ErrorCode::IncompletePe,
        ErrorCode::XmlDecl,
        ErrorCode::TextDecl,
        ErrorCode::PublicId,
        ErrorCode::Suspended,
        ErrorCode::NotSuspended,
        ErrorCode::Aborted,
        ErrorCode::Finished,
        ErrorCode::SuspendedPe,
        ErrorCode::AmplificationLimit,
    ];

    /// Numeric value reported through the error callback
    pub fn code(self) -> i32 {
        self as i32
    }

    /// Look up a code; `None` for anything outside the taxonomy
    pub fn from_code(code: i32) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| c.code() == code)
    }

    /// Canonical English description
    pub fn description(self) -> &'static str {
        match self {
            ErrorCode::Syntax => "Syntax error",
            ErrorCode::NoElements => "No elements found",
            ErrorCode::InvalidToken => "Invalid token",
            ErrorCode::UnclosedToken => "Unclosed token",
            ErrorCode::PartialChar => "Partial character",
            ErrorCode::TagMismatch => "Tag mismatch",
            ErrorCode::DuplicateAttribute => "Duplicate attribute",
            ErrorCode::JunkAfterDocElement => "Junk after document element",
            ErrorCode::ParamEntityRef => "Parameter entity reference",
            ErrorCode::UndefinedEntity => "Undefined entity",
            ErrorCode::RecursiveEntityRef => "Recursive entity reference",
            ErrorCode::AsyncEntity => "Async entity",
            ErrorCode::BadCharRef => "Bad character reference",
            ErrorCode::BinaryEntityRef => "Binary entity reference",
            ErrorCode::AttributeExternalEntityRef => "Attribute external entity",
            ErrorCode::MisplacedXmlPi => "Misplaced XML PI",
            ErrorCode::UnknownEncoding => "Unknown encoding",
            ErrorCode::IncorrectEncoding => "Incorrect encoding",
            ErrorCode::UnclosedCdataSection => "Unclosed CDATA section",
            ErrorCode::ExternalEntityHandling => "External entity handling",
            ErrorCode::NotStandalone => "Not standalone",
            ErrorCode::UnexpectedState => "Unexpected state",
            ErrorCode::EntityDeclaredInPe => "Entity in PE",
            ErrorCode::FeatureRequiresDtd => "Feature requires DTD",
            ErrorCode::CantChangeFeatureOnceParsing => "Cannot change feature",
            ErrorCode::UnboundPrefix => "Unbound prefix",
            ErrorCode::UndeclaringPrefix => "Undeclaring prefix",
            ErrorCode::IncompletePe => "Incomplete PE",
            ErrorCode::XmlDecl => "XML declaration",
            ErrorCode::TextDecl => "Text declaration",
            ErrorCode::PublicId => "Public ID",
            ErrorCode::Suspended => "Suspended",
            ErrorCode::NotSuspended => "Not suspended",
            ErrorCode::Aborted => "Aborted",
            ErrorCode::Finished => "Finished",
            ErrorCode::SuspendedPe => "Suspended PE",
            ErrorCode::AmplificationLimit => "Entity amplification limit exceeded",
        }
    }
}

/// Describe any integer code, falling back to "XML error <code>"
pub fn describe(code: i32) -> Cow<'static, str> {
    match ErrorCode::from_code(code) {
        Some(known) => Cow::Borrowed(known.description()),
        None => Cow::Owned(format!("XML error {}", code)),
    }
}
