//! File Validation
//!
//! Reads a file from disk, validates it and prints the result.

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};

use crate::config::OutputFormat;
use crate::decoder::read_document;
use crate::report::{DocumentStats, FileReport, Outcome};
use crate::validation::XmlValidator;

/// Validate one file and collect everything the report needs
pub fn inspect_file(path: &Path) -> FileReport {
    let file = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let directory = path
        .parent()
        .map(|dir| dir.display().to_string())
        .unwrap_or_default();

    let mut report = FileReport {
        file,
        directory,
        size: None,
        outcome: Outcome::Missing,
    };

    if !path.exists() {
        log::warn!("{} does not exist", path.display());
        return report;
    }

    match std::fs::metadata(path) {
        Ok(metadata) => report.size = Some(metadata.len()),
        Err(err) => {
            log::warn!("cannot stat {}: {}", path.display(), err);
            report.outcome = Outcome::MetadataUnavailable;
            return report;
        }
    }

    let document = match read_document(path) {
        Ok(document) => document,
        Err(err) => {
            log::warn!("{}", err);
            report.outcome = Outcome::Unreadable {
                reason: err.to_string(),
            };
            return report;
        }
    };

    let stats = DocumentStats::collect(&document.text);
    if let Some(declared) = &stats.declared_encoding {
        log::debug!(
            "declaration names encoding {}, decoded as {}",
            declared,
            document.encoding
        );
    }

    let mut validator = XmlValidator::new();
    let valid = validator.validate(&document.text);

    report.outcome = Outcome::Validated {
        encoding: document.encoding,
        characters: document.text.chars().count(),
        valid,
        errors: validator.errors().to_vec(),
        stats: valid.then_some(stats),
    };
    report
}

/// Validate `path` and write the result to `out`
///
/// Returns whether the file is well-formed. Problems with the file itself
/// (missing, unreadable) are part of the report; only failures to produce the
/// report are errors.
pub fn validate_xml_file(path: &Path, format: OutputFormat, out: &mut impl Write) -> Result<bool> {
    let report = inspect_file(path);

    let written = match format {
        OutputFormat::Text => writeln!(out, "{}", report.render_text()),
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&report).context("serialize report")?;
            writeln!(out, "{}", json)
        }
    };
    written.context("write report")?;

    Ok(report.is_valid())
}
