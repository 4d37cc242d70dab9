//! Configuration for the XML validator.
//!
//! Handles:
//! - Command-line argument parsing
//! - Output format and log level selection

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use clap::{Parser, ValueEnum};

/// How results are printed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable report
    #[default]
    Text,
    /// Machine-readable JSON object
    Json,
}

/// Command-line arguments for the XML validator
#[derive(Debug, Parser)]
#[command(name = "xml-validator")]
#[command(about = "Validate XML file structure")]
#[command(version)]
pub struct Args {
    /// XML file to check
    #[arg(value_name = "XML_FILE")]
    pub file: PathBuf,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Log level for diagnostics on stderr
    #[arg(
        long,
        default_value = "warn",
        help = "Log level (trace, debug, info, warn, error)"
    )]
    pub log_level: String,
}

/// Combined configuration from the command line
#[derive(Debug, Clone)]
pub struct Config {
    /// File to validate
    pub file: PathBuf,
    /// Output format
    pub format: OutputFormat,
    /// Log filter passed to the logger
    pub log_level: String,
}

impl Config {
    /// Create configuration from the process arguments
    pub fn from_args_and_env() -> Result<Self, clap::Error> {
        Self::try_from_iter(std::env::args_os())
    }

    /// Create configuration from an explicit argument list (useful for testing)
    pub fn try_from_iter<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        Args::try_parse_from(args).map(Self::from_args)
    }

    /// Create configuration from parsed arguments
    pub fn from_args(args: Args) -> Self {
        Config {
            file: args.file,
            format: args.format,
            log_level: args.log_level,
        }
    }
}

/// Usage text printed when the argument count is wrong
pub fn usage_text(program: &str) -> String {
    let script_name = Path::new(program)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| program.to_string());

    [
        "XML Validator - Validate XML file structure".to_string(),
        String::new(),
        format!("Usage: {} <xml_file>", script_name),
        String::new(),
        format!("Example: {} document.xml", script_name),
        format!("Example: {} \"file with spaces.xml\"", script_name),
    ]
    .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    #[test]
    fn test_single_positional_argument() {
        let config = Config::try_from_iter(["xml-validator", "doc.xml"]).expect("parse");
        assert_eq!(config.file, PathBuf::from("doc.xml"));
        assert_eq!(config.format, OutputFormat::Text);
        assert_eq!(config.log_level, "warn");
    }

    #[test]
    fn test_options() {
        let config = Config::try_from_iter([
            "xml-validator",
            "--format",
            "json",
            "--log-level",
            "debug",
            "doc.xml",
        ])
        .expect("parse");
        assert_eq!(config.format, OutputFormat::Json);
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn test_wrong_argument_counts() {
        assert!(Config::try_from_iter(["xml-validator"]).is_err());
        assert!(Config::try_from_iter(["xml-validator", "a.xml", "b.xml"]).is_err());
    }

    #[test]
    fn test_help_is_not_a_usage_error() {
        let err = Config::try_from_iter(["xml-validator", "--help"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DisplayHelp);
    }

    #[test]
    fn test_usage_text_uses_basename() {
        let usage = usage_text("/usr/local/bin/xml-validator");
        assert!(usage.starts_with("XML Validator - Validate XML file structure\n\n"));
        assert!(usage.contains("Usage: xml-validator <xml_file>"));
        assert!(usage.ends_with("Example: xml-validator \"file with spaces.xml\""));
    }
}
