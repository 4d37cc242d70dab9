use std::io::Write;
use std::process::ExitCode;

use anyhow::{Error, anyhow};
use clap::error::ErrorKind;

use xml_validator::cli::validate_xml_file;
use xml_validator::config::{Config, usage_text};

const EXIT_INVALID: u8 = 1;
const EXIT_CRITICAL: u8 = 2;
const EXIT_INTERRUPTED: i32 = 130;

const INTERRUPTED_MESSAGE: &str = "\n✗ Validation interrupted by user";

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // Parse configuration from command line
    let config = match Config::from_args_and_env() {
        Ok(config) => config,
        Err(err) => return argument_failure(err),
    };

    env_logger::Builder::new()
        .parse_filters(&config.log_level)
        .init();

    let validation = tokio::task::spawn_blocking(move || {
        validate_xml_file(&config.file, config.format, &mut std::io::stdout())
    });

    tokio::select! {
        joined = validation => match joined {
            Ok(Ok(true)) => ExitCode::SUCCESS,
            Ok(Ok(false)) => ExitCode::from(EXIT_INVALID),
            Ok(Err(err)) => critical_failure(err),
            Err(join_err) => critical_failure(anyhow!(join_err).context("validation task failed")),
        },
        Ok(()) = tokio::signal::ctrl_c() => {
            println!("{}", INTERRUPTED_MESSAGE);
            let _ = std::io::stdout().flush();
            // the blocking validation thread cannot be cancelled; leave without waiting for it
            std::process::exit(EXIT_INTERRUPTED);
        }
    }
}

fn argument_failure(err: clap::Error) -> ExitCode {
    match err.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
            let _ = err.print();
            ExitCode::SUCCESS
        }
        _ => {
            let program = std::env::args().next().unwrap_or_else(|| "xml-validator".to_string());
            println!("{}", usage_text(&program));
            ExitCode::from(EXIT_INVALID)
        }
    }
}

fn critical_failure(err: Error) -> ExitCode {
    println!("{}", critical_message(&err));
    eprintln!("{:?}", err);
    ExitCode::from(EXIT_CRITICAL)
}

fn critical_message(err: &Error) -> String {
    format!("\n✗ Critical error: {}", err)
}
