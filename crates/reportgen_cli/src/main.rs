//! reportgen CLI - Main entry point.
//!
//! Exit codes:
//! - 0: Success
//! - 1: General error
//! - 2: Invalid arguments or configuration
//! - 3: Unreadable template container
//! - 4: Template error
//! - 5: Conversion error

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use reportgen_convert::ConversionError;
use reportgen_templates::{ArchiveError, TemplateError};

mod commands;
mod config;

use commands::{Cli, Commands};
use config::ConfigError;

/// CI-friendly exit codes
pub struct ExitCodes;

impl ExitCodes {
    pub const SUCCESS: u8 = 0;
    pub const GENERAL_ERROR: u8 = 1;
    pub const INVALID_ARGS: u8 = 2;
    pub const ARCHIVE_ERROR: u8 = 3;
    pub const TEMPLATE_ERROR: u8 = 4;
    pub const CONVERSION_ERROR: u8 = 5;
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli);

    let config_path = cli.config.clone();
    let result = match cli.command {
        Commands::Render(args) => commands::render::execute(args, config_path).await,
        Commands::Inspect(args) => commands::inspect::execute(args).await,
        Commands::CheckConfig(args) => commands::check_config::execute(args, config_path).await,
    };

    match result {
        Ok(()) => ExitCode::from(ExitCodes::SUCCESS),
        Err(e) => {
            let exit_code = categorize_error(&e);
            eprintln!("❌ Error: {:#}", e);
            if let Some(hint) = retry_hint(&e) {
                eprintln!("   💡 {}", hint);
            }
            ExitCode::from(exit_code)
        }
    }
}

/// Filter used when `RUST_LOG` is not set.
fn default_directives(verbose: bool, quiet: bool) -> &'static str {
    if verbose {
        "debug"
    } else if quiet {
        "error"
    } else {
        "reportgen=info,warn"
    }
}

fn init_logging(cli: &Cli) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(cli.verbose, cli.quiet)));

    let json_layer = cli
        .log_json
        .then(|| fmt::layer().json().with_writer(std::io::stderr));
    let text_layer = (!cli.log_json).then(|| {
        fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr)
    });

    let log_result = tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(text_layer)
        .try_init();

    if log_result.is_err() {
        // Logging already initialized, continue
    }
}

/// Categorize error to determine exit code
fn categorize_error(e: &anyhow::Error) -> u8 {
    for cause in e.chain() {
        if cause.downcast_ref::<ConfigError>().is_some() {
            return ExitCodes::INVALID_ARGS;
        }
        if cause.downcast_ref::<ArchiveError>().is_some() {
            return ExitCodes::ARCHIVE_ERROR;
        }
        if let Some(err) = cause.downcast_ref::<TemplateError>() {
            return match err {
                TemplateError::Archive(_) => ExitCodes::ARCHIVE_ERROR,
                TemplateError::InvalidContext(_) | TemplateError::Json(_) => {
                    ExitCodes::INVALID_ARGS
                }
                _ => ExitCodes::TEMPLATE_ERROR,
            };
        }
        if cause.downcast_ref::<ConversionError>().is_some() {
            return ExitCodes::CONVERSION_ERROR;
        }
    }
    ExitCodes::GENERAL_ERROR
}

/// Suggest a retry when the failure was a transient conversion problem.
fn retry_hint(e: &anyhow::Error) -> Option<&'static str> {
    e.chain()
        .filter_map(|cause| cause.downcast_ref::<ConversionError>())
        .any(ConversionError::is_transient)
        .then_some("The conversion may succeed if retried")
}
