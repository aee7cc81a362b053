//! CLI command definitions.
//!
//! Each subcommand maps to one operation on a report template.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub mod check_config;
pub mod inspect;
pub mod render;

/// reportgen - fill DOCX report templates from JSON data
#[derive(Parser)]
#[command(name = "reportgen")]
#[command(version, about = "reportgen - fill DOCX report templates from JSON data")]
#[command(long_about = r#"
reportgen fills DOCX templates with values from a JSON payload and converts
the result into its delivery format.

TAGS:
  {{Name}}          → text bound to Name
  {{Name:fmt}}      → same as {{Name}}, the formatter is ignored
  {%Photo%}         → image fetched from Photo's url ({%Photo} also works)

COMMANDS:
  render        → Render a template and write the report
  inspect       → List the tags a template uses
  check-config  → Show the effective configuration

EXIT CODES:
  0 - Success
  1 - General error
  2 - Invalid arguments or configuration
  3 - Unreadable template container
  4 - Template error
  5 - Conversion error
"#)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Configuration file (YAML)
    #[arg(short, long, global = true, env = "REPORTGEN_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Render a template with a JSON payload
    Render(render::RenderArgs),

    /// List the tags found in a template
    Inspect(inspect::InspectArgs),

    /// Print the effective configuration
    #[command(name = "check-config")]
    CheckConfig(check_config::CheckConfigArgs),
}
