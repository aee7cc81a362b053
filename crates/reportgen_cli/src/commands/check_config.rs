//! Check-config command - Print the effective configuration.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use reportgen_convert::{DocumentConverter, SofficeConverter};

use crate::config::ReportgenConfig;

#[derive(Args)]
pub struct CheckConfigArgs {
    /// Also check that the converter can be started
    #[arg(long)]
    probe: bool,
}

pub async fn execute(args: CheckConfigArgs, config_path: Option<PathBuf>) -> Result<()> {
    let config = ReportgenConfig::load(config_path.as_deref())?;
    config.validate()?;

    match &config_path {
        Some(path) => println!("# Loaded from {}", path.display()),
        None => println!("# Built-in defaults"),
    }
    print!("{}", config.to_yaml()?);

    if args.probe {
        let converter = SofficeConverter::new(config.convert.clone());
        if converter.is_available().await {
            println!("✅ Converter '{}' is available", config.convert.soffice_binary);
        } else {
            anyhow::bail!(reportgen_convert::ConversionError::NotAvailable(
                config.convert.soffice_binary.clone()
            ));
        }
    }

    Ok(())
}
