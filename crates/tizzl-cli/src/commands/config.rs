//! Config command

use crate::app::OutputFormat;
use anyhow::Result;
use tizzl_core::Config;

pub fn run(config: &Config, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(config)?),
        OutputFormat::Cli => {
            println!("# {}", Config::default_path().display());
            print!("{}", serde_yaml::to_string(config)?);
        }
    }
    Ok(())
}
