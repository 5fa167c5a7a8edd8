//! Outfit pairing command

use super::load_pipeline;
use crate::app::{OutfitsArgs, OutputFormat};
use crate::output::format_outfits;
use anyhow::Result;
use tizzl_core::Config;

pub async fn run(args: OutfitsArgs, config: &Config, format: OutputFormat) -> Result<()> {
    let pipeline = load_pipeline(config, &args.catalog.catalog).await?;
    let outfits = pipeline
        .orchestrator
        .outfit_planner()
        .outfits_for_id(&args.product_id, args.occasion.as_deref())
        .await?;

    pipeline.log_metrics();
    print!("{}", format_outfits(&outfits, format));
    Ok(())
}
