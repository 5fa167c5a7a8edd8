//! Similar-products command

use super::load_pipeline;
use crate::app::{OutputFormat, SimilarArgs};
use crate::output::format_products;
use anyhow::Result;
use tizzl_core::Config;

pub async fn run(args: SimilarArgs, config: &Config, format: OutputFormat) -> Result<()> {
    let pipeline = load_pipeline(config, &args.catalog.catalog).await?;
    let similar = pipeline
        .orchestrator
        .outfit_planner()
        .find_similar(&args.product_id, args.limit)
        .await?;

    pipeline.log_metrics();
    print!("{}", format_products(&similar, format));
    Ok(())
}
