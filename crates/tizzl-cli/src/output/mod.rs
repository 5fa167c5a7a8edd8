//! Output formatters

pub mod json;
pub mod terminal;

use crate::app::OutputFormat;
use tizzl_core::{OutfitPair, RankedProduct, RetrievalOutput};

/// Format a search result with its diagnostics
pub fn format_search_output(output: &RetrievalOutput, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => json::format_search_output(output),
        OutputFormat::Cli => terminal::format_search_output(output),
    }
}

/// Format a ranked product list
pub fn format_products(products: &[RankedProduct], format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => json::format_products(products),
        OutputFormat::Cli => terminal::format_products(products),
    }
}

/// Format outfit pairs
pub fn format_outfits(outfits: &[OutfitPair], format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => json::format_outfits(outfits),
        OutputFormat::Cli => terminal::format_outfits(outfits),
    }
}
