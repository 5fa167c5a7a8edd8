//! CLI argument definitions

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tizzl_core::Category;

#[derive(Parser)]
#[command(name = "tizzl")]
#[command(author, version, about = "Conversational fashion product search")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file (defaults to <config dir>/tizzl/config.yml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(long, global = true, value_enum, default_value = "cli")]
    pub format: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Find products for a free-text styling request
    Search(SearchArgs),

    /// Find products similar to an existing one
    Similar(SimilarArgs),

    /// Suggest complementary items for a product
    Outfits(OutfitsArgs),

    /// Print the effective configuration
    Config,
}

#[derive(Args)]
pub struct CatalogArgs {
    /// JSON file holding an array of products
    #[arg(long, env = "TIZZL_CATALOG")]
    pub catalog: PathBuf,
}

#[derive(Args)]
pub struct SearchArgs {
    /// Search query
    #[arg(required = true)]
    pub query: Vec<String>,

    #[command(flatten)]
    pub catalog: CatalogArgs,

    /// Maximum price per item
    #[arg(long)]
    pub budget: Option<f64>,

    /// Only return these categories
    #[arg(long = "category")]
    pub categories: Vec<Category>,

    /// Never return these categories
    #[arg(long = "exclude")]
    pub excluded: Vec<Category>,

    /// Items must carry at least one of these colors
    #[arg(long = "color")]
    pub colors: Vec<String>,

    /// Occasion tag, e.g. wedding or work
    #[arg(long)]
    pub occasion: Option<String>,

    /// Required size per category, as category=size
    #[arg(long = "size", value_parser = parse_size)]
    pub sizes: Vec<(Category, String)>,

    /// Leave out discounted items
    #[arg(long)]
    pub no_sale: bool,

    /// Number of results
    #[arg(short = 'n', default_value = "20")]
    pub limit: usize,
}

#[derive(Args)]
pub struct SimilarArgs {
    /// Product to start from
    pub product_id: String,

    #[command(flatten)]
    pub catalog: CatalogArgs,

    /// Number of results
    #[arg(short = 'n', default_value = "5")]
    pub limit: usize,
}

#[derive(Args)]
pub struct OutfitsArgs {
    /// Anchor product
    pub product_id: String,

    #[command(flatten)]
    pub catalog: CatalogArgs,

    /// Occasion to dress for
    #[arg(long)]
    pub occasion: Option<String>,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    Cli,
    Json,
}

fn parse_size(s: &str) -> Result<(Category, String), String> {
    let (category, size) = s
        .split_once('=')
        .ok_or_else(|| format!("expected category=size, got '{}'", s))?;
    let size = size.trim();
    if size.is_empty() {
        return Err(format!("missing size in '{}'", s));
    }
    Ok((category.trim().parse()?, size.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_size() {
        assert_eq!(
            parse_size("shoes=38").unwrap(),
            (Category::Shoes, "38".to_string())
        );
        assert!(parse_size("shoes").is_err());
        assert!(parse_size("shoes=").is_err());
        assert!(parse_size("hats=m").is_err());
    }

    #[test]
    fn test_cli_parses_search() {
        let cli = Cli::try_parse_from([
            "tizzl",
            "--format",
            "json",
            "search",
            "going",
            "out",
            "--catalog",
            "p.json",
            "--category",
            "tops",
            "--size",
            "tops=M",
            "--no-sale",
            "-n",
            "5",
        ])
        .unwrap();

        match cli.command {
            Commands::Search(args) => {
                assert_eq!(args.query, vec!["going", "out"]);
                assert_eq!(args.categories, vec![Category::Tops]);
                assert_eq!(args.sizes, vec![(Category::Tops, "M".to_string())]);
                assert!(args.no_sale);
                assert_eq!(args.limit, 5);
            }
            _ => panic!("expected search"),
        }
    }
}
