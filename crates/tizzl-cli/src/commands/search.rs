//! Search command

use super::load_pipeline;
use crate::app::{OutputFormat, SearchArgs};
use crate::output::format_search_output;
use anyhow::Result;
use std::future::Future;
use tizzl_core::{Config, StyleRequest};

pub async fn run(args: SearchArgs, config: &Config, format: OutputFormat) -> Result<()> {
    let request = build_request(&args);
    // Reject bad input before the catalog is embedded
    request.validate()?;

    let pipeline = load_pipeline(config, &args.catalog.catalog).await?;
    let cancel = until_signal(tokio::signal::ctrl_c());
    let output = pipeline
        .orchestrator
        .retrieve_products_until(&request, cancel)
        .await?;
    pipeline.log_metrics();

    if output.diagnostics.degraded.any() {
        tracing::warn!(
            "Degraded stages: {}",
            output.diagnostics.degraded.stages().join(", ")
        );
    }

    print!("{}", format_search_output(&output, format));
    Ok(())
}

/// Resolve when the signal arrives; never resolve if it cannot be awaited
async fn until_signal<F>(signal: F)
where
    F: Future<Output = std::io::Result<()>>,
{
    if let Err(e) = signal.await {
        tracing::debug!("Ctrl-C handler unavailable: {}", e);
        std::future::pending::<()>().await;
    }
}

fn build_request(args: &SearchArgs) -> StyleRequest {
    let mut request = StyleRequest::new(args.query.join(" "))
        .with_max_results(args.limit)
        .include_sale_items(!args.no_sale);

    if let Some(budget) = args.budget {
        request = request.with_budget(budget);
    }
    if let Some(ref occasion) = args.occasion {
        request = request.with_occasion(occasion.clone());
    }
    for category in &args.categories {
        request = request.prefer_category(*category);
    }
    for category in &args.excluded {
        request = request.exclude_category(*category);
    }
    for color in &args.colors {
        request = request.prefer_color(color.clone());
    }
    for (category, size) in &args.sizes {
        request = request.with_size(*category, size.clone());
    }
    request
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_signal_resolves_cancel() {
        let cancel = until_signal(async { Ok(()) });
        assert!(tokio::time::timeout(Duration::from_millis(100), cancel)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_failed_signal_handler_never_cancels() {
        let cancel = until_signal(async {
            Err(std::io::Error::new(std::io::ErrorKind::Other, "no handler"))
        });
        assert!(tokio::time::timeout(Duration::from_millis(50), cancel)
            .await
            .is_err());
    }
}
