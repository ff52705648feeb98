use anyhow::{Context, Result};
use chrono::Utc;
use tracing::{info, warn};

use crate::config::CatalogTarget;
use crate::extractor::ProductExtractor;
use crate::models::{CategoryOutcome, ProductRecord, RunSummary};
use crate::traits::{PageFetcher, RateSource, SearchIndex};

/// Runs one harvest: rate, pages, extraction, publish
pub struct CatalogSync {
    rates: Box<dyn RateSource>,
    fetcher: Box<dyn PageFetcher>,
    extractor: ProductExtractor,
    index: Box<dyn SearchIndex>,
    targets: Vec<CatalogTarget>,
}

impl CatalogSync {
    pub fn new(
        rates: Box<dyn RateSource>,
        fetcher: Box<dyn PageFetcher>,
        extractor: ProductExtractor,
        index: Box<dyn SearchIndex>,
        targets: Vec<CatalogTarget>,
    ) -> Self {
        Self {
            rates,
            fetcher,
            extractor,
            index,
            targets,
        }
    }

    /// Harvest every target and republish the whole catalog
    ///
    /// Fetch and extraction problems only shrink the catalog; the run fails
    /// only when publishing fails.
    pub async fn run(&self) -> Result<RunSummary> {
        let started_at = Utc::now();

        // One rate for the whole run keeps prices consistent across categories
        let exchange_rate = self.rates.exchange_rate().await;

        let mut products: Vec<ProductRecord> = Vec::new();
        let mut categories = Vec::with_capacity(self.targets.len());

        for target in &self.targets {
            let page = self.fetcher.fetch_page(&target.url).await;

            if page.is_empty() {
                warn!("No content for {} category ({})", target.label, target.url);
                categories.push(CategoryOutcome {
                    label: target.label.clone(),
                    url: target.url.clone(),
                    products: 0,
                    partial: false,
                });
                continue;
            }

            let found = self.extractor.extract_products(&page.html, exchange_rate);
            info!("{} products fetched for {} category", found.len(), target.label);
            if !page.complete {
                warn!("{} category may be missing lazily loaded products", target.label);
            }

            categories.push(CategoryOutcome {
                label: target.label.clone(),
                url: target.url.clone(),
                products: found.len(),
                partial: !page.complete,
            });
            products.extend(found);
        }

        self.index
            .replace_all(&products)
            .await
            .context("Failed to publish products to the search index")?;
        info!("{} products added to the search index", products.len());

        Ok(RunSummary {
            started_at,
            finished_at: Utc::now(),
            exchange_rate,
            categories,
            published: products.len(),
        })
    }
}
