use std::time::Duration;

use anyhow::Result;
use reqwest::Client;
use tracing::{error, info};

use catalog_mirror::config::FetchMode;
use catalog_mirror::extractor::ProductExtractor;
use catalog_mirror::fetcher::{BrowserFetcher, HttpFetcher};
use catalog_mirror::index::AlgoliaIndex;
use catalog_mirror::rates::ExchangeRateClient;
use catalog_mirror::traits::{PageFetcher, SiteSelectors};
use catalog_mirror::{CatalogSync, Config};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let config = Config::from_env()?;
    info!(
        "Starting catalog sync for {} target(s) into index {}",
        config.site.targets.len(),
        config.index.index_name
    );

    let client = Client::builder().timeout(Duration::from_secs(60)).build()?;
    let selectors = SiteSelectors::default();

    let fetcher: Box<dyn PageFetcher> = match config.site.fetch_mode {
        FetchMode::Browser => Box::new(BrowserFetcher::new(
            config.browser.clone(),
            selectors.clone(),
        )),
        FetchMode::Http => Box::new(HttpFetcher::new(client.clone())),
    };

    let extractor = ProductExtractor::new(
        &selectors,
        &config.site.image_base_url,
        &config.site.brand_name,
        &config.site.gender,
    )?;

    let sync = CatalogSync::new(
        Box::new(ExchangeRateClient::new(client.clone(), config.rates_url.clone())),
        fetcher,
        extractor,
        Box::new(AlgoliaIndex::new(client, &config.index)),
        config.site.targets.clone(),
    );

    match sync.run().await {
        Ok(summary) => {
            for category in &summary.categories {
                info!(
                    "{}: {} products{}",
                    category.label,
                    category.products,
                    if category.partial { " (partial)" } else { "" }
                );
            }
            info!(
                "Products added to search index: {} in {}s",
                summary.published,
                (summary.finished_at - summary.started_at).num_seconds()
            );
            Ok(())
        }
        Err(e) => {
            error!("Catalog sync failed: {:#}", e);
            Err(e)
        }
    }
}
