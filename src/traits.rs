//! Seams between the pipeline stages

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{FetchedPage, ProductRecord};

/// CSS selectors describing the retailer's listing markup
#[derive(Debug, Clone)]
pub struct SiteSelectors {
    /// Container selector for individual product tiles
    pub product_container: String,
    /// Title selector within a tile
    pub title: String,
    /// Image selector within a tile
    pub image: String,
    /// Cookie consent accept button
    pub consent_button: String,
    /// Element present while more content is being loaded on scroll
    pub scroll_placeholder: String,
}

impl Default for SiteSelectors {
    fn default() -> Self {
        Self {
            product_container: ".grid-tile".to_string(),
            title: ".product-name".to_string(),
            image: "img".to_string(),
            consent_button: "#onetrust-accept-btn-handler".to_string(),
            scroll_placeholder: ".infinite-scroll-placeholder".to_string(),
        }
    }
}

/// Source of the conversion rate into the target currency
#[async_trait]
pub trait RateSource: Send + Sync {
    /// Current rate, or `0.0` when the source is unavailable
    async fn exchange_rate(&self) -> f64;
}

/// Retrieves the rendered markup of a listing page
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch one page. Failures degrade to [`FetchedPage::empty`].
    async fn fetch_page(&self, url: &str) -> FetchedPage;

    /// Get the user agent string for outgoing requests
    fn user_agent(&self) -> &'static str {
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
    }
}

/// Search index receiving the full catalog
#[async_trait]
pub trait SearchIndex: Send + Sync {
    /// Replace every entry of the index with `products`
    ///
    /// # Returns
    /// * `Result<()>` - Error if any remote step failed
    async fn replace_all(&self, products: &[ProductRecord]) -> Result<()>;
}
