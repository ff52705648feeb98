//! Data models for harvested products and run bookkeeping

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Currency every published price is expressed in
pub const TARGET_CURRENCY: &str = "RUB";

/// Size label attached to every product image
pub const IMAGE_SIZE: &str = "1000";

/// Variant axis exposed by the listing markup
pub const VARIANT_KIND: &str = "Size";

/// A product listing normalized for the search index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub id: Option<String>,
    pub title: Option<String>,
    pub price: Option<f64>,
    pub category: Vec<String>,
    pub currency: String,
    pub brand: Brand,
    pub gender: Vec<String>,
    pub slug: String,
    pub images: Vec<ProductImage>,
    pub variants: Vec<ProductVariant>,
    /// Primary key in the search index, regenerated on every run
    #[serde(rename = "objectID")]
    pub object_id: String,
}

/// Brand descriptor shared by every record of a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Brand {
    pub id: String,
    pub name: String,
    pub description: String,
}

impl Brand {
    /// Build a descriptor whose id is the slugified name
    pub fn from_name(name: &str) -> Self {
        Self {
            id: name.to_lowercase().replace(' ', "-"),
            name: name.to_string(),
            description: name.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductImage {
    pub url: String,
    pub order: usize,
    pub size: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductVariant {
    pub id: Option<String>,
    pub size: Option<String>,
    pub price: Option<f64>,
    #[serde(rename = "type")]
    pub kind: String,
}

/// Rendered markup for one listing page
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchedPage {
    pub html: String,
    pub final_url: Option<String>,
    /// False when lazy loading stopped before the page reported it was done
    pub complete: bool,
}

impl FetchedPage {
    /// The degraded result of a failed fetch
    pub fn empty() -> Self {
        Self {
            html: String::new(),
            final_url: None,
            complete: true,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.html.trim().is_empty()
    }
}

/// Per-category tally reported at the end of a run
#[derive(Debug, Clone, Serialize)]
pub struct CategoryOutcome {
    pub label: String,
    pub url: String,
    pub products: usize,
    pub partial: bool,
}

/// What a pipeline run did
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub exchange_rate: f64,
    pub categories: Vec<CategoryOutcome>,
    pub published: usize,
}
