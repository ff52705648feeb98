//! Harvests a retailer's category listings, prices them in roubles and
//! republishes the whole catalog to an Algolia index.

pub mod catalog_sync;
pub mod config;
pub mod extractor;
pub mod fetcher;
pub mod index;
pub mod models;
pub mod rates;
pub mod traits;

pub use catalog_sync::CatalogSync;
pub use config::Config;
