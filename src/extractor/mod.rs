//! Turns listing markup into product records
//!
//! Every field of a tile is read independently. A tile missing any or all of
//! its attributes still yields a record, with the corresponding fields unset,
//! so partial markup never costs the rest of the page.

use anyhow::Result;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;
use uuid::Uuid;

use crate::models::{
    Brand, IMAGE_SIZE, ProductImage, ProductRecord, ProductVariant, TARGET_CURRENCY,
    VARIANT_KIND,
};
use crate::traits::SiteSelectors;

/// Fixed markup applied on top of the converted source price
pub const PRICE_MARKUP: f64 = 1.2;

/// Separator between segments of `data-itemcategory`
const CATEGORY_SEPARATOR: &str = " - ";

const ATTR_ID: &str = "data-itemid";
const ATTR_PRICE: &str = "data-itemprice";
const ATTR_CATEGORY: &str = "data-itemcategory";
const ATTR_VARIANT: &str = "data-itemvariant";

/// Parses listing pages of one retailer
pub struct ProductExtractor {
    tile: Selector,
    title: Selector,
    image: Selector,
    image_base_url: String,
    brand: Brand,
    gender: String,
}

impl ProductExtractor {
    /// Create an extractor for the given markup layout
    ///
    /// # Arguments
    /// * `selectors` - Tile, title and image selectors
    /// * `image_base_url` - Prefix for site-relative image paths
    /// * `brand_name` - Brand attached to every record
    /// * `gender` - Single gender tag attached to every record
    pub fn new(
        selectors: &SiteSelectors,
        image_base_url: &str,
        brand_name: &str,
        gender: &str,
    ) -> Result<Self> {
        let tile = Selector::parse(&selectors.product_container)
            .map_err(|e| anyhow::anyhow!("Failed to parse product selector: {:?}", e))?;
        let title = Selector::parse(&selectors.title)
            .map_err(|e| anyhow::anyhow!("Failed to parse title selector: {:?}", e))?;
        let image = Selector::parse(&selectors.image)
            .map_err(|e| anyhow::anyhow!("Failed to parse image selector: {:?}", e))?;

        Ok(Self {
            tile,
            title,
            image,
            image_base_url: image_base_url.trim_end_matches('/').to_string(),
            brand: Brand::from_name(brand_name),
            gender: gender.to_string(),
        })
    }

    /// Extract every product tile of a page
    ///
    /// # Arguments
    /// * `markup` - Rendered page HTML
    /// * `exchange_rate` - Multiplier from source currency into the target currency
    ///
    /// # Returns
    /// * `Vec<ProductRecord>` - One record per tile, in document order
    pub fn extract_products(&self, markup: &str, exchange_rate: f64) -> Vec<ProductRecord> {
        let document = Html::parse_document(markup);
        let products: Vec<ProductRecord> = document
            .select(&self.tile)
            .map(|tile| self.extract_tile(tile, exchange_rate))
            .collect();

        debug!("Extracted {} product tiles", products.len());
        products
    }

    fn extract_tile(&self, tile: ElementRef<'_>, exchange_rate: f64) -> ProductRecord {
        let attrs = tile.value();
        // Empty attribute values count as missing
        let attr = |name: &str| attrs.attr(name).filter(|v| !v.is_empty());

        let id = attr(ATTR_ID).map(str::to_string);

        let title = tile.select(&self.title).next().and_then(|el| {
            // An element without any text node has no title at all
            el.text().next()?;
            Some(el.text().collect::<String>().trim().to_string())
        });

        let price = attr(ATTR_PRICE)
            .and_then(parse_price)
            .map(|source| convert_price(source, exchange_rate));

        let category = attr(ATTR_CATEGORY)
            .map(|raw| raw.split(CATEGORY_SEPARATOR).map(str::to_string).collect())
            .unwrap_or_default();

        let images = tile
            .select(&self.image)
            .filter_map(|img| {
                img.value()
                    .attr("src")
                    .or_else(|| img.value().attr("data-src"))
            })
            .enumerate()
            .map(|(order, src)| ProductImage {
                url: self.resolve_image_url(src),
                order,
                size: IMAGE_SIZE.to_string(),
            })
            .collect();

        let variant = attr(ATTR_VARIANT).map(str::to_string);
        let variants = vec![ProductVariant {
            id: variant.clone(),
            size: variant,
            price,
            kind: VARIANT_KIND.to_string(),
        }];

        let object_id = Uuid::new_v4().to_string();

        ProductRecord {
            id,
            title,
            price,
            category,
            currency: TARGET_CURRENCY.to_string(),
            brand: self.brand.clone(),
            gender: vec![self.gender.clone()],
            slug: format!("{}-{}", self.brand.id, object_id),
            images,
            variants,
            object_id,
        }
    }

    fn resolve_image_url(&self, src: &str) -> String {
        if src.starts_with("http") {
            src.to_string()
        } else if src.starts_with("//") {
            format!("https:{src}")
        } else {
            format!("{}{}", self.image_base_url, src)
        }
    }
}

/// Parse a decimal-comma price such as `"1 250,00"` or `"50,00"`
pub fn parse_price(raw: &str) -> Option<f64> {
    let normalized: String = raw
        .trim()
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| if c == ',' { '.' } else { c })
        .collect();

    normalized.parse::<f64>().ok().filter(|p| p.is_finite())
}

/// Source price into the target currency, markup included
pub fn convert_price(source: f64, exchange_rate: f64) -> f64 {
    source * PRICE_MARKUP * exchange_rate
}
