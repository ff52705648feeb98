//! Run configuration, read once from the process environment at startup

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value {value:?} for {key}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// How listing pages are retrieved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchMode {
    /// Headless Chrome with consent dismissal and forced lazy loading
    #[default]
    Browser,
    /// Single GET, for pages rendered server side
    Http,
}

/// How the index contents are replaced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PublishMode {
    /// Clear the live index, then write the batch
    #[default]
    Replace,
    /// Fill a staging index and move it over the live one
    Staging,
}

/// One listing page to harvest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogTarget {
    pub label: String,
    pub url: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub rates_url: String,
    pub site: SiteConfig,
    pub browser: BrowserSettings,
    pub index: IndexConfig,
}

#[derive(Debug, Clone)]
pub struct SiteConfig {
    pub targets: Vec<CatalogTarget>,
    pub fetch_mode: FetchMode,
    pub image_base_url: String,
    pub brand_name: String,
    pub gender: String,
}

#[derive(Debug, Clone)]
pub struct BrowserSettings {
    pub headless: bool,
    pub chrome_executable: Option<PathBuf>,
    pub consent_timeout: Duration,
    pub scroll_settle: Duration,
    pub scroll_max_iterations: u32,
    pub fetch_timeout: Duration,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            headless: true,
            chrome_executable: None,
            consent_timeout: Duration::from_secs(5),
            scroll_settle: Duration::from_millis(1000),
            scroll_max_iterations: 50,
            fetch_timeout: Duration::from_secs(180),
        }
    }
}

#[derive(Debug, Clone)]
pub struct IndexConfig {
    pub app_id: String,
    pub api_key: String,
    pub index_name: String,
    /// Base URL of the index API, `https://{app_id}.algolia.net` by default
    pub host: String,
    pub publish_mode: PublishMode,
}

const DEFAULT_IMAGE_BASE_URL: &str = "https://www.rimowa.com";
const DEFAULT_BRAND: &str = "Rimowa";
const DEFAULT_GENDER: &str = "unisex";

impl Config {
    /// Load the configuration from environment variables
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load the configuration through an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let require = |key: &'static str| get(key).ok_or(ConfigError::Missing(key));

        let targets = match get("SCRAPER_TARGET_URL") {
            Some(url) => vec![CatalogTarget {
                label: "target".to_string(),
                url: url.trim().to_string(),
            }],
            None => {
                let base_url = require("SCRAPER_BASE_URL")?;
                let categories = require("CATEGORIES")?;
                category_targets(&base_url, &categories)
            }
        };

        if targets.is_empty() {
            return Err(ConfigError::Invalid {
                key: "CATEGORIES",
                value: get("CATEGORIES").unwrap_or_default(),
                reason: "no category names".to_string(),
            });
        }

        let fetch_mode = match get("FETCH_MODE").as_deref().map(str::trim) {
            None | Some("browser") => FetchMode::Browser,
            Some("http") => FetchMode::Http,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    key: "FETCH_MODE",
                    value: other.to_string(),
                    reason: "expected `browser` or `http`".to_string(),
                });
            }
        };

        let publish_mode = match get("ALGOLIA_PUBLISH_MODE").as_deref().map(str::trim) {
            None | Some("replace") => PublishMode::Replace,
            Some("staging") => PublishMode::Staging,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    key: "ALGOLIA_PUBLISH_MODE",
                    value: other.to_string(),
                    reason: "expected `replace` or `staging`".to_string(),
                });
            }
        };

        let defaults = BrowserSettings::default();
        let browser = BrowserSettings {
            headless: parse_or("BROWSER_HEADLESS", get("BROWSER_HEADLESS"), defaults.headless)?,
            chrome_executable: get("CHROME_EXECUTABLE").map(PathBuf::from),
            consent_timeout: Duration::from_secs(parse_or(
                "CONSENT_TIMEOUT_SECS",
                get("CONSENT_TIMEOUT_SECS"),
                defaults.consent_timeout.as_secs(),
            )?),
            scroll_settle: Duration::from_millis(parse_or(
                "SCROLL_SETTLE_MS",
                get("SCROLL_SETTLE_MS"),
                1000,
            )?),
            scroll_max_iterations: parse_or(
                "SCROLL_MAX_ITERATIONS",
                get("SCROLL_MAX_ITERATIONS"),
                defaults.scroll_max_iterations,
            )?,
            fetch_timeout: Duration::from_secs(parse_or(
                "FETCH_TIMEOUT_SECS",
                get("FETCH_TIMEOUT_SECS"),
                defaults.fetch_timeout.as_secs(),
            )?),
        };

        if browser.scroll_max_iterations == 0 {
            return Err(ConfigError::Invalid {
                key: "SCROLL_MAX_ITERATIONS",
                value: "0".to_string(),
                reason: "at least one scroll round is needed".to_string(),
            });
        }

        let app_id = require("ALGOLIA_APP_ID")?;
        let host = get("ALGOLIA_HOST")
            .map(|h| h.trim_end_matches('/').to_string())
            .unwrap_or_else(|| format!("https://{app_id}.algolia.net"));

        Ok(Self {
            rates_url: require("RUB_URL")?,
            site: SiteConfig {
                targets,
                fetch_mode,
                image_base_url: get("IMAGE_BASE_URL")
                    .map(|u| u.trim_end_matches('/').to_string())
                    .unwrap_or_else(|| DEFAULT_IMAGE_BASE_URL.to_string()),
                brand_name: get("BRAND_NAME").unwrap_or_else(|| DEFAULT_BRAND.to_string()),
                gender: get("GENDER").unwrap_or_else(|| DEFAULT_GENDER.to_string()),
            },
            browser,
            index: IndexConfig {
                app_id,
                api_key: require("ALGOLIA_API_KEY")?,
                index_name: require("ALGOLIA_INDEX_NAME")?,
                host,
                publish_mode,
            },
        })
    }
}

/// Build the listing URL for a category name
///
/// # Arguments
/// * `base_url` - Site root, with or without a trailing slash
/// * `category` - Category name as it appears in the path
pub fn build_category_url(base_url: &str, category: &str) -> String {
    let encoded = urlencoding::encode(category);
    format!("{}/all-{}", base_url.trim_end_matches('/'), encoded)
}

/// Turn a comma separated category list into targets, skipping blanks
fn category_targets(base_url: &str, categories: &str) -> Vec<CatalogTarget> {
    categories
        .split(',')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(|category| CatalogTarget {
            label: category.to_string(),
            url: build_category_url(base_url, category),
        })
        .collect()
}

fn parse_or<T>(key: &'static str, raw: Option<String>, default: T) -> ConfigResult<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        None => Ok(default),
        Some(value) => match value.trim().parse::<T>() {
            Ok(parsed) => Ok(parsed),
            Err(e) => Err(ConfigError::Invalid {
                key,
                reason: e.to_string(),
                value,
            }),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    const BASE: &[(&str, &str)] = &[
        ("RUB_URL", "https://rates.example/latest"),
        ("SCRAPER_BASE_URL", "https://shop.example/en/"),
        ("CATEGORIES", "luggage, bags,,accessories"),
        ("ALGOLIA_APP_ID", "APP"),
        ("ALGOLIA_API_KEY", "secret"),
        ("ALGOLIA_INDEX_NAME", "products"),
    ];

    #[test]
    fn builds_category_targets_in_order() {
        let config = Config::from_lookup(lookup(BASE)).unwrap();
        let urls: Vec<_> = config.site.targets.iter().map(|t| t.url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://shop.example/en/all-luggage",
                "https://shop.example/en/all-bags",
                "https://shop.example/en/all-accessories",
            ]
        );
        assert_eq!(config.site.targets[1].label, "bags");
    }

    #[test]
    fn applies_defaults() {
        let config = Config::from_lookup(lookup(BASE)).unwrap();
        assert_eq!(config.site.fetch_mode, FetchMode::Browser);
        assert_eq!(config.index.publish_mode, PublishMode::Replace);
        assert_eq!(config.index.host, "https://APP.algolia.net");
        assert_eq!(config.site.image_base_url, "https://www.rimowa.com");
        assert_eq!(config.site.brand_name, "Rimowa");
        assert_eq!(config.browser.scroll_max_iterations, 50);
        assert_eq!(config.browser.consent_timeout, Duration::from_secs(5));
    }

    #[test]
    fn single_target_url_replaces_categories() {
        let mut pairs = BASE.to_vec();
        pairs.retain(|(k, _)| *k != "CATEGORIES" && *k != "SCRAPER_BASE_URL");
        pairs.push(("SCRAPER_TARGET_URL", "https://shop.example/en/all-luggage"));

        let config = Config::from_lookup(lookup(&pairs)).unwrap();
        assert_eq!(
            config.site.targets,
            vec![CatalogTarget {
                label: "target".to_string(),
                url: "https://shop.example/en/all-luggage".to_string(),
            }]
        );
    }

    #[test]
    fn missing_credentials_are_reported() {
        let mut pairs = BASE.to_vec();
        pairs.retain(|(k, _)| *k != "ALGOLIA_API_KEY");

        let err = Config::from_lookup(lookup(&pairs)).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("ALGOLIA_API_KEY")));
    }

    #[test]
    fn rejects_unknown_fetch_mode() {
        let mut pairs = BASE.to_vec();
        pairs.push(("FETCH_MODE", "carrier-pigeon"));

        let err = Config::from_lookup(lookup(&pairs)).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "FETCH_MODE", .. }));
    }

    #[test]
    fn rejects_non_numeric_limits() {
        let mut pairs = BASE.to_vec();
        pairs.push(("SCROLL_MAX_ITERATIONS", "lots"));

        let err = Config::from_lookup(lookup(&pairs)).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                key: "SCROLL_MAX_ITERATIONS",
                ..
            }
        ));
    }

    #[test]
    fn zero_scroll_rounds_are_rejected() {
        let mut pairs = BASE.to_vec();
        pairs.push(("SCROLL_MAX_ITERATIONS", "0"));

        let err = Config::from_lookup(lookup(&pairs)).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                key: "SCROLL_MAX_ITERATIONS",
                ..
            }
        ));
    }

    #[test]
    fn blank_category_list_is_invalid() {
        let mut pairs = BASE.to_vec();
        pairs.retain(|(k, _)| *k != "CATEGORIES");
        pairs.push(("CATEGORIES", " , ,"));

        let err = Config::from_lookup(lookup(&pairs)).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "CATEGORIES", .. }));
    }

    #[test]
    fn category_names_are_percent_encoded() {
        assert_eq!(
            build_category_url("https://shop.example", "carry on"),
            "https://shop.example/all-carry%20on"
        );
    }
}
