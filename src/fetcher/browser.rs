//! Headless Chrome fetcher for client-rendered, infinite-scroll listings.
//!
//! Each call launches its own browser and tears it down before returning, so
//! a wedged page can never leak into the next category.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::network::SetUserAgentOverrideParams;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::consent::{ConsentOutcome, ConsentPage, dismiss_consent};
use super::scroll::{LazyPage, ScrollPolicy, load_all_content};
use super::session::{RenderSession, render_and_release};
use crate::config::BrowserSettings;
use crate::models::FetchedPage;
use crate::traits::{PageFetcher, SiteSelectors};

/// Interval between DOM lookups while waiting on the page
const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Upper bound on waiting for `document.readyState`
const READY_TIMEOUT: Duration = Duration::from_secs(30);

pub struct BrowserFetcher {
    settings: BrowserSettings,
    selectors: SiteSelectors,
}

impl BrowserFetcher {
    pub fn new(settings: BrowserSettings, selectors: SiteSelectors) -> Self {
        Self {
            settings,
            selectors,
        }
    }

    fn scroll_policy(&self) -> ScrollPolicy {
        ScrollPolicy {
            settle: self.settings.scroll_settle,
            max_iterations: self.settings.scroll_max_iterations,
        }
    }

    /// Launch a browser and spawn its CDP event loop
    async fn launch(&self) -> Result<(Browser, JoinHandle<()>)> {
        info!("Launching browser (headless={})", self.settings.headless);

        let mut builder = BrowserConfig::builder();
        if let Some(ref path) = self.settings.chrome_executable {
            builder = builder.chrome_executable(path);
        }
        if !self.settings.headless {
            builder = builder.with_head();
        }

        let config = builder
            .arg("--no-sandbox")
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-setuid-sandbox")
            .arg("--disable-software-rasterizer")
            .arg("--disable-extensions")
            .arg("--disable-background-networking")
            .arg("--disable-default-apps")
            .arg("--disable-sync")
            .arg("--metrics-recording-only")
            .arg("--mute-audio")
            .arg("--no-first-run")
            .arg("--safebrowsing-disable-auto-update")
            .arg("--disable-infobars")
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build browser config: {}", e))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .context("Failed to launch browser")?;

        let events = tokio::spawn(async move {
            while let Some(h) = handler.next().await {
                if h.is_err() {
                    break;
                }
            }
        });

        Ok((browser, events))
    }

    /// Launch, render under the per-fetch timeout, and always release
    async fn fetch_inner(&self, url: &str) -> Result<FetchedPage> {
        let (browser, events) = self.launch().await?;
        let mut session = ChromeSession {
            fetcher: self,
            browser,
            events,
        };

        render_and_release(&mut session, url, self.settings.fetch_timeout).await
    }

    async fn render(&self, browser: &Browser, url: &str) -> Result<FetchedPage> {
        let page = browser.new_page("about:blank").await?;

        let result = self.render_page(&page, url).await;
        if let Err(e) = page.close().await {
            debug!("Page close failed: {}", e);
        }
        result
    }

    async fn render_page(&self, page: &Page, url: &str) -> Result<FetchedPage> {
        page.execute(SetUserAgentOverrideParams::new(self.user_agent().to_string()))
            .await?;

        info!("Navigating to {}", url);
        page.goto(url)
            .await
            .with_context(|| format!("Navigation failed for {url}"))?;
        wait_for_page_ready(page).await;

        let cdp = CdpPage {
            page,
            consent_button: &self.selectors.consent_button,
            placeholder: &self.selectors.scroll_placeholder,
        };

        if dismiss_consent(&cdp, self.settings.consent_timeout, POLL_INTERVAL).await
            == ConsentOutcome::Accepted
        {
            tokio::time::sleep(self.settings.scroll_settle).await;
        }

        let outcome = load_all_content(&cdp, self.scroll_policy()).await?;

        let final_url = page
            .url()
            .await?
            .map(|u| u.to_string())
            .unwrap_or_else(|| url.to_string());
        let html = page.content().await?;

        info!("Rendered {} ({} bytes)", final_url, html.len());
        Ok(FetchedPage {
            html,
            final_url: Some(final_url),
            complete: outcome.is_complete(),
        })
    }
}

/// Poll `document.readyState` until the DOM is usable
async fn wait_for_page_ready(page: &Page) {
    let ready = tokio::time::timeout(READY_TIMEOUT, async {
        loop {
            if let Ok(result) = page.evaluate("document.readyState".to_string()).await
                && let Ok(state) = result.into_value::<String>()
                && state == "complete"
            {
                return;
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    })
    .await;

    if ready.is_err() {
        warn!("Timeout waiting for page ready state");
    }
}

/// Browser owned by one fetch
struct ChromeSession<'a> {
    fetcher: &'a BrowserFetcher,
    browser: Browser,
    events: JoinHandle<()>,
}

#[async_trait]
impl RenderSession for ChromeSession<'_> {
    async fn render(&self, url: &str) -> Result<FetchedPage> {
        self.fetcher.render(&self.browser, url).await
    }

    async fn release(&mut self) {
        if let Err(e) = self.browser.close().await {
            debug!("Browser close failed: {}", e);
        }
        if let Err(e) = self.browser.wait().await {
            debug!("Browser process wait failed: {}", e);
        }
        self.events.abort();
    }
}

/// Chrome page driven by the consent and scroll steps
struct CdpPage<'a> {
    page: &'a Page,
    consent_button: &'a str,
    placeholder: &'a str,
}

#[async_trait]
impl ConsentPage for CdpPage<'_> {
    async fn consent_visible(&self) -> bool {
        self.page.find_element(self.consent_button).await.is_ok()
    }

    async fn accept_consent(&self) -> Result<()> {
        self.page
            .find_element(self.consent_button)
            .await?
            .click()
            .await?;
        Ok(())
    }
}

#[async_trait]
impl LazyPage for CdpPage<'_> {
    async fn scroll_to_bottom(&self) -> Result<()> {
        self.page
            .evaluate("window.scrollTo(0, document.body.scrollHeight)".to_string())
            .await?;
        Ok(())
    }

    async fn scroll_to_top(&self) -> Result<()> {
        self.page.evaluate("window.scrollTo(0, 0)".to_string()).await?;
        Ok(())
    }

    async fn content_pending(&self) -> Result<bool> {
        let selector = serde_json::to_string(self.placeholder)?;
        let script = format!(
            "!!document.querySelector({selector}) && \
             document.querySelector({selector}).textContent.trim() !== ''"
        );
        let pending = self.page.evaluate(script).await?.into_value::<bool>()?;
        Ok(pending)
    }
}

#[async_trait]
impl PageFetcher for BrowserFetcher {
    async fn fetch_page(&self, url: &str) -> FetchedPage {
        match self.fetch_inner(url).await {
            Ok(page) => page,
            Err(e) => {
                error!("An error occurred while rendering {}: {:#}", url, e);
                FetchedPage::empty()
            }
        }
    }
}
