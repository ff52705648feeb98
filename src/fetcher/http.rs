use anyhow::Result;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::{error, info, warn};

use crate::models::FetchedPage;
use crate::traits::PageFetcher;

/// Fetches listing pages with a single GET, for sites rendered server side
#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    async fn fetch_inner(&self, url: &str) -> Result<FetchedPage> {
        let response = self
            .client
            .get(url)
            .header(reqwest::header::USER_AGENT, self.user_agent())
            .send()
            .await?;

        if response.status() != StatusCode::OK {
            warn!("Failed to fetch {}: status {}", url, response.status());
            return Ok(FetchedPage::empty());
        }

        let final_url = response.url().to_string();
        let html = response.text().await?;

        info!("Fetched {} ({} bytes)", final_url, html.len());
        Ok(FetchedPage {
            html,
            final_url: Some(final_url),
            complete: true,
        })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch_page(&self, url: &str) -> FetchedPage {
        match self.fetch_inner(url).await {
            Ok(page) => page,
            Err(e) => {
                error!("Error fetching {}: {:#}", url, e);
                FetchedPage::empty()
            }
        }
    }
}
