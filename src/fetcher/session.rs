//! Render-then-release sequencing for one browser session

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::FetchedPage;

/// A browser session that renders one page and is then torn down
#[async_trait]
pub trait RenderSession: Send + Sync {
    async fn render(&self, url: &str) -> Result<FetchedPage>;

    /// Close the browser and its event loop. Must not fail.
    async fn release(&mut self);
}

/// Render `url` under `timeout`, releasing the session whatever the result
pub async fn render_and_release<S>(session: &mut S, url: &str, timeout: Duration) -> Result<FetchedPage>
where
    S: RenderSession + ?Sized,
{
    let result = match tokio::time::timeout(timeout, session.render(url)).await {
        Ok(result) => result,
        Err(_) => Err(anyhow::anyhow!(
            "Fetch timed out after {}s for {}",
            timeout.as_secs_f32(),
            url
        )),
    };

    session.release().await;
    result
}
