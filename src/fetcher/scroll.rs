//! Forced loading of infinite-scroll listings
//!
//! Listing pages append tiles when the viewport reaches the bottom and show a
//! placeholder element while more content is pending. The page is bounced
//! between bottom and top until the placeholder disappears or reports no text,
//! with a hard ceiling on the number of rounds.

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use tracing::{debug, warn};

/// Page operations needed to drive lazy loading
#[async_trait]
pub trait LazyPage: Send + Sync {
    async fn scroll_to_bottom(&self) -> Result<()>;

    async fn scroll_to_top(&self) -> Result<()>;

    /// True while the placeholder exists and still has text content
    async fn content_pending(&self) -> Result<bool>;
}

/// Timing and bound of the scroll loop
#[derive(Debug, Clone, Copy)]
pub struct ScrollPolicy {
    /// Pause after each scroll so requests triggered by it can land
    pub settle: Duration,
    pub max_iterations: u32,
}

impl Default for ScrollPolicy {
    fn default() -> Self {
        Self {
            settle: Duration::from_secs(1),
            max_iterations: 50,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollOutcome {
    /// Placeholder cleared after this many rounds
    Complete { iterations: u32 },
    /// Ceiling reached with content still pending
    Exhausted { iterations: u32 },
}

impl ScrollOutcome {
    pub fn is_complete(self) -> bool {
        matches!(self, Self::Complete { .. })
    }
}

/// Scroll until the page stops announcing more content
///
/// # Arguments
/// * `page` - The page being loaded
/// * `policy` - Settle interval and iteration ceiling
///
/// # Returns
/// * `Result<ScrollOutcome>` - Whether loading finished, or an error from the page
pub async fn load_all_content<P>(page: &P, policy: ScrollPolicy) -> Result<ScrollOutcome>
where
    P: LazyPage + ?Sized,
{
    let mut iterations = 0;

    while iterations < policy.max_iterations {
        iterations += 1;

        page.scroll_to_bottom().await?;
        tokio::time::sleep(policy.settle).await;

        page.scroll_to_top().await?;
        tokio::time::sleep(policy.settle).await;

        if !page.content_pending().await? {
            debug!("Lazy loading finished after {} rounds", iterations);
            return Ok(ScrollOutcome::Complete { iterations });
        }
    }

    warn!(
        "Placeholder still pending after {} scroll rounds, keeping partial content",
        iterations
    );
    Ok(ScrollOutcome::Exhausted { iterations })
}
