//! Cookie consent dismissal
//!
//! The consent banner is locale and session dependent, so its absence is a
//! normal outcome. The accept control is polled for a bounded time and
//! clicked when it shows up; nothing here fails the fetch.

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use tracing::{debug, warn};

/// Page operations needed to accept a consent banner
#[async_trait]
pub trait ConsentPage: Send + Sync {
    /// True once the accept control is in the DOM
    async fn consent_visible(&self) -> bool;

    async fn accept_consent(&self) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsentOutcome {
    Accepted,
    /// No accept control within the timeout
    Absent,
    /// Control found, click rejected
    ClickFailed,
}

/// Wait up to `timeout` for the accept control and click it
///
/// # Arguments
/// * `page` - The page showing the banner
/// * `timeout` - How long the control may take to appear
/// * `poll` - Interval between lookups
pub async fn dismiss_consent<P>(page: &P, timeout: Duration, poll: Duration) -> ConsentOutcome
where
    P: ConsentPage + ?Sized,
{
    let found = tokio::time::timeout(timeout, async {
        while !page.consent_visible().await {
            tokio::time::sleep(poll).await;
        }
    })
    .await;

    if found.is_err() {
        debug!("No consent dialog within {:?}", timeout);
        return ConsentOutcome::Absent;
    }

    match page.accept_consent().await {
        Ok(()) => {
            debug!("Accepted cookie consent");
            ConsentOutcome::Accepted
        }
        Err(e) => {
            warn!("Consent button found but click failed: {:#}", e);
            ConsentOutcome::ClickFailed
        }
    }
}
