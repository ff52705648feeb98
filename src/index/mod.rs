//! # Algolia index publisher
//!
//! Replaces the full contents of one Algolia index with a freshly harvested
//! catalog, through the REST API:
//!
//! - `POST /1/indexes/{index}/clear` removes every record
//! - `POST /1/indexes/{index}/batch` writes records, in chunks of
//!   [`BATCH_SIZE`]
//! - `GET /1/indexes/{index}/task/{taskID}` reports when a write is live
//!
//! Every write is waited on before the next one starts.
//!
//! ## Publish modes
//!
//! - **Replace**: clear the live index, then write. A failure between the two
//!   steps leaves the index empty until the next run.
//! - **Staging**: clear and fill `{index}_staging`, then move it over the live
//!   index with `POST /1/indexes/{index}_staging/operation`. The live index
//!   is swapped in one step and never observed empty.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};

use crate::config::{IndexConfig, PublishMode};
use crate::models::ProductRecord;
use crate::traits::SearchIndex;

/// Records per batch request
pub const BATCH_SIZE: usize = 1000;

/// Suffix of the index filled before a staging swap
const STAGING_SUFFIX: &str = "_staging";

/// Response of any asynchronous write
#[derive(Debug, Deserialize)]
struct TaskResponse {
    #[serde(rename = "taskID")]
    task_id: u64,
}

#[derive(Debug, Deserialize)]
struct TaskStatus {
    status: String,
}

#[derive(Serialize)]
struct BatchRequest<'a> {
    requests: Vec<BatchOperation<'a>>,
}

#[derive(Serialize)]
struct BatchOperation<'a> {
    action: &'static str,
    body: &'a ProductRecord,
}

/// How long and how often to poll a pending task
#[derive(Debug, Clone, Copy)]
pub struct TaskWait {
    pub interval: Duration,
    pub max_polls: u32,
}

impl Default for TaskWait {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(500),
            max_polls: 600,
        }
    }
}

/// Client for a single Algolia index
pub struct AlgoliaIndex {
    client: Client,
    host: String,
    app_id: String,
    api_key: String,
    index_name: String,
    mode: PublishMode,
    wait: TaskWait,
}

impl AlgoliaIndex {
    pub fn new(client: Client, config: &IndexConfig) -> Self {
        Self {
            client,
            host: config.host.trim_end_matches('/').to_string(),
            app_id: config.app_id.clone(),
            api_key: config.api_key.clone(),
            index_name: config.index_name.clone(),
            mode: config.publish_mode,
            wait: TaskWait::default(),
        }
    }

    /// Override task polling, mostly to keep tests fast
    pub fn with_task_wait(mut self, wait: TaskWait) -> Self {
        self.wait = wait;
        self
    }

    fn url(&self, index: &str, path: &str) -> String {
        format!(
            "{}/1/indexes/{}{}",
            self.host,
            urlencoding::encode(index),
            path
        )
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("X-Algolia-Application-Id", &self.app_id)
            .header("X-Algolia-API-Key", &self.api_key)
    }

    async fn send_task(&self, request: RequestBuilder, what: &str) -> Result<u64> {
        let response = self.authorized(request).send().await?;
        let response = ensure_success(response, what).await?;
        let task: TaskResponse = response
            .json()
            .await
            .with_context(|| format!("{what}: unexpected response body"))?;
        Ok(task.task_id)
    }

    /// Remove every record of `index`
    pub async fn clear_objects(&self, index: &str) -> Result<u64> {
        self.send_task(
            self.client.post(self.url(index, "/clear")),
            &format!("clear {index}"),
        )
        .await
    }

    /// Write `products` to `index`, returning one task per chunk
    pub async fn save_objects(&self, index: &str, products: &[ProductRecord]) -> Result<Vec<u64>> {
        let mut tasks = Vec::new();

        for chunk in products.chunks(BATCH_SIZE) {
            let batch = BatchRequest {
                requests: chunk
                    .iter()
                    .map(|body| BatchOperation {
                        action: "updateObject",
                        body,
                    })
                    .collect(),
            };

            let task = self
                .send_task(
                    self.client.post(self.url(index, "/batch")).json(&batch),
                    &format!("batch write to {index}"),
                )
                .await?;
            debug!("Queued {} records to {} as task {}", chunk.len(), index, task);
            tasks.push(task);
        }

        Ok(tasks)
    }

    /// Move `source` over `destination`, replacing it
    pub async fn move_index(&self, source: &str, destination: &str) -> Result<u64> {
        self.send_task(
            self.client
                .post(self.url(source, "/operation"))
                .json(&json!({ "operation": "move", "destination": destination })),
            &format!("move {source} to {destination}"),
        )
        .await
    }

    /// Block until `task_id` on `index` is published
    pub async fn wait_task(&self, index: &str, task_id: u64) -> Result<()> {
        let url = self.url(index, &format!("/task/{task_id}"));

        for _ in 0..self.wait.max_polls {
            let response = self.authorized(self.client.get(&url)).send().await?;
            let response = ensure_success(response, &format!("task {task_id} status")).await?;
            let status: TaskStatus = response.json().await?;

            if status.status == "published" {
                return Ok(());
            }
            tokio::time::sleep(self.wait.interval).await;
        }

        Err(anyhow::anyhow!(
            "Task {} on {} not published after {} polls",
            task_id,
            index,
            self.wait.max_polls
        ))
    }

    /// Clear `index` and write `products` into it, waiting on each step
    async fn clear_and_fill(&self, index: &str, products: &[ProductRecord]) -> Result<()> {
        let task = self.clear_objects(index).await?;
        self.wait_task(index, task).await?;
        info!("Cleared index {}", index);

        for task in self.save_objects(index, products).await? {
            self.wait_task(index, task).await?;
        }
        info!("Wrote {} records to {}", products.len(), index);
        Ok(())
    }
}

/// Turn an error status into an error carrying the response body
async fn ensure_success(response: Response, what: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(anyhow::anyhow!("{} failed with status {}: {}", what, status, body))
}

#[async_trait]
impl SearchIndex for AlgoliaIndex {
    async fn replace_all(&self, products: &[ProductRecord]) -> Result<()> {
        match self.mode {
            PublishMode::Replace => self.clear_and_fill(&self.index_name, products).await,
            PublishMode::Staging => {
                let staging = format!("{}{}", self.index_name, STAGING_SUFFIX);
                self.clear_and_fill(&staging, products).await?;

                let task = self.move_index(&staging, &self.index_name).await?;
                self.wait_task(&staging, task).await?;
                info!("Swapped {} into {}", staging, self.index_name);
                Ok(())
            }
        }
    }
}
