use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::Context;

use crate::config::ApiConfig;
use crate::models::WasteCategoryGroup;
use crate::source::UpstreamPayload;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket(u64);

/// Generation counter for fetches that feed the same screen.
///
/// Every fetch takes a ticket when it starts. Only the holder of the newest
/// ticket may publish its result; anything older was superseded while in
/// flight and is dropped.
#[derive(Debug, Default)]
pub struct FetchGuard {
    latest: AtomicU64,
}

impl FetchGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&self) -> FetchTicket {
        FetchTicket(self.latest.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn is_current(&self, ticket: FetchTicket) -> bool {
        self.latest.load(Ordering::SeqCst) == ticket.0
    }

    /// Runs `work` under a fresh ticket. Returns `Ok(None)` when a newer
    /// fetch started before `work` finished.
    pub async fn run_latest<T, F>(&self, work: F) -> anyhow::Result<Option<T>>
    where
        F: Future<Output = anyhow::Result<T>>,
    {
        let ticket = self.begin();
        let value = work.await?;
        if self.is_current(ticket) {
            Ok(Some(value))
        } else {
            tracing::debug!(ticket = ticket.0, "discarding superseded fetch");
            Ok(None)
        }
    }
}

#[derive(Debug, Clone)]
pub struct HistoryClient {
    http: reqwest::Client,
    url: String,
    guard: Arc<FetchGuard>,
}

impl HistoryClient {
    pub fn new(config: &ApiConfig) -> anyhow::Result<Self> {
        let url = config
            .url
            .clone()
            .context("no waste history URL configured")?;
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            http,
            url,
            guard: Arc::new(FetchGuard::new()),
        })
    }

    async fn fetch(&self) -> anyhow::Result<Vec<WasteCategoryGroup>> {
        tracing::info!(url = %self.url, "fetching waste history");
        let payload: UpstreamPayload = self
            .http
            .get(&self.url)
            .send()
            .await
            .with_context(|| format!("request to {} failed", self.url))?
            .error_for_status()
            .with_context(|| format!("{} returned an error status", self.url))?
            .json()
            .await
            .context("waste history is not in the expected shape")?;

        let groups = payload.into_groups();
        tracing::info!(groups = groups.len(), "fetched waste history");
        Ok(groups)
    }

    /// Fetches the history unless a newer call on this client overtakes it.
    pub async fn fetch_latest(&self) -> anyhow::Result<Option<Vec<WasteCategoryGroup>>> {
        self.guard.run_latest(self.fetch()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn newer_tickets_supersede_older_ones() {
        let guard = FetchGuard::new();
        let first = guard.begin();
        assert!(guard.is_current(first));

        let second = guard.begin();
        assert!(!guard.is_current(first));
        assert!(guard.is_current(second));
    }

    #[tokio::test]
    async fn slow_superseded_fetch_is_dropped() {
        let guard = FetchGuard::new();

        let slow = guard.run_latest(async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            Ok::<_, anyhow::Error>("stale")
        });
        let fast = guard.run_latest(async { Ok::<_, anyhow::Error>("fresh") });

        let (slow, fast) = tokio::join!(slow, fast);
        assert_eq!(slow.unwrap(), None);
        assert_eq!(fast.unwrap(), Some("fresh"));
    }

    #[tokio::test]
    async fn sequential_fetches_all_publish() {
        let guard = FetchGuard::new();
        assert_eq!(guard.run_latest(async { Ok::<_, anyhow::Error>(1) }).await.unwrap(), Some(1));
        assert_eq!(guard.run_latest(async { Ok::<_, anyhow::Error>(2) }).await.unwrap(), Some(2));
    }

    #[tokio::test]
    async fn errors_propagate() {
        let guard = FetchGuard::new();
        let result: anyhow::Result<Option<u8>> = guard
            .run_latest(async { Err(anyhow::anyhow!("upstream down")) })
            .await;
        assert!(result.is_err());
    }

    #[test]
    fn client_requires_a_url() {
        let err = HistoryClient::new(&ApiConfig::default()).unwrap_err();
        assert!(err.to_string().contains("URL"));

        let config =
            ApiConfig::default().with_url(Some("http://127.0.0.1:9/waste".to_string()));
        assert!(HistoryClient::new(&config).is_ok());
    }
}
