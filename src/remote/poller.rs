//! Per-config polling task.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time::{Instant, MissedTickBehavior};

use crate::error::Result;
use crate::format::ConfigType;
use crate::listeners::ListenerRegistry;
use crate::observability::metrics;
use crate::options::schema::MAX_CHECK_INTERVAL;
use crate::options::PollErrorPolicy;
use crate::remote::service::{ConfigDataService, SessionRequest};
use crate::resilience::RetryBackoff;
use crate::store::{self, ConfigCell};

/// Keeps one config up to date by following its continuation token.
///
/// The token is owned by this task alone.
pub(crate) struct Poller {
    pub(crate) cell: Arc<ConfigCell>,
    pub(crate) token: String,
    pub(crate) session: SessionRequest,
    pub(crate) service: Arc<dyn ConfigDataService>,
    pub(crate) config_type: ConfigType,
    pub(crate) interval: Duration,
    pub(crate) policy: PollErrorPolicy,
    pub(crate) listeners: Arc<ListenerRegistry>,
    pub(crate) client_id: String,
}

impl Poller {
    pub(crate) async fn run(mut self, mut shutdown: broadcast::Receiver<()>) {
        // Instant + Duration panics on overflow
        let period = self.interval.min(MAX_CHECK_INTERVAL);
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut failures: u32 = 0;

        loop {
            if failures == 0 {
                tokio::select! {
                    _ = ticker.tick() => {}
                    _ = shutdown.recv() => break,
                }
            } else if let PollErrorPolicy::Retry {
                base_delay_ms,
                max_delay_ms,
                ..
            } = self.policy
            {
                let delay = RetryBackoff::from_millis(base_delay_ms, max_delay_ms).delay(failures);
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = shutdown.recv() => break,
                }
            }

            let result = if self.reopen_due(failures) {
                self.reopen_and_poll().await
            } else {
                self.poll_once().await
            };

            match result {
                Ok(()) => {
                    if failures > 0 {
                        tracing::info!(
                            client = %self.client_id,
                            config = %self.cell.name(),
                            failures,
                            "Polling recovered"
                        );
                        ticker.reset();
                    }
                    failures = 0;
                }
                Err(e) => {
                    failures = failures.saturating_add(1);
                    metrics::record_poll_error(self.cell.name());
                    tracing::warn!(
                        client = %self.client_id,
                        config = %self.cell.name(),
                        error = %e,
                        failures,
                        "Failed to poll config"
                    );
                    if self.policy == PollErrorPolicy::Stop {
                        tracing::warn!(
                            client = %self.client_id,
                            config = %self.cell.name(),
                            "Polling stopped, last known snapshot stays in place"
                        );
                        break;
                    }
                }
            }
        }

        tracing::debug!(client = %self.client_id, config = %self.cell.name(), "Poller exited");
    }

    fn reopen_due(&self, failures: u32) -> bool {
        match self.policy {
            PollErrorPolicy::Retry { reopen_after, .. } => failures >= reopen_after,
            PollErrorPolicy::Stop => false,
        }
    }

    /// Replace a token that keeps failing with one from a fresh session.
    async fn reopen_and_poll(&mut self) -> Result<()> {
        self.token = self.service.start_session(&self.session).await?;
        tracing::info!(client = %self.client_id, config = %self.cell.name(), "Opened a new session");
        self.poll_once().await
    }

    /// One fetch: advance the token and apply the payload if there is one.
    pub(crate) async fn poll_once(&mut self) -> Result<()> {
        let fetched = self.service.fetch_latest(&self.token).await?;
        self.token = fetched.next_token;

        if fetched.payload.is_empty() {
            tracing::trace!(config = %self.cell.name(), "Config unchanged");
            return Ok(());
        }

        match self.config_type.parse(&fetched.payload) {
            Ok(data) => {
                let snapshot = self.cell.replace(data);
                tracing::info!(client = %self.client_id, config = %self.cell.name(), "Config updated");
                metrics::record_reload(self.cell.name(), "remote", metrics::OUTCOME_APPLIED);
                store::notify(&self.listeners, &self.cell, snapshot, true);
            }
            Err(e) => {
                // the bad revision is skipped; the next token has already been taken
                tracing::warn!(
                    client = %self.client_id,
                    config = %self.cell.name(),
                    error = %e,
                    "Discarding unparseable config revision"
                );
                metrics::record_reload(self.cell.name(), "remote", metrics::OUTCOME_REJECTED);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConfigError;
    use crate::lifecycle::Shutdown;
    use crate::listeners::ChangeEvent;
    use crate::remote::service::FetchResult;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct Queued(Mutex<VecDeque<Result<FetchResult>>>);

    #[async_trait]
    impl ConfigDataService for Queued {
        async fn start_session(&self, _: &SessionRequest) -> Result<String> {
            Ok("fresh".into())
        }

        async fn fetch_latest(&self, _: &str) -> Result<FetchResult> {
            self.0
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(ConfigError::Service("exhausted".into())))
        }
    }

    fn fetched(token: &str, payload: &str) -> Result<FetchResult> {
        Ok(FetchResult {
            next_token: token.into(),
            payload: payload.as_bytes().to_vec(),
        })
    }

    fn poller(responses: Vec<Result<FetchResult>>) -> Poller {
        Poller {
            cell: Arc::new(ConfigCell::new("cfg", serde_json::Map::new())),
            token: "t1".into(),
            session: SessionRequest {
                application_identifier: "app".into(),
                environment_identifier: "env".into(),
                configuration_profile_identifier: "cfg".into(),
                required_minimum_poll_interval_in_seconds: 60,
            },
            service: Arc::new(Queued(Mutex::new(responses.into()))),
            config_type: ConfigType::Json,
            interval: Duration::from_secs(60),
            policy: PollErrorPolicy::Stop,
            listeners: Arc::new(ListenerRegistry::new()),
            client_id: "test".into(),
        }
    }

    #[tokio::test]
    async fn test_poll_once_payload_handling() {
        let mut poller = poller(vec![
            fetched("t2", ""),
            fetched("t3", "{not json"),
            fetched("t4", r#"{"a": 2}"#),
        ]);
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = calls.clone();
        poller.listeners.insert(
            "cfg",
            Arc::new(move |e: &ChangeEvent| {
                assert!(e.reloaded);
                assert_eq!(e.snapshot["a"], json!(2));
                seen.fetch_add(1, Ordering::SeqCst);
            }),
        );

        poller.poll_once().await.unwrap();
        assert_eq!(poller.token, "t2");
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        poller.poll_once().await.unwrap();
        assert_eq!(poller.token, "t3");
        assert_eq!(poller.cell.lookup("a"), None);
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        poller.poll_once().await.unwrap();
        assert_eq!(poller.token, "t4");
        assert_eq!(poller.cell.lookup("a"), Some(json!(2)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_fetch_error_keeps_token() {
        let mut poller = poller(vec![Err(ConfigError::Service("boom".into()))]);
        assert!(poller.poll_once().await.is_err());
        assert_eq!(poller.token, "t1");
    }

    #[tokio::test(start_paused = true)]
    async fn test_oversized_interval_keeps_polling_task_alive() {
        let mut poller = poller(vec![fetched("t2", r#"{"a": 1}"#)]);
        poller.interval = Duration::from_secs(u64::MAX);
        let shutdown = Shutdown::new();
        let handle = tokio::spawn(poller.run(shutdown.subscribe()));

        tokio::time::sleep(Duration::from_secs(3600)).await;
        assert_eq!(shutdown.receiver_count(), 1);

        // capped at one day
        tokio::time::sleep(MAX_CHECK_INTERVAL).await;
        assert_eq!(shutdown.receiver_count(), 1);

        shutdown.trigger();
        handle.await.unwrap();
        assert_eq!(shutdown.receiver_count(), 0);
    }

    #[test]
    fn test_reopen_due() {
        let mut poller = poller(Vec::new());
        assert!(!poller.reopen_due(10));
        poller.policy = PollErrorPolicy::Retry {
            base_delay_ms: 10,
            max_delay_ms: 100,
            reopen_after: 3,
        };
        assert!(!poller.reopen_due(2));
        assert!(poller.reopen_due(3));
        assert!(poller.reopen_due(4));
    }
}
