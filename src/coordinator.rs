//! Periodic refresh scheduling
//!
//! Runs the aggregator on a fixed interval and publishes the result through a
//! `watch` channel. A failed refresh never replaces the published snapshot; it
//! only flips the status to failed and records the error, so observers keep
//! seeing the last good prices together with a failure indicator.

use crate::aggregator::PriceAggregator;
use crate::clock::Clock;
use crate::error::Result;
use crate::logging::{StructuredLogger, get_logger};
use crate::nomos::PriceSource;
use crate::snapshot::PriceSnapshot;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{MissedTickBehavior, interval};

/// Bookkeeping about refresh attempts
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RefreshStatus {
    /// Outcome of the most recent attempt
    pub last_update_success: bool,
    pub last_attempt: Option<DateTime<Utc>>,
    pub last_success: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub consecutive_failures: u32,
    pub total_refreshes: u64,
}

/// What observers see: the last good snapshot plus refresh bookkeeping
#[derive(Debug, Clone, Default)]
pub struct CoordinatorState {
    pub snapshot: Option<Arc<PriceSnapshot>>,
    pub status: RefreshStatus,
}

impl CoordinatorState {
    /// No data has been published yet, or the last attempt failed
    pub fn is_stale(&self) -> bool {
        self.snapshot.is_none() || !self.status.last_update_success
    }
}

pub struct PriceCoordinator<S: PriceSource> {
    aggregator: PriceAggregator<S>,
    refresh_interval: Duration,
    clock: Arc<dyn Clock>,
    state_tx: watch::Sender<Arc<CoordinatorState>>,
    logger: StructuredLogger,
}

impl<S: PriceSource> PriceCoordinator<S> {
    pub fn new(
        aggregator: PriceAggregator<S>,
        refresh_interval: Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let (state_tx, _) = watch::channel(Arc::new(CoordinatorState::default()));
        Self {
            aggregator,
            refresh_interval,
            clock,
            state_tx,
            logger: get_logger("coordinator"),
        }
    }

    pub fn aggregator(&self) -> &PriceAggregator<S> {
        &self.aggregator
    }

    /// Receiver for every published state
    pub fn subscribe(&self) -> watch::Receiver<Arc<CoordinatorState>> {
        self.state_tx.subscribe()
    }

    /// Latest published state
    pub fn state(&self) -> Arc<CoordinatorState> {
        self.state_tx.borrow().clone()
    }

    /// Run one refresh and publish its outcome
    pub async fn refresh_now(&self) -> Result<Arc<PriceSnapshot>> {
        let started = std::time::Instant::now();
        let result = self.aggregator.refresh().await;
        let attempted_at = self.clock.now();
        let previous = self.state();

        let mut status = previous.status.clone();
        status.last_attempt = Some(attempted_at);
        status.total_refreshes = status.total_refreshes.saturating_add(1);

        match result {
            Ok(snapshot) => {
                let snapshot = Arc::new(snapshot);
                status.last_update_success = true;
                status.last_success = Some(attempted_at);
                status.last_error = None;
                status.consecutive_failures = 0;
                self.publish(CoordinatorState {
                    snapshot: Some(snapshot.clone()),
                    status,
                });
                self.logger.info(&format!(
                    "Refresh succeeded in {} ms",
                    started.elapsed().as_millis()
                ));
                Ok(snapshot)
            }
            Err(e) => {
                status.last_update_success = false;
                status.last_error = Some(e.to_string());
                status.consecutive_failures = status.consecutive_failures.saturating_add(1);
                self.publish(CoordinatorState {
                    snapshot: previous
                        .snapshot
                        .as_deref()
                        .map(|s| Arc::new(s.marked_failed())),
                    status,
                });
                self.logger.error(&format!("Error fetching data: {}", e));
                Err(e)
            }
        }
    }

    fn publish(&self, state: CoordinatorState) {
        self.state_tx.send_replace(Arc::new(state));
    }

    /// Refresh immediately, then on every interval tick until `shutdown`
    /// flips to `true` or its sender is dropped
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = interval(self.refresh_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.logger.info(&format!(
            "Refreshing every {} s in zone {}",
            self.refresh_interval.as_secs(),
            self.aggregator.timezone()
        ));

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    // Failures are already recorded in the published status
                    let _ = self.refresh_now().await;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        self.logger.info("Shutdown signal received");
                        break;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::error::NomosError;
    use crate::nomos::PriceItem;
    use crate::snapshot::Day;
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct Toggle {
        fail: AtomicBool,
    }

    #[async_trait::async_trait]
    impl PriceSource for Toggle {
        async fn fetch_prices(&self) -> Result<Vec<PriceItem>> {
            if self.fail.load(Ordering::SeqCst) {
                Err(NomosError::price_fetch("HTTP 503"))
            } else {
                Ok(vec![PriceItem::new("2024-01-15T13:00:00Z", 12.5)])
            }
        }
    }

    fn coordinator() -> PriceCoordinator<Arc<Toggle>> {
        let clock = Arc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2024, 1, 15, 13, 10, 0).unwrap(),
        ));
        let source = Arc::new(Toggle {
            fail: AtomicBool::new(false),
        });
        let aggregator = PriceAggregator::new(source, chrono_tz::Europe::Berlin, clock.clone());
        PriceCoordinator::new(aggregator, Duration::from_secs(3600), clock)
    }

    #[tokio::test]
    async fn failed_refresh_keeps_previous_snapshot() {
        let coordinator = coordinator();
        assert!(coordinator.state().is_stale());

        let first = coordinator.refresh_now().await.unwrap();
        assert_eq!(first.current_price(), Some(12.5));
        assert!(!coordinator.state().is_stale());

        coordinator
            .aggregator()
            .source()
            .fail
            .store(true, Ordering::SeqCst);
        let err = coordinator.refresh_now().await.unwrap_err();
        assert!(matches!(err, NomosError::RefreshFailed { .. }));

        let state = coordinator.state();
        assert!(state.is_stale());
        let kept = state.snapshot.as_deref().unwrap();
        assert_eq!(kept.hours(Day::Today), first.hours(Day::Today));
        assert_eq!(kept.current_price(), Some(12.5));
        assert!(!kept.last_update_success());
        assert_eq!(state.status.consecutive_failures, 1);
        assert_eq!(state.status.total_refreshes, 2);
        assert!(
            state
                .status
                .last_error
                .as_deref()
                .is_some_and(|e| e.contains("HTTP 503"))
        );
    }

    #[tokio::test]
    async fn run_refreshes_immediately_and_stops_on_shutdown() {
        let coordinator = coordinator();
        let mut rx = coordinator.subscribe();
        let (stop_tx, stop_rx) = watch::channel(false);

        let run = coordinator.run(stop_rx);
        let observe = async {
            rx.changed().await.unwrap();
            assert!(rx.borrow().status.last_update_success);
            stop_tx.send(true).unwrap();
        };
        tokio::join!(run, observe);
        assert_eq!(coordinator.state().status.total_refreshes, 1);
    }
}
