//! Periodic expiration sweeps over the telemetry store.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use geotrack_core::TelemetryStore;

/// Spawn the background sweeper.
///
/// Calls `store.sweep()` unconditionally every `interval` until the token is
/// cancelled. The interval is configured independently of the staleness
/// window: a long interval lets stale records linger until the next tick.
/// Nothing is surfaced to callers; the sweep itself logs how many records
/// each pass purged.
pub fn spawn_sweeper(
    store: Arc<dyn TelemetryStore>,
    interval: Duration,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = time::interval_at(time::Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        log::info!(
            "expiration sweeper started, interval {}s",
            interval.as_secs()
        );

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    log::info!("expiration sweeper stopped");
                    break;
                }
                _ = ticker.tick() => {
                    let swept = store.sweep();
                    log::debug!("expiration tick purged {swept} records");
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use geotrack_core::{AliveStatus, ReadyStatus, StoreError, Telemetry};

    use super::*;

    /// Store stub that counts sweep invocations.
    #[derive(Default)]
    struct CountingStore {
        sweeps: AtomicUsize,
    }

    impl TelemetryStore for CountingStore {
        fn upsert(&self, record: Telemetry) -> Result<String, StoreError> {
            Ok(record.canonical_id())
        }

        fn get(&self, _id: &str) -> Result<Telemetry, StoreError> {
            Err(StoreError::NoRecord)
        }

        fn get_all(&self) -> Vec<Telemetry> {
            Vec::new()
        }

        fn sweep(&self) -> usize {
            self.sweeps.fetch_add(1, Ordering::SeqCst);
            0
        }

        fn alive(&self) -> Result<AliveStatus, StoreError> {
            Ok(AliveStatus {
                health: "alive".to_string(),
                records: 0,
            })
        }

        fn ready(&self) -> Result<ReadyStatus, StoreError> {
            Ok(ReadyStatus {
                health: "alive".to_string(),
                ready: true,
                records: 0,
                message: "up; 0 active objects".to_string(),
            })
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_ticks_on_interval() {
        let store = Arc::new(CountingStore::default());
        let token = CancellationToken::new();
        let handle = spawn_sweeper(store.clone(), Duration::from_secs(30), token.clone());

        // Paused time advances only when the runtime sleeps, so the tick
        // count is exact: 30s, 60s, 90s.
        time::sleep(Duration::from_secs(95)).await;
        assert_eq!(store.sweeps.load(Ordering::SeqCst), 3);

        token.cancel();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_stops_on_cancellation() {
        let store = Arc::new(CountingStore::default());
        let token = CancellationToken::new();
        let handle = spawn_sweeper(store.clone(), Duration::from_secs(30), token.clone());

        token.cancel();
        handle.await.unwrap();

        let before = store.sweeps.load(Ordering::SeqCst);
        time::sleep(Duration::from_secs(120)).await;
        assert_eq!(
            store.sweeps.load(Ordering::SeqCst),
            before,
            "no ticks after cancellation"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_does_not_tick_early() {
        let store = Arc::new(CountingStore::default());
        let token = CancellationToken::new();
        let _handle = spawn_sweeper(store.clone(), Duration::from_secs(60), token.clone());

        time::sleep(Duration::from_secs(30)).await;
        assert_eq!(store.sweeps.load(Ordering::SeqCst), 0);

        time::sleep(Duration::from_secs(31)).await;
        assert_eq!(store.sweeps.load(Ordering::SeqCst), 1);

        token.cancel();
    }
}
