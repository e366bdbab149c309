//! In-memory telemetry backend.
//!
//! One coarse lock guards the whole key→record map, which is plenty for the
//! expected volume of hundreds to low thousands of live objects. Per-key
//! mutations are mutually exclusive under the write lock and whole-store
//! reads take the read lock, so a reader observes each record either present
//! or removed, never torn. State is volatile; process restart loses all
//! records.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Instant;

use chrono::Utc;

use crate::error::StoreError;
use crate::metrics::StoreMetrics;
use crate::store::{AliveStatus, ReadyStatus, TelemetryStore};
use crate::telemetry::Telemetry;

/// Backend label this store reports to instrumentation.
const STORE_NAME: &str = "memory";

/// Volatile keyed store of last-known telemetry.
pub struct MemoryStore {
    records: RwLock<HashMap<String, Telemetry>>,
    metrics: StoreMetrics,
}

impl MemoryStore {
    pub fn new(metrics: StoreMetrics) -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            metrics,
        }
    }

    /// Number of records currently held.
    pub fn len(&self) -> usize {
        self.records.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl TelemetryStore for MemoryStore {
    /// Insert-or-replace by canonical key. A repeated report for the same
    /// (`source`, `objectId`) pair replaces the prior value in place; only a
    /// key not previously present counts toward the record gauge.
    fn upsert(&self, mut record: Telemetry) -> Result<String, StoreError> {
        let start = Instant::now();

        if record.id.is_empty() {
            record.id = record.canonical_id();
        }
        record.updated = Utc::now();
        let id = record.id.clone();

        let previous = self.records.write().unwrap().insert(id.clone(), record);
        if previous.is_none() {
            self.metrics.inc_records(STORE_NAME);
        }

        self.metrics
            .observe_op(STORE_NAME, "upsert", start.elapsed());
        Ok(id)
    }

    fn get(&self, id: &str) -> Result<Telemetry, StoreError> {
        let start = Instant::now();
        let found = self.records.read().unwrap().get(id).cloned();
        self.metrics.observe_op(STORE_NAME, "get", start.elapsed());

        match found {
            Some(record) => Ok(record),
            None => {
                self.metrics.inc_error(STORE_NAME, "get");
                Err(StoreError::NoRecord)
            }
        }
    }

    fn get_all(&self) -> Vec<Telemetry> {
        let start = Instant::now();
        let snapshot: Vec<Telemetry> = self.records.read().unwrap().values().cloned().collect();
        self.metrics
            .observe_op(STORE_NAME, "get_all", start.elapsed());
        snapshot
    }

    /// Remove every stale record and return the count removed.
    ///
    /// Candidates are snapshotted under the read lock with a single `now`,
    /// then removed under the write lock with a per-key staleness re-check,
    /// so a record refreshed between the two phases survives the pass.
    fn sweep(&self) -> usize {
        let start = Instant::now();
        let now = Utc::now();

        let stale: Vec<String> = {
            let records = self.records.read().unwrap();
            records
                .values()
                .filter(|record| record.is_stale(now))
                .map(|record| record.id.clone())
                .collect()
        };

        let mut swept = 0;
        if !stale.is_empty() {
            let mut records = self.records.write().unwrap();
            for id in stale {
                if records.get(&id).is_some_and(|record| record.is_stale(now)) {
                    log::debug!("record {id} telemetry is stale");
                    records.remove(&id);
                    swept += 1;
                }
            }
        }
        if swept > 0 {
            self.metrics.sub_records(STORE_NAME, swept);
        }

        self.metrics.observe_op(STORE_NAME, "sweep", start.elapsed());
        log::info!("expired {swept} stale records");
        swept
    }

    /// The in-memory backend is alive as long as the process is.
    fn alive(&self) -> Result<AliveStatus, StoreError> {
        Ok(AliveStatus {
            health: "alive".to_string(),
            records: self.len(),
        })
    }

    /// The in-memory backend is always ready to accept writes.
    fn ready(&self) -> Result<ReadyStatus, StoreError> {
        let records = self.len();
        Ok(ReadyStatus {
            health: "alive".to_string(),
            ready: true,
            records,
            message: format!("up; {records} active objects"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::Position;
    use chrono::TimeDelta;

    fn store() -> MemoryStore {
        MemoryStore::new(StoreMetrics::unregistered())
    }

    fn report(source: &str, object_id: &str, latitude: f64, longitude: f64) -> Telemetry {
        Telemetry {
            id: String::new(),
            position: Position {
                latitude,
                longitude,
                elevation: None,
            },
            updated: Utc::now(),
            source: source.to_string(),
            object_id: object_id.to_string(),
            status: None,
        }
    }

    /// Shift a stored record's `updated` into the past.
    fn backdate(store: &MemoryStore, id: &str, seconds: i64) {
        let mut records = store.records.write().unwrap();
        let record = records.get_mut(id).expect("record to backdate");
        record.updated = Utc::now() - TimeDelta::seconds(seconds);
    }

    // -----------------------------------------------------------------------
    // Upsert tests
    // -----------------------------------------------------------------------

    #[test]
    fn test_upsert_derives_canonical_id() {
        let db = store();
        let id = db.upsert(report("truck", "42", 10.0, 20.0)).unwrap();
        assert_eq!(id, "truck-42");
    }

    #[test]
    fn test_upsert_keeps_caller_id() {
        let db = store();
        let mut record = report("truck", "42", 10.0, 20.0);
        record.id = "custom-key".to_string();
        let id = db.upsert(record).unwrap();
        assert_eq!(id, "custom-key");
    }

    #[test]
    fn test_upsert_stamps_updated() {
        let db = store();
        let mut record = report("truck", "42", 10.0, 20.0);
        record.updated = Utc::now() - TimeDelta::seconds(3600);
        let before = Utc::now();
        let id = db.upsert(record).unwrap();
        let stored = db.get(&id).unwrap();
        assert!(
            stored.updated >= before,
            "client-supplied updated must be overwritten"
        );
    }

    #[test]
    fn test_upsert_same_key_replaces_in_place() {
        let db = store();
        db.upsert(report("truck", "42", 10.0, 20.0)).unwrap();
        db.upsert(report("truck", "42", 11.0, 21.0)).unwrap();

        assert_eq!(db.len(), 1, "overwrite must not duplicate");
        let stored = db.get("truck-42").unwrap();
        assert!((stored.position.latitude - 11.0).abs() < f64::EPSILON);
        assert!((stored.position.longitude - 21.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_upsert_distinct_keys_accumulate() {
        let db = store();
        for i in 0..100 {
            db.upsert(report("truck", &i.to_string(), 10.0, 20.0))
                .unwrap();
        }
        assert_eq!(db.len(), 100);
        assert_eq!(db.get_all().len(), 100);
    }

    #[test]
    fn test_record_gauge_counts_distinct_keys_only() {
        let db = store();
        db.upsert(report("truck", "42", 10.0, 20.0)).unwrap();
        db.upsert(report("truck", "42", 11.0, 21.0)).unwrap();
        db.upsert(report("plane", "7", 30.0, 40.0)).unwrap();
        assert_eq!(db.metrics.record_count(STORE_NAME), 2);
    }

    // -----------------------------------------------------------------------
    // Get tests
    // -----------------------------------------------------------------------

    #[test]
    fn test_get_returns_stored_record() {
        let db = store();
        let mut record = report("truck", "42", 10.0, 20.0);
        record.status = Some("moving".to_string());
        db.upsert(record).unwrap();

        let stored = db.get("truck-42").unwrap();
        assert_eq!(stored.source, "truck");
        assert_eq!(stored.object_id, "42");
        assert_eq!(stored.status.as_deref(), Some("moving"));
        assert!((stored.position.latitude - 10.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_get_unknown_id_is_no_record() {
        let db = store();
        let err = db.get("foobar").unwrap_err();
        assert!(matches!(err, StoreError::NoRecord), "got {err:?}");
        assert_eq!(db.metrics.error_count(STORE_NAME, "get"), 1);
    }

    #[test]
    fn test_get_all_empty_store() {
        let db = store();
        assert!(db.get_all().is_empty());
    }

    #[test]
    fn test_get_all_returns_value_copies() {
        let db = store();
        db.upsert(report("truck", "42", 10.0, 20.0)).unwrap();
        let mut snapshot = db.get_all();
        snapshot[0].position.latitude = 99.0;
        // Mutating the snapshot must not touch the stored record.
        let stored = db.get("truck-42").unwrap();
        assert!((stored.position.latitude - 10.0).abs() < f64::EPSILON);
    }

    // -----------------------------------------------------------------------
    // Sweep tests
    // -----------------------------------------------------------------------

    #[test]
    fn test_sweep_removes_only_stale_records() {
        let db = store();
        db.upsert(report("truck", "old", 10.0, 20.0)).unwrap();
        db.upsert(report("truck", "fresh", 10.0, 20.0)).unwrap();
        backdate(&db, "truck-old", 70);
        backdate(&db, "truck-fresh", 10);

        let swept = db.sweep();
        assert_eq!(swept, 1);
        assert!(matches!(db.get("truck-old"), Err(StoreError::NoRecord)));
        assert!(db.get("truck-fresh").is_ok());
    }

    #[test]
    fn test_sweep_empty_store() {
        let db = store();
        assert_eq!(db.sweep(), 0);
    }

    #[test]
    fn test_sweep_count_matches_removals() {
        let db = store();
        for i in 0..10 {
            let id = db.upsert(report("truck", &i.to_string(), 10.0, 20.0)).unwrap();
            if i < 7 {
                backdate(&db, &id, 100);
            }
        }
        assert_eq!(db.sweep(), 7);
        assert_eq!(db.len(), 3);
    }

    #[test]
    fn test_sweep_decrements_record_gauge() {
        let db = store();
        db.upsert(report("truck", "1", 10.0, 20.0)).unwrap();
        db.upsert(report("truck", "2", 10.0, 20.0)).unwrap();
        backdate(&db, "truck-1", 120);
        db.sweep();
        assert_eq!(db.metrics.record_count(STORE_NAME), 1);
    }

    #[test]
    fn test_upsert_after_sweep_reinserts() {
        let db = store();
        db.upsert(report("truck", "42", 10.0, 20.0)).unwrap();
        backdate(&db, "truck-42", 120);
        db.sweep();
        db.upsert(report("truck", "42", 11.0, 21.0)).unwrap();
        assert_eq!(db.len(), 1);
        assert_eq!(db.metrics.record_count(STORE_NAME), 1);
    }

    // -----------------------------------------------------------------------
    // Health check tests
    // -----------------------------------------------------------------------

    #[test]
    fn test_alive_reports_record_count() {
        let db = store();
        db.upsert(report("truck", "42", 10.0, 20.0)).unwrap();
        let status = db.alive().unwrap();
        assert_eq!(status.health, "alive");
        assert_eq!(status.records, 1);
    }

    #[test]
    fn test_ready_reports_flag_and_message() {
        let db = store();
        db.upsert(report("truck", "42", 10.0, 20.0)).unwrap();
        db.upsert(report("plane", "7", 30.0, 40.0)).unwrap();
        let status = db.ready().unwrap();
        assert!(status.ready);
        assert_eq!(status.records, 2);
        assert_eq!(status.message, "up; 2 active objects");
    }

    // -----------------------------------------------------------------------
    // Concurrency tests
    // -----------------------------------------------------------------------

    #[test]
    fn test_concurrent_upserts_distinct_keys() {
        let db = store();
        std::thread::scope(|scope| {
            for worker in 0..8 {
                let db = &db;
                scope.spawn(move || {
                    for i in 0..50 {
                        db.upsert(report("worker", &format!("{worker}-{i}"), 1.0, 2.0))
                            .unwrap();
                    }
                });
            }
        });
        assert_eq!(db.len(), 400);
        assert_eq!(db.metrics.record_count(STORE_NAME), 400);
    }

    #[test]
    fn test_concurrent_overwrites_single_key() {
        let db = store();
        std::thread::scope(|scope| {
            for _ in 0..8 {
                let db = &db;
                scope.spawn(move || {
                    for i in 0..50 {
                        db.upsert(report("truck", "42", f64::from(i) + 1.0, 2.0))
                            .unwrap();
                    }
                });
            }
        });
        // Whatever interleaving won, there is exactly one complete record.
        assert_eq!(db.len(), 1);
        assert_eq!(db.metrics.record_count(STORE_NAME), 1);
        let stored = db.get("truck-42").unwrap();
        assert!(stored.position.latitude >= 1.0);
    }

    #[test]
    fn test_sweep_concurrent_with_reads_and_writes() {
        let db = store();
        for i in 0..100 {
            let id = db.upsert(report("truck", &i.to_string(), 10.0, 20.0)).unwrap();
            if i % 2 == 0 {
                backdate(&db, &id, 120);
            }
        }

        std::thread::scope(|scope| {
            let db_ref = &db;
            scope.spawn(move || {
                db_ref.sweep();
            });
            scope.spawn(move || {
                for i in 100..150 {
                    db_ref
                        .upsert(report("plane", &i.to_string(), 30.0, 40.0))
                        .unwrap();
                }
            });
            scope.spawn(move || {
                // Readers may see records before or after removal, but every
                // record they do see is complete.
                for record in db_ref.get_all() {
                    assert!(!record.id.is_empty());
                    assert!(!record.source.is_empty());
                }
            });
        });

        // 50 stale swept, 50 fresh kept, 50 added concurrently.
        assert_eq!(db.len(), 100);
    }
}
