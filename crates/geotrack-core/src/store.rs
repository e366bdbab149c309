//! Store capability trait and health status types.

use serde::Serialize;

use crate::error::StoreError;
use crate::telemetry::Telemetry;

/// Liveness report from a backend.
#[derive(Debug, Clone, Serialize)]
pub struct AliveStatus {
    /// Health label, `"alive"` when serving.
    pub health: String,
    /// Number of records currently held.
    pub records: usize,
}

/// Readiness report from a backend: liveness plus an explicit ready flag and
/// a human-readable message.
#[derive(Debug, Clone, Serialize)]
pub struct ReadyStatus {
    pub health: String,
    pub ready: bool,
    pub records: usize,
    pub message: String,
}

/// Capability interface over a telemetry backend.
///
/// The in-memory backend cannot fail most of these operations, but a
/// networked backend can, so the mutating and checking operations keep a
/// fallible return. Implementations must be safe for concurrent invocation:
/// operations on distinct keys never block each other, and operations on one
/// key observe complete prior writes, never partial ones.
pub trait TelemetryStore: Send + Sync {
    /// Insert or replace the record under its canonical key and return the
    /// key. Fills in the key from `source`/`objectId` when the caller left
    /// it empty and stamps `updated` with the current time.
    fn upsert(&self, record: Telemetry) -> Result<String, StoreError>;

    /// Point lookup by record key. `Err(StoreError::NoRecord)` on a miss.
    fn get(&self, id: &str) -> Result<Telemetry, StoreError>;

    /// Value-copied snapshot of every current record, in unspecified order.
    /// Empty when the store is empty, never an error.
    fn get_all(&self) -> Vec<Telemetry>;

    /// Remove every record past the staleness window and return the number
    /// removed. Safe to run concurrently with the other operations; records
    /// upserted mid-sweep are not retroactively affected by that pass.
    fn sweep(&self) -> usize;

    /// Lightweight liveness signal.
    fn alive(&self) -> Result<AliveStatus, StoreError>;

    /// Readiness signal. May fail with [`StoreError::NotReady`] when the
    /// backend cannot currently accept writes, which is distinct from a
    /// liveness failure.
    fn ready(&self) -> Result<ReadyStatus, StoreError>;
}
