//! Error taxonomy for the telemetry store and its payload pipeline.

use thiserror::Error;

/// Classified failure modes of store operations.
///
/// Adapters pick response codes from the variant, not the message: lookup
/// misses and payload problems are client-facing conditions, the last two
/// mean the backend itself cannot serve.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Lookup miss. Expected and recoverable; never a system fault.
    #[error("no matching record found")]
    NoRecord,

    /// Structurally malformed payload (bad JSON shape or types).
    #[error("unable to decode payload: {0}")]
    Decode(String),

    /// Well-formed payload with required fields missing.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The backend cannot serve requests at all (liveness failure).
    #[error("datastore is not alive: {0}")]
    Unavailable(String),

    /// The backend cannot currently accept writes (readiness failure,
    /// distinct from a liveness failure).
    #[error("datastore is not ready: {0}")]
    NotReady(String),
}
