//! # geotrack-core
//!
//! Core telemetry store for last-known positions of mobile objects.
//!
//! Vehicles and devices report GPS coordinates through some transport; this
//! crate holds the part with real invariants: a keyed, mutable record set
//! with upsert semantics, time-based expiration, and instrumentation of
//! every operation. Transports (HTTP routing, payload plumbing) live in
//! adapter crates and call in through the [`TelemetryStore`] trait.
//!
//! ## Quick Start
//!
//! ```no_run
//! use geotrack_core::{MemoryStore, StoreMetrics, Telemetry, TelemetryStore};
//! use prometheus::Registry;
//!
//! let registry = Registry::new();
//! let store = MemoryStore::new(StoreMetrics::new(&registry));
//!
//! let record = Telemetry::parse_and_validate(
//!     r#"{"source":"truck","objectId":"42","position":{"latitude":10.0,"longitude":20.0}}"#,
//! )
//! .unwrap();
//!
//! let id = store.upsert(record).unwrap();
//! assert_eq!(id, "truck-42");
//! ```
//!
//! ## Architecture
//!
//! Record → Store → Instrumentation side-channel
//!
//! Repeated reports for the same (`source`, `objectId`) pair overwrite one
//! slot; records that go unreported past the staleness window are removed by
//! [`TelemetryStore::sweep`], which a host process drives on a timer. The
//! sweep interval and the staleness window are independent settings.

pub mod error;
pub mod memory;
pub mod metrics;
pub mod store;
pub mod telemetry;

pub use error::StoreError;
pub use memory::MemoryStore;
pub use metrics::StoreMetrics;
pub use store::{AliveStatus, ReadyStatus, TelemetryStore};
pub use telemetry::{Position, STALE_AFTER_SECS, Telemetry};

/// Library version (from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
