//! Telemetry record model: position, reporting metadata, staleness.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// Seconds after which an unrefreshed record counts as stale.
///
/// Independent of the sweep interval a host process configures: a short
/// interval sweeps eagerly relative to this age, a long one lets stale
/// records linger until the next tick.
pub const STALE_AFTER_SECS: i64 = 65;

/// Geographic position of an object, in decimal degrees.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// North-south position on the globe.
    pub latitude: f64,

    /// East-west position on the globe.
    pub longitude: f64,

    /// Meters above sea level.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elevation: Option<i64>,
}

/// Last-known telemetry of a single physical object in the world, such as a
/// vehicle or plane.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Telemetry {
    /// Unique record key, derived by the store as `source + "-" + objectId`
    /// so repeated reports from one physical object overwrite one slot.
    /// Never taken from clients and never serialized back to them.
    #[serde(skip)]
    pub id: String,

    /// Position of the object at the time of the report. A payload without
    /// one decodes to the zero position and is rejected by validation.
    #[serde(default)]
    pub position: Position,

    /// When the store last accepted a report for this object. Stamped by the
    /// store on upsert; a client-supplied value is ignored.
    #[serde(default = "Utc::now")]
    pub updated: DateTime<Utc>,

    /// Reporting system the record came from.
    #[serde(default)]
    pub source: String,

    /// Object id as the reporting source knows it.
    #[serde(default, rename = "objectId")]
    pub object_id: String,

    /// Free-form state label at the time of the report.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl Telemetry {
    /// Canonical record key for this source/object pair.
    pub fn canonical_id(&self) -> String {
        format!("{}-{}", self.source, self.object_id)
    }

    /// Check that every required field is present.
    ///
    /// A zero coordinate counts as absent: a decoder that defaulted a
    /// missing field lands exactly there.
    pub fn validate(&self) -> Result<(), StoreError> {
        let mut missing = Vec::new();
        if self.position.latitude == 0.0 {
            missing.push("position.latitude");
        }
        if self.position.longitude == 0.0 {
            missing.push("position.longitude");
        }
        if self.source.is_empty() {
            missing.push("source");
        }
        if self.object_id.is_empty() {
            missing.push("objectId");
        }

        if missing.is_empty() {
            Ok(())
        } else {
            Err(StoreError::Validation(format!(
                "missing required fields: {}",
                missing.join(", ")
            )))
        }
    }

    /// Decode a raw JSON payload into a validated record.
    ///
    /// Malformed input maps to [`StoreError::Decode`]; input that decodes but
    /// fails the field contract maps to [`StoreError::Validation`]. Decode
    /// errors are checked first.
    pub fn parse_and_validate(payload: &str) -> Result<Telemetry, StoreError> {
        let record: Telemetry =
            serde_json::from_str(payload).map_err(|e| StoreError::Decode(e.to_string()))?;
        record.validate()?;
        Ok(record)
    }

    /// Whether this record has gone unrefreshed for longer than
    /// [`STALE_AFTER_SECS`].
    pub fn is_stale(&self, now: DateTime<Utc>) -> bool {
        self.updated < now - TimeDelta::seconds(STALE_AFTER_SECS)
    }
}
