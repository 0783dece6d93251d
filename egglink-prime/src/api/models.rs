use egglink_core::{DeviceSummary, Fields, Reading};
use serde::{Deserialize, Serialize};

/// One history point as served to the dashboard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Ingestion time, seconds since the epoch.
    pub ts: i64,
    pub data: Fields,
}

impl From<Reading> for HistoryEntry {
    fn from(reading: Reading) -> Self {
        Self {
            ts: reading.ts(),
            data: reading.fields,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceResponse {
    pub uid: String,
    pub short_id: String,
    pub is_online: bool,
    pub is_alarm: bool,
    pub last: HistoryEntry,
}

impl From<DeviceSummary> for DeviceResponse {
    fn from(summary: DeviceSummary) -> Self {
        Self {
            uid: summary.latest.device_id.to_string(),
            short_id: summary.short_id,
            is_online: summary.status.is_online,
            is_alarm: summary.status.is_alarm,
            last: summary.latest.into(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Ack {
    pub status: String,
}

impl Ack {
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
        }
    }
}

// Query Parameters
#[derive(Debug, Deserialize, Default)]
pub struct HistoryQuery {
    #[serde(default)]
    pub uid: Option<String>,
    #[serde(default)]
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize, Default)]
pub struct DeviceQuery {
    #[serde(default)]
    pub uid: Option<String>,
}
