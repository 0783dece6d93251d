use std::cmp::Ordering;
use std::collections::HashMap;

use jiff::{SignedDuration, Timestamp};
use crate::{DeviceId, Metric, Reading};

pub const DEFAULT_ONLINE_WINDOW_SECS: u64 = 60;
pub const DEFAULT_ALARM_THRESHOLD: f64 = 31.0;

/// Derived state of a device, computed from its latest reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Status {
    pub is_online: bool,
    pub is_alarm: bool,
}

/// Thresholds used to derive a [`Status`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatusPolicy {
    /// A device is online while its last reading is younger than this.
    pub online_window: SignedDuration,
    /// Particulate level strictly above which a device is in alarm.
    pub alarm_threshold: f64,
}

impl StatusPolicy {
    /// Windows beyond `i64::MAX` seconds saturate instead of wrapping.
    pub fn new(online_window_secs: u64, alarm_threshold: f64) -> Self {
        let secs = i64::try_from(online_window_secs).unwrap_or(i64::MAX);
        Self {
            online_window: SignedDuration::from_secs(secs),
            alarm_threshold,
        }
    }

    /// Age is measured in whole seconds, the same resolution as the `ts`
    /// served for the reading.
    pub fn evaluate(&self, latest: &Reading, now: Timestamp) -> Status {
        let age = SignedDuration::from_secs(now.as_second().saturating_sub(latest.ts()));
        let particulate = latest.fields.metric(Metric::Particulate).unwrap_or(0.0);

        Status {
            is_online: age < self.online_window,
            is_alarm: particulate > self.alarm_threshold,
        }
    }

    /// Evaluate every device and return them in listing order.
    pub fn overview(
        &self,
        latest: HashMap<DeviceId, Reading>,
        now: Timestamp,
    ) -> Vec<DeviceSummary> {
        let mut summaries: Vec<DeviceSummary> = latest
            .into_values()
            .map(|reading| DeviceSummary {
                short_id: short_id(&reading.device_id),
                status: self.evaluate(&reading, now),
                latest: reading,
            })
            .collect();

        summaries.sort_by(listing_order);
        summaries
    }
}

impl Default for StatusPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_ONLINE_WINDOW_SECS, DEFAULT_ALARM_THRESHOLD)
    }
}

/// One row of the device list.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceSummary {
    pub short_id: String,
    pub status: Status,
    pub latest: Reading,
}

impl DeviceSummary {
    pub fn device_id(&self) -> &DeviceId {
        &self.latest.device_id
    }
}

/// Display suffix for a device: its last four characters, uppercased.
pub fn short_id(id: &DeviceId) -> String {
    let chars: Vec<char> = id.as_str().chars().collect();
    let start = chars.len().saturating_sub(4);
    chars[start..].iter().collect::<String>().to_uppercase()
}

/// Alarms first, then online devices, then by display suffix. The full
/// identifier breaks ties so the order is stable across queries.
pub fn listing_order(a: &DeviceSummary, b: &DeviceSummary) -> Ordering {
    b.status
        .is_alarm
        .cmp(&a.status.is_alarm)
        .then_with(|| b.status.is_online.cmp(&a.status.is_online))
        .then_with(|| a.short_id.cmp(&b.short_id))
        .then_with(|| a.device_id().cmp(b.device_id()))
}
