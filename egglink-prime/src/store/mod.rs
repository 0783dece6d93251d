pub mod memory;

use std::collections::HashMap;
use std::num::NonZeroUsize;

use async_trait::async_trait;
use egglink_core::{DeviceId, Reading, Sample};

pub use memory::InMemoryDeviceStore;

/// Default number of readings kept per device.
pub const DEFAULT_MAX_HISTORY: NonZeroUsize = NonZeroUsize::new(2000).unwrap();

/// Per-device reading histories.
///
/// Histories are bounded and append-only; the oldest reading is evicted once
/// a device exceeds its cap. Every read returns an owned copy.
#[async_trait]
pub trait DeviceStore: Clone + Send + Sync + 'static {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Stamp `sample` with the current time and append it to its device's
    /// history, creating the history on first use.
    async fn append(&self, sample: Sample) -> Result<Reading, Self::Error>;

    /// Full history of a device, newest first. Empty for unknown devices.
    async fn snapshot(&self, id: &DeviceId) -> Result<Vec<Reading>, Self::Error>;

    /// The `limit` newest readings of a device, newest first.
    async fn recent(&self, id: &DeviceId, limit: usize) -> Result<Vec<Reading>, Self::Error>;

    async fn latest(&self, id: &DeviceId) -> Result<Option<Reading>, Self::Error>;

    /// Latest reading of every device that has one.
    async fn snapshot_all(&self) -> Result<HashMap<DeviceId, Reading>, Self::Error>;

    /// Drop every device and its history.
    async fn clear(&self) -> Result<(), Self::Error>;

    async fn stats(&self) -> Result<StoreStats, Self::Error>;
}

/// Statistics about stored data.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct StoreStats {
    /// Number of devices with at least one reading.
    pub devices: usize,
    /// Number of readings across all devices.
    pub readings: usize,
}
