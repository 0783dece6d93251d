use std::collections::{HashMap, VecDeque};
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use egglink_core::{DeviceId, Reading, Sample};
use jiff::Timestamp;

use super::{DEFAULT_MAX_HISTORY, DeviceStore, StoreStats};

type Histories = HashMap<DeviceId, VecDeque<Reading>>;

#[derive(Debug, thiserror::Error)]
pub enum InMemoryError {
    #[error("store lock poisoned: {0}")]
    Poisoned(String),
}

impl<T> From<PoisonError<T>> for InMemoryError {
    fn from(err: PoisonError<T>) -> Self {
        InMemoryError::Poisoned(err.to_string())
    }
}

/// Device histories held in process memory.
///
/// One mutex guards the whole map and every operation completes within a
/// single acquisition, so no caller can observe a half-applied append or
/// clear. Clones share the same histories.
#[derive(Clone)]
pub struct InMemoryDeviceStore {
    histories: Arc<Mutex<Histories>>,
    max_history: NonZeroUsize,
}

impl InMemoryDeviceStore {
    pub fn new(max_history: NonZeroUsize) -> Self {
        Self {
            histories: Arc::new(Mutex::new(HashMap::new())),
            max_history,
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Histories>, InMemoryError> {
        Ok(self.histories.lock()?)
    }
}

impl Default for InMemoryDeviceStore {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_HISTORY)
    }
}

#[async_trait]
impl DeviceStore for InMemoryDeviceStore {
    type Error = InMemoryError;

    async fn append(&self, sample: Sample) -> Result<Reading, Self::Error> {
        let mut histories = self.lock()?;
        let history = histories.entry(sample.device_id.clone()).or_default();

        // Keep histories ordered even if the wall clock steps backwards.
        let mut received_at = Timestamp::now();
        if let Some(last) = history.back() {
            received_at = received_at.max(last.received_at);
        }

        let reading = Reading {
            device_id: sample.device_id,
            received_at,
            fields: sample.fields,
        };

        history.push_back(reading.clone());
        while history.len() > self.max_history.get() {
            history.pop_front();
        }

        Ok(reading)
    }

    async fn snapshot(&self, id: &DeviceId) -> Result<Vec<Reading>, Self::Error> {
        let histories = self.lock()?;

        Ok(histories
            .get(id)
            .map(|history| history.iter().rev().cloned().collect())
            .unwrap_or_default())
    }

    async fn recent(&self, id: &DeviceId, limit: usize) -> Result<Vec<Reading>, Self::Error> {
        let histories = self.lock()?;

        Ok(histories
            .get(id)
            .map(|history| history.iter().rev().take(limit).cloned().collect())
            .unwrap_or_default())
    }

    async fn latest(&self, id: &DeviceId) -> Result<Option<Reading>, Self::Error> {
        let histories = self.lock()?;

        Ok(histories.get(id).and_then(|history| history.back()).cloned())
    }

    async fn snapshot_all(&self) -> Result<HashMap<DeviceId, Reading>, Self::Error> {
        let histories = self.lock()?;

        Ok(histories
            .iter()
            .filter_map(|(id, history)| Some((id.clone(), history.back()?.clone())))
            .collect())
    }

    async fn clear(&self) -> Result<(), Self::Error> {
        let mut histories = self.lock()?;
        histories.clear();
        Ok(())
    }

    async fn stats(&self) -> Result<StoreStats, Self::Error> {
        let histories = self.lock()?;

        Ok(StoreStats {
            devices: histories.values().filter(|h| !h.is_empty()).count(),
            readings: histories.values().map(VecDeque::len).sum(),
        })
    }
}

#[cfg(test)]
mod tests {
    use egglink_core::{Fields, Metric};
    use serde_json::json;

    use super::*;

    fn store(max_history: usize) -> InMemoryDeviceStore {
        InMemoryDeviceStore::new(NonZeroUsize::new(max_history).unwrap())
    }

    fn sample(id: &str, seq: u64) -> Sample {
        let mut fields = Fields::new();
        fields.insert("e", json!(id));
        fields.insert("seq", json!(seq));
        fields.insert("p", json!(seq as f64));
        Sample {
            device_id: DeviceId::from(id),
            fields,
        }
    }

    fn seq(reading: &Reading) -> u64 {
        reading.fields.get("seq").and_then(|v| v.as_u64()).unwrap()
    }

    fn seqs(readings: &[Reading]) -> Vec<u64> {
        readings.iter().map(seq).collect()
    }

    #[tokio::test]
    async fn test_append_and_snapshot_newest_first() {
        let store = store(10);
        for seq in 0..3 {
            store.append(sample("fe80::1", seq)).await.unwrap();
        }

        let history = store.snapshot(&DeviceId::from("fe80::1")).await.unwrap();
        assert_eq!(seqs(&history), vec![2, 1, 0]);
        assert!(history.windows(2).all(|w| w[0].received_at >= w[1].received_at));
    }

    #[tokio::test]
    async fn test_unknown_device_is_empty() {
        let store = store(10);
        store.append(sample("fe80::1", 0)).await.unwrap();

        let unknown = DeviceId::from("fe80::2");
        assert!(store.snapshot(&unknown).await.unwrap().is_empty());
        assert!(store.recent(&unknown, 5).await.unwrap().is_empty());
        assert!(store.latest(&unknown).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_fifo_eviction() {
        let cap = 5;
        let extra = 3;
        let store = store(cap);
        for seq in 0..(cap + extra) as u64 {
            store.append(sample("fe80::1", seq)).await.unwrap();
        }

        let history = store.snapshot(&DeviceId::from("fe80::1")).await.unwrap();
        assert_eq!(history.len(), cap);
        assert_eq!(seqs(&history), vec![7, 6, 5, 4, 3]);
    }

    #[tokio::test]
    async fn test_recent_limits_from_newest() {
        let store = store(10);
        for seq in 0..6 {
            store.append(sample("fe80::1", seq)).await.unwrap();
        }

        let id = DeviceId::from("fe80::1");
        assert_eq!(seqs(&store.recent(&id, 2).await.unwrap()), vec![5, 4]);
        assert_eq!(store.recent(&id, 100).await.unwrap().len(), 6);
        assert!(store.recent(&id, 0).await.unwrap().is_empty());

        let latest = store.latest(&id).await.unwrap().unwrap();
        assert_eq!(latest.fields.metric(Metric::Particulate), Some(5.0));
    }

    #[tokio::test]
    async fn test_duplicate_readings_are_kept() {
        let store = store(10);
        let first = store.append(sample("fe80::1", 1)).await.unwrap();
        let second = store.append(sample("fe80::1", 1)).await.unwrap();

        assert!(second.received_at >= first.received_at);
        let history = store.snapshot(&DeviceId::from("fe80::1")).await.unwrap();
        assert_eq!(history.len(), 2);
    }

    #[tokio::test]
    async fn test_snapshot_is_a_copy() {
        let store = store(10);
        store.append(sample("fe80::1", 0)).await.unwrap();

        let before = store.snapshot(&DeviceId::from("fe80::1")).await.unwrap();
        store.append(sample("fe80::1", 1)).await.unwrap();

        assert_eq!(seqs(&before), vec![0]);
    }

    #[tokio::test]
    async fn test_snapshot_all_returns_latest_per_device() {
        let store = store(10);
        store.append(sample("fe80::1", 0)).await.unwrap();
        store.append(sample("fe80::1", 1)).await.unwrap();
        store.append(sample("fe80::2", 7)).await.unwrap();

        let all = store.snapshot_all().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(seq(&all[&DeviceId::from("fe80::1")]), 1);
        assert_eq!(seq(&all[&DeviceId::from("fe80::2")]), 7);

        let stats = store.stats().await.unwrap();
        assert_eq!(stats, StoreStats { devices: 2, readings: 3 });
    }

    #[tokio::test]
    async fn test_clear_removes_everything() {
        let store = store(10);
        store.append(sample("fe80::1", 0)).await.unwrap();
        store.append(sample("fe80::2", 0)).await.unwrap();

        store.clear().await.unwrap();

        assert!(store.snapshot_all().await.unwrap().is_empty());
        assert!(store.snapshot(&DeviceId::from("fe80::1")).await.unwrap().is_empty());
        assert_eq!(store.stats().await.unwrap(), StoreStats::default());

        // Histories are recreated on demand after a clear.
        store.append(sample("fe80::1", 9)).await.unwrap();
        assert_eq!(store.snapshot_all().await.unwrap().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_appends_are_not_lost() {
        let store = InMemoryDeviceStore::default();
        let n = 200;

        let handles: Vec<_> = (0..n)
            .map(|seq| {
                let store = store.clone();
                tokio::spawn(async move { store.append(sample("fe80::1", seq)).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let history = store.snapshot(&DeviceId::from("fe80::1")).await.unwrap();
        assert_eq!(history.len(), n as usize);
        assert!(history.windows(2).all(|w| w[0].received_at >= w[1].received_at));

        let mut seen = seqs(&history);
        seen.sort_unstable();
        assert_eq!(seen, (0..n).collect::<Vec<_>>());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_appends_respect_cap() {
        let cap = 50;
        let store = store(cap);

        let handles: Vec<_> = (0..8)
            .map(|worker| {
                let store = store.clone();
                tokio::spawn(async move {
                    for seq in 0..100 {
                        let id = format!("fe80::{}", worker % 2);
                        store.append(sample(&id, seq)).await.unwrap();
                        let history = store.snapshot(&DeviceId::from(id.as_str())).await.unwrap();
                        assert!(history.len() <= cap);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }

        for id in ["fe80::0", "fe80::1"] {
            let history = store.snapshot(&DeviceId::from(id)).await.unwrap();
            assert_eq!(history.len(), cap);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_clear_is_atomic_for_readers() {
        let store = store(100);
        for device in 0..20 {
            for seq in 0..10 {
                store.append(sample(&format!("fe80::{device}"), seq)).await.unwrap();
            }
        }

        let reader = {
            let store = store.clone();
            tokio::spawn(async move {
                for _ in 0..500 {
                    // Either every device is present with its full history or
                    // the store is empty.
                    let stats = store.stats().await.unwrap();
                    assert!(
                        stats == StoreStats { devices: 20, readings: 200 }
                            || stats == StoreStats::default()
                    );
                    tokio::task::yield_now().await;
                }
            })
        };

        store.clear().await.unwrap();
        reader.await.unwrap();

        assert!(store.snapshot_all().await.unwrap().is_empty());
    }
}
