// Storage Driver Port (Interface)

use crate::domain::Stats;
use crate::error::Result;
use async_trait::async_trait;

/// Storage backend for queue data.
///
/// Modeled on a set store: the active set of a queue holds serialized
/// messages, `read` pops an arbitrary member. Implementations must be safe
/// to share between pollers of different queues.
#[async_trait]
pub trait Driver: Send + Sync {
    /// Add a serialized message to the active set at `active_key`
    async fn write(&self, active_key: &str, data: &[u8]) -> Result<()>;

    /// Atomically pop one pending message, `None` when the set is empty
    async fn read(&self, active_key: &str) -> Result<Option<Vec<u8>>>;

    /// Increment `<stats_key>:processed`
    async fn set_processed(&self, stats_key: &str) -> Result<()>;

    /// Add `message_id` to `<stats_key>:failed`
    async fn set_failed(&self, stats_key: &str, message_id: &str) -> Result<()>;

    /// Record the queue name in the global registry (idempotent)
    async fn register(&self, queue: &str) -> Result<()>;

    /// Read processed/failed data of every registered queue
    async fn get_stats(&self) -> Result<Stats>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use crate::domain::{keys, Stat};
    use crate::error::QueueError;
    use std::collections::{BTreeSet, HashMap};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Operation counters of an [`InMemoryDriver`]
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
    pub struct DriverCalls {
        pub write: usize,
        pub read: usize,
        pub set_processed: usize,
        pub set_failed: usize,
        pub register: usize,
    }

    #[derive(Default)]
    struct Store {
        sets: HashMap<String, BTreeSet<Vec<u8>>>,
        counters: HashMap<String, i64>,
    }

    /// In-memory set store with call counters and failure switches
    #[derive(Default)]
    pub struct InMemoryDriver {
        store: Mutex<Store>,
        write_calls: AtomicUsize,
        read_calls: AtomicUsize,
        processed_calls: AtomicUsize,
        failed_calls: AtomicUsize,
        register_calls: AtomicUsize,
        fail_writes: AtomicBool,
        fail_reads: AtomicBool,
        fail_register: AtomicBool,
        fail_stats: AtomicBool,
    }

    impl InMemoryDriver {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn calls(&self) -> DriverCalls {
            DriverCalls {
                write: self.write_calls.load(Ordering::SeqCst),
                read: self.read_calls.load(Ordering::SeqCst),
                set_processed: self.processed_calls.load(Ordering::SeqCst),
                set_failed: self.failed_calls.load(Ordering::SeqCst),
                register: self.register_calls.load(Ordering::SeqCst),
            }
        }

        pub fn fail_writes(&self, fail: bool) {
            self.fail_writes.store(fail, Ordering::SeqCst);
        }

        pub fn fail_reads(&self, fail: bool) {
            self.fail_reads.store(fail, Ordering::SeqCst);
        }

        pub fn fail_register(&self, fail: bool) {
            self.fail_register.store(fail, Ordering::SeqCst);
        }

        /// Make `set_processed` and `set_failed` return errors
        pub fn fail_stats(&self, fail: bool) {
            self.fail_stats.store(fail, Ordering::SeqCst);
        }

        /// Insert raw bytes into a set, bypassing the counters
        pub fn seed(&self, key: &str, data: impl Into<Vec<u8>>) {
            let mut store = self.store.lock().unwrap();
            store
                .sets
                .entry(key.to_string())
                .or_default()
                .insert(data.into());
        }

        /// Members of a set (sorted)
        pub fn members(&self, key: &str) -> Vec<Vec<u8>> {
            let store = self.store.lock().unwrap();
            store
                .sets
                .get(key)
                .map(|set| set.iter().cloned().collect())
                .unwrap_or_default()
        }

        pub fn len(&self, key: &str) -> usize {
            let store = self.store.lock().unwrap();
            store.sets.get(key).map(BTreeSet::len).unwrap_or(0)
        }

        pub fn is_empty(&self, key: &str) -> bool {
            self.len(key) == 0
        }

        fn add(&self, key: &str, member: Vec<u8>) {
            let mut store = self.store.lock().unwrap();
            store.sets.entry(key.to_string()).or_default().insert(member);
        }

        fn injected(flag: &AtomicBool, op: &str) -> Result<()> {
            if flag.load(Ordering::SeqCst) {
                return Err(QueueError::Driver(format!("injected {} failure", op)));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl Driver for InMemoryDriver {
        async fn write(&self, active_key: &str, data: &[u8]) -> Result<()> {
            self.write_calls.fetch_add(1, Ordering::SeqCst);
            Self::injected(&self.fail_writes, "write")?;
            self.add(active_key, data.to_vec());
            Ok(())
        }

        async fn read(&self, active_key: &str) -> Result<Option<Vec<u8>>> {
            self.read_calls.fetch_add(1, Ordering::SeqCst);
            Self::injected(&self.fail_reads, "read")?;
            let mut store = self.store.lock().unwrap();
            Ok(store.sets.get_mut(active_key).and_then(|set| set.pop_first()))
        }

        async fn set_processed(&self, stats_key: &str) -> Result<()> {
            self.processed_calls.fetch_add(1, Ordering::SeqCst);
            Self::injected(&self.fail_stats, "set_processed")?;
            let mut store = self.store.lock().unwrap();
            *store
                .counters
                .entry(keys::processed_key(stats_key))
                .or_insert(0) += 1;
            Ok(())
        }

        async fn set_failed(&self, stats_key: &str, message_id: &str) -> Result<()> {
            self.failed_calls.fetch_add(1, Ordering::SeqCst);
            Self::injected(&self.fail_stats, "set_failed")?;
            self.add(&keys::failed_key(stats_key), message_id.as_bytes().to_vec());
            Ok(())
        }

        async fn register(&self, queue: &str) -> Result<()> {
            self.register_calls.fetch_add(1, Ordering::SeqCst);
            Self::injected(&self.fail_register, "register")?;
            self.add(&keys::registry_key(), queue.as_bytes().to_vec());
            Ok(())
        }

        async fn get_stats(&self) -> Result<Stats> {
            let store = self.store.lock().unwrap();
            let mut stats = Stats::new();

            let queues = store
                .sets
                .get(&keys::registry_key())
                .cloned()
                .unwrap_or_default();

            for raw in queues {
                let queue = String::from_utf8_lossy(&raw).into_owned();
                let base = keys::stats_key(&queue);
                let processed = store
                    .counters
                    .get(&keys::processed_key(&base))
                    .map(|n| n.to_string());
                let failed_ids = store
                    .sets
                    .get(&keys::failed_key(&base))
                    .map(|set| {
                        set.iter()
                            .map(|id| String::from_utf8_lossy(id).into_owned())
                            .collect()
                    })
                    .unwrap_or_default();

                stats.insert(queue, Stat::from_raw(processed.as_deref(), failed_ids));
            }

            Ok(stats)
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[tokio::test]
        async fn test_read_pops_until_empty() {
            let driver = InMemoryDriver::new();
            driver.write("k", b"a").await.unwrap();
            driver.write("k", b"b").await.unwrap();

            assert!(driver.read("k").await.unwrap().is_some());
            assert!(driver.read("k").await.unwrap().is_some());
            assert_eq!(driver.read("k").await.unwrap(), None);
            assert_eq!(driver.calls().read, 3);
        }

        #[tokio::test]
        async fn test_identical_writes_coalesce() {
            let driver = InMemoryDriver::new();
            driver.write("k", b"same").await.unwrap();
            driver.write("k", b"same").await.unwrap();
            assert_eq!(driver.len("k"), 1);
        }

        #[tokio::test]
        async fn test_injected_failures() {
            let driver = InMemoryDriver::new();
            driver.fail_writes(true);
            driver.fail_reads(true);
            assert!(matches!(
                driver.write("k", b"x").await,
                Err(QueueError::Driver(_))
            ));
            assert!(matches!(driver.read("k").await, Err(QueueError::Driver(_))));
        }
    }
}
