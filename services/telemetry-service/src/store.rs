use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::record::VitalsRecord;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("postgres error: {0}")]
    Postgres(#[from] tokio_postgres::Error),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Append-only collection of vitals records.
#[async_trait]
pub trait VitalsStore: Send + Sync {
    async fn insert_one(&self, record: &VitalsRecord) -> Result<(), StoreError>;

    /// Most recent record for `device_id` by timestamp; later inserts win ties.
    async fn find_latest(&self, device_id: &str) -> Result<Option<VitalsRecord>, StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;
}

/// In-process store for local runs without a database and for tests.
#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<Vec<VitalsRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub async fn records(&self) -> Vec<VitalsRecord> {
        self.records.lock().await.clone()
    }
}

#[async_trait]
impl VitalsStore for MemoryStore {
    async fn insert_one(&self, record: &VitalsRecord) -> Result<(), StoreError> {
        self.records.lock().await.push(record.clone());
        Ok(())
    }

    async fn find_latest(&self, device_id: &str) -> Result<Option<VitalsRecord>, StoreError> {
        let records = self.records.lock().await;
        // max_by_key returns the last maximum, so equal timestamps resolve to the newest insert.
        let latest = records
            .iter()
            .filter(|record| record.device_id == device_id)
            .max_by_key(|record| record.timestamp)
            .cloned();
        Ok(latest)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
pub mod testing {
    use super::*;

    /// Store double that fails the selected operations.
    pub struct FailingStore {
        pub fail_reads: bool,
        pub fail_writes: bool,
        pub inner: MemoryStore,
    }

    impl FailingStore {
        pub fn writes() -> Self {
            Self {
                fail_reads: false,
                fail_writes: true,
                inner: MemoryStore::new(),
            }
        }

        pub fn reads() -> Self {
            Self {
                fail_reads: true,
                fail_writes: false,
                inner: MemoryStore::new(),
            }
        }
    }

    #[async_trait]
    impl VitalsStore for FailingStore {
        async fn insert_one(&self, record: &VitalsRecord) -> Result<(), StoreError> {
            if self.fail_writes {
                return Err(StoreError::Unavailable("insert rejected".to_string()));
            }
            self.inner.insert_one(record).await
        }

        async fn find_latest(&self, device_id: &str) -> Result<Option<VitalsRecord>, StoreError> {
            if self.fail_reads {
                return Err(StoreError::Unavailable("query rejected".to_string()));
            }
            self.inner.find_latest(device_id).await
        }

        async fn ping(&self) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("ping rejected".to_string()))
        }
    }
}
