use std::{collections::HashMap, sync::Arc};
use tokio::sync::Mutex;

use crate::config::ServiceConfig;
use crate::store::VitalsStore;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServiceConfig>,
    pub store: Arc<dyn VitalsStore>,
    pub device_locks: Arc<Mutex<HashMap<String, Arc<Mutex<()>>>>>,
}

impl AppState {
    pub fn new(config: ServiceConfig, store: Arc<dyn VitalsStore>) -> Self {
        Self {
            config: Arc::new(config),
            store,
            device_locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Lock serialising read-then-insert sequences for one device in this process.
    pub async fn device_lock(&self, device_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.device_locks.lock().await;
        locks.entry(device_id.to_string()).or_default().clone()
    }
}
