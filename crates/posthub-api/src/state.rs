use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use posthub_chain::Chain;
use posthub_db::Database;
use posthub_gateway::Dispatcher;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub chain: Arc<dyn Chain>,
    pub dispatcher: Dispatcher,
    /// Resolved display names keyed by lowercase address
    pub names: RwLock<HashMap<String, String>>,
}

impl AppStateInner {
    pub fn new(db: Database, chain: Arc<dyn Chain>, dispatcher: Dispatcher) -> Self {
        Self {
            db,
            chain,
            dispatcher,
            names: RwLock::new(HashMap::new()),
        }
    }

    pub fn cached_name(&self, address: &str) -> Option<String> {
        self.names.read().ok()?.get(address).cloned()
    }

    pub fn cache_name(&self, address: &str, name: &str) {
        if let Ok(mut names) = self.names.write() {
            names.insert(address.to_string(), name.to_string());
        }
    }

    pub fn forget_name(&self, address: &str) {
        if let Ok(mut names) = self.names.write() {
            names.remove(address);
        }
    }
}
