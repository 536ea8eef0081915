use tracing_appender::non_blocking::WorkerGuard;

use crate::{
    backend::{memory_auth::MemoryAuth, memory_store::MemoryStore},
    infra::config::AppConfig,
};

/// Everything one process run shares: config plus the backend handles.
pub struct AppContext {
    pub config: AppConfig,
    pub store: MemoryStore,
    pub auth: MemoryAuth,
    /// Keeps the file log writer flushing until the context is dropped.
    pub log_guard: Option<WorkerGuard>,
}

impl AppContext {
    pub fn new(config: AppConfig, store: MemoryStore, auth: MemoryAuth) -> Self {
        Self {
            config,
            store,
            auth,
            log_guard: None,
        }
    }
}
