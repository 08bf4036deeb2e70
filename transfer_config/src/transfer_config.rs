use std::cell::RefCell;
use std::sync::Arc;

use crate::groups;

/// All configuration groups of the transfer stack.
#[derive(Debug, Clone, Default)]
pub struct TransferConfig {
    pub sparse_cache: groups::sparse_cache::ConfigValueGroup,
}

impl TransferConfig {
    /// Defaults with every `TRANSFER_*` environment override applied.
    pub fn new() -> Self {
        let mut config = Self::default();
        config.apply_env_overrides();
        config
    }

    pub fn apply_env_overrides(&mut self) {
        self.sparse_cache.apply_env_overrides();
    }
}

// Thread-local cache of the environment-derived config, so the environment is read once per thread.
thread_local! {
    static THREAD_CONFIG_REF: RefCell<Option<Arc<TransferConfig>>> = const { RefCell::new(None) };
}

pub fn transfer_config() -> Arc<TransferConfig> {
    if let Some(config) = THREAD_CONFIG_REF.with_borrow(|config| config.clone()) {
        return config;
    }

    let config = Arc::new(TransferConfig::new());
    THREAD_CONFIG_REF.set(Some(config.clone()));

    config
}
