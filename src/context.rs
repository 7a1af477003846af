use std::sync::Arc;

use crate::config::{Config, Environment};
use crate::database::store::Store;

/// What one invocation works with: the resolved configuration for its
/// environment and the store for its data set.
#[derive(Clone)]
pub struct AppContext {
    config: Arc<Config>,
    store: Arc<dyn Store>,
}

impl AppContext {
    pub fn new(config: Arc<Config>, store: Arc<dyn Store>) -> Self {
        Self { config, store }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &dyn Store {
        self.store.as_ref()
    }

    pub fn environment(&self) -> Environment {
        self.config.environment()
    }
}

/// Both data sets the server can act on; requests pick one with `?test=1`.
#[derive(Clone)]
pub struct AppState {
    pub live: AppContext,
    pub test: AppContext,
}

impl AppState {
    pub fn new(live: AppContext, test: AppContext) -> Self {
        Self { live, test }
    }

    pub fn select(&self, test: bool) -> &AppContext {
        if test {
            &self.test
        } else {
            &self.live
        }
    }
}
