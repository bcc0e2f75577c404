//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use notecode_core::ports::{AuthStore, EntityStore};
use std::sync::Arc;

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn EntityStore>,
    pub auth: Arc<dyn AuthStore>,
    pub config: Arc<Config>,
}

impl AppState {
    /// Builds the state from a single adapter implementing both storage ports.
    pub fn new<S>(store: Arc<S>, config: Arc<Config>) -> Self
    where
        S: EntityStore + AuthStore + 'static,
    {
        Self {
            store: store.clone(),
            auth: store,
            config,
        }
    }
}
