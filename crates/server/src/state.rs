//! Shared application state

use std::sync::Arc;

use claimcall_config::Settings;
use claimcall_core::ClaimStore;
use claimcall_engine::Reconciler;

/// State shared by every handler and the sweep scheduler
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ClaimStore>,
    pub reconciler: Arc<Reconciler>,
    pub settings: Arc<Settings>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn ClaimStore>,
        reconciler: Arc<Reconciler>,
        settings: Settings,
    ) -> Self {
        Self { store, reconciler, settings: Arc::new(settings) }
    }
}
