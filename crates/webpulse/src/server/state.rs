use std::sync::Arc;

use webpulse_core::{BridgeServices, CommandRouter};

/// Shared state for all handlers
pub struct AppState {
    pub services: Arc<BridgeServices>,
    pub router: CommandRouter,
    /// Empty tokens are treated as unset.
    pub admin_token: Option<String>,
}

impl AppState {
    pub fn new(services: Arc<BridgeServices>, admin_token: Option<String>) -> Arc<Self> {
        Arc::new(Self {
            router: CommandRouter::new(Arc::clone(&services)),
            services,
            admin_token: admin_token.filter(|t| !t.is_empty()),
        })
    }
}
