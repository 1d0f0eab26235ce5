//! Application state shared across handlers.

use std::sync::Arc;

use pipeline::{Dispatcher, Stores};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Task dispatcher owning the pipeline components
    pub dispatcher: Arc<Dispatcher>,
}

impl AppState {
    pub fn new(stores: Stores) -> Self {
        Self {
            dispatcher: Arc::new(Dispatcher::new(stores)),
        }
    }
}
