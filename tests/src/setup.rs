//! Common test setup functions.

use std::sync::Arc;

use api::{router, AppState};
use axum::Router;
use growth_core::MemoryStore;
use pipeline::{Dispatcher, Stores};

/// Test context running the production code paths over the in-memory store.
///
/// The router, dispatcher, and components are the same objects production
/// wires up; only the store backend differs, and it implements the same
/// store traits as the ClickHouse one.
pub struct TestContext {
    pub store: Arc<MemoryStore>,
    pub dispatcher: Dispatcher,
    pub router: Router,
}

impl TestContext {
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let stores = Stores::from_backend(store.clone());
        let dispatcher = Dispatcher::new(stores.clone());
        let router = router(AppState::new(stores));

        Self {
            store,
            dispatcher,
            router,
        }
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}
