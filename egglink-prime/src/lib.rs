pub mod api;
pub mod config;
pub mod forward;
pub mod store;

use egglink_core::{CoercionPolicy, StatusPolicy};

use crate::forward::Forwarder;

/// Shared by every HTTP handler. Cloning is cheap; the store and the
/// forwarder are handles onto shared state.
#[derive(Clone)]
pub struct AppState<S> {
    pub store: S,
    pub forwarder: Forwarder,
    pub status: StatusPolicy,
    pub coercion: CoercionPolicy,
}

impl<S> AppState<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            forwarder: Forwarder::disabled(),
            status: StatusPolicy::default(),
            coercion: CoercionPolicy::default(),
        }
    }

    pub fn with_forwarder(self, forwarder: Forwarder) -> Self {
        Self { forwarder, ..self }
    }

    pub fn with_status_policy(self, status: StatusPolicy) -> Self {
        Self { status, ..self }
    }

    pub fn with_coercion(self, coercion: CoercionPolicy) -> Self {
        Self { coercion, ..self }
    }
}
