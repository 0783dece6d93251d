pub mod dashboard;
pub mod devices;
pub mod error;
pub mod models;
pub mod readings;

use axum::{
    Router,
    routing::{get, post},
};

use crate::AppState;
use crate::store::DeviceStore;

pub fn api_router<S>(state: AppState<S>) -> Router
where
    S: DeviceStore,
{
    Router::new()
        // Ingestion
        .route("/data", post(readings::ingest::<S>))
        // Queries
        .route("/api/history", get(readings::history::<S>))
        .route("/api/latest", get(readings::latest::<S>))
        .route("/api/devices", get(devices::list_devices::<S>))
        .route("/api/stats", get(devices::stats::<S>))
        // Admin
        .route("/clear", post(readings::clear::<S>))
        .merge(dashboard::dashboard_router())
        .with_state(state)
}
