use axum::{Json, extract::State};

use crate::AppState;
use crate::store::{DeviceStore, StoreStats};

use super::error::ApiError;
use super::models::DeviceResponse;

/// GET /api/devices
///
/// Every device with at least one reading, alarms first, then online
/// devices, then by display suffix.
pub async fn list_devices<S>(
    State(state): State<AppState<S>>,
) -> Result<Json<Vec<DeviceResponse>>, ApiError>
where
    S: DeviceStore,
{
    let latest = state
        .store
        .snapshot_all()
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    let devices = state
        .status
        .overview(latest, jiff::Timestamp::now())
        .into_iter()
        .map(DeviceResponse::from)
        .collect();

    Ok(Json(devices))
}

/// GET /api/stats
pub async fn stats<S>(State(state): State<AppState<S>>) -> Result<Json<StoreStats>, ApiError>
where
    S: DeviceStore,
{
    let stats = state
        .store
        .stats()
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok(Json(stats))
}
