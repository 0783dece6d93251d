use axum::{
    Json,
    body::Bytes,
    extract::{Query, State, rejection::QueryRejection},
};
use egglink_core::{DeviceId, normalize_bytes, short_id};
use tracing::{error, info, warn};

use crate::AppState;
use crate::store::DeviceStore;

use super::error::ApiError;
use super::models::{Ack, DeviceQuery, HistoryEntry, HistoryQuery};

/// POST /data
///
/// The body is read as JSON whatever the declared content type, since the
/// devices do not always set one.
pub async fn ingest<S>(
    State(state): State<AppState<S>>,
    body: Bytes,
) -> Result<Json<Ack>, ApiError>
where
    S: DeviceStore,
{
    let sample = normalize_bytes(&body, state.coercion).map_err(|e| {
        warn!(error = %e, "rejected payload");
        ApiError::from(e)
    })?;

    let reading = state.store.append(sample).await.map_err(|e| {
        error!(error = ?e, "failed to store reading");
        ApiError::Internal(e.to_string())
    })?;

    state.forwarder.forward(reading.fields.clone());

    info!(
        device_id = %reading.device_id,
        short_id = %short_id(&reading.device_id),
        "reading received"
    );

    Ok(Json(Ack::ok()))
}

/// GET /api/history?uid=&limit=
pub async fn history<S>(
    State(state): State<AppState<S>>,
    query: Result<Query<HistoryQuery>, QueryRejection>,
) -> Result<Json<Vec<HistoryEntry>>, ApiError>
where
    S: DeviceStore,
{
    let Query(params) = query?;
    let Some(id) = requested_device(params.uid) else {
        return Ok(Json(Vec::new()));
    };

    let readings = match params.limit {
        Some(limit) => state.store.recent(&id, limit).await,
        None => state.store.snapshot(&id).await,
    }
    .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok(Json(readings.into_iter().map(HistoryEntry::from).collect()))
}

/// GET /api/latest?uid=
pub async fn latest<S>(
    State(state): State<AppState<S>>,
    query: Result<Query<DeviceQuery>, QueryRejection>,
) -> Result<Json<Option<HistoryEntry>>, ApiError>
where
    S: DeviceStore,
{
    let Query(params) = query?;
    let Some(id) = requested_device(params.uid) else {
        return Ok(Json(None));
    };

    let reading = state
        .store
        .latest(&id)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok(Json(reading.map(HistoryEntry::from)))
}

/// POST /clear
pub async fn clear<S>(State(state): State<AppState<S>>) -> Result<Json<Ack>, ApiError>
where
    S: DeviceStore,
{
    state
        .store
        .clear()
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    info!("all device histories cleared");

    Ok(Json(Ack::ok()))
}

fn requested_device(uid: Option<String>) -> Option<DeviceId> {
    uid.filter(|uid| !uid.is_empty()).map(DeviceId::from)
}
