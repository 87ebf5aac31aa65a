use tracing::error;

use crate::{
    error::AppError,
    models::trip::TripRecord,
    services::{documents::DocumentStore, realtime::RealtimeStore, user_trips_path},
};

/// Write `record` to both stores under one freshly generated trip id and
/// return that id.
///
/// Realtime first, documents second; there is no rollback of the first
/// write if the second fails. Either failure collapses into the one
/// generic `SaveFailed` the review screen shows — the underlying cause
/// only reaches the log.
pub async fn save_trip(
    realtime: &dyn RealtimeStore,
    documents: &dyn DocumentStore,
    record: &TripRecord,
) -> Result<String, AppError> {
    let trips_path = user_trips_path(&record.user_id);
    let trip_id = realtime.generate_key(&trips_path);
    let trip_path = format!("{trips_path}/{trip_id}");

    let value = serde_json::to_value(record).map_err(|err| AppError::Other(err.into()))?;

    if let Err(err) = realtime.put(&trip_path, &value).await {
        error!("realtime write failed at {trip_path}: {err}");
        return Err(AppError::SaveFailed);
    }
    if let Err(err) = documents.write(&trip_path, &value).await {
        error!("document write failed at {trip_path}: {err}");
        return Err(AppError::SaveFailed);
    }

    Ok(trip_id)
}
