use crate::{
    error::AppError, models::trip::TripRecord, services::user_trips_path, state::AppState,
};

/// Saved trips for the trips screen, in the order they were written.
pub async fn list_trips(state: &AppState, user_uuid: &str) -> Result<Vec<TripRecord>, AppError> {
    let values = state.realtime.children(&user_trips_path(user_uuid)).await?;
    values
        .into_iter()
        .map(|value| serde_json::from_value(value).map_err(|err| AppError::Other(err.into())))
        .collect()
}
