use serde_json::Value;

use crate::{
    error::AppError,
    models::user::{ProfilePatch, UserProfile},
    services::user_profile_path,
    state::AppState,
};

pub async fn load_profile(state: &AppState, user_uuid: &str) -> Result<UserProfile, AppError> {
    let path = user_profile_path(user_uuid);
    let value = state.documents.read(&path).await?.ok_or(AppError::NotFound)?;
    let profile = serde_json::from_value(value).map_err(|err| AppError::Other(err.into()))?;
    Ok(profile)
}

pub async fn update_profile(
    state: &AppState,
    user_uuid: &str,
    patch: &ProfilePatch,
) -> Result<(), AppError> {
    let partial = serde_json::to_value(patch).map_err(|err| AppError::Other(err.into()))?;
    if partial.as_object().map(|o| o.is_empty()).unwrap_or(true) {
        return Ok(());
    }
    state
        .documents
        .merge(&user_profile_path(user_uuid), &partial)
        .await
}

/// Upload a profile photo to the blob store and record its URL on the
/// profile document. Returns the URL.
pub async fn set_profile_photo(
    state: &AppState,
    user_uuid: &str,
    filename: &str,
    bytes: &[u8],
) -> Result<String, AppError> {
    let url = state.media.store(user_uuid, filename, bytes).await?;
    let patch = ProfilePatch {
        photo_url: Some(url.clone()),
        ..ProfilePatch::default()
    };
    update_profile(state, user_uuid, &patch).await?;
    Ok(url)
}

/// Profile node kept in the realtime store, written at registration.
pub async fn write_realtime_profile(
    state: &AppState,
    user_uuid: &str,
    profile: &Value,
) -> Result<(), AppError> {
    let path = format!("{}/profile", user_profile_path(user_uuid));
    state.realtime.put(&path, profile).await
}
