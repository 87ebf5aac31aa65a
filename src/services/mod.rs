pub mod documents;
pub mod media;
pub mod profile;
pub mod realtime;
pub mod trips;

/// Path of a user's profile document, shared by both stores.
pub fn user_profile_path(user_uuid: &str) -> String {
    format!("users/{user_uuid}")
}

/// Path of a user's trips collection, shared by both stores.
pub fn user_trips_path(user_uuid: &str) -> String {
    format!("users/{user_uuid}/trips")
}
