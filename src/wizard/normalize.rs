use chrono::Utc;

use crate::models::trip::{TripRecord, TRIP_STATUS_UPCOMING};
use crate::wizard::validate::ValidTrip;

/// Turn a validated draft into the persistence-ready record.
///
/// `created_at` is stamped here, at normalization time. The caller must
/// hold an authenticated user; `user_id` is its opaque uuid.
pub fn normalize(valid: &ValidTrip, user_id: &str) -> TripRecord {
    debug_assert!(!user_id.is_empty(), "normalize requires a logged-in user");

    TripRecord {
        trip_name: valid.trip_name.clone(),
        destination: valid.destination.clone(),
        departure: valid.departure.clone(),
        adults: valid.adults,
        children: valid.children,
        budget: valid.budget.label().to_string(),
        departure_date: valid.departure_date,
        return_date: valid.return_date,
        itinerary: valid.itinerary.clone(),
        created_at: Utc::now(),
        status: TRIP_STATUS_UPCOMING.to_string(),
        user_id: user_id.to_string(),
    }
}
