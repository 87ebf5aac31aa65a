use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// In-progress trip data accumulated across the wizard steps.
///
/// Everything here is raw user input: traveler counts stay numeric strings
/// and the budget stays whatever the picker handed over until the final
/// validation pass turns the draft into a [`crate::wizard::ValidTrip`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TripDraft {
    pub trip_name: String,
    pub destination: String,
    pub departure: String,
    pub adults: String,
    pub children: String,
    pub departure_date: Option<DateTime<Utc>>,
    pub return_date: Option<DateTime<Utc>>,
    pub budget: String,
    pub itinerary: Vec<EventItem>,
}

/// Partial update for a [`TripDraft`]. `None` leaves the field untouched;
/// a supplied `itinerary` replaces the whole sequence.
#[derive(Debug, Clone, Default)]
pub struct TripPatch {
    pub trip_name: Option<String>,
    pub destination: Option<String>,
    pub departure: Option<String>,
    pub adults: Option<String>,
    pub children: Option<String>,
    pub departure_date: Option<DateTime<Utc>>,
    pub return_date: Option<DateTime<Utc>>,
    pub budget: Option<String>,
    pub itinerary: Option<Vec<EventItem>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventItem {
    pub name: String,
    pub time: Option<DateTime<Utc>>,
}

/// Budget tier. Input is case-insensitive ("low", "LOW", "Low"); the
/// persisted form is always the capitalized label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Budget {
    Low,
    Medium,
    High,
}

impl Budget {
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_lowercase().as_str() {
            "low" => Some(Budget::Low),
            "medium" => Some(Budget::Medium),
            "high" => Some(Budget::High),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Budget::Low => "Low",
            Budget::Medium => "Medium",
            Budget::High => "High",
        }
    }
}

/// An itinerary entry whose time is known to be set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItineraryStop {
    pub name: String,
    pub time: DateTime<Utc>,
}

/// Finalized, validated, normalized trip data — the persisted form.
///
/// Field names follow the wire shape the trip screens expect: camelCase
/// except for `created_at` and `status`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripRecord {
    pub trip_name: String,
    pub destination: String,
    pub departure: String,
    pub adults: u32,
    pub children: u32,
    pub budget: String,
    pub departure_date: DateTime<Utc>,
    pub return_date: DateTime<Utc>,
    pub itinerary: Vec<ItineraryStop>,
    #[serde(rename = "created_at")]
    pub created_at: DateTime<Utc>,
    pub status: String,
    pub user_id: String,
}

pub const TRIP_STATUS_UPCOMING: &str = "upcoming";
