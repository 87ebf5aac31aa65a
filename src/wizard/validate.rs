use chrono::{DateTime, Utc};

use crate::{
    error::AppError,
    models::trip::{Budget, ItineraryStop, TripDraft},
};

/// A draft that passed the final validation pass. This is the only way
/// data reaches the normalizer, so the normalizer never sees blank
/// fields, unparsed counts or missing dates.
#[derive(Debug, Clone)]
pub struct ValidTrip {
    pub(in crate::wizard) trip_name: String,
    pub(in crate::wizard) destination: String,
    pub(in crate::wizard) departure: String,
    pub(in crate::wizard) adults: u32,
    pub(in crate::wizard) children: u32,
    pub(in crate::wizard) departure_date: DateTime<Utc>,
    pub(in crate::wizard) return_date: DateTime<Utc>,
    pub(in crate::wizard) budget: Budget,
    pub(in crate::wizard) itinerary: Vec<ItineraryStop>,
}

/// Gate for step 1 → 2. Reports the first failing field only, in the
/// fixed order the review screen also uses.
pub fn validate_basics(draft: &TripDraft) -> Result<(), AppError> {
    if draft.trip_name.trim().is_empty() {
        return Err(AppError::validation("tripName", "Trip Name is required."));
    }
    if draft.destination.trim().is_empty() {
        return Err(AppError::validation("destination", "Destination is required."));
    }
    if draft.departure.trim().is_empty() {
        return Err(AppError::validation("departure", "Departure is required."));
    }
    if parse_count(&draft.adults).is_none() {
        return Err(AppError::validation("adults", "Adults must be a number."));
    }
    if parse_count(&draft.children).is_none() {
        return Err(AppError::validation("children", "Children must be a number."));
    }
    if draft.departure_date.is_none() {
        return Err(AppError::validation(
            "departureDate",
            "Departure Date is required.",
        ));
    }
    if draft.return_date.is_none() {
        return Err(AppError::validation("returnDate", "Return Date is required."));
    }
    if draft.budget.trim().is_empty() {
        return Err(AppError::validation("budget", "Budget is required."));
    }
    if Budget::parse(&draft.budget).is_none() {
        return Err(AppError::validation(
            "budget",
            "Budget must be low, medium or high.",
        ));
    }
    Ok(())
}

/// Gate for step 2 → 3. Event positions in messages are 1-based.
pub fn validate_itinerary(draft: &TripDraft) -> Result<(), AppError> {
    if draft.itinerary.is_empty() {
        return Err(AppError::validation(
            "itinerary",
            "At least one itinerary event is required.",
        ));
    }
    for (i, event) in draft.itinerary.iter().enumerate() {
        if event.name.trim().is_empty() {
            return Err(AppError::validation(
                "itinerary",
                format!("Event #{} name is required.", i + 1),
            ));
        }
        if event.time.is_none() {
            return Err(AppError::validation(
                "itinerary",
                format!("Event #{} time is required.", i + 1),
            ));
        }
    }
    Ok(())
}

/// Final pass, run on submission. Re-checks everything: the draft store
/// keeps no step boundaries, so earlier gates prove nothing about the
/// draft by the time the user confirms.
pub fn validate_full(draft: &TripDraft) -> Result<ValidTrip, AppError> {
    validate_basics(draft)?;
    validate_itinerary(draft)?;

    let itinerary = draft
        .itinerary
        .iter()
        .map(|event| ItineraryStop {
            name: event.name.clone(),
            // Checked by validate_itinerary above.
            time: event.time.expect("validated event has a time"),
        })
        .collect();

    Ok(ValidTrip {
        trip_name: draft.trip_name.clone(),
        destination: draft.destination.clone(),
        departure: draft.departure.clone(),
        adults: parse_count(&draft.adults).expect("validated adults count"),
        children: parse_count(&draft.children).expect("validated children count"),
        departure_date: draft.departure_date.expect("validated departure date"),
        return_date: draft.return_date.expect("validated return date"),
        budget: Budget::parse(&draft.budget).expect("validated budget"),
        itinerary,
    })
}

fn parse_count(input: &str) -> Option<u32> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse().ok()
}
