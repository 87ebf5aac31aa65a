use crate::models::trip::{TripDraft, TripPatch};

/// Accumulates one in-progress trip across the wizard steps.
///
/// Pure accumulator: no validation happens here. One draft per session;
/// re-entering the wizard without `reset` continues the same draft.
#[derive(Debug, Default)]
pub struct DraftStore {
    draft: TripDraft,
}

impl DraftStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn draft(&self) -> &TripDraft {
        &self.draft
    }

    /// Shallow-merge `patch` into the draft. Unspecified fields stay as
    /// they are; a supplied itinerary replaces the whole sequence.
    pub fn patch(&mut self, patch: TripPatch) {
        merge(&mut self.draft, patch);
    }

    pub fn reset(&mut self) {
        self.draft = TripDraft::default();
    }
}

pub(crate) fn merge(draft: &mut TripDraft, patch: TripPatch) {
    if let Some(trip_name) = patch.trip_name {
        draft.trip_name = trip_name;
    }
    if let Some(destination) = patch.destination {
        draft.destination = destination;
    }
    if let Some(departure) = patch.departure {
        draft.departure = departure;
    }
    if let Some(adults) = patch.adults {
        draft.adults = adults;
    }
    if let Some(children) = patch.children {
        draft.children = children;
    }
    if let Some(departure_date) = patch.departure_date {
        draft.departure_date = Some(departure_date);
    }
    if let Some(return_date) = patch.return_date {
        draft.return_date = Some(return_date);
    }
    if let Some(budget) = patch.budget {
        draft.budget = budget;
    }
    if let Some(itinerary) = patch.itinerary {
        draft.itinerary = itinerary;
    }
}
