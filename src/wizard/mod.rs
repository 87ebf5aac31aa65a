//! The trip wizard: a three-step, step-gated entry flow whose confirmed
//! output is normalized and dual-written to both trip stores.

mod draft;
mod normalize;
mod persist;
mod validate;

pub use draft::DraftStore;
pub use normalize::normalize;
pub use persist::save_trip;
pub use validate::{validate_basics, validate_full, validate_itinerary, ValidTrip};

use tracing::info;

use crate::{
    auth::AuthenticatedUser,
    error::AppError,
    models::trip::{EventItem, TripDraft, TripPatch},
    state::AppState,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WizardStep {
    TripDetails,
    Itinerary,
    Review,
}

/// One wizard session: owns its draft, tracks the current step, and runs
/// the save pipeline on confirm.
///
/// The step field only mirrors where the user is; `confirm` re-validates
/// the whole draft regardless, since screen-level gating can be bypassed
/// by navigating directly to review.
#[derive(Debug, Default)]
pub struct WizardSession {
    store: DraftStore,
    step: Option<WizardStep>,
}

impl WizardSession {
    pub fn new() -> Self {
        Self {
            store: DraftStore::new(),
            step: Some(WizardStep::TripDetails),
        }
    }

    pub fn step(&self) -> WizardStep {
        self.step.unwrap_or(WizardStep::TripDetails)
    }

    pub fn draft(&self) -> &TripDraft {
        self.store.draft()
    }

    /// Commit step 1. The patch only lands in the draft store once it
    /// validates; on failure the draft is untouched and the session stays
    /// on the details step.
    pub fn submit_basics(&mut self, patch: TripPatch) -> Result<(), AppError> {
        let mut candidate = self.store.draft().clone();
        draft::merge(&mut candidate, patch.clone());
        validate_basics(&candidate)?;

        self.store.patch(patch);
        self.step = Some(WizardStep::Itinerary);
        Ok(())
    }

    /// Commit step 2: the supplied events replace the draft's itinerary.
    pub fn submit_itinerary(&mut self, events: Vec<EventItem>) -> Result<(), AppError> {
        let mut candidate = self.store.draft().clone();
        candidate.itinerary = events.clone();
        validate_itinerary(&candidate)?;

        self.store.patch(TripPatch {
            itinerary: Some(events),
            ..TripPatch::default()
        });
        self.step = Some(WizardStep::Review);
        Ok(())
    }

    /// Submit the trip: final validation pass, then normalization, then
    /// the dual write. On any failure the draft stays in the store and the
    /// session remains on review, so the user can correct or retry. On
    /// success the draft is cleared and the session is over.
    pub async fn confirm(
        &mut self,
        state: &AppState,
        user: Option<&AuthenticatedUser>,
    ) -> Result<String, AppError> {
        let valid = validate_full(self.store.draft())?;
        let user = user.ok_or(AppError::Unauthenticated)?;

        let record = normalize(&valid, &user.uuid);
        self.step = Some(WizardStep::Review);
        let trip_id = save_trip(state.realtime.as_ref(), state.documents.as_ref(), &record).await?;

        info!("saved trip {trip_id} for user {}", user.username);
        self.store.reset();
        self.step = None;
        Ok(trip_id)
    }

    /// Discard the draft and end the session.
    pub fn cancel(&mut self) {
        self.store.reset();
        self.step = None;
    }

    pub fn is_finished(&self) -> bool {
        self.step.is_none()
    }
}
