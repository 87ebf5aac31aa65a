use std::{
    fmt,
    fs::File,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use cucumber::{given, then, when, World as _};
use serde_json::Value;
use tempfile::TempDir;
use wayfarer::{
    auth::{self, AuthenticatedUser},
    config::AppConfig,
    db::init_pool,
    error::AppError,
    models::trip::{EventItem, TripPatch, TripRecord},
    services::{
        documents::{DocumentStore, FileDocuments},
        media::MediaService,
        profile,
        realtime::MemoryRealtime,
        user_trips_path,
    },
    state::AppState,
    wizard::{self, WizardSession, WizardStep},
};

#[derive(Debug, cucumber::World, Default)]
struct AppWorld {
    state: Option<TestState>,
    traveler: Option<AuthenticatedUser>,
    session: Option<WizardSession>,
    last_error: Option<AppError>,
    last_trip_id: Option<String>,
    saved_record: Option<TripRecord>,
    normalized_pair: Option<(TripRecord, TripRecord)>,
    photo_url: Option<String>,
}

impl AppWorld {
    fn app_state(&self) -> &AppState {
        self.state
            .as_ref()
            .expect("state must be initialised first")
            .app()
    }

    fn wizard(&mut self) -> &mut WizardSession {
        self.session
            .as_mut()
            .expect("wizard session must be started first")
    }
}

struct TestState {
    app: AppState,
    fail_documents: Arc<AtomicBool>,
    _root: TempDir,
}

impl fmt::Debug for TestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestState").finish()
    }
}

impl TestState {
    async fn new() -> anyhow::Result<Self> {
        let root = TempDir::new().context("create temp dir for bdd world")?;
        let data_root = root.path().join("data");
        let media_root = root.path().join("media");
        std::fs::create_dir_all(&data_root)?;
        std::fs::create_dir_all(&media_root)?;

        let db_path = root.path().join("bdd.sqlite");
        File::create(&db_path)?;
        let database_url = format!("sqlite://{}", db_path.to_string_lossy());

        let config = AppConfig {
            database_url: database_url.clone(),
            data_root: data_root.clone(),
            media_root: media_root.clone(),
        };

        let db = init_pool(&config.database_url).await?;
        sqlx::migrate!("./migrations").run(&db).await?;

        let documents = FileDocuments::new(data_root);
        documents.ensure_structure().await?;
        let fail_documents = Arc::new(AtomicBool::new(false));
        let documents = FlakyDocuments {
            inner: documents,
            fail_writes: fail_documents.clone(),
        };

        let media = MediaService::new(media_root);
        media.ensure_structure().await?;

        let app = AppState::new(
            config,
            db,
            Arc::new(MemoryRealtime::new()),
            Arc::new(documents),
            media,
        );
        Ok(Self {
            app,
            fail_documents,
            _root: root,
        })
    }

    fn app(&self) -> &AppState {
        &self.app
    }
}

/// Document store whose writes can be switched off to simulate an outage
/// of the durable store during the dual write.
#[derive(Clone)]
struct FlakyDocuments {
    inner: FileDocuments,
    fail_writes: Arc<AtomicBool>,
}

#[async_trait]
impl DocumentStore for FlakyDocuments {
    async fn write(&self, path: &str, value: &Value) -> Result<(), AppError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(AppError::BadRequest("injected document store outage".into()));
        }
        self.inner.write(path, value).await
    }

    async fn read(&self, path: &str) -> Result<Option<Value>, AppError> {
        self.inner.read(path).await
    }

    async fn merge(&self, path: &str, partial: &Value) -> Result<(), AppError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(AppError::BadRequest("injected document store outage".into()));
        }
        self.inner.merge(path, partial).await
    }
}

fn departure_date() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 12, 1, 0, 0, 0).single().expect("valid date")
}

fn return_date() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 12, 10, 0, 0, 0).single().expect("valid date")
}

fn checkin_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 12, 1, 14, 0, 0).single().expect("valid time")
}

/// The known-good step-1 input (the Goa scenario).
fn valid_details() -> TripPatch {
    TripPatch {
        trip_name: Some("Beach".into()),
        destination: Some("Goa".into()),
        departure: Some("Delhi".into()),
        adults: Some("2".into()),
        children: Some("0".into()),
        departure_date: Some(departure_date()),
        return_date: Some(return_date()),
        budget: Some("medium".into()),
        itinerary: None,
    }
}

fn valid_itinerary() -> Vec<EventItem> {
    vec![EventItem {
        name: "Check-in".into(),
        time: Some(checkin_time()),
    }]
}

fn override_field(patch: &mut TripPatch, field: &str, value: &str) {
    let date = |v: &str| -> Option<DateTime<Utc>> {
        let date = chrono::NaiveDate::parse_from_str(v, "%Y-%m-%d").ok()?;
        Some(DateTime::from_naive_utc_and_offset(
            date.and_hms_opt(0, 0, 0)?,
            Utc,
        ))
    };
    match field {
        "tripName" => patch.trip_name = Some(value.to_string()),
        "destination" => patch.destination = Some(value.to_string()),
        "departure" => patch.departure = Some(value.to_string()),
        "adults" => patch.adults = Some(value.to_string()),
        "children" => patch.children = Some(value.to_string()),
        "budget" => patch.budget = Some(value.to_string()),
        "departureDate" => patch.departure_date = date(value),
        "returnDate" => patch.return_date = date(value),
        other => panic!("unknown draft field {other}"),
    }
}

// ---------------------------------------------------------------------------
// Shared givens

#[given("a fresh application state")]
async fn given_fresh_state(world: &mut AppWorld) {
    world.state = Some(TestState::new().await.expect("state"));
    world.traveler = None;
    world.session = None;
    world.last_error = None;
    world.last_trip_id = None;
    world.saved_record = None;
}

#[given(regex = r#"^a logged-in traveler \"([^\"]+)\"$"#)]
async fn given_logged_in_traveler(world: &mut AppWorld, username: String) {
    register_traveler(
        world,
        username.clone(),
        format!("{username}@example.com"),
        "wanderlust1".into(),
    )
    .await;
    let authed = auth::authenticate_user(world.app_state(), &username, "wanderlust1")
        .await
        .expect("authenticate registered traveler");
    world.traveler = Some(authed);
}

#[given("a new trip wizard session")]
async fn given_new_session(world: &mut AppWorld) {
    world.session = Some(WizardSession::new());
}

#[given(regex = r#"^a complete draft for \"([^\"]+)\" to \"([^\"]+)\"$"#)]
async fn given_complete_draft(world: &mut AppWorld, trip_name: String, destination: String) {
    let mut session = WizardSession::new();
    let mut patch = valid_details();
    patch.trip_name = Some(trip_name);
    patch.destination = Some(destination);
    session.submit_basics(patch).expect("valid details");
    session
        .submit_itinerary(valid_itinerary())
        .expect("valid itinerary");
    world.session = Some(session);
}

// ---------------------------------------------------------------------------
// Accounts

#[when(regex = r#"^I register a traveler \"([^\"]+)\" with email \"([^\"]+)\" and password \"([^\"]+)\"$"#)]
async fn when_register(world: &mut AppWorld, username: String, email: String, password: String) {
    register_traveler(world, username, email, password).await;
}

#[then(regex = r#"^I can authenticate as \"([^\"]+)\" using password \"([^\"]+)\"$"#)]
async fn then_can_authenticate(world: &mut AppWorld, identifier: String, password: String) {
    let authed = auth::authenticate_user(world.app_state(), &identifier, &password)
        .await
        .expect("authentication");
    assert_eq!(authed.username, identifier);
}

#[then(regex = r#"^registration fails with \"([^\"]+)\"$"#)]
async fn then_registration_fails(world: &mut AppWorld, message: String) {
    match world.last_error.take() {
        Some(AppError::BadRequest(msg)) => assert_eq!(msg, message),
        other => panic!("expected a bad-request error, got {other:?}"),
    }
}

#[then(regex = r#"^the profile for \"([^\"]+)\" exists in both stores$"#)]
async fn then_profile_in_both_stores(world: &mut AppWorld, username: String) {
    let traveler = world.traveler.clone().expect("registered traveler");
    let app = world.app_state();

    let profile = profile::load_profile(app, &traveler.uuid)
        .await
        .expect("profile document");
    assert_eq!(profile.username, username);

    let realtime_profile = app
        .realtime
        .get(&format!("users/{}/profile", traveler.uuid))
        .await
        .expect("realtime read");
    let realtime_profile = realtime_profile.expect("realtime profile node");
    assert_eq!(
        realtime_profile.get("username").and_then(Value::as_str),
        Some(username.as_str())
    );
}

async fn register_traveler(world: &mut AppWorld, username: String, email: String, password: String) {
    let result = auth::register_user(
        world.app_state(),
        "Mira",
        "Traveler",
        &username,
        &email,
        &password,
    )
    .await;
    match result {
        Ok(user) => world.traveler = Some(user),
        Err(err) => world.last_error = Some(err),
    }
}

// ---------------------------------------------------------------------------
// Wizard steps

#[when("I submit valid trip details")]
async fn when_submit_valid_details(world: &mut AppWorld) {
    let result = world.wizard().submit_basics(valid_details());
    world.last_error = result.err();
}

#[when(regex = r#"^I submit trip details with the \"([^\"]+)\" field set to \"([^\"]*)\"$"#)]
async fn when_submit_details_with(world: &mut AppWorld, field: String, value: String) {
    let mut patch = valid_details();
    override_field(&mut patch, &field, &value);
    let result = world.wizard().submit_basics(patch);
    world.last_error = result.err();
}

#[when("I submit trip details missing both trip name and destination")]
async fn when_submit_details_missing_two(world: &mut AppWorld) {
    let mut patch = valid_details();
    patch.trip_name = Some(String::new());
    patch.destination = Some(String::new());
    let result = world.wizard().submit_basics(patch);
    world.last_error = result.err();
}

#[when("I submit an empty itinerary")]
async fn when_submit_empty_itinerary(world: &mut AppWorld) {
    let result = world.wizard().submit_itinerary(Vec::new());
    world.last_error = result.err();
}

#[when("I submit a valid single-event itinerary")]
async fn when_submit_valid_itinerary(world: &mut AppWorld) {
    let result = world.wizard().submit_itinerary(valid_itinerary());
    world.last_error = result.err();
}

#[when(regex = r#"^I submit an itinerary with events \"([^\"]+)\" and \"([^\"]+)\"$"#)]
async fn when_submit_two_events(world: &mut AppWorld, first: String, second: String) {
    let events = vec![
        EventItem {
            name: first,
            time: Some(checkin_time()),
        },
        EventItem {
            name: second,
            time: Some(Utc.with_ymd_and_hms(2024, 12, 1, 19, 30, 0).single().expect("valid time")),
        },
    ];
    let result = world.wizard().submit_itinerary(events);
    world.last_error = result.err();
}

#[when("I submit an itinerary whose second event has no name")]
async fn when_submit_unnamed_second_event(world: &mut AppWorld) {
    let mut events = valid_itinerary();
    events.push(EventItem {
        name: "  ".into(),
        time: Some(checkin_time()),
    });
    let result = world.wizard().submit_itinerary(events);
    world.last_error = result.err();
}

#[when("I submit an itinerary whose first event has no time")]
async fn when_submit_timeless_first_event(world: &mut AppWorld) {
    let events = vec![EventItem {
        name: "Check-in".into(),
        time: None,
    }];
    let result = world.wizard().submit_itinerary(events);
    world.last_error = result.err();
}

#[then(regex = r#"^the wizard reports \"([^\"]*)\" for field \"([^\"]+)\"$"#)]
async fn then_wizard_reports(world: &mut AppWorld, expected_reason: String, expected_field: String) {
    match world.last_error.take() {
        Some(AppError::Validation { field, reason }) => {
            assert_eq!(reason, expected_reason);
            assert_eq!(field, expected_field);
        }
        other => panic!("expected a validation error, got {other:?}"),
    }
}

#[then(regex = r"^the wizard is (?:still )?on the (trip details|itinerary|review) step$")]
async fn then_wizard_on_step(world: &mut AppWorld, step_name: String) {
    let expected = match step_name.as_str() {
        "trip details" => WizardStep::TripDetails,
        "itinerary" => WizardStep::Itinerary,
        "review" => WizardStep::Review,
        other => panic!("unknown step {other}"),
    };
    assert_eq!(world.wizard().step(), expected);
}

// ---------------------------------------------------------------------------
// Confirmation and persistence

#[when("I confirm the trip")]
async fn when_confirm_trip(world: &mut AppWorld) {
    confirm(world, true).await;
}

#[when("I confirm the trip while logged out")]
async fn when_confirm_logged_out(world: &mut AppWorld) {
    confirm(world, false).await;
}

async fn confirm(world: &mut AppWorld, logged_in: bool) {
    let app = world
        .state
        .as_ref()
        .expect("state must be initialised first")
        .app()
        .clone();
    let traveler = if logged_in { world.traveler.clone() } else { None };
    let session = world.wizard();
    match session.confirm(&app, traveler.as_ref()).await {
        Ok(trip_id) => {
            let path = format!("{}/{}", user_trips_path(&traveler.expect("logged in").uuid), trip_id);
            let value = app
                .documents
                .read(&path)
                .await
                .expect("document read")
                .expect("saved trip document");
            world.saved_record =
                Some(serde_json::from_value(value).expect("saved trip decodes as a record"));
            world.last_trip_id = Some(trip_id);
            world.last_error = None;
        }
        Err(err) => world.last_error = Some(err),
    }
}

#[then("the trip is saved")]
async fn then_trip_saved(world: &mut AppWorld) {
    assert!(
        world.last_error.is_none(),
        "unexpected error: {:?}",
        world.last_error
    );
    assert!(world.last_trip_id.is_some());
    assert!(world.wizard().is_finished());
}

#[then("saving fails")]
async fn then_saving_fails(world: &mut AppWorld) {
    match world.last_error.take() {
        Some(AppError::SaveFailed) => {}
        other => panic!("expected a save failure, got {other:?}"),
    }
}

#[then("the save is rejected as unauthenticated")]
async fn then_save_unauthenticated(world: &mut AppWorld) {
    match world.last_error.take() {
        Some(AppError::Unauthenticated) => {}
        other => panic!("expected an unauthenticated error, got {other:?}"),
    }
}

#[then("the draft is retained for retry")]
async fn then_draft_retained(world: &mut AppWorld) {
    let session = world.wizard();
    assert!(!session.is_finished());
    assert_eq!(session.step(), WizardStep::Review);
    assert!(!session.draft().trip_name.is_empty());
    assert!(!session.draft().itinerary.is_empty());
}

#[then("both stores hold the trip record")]
async fn then_both_stores_hold_record(world: &mut AppWorld) {
    let traveler = world.traveler.clone().expect("logged-in traveler");
    let trip_id = world.last_trip_id.clone().expect("saved trip id");
    let path = format!("{}/{}", user_trips_path(&traveler.uuid), trip_id);
    let app = world.app_state();

    let realtime = app
        .realtime
        .get(&path)
        .await
        .expect("realtime read")
        .expect("realtime trip value");
    let document = app
        .documents
        .read(&path)
        .await
        .expect("document read")
        .expect("trip document");
    assert_eq!(realtime, document);
}

#[then(regex = r"^the realtime store holds (\d+) trips? and the document store (\d+)$")]
async fn then_store_counts(world: &mut AppWorld, realtime_count: usize, document_count: usize) {
    let traveler = world.traveler.clone().expect("logged-in traveler");
    let trips_path = user_trips_path(&traveler.uuid);
    let app = world.app_state();

    let realtime_trips = app.realtime.children(&trips_path).await.expect("children");
    assert_eq!(realtime_trips.len(), realtime_count);

    let mut documents = 0;
    let dir = app.config.data_root.join("users").join(&traveler.uuid).join("trips");
    if dir.exists() {
        documents = std::fs::read_dir(dir).expect("read trips dir").count();
    }
    assert_eq!(documents, document_count);
}

#[given("the document store is failing")]
async fn given_documents_failing(world: &mut AppWorld) {
    world
        .state
        .as_ref()
        .expect("state must be initialised first")
        .fail_documents
        .store(true, Ordering::SeqCst);
}

#[given("the document store has recovered")]
async fn given_documents_recovered(world: &mut AppWorld) {
    world
        .state
        .as_ref()
        .expect("state must be initialised first")
        .fail_documents
        .store(false, Ordering::SeqCst);
}

// ---------------------------------------------------------------------------
// Saved-record assertions

#[then(regex = r#"^the saved record has budget \"([^\"]+)\", (\d+) adults and (\d+) children$"#)]
async fn then_record_counts(world: &mut AppWorld, budget: String, adults: u32, children: u32) {
    let record = world.saved_record.as_ref().expect("saved record");
    assert_eq!(record.budget, budget);
    assert_eq!(record.adults, adults);
    assert_eq!(record.children, children);
}

#[then(regex = r#"^the saved record has status \"([^\"]+)\" and belongs to the logged-in traveler$"#)]
async fn then_record_status_owner(world: &mut AppWorld, status: String) {
    let traveler = world.traveler.clone().expect("logged-in traveler");
    let record = world.saved_record.as_ref().expect("saved record");
    assert_eq!(record.status, status);
    assert_eq!(record.user_id, traveler.uuid);
}

#[then(regex = r#"^the saved record lists events \"([^\"]+)\" then \"([^\"]+)\"$"#)]
async fn then_record_event_order(world: &mut AppWorld, first: String, second: String) {
    let record = world.saved_record.as_ref().expect("saved record");
    let names: Vec<_> = record.itinerary.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec![first.as_str(), second.as_str()]);
}

#[then(regex = r#"^the stored departure date round-trips to \"([^\"]+)\"$"#)]
async fn then_departure_date_round_trips(world: &mut AppWorld, expected: String) {
    let traveler = world.traveler.clone().expect("logged-in traveler");
    let trip_id = world.last_trip_id.clone().expect("saved trip id");
    let path = format!("{}/{}", user_trips_path(&traveler.uuid), trip_id);

    let value = world
        .app_state()
        .documents
        .read(&path)
        .await
        .expect("document read")
        .expect("trip document");
    let raw = value
        .get("departureDate")
        .and_then(Value::as_str)
        .expect("departureDate is a timestamp string");
    let parsed = DateTime::parse_from_rfc3339(raw).expect("timestamp parses back");
    assert_eq!(parsed.date_naive().to_string(), expected);
}

// ---------------------------------------------------------------------------
// Normalization

#[when("I normalize the draft twice")]
async fn when_normalize_twice(world: &mut AppWorld) {
    let traveler = world.traveler.clone().expect("logged-in traveler");
    let draft = world.wizard().draft().clone();
    let valid = wizard::validate_full(&draft).expect("draft passes the final pass");
    let first = wizard::normalize(&valid, &traveler.uuid);
    let second = wizard::normalize(&valid, &traveler.uuid);
    world.normalized_pair = Some((first, second));
}

#[then("both normalized records match apart from creation time")]
async fn then_normalization_idempotent(world: &mut AppWorld) {
    let (first, second) = world.normalized_pair.take().expect("normalized records");
    let mut second = second;
    second.created_at = first.created_at;
    assert_eq!(first, second);
}

// ---------------------------------------------------------------------------
// Profile

#[when(regex = r#"^I upload a profile photo \"([^\"]+)\"$"#)]
async fn when_upload_photo(world: &mut AppWorld, filename: String) {
    let traveler = world.traveler.clone().expect("logged-in traveler");
    let url = profile::set_profile_photo(
        world.app_state(),
        &traveler.uuid,
        &filename,
        b"not-really-a-png",
    )
    .await
    .expect("photo upload");
    world.photo_url = Some(url);
}

#[then("the profile photo URL is a file URL")]
async fn then_photo_url_is_file(world: &mut AppWorld) {
    let url = world.photo_url.as_ref().expect("uploaded photo url");
    assert!(url.starts_with("file://"), "unexpected url: {url}");
}

#[then("the profile document records the photo URL")]
async fn then_profile_has_photo(world: &mut AppWorld) {
    let traveler = world.traveler.clone().expect("logged-in traveler");
    let loaded = profile::load_profile(world.app_state(), &traveler.uuid)
        .await
        .expect("profile document");
    assert_eq!(loaded.photo_url.as_deref(), world.photo_url.as_deref());
    // The merge must not have clobbered the registration fields.
    assert_eq!(loaded.firstname, "Mira");
}

#[tokio::main]
async fn main() {
    AppWorld::cucumber()
        .fail_on_skipped()
        .with_default_cli()
        .run("tests/features")
        .await;
}
