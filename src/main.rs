use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing::error;

use wayfarer::auth::{self, AuthenticatedUser};
use wayfarer::config::AppConfig;
use wayfarer::db::init_pool;
use wayfarer::error::AppError;
use wayfarer::models::trip::{EventItem, TripPatch};
use wayfarer::services::documents::FileDocuments;
use wayfarer::services::media::MediaService;
use wayfarer::services::realtime::MemoryRealtime;
use wayfarer::services::{profile, trips};
use wayfarer::state::AppState;
use wayfarer::wizard::WizardSession;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_logging();

    let config = AppConfig::from_env();
    let db = init_pool(&config.database_url).await?;

    if let Err(err) = sqlx::migrate!("./migrations").run(&db).await {
        error!("migration failed: {err:?}");
        return Err(AppError::Other(err.into()));
    }

    let documents = FileDocuments::new(config.data_root.clone());
    documents.ensure_structure().await?;

    let media = MediaService::new(config.media_root.clone());
    media.ensure_structure().await?;

    let realtime = MemoryRealtime::new();

    let state = AppState::new(
        config,
        db,
        Arc::new(realtime),
        Arc::new(documents),
        media,
    );

    let mut prompt = Prompt::new();
    run(&state, &mut prompt).await
}

fn init_logging() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let fmt_layer = tracing_subscriber::fmt::layer().with_target(false);
    let filter_layer = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,wayfarer=debug".into());

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .init();
}

struct Prompt {
    lines: Lines<BufReader<Stdin>>,
}

impl Prompt {
    fn new() -> Self {
        Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
        }
    }

    async fn ask(&mut self, label: &str) -> Result<String, AppError> {
        use std::io::Write;
        print!("{label}: ");
        std::io::stdout().flush()?;
        Ok(self.lines.next_line().await?.unwrap_or_default())
    }

    async fn confirm(&mut self, label: &str) -> Result<bool, AppError> {
        let answer = self.ask(&format!("{label} [y/n]")).await?;
        Ok(matches!(answer.trim(), "y" | "Y" | "yes"))
    }
}

async fn run(state: &AppState, prompt: &mut Prompt) -> Result<(), AppError> {
    println!("Wayfarer trip planner");
    let Some(user) = sign_in(state, prompt).await? else {
        return Ok(());
    };
    println!("Welcome, {}!", user.display_name);

    loop {
        let choice = prompt
            .ask("\n[1] new trip  [2] my trips  [3] profile photo  [q] quit")
            .await?;
        match choice.trim() {
            "1" => create_trip(state, prompt, &user).await?,
            "2" => show_trips(state, &user).await?,
            "3" => upload_photo(state, prompt, &user).await?,
            "q" | "Q" => return Ok(()),
            _ => println!("Unknown choice."),
        }
    }
}

async fn sign_in(
    state: &AppState,
    prompt: &mut Prompt,
) -> Result<Option<AuthenticatedUser>, AppError> {
    loop {
        let choice = prompt.ask("[l] log in  [r] register  [q] quit").await?;
        match choice.trim() {
            "l" | "L" => {
                let identifier = prompt.ask("Username or email").await?;
                let password = prompt.ask("Password").await?;
                match auth::authenticate_user(state, &identifier, &password).await {
                    Ok(user) => return Ok(Some(user)),
                    Err(AppError::Unauthenticated) => {
                        println!("Login failed - check your credentials.")
                    }
                    Err(err) => return Err(err),
                }
            }
            "r" | "R" => {
                let firstname = prompt.ask("First name").await?;
                let lastname = prompt.ask("Last name").await?;
                let username = prompt.ask("Username").await?;
                let email = prompt.ask("Email").await?;
                let password = prompt.ask("Password").await?;
                match auth::register_user(
                    state, &firstname, &lastname, &username, &email, &password,
                )
                .await
                {
                    Ok(user) => return Ok(Some(user)),
                    Err(AppError::BadRequest(msg)) => println!("{msg}"),
                    Err(err) => return Err(err),
                }
            }
            "q" | "Q" => return Ok(None),
            _ => println!("Unknown choice."),
        }
    }
}

async fn create_trip(
    state: &AppState,
    prompt: &mut Prompt,
    user: &AuthenticatedUser,
) -> Result<(), AppError> {
    let mut session = WizardSession::new();

    // Step 1: trip details. One validation error at a time, then re-prompt.
    loop {
        let patch = TripPatch {
            trip_name: Some(prompt.ask("Trip name").await?),
            destination: Some(prompt.ask("Destination").await?),
            departure: Some(prompt.ask("Departure from").await?),
            adults: Some(prompt.ask("Adults").await?),
            children: Some(prompt.ask("Children").await?),
            departure_date: parse_date(&prompt.ask("Departure date (YYYY-MM-DD)").await?),
            return_date: parse_date(&prompt.ask("Return date (YYYY-MM-DD)").await?),
            budget: Some(prompt.ask("Budget (low/medium/high)").await?),
            itinerary: None,
        };
        match session.submit_basics(patch) {
            Ok(()) => break,
            Err(AppError::Validation { reason, .. }) => println!("{reason}"),
            Err(err) => return Err(err),
        }
    }

    // Step 2: itinerary.
    loop {
        let mut events = Vec::new();
        loop {
            let name = prompt.ask("Event name").await?;
            let time = parse_date_time(&prompt.ask("Event time (YYYY-MM-DD HH:MM)").await?);
            events.push(EventItem { name, time });
            if !prompt.confirm("Add another event?").await? {
                break;
            }
        }
        match session.submit_itinerary(events) {
            Ok(()) => break,
            Err(AppError::Validation { reason, .. }) => println!("{reason}"),
            Err(err) => return Err(err),
        }
    }

    // Step 3: review and confirm.
    loop {
        print_review(&session);
        if !prompt.confirm("Confirm trip?").await? {
            session.cancel();
            println!("Trip discarded.");
            return Ok(());
        }
        match session.confirm(state, Some(user)).await {
            Ok(trip_id) => {
                println!("Trip confirmed and saved! ({trip_id})");
                return Ok(());
            }
            Err(AppError::SaveFailed) => {
                // Draft survives; the user can retry the whole submission.
                println!("Could not save trip.");
                if !prompt.confirm("Try again?").await? {
                    session.cancel();
                    return Ok(());
                }
            }
            Err(AppError::Validation { reason, .. }) => {
                println!("{reason}");
                session.cancel();
                return Ok(());
            }
            Err(err) => return Err(err),
        }
    }
}

fn print_review(session: &WizardSession) {
    let draft = session.draft();
    println!("\n--- Review your trip ---");
    println!("Trip:        {}", draft.trip_name);
    println!("Destination: {}", draft.destination);
    println!("From:        {}", draft.departure);
    println!("Travelers:   {} adults, {} children", draft.adults, draft.children);
    if let (Some(dep), Some(ret)) = (draft.departure_date, draft.return_date) {
        println!("Dates:       {} - {}", dep.format("%Y-%m-%d"), ret.format("%Y-%m-%d"));
    }
    println!("Budget:      {}", draft.budget);
    for (i, event) in draft.itinerary.iter().enumerate() {
        let time = event
            .time
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_default();
        println!("Event {}:     {} at {}", i + 1, event.name, time);
    }
}

async fn show_trips(state: &AppState, user: &AuthenticatedUser) -> Result<(), AppError> {
    let trips = trips::list_trips(state, &user.uuid).await?;
    if trips.is_empty() {
        println!("No trips found. Start by adding a new trip!");
        return Ok(());
    }
    for trip in trips {
        println!(
            "{} -> {} ({} - {}, {}, {})",
            trip.trip_name,
            trip.destination,
            trip.departure_date.format("%Y-%m-%d"),
            trip.return_date.format("%Y-%m-%d"),
            trip.budget,
            trip.status,
        );
    }
    Ok(())
}

async fn upload_photo(
    state: &AppState,
    prompt: &mut Prompt,
    user: &AuthenticatedUser,
) -> Result<(), AppError> {
    let path = prompt.ask("Photo file path").await?;
    let path = path.trim();
    if path.is_empty() {
        return Ok(());
    }
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(err) => {
            println!("Could not read {path}: {err}");
            return Ok(());
        }
    };
    let filename = path.rsplit(['/', '\\']).next().unwrap_or("photo");
    let url = profile::set_profile_photo(state, &user.uuid, filename, &bytes).await?;
    println!("Photo uploaded: {url}");
    Ok(())
}

fn parse_date(input: &str) -> Option<DateTime<Utc>> {
    let date = NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d").ok()?;
    let midnight = date.and_hms_opt(0, 0, 0)?;
    Some(DateTime::from_naive_utc_and_offset(midnight, Utc))
}

fn parse_date_time(input: &str) -> Option<DateTime<Utc>> {
    let time = NaiveDateTime::parse_from_str(input.trim(), "%Y-%m-%d %H:%M").ok()?;
    Some(DateTime::from_naive_utc_and_offset(time, Utc))
}
