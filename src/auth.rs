use anyhow::anyhow;
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::{
    error::AppError,
    models::user::{User, UserProfile},
    services::{profile, user_profile_path},
    state::AppState,
};

/// The authenticated principal. `uuid` is the opaque id every per-user
/// store path hangs off.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub id: i64,
    pub uuid: String,
    pub username: String,
    pub display_name: String,
}

impl AuthenticatedUser {
    fn from_user(user: &User) -> Self {
        Self {
            id: user.id,
            uuid: user.uuid.clone(),
            username: user.username.clone(),
            display_name: format!("{} {}", user.firstname, user.lastname),
        }
    }
}

pub async fn register_user(
    state: &AppState,
    firstname: &str,
    lastname: &str,
    username: &str,
    email: &str,
    password: &str,
) -> Result<AuthenticatedUser, AppError> {
    let firstname = firstname.trim();
    let lastname = lastname.trim();
    let username = username.trim();
    let email = email.trim();

    if firstname.is_empty() || lastname.is_empty() {
        return Err(AppError::BadRequest("First and last name are required.".into()));
    }
    if username.is_empty() {
        return Err(AppError::BadRequest("Username is required.".into()));
    }
    if !email.contains('@') {
        return Err(AppError::BadRequest("A valid email address is required.".into()));
    }
    if password.len() < 8 {
        return Err(AppError::BadRequest(
            "Password must be at least 8 characters.".into(),
        ));
    }

    let existing: Option<(i64,)> =
        sqlx::query_as("SELECT id FROM users WHERE username = ?1 OR email = ?2")
            .bind(username)
            .bind(email)
            .fetch_optional(&state.db)
            .await?;
    if existing.is_some() {
        return Err(AppError::BadRequest(
            "Username or email is already taken.".into(),
        ));
    }

    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|err| anyhow!("hash password: {err}"))?
        .to_string();

    let uuid = Uuid::new_v4().to_string();
    let created_at = Utc::now();

    let id = sqlx::query(
        "INSERT INTO users (uuid, firstname, lastname, username, email, password_hash, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
    )
    .bind(&uuid)
    .bind(firstname)
    .bind(lastname)
    .bind(username)
    .bind(email)
    .bind(&password_hash)
    .bind(created_at)
    .execute(&state.db)
    .await?
    .last_insert_rowid();

    // The profile document goes to both stores, like the trips do later.
    let user_profile = UserProfile {
        firstname: firstname.to_string(),
        lastname: lastname.to_string(),
        username: username.to_string(),
        email: email.to_string(),
        created_at,
        gender: None,
        date_of_birth: None,
        photo_url: None,
    };
    let profile_value =
        serde_json::to_value(&user_profile).map_err(|err| AppError::Other(err.into()))?;
    state
        .documents
        .write(&user_profile_path(&uuid), &profile_value)
        .await?;
    profile::write_realtime_profile(state, &uuid, &profile_value).await?;

    info!("registered user {username}");

    Ok(AuthenticatedUser {
        id,
        uuid,
        username: username.to_string(),
        display_name: format!("{firstname} {lastname}"),
    })
}

/// Authenticate by username or email.
pub async fn authenticate_user(
    state: &AppState,
    identifier: &str,
    password: &str,
) -> Result<AuthenticatedUser, AppError> {
    let identifier = identifier.trim();
    let user: Option<User> =
        sqlx::query_as("SELECT * FROM users WHERE username = ?1 OR email = ?1")
            .bind(identifier)
            .fetch_optional(&state.db)
            .await?;
    let Some(user) = user else {
        return Err(AppError::Unauthenticated);
    };

    let parsed = PasswordHash::new(&user.password_hash)
        .map_err(|err| anyhow!("stored password hash is invalid: {err}"))?;
    if Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_err()
    {
        return Err(AppError::Unauthenticated);
    }

    sqlx::query("UPDATE users SET last_login_at = ?1 WHERE id = ?2")
        .bind(Utc::now())
        .bind(user.id)
        .execute(&state.db)
        .await?;

    Ok(AuthenticatedUser::from_user(&user))
}
