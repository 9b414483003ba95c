//! Account endpoints: registration, placeholder-token login, profile and directory.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use tracing::info;

use campusmart_core::domain::user::{hash_password, placeholder_token, NewUser, UserId};
use campusmart_core::lifecycle::views::display_timestamp;
use campusmart_db::repositories::UserSummary;

use super::AppState;
use crate::error::{missing_fields, new_correlation_id, ApiError};

const CREDENTIALS_TAKEN: &str = "Username or email already exists";
const USER_NOT_FOUND: &str = "User not found";

#[derive(Debug, Default, Deserialize)]
pub struct RegisterBody {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginBody {
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ProfileUpdateBody {
    pub user_id: Option<i64>,
    pub email: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Registered {
    pub message: &'static str,
    pub user_id: UserId,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct UserInfo {
    pub username: String,
    pub email: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LoggedIn {
    pub message: &'static str,
    pub token: String,
    pub user_id: UserId,
    pub user_info: UserInfo,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Profile {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub created_at: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Updated {
    pub message: &'static str,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/get-user-profile/{user_id}", get(user_profile))
        .route("/update-user-profile", post(update_user_profile))
        .route("/users", get(list_users))
}

fn present(value: Option<&str>) -> bool {
    value.is_some_and(|value| !value.trim().is_empty())
}

pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterBody>, JsonRejection>,
) -> Result<(StatusCode, Json<Registered>), ApiError> {
    let Json(body) = payload?;
    let correlation_id = new_correlation_id();

    let missing: Vec<&str> = [
        ("username", body.username.as_deref()),
        ("email", body.email.as_deref()),
        ("password", body.password.as_deref()),
    ]
    .into_iter()
    .filter_map(|(name, value)| (!present(value)).then_some(name))
    .collect();
    if !missing.is_empty() {
        return Err(ApiError::bad_request(missing_fields(&missing), &correlation_id));
    }
    let username = body.username.unwrap_or_default();
    let email = body.email.unwrap_or_default();
    let password = SecretString::from(body.password.unwrap_or_default());

    let taken = state
        .users
        .exists_by_username_or_email(&username, &email)
        .await
        .map_err(|error| ApiError::application(error.into(), &correlation_id))?;
    if taken {
        return Err(ApiError::bad_request(CREDENTIALS_TAKEN, &correlation_id));
    }

    let user_id = match state.users.create(NewUser::register(username, email, &password)).await {
        Ok(user_id) => user_id,
        // lost a race with a concurrent registration of the same name
        Err(error) if error.is_unique_violation() => {
            return Err(ApiError::bad_request(CREDENTIALS_TAKEN, &correlation_id));
        }
        Err(error) => return Err(ApiError::application(error.into(), &correlation_id)),
    };

    info!(
        event_name = "account.registered",
        correlation_id = %correlation_id,
        user_id = %user_id,
        "user registered"
    );

    Ok((StatusCode::CREATED, Json(Registered { message: "User registered successfully", user_id })))
}

pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginBody>, JsonRejection>,
) -> Result<Json<LoggedIn>, ApiError> {
    let Json(body) = payload?;
    let correlation_id = new_correlation_id();

    let (Some(username), Some(password)) = (body.username, body.password) else {
        return Err(ApiError::bad_request("Missing required fields", &correlation_id));
    };
    if username.is_empty() || password.is_empty() {
        return Err(ApiError::bad_request("Missing required fields", &correlation_id));
    }

    let password = SecretString::from(password);
    let user = state
        .users
        .find_by_credentials(&username, &hash_password(&password))
        .await
        .map_err(|error| ApiError::application(error.into(), &correlation_id))?
        .ok_or_else(|| ApiError::unauthorized("Invalid username or password", &correlation_id))?;

    info!(
        event_name = "account.logged_in",
        correlation_id = %correlation_id,
        user_id = %user.id,
        "user logged in"
    );

    Ok(Json(LoggedIn {
        message: "Login successful",
        token: placeholder_token(user.id),
        user_id: user.id,
        user_info: UserInfo { username: user.username, email: user.email },
    }))
}

pub async fn user_profile(
    State(state): State<AppState>,
    user_id: Result<Path<i64>, PathRejection>,
) -> Result<Json<Profile>, ApiError> {
    let Path(user_id) = user_id?;
    let correlation_id = new_correlation_id();
    let user = state
        .users
        .find_by_id(UserId(user_id))
        .await
        .map_err(|error| ApiError::application(error.into(), &correlation_id))?
        .ok_or_else(|| ApiError::not_found(USER_NOT_FOUND, &correlation_id))?;

    Ok(Json(Profile {
        id: user.id,
        username: user.username,
        email: user.email,
        created_at: display_timestamp(&user.created_at),
    }))
}

/// Only `email` is updatable.
pub async fn update_user_profile(
    State(state): State<AppState>,
    payload: Result<Json<ProfileUpdateBody>, JsonRejection>,
) -> Result<Json<Updated>, ApiError> {
    let Json(body) = payload?;
    let correlation_id = new_correlation_id();

    let Some(user_id) = body.user_id.map(UserId) else {
        return Err(ApiError::bad_request("user_id is required", &correlation_id));
    };
    let persistence = |error: campusmart_db::RepositoryError| {
        ApiError::application(error.into(), &correlation_id)
    };

    if state.users.find_by_id(user_id).await.map_err(persistence)?.is_none() {
        return Err(ApiError::not_found(USER_NOT_FOUND, &correlation_id));
    }
    let Some(email) = body.email else {
        return Err(ApiError::bad_request("No valid fields to update", &correlation_id));
    };
    if state.users.email_taken_by_other(&email, user_id).await.map_err(persistence)? {
        return Err(ApiError::bad_request("Email already exists", &correlation_id));
    }
    if !state.users.update_email(user_id, &email).await.map_err(persistence)? {
        return Err(ApiError::not_found(USER_NOT_FOUND, &correlation_id));
    }

    info!(
        event_name = "account.profile_updated",
        correlation_id = %correlation_id,
        user_id = %user_id,
        "user profile updated"
    );

    Ok(Json(Updated { message: "Profile updated successfully" }))
}

pub async fn list_users(State(state): State<AppState>) -> Result<Json<Vec<UserSummary>>, ApiError> {
    let correlation_id = new_correlation_id();
    let users = state
        .users
        .list()
        .await
        .map_err(|error| ApiError::application(error.into(), &correlation_id))?;
    Ok(Json(users))
}
