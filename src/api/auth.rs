//! Authentication endpoints

use axum::{extract::State, http::StatusCode, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{error::AppResult, models::Member, services::auth::Credentials, AppState};

use super::AuthenticatedUser;

/// Login request
#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub password: String,
}

/// Login response
#[derive(Serialize, ToSchema)]
pub struct LoginResponse {
    /// Bearer token
    pub token: String,
    /// Always "Bearer"
    pub token_type: String,
    pub expires_at: DateTime<Utc>,
    pub member: Member,
}

/// Current session status
#[derive(Serialize, ToSchema)]
pub struct SessionInfo {
    pub connected: bool,
    pub member: Member,
    pub expires_at: DateTime<Utc>,
}

/// Log in with last name, first name and password
#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = LoginResponse),
        (status = 400, description = "Missing fields"),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    let credentials = Credentials::new(&request.last_name, &request.first_name, &request.password)?;
    let (token, session) = state.services.auth.login(&credentials).await?;

    Ok(Json(LoginResponse {
        token,
        token_type: "Bearer".to_string(),
        expires_at: session.expires_at,
        member: session.member,
    }))
}

/// Log out, closing the current session
#[utoipa::path(
    post,
    path = "/auth/logout",
    tag = "auth",
    security(("bearer_auth" = [])),
    responses(
        (status = 204, description = "Logged out"),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn logout(
    State(state): State<AppState>,
    AuthenticatedUser(session): AuthenticatedUser,
) -> AppResult<StatusCode> {
    state.services.auth.logout(&session).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Current member and session status
#[utoipa::path(
    get,
    path = "/auth/me",
    tag = "auth",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Current session", body = SessionInfo),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn me(AuthenticatedUser(session): AuthenticatedUser) -> Json<SessionInfo> {
    Json(SessionInfo {
        connected: true,
        member: session.member,
        expires_at: session.expires_at,
    })
}
