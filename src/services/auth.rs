//! Login, logout and session resolution

use crate::{
    config::AuthConfig,
    error::{AppError, AppResult},
    models::{normalize_text, Member, Session, SessionClaims},
    repository::Repository,
};

use super::{password::verify_password, sessions::SessionStore};

/// Typed credentials after trimming
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub last_name: String,
    pub first_name: String,
    pub password: String,
}

impl Credentials {
    /// All three fields are required; names are trimmed, the password is not
    pub fn new(last_name: &str, first_name: &str, password: &str) -> AppResult<Self> {
        let credentials = Self {
            last_name: normalize_text(last_name),
            first_name: normalize_text(first_name),
            password: password.to_string(),
        };

        if credentials.last_name.is_empty()
            || credentials.first_name.is_empty()
            || credentials.password.is_empty()
        {
            return Err(AppError::validation("All fields are required"));
        }
        Ok(credentials)
    }
}

#[derive(Clone)]
pub struct AuthService {
    repository: Repository,
    sessions: SessionStore,
    config: AuthConfig,
}

impl AuthService {
    pub fn new(repository: Repository, sessions: SessionStore, config: AuthConfig) -> Self {
        Self {
            repository,
            sessions,
            config,
        }
    }

    /// Check credentials against the member roster, open a session and
    /// return its bearer token
    pub async fn login(&self, credentials: &Credentials) -> AppResult<(String, Session)> {
        let member = self.find_member(credentials).await?.ok_or_else(|| {
            tracing::warn!(
                last_name = %credentials.last_name,
                first_name = %credentials.first_name,
                "Rejected login"
            );
            AppError::Authentication("Invalid credentials".to_string())
        })?;

        let session = self.sessions.create(member).await?;
        let token = SessionClaims::for_session(&session)
            .create_token(&self.config.jwt_secret)
            .map_err(|e| AppError::Internal(format!("Failed to create token: {}", e)))?;

        tracing::info!(member_id = session.member.id, role = %session.member.role, "Member logged in");
        Ok((token, session))
    }

    /// Homonyms are allowed in the roster, so the first member whose
    /// password matches wins
    async fn find_member(&self, credentials: &Credentials) -> AppResult<Option<Member>> {
        let candidates = self
            .repository
            .members
            .find_by_name(&credentials.last_name, &credentials.first_name)
            .await?;

        for member in candidates {
            if verify_password(&credentials.password, &member.password)? {
                return Ok(Some(member));
            }
        }
        Ok(None)
    }

    /// Resolve a bearer token to its live session
    pub async fn authenticate(&self, token: &str) -> AppResult<Session> {
        let claims = SessionClaims::from_token(token, &self.config.jwt_secret)
            .map_err(|e| AppError::Authentication(e.to_string()))?;

        let session = self
            .sessions
            .get(claims.sid)
            .await?
            .ok_or_else(|| AppError::SessionExpired("Session expired or logged out".to_string()))?;

        if session.member.id != claims.member_id {
            return Err(AppError::Authentication("Token does not match session".to_string()));
        }
        Ok(session)
    }

    /// Close the session
    pub async fn logout(&self, session: &Session) -> AppResult<()> {
        self.sessions.delete(session).await?;
        tracing::info!(member_id = session.member.id, "Member logged out");
        Ok(())
    }
}
