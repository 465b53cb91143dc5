//! Login sessions and bearer token claims

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::{
    book::Book,
    member::{Member, MemberRole},
    normalize_text,
};
use crate::error::AppError;

/// Server-side session: the logged-in flag plus the member record
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Session {
    pub id: Uuid,
    pub member: Member,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// JWT claims; `sid` points at the server-side session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: String,
    pub member_id: i32,
    pub role: MemberRole,
    pub sid: Uuid,
    pub exp: i64,
    pub iat: i64,
}

impl SessionClaims {
    pub fn for_session(session: &Session) -> Self {
        Self {
            sub: session.member.id.to_string(),
            member_id: session.member.id,
            role: session.member.role,
            sid: session.id,
            exp: session.expires_at.timestamp(),
            iat: session.created_at.timestamp(),
        }
    }

    /// Create a new JWT token
    pub fn create_token(&self, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{encode, EncodingKey, Header};
        encode(
            &Header::default(),
            self,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
    }

    /// Parse JWT token
    pub fn from_token(token: &str, secret: &str) -> Result<Self, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{decode, DecodingKey, Validation};
        let token_data = decode::<Self>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        )?;
        Ok(token_data.claims)
    }
}

impl Session {
    pub fn is_admin(&self) -> bool {
        self.member.is_admin()
    }

    /// Require administrator privileges
    pub fn require_admin(&self) -> Result<(), AppError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(AppError::Authorization("Administrator privileges required".to_string()))
        }
    }

    /// Borrower name to record for a borrow request.
    ///
    /// Members always borrow under their own name; administrators may name
    /// someone else.
    pub fn borrower_name(&self, requested: Option<&str>) -> Result<String, AppError> {
        let own = self.member.display_name();
        match requested.map(str::trim).filter(|r| !r.is_empty()) {
            None => Ok(own),
            Some(name) if self.is_admin() => Ok(normalize_text(name)),
            Some(name) if same_name(name, &own) => Ok(own),
            Some(_) => Err(AppError::Authorization(
                "Only administrators can lend a book to someone else".to_string(),
            )),
        }
    }

    /// Only the recorded borrower or an administrator can return a book
    pub fn require_can_return(&self, book: &Book) -> Result<(), AppError> {
        if self.is_admin() {
            return Ok(());
        }
        let own = self.member.display_name();
        match &book.borrower {
            Some(borrower) if same_name(borrower, &own) => Ok(()),
            _ => Err(AppError::Authorization(
                "Only the borrower or an administrator can return this book".to_string(),
            )),
        }
    }
}

/// Names compare after NFC normalization, ignoring case (Unicode-aware)
fn same_name(a: &str, b: &str) -> bool {
    normalize_text(a).to_lowercase() == normalize_text(b).to_lowercase()
}
