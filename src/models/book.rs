//! Book model and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::{normalize_optional, normalize_text};
use crate::error::{AppError, AppResult};

/// Circulation status of a book
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum BookStatus {
    #[serde(alias = "available", alias = "Disponible")]
    Available,
    #[serde(alias = "borrowed", alias = "Emprunté")]
    Borrowed,
}

impl BookStatus {
    /// Database representation
    pub fn as_str(&self) -> &'static str {
        match self {
            BookStatus::Available => "available",
            BookStatus::Borrowed => "borrowed",
        }
    }
}

impl std::fmt::Display for BookStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for BookStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_text(s).to_lowercase().as_str() {
            "available" | "disponible" => Ok(BookStatus::Available),
            "borrowed" | "emprunté" => Ok(BookStatus::Borrowed),
            _ => Err(format!("Invalid book status: {}", s)),
        }
    }
}

/// Internal row structure for database queries
#[derive(Debug, Clone, FromRow)]
pub struct BookRow {
    id: i32,
    title: String,
    author: String,
    status: String,
    borrower: Option<String>,
    borrowed_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<BookRow> for Book {
    fn from(row: BookRow) -> Self {
        Book {
            id: row.id,
            title: row.title,
            author: row.author,
            status: row.status.parse().unwrap_or(BookStatus::Available),
            borrower: row.borrower,
            borrowed_at: row.borrowed_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Book as stored in the catalog
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Book {
    pub id: i32,
    /// Unique title
    pub title: String,
    pub author: String,
    pub status: BookStatus,
    /// Freeform borrower name, set only while borrowed
    pub borrower: Option<String>,
    pub borrowed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Book {
    pub fn is_available(&self) -> bool {
        self.status == BookStatus::Available
    }
}

/// Catalog search parameters
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct BookQuery {
    /// Case-insensitive substring of the title
    pub title: Option<String>,
    /// Case-insensitive substring of the author
    pub author: Option<String>,
    /// Matches either title or author
    pub q: Option<String>,
    pub status: Option<BookStatus>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl BookQuery {
    pub const DEFAULT_PER_PAGE: i64 = 50;
    pub const MAX_PER_PAGE: i64 = 500;

    /// Page number, starting at 1
    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn per_page(&self) -> i64 {
        self.per_page
            .unwrap_or(Self::DEFAULT_PER_PAGE)
            .clamp(1, Self::MAX_PER_PAGE)
    }

    pub fn offset(&self) -> i64 {
        (self.page() - 1).saturating_mul(self.per_page())
    }

    /// Trim search terms, dropping blank ones
    pub fn normalized(&self) -> Self {
        Self {
            title: normalize_optional(self.title.as_deref()),
            author: normalize_optional(self.author.as_deref()),
            q: normalize_optional(self.q.as_deref()),
            status: self.status,
            page: self.page,
            per_page: self.per_page,
        }
    }
}

/// Add book request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateBook {
    #[serde(default)]
    #[validate(length(min = 1, message = "Title is required"))]
    pub title: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "Author is required"))]
    pub author: String,
}

impl CreateBook {
    pub fn normalized(self) -> Self {
        Self {
            title: normalize_text(&self.title),
            author: normalize_text(&self.author),
        }
    }
}

/// Edit book request; absent fields are left unchanged
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateBook {
    #[validate(length(min = 1, message = "Title cannot be empty"))]
    pub title: Option<String>,
    #[validate(length(min = 1, message = "Author cannot be empty"))]
    pub author: Option<String>,
}

impl UpdateBook {
    pub fn normalized(self) -> Self {
        Self {
            title: self.title.as_deref().map(normalize_text),
            author: self.author.as_deref().map(normalize_text),
        }
    }
}

/// Borrow request
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct BorrowBook {
    /// Borrower name; only administrators may lend on behalf of someone else
    pub borrower: Option<String>,
}

impl BorrowBook {
    /// Parse an optional request body; an empty body borrows under the caller's name
    pub fn from_body(body: &[u8]) -> AppResult<Self> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        serde_json::from_slice(body)
            .map_err(|e| AppError::BadRequest(format!("Invalid borrow request: {}", e)))
    }
}
