//! Load-once seeding of the books and members collections
//!
//! Each collection is filled from its bundled JSON file only when it is empty
//! at startup. Seed files may use English field names or the French ones of
//! the legacy catalog page (`titre`, `auteur`, `etat`, `nom`, `prenom`,
//! `statut`, `motDePasse`).

use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;

use crate::{
    config::SeedConfig,
    error::{AppError, AppResult},
    models::{book::BookStatus, member::MemberRole, normalize_text},
    repository::{books::NewBook, members::MemberRecord, Repository},
};

use super::password::{hash_password, validate_password_strength};

/// Borrower recorded for seed books marked borrowed without a name
pub const UNKNOWN_BORROWER: &str = "unknown";

#[derive(Debug, Clone, Deserialize)]
pub struct SeedBook {
    #[serde(alias = "titre")]
    pub title: String,
    #[serde(alias = "auteur")]
    pub author: String,
    #[serde(alias = "etat", default)]
    pub status: Option<BookStatus>,
    #[serde(alias = "emprunteur", default)]
    pub borrower: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedMember {
    #[serde(alias = "nom")]
    pub last_name: String,
    #[serde(alias = "prenom")]
    pub first_name: String,
    #[serde(alias = "statut", default)]
    pub role: Option<MemberRole>,
    #[serde(alias = "motDePasse")]
    pub password: String,
}

/// What a seeding run inserted
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SeedReport {
    pub books: usize,
    pub members: usize,
}

/// Parse seed books, dropping blank entries and repeated titles
pub fn parse_books(json: &str) -> AppResult<Vec<SeedBook>> {
    let raw: Vec<SeedBook> = serde_json::from_str(json)
        .map_err(|e| AppError::Internal(format!("Invalid books seed file: {}", e)))?;

    let mut seen = HashSet::new();
    let mut books = Vec::with_capacity(raw.len());
    for book in raw {
        let title = normalize_text(&book.title);
        let author = normalize_text(&book.author);
        if title.is_empty() || author.is_empty() {
            tracing::warn!("Skipping seed book with missing title or author");
            continue;
        }
        if !seen.insert(title.to_lowercase()) {
            tracing::warn!(title = %title, "Skipping duplicate seed title");
            continue;
        }
        books.push(SeedBook {
            title,
            author,
            status: book.status,
            borrower: book.borrower.as_deref().map(normalize_text).filter(|b| !b.is_empty()),
        });
    }
    Ok(books)
}

/// Parse seed members, dropping entries that fail the form rules
pub fn parse_members(json: &str, min_password_length: u64) -> AppResult<Vec<SeedMember>> {
    let raw: Vec<SeedMember> = serde_json::from_str(json)
        .map_err(|e| AppError::Internal(format!("Invalid members seed file: {}", e)))?;

    let members = raw
        .into_iter()
        .filter_map(|member| {
            let last_name = normalize_text(&member.last_name);
            let first_name = normalize_text(&member.first_name);
            if last_name.is_empty() || first_name.is_empty() {
                tracing::warn!("Skipping seed member with missing name");
                return None;
            }
            if let Err(msg) = validate_password_strength(&member.password, min_password_length) {
                tracing::warn!(last_name = %last_name, "Skipping seed member: {}", msg);
                return None;
            }
            Some(SeedMember {
                last_name,
                first_name,
                role: member.role,
                password: member.password,
            })
        })
        .collect();
    Ok(members)
}

#[derive(Clone)]
pub struct SeedService {
    repository: Repository,
    min_password_length: u64,
}

impl SeedService {
    pub fn new(repository: Repository, min_password_length: u64) -> Self {
        Self {
            repository,
            min_password_length,
        }
    }

    /// Seed every empty collection
    pub async fn run(&self, config: &SeedConfig) -> AppResult<SeedReport> {
        if !config.enabled {
            tracing::info!("Seeding disabled");
            return Ok(SeedReport::default());
        }

        let report = SeedReport {
            books: self.seed_books(Path::new(&config.books_path)).await?,
            members: self.seed_members(Path::new(&config.members_path)).await?,
        };
        Ok(report)
    }

    async fn read_seed(path: &Path) -> AppResult<Option<String>> {
        match tokio::fs::read_to_string(path).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(path = %path.display(), "Seed file not found");
                Ok(None)
            }
            Err(e) => Err(AppError::Internal(format!(
                "Failed to read seed file {}: {}",
                path.display(),
                e
            ))),
        }
    }

    /// Load books when the catalog is empty
    pub async fn seed_books(&self, path: &Path) -> AppResult<usize> {
        if self.repository.books.count().await? > 0 {
            tracing::debug!("Books already present, skipping seed");
            return Ok(0);
        }
        let Some(json) = Self::read_seed(path).await? else {
            return Ok(0);
        };

        let books = parse_books(&json)?;
        let rows: Vec<NewBook<'_>> = books
            .iter()
            .map(|seed| NewBook {
                title: &seed.title,
                author: &seed.author,
                borrower: seed_borrower(seed),
            })
            .collect();

        let inserted = self.repository.books.load_if_empty(&rows).await?;
        tracing::info!(count = inserted, path = %path.display(), "Seeded books");
        Ok(inserted)
    }

    /// Load members when the roster is empty
    pub async fn seed_members(&self, path: &Path) -> AppResult<usize> {
        if self.repository.members.count().await? > 0 {
            tracing::debug!("Members already present, skipping seed");
            return Ok(0);
        }
        let Some(json) = Self::read_seed(path).await? else {
            return Ok(0);
        };

        let members = parse_members(&json, self.min_password_length)?;
        // Hash everything before touching the database
        let hashes = members
            .iter()
            .map(|seed| hash_password(&seed.password))
            .collect::<AppResult<Vec<_>>>()?;
        let records: Vec<MemberRecord<'_>> = members
            .iter()
            .zip(&hashes)
            .map(|(seed, hash)| MemberRecord {
                last_name: &seed.last_name,
                first_name: &seed.first_name,
                role: seed.role.unwrap_or(MemberRole::Member),
                password_hash: Some(hash),
            })
            .collect();

        let inserted = self.repository.members.load_if_empty(&records).await?;
        tracing::info!(count = inserted, path = %path.display(), "Seeded members");
        Ok(inserted)
    }
}

/// Borrower stored for a seed book; only borrowed books have one
fn seed_borrower(seed: &SeedBook) -> Option<&str> {
    match seed.status {
        Some(BookStatus::Borrowed) => Some(seed.borrower.as_deref().unwrap_or(UNKNOWN_BORROWER)),
        _ => None,
    }
}
