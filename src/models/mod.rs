//! Data models for Biblio

pub mod book;
pub mod member;
pub mod session;

// Re-export commonly used types
pub use book::{Book, BookStatus};
pub use member::{Member, MemberRole};
pub use session::{Session, SessionClaims};

use unicode_normalization::UnicodeNormalization;

/// Canonical form for user-typed text: trimmed and NFC-normalized, so that
/// composed and decomposed accents compare equal.
pub fn normalize_text(value: &str) -> String {
    value.trim().nfc().collect()
}

/// Normalize an optional field, mapping blank input to `None`
pub fn normalize_optional(value: Option<&str>) -> Option<String> {
    value.map(normalize_text).filter(|v| !v.is_empty())
}
