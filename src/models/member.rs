//! Member model and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::{normalize_optional, normalize_text};

/// Member role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum MemberRole {
    #[serde(alias = "member", alias = "Membre")]
    Member,
    #[serde(alias = "administrator", alias = "Administrateur")]
    Administrator,
}

impl MemberRole {
    /// Database representation
    pub fn as_str(&self) -> &'static str {
        match self {
            MemberRole::Member => "member",
            MemberRole::Administrator => "administrator",
        }
    }
}

impl std::fmt::Display for MemberRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for MemberRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "member" | "membre" => Ok(MemberRole::Member),
            "administrator" | "administrateur" | "admin" => Ok(MemberRole::Administrator),
            _ => Err(format!("Invalid member role: {}", s)),
        }
    }
}

/// Internal row structure for database queries
#[derive(Debug, Clone, FromRow)]
pub struct MemberRow {
    id: i32,
    last_name: String,
    first_name: String,
    role: String,
    password: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<MemberRow> for Member {
    fn from(row: MemberRow) -> Self {
        Member {
            id: row.id,
            last_name: row.last_name,
            first_name: row.first_name,
            role: row.role.parse().unwrap_or(MemberRole::Member),
            password: row.password,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Library member
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Member {
    pub id: i32,
    pub last_name: String,
    pub first_name: String,
    pub role: MemberRole,
    /// Hashed password (argon2)
    #[serde(skip_serializing, default)]
    pub password: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Member {
    pub fn is_admin(&self) -> bool {
        self.role == MemberRole::Administrator
    }

    /// "Last First", the form used as a borrower name
    pub fn display_name(&self) -> String {
        format!("{} {}", self.last_name, self.first_name)
    }
}

/// Member list parameters
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct MemberQuery {
    /// Case-insensitive substring of the last or first name
    pub name: Option<String>,
    pub role: Option<MemberRole>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl MemberQuery {
    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn per_page(&self) -> i64 {
        self.per_page.unwrap_or(50).clamp(1, 500)
    }

    pub fn offset(&self) -> i64 {
        (self.page() - 1).saturating_mul(self.per_page())
    }

    pub fn name_term(&self) -> Option<String> {
        normalize_optional(self.name.as_deref())
    }
}

/// Add member request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateMember {
    #[serde(default)]
    #[validate(length(min = 1, message = "Last name is required"))]
    pub last_name: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "First name is required"))]
    pub first_name: String,
    #[validate(required(message = "Role must be selected"))]
    pub role: Option<MemberRole>,
    #[serde(default)]
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

impl CreateMember {
    /// Trim names; the password is taken as typed apart from surrounding spaces
    pub fn normalized(self) -> Self {
        Self {
            last_name: normalize_text(&self.last_name),
            first_name: normalize_text(&self.first_name),
            role: self.role,
            password: self.password.trim().to_string(),
        }
    }
}

/// Edit member request; the password is kept when omitted or blank
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateMember {
    #[serde(default)]
    #[validate(length(min = 1, message = "Last name is required"))]
    pub last_name: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "First name is required"))]
    pub first_name: String,
    #[validate(required(message = "Role must be selected"))]
    pub role: Option<MemberRole>,
    pub password: Option<String>,
}

impl UpdateMember {
    pub fn normalized(self) -> Self {
        Self {
            last_name: normalize_text(&self.last_name),
            first_name: normalize_text(&self.first_name),
            role: self.role,
            password: self
                .password
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::validation_messages;

    #[test]
    fn test_role_accepts_french_labels() {
        let role: MemberRole = serde_json::from_str("\"Administrateur\"").unwrap();
        assert_eq!(role, MemberRole::Administrator);
        let role: MemberRole = serde_json::from_str("\"Membre\"").unwrap();
        assert_eq!(role, MemberRole::Member);
        assert_eq!("admin".parse::<MemberRole>(), Ok(MemberRole::Administrator));
    }

    #[test]
    fn test_password_never_serialized() {
        let member = Member {
            id: 1,
            last_name: "Dupont".into(),
            first_name: "Jean".into(),
            role: MemberRole::Member,
            password: "$argon2id$secret".into(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let json = serde_json::to_value(&member).unwrap();
        assert!(json.get("password").is_none());
        assert_eq!(json["role"], "Member");
        assert_eq!(member.display_name(), "Dupont Jean");
    }

    #[test]
    fn test_empty_form_reports_every_field() {
        let form: CreateMember = serde_json::from_str("{}").unwrap();
        let errors = form.normalized().validate().unwrap_err();
        assert_eq!(
            validation_messages(&errors),
            vec![
                "First name is required",
                "Last name is required",
                "Password is required",
                "Role must be selected",
            ]
        );
    }

    #[test]
    fn test_offset_saturates_on_huge_page() {
        let query = MemberQuery {
            page: Some(i64::MAX),
            per_page: Some(20),
            ..Default::default()
        };
        assert_eq!(query.offset(), i64::MAX);
        assert_eq!(query.per_page(), 20);
    }

    #[test]
    fn test_update_blank_password_is_kept() {
        let form = UpdateMember {
            last_name: " Martin ".into(),
            first_name: "Claire".into(),
            role: Some(MemberRole::Member),
            password: Some("   ".into()),
        }
        .normalized();
        assert_eq!(form.last_name, "Martin");
        assert_eq!(form.password, None);
        assert!(form.validate().is_ok());
    }
}
