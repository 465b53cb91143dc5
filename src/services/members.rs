//! Member roster management

use validator::Validate;

use crate::{
    error::{validation_messages, AppError, AppResult},
    models::{
        member::{CreateMember, Member, MemberQuery, MemberRole, UpdateMember},
        Session,
    },
    repository::{members::MemberRecord, Repository},
};

use super::{
    password::{hash_password, validate_password_strength},
    sessions::SessionStore,
};

#[derive(Clone)]
pub struct MembersService {
    repository: Repository,
    sessions: SessionStore,
    min_password_length: u64,
}

/// Whether open sessions hold a stale copy of the member after an edit
fn invalidates_sessions(before: &Member, after: &Member, password_changed: bool) -> bool {
    password_changed
        || before.role != after.role
        || before.last_name != after.last_name
        || before.first_name != after.first_name
}

/// Run the form rules and the password policy, reporting every failure
fn check_form<F: Validate>(form: &F, password: Option<&str>, min_password_length: u64) -> AppResult<()> {
    let mut messages = match form.validate() {
        Ok(()) => Vec::new(),
        Err(errors) => validation_messages(&errors),
    };

    if let Some(password) = password.filter(|p| !p.is_empty()) {
        if let Err(msg) = validate_password_strength(password, min_password_length) {
            messages.push(msg);
        }
    }

    if messages.is_empty() {
        Ok(())
    } else {
        Err(AppError::Validation(messages))
    }
}

impl MembersService {
    pub fn new(repository: Repository, sessions: SessionStore, min_password_length: u64) -> Self {
        Self {
            repository,
            sessions,
            min_password_length,
        }
    }

    /// List members
    pub async fn list_members(&self, query: &MemberQuery) -> AppResult<(Vec<Member>, i64)> {
        self.repository.members.list(query).await
    }

    /// Get member by ID
    pub async fn get_member(&self, id: i32) -> AppResult<Member> {
        self.repository.members.get_by_id(id).await
    }

    /// Add a member; the id is generated
    pub async fn add_member(&self, form: CreateMember) -> AppResult<Member> {
        let form = form.normalized();
        check_form(&form, Some(&form.password), self.min_password_length)?;
        let role = form.role.unwrap_or(MemberRole::Member);

        if self
            .repository
            .members
            .name_exists(&form.last_name, &form.first_name, None)
            .await?
        {
            return Err(AppError::Conflict("A member with this name already exists".to_string()));
        }

        let password_hash = hash_password(&form.password)?;
        let created = self
            .repository
            .members
            .create(&MemberRecord {
                last_name: &form.last_name,
                first_name: &form.first_name,
                role,
                password_hash: Some(&password_hash),
            })
            .await?;

        tracing::info!(member_id = created.id, role = %created.role, "Member added");
        Ok(created)
    }

    /// Replace a member's names and role, and the password when one is given.
    ///
    /// Changing the names, the role or the password closes the member's open
    /// sessions, since sessions carry a copy of the member record.
    pub async fn edit_member(&self, id: i32, form: UpdateMember, actor: &Session) -> AppResult<Member> {
        let form = form.normalized();
        check_form(&form, form.password.as_deref(), self.min_password_length)?;
        let role = form.role.unwrap_or(MemberRole::Member);

        let existing = self.repository.members.get_by_id(id).await?;

        if self
            .repository
            .members
            .name_exists(&form.last_name, &form.first_name, Some(id))
            .await?
        {
            return Err(AppError::Conflict("A member with this name already exists".to_string()));
        }

        let password_hash = form.password.as_deref().map(hash_password).transpose()?;
        let updated = self
            .repository
            .members
            .update(
                id,
                &MemberRecord {
                    last_name: &form.last_name,
                    first_name: &form.first_name,
                    role,
                    password_hash: password_hash.as_deref(),
                },
            )
            .await?;

        tracing::info!(member_id = id, actor_id = actor.member.id, "Member updated");

        if invalidates_sessions(&existing, &updated, password_hash.is_some()) {
            self.sessions.revoke_member(id).await?;
        }
        Ok(updated)
    }

    /// Delete a member and close their sessions
    pub async fn delete_member(&self, id: i32, actor: &Session) -> AppResult<()> {
        if actor.member.id == id {
            return Err(AppError::BusinessRule("You cannot delete your own account".to_string()));
        }

        self.repository.members.delete(id).await?;
        self.sessions.revoke_member(id).await?;

        tracing::info!(member_id = id, actor_id = actor.member.id, "Member deleted");
        Ok(())
    }
}
