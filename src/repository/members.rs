//! Members repository for database operations

use sqlx::{Pool, Postgres, QueryBuilder, Transaction};

use crate::{
    error::{AppError, AppResult},
    models::member::{Member, MemberQuery, MemberRole, MemberRow},
};

use super::contains_pattern;

#[derive(Clone)]
pub struct MembersRepository {
    pool: Pool<Postgres>,
}

/// Column values for an insert or a full update
pub struct MemberRecord<'a> {
    pub last_name: &'a str,
    pub first_name: &'a str,
    pub role: MemberRole,
    /// Argon2 hash; `None` on update keeps the current one
    pub password_hash: Option<&'a str>,
}

impl MembersRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Number of members
    pub async fn count(&self) -> AppResult<i64> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM members")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Get member by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Member> {
        sqlx::query_as::<_, MemberRow>("SELECT * FROM members WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(Member::from)
            .ok_or_else(|| AppError::MemberNotFound(format!("Member with id {} not found", id)))
    }

    /// Members whose names match case-insensitively, oldest first
    pub async fn find_by_name(&self, last_name: &str, first_name: &str) -> AppResult<Vec<Member>> {
        let members = sqlx::query_as::<_, MemberRow>(
            r#"
            SELECT * FROM members
            WHERE LOWER(last_name) = LOWER($1) AND LOWER(first_name) = LOWER($2)
            ORDER BY id
            "#,
        )
        .bind(last_name)
        .bind(first_name)
        .fetch_all(&self.pool)
        .await?;

        Ok(members.into_iter().map(Member::from).collect())
    }

    /// Check if a name pair is already used, optionally ignoring one member
    pub async fn name_exists(
        &self,
        last_name: &str,
        first_name: &str,
        exclude_id: Option<i32>,
    ) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM members
                WHERE LOWER(last_name) = LOWER($1) AND LOWER(first_name) = LOWER($2)
                  AND ($3::INT IS NULL OR id != $3)
            )
            "#,
        )
        .bind(last_name)
        .bind(first_name)
        .bind(exclude_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    /// List members with optional filters, ordered by id
    pub async fn list(&self, query: &MemberQuery) -> AppResult<(Vec<Member>, i64)> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM members WHERE TRUE");
        push_filters(&mut count, query);
        let total: i64 = count.build_query_scalar::<i64>().fetch_one(&self.pool).await?;

        let mut select = QueryBuilder::<Postgres>::new("SELECT * FROM members WHERE TRUE");
        push_filters(&mut select, query);
        select
            .push(" ORDER BY id LIMIT ")
            .push_bind(query.per_page())
            .push(" OFFSET ")
            .push_bind(query.offset());

        let members = select
            .build_query_as::<MemberRow>()
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(Member::from)
            .collect();

        Ok((members, total))
    }

    /// Insert a member; the id is generated
    pub async fn create(&self, record: &MemberRecord<'_>) -> AppResult<Member> {
        let password_hash = record
            .password_hash
            .ok_or_else(|| AppError::Internal("Password hash missing for new member".to_string()))?;

        let row = sqlx::query_as::<_, MemberRow>(
            r#"
            INSERT INTO members (last_name, first_name, role, password)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(record.last_name)
        .bind(record.first_name)
        .bind(record.role.as_str())
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    /// Replace names and role, and the password when a new hash is given.
    ///
    /// Demoting the last administrator is refused; the check and the write
    /// share one transaction holding the administrator rows.
    pub async fn update(&self, id: i32, record: &MemberRecord<'_>) -> AppResult<Member> {
        let mut tx = self.pool.begin().await?;
        let admins = lock_admins(&mut tx).await?;
        if removes_last_admin(&admins, id, record.role == MemberRole::Administrator) {
            return Err(AppError::BusinessRule(LAST_ADMIN.to_string()));
        }

        let member = sqlx::query_as::<_, MemberRow>(
            r#"
            UPDATE members
            SET last_name = $2,
                first_name = $3,
                role = $4,
                password = COALESCE($5, password),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(record.last_name)
        .bind(record.first_name)
        .bind(record.role.as_str())
        .bind(record.password_hash)
        .fetch_optional(&mut *tx)
        .await?
        .map(Member::from)
        .ok_or_else(|| AppError::MemberNotFound(format!("Member with id {} not found", id)))?;

        tx.commit().await?;
        Ok(member)
    }

    /// Delete a member; books borrowed under their name are left untouched.
    ///
    /// Deleting the last administrator is refused, atomically with the delete.
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;
        let admins = lock_admins(&mut tx).await?;
        if removes_last_admin(&admins, id, false) {
            return Err(AppError::BusinessRule(LAST_ADMIN.to_string()));
        }

        let result = sqlx::query("DELETE FROM members WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::MemberNotFound(format!("Member with id {} not found", id)));
        }
        tx.commit().await?;
        Ok(())
    }

    /// Insert `members` only if the roster is empty, all or nothing
    pub async fn load_if_empty(&self, members: &[MemberRecord<'_>]) -> AppResult<usize> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("LOCK TABLE members IN SHARE ROW EXCLUSIVE MODE")
            .execute(&mut *tx)
            .await?;

        let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM members")
            .fetch_one(&mut *tx)
            .await?;
        if existing > 0 {
            return Ok(0);
        }

        for member in members {
            let password_hash = member.password_hash.ok_or_else(|| {
                AppError::Internal("Password hash missing for new member".to_string())
            })?;
            sqlx::query(
                r#"
                INSERT INTO members (last_name, first_name, role, password)
                VALUES ($1, $2, $3, $4)
                "#,
            )
            .bind(member.last_name)
            .bind(member.first_name)
            .bind(member.role.as_str())
            .bind(password_hash)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(members.len())
    }
}

const LAST_ADMIN: &str = "At least one administrator must remain";

/// Lock every administrator row until the transaction ends, returning their ids
async fn lock_admins(tx: &mut Transaction<'_, Postgres>) -> AppResult<Vec<i32>> {
    let ids: Vec<i32> =
        sqlx::query_scalar("SELECT id FROM members WHERE role = $1 ORDER BY id FOR UPDATE")
            .bind(MemberRole::Administrator.as_str())
            .fetch_all(&mut **tx)
            .await?;
    Ok(ids)
}

/// Whether changing member `id` would leave the roster without an administrator
fn removes_last_admin(admins: &[i32], id: i32, stays_admin: bool) -> bool {
    !stays_admin && admins.contains(&id) && admins.len() <= 1
}

fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, query: &MemberQuery) {
    if let Some(name) = query.name_term() {
        let pattern = contains_pattern(&name);
        builder
            .push(" AND (last_name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR first_name ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
    if let Some(role) = query.role {
        builder.push(" AND role = ").push_bind(role.as_str());
    }
}
