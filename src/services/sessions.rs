//! Redis-backed session store
//!
//! A session is stored as JSON under `session:{id}` with a TTL equal to the
//! token lifetime. Each member also has a set `member_sessions:{member_id}`
//! listing their session ids so that all of them can be revoked at once.

use chrono::{Duration, Utc};
use redis::{aio::ConnectionManager, AsyncCommands, Client};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{Member, Session},
};

#[derive(Clone)]
pub struct SessionStore {
    conn: ConnectionManager,
    ttl_seconds: u64,
}

fn session_key(id: Uuid) -> String {
    format!("session:{}", id)
}

fn member_sessions_key(member_id: i32) -> String {
    format!("member_sessions:{}", member_id)
}

impl SessionStore {
    /// Connect to Redis and check the connection.
    ///
    /// The connection manager is shared by every clone and reconnects on its own.
    pub async fn new(url: &str, ttl_seconds: u64) -> AppResult<Self> {
        let client = Client::open(url)?;
        let mut conn = ConnectionManager::new(client).await?;
        redis::cmd("PING").query_async::<_, String>(&mut conn).await?;

        Ok(Self { conn, ttl_seconds })
    }

    fn connection(&self) -> ConnectionManager {
        self.conn.clone()
    }

    /// Open a session for a member
    pub async fn create(&self, member: Member) -> AppResult<Session> {
        let now = Utc::now();
        let session = Session {
            id: Uuid::new_v4(),
            member,
            created_at: now,
            expires_at: now + Duration::seconds(self.ttl_seconds as i64),
        };

        let payload = serde_json::to_string(&session)
            .map_err(|e| AppError::Internal(format!("Failed to serialize session: {}", e)))?;
        let index_key = member_sessions_key(session.member.id);

        let mut conn = self.connection();
        redis::pipe()
            .atomic()
            .set_ex(session_key(session.id), payload, self.ttl_seconds)
            .ignore()
            .sadd(&index_key, session.id.to_string())
            .ignore()
            .expire(&index_key, self.ttl_seconds as i64)
            .ignore()
            .query_async::<_, ()>(&mut conn)
            .await?;

        tracing::debug!(member_id = session.member.id, session_id = %session.id, "Session created");
        Ok(session)
    }

    /// Look up a live session
    pub async fn get(&self, id: Uuid) -> AppResult<Option<Session>> {
        let mut conn = self.connection();
        let payload: Option<String> = conn.get(session_key(id)).await?;

        match payload {
            Some(json) => {
                let session = serde_json::from_str(&json)
                    .map_err(|e| AppError::Internal(format!("Corrupt session record: {}", e)))?;
                Ok(Some(session))
            }
            None => Ok(None),
        }
    }

    /// Close one session
    pub async fn delete(&self, session: &Session) -> AppResult<()> {
        let mut conn = self.connection();
        redis::pipe()
            .del(session_key(session.id))
            .ignore()
            .srem(member_sessions_key(session.member.id), session.id.to_string())
            .ignore()
            .query_async::<_, ()>(&mut conn)
            .await?;

        tracing::debug!(member_id = session.member.id, session_id = %session.id, "Session closed");
        Ok(())
    }

    /// Close every session of a member, returning how many were open
    pub async fn revoke_member(&self, member_id: i32) -> AppResult<usize> {
        let mut conn = self.connection();
        let index_key = member_sessions_key(member_id);

        let ids: Vec<String> = conn.smembers(&index_key).await?;
        let mut keys: Vec<String> = ids
            .iter()
            .filter_map(|id| Uuid::parse_str(id).ok())
            .map(session_key)
            .collect();
        keys.push(index_key);

        let _: () = conn.del(&keys).await?;
        if !ids.is_empty() {
            tracing::info!(member_id, sessions = ids.len(), "Revoked member sessions");
        }

        Ok(ids.len())
    }
}
