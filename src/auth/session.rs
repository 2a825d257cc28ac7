//! Server-side sessions keyed by an opaque bearer token.
//!
//! Only the SHA-256 digest of a token is persisted, so a leaked `sessions`
//! table cannot be replayed. A session is `Active` until it is destroyed on
//! logout or its `expires_at` passes; neither transition can be undone.

use std::{sync::Arc, time::Duration};

use anyhow::Context;
use async_trait::async_trait;
use base64ct::{Base64UrlUnpadded, Encoding};
use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha256};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::auth::repo_types::UserId;

const TOKEN_BYTES: usize = 32;

#[derive(Debug, Clone, FromRow)]
pub struct Session {
    pub token_hash: String,
    pub user_id: UserId,
    pub created_at: OffsetDateTime,
    pub expires_at: OffsetDateTime,
}

impl Session {
    pub fn is_expired(&self, now: OffsetDateTime) -> bool {
        self.expires_at <= now
    }
}

/// A freshly created session together with the plaintext token handed to
/// the client. The token is never recoverable afterwards.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub token: String,
    pub session: Session,
}

pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    Base64UrlUnpadded::encode_string(&bytes)
}

pub fn token_digest(token: &str) -> String {
    Base64UrlUnpadded::encode_string(&Sha256::digest(token.as_bytes()))
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn insert(&self, session: &Session) -> anyhow::Result<()>;
    /// Returns the session only while it is still active at `now`.
    async fn find_active(
        &self,
        token_hash: &str,
        now: OffsetDateTime,
    ) -> anyhow::Result<Option<Session>>;
    async fn delete(&self, token_hash: &str) -> anyhow::Result<bool>;
    async fn purge_expired(&self, now: OffsetDateTime) -> anyhow::Result<u64>;
}

#[derive(Clone)]
pub struct PgSessionStore {
    db: PgPool,
}

impl PgSessionStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn insert(&self, session: &Session) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO sessions (token_hash, user_id, created_at, expires_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(&session.token_hash)
        .bind(session.user_id)
        .bind(session.created_at)
        .bind(session.expires_at)
        .execute(&self.db)
        .await
        .context("insert session")?;
        Ok(())
    }

    async fn find_active(
        &self,
        token_hash: &str,
        now: OffsetDateTime,
    ) -> anyhow::Result<Option<Session>> {
        let row = sqlx::query_as::<_, Session>(
            r#"
            SELECT token_hash, user_id, created_at, expires_at
              FROM sessions
             WHERE token_hash = $1 AND expires_at > $2
            "#,
        )
        .bind(token_hash)
        .bind(now)
        .fetch_optional(&self.db)
        .await
        .context("find session")?;
        Ok(row)
    }

    async fn delete(&self, token_hash: &str) -> anyhow::Result<bool> {
        let res = sqlx::query("DELETE FROM sessions WHERE token_hash = $1")
            .bind(token_hash)
            .execute(&self.db)
            .await
            .context("delete session")?;
        Ok(res.rows_affected() > 0)
    }

    async fn purge_expired(&self, now: OffsetDateTime) -> anyhow::Result<u64> {
        let res = sqlx::query("DELETE FROM sessions WHERE expires_at <= $1")
            .bind(now)
            .execute(&self.db)
            .await
            .context("purge sessions")?;
        Ok(res.rows_affected())
    }
}

/// Issues, resolves and destroys sessions with a fixed time-to-live.
#[derive(Clone)]
pub struct SessionManager {
    store: Arc<dyn SessionStore>,
    ttl: time::Duration,
}

impl SessionManager {
    pub fn new(store: Arc<dyn SessionStore>, ttl: time::Duration) -> Self {
        Self { store, ttl }
    }

    pub async fn issue(&self, user_id: UserId) -> anyhow::Result<IssuedSession> {
        let token = generate_token();
        let now = OffsetDateTime::now_utc();
        let session = Session {
            token_hash: token_digest(&token),
            user_id,
            created_at: now,
            expires_at: now + self.ttl,
        };
        self.store.insert(&session).await?;
        debug!(user_id, expires_at = %session.expires_at, "session issued");
        Ok(IssuedSession { token, session })
    }

    /// Unknown, expired and destroyed tokens all resolve to `None`.
    pub async fn resolve(&self, token: &str) -> anyhow::Result<Option<Session>> {
        let now = OffsetDateTime::now_utc();
        let found = self.store.find_active(&token_digest(token), now).await?;
        Ok(found.filter(|s| !s.is_expired(now)))
    }

    pub async fn destroy(&self, token: &str) -> anyhow::Result<bool> {
        self.store.delete(&token_digest(token)).await
    }

    pub async fn purge_expired(&self) -> anyhow::Result<u64> {
        self.store.purge_expired(OffsetDateTime::now_utc()).await
    }
}

/// Periodically deletes expired sessions until the runtime shuts down.
pub fn spawn_purge_task(manager: SessionManager, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            match manager.purge_expired().await {
                Ok(0) => {}
                Ok(n) => info!(purged = n, "expired sessions removed"),
                Err(e) => warn!(error = %e, "session purge failed"),
            }
        }
    })
}
