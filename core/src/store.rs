//! Persistence seam for subscriptions.
//!
//! The entitlement core only ever sees plain [`Subscription`] values; where
//! they come from is decided by the [`SubscriptionRepository`] a host injects.

use std::sync::{Mutex, PoisonError};

use anyhow::{Context, Result};
use r2d2_sqlite::rusqlite::{params, Connection, OptionalExtension};
use time::OffsetDateTime;

use crate::db::DbPool;
use crate::entitlements::Subscription;
use crate::errors::CozyError;
use crate::logging::{record_event, AuditEvent};

pub trait SubscriptionRepository: Send + Sync {
    /// `None` means the user has never had a subscription stored.
    fn load(&self) -> Result<Option<Subscription>>;
    fn save(&self, subscription: &Subscription) -> Result<()>;
}

/// SQLite-backed repository for one user.
pub struct SqliteSubscriptionRepository {
    pool: DbPool,
    user_id: String,
}

impl SqliteSubscriptionRepository {
    pub fn new(pool: DbPool, user_id: impl Into<String>) -> Self {
        Self {
            pool,
            user_id: user_id.into(),
        }
    }

    pub fn pool(&self) -> DbPool {
        self.pool.clone()
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }
}

impl SubscriptionRepository for SqliteSubscriptionRepository {
    /// A payload that no longer parses is replaced by the free defaults
    /// rather than failing the session.
    fn load(&self) -> Result<Option<Subscription>> {
        let conn = self.pool.get().context(CozyError::DbUnavailable)?;
        let payload: Option<String> = conn
            .query_row(
                "SELECT payload FROM subscriptions WHERE user_id = ?1",
                params![self.user_id],
                |row| row.get(0),
            )
            .optional()?;

        let Some(raw) = payload else {
            return Ok(None);
        };
        match serde_json::from_str::<Subscription>(&raw) {
            Ok(subscription) => Ok(Some(subscription)),
            Err(err) => {
                let message = err.to_string();
                let event = AuditEvent::warn("plan.store", "PLN-0101", "stored subscription is invalid")
                    .explain("Falling back to the free plan defaults")
                    .data(serde_json::json!({ "user_id": self.user_id, "error": message }));
                if let Err(err) = record_event(&conn, &event) {
                    log::warn!("failed to record audit event: {err}");
                }
                let fallback = Subscription::default();
                write_subscription(&conn, &self.user_id, &fallback)?;
                Ok(Some(fallback))
            }
        }
    }

    fn save(&self, subscription: &Subscription) -> Result<()> {
        let conn = self.pool.get().context(CozyError::DbUnavailable)?;
        write_subscription(&conn, &self.user_id, subscription)
    }
}

fn write_subscription(conn: &Connection, user_id: &str, subscription: &Subscription) -> Result<()> {
    let payload = serde_json::to_string(subscription)?;
    let now = OffsetDateTime::now_utc().unix_timestamp();
    conn.execute(
        "INSERT INTO subscriptions (user_id, tier, payload, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?4)
         ON CONFLICT(user_id) DO UPDATE SET tier = excluded.tier, payload = excluded.payload, updated_at = excluded.updated_at",
        params![user_id, subscription.tier.as_str(), payload, now],
    )
    .map_err(|err| CozyError::Storage(format!("failed to save subscription for {user_id}: {err}")))?;
    Ok(())
}

/// Process-local repository for tests and throwaway sessions.
#[derive(Default)]
pub struct MemorySubscriptionRepository {
    slot: Mutex<Option<Subscription>>,
}

impl MemorySubscriptionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(subscription: Subscription) -> Self {
        Self {
            slot: Mutex::new(Some(subscription)),
        }
    }

    pub fn stored(&self) -> Option<Subscription> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl SubscriptionRepository for MemorySubscriptionRepository {
    fn load(&self) -> Result<Option<Subscription>> {
        Ok(self.stored())
    }

    fn save(&self, subscription: &Subscription) -> Result<()> {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(subscription.clone());
        Ok(())
    }
}
