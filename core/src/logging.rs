//! Audit trail for plan changes and other user-visible state transitions.
//!
//! Events land in the `event_log` table and are mirrored to the `log` facade
//! so that a host with a logger installed sees them as well.

use r2d2_sqlite::rusqlite::{params, Connection};
use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventLevel {
    Info,
    Warn,
    Error,
}

impl EventLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventLevel::Info => "info",
            EventLevel::Warn => "warn",
            EventLevel::Error => "error",
        }
    }

    fn log_level(&self) -> log::Level {
        match self {
            EventLevel::Info => log::Level::Info,
            EventLevel::Warn => log::Level::Warn,
            EventLevel::Error => log::Level::Error,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AuditEvent<'a> {
    pub level: EventLevel,
    pub code: Option<&'a str>,
    pub module: &'a str,
    pub message: &'a str,
    pub explain: Option<&'a str>,
    pub data: Option<Value>,
}

impl<'a> AuditEvent<'a> {
    pub fn info(module: &'a str, code: &'a str, message: &'a str) -> Self {
        Self {
            level: EventLevel::Info,
            code: Some(code),
            module,
            message,
            explain: None,
            data: None,
        }
    }

    pub fn warn(module: &'a str, code: &'a str, message: &'a str) -> Self {
        Self {
            level: EventLevel::Warn,
            ..Self::info(module, code, message)
        }
    }

    pub fn explain(mut self, explain: &'a str) -> Self {
        self.explain = Some(explain);
        self
    }

    pub fn data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }
}

/// Insert `event` into `event_log` and return its id.
pub fn record_event(conn: &Connection, event: &AuditEvent<'_>) -> rusqlite::Result<String> {
    log::log!(
        event.level.log_level(),
        "[{}] {}{}",
        event.module,
        event.message,
        event.code.map(|c| format!(" ({c})")).unwrap_or_default()
    );
    let id = Uuid::new_v4().to_string();
    let ts = OffsetDateTime::now_utc().unix_timestamp();
    let data_str = event.data.as_ref().map(|v| v.to_string());
    conn.execute(
        "INSERT INTO event_log (id, ts, level, code, module, message, explain, data) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            id,
            ts,
            event.level.as_str(),
            event.code,
            event.module,
            event.message,
            event.explain,
            data_str
        ],
    )?;
    Ok(id)
}

/// Most recent events for `module`, newest first.
pub fn recent_events(conn: &Connection, module: &str, limit: usize) -> rusqlite::Result<Vec<LoggedEvent>> {
    let mut stmt = conn.prepare(
        "SELECT id, ts, level, code, message, explain, data FROM event_log WHERE module = ?1 ORDER BY ts DESC, rowid DESC LIMIT ?2",
    )?;
    let rows = stmt.query_map(params![module, limit as i64], |row| {
        let data_str: Option<String> = row.get(6)?;
        Ok(LoggedEvent {
            id: row.get(0)?,
            ts: row.get(1)?,
            level: row.get(2)?,
            code: row.get(3)?,
            message: row.get(4)?,
            explain: row.get(5)?,
            data: data_str.and_then(|raw| serde_json::from_str(&raw).ok()),
        })
    })?;
    rows.collect()
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct LoggedEvent {
    pub id: String,
    pub ts: i64,
    pub level: String,
    pub code: Option<String>,
    pub message: String,
    pub explain: Option<String>,
    pub data: Option<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::apply_migrations;

    #[test]
    fn recorded_events_are_listed_newest_first() {
        let conn = Connection::open_in_memory().unwrap();
        apply_migrations(&conn).unwrap();
        record_event(&conn, &AuditEvent::info("plan", "PLN-0001", "first")).unwrap();
        record_event(
            &conn,
            &AuditEvent::warn("plan", "PLN-0002", "second")
                .explain("trial ended")
                .data(serde_json::json!({ "tier": "free" })),
        )
        .unwrap();
        record_event(&conn, &AuditEvent::info("other", "X-0001", "ignored")).unwrap();

        let events = recent_events(&conn, "plan", 10).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].message, "second");
        assert_eq!(events[0].level, "warn");
        assert_eq!(events[0].explain.as_deref(), Some("trial ended"));
        assert_eq!(events[0].data.as_ref().unwrap()["tier"], "free");
        assert_eq!(events[1].code.as_deref(), Some("PLN-0001"));
    }
}
