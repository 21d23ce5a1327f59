//! Structured diagnostics.
//!
//! Events carry a level, an optional stable code, the emitting module and a
//! free-form JSON context. [`DbEventLog`] persists them to the `event_log`
//! table and mirrors them to the `log` facade; [`MemoryEventLog`] keeps them
//! in process.

use std::sync::Mutex;

use r2d2_sqlite::rusqlite::{params, Connection};
use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::db::DbPool;

pub fn log_event(
    conn: &Connection,
    level: &str,
    code: Option<&str>,
    module: &str,
    message: &str,
    explain: Option<&str>,
    data: Option<Value>,
) -> rusqlite::Result<()> {
    let id = Uuid::new_v4().to_string();
    let ts = OffsetDateTime::now_utc().unix_timestamp();
    let data_str = data.map(|v| v.to_string());
    conn.execute(
        "INSERT INTO event_log (id, ts, level, code, module, message, explain, data) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![id, ts, level, code, module, message, explain, data_str],
    )?;
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventLevel {
    Info,
    Warn,
    Error,
}

impl EventLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    fn as_log_level(&self) -> log::Level {
        match self {
            Self::Info => log::Level::Info,
            Self::Warn => log::Level::Warn,
            Self::Error => log::Level::Error,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LogEvent {
    pub level: EventLevel,
    pub code: Option<&'static str>,
    pub module: &'static str,
    pub message: String,
    pub explain: Option<&'static str>,
    pub data: Option<Value>,
}

impl LogEvent {
    pub fn new(level: EventLevel, module: &'static str, message: impl Into<String>) -> Self {
        Self {
            level,
            code: None,
            module,
            message: message.into(),
            explain: None,
            data: None,
        }
    }

    pub fn code(mut self, code: &'static str) -> Self {
        self.code = Some(code);
        self
    }

    pub fn explain(mut self, explain: &'static str) -> Self {
        self.explain = Some(explain);
        self
    }

    pub fn data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }
}

/// Receiver for structured events. Implementations must not block the caller
/// for long; the gateway records events from inside async tasks.
pub trait EventSink: Send + Sync {
    fn record(&self, event: LogEvent);
}

/// Persists events to SQLite and mirrors them to the `log` facade.
#[derive(Clone)]
pub struct DbEventLog {
    pool: DbPool,
}

impl DbEventLog {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn write(pool: &DbPool, event: &LogEvent) {
        if let Ok(conn) = pool.get() {
            let _ = log_event(
                &conn,
                event.level.as_str(),
                event.code,
                event.module,
                &event.message,
                event.explain,
                event.data.clone(),
            );
        }
    }
}

impl EventSink for DbEventLog {
    fn record(&self, event: LogEvent) {
        mirror_to_log(&event);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let pool = self.pool.clone();
                handle.spawn_blocking(move || Self::write(&pool, &event));
            }
            Err(_) => Self::write(&self.pool, &event),
        }
    }
}

/// In-process buffer of events, newest last.
#[derive(Default)]
pub struct MemoryEventLog {
    events: Mutex<Vec<LogEvent>>,
}

impl MemoryEventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<LogEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    pub fn count(&self, level: EventLevel) -> usize {
        self.events().iter().filter(|e| e.level == level).count()
    }
}

impl EventSink for MemoryEventLog {
    fn record(&self, event: LogEvent) {
        mirror_to_log(&event);
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

fn mirror_to_log(event: &LogEvent) {
    match &event.data {
        Some(data) => log::log!(
            target: event.module,
            event.level.as_log_level(),
            "{} {}",
            event.message,
            data
        ),
        None => log::log!(target: event.module, event.level.as_log_level(), "{}", event.message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn db_event_log_writes_rows_outside_runtime() {
        let dir = tempfile::tempdir().unwrap();
        let pool = crate::db::init_db(dir.path().to_path_buf()).unwrap();
        let sink = DbEventLog::new(pool.clone());

        sink.record(
            LogEvent::new(EventLevel::Warn, "ai.resolver", "using defaults")
                .code("AI-0101")
                .data(json!({ "reason": "no user" })),
        );

        let conn = pool.get().unwrap();
        let (level, code, data): (String, Option<String>, Option<String>) = conn
            .query_row(
                "SELECT level, code, data FROM event_log WHERE module = 'ai.resolver'",
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .unwrap();
        assert_eq!(level, "warn");
        assert_eq!(code.as_deref(), Some("AI-0101"));
        assert!(data.unwrap().contains("no user"));
    }

    #[test]
    fn memory_log_counts_by_level() {
        let sink = MemoryEventLog::new();
        sink.record(LogEvent::new(EventLevel::Info, "ai.runtime", "ok"));
        sink.record(LogEvent::new(EventLevel::Warn, "ai.runtime", "retry"));
        sink.record(LogEvent::new(EventLevel::Warn, "ai.runtime", "retry"));
        assert_eq!(sink.count(EventLevel::Warn), 2);
        assert_eq!(sink.count(EventLevel::Error), 0);
        assert_eq!(sink.events()[0].message, "ok");
    }
}
