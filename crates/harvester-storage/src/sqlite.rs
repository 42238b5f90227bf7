//! SQLite event store.
//!
//! Every operation opens its own connection on the blocking pool and
//! closes it when done. Concurrency control is left to SQLite.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use chaos_harvester_core::{events::ChaosEvent, Error, Result};
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::{debug, info, instrument};

use crate::EventStore;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS chaos_events (
        id TEXT PRIMARY KEY,
        source TEXT,
        insight TEXT,
        keywords TEXT,
        threat_level TEXT
    );
"#;

/// Single-file SQLite store for chaos events
#[derive(Debug, Clone)]
pub struct SqliteEventStore {
    path: PathBuf,
}

impl SqliteEventStore {
    /// Open the database at `path`, creating the file and table if absent
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let conn = connect(&path)?;
        conn.execute_batch(SCHEMA).map_err(storage_err)?;

        info!(path = %path.display(), "Event store ready");
        Ok(Self { path })
    }

    /// Run `op` against a fresh connection on the blocking pool
    async fn with_connection<T, F>(&self, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> rusqlite::Result<T> + Send + 'static,
    {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || {
            let conn = connect(&path)?;
            op(&conn).map_err(storage_err)
        })
        .await
        .map_err(|e| Error::internal(format!("Storage task failed: {}", e)))?
    }
}

fn connect(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path).map_err(storage_err)?;
    conn.busy_timeout(BUSY_TIMEOUT).map_err(storage_err)?;
    Ok(conn)
}

fn storage_err(e: rusqlite::Error) -> Error {
    Error::storage(e.to_string())
}

fn row_to_event(row: &Row<'_>) -> rusqlite::Result<ChaosEvent> {
    Ok(ChaosEvent {
        id: row.get(0)?,
        source: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
        insight: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
        keywords: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
        threat_level: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
    })
}

#[async_trait]
impl EventStore for SqliteEventStore {
    #[instrument(skip(self, event), fields(event_id = %event.id))]
    async fn insert(&self, event: &ChaosEvent) -> Result<()> {
        let event = event.clone();
        self.with_connection(move |conn| {
            conn.execute(
                "INSERT INTO chaos_events (id, source, insight, keywords, threat_level)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    event.id,
                    event.source,
                    event.insight,
                    event.keywords,
                    event.threat_level
                ],
            )
        })
        .await?;

        debug!("Chaos event inserted");
        Ok(())
    }

    async fn list(&self) -> Result<Vec<ChaosEvent>> {
        self.with_connection(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, source, insight, keywords, threat_level
                 FROM chaos_events ORDER BY id DESC",
            )?;
            let events = stmt
                .query_map([], row_to_event)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(events)
        })
        .await
    }

    async fn get(&self, id: &str) -> Result<Option<ChaosEvent>> {
        let id = id.to_string();
        self.with_connection(move |conn| {
            conn.query_row(
                "SELECT id, source, insight, keywords, threat_level
                 FROM chaos_events WHERE id = ?1",
                params![id],
                row_to_event,
            )
            .optional()
        })
        .await
    }

    async fn count(&self) -> Result<u64> {
        let count: i64 = self
            .with_connection(|conn| {
                conn.query_row("SELECT COUNT(*) FROM chaos_events", [], |row| row.get(0))
            })
            .await?;
        Ok(count.max(0) as u64)
    }

    async fn health_check(&self) -> Result<()> {
        self.with_connection(|conn| conn.query_row("SELECT 1", [], |_| Ok(())))
            .await
    }
}
