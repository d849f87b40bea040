use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use futures::future::BoxFuture;
use rusqlite::{params, Connection};

use murmur_core::error::{MurmurError, Result};
use murmur_core::traits::Checkpointer;
use murmur_core::types::{SwarmState, ThreadId};

/// Persistent checkpoint store backed by SQLite.
///
/// One row per thread; a save replaces the previous snapshot in a single
/// statement, so a snapshot is either fully committed or fully absent.
pub struct SqliteCheckpointer {
    conn: Mutex<Connection>,
}

impl SqliteCheckpointer {
    /// Open or create the checkpoint database.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)
            .map_err(|e| MurmurError::Checkpoint(format!("Failed to open store: {}", e)))?;

        conn.execute_batch(
            "PRAGMA journal_mode=WAL;
             PRAGMA synchronous=NORMAL;

             CREATE TABLE IF NOT EXISTS swarm_checkpoints (
                 thread_id TEXT PRIMARY KEY,
                 state_json TEXT NOT NULL,
                 updated_at TEXT NOT NULL
             );",
        )
        .map_err(|e| MurmurError::Checkpoint(format!("Failed to initialize schema: {}", e)))?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

impl Checkpointer for SqliteCheckpointer {
    fn save(&self, thread: &ThreadId, state: &SwarmState) -> BoxFuture<'_, Result<()>> {
        let thread = thread.clone();
        let state_json = serde_json::to_string(state);
        Box::pin(async move {
            let state_json = state_json?;
            let conn = self
                .conn
                .lock()
                .map_err(|e| MurmurError::Checkpoint(e.to_string()))?;

            conn.execute(
                "INSERT OR REPLACE INTO swarm_checkpoints (thread_id, state_json, updated_at)
                 VALUES (?1, ?2, ?3)",
                params![thread.0, state_json, chrono::Utc::now().to_rfc3339()],
            )
            .map_err(|e| MurmurError::Checkpoint(format!("Failed to save: {}", e)))?;

            Ok(())
        })
    }

    fn load(&self, thread: &ThreadId) -> BoxFuture<'_, Result<Option<SwarmState>>> {
        let thread = thread.clone();
        Box::pin(async move {
            let conn = self
                .conn
                .lock()
                .map_err(|e| MurmurError::Checkpoint(e.to_string()))?;

            let mut stmt = conn
                .prepare("SELECT state_json FROM swarm_checkpoints WHERE thread_id = ?1")
                .map_err(|e| MurmurError::Checkpoint(format!("Failed to prepare query: {}", e)))?;

            // Only a genuinely missing row reads as "no checkpoint"; a
            // storage failure must not be mistaken for an empty thread.
            match stmt.query_row(params![thread.0], |row| row.get::<_, String>(0)) {
                Ok(json) => Ok(Some(serde_json::from_str(&json)?)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(MurmurError::Checkpoint(format!("Failed to load: {}", e))),
            }
        })
    }

    fn delete(&self, thread: &ThreadId) -> BoxFuture<'_, Result<()>> {
        let thread = thread.clone();
        Box::pin(async move {
            let conn = self
                .conn
                .lock()
                .map_err(|e| MurmurError::Checkpoint(e.to_string()))?;
            conn.execute(
                "DELETE FROM swarm_checkpoints WHERE thread_id = ?1",
                params![thread.0],
            )
            .map_err(|e| MurmurError::Checkpoint(format!("Failed to delete: {}", e)))?;
            Ok(())
        })
    }
}

/// In-memory checkpointer for tests and ephemeral deployments.
#[derive(Default)]
pub struct MemoryCheckpointer {
    states: Mutex<HashMap<ThreadId, SwarmState>>,
}

impl MemoryCheckpointer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Checkpointer for MemoryCheckpointer {
    fn save(&self, thread: &ThreadId, state: &SwarmState) -> BoxFuture<'_, Result<()>> {
        let thread = thread.clone();
        let state = state.clone();
        Box::pin(async move {
            self.states
                .lock()
                .map_err(|e| MurmurError::Checkpoint(e.to_string()))?
                .insert(thread, state);
            Ok(())
        })
    }

    fn load(&self, thread: &ThreadId) -> BoxFuture<'_, Result<Option<SwarmState>>> {
        let thread = thread.clone();
        Box::pin(async move {
            Ok(self
                .states
                .lock()
                .map_err(|e| MurmurError::Checkpoint(e.to_string()))?
                .get(&thread)
                .cloned())
        })
    }

    fn delete(&self, thread: &ThreadId) -> BoxFuture<'_, Result<()>> {
        let thread = thread.clone();
        Box::pin(async move {
            self.states
                .lock()
                .map_err(|e| MurmurError::Checkpoint(e.to_string()))?
                .remove(&thread);
            Ok(())
        })
    }
}
