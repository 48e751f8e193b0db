//! Persistence for interview sessions and conversation turns.
//!
//! Sessions live in a `sessions` table, turns in an append-only `turns`
//! table keyed by `(session_id, seq)`. The store is the sole source of
//! truth: turns are never cached in process memory and every read goes
//! back to SQLite, so a restarted process reconstructs exactly the state
//! it persisted.

mod schema;

pub use schema::*;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Session not found: {0}")]
    SessionNotFound(String),
}

pub type DbResult<T> = Result<T, DbError>;

/// Thread-safe database handle
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open or create database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let conn = Connection::open(path)?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    /// Open an in-memory database (for testing)
    #[allow(dead_code)] // Used in tests
    pub fn open_in_memory() -> DbResult<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    fn run_migrations(&self) -> DbResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    // ==================== Session Operations ====================

    /// Create a new ongoing session for a candidate
    pub fn create_session(&self, candidate_id: &str) -> DbResult<Session> {
        let conn = self.conn.lock().unwrap();
        let now = Utc::now();
        let id = uuid::Uuid::new_v4().to_string();

        conn.execute(
            "INSERT INTO sessions (id, candidate_id, status, feedback, created_at)
             VALUES (?1, ?2, 'ongoing', NULL, ?3)",
            params![id, candidate_id, now.to_rfc3339()],
        )?;

        Ok(Session {
            id,
            candidate_id: candidate_id.to_string(),
            status: SessionStatus::Ongoing,
            feedback: None,
            created_at: now,
        })
    }

    /// Get the most recently created session for a candidate, if any
    pub fn find_latest_session(&self, candidate_id: &str) -> DbResult<Option<Session>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, candidate_id, status, feedback, created_at
             FROM sessions WHERE candidate_id = ?1
             ORDER BY created_at DESC, rowid DESC LIMIT 1",
        )?;

        stmt.query_row(params![candidate_id], parse_session_row)
            .optional()
            .map_err(DbError::from)
    }

    /// Get a session by ID
    #[allow(dead_code)] // Used in tests
    pub fn get_session(&self, id: &str) -> DbResult<Session> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, candidate_id, status, feedback, created_at
             FROM sessions WHERE id = ?1",
        )?;

        stmt.query_row(params![id], parse_session_row)
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => DbError::SessionNotFound(id.to_string()),
                other => DbError::Sqlite(other),
            })
    }

    /// Mark a session completed and store its final feedback.
    ///
    /// This call alone does not guarantee at-most-once completion; the
    /// state machine ensures it runs a single time per session because a
    /// completed session no longer resolves as active.
    pub fn complete_session(&self, id: &str, feedback: &str) -> DbResult<()> {
        let conn = self.conn.lock().unwrap();

        let updated = conn.execute(
            "UPDATE sessions SET status = 'completed', feedback = ?1 WHERE id = ?2",
            params![feedback, id],
        )?;

        if updated == 0 {
            return Err(DbError::SessionNotFound(id.to_string()));
        }
        Ok(())
    }

    // ==================== Turn Operations ====================

    /// Append a batch of turns to a session.
    ///
    /// Sequence numbers are assigned contiguously, continuing from the
    /// session's current maximum (or starting at 0), and the whole batch
    /// is written in a single transaction: either every turn lands or
    /// none does.
    pub fn append_turns(&self, session_id: &str, drafts: &[TurnDraft]) -> DbResult<Vec<Turn>> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        let now = Utc::now();

        let mut seq: i64 = tx.query_row(
            "SELECT COALESCE(MAX(seq) + 1, 0) FROM turns WHERE session_id = ?1",
            params![session_id],
            |row| row.get(0),
        )?;

        let mut appended = Vec::with_capacity(drafts.len());
        for draft in drafts {
            tx.execute(
                "INSERT INTO turns (session_id, seq, role, content, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    session_id,
                    seq,
                    draft.role.as_str(),
                    draft.content,
                    now.to_rfc3339()
                ],
            )?;
            appended.push(Turn {
                session_id: session_id.to_string(),
                seq,
                role: draft.role,
                content: draft.content.clone(),
                created_at: now,
            });
            seq += 1;
        }

        tx.commit()?;
        Ok(appended)
    }

    /// Get all turns for a session, ordered by sequence number
    pub fn list_turns(&self, session_id: &str) -> DbResult<Vec<Turn>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT session_id, seq, role, content, created_at
             FROM turns WHERE session_id = ?1 ORDER BY seq ASC",
        )?;

        let rows = stmt.query_map(params![session_id], parse_turn_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(DbError::from)
    }
}

fn parse_session_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Session> {
    let status: String = row.get(2)?;
    Ok(Session {
        id: row.get(0)?,
        candidate_id: row.get(1)?,
        status: parse_status(&status),
        feedback: row.get(3)?,
        created_at: parse_datetime(&row.get::<_, String>(4)?),
    })
}

fn parse_turn_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Turn> {
    let role: String = row.get(2)?;
    Ok(Turn {
        session_id: row.get(0)?,
        seq: row.get(1)?,
        role: parse_role(&role),
        content: row.get(3)?,
        created_at: parse_datetime(&row.get::<_, String>(4)?),
    })
}

fn parse_status(s: &str) -> SessionStatus {
    match s {
        "completed" => SessionStatus::Completed,
        _ => SessionStatus::Ongoing,
    }
}

fn parse_role(s: &str) -> Role {
    match s {
        "user" => Role::User,
        "assistant" => Role::Assistant,
        _ => Role::System,
    }
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).map_or_else(|_| Utc::now(), |dt| dt.with_timezone(&Utc))
}
