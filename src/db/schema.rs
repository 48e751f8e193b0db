//! Database schema and record types

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

/// SQL schema for initialization
pub const SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS sessions (
    id TEXT PRIMARY KEY,
    candidate_id TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'ongoing',
    feedback TEXT,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_sessions_candidate ON sessions(candidate_id, created_at DESC);

CREATE TABLE IF NOT EXISTS turns (
    session_id TEXT NOT NULL,
    seq INTEGER NOT NULL,
    role TEXT NOT NULL,
    content TEXT NOT NULL,
    created_at TEXT NOT NULL,

    PRIMARY KEY (session_id, seq),
    FOREIGN KEY (session_id) REFERENCES sessions(id) ON DELETE CASCADE
);
";

/// Interview session lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Ongoing,
    Completed,
}

impl SessionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SessionStatus::Ongoing => "ongoing",
            SessionStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Session record
///
/// One attempt at an interview by one candidate. A candidate may
/// accumulate many sessions over time; only the most recently created
/// one can be active, and only while its status is `ongoing`.
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub id: String,
    pub candidate_id: String,
    pub status: SessionStatus,
    pub feedback: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Session {
    pub fn is_ongoing(&self) -> bool {
        self.status == SessionStatus::Ongoing
    }
}

/// Speaker role for a conversation turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Turn record
///
/// One immutable message in the interview conversation. Sequence numbers
/// within a session start at 0 and are contiguous; ordering by `seq`
/// reproduces the exact conversational order presented to the model.
#[derive(Debug, Clone, Serialize)]
pub struct Turn {
    pub session_id: String,
    pub seq: i64,
    pub role: Role,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// A turn that has not been assigned a sequence number yet
#[derive(Debug, Clone)]
pub struct TurnDraft {
    pub role: Role,
    pub content: String,
}

impl TurnDraft {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}
