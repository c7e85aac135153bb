//! Transport-agnostic application state.
//!
//! `CoreState` is the single shared state behind the HTTP surface: the
//! database location plus the live session registry. Wrapped in `Arc` at
//! startup; uses `RwLock` so token resolution (every request) reads
//! concurrently while login/logout takes the write lock.

use std::path::PathBuf;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use uuid::Uuid;

use crate::auth::{Session, SessionStore};
use crate::config;
use crate::db;
use crate::models::enums::Role;

pub struct CoreState {
    /// Portal database location.
    pub db_path: PathBuf,
    /// Live bearer sessions, keyed by token hash.
    sessions: RwLock<SessionStore>,
}

impl CoreState {
    /// Create a CoreState against the configured database path.
    pub fn new() -> Self {
        Self::with_database_path(config::database_path())
    }

    /// Create a CoreState against an explicit database path (tests).
    pub fn with_database_path(db_path: PathBuf) -> Self {
        Self {
            db_path,
            sessions: RwLock::new(SessionStore::new()),
        }
    }

    /// Open a database connection. One connection per request; migrations
    /// are a no-op after the first open.
    pub fn open_db(&self) -> Result<rusqlite::Connection, CoreError> {
        db::open_database(&self.db_path).map_err(CoreError::Database)
    }

    // ── Session registry ────────────────────────────────────

    pub fn read_sessions(&self) -> Result<RwLockReadGuard<'_, SessionStore>, CoreError> {
        self.sessions.read().map_err(|_| CoreError::LockPoisoned)
    }

    pub fn write_sessions(&self) -> Result<RwLockWriteGuard<'_, SessionStore>, CoreError> {
        self.sessions.write().map_err(|_| CoreError::LockPoisoned)
    }

    /// Issue a token for a freshly authenticated account.
    pub fn issue_session(&self, account_id: Uuid, role: Role) -> Result<String, CoreError> {
        Ok(self.write_sessions()?.issue(account_id, role))
    }

    /// Resolve a presented bearer token.
    pub fn resolve_session(&self, token: &str) -> Result<Option<Session>, CoreError> {
        Ok(self.read_sessions()?.resolve(token))
    }

    /// Revoke a token (logout).
    pub fn revoke_session(&self, token: &str) -> Result<bool, CoreError> {
        Ok(self.write_sessions()?.revoke(token))
    }
}

impl Default for CoreState {
    fn default() -> Self {
        Self::new()
    }
}

/// Errors from CoreState operations.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Internal lock error")]
    LockPoisoned,
    #[error("Database error: {0}")]
    Database(#[from] db::DatabaseError),
}
