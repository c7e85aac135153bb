//! Repository layer — entity-scoped database operations.
//!
//! All public functions take a borrowed `rusqlite::Connection` and are
//! re-exported here so callers can use `crate::db::repository::*`.

mod account;
mod health_record;
mod notification;
mod profile;
mod request;

use chrono::NaiveDateTime;

pub use account::*;
pub use health_record::*;
pub use notification::*;
pub use profile::*;
pub use request::*;

/// Parse a canonical '%Y-%m-%d %H:%M:%S' column value.
pub(crate) fn parse_timestamp(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap_or_default()
}
