use std::str::FromStr;

use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use crate::db::repository::parse_timestamp;
use crate::db::DatabaseError;
use crate::models::enums::Role;
use crate::models::Account;

pub fn insert_account(conn: &Connection, account: &Account) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO accounts (id, email, password_hash, role, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            account.id.to_string(),
            account.email,
            account.password_hash,
            account.role.as_str(),
            account.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        ],
    )?;
    Ok(())
}

fn account_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<(String, String, String, String, String)> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
    ))
}

fn build_account(
    (id, email, password_hash, role, created_at): (String, String, String, String, String),
) -> Result<Account, DatabaseError> {
    Ok(Account {
        id: Uuid::parse_str(&id).unwrap_or_default(),
        email,
        password_hash,
        role: Role::from_str(&role)?,
        created_at: parse_timestamp(&created_at),
    })
}

pub fn get_account(conn: &Connection, id: &Uuid) -> Result<Option<Account>, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT id, email, password_hash, role, created_at
             FROM accounts WHERE id = ?1",
            params![id.to_string()],
            account_from_row,
        )
        .optional()?;
    row.map(build_account).transpose()
}

pub fn get_account_by_email(
    conn: &Connection,
    email: &str,
) -> Result<Option<Account>, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT id, email, password_hash, role, created_at
             FROM accounts WHERE email = ?1",
            params![email],
            account_from_row,
        )
        .optional()?;
    row.map(build_account).transpose()
}

pub fn list_accounts(conn: &Connection) -> Result<Vec<Account>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, email, password_hash, role, created_at
         FROM accounts ORDER BY created_at",
    )?;
    let rows = stmt.query_map([], account_from_row)?;

    let mut accounts = Vec::new();
    for row in rows {
        accounts.push(build_account(row?)?);
    }
    Ok(accounts)
}

/// (role, count) pairs for the admin reports view.
pub fn count_accounts_by_role(conn: &Connection) -> Result<Vec<(String, i64)>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT role, COUNT(*) FROM accounts GROUP BY role ORDER BY role",
    )?;
    let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}
