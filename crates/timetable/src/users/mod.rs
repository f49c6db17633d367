//! Known users, the group each one saved, and a log of their schedule requests.
//!
//! Users are keyed by their chat id. A request is only logged for a user that
//! is already registered.

mod error;

pub use error::UserStoreError;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row};
use serde::Serialize;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

const SCHEMA_SQL: &str = include_str!("../../../../sql/init_users.sql");

/// Command logged when a client asks for every week of a group.
pub const ALL_WEEKS_COMMAND: &str = "schedule_all_weeks";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: i64,
    pub telegram_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    /// Group used when a request names none
    pub group_name: Option<String>,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

/// Profile fields recorded when a user is first seen.
#[derive(Debug, Clone, Default)]
pub struct Profile {
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub group_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserRequest {
    pub command: String,
    pub group_name: Option<String>,
    pub requested_at: DateTime<Utc>,
}

pub struct UserStore {
    db: Mutex<Connection>,
}

impl UserStore {
    /// Opens (or creates) the user database and initializes its schema
    pub fn open(db_path: &str) -> Result<Self, UserStoreError> {
        let conn = Connection::open(db_path)?;
        info!(path = db_path, "Opened user database");
        Self::with_connection(conn)
    }

    pub fn in_memory() -> Result<Self, UserStoreError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, UserStoreError> {
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(Self {
            db: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, UserStoreError> {
        self.db.lock().map_err(|_| UserStoreError::Poisoned)
    }

    /// Returns the user, registering them on first sight.
    ///
    /// An existing user keeps their profile; only `last_activity` is touched,
    /// and their group is replaced when `profile.group_name` is set.
    pub fn get_or_create_user(
        &self,
        telegram_id: i64,
        profile: &Profile,
    ) -> Result<User, UserStoreError> {
        self.get_or_create_user_at(telegram_id, profile, Utc::now())
    }

    pub fn get_or_create_user_at(
        &self,
        telegram_id: i64,
        profile: &Profile,
        now: DateTime<Utc>,
    ) -> Result<User, UserStoreError> {
        let db = self.conn()?;
        db.execute(
            "INSERT INTO users
                (telegram_id, username, first_name, last_name, group_name, created_at, last_activity)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
             ON CONFLICT (telegram_id) DO UPDATE SET
                group_name = COALESCE(excluded.group_name, users.group_name),
                last_activity = excluded.last_activity",
            (
                telegram_id,
                profile.username.as_deref(),
                profile.first_name.as_deref(),
                profile.last_name.as_deref(),
                profile.group_name.as_deref(),
                now,
            ),
        )?;
        debug!(telegram_id, "Touched user");

        let user = select_user(&db, telegram_id)?.ok_or(rusqlite::Error::QueryReturnedNoRows)?;
        Ok(user)
    }

    pub fn get_user(&self, telegram_id: i64) -> Result<Option<User>, UserStoreError> {
        let db = self.conn()?;
        select_user(&db, telegram_id)
    }

    /// Saves the group a user works with. Returns false for an unknown user.
    pub fn update_user_group(
        &self,
        telegram_id: i64,
        group_name: &str,
    ) -> Result<bool, UserStoreError> {
        let db = self.conn()?;
        let updated = db.execute(
            "UPDATE users SET group_name = ?2 WHERE telegram_id = ?1",
            (telegram_id, group_name),
        )?;
        Ok(updated > 0)
    }

    /// Appends a request to the log. Returns false, logging nothing, for an
    /// unknown user.
    pub fn log_request(
        &self,
        telegram_id: i64,
        command: &str,
        group_name: Option<&str>,
    ) -> Result<bool, UserStoreError> {
        self.log_request_at(telegram_id, command, group_name, Utc::now())
    }

    pub fn log_request_at(
        &self,
        telegram_id: i64,
        command: &str,
        group_name: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<bool, UserStoreError> {
        let db = self.conn()?;
        let inserted = db.execute(
            "INSERT INTO user_requests (user_id, command, group_name, requested_at)
             SELECT id, ?2, ?3, ?4 FROM users WHERE telegram_id = ?1",
            (telegram_id, command, group_name, now),
        )?;
        Ok(inserted > 0)
    }

    /// Most recent requests of a user, newest first.
    pub fn recent_requests(
        &self,
        telegram_id: i64,
        limit: usize,
    ) -> Result<Vec<UserRequest>, UserStoreError> {
        let db = self.conn()?;
        let mut stmt = db.prepare_cached(
            "SELECT r.command, r.group_name, r.requested_at
             FROM user_requests r JOIN users u ON u.id = r.user_id
             WHERE u.telegram_id = ?1
             ORDER BY r.requested_at DESC, r.id DESC
             LIMIT ?2",
        )?;

        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let requests = stmt
            .query_map((telegram_id, limit), |row| {
                Ok(UserRequest {
                    command: row.get(0)?,
                    group_name: row.get(1)?,
                    requested_at: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(requests)
    }
}

fn select_user(db: &Connection, telegram_id: i64) -> Result<Option<User>, UserStoreError> {
    let mut stmt = db.prepare_cached(
        "SELECT id, telegram_id, username, first_name, last_name, group_name,
                is_admin, created_at, last_activity
         FROM users WHERE telegram_id = ?1",
    )?;
    let user = stmt.query_row([telegram_id], user_from_row).optional()?;
    Ok(user)
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        telegram_id: row.get(1)?,
        username: row.get(2)?,
        first_name: row.get(3)?,
        last_name: row.get(4)?,
        group_name: row.get(5)?,
        is_admin: row.get(6)?,
        created_at: row.get(7)?,
        last_activity: row.get(8)?,
    })
}
