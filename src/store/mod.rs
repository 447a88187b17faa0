//! Persistence seams. The MySQL implementation backs the running service;
//! the in-memory one backs the tests.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;

use crate::model::{
    attendance::{AttendanceEntry, NewAttendance},
    role::Role,
    user::{MemberSummary, MembershipStats, NewUser, ProfileUpdate, User},
};

#[cfg(test)]
pub mod memory;
pub mod mysql;

#[derive(Debug, Error)]
pub enum StoreError {
    /// A uniqueness constraint rejected the write
    #[error("duplicate record")]
    Duplicate,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("unreadable row: {0}")]
    Corrupt(String),
}

/// Attendance query: optional member, optional inclusive instant bounds,
/// newest first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryFilter {
    pub member_id: Option<u64>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub offset: u64,
    pub limit: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserFilter {
    /// Case-insensitive substring of username or full name
    pub search: Option<String>,
    pub offset: u64,
    pub limit: u64,
}

#[async_trait]
pub trait AttendanceStore: Send + Sync {
    /// Appends an entry. Fails with [`StoreError::Duplicate`] when the member
    /// already has an entry on `entry.day`.
    async fn insert(&self, entry: NewAttendance) -> Result<AttendanceEntry, StoreError>;

    async fn find_on_day(
        &self,
        member_id: u64,
        day: NaiveDate,
    ) -> Result<Option<AttendanceEntry>, StoreError>;

    /// One page of matching entries plus the total match count.
    async fn page(&self, filter: &HistoryFilter) -> Result<(Vec<AttendanceEntry>, u64), StoreError>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find(&self, id: u64) -> Result<Option<User>, StoreError>;

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError>;

    async fn username_exists(&self, username: &str) -> Result<bool, StoreError>;

    /// Fails with [`StoreError::Duplicate`] when the username is taken.
    async fn create(&self, user: NewUser) -> Result<u64, StoreError>;

    async fn set_password(&self, id: u64, password_hash: &str) -> Result<bool, StoreError>;

    async fn update_profile(
        &self,
        id: u64,
        update: &ProfileUpdate,
    ) -> Result<Option<User>, StoreError>;

    async fn touch_last_login(&self, id: u64, at: DateTime<Utc>) -> Result<(), StoreError>;

    async fn set_role(&self, id: u64, role: Role) -> Result<Option<User>, StoreError>;

    async fn toggle_member(&self, id: u64) -> Result<Option<User>, StoreError>;

    /// Removes the user and, with it, their attendance entries.
    async fn delete(&self, id: u64) -> Result<bool, StoreError>;

    async fn page(&self, filter: &UserFilter) -> Result<(Vec<User>, u64), StoreError>;

    async fn summaries(&self, ids: &[u64]) -> Result<HashMap<u64, MemberSummary>, StoreError>;

    async fn stats(&self) -> Result<MembershipStats, StoreError>;

    async fn usernames(&self) -> Result<Vec<String>, StoreError>;

    /// Usernames that logged in at or after `since`, most recent first.
    async fn recent_usernames(&self, since: DateTime<Utc>) -> Result<Vec<String>, StoreError>;
}
