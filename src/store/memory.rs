use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use super::{AttendanceStore, HistoryFilter, StoreError, UserFilter, UserStore};
use crate::model::{
    attendance::{AttendanceEntry, NewAttendance},
    role::Role,
    user::{MemberSummary, MembershipStats, NewUser, ProfileUpdate, User},
};

/// Test double for both stores. One mutex guards everything, so a
/// check-and-insert on `(member, day)` is atomic the way the MySQL unique
/// key makes it.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    next_user_id: u64,
    next_entry_id: u64,
    users: Vec<(User, Option<DateTime<Utc>>)>,
    entries: Vec<(AttendanceEntry, NaiveDate)>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a user directly, bypassing registration.
    pub fn seed_user(&self, username: &str, password_hash: &str, role: Role, is_member: bool) -> u64 {
        let mut inner = self.inner.lock().unwrap();
        inner.next_user_id += 1;
        let id = inner.next_user_id;
        inner.users.push((
            User {
                id,
                username: username.to_string(),
                password_hash: password_hash.to_string(),
                full_name: format!("{username} full name"),
                nik: None,
                birth_date: None,
                phone: None,
                origin: None,
                address: None,
                role,
                profile_photo: String::new(),
                is_member,
                created_at: Utc::now(),
            },
            None,
        ));
        id
    }

    pub fn entry_count(&self) -> usize {
        self.inner.lock().unwrap().entries.len()
    }
}

#[async_trait]
impl AttendanceStore for MemoryStore {
    async fn insert(&self, entry: NewAttendance) -> Result<AttendanceEntry, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        if inner
            .entries
            .iter()
            .any(|(e, day)| e.member_id == entry.member_id && *day == entry.day)
        {
            return Err(StoreError::Duplicate);
        }

        inner.next_entry_id += 1;
        let stored = AttendanceEntry {
            id: inner.next_entry_id,
            member_id: entry.member_id,
            recorded_at: entry.recorded_at,
            status: entry.status,
        };
        inner.entries.push((stored.clone(), entry.day));
        Ok(stored)
    }

    async fn find_on_day(
        &self,
        member_id: u64,
        day: NaiveDate,
    ) -> Result<Option<AttendanceEntry>, StoreError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .entries
            .iter()
            .find(|(e, d)| e.member_id == member_id && *d == day)
            .map(|(e, _)| e.clone()))
    }

    async fn page(&self, filter: &HistoryFilter) -> Result<(Vec<AttendanceEntry>, u64), StoreError> {
        let inner = self.inner.lock().unwrap();
        let mut matching: Vec<AttendanceEntry> = inner
            .entries
            .iter()
            .map(|(e, _)| e)
            .filter(|e| filter.member_id.is_none_or(|id| e.member_id == id))
            .filter(|e| filter.from.is_none_or(|from| e.recorded_at >= from))
            .filter(|e| filter.to.is_none_or(|to| e.recorded_at <= to))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.recorded_at.cmp(&a.recorded_at).then(b.id.cmp(&a.id)));

        let total = matching.len() as u64;
        let page = matching
            .into_iter()
            .skip(filter.offset as usize)
            .take(filter.limit as usize)
            .collect();
        Ok((page, total))
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find(&self, id: u64) -> Result<Option<User>, StoreError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.users.iter().find(|(u, _)| u.id == id).map(|(u, _)| u.clone()))
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .users
            .iter()
            .find(|(u, _)| u.username == username)
            .map(|(u, _)| u.clone()))
    }

    async fn username_exists(&self, username: &str) -> Result<bool, StoreError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .users
            .iter()
            .any(|(u, _)| u.username.eq_ignore_ascii_case(username)))
    }

    async fn create(&self, user: NewUser) -> Result<u64, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        if inner
            .users
            .iter()
            .any(|(u, _)| u.username.eq_ignore_ascii_case(&user.username))
        {
            return Err(StoreError::Duplicate);
        }

        inner.next_user_id += 1;
        let id = inner.next_user_id;
        inner.users.push((
            User {
                id,
                username: user.username,
                password_hash: user.password_hash,
                full_name: user.full_name,
                nik: user.nik,
                birth_date: user.birth_date,
                phone: user.phone,
                origin: user.origin,
                address: user.address,
                role: Role::User,
                profile_photo: String::new(),
                is_member: false,
                created_at: Utc::now(),
            },
            None,
        ));
        Ok(id)
    }

    async fn set_password(&self, id: u64, password_hash: &str) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        match inner.users.iter_mut().find(|(u, _)| u.id == id) {
            Some((u, _)) => {
                u.password_hash = password_hash.to_string();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn touch_last_login(&self, id: u64, at: DateTime<Utc>) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some((_, last)) = inner.users.iter_mut().find(|(u, _)| u.id == id) {
            *last = Some(at);
        }
        Ok(())
    }

    async fn update_profile(
        &self,
        id: u64,
        update: &ProfileUpdate,
    ) -> Result<Option<User>, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        Ok(inner.users.iter_mut().find(|(u, _)| u.id == id).map(|(u, _)| {
            if let Some(name) = &update.full_name {
                u.full_name = name.clone();
            }
            if update.nik.is_some() {
                u.nik = update.nik.clone();
            }
            if update.birth_date.is_some() {
                u.birth_date = update.birth_date;
            }
            if update.phone.is_some() {
                u.phone = update.phone.clone();
            }
            if update.origin.is_some() {
                u.origin = update.origin.clone();
            }
            if update.address.is_some() {
                u.address = update.address.clone();
            }
            u.clone()
        }))
    }

    async fn set_role(&self, id: u64, role: Role) -> Result<Option<User>, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        Ok(inner.users.iter_mut().find(|(u, _)| u.id == id).map(|(u, _)| {
            u.role = role;
            u.clone()
        }))
    }

    async fn toggle_member(&self, id: u64) -> Result<Option<User>, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        Ok(inner.users.iter_mut().find(|(u, _)| u.id == id).map(|(u, _)| {
            u.is_member = !u.is_member;
            u.clone()
        }))
    }

    async fn delete(&self, id: u64) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        let before = inner.users.len();
        inner.users.retain(|(u, _)| u.id != id);
        if inner.users.len() == before {
            return Ok(false);
        }
        inner.entries.retain(|(e, _)| e.member_id != id);
        Ok(true)
    }

    async fn page(&self, filter: &UserFilter) -> Result<(Vec<User>, u64), StoreError> {
        let inner = self.inner.lock().unwrap();
        let needle = filter.search.as_deref().unwrap_or("").to_lowercase();
        let matching: Vec<User> = inner
            .users
            .iter()
            .map(|(u, _)| u)
            .filter(|u| {
                needle.is_empty()
                    || u.username.to_lowercase().contains(&needle)
                    || u.full_name.to_lowercase().contains(&needle)
            })
            .cloned()
            .collect();

        let total = matching.len() as u64;
        let page = matching
            .into_iter()
            .skip(filter.offset as usize)
            .take(filter.limit as usize)
            .collect();
        Ok((page, total))
    }

    async fn summaries(&self, ids: &[u64]) -> Result<HashMap<u64, MemberSummary>, StoreError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .users
            .iter()
            .filter(|(u, _)| ids.contains(&u.id))
            .map(|(u, _)| {
                (
                    u.id,
                    MemberSummary {
                        full_name: u.full_name.clone(),
                        username: u.username.clone(),
                    },
                )
            })
            .collect())
    }

    async fn stats(&self) -> Result<MembershipStats, StoreError> {
        let inner = self.inner.lock().unwrap();
        let count = |pred: &dyn Fn(&User) -> bool| inner.users.iter().filter(|(u, _)| pred(u)).count() as i64;
        Ok(MembershipStats {
            total_admin: count(&|u| u.role == Role::Admin),
            total_member: count(&|u| u.is_member),
            total_non_member: count(&|u| !u.is_member),
        })
    }

    async fn usernames(&self) -> Result<Vec<String>, StoreError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.users.iter().map(|(u, _)| u.username.clone()).collect())
    }

    async fn recent_usernames(&self, since: DateTime<Utc>) -> Result<Vec<String>, StoreError> {
        let inner = self.inner.lock().unwrap();
        let mut recent: Vec<(DateTime<Utc>, String)> = inner
            .users
            .iter()
            .filter_map(|(u, last)| last.filter(|t| *t >= since).map(|t| (t, u.username.clone())))
            .collect();
        recent.sort_by(|a, b| b.0.cmp(&a.0));
        Ok(recent.into_iter().map(|(_, name)| name).collect())
    }
}
