use std::collections::HashMap;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{FromRow, MySqlPool};

use super::{AttendanceStore, HistoryFilter, StoreError, UserFilter, UserStore};
use crate::model::{
    attendance::{AttendanceEntry, AttendanceStatus, NewAttendance},
    role::Role,
    user::{MemberSummary, MembershipStats, NewUser, ProfileUpdate, User},
};

const USER_COLUMNS: &str = r#"
    id, username, password, full_name, nik, birth_date, phone, origin, address,
    role, profile_photo, is_member, created_at
"#;

#[derive(Clone)]
pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct AttendanceRow {
    id: u64,
    user_id: u64,
    recorded_at: DateTime<Utc>,
    status: String,
}

impl TryFrom<AttendanceRow> for AttendanceEntry {
    type Error = StoreError;

    fn try_from(row: AttendanceRow) -> Result<Self, Self::Error> {
        let status = AttendanceStatus::from_str(&row.status)
            .map_err(|_| StoreError::Corrupt(format!("attendance {} status {:?}", row.id, row.status)))?;

        Ok(AttendanceEntry {
            id: row.id,
            member_id: row.user_id,
            recorded_at: row.recorded_at,
            status,
        })
    }
}

#[derive(FromRow)]
struct UserRow {
    id: u64,
    username: String,
    password: String,
    full_name: String,
    nik: Option<String>,
    birth_date: Option<NaiveDate>,
    phone: Option<String>,
    origin: Option<String>,
    address: Option<String>,
    role: String,
    profile_photo: String,
    is_member: bool,
    created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = StoreError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let role = Role::from_str(&row.role)
            .map_err(|_| StoreError::Corrupt(format!("user {} role {:?}", row.id, row.role)))?;

        Ok(User {
            id: row.id,
            username: row.username,
            password_hash: row.password,
            full_name: row.full_name,
            nik: row.nik,
            birth_date: row.birth_date,
            phone: row.phone,
            origin: row.origin,
            address: row.address,
            role,
            profile_photo: row.profile_photo,
            is_member: row.is_member,
            created_at: row.created_at,
        })
    }
}

/// Maps a unique-key violation to [`StoreError::Duplicate`].
fn classify(e: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.is_unique_violation() {
            return StoreError::Duplicate;
        }
    }
    StoreError::Database(e)
}

// Helper enum for typed SQLx binding
enum FilterValue {
    U64(u64),
    Instant(DateTime<Utc>),
    Str(String),
}

fn escape_like(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len() + 2);
    out.push('%');
    for c in raw.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('%');
    out
}

#[async_trait]
impl AttendanceStore for MySqlStore {
    async fn insert(&self, entry: NewAttendance) -> Result<AttendanceEntry, StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO attendance (user_id, recorded_at, attendance_day, status)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(entry.member_id)
        .bind(entry.recorded_at.naive_utc())
        .bind(entry.day)
        .bind(entry.status.as_ref())
        .execute(&self.pool)
        .await
        .map_err(classify)?;

        Ok(AttendanceEntry {
            id: result.last_insert_id(),
            member_id: entry.member_id,
            recorded_at: entry.recorded_at,
            status: entry.status,
        })
    }

    async fn find_on_day(
        &self,
        member_id: u64,
        day: NaiveDate,
    ) -> Result<Option<AttendanceEntry>, StoreError> {
        let row = sqlx::query_as::<_, AttendanceRow>(
            r#"
            SELECT id, user_id, recorded_at, status
            FROM attendance
            WHERE user_id = ? AND attendance_day = ?
            LIMIT 1
            "#,
        )
        .bind(member_id)
        .bind(day)
        .fetch_optional(&self.pool)
        .await?;

        row.map(AttendanceEntry::try_from).transpose()
    }

    async fn page(&self, filter: &HistoryFilter) -> Result<(Vec<AttendanceEntry>, u64), StoreError> {
        let mut where_sql = String::from(" WHERE 1=1");
        let mut args: Vec<FilterValue> = Vec::new();

        if let Some(member_id) = filter.member_id {
            where_sql.push_str(" AND user_id = ?");
            args.push(FilterValue::U64(member_id));
        }
        if let Some(from) = filter.from {
            where_sql.push_str(" AND recorded_at >= ?");
            args.push(FilterValue::Instant(from));
        }
        if let Some(to) = filter.to {
            where_sql.push_str(" AND recorded_at <= ?");
            args.push(FilterValue::Instant(to));
        }

        let count_sql = format!("SELECT COUNT(*) FROM attendance{}", where_sql);
        let mut count_q = sqlx::query_scalar::<_, i64>(&count_sql);
        for arg in &args {
            count_q = match arg {
                FilterValue::U64(v) => count_q.bind(*v),
                FilterValue::Instant(t) => count_q.bind(t.naive_utc()),
                FilterValue::Str(s) => count_q.bind(s.as_str()),
            };
        }
        let total = count_q.fetch_one(&self.pool).await?;

        let data_sql = format!(
            r#"
            SELECT id, user_id, recorded_at, status
            FROM attendance
            {}
            ORDER BY recorded_at DESC, id DESC
            LIMIT ? OFFSET ?
            "#,
            where_sql
        );
        let mut data_q = sqlx::query_as::<_, AttendanceRow>(&data_sql);
        for arg in &args {
            data_q = match arg {
                FilterValue::U64(v) => data_q.bind(*v),
                FilterValue::Instant(t) => data_q.bind(t.naive_utc()),
                FilterValue::Str(s) => data_q.bind(s.as_str()),
            };
        }
        let rows = data_q
            .bind(filter.limit)
            .bind(filter.offset)
            .fetch_all(&self.pool)
            .await?;

        let entries = rows
            .into_iter()
            .map(AttendanceEntry::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok((entries, total.max(0) as u64))
    }
}

#[async_trait]
impl UserStore for MySqlStore {
    async fn find(&self, id: u64) -> Result<Option<User>, StoreError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?");
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(User::try_from).transpose()
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?");
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        row.map(User::try_from).transpose()
    }

    async fn username_exists(&self, username: &str) -> Result<bool, StoreError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM users WHERE username = ? LIMIT 1)",
        )
        .bind(username)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn create(&self, user: NewUser) -> Result<u64, StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO users
                (username, password, full_name, nik, birth_date, phone, origin, address)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(&user.full_name)
        .bind(&user.nik)
        .bind(user.birth_date)
        .bind(&user.phone)
        .bind(&user.origin)
        .bind(&user.address)
        .execute(&self.pool)
        .await
        .map_err(classify)?;

        Ok(result.last_insert_id())
    }

    async fn set_password(&self, id: u64, password_hash: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("UPDATE users SET password = ? WHERE id = ?")
            .bind(password_hash)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn update_profile(
        &self,
        id: u64,
        update: &ProfileUpdate,
    ) -> Result<Option<User>, StoreError> {
        sqlx::query(
            r#"
            UPDATE users SET
                full_name = COALESCE(?, full_name),
                nik = COALESCE(?, nik),
                birth_date = COALESCE(?, birth_date),
                phone = COALESCE(?, phone),
                origin = COALESCE(?, origin),
                address = COALESCE(?, address)
            WHERE id = ?
            "#,
        )
        .bind(update.full_name.as_deref())
        .bind(update.nik.as_deref())
        .bind(update.birth_date)
        .bind(update.phone.as_deref())
        .bind(update.origin.as_deref())
        .bind(update.address.as_deref())
        .bind(id)
        .execute(&self.pool)
        .await?;
        self.find(id).await
    }

    async fn touch_last_login(&self, id: u64, at: DateTime<Utc>) -> Result<(), StoreError> {
        sqlx::query("UPDATE users SET last_login_at = ? WHERE id = ?")
            .bind(at.naive_utc())
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn set_role(&self, id: u64, role: Role) -> Result<Option<User>, StoreError> {
        // rows_affected is 0 for a no-op update as well, so existence is
        // decided by the read that follows.
        sqlx::query("UPDATE users SET role = ? WHERE id = ?")
            .bind(role.as_ref())
            .bind(id)
            .execute(&self.pool)
            .await?;
        self.find(id).await
    }

    async fn toggle_member(&self, id: u64) -> Result<Option<User>, StoreError> {
        let result = sqlx::query("UPDATE users SET is_member = NOT is_member WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.find(id).await
    }

    async fn delete(&self, id: u64) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn page(&self, filter: &UserFilter) -> Result<(Vec<User>, u64), StoreError> {
        let mut where_sql = String::from(" WHERE 1=1");
        let mut args: Vec<FilterValue> = Vec::new();

        if let Some(search) = filter.search.as_deref().filter(|s| !s.is_empty()) {
            where_sql.push_str(" AND (username LIKE ? OR full_name LIKE ?)");
            let pattern = escape_like(search);
            args.push(FilterValue::Str(pattern.clone()));
            args.push(FilterValue::Str(pattern));
        }

        let count_sql = format!("SELECT COUNT(*) FROM users{}", where_sql);
        let mut count_q = sqlx::query_scalar::<_, i64>(&count_sql);
        for arg in &args {
            count_q = match arg {
                FilterValue::U64(v) => count_q.bind(*v),
                FilterValue::Instant(t) => count_q.bind(t.naive_utc()),
                FilterValue::Str(s) => count_q.bind(s.as_str()),
            };
        }
        let total = count_q.fetch_one(&self.pool).await?;

        let data_sql = format!(
            "SELECT {USER_COLUMNS} FROM users{} ORDER BY id ASC LIMIT ? OFFSET ?",
            where_sql
        );
        let mut data_q = sqlx::query_as::<_, UserRow>(&data_sql);
        for arg in &args {
            data_q = match arg {
                FilterValue::U64(v) => data_q.bind(*v),
                FilterValue::Instant(t) => data_q.bind(t.naive_utc()),
                FilterValue::Str(s) => data_q.bind(s.as_str()),
            };
        }
        let rows = data_q
            .bind(filter.limit)
            .bind(filter.offset)
            .fetch_all(&self.pool)
            .await?;

        let users = rows
            .into_iter()
            .map(User::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok((users, total.max(0) as u64))
    }

    async fn summaries(&self, ids: &[u64]) -> Result<HashMap<u64, MemberSummary>, StoreError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!("SELECT id, full_name, username FROM users WHERE id IN ({placeholders})");
        let mut q = sqlx::query_as::<_, (u64, String, String)>(&sql);
        for id in ids {
            q = q.bind(*id);
        }

        let rows = q.fetch_all(&self.pool).await?;
        Ok(rows
            .into_iter()
            .map(|(id, full_name, username)| (id, MemberSummary { full_name, username }))
            .collect())
    }

    async fn stats(&self) -> Result<MembershipStats, StoreError> {
        let (total_admin, total_member, total_non_member) = futures::try_join!(
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE role = 'admin'")
                .fetch_one(&self.pool),
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE is_member = TRUE")
                .fetch_one(&self.pool),
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE is_member = FALSE")
                .fetch_one(&self.pool),
        )?;

        Ok(MembershipStats {
            total_admin,
            total_member,
            total_non_member,
        })
    }

    async fn usernames(&self) -> Result<Vec<String>, StoreError> {
        let names = sqlx::query_scalar::<_, String>("SELECT username FROM users")
            .fetch_all(&self.pool)
            .await?;
        Ok(names)
    }

    async fn recent_usernames(&self, since: DateTime<Utc>) -> Result<Vec<String>, StoreError> {
        let names = sqlx::query_scalar::<_, String>(
            r#"
            SELECT username
            FROM users
            WHERE last_login_at >= ?
            ORDER BY last_login_at DESC
            "#,
        )
        .bind(since.naive_utc())
        .fetch_all(&self.pool)
        .await?;
        Ok(names)
    }
}
