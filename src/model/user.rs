use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::role::Role;

/// A club account. The password hash never leaves the server.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[schema(example = 7)]
    pub id: u64,

    #[schema(example = "arjuna")]
    pub username: String,

    #[serde(skip)]
    pub password_hash: String,

    #[serde(rename = "namaLengkap")]
    #[schema(example = "Arjuna Pandawa")]
    pub full_name: String,

    pub nik: Option<String>,

    #[serde(rename = "tglLahir")]
    #[schema(value_type = Option<String>, format = Date)]
    pub birth_date: Option<NaiveDate>,

    #[serde(rename = "noHp")]
    pub phone: Option<String>,

    #[serde(rename = "asal")]
    pub origin: Option<String>,

    #[serde(rename = "alamat")]
    pub address: Option<String>,

    #[schema(value_type = String, example = "user")]
    pub role: Role,

    #[serde(rename = "fotoProfil")]
    pub profile_photo: String,

    /// Only members may check in
    pub is_member: bool,

    #[schema(value_type = String, format = DateTime)]
    pub created_at: DateTime<Utc>,
}

/// Fields collected at registration.
#[derive(Debug, Clone, Default)]
pub struct NewUser {
    pub username: String,
    pub password_hash: String,
    pub full_name: String,
    pub nik: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub phone: Option<String>,
    pub origin: Option<String>,
    pub address: Option<String>,
}

/// Self-service profile edit; `None` leaves the field as it is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileUpdate {
    pub full_name: Option<String>,
    pub nik: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub phone: Option<String>,
    pub origin: Option<String>,
    pub address: Option<String>,
}

/// Who an attendance row belongs to, for admin listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct MemberSummary {
    #[serde(rename = "namaLengkap")]
    pub full_name: String,
    pub username: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MembershipStats {
    pub total_admin: i64,
    pub total_member: i64,
    pub total_non_member: i64,
}
