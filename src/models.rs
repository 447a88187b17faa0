use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::model::role::Role;

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterReq {
    #[serde(rename = "namaLengkap", default)]
    #[schema(example = "Arjuna Pandawa")]
    pub full_name: String,
    #[serde(default)]
    pub nik: Option<String>,
    #[serde(rename = "tglLahir", default)]
    #[schema(value_type = Option<String>, format = Date, example = "2001-04-17")]
    pub birth_date: Option<NaiveDate>,
    #[serde(rename = "noHp", default)]
    pub phone: Option<String>,
    #[schema(example = "arjuna")]
    pub username: String,
    #[schema(example = "s3cret-arrow")]
    pub password: String,
    #[serde(rename = "asal", default)]
    pub origin: Option<String>,
    #[serde(rename = "alamat", default)]
    pub address: Option<String>,
}

/// Fields a user may change about themselves. Omitted or blank fields stay
/// as they are; username, role and membership are not editable here.
#[derive(Deserialize, ToSchema)]
pub struct UpdateProfileReq {
    #[serde(rename = "namaLengkap", default)]
    #[schema(example = "Arjuna Pandawa")]
    pub full_name: Option<String>,
    #[serde(default)]
    pub nik: Option<String>,
    #[serde(rename = "tglLahir", default)]
    #[schema(value_type = Option<String>, format = Date, example = "2001-04-17")]
    pub birth_date: Option<NaiveDate>,
    #[serde(rename = "noHp", default)]
    pub phone: Option<String>,
    #[serde(rename = "asal", default)]
    pub origin: Option<String>,
    #[serde(rename = "alamat", default)]
    pub address: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct LoginReqDto {
    #[schema(example = "arjuna")]
    pub username: String,
    #[schema(example = "s3cret-arrow")]
    pub password: String,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordReq {
    #[serde(default)]
    pub old_password: String,
    #[serde(default)]
    pub new_password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: u64,
    pub sub: String,
    pub role: Role,
    pub exp: usize,
    pub jti: String,
}
