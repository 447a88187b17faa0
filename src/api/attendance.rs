use crate::{
    attendance::{
        error::AttendanceError,
        history::{HistoryQuery, HistoryRange},
    },
    auth::auth::AuthUser,
    model::attendance::AttendanceEntry,
    state::AppState,
    utils::pagination::PageRequest,
};
use actix_web::{HttpResponse, Responder, web};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct HistoryParams {
    /// Inclusive lower bound, `YYYY-MM-DD` (local start of day) or RFC 3339
    #[schema(example = "2025-06-01")]
    pub start: Option<String>,
    /// Inclusive upper bound, `YYYY-MM-DD` (local end of day) or RFC 3339
    #[schema(example = "2025-06-30")]
    pub end: Option<String>,
    /// Page number, starting at 1
    #[schema(example = 1)]
    pub page: Option<u64>,
    /// Items per page (max 100)
    #[schema(example = 10)]
    pub limit: Option<u64>,
}

impl HistoryParams {
    /// Turns query-string values into a history query; a malformed date is a
    /// ready-made 400 response.
    pub fn to_query(
        &self,
        member_id: Option<u64>,
        state: &AppState,
    ) -> Result<HistoryQuery, HttpResponse> {
        let range = HistoryRange::parse(
            self.start.as_deref(),
            self.end.as_deref(),
            state.attendance.policy(),
        )
        .map_err(|e| {
            HttpResponse::BadRequest().json(serde_json::json!({
                "message": e.to_string()
            }))
        })?;

        Ok(HistoryQuery {
            member_id,
            range,
            page: PageRequest::new(self.page, self.limit),
        })
    }
}

#[derive(Serialize, ToSchema)]
pub struct CheckInResponse {
    #[schema(example = "Attendance recorded")]
    pub message: String,
    pub absen: AttendanceEntry,
}

#[derive(Serialize, ToSchema)]
pub struct CheckInStatus {
    #[serde(rename = "sudahAbsen")]
    pub checked_in: bool,
}

/// Check-in endpoint
#[utoipa::path(
    post,
    path = "/api/absensi",
    responses(
        (status = 201, description = "Attendance recorded", body = CheckInResponse),
        (status = 400, description = "Outside the attendance window, or already checked in today", body = Object, example = json!({
            "message": "You have already checked in today",
            "reason": "ALREADY_RECORDED"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not an active member", body = Object, example = json!({
            "message": "Only active members may check in",
            "reason": "NOT_ELIGIBLE"
        })),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn check_in(
    auth: AuthUser,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AttendanceError> {
    let entry = state.attendance.check_in(auth.user_id).await?;

    Ok(HttpResponse::Created().json(CheckInResponse {
        message: "Attendance recorded".to_string(),
        absen: entry,
    }))
}

/// Has the caller already checked in today?
#[utoipa::path(
    get,
    path = "/api/absensi/cek",
    responses(
        (status = 200, description = "Check-in status for today", body = CheckInStatus),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn check_status(
    auth: AuthUser,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AttendanceError> {
    let checked_in = state.attendance.has_checked_in_today(auth.user_id).await?;
    Ok(HttpResponse::Ok().json(CheckInStatus { checked_in }))
}

/// The caller's own attendance history, newest first
#[utoipa::path(
    get,
    path = "/api/absensi/riwayat",
    params(HistoryParams),
    responses(
        (status = 200, description = "Paginated attendance history", body = AttendancePage),
        (status = 400, description = "Malformed start/end"),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn history(
    auth: AuthUser,
    state: web::Data<AppState>,
    params: web::Query<HistoryParams>,
) -> actix_web::Result<impl Responder> {
    let query = match params.to_query(Some(auth.user_id), &state) {
        Ok(q) => q,
        Err(resp) => return Ok(resp),
    };

    let page = state.attendance.history(query).await?;
    Ok(HttpResponse::Ok().json(page))
}
