use crate::api::admin::{AdminAttendanceRow, UserChanged, UserListParams};
use crate::api::attendance::{CheckInResponse, CheckInStatus, HistoryParams};
use crate::auth::handlers::{LoginResponse, LoginUser};
use crate::model::attendance::{AttendanceEntry, AttendanceStatus};
use crate::model::user::{MemberSummary, MembershipStats, User};
use crate::models::{ChangePasswordReq, LoginReqDto, RegisterReq, UpdateProfileReq};
use crate::utils::pagination::{AdminAttendancePage, AttendancePage, UserPage};
use utoipa::Modify;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Archery Club API",
        version = "1.0.0",
        description = r#"
## Archery Club Membership

Backend for an archery club: accounts, membership and weekly attendance.

### Attendance
- Members check in once per training day
- Check-in is only accepted on the training weekday, inside the configured time window
- A second check-in on the same day is rejected with reason `ALREADY_RECORDED`

### Security
Apart from `/api/auth/register` and `/api/auth/login`, everything under `/api` requires a **JWT Bearer** token from `/api/auth/login`.
The `/api/admin` endpoints additionally require the **admin** role.

### Response Format
- JSON responses, errors carry a `message`
- List endpoints are paginated (`page`, `limit`)
"#,
    ),
    paths(
        crate::auth::handlers::register,
        crate::auth::handlers::login,
        crate::auth::handlers::profile,
        crate::auth::handlers::update_profile,
        crate::auth::handlers::change_password,

        crate::api::attendance::check_in,
        crate::api::attendance::check_status,
        crate::api::attendance::history,

        crate::api::admin::list_users,
        crate::api::admin::promote,
        crate::api::admin::demote,
        crate::api::admin::toggle_member,
        crate::api::admin::delete_user,
        crate::api::admin::list_attendance,
        crate::api::admin::user_attendance,
        crate::api::admin::stats
    ),
    components(
        schemas(
            RegisterReq,
            LoginReqDto,
            ChangePasswordReq,
            UpdateProfileReq,
            LoginUser,
            LoginResponse,
            User,
            AttendanceEntry,
            AttendanceStatus,
            CheckInResponse,
            CheckInStatus,
            HistoryParams,
            AttendancePage,
            UserListParams,
            UserChanged,
            MemberSummary,
            MembershipStats,
            AdminAttendanceRow,
            AdminAttendancePage,
            UserPage
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Registration, login and own account"),
        (name = "Attendance", description = "Member check-in and history"),
        (name = "Admin", description = "User management and club-wide attendance"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}
