use crate::{
    api::attendance::HistoryParams,
    auth::auth::AuthUser,
    model::{
        attendance::AttendanceEntry,
        role::Role,
        user::{MemberSummary, User},
    },
    state::AppState,
    store::UserFilter,
    utils::pagination::{Page, PageRequest},
};
use actix_web::{HttpResponse, Responder, web};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, info};
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct UserListParams {
    /// Case-insensitive match on username or full name
    #[schema(example = "arj")]
    pub search: Option<String>,
    #[schema(example = 1)]
    pub page: Option<u64>,
    #[schema(example = 10)]
    pub limit: Option<u64>,
}

/// An attendance entry with the member it belongs to.
#[derive(Debug, Serialize, ToSchema)]
pub struct AdminAttendanceRow {
    #[serde(flatten)]
    pub entry: AttendanceEntry,
    /// `None` only if the user disappeared between the two reads
    pub member: Option<MemberSummary>,
}

#[derive(Serialize, ToSchema)]
pub struct UserChanged {
    pub message: String,
    pub user: User,
}

fn internal_error(e: impl std::fmt::Display, context: &str) -> actix_web::Error {
    error!(error = %e, "{context}");
    actix_web::error::ErrorInternalServerError("Internal Server Error")
}

fn user_not_found() -> HttpResponse {
    HttpResponse::NotFound().json(json!({ "message": "User not found" }))
}

/// All users, without passwords
#[utoipa::path(
    get,
    path = "/api/admin/users",
    params(UserListParams),
    responses(
        (status = 200, description = "Paginated user list", body = UserPage),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn list_users(
    auth: AuthUser,
    state: web::Data<AppState>,
    query: web::Query<UserListParams>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let page = PageRequest::new(query.page, query.limit);
    let filter = UserFilter {
        search: query.search.as_ref().map(|s| s.trim().to_string()),
        offset: page.offset(),
        limit: page.limit,
    };

    let (users, total) = state
        .users
        .page(&filter)
        .await
        .map_err(|e| internal_error(e, "Failed to list users"))?;

    Ok(HttpResponse::Ok().json(Page::new(users, page, total)))
}

async fn change_role(
    auth: AuthUser,
    state: web::Data<AppState>,
    user_id: u64,
    role: Role,
) -> actix_web::Result<HttpResponse> {
    auth.require_admin()?;

    let updated = state
        .users
        .set_role(user_id, role)
        .await
        .map_err(|e| internal_error(e, "Failed to change role"))?;

    match updated {
        Some(user) => {
            info!(admin = auth.user_id, user_id, %role, "Role changed");
            Ok(HttpResponse::Ok().json(UserChanged {
                message: format!("{} is now {}", user.username, role),
                user,
            }))
        }
        None => Ok(user_not_found()),
    }
}

#[utoipa::path(
    put,
    path = "/api/admin/promote/{user_id}",
    params(("user_id" = u64, Path, description = "User to make admin")),
    responses(
        (status = 200, description = "Promoted", body = UserChanged),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn promote(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    change_role(auth, state, path.into_inner(), Role::Admin).await
}

#[utoipa::path(
    put,
    path = "/api/admin/demote/{user_id}",
    params(("user_id" = u64, Path, description = "Admin to demote")),
    responses(
        (status = 200, description = "Demoted", body = UserChanged),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn demote(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    change_role(auth, state, path.into_inner(), Role::User).await
}

/// Flips a user between member and non-member
#[utoipa::path(
    put,
    path = "/api/admin/toggle-member/{user_id}",
    params(("user_id" = u64, Path, description = "User to toggle")),
    responses(
        (status = 200, description = "Membership toggled", body = UserChanged),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn toggle_member(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;
    let user_id = path.into_inner();

    let updated = state
        .users
        .toggle_member(user_id)
        .await
        .map_err(|e| internal_error(e, "Failed to toggle membership"))?;

    match updated {
        Some(user) => {
            info!(admin = auth.user_id, user_id, is_member = user.is_member, "Membership toggled");
            let label = if user.is_member { "Member" } else { "Non-Member" };
            Ok(HttpResponse::Ok().json(UserChanged {
                message: format!("{} is now {}", user.full_name, label),
                user,
            }))
        }
        None => Ok(user_not_found()),
    }
}

#[utoipa::path(
    delete,
    path = "/api/admin/users/{user_id}",
    params(("user_id" = u64, Path, description = "User to delete")),
    responses(
        (status = 200, description = "Deleted"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn delete_user(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;
    let user_id = path.into_inner();

    let user = match state
        .users
        .find(user_id)
        .await
        .map_err(|e| internal_error(e, "Failed to load user"))?
    {
        Some(u) => u,
        None => return Ok(user_not_found()),
    };

    let deleted = state
        .users
        .delete(user_id)
        .await
        .map_err(|e| internal_error(e, "Failed to delete user"))?;

    if !deleted {
        return Ok(user_not_found());
    }
    state.usernames.forget(&user.username).await;

    info!(admin = auth.user_id, user_id, username = %user.username, "User deleted");
    Ok(HttpResponse::Ok().json(json!({ "message": "User deleted" })))
}

async fn attendance_page(
    state: &AppState,
    params: &HistoryParams,
    member_id: Option<u64>,
) -> actix_web::Result<HttpResponse> {
    let query = match params.to_query(member_id, state) {
        Ok(q) => q,
        Err(resp) => return Ok(resp),
    };

    let page = state.attendance.history(query).await?;

    let mut ids: Vec<u64> = page.data.iter().map(|e| e.member_id).collect();
    ids.sort_unstable();
    ids.dedup();
    let members = state
        .users
        .summaries(&ids)
        .await
        .map_err(|e| internal_error(e, "Failed to load attendance members"))?;

    let rows = page.map(|entry| AdminAttendanceRow {
        member: members.get(&entry.member_id).cloned(),
        entry,
    });

    Ok(HttpResponse::Ok().json(rows))
}

/// Every member's attendance, newest first
#[utoipa::path(
    get,
    path = "/api/admin/absensi",
    params(HistoryParams),
    responses(
        (status = 200, description = "Paginated attendance", body = AdminAttendancePage),
        (status = 400, description = "Malformed start/end"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn list_attendance(
    auth: AuthUser,
    state: web::Data<AppState>,
    params: web::Query<HistoryParams>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;
    attendance_page(&state, &params, None).await
}

/// One member's attendance, newest first
#[utoipa::path(
    get,
    path = "/api/admin/absensi/{user_id}",
    params(
        ("user_id" = u64, Path, description = "Member whose history to list"),
        HistoryParams
    ),
    responses(
        (status = 200, description = "Paginated attendance", body = AdminAttendancePage),
        (status = 400, description = "Malformed start/end"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn user_attendance(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<u64>,
    params: web::Query<HistoryParams>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;
    attendance_page(&state, &params, Some(path.into_inner())).await
}

#[utoipa::path(
    get,
    path = "/api/admin/stats",
    responses(
        (status = 200, description = "Head counts", body = MembershipStats),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn stats(auth: AuthUser, state: web::Data<AppState>) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let stats = state
        .users
        .stats()
        .await
        .map_err(|e| internal_error(e, "Failed to compute stats"))?;

    Ok(HttpResponse::Ok().json(stats))
}

#[cfg(test)]
mod tests {
    use crate::{
        attendance::policy::AttendancePolicy,
        auth::jwt::generate_access_token,
        clock::FixedClock,
        config::Config,
        model::role::Role,
        routes,
        state::AppState,
        store::{UserStore, memory::MemoryStore},
    };
    use actix_web::{App, http::StatusCode, test, web};
    use chrono::NaiveDate;
    use serde_json::json;
    use serde_json::Value;
    use std::sync::Arc;

    struct Harness {
        store: Arc<MemoryStore>,
        data: web::Data<AppState>,
        admin_token: String,
        user_token: String,
    }

    fn harness() -> Harness {
        let policy = AttendancePolicy::default();
        // Sunday 2025-06-01 09:00 local
        let now = policy.to_utc(
            NaiveDate::from_ymd_opt(2025, 6, 1)
                .unwrap()
                .and_hms_opt(9, 0, 0)
                .unwrap(),
        )
        .unwrap();
        let store = Arc::new(MemoryStore::new());
        let admin = store.seed_user("drona", "x", Role::Admin, false);
        let user = store.seed_user("arjuna", "x", Role::User, true);
        let data = web::Data::new(AppState::new(
            Config::for_tests(policy),
            store.clone(),
            store.clone(),
            Arc::new(FixedClock::new(now)),
        ));
        let secret = data.config.jwt_secret.clone();
        Harness {
            admin_token: generate_access_token(admin, "drona".into(), Role::Admin, &secret, 60).unwrap(),
            user_token: generate_access_token(user, "arjuna".into(), Role::User, &secret, 60).unwrap(),
            store,
            data,
        }
    }

    fn req(method: &str, uri: &str, token: &str) -> test::TestRequest {
        match method {
            "PUT" => test::TestRequest::put(),
            "POST" => test::TestRequest::post(),
            "DELETE" => test::TestRequest::delete(),
            _ => test::TestRequest::get(),
        }
        .uri(uri)
        .peer_addr("127.0.0.1:4000".parse().unwrap())
        .insert_header(("Authorization", format!("Bearer {token}")))
    }

    macro_rules! app {
        ($h:expr) => {{
            let config = $h.data.config.clone();
            test::init_service(
                App::new()
                    .app_data($h.data.clone())
                    .configure(|cfg| routes::configure(cfg, config)),
            )
            .await
        }};
    }

    #[actix_web::test]
    async fn non_admins_are_forbidden() {
        let h = harness();
        let app = app!(h);
        for (method, uri) in [
            ("GET", "/api/admin/users"),
            ("GET", "/api/admin/absensi"),
            ("GET", "/api/admin/stats"),
            ("PUT", "/api/admin/toggle-member/2"),
            ("DELETE", "/api/admin/users/2"),
        ] {
            let resp = test::call_service(&app, req(method, uri, &h.user_token).to_request()).await;
            assert_eq!(resp.status(), StatusCode::FORBIDDEN, "{method} {uri}");
        }
    }

    #[actix_web::test]
    async fn toggling_membership_gates_check_in() {
        let h = harness();
        let app = app!(h);

        // arjuna (id 2) starts as a member
        let resp = test::call_service(&app, req("PUT", "/api/admin/toggle-member/2", &h.admin_token).to_request()).await;
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["user"]["isMember"], false);

        let resp = test::call_service(&app, req("POST", "/api/absensi", &h.user_token).to_request()).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        test::call_service(&app, req("PUT", "/api/admin/toggle-member/2", &h.admin_token).to_request()).await;
        let resp = test::call_service(&app, req("POST", "/api/absensi", &h.user_token).to_request()).await;
        assert_eq!(resp.status(), StatusCode::CREATED);

        let resp = test::call_service(&app, req("PUT", "/api/admin/toggle-member/99", &h.admin_token).to_request()).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn attendance_listing_carries_member_names() {
        let h = harness();
        let app = app!(h);
        test::call_service(&app, req("POST", "/api/absensi", &h.user_token).to_request()).await;

        let resp = test::call_service(&app, req("GET", "/api/admin/absensi", &h.admin_token).to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["totalItems"], 1);
        assert_eq!(body["data"][0]["member"]["username"], "arjuna");
        assert_eq!(body["data"][0]["keterangan"], "hadir");

        let body: Value = test::read_body_json(
            test::call_service(&app, req("GET", "/api/admin/absensi/1", &h.admin_token).to_request()).await,
        )
        .await;
        assert_eq!(body["totalItems"], 0);

        let body: Value = test::read_body_json(
            test::call_service(&app, req("GET", "/api/admin/absensi/2?start=2025-06-02", &h.admin_token).to_request()).await,
        )
        .await;
        assert_eq!(body["totalItems"], 0);
    }

    #[actix_web::test]
    async fn users_search_stats_and_delete() {
        let h = harness();
        let app = app!(h);

        let body: Value = test::read_body_json(
            test::call_service(&app, req("GET", "/api/admin/users?search=ARJ", &h.admin_token).to_request()).await,
        )
        .await;
        assert_eq!(body["totalItems"], 1);
        assert_eq!(body["data"][0]["username"], "arjuna");

        let body: Value = test::read_body_json(
            test::call_service(&app, req("PUT", "/api/admin/promote/2", &h.admin_token).to_request()).await,
        )
        .await;
        assert_eq!(body["user"]["role"], "admin");

        let stats: Value = test::read_body_json(
            test::call_service(&app, req("GET", "/api/admin/stats", &h.admin_token).to_request()).await,
        )
        .await;
        assert_eq!(stats["totalAdmin"], 2);
        assert_eq!(stats["totalMember"], 1);
        assert_eq!(stats["totalNonMember"], 1);

        test::call_service(&app, req("POST", "/api/absensi", &h.user_token).to_request()).await;
        assert_eq!(h.store.entry_count(), 1);
        let resp = test::call_service(&app, req("DELETE", "/api/admin/users/2", &h.admin_token).to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(h.store.entry_count(), 0);

        let resp = test::call_service(&app, req("DELETE", "/api/admin/users/2", &h.admin_token).to_request()).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn demoted_or_deleted_admin_loses_access_with_the_same_token() {
        let h = harness();
        let app = app!(h);

        let resp = test::call_service(&app, req("GET", "/api/admin/users", &h.admin_token).to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);

        // token still says admin
        h.store.set_role(1, Role::User).await.unwrap();
        let resp = test::call_service(&app, req("GET", "/api/admin/users", &h.admin_token).to_request()).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        assert!(h.store.delete(1).await.unwrap());
        let resp = test::call_service(&app, req("GET", "/api/admin/stats", &h.admin_token).to_request()).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        let resp = test::call_service(&app, req("GET", "/api/absensi/cek", &h.admin_token).to_request()).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn deleted_username_can_be_registered_again() {
        let h = harness();
        let app = app!(h);
        let register = || {
            test::TestRequest::post()
                .uri("/api/auth/register")
                .peer_addr("127.0.0.1:4000".parse().unwrap())
                .set_json(json!({ "namaLengkap": "Nakula", "username": "nakula", "password": "kuda" }))
                .to_request()
        };

        assert_eq!(test::call_service(&app, register()).await.status(), StatusCode::CREATED);
        assert_eq!(test::call_service(&app, register()).await.status(), StatusCode::CONFLICT);

        // drona 1, arjuna 2, nakula 3
        let resp = test::call_service(&app, req("DELETE", "/api/admin/users/3", &h.admin_token).to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);

        assert_eq!(test::call_service(&app, register()).await.status(), StatusCode::CREATED);
    }
}
