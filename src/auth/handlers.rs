use crate::{
    auth::{
        auth::AuthUser,
        jwt::generate_access_token,
        password::{hash_password, verify_password},
    },
    model::user::{NewUser, ProfileUpdate},
    models::{ChangePasswordReq, LoginReqDto, RegisterReq, UpdateProfileReq},
    state::AppState,
    store::StoreError,
};
use actix_web::{HttpResponse, Responder, web};
use serde::Serialize;
use serde_json::json;
use tracing::{debug, error, info, instrument};
use utoipa::ToSchema;

fn internal_error(e: impl std::fmt::Display, context: &str) -> HttpResponse {
    error!(error = %e, "{context}");
    HttpResponse::InternalServerError().json(json!({ "message": "Internal Server Error" }))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// User registration handler
#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterReq,
    responses(
        (status = 201, description = "Registered", body = Object, example = json!({
            "message": "Registration successful"
        })),
        (status = 400, description = "Username or password empty"),
        (status = 409, description = "Username already taken")
    ),
    tag = "Auth"
)]
#[instrument(name = "auth_register", skip(state, user), fields(username = %user.username))]
pub async fn register(user: web::Json<RegisterReq>, state: web::Data<AppState>) -> impl Responder {
    let user = user.into_inner();
    let username = user.username.trim().to_string();

    if username.is_empty() || user.password.is_empty() {
        return HttpResponse::BadRequest().json(json!({
            "message": "Username and password must not be empty"
        }));
    }

    match state.usernames.is_available(&username, state.users.as_ref()).await {
        Ok(true) => {}
        Ok(false) => {
            info!("Username already taken");
            return HttpResponse::Conflict().json(json!({
                "message": "Username already taken"
            }));
        }
        Err(e) => return internal_error(e, "Username availability check failed"),
    }

    let password_hash = match hash_password(&user.password) {
        Ok(h) => h,
        Err(e) => return internal_error(e, "Password hashing failed"),
    };

    let new_user = NewUser {
        username: username.clone(),
        password_hash,
        full_name: user.full_name.trim().to_string(),
        nik: non_empty(user.nik),
        birth_date: user.birth_date,
        phone: non_empty(user.phone),
        origin: non_empty(user.origin),
        address: non_empty(user.address),
    };

    match state.users.create(new_user).await {
        Ok(id) => {
            state.usernames.mark_taken(&username).await;
            info!(user_id = id, "User registered");
            HttpResponse::Created().json(json!({
                "message": "Registration successful"
            }))
        }
        // lost a race with another registration
        Err(StoreError::Duplicate) => HttpResponse::Conflict().json(json!({
            "message": "Username already taken"
        })),
        Err(e) => internal_error(e, "Failed to register user"),
    }
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginUser {
    pub id: u64,
    #[serde(rename = "namaLengkap")]
    pub full_name: String,
    #[schema(value_type = String, example = "user")]
    pub role: crate::model::role::Role,
    #[serde(rename = "fotoProfil")]
    pub profile_photo: String,
}

#[derive(Serialize, ToSchema)]
pub struct LoginResponse {
    pub token: String,
    pub user: LoginUser,
}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginReqDto,
    responses(
        (status = 200, description = "Logged in", body = LoginResponse),
        (status = 400, description = "Username or password missing"),
        (status = 401, description = "Invalid credentials")
    ),
    tag = "Auth"
)]
#[instrument(name = "auth_login", skip(state, user), fields(username = %user.username))]
pub async fn login(user: web::Json<LoginReqDto>, state: web::Data<AppState>) -> impl Responder {
    info!("Login request received");

    if user.username.trim().is_empty() || user.password.is_empty() {
        info!("Validation failed: empty username or password");
        return HttpResponse::BadRequest().json(json!({
            "message": "Username or password required"
        }));
    }

    debug!("Fetching user");
    let db_user = match state.users.find_by_username(user.username.trim()).await {
        Ok(Some(u)) => u,
        Ok(None) => {
            info!("Invalid credentials: user not found");
            return HttpResponse::Unauthorized().json(json!({ "message": "Invalid credentials" }));
        }
        Err(e) => return internal_error(e, "Database error while fetching user"),
    };

    if let Err(e) = verify_password(&user.password, &db_user.password_hash) {
        info!(error = %e, "Invalid credentials: password mismatch");
        return HttpResponse::Unauthorized().json(json!({ "message": "Invalid credentials" }));
    }

    let token = match generate_access_token(
        db_user.id,
        db_user.username.clone(),
        db_user.role,
        &state.config.jwt_secret,
        state.config.access_token_ttl,
    ) {
        Ok(t) => t,
        Err(e) => return internal_error(e, "Token generation failed"),
    };

    // non-fatal
    if let Err(e) = state
        .users
        .touch_last_login(db_user.id, state.attendance.now())
        .await
    {
        error!(error = %e, "Failed to update last_login_at");
    }

    info!(user_id = db_user.id, "Login successful");

    HttpResponse::Ok().json(LoginResponse {
        token,
        user: LoginUser {
            id: db_user.id,
            full_name: db_user.full_name,
            role: db_user.role,
            profile_photo: db_user.profile_photo,
        },
    })
}

#[utoipa::path(
    get,
    path = "/api/auth/profile",
    responses(
        (status = 200, description = "Own profile", body = User),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "User no longer exists")
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn profile(auth: AuthUser, state: web::Data<AppState>) -> impl Responder {
    match state.users.find(auth.user_id).await {
        Ok(Some(user)) => HttpResponse::Ok().json(user),
        Ok(None) => HttpResponse::NotFound().json(json!({ "message": "User not found" })),
        Err(e) => internal_error(e, "Failed to load profile"),
    }
}

/// Edits the caller's own profile
#[utoipa::path(
    put,
    path = "/api/auth/profile",
    request_body = UpdateProfileReq,
    responses(
        (status = 200, description = "Updated profile", body = User),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "User no longer exists")
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
#[instrument(name = "auth_update_profile", skip(state, body, auth), fields(user_id = auth.user_id, username = %auth.username))]
pub async fn update_profile(
    auth: AuthUser,
    state: web::Data<AppState>,
    body: web::Json<UpdateProfileReq>,
) -> impl Responder {
    let body = body.into_inner();
    let update = ProfileUpdate {
        full_name: non_empty(body.full_name),
        nik: non_empty(body.nik),
        birth_date: body.birth_date,
        phone: non_empty(body.phone),
        origin: non_empty(body.origin),
        address: non_empty(body.address),
    };

    match state.users.update_profile(auth.user_id, &update).await {
        Ok(Some(user)) => {
            info!("Profile updated");
            HttpResponse::Ok().json(user)
        }
        Ok(None) => HttpResponse::NotFound().json(json!({ "message": "User not found" })),
        Err(e) => internal_error(e, "Failed to update profile"),
    }
}

#[utoipa::path(
    put,
    path = "/api/auth/change-password",
    request_body = ChangePasswordReq,
    responses(
        (status = 200, description = "Password changed"),
        (status = 400, description = "Missing fields or wrong old password"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
#[instrument(name = "auth_change_password", skip(state, body, auth), fields(user_id = auth.user_id, username = %auth.username))]
pub async fn change_password(
    auth: AuthUser,
    state: web::Data<AppState>,
    body: web::Json<ChangePasswordReq>,
) -> impl Responder {
    if body.old_password.is_empty() || body.new_password.is_empty() {
        return HttpResponse::BadRequest().json(json!({
            "message": "Old and new password are required"
        }));
    }

    let user = match state.users.find(auth.user_id).await {
        Ok(Some(u)) => u,
        Ok(None) => return HttpResponse::NotFound().json(json!({ "message": "User not found" })),
        Err(e) => return internal_error(e, "Failed to load user"),
    };

    if verify_password(&body.old_password, &user.password_hash).is_err() {
        info!("Old password mismatch");
        return HttpResponse::BadRequest().json(json!({ "message": "Old password is incorrect" }));
    }

    let hashed = match hash_password(&body.new_password) {
        Ok(h) => h,
        Err(e) => return internal_error(e, "Password hashing failed"),
    };

    match state.users.set_password(user.id, &hashed).await {
        Ok(true) => HttpResponse::Ok().json(json!({ "message": "Password changed" })),
        Ok(false) => HttpResponse::NotFound().json(json!({ "message": "User not found" })),
        Err(e) => internal_error(e, "Failed to store new password"),
    }
}
