use crate::auth::auth::AuthUser;
use crate::auth::jwt::verify_token;
use crate::state::AppState;
use actix_web::middleware::Next;
use actix_web::{
    Error, HttpMessage, HttpResponse,
    body::BoxBody,
    dev::{ServiceRequest, ServiceResponse},
    web::Data,
};
use serde_json::json;
use tracing::{error, info};

pub async fn auth_middleware(
    req: ServiceRequest,
    next: Next<BoxBody>,
) -> Result<ServiceResponse<BoxBody>, Error> {
    let state = req
        .app_data::<Data<AppState>>()
        .cloned()
        .ok_or_else(|| actix_web::error::ErrorInternalServerError("App state missing"))?;

    let header_value = match req.headers().get("Authorization") {
        Some(h) => h.to_str().map_err(|_| {
            actix_web::error::ErrorUnauthorized(
                json!({"message": "Invalid Authorization header encoding"}),
            )
        })?,
        None => {
            let resp =
                HttpResponse::Unauthorized().json(json!({"message": "Missing Authorization header"}));
            return Ok(req.into_response(resp.map_into_boxed_body()));
        }
    };

    let token = match header_value.strip_prefix("Bearer ") {
        Some(t) => t,
        None => {
            let resp = HttpResponse::Unauthorized()
                .json(json!({"message": "Authorization header must start with Bearer"}));
            return Ok(req.into_response(resp.map_into_boxed_body()));
        }
    };

    let claims = match verify_token(token, &state.config.jwt_secret) {
        Ok(c) => c,
        Err(e) => {
            let resp = HttpResponse::Unauthorized()
                .json(json!({"message": "Invalid or expired token", "details": e}));
            return Ok(req.into_response(resp.map_into_boxed_body()));
        }
    };

    // role and existence come from the store, not the token
    let user = match state.users.find(claims.user_id).await {
        Ok(Some(u)) => u,
        Ok(None) => {
            info!(user_id = claims.user_id, "Token for a deleted user");
            let resp =
                HttpResponse::Unauthorized().json(json!({"message": "User no longer exists"}));
            return Ok(req.into_response(resp.map_into_boxed_body()));
        }
        Err(e) => {
            error!(error = %e, user_id = claims.user_id, "Failed to load token user");
            let resp = HttpResponse::InternalServerError()
                .json(json!({"message": "Internal Server Error"}));
            return Ok(req.into_response(resp.map_into_boxed_body()));
        }
    };

    let auth_user = AuthUser {
        user_id: user.id,
        username: user.username,
        role: user.role,
    };

    req.extensions_mut().insert(auth_user);

    next.call(req).await
}
