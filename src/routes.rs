use crate::{
    api::{admin, attendance},
    auth::{handlers, middleware::auth_middleware},
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};
use std::sync::Arc;

pub fn configure(cfg: &mut web::ServiceConfig, config: Config) {
    // Helper to build per-route limiter
    fn build_limiter(requests_per_min: u32) -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
        let requests_per_min = requests_per_min.max(1);
        let per_ms = (60_000 / requests_per_min as u64).max(1);
        let cfg = GovernorConfigBuilder::default()
            .milliseconds_per_request(per_ms)
            .burst_size(requests_per_min)
            .key_extractor(PeerIpKeyExtractor)
            .finish()
            // period and burst are both non-zero here
            .unwrap_or_default();
        Governor::new(&cfg)
    }

    let login_limiter = Arc::new(build_limiter(config.rate_login_per_min));
    let register_limiter = Arc::new(build_limiter(config.rate_register_per_min));
    let protected_limiter = Arc::new(build_limiter(config.rate_protected_per_min));

    // Public routes. Plain resources rather than a scope, so the rest of
    // {api_prefix}/auth still reaches the protected scope below.
    let prefix = config.api_prefix.trim_end_matches('/');
    cfg.service(
        web::resource(format!("{prefix}/auth/login"))
            .wrap(login_limiter)
            .route(web::post().to(handlers::login)),
    )
    .service(
        web::resource(format!("{prefix}/auth/register"))
            .wrap(register_limiter)
            .route(web::post().to(handlers::register)),
    );

    // Protected routes
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware))
            .wrap(protected_limiter)
            .service(
                web::scope("/auth")
                    .service(
                        web::resource("/profile")
                            .route(web::get().to(handlers::profile))
                            .route(web::put().to(handlers::update_profile)),
                    )
                    .service(
                        web::resource("/change-password")
                            .route(web::put().to(handlers::change_password)),
                    ),
            )
            .service(
                web::scope("/absensi")
                    // /absensi
                    .service(web::resource("").route(web::post().to(attendance::check_in)))
                    // /absensi/cek
                    .service(web::resource("/cek").route(web::get().to(attendance::check_status)))
                    // /absensi/riwayat
                    .service(web::resource("/riwayat").route(web::get().to(attendance::history))),
            )
            .service(
                web::scope("/admin")
                    .service(web::resource("/users").route(web::get().to(admin::list_users)))
                    .service(
                        web::resource("/users/{id}").route(web::delete().to(admin::delete_user)),
                    )
                    .service(web::resource("/promote/{id}").route(web::put().to(admin::promote)))
                    .service(web::resource("/demote/{id}").route(web::put().to(admin::demote)))
                    .service(
                        web::resource("/toggle-member/{id}")
                            .route(web::put().to(admin::toggle_member)),
                    )
                    .service(
                        web::resource("/absensi").route(web::get().to(admin::list_attendance)),
                    )
                    .service(
                        web::resource("/absensi/{id}")
                            .route(web::get().to(admin::user_attendance)),
                    )
                    .service(web::resource("/stats").route(web::get().to(admin::stats))),
            ),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        attendance::policy::AttendancePolicy, clock::SystemClock, state::AppState,
        store::memory::MemoryStore,
    };
    use actix_web::{App, http::StatusCode, test};
    use serde_json::json;

    #[actix_web::test]
    async fn login_limiter_throttles_per_minute() {
        let mut config = Config::for_tests(AttendancePolicy::default());
        config.rate_login_per_min = 1;
        let store = Arc::new(MemoryStore::new());
        let data = web::Data::new(AppState::new(
            config.clone(),
            store.clone(),
            store,
            Arc::new(SystemClock),
        ));
        let app = test::init_service(
            App::new()
                .app_data(data)
                .configure(|cfg| configure(cfg, config)),
        )
        .await;

        let login = || {
            test::TestRequest::post()
                .uri("/api/auth/login")
                .peer_addr("127.0.0.1:4000".parse().unwrap())
                .set_json(json!({ "username": "ghost", "password": "boo" }))
                .to_request()
        };

        assert_eq!(test::call_service(&app, login()).await.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            test::call_service(&app, login()).await.status(),
            StatusCode::TOO_MANY_REQUESTS
        );
    }
}
