use actix_web::middleware::{Logger, NormalizePath};
use actix_web::web::Data;
use actix_web::{App, HttpServer};
use dotenvy::dotenv;
use std::sync::Arc;

mod api;
mod attendance;
mod auth;
mod clock;
mod config;
mod db;
mod docs;
mod model;
mod models;
mod routes;
mod state;
mod store;
mod utils;

use crate::clock::SystemClock;
use crate::docs::ApiDoc;
use crate::state::AppState;
use crate::store::mysql::MySqlStore;
use config::Config;
use db::init_db;
use tracing::{Level, error, info};
use tracing_appender::rolling;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Usernames of accounts that logged in this recently go straight into the cache.
const WARMUP_RECENT_DAYS: i64 = 30;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();

    let config = Config::from_env().map_err(std::io::Error::other)?;

    // Rolling daily log
    let file_appender = rolling::daily("logs", "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_max_level(config.log_level.parse::<Level>().unwrap_or(Level::INFO))
        .with_ansi(false)
        .with_target(false)
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .init();

    info!(
        weekday = %config.attendance.weekday,
        utc_offset = %config.attendance.utc_offset,
        "Server starting..."
    );

    let pool = init_db(&config).await.map_err(std::io::Error::other)?;
    let store = Arc::new(MySqlStore::new(pool));

    let server_addr = config.server_addr.clone();
    let state = Data::new(AppState::new(
        config,
        store.clone(),
        store,
        Arc::new(SystemClock),
    ));

    let warmup_state = state.clone();
    actix_web::rt::spawn(async move {
        if let Err(e) = warmup_state
            .usernames
            .warmup(warmup_state.users.as_ref(), WARMUP_RECENT_DAYS)
            .await
        {
            error!(error = %e, "Failed to warm up username index");
        }
    });

    HttpServer::new(move || {
        let config = state.config.clone();
        App::new()
            .wrap(Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                // wildcard {_:.*} matches the JS/CSS assets
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .app_data(state.clone())
            .configure(|cfg| routes::configure(cfg, config))
    })
    .bind(server_addr)?
    .run()
    .await
}
