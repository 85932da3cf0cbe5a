use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    middleware,
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod auth;
pub mod blob;
pub mod clock;
pub mod comment;
pub mod config;
pub mod db;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod journal;
pub mod mirror;
pub mod models;
pub mod service;
pub mod store;
pub mod upload;

use auth::rate_limit::RateLimitState;
use config::Config;
use service::EntryService;

/// Multipart bodies carry a scan of up to 10MB plus form overhead.
const PAPER_DIARY_BODY_LIMIT: usize = 25 * 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub entries: EntryService,
    pub rate_limiter: RateLimitState,
}

pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/readyz", get(handlers::health::readyz));

    let api_routes = Router::new()
        .route(
            "/api/entries",
            get(handlers::entries::list_entries).post(handlers::entries::save_entry),
        )
        .route("/api/entries/overview", get(handlers::entries::overview))
        .route("/api/entries/:id", delete(handlers::entries::delete_entry))
        .route(
            "/api/paper-diary",
            post(handlers::paper_diary::upload_paper_diary)
                .layer(DefaultBodyLimit::max(PAPER_DIARY_BODY_LIMIT)),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::middleware::resolve_session,
        ));

    Router::new()
        .merge(public_routes)
        .merge(api_routes)
        .layer(cors_layer(&state.config))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(config: &Config) -> CorsLayer {
    let origins: Vec<HeaderValue> = std::iter::once(config.frontend_url.clone())
        .chain(Config::extra_origins())
        .filter_map(|o| match o.parse::<HeaderValue>() {
            Ok(hv) => Some(hv),
            Err(_) => {
                tracing::warn!(origin = %o, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
        .allow_credentials(true)
}
