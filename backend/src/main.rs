//! Video Request Board Backend
//!
//! REST backend and server-rendered board for proposing and voting on video topics,
//! with SQLite persistence.

mod api;
mod auth;
mod config;
mod db;
mod errors;
mod models;
mod web;

use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use config::Config;
use db::Repository;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub config: Arc<Config>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let registry = tracing_subscriber::registry().with(env_filter);
    if config.log_json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    tracing::info!("Starting Video Request Board Backend");
    tracing::info!("Database path: {:?}", config.db_path);
    tracing::info!("Bind address: {}", config.bind_addr);

    if config.admin_key.is_none() {
        tracing::warn!(
            "No admin key configured (VIDREQ_ADMIN_KEY). Update and delete endpoints are open!"
        );
    }

    // Initialize database
    let pool = db::init_database(&config.db_path).await?;
    let repo = Arc::new(Repository::new(pool));

    let state = AppState {
        repo,
        config: Arc::new(config.clone()),
    };

    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let admin_key = state.config.admin_key.clone();

    // Editing and removing requests is reserved to the board admin
    let admin_routes = Router::new()
        .route(
            "/video-request/{id}",
            put(api::update_request).delete(api::delete_request),
        )
        .route_layer(middleware::from_fn(move |req, next| {
            auth::admin_auth_layer(admin_key.clone(), req, next)
        }));

    let public_routes = Router::new()
        .route(
            "/video-request",
            get(api::list_requests).post(api::create_request),
        )
        .route("/video-request/vote", put(api::vote))
        .route("/video-request/cards", get(web::cards))
        .route("/video-request/{id}", get(api::get_request))
        .route("/video-request/{id}/card", get(web::card))
        .route("/users/login", post(api::login))
        .route("/users/{id}", get(api::get_user))
        .route("/", get(web::index))
        .route("/assets/app.js", get(web::app_script))
        .route("/health", get(health_check));

    public_routes
        .merge(admin_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests;
