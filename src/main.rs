//! Recipe API Backend
//!
//! A REST backend for recipes, tags and ingredients with token authentication,
//! SQLite persistence and local image storage.

mod api;
mod auth;
mod config;
mod db;
mod errors;
mod media;
mod models;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post, put},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use config::Config;
use db::{NewUser, Repository};
use errors::AppError;
use media::MediaStore;
use models::normalize_email;

/// Delay between attempts while waiting for the database at startup.
const DB_WAIT_DELAY: Duration = Duration::from_secs(1);

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub media: Arc<MediaStore>,
    pub config: Arc<Config>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Recipe API Backend");
    tracing::info!("Database path: {:?}", config.db_path);
    tracing::info!("Media root: {:?}", config.media_root);
    tracing::info!("Bind address: {}", config.bind_addr);

    // Initialize database
    tracing::info!("Waiting for database...");
    let pool = db::wait_for_database(&config.db_path, config.db_wait_attempts, DB_WAIT_DELAY).await?;
    let repo = Arc::new(Repository::new(pool));
    tracing::info!("Database available");

    // Initialize media storage
    tokio::fs::create_dir_all(&config.media_root).await?;
    let media = Arc::new(MediaStore::new(
        config.media_root.clone(),
        config.media_url.clone(),
    ));

    bootstrap_superuser(&repo, &config).await?;

    // Create application state
    let state = AppState {
        repo,
        media,
        config: Arc::new(config.clone()),
    };

    // Build router
    let app = create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Routes that need no token
    let public_routes = Router::new()
        .route("/user/create/", post(api::create_user))
        .route("/user/token/", post(api::create_token));

    // Routes that require a token
    let private_routes = Router::new()
        // Users
        .route(
            "/user/me/",
            get(api::get_me).put(api::replace_me).patch(api::update_me),
        )
        // Recipes
        .route(
            "/recipe/recipes/",
            get(api::list_recipes).post(api::create_recipe),
        )
        .route(
            "/recipe/recipes/{id}/",
            get(api::get_recipe)
                .put(api::replace_recipe)
                .patch(api::update_recipe)
                .delete(api::delete_recipe),
        )
        .route(
            "/recipe/recipes/{id}/upload-image/",
            post(api::upload_recipe_image),
        )
        // Tags
        .route("/recipe/tags/", get(api::list_tags))
        .route(
            "/recipe/tags/{id}/",
            put(api::replace_tag)
                .patch(api::update_tag)
                .delete(api::delete_tag),
        )
        // Ingredients
        .route("/recipe/ingredients/", get(api::list_ingredients))
        .route(
            "/recipe/ingredients/{id}/",
            put(api::replace_ingredient)
                .patch(api::update_ingredient)
                .delete(api::delete_ingredient),
        )
        // Apply token auth middleware
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::token_auth_layer,
        ));

    // Health check (no auth required)
    let health_routes = Router::new().route("/health", get(health_check));

    let media_prefix = state.config.media_url.trim_end_matches('/').to_string();
    let media_files = ServeDir::new(state.media.root());

    Router::new()
        .nest("/api", public_routes.merge(private_routes))
        .merge(health_routes)
        .nest_service(&media_prefix, media_files)
        .layer(DefaultBodyLimit::max(state.config.max_upload_bytes))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}

/// Create the configured superuser unless that email is already registered.
async fn bootstrap_superuser(repo: &Repository, config: &Config) -> Result<(), AppError> {
    let (Some(email), Some(password)) = (&config.admin_email, &config.admin_password) else {
        return Ok(());
    };

    let email = normalize_email(email);
    if let Some(existing) = repo.get_user_by_email(&email).await? {
        if existing.is_superuser {
            tracing::info!("Superuser {} already exists", email);
        } else {
            tracing::warn!(
                "{} is registered as a regular user; not promoting it to superuser",
                email
            );
        }
        return Ok(());
    }

    let password_hash = auth::hash_password(password.clone()).await?;
    let user = repo
        .create_user(&NewUser {
            email,
            name: "Administrator".to_string(),
            password_hash,
            is_staff: true,
            is_superuser: true,
        })
        .await?;

    tracing::info!("Created superuser {} (id {})", user.email, user.id);
    Ok(())
}
