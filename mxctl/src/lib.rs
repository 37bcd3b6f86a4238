//! # mxctl: Model Exchange Control Layer
//!
//! `mxctl` is the backend for a marketplace of third-party AI model listings:
//! developers register and publish models with pricing and rate-limit
//! metadata, users invoke them and leave reviews, and the platform keeps
//! per-model rolling statistics and per-developer revenue/quota bookkeeping
//! for dashboards.
//!
//! ## Architecture
//!
//! The application is built on [Axum](https://github.com/tokio-rs/axum) for
//! the HTTP layer and uses PostgreSQL for all persistence. It can run against
//! an external database or, for development, an embedded PostgreSQL instance
//! (behind the `embedded-db` feature).
//!
//! ### Request flow
//!
//! Management requests hit `/api/v1/*`, pass through bearer API-key
//! authentication where required, and reach handlers that talk to the
//! database through repository types ([`db::handlers`]). The interesting path
//! is `POST /api/v1/usage-events`: the invocation handler (an external
//! collaborator) reports one event per invocation, and the handler appends it
//! to the usage ledger and drives the metering engine ([`metering`]) in the
//! same transaction — request counter, rolling latency average, rolling
//! success rate on the listing, and revenue/quota accrual on the developer.
//! Review creation and deletion similarly trigger a from-scratch rating
//! recompute on the listing.
//!
//! Concurrent updates to the same aggregate row serialize through
//! `SELECT ... FOR UPDATE` row locks; the ledger stays authoritative and the
//! aggregates are regenerable from it.
//!
//! ## Quick Start
//!
//! ```no_run
//! use clap::Parser;
//! use mxctl::{Application, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let args = mxctl::config::Args::parse();
//!     let config = Config::load(&args)?;
//!
//!     mxctl::telemetry::init_telemetry()?;
//!
//!     let app = Application::new(config).await?;
//!     app.serve(async {
//!         tokio::signal::ctrl_c().await.expect("Failed to listen for Ctrl+C");
//!     })
//!     .await?;
//!
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod auth;
pub mod config;
pub mod crypto;
pub mod db;
pub mod errors;
pub mod metering;
pub mod openapi;
pub mod telemetry;
pub mod types;

use crate::api::handlers;
use crate::config::CorsOrigin;
use crate::db::handlers::Users;
use crate::db::models::users::UserCreateDBRequest;
use crate::openapi::ApiDoc;
use axum::http::{HeaderValue, Method, header};
use axum::{
    Router,
    routing::{delete, get, patch, post},
};
use bon::Builder;
pub use config::Config;
use sqlx::PgPool;
use tokio::net::TcpListener;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{Level, debug, info, instrument};
use utoipa::OpenApi;
use utoipa_rapidoc::RapiDoc;

pub use types::{DeveloperId, ModelId, ReviewId, UsageEventId, UserId};

/// Application state shared across all request handlers.
#[derive(Clone, Builder)]
pub struct AppState {
    pub db: PgPool,
    pub config: Config,
}

/// Get the mxctl database migrator
pub fn migrator() -> sqlx::migrate::Migrator {
    sqlx::migrate!("./migrations")
}

/// Create the initial staff user if it doesn't exist.
///
/// Idempotent: called on every startup, it only inserts when no account with
/// the configured admin email exists yet. The generated API key is logged
/// once at creation — there is no other way to retrieve it.
#[instrument(skip_all)]
pub async fn create_initial_staff_user(email: &str, username: &str, db: &PgPool) -> Result<UserId, errors::Error> {
    let mut tx = db.begin().await.map_err(|e| errors::Error::Database(e.into()))?;
    let mut users = Users::new(&mut tx);

    if let Some(existing) = users.get_by_email(email).await? {
        tx.commit().await.map_err(|e| errors::Error::Database(e.into()))?;
        return Ok(existing.id);
    }

    let request = UserCreateDBRequest {
        username: username.to_string(),
        email: email.to_string(),
        display_name: None,
        api_key: crypto::generate_api_key(),
        is_staff: true,
    };
    let created = users.create(&request).await?;

    tx.commit().await.map_err(|e| errors::Error::Database(e.into()))?;

    info!(
        "Created initial staff user {} ({}); API key (shown once): {}",
        created.username, created.email, created.api_key
    );

    Ok(created.id)
}

/// Setup database connections, run migrations, and initialize data
async fn setup_database(config: &Config) -> anyhow::Result<(Option<db::embedded::EmbeddedDatabase>, PgPool)> {
    // Database connection - handle both embedded and external
    let (_embedded_db, database_url) = match &config.database {
        config::DatabaseConfig::Embedded { .. } => {
            #[cfg(feature = "embedded-db")]
            {
                let persistent = config.database.embedded_persistent();
                info!("Starting with embedded database (persistent: {})", persistent);
                if !persistent {
                    info!("persistent=false: database will be ephemeral and data will be lost on shutdown");
                }
                let data_dir = config.database.embedded_data_dir();
                let embedded_db = db::embedded::EmbeddedDatabase::start(data_dir, persistent).await?;
                let url = embedded_db.connection_string().to_string();
                (Some(embedded_db), url)
            }
            #[cfg(not(feature = "embedded-db"))]
            {
                anyhow::bail!(
                    "Embedded database is configured but the feature is not enabled. \
                     Rebuild with --features embedded-db to use embedded database."
                );
            }
        }
        config::DatabaseConfig::External { url } => {
            info!("Using external database");
            (None::<db::embedded::EmbeddedDatabase>, url.clone())
        }
    };

    let pool = PgPool::connect(&database_url).await?;
    migrator().run(&pool).await?;

    // Create the initial staff user if it doesn't exist
    create_initial_staff_user(&config.admin_email, &config.admin_username, &pool)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create initial staff user: {}", e))?;

    Ok((_embedded_db, pool))
}

/// Create CORS layer from configuration
fn create_cors_layer(config: &Config) -> anyhow::Result<CorsLayer> {
    let wildcard = config
        .cors
        .allowed_origins
        .iter()
        .any(|origin| matches!(origin, CorsOrigin::Wildcard(_)));

    let allow_origin = if wildcard {
        if config.cors.allow_credentials {
            anyhow::bail!("CORS configuration error: wildcard origin cannot be combined with allow_credentials");
        }
        AllowOrigin::any()
    } else {
        let mut origins = Vec::new();
        for origin in &config.cors.allowed_origins {
            if let CorsOrigin::Url(url) = origin {
                origins.push(url.as_str().trim_end_matches('/').parse::<HeaderValue>()?);
            }
        }
        AllowOrigin::list(origins)
    };

    Ok(CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(config.cors.allow_credentials))
}

/// Build the main application router with all endpoints and middleware.
#[instrument(skip_all)]
pub fn build_router(state: &AppState) -> anyhow::Result<Router> {
    let api_routes = Router::new()
        // Accounts
        .route("/users", post(handlers::users::register_user))
        .route("/users/{id}", get(handlers::users::get_user))
        // Developer registry
        .route("/developers", post(handlers::developers::register_developer))
        .route("/developers", get(handlers::developers::list_developers))
        .route("/developers/{id}", get(handlers::developers::get_developer))
        .route("/developers/{id}", patch(handlers::developers::update_developer))
        .route("/developers/{id}/models", get(handlers::developers::get_developer_models))
        .route("/developers/{id}/verify", post(handlers::developers::verify_developer))
        .route("/developers/{id}/reset-usage", post(handlers::developers::reset_developer_usage))
        // Model catalog
        .route("/models", post(handlers::models::create_model))
        .route("/models", get(handlers::models::list_models))
        .route("/models/featured", get(handlers::models::featured_models))
        .route("/models/{id}", get(handlers::models::get_model))
        .route("/models/{id}", patch(handlers::models::update_model))
        .route("/models/{id}", delete(handlers::models::delete_model))
        .route("/models/{id}/stats", get(handlers::models::model_stats))
        .route("/models/{id}/rate-limit", get(handlers::usage::rate_limit_status))
        .route("/models/{id}/reviews", get(handlers::reviews::list_model_reviews))
        .route("/models/{id}/review-stats", get(handlers::reviews::model_review_stats))
        // Usage ledger + metering
        .route("/usage-events", post(handlers::usage::record_usage_event))
        .route("/usage-events", get(handlers::usage::list_usage_events))
        .route("/usage-events/stats", get(handlers::usage::usage_stats))
        .route("/usage-events/timeline", get(handlers::usage::usage_timeline))
        .route("/usage-events/{id}/feedback", patch(handlers::usage::update_usage_feedback))
        // Reviews
        .route("/reviews", post(handlers::reviews::create_review))
        .route("/reviews/{id}", get(handlers::reviews::get_review))
        .route("/reviews/{id}", delete(handlers::reviews::delete_review))
        .route("/reviews/{id}/vote", post(handlers::reviews::vote_on_review))
        .route("/reviews/{id}/vote", delete(handlers::reviews::remove_review_vote))
        .with_state(state.clone());

    let router = Router::new()
        .route("/healthz", get(|| async { "OK" }))
        .nest("/api/v1", api_routes)
        .merge(RapiDoc::with_openapi("/api-docs/openapi.json", ApiDoc::openapi()).path("/docs"));

    // Create CORS layer from config
    let cors_layer = create_cors_layer(&state.config)?;

    // Add tracing layer
    let router = router.layer(cors_layer).layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_request(DefaultOnRequest::new().level(Level::INFO))
            .on_response(DefaultOnResponse::new().level(Level::INFO)),
    );

    Ok(router)
}

/// Main application struct that owns all resources and lifecycle.
///
/// 1. **Create**: [`Application::new`] initializes resources, runs
///    migrations, and seeds the initial staff user
/// 2. **Serve**: [`Application::serve`] binds a TCP port and handles
///    requests until the shutdown future resolves
pub struct Application {
    router: Router,
    config: Config,
    pool: PgPool,
    _embedded_db: Option<db::embedded::EmbeddedDatabase>,
}

impl Application {
    /// Create a new application instance with all resources initialized
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        debug!("Starting control layer with configuration: {:#?}", config);

        let (_embedded_db, pool) = setup_database(&config).await?;

        let state = AppState::builder().db(pool.clone()).config(config.clone()).build();
        let router = build_router(&state)?;

        Ok(Self {
            router,
            config,
            pool,
            _embedded_db,
        })
    }

    /// Start serving the application
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!(
            "Control layer listening on http://{}, available at http://localhost:{}",
            bind_addr, self.config.port
        );

        // Run the server with graceful shutdown
        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await?;

        // Close database connections
        info!("Closing database connections...");
        self.pool.close().await;

        // Clean up embedded database if it exists
        if let Some(embedded_db) = self._embedded_db {
            info!("Shutting down embedded database...");
            embedded_db.stop().await?;
        }

        Ok(())
    }
}
