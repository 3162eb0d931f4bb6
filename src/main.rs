//! Entry point: load config, wire dependencies, and run the server.

use std::sync::Arc;

use axum::http::{header, HeaderValue, Method};
use taskboard::auth::{CredentialService, HashCost, PasswordHashing, TokenService};
use taskboard::config::Config;
use taskboard::db::{self, MemoryStore, PgStore, Store};
use taskboard::{create_app, AppState, UploadSettings};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const IN_MEMORY_DATABASE: &str = "memory";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = Config::from_env().map_err(|e| anyhow::anyhow!("config: {}", e))?;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))?;
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let store: Arc<dyn Store> = if config.database_url == IN_MEMORY_DATABASE {
        tracing::warn!("using in-memory store; data is lost on exit");
        Arc::new(MemoryStore::new())
    } else {
        let pool = db::create_pool(&config.database_url).await?;
        db::run_migrations(&pool).await?;
        Arc::new(PgStore::new(pool))
    };

    let hashing = PasswordHashing::new(HashCost {
        memory_kib: config.password_hash_memory_kib,
        iterations: config.password_hash_iterations,
    })
    .map_err(|e| anyhow::anyhow!("password hashing: {}", e))?;

    let state = AppState {
        store: store.clone(),
        credentials: CredentialService::new(store, hashing),
        tokens: TokenService::new(&config.jwt_access_secret, &config.jwt_refresh_secret),
        uploads: UploadSettings {
            dir: config.upload_dir.clone(),
            max_avatar_bytes: config.max_avatar_bytes,
        },
    };

    let origins = config
        .cors_origins
        .iter()
        .map(|o| o.parse::<HeaderValue>())
        .collect::<Result<Vec<_>, _>>()?;
    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true);

    let app = create_app(state)
        // Uploaded avatars
        .nest_service("/uploads", ServeDir::new(&config.upload_dir))
        .layer(cors);

    tracing::info!(addr = %config.server_addr, "listening");
    let listener = tokio::net::TcpListener::bind(config.server_addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
