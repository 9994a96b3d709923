use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    process,
    sync::Arc,
};

use braggy::{
    config::{Config, TokenKey},
    identity::ClerkDirectory,
    jwt_auth::TokenVerifier,
    route::create_router,
    service::NoteService,
    signature::WebhookVerifier,
    store::PgNoteStore,
    AppState, RouterOptions,
};
use dotenvy::dotenv;
use sqlx::postgres::PgPoolOptions;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() {
    let _ = dotenv();
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("braggy=info,tower_http=info")),
        )
        .init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(err) => {
            error!("🔥 Invalid configuration: {err}");
            process::exit(1);
        }
    };

    let pool = match PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await
    {
        Ok(pool) => {
            info!("✅Connection to the database is successful!");
            pool
        }
        Err(err) => {
            error!("🔥 Failed to connect to the database: {:?}", err);
            process::exit(1);
        }
    };

    let store = PgNoteStore::new(pool);
    if let Err(err) = store.migrate().await {
        error!("🔥 Failed to run migrations: {err}");
        process::exit(1);
    }

    let verifier = match &config.token_key {
        TokenKey::PublicKey(pem) => match TokenVerifier::rs256_pem(pem.as_bytes()) {
            Ok(verifier) => verifier,
            Err(err) => {
                error!("🔥 CLERK_JWT_KEY is not a valid RSA public key: {err}");
                process::exit(1);
            }
        },
        TokenKey::Secret(secret) => TokenVerifier::hs256(secret.as_bytes()),
    };

    let webhook = match config.webhook_secret.as_deref().map(WebhookVerifier::new) {
        Some(Ok(verifier)) => Some(verifier),
        Some(Err(err)) => {
            error!("🔥 CLERK_WEBHOOK_SECRET is unusable: {err}");
            process::exit(1);
        }
        None => {
            warn!("CLERK_WEBHOOK_SECRET not set, webhook deliveries will be refused");
            None
        }
    };

    let directory = match ClerkDirectory::new(config.clerk.clone()) {
        Ok(directory) => directory,
        Err(err) => {
            error!("🔥 Failed to build the identity provider client: {err}");
            process::exit(1);
        }
    };

    let app = create_router(Arc::new(AppState {
        notes: NoteService::new(Arc::new(store)),
        directory: Arc::new(directory),
        verifier,
        webhook,
        options: RouterOptions {
            cors_origin: config.cors_origin.clone(),
            development: config.development,
            admin_routes: config.admin_routes,
        },
    }));

    let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)), config.port);
    info!("🚀 Server started successfully on {addr}");
    if let Err(err) = axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("🔥 Server error: {err}");
        process::exit(1);
    }

    info!("Server shutting down...");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");

        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;

        info!("Received terminate signal, shutting down");
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
