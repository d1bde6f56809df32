//! Asrama portal server entry point.

use std::sync::Arc;
use std::time::Duration;

use asrama_api::{AppState, AuthSettings, SseBroadcaster};
use asrama_common::{Config, CurrentUser, LocalStorage, Role, TokenVerifier};
use asrama_common::config::StoreBackend;
use asrama_core::RealtimePublisherService;
use asrama_db::{MemoryStore, Stores};
use asrama_realtime::{PubSubSseBridge, RedisPubSub};
use sea_orm::{ConnectOptions, Database};
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const SSE_CLEANUP_INTERVAL: Duration = Duration::from_secs(300);

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received SIGINT, initiating graceful shutdown...");
        },
        () = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown...");
        },
    }
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "asrama=debug,tower_http=debug".into());
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn connect_stores(config: &Config) -> Result<Stores, Box<dyn std::error::Error>> {
    match config.database.backend {
        StoreBackend::Postgres => {
            let mut db_opts = ConnectOptions::new(&config.database.url);
            db_opts
                .max_connections(config.database.max_connections)
                .min_connections(config.database.min_connections);

            let db = Database::connect(db_opts).await?;
            info!("Connected to database");

            info!("Running database migrations...");
            asrama_db::migrate(&db).await?;
            info!("Migrations completed");

            Ok(Stores::postgres(Arc::new(db)))
        }
        StoreBackend::Memory => {
            warn!("Using the in-memory store; data is lost on restart");
            let store = MemoryStore::new();
            seed_demo_accounts(&store, &TokenVerifier::new(&config.auth.jwt_secret)).await;
            Ok(Stores::memory(&store))
        }
    }
}

/// Demo accounts for offline mode, with tokens logged so the API can be tried
/// without a login service.
async fn seed_demo_accounts(store: &MemoryStore, verifier: &TokenVerifier) {
    let student = store
        .add_student("budi@asrama.test", "2101001", "Budi Santoso", false)
        .await;
    let kipk = store
        .add_student("sari@asrama.test", "2101002", "Sari Lestari", true)
        .await;
    let (manager_user, manager) = store.add_manager("pengelola@asrama.test", "Pengelola").await;

    let actors = [
        CurrentUser {
            id: student.user.id,
            role: Role::Student,
            student_profile_id: Some(student.student.id),
            manager_profile_id: None,
        },
        CurrentUser {
            id: kipk.user.id,
            role: Role::Student,
            student_profile_id: Some(kipk.student.id),
            manager_profile_id: None,
        },
        CurrentUser {
            id: manager_user.id,
            role: Role::Manager,
            student_profile_id: None,
            manager_profile_id: Some(manager.id),
        },
    ];

    for actor in &actors {
        match verifier.sign(actor, chrono::Duration::days(7)) {
            Ok(token) => {
                info!(user_id = actor.id, role = ?actor.role, token = %token, "Demo account");
            }
            Err(e) => warn!(user_id = actor.id, error = %e, "Failed to sign demo token"),
        }
    }
}

/// Pick the realtime publisher. With Redis configured, events travel through
/// Pub/Sub and come back to this process's SSE streams through the bridge.
async fn realtime_publisher(
    config: &Config,
    sse: &SseBroadcaster,
) -> Result<RealtimePublisherService, Box<dyn std::error::Error>> {
    let Some(redis) = &config.redis else {
        info!("No Redis configured, delivering realtime events in-process");
        return Ok(Arc::new(sse.clone()));
    };

    info!("Connecting to Redis...");
    let pubsub = Arc::new(RedisPubSub::new(&redis.url, &redis.prefix).await?);
    pubsub.start().await?;

    let broadcaster = sse.clone();
    PubSubSseBridge::new(Arc::clone(&pubsub)).start(move |envelope| {
        let broadcaster = broadcaster.clone();
        tokio::spawn(async move {
            broadcaster
                .broadcast_to_user(envelope.user_id, envelope.event)
                .await;
        });
    });
    info!("Redis Pub/Sub bridge started");

    Ok(pubsub)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    init_tracing(config.server.json_logs);

    info!("Starting asrama portal server...");

    let stores = connect_stores(&config).await?;

    let files = Arc::new(LocalStorage::new(
        config.storage.base_path.clone(),
        config.storage.base_url.clone(),
    ));

    let sse_broadcaster = SseBroadcaster::new();
    let publisher = realtime_publisher(&config, &sse_broadcaster).await?;

    {
        let sse = sse_broadcaster.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(SSE_CLEANUP_INTERVAL);
            loop {
                interval.tick().await;
                sse.cleanup().await;
            }
        });
    }

    let state = AppState::new(
        &stores,
        files,
        publisher,
        config.clearance.base_fee,
        AuthSettings {
            verifier: TokenVerifier::new(&config.auth.jwt_secret),
            cookie_name: config.auth.cookie_name.clone(),
        },
        sse_broadcaster,
    );

    let app = asrama_api::app(state)
        .nest_service(
            &config.storage.base_url,
            ServeDir::new(&config.storage.base_path),
        )
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );

    let listener =
        tokio::net::TcpListener::bind((config.server.host.as_str(), config.server.port)).await?;
    info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}
