use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use stepiva_api::config::ServerConfig;
use stepiva_api::router::build_app_router;
use stepiva_api::state::AppState;
use stepiva_assistant::{AssistantClient, AssistantConfig};
use stepiva_events::{
    EmailConfig, EmailDelivery, NotificationDispatcher, PushConfig, PushDelivery, UsageBus,
    UsagePersistence,
};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "stepiva_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = stepiva_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    stepiva_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    tracing::info!("Database health check passed");

    stepiva_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    // --- Assistant ---
    let assistant = AssistantConfig::from_env().map(|c| Arc::new(AssistantClient::new(c)));
    match &assistant {
        Some(client) => tracing::info!(model = %client.config().model, "Assistant enabled"),
        None => tracing::warn!("OPENAI_API_KEY not set, nudges will use fallback templates"),
    }

    // --- Usage bus ---
    let usage_bus = Arc::new(UsageBus::default());
    let persistence_handle = tokio::spawn(UsagePersistence::run(pool.clone(), usage_bus.subscribe()));

    // --- Delivery ---
    let email = EmailConfig::from_env().and_then(|c| match EmailDelivery::new(c) {
        Ok(delivery) => {
            tracing::info!(provider = delivery.provider(), "Email delivery enabled");
            Some(delivery)
        }
        Err(e) => {
            tracing::warn!(error = %e, "Email delivery misconfigured, emails disabled");
            None
        }
    });
    let push = PushConfig::from_env().and_then(|c| match PushDelivery::new(c) {
        Ok(delivery) => {
            tracing::info!("Web push enabled");
            Some(Arc::new(delivery))
        }
        Err(e) => {
            tracing::warn!(error = %e, "Web push misconfigured, push disabled");
            None
        }
    });
    let dispatcher = Arc::new(NotificationDispatcher::new(
        pool.clone(),
        Arc::clone(&usage_bus),
        email,
        push,
        config.app_url.clone(),
    ));

    // --- App state ---
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        assistant,
        usage_bus: Arc::clone(&usage_bus),
        dispatcher,
    };

    // --- Reminder scheduler ---
    let scheduler_cancel = tokio_util::sync::CancellationToken::new();
    let scheduler_handle = (config.reminder_scan_interval_secs > 0).then(|| {
        tokio::spawn(stepiva_api::background::reminder_scheduler::run(
            state.reminder_scanner(),
            Duration::from_secs(config.reminder_scan_interval_secs),
            scheduler_cancel.clone(),
        ))
    });

    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    scheduler_cancel.cancel();
    if let Some(handle) = scheduler_handle {
        let _ = tokio::time::timeout(Duration::from_secs(5), handle).await;
        tracing::info!("Reminder scheduler stopped");
    }

    // The router (and the state clones inside it) is gone; dropping the last
    // bus handle closes the channel and lets persistence drain and exit.
    drop(usage_bus);
    let _ = tokio::time::timeout(Duration::from_secs(5), persistence_handle).await;
    tracing::info!("Usage persistence shut down");

    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
