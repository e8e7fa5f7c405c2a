//! Peersup server entry point.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{Router, middleware};
use peersup_api::{middleware::AppState, router as api_router};
use peersup_common::Config;
use peersup_core::{
    NoOpGateway, NoOpPush, NotificationService, PushDelivery, RefundService, RescheduleService,
    SessionService, UserService,
};
use peersup_db::repositories::{
    NotificationRepository, RefundRepository, RescheduleRequestRepository, SessionRepository,
    UserRepository,
};
use peersup_worker::{SchedulerConfig, WebhookPush, WorkflowExecutor, run_scheduler};
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Waits for a shutdown signal (SIGINT or SIGTERM).
///
/// On Unix systems, this listens for both SIGINT (Ctrl+C) and SIGTERM.
/// On Windows, this only listens for Ctrl+C.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
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

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "peersup=debug,tower_http=debug".into()),
        )
        .init();

    info!("Starting peersup server...");

    // Load configuration
    let config = Config::load()?;

    // Connect to database
    let db = peersup_db::init(&config).await?;
    info!("Connected to database");

    // Run migrations
    info!("Running database migrations...");
    peersup_db::migrate(&db).await?;
    info!("Migrations completed");

    // Initialize repositories
    let db = Arc::new(db);
    let user_repo = UserRepository::new(Arc::clone(&db));
    let session_repo = SessionRepository::new(Arc::clone(&db));
    let reschedule_repo = RescheduleRequestRepository::new(Arc::clone(&db));
    let notification_repo = NotificationRepository::new(Arc::clone(&db));
    let refund_repo = RefundRepository::new(Arc::clone(&db));

    // Initialize push delivery (webhook relay when configured)
    let push: Arc<dyn PushDelivery> = match (
        config.notifications.webhook_url.clone(),
        config.notifications.webhook_secret.clone(),
    ) {
        (Some(url), Some(secret)) => {
            info!(url = %url, "Push delivery enabled via webhook relay");
            Arc::new(WebhookPush::new(url, secret))
        }
        _ => {
            info!("Push delivery disabled; notifications are persisted only");
            Arc::new(NoOpPush)
        }
    };

    // Initialize services
    let user_service = UserService::new(user_repo.clone());
    let session_service = SessionService::new(session_repo.clone(), user_repo.clone());
    let notification_service =
        NotificationService::with_push(notification_repo.clone(), push);
    let reschedule_service = RescheduleService::new(
        reschedule_repo,
        session_repo,
        user_repo,
        notification_service.clone(),
    );
    // The payment provider adapter is deployment-specific; the no-op gateway
    // records settlement locally.
    let refund_service = RefundService::new(
        refund_repo,
        Arc::new(NoOpGateway),
        notification_service.clone(),
    );

    // Create app state
    let state = AppState {
        user_service,
        session_service,
        reschedule_service: reschedule_service.clone(),
        notification_service,
        refund_service: refund_service.clone(),
    };

    // Start the workflow scheduler (deadline sweep, refund settlement,
    // cleanup)
    let scheduler_config = SchedulerConfig::from(&config.scheduler);
    let executor = Arc::new(WorkflowExecutor::new(reschedule_service, refund_service));
    run_scheduler(scheduler_config, executor).await;
    info!("Workflow scheduler started");

    // Build router
    let app = Router::new()
        .nest("/api", api_router())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            peersup_api::middleware::auth_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state);

    // Start server with graceful shutdown
    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}
