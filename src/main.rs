mod handlers;
mod state;

use axum::{
    Router,
    routing::{get, patch, post},
};
use clap::Parser;
use dispatch_gateway::config::Args;
use dispatch_gateway::{HttpTransport, LoginRedirect, Scheduler, SessionStore};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;
use handlers::{
    call_handler, clear_session_handler, config_handler, get_session_handler, health_handler,
    metrics_handler, put_session_handler, stats_handler,
};
use state::AppState;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("dispatch_gateway=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}

// this is main async function with tokio
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    // parse cli arguments
    let args = Args::parse();

    let session = Arc::new(SessionStore::new());
    let redirect = Arc::new(LoginRedirect::new());
    let transport = HttpTransport::new(
        &args.backend,
        args.transport_settings(),
        Arc::clone(&session),
        redirect.clone(),
    );
    let backend_url = transport.base_url().to_string();
    let scheduler = Scheduler::spawn(transport, args.scheduler_config());

    // values fetched under one session must not answer another
    let on_session_change = scheduler.clone();
    session.on_change(move || {
        let _ = on_session_change.clear_cache();
    });

    // creating shared state
    let state = AppState {
        scheduler,
        session,
        redirect,
        login_route: args.login_route.clone(),
    };

    //creating the router with routes
    let app = Router::new()
        .route("/health", get(health_handler))
        .route("/call", post(call_handler))
        .route("/stats", get(stats_handler))
        .route("/config", patch(config_handler))
        .route(
            "/session",
            get(get_session_handler)
                .put(put_session_handler)
                .delete(clear_session_handler),
        )
        .route("/metrics", get(metrics_handler))
        .with_state(state);

    let addr = format!("0.0.0.0:{}", args.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!(port = args.port, "Gateway listening");
    info!(backend = %backend_url, "Forwarding calls");
    info!(
        max_concurrent = args.max_concurrent,
        min_interval_ms = args.min_interval_ms,
        cache_ttl_ms = args.cache_ttl_ms,
        "Scheduling limits"
    );
    axum::serve(listener, app).await?;
    Ok(())
}
