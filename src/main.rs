use appgate::config::Config;
use appgate::dispatch::{AppHandler, PermissionGate};
use appgate::handler::Router;
use appgate::permission::SandstormPermissions;
use appgate::{logger, server};
use std::sync::Arc;
use tokio::sync::Notify;

mod demo;

/// Password accepted by the demo `/login` endpoint
const DEMO_PASSWORD_ENV: &str = "APPGATE_DEMO_PASSWORD";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = Config::load()?;
    logger::init(&cfg)?;

    // Build the Tokio runtime, sizing worker threads from config
    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();
    if let Some(workers) = cfg.server.workers {
        runtime_builder.worker_threads(workers);
    }
    let runtime = runtime_builder.build()?;

    runtime.block_on(async_main(cfg))
}

async fn async_main(cfg: Config) -> Result<(), Box<dyn std::error::Error>> {
    let addr = cfg.get_socket_addr()?;
    let listener = server::create_listener(addr)?;

    let gate = PermissionGate::new(Arc::new(SandstormPermissions), &cfg.dispatch);
    let password = std::env::var(DEMO_PASSWORD_ENV).unwrap_or_else(|_| {
        logger::log_warning(&format!("{DEMO_PASSWORD_ENV} not set, /login accepts nothing"));
        String::new()
    });

    let router = Router::new(cfg.routes.health.clone())
        .route(
            "/form",
            gate.require("read", AppHandler::new(demo::form_summary, &cfg.dispatch)),
        )
        .route(
            "/login",
            AppHandler::new(demo::Login::new(password), &cfg.dispatch),
        );

    let shutdown = Arc::new(Notify::new());
    server::signal::start_signal_handler(Arc::clone(&shutdown))?;

    logger::log_server_start(&addr, &cfg);
    let state = Arc::new(server::AppState::new(cfg, router));
    server::run(listener, state, shutdown).await;
    Ok(())
}
