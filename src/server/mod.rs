// Server module entry point
// Accept loop, per-connection tasks and shutdown handling

pub mod connection;
pub mod listener;
pub mod signal;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tokio::sync::Notify;

use crate::config::Config;
use crate::dispatch::Service;
use crate::logger;

// Re-export commonly used items
pub use connection::accept_connection;
pub use listener::create_listener;

const DRAIN_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// State shared by every connection, read-only while serving
pub struct AppState {
    pub config: Config,
    /// Root service every request is handed to
    pub service: Box<dyn Service>,
}

impl AppState {
    pub fn new(config: Config, service: impl Service + 'static) -> Self {
        Self {
            config,
            service: Box::new(service),
        }
    }
}

/// Accept connections until `shutdown` is notified
///
/// In-flight connections get up to `performance.write_timeout` seconds to finish.
pub async fn run(listener: TcpListener, state: Arc<AppState>, shutdown: Arc<Notify>) {
    let active_connections = Arc::new(AtomicUsize::new(0));

    loop {
        tokio::select! {
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, peer_addr)) => {
                        accept_connection(stream, peer_addr, &state, &active_connections);
                    }
                    Err(e) => logger::log_error(&format!("Failed to accept connection: {e}")),
                }
            }

            () = shutdown.notified() => break,
        }
    }

    drop(listener);
    logger::log_shutdown(active_connections.load(Ordering::SeqCst));

    let grace = Duration::from_secs(state.config.performance.write_timeout);
    let deadline = Instant::now() + grace;
    while active_connections.load(Ordering::SeqCst) > 0 && Instant::now() < deadline {
        tokio::time::sleep(DRAIN_POLL_INTERVAL).await;
    }

    let remaining = active_connections.load(Ordering::SeqCst);
    if remaining > 0 {
        logger::log_warning(&format!(
            "Shutdown grace period elapsed with {remaining} connection(s) still open"
        ));
    }
}
