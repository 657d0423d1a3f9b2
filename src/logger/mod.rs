//! Logger module
//!
//! Provides logging utilities for the server including:
//! - Server lifecycle logging
//! - Dispatch outcome logging (client/server errors, form parsing)
//! - Access logging in several formats
//! - File-based logging support with level filtering

mod format;
pub mod writer;

pub use format::AccessLogEntry;
pub use writer::Level;

use crate::config::Config;
use chrono::Local;
use hyper::Method;
use std::fmt::Display;
use std::net::SocketAddr;

/// Initialize the logger with configuration
///
/// Should be called once at application startup.
pub fn init(config: &Config) -> std::io::Result<()> {
    let level = config.logging.level.parse().unwrap_or_else(|e| {
        eprintln!("[WARN] {e}, using info");
        Level::Info
    });
    writer::init(
        level,
        config.logging.access_log_file.as_deref(),
        config.logging.error_log_file.as_deref(),
    )
}

fn write(level: Level, message: &str) {
    let line = format!("{} {message}", Local::now().format("%Y/%m/%d %H:%M:%S"));
    match writer::get() {
        Some(w) => w.write(level, &line),
        None if level <= Level::Warn => eprintln!("{line}"),
        None => println!("{line}"),
    }
}

pub fn log_server_start(addr: &SocketAddr, config: &Config) {
    write(Level::Info, "======================================");
    write(Level::Info, &format!("Listening on: http://{addr}"));
    write(Level::Info, &format!("Log level: {}", config.logging.level));
    if let Some(workers) = config.server.workers {
        write(Level::Info, &format!("Worker threads: {workers}"));
    }
    write(
        Level::Info,
        &format!("Permission checks: {}", config.dispatch.permissions),
    );
    write(
        Level::Info,
        &format!("Max form memory: {} bytes", config.dispatch.max_form_memory),
    );
    write(Level::Info, "======================================");
}

pub fn log_connection_accepted(peer_addr: &SocketAddr) {
    write(Level::Debug, &format!("[Connection] Accepted from: {peer_addr}"));
}

pub fn log_connection_error(err: &impl std::fmt::Debug) {
    write(Level::Error, &format!("[ERROR] Failed to serve connection: {err:?}"));
}

pub fn log_error(message: &str) {
    write(Level::Error, &format!("[ERROR] {message}"));
}

pub fn log_warning(message: &str) {
    write(Level::Warn, &format!("[WARN] {message}"));
}

pub fn log_info(message: &str) {
    write(Level::Info, message);
}

/// Request rejected because its body could not be parsed as a form
pub fn log_form_parse_failed(method: &Method, path: &str, err: &impl Display) {
    write(
        Level::Warn,
        &format!("[CLIENT ERROR] {method} {path} fail form parse: {err}"),
    );
}

/// Handler failed with a message meant for the caller
pub fn log_client_error(method: &Method, path: &str, err: &impl Display) {
    write(
        Level::Info,
        &format!("[CLIENT ERROR] {method} {path} client error: {err}"),
    );
}

/// Handler failed without a user-safe message
pub fn log_server_error(method: &Method, path: &str, err: &impl Display) {
    write(
        Level::Error,
        &format!("[SERVER ERROR] {method} {path} server error: {err}"),
    );
}

pub fn log_form_cleanup_error(err: &std::io::Error) {
    write(Level::Warn, &format!("[WARN] form cleanup: {err}"));
}

/// Log formatted access log entry
pub fn log_access(entry: &AccessLogEntry, format: &str) {
    let line = entry.format(format);
    match writer::get() {
        Some(w) => w.write_access(&line),
        None => println!("{line}"),
    }
}

pub fn log_shutdown(active_connections: usize) {
    write(
        Level::Info,
        &format!("[Shutdown] Listener closed, {active_connections} connection(s) still active"),
    );
}
