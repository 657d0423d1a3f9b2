// Configuration module entry point
// Loads the server configuration from file and environment

mod types;

use std::net::SocketAddr;

// Re-export public types
pub use types::{
    Config, DispatchConfig, HealthConfig, HttpConfig, LoggingConfig, PerformanceConfig,
    RoutesConfig, ServerConfig,
};

/// Environment variable naming the config file (without extension)
pub const CONFIG_PATH_ENV: &str = "APPGATE_CONFIG";

impl Config {
    /// Load configuration from the path in `APPGATE_CONFIG`, or "config" when unset
    pub fn load() -> Result<Self, config::ConfigError> {
        let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| "config".to_string());
        Self::load_from(&path)
    }

    /// Load configuration from specified file path (without extension)
    ///
    /// The file is optional; `APPGATE_*` environment variables override it, using
    /// `__` between section and key (e.g. `APPGATE_DISPATCH__PERMISSIONS=false`).
    pub fn load_from(config_path: &str) -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(
                config::Environment::with_prefix("APPGATE")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("logging.level", "info")?
            .set_default("logging.access_log", true)?
            .set_default("performance.keep_alive_timeout", 75)?
            .set_default("performance.read_timeout", 30)?
            .set_default("performance.write_timeout", 30)?
            .set_default("http.server_name", "appgate/0.1")?
            .set_default("http.max_body_size", 33_554_432)? // 32MB
            .set_default("dispatch.permissions", true)?
            .set_default("dispatch.max_form_memory", 524_288)? // 512KB
            .build()?;

        settings.try_deserialize()
    }

    pub fn get_socket_addr(&self) -> Result<SocketAddr, String> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| format!("Invalid address: {e}"))
    }
}
