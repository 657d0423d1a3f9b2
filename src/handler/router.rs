//! Request routing module
//!
//! Entry point for HTTP request processing: body size check, route matching,
//! access logging and conversion of the written response into a hyper response.

use crate::config::HealthConfig;
use crate::dispatch::{BoxFuture, Service};
use crate::http::{self, body, BufferedResponse, RequestBody, ResponseStats, ResponseWriter};
use crate::logger::{self, AccessLogEntry};
use crate::server::AppState;
use http_body_util::Full;
use hyper::body::{Bytes, Incoming};
use hyper::header::{HeaderName, HeaderValue, REFERER, SERVER, USER_AGENT};
use hyper::{Request, Response, StatusCode, Version};
use std::cmp::Reverse;
use std::collections::HashMap;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

/// Path-based service table
///
/// Lookup order: health endpoints, exact paths, then the longest registered
/// prefix (routes ending in `/`), else 404.
pub struct Router {
    health: HealthConfig,
    exact: HashMap<String, Box<dyn Service>>,
    prefixes: Vec<(String, Box<dyn Service>)>,
}

impl Router {
    pub fn new(health: HealthConfig) -> Self {
        Self {
            health,
            exact: HashMap::new(),
            prefixes: Vec::new(),
        }
    }

    /// Register `service` for `path`; a trailing `/` makes it a prefix route
    #[must_use]
    pub fn route(mut self, path: impl Into<String>, service: impl Service + 'static) -> Self {
        let path = path.into();
        if path.ends_with('/') {
            self.prefixes.push((path, Box::new(service)));
            self.prefixes.sort_by_key(|(prefix, _)| Reverse(prefix.len()));
        } else {
            self.exact.insert(path, Box::new(service));
        }
        self
    }

    fn is_health_path(&self, path: &str) -> bool {
        self.health.enabled
            && (path == self.health.liveness_path || path == self.health.readiness_path)
    }

    fn find(&self, path: &str) -> Option<&dyn Service> {
        if let Some(service) = self.exact.get(path) {
            return Some(&**service);
        }
        self.prefixes
            .iter()
            .find(|(prefix, _)| path.starts_with(prefix.as_str()))
            .map(|(_, service)| &**service)
    }
}

impl Service for Router {
    fn serve<'a>(
        &'a self,
        req: Request<RequestBody>,
        w: &'a mut dyn ResponseWriter,
    ) -> BoxFuture<'a, ()> {
        let path = req.uri().path();
        if self.is_health_path(path) {
            http::text(w, StatusCode::OK, "ok");
            return Box::pin(std::future::ready(()));
        }
        match self.find(path) {
            Some(service) => service.serve(req, w),
            None => {
                http::not_found(w);
                Box::pin(std::future::ready(()))
            }
        }
    }
}

/// Main entry point for HTTP request handling
pub async fn handle_request(
    req: Request<Incoming>,
    state: Arc<AppState>,
    remote_addr: SocketAddr,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let started = Instant::now();
    let entry = state
        .config
        .logging
        .access_log
        .then(|| access_entry(&req, remote_addr));

    let mut buffered = BufferedResponse::new();
    let mut stats = ResponseStats::new(&mut buffered);

    if exceeds_body_limit(&req, state.config.http.max_body_size) {
        http::payload_too_large(&mut stats);
    } else {
        state
            .service
            .serve(req.map(body::from_incoming), &mut stats)
            .await;
    }

    if let Some(mut entry) = entry {
        entry.status = stats.status().unwrap_or(StatusCode::OK).as_u16();
        entry.body_bytes = stats.bytes_written();
        entry.request_time_us =
            u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
        logger::log_access(&entry, &state.config.logging.access_log_format);
    }

    let mut response = buffered.into_response();
    match HeaderValue::from_str(&state.config.http.server_name) {
        Ok(value) => {
            response.headers_mut().insert(SERVER, value);
        }
        Err(_) => logger::log_warning("http.server_name is not a valid header value"),
    }
    Ok(response)
}

fn access_entry(req: &Request<Incoming>, remote_addr: SocketAddr) -> AccessLogEntry {
    let header = |name: HeaderName| {
        req.headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string)
    };
    let mut entry = AccessLogEntry::new(
        remote_addr.to_string(),
        req.method().to_string(),
        req.uri().path().to_string(),
    );
    entry.query = req.uri().query().map(ToString::to_string);
    entry.http_version = version_label(req.version()).to_string();
    entry.referer = header(REFERER);
    entry.user_agent = header(USER_AGENT);
    entry
}

fn version_label(version: Version) -> &'static str {
    match version {
        Version::HTTP_09 => "0.9",
        Version::HTTP_10 => "1.0",
        Version::HTTP_2 => "2.0",
        Version::HTTP_3 => "3.0",
        _ => "1.1",
    }
}

/// Content-Length check against `http.max_body_size`
///
/// Missing or unparsable lengths pass; the form parser deals with the body.
fn exceeds_body_limit<B>(req: &Request<B>, max_body_size: u64) -> bool {
    let Some(content_length) = req.headers().get("content-length") else {
        return false;
    };
    let Ok(size_str) = content_length.to_str() else {
        logger::log_warning("Content-Length header contains non-ASCII characters");
        return false;
    };
    match size_str.parse::<u64>() {
        Ok(size) if size > max_body_size => {
            logger::log_error(&format!(
                "Request body too large: {size} bytes (max: {max_body_size})"
            ));
            true
        }
        Ok(_) => false,
        Err(_) => {
            logger::log_warning(&format!(
                "Invalid Content-Length value: '{size_str}', skipping size check"
            ));
            false
        }
    }
}
