//! Access log format module
//!
//! Supported formats:
//! - `combined` (Apache/Nginx combined format)
//! - `common` (Common Log Format - CLF)
//! - `json` (one JSON object per line)

use chrono::{DateTime, Local};
use serde::Serialize;
use std::fmt::Write;

const CLF_TIME: &str = "%d/%b/%Y:%H:%M:%S %z";

/// One dispatched request, as seen by the access log
#[derive(Debug, Clone, Serialize)]
pub struct AccessLogEntry {
    pub remote_addr: String,
    pub time: DateTime<Local>,
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub http_version: String,
    /// Status observed by the response tracker
    pub status: u16,
    /// Body bytes observed by the response tracker
    pub body_bytes: u64,
    pub referer: Option<String>,
    pub user_agent: Option<String>,
    pub request_time_us: u64,
}

impl AccessLogEntry {
    /// Create a new access log entry stamped with the current time
    pub fn new(remote_addr: String, method: String, path: String) -> Self {
        Self {
            remote_addr,
            time: Local::now(),
            method,
            path,
            query: None,
            http_version: "1.1".to_string(),
            status: 200,
            body_bytes: 0,
            referer: None,
            user_agent: None,
            request_time_us: 0,
        }
    }

    /// Render the entry; unknown format names fall back to `combined`
    pub fn format(&self, format: &str) -> String {
        match format {
            "common" => self.common_line(),
            "json" => serde_json::to_string(self).unwrap_or_else(|_| self.common_line()),
            _ => {
                let mut line = self.common_line();
                let _ = write!(
                    line,
                    " \"{}\" \"{}\"",
                    self.referer.as_deref().unwrap_or("-"),
                    self.user_agent.as_deref().unwrap_or("-"),
                );
                line
            }
        }
    }

    /// `$remote_addr - - [$time_local] "$request" $status $body_bytes_sent`
    fn common_line(&self) -> String {
        let query = self
            .query
            .as_ref()
            .map(|q| format!("?{q}"))
            .unwrap_or_default();
        format!(
            "{} - - [{}] \"{} {}{} HTTP/{}\" {} {}",
            self.remote_addr,
            self.time.format(CLF_TIME),
            self.method,
            self.path,
            query,
            self.http_version,
            self.status,
            self.body_bytes,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_entry() -> AccessLogEntry {
        let mut entry = AccessLogEntry::new(
            "192.168.1.1".to_string(),
            "POST".to_string(),
            "/upload".to_string(),
        );
        entry.query = Some("draft=1".to_string());
        entry.status = 400;
        entry.body_bytes = 20;
        entry.referer = Some("https://example.com".to_string());
        entry.user_agent = Some("Mozilla/5.0".to_string());
        entry.request_time_us = 1500;
        entry
    }

    #[test]
    fn test_format_combined() {
        let log = create_test_entry().format("combined");
        assert!(log.starts_with("192.168.1.1 - - ["));
        assert!(log.contains("\"POST /upload?draft=1 HTTP/1.1\" 400 20"));
        assert!(log.ends_with("\"https://example.com\" \"Mozilla/5.0\""));
    }

    #[test]
    fn test_format_common() {
        let log = create_test_entry().format("common");
        assert!(log.contains("\"POST /upload?draft=1 HTTP/1.1\" 400 20"));
        assert!(!log.contains("Mozilla"));
    }

    #[test]
    fn test_format_json() {
        let log = create_test_entry().format("json");
        let value: serde_json::Value = serde_json::from_str(&log).unwrap();
        assert_eq!(value["method"], "POST");
        assert_eq!(value["status"], 400);
        assert_eq!(value["body_bytes"], 20);
        assert_eq!(value["referer"], "https://example.com");
    }

    #[test]
    fn test_format_unknown_falls_back_to_combined() {
        let entry = create_test_entry();
        assert_eq!(entry.format("$status"), entry.format("combined"));
    }

    #[test]
    fn test_missing_headers_render_dash() {
        let mut entry = create_test_entry();
        entry.referer = None;
        entry.user_agent = None;
        assert!(entry.format("combined").ends_with("\"-\" \"-\""));
    }
}
