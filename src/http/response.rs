//! HTTP response writing module
//!
//! Helpers that write complete responses (plain-text errors, redirects) to a
//! `ResponseWriter`.

use hyper::header::{HeaderValue, CONTENT_LENGTH, CONTENT_TYPE, LOCATION, X_CONTENT_TYPE_OPTIONS};
use hyper::{Method, StatusCode};

use super::writer::ResponseWriter;
use crate::logger;

const TEXT_PLAIN: &str = "text/plain; charset=utf-8";
const TEXT_HTML: &str = "text/html; charset=utf-8";

/// Write a plain-text response with the given status
pub fn text(w: &mut dyn ResponseWriter, status: StatusCode, body: &str) {
    w.headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(TEXT_PLAIN));
    w.write_header(status);
    write_body(w, body.as_bytes());
}

/// Write a plain-text error response
///
/// Any `Content-Length` set by the handler is dropped since the body is replaced.
pub fn error(w: &mut dyn ResponseWriter, message: &str, status: StatusCode) {
    let headers = w.headers_mut();
    headers.remove(CONTENT_LENGTH);
    headers.insert(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    text(w, status, message);
}

/// Write 404 Not Found response
pub fn not_found(w: &mut dyn ResponseWriter) {
    error(w, "404 Not Found", StatusCode::NOT_FOUND);
}

/// Write 413 Payload Too Large response
pub fn payload_too_large(w: &mut dyn ResponseWriter) {
    error(w, "413 Payload Too Large", StatusCode::PAYLOAD_TOO_LARGE);
}

/// Write a redirect to `location`
///
/// Relative locations are resolved against the directory of `request_path`.
/// `GET` requests also receive a short HTML body linking to the target.
pub fn redirect(
    w: &mut dyn ResponseWriter,
    method: &Method,
    request_path: &str,
    location: &str,
    status: StatusCode,
) {
    let target = resolve_location(request_path, location);
    match HeaderValue::from_str(&target) {
        Ok(value) => {
            w.headers_mut().insert(LOCATION, value);
        }
        Err(e) => {
            logger::log_error(&format!("Invalid redirect location '{target}': {e}"));
            error(w, "internal server error; check logs", StatusCode::INTERNAL_SERVER_ERROR);
            return;
        }
    }

    let has_body = *method == Method::GET || *method == Method::HEAD;
    if has_body {
        w.headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static(TEXT_HTML));
    }
    w.write_header(status);

    if *method == Method::GET {
        let body = format!(
            "<a href=\"{}\">{}</a>.\n",
            html_escape(&target),
            status.canonical_reason().unwrap_or("Redirect")
        );
        write_body(w, body.as_bytes());
    }
}

/// Resolve a redirect target the way browsers resolve a relative reference
///
/// Absolute URLs, scheme-relative URLs and absolute paths are kept as-is apart
/// from dot-segment cleanup on paths.
pub fn resolve_location(request_path: &str, location: &str) -> String {
    if location.contains("://") || location.starts_with("//") {
        return location.to_string();
    }

    let (path, suffix) = match location.find(['?', '#']) {
        Some(i) => location.split_at(i),
        None => (location, ""),
    };

    let joined = if path.starts_with('/') {
        path.to_string()
    } else if path.is_empty() {
        request_path.to_string()
    } else {
        let dir = request_path
            .rfind('/')
            .map_or("/", |i| &request_path[..=i]);
        format!("{dir}{path}")
    };

    let trailing_slash = joined.ends_with('/') || joined.ends_with("/.") || joined.ends_with("/..");
    let mut cleaned = clean_path(&joined);
    if trailing_slash && !cleaned.ends_with('/') {
        cleaned.push('/');
    }
    cleaned.push_str(suffix);
    cleaned
}

/// Remove `.` and `..` segments and duplicate slashes from an absolute path
fn clean_path(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }
    format!("/{}", segments.join("/"))
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&#34;")
        .replace('\'', "&#39;")
}

fn write_body(w: &mut dyn ResponseWriter, body: &[u8]) {
    if let Err(e) = w.write(body) {
        logger::log_warning(&format!("Failed to write response body: {e}"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::BufferedResponse;

    #[test]
    fn test_error_response() {
        let mut w = BufferedResponse::new();
        w.headers_mut()
            .insert(CONTENT_LENGTH, HeaderValue::from_static("999"));
        error(&mut w, "Forbidden", StatusCode::FORBIDDEN);

        assert_eq!(w.status(), Some(StatusCode::FORBIDDEN));
        assert_eq!(w.body(), b"Forbidden");
        assert_eq!(w.headers()[CONTENT_TYPE], TEXT_PLAIN);
        assert_eq!(w.headers()[X_CONTENT_TYPE_OPTIONS], "nosniff");
        assert!(w.headers().get(CONTENT_LENGTH).is_none());
    }

    #[test]
    fn test_redirect_get_has_body() {
        let mut w = BufferedResponse::new();
        redirect(&mut w, &Method::GET, "/vault", "/login", StatusCode::FOUND);

        assert_eq!(w.status(), Some(StatusCode::FOUND));
        assert_eq!(w.headers()[LOCATION], "/login");
        assert_eq!(w.headers()[CONTENT_TYPE], TEXT_HTML);
        assert_eq!(w.body(), b"<a href=\"/login\">Found</a>.\n");
    }

    #[test]
    fn test_redirect_post_has_no_body() {
        let mut w = BufferedResponse::new();
        redirect(&mut w, &Method::POST, "/new", "/item/1", StatusCode::SEE_OTHER);

        assert_eq!(w.status(), Some(StatusCode::SEE_OTHER));
        assert_eq!(w.headers()[LOCATION], "/item/1");
        assert!(w.headers().get(CONTENT_TYPE).is_none());
        assert!(w.body().is_empty());
    }

    #[test]
    fn test_redirect_head_sets_type_without_body() {
        let mut w = BufferedResponse::new();
        redirect(&mut w, &Method::HEAD, "/", "/login", StatusCode::FOUND);
        assert_eq!(w.headers()[CONTENT_TYPE], TEXT_HTML);
        assert!(w.body().is_empty());
    }

    #[test]
    fn test_resolve_location() {
        assert_eq!(resolve_location("/a/b", "/login"), "/login");
        assert_eq!(resolve_location("/a/b", "c"), "/a/c");
        assert_eq!(resolve_location("/a/b/", "c"), "/a/b/c");
        assert_eq!(resolve_location("/a/b", "../c?x=1"), "/c?x=1");
        assert_eq!(resolve_location("/a/b", "./"), "/a/");
        assert_eq!(resolve_location("/a", "//cdn.example.com/x"), "//cdn.example.com/x");
        assert_eq!(
            resolve_location("/a", "https://example.com/a/../b"),
            "https://example.com/a/../b"
        );
    }

    #[test]
    fn test_html_escape() {
        assert_eq!(html_escape("/q?a=1&b=\"2\""), "/q?a=1&amp;b=&#34;2&#34;");
    }
}
