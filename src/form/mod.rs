//! Request form parsing
//!
//! Turns an inbound request into a `FormRequest` plus a `FormCleanup` guard:
//! - `multipart/form-data` bodies are parsed into values and files, large files
//!   spilling to temporary storage released by the guard
//! - `application/x-www-form-urlencoded` bodies (up to a size cap) and the query
//!   string are decoded into values
//! - any other body is left unread for the handler to take
//!
//! Only multipart bodies can make parsing fail.

mod cleanup;
mod error;
mod multipart;
mod urlencoded;

pub use cleanup::FormCleanup;
pub use error::FormError;
pub use multipart::{FileData, FormFile};

use http_body_util::{BodyExt, Limited};
use hyper::header::CONTENT_TYPE;
use hyper::http::request::Parts;
use hyper::{HeaderMap, Method, Request, Uri};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use crate::config::DispatchConfig;
use crate::http::RequestBody;
use crate::logger;

/// Largest urlencoded body decoded into form values
pub const MAX_URLENCODED_BODY: usize = 10 << 20;

/// Limits applied while parsing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormOptions {
    /// Bytes of file data kept in memory before spilling to disk
    pub max_memory: u64,
    /// Directory for spilled files, system temp dir when `None`
    pub temp_dir: Option<PathBuf>,
    /// Urlencoded bodies above this size are not decoded
    pub max_urlencoded_bytes: usize,
}

impl From<&DispatchConfig> for FormOptions {
    fn from(config: &DispatchConfig) -> Self {
        Self {
            max_memory: config.max_form_memory,
            temp_dir: config.temp_dir.clone(),
            max_urlencoded_bytes: MAX_URLENCODED_BODY,
        }
    }
}

impl Default for FormOptions {
    fn default() -> Self {
        Self::from(&DispatchConfig::default())
    }
}

/// Decoded form values and uploaded files, in arrival order per name
#[derive(Debug, Default, Clone)]
pub struct Form {
    values: HashMap<String, Vec<String>>,
    files: HashMap<String, Vec<FormFile>>,
}

impl Form {
    /// First value for `name`
    pub fn value(&self, name: &str) -> Option<&str> {
        self.values.get(name)?.first().map(String::as_str)
    }

    pub fn values(&self, name: &str) -> &[String] {
        self.values.get(name).map_or(&[], Vec::as_slice)
    }

    /// First file uploaded under `name`
    pub fn file(&self, name: &str) -> Option<&FormFile> {
        self.files.get(name)?.first()
    }

    pub fn files(&self, name: &str) -> &[FormFile] {
        self.files.get(name).map_or(&[], Vec::as_slice)
    }

    pub const fn value_map(&self) -> &HashMap<String, Vec<String>> {
        &self.values
    }

    pub const fn file_map(&self) -> &HashMap<String, Vec<FormFile>> {
        &self.files
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty() && self.files.is_empty()
    }

    fn push_value(&mut self, name: String, value: String) {
        self.values.entry(name).or_default().push(value);
    }

    fn push_file(&mut self, name: String, file: FormFile) {
        self.files.entry(name).or_default().push(file);
    }
}

/// A request after form parsing
///
/// Multipart and urlencoded bodies are consumed by parsing. Any other body is
/// kept unread and can be taken once with [`FormRequest::take_body`].
#[derive(Debug)]
pub struct FormRequest {
    head: Parts,
    form: Form,
    body: Mutex<Option<RequestBody>>,
    multipart: bool,
}

impl FormRequest {
    pub const fn method(&self) -> &Method {
        &self.head.method
    }

    pub const fn uri(&self) -> &Uri {
        &self.head.uri
    }

    pub fn path(&self) -> &str {
        self.head.uri.path()
    }

    pub const fn headers(&self) -> &HeaderMap {
        &self.head.headers
    }

    pub const fn head(&self) -> &Parts {
        &self.head
    }

    /// Query, urlencoded and multipart values plus uploaded files
    pub const fn form(&self) -> &Form {
        &self.form
    }

    /// Unread body of a request that carried no form; `None` once taken
    pub fn take_body(&self) -> Option<RequestBody> {
        self.body.lock().ok()?.take()
    }

    pub const fn is_multipart(&self) -> bool {
        self.multipart
    }
}

/// Parse the request's form data
///
/// Only multipart bodies can fail. An unreadable or oversized urlencoded body is
/// logged and leaves the form without body values. On error every temporary
/// file created so far has already been removed.
pub async fn parse(
    req: Request<RequestBody>,
    options: &FormOptions,
) -> Result<(FormRequest, FormCleanup), FormError> {
    let (head, body) = req.into_parts();
    let mut form = Form::default();
    let mut cleanup = FormCleanup::noop();
    let mut unread = None;

    let mime = media_type(&head.headers);
    let is_multipart = mime.as_deref() == Some("multipart/form-data");
    if is_multipart {
        let content_type = head
            .headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        let boundary = multer::parse_boundary(content_type).map_err(FormError::ContentType)?;
        multipart::read_form(body, boundary, options, &mut form, &mut cleanup).await?;
    } else if mime.as_deref() == Some("application/x-www-form-urlencoded") {
        match Limited::new(body, options.max_urlencoded_bytes).boxed().collect().await {
            Ok(collected) => {
                let raw = collected.to_bytes();
                urlencoded::parse_into(&String::from_utf8_lossy(&raw), &mut form);
            }
            Err(e) => logger::log_warning(&format!(
                "{} {} form body ignored: {e}",
                head.method,
                head.uri.path()
            )),
        }
    } else {
        unread = Some(body);
    }

    // Body values come before query values
    if let Some(query) = head.uri.query() {
        urlencoded::parse_into(query, &mut form);
    }

    let request = FormRequest {
        head,
        form,
        body: Mutex::new(unread),
        multipart: is_multipart,
    };
    Ok((request, cleanup))
}

/// Lowercased `type/subtype` of the Content-Type header
fn media_type(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(CONTENT_TYPE)?.to_str().ok()?;
    let essence = value.split(';').next()?.trim();
    Some(essence.to_ascii_lowercase())
}
