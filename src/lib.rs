//! appgate: request dispatch and error classification for a small web server
//!
//! Business handlers receive a parsed form and a response writer and return a
//! `HandlerResult`. Everything around that call lives here: scoped form parsing
//! with guaranteed temp-file cleanup, response tracking, permission gating and
//! the mapping of handler failures to redirects, user errors or generic 500s.

pub mod config;
pub mod dispatch;
pub mod form;
pub mod handler;
pub mod http;
pub mod logger;
pub mod permission;
pub mod server;

pub use dispatch::{
    AppHandler, BoxFuture, ErrorDescriptor, Handler, HandlerResult, PermissionGate, ResultExt,
    Service,
};
pub use form::{Form, FormCleanup, FormError, FormOptions, FormRequest};
pub use http::{BufferedResponse, ResponseStats, ResponseWriter};
pub use permission::{PermissionSource, SandstormPermissions};
