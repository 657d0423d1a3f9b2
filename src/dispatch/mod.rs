//! Request dispatch
//!
//! Wraps business handlers so they only deal with parsed forms and return a
//! `HandlerResult`. The dispatcher owns everything around that call:
//! - form parsing and cleanup of temporary files
//! - tracking what the handler wrote
//! - logging and classifying failures into redirects, user errors or 500s
//! - permission gating in front of a service

mod app;
mod error;
mod gate;
mod resolve;

pub use app::AppHandler;
pub use error::{ErrorDescriptor, HandlerResult, Redirect, ResultExt};
pub use gate::{PermissionGate, RequirePermission};
pub use resolve::{default_status, resolve, Resolution};

use hyper::Request;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::form::FormRequest;
use crate::http::{RequestBody, ResponseWriter};

/// Body sent when a permission check fails
pub const FORBIDDEN_BODY: &str = "Forbidden";
/// Body sent when the request form cannot be parsed
pub const FORM_PARSE_FAILED_BODY: &str = "could not parse form";
/// Body sent for failures without a user-safe message
pub const INTERNAL_ERROR_BODY: &str = "internal server error; check logs";

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Something that answers a raw request by writing to a response writer
pub trait Service: Send + Sync {
    fn serve<'a>(
        &'a self,
        req: Request<RequestBody>,
        w: &'a mut dyn ResponseWriter,
    ) -> BoxFuture<'a, ()>;
}

impl<S: Service + ?Sized> Service for Box<S> {
    fn serve<'a>(
        &'a self,
        req: Request<RequestBody>,
        w: &'a mut dyn ResponseWriter,
    ) -> BoxFuture<'a, ()> {
        (**self).serve(req, w)
    }
}

impl<S: Service + ?Sized> Service for Arc<S> {
    fn serve<'a>(
        &'a self,
        req: Request<RequestBody>,
        w: &'a mut dyn ResponseWriter,
    ) -> BoxFuture<'a, ()> {
        (**self).serve(req, w)
    }
}

/// Business logic run on a parsed request
///
/// Plain functions with the matching signature are handlers:
///
/// ```ignore
/// fn hello<'a>(w: &'a mut dyn ResponseWriter, req: &'a FormRequest) -> BoxFuture<'a, HandlerResult> {
///     Box::pin(async move { ... })
/// }
/// ```
pub trait Handler: Send + Sync {
    fn handle<'a>(
        &'a self,
        w: &'a mut dyn ResponseWriter,
        req: &'a FormRequest,
    ) -> BoxFuture<'a, HandlerResult>;
}

impl<F> Handler for F
where
    F: for<'a> Fn(&'a mut dyn ResponseWriter, &'a FormRequest) -> BoxFuture<'a, HandlerResult>
        + Send
        + Sync,
{
    fn handle<'a>(
        &'a self,
        w: &'a mut dyn ResponseWriter,
        req: &'a FormRequest,
    ) -> BoxFuture<'a, HandlerResult> {
        self(w, req)
    }
}
