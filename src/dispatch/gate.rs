// Permission gate
// Guards a service behind a named permission

use hyper::{Request, StatusCode};
use std::sync::Arc;

use super::{BoxFuture, Service, FORBIDDEN_BODY};
use crate::config::DispatchConfig;
use crate::http::{self, RequestBody, ResponseWriter};
use crate::permission::PermissionSource;

/// Service that only runs `inner` when the request carries `permission`
pub struct RequirePermission<S> {
    source: Arc<dyn PermissionSource>,
    permission: String,
    inner: S,
}

impl<S: Service> Service for RequirePermission<S> {
    fn serve<'a>(
        &'a self,
        req: Request<RequestBody>,
        w: &'a mut dyn ResponseWriter,
    ) -> BoxFuture<'a, ()> {
        if !self.source.has_permission(req.headers(), &self.permission) {
            http::error(w, FORBIDDEN_BODY, StatusCode::FORBIDDEN);
            return Box::pin(std::future::ready(()));
        }
        self.inner.serve(req, w)
    }
}

/// Builds permission-guarded services from one source
#[derive(Clone)]
pub struct PermissionGate {
    source: Arc<dyn PermissionSource>,
    enforce: bool,
}

impl PermissionGate {
    pub fn new(source: Arc<dyn PermissionSource>, config: &DispatchConfig) -> Self {
        Self {
            source,
            enforce: config.permissions,
        }
    }

    pub const fn is_enforced(&self) -> bool {
        self.enforce
    }

    /// Guard `inner` behind `permission`
    ///
    /// With enforcement off `inner` is returned as-is.
    pub fn require<S: Service + 'static>(
        &self,
        permission: impl Into<String>,
        inner: S,
    ) -> Box<dyn Service> {
        if !self.enforce {
            return Box::new(inner);
        }
        Box::new(RequirePermission {
            source: Arc::clone(&self.source),
            permission: permission.into(),
            inner,
        })
    }
}
