//! Permission sources
//!
//! A permission source answers "does this request carry permission P?" from the
//! request headers alone. The check is synchronous so a gate can decide before the
//! wrapped service does any work.

use hyper::HeaderMap;

/// Header carrying the caller's permissions as a comma-separated list
pub const SANDSTORM_PERMISSIONS_HEADER: &str = "x-sandstorm-permissions";

pub trait PermissionSource: Send + Sync {
    fn has_permission(&self, headers: &HeaderMap, permission: &str) -> bool;
}

impl<F> PermissionSource for F
where
    F: Fn(&HeaderMap, &str) -> bool + Send + Sync,
{
    fn has_permission(&self, headers: &HeaderMap, permission: &str) -> bool {
        self(headers, permission)
    }
}

/// Permissions granted by a front proxy through `X-Sandstorm-Permissions`
#[derive(Debug, Clone, Copy, Default)]
pub struct SandstormPermissions;

impl PermissionSource for SandstormPermissions {
    fn has_permission(&self, headers: &HeaderMap, permission: &str) -> bool {
        headers
            .get_all(SANDSTORM_PERMISSIONS_HEADER)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|v| v.split(','))
            .any(|p| p.trim() == permission)
    }
}
