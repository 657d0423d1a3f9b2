// Handler error descriptor
// Carries what the dispatcher needs to log a failure and answer the caller

use hyper::StatusCode;
use std::fmt;

use crate::http::BoxError;

/// Outcome of a business handler
pub type HandlerResult = Result<(), ErrorDescriptor>;

/// Navigational outcome of a failed handler
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    pub status: StatusCode,
    pub location: String,
}

/// Structured handler failure
///
/// The wrapped error is only ever logged. What the caller sees comes from the
/// user message, status and redirect, resolved by [`super::resolve`].
#[derive(Debug)]
pub struct ErrorDescriptor {
    pub(super) source: BoxError,
    pub(super) user_message: Option<String>,
    pub(super) status: Option<StatusCode>,
    pub(super) redirect: Option<Redirect>,
}

impl ErrorDescriptor {
    /// Internal failure: logged in full, answered with a generic 500
    pub fn internal(err: impl Into<BoxError>) -> Self {
        Self {
            source: err.into(),
            user_message: None,
            status: None,
            redirect: None,
        }
    }

    /// Failure whose message is safe to show the caller; also used as log message
    pub fn user(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            source: message.clone().into(),
            user_message: Some(message),
            status: None,
            redirect: None,
        }
    }

    /// Send the caller elsewhere instead of reporting an error body
    pub fn redirect(status: StatusCode, location: impl Into<String>) -> Self {
        let location = location.into();
        Self {
            source: format!("redirect to {location}").into(),
            user_message: None,
            status: None,
            redirect: Some(Redirect { status, location }),
        }
    }

    #[must_use]
    pub fn with_user_message(mut self, message: impl Into<String>) -> Self {
        self.user_message = Some(message.into());
        self
    }

    #[must_use]
    pub const fn with_status(mut self, status: StatusCode) -> Self {
        self.status = Some(status);
        self
    }

    #[must_use]
    pub fn with_redirect(mut self, status: StatusCode, location: impl Into<String>) -> Self {
        self.redirect = Some(Redirect {
            status,
            location: location.into(),
        });
        self
    }

    /// Server-side description of the failure
    pub fn log_message(&self) -> String {
        self.source.to_string()
    }

    /// Message for the caller; empty messages count as absent
    pub fn user_message(&self) -> Option<&str> {
        self.user_message.as_deref().filter(|m| !m.is_empty())
    }

    /// Explicit status, if the handler attached one
    pub const fn status(&self) -> Option<StatusCode> {
        self.status
    }

    pub const fn redirect_target(&self) -> Option<&Redirect> {
        self.redirect.as_ref()
    }

    /// Failures carrying a user message are the caller's fault
    pub fn is_client_error(&self) -> bool {
        self.user_message().is_some()
    }

    pub fn source(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
        self.source.as_ref()
    }
}

impl fmt::Display for ErrorDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.source)
    }
}

impl<E> From<E> for ErrorDescriptor
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn from(err: E) -> Self {
        Self::internal(err)
    }
}

/// Attach caller-facing details to a failing result
pub trait ResultExt<T> {
    /// Keep the error for the log, show `message` to the caller
    fn user_error(self, message: impl Into<String>) -> Result<T, ErrorDescriptor>;

    fn with_status(self, status: StatusCode) -> Result<T, ErrorDescriptor>;
}

impl<T, E> ResultExt<T> for Result<T, E>
where
    E: Into<ErrorDescriptor>,
{
    fn user_error(self, message: impl Into<String>) -> Result<T, ErrorDescriptor> {
        self.map_err(|e| e.into().with_user_message(message))
    }

    fn with_status(self, status: StatusCode) -> Result<T, ErrorDescriptor> {
        self.map_err(|e| e.into().with_status(status))
    }
}
