// Error resolution
// Maps a handler failure plus the tracked response state to the single outcome
// the dispatcher writes

use hyper::StatusCode;

use super::error::{ErrorDescriptor, Redirect};
use super::INTERNAL_ERROR_BODY;

/// What the dispatcher writes for a failed handler
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution<'e> {
    /// Discard buffered output and send the caller to `location`
    Redirect {
        status: StatusCode,
        location: &'e str,
    },
    /// Write a plain-text error
    Respond { status: StatusCode, body: &'e str },
    /// The handler already chose a status; write nothing
    AlreadyWritten,
}

/// Resolve a failure against the status the handler has written, if any
///
/// A redirect always wins. Otherwise an error body is only written while the
/// response has not started.
pub fn resolve(err: &ErrorDescriptor, written: Option<StatusCode>) -> Resolution<'_> {
    let ErrorDescriptor {
        source: _,
        user_message: _,
        status,
        redirect,
    } = err;

    if let Some(Redirect { status, location }) = redirect {
        return Resolution::Redirect {
            status: *status,
            location,
        };
    }

    if written.is_some() {
        return Resolution::AlreadyWritten;
    }

    let user_message = err.user_message();
    Resolution::Respond {
        status: default_status(*status, user_message.is_some()),
        body: user_message.unwrap_or(INTERNAL_ERROR_BODY),
    }
}

/// Explicit status, else 400 for failures the caller can act on, else 500
pub const fn default_status(explicit: Option<StatusCode>, has_user_message: bool) -> StatusCode {
    match explicit {
        Some(status) => status,
        None if has_user_message => StatusCode::BAD_REQUEST,
        None => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_internal_error() {
        let err = ErrorDescriptor::internal("db connection refused");
        assert_eq!(
            resolve(&err, None),
            Resolution::Respond {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                body: INTERNAL_ERROR_BODY,
            }
        );
    }

    #[test]
    fn test_user_error_defaults_to_bad_request() {
        let err = ErrorDescriptor::user("missing password");
        assert_eq!(
            resolve(&err, None),
            Resolution::Respond {
                status: StatusCode::BAD_REQUEST,
                body: "missing password",
            }
        );
    }

    #[test]
    fn test_explicit_status_wins() {
        let err = ErrorDescriptor::user("invalid password").with_status(StatusCode::UNAUTHORIZED);
        assert_eq!(
            resolve(&err, None),
            Resolution::Respond {
                status: StatusCode::UNAUTHORIZED,
                body: "invalid password",
            }
        );

        let err = ErrorDescriptor::internal("upstream down").with_status(StatusCode::BAD_GATEWAY);
        assert_eq!(
            resolve(&err, None),
            Resolution::Respond {
                status: StatusCode::BAD_GATEWAY,
                body: INTERNAL_ERROR_BODY,
            }
        );
    }

    #[test]
    fn test_empty_user_message_is_internal() {
        let err = ErrorDescriptor::internal("boom").with_user_message("");
        assert_eq!(
            resolve(&err, None),
            Resolution::Respond {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                body: INTERNAL_ERROR_BODY,
            }
        );
    }

    #[test]
    fn test_already_written() {
        let err = ErrorDescriptor::user("too late");
        assert_eq!(
            resolve(&err, Some(StatusCode::UNPROCESSABLE_ENTITY)),
            Resolution::AlreadyWritten
        );
    }

    #[test]
    fn test_redirect_wins_over_written_status() {
        let err = ErrorDescriptor::user("not logged in").with_redirect(StatusCode::FOUND, "/login");
        assert_eq!(
            resolve(&err, Some(StatusCode::OK)),
            Resolution::Redirect {
                status: StatusCode::FOUND,
                location: "/login",
            }
        );
    }

    fn status_strategy() -> impl Strategy<Value = StatusCode> {
        (100u16..600).prop_map(|code| StatusCode::from_u16(code).unwrap())
    }

    proptest! {
        #[test]
        fn prop_written_status_is_never_overridden(
            message in proptest::option::of(".*"),
            explicit in proptest::option::of(status_strategy()),
            written in status_strategy(),
        ) {
            let mut err = ErrorDescriptor::internal("failure");
            if let Some(message) = message {
                err = err.with_user_message(message);
            }
            if let Some(status) = explicit {
                err = err.with_status(status);
            }
            prop_assert_eq!(resolve(&err, Some(written)), Resolution::AlreadyWritten);
        }

        #[test]
        fn prop_internal_detail_never_reaches_body(
            detail in "[a-z ]{1,40}",
            explicit in proptest::option::of(status_strategy()),
        ) {
            let mut err = ErrorDescriptor::internal(detail);
            if let Some(status) = explicit {
                err = err.with_status(status);
            }
            match resolve(&err, None) {
                Resolution::Respond { status, body } => {
                    prop_assert_eq!(body, INTERNAL_ERROR_BODY);
                    prop_assert_eq!(status, explicit.unwrap_or(StatusCode::INTERNAL_SERVER_ERROR));
                }
                other => prop_assert!(false, "unexpected resolution {:?}", other),
            }
        }

        #[test]
        fn prop_user_message_is_the_body(
            message in "[a-zA-Z0-9 ]{1,40}",
            explicit in proptest::option::of(status_strategy()),
        ) {
            let err = match explicit {
                Some(status) => ErrorDescriptor::user(message.clone()).with_status(status),
                None => ErrorDescriptor::user(message.clone()),
            };
            let expected = explicit.unwrap_or(StatusCode::BAD_REQUEST);
            prop_assert_eq!(
                resolve(&err, None),
                Resolution::Respond { status: expected, body: message.as_str() }
            );
        }

        #[test]
        fn prop_redirect_always_wins(
            location in "/[a-z]{0,12}",
            written in proptest::option::of(status_strategy()),
        ) {
            let err = ErrorDescriptor::redirect(StatusCode::SEE_OTHER, location.clone())
                .with_user_message("ignored")
                .with_status(StatusCode::CONFLICT);
            prop_assert_eq!(
                resolve(&err, written),
                Resolution::Redirect { status: StatusCode::SEE_OTHER, location: location.as_str() }
            );
        }
    }
}
