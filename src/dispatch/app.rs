// Application handler adapter
// Parses the form, runs the handler against a tracked writer and turns its
// failure into a response

use hyper::{Method, Request, StatusCode};

use super::resolve::{resolve, Resolution};
use super::{BoxFuture, Handler, Service, FORM_PARSE_FAILED_BODY};
use crate::config::DispatchConfig;
use crate::form::{self, FormOptions};
use crate::http::{self, RequestBody, ResponseStats, ResponseWriter};
use crate::logger;

/// Adapts a `Handler` to a `Service`
#[derive(Debug)]
pub struct AppHandler<H> {
    handler: H,
    form: FormOptions,
}

impl<H: Handler> AppHandler<H> {
    pub fn new(handler: H, config: &DispatchConfig) -> Self {
        Self {
            handler,
            form: FormOptions::from(config),
        }
    }

    /// Run one request through the handler
    ///
    /// Temporary form files are released on every exit, including a panic in
    /// the handler or the returned future being dropped mid-flight.
    pub async fn dispatch(&self, req: Request<RequestBody>, w: &mut dyn ResponseWriter) {
        let method = req.method().clone();
        let path = req.uri().path().to_string();

        let (request, cleanup) = match form::parse(req, &self.form).await {
            Ok(parsed) => parsed,
            Err(e) => {
                logger::log_form_parse_failed(&method, &path, &e);
                http::error(w, FORM_PARSE_FAILED_BODY, StatusCode::BAD_REQUEST);
                return;
            }
        };

        let mut stats = ResponseStats::new(&mut *w);
        let result = self.handler.handle(&mut stats, &request).await;

        if let Err(err) = result {
            if err.is_client_error() {
                logger::log_client_error(&method, &path, &err);
            } else {
                logger::log_server_error(&method, &path, &err);
            }
            let resolution = resolve(&err, stats.status());
            finish_error(&mut stats, &method, &path, resolution);
        }

        drop(cleanup);
    }
}

fn finish_error<W: ResponseWriter>(
    w: &mut ResponseStats<W>,
    method: &Method,
    path: &str,
    resolution: Resolution<'_>,
) {
    match resolution {
        Resolution::Redirect { status, location } => {
            if w.status().is_some() && !w.reset() {
                logger::log_warning(&format!(
                    "{method} {path} redirect to {location} after response started"
                ));
            }
            http::redirect(w, method, path, location, status);
        }
        Resolution::Respond { status, body } => http::error(w, body, status),
        Resolution::AlreadyWritten => {}
    }
}

impl<H: Handler> Service for AppHandler<H> {
    fn serve<'a>(
        &'a self,
        req: Request<RequestBody>,
        w: &'a mut dyn ResponseWriter,
    ) -> BoxFuture<'a, ()> {
        Box::pin(self.dispatch(req, w))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::{ErrorDescriptor, HandlerResult, ResultExt, INTERNAL_ERROR_BODY};
    use crate::form::tests::{failing_body, multipart_body, multipart_request};
    use crate::form::FormRequest;
    use crate::http::{body, BufferedResponse};
    use hyper::header::{CONTENT_TYPE, LOCATION};
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    fn get(uri: &str) -> Request<RequestBody> {
        Request::builder().uri(uri).body(body::empty()).unwrap()
    }

    fn ok<'a>(w: &'a mut dyn ResponseWriter, _req: &'a FormRequest) -> BoxFuture<'a, HandlerResult> {
        Box::pin(async move {
            http::text(w, StatusCode::OK, "fine");
            Ok(())
        })
    }

    fn missing_password<'a>(
        _w: &'a mut dyn ResponseWriter,
        req: &'a FormRequest,
    ) -> BoxFuture<'a, HandlerResult> {
        Box::pin(async move {
            req.form()
                .value("password")
                .ok_or_else(|| ErrorDescriptor::user("missing password"))?;
            Ok(())
        })
    }

    fn broken_db<'a>(
        _w: &'a mut dyn ResponseWriter,
        _req: &'a FormRequest,
    ) -> BoxFuture<'a, HandlerResult> {
        Box::pin(async move {
            Err::<(), _>(std::io::Error::other("connection refused to 10.0.0.5"))
                .user_error("")
                .with_status(StatusCode::SERVICE_UNAVAILABLE)
        })
    }

    fn internal_only<'a>(
        _w: &'a mut dyn ResponseWriter,
        _req: &'a FormRequest,
    ) -> BoxFuture<'a, HandlerResult> {
        Box::pin(async move { Err(ErrorDescriptor::internal("secret table missing")) })
    }

    fn writes_then_fails<'a>(
        w: &'a mut dyn ResponseWriter,
        _req: &'a FormRequest,
    ) -> BoxFuture<'a, HandlerResult> {
        Box::pin(async move {
            w.write_header(StatusCode::UNPROCESSABLE_ENTITY);
            w.write(b"field x is invalid")?;
            Err(ErrorDescriptor::user("should not be written"))
        })
    }

    fn redirect_after_output<'a>(
        w: &'a mut dyn ResponseWriter,
        _req: &'a FormRequest,
    ) -> BoxFuture<'a, HandlerResult> {
        Box::pin(async move {
            w.write(b"partial page")?;
            Err(ErrorDescriptor::redirect(StatusCode::FOUND, "login"))
        })
    }

    async fn run<H: Handler>(handler: H, req: Request<RequestBody>) -> BufferedResponse {
        let app = AppHandler::new(handler, &DispatchConfig::default());
        let mut w = BufferedResponse::new();
        app.dispatch(req, &mut w).await;
        w
    }

    #[tokio::test]
    async fn test_success_passes_through() {
        let w = run(ok, get("/")).await;
        assert_eq!(w.status(), Some(StatusCode::OK));
        assert_eq!(w.body(), b"fine");
    }

    #[tokio::test]
    async fn test_user_error_defaults_to_bad_request() {
        let w = run(missing_password, get("/login")).await;
        assert_eq!(w.status(), Some(StatusCode::BAD_REQUEST));
        assert_eq!(w.body(), b"missing password");
        assert_eq!(w.headers()[CONTENT_TYPE], "text/plain; charset=utf-8");
    }

    #[tokio::test]
    async fn test_internal_error_hides_detail() {
        let w = run(internal_only, get("/")).await;
        assert_eq!(w.status(), Some(StatusCode::INTERNAL_SERVER_ERROR));
        assert_eq!(w.body(), INTERNAL_ERROR_BODY.as_bytes());
    }

    #[tokio::test]
    async fn test_empty_user_message_with_explicit_status() {
        let w = run(broken_db, get("/")).await;
        assert_eq!(w.status(), Some(StatusCode::SERVICE_UNAVAILABLE));
        assert_eq!(w.body(), INTERNAL_ERROR_BODY.as_bytes());
    }

    #[tokio::test]
    async fn test_written_status_is_kept() {
        let w = run(writes_then_fails, get("/")).await;
        assert_eq!(w.status(), Some(StatusCode::UNPROCESSABLE_ENTITY));
        assert_eq!(w.body(), b"field x is invalid");
    }

    #[tokio::test]
    async fn test_redirect_replaces_partial_output() {
        let w = run(redirect_after_output, get("/account/settings")).await;
        assert_eq!(w.status(), Some(StatusCode::FOUND));
        assert_eq!(w.headers()[LOCATION], "/account/login");
        assert_eq!(w.body(), b"<a href=\"/account/login\">Found</a>.\n");
    }

    struct CountingHandler(AtomicUsize);

    impl Handler for CountingHandler {
        fn handle<'a>(
            &'a self,
            _w: &'a mut dyn ResponseWriter,
            _req: &'a FormRequest,
        ) -> BoxFuture<'a, HandlerResult> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Box::pin(async { Ok(()) })
        }
    }

    #[tokio::test]
    async fn test_bad_form_skips_handler() {
        let counter = CountingHandler(AtomicUsize::new(0));
        let app = AppHandler::new(counter, &DispatchConfig::default());
        let mut w = BufferedResponse::new();
        app.dispatch(multipart_request("/upload", b"garbage".to_vec()), &mut w)
            .await;

        assert_eq!(app.handler.0.load(Ordering::SeqCst), 0);
        assert_eq!(w.status(), Some(StatusCode::BAD_REQUEST));
        assert_eq!(w.body(), FORM_PARSE_FAILED_BODY.as_bytes());
    }

    #[tokio::test]
    async fn test_unreadable_body_still_reaches_handler() {
        let req = Request::builder()
            .method(Method::POST)
            .uri("/login")
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(failing_body())
            .unwrap();
        let w = run(missing_password, req).await;
        assert_eq!(w.status(), Some(StatusCode::BAD_REQUEST));
        assert_eq!(w.body(), b"missing password");
    }

    #[derive(Clone, Copy)]
    enum Outcome {
        Succeed,
        UserError,
        Fail,
        Redirect,
        Panic,
        Hang,
    }

    /// Records the spilled upload path, then ends the way `outcome` says
    struct UploadHandler {
        seen: Seen,
        outcome: Outcome,
    }

    impl Handler for UploadHandler {
        fn handle<'a>(
            &'a self,
            _w: &'a mut dyn ResponseWriter,
            req: &'a FormRequest,
        ) -> BoxFuture<'a, HandlerResult> {
            Box::pin(async move {
                let path = req.form().file("doc").and_then(|f| f.path()).map(PathBuf::from);
                assert!(path.as_ref().is_some_and(|p| p.exists()));
                *self.seen.lock().unwrap() = path;

                match self.outcome {
                    Outcome::Succeed => Ok(()),
                    Outcome::UserError => Err(ErrorDescriptor::user("upload rejected")),
                    Outcome::Fail => Err(ErrorDescriptor::internal("storage full")),
                    Outcome::Redirect => {
                        Err(ErrorDescriptor::redirect(StatusCode::SEE_OTHER, "/done"))
                    }
                    Outcome::Panic => panic!("handler bug"),
                    Outcome::Hang => std::future::pending().await,
                }
            })
        }
    }

    type Seen = Arc<Mutex<Option<PathBuf>>>;

    fn upload_app(outcome: Outcome, temp_dir: PathBuf) -> (AppHandler<UploadHandler>, Seen) {
        let seen = Arc::new(Mutex::new(None));
        let config = DispatchConfig {
            permissions: true,
            max_form_memory: 16,
            temp_dir: Some(temp_dir),
        };
        let handler = UploadHandler {
            seen: Arc::clone(&seen),
            outcome,
        };
        (AppHandler::new(handler, &config), seen)
    }

    fn upload_request() -> Request<RequestBody> {
        let content = vec![b'z'; 1024];
        let body = multipart_body(&[("doc", Some("doc.bin"), content.as_slice())]);
        multipart_request("/upload", body)
    }

    fn assert_cleaned(seen: &Mutex<Option<PathBuf>>) {
        let path = seen.lock().unwrap().clone().expect("handler saw a spilled file");
        assert!(!path.exists(), "{} was not removed", path.display());
    }

    #[tokio::test]
    async fn test_cleanup_after_each_outcome() {
        let cases = [
            (Outcome::Succeed, None),
            (Outcome::UserError, Some(StatusCode::BAD_REQUEST)),
            (Outcome::Fail, Some(StatusCode::INTERNAL_SERVER_ERROR)),
            (Outcome::Redirect, Some(StatusCode::SEE_OTHER)),
        ];
        for (outcome, status) in cases {
            let dir = tempfile::tempdir().unwrap();
            let (app, seen) = upload_app(outcome, dir.path().to_path_buf());
            let mut w = BufferedResponse::new();
            app.dispatch(upload_request(), &mut w).await;
            assert_eq!(w.status(), status);
            assert_cleaned(&seen);
        }
    }

    #[tokio::test]
    async fn test_cleanup_after_panic() {
        let dir = tempfile::tempdir().unwrap();
        let (app, seen) = upload_app(Outcome::Panic, dir.path().to_path_buf());

        let result = tokio::spawn(async move {
            let mut w = BufferedResponse::new();
            app.dispatch(upload_request(), &mut w).await;
        })
        .await;

        assert!(result.unwrap_err().is_panic());
        assert_cleaned(&seen);
    }

    #[tokio::test]
    async fn test_cleanup_after_cancellation() {
        let dir = tempfile::tempdir().unwrap();
        let (app, seen) = upload_app(Outcome::Hang, dir.path().to_path_buf());
        let mut w = BufferedResponse::new();

        let result = tokio::time::timeout(
            Duration::from_millis(50),
            app.dispatch(upload_request(), &mut w),
        )
        .await;

        assert!(result.is_err());
        assert_cleaned(&seen);
    }
}
