// Demo handlers wired into the binary
// Exercise form parsing, user errors and redirects end to end

use appgate::dispatch::{BoxFuture, ErrorDescriptor, Handler, HandlerResult};
use appgate::form::FormRequest;
use appgate::http::ResponseWriter;
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::{Method, StatusCode};
use serde_json::json;
use std::collections::BTreeMap;

/// Echo the parsed form back as JSON
pub fn form_summary<'a>(
    w: &'a mut dyn ResponseWriter,
    req: &'a FormRequest,
) -> BoxFuture<'a, HandlerResult> {
    Box::pin(async move {
        let form = req.form();
        let values: BTreeMap<_, _> = form.value_map().iter().collect();
        let files: BTreeMap<_, Vec<_>> = form
            .file_map()
            .iter()
            .map(|(name, files)| {
                let summary = files
                    .iter()
                    .map(|f| {
                        json!({
                            "file_name": f.file_name,
                            "content_type": f.content_type,
                            "size": f.size,
                            "on_disk": f.path().is_some(),
                        })
                    })
                    .collect();
                (name, summary)
            })
            .collect();

        let body = serde_json::to_vec(&json!({
            "method": req.method().as_str(),
            "path": req.path(),
            "multipart": req.is_multipart(),
            "values": values,
            "files": files,
        }))?;

        w.headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        w.write_header(StatusCode::OK);
        w.write(&body)?;
        Ok(())
    })
}

/// Password check that sends the caller on to `/form`
pub struct Login {
    password: String,
}

impl Login {
    pub fn new(password: impl Into<String>) -> Self {
        Self {
            password: password.into(),
        }
    }

    async fn check(&self, req: &FormRequest) -> HandlerResult {
        if req.method() != Method::POST {
            return Err(ErrorDescriptor::user("login requires POST")
                .with_status(StatusCode::METHOD_NOT_ALLOWED));
        }

        let password = req
            .form()
            .value("password")
            .filter(|p| !p.is_empty())
            .ok_or_else(|| ErrorDescriptor::user("missing password"))?;

        if password != self.password {
            return Err(
                ErrorDescriptor::user("invalid password").with_status(StatusCode::UNAUTHORIZED),
            );
        }

        // Relative to /login, so this lands on /form
        Err(ErrorDescriptor::redirect(StatusCode::SEE_OTHER, "form"))
    }
}

impl Handler for Login {
    fn handle<'a>(
        &'a self,
        _w: &'a mut dyn ResponseWriter,
        req: &'a FormRequest,
    ) -> BoxFuture<'a, HandlerResult> {
        Box::pin(self.check(req))
    }
}
