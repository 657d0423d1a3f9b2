//! Response writer module
//!
//! Handlers write their response into a `ResponseWriter` instead of returning one.
//! `BufferedResponse` is the writer used by the server: it collects the writes and
//! becomes a hyper `Response` once dispatch has finished.

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::HeaderMap;
use hyper::{Response, StatusCode};
use std::io;

use crate::logger;

/// Outbound response sink
pub trait ResponseWriter: Send {
    /// Headers sent with the status line. Changes after `write_header` are not sent.
    fn headers_mut(&mut self) -> &mut HeaderMap;

    /// Send the status line. Only the first call has an effect.
    fn write_header(&mut self, status: StatusCode);

    /// Append body bytes, sending `200 OK` first if no status was written yet.
    fn write(&mut self, buf: &[u8]) -> io::Result<usize>;

    /// Discard everything written so far. Returns `false` if the output can no
    /// longer be taken back.
    fn reset(&mut self) -> bool {
        false
    }
}

impl<W: ResponseWriter + ?Sized> ResponseWriter for &mut W {
    fn headers_mut(&mut self) -> &mut HeaderMap {
        (**self).headers_mut()
    }

    fn write_header(&mut self, status: StatusCode) {
        (**self).write_header(status);
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        (**self).write(buf)
    }

    fn reset(&mut self) -> bool {
        (**self).reset()
    }
}

/// In-memory writer producing a hyper response
#[derive(Debug, Default)]
pub struct BufferedResponse {
    headers: HeaderMap,
    /// Status and header snapshot taken by the first `write_header`
    sent: Option<(StatusCode, HeaderMap)>,
    body: Vec<u8>,
}

impl BufferedResponse {
    pub fn new() -> Self {
        Self::default()
    }

    /// Status written so far
    pub fn status(&self) -> Option<StatusCode> {
        self.sent.as_ref().map(|(status, _)| *status)
    }

    /// Headers that will be sent
    pub fn headers(&self) -> &HeaderMap {
        self.sent.as_ref().map_or(&self.headers, |(_, headers)| headers)
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Build the final response; a handler that wrote nothing yields an empty `200`
    pub fn into_response(self) -> Response<Full<Bytes>> {
        let (status, headers) = self.sent.unwrap_or((StatusCode::OK, self.headers));
        let mut response = Response::new(Full::new(Bytes::from(self.body)));
        *response.status_mut() = status;
        *response.headers_mut() = headers;
        response
    }
}

impl ResponseWriter for BufferedResponse {
    fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    fn write_header(&mut self, status: StatusCode) {
        if let Some((sent, _)) = &self.sent {
            logger::log_warning(&format!(
                "superfluous write_header({}) after {}",
                status.as_u16(),
                sent.as_u16()
            ));
            return;
        }
        self.sent = Some((status, self.headers.clone()));
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.sent.is_none() {
            self.write_header(StatusCode::OK);
        }
        self.body.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn reset(&mut self) -> bool {
        self.headers.clear();
        self.sent = None;
        self.body.clear();
        true
    }
}
