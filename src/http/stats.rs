//! Response tracking module
//!
//! `ResponseStats` decorates a writer and records what passed through it, so the
//! dispatcher can tell whether a handler already started its response.

use hyper::header::HeaderMap;
use hyper::StatusCode;
use std::io;

use super::writer::ResponseWriter;

/// Observation wrapper around a response writer
///
/// Every call is forwarded unchanged; the wrapper only records the first status
/// and counts body bytes accepted by the inner writer.
#[derive(Debug)]
pub struct ResponseStats<W> {
    inner: W,
    status: Option<StatusCode>,
    bytes_written: u64,
}

impl<W: ResponseWriter> ResponseStats<W> {
    pub const fn new(inner: W) -> Self {
        Self {
            inner,
            status: None,
            bytes_written: 0,
        }
    }

    /// Status sent so far, `None` while the response has not started
    pub const fn status(&self) -> Option<StatusCode> {
        self.status
    }

    /// Body bytes accepted by the inner writer
    pub const fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: ResponseWriter> ResponseWriter for ResponseStats<W> {
    fn headers_mut(&mut self) -> &mut HeaderMap {
        self.inner.headers_mut()
    }

    fn write_header(&mut self, status: StatusCode) {
        if self.status.is_none() {
            self.status = Some(status);
        }
        self.inner.write_header(status);
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        // The inner writer sends an implicit 200 on the first body write
        if self.status.is_none() {
            self.status = Some(StatusCode::OK);
        }
        let n = self.inner.write(buf)?;
        self.bytes_written += n as u64;
        Ok(n)
    }

    fn reset(&mut self) -> bool {
        let reset = self.inner.reset();
        if reset {
            self.status = None;
            self.bytes_written = 0;
        }
        reset
    }
}
