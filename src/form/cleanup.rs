//! Form cleanup guard
//!
//! Owns the temporary files written while parsing a multipart body and removes
//! them exactly once: on `release`, or when the guard is dropped. Dropping covers
//! early returns, unwinding panics and cancelled request futures.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempPath;

use crate::logger;

const TEMP_FILE_PREFIX: &str = "multipart-";

#[derive(Debug, Default)]
pub struct FormCleanup {
    temp_files: Vec<TempPath>,
}

impl FormCleanup {
    /// Guard with nothing to release
    pub fn noop() -> Self {
        Self::default()
    }

    /// True when releasing would do nothing
    pub fn is_noop(&self) -> bool {
        self.temp_files.is_empty()
    }

    /// Number of temporary files still owned by the guard
    pub fn temp_file_count(&self) -> usize {
        self.temp_files.len()
    }

    /// Create a temporary file whose removal this guard owns
    pub(super) fn create_temp(&mut self, dir: Option<&Path>) -> io::Result<(File, PathBuf)> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(TEMP_FILE_PREFIX);
        let named = match dir {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };
        let (file, temp_path) = named.into_parts();
        let path = temp_path.to_path_buf();
        self.temp_files.push(temp_path);
        Ok((file, path))
    }

    /// Remove every temporary file; later calls are no-ops
    ///
    /// Failures are logged only, the response has usually been produced by now.
    pub fn release(&mut self) {
        for temp_path in self.temp_files.drain(..) {
            if let Err(e) = temp_path.close() {
                logger::log_form_cleanup_error(&e);
            }
        }
    }
}

impl Drop for FormCleanup {
    fn drop(&mut self) {
        self.release();
    }
}
