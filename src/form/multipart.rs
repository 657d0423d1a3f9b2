//! Multipart form reading
//!
//! Text fields are kept in memory up to `max_memory` plus a fixed allowance.
//! File fields stay in memory while they fit in what is left of `max_memory`;
//! larger ones are streamed to temporary files owned by the `FormCleanup` guard.
//! In-memory files count against the text allowance as well.

use http_body_util::BodyExt;
use hyper::body::Bytes;
use multer::{Field, Multipart};
use std::io;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

use super::{Form, FormCleanup, FormError, FormOptions};
use crate::http::RequestBody;

/// Extra in-memory allowance for non-file values
pub(super) const VALUE_MEMORY_ALLOWANCE: u64 = 10 << 20;

/// Where an uploaded file's content lives
#[derive(Debug, Clone)]
pub enum FileData {
    Memory(Bytes),
    Disk(PathBuf),
}

/// An uploaded file part
#[derive(Debug, Clone)]
pub struct FormFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub size: u64,
    pub data: FileData,
}

impl FormFile {
    /// Read the whole file content
    pub async fn read(&self) -> io::Result<Bytes> {
        match &self.data {
            FileData::Memory(bytes) => Ok(bytes.clone()),
            FileData::Disk(path) => tokio::fs::read(path).await.map(Bytes::from),
        }
    }

    /// Path of the spilled temp file; removed when the request's cleanup runs
    pub fn path(&self) -> Option<&Path> {
        match &self.data {
            FileData::Memory(_) => None,
            FileData::Disk(path) => Some(path),
        }
    }
}

/// Read every part of a multipart body into `form`
pub(super) async fn read_form(
    body: RequestBody,
    boundary: String,
    options: &FormOptions,
    form: &mut Form,
    cleanup: &mut FormCleanup,
) -> Result<(), FormError> {
    let mut multipart = Multipart::new(body.into_data_stream(), boundary);
    let value_limit = options.max_memory.saturating_add(VALUE_MEMORY_ALLOWANCE);
    let mut value_budget = value_limit;
    let mut file_budget = options.max_memory;

    while let Some(mut field) = multipart.next_field().await? {
        // Parts without a form name carry nothing addressable
        let Some(name) = field.name().filter(|n| !n.is_empty()).map(str::to_owned) else {
            continue;
        };

        // An empty file name is a plain value
        match field.file_name().filter(|n| !n.is_empty()).map(str::to_owned) {
            None => {
                let mut value = Vec::new();
                while let Some(chunk) = field.chunk().await? {
                    value.extend_from_slice(&chunk);
                    if value.len() as u64 > value_budget {
                        return Err(FormError::TooLarge { limit: value_limit });
                    }
                }
                value_budget -= value.len() as u64;
                form.push_value(name, String::from_utf8_lossy(&value).into_owned());
            }
            Some(file_name) => {
                let content_type = field.content_type().map(ToString::to_string);
                let (size, data) =
                    read_file(&mut field, &mut file_budget, options, cleanup).await?;
                if matches!(data, FileData::Memory(_)) {
                    value_budget = value_budget.saturating_sub(size);
                }
                form.push_file(
                    name,
                    FormFile {
                        file_name,
                        content_type,
                        size,
                        data,
                    },
                );
            }
        }
    }

    Ok(())
}

async fn read_file(
    field: &mut Field<'_>,
    budget: &mut u64,
    options: &FormOptions,
    cleanup: &mut FormCleanup,
) -> Result<(u64, FileData), FormError> {
    let mut buffer: Vec<u8> = Vec::new();

    while let Some(chunk) = field.chunk().await? {
        if (buffer.len() + chunk.len()) as u64 <= *budget {
            buffer.extend_from_slice(&chunk);
            continue;
        }

        let (file, path) = cleanup.create_temp(options.temp_dir.as_deref())?;
        let mut file = tokio::fs::File::from_std(file);
        file.write_all(&buffer).await?;
        file.write_all(&chunk).await?;
        let mut size = (buffer.len() + chunk.len()) as u64;
        while let Some(chunk) = field.chunk().await? {
            file.write_all(&chunk).await?;
            size += chunk.len() as u64;
        }
        file.flush().await?;
        return Ok((size, FileData::Disk(path)));
    }

    *budget -= buffer.len() as u64;
    Ok((buffer.len() as u64, FileData::Memory(Bytes::from(buffer))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::parse;
    use crate::form::tests::{multipart_body, multipart_request};

    #[tokio::test]
    async fn test_in_memory_files_use_value_allowance() {
        let opts = FormOptions {
            max_memory: 1 << 20,
            ..FormOptions::default()
        };
        let file = vec![b'f'; 1 << 20];
        let value = vec![b'v'; VALUE_MEMORY_ALLOWANCE as usize + 1];

        let alone = multipart_body(&[("note", None, value.as_slice())]);
        assert!(parse(multipart_request("/", alone), &opts).await.is_ok());

        let bytes = multipart_body(&[
            ("doc", Some("a.bin"), file.as_slice()),
            ("note", None, value.as_slice()),
        ]);
        let err = parse(multipart_request("/", bytes), &opts).await.unwrap_err();
        assert!(matches!(err, FormError::TooLarge { .. }));
    }

    #[tokio::test]
    async fn test_empty_file_name_is_a_value() {
        let bytes = multipart_body(&[("doc", Some(""), b"plain text")]);
        let (request, cleanup) = parse(multipart_request("/", bytes), &FormOptions::default())
            .await
            .unwrap();
        assert!(cleanup.is_noop());
        assert!(request.form().file("doc").is_none());
        assert_eq!(request.form().value("doc"), Some("plain text"));
    }
}
