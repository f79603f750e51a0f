//! Parsed multipart form with re-readable file parts
//!
//! The request body is consumed once. Text fields are kept in memory, file
//! parts are spooled to anonymous temporary files that vanish when the form
//! is dropped. Routing decisions and the upload extractor can then inspect
//! the same form as many times as they need.

use axum::extract::multipart::{Multipart, MultipartError};
use std::collections::HashMap;
use std::io::{self, SeekFrom};
use thiserror::Error;
use tokio::fs::File;
use tokio::io::{AsyncSeekExt, AsyncWriteExt};

/// POST field containing the uploaded file
pub const FILE_FIELD: &str = "file";

/// POST field containing the JSON-RPC request accompanying the upload
pub const JSON_RPC_FIELD: &str = "json_payload";

/// Errors while reading a multipart body
#[derive(Error, Debug)]
pub enum FormError {
    #[error("invalid multipart body: {0}")]
    Multipart(#[from] MultipartError),

    #[error("failed to spool file part: {0}")]
    Io(#[from] io::Error),
}

/// A file part of the form
#[derive(Debug)]
pub struct FilePart {
    file_name: String,
    content_type: Option<String>,
    size: u64,
    spool: std::fs::File,
}

impl FilePart {
    /// File name claimed by the client (untrusted)
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// Open the part for reading from the start
    pub async fn open(&self) -> io::Result<File> {
        let mut file = File::from_std(self.spool.try_clone()?);
        file.seek(SeekFrom::Start(0)).await?;
        Ok(file)
    }
}

/// A fully read multipart form
#[derive(Debug, Default)]
pub struct UploadForm {
    values: HashMap<String, String>,
    files: HashMap<String, FilePart>,
}

impl UploadForm {
    /// Read every part of `multipart`. The first part wins when a name repeats.
    pub async fn from_multipart(mut multipart: Multipart) -> Result<Self, FormError> {
        let mut form = Self::default();

        while let Some(mut field) = multipart.next_field().await? {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };
            let file_name = field
                .file_name()
                .filter(|n| !n.is_empty())
                .map(str::to_string);

            match file_name {
                Some(file_name) => {
                    let content_type = field.content_type().map(str::to_string);
                    let spool = tokio::task::spawn_blocking(tempfile::tempfile)
                        .await
                        .map_err(io::Error::other)??;

                    let mut writer = File::from_std(spool);
                    let mut size = 0u64;
                    while let Some(chunk) = field.chunk().await? {
                        writer.write_all(&chunk).await?;
                        size += chunk.len() as u64;
                    }
                    writer.flush().await?;

                    form.files.entry(name).or_insert(FilePart {
                        file_name,
                        content_type,
                        size,
                        spool: writer.into_std().await,
                    });
                }
                None => {
                    let value = field.text().await?;
                    form.values.entry(name).or_insert(value);
                }
            }
        }

        Ok(form)
    }

    /// Text value of a field
    pub fn value(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// File part of a field
    pub fn file(&self, name: &str) -> Option<&FilePart> {
        self.files.get(name)
    }

    /// Whether this form is an upload accompanied by a JSON-RPC request.
    ///
    /// A missing file part is not an error, the form simply doesn't match.
    pub fn can_handle(&self) -> bool {
        self.file(FILE_FIELD).is_some()
            && self.value(JSON_RPC_FIELD).is_some_and(|v| !v.is_empty())
    }
}
