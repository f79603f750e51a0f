//! Materializing the uploaded file part into a scratch file

use crate::form::{UploadForm, FILE_FIELD};
use publish_core::{ErrorReporter, ScratchFile, ScratchStore};
use std::io;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tokio::io::{AsyncWriteExt, BufReader, BufWriter};
use tracing::info;

/// Errors while saving an upload
#[derive(Error, Debug)]
pub enum UploadError {
    #[error("request has no file part {0:?}")]
    MissingFile(&'static str),

    #[error("failed to save uploaded file: {0}")]
    Io(#[from] io::Error),
}

/// An upload written to disk and closed.
///
/// Dropping it deletes the file.
#[derive(Debug)]
pub struct SavedUpload {
    principal_id: u64,
    original_name: String,
    size: u64,
    scratch: ScratchFile,
}

impl SavedUpload {
    pub fn path(&self) -> &Path {
        self.scratch.path()
    }

    pub fn principal_id(&self) -> u64 {
        self.principal_id
    }

    /// File name claimed by the client
    pub fn original_name(&self) -> &str {
        &self.original_name
    }

    /// Bytes written to disk
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Report a failed deletion to `reporter`
    pub fn report_to(&mut self, reporter: Arc<dyn ErrorReporter>) {
        self.scratch.report_to(reporter);
    }
}

/// Copy the form's file part into a fresh scratch file owned by `principal_id`.
///
/// A partially written file is removed before an error is returned.
pub async fn save_upload(
    store: &ScratchStore,
    form: &UploadForm,
    principal_id: u64,
) -> Result<SavedUpload, UploadError> {
    let part = form
        .file(FILE_FIELD)
        .ok_or(UploadError::MissingFile(FILE_FIELD))?;
    let mut reader = BufReader::new(part.open().await?);

    let mut scratch = store.create(principal_id, part.file_name()).await?;
    info!(
        user_id = principal_id,
        content_type = part.content_type().unwrap_or("unknown"),
        "processing uploaded file {}",
        part.file_name()
    );

    let mut writer = BufWriter::new(scratch.file_mut()?);
    let written = tokio::io::copy_buf(&mut reader, &mut writer).await?;
    writer.flush().await?;
    drop(writer);
    drop(reader);

    scratch.close().await?;
    info!(
        user_id = principal_id,
        "saved uploaded file {} ({} bytes written)",
        scratch.path().display(),
        written
    );

    Ok(SavedUpload {
        principal_id,
        original_name: part.file_name().to_string(),
        size: written,
        scratch,
    })
}
