//! Per-principal scratch files for uploaded payloads
//!
//! Files live at `{root}/{principal_id}/{random}_{original_name}`. The random
//! prefix is generated per file and the file is created exclusively, so
//! concurrent uploads from the same principal never share a path.
//!
//! A [`ScratchFile`] deletes its file when dropped. Deletion failures are
//! handed to an [`ErrorReporter`] if one is attached and are otherwise only
//! logged.

use crate::report::ErrorReporter;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

/// Length of the random file name prefix
const RANDOM_PREFIX_LEN: usize = 12;

/// Root directory under which scratch files are created
#[derive(Clone, Debug)]
pub struct ScratchStore {
    root: PathBuf,
}

impl ScratchStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory holding a principal's scratch files
    pub fn principal_dir(&self, principal_id: u64) -> PathBuf {
        self.root.join(principal_id.to_string())
    }

    /// Create an empty scratch file open for writing.
    ///
    /// `original_name` is only used as a file name suffix. Names containing a
    /// path separator are rejected with `InvalidInput` before anything is
    /// created on disk.
    pub async fn create(&self, principal_id: u64, original_name: &str) -> io::Result<ScratchFile> {
        validate_name(original_name)?;

        let dir = self.principal_dir(principal_id);
        tokio::fs::create_dir_all(&dir).await?;

        let suffix = format!("_{}", original_name);
        let (file, path) = tokio::task::spawn_blocking(move || {
            tempfile::Builder::new()
                .prefix("")
                .suffix(&suffix)
                .rand_bytes(RANDOM_PREFIX_LEN)
                .tempfile_in(&dir)?
                .keep()
                .map_err(|e| e.error)
        })
        .await
        .map_err(io::Error::other)??;

        debug!(path = %path.display(), "created scratch file");

        Ok(ScratchFile {
            path,
            file: Some(File::from_std(file)),
            reporter: None,
        })
    }
}

fn validate_name(name: &str) -> io::Result<()> {
    if name.chars().any(std::path::is_separator) {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("file name {:?} contains a path separator", name),
        ));
    }
    Ok(())
}

/// A scratch file that is removed from disk when dropped
pub struct ScratchFile {
    path: PathBuf,
    file: Option<File>,
    reporter: Option<Arc<dyn ErrorReporter>>,
}

impl ScratchFile {
    /// Path of the file on disk
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Report deletion failures to `reporter`
    pub fn report_to(&mut self, reporter: Arc<dyn ErrorReporter>) {
        self.reporter = Some(reporter);
    }

    /// Open handle for writing, until [`close`](Self::close) is called
    pub fn file_mut(&mut self) -> io::Result<&mut File> {
        self.file
            .as_mut()
            .ok_or_else(|| io::Error::other("scratch file is already closed"))
    }

    /// Whether the write handle has been closed
    pub fn is_closed(&self) -> bool {
        self.file.is_none()
    }

    /// Flush, sync and close the write handle. Closing twice is a no-op.
    pub async fn close(&mut self) -> io::Result<()> {
        if let Some(mut file) = self.file.take() {
            file.flush().await?;
            file.sync_all().await?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for ScratchFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScratchFile")
            .field("path", &self.path)
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl Drop for ScratchFile {
    fn drop(&mut self) {
        // The descriptor must be released before unlinking on some platforms.
        self.file.take();

        // Drop can run outside a runtime, so the unlink stays synchronous.

        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "removed scratch file"),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "failed to remove scratch file");
                if let Some(reporter) = &self.reporter {
                    reporter.report(&e, &[("file_path", self.path.display().to_string())]);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use proptest::prelude::*;
    use std::collections::HashSet;

    #[derive(Default)]
    struct RecordingReporter {
        events: Mutex<Vec<(String, Vec<(String, String)>)>>,
    }

    impl ErrorReporter for RecordingReporter {
        fn report(&self, error: &(dyn std::error::Error + 'static), context: &[(&str, String)]) {
            self.events.lock().push((
                error.to_string(),
                context.iter().map(|(k, v)| (k.to_string(), v.clone())).collect(),
            ));
        }
    }

    #[tokio::test]
    async fn test_create_layout() {
        let root = tempfile::tempdir().unwrap();
        let store = ScratchStore::new(root.path());

        let scratch = store.create(42, "video.mp4").await.unwrap();
        let path = scratch.path().to_path_buf();

        assert_eq!(path.parent().unwrap(), root.path().join("42"));
        let name = path.file_name().unwrap().to_str().unwrap();
        assert!(name.ends_with("_video.mp4"));
        assert_eq!(name.len(), RANDOM_PREFIX_LEN + "_video.mp4".len());
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_same_name_never_collides() {
        let root = tempfile::tempdir().unwrap();
        let store = ScratchStore::new(root.path());

        let mut handles = Vec::new();
        for _ in 0..32 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.create(7, "clip.mov").await.unwrap()
            }));
        }

        let mut files = Vec::new();
        for handle in handles {
            files.push(handle.await.unwrap());
        }
        let paths: HashSet<_> = files.iter().map(|f| f.path().to_path_buf()).collect();
        assert_eq!(paths.len(), 32);
    }

    #[tokio::test]
    async fn test_rejects_path_separator() {
        let root = tempfile::tempdir().unwrap();
        let store = ScratchStore::new(root.path());

        let err = store.create(3, "../../etc/passwd").await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
        assert!(!store.principal_dir(3).exists());
    }

    #[tokio::test]
    async fn test_drop_removes_file() {
        let root = tempfile::tempdir().unwrap();
        let store = ScratchStore::new(root.path());

        let mut scratch = store.create(1, "a.bin").await.unwrap();
        scratch.file_mut().unwrap().write_all(b"payload").await.unwrap();
        scratch.close().await.unwrap();
        assert!(scratch.is_closed());
        assert!(scratch.file_mut().is_err());

        let path = scratch.path().to_path_buf();
        assert_eq!(std::fs::read(&path).unwrap(), b"payload");

        drop(scratch);
        assert!(!path.exists());
    }

    #[test]
    fn test_drop_outside_runtime_removes_file() {
        let root = tempfile::tempdir().unwrap();
        let store = ScratchStore::new(root.path());

        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let mut scratch = rt.block_on(store.create(9, "late.bin")).unwrap();
        rt.block_on(scratch.close()).unwrap();
        drop(rt);

        let path = scratch.path().to_path_buf();
        drop(scratch);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_failed_removal_is_reported() {
        let root = tempfile::tempdir().unwrap();
        let store = ScratchStore::new(root.path());
        let reporter = Arc::new(RecordingReporter::default());

        let mut scratch = store.create(1, "gone.bin").await.unwrap();
        scratch.report_to(reporter.clone());
        let path = scratch.path().to_path_buf();
        std::fs::remove_file(&path).unwrap();
        drop(scratch);

        let events = reporter.events.lock();
        assert_eq!(events.len(), 1);
        assert_eq!(
            events[0].1,
            vec![("file_path".to_string(), path.display().to_string())]
        );
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_name_is_kept_as_suffix(name in "[A-Za-z0-9 ._-]{1,40}", id in 0u64..1_000_000) {
            let rt = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
            let root = tempfile::tempdir().unwrap();
            let store = ScratchStore::new(root.path());

            let scratch = rt.block_on(store.create(id, &name)).unwrap();
            let file_name = scratch.path().file_name().unwrap().to_string_lossy().into_owned();

            let expected_suffix = format!("_{}", name);
            prop_assert!(file_name.ends_with(&expected_suffix));
            let expected_dir = store.principal_dir(id);
            prop_assert_eq!(scratch.path().parent().unwrap(), expected_dir.as_path());
        }
    }
}
