//! Input staging: write an upload's bytes to a private temporary file.
//!
//! pdfium and tesseract require a file-system path; they cannot read from a
//! byte buffer. [`StagedUpload`] owns a [`NamedTempFile`] created with
//! owner-only permissions, so the file is removed when the value is dropped on
//! any exit path: success, error, panic unwinding, or a cancelled caller whose
//! blocking task still holds it.

use crate::error::PipelineError;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::debug;

/// An upload written to disk for the lifetime of one extraction.
#[derive(Debug)]
pub struct StagedUpload {
    file: NamedTempFile,
    size: u64,
}

impl StagedUpload {
    /// Stage `bytes` in a fresh temporary file.
    ///
    /// The original file extension is kept as the temp file's suffix; some
    /// backends sniff it.
    pub fn stage(bytes: &[u8], file_name: &str) -> Result<Self, PipelineError> {
        let suffix = file_extension(file_name)
            .map(|ext| format!(".{ext}"))
            .unwrap_or_default();

        let mut file = tempfile::Builder::new()
            .prefix("resume-lens-")
            .suffix(&suffix)
            .tempfile()
            .map_err(|e| PipelineError::Internal(format!("tempfile: {e}")))?;
        file.write_all(bytes)
            .and_then(|_| file.flush())
            .map_err(|e| PipelineError::Internal(format!("tempfile write: {e}")))?;

        debug!(
            "Staged '{}' ({} bytes) at {}",
            file_name,
            bytes.len(),
            file.path().display()
        );
        Ok(Self {
            file,
            size: bytes.len() as u64,
        })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Size of the staged bytes.
    pub fn size(&self) -> u64 {
        self.size
    }
}

/// Lowercase extension of `file_name`, restricted to a short alphanumeric tail.
pub fn file_extension(file_name: &str) -> Option<String> {
    let (_, ext) = file_name.rsplit_once('.')?;
    if ext.is_empty() || ext.len() > 8 || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn staged_file_holds_bytes_and_is_removed_on_drop() {
        let staged = StagedUpload::stage(b"hello", "cv.TXT").unwrap();
        let path = staged.path().to_path_buf();
        assert_eq!(std::fs::read(&path).unwrap(), b"hello");
        assert_eq!(staged.size(), 5);
        assert!(path.to_string_lossy().ends_with(".txt"));

        drop(staged);
        assert!(!path.exists());
    }

    #[test]
    fn extension_rules() {
        assert_eq!(file_extension("resume.PDF").as_deref(), Some("pdf"));
        assert_eq!(file_extension("noext"), None);
        assert_eq!(file_extension("weird.p/df"), None);
        assert_eq!(file_extension("trailing."), None);
    }
}
