//! Input validation: make sure the transcript is a readable PDF before pdfium
//! ever sees it.
//!
//! pdfium reports a missing file, a permissions problem and a JPEG renamed
//! to `.pdf` all as the same opaque load failure. Checking up front turns
//! those into distinct [`GradError`] variants with actionable messages.

use crate::error::GradError;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

const PDF_MAGIC: &[u8; 4] = b"%PDF";

/// Validate a local transcript path and read its bytes.
pub fn read_transcript(path: &Path) -> Result<Vec<u8>, GradError> {
    let path = resolve_local(path)?;
    let bytes = std::fs::read(&path).map_err(|e| map_io_error(e, &path))?;
    debug!("Read {} bytes from {}", bytes.len(), path.display());
    Ok(bytes)
}

/// Check existence, permissions and the `%PDF` magic bytes.
pub fn resolve_local(path: &Path) -> Result<PathBuf, GradError> {
    let path = path.to_path_buf();

    if !path.exists() {
        return Err(GradError::FileNotFound { path });
    }

    let mut f = std::fs::File::open(&path).map_err(|e| map_io_error(e, &path))?;
    let mut magic = [0u8; 4];
    if f.read_exact(&mut magic).is_ok() && &magic != PDF_MAGIC {
        return Err(GradError::NotAPdf { path, magic });
    }

    debug!("Resolved local PDF: {}", path.display());
    Ok(path)
}

/// Magic-byte check for in-memory input. `label` names the source in errors.
pub fn check_pdf_bytes(bytes: &[u8], label: &Path) -> Result<(), GradError> {
    if bytes.len() >= 4 && &bytes[..4] != PDF_MAGIC {
        let mut magic = [0u8; 4];
        magic.copy_from_slice(&bytes[..4]);
        return Err(GradError::NotAPdf {
            path: label.to_path_buf(),
            magic,
        });
    }
    Ok(())
}

fn map_io_error(e: std::io::Error, path: &Path) -> GradError {
    match e.kind() {
        std::io::ErrorKind::PermissionDenied => GradError::PermissionDenied {
            path: path.to_path_buf(),
        },
        std::io::ErrorKind::NotFound => GradError::FileNotFound {
            path: path.to_path_buf(),
        },
        _ => GradError::CorruptPdf {
            path: path.to_path_buf(),
            detail: e.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_file_is_reported() {
        let err = resolve_local(Path::new("/nonexistent/transcript.pdf")).unwrap_err();
        assert!(matches!(err, GradError::FileNotFound { .. }));
    }

    #[test]
    fn non_pdf_is_rejected_with_magic() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"PK\x03\x04rest-of-zip").unwrap();
        match resolve_local(f.path()).unwrap_err() {
            GradError::NotAPdf { magic, .. } => assert_eq!(&magic, b"PK\x03\x04"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn pdf_header_is_accepted() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"%PDF-1.7\n%\xe2\xe3\xcf\xd3\n").unwrap();
        let bytes = read_transcript(f.path()).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn byte_check_matches_file_check() {
        assert!(check_pdf_bytes(b"%PDF-1.4", Path::new("<memory>")).is_ok());
        assert!(check_pdf_bytes(b"\x89PNG", Path::new("<memory>")).is_err());
    }
}
