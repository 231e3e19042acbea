//! Input validation: check a user-supplied path before pdfium sees it.
//!
//! pdfium reports a missing file, an unreadable file and a JPEG renamed to
//! `.pdf` with the same opaque error. Checking existence, read permission
//! and the `%PDF` magic bytes up front gives callers a meaningful error.

use crate::error::DecomposeError;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Validate that `path` names a readable PDF file.
pub fn validate_pdf_path(path: &Path) -> Result<PathBuf, DecomposeError> {
    let path = path.to_path_buf();

    if !path.is_file() {
        return Err(DecomposeError::FileNotFound { path });
    }

    let mut file = match std::fs::File::open(&path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(DecomposeError::PermissionDenied { path });
        }
        Err(_) => return Err(DecomposeError::FileNotFound { path }),
    };

    let mut magic = [0u8; 4];
    let mut filled = 0;
    while filled < magic.len() {
        match file.read(&mut magic[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) => {
                return Err(DecomposeError::CorruptPdf {
                    path,
                    detail: e.to_string(),
                })
            }
        }
    }

    if filled < magic.len() {
        return Err(DecomposeError::CorruptPdf {
            path,
            detail: format!("file is only {filled} bytes long"),
        });
    }
    if &magic != b"%PDF" {
        return Err(DecomposeError::NotAPdf { path, magic });
    }

    debug!("Validated local PDF: {}", path.display());
    Ok(path)
}

/// Validate an in-memory document.
pub fn validate_pdf_bytes(bytes: &[u8], label: &Path) -> Result<(), DecomposeError> {
    if bytes.len() < 4 {
        return Err(DecomposeError::CorruptPdf {
            path: label.to_path_buf(),
            detail: format!("buffer is only {} bytes long", bytes.len()),
        });
    }
    if &bytes[..4] != b"%PDF" {
        let mut magic = [0u8; 4];
        magic.copy_from_slice(&bytes[..4]);
        return Err(DecomposeError::NotAPdf {
            path: label.to_path_buf(),
            magic,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_file_is_not_found() {
        let err = validate_pdf_path(Path::new("/definitely/not/here.pdf")).unwrap_err();
        assert!(matches!(err, DecomposeError::FileNotFound { .. }));
    }

    #[test]
    fn directory_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = validate_pdf_path(dir.path()).unwrap_err();
        assert!(matches!(err, DecomposeError::FileNotFound { .. }));
    }

    #[test]
    fn wrong_magic_is_rejected() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"\x89PNG\r\n\x1a\n").unwrap();
        let err = validate_pdf_path(f.path()).unwrap_err();
        match err {
            DecomposeError::NotAPdf { magic, .. } => assert_eq!(&magic, b"\x89PNG"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn empty_file_is_corrupt() {
        let f = tempfile::NamedTempFile::new().unwrap();
        let err = validate_pdf_path(f.path()).unwrap_err();
        assert!(matches!(err, DecomposeError::CorruptPdf { .. }));
        assert!(err.is_document_unreadable());
    }

    #[test]
    fn pdf_header_is_accepted() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"%PDF-1.7\n").unwrap();
        assert_eq!(validate_pdf_path(f.path()).unwrap(), f.path());
    }

    #[test]
    fn bytes_are_checked_too() {
        let label = Path::new("<memory>");
        assert!(validate_pdf_bytes(b"%PDF-1.4", label).is_ok());
        assert!(matches!(
            validate_pdf_bytes(b"GIF89a", label),
            Err(DecomposeError::NotAPdf { .. })
        ));
        assert!(matches!(
            validate_pdf_bytes(b"%P", label),
            Err(DecomposeError::CorruptPdf { .. })
        ));
    }
}
