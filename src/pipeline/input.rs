//! Input validation: make sure a path names a readable PDF before any
//! extraction or model call is made.
//!
//! Checks run in a fixed order so the reported error is predictable:
//! existence first, then the extension, then read permission, and finally
//! the `%PDF` magic bytes. A missing `report.txt` is therefore reported as
//! not found, never as unsupported.

use crate::error::AnalyzerError;
use std::io::Read;
use std::path::Path;
use tracing::debug;

/// Extensions the pipeline accepts, compared case-insensitively.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["pdf"];

/// True if the file name ends in a supported extension.
pub fn has_supported_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| SUPPORTED_EXTENSIONS.iter().any(|s| e.eq_ignore_ascii_case(s)))
        .unwrap_or(false)
}

/// Validate that `path` is an existing, readable PDF file.
pub fn validate_document(path: &Path) -> Result<(), AnalyzerError> {
    if !path.is_file() {
        return Err(AnalyzerError::DocumentNotFound {
            path: path.to_path_buf(),
        });
    }

    if !has_supported_extension(path) {
        return Err(AnalyzerError::UnsupportedFormat {
            path: path.to_path_buf(),
            reason: format!(
                "expected a .pdf file, got '{}'",
                path.extension()
                    .and_then(|e| e.to_str())
                    .map(|e| format!(".{e}"))
                    .unwrap_or_else(|| "no extension".to_string())
            ),
        });
    }

    let mut file = match std::fs::File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(AnalyzerError::PermissionDenied {
                path: path.to_path_buf(),
            });
        }
        Err(_) => {
            return Err(AnalyzerError::DocumentNotFound {
                path: path.to_path_buf(),
            });
        }
    };

    let mut magic = [0u8; 4];
    if file.read_exact(&mut magic).is_err() || &magic != b"%PDF" {
        return Err(AnalyzerError::UnsupportedFormat {
            path: path.to_path_buf(),
            reason: "file does not start with the %PDF header".to_string(),
        });
    }

    debug!("Validated input PDF: {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, bytes: &[u8]) -> std::path::PathBuf {
        let p = dir.path().join(name);
        std::fs::File::create(&p).unwrap().write_all(bytes).unwrap();
        p
    }

    #[test]
    fn missing_file_is_not_found_even_with_wrong_extension() {
        let err = validate_document(Path::new("/no/such/report.txt")).unwrap_err();
        assert!(matches!(err, AnalyzerError::DocumentNotFound { .. }));
    }

    #[test]
    fn existing_non_pdf_extension_is_unsupported() {
        let dir = TempDir::new().unwrap();
        let p = write(&dir, "report.txt", b"%PDF-1.5 pretending");
        let err = validate_document(&p).unwrap_err();
        assert!(matches!(err, AnalyzerError::UnsupportedFormat { .. }));
        assert!(err.to_string().contains(".txt"));
    }

    #[test]
    fn pdf_extension_without_magic_is_unsupported() {
        let dir = TempDir::new().unwrap();
        let p = write(&dir, "fake.pdf", b"hello world");
        assert!(matches!(
            validate_document(&p).unwrap_err(),
            AnalyzerError::UnsupportedFormat { .. }
        ));
    }

    #[test]
    fn uppercase_extension_is_accepted() {
        let dir = TempDir::new().unwrap();
        let p = write(&dir, "SCAN.PDF", b"%PDF-1.7\n");
        validate_document(&p).unwrap();
    }

    #[test]
    fn directory_is_not_a_document() {
        let dir = TempDir::new().unwrap();
        let sub = dir.path().join("folder.pdf");
        std::fs::create_dir(&sub).unwrap();
        assert!(matches!(
            validate_document(&sub).unwrap_err(),
            AnalyzerError::DocumentNotFound { .. }
        ));
    }
}
