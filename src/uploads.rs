//! On-disk store for uploaded documents.
//!
//! Uploads are saved under a generated name
//! `{YYYYmmdd_HHMMSS}_{uuid8}_{sanitised original}` so two uploads of
//! `report.pdf` in the same second never collide, and the original name
//! stays recognisable in listings. Files older than the retention period
//! are removed by [`DocumentStore::cleanup_expired`].

use crate::error::AnalyzerError;
use chrono::{DateTime, Duration, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Default upload size limit: 10 MiB.
pub const DEFAULT_MAX_SIZE: u64 = 10 * 1024 * 1024;

/// Default retention: one day.
pub const DEFAULT_RETENTION_DAYS: i64 = 1;

static RE_UNSAFE_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9._-]+").unwrap());

/// A document held by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredDocument {
    /// Generated file name, unique within the store.
    pub name: String,
    pub path: PathBuf,
    pub size: u64,
    pub modified: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct DocumentStore {
    root: PathBuf,
    allowed_extensions: Vec<String>,
    max_size: u64,
    retention: Duration,
}

impl DocumentStore {
    /// Store rooted at `root` with the default limits. The directory is
    /// created on first save.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            allowed_extensions: vec!["pdf".to_string()],
            max_size: DEFAULT_MAX_SIZE,
            retention: Duration::days(DEFAULT_RETENTION_DAYS),
        }
    }

    pub fn with_max_size(mut self, bytes: u64) -> Self {
        self.max_size = bytes;
        self
    }

    pub fn with_retention(mut self, retention: Duration) -> Self {
        self.retention = retention;
        self
    }

    pub fn with_allowed_extensions<I, S>(mut self, exts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_extensions = exts
            .into_iter()
            .map(|e| e.into().trim_start_matches('.').to_ascii_lowercase())
            .collect();
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn max_size(&self) -> u64 {
        self.max_size
    }

    /// True if `name` ends in one of the allowed extensions (case-insensitive).
    pub fn validate_extension(&self, name: &str) -> bool {
        Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| {
                self.allowed_extensions
                    .iter()
                    .any(|a| a.eq_ignore_ascii_case(e))
            })
            .unwrap_or(false)
    }

    /// Write `bytes` under a fresh name derived from `original_name`.
    pub fn save(&self, bytes: &[u8], original_name: &str) -> Result<StoredDocument, AnalyzerError> {
        if !self.validate_extension(original_name) {
            return Err(AnalyzerError::UnsupportedFormat {
                path: PathBuf::from(original_name),
                reason: format!("only {} files are supported", self.allowed_extensions.join(", ")),
            });
        }
        let size = bytes.len() as u64;
        if size > self.max_size {
            return Err(AnalyzerError::FileTooLarge {
                name: original_name.to_string(),
                size,
                max: self.max_size,
            });
        }

        std::fs::create_dir_all(&self.root).map_err(|e| self.io(&self.root, e))?;

        let name = stored_name(Utc::now(), original_name);
        let path = self.root.join(&name);
        std::fs::write(&path, bytes).map_err(|e| self.io(&path, e))?;
        info!("Saved upload '{}' as {}", original_name, path.display());

        Ok(StoredDocument {
            name,
            path,
            size,
            modified: Utc::now(),
        })
    }

    /// Stored documents with an allowed extension, newest first. A missing
    /// root directory lists as empty.
    pub fn list(&self) -> Result<Vec<StoredDocument>, AnalyzerError> {
        let entries = match std::fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(self.io(&self.root, e)),
        };

        let mut docs = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| self.io(&self.root, e))?;
            let path = entry.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()).map(str::to_string) else {
                continue;
            };
            if !self.validate_extension(&name) {
                continue;
            }
            let meta = entry.metadata().map_err(|e| self.io(&path, e))?;
            if !meta.is_file() {
                continue;
            }
            let modified = meta
                .modified()
                .map(DateTime::<Utc>::from)
                .map_err(|e| self.io(&path, e))?;
            docs.push(StoredDocument {
                name,
                path,
                size: meta.len(),
                modified,
            });
        }
        docs.sort_by(|a, b| b.modified.cmp(&a.modified).then_with(|| b.name.cmp(&a.name)));
        Ok(docs)
    }

    /// Remove one stored document by its generated name.
    ///
    /// Names with path separators or `..` are refused so callers cannot
    /// reach outside the store root.
    pub fn delete(&self, name: &str) -> Result<(), AnalyzerError> {
        let is_plain = !name.is_empty()
            && Path::new(name).file_name().and_then(|n| n.to_str()) == Some(name)
            && name != "..";
        if !is_plain {
            return Err(AnalyzerError::PermissionDenied {
                path: PathBuf::from(name),
            });
        }

        let path = self.root.join(name);
        if !path.is_file() {
            return Err(AnalyzerError::DocumentNotFound { path });
        }
        std::fs::remove_file(&path).map_err(|e| self.io(&path, e))?;
        debug!("Deleted stored document {}", path.display());
        Ok(())
    }

    /// Delete allowed-extension files at least `retention` old as of `now`.
    /// Returns how many were removed. A file that cannot be removed is logged
    /// and skipped.
    pub fn cleanup_expired(&self, now: DateTime<Utc>) -> Result<usize, AnalyzerError> {
        let mut removed = 0;
        for doc in self.list()? {
            if now - doc.modified < self.retention {
                continue;
            }
            match std::fs::remove_file(&doc.path) {
                Ok(()) => removed += 1,
                Err(e) => warn!("Error deleting file {}: {}", doc.path.display(), e),
            }
        }
        info!("Cleanup completed. {} files removed.", removed);
        Ok(removed)
    }

    fn io(&self, path: &Path, source: std::io::Error) -> AnalyzerError {
        AnalyzerError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Generated storage name for an upload received at `at`.
pub fn stored_name(at: DateTime<Utc>, original_name: &str) -> String {
    let id = uuid::Uuid::new_v4().simple().to_string();
    format!(
        "{}_{}_{}",
        at.format("%Y%m%d_%H%M%S"),
        &id[..8],
        sanitize_filename(original_name)
    )
}

/// Reduce a client-supplied name to its last path component with only
/// `[A-Za-z0-9._-]` characters. The extension of `name` is always kept;
/// when nothing usable is left of the stem it becomes `document`.
pub fn sanitize_filename(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let ext = Path::new(base)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty())
        .map(|e| RE_UNSAFE_CHARS.replace_all(e, "_").into_owned());

    let cleaned = RE_UNSAFE_CHARS.replace_all(base, "_");
    let cleaned = cleaned.trim_start_matches('.');
    let keeps_ext = match &ext {
        Some(ext) => Path::new(cleaned).extension().and_then(|e| e.to_str()) == Some(ext.as_str()),
        None => true,
    };

    match ext {
        _ if !cleaned.is_empty() && keeps_ext => cleaned.to_string(),
        Some(ext) => format!("document.{ext}"),
        None => "document".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    #[test]
    fn stored_name_has_timestamp_id_and_original() {
        let at = Utc.with_ymd_and_hms(2024, 3, 5, 14, 7, 9).unwrap();
        let name = stored_name(at, "lab results.pdf");
        assert!(name.starts_with("20240305_140709_"), "{name}");
        assert!(name.ends_with("_lab_results.pdf"), "{name}");
        let id = &name["20240305_140709_".len()..][..8];
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn sanitize_strips_directories_and_odd_characters() {
        assert_eq!(sanitize_filename("../../etc/passwd.pdf"), "passwd.pdf");
        assert_eq!(sanitize_filename("C:\\scans\\x ray (1).pdf"), "x_ray_1_.pdf");
        assert_eq!(sanitize_filename("..."), "document");
        assert_eq!(sanitize_filename("..pdf"), "document.pdf");
    }

    #[test]
    fn dot_only_stem_is_still_listed_and_expires() {
        let dir = TempDir::new().unwrap();
        let store = DocumentStore::new(dir.path());
        let saved = store.save(b"%PDF-1.5", "..pdf").unwrap();
        assert!(saved.name.ends_with("_document.pdf"), "{}", saved.name);

        let listed = store.list().unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].name, saved.name);

        let later = Utc::now() + Duration::days(DEFAULT_RETENTION_DAYS) + Duration::minutes(1);
        assert_eq!(store.cleanup_expired(later).unwrap(), 1);
    }

    #[test]
    fn save_rejects_wrong_extension_and_oversize() {
        let dir = TempDir::new().unwrap();
        let store = DocumentStore::new(dir.path()).with_max_size(4);
        assert!(matches!(
            store.save(b"%PDF", "notes.docx").unwrap_err(),
            AnalyzerError::UnsupportedFormat { .. }
        ));
        assert!(matches!(
            store.save(b"%PDF-1.5", "big.pdf").unwrap_err(),
            AnalyzerError::FileTooLarge { size: 8, max: 4, .. }
        ));
    }

    #[test]
    fn save_list_delete() {
        let dir = TempDir::new().unwrap();
        let store = DocumentStore::new(dir.path().join("uploads"));
        assert!(store.list().unwrap().is_empty());

        let a = store.save(b"%PDF-1.5 a", "a.pdf").unwrap();
        let b = store.save(b"%PDF-1.5 b", "A.PDF").unwrap();
        assert_ne!(a.name, b.name);
        std::fs::write(store.root().join("ignore.txt"), b"x").unwrap();

        let listed = store.list().unwrap();
        assert_eq!(listed.len(), 2);

        store.delete(&a.name).unwrap();
        assert_eq!(store.list().unwrap().len(), 1);
        assert!(matches!(
            store.delete(&a.name).unwrap_err(),
            AnalyzerError::DocumentNotFound { .. }
        ));
    }

    #[test]
    fn delete_refuses_path_traversal() {
        let dir = TempDir::new().unwrap();
        let store = DocumentStore::new(dir.path());
        for bad in ["../x.pdf", "sub/x.pdf", "..", ""] {
            assert!(
                matches!(store.delete(bad).unwrap_err(), AnalyzerError::PermissionDenied { .. }),
                "{bad}"
            );
        }
    }

    #[test]
    fn cleanup_removes_only_expired_allowed_files() {
        let dir = TempDir::new().unwrap();
        let store = DocumentStore::new(dir.path());
        store.save(b"%PDF-1.5", "old.pdf").unwrap();
        std::fs::write(dir.path().join("keep.txt"), b"x").unwrap();

        assert_eq!(store.cleanup_expired(Utc::now()).unwrap(), 0);
        let later = Utc::now() + Duration::days(DEFAULT_RETENTION_DAYS) + Duration::minutes(1);
        assert_eq!(store.cleanup_expired(later).unwrap(), 1);
        assert!(store.list().unwrap().is_empty());
        assert!(dir.path().join("keep.txt").exists());
    }
}
