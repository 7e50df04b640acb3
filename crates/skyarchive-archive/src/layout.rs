//! Per-run archive directory layout.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::error::ExportError;

/// Media subdirectory, also the prefix of every archive-relative media path.
pub const ASSETS_DIR_NAME: &str = "assets";
pub const CSV_FILE_NAME: &str = "archive_data.csv";
pub const HTML_FILE_NAME: &str = "profile_archive.html";

/// Locations of everything one archive run writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveLayout {
    root: PathBuf,
}

impl ArchiveLayout {
    /// Creates `<output_root>/<handle>_archive_<YYYYMMDD_HHMMSS>/assets/`.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::Io`] if the directories cannot be created.
    pub fn create(
        output_root: &Path,
        handle: &str,
        now: DateTime<Utc>,
    ) -> Result<Self, ExportError> {
        let layout = Self {
            root: output_root.join(folder_name(handle, now)),
        };
        let assets = layout.assets_dir();
        std::fs::create_dir_all(&assets).map_err(|e| ExportError::io(&assets, e))?;
        tracing::info!(root = %layout.root.display(), "created archive directory");
        Ok(layout)
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn assets_dir(&self) -> PathBuf {
        self.root.join(ASSETS_DIR_NAME)
    }

    #[must_use]
    pub fn csv_path(&self) -> PathBuf {
        self.root.join(CSV_FILE_NAME)
    }

    #[must_use]
    pub fn html_path(&self) -> PathBuf {
        self.root.join(HTML_FILE_NAME)
    }
}

/// Directory name for a run: dots become underscores, `@` is dropped, and
/// anything else outside `[A-Za-z0-9_-]` is replaced with `_`.
#[must_use]
pub fn folder_name(handle: &str, now: DateTime<Utc>) -> String {
    let sanitized: String = handle
        .chars()
        .filter(|c| *c != '@')
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("{sanitized}_archive_{}", now.format("%Y%m%d_%H%M%S"))
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap()
    }

    #[test]
    fn folder_name_sanitizes_handle() {
        assert_eq!(
            folder_name("@alice.bsky.social", fixed_now()),
            "alice_bsky_social_archive_20240309_140507"
        );
    }

    #[test]
    fn folder_name_replaces_path_separators() {
        assert_eq!(
            folder_name("../evil", fixed_now()),
            "___evil_archive_20240309_140507"
        );
    }

    #[test]
    fn create_makes_assets_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let layout = ArchiveLayout::create(tmp.path(), "bob.test", fixed_now()).unwrap();

        assert!(layout.assets_dir().is_dir());
        assert_eq!(
            layout.root(),
            tmp.path().join("bob_test_archive_20240309_140507")
        );
        assert!(layout.csv_path().ends_with("archive_data.csv"));
        assert!(layout.html_path().ends_with("profile_archive.html"));
    }
}
