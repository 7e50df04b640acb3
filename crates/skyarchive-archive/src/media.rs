//! Local caching of remote media (avatars, banners, embedded images).
//!
//! [`MediaFetcher::fetch`] never fails: probe and download errors are logged
//! and turned into `None`, so a broken image only leaves an empty field.

use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use skyarchive_core::AppConfig;
use thiserror::Error;
use tokio::io::AsyncWriteExt;

use crate::layout::ASSETS_DIR_NAME;

/// Extensions kept as-is; anything else triggers a content-type probe.
pub const KNOWN_EXTENSIONS: &[&str] = &[".jpeg", ".jpg", ".png", ".gif", ".webp"];
const FALLBACK_EXTENSION: &str = ".jpg";
const FALLBACK_STEM: &str = "image";
const MAX_STEM_CHARS: usize = 30;
const SUFFIX_LEN: usize = 8;

#[derive(Debug, Error)]
enum MediaError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Timeouts and pacing for media requests.
#[derive(Debug, Clone)]
pub struct MediaSettings {
    pub probe_timeout: Duration,
    pub download_timeout: Duration,
    /// Pause after every successful download.
    pub delay: Duration,
}

impl MediaSettings {
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            probe_timeout: Duration::from_secs(config.media_probe_timeout_secs),
            download_timeout: Duration::from_secs(config.media_download_timeout_secs),
            delay: Duration::from_millis(config.media_delay_ms),
        }
    }
}

impl Default for MediaSettings {
    fn default() -> Self {
        Self {
            probe_timeout: Duration::from_secs(5),
            download_timeout: Duration::from_secs(20),
            delay: Duration::from_millis(500),
        }
    }
}

/// Downloads media into the archive's assets directory.
pub struct MediaFetcher {
    client: Client,
    assets_dir: PathBuf,
    settings: MediaSettings,
}

impl MediaFetcher {
    /// # Errors
    ///
    /// Returns `reqwest::Error` if the HTTP client cannot be built.
    pub fn new(
        user_agent: &str,
        assets_dir: impl Into<PathBuf>,
        settings: MediaSettings,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .connect_timeout(settings.probe_timeout)
            .user_agent(user_agent)
            .build()?;
        Ok(Self {
            client,
            assets_dir: assets_dir.into(),
            settings,
        })
    }

    #[must_use]
    pub fn assets_dir(&self) -> &Path {
        &self.assets_dir
    }

    /// Saves `url` under the assets directory and returns its archive-relative
    /// path (`assets/<file>`), or `None` if anything went wrong.
    pub async fn fetch(&self, url: &str) -> Option<String> {
        if url.trim().is_empty() {
            return None;
        }

        let (stem, extension) = split_url_file_name(url);
        let extension = match extension {
            Some(ext) if KNOWN_EXTENSIONS.contains(&ext.as_str()) => ext,
            _ => self.probe_extension(url).await.to_owned(),
        };
        let file_name = format!("{stem}_{}{extension}", short_suffix());
        let target = self.assets_dir.join(&file_name);

        match self.download(url, &target).await {
            Ok(bytes) => {
                tracing::debug!(url, file = %file_name, bytes, "downloaded media");
                if !self.settings.delay.is_zero() {
                    tokio::time::sleep(self.settings.delay).await;
                }
                Some(format!("{ASSETS_DIR_NAME}/{file_name}"))
            }
            Err(e) => {
                tracing::warn!(url, file = %file_name, error = %e, "media download failed");
                if let Err(cleanup) = tokio::fs::remove_file(&target).await {
                    if cleanup.kind() != std::io::ErrorKind::NotFound {
                        tracing::debug!(path = %target.display(), error = %cleanup, "could not remove partial download");
                    }
                }
                None
            }
        }
    }

    /// Reads the declared content type with a HEAD request.
    async fn probe_extension(&self, url: &str) -> &'static str {
        let result = self
            .client
            .head(url)
            .timeout(self.settings.probe_timeout)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status);

        match result {
            Ok(response) => response
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .map_or(FALLBACK_EXTENSION, extension_for_content_type),
            Err(e) => {
                tracing::debug!(url, error = %e, "content-type probe failed; defaulting to .jpg");
                FALLBACK_EXTENSION
            }
        }
    }

    /// Streams the body of `url` into `target`. Returns the byte count.
    async fn download(&self, url: &str, target: &Path) -> Result<u64, MediaError> {
        let mut response = self
            .client
            .get(url)
            .timeout(self.settings.download_timeout)
            .send()
            .await?
            .error_for_status()?;

        let mut file = tokio::fs::File::create(target).await?;
        let mut written = 0u64;
        while let Some(chunk) = response.chunk().await? {
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;
        Ok(written)
    }
}

/// Derives `(stem, extension)` from the last path segment of `url`.
///
/// Query, fragment and any `@`-suffix are dropped. The stem keeps only
/// `[A-Za-z0-9_-]`, is capped at 30 characters, and falls back to `image`.
/// The extension is lowercased and includes its leading dot.
fn split_url_file_name(url: &str) -> (String, Option<String>) {
    let segment = url.rsplit('/').next().unwrap_or_default();
    let segment = segment.split('@').next().unwrap_or_default();
    let segment = segment.split(['?', '#']).next().unwrap_or_default();

    let (raw_stem, extension) = match segment.rfind('.') {
        Some(idx) if idx > 0 => (&segment[..idx], Some(segment[idx..].to_ascii_lowercase())),
        _ => (segment, None),
    };

    let mut stem: String = raw_stem
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .take(MAX_STEM_CHARS)
        .collect();
    if stem.is_empty() {
        FALLBACK_STEM.clone_into(&mut stem);
    }
    (stem, extension)
}

fn extension_for_content_type(content_type: &str) -> &'static str {
    let content_type = content_type.to_ascii_lowercase();
    if content_type.contains("jpeg") || content_type.contains("jpg") {
        ".jpg"
    } else if content_type.contains("png") {
        ".png"
    } else if content_type.contains("gif") {
        ".gif"
    } else if content_type.contains("webp") {
        ".webp"
    } else {
        FALLBACK_EXTENSION
    }
}

fn short_suffix() -> String {
    let mut id = uuid::Uuid::new_v4().simple().to_string();
    id.truncate(SUFFIX_LEN);
    id
}
