use std::path::Path;

use serde::Serialize;
use skyarchive_core::PostRecord;

use crate::error::ExportError;

/// Column order of the tabular export.
pub const CSV_COLUMNS: [&str; 24] = [
    "profile_user_handle",
    "profile_user_did",
    "item_type",
    "uri",
    "cid",
    "created_at",
    "text",
    "langs",
    "author_handle",
    "author_did",
    "author_display_name",
    "author_local_avatar_path",
    "reply_count",
    "repost_count",
    "like_count",
    "reply_to_post_uri",
    "reply_root_post_uri",
    "embed_type",
    "embed_local_image_paths",
    "embed_image_alts",
    "embed_external_url",
    "embed_external_title",
    "embed_external_description",
    "embed_quote_post_uri",
];

/// One CSV row. Field order must match [`CSV_COLUMNS`].
#[derive(Serialize)]
struct CsvRow<'a> {
    profile_user_handle: &'a str,
    profile_user_did: &'a str,
    item_type: &'static str,
    uri: &'a str,
    cid: &'a str,
    created_at: &'a str,
    text: &'a str,
    langs: String,
    author_handle: &'a str,
    author_did: &'a str,
    author_display_name: &'a str,
    author_local_avatar_path: &'a str,
    reply_count: u64,
    repost_count: u64,
    like_count: u64,
    reply_to_post_uri: &'a str,
    reply_root_post_uri: &'a str,
    embed_type: &'static str,
    embed_local_image_paths: String,
    embed_image_alts: String,
    embed_external_url: &'a str,
    embed_external_title: &'a str,
    embed_external_description: &'a str,
    embed_quote_post_uri: &'a str,
}

impl<'a> From<&'a PostRecord> for CsvRow<'a> {
    fn from(r: &'a PostRecord) -> Self {
        Self {
            profile_user_handle: &r.archived_profile_handle,
            profile_user_did: &r.archived_profile_did,
            item_type: r.item_type.as_str(),
            uri: &r.uri,
            cid: &r.cid,
            created_at: &r.created_at,
            text: &r.text,
            langs: r.languages.join(","),
            author_handle: &r.author_handle,
            author_did: &r.author_did,
            author_display_name: &r.author_display_name,
            author_local_avatar_path: r.author_local_avatar_path.as_deref().unwrap_or_default(),
            reply_count: r.reply_count,
            repost_count: r.repost_count,
            like_count: r.like_count,
            reply_to_post_uri: r.reply_to_uri.as_deref().unwrap_or_default(),
            reply_root_post_uri: r.reply_root_uri.as_deref().unwrap_or_default(),
            embed_type: r.embed_type.as_str(),
            embed_local_image_paths: r.embed_image_paths.join(","),
            embed_image_alts: r.embed_image_alts.join(","),
            embed_external_url: r.embed_external_url.as_deref().unwrap_or_default(),
            embed_external_title: r.embed_external_title.as_deref().unwrap_or_default(),
            embed_external_description: r
                .embed_external_description
                .as_deref()
                .unwrap_or_default(),
            embed_quote_post_uri: r.embed_quote_post_uri.as_deref().unwrap_or_default(),
        }
    }
}

/// Writes `records` as CSV with a header row.
///
/// Returns `Ok(false)` without creating the file when `records` is empty.
///
/// # Errors
///
/// Returns [`ExportError::Csv`] if the file cannot be created or written.
pub fn write_csv(records: &[PostRecord], path: &Path) -> Result<bool, ExportError> {
    if records.is_empty() {
        tracing::info!(path = %path.display(), "no records to export; skipping CSV");
        return Ok(false);
    }

    let mut writer = csv::Writer::from_path(path)?;
    for record in records {
        writer.serialize(CsvRow::from(record))?;
    }
    writer.flush().map_err(|e| ExportError::io(path, e))?;

    tracing::info!(path = %path.display(), rows = records.len(), "wrote CSV export");
    Ok(true)
}
