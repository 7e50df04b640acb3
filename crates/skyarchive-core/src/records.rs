//! Normalized archive records.
//!
//! A [`PostRecord`] is the flat, self-describing unit that every export
//! consumes. Records live only for the duration of a single run and are never
//! persisted except through the export files.

use serde::{Deserialize, Serialize};

/// How a feed item relates to the archived profile.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemType {
    #[default]
    Post,
    Repost,
    Reply,
}

impl ItemType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ItemType::Post => "post",
            ItemType::Repost => "repost",
            ItemType::Reply => "reply",
        }
    }
}

impl std::fmt::Display for ItemType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The kind of rich content attached to a post.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbedType {
    #[default]
    None,
    Images,
    External,
    QuotePost,
    RecordWithMedia,
}

impl EmbedType {
    /// Column value used in the tabular export. `None` renders as an empty cell.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            EmbedType::None => "",
            EmbedType::Images => "images",
            EmbedType::External => "external",
            EmbedType::QuotePost => "quote_post",
            EmbedType::RecordWithMedia => "record_with_media",
        }
    }

    /// Whether this embed can carry an image gallery.
    #[must_use]
    pub fn carries_images(self) -> bool {
        matches!(self, EmbedType::Images | EmbedType::RecordWithMedia)
    }

    /// Whether this embed can carry a quoted post reference.
    #[must_use]
    pub fn carries_quote(self) -> bool {
        matches!(self, EmbedType::QuotePost | EmbedType::RecordWithMedia)
    }
}

impl std::fmt::Display for EmbedType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The account whose timeline is being archived.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveSubject {
    pub did: String,
    pub handle: String,
}

/// One normalized feed item.
///
/// Text fields hold raw, unescaped content; escaping happens only when a value
/// is interpolated into the rendered document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostRecord {
    pub uri: String,
    pub cid: String,
    pub author_did: String,
    pub author_handle: String,
    pub author_display_name: String,
    /// Archive-relative path of the cached author avatar, if one was saved.
    pub author_local_avatar_path: Option<String>,

    pub item_type: ItemType,

    pub text: String,
    pub languages: Vec<String>,
    /// ISO-8601 timestamp; empty when the upstream record carried none.
    pub created_at: String,

    pub reply_count: u64,
    pub repost_count: u64,
    pub like_count: u64,

    pub reply_to_uri: Option<String>,
    pub reply_root_uri: Option<String>,

    pub embed_type: EmbedType,
    /// Archive-relative image paths, index-aligned with `embed_image_alts`.
    /// A failed download leaves an empty string in its slot.
    pub embed_image_paths: Vec<String>,
    pub embed_image_alts: Vec<String>,
    pub embed_external_url: Option<String>,
    pub embed_external_title: Option<String>,
    pub embed_external_description: Option<String>,
    pub embed_quote_post_uri: Option<String>,

    pub archived_profile_handle: String,
    pub archived_profile_did: String,
}

/// Target profile metadata captured once per run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileSnapshot {
    pub did: String,
    pub handle: String,
    pub display_name: Option<String>,
    pub description: String,
    pub followers_count: u64,
    pub follows_count: u64,
    pub posts_count: u64,
    pub avatar_local_path: Option<String>,
    pub banner_local_path: Option<String>,
}

impl ProfileSnapshot {
    /// Whether the snapshot has anything worth rendering on its own.
    #[must_use]
    pub fn has_displayable_content(&self) -> bool {
        self.avatar_local_path.is_some()
            || self.banner_local_path.is_some()
            || !self.description.is_empty()
    }
}
