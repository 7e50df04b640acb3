//! Decoding of post embed views.
//!
//! Each supported `$type` has its own decode function. Unknown tags and
//! malformed payloads become [`EmbedView::None`]; an embed never fails the
//! record it belongs to.

use serde::Deserialize;
use serde_json::Value;
use skyarchive_core::EmbedType;

const IMAGES_VIEW: &str = "app.bsky.embed.images#view";
const EXTERNAL_VIEW: &str = "app.bsky.embed.external#view";
const RECORD_VIEW: &str = "app.bsky.embed.record#view";
const RECORD_WITH_MEDIA_VIEW: &str = "app.bsky.embed.recordWithMedia#view";
const VIEW_RECORD: &str = "app.bsky.embed.record#viewRecord";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageRef {
    /// Full-size image URL; empty if the view carried none.
    pub url: String,
    pub alt: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExternalCard {
    pub uri: String,
    pub title: String,
    pub description: String,
}

/// The closed set of embeds an archive record can carry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum EmbedView {
    #[default]
    None,
    Images(Vec<ImageRef>),
    External(ExternalCard),
    Quote { uri: String },
    RecordWithMedia {
        images: Vec<ImageRef>,
        quote_uri: Option<String>,
    },
}

impl EmbedView {
    #[must_use]
    pub fn decode(embed: Option<&Value>) -> Self {
        let Some(embed) = embed else {
            return EmbedView::None;
        };
        let tag = type_tag(embed);
        let decoded = match tag {
            IMAGES_VIEW => decode_images(embed).map(EmbedView::Images),
            EXTERNAL_VIEW => decode_external(embed).map(EmbedView::External),
            RECORD_VIEW => decode_record(embed).map(|quote| match quote {
                Some(uri) => EmbedView::Quote { uri },
                None => EmbedView::None,
            }),
            RECORD_WITH_MEDIA_VIEW => decode_record_with_media(embed),
            _ => {
                tracing::debug!(embed_type = tag, "unsupported embed type; ignoring");
                return EmbedView::None;
            }
        };
        decoded.unwrap_or_else(|e| {
            tracing::warn!(embed_type = tag, error = %e, "malformed embed; ignoring");
            EmbedView::None
        })
    }

    #[must_use]
    pub fn embed_type(&self) -> EmbedType {
        match self {
            EmbedView::None => EmbedType::None,
            EmbedView::Images(_) => EmbedType::Images,
            EmbedView::External(_) => EmbedType::External,
            EmbedView::Quote { .. } => EmbedType::QuotePost,
            EmbedView::RecordWithMedia { .. } => EmbedType::RecordWithMedia,
        }
    }

    /// Images to download, in display order.
    #[must_use]
    pub fn images(&self) -> &[ImageRef] {
        match self {
            EmbedView::Images(images) | EmbedView::RecordWithMedia { images, .. } => {
                images.as_slice()
            }
            _ => &[],
        }
    }

    #[must_use]
    pub fn quote_uri(&self) -> Option<&str> {
        match self {
            EmbedView::Quote { uri } => Some(uri.as_str()),
            EmbedView::RecordWithMedia { quote_uri, .. } => quote_uri.as_deref(),
            _ => None,
        }
    }
}

fn type_tag(value: &Value) -> &str {
    value.get("$type").and_then(Value::as_str).unwrap_or_default()
}

#[derive(Deserialize)]
struct ImagesView {
    #[serde(default)]
    images: Vec<ImageViewImage>,
}

#[derive(Deserialize)]
struct ImageViewImage {
    #[serde(default)]
    fullsize: String,
    #[serde(default)]
    alt: String,
}

#[derive(Deserialize)]
struct ExternalView {
    external: ExternalViewExternal,
}

#[derive(Deserialize)]
struct ExternalViewExternal {
    uri: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
}

#[derive(Deserialize)]
struct RecordView {
    record: Value,
}

fn decode_images(value: &Value) -> Result<Vec<ImageRef>, serde_json::Error> {
    let view = ImagesView::deserialize(value)?;
    Ok(view
        .images
        .into_iter()
        .map(|image| ImageRef {
            url: image.fullsize,
            alt: image.alt,
        })
        .collect())
}

fn decode_external(value: &Value) -> Result<ExternalCard, serde_json::Error> {
    let view = ExternalView::deserialize(value)?;
    Ok(ExternalCard {
        uri: view.external.uri,
        title: view.external.title,
        description: view.external.description,
    })
}

/// Quote target of a `record#view`. Only a resolved `viewRecord` counts;
/// blocked, deleted or non-post records yield `None`.
fn decode_record(value: &Value) -> Result<Option<String>, serde_json::Error> {
    let view = RecordView::deserialize(value)?;
    Ok(view_record_uri(&view.record))
}

fn view_record_uri(record: &Value) -> Option<String> {
    if type_tag(record) != VIEW_RECORD {
        return None;
    }
    record
        .get("uri")
        .and_then(Value::as_str)
        .filter(|uri| !uri.is_empty())
        .map(str::to_owned)
}

/// `recordWithMedia#view` nests the quoted `viewRecord` one level deeper,
/// under `record.record`. Only image media is archived.
fn decode_record_with_media(value: &Value) -> Result<EmbedView, serde_json::Error> {
    let view = RecordView::deserialize(value)?;
    let quote_uri = view.record.get("record").and_then(view_record_uri);
    let images = match value.get("media") {
        Some(media) if type_tag(media) == IMAGES_VIEW => decode_images(media)?,
        _ => Vec::new(),
    };
    Ok(EmbedView::RecordWithMedia { images, quote_uri })
}
