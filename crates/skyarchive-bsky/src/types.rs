//! Wire types for the XRPC endpoints the archiver calls.
//!
//! Only the fields the archive consumes are modelled. Optional lexicon fields
//! are `Option` or `#[serde(default)]` so that additive server changes never
//! break decoding, while a missing required field (`uri`, `cid`, `author`)
//! fails fast with a typed decode error.
//!
//! Post embeds stay as raw JSON here: the archive decodes them with its own
//! per-variant dispatch so an unfamiliar embed never fails a whole page.

use serde::Deserialize;

/// `$type` of the feed reason attached to reposted items.
pub const REASON_REPOST: &str = "app.bsky.feed.defs#reasonRepost";

// ---------------------------------------------------------------------------
// com.atproto.identity.resolveHandle
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct ResolveHandleResponse {
    pub did: String,
}

// ---------------------------------------------------------------------------
// app.bsky.actor.getProfile
// ---------------------------------------------------------------------------

/// Minimal actor view embedded in posts and feed reasons.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileViewBasic {
    pub did: String,
    pub handle: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
}

/// Full profile returned by `getProfile`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileViewDetailed {
    pub did: String,
    pub handle: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub banner: Option<String>,
    #[serde(default)]
    pub followers_count: Option<u64>,
    #[serde(default)]
    pub follows_count: Option<u64>,
    #[serde(default)]
    pub posts_count: Option<u64>,
}

// ---------------------------------------------------------------------------
// app.bsky.feed.getAuthorFeed
// ---------------------------------------------------------------------------

/// One page of an author feed.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthorFeedPage {
    #[serde(default)]
    pub feed: Vec<FeedViewPost>,
    #[serde(default)]
    pub cursor: Option<String>,
}

/// A feed entry: the post plus the reason it appears in this feed.
#[derive(Debug, Clone, Deserialize)]
pub struct FeedViewPost {
    pub post: PostView,
    #[serde(default)]
    pub reason: Option<FeedReason>,
}

/// Why an item appears in the feed. Reposts carry the reposting actor.
#[derive(Debug, Clone, Deserialize)]
pub struct FeedReason {
    #[serde(rename = "$type", default)]
    pub kind: String,
    #[serde(default)]
    pub by: Option<ProfileViewBasic>,
}

impl FeedReason {
    /// The reposting actor, when this reason marks a repost.
    #[must_use]
    pub fn repost_actor(&self) -> Option<&ProfileViewBasic> {
        if self.kind == REASON_REPOST || self.kind.is_empty() {
            self.by.as_ref()
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostView {
    pub uri: String,
    pub cid: String,
    pub author: ProfileViewBasic,
    pub record: PostRecordView,
    #[serde(default)]
    pub embed: Option<serde_json::Value>,
    #[serde(default)]
    pub reply_count: Option<u64>,
    #[serde(default)]
    pub repost_count: Option<u64>,
    #[serde(default)]
    pub like_count: Option<u64>,
    #[serde(default)]
    pub indexed_at: Option<String>,
}

/// The `app.bsky.feed.post` record inside a [`PostView`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostRecordView {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub langs: Option<Vec<String>>,
    #[serde(default)]
    pub reply: Option<ReplyRef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReplyRef {
    #[serde(default)]
    pub root: Option<StrongRef>,
    #[serde(default)]
    pub parent: Option<StrongRef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StrongRef {
    pub uri: String,
    #[serde(default)]
    pub cid: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_repost_item() {
        let item: FeedViewPost = serde_json::from_value(serde_json::json!({
            "post": {
                "uri": "at://did:plc:other/app.bsky.feed.post/1",
                "cid": "bafy1",
                "author": { "did": "did:plc:other", "handle": "other.test" },
                "record": { "text": "hi", "createdAt": "2024-01-01T00:00:00Z" },
                "indexedAt": "2024-01-01T00:00:01Z"
            },
            "reason": {
                "$type": "app.bsky.feed.defs#reasonRepost",
                "by": { "did": "did:plc:me", "handle": "me.test" },
                "indexedAt": "2024-01-02T00:00:00Z"
            }
        }))
        .expect("repost item should decode");

        let actor = item
            .reason
            .as_ref()
            .and_then(FeedReason::repost_actor)
            .expect("repost actor");
        assert_eq!(actor.did, "did:plc:me");
        assert_eq!(item.post.record.text, "hi");
        assert!(item.post.embed.is_none());
    }

    #[test]
    fn pin_reason_is_not_a_repost() {
        let reason: FeedReason = serde_json::from_value(serde_json::json!({
            "$type": "app.bsky.feed.defs#reasonPin"
        }))
        .unwrap();
        assert!(reason.repost_actor().is_none());
    }

    #[test]
    fn missing_author_fails_decode() {
        let result = serde_json::from_value::<PostView>(serde_json::json!({
            "uri": "at://did:plc:x/app.bsky.feed.post/1",
            "cid": "bafy",
            "record": {}
        }));
        assert!(result.is_err());
    }

    #[test]
    fn page_without_cursor_decodes() {
        let page: AuthorFeedPage = serde_json::from_value(serde_json::json!({ "feed": [] })).unwrap();
        assert!(page.feed.is_empty());
        assert!(page.cursor.is_none());
    }
}
