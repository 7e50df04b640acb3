//! Normalization from feed wire types to [`PostRecord`] and
//! [`ProfileSnapshot`].
//!
//! [`normalize_item`] is pure and leaves local media paths empty.
//! [`RecordCollector`] wraps it with the media side channel and the
//! per-run uniqueness guard.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use skyarchive_bsky::{FeedReason, FeedViewPost, ProfileViewDetailed};
use skyarchive_core::{ArchiveSubject, ItemType, PostRecord, ProfileSnapshot};

use crate::embed::EmbedView;
use crate::media::MediaFetcher;

/// A normalized record plus the remote media it still needs.
#[derive(Debug, Clone)]
pub struct PendingRecord {
    pub record: PostRecord,
    pub author_avatar_url: Option<String>,
    pub embed: EmbedView,
}

/// Classifies a feed item relative to the archived profile.
///
/// A repost by the archived profile wins over everything else; otherwise a
/// post authored by the archived profile with a reply parent is a reply.
#[must_use]
pub fn classify(item: &FeedViewPost, subject: &ArchiveSubject) -> ItemType {
    let reposted_by_subject = item
        .reason
        .as_ref()
        .and_then(FeedReason::repost_actor)
        .is_some_and(|actor| actor.did == subject.did);
    if reposted_by_subject {
        return ItemType::Repost;
    }

    let has_parent = item
        .post
        .record
        .reply
        .as_ref()
        .is_some_and(|reply| reply.parent.is_some());
    if has_parent && item.post.author.did == subject.did {
        ItemType::Reply
    } else {
        ItemType::Post
    }
}

/// Normalizes a timestamp to RFC 3339 in UTC.
///
/// Missing or blank input yields an empty string. Values without an offset
/// are read as UTC. Unparseable values are kept verbatim.
#[must_use]
pub fn normalize_timestamp(raw: Option<&str>) -> String {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return String::new();
    };
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return parsed
            .with_timezone(&Utc)
            .to_rfc3339_opts(SecondsFormat::AutoSi, true);
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return naive
            .and_utc()
            .to_rfc3339_opts(SecondsFormat::AutoSi, true);
    }
    tracing::warn!(created_at = raw, "unparseable timestamp; keeping raw value");
    raw.to_owned()
}

/// Maps one feed item into a record without touching the network.
#[must_use]
pub fn normalize_item(item: &FeedViewPost, subject: &ArchiveSubject) -> PendingRecord {
    let post = &item.post;
    let author = &post.author;
    let reply = post.record.reply.as_ref();
    let embed = EmbedView::decode(post.embed.as_ref());

    let author_display_name = author
        .display_name
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .unwrap_or(author.handle.as_str())
        .to_owned();

    let mut record = PostRecord {
        uri: post.uri.clone(),
        cid: post.cid.clone(),
        author_did: author.did.clone(),
        author_handle: author.handle.clone(),
        author_display_name,
        author_local_avatar_path: None,
        item_type: classify(item, subject),
        text: post.record.text.clone(),
        languages: post.record.langs.clone().unwrap_or_default(),
        created_at: normalize_timestamp(post.record.created_at.as_deref()),
        reply_count: post.reply_count.unwrap_or(0),
        repost_count: post.repost_count.unwrap_or(0),
        like_count: post.like_count.unwrap_or(0),
        reply_to_uri: reply.and_then(|r| r.parent.as_ref()).map(|p| p.uri.clone()),
        reply_root_uri: reply.and_then(|r| r.root.as_ref()).map(|r| r.uri.clone()),
        embed_type: embed.embed_type(),
        embed_image_paths: Vec::new(),
        embed_image_alts: embed.images().iter().map(|i| i.alt.clone()).collect(),
        embed_external_url: None,
        embed_external_title: None,
        embed_external_description: None,
        embed_quote_post_uri: embed.quote_uri().map(str::to_owned),
        archived_profile_handle: subject.handle.clone(),
        archived_profile_did: subject.did.clone(),
    };

    if let EmbedView::External(card) = &embed {
        record.embed_external_url = Some(card.uri.clone());
        record.embed_external_title = Some(card.title.clone()).filter(|t| !t.is_empty());
        record.embed_external_description =
            Some(card.description.clone()).filter(|d| !d.is_empty());
    }

    PendingRecord {
        record,
        author_avatar_url: author.avatar.clone().filter(|url| !url.is_empty()),
        embed,
    }
}

/// Accumulates normalized records for one run, downloading media as it goes.
///
/// Items whose `uri` was already collected are skipped before any download.
/// Author avatars are fetched once per distinct URL, failures included.
pub struct RecordCollector<'a> {
    subject: ArchiveSubject,
    media: &'a MediaFetcher,
    seen: HashSet<String>,
    avatars: HashMap<String, Option<String>>,
    records: Vec<PostRecord>,
    duplicates: usize,
}

impl<'a> RecordCollector<'a> {
    #[must_use]
    pub fn new(subject: ArchiveSubject, media: &'a MediaFetcher) -> Self {
        Self {
            subject,
            media,
            seen: HashSet::new(),
            avatars: HashMap::new(),
            records: Vec::new(),
            duplicates: 0,
        }
    }

    /// Normalizes `item` and fetches its media. Returns `false` for a
    /// duplicate.
    pub async fn push(&mut self, item: &FeedViewPost) -> bool {
        if !self.seen.insert(item.post.uri.clone()) {
            self.duplicates += 1;
            tracing::debug!(uri = %item.post.uri, "duplicate feed item; skipping");
            return false;
        }

        let PendingRecord {
            mut record,
            author_avatar_url,
            embed,
        } = normalize_item(item, &self.subject);

        if let Some(url) = author_avatar_url {
            record.author_local_avatar_path = self.cached_avatar(&url).await;
        }

        let mut paths = Vec::with_capacity(embed.images().len());
        for image in embed.images() {
            paths.push(self.media.fetch(&image.url).await.unwrap_or_default());
        }
        record.embed_image_paths = paths;

        self.records.push(record);
        true
    }

    /// Pushes every item of a page in order. Returns the number accepted.
    pub async fn push_page(&mut self, items: &[FeedViewPost]) -> usize {
        let mut accepted = 0;
        for item in items {
            if self.push(item).await {
                accepted += 1;
            }
        }
        accepted
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[must_use]
    pub fn duplicates(&self) -> usize {
        self.duplicates
    }

    #[must_use]
    pub fn into_records(self) -> Vec<PostRecord> {
        self.records
    }

    async fn cached_avatar(&mut self, url: &str) -> Option<String> {
        if let Some(cached) = self.avatars.get(url) {
            return cached.clone();
        }
        let path = self.media.fetch(url).await;
        self.avatars.insert(url.to_owned(), path.clone());
        path
    }
}

/// Captures the archived profile, downloading its avatar and banner.
pub async fn snapshot_profile(
    profile: &ProfileViewDetailed,
    media: &MediaFetcher,
) -> ProfileSnapshot {
    let avatar_local_path = match profile.avatar.as_deref() {
        Some(url) if !url.is_empty() => media.fetch(url).await,
        _ => None,
    };
    let banner_local_path = match profile.banner.as_deref() {
        Some(url) if !url.is_empty() => media.fetch(url).await,
        _ => None,
    };

    ProfileSnapshot {
        did: profile.did.clone(),
        handle: profile.handle.clone(),
        display_name: profile
            .display_name
            .clone()
            .filter(|name| !name.trim().is_empty()),
        description: profile.description.clone().unwrap_or_default(),
        followers_count: profile.followers_count.unwrap_or(0),
        follows_count: profile.follows_count.unwrap_or(0),
        posts_count: profile.posts_count.unwrap_or(0),
        avatar_local_path,
        banner_local_path,
    }
}

#[cfg(test)]
#[path = "normalize_test.rs"]
mod tests;
