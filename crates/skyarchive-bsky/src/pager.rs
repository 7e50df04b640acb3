//! Cursor-driven pagination over `app.bsky.feed.getAuthorFeed`.
//!
//! [`FeedPager`] is pull-based: the caller asks for one page at a time and
//! processes its items before the next request goes out, so every item is
//! fully handled (media included) in server order.
//!
//! Failure policy per page request:
//!
//! | Class       | Action                                                   |
//! |-------------|----------------------------------------------------------|
//! | rate limit  | fixed cooldown, then retry the same cursor               |
//! | expired token | refresh the session once, then retry the same cursor   |
//! | auth        | abort, [`FetchError::Auth`]                              |
//! | protocol    | abort, [`FetchError::Protocol`]                          |
//! | anything else | abort, [`FetchError::Unexpected`]                      |
//!
//! An aborted pager yields no further pages; callers must discard what they
//! already collected.

use std::time::Duration;

use skyarchive_core::AppConfig;

use crate::client::BskyClient;
use crate::error::{BskyError, ErrorClass, FetchError};
use crate::types::FeedViewPost;

/// Maximum number of pages before giving up. Guards against a server that
/// hands back cycling cursors.
pub const MAX_PAGES: usize = 10_000;

/// Pacing and retry knobs for a fetch.
#[derive(Debug, Clone)]
pub struct FetchPolicy {
    pub page_limit: u32,
    /// Politeness delay before every request except the first.
    pub page_delay: Duration,
    /// Fixed wait after a rate-limit signal.
    pub rate_limit_cooldown: Duration,
    /// Cooldowns allowed at a single cursor before the fetch is abandoned.
    /// `None` waits out the rate limit for as long as it lasts.
    pub max_rate_limit_waits: Option<u32>,
}

impl FetchPolicy {
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            page_limit: config.page_limit,
            page_delay: Duration::from_millis(config.page_delay_ms),
            rate_limit_cooldown: Duration::from_secs(config.rate_limit_cooldown_secs),
            max_rate_limit_waits: config.max_rate_limit_waits,
        }
    }
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self {
            page_limit: 100,
            page_delay: Duration::from_secs(1),
            rate_limit_cooldown: Duration::from_secs(60),
            max_rate_limit_waits: None,
        }
    }
}

/// Running counters for a fetch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchStats {
    /// Successful page responses, including a final empty one.
    pub pages: usize,
    pub items: usize,
    pub rate_limit_waits: u32,
    pub session_refreshes: u32,
}

pub struct FeedPager<'a> {
    client: &'a mut BskyClient,
    actor: String,
    policy: FetchPolicy,
    cursor: Option<String>,
    finished: bool,
    stats: FetchStats,
}

impl<'a> FeedPager<'a> {
    #[must_use]
    pub fn new(client: &'a mut BskyClient, actor: &str, policy: FetchPolicy) -> Self {
        Self {
            client,
            actor: actor.to_owned(),
            policy,
            cursor: None,
            finished: false,
            stats: FetchStats::default(),
        }
    }

    #[must_use]
    pub fn stats(&self) -> FetchStats {
        self.stats
    }

    /// The cursor the next request will use.
    #[must_use]
    pub fn cursor(&self) -> Option<&str> {
        self.cursor.as_deref()
    }

    /// Fetches the next page of feed items.
    ///
    /// Returns `Ok(None)` once the feed is exhausted: a response without a
    /// cursor ends the feed after its items are returned, and an empty batch
    /// ends it immediately.
    ///
    /// # Errors
    ///
    /// Returns a [`FetchError`] for every non-retried failure class,
    /// [`FetchError::Auth`] when an expired session cannot be refreshed, and
    /// [`FetchError::RateLimitExhausted`] once a configured cooldown budget
    /// for the current cursor is spent.
    pub async fn next_page(&mut self) -> Result<Option<Vec<FeedViewPost>>, FetchError> {
        if self.finished {
            return Ok(None);
        }
        if self.stats.pages >= MAX_PAGES {
            self.finished = true;
            return Err(FetchError::PaginationLimit {
                actor: self.actor.clone(),
                max_pages: MAX_PAGES,
            });
        }

        if self.stats.pages > 0 && !self.policy.page_delay.is_zero() {
            tokio::time::sleep(self.policy.page_delay).await;
        }

        let mut waits_at_cursor = 0u32;
        let mut refreshed_at_cursor = false;
        let page = loop {
            let result = self
                .client
                .get_author_feed(&self.actor, self.policy.page_limit, self.cursor.as_deref())
                .await;
            match result {
                Ok(page) => break page,
                Err(err) if err.is_expired_token() && !refreshed_at_cursor => {
                    refreshed_at_cursor = true;
                    tracing::warn!(
                        actor = %self.actor,
                        cursor = ?self.cursor,
                        "access token expired; refreshing session"
                    );
                    if let Err(refresh_err) = self.client.refresh_session().await {
                        return Err(self.abort(refresh_err));
                    }
                    self.stats.session_refreshes += 1;
                }
                Err(err) if err.class() == ErrorClass::RateLimit => {
                    if self
                        .policy
                        .max_rate_limit_waits
                        .is_some_and(|cap| waits_at_cursor >= cap)
                    {
                        self.finished = true;
                        tracing::error!(
                            actor = %self.actor,
                            cursor = ?self.cursor,
                            waits = waits_at_cursor,
                            "rate limit persisted through every cooldown; stopping fetch"
                        );
                        return Err(FetchError::RateLimitExhausted {
                            waits: waits_at_cursor,
                            cursor: self.cursor.clone(),
                        });
                    }
                    waits_at_cursor += 1;
                    self.stats.rate_limit_waits += 1;
                    tracing::warn!(
                        actor = %self.actor,
                        cursor = ?self.cursor,
                        cooldown_secs = self.policy.rate_limit_cooldown.as_secs(),
                        error = %err,
                        "rate limited; waiting before retrying the same cursor"
                    );
                    tokio::time::sleep(self.policy.rate_limit_cooldown).await;
                }
                Err(err) => return Err(self.abort(err)),
            }
        };

        self.stats.pages += 1;

        if page.feed.is_empty() {
            tracing::info!(actor = %self.actor, pages = self.stats.pages, "empty batch; end of feed");
            self.finished = true;
            return Ok(None);
        }

        self.stats.items += page.feed.len();
        tracing::info!(
            actor = %self.actor,
            page = self.stats.pages,
            batch = page.feed.len(),
            total = self.stats.items,
            "fetched feed page"
        );

        match page.cursor.filter(|c| !c.is_empty()) {
            Some(next) => self.cursor = Some(next),
            None => {
                tracing::info!(actor = %self.actor, "reached the end of the feed (no cursor)");
                self.finished = true;
            }
        }

        Ok(Some(page.feed))
    }

    /// Drains the pager and returns every item in server order.
    ///
    /// # Errors
    ///
    /// Propagates the first [`FetchError`]; items from earlier pages are
    /// discarded.
    pub async fn collect_all(&mut self) -> Result<Vec<FeedViewPost>, FetchError> {
        let mut all_items = Vec::new();
        while let Some(items) = self.next_page().await? {
            all_items.extend(items);
        }
        Ok(all_items)
    }

    fn abort(&mut self, err: BskyError) -> FetchError {
        self.finished = true;
        let page = self.stats.pages + 1;
        match err.class() {
            ErrorClass::Auth => {
                tracing::error!(
                    actor = %self.actor,
                    cursor = ?self.cursor,
                    page,
                    error = %err,
                    "authentication failed during fetch; session is no longer valid"
                );
                FetchError::Auth(err)
            }
            ErrorClass::Protocol => {
                tracing::error!(
                    actor = %self.actor,
                    cursor = ?self.cursor,
                    page,
                    error = %err,
                    detail = ?err,
                    "feed response did not match the expected contract"
                );
                FetchError::Protocol(err)
            }
            ErrorClass::RateLimit | ErrorClass::Unexpected => {
                tracing::error!(
                    actor = %self.actor,
                    cursor = ?self.cursor,
                    page,
                    error = %err,
                    detail = ?err,
                    "unexpected error during fetch; stopping"
                );
                FetchError::Unexpected(err)
            }
        }
    }
}
