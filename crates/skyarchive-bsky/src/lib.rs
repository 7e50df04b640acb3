//! AT Protocol access for the archiver: an XRPC client for the handful of
//! endpoints an archive run needs, typed wire decoding, and the paginated
//! author-feed fetch loop.

pub mod client;
pub mod error;
pub mod pager;
pub mod types;

pub use client::{BskyClient, Session};
pub use error::{BskyError, ErrorClass, FetchError};
pub use pager::{FeedPager, FetchPolicy, FetchStats, MAX_PAGES};
pub use types::{
    AuthorFeedPage, FeedReason, FeedViewPost, PostRecordView, PostView, ProfileViewBasic,
    ProfileViewDetailed, ReplyRef, StrongRef,
};
