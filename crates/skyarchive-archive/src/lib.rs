//! The archive pipeline: record normalization, media caching, thread
//! reconstruction, and the CSV/HTML exports.

pub mod embed;
pub mod error;
pub mod export;
pub mod layout;
pub mod media;
pub mod normalize;
pub mod thread;

pub use embed::{EmbedView, ExternalCard, ImageRef};
pub use error::ExportError;
pub use export::{escape_html, render_document, write_csv, write_html, CSV_COLUMNS};
pub use layout::{ArchiveLayout, ASSETS_DIR_NAME, CSV_FILE_NAME, HTML_FILE_NAME};
pub use media::{MediaFetcher, MediaSettings};
pub use normalize::{
    classify, normalize_item, normalize_timestamp, snapshot_profile, PendingRecord,
    RecordCollector,
};
pub use thread::reconstruct_threads;
