mod app_config;
mod config;
mod error;
mod records;

pub use app_config::AppConfig;
pub use config::{load_app_config, load_app_config_from_env};
pub use error::ConfigError;
pub use records::{ArchiveSubject, EmbedType, ItemType, PostRecord, ProfileSnapshot};
