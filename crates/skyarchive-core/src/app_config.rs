use std::path::PathBuf;

/// Runtime settings for an archive run, assembled from the environment.
#[derive(Clone)]
pub struct AppConfig {
    pub login_handle: String,
    pub app_password: String,
    pub service_url: String,
    pub output_dir: PathBuf,
    pub log_level: String,
    pub user_agent: String,
    pub page_limit: u32,
    pub page_delay_ms: u64,
    pub rate_limit_cooldown_secs: u64,
    /// `None` keeps retrying a rate-limited cursor until the service recovers.
    pub max_rate_limit_waits: Option<u32>,
    pub media_delay_ms: u64,
    pub media_probe_timeout_secs: u64,
    pub media_download_timeout_secs: u64,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("login_handle", &self.login_handle)
            .field("app_password", &"[redacted]")
            .field("service_url", &self.service_url)
            .field("output_dir", &self.output_dir)
            .field("log_level", &self.log_level)
            .field("user_agent", &self.user_agent)
            .field("page_limit", &self.page_limit)
            .field("page_delay_ms", &self.page_delay_ms)
            .field("rate_limit_cooldown_secs", &self.rate_limit_cooldown_secs)
            .field("max_rate_limit_waits", &self.max_rate_limit_waits)
            .field("media_delay_ms", &self.media_delay_ms)
            .field("media_probe_timeout_secs", &self.media_probe_timeout_secs)
            .field(
                "media_download_timeout_secs",
                &self.media_download_timeout_secs,
            )
            .finish()
    }
}
