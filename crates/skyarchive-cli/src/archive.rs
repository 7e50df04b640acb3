//! Archive run orchestration.
//!
//! Sequence: log in, resolve the target, lay out the output directory, cache
//! profile media, page through the author feed normalizing each page as it
//! arrives, reconstruct threads, then write both exports. A fatal fetch
//! failure returns before any export file is written.

use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::Utc;
use skyarchive_archive::{
    reconstruct_threads, snapshot_profile, write_csv, write_html, ArchiveLayout, MediaFetcher,
    MediaSettings, RecordCollector,
};
use skyarchive_bsky::{BskyClient, FeedPager, FetchPolicy, ProfileViewDetailed};
use skyarchive_core::{AppConfig, ArchiveSubject};

use crate::target::Target;

/// What an archive run produced.
#[derive(Debug)]
pub(crate) struct ArchiveSummary {
    pub root: PathBuf,
    pub handle: String,
    pub records: usize,
    pub pages: usize,
    pub duplicates: usize,
    pub rate_limit_waits: u32,
    pub session_refreshes: u32,
    pub csv_path: Option<PathBuf>,
    pub html_path: Option<PathBuf>,
}

impl ArchiveSummary {
    pub(crate) fn print(&self) {
        println!(
            "archived @{}: {} records from {} pages ({} duplicates skipped, {} rate-limit waits)",
            self.handle, self.records, self.pages, self.duplicates, self.rate_limit_waits
        );
        if self.session_refreshes > 0 {
            println!("  session refreshed {} time(s)", self.session_refreshes);
        }
        println!("  folder: {}", self.root.display());
        match &self.csv_path {
            Some(path) => println!("  csv:    {}", path.display()),
            None => println!("  csv:    skipped (no records)"),
        }
        match &self.html_path {
            Some(path) => println!("  html:   {}", path.display()),
            None => println!("  html:   skipped (nothing to render)"),
        }
    }
}

pub(crate) async fn run_archive(
    config: &AppConfig,
    target: &Target,
    output_root: &Path,
) -> anyhow::Result<ArchiveSummary> {
    let mut client = logged_in_client(config).await?;
    let profile = resolve_profile(&client, target).await?;
    let subject = ArchiveSubject {
        did: profile.did.clone(),
        handle: profile.handle.clone(),
    };
    tracing::info!(did = %subject.did, handle = %subject.handle, "archiving profile");

    let layout = ArchiveLayout::create(output_root, &subject.handle, Utc::now())
        .context("failed to create archive directory")?;
    let media = MediaFetcher::new(
        &config.user_agent,
        layout.assets_dir(),
        MediaSettings::from_config(config),
    )
    .context("failed to build media HTTP client")?;

    let snapshot = snapshot_profile(&profile, &media).await;

    let mut pager = FeedPager::new(&mut client, &subject.did, FetchPolicy::from_config(config));
    let mut collector = RecordCollector::new(subject.clone(), &media);
    while let Some(items) = pager
        .next_page()
        .await
        .with_context(|| format!("feed fetch for @{} aborted; no export written", subject.handle))?
    {
        collector.push_page(&items).await;
    }
    let stats = pager.stats();
    let duplicates = collector.duplicates();

    let records = reconstruct_threads(collector.into_records(), &subject.did);
    tracing::info!(
        records = records.len(),
        pages = stats.pages,
        duplicates,
        "feed fetched and threaded"
    );

    let csv_path = layout.csv_path();
    let csv_written = write_csv(&records, &csv_path).context("failed to write CSV export")?;
    let html_path = layout.html_path();
    let html_written = write_html(&snapshot, &records, &html_path, Utc::now())
        .context("failed to write HTML timeline")?;

    Ok(ArchiveSummary {
        root: layout.root().to_path_buf(),
        handle: subject.handle,
        records: records.len(),
        pages: stats.pages,
        duplicates,
        rate_limit_waits: stats.rate_limit_waits,
        session_refreshes: stats.session_refreshes,
        csv_path: csv_written.then_some(csv_path),
        html_path: html_written.then_some(html_path),
    })
}

pub(crate) async fn run_resolve(config: &AppConfig, target: &Target) -> anyhow::Result<()> {
    let client = logged_in_client(config).await?;
    let profile = resolve_profile(&client, target).await?;

    println!("handle:    @{}", profile.handle);
    println!("did:       {}", profile.did);
    if let Some(name) = profile.display_name.as_deref().filter(|n| !n.is_empty()) {
        println!("name:      {name}");
    }
    println!("followers: {}", profile.followers_count.unwrap_or(0));
    println!("following: {}", profile.follows_count.unwrap_or(0));
    println!("posts:     {}", profile.posts_count.unwrap_or(0));
    Ok(())
}

async fn logged_in_client(config: &AppConfig) -> anyhow::Result<BskyClient> {
    let mut client = BskyClient::with_base_url(&config.user_agent, &config.service_url)
        .context("failed to build XRPC client")?;
    client
        .login(&config.login_handle, &config.app_password)
        .await
        .with_context(|| format!("login as {} failed", config.login_handle))?;
    Ok(client)
}

/// DIDs go straight to `getProfile`; handles are resolved to a DID first.
async fn resolve_profile(
    client: &BskyClient,
    target: &Target,
) -> anyhow::Result<ProfileViewDetailed> {
    let did = match target {
        Target::Did(did) => did.clone(),
        Target::Handle(handle) => client
            .resolve_handle(handle)
            .await
            .with_context(|| format!("could not resolve handle {target}"))?,
    };
    client
        .get_profile(&did)
        .await
        .with_context(|| format!("could not fetch profile for {target}"))
}

#[cfg(test)]
#[path = "archive_test.rs"]
mod tests;
