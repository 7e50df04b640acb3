//! Static HTML timeline.
//!
//! Every user-supplied string goes through [`escape_html`] at the point it is
//! interpolated. Records keep raw text; escaping happens only here.

use std::path::Path;

use chrono::{DateTime, Utc};
use skyarchive_core::{ItemType, PostRecord, ProfileSnapshot};

use crate::error::ExportError;

const BSKY_PROFILE_BASE: &str = "https://bsky.app/profile/";

const PLACEHOLDER_COLOR: &str = "#8899A6";
const SEPARATOR_COLOR: &str = "#38444D";

const STYLESHEET: &str = r"
body { font-family: system-ui, -apple-system, 'Segoe UI', Roboto, Ubuntu, 'Helvetica Neue', sans-serif; line-height: 1.5; margin: 0; background: #161E27; color: #E5E7EB; }
a { color: #1D9BF0; text-decoration: none; }
a:hover { text-decoration: underline; }
.timeline { max-width: 600px; margin: auto; }
.banner { width: 100%; background: #38444D; }
.banner img, .banner .placeholder { display: block; width: 100%; aspect-ratio: 3 / 1; object-fit: cover; }
.avatar-row { display: flex; align-items: flex-end; padding: 0 16px; margin-top: -40px; position: relative; z-index: 1; }
.avatar-row img, .avatar-row .placeholder { width: 80px; height: 80px; border-radius: 50%; border: 4px solid #161E27; background: #8899A6; }
.profile { padding: 10px 16px 12px; border-bottom: 1px solid #38444D; }
.profile h1 { margin: 0 0 2px; font-size: 1.4em; color: #FFFFFF; }
.profile .handle, .profile .stats { font-size: 0.95em; color: #8899A6; margin-bottom: 8px; }
.profile .stats span { margin-right: 15px; }
.profile .stats strong { color: #E5E7EB; }
.profile .bio { font-size: 0.95em; margin-bottom: 10px; word-wrap: break-word; }
.post { display: flex; padding: 12px 16px; border-bottom: 1px solid #38444D; }
.post:last-child { border-bottom: none; }
.post .avatar { width: 48px; margin-right: 12px; flex-shrink: 0; }
.post .avatar img, .post .avatar .placeholder { width: 40px; height: 40px; border-radius: 50%; background: #8899A6; }
.post .body { flex-grow: 1; min-width: 0; }
.repost-banner { font-size: 0.85em; color: #A0AEC0; margin-bottom: 4px; }
.repost-banner a { color: inherit; }
.byline { display: flex; align-items: baseline; flex-wrap: wrap; font-size: 0.95em; margin-bottom: 2px; color: #8899A6; }
.byline .name { font-weight: bold; color: #FFFFFF; margin-right: 5px; word-break: break-all; }
.byline a { color: inherit; margin-right: 5px; }
.reply-to { font-size: 0.85em; color: #8899A6; margin-bottom: 6px; }
.text { margin-bottom: 10px; word-wrap: break-word; font-size: 0.95em; }
.embeds img { max-width: 100%; height: auto; display: block; margin-top: 8px; border-radius: 8px; border: 1px solid #38444D; }
.card, .quote { border: 1px solid #38444D; padding: 10px 12px; margin-top: 10px; border-radius: 8px; font-size: 0.9em; }
.card a { color: inherit; display: block; }
.card small, .card span { display: block; color: #8899A6; font-size: 0.85em; }
.card strong { display: block; color: #E5E7EB; margin-bottom: 3px; }
.counters { font-size: 0.85em; color: #8899A6; margin-top: 10px; }
.counters span { margin-right: 15px; }
.empty { text-align: center; padding: 20px; }
footer { text-align: center; padding: 20px; margin-top: 30px; border-top: 1px solid #38444D; font-size: 0.8em; color: #8899A6; }
footer p { margin: 5px 0; }
";

/// Escapes `&`, `<`, `>`, `"` and `'`.
#[must_use]
pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

/// Renders the whole archive page.
#[must_use]
pub fn render_document(
    profile: &ProfileSnapshot,
    records: &[PostRecord],
    generated_at: DateTime<Utc>,
) -> String {
    let handle = escape_html(&profile.handle);
    let mut out = String::with_capacity(4096 + records.len() * 1024);

    out.push_str(&format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"UTF-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n\
         <title>Bluesky Archive: @{handle}</title>\n<style>{STYLESHEET}</style>\n</head>\n\
         <body>\n<div class=\"timeline\">\n"
    ));

    render_profile_header(&mut out, profile);

    if records.is_empty() {
        out.push_str("<p class=\"empty\">No posts found in this archive.</p>\n");
    } else {
        for record in records {
            render_record(&mut out, record);
        }
    }

    out.push_str(&format!(
        "<footer>\n<p>Generated on: {}</p>\n\
         <p>Original profile: <a href=\"{BSKY_PROFILE_BASE}{handle}\" target=\"_blank\">@{handle}</a></p>\n\
         <p>Archive generated from the Bluesky API (AT Protocol)</p>\n</footer>\n",
        generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    out.push_str("</div>\n</body>\n</html>\n");
    out
}

/// Renders and writes the page to `path`.
///
/// Returns `Ok(false)` without writing when there are no records and the
/// profile has no avatar, banner or description.
///
/// # Errors
///
/// Returns [`ExportError::Io`] if the file cannot be written.
pub fn write_html(
    profile: &ProfileSnapshot,
    records: &[PostRecord],
    path: &Path,
    generated_at: DateTime<Utc>,
) -> Result<bool, ExportError> {
    if records.is_empty() && !profile.has_displayable_content() {
        tracing::info!(path = %path.display(), "nothing to render; skipping HTML");
        return Ok(false);
    }
    let document = render_document(profile, records, generated_at);
    std::fs::write(path, document).map_err(|e| ExportError::io(path, e))?;
    tracing::info!(path = %path.display(), posts = records.len(), "wrote HTML timeline");
    Ok(true)
}

fn render_profile_header(out: &mut String, profile: &ProfileSnapshot) {
    let handle = escape_html(&profile.handle);
    let name = escape_html(profile.display_name.as_deref().unwrap_or(profile.handle.as_str()));

    out.push_str("<div class=\"banner\">");
    match profile.banner_local_path.as_deref() {
        Some(path) => out.push_str(&format!(
            "<img src=\"{}\" alt=\"Profile banner\">",
            escape_html(path)
        )),
        None => out.push_str(&format!(
            "<div class=\"placeholder\" style=\"background:{SEPARATOR_COLOR};\"></div>"
        )),
    }
    out.push_str("</div>\n<div class=\"avatar-row\">");
    match profile.avatar_local_path.as_deref() {
        Some(path) => out.push_str(&format!(
            "<img src=\"{}\" alt=\"Profile avatar\">",
            escape_html(path)
        )),
        None => out.push_str(&format!(
            "<div class=\"placeholder\" style=\"background:{PLACEHOLDER_COLOR};\"></div>"
        )),
    }
    out.push_str("</div>\n");

    out.push_str(&format!(
        "<div class=\"profile\">\n<h1>{name}</h1>\n<div class=\"handle\">@{handle}</div>\n\
         <div class=\"stats\"><span><strong>{}</strong> Followers</span>\
         <span><strong>{}</strong> Following</span>\
         <span><strong>{}</strong> Posts</span></div>\n",
        group_thousands(profile.followers_count),
        group_thousands(profile.follows_count),
        group_thousands(profile.posts_count),
    ));
    if !profile.description.is_empty() {
        out.push_str(&format!(
            "<div class=\"bio\">{}</div>\n",
            multiline(&profile.description)
        ));
    }
    out.push_str("</div>\n");
}

fn render_record(out: &mut String, record: &PostRecord) {
    let author_handle = escape_html(&record.author_handle);
    let author_name = escape_html(&record.author_display_name);

    out.push_str(&format!(
        "<div class=\"post item-{}\">\n<div class=\"avatar\">",
        record.item_type
    ));
    match record.author_local_avatar_path.as_deref() {
        Some(path) if !path.is_empty() => out.push_str(&format!(
            "<img src=\"{}\" alt=\"Avatar for @{author_handle}\">",
            escape_html(path)
        )),
        _ => out.push_str("<div class=\"placeholder\"></div>"),
    }
    out.push_str("</div>\n<div class=\"body\">\n");

    if record.item_type == ItemType::Repost {
        let reposter = escape_html(&record.archived_profile_handle);
        out.push_str(&format!(
            "<div class=\"repost-banner\">\u{267b}\u{fe0f} <a href=\"{BSKY_PROFILE_BASE}{reposter}\" target=\"_blank\">@{reposter}</a> reposted</div>\n"
        ));
    }

    let permalink_author = if record.author_handle.is_empty() {
        escape_html(&record.author_did)
    } else {
        author_handle.clone()
    };
    let rkey = escape_html(record.uri.rsplit('/').next().unwrap_or_default());
    out.push_str(&format!(
        "<div class=\"byline\"><span class=\"name\">{author_name}</span>\
         <a href=\"{BSKY_PROFILE_BASE}{permalink_author}\" target=\"_blank\">@{author_handle}</a>\
         <span>\u{b7}&nbsp;</span>\
         <a href=\"{BSKY_PROFILE_BASE}{permalink_author}/post/{rkey}\" target=\"_blank\">{}</a></div>\n",
        escape_html(&format_timestamp(&record.created_at))
    ));

    if record.item_type == ItemType::Reply {
        if let Some(parent) = record.reply_to_uri.as_deref() {
            let (href, label) = match post_web_link(parent) {
                Some((href, authority)) => (href, format!("@{authority}")),
                None => (parent.to_owned(), "original post".to_owned()),
            };
            out.push_str(&format!(
                "<div class=\"reply-to\">\u{21aa}\u{fe0f} Replying to <a href=\"{}\" target=\"_blank\">{}</a></div>\n",
                escape_html(&href),
                escape_html(&label)
            ));
        }
    }

    out.push_str(&format!(
        "<div class=\"text\">{}</div>\n<div class=\"embeds\">",
        multiline(&record.text)
    ));
    render_embeds(out, record);
    out.push_str("</div>\n");

    out.push_str(&format!(
        "<div class=\"counters\"><span>\u{1f4ac} {}</span><span>\u{267b}\u{fe0f} {}</span><span>\u{2764}\u{fe0f} {}</span></div>\n",
        record.reply_count, record.repost_count, record.like_count
    ));
    out.push_str("</div>\n</div>\n");
}

fn render_embeds(out: &mut String, record: &PostRecord) {
    if record.embed_type.carries_images() {
        for (idx, path) in record.embed_image_paths.iter().enumerate() {
            if path.is_empty() {
                continue;
            }
            let alt = record
                .embed_image_alts
                .get(idx)
                .map(String::as_str)
                .filter(|alt| !alt.is_empty())
                .unwrap_or("Embedded image");
            out.push_str(&format!(
                "<img src=\"{}\" alt=\"{}\">",
                escape_html(path),
                escape_html(alt)
            ));
        }
    }

    if record.embed_type == skyarchive_core::EmbedType::External {
        let url = record
            .embed_external_url
            .as_deref()
            .and_then(web_link)
            .unwrap_or("#");
        let title = record
            .embed_external_title
            .as_deref()
            .unwrap_or("External Link");
        let description = record
            .embed_external_description
            .as_deref()
            .unwrap_or_default();
        let domain = external_domain(url)
            .map(|d| format!("<small>{}</small>", escape_html(&d)))
            .unwrap_or_default();
        out.push_str(&format!(
            "<div class=\"card\"><a href=\"{}\" target=\"_blank\" rel=\"noopener noreferrer\">{domain}<strong>{}</strong><span>{}</span></a></div>",
            escape_html(url),
            escape_html(title),
            escape_html(description)
        ));
    }

    if record.embed_type.carries_quote() {
        if let Some(quoted) = record.embed_quote_post_uri.as_deref() {
            let (href, label) = match post_web_link(quoted) {
                Some((href, authority)) => (href, format!("@{authority}")),
                None => (
                    web_link(quoted).unwrap_or("#").to_owned(),
                    "quoted post".to_owned(),
                ),
            };
            let href = escape_html(&href);
            out.push_str(&format!(
                "<div class=\"quote\">\u{1f501} Quoting <a href=\"{href}\" target=\"_blank\">{}</a> (<a href=\"{href}\" target=\"_blank\">view</a>)</div>",
                escape_html(&label)
            ));
        }
    }
}

/// Escapes `text` and turns newlines into `<br>`.
fn multiline(text: &str) -> String {
    escape_html(text).replace('\n', "<br>\n")
}

/// Maps `at://<authority>/<collection>/<rkey>` to its bsky.app permalink.
/// Returns the link and the authority.
fn post_web_link(at_uri: &str) -> Option<(String, String)> {
    let rest = at_uri.strip_prefix("at://")?;
    let mut parts = rest.split('/');
    let authority = parts.next().filter(|s| !s.is_empty())?;
    let _collection = parts.next().filter(|s| !s.is_empty())?;
    let rkey = parts.next().filter(|s| !s.is_empty())?;
    if parts.next().is_some() {
        return None;
    }
    Some((
        format!("{BSKY_PROFILE_BASE}{authority}/post/{rkey}"),
        authority.to_owned(),
    ))
}

/// Passes through only `http`/`https` URLs.
fn web_link(url: &str) -> Option<&str> {
    let parsed = reqwest::Url::parse(url).ok()?;
    matches!(parsed.scheme(), "http" | "https").then_some(url)
}

fn external_domain(url: &str) -> Option<String> {
    reqwest::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_owned))
}

/// `%b %d, %Y · %I:%M %p UTC`, or the input unchanged if it does not parse.
fn format_timestamp(created_at: &str) -> String {
    match DateTime::parse_from_rfc3339(created_at) {
        Ok(dt) => dt
            .with_timezone(&Utc)
            .format("%b %d, %Y \u{b7} %I:%M %p UTC")
            .to_string(),
        Err(_) => created_at.to_owned(),
    }
}

fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (idx, c) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
#[path = "html_test.rs"]
mod tests;
