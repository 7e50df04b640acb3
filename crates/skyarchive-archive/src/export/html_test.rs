use chrono::TimeZone;
use skyarchive_core::EmbedType;

use super::*;

fn generated_at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 9, 30, 0).unwrap()
}

fn profile() -> ProfileSnapshot {
    ProfileSnapshot {
        did: "did:plc:me".to_owned(),
        handle: "me.test".to_owned(),
        display_name: Some("Me <3".to_owned()),
        description: "line one\nline two".to_owned(),
        followers_count: 1_234_567,
        follows_count: 42,
        posts_count: 1000,
        avatar_local_path: Some("assets/avatar_1.jpg".to_owned()),
        banner_local_path: None,
    }
}

fn post(rkey: &str) -> PostRecord {
    PostRecord {
        uri: format!("at://did:plc:me/app.bsky.feed.post/{rkey}"),
        author_did: "did:plc:me".to_owned(),
        author_handle: "me.test".to_owned(),
        author_display_name: "Me".to_owned(),
        text: "hello".to_owned(),
        created_at: "2024-03-05T14:07:00Z".to_owned(),
        archived_profile_handle: "me.test".to_owned(),
        archived_profile_did: "did:plc:me".to_owned(),
        ..PostRecord::default()
    }
}

// -----------------------------------------------------------------------
// helpers
// -----------------------------------------------------------------------

#[test]
fn escape_html_covers_markup_characters() {
    assert_eq!(
        escape_html(r#"<a href="x">Tom & Jerry's</a>"#),
        "&lt;a href=&quot;x&quot;&gt;Tom &amp; Jerry&#x27;s&lt;/a&gt;"
    );
}

#[test]
fn thousands_are_grouped() {
    assert_eq!(group_thousands(0), "0");
    assert_eq!(group_thousands(999), "999");
    assert_eq!(group_thousands(1000), "1,000");
    assert_eq!(group_thousands(1_234_567), "1,234,567");
}

#[test]
fn timestamp_formats_or_falls_back() {
    assert_eq!(
        format_timestamp("2024-03-05T14:07:00Z"),
        "Mar 05, 2024 \u{b7} 02:07 PM UTC"
    );
    assert_eq!(format_timestamp("not a date"), "not a date");
    assert_eq!(format_timestamp(""), "");
}

#[test]
fn at_uri_maps_to_web_link() {
    assert_eq!(
        post_web_link("at://did:plc:abc/app.bsky.feed.post/3kxyz"),
        Some((
            "https://bsky.app/profile/did:plc:abc/post/3kxyz".to_owned(),
            "did:plc:abc".to_owned()
        ))
    );
    assert_eq!(post_web_link("https://example.com/post/1"), None);
    assert_eq!(post_web_link("at://did:plc:abc/app.bsky.feed.post"), None);
}

#[test]
fn external_domain_reads_host() {
    assert_eq!(
        external_domain("https://news.example.com/a?b=c").as_deref(),
        Some("news.example.com")
    );
    assert_eq!(external_domain("#"), None);
}

// -----------------------------------------------------------------------
// render_document
// -----------------------------------------------------------------------

#[test]
fn header_shows_profile_details() {
    let html = render_document(&profile(), &[post("1")], generated_at());

    assert!(html.contains("<title>Bluesky Archive: @me.test</title>"));
    assert!(html.contains("<h1>Me &lt;3</h1>"));
    assert!(html.contains("<strong>1,234,567</strong> Followers"));
    assert!(html.contains("<strong>1,000</strong> Posts"));
    assert!(html.contains("line one<br>\nline two"));
    assert!(html.contains("src=\"assets/avatar_1.jpg\" alt=\"Profile avatar\""));
    assert!(html.contains("class=\"banner\"><div class=\"placeholder\""));
}

#[test]
fn footer_has_generation_time_and_profile_link() {
    let html = render_document(&profile(), &[], generated_at());
    assert!(html.contains("Generated on: 2024-06-01 09:30:00 UTC"));
    assert!(html.contains("href=\"https://bsky.app/profile/me.test\""));
}

#[test]
fn no_posts_renders_message() {
    let html = render_document(&profile(), &[], generated_at());
    assert!(html.contains("No posts found in this archive."));
}

#[test]
fn post_text_is_escaped() {
    let record = PostRecord {
        text: "<script>alert(1)</script>\nbye".to_owned(),
        ..post("1")
    };
    let html = render_document(&profile(), &[record], generated_at());
    assert!(!html.contains("<script>"));
    assert!(html.contains("&lt;script&gt;alert(1)&lt;/script&gt;<br>\nbye"));
}

#[test]
fn permalink_and_timestamp() {
    let html = render_document(&profile(), &[post("3kabc")], generated_at());
    assert!(html.contains("href=\"https://bsky.app/profile/me.test/post/3kabc\""));
    assert!(html.contains("Mar 05, 2024 \u{b7} 02:07 PM UTC"));
}

#[test]
fn repost_shows_banner() {
    let record = PostRecord {
        item_type: ItemType::Repost,
        author_handle: "other.test".to_owned(),
        ..post("1")
    };
    let html = render_document(&profile(), &[record], generated_at());
    assert!(html.contains("class=\"repost-banner\""));
    assert!(html.contains("@me.test</a> reposted"));
}

#[test]
fn reply_links_to_parent() {
    let record = PostRecord {
        item_type: ItemType::Reply,
        reply_to_uri: Some("at://did:plc:parent/app.bsky.feed.post/p1".to_owned()),
        ..post("1")
    };
    let html = render_document(&profile(), &[record], generated_at());
    assert!(html.contains(
        "Replying to <a href=\"https://bsky.app/profile/did:plc:parent/post/p1\" target=\"_blank\">@did:plc:parent</a>"
    ));
}

#[test]
fn images_skip_failed_downloads_and_default_alt() {
    let record = PostRecord {
        embed_type: EmbedType::Images,
        embed_image_paths: vec![
            "assets/a_1.jpg".to_owned(),
            String::new(),
            "assets/c_3.png".to_owned(),
        ],
        embed_image_alts: vec!["first".to_owned(), "second".to_owned(), String::new()],
        ..post("1")
    };
    let html = render_document(&profile(), &[record], generated_at());
    assert!(html.contains("<img src=\"assets/a_1.jpg\" alt=\"first\">"));
    assert!(html.contains("<img src=\"assets/c_3.png\" alt=\"Embedded image\">"));
    assert!(!html.contains("alt=\"second\""));
}

#[test]
fn external_card_shows_domain() {
    let record = PostRecord {
        embed_type: EmbedType::External,
        embed_external_url: Some("https://news.example.com/story".to_owned()),
        embed_external_title: Some("Big <news>".to_owned()),
        ..post("1")
    };
    let html = render_document(&profile(), &[record], generated_at());
    assert!(html.contains("<small>news.example.com</small><strong>Big &lt;news&gt;</strong>"));
}

#[test]
fn external_card_drops_non_web_schemes() {
    let record = PostRecord {
        embed_type: EmbedType::External,
        embed_external_url: Some("javascript:alert(1)".to_owned()),
        embed_external_title: Some("click me".to_owned()),
        ..post("1")
    };
    let html = render_document(&profile(), &[record], generated_at());
    assert!(!html.contains("javascript:"));
    assert!(html.contains("<a href=\"#\" target=\"_blank\""));
}

#[test]
fn web_link_accepts_only_http_and_https() {
    assert_eq!(web_link("https://a.example/x"), Some("https://a.example/x"));
    assert_eq!(web_link("http://a.example/"), Some("http://a.example/"));
    assert_eq!(web_link("javascript:alert(1)"), None);
    assert_eq!(web_link("data:text/html,hi"), None);
    assert_eq!(web_link("not a url"), None);
}

#[test]
fn quote_card_links_to_quoted_post() {
    let record = PostRecord {
        embed_type: EmbedType::RecordWithMedia,
        embed_quote_post_uri: Some("at://did:plc:q/app.bsky.feed.post/qq".to_owned()),
        ..post("1")
    };
    let html = render_document(&profile(), &[record], generated_at());
    assert!(html.contains("Quoting <a href=\"https://bsky.app/profile/did:plc:q/post/qq\""));
}

// -----------------------------------------------------------------------
// write_html
// -----------------------------------------------------------------------

#[test]
fn write_html_skips_when_nothing_to_show() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("profile_archive.html");
    let bare = ProfileSnapshot {
        handle: "me.test".to_owned(),
        ..ProfileSnapshot::default()
    };

    assert!(!write_html(&bare, &[], &path, generated_at()).unwrap());
    assert!(!path.exists());
}

#[test]
fn write_html_renders_profile_only_archive() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("profile_archive.html");

    assert!(write_html(&profile(), &[], &path, generated_at()).unwrap());
    let written = std::fs::read_to_string(&path).unwrap();
    assert!(written.starts_with("<!DOCTYPE html>"));
    assert!(written.contains("No posts found in this archive."));
}
