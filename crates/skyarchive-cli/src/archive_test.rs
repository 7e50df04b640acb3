use serde_json::{json, Value};
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::*;

const ME: &str = "did:plc:me";
const OTHER: &str = "did:plc:other";

fn test_config(service_url: &str) -> AppConfig {
    AppConfig {
        login_handle: "runner.test".to_owned(),
        app_password: "abcd-efgh-ijkl-mnop".to_owned(),
        service_url: service_url.to_owned(),
        output_dir: PathBuf::from("."),
        log_level: "info".to_owned(),
        user_agent: "skyarchive-test/0.1".to_owned(),
        page_limit: 100,
        page_delay_ms: 0,
        rate_limit_cooldown_secs: 0,
        max_rate_limit_waits: Some(2),
        media_delay_ms: 0,
        media_probe_timeout_secs: 2,
        media_download_timeout_secs: 5,
    }
}

fn post(rkey: &str, author: &str, created_at: &str) -> Value {
    json!({
        "uri": format!("at://{author}/app.bsky.feed.post/{rkey}"),
        "cid": format!("bafy{rkey}"),
        "author": { "did": author, "handle": format!("{}.test", &author[8..]) },
        "record": { "text": format!("text of {rkey}"), "createdAt": created_at },
        "likeCount": 1
    })
}

async fn mount_session_and_profile(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/xrpc/com.atproto.server.createSession"))
        .and(body_json(json!({
            "identifier": "runner.test",
            "password": "abcd-efgh-ijkl-mnop"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "did": "did:plc:runner",
            "handle": "runner.test",
            "accessJwt": "access-token",
            "refreshJwt": "refresh-token"
        })))
        .expect(1)
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/xrpc/com.atproto.identity.resolveHandle"))
        .and(query_param("handle", "me.test"))
        .and(header("authorization", "Bearer access-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "did": ME })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/xrpc/app.bsky.actor.getProfile"))
        .and(query_param("actor", ME))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "did": ME,
            "handle": "me.test",
            "displayName": "Me",
            "description": "just me",
            "followersCount": 1200,
            "followsCount": 3,
            "postsCount": 2
        })))
        .mount(server)
        .await;
}

fn only_subdir(root: &Path) -> PathBuf {
    let mut dirs: Vec<PathBuf> = std::fs::read_dir(root)
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect();
    assert_eq!(dirs.len(), 1, "expected exactly one archive folder");
    dirs.remove(0)
}

#[tokio::test]
async fn archives_post_reply_and_repost_in_thread_order() {
    let server = MockServer::start().await;
    mount_session_and_profile(&server).await;

    let mut reply = post("reply", ME, "2024-01-01T01:00:00Z");
    reply["record"]["reply"] = json!({
        "root": { "uri": "at://did:plc:me/app.bsky.feed.post/post", "cid": "bafypost" },
        "parent": { "uri": "at://did:plc:me/app.bsky.feed.post/post", "cid": "bafypost" }
    });
    let feed = json!({
        "feed": [
            { "post": post("post", ME, "2024-01-01T00:00:00Z") },
            { "post": reply },
            {
                "post": post("shared", OTHER, "2023-12-31T00:00:00Z"),
                "reason": {
                    "$type": "app.bsky.feed.defs#reasonRepost",
                    "by": { "did": ME, "handle": "me.test" }
                }
            }
        ]
    });
    Mock::given(method("GET"))
        .and(path("/xrpc/app.bsky.feed.getAuthorFeed"))
        .and(query_param("actor", ME))
        .respond_with(ResponseTemplate::new(200).set_body_json(feed))
        .expect(1)
        .mount(&server)
        .await;

    let tmp = tempfile::tempdir().unwrap();
    let config = test_config(&server.uri());
    let target = Target::parse("@Me.Test").unwrap();

    let summary = run_archive(&config, &target, tmp.path()).await.unwrap();

    assert_eq!(summary.records, 3);
    assert_eq!(summary.pages, 1);
    assert!(summary
        .root
        .file_name()
        .unwrap()
        .to_string_lossy()
        .starts_with("me_test_archive_"));

    let csv_path = summary.csv_path.expect("csv written");
    let csv = std::fs::read_to_string(csv_path).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), 4);
    let kinds: Vec<&str> = lines[1..]
        .iter()
        .map(|line| line.split(',').nth(2).unwrap())
        .collect();
    assert_eq!(kinds, vec!["post", "reply", "repost"]);

    let html = std::fs::read_to_string(summary.html_path.expect("html written")).unwrap();
    assert!(html.contains("<strong>1,200</strong> Followers"));
    assert!(html.contains("text of reply"));
    assert!(summary.root.join("assets").is_dir());
}

#[tokio::test]
async fn auth_failure_during_fetch_writes_no_exports() {
    let server = MockServer::start().await;
    mount_session_and_profile(&server).await;
    Mock::given(method("GET"))
        .and(path("/xrpc/app.bsky.feed.getAuthorFeed"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "ExpiredToken",
            "message": "Token has expired"
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/xrpc/com.atproto.server.refreshSession"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "ExpiredToken",
            "message": "Refresh token has expired"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let tmp = tempfile::tempdir().unwrap();
    let config = test_config(&server.uri());
    let target = Target::parse("me.test").unwrap();

    let err = run_archive(&config, &target, tmp.path())
        .await
        .expect_err("fetch should abort");
    assert!(format!("{err:#}").contains("no export written"));

    let folder = only_subdir(tmp.path());
    assert!(!folder.join("archive_data.csv").exists());
    assert!(!folder.join("profile_archive.html").exists());
}

#[tokio::test]
async fn unresolvable_handle_stops_before_creating_folder() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/xrpc/com.atproto.server.createSession"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "did": "did:plc:runner",
            "handle": "runner.test",
            "accessJwt": "access-token"
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/xrpc/com.atproto.identity.resolveHandle"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "InvalidRequest",
            "message": "Unable to resolve handle"
        })))
        .mount(&server)
        .await;

    let tmp = tempfile::tempdir().unwrap();
    let config = test_config(&server.uri());
    let target = Target::parse("nobody.test").unwrap();

    let err = run_archive(&config, &target, tmp.path())
        .await
        .expect_err("resolution should fail");
    assert!(format!("{err:#}").contains("could not resolve handle @nobody.test"));
    assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn rejected_login_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/xrpc/com.atproto.server.createSession"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": "AuthenticationRequired",
            "message": "Invalid identifier or password"
        })))
        .mount(&server)
        .await;

    let config = test_config(&server.uri());
    let target = Target::parse("did:plc:me").unwrap();
    let err = run_resolve(&config, &target).await.expect_err("login should fail");
    assert!(format!("{err:#}").contains("login as runner.test failed"));
}

#[tokio::test]
async fn empty_feed_writes_profile_only_page() {
    let server = MockServer::start().await;
    mount_session_and_profile(&server).await;
    Mock::given(method("GET"))
        .and(path("/xrpc/app.bsky.feed.getAuthorFeed"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "feed": [] })))
        .mount(&server)
        .await;

    let tmp = tempfile::tempdir().unwrap();
    let config = test_config(&server.uri());
    let target = Target::parse("did:plc:me").unwrap();

    let summary = run_archive(&config, &target, tmp.path()).await.unwrap();

    assert_eq!(summary.records, 0);
    assert!(summary.csv_path.is_none());
    let html = std::fs::read_to_string(summary.html_path.expect("bio makes the page worth writing"))
        .unwrap();
    assert!(html.contains("No posts found in this archive."));
}
