//! Feed Pipeline Tests
//!
//! End-to-end refresh runs against mock upstream feeds.

use presswatch::config::{FeedSource, FeedsConfig};
use presswatch::feed::{FeedDocument, Pipeline};
use std::path::Path;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const START: &str = "/* __FEEDS_DATA_START__ */";
const END: &str = "/* __FEEDS_DATA_END__ */";

/// An RSS 2.0 document with (title, link, pubDate, description) items.
fn rss(items: &[(&str, &str, &str, &str)]) -> String {
    let items: String = items
        .iter()
        .map(|(title, link, date, description)| {
            format!(
                "<item><title>{title}</title><link>{link}</link>\
                 <pubDate>{date}</pubDate><description>{description}</description></item>"
            )
        })
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0"><channel><title>Feed</title><link>https://feed.example</link>
<description>Feed</description>{items}</channel></rss>"#
    )
}

async fn mount_feed(server: &MockServer, route: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/rss+xml")
                .set_body_string(body),
        )
        .mount(server)
        .await;
}

fn html_template() -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<script>\n{START}\n  var __FEEDS__ = null;\n  {END}\n</script>\n</head>\n<body>Dashboard</body>\n</html>\n"
    )
}

fn test_config(dir: &Path, sources: Vec<FeedSource>) -> FeedsConfig {
    FeedsConfig {
        sources,
        keywords: vec!["hpp".to_string(), "high pressure".to_string()],
        allow_private_hosts: true,
        json_output: dir.join("feeds.json").display().to_string(),
        html_output: dir.join("index.html").display().to_string(),
        ..FeedsConfig::default()
    }
}

fn read_document(dir: &Path) -> FeedDocument {
    let text = std::fs::read_to_string(dir.join("feeds.json")).unwrap();
    serde_json::from_str(&text).unwrap()
}

#[tokio::test]
async fn test_dedup_ordering_and_filtering() {
    let server = MockServer::start().await;
    mount_feed(
        &server,
        "/trade.xml",
        rss(&[
            ("Plant opens", "https://news.example/plant?utm=rss", "Mon, 03 Mar 2025 08:00:00 GMT", "A new HPP plant"),
            ("Machine sale", "https://news.example/machine/", "Wed, 05 Mar 2025 08:00:00 GMT", "Equipment"),
        ]),
    )
    .await;
    mount_feed(
        &server,
        "/broad.xml",
        rss(&[
            ("Duplicate", "https://news.example/plant", "Thu, 06 Mar 2025 08:00:00 GMT", "HPP again"),
            ("Juice goes high pressure", "https://broad.example/juice", "Tue, 04 Mar 2025 08:00:00 GMT", "Cold pressed"),
            ("Unrelated bakery", "https://broad.example/bakery", "Fri, 07 Mar 2025 08:00:00 GMT", "Bread"),
        ]),
    )
    .await;

    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("index.html"), html_template()).unwrap();
    let config = test_config(
        dir.path(),
        vec![
            FeedSource::new("Trade", format!("{}/trade.xml", server.uri())),
            FeedSource::new("Broad", format!("{}/broad.xml", server.uri())).filtered(),
        ],
    );

    let report = Pipeline::from_config(&config).unwrap().run().await.unwrap();
    assert_eq!(report.feeds_ok, 2);
    assert_eq!(report.feeds_failed, 0);

    let doc = read_document(dir.path());
    let titles: Vec<&str> = doc.articles.iter().map(|a| a.title.as_str()).collect();

    // The earlier feed's entry wins the duplicate; the unrelated item is filtered out
    assert_eq!(titles, vec!["Machine sale", "Juice goes high pressure", "Plant opens"]);
    assert_eq!(doc.articles[2].source, "Trade");
    assert!(doc
        .articles
        .windows(2)
        .all(|w| w[0].pub_date >= w[1].pub_date));
    assert_eq!(report.articles, 3);
}

#[tokio::test]
async fn test_max_total_cap() {
    let server = MockServer::start().await;
    let items: Vec<(String, String)> = (0..10)
        .map(|i| {
            (
                format!("Story {i}"),
                format!("https://news.example/{i}"),
            )
        })
        .collect();
    let items: Vec<(&str, &str, &str, &str)> = items
        .iter()
        .map(|(t, l)| (t.as_str(), l.as_str(), "Mon, 03 Mar 2025 08:00:00 GMT", ""))
        .collect();
    mount_feed(&server, "/many.xml", rss(&items)).await;

    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("index.html"), html_template()).unwrap();
    let mut config = test_config(
        dir.path(),
        vec![FeedSource::new("Many", format!("{}/many.xml", server.uri()))],
    );
    config.max_total = 4;

    let report = Pipeline::from_config(&config).unwrap().run().await.unwrap();
    assert_eq!(report.articles, 4);
    assert_eq!(read_document(dir.path()).articles.len(), 4);
}

#[tokio::test]
async fn test_marker_preservation_and_idempotence() {
    let server = MockServer::start().await;
    mount_feed(
        &server,
        "/trade.xml",
        rss(&[("HPP update", "https://news.example/u", "Mon, 03 Mar 2025 08:00:00 GMT", "Body")]),
    )
    .await;

    let dir = tempfile::tempdir().unwrap();
    let html_path = dir.path().join("index.html");
    std::fs::write(&html_path, html_template()).unwrap();
    let config = test_config(
        dir.path(),
        vec![FeedSource::new("Trade", format!("{}/trade.xml", server.uri()))],
    );
    let pipeline = Pipeline::from_config(&config).unwrap();

    pipeline.run().await.unwrap();
    let first_html = std::fs::read_to_string(&html_path).unwrap();
    let first_doc = read_document(dir.path());

    let template = html_template();
    let (prefix, _) = template.split_once(START).unwrap();
    let (_, suffix) = template.split_once(END).unwrap();
    assert!(first_html.starts_with(prefix));
    assert!(first_html.ends_with(suffix));
    assert!(first_html.contains("var __FEEDS__ = {"));
    assert!(first_html.contains("HPP update"));

    pipeline.run().await.unwrap();
    let second_doc = read_document(dir.path());
    assert_eq!(
        serde_json::to_string(&first_doc.articles).unwrap(),
        serde_json::to_string(&second_doc.articles).unwrap()
    );
    assert_eq!(std::fs::read_to_string(&html_path).unwrap().matches(START).count(), 1);
}

#[tokio::test]
async fn test_failed_feed_is_skipped() {
    let server = MockServer::start().await;
    mount_feed(
        &server,
        "/ok.xml",
        rss(&[("HPP ok", "https://news.example/ok", "Mon, 03 Mar 2025 08:00:00 GMT", "")]),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/broken.xml"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    mount_feed(&server, "/garbage.xml", "this is not a feed".to_string()).await;

    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("index.html"), html_template()).unwrap();
    let config = test_config(
        dir.path(),
        vec![
            FeedSource::new("Ok", format!("{}/ok.xml", server.uri())),
            FeedSource::new("Broken", format!("{}/broken.xml", server.uri())),
            FeedSource::new("Garbage", format!("{}/garbage.xml", server.uri())),
        ],
    );

    let report = Pipeline::from_config(&config).unwrap().run().await.unwrap();
    assert_eq!(report.feeds_ok, 1);
    assert_eq!(report.feeds_failed, 2);
    assert_eq!(read_document(dir.path()).articles.len(), 1);
}

#[tokio::test]
async fn test_relay_used_after_direct_failure() {
    let server = MockServer::start().await;
    let feed_url = format!("{}/blocked.xml", server.uri());

    Mock::given(method("GET"))
        .and(path("/blocked.xml"))
        .respond_with(ResponseTemplate::new(403))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/relay"))
        .and(query_param("url", feed_url.as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_string(rss(&[(
            "Relayed HPP",
            "https://news.example/relayed",
            "Mon, 03 Mar 2025 08:00:00 GMT",
            "",
        )])))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("index.html"), html_template()).unwrap();
    let mut config = test_config(dir.path(), vec![FeedSource::new("Blocked", feed_url.clone())]);
    config.relays = vec![format!("{}/relay?url={{url}}", server.uri())];

    let report = Pipeline::from_config(&config).unwrap().run().await.unwrap();
    assert_eq!(report.feeds_ok, 1);
    assert_eq!(read_document(dir.path()).articles[0].title, "Relayed HPP");
}

#[tokio::test]
async fn test_relay_not_tried_when_direct_succeeds() {
    let server = MockServer::start().await;
    mount_feed(
        &server,
        "/direct.xml",
        rss(&[("HPP direct", "https://news.example/d", "Mon, 03 Mar 2025 08:00:00 GMT", "")]),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/relay"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("index.html"), html_template()).unwrap();
    let mut config = test_config(
        dir.path(),
        vec![FeedSource::new("Direct", format!("{}/direct.xml", server.uri()))],
    );
    config.relays = vec![format!("{}/relay?url={{url}}", server.uri())];

    let report = Pipeline::from_config(&config).unwrap().run().await.unwrap();
    assert_eq!(report.feeds_ok, 1);
}

#[tokio::test]
async fn test_private_hosts_rejected_by_default() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("index.html"), html_template()).unwrap();
    let mut config = test_config(
        dir.path(),
        vec![FeedSource::new("Local", format!("{}/feed.xml", server.uri()))],
    );
    config.allow_private_hosts = false;

    let report = Pipeline::from_config(&config).unwrap().run().await.unwrap();
    assert_eq!(report.feeds_failed, 1);
    assert!(report.all_failed());
}

#[tokio::test]
async fn test_missing_markers_fail_the_run() {
    let server = MockServer::start().await;
    mount_feed(
        &server,
        "/trade.xml",
        rss(&[("HPP", "https://news.example/x", "Mon, 03 Mar 2025 08:00:00 GMT", "")]),
    )
    .await;

    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("index.html"), "<html>no markers</html>").unwrap();
    let config = test_config(
        dir.path(),
        vec![FeedSource::new("Trade", format!("{}/trade.xml", server.uri()))],
    );

    let result = Pipeline::from_config(&config).unwrap().run().await;
    assert!(matches!(result, Err(presswatch::PresswatchError::Artifact(_))));
    assert_eq!(
        std::fs::read_to_string(dir.path().join("index.html")).unwrap(),
        "<html>no markers</html>"
    );
}
