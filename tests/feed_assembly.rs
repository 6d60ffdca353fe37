//! Integration tests for channel assembly: query, render, write, and parse
//! the result back with `feed-rs`.
//!
//! Enclosure lengths are probed against a wiremock server, so the MSN tests
//! exercise the real HEAD request path.

use async_trait::async_trait;
use partnerfeed::content::{
    AttachmentId, AttachmentMeta, InMemoryAttachments, JsonPostSource, Post, PostQuery, PostSource,
};
use partnerfeed::feed::{http_probe, NoLengthProbe};
use partnerfeed::{FeedAssembler, FeedConfig, FeedError, FeedVariant, ProbeConfig};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config() -> FeedConfig {
    FeedConfig {
        site_name: "Example".to_string(),
        web_base_url: "https://www.example.com/".to_string(),
        ..Default::default()
    }
}

fn posts(hero_base: &str) -> JsonPostSource {
    let posts = json!([
        {
            "id": 1,
            "title": "Oldest MSN",
            "author": "Ann Writer",
            "published": "2024-03-01T08:00:00Z",
            "permalink": "https://www.example.com/oldest",
            "excerpt": "Old <b>news</b>",
            "widgets": [{ "acf_fc_layout": "heading", "text": "Old" }],
            "meta": { "publish_to_msn": "1" }
        },
        {
            "id": 2,
            "title": "Newest for both",
            "author": "Bo Editor",
            "published": "2024-03-03T10:15:00Z",
            "permalink": "https://www.example.com/newest",
            "seo_description": "Fish & chips",
            "excerpt": "ignored",
            "hero_images": [10],
            "widgets": [
                { "acf_fc_layout": "paragraph", "paragraph": "<p>Hello</p>" },
                { "acf_fc_layout": "looping_video", "video": "https://media.example.com/v.mp4" },
                { "acf_fc_layout": "poll" }
            ],
            "meta": { "publish_to_msn": true, "publish_to_samsung": 1 }
        },
        {
            "id": 3,
            "post_type": "recipe",
            "title": "Recipe, custom type",
            "published": "2024-03-02T09:00:00Z",
            "permalink": "https://www.example.com/recipe",
            "hero_images": [{ "url": format!("{hero_base}/uploads/clip.mp4"), "type": "video" }],
            "meta": { "publish_to_msn": 1 }
        },
        {
            "id": 4,
            "title": "Not flagged",
            "published": "2024-03-04T09:00:00Z",
            "permalink": "https://www.example.com/draft",
            "meta": { "publish_to_msn": false }
        }
    ]);
    JsonPostSource::new(serde_json::from_value(posts).unwrap())
}

fn attachments(hero_base: &str) -> InMemoryAttachments {
    [(
        AttachmentId(10),
        AttachmentMeta {
            url: Some(format!("{hero_base}/uploads/hero.jpg")),
            mime_type: Some("image/jpeg".into()),
            credit: Some("Studio & Co".into()),
            ..Default::default()
        },
    )]
    .into_iter()
    .collect()
}

#[tokio::test]
async fn test_msn_feed_end_to_end() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/uploads/hero.jpg"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-length", "4096")
                .set_body_bytes(vec![0u8; 4096]),
        )
        .mount(&server)
        .await;

    let mut config = config();
    config.extra_post_types = vec!["recipe".to_string()];
    let assembler = FeedAssembler::new(
        config,
        Arc::new(posts(&server.uri())),
        Arc::new(attachments(&server.uri())),
        http_probe(&ProbeConfig::default()).unwrap(),
    );

    let response = assembler
        .respond(FeedVariant::Msn, "/msn_feed?utm_source=test")
        .await
        .unwrap();
    assert_eq!(response.content_type, "application/xml; charset=UTF-8");

    let xml = &response.body;
    assert!(!xml.contains("xmlns:media"));
    assert!(xml.contains(
        r#"<atom:link href="https://www.example.com/msn_feed" rel="self" type="application/rss+xml"/>"#
    ));
    assert!(xml.contains(&format!(
        r#"<enclosure url="{}/uploads/hero.jpg" type="image/jpeg" length="4096"/>"#,
        server.uri()
    )));
    assert!(xml.contains("<description><![CDATA[Fish &amp; chips]]></description>"));
    assert!(xml.contains("<description><![CDATA[Old &lt;b&gt;news&lt;/b&gt;]]></description>"));
    assert!(xml.contains("<pubDate>Sun, 03 Mar 2024 10:15:00 GMT</pubDate>"));
    assert!(xml.contains("<dc:creator><![CDATA[Bo Editor]]></dc:creator>"));
    assert!(xml.contains(r#"src="https://media.example.com/v.mp4""#));

    let feed = feed_rs::parser::parse(xml.as_bytes()).unwrap();
    assert_eq!(
        feed.title.map(|t| t.content).as_deref(),
        Some("Example \u{2013} MSN News")
    );
    let ids: Vec<&str> = feed.entries.iter().map(|e| e.id.as_str()).collect();
    assert_eq!(
        ids,
        vec![
            "https://www.example.com/newest",
            "https://www.example.com/recipe",
            "https://www.example.com/oldest",
        ]
    );

    let newest = &feed.entries[0];
    let body = newest.content.as_ref().and_then(|c| c.body.as_deref()).unwrap();
    assert!(body.starts_with("<p>Hello</p>"));

    // Video hero on the recipe is never published
    assert_eq!(xml.matches("<enclosure").count(), 1);
}

#[tokio::test]
async fn test_samsung_feed_end_to_end() {
    let base = "https://img.example.com";
    let assembler = FeedAssembler::new(
        config(),
        Arc::new(posts(base)),
        Arc::new(attachments(base)),
        Arc::new(NoLengthProbe),
    );

    let xml = assembler
        .build_channel(FeedVariant::Samsung, "https://www.example.com/samsung_feed/")
        .await
        .unwrap();

    assert!(xml.contains(r#"xmlns:media="http://search.yahoo.com/mrss/""#));
    assert!(xml.contains(
        r#"<media:content url="https://img.example.com/uploads/hero.jpg" type="image/jpeg">"#
    ));
    assert!(xml.contains("<media:credit>Studio &amp; Co</media:credit>"));
    assert!(!xml.contains("<enclosure"));
    assert!(!xml.contains("<video"));
    assert!(xml.contains(r#"href="https://www.example.com/samsung_feed/""#));

    let feed = feed_rs::parser::parse(xml.as_bytes()).unwrap();
    assert_eq!(
        feed.title.map(|t| t.content).as_deref(),
        Some("Example \u{2013} Samsung News")
    );
    assert_eq!(feed.entries.len(), 1);
    assert_eq!(feed.entries[0].id, "https://www.example.com/newest");
}

#[tokio::test]
async fn test_unreachable_enclosure_host_leaves_length_empty() {
    let base = "http://127.0.0.1:1";
    let assembler = FeedAssembler::new(
        config(),
        Arc::new(posts(base)),
        Arc::new(attachments(base)),
        http_probe(&ProbeConfig::default()).unwrap(),
    );

    let xml = assembler.build_channel(FeedVariant::Msn, "/msn_feed").await.unwrap();
    assert!(xml.contains(r#"<enclosure url="http://127.0.0.1:1/uploads/hero.jpg" type="image/jpeg" length=""/>"#));
}

#[tokio::test]
async fn test_item_limit_applies() {
    let mut config = config();
    config.max_items = 1;
    let assembler = FeedAssembler::new(
        config,
        Arc::new(posts("https://img.example.com")),
        Arc::new(InMemoryAttachments::new()),
        Arc::new(NoLengthProbe),
    );

    let xml = assembler.build_channel(FeedVariant::Msn, "/msn_feed").await.unwrap();
    assert_eq!(xml.matches("<item>").count(), 1);
    assert!(xml.contains("<guid>https://www.example.com/newest</guid>"));
}

#[tokio::test]
async fn test_empty_feed_is_still_valid() {
    let assembler = FeedAssembler::new(
        config(),
        Arc::new(JsonPostSource::default()),
        Arc::new(InMemoryAttachments::new()),
        Arc::new(NoLengthProbe),
    );
    let xml = assembler.build_channel(FeedVariant::Msn, "/msn_feed").await.unwrap();
    let feed = feed_rs::parser::parse(xml.as_bytes()).unwrap();
    assert!(feed.entries.is_empty());
}

#[tokio::test]
async fn test_control_characters_are_stripped_from_items() {
    let posts = json!([{
        "id": 7,
        "title": "Vertical\u{b}tab",
        "author": "Ann\u{1} Writer",
        "published": "2024-03-01T08:00:00Z",
        "permalink": "https://www.example.com/controls",
        "excerpt": "Sum\u{0}mary",
        "widgets": [{ "acf_fc_layout": "heading", "text": "Clean\u{1b}" }],
        "meta": { "publish_to_msn": true }
    }]);
    let assembler = FeedAssembler::new(
        config(),
        Arc::new(JsonPostSource::new(serde_json::from_value(posts).unwrap())),
        Arc::new(InMemoryAttachments::new()),
        Arc::new(NoLengthProbe),
    );

    let xml = assembler.build_channel(FeedVariant::Msn, "msn_feed").await.unwrap();
    assert!(!xml.chars().any(|c| c.is_control() && !matches!(c, '\n' | '\r' | '\t')));
    assert!(xml.contains("<title><![CDATA[Verticaltab]]></title>"));
    assert!(xml.contains("<dc:creator><![CDATA[Ann Writer]]></dc:creator>"));
    assert!(xml.contains("<description><![CDATA[Summary]]></description>"));
    assert!(xml.contains(r#"href="https://www.example.com/msn_feed""#));
}

struct FailingSource;

#[async_trait]
impl PostSource for FailingSource {
    async fn recent_posts(&self, _query: &PostQuery) -> anyhow::Result<Vec<Post>> {
        anyhow::bail!("content store unavailable")
    }
}

#[tokio::test]
async fn test_source_failure_fails_request() {
    let assembler = FeedAssembler::new(
        config(),
        Arc::new(FailingSource),
        Arc::new(InMemoryAttachments::new()),
        Arc::new(NoLengthProbe),
    );
    let err = assembler
        .respond(FeedVariant::Samsung, "/samsung_feed")
        .await
        .unwrap_err();
    assert!(matches!(err, FeedError::Source(_)));
    assert!(err.to_string().contains("content store unavailable"));
}
