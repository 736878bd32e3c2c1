//! Feed fetcher with security measures.
//!
//! Fetches one configured feed through the transport chain, parses RSS or
//! Atom, normalizes entries into articles and applies the keyword filter for
//! broad feeds.

use std::net::IpAddr;

use feed_rs::model::Entry;
use feed_rs::parser;

use super::transport::{FeedTransport, TransportChain};
use super::types::Article;
use crate::config::{FeedSource, FeedsConfig};
use crate::error::{PresswatchError, Result};

/// Longest entity name recognized while stripping markup.
const MAX_ENTITY_LEN: usize = 10;

/// Fetches and normalizes configured feeds.
pub struct FeedFetcher {
    transport: Box<dyn FeedTransport>,
    keywords: Vec<String>,
    max_relevant: usize,
    max_description: usize,
    allow_private_hosts: bool,
}

impl FeedFetcher {
    /// Create a fetcher using the transport chain described by `config`.
    pub fn from_config(config: &FeedsConfig) -> Result<Self> {
        let chain = TransportChain::from_config(config)?;
        Ok(Self::with_transport(config, Box::new(chain)))
    }

    /// Create a fetcher with an explicit transport.
    pub fn with_transport(config: &FeedsConfig, transport: Box<dyn FeedTransport>) -> Self {
        Self {
            transport,
            keywords: config.keywords.iter().map(|k| k.to_lowercase()).collect(),
            max_relevant: config.max_relevant_per_filtered_feed,
            max_description: config.max_description_length,
            allow_private_hosts: config.allow_private_hosts,
        }
    }

    /// Fetch one feed and return its accepted articles.
    pub async fn fetch(&self, source: &FeedSource) -> Result<Vec<Article>> {
        validate_url(&source.url, self.allow_private_hosts)?;

        let bytes = self.transport.get(&source.url).await?;

        // Relevance is judged on the full description, before truncation
        let mut articles = parse_entries(&bytes, source)?;
        if source.filtered {
            articles = filter_relevant(articles, &self.keywords, self.max_relevant);
        }

        Ok(truncate_all(articles, self.max_description))
    }
}

/// Parse feed bytes into articles.
///
/// Only the first `fetch_limit` entries are considered; entries without a
/// title or a link are skipped.
pub fn parse_articles(bytes: &[u8], source: &FeedSource, max_description: usize) -> Result<Vec<Article>> {
    Ok(truncate_all(parse_entries(bytes, source)?, max_description))
}

/// Parse feed bytes into articles with full, untruncated descriptions.
fn parse_entries(bytes: &[u8], source: &FeedSource) -> Result<Vec<Article>> {
    let feed = parser::parse(bytes)
        .map_err(|e| PresswatchError::Feed(format!("failed to parse feed: {}", e)))?;

    let articles = feed
        .entries
        .into_iter()
        .take(source.fetch_limit)
        .filter_map(|entry| entry_to_article(entry, &source.label))
        .collect();

    Ok(articles)
}

fn truncate_all(articles: Vec<Article>, max_description: usize) -> Vec<Article> {
    articles
        .into_iter()
        .map(|mut a| {
            a.description = truncate_description(&a.description, max_description);
            a
        })
        .collect()
}

fn entry_to_article(entry: Entry, label: &str) -> Option<Article> {
    let title = entry
        .title
        .map(|t| strip_html(&t.content))
        .unwrap_or_default();

    let link = entry
        .links
        .iter()
        .find(|l| l.rel.as_deref() == Some("alternate"))
        .or_else(|| entry.links.first())
        .map(|l| l.href.trim().to_string())
        .unwrap_or_default();

    if title.is_empty() || link.is_empty() {
        return None;
    }

    let description = entry
        .summary
        .map(|t| t.content)
        .or(entry.content.and_then(|c| c.body))
        .map(|d| strip_html(&d))
        .unwrap_or_default();

    Some(Article {
        source: label.to_string(),
        title,
        link,
        description,
        pub_date: entry.published.or(entry.updated),
    })
}

/// Whether the article text contains any keyword.
///
/// Keywords must already be lower-cased; matching is a plain substring test
/// on `title + " " + description`, so padded keywords like `" hpp "` keep
/// their spaces.
pub fn is_relevant(article: &Article, keywords: &[String]) -> bool {
    let text = format!("{} {}", article.title, article.description).to_lowercase();
    keywords.iter().any(|k| text.contains(k.as_str()))
}

/// Keep relevant articles, in feed order, up to `max` of them.
pub fn filter_relevant(articles: Vec<Article>, keywords: &[String], max: usize) -> Vec<Article> {
    articles
        .into_iter()
        .filter(|a| is_relevant(a, keywords))
        .take(max)
        .collect()
}

/// Validate a feed URL.
///
/// This function checks that:
/// - The URL uses http or https scheme
/// - Unless `allow_private_hosts` is set, the host is not a private/loopback
///   address or a reserved hostname
pub fn validate_url(url: &str, allow_private_hosts: bool) -> Result<()> {
    let parsed =
        url::Url::parse(url).map_err(|e| PresswatchError::Feed(format!("invalid URL: {}", e)))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => {
            return Err(PresswatchError::Feed(format!(
                "unsupported URL scheme: {}",
                scheme
            )));
        }
    }

    let host = parsed
        .host()
        .ok_or_else(|| PresswatchError::Feed("URL has no host".to_string()))?;

    if allow_private_hosts {
        return Ok(());
    }

    match host {
        url::Host::Domain(domain) => {
            if is_forbidden_hostname(domain) {
                return Err(PresswatchError::Feed(format!("forbidden host: {}", domain)));
            }
        }
        url::Host::Ipv4(ipv4) => {
            let ip = IpAddr::V4(ipv4);
            if is_private_ip(&ip) {
                return Err(PresswatchError::Feed(format!(
                    "private IP address not allowed: {}",
                    ip
                )));
            }
        }
        url::Host::Ipv6(ipv6) => {
            let ip = IpAddr::V6(ipv6);
            if is_private_ip(&ip) {
                return Err(PresswatchError::Feed(format!(
                    "private IP address not allowed: {}",
                    ip
                )));
            }
        }
    }

    Ok(())
}

/// Check if a hostname is forbidden.
fn is_forbidden_hostname(host: &str) -> bool {
    let host_lower = host.to_lowercase();

    if host_lower == "localhost" {
        return true;
    }

    [
        ".local",
        ".localhost",
        ".internal",
        ".intranet",
        ".corp",
        ".home",
        ".lan",
    ]
    .iter()
    .any(|suffix| host_lower.ends_with(suffix))
}

/// Check if an IP address is private/reserved.
fn is_private_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(ipv4) => {
            let octets = ipv4.octets();
            ipv4.is_loopback()
                || ipv4.is_private()
                || ipv4.is_link_local()
                || ipv4.is_broadcast()
                || ipv4.is_unspecified()
                || ipv4.is_documentation()
                // Carrier-grade NAT: 100.64.0.0/10
                || (octets[0] == 100 && (octets[1] & 0xc0) == 64)
        }
        IpAddr::V6(ipv6) => {
            let segments = ipv6.segments();
            ipv6.is_loopback()
                || ipv6.is_unspecified()
                // Unique local: fc00::/7
                || (segments[0] & 0xfe00) == 0xfc00
                // Link-local: fe80::/10
                || (segments[0] & 0xffc0) == 0xfe80
                || ipv6
                    .to_ipv4_mapped()
                    .is_some_and(|v4| is_private_ip(&IpAddr::V4(v4)))
        }
    }
}

/// Strip HTML tags from text.
///
/// Tags become spaces, common entities are decoded and runs of whitespace
/// collapse to a single space.
pub fn strip_html(html: &str) -> String {
    let mut result = String::with_capacity(html.len());
    let mut in_tag = false;
    let mut entity: Option<String> = None;

    for ch in html.chars() {
        if in_tag {
            if ch == '>' {
                in_tag = false;
            }
            continue;
        }

        if let Some(name) = entity.as_mut() {
            if ch == ';' {
                push_entity(&mut result, name);
                entity = None;
                continue;
            }
            if (ch.is_ascii_alphanumeric() || ch == '#') && name.len() < MAX_ENTITY_LEN {
                name.push(ch);
                continue;
            }
            // Not an entity after all
            result.push('&');
            result.push_str(name);
            entity = None;
        }

        match ch {
            '<' => {
                in_tag = true;
                result.push(' ');
            }
            '&' => entity = Some(String::new()),
            _ => result.push(ch),
        }
    }

    if let Some(name) = entity {
        result.push('&');
        result.push_str(&name);
    }

    result.split_whitespace().collect::<Vec<&str>>().join(" ")
}

fn push_entity(out: &mut String, name: &str) {
    match name {
        "amp" => out.push('&'),
        "lt" => out.push('<'),
        "gt" => out.push('>'),
        "quot" => out.push('"'),
        "apos" => out.push('\''),
        "nbsp" => out.push(' '),
        _ => match parse_numeric_entity(name).and_then(char::from_u32) {
            Some(c) => out.push(c),
            None => {
                out.push('&');
                out.push_str(name);
                out.push(';');
            }
        },
    }
}

/// Parse a numeric HTML entity (e.g., "#123" or "#x7B").
fn parse_numeric_entity(entity: &str) -> Option<u32> {
    if let Some(hex) = entity
        .strip_prefix("#x")
        .or_else(|| entity.strip_prefix("#X"))
    {
        u32::from_str_radix(hex, 16).ok()
    } else if let Some(dec) = entity.strip_prefix('#') {
        dec.parse().ok()
    } else {
        None
    }
}

/// Truncate a description to at most `max` characters.
pub fn truncate_description(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn article(title: &str, description: &str) -> Article {
        Article {
            source: "Test".to_string(),
            title: title.to_string(),
            link: format!("https://example.com/{}", title.len()),
            description: description.to_string(),
            pub_date: None,
        }
    }

    fn keywords(list: &[&str]) -> Vec<String> {
        list.iter().map(|k| k.to_lowercase()).collect()
    }

    #[test]
    fn test_validate_url_valid() {
        assert!(validate_url("https://example.com/feed.xml", false).is_ok());
        assert!(validate_url("http://example.com/feed.xml", false).is_ok());
    }

    #[test]
    fn test_validate_url_invalid_scheme() {
        let result = validate_url("ftp://example.com/feed.xml", false);
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("unsupported URL scheme"));

        // Scheme is checked even when private hosts are allowed
        assert!(validate_url("file:///etc/passwd", true).is_err());
    }

    #[test]
    fn test_validate_url_private_hosts() {
        for url in [
            "http://localhost/feed.xml",
            "http://server.local/feed.xml",
            "http://api.internal/feed.xml",
            "http://127.0.0.1/feed.xml",
            "http://10.0.0.1/feed.xml",
            "http://172.16.0.1/feed.xml",
            "http://192.168.1.1/feed.xml",
            "http://169.254.169.254/latest/meta-data/",
            "http://[::1]/feed.xml",
        ] {
            assert!(validate_url(url, false).is_err(), "{url}");
        }
    }

    #[test]
    fn test_validate_url_private_hosts_allowed() {
        assert!(validate_url("http://127.0.0.1:8080/feed.xml", true).is_ok());
        assert!(validate_url("http://localhost/feed.xml", true).is_ok());
    }

    #[test]
    fn test_is_private_ip() {
        assert!(is_private_ip(&"127.0.0.1".parse().unwrap()));
        assert!(is_private_ip(&"100.64.1.1".parse().unwrap()));
        assert!(is_private_ip(&"::ffff:10.0.0.1".parse().unwrap()));
        assert!(is_private_ip(&"fd00::1".parse().unwrap()));
        assert!(!is_private_ip(&"8.8.8.8".parse().unwrap()));
        assert!(!is_private_ip(&"2001:4860:4860::8888".parse().unwrap()));
    }

    #[test]
    fn test_strip_html_basic() {
        assert_eq!(strip_html("<p>Hello <b>World</b></p>"), "Hello World");
        assert_eq!(strip_html("plain"), "plain");
    }

    #[test]
    fn test_strip_html_tags_become_spaces() {
        assert_eq!(strip_html("one<br/>two"), "one two");
    }

    #[test]
    fn test_strip_html_entities() {
        assert_eq!(
            strip_html("Fish &amp; Chips &lt;3 &quot;hot&quot;&nbsp;now"),
            "Fish & Chips <3 \"hot\" now"
        );
        assert_eq!(strip_html("It&#39;s &#x2014; done"), "It's \u{2014} done");
        assert_eq!(strip_html("&unknown;"), "&unknown;");
    }

    #[test]
    fn test_strip_html_bare_ampersand() {
        assert_eq!(strip_html("Salt & Pepper"), "Salt & Pepper");
        assert_eq!(strip_html("AT&T"), "AT&T");
    }

    #[test]
    fn test_strip_html_whitespace() {
        assert_eq!(strip_html("  a\n\n  b\t c  "), "a b c");
    }

    #[test]
    fn test_truncate_description() {
        assert_eq!(truncate_description("short", 400), "short");
        assert_eq!(truncate_description("abcdef", 3), "abc");
        assert_eq!(truncate_description("ééééé", 2), "éé");
        let long = "x".repeat(500);
        assert_eq!(truncate_description(&long, 400).chars().count(), 400);
    }

    #[test]
    fn test_is_relevant() {
        let kw = keywords(&["high pressure processing", " hpp ", "listeria"]);

        assert!(is_relevant(&article("New High Pressure Processing line", ""), &kw));
        assert!(is_relevant(&article("Recall", "Listeria found in cheese"), &kw));
        assert!(is_relevant(&article("Why", "the hpp market grows"), &kw));
        assert!(!is_relevant(&article("HPP", "market update"), &kw));
        assert!(!is_relevant(&article("Bakery news", "bread prices"), &kw));
    }

    #[test]
    fn test_filter_relevant_caps_and_keeps_order() {
        let kw = keywords(&["listeria"]);
        let articles = vec![
            article("listeria a", ""),
            article("nothing", ""),
            article("listeria bb", ""),
            article("listeria ccc", ""),
        ];

        let kept = filter_relevant(articles, &kw, 2);
        let titles: Vec<&str> = kept.iter().map(|a| a.title.as_str()).collect();
        assert_eq!(titles, vec!["listeria a", "listeria bb"]);
    }

    #[test]
    fn test_parse_articles_rss() {
        let rss = r#"<?xml version="1.0"?>
<rss version="2.0">
  <channel>
    <title>Test</title>
    <link>https://example.com</link>
    <description>Test feed</description>
    <item>
      <title>First &amp; foremost</title>
      <link>https://example.com/1</link>
      <description>&lt;p&gt;Body one&lt;/p&gt;</description>
      <pubDate>Mon, 03 Mar 2025 10:00:00 GMT</pubDate>
    </item>
    <item>
      <title></title>
      <link>https://example.com/untitled</link>
    </item>
    <item>
      <title>No date</title>
      <link>https://example.com/3</link>
    </item>
    <item>
      <title>Beyond the limit</title>
      <link>https://example.com/4</link>
    </item>
  </channel>
</rss>"#;

        let source = FeedSource::new("Example", "https://example.com/rss").with_fetch_limit(3);
        let articles = parse_articles(rss.as_bytes(), &source, 400).unwrap();

        assert_eq!(articles.len(), 2);
        assert_eq!(articles[0].source, "Example");
        assert_eq!(articles[0].title, "First & foremost");
        assert_eq!(articles[0].link, "https://example.com/1");
        assert_eq!(articles[0].description, "Body one");
        assert_eq!(
            articles[0].pub_date.unwrap().to_rfc3339(),
            "2025-03-03T10:00:00+00:00"
        );
        assert_eq!(articles[1].title, "No date");
        assert!(articles[1].pub_date.is_none());
    }

    #[test]
    fn test_parse_articles_atom() {
        let atom = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Atom</title>
  <id>urn:uuid:feed</id>
  <updated>2025-01-02T00:00:00Z</updated>
  <entry>
    <title>Atom entry</title>
    <link rel="alternate" href="https://example.com/atom/1"/>
    <id>urn:uuid:1</id>
    <updated>2025-01-02T00:00:00Z</updated>
    <content type="html">&lt;b&gt;Content&lt;/b&gt; only</content>
  </entry>
</feed>"#;

        let source = FeedSource::new("Atom", "https://example.com/atom");
        let articles = parse_articles(atom.as_bytes(), &source, 400).unwrap();

        assert_eq!(articles.len(), 1);
        assert_eq!(articles[0].link, "https://example.com/atom/1");
        assert_eq!(articles[0].description, "Content only");
        assert!(articles[0].pub_date.is_some());
    }

    #[test]
    fn test_parse_articles_invalid() {
        let source = FeedSource::new("Bad", "https://example.com/bad");
        let result = parse_articles(b"not xml at all", &source, 400);
        assert!(result.unwrap_err().to_string().contains("failed to parse feed"));
    }

    struct OneFeed(String);

    #[async_trait::async_trait]
    impl FeedTransport for OneFeed {
        fn name(&self) -> String {
            "one".to_string()
        }

        async fn get(&self, _url: &str) -> Result<Vec<u8>> {
            Ok(self.0.as_bytes().to_vec())
        }
    }

    #[tokio::test]
    async fn test_fetch_matches_keyword_beyond_truncation() {
        let description = format!("{} listeria found", "x".repeat(440));
        let rss = format!(
            r#"<?xml version="1.0"?><rss version="2.0"><channel><title>t</title><link>https://e.com</link><description>d</description><item><title>Plant update</title><link>https://e.com/a</link><description>{description}</description></item><item><title>Other</title><link>https://e.com/b</link><description>nothing here</description></item></channel></rss>"#
        );

        let config = FeedsConfig {
            keywords: vec!["listeria".to_string()],
            max_description_length: 400,
            ..FeedsConfig::default()
        };
        let fetcher = FeedFetcher::with_transport(&config, Box::new(OneFeed(rss)));
        let source = FeedSource::new("Broad", "https://broad.example/rss").filtered();

        let articles = fetcher.fetch(&source).await.unwrap();

        assert_eq!(articles.len(), 1);
        assert_eq!(articles[0].title, "Plant update");
        assert_eq!(articles[0].description.chars().count(), 400);
        assert!(!articles[0].description.contains("listeria"));
    }
}
