//! Feed pipeline types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A normalized news item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    /// Label of the feed the article came from.
    pub source: String,
    /// Title, tags stripped.
    pub title: String,
    /// Link to the full article.
    pub link: String,
    /// Summary, tags stripped and length-capped.
    pub description: String,
    /// Publication date, if the feed gave a parseable one.
    #[serde(rename = "pubDate")]
    pub pub_date: Option<DateTime<Utc>>,
}

impl Article {
    /// Key used to recognize the same story under different link variants.
    pub fn dedup_key(&self) -> &str {
        dedup_key(&self.link)
    }
}

/// Normalize a link for deduplication: the query string and trailing
/// slashes are dropped.
///
/// ```
/// use presswatch::feed::dedup_key;
///
/// assert_eq!(dedup_key("https://x.com/a/?utm=1"), "https://x.com/a");
/// assert_eq!(dedup_key("https://x.com/a//"), "https://x.com/a");
/// ```
pub fn dedup_key(link: &str) -> &str {
    let without_query = link.split('?').next().unwrap_or(link);
    without_query.trim_end_matches('/')
}

/// The aggregated output of one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedDocument {
    /// When the document was generated (UTC).
    pub updated: DateTime<Utc>,
    /// Articles, newest first.
    pub articles: Vec<Article>,
}
