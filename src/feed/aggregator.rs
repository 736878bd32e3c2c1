//! Merge, deduplicate, order and cap articles from all feeds.

use std::collections::HashSet;

use chrono::{DateTime, Utc};

use super::types::{Article, FeedDocument};

/// Drop later articles whose normalized link was already seen.
pub fn dedup(articles: Vec<Article>) -> Vec<Article> {
    let mut seen = HashSet::new();
    articles
        .into_iter()
        .filter(|a| seen.insert(a.dedup_key().to_string()))
        .collect()
}

/// Stable sort, newest first; undated articles go last.
pub fn sort_newest_first(articles: &mut [Article]) {
    // Option orders None below Some, so reversing puts None last.
    articles.sort_by(|a, b| b.pub_date.cmp(&a.pub_date));
}

/// Run the full aggregation over per-feed batches given in configuration
/// order.
pub fn aggregate(batches: Vec<Vec<Article>>, max_total: usize) -> Vec<Article> {
    let merged: Vec<Article> = batches.into_iter().flatten().collect();
    let mut articles = dedup(merged);
    sort_newest_first(&mut articles);
    articles.truncate(max_total);
    articles
}

/// Wrap aggregated articles in a document stamped with `now`.
pub fn build_document(articles: Vec<Article>, now: DateTime<Utc>) -> FeedDocument {
    FeedDocument {
        updated: now,
        articles,
    }
}
