//! News feed aggregation.
//!
//! Fetches the configured RSS/Atom feeds, keeps the relevant articles,
//! deduplicates and orders them, then writes a JSON document and the inline
//! data block of the static dashboard.

pub mod aggregator;
pub mod fetcher;
pub mod pipeline;
pub mod transport;
pub mod types;
pub mod writer;

pub use aggregator::{aggregate, build_document, dedup, sort_newest_first};
pub use fetcher::{filter_relevant, is_relevant, parse_articles, strip_html, validate_url, FeedFetcher};
pub use pipeline::{run, Pipeline, PipelineReport};
pub use transport::{Direct, FeedTransport, Relay, TransportChain};
pub use types::{dedup_key, Article, FeedDocument};
pub use writer::{inject_html, render_inline_block, splice, write_json, FeedWriter};
