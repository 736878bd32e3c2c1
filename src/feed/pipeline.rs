//! One feed refresh run: fetch all feeds, aggregate, write artifacts.

use chrono::Utc;
use futures::future::join_all;
use tracing::{error, info, warn};

use super::aggregator::{aggregate, build_document};
use super::fetcher::FeedFetcher;
use super::types::FeedDocument;
use super::writer::FeedWriter;
use crate::config::{FeedSource, FeedsConfig};
use crate::error::{PresswatchError, Result};

/// What happened during a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineReport {
    /// Feeds fetched and parsed successfully.
    pub feeds_ok: usize,
    /// Feeds that failed.
    pub feeds_failed: usize,
    /// Articles in the written document.
    pub articles: usize,
    /// Label and error message of each failed feed.
    pub failures: Vec<(String, String)>,
}

impl PipelineReport {
    /// True when there were feeds and none of them succeeded.
    pub fn all_failed(&self) -> bool {
        self.feeds_ok == 0 && self.feeds_failed > 0
    }
}

/// The feed refresh pipeline.
pub struct Pipeline {
    fetcher: FeedFetcher,
    writer: FeedWriter,
    sources: Vec<FeedSource>,
    max_total: usize,
    fail_when_all_feeds_fail: bool,
}

impl Pipeline {
    /// Build a pipeline from configuration.
    pub fn from_config(config: &FeedsConfig) -> Result<Self> {
        Ok(Self::new(
            config,
            FeedFetcher::from_config(config)?,
            FeedWriter::from_config(config),
        ))
    }

    /// Build a pipeline with an explicit fetcher and writer.
    pub fn new(config: &FeedsConfig, fetcher: FeedFetcher, writer: FeedWriter) -> Self {
        Self {
            fetcher,
            writer,
            sources: config.sources.clone(),
            max_total: config.max_total,
            fail_when_all_feeds_fail: config.fail_when_all_feeds_fail,
        }
    }

    /// Fetch every feed concurrently and aggregate the results.
    ///
    /// Results are merged in configuration order regardless of which fetch
    /// finished first. Per-feed failures are logged and counted.
    pub async fn collect(&self) -> (FeedDocument, PipelineReport) {
        let results = join_all(self.sources.iter().map(|s| self.fetcher.fetch(s))).await;

        let mut report = PipelineReport::default();
        let mut batches = Vec::with_capacity(results.len());

        for (source, result) in self.sources.iter().zip(results) {
            match result {
                Ok(articles) => {
                    info!(
                        feed = %source.label,
                        articles = articles.len(),
                        filtered = source.filtered,
                        "OK"
                    );
                    report.feeds_ok += 1;
                    batches.push(articles);
                }
                Err(e) => {
                    warn!(feed = %source.label, error = %e, "ERR");
                    report.feeds_failed += 1;
                    report.failures.push((source.label.clone(), e.to_string()));
                }
            }
        }

        let articles = aggregate(batches, self.max_total);
        report.articles = articles.len();

        info!(
            articles = report.articles,
            feeds_ok = report.feeds_ok,
            feeds_failed = report.feeds_failed,
            "Total"
        );

        (build_document(articles, Utc::now()), report)
    }

    /// Run once: collect, then write both artifacts.
    ///
    /// Only local failures (I/O, missing markers) are errors, plus the
    /// every-feed-failed case when configured to treat it as one. In that
    /// case the previous artifacts are left untouched.
    pub async fn run(&self) -> Result<PipelineReport> {
        let (doc, report) = self.collect().await;

        if report.all_failed() {
            error!(feeds = report.feeds_failed, "Every feed failed");
            if self.fail_when_all_feeds_fail {
                return Err(PresswatchError::Feed(format!(
                    "all {} feeds failed",
                    report.feeds_failed
                )));
            }
        }

        self.writer.write(&doc)?;
        Ok(report)
    }
}

/// Run the pipeline described by `config` once.
pub async fn run(config: &FeedsConfig) -> Result<PipelineReport> {
    Pipeline::from_config(config)?.run().await
}
