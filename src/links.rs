//! Offer link discovery on an infinite-scroll listing.
//!
//! The listing renders more offers as it is scrolled. [`LinkCollector`]
//! scrolls one viewport at a time, reading every matching anchor after each
//! settle, until nothing new appears for `max_idle_scrolls` reads in a row,
//! the caller's link cap is reached, or `max_scrolls` iterations have run.

use anyhow::{Context, Result};
use indexmap::IndexSet;
use scraper::{Html, Selector};
use tracing::{debug, info, warn};
use url::Url;

use crate::browser::PageDriver;
use crate::config::Config;
use crate::pacing::{Delays, Pacer};

/// Why collection stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Idle,
    LimitReached,
    ScrollCeiling,
}

#[derive(Debug, Clone)]
pub struct CollectedLinks {
    /// Absolute URLs in discovery order.
    pub links: Vec<String>,
    /// Read/scroll iterations performed.
    pub iterations: usize,
    pub stop: StopReason,
}

pub struct LinkCollector<'a> {
    origin: Url,
    pattern: String,
    max_scrolls: usize,
    max_idle: usize,
    delays: Delays,
    pacer: &'a dyn Pacer,
}

impl<'a> LinkCollector<'a> {
    pub fn new(config: &Config, pacer: &'a dyn Pacer) -> Result<Self> {
        let origin = Url::parse(&config.source.origin)
            .with_context(|| format!("invalid source origin: {}", config.source.origin))?;
        Ok(Self {
            origin,
            pattern: config.source.link_pattern.clone(),
            max_scrolls: config.scrape.max_scrolls,
            max_idle: config.scrape.max_idle_scrolls,
            delays: Delays::from(&config.pacing),
            pacer,
        })
    }

    /// Open `listing_url` and collect offer links from it.
    pub async fn collect(
        &self,
        driver: &dyn PageDriver,
        listing_url: &str,
        max_links: Option<usize>,
    ) -> Result<CollectedLinks> {
        driver
            .goto(listing_url)
            .await
            .with_context(|| format!("Failed to open listing {listing_url}"))?;
        self.pacer.pause(self.delays.initial_settle).await;

        let mut seen: IndexSet<String> = IndexSet::new();
        let mut idle = 0;
        let mut iterations = 0;
        let mut stop = StopReason::ScrollCeiling;

        while iterations < self.max_scrolls {
            iterations += 1;
            self.pacer.pause(self.delays.settle).await;

            let found = match driver.content().await {
                Ok(html) => offer_links(&html, &self.pattern, &self.origin),
                Err(e) => {
                    warn!(iteration = iterations, "listing read failed: {e:#}");
                    Vec::new()
                }
            };

            let before = seen.len();
            seen.extend(found);
            let added = seen.len() - before;
            debug!(iteration = iterations, added, total = seen.len(), "listing scroll");

            if added > 0 {
                idle = 0;
            } else {
                idle += 1;
                if idle >= self.max_idle {
                    stop = StopReason::Idle;
                    break;
                }
            }

            if max_links.is_some_and(|max| seen.len() >= max) {
                stop = StopReason::LimitReached;
                break;
            }

            if let Err(e) = driver.scroll_viewport().await {
                warn!(iteration = iterations, "scroll failed: {e:#}");
            }
            self.pacer.pause(self.delays.scroll_pause).await;
        }

        let mut links: Vec<String> = seen.into_iter().collect();
        if let Some(max) = max_links {
            links.truncate(max);
        }
        info!(links = links.len(), iterations, ?stop, "link collection finished");

        Ok(CollectedLinks {
            links,
            iterations,
            stop,
        })
    }
}

/// Every anchor in `html` whose `href` contains `pattern`, resolved against
/// `origin`, deduplicated in document order. Anchors that cannot be
/// resolved are skipped.
pub fn offer_links(html: &str, pattern: &str, origin: &Url) -> Vec<String> {
    let doc = Html::parse_document(html);
    let Ok(anchors) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    let mut out: IndexSet<String> = IndexSet::new();
    for anchor in doc.select(&anchors) {
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        if !href.contains(pattern) {
            continue;
        }
        match origin.join(href.trim()) {
            Ok(url) => {
                out.insert(url.to_string());
            }
            Err(e) => debug!(href, "skipping unresolvable link: {e}"),
        }
    }
    out.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::pacing::RecordingPacer;

    fn origin() -> Url {
        Url::parse("https://justjoin.it").unwrap()
    }

    fn page(paths: &[&str]) -> String {
        let anchors: String = paths
            .iter()
            .map(|p| format!("<a href=\"{p}\">offer</a>"))
            .collect();
        format!("<html><body><nav><a href=\"/about\">About</a></nav>{anchors}</body></html>")
    }

    /// Serves a scripted sequence of listing snapshots, repeating the last.
    struct ScriptedListing {
        snapshots: Vec<String>,
        reads: AtomicUsize,
        scrolls: AtomicUsize,
        visited: Mutex<Vec<String>>,
    }

    impl ScriptedListing {
        fn new(snapshots: Vec<String>) -> Self {
            Self {
                snapshots,
                reads: AtomicUsize::new(0),
                scrolls: AtomicUsize::new(0),
                visited: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl PageDriver for ScriptedListing {
        async fn goto(&self, url: &str) -> Result<()> {
            self.visited.lock().unwrap().push(url.to_string());
            Ok(())
        }

        async fn content(&self) -> Result<String> {
            let n = self.reads.fetch_add(1, Ordering::SeqCst);
            let idx = n.min(self.snapshots.len() - 1);
            Ok(self.snapshots[idx].clone())
        }

        async fn scroll_viewport(&self) -> Result<()> {
            self.scrolls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn test_config() -> Config {
        toml::from_str("[db]\npath = \"unused.db\"\n").unwrap()
    }

    #[test]
    fn offer_links_resolves_relative_and_filters() {
        let html = page(&[
            "/job-offer/acme-rust-dev",
            "https://justjoin.it/job-offer/beta-go-dev",
            "/job-offer/acme-rust-dev",
        ]);
        let links = offer_links(&html, "/job-offer/", &origin());
        assert_eq!(
            links,
            vec![
                "https://justjoin.it/job-offer/acme-rust-dev",
                "https://justjoin.it/job-offer/beta-go-dev",
            ]
        );
    }

    #[tokio::test]
    async fn stops_after_three_idle_reads() {
        let driver = ScriptedListing::new(vec![
            page(&["/job-offer/a"]),
            page(&["/job-offer/a", "/job-offer/b"]),
        ]);
        let pacer = RecordingPacer::new();
        let config = test_config();
        let collector = LinkCollector::new(&config, &pacer).unwrap();

        let out = collector
            .collect(&driver, "https://justjoin.it/", None)
            .await
            .unwrap();

        assert_eq!(out.stop, StopReason::Idle);
        // two productive reads, then exactly three empty deltas
        assert_eq!(out.iterations, 5);
        assert_eq!(driver.reads.load(Ordering::SeqCst), 5);
        assert_eq!(driver.scrolls.load(Ordering::SeqCst), 4);
        assert_eq!(out.links.len(), 2);
        assert_eq!(*driver.visited.lock().unwrap(), vec!["https://justjoin.it/"]);
    }

    #[tokio::test]
    async fn idle_counter_resets_on_new_links() {
        let driver = ScriptedListing::new(vec![
            page(&["/job-offer/a"]),
            page(&["/job-offer/a"]),
            page(&["/job-offer/a"]),
            page(&["/job-offer/a", "/job-offer/b"]),
        ]);
        let pacer = RecordingPacer::new();
        let config = test_config();
        let collector = LinkCollector::new(&config, &pacer).unwrap();

        let out = collector.collect(&driver, "https://justjoin.it/", None).await.unwrap();
        assert_eq!(out.stop, StopReason::Idle);
        assert_eq!(out.iterations, 7);
        assert_eq!(out.links.len(), 2);
    }

    #[tokio::test]
    async fn never_exceeds_scroll_ceiling() {
        let snapshots: Vec<String> = (0..20)
            .map(|i| {
                let paths: Vec<String> = (0..=i).map(|j| format!("/job-offer/{j}")).collect();
                let refs: Vec<&str> = paths.iter().map(String::as_str).collect();
                page(&refs)
            })
            .collect();
        let driver = ScriptedListing::new(snapshots);
        let pacer = RecordingPacer::new();
        let config = test_config();
        let collector = LinkCollector::new(&config, &pacer).unwrap();

        let out = collector.collect(&driver, "https://justjoin.it/", None).await.unwrap();
        assert_eq!(out.stop, StopReason::ScrollCeiling);
        assert_eq!(out.iterations, 10);
        assert_eq!(driver.reads.load(Ordering::SeqCst), 10);
        assert_eq!(out.links.len(), 10);
    }

    #[tokio::test]
    async fn stops_and_truncates_at_link_cap() {
        let driver = ScriptedListing::new(vec![page(&[
            "/job-offer/a",
            "/job-offer/b",
            "/job-offer/c",
        ])]);
        let pacer = RecordingPacer::new();
        let config = test_config();
        let collector = LinkCollector::new(&config, &pacer).unwrap();

        let out = collector.collect(&driver, "https://justjoin.it/", Some(2)).await.unwrap();
        assert_eq!(out.stop, StopReason::LimitReached);
        assert_eq!(out.iterations, 1);
        assert_eq!(
            out.links,
            vec!["https://justjoin.it/job-offer/a", "https://justjoin.it/job-offer/b"]
        );
    }

    #[tokio::test]
    async fn paces_each_iteration() {
        let driver = ScriptedListing::new(vec![page(&[])]);
        let pacer = RecordingPacer::new();
        let config = test_config();
        let collector = LinkCollector::new(&config, &pacer).unwrap();
        collector.collect(&driver, "https://justjoin.it/", None).await.unwrap();

        let delays = Delays::from(&config.pacing);
        let pauses = pacer.pauses();
        assert_eq!(pauses[0], delays.initial_settle);
        assert_eq!(pauses[1], delays.settle);
        assert_eq!(pauses[2], delays.scroll_pause);
        // three idle iterations: settle + scroll pause, except no scroll after the last
        assert_eq!(pauses.len(), 1 + 3 + 2);
    }
}
