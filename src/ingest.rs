//! Scrape orchestration.
//!
//! Coordinates the acquisition flow: listing → link collection → per-offer
//! extraction → insert-if-new. Offers are visited one at a time with a
//! fixed pause after each; a failure on one offer is logged and the run
//! moves on, unless the database connection itself is gone.

use std::collections::HashSet;

use anyhow::Result;
use tracing::{debug, info, warn};

use job_atlas_core::store::OfferStore;

use crate::browser::{ChromeDriver, PageDriver};
use crate::config::Config;
use crate::db;
use crate::extract::OfferExtractor;
use crate::links::LinkCollector;
use crate::pacing::{Delays, Pacer, TokioPacer};
use crate::sqlite_store::SqliteStore;
use crate::trigger;

/// Counts for one batch of offers.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct IngestReport {
    pub processed: usize,
    pub inserted: usize,
    pub already_known: usize,
    pub failed: usize,
}

enum Outcome {
    Inserted,
    AlreadyKnown,
}

/// Visits offer pages and stores the ones not seen before.
pub struct OfferIngest<'a> {
    driver: &'a dyn PageDriver,
    store: &'a dyn OfferStore,
    extractor: &'a OfferExtractor,
    pacer: &'a dyn Pacer,
    delays: Delays,
}

impl<'a> OfferIngest<'a> {
    pub fn new(
        driver: &'a dyn PageDriver,
        store: &'a dyn OfferStore,
        extractor: &'a OfferExtractor,
        pacer: &'a dyn Pacer,
        delays: Delays,
    ) -> Self {
        Self {
            driver,
            store,
            extractor,
            pacer,
            delays,
        }
    }

    /// Process up to `max_offers` of `urls` in order.
    ///
    /// Returns an error only when the store reports a lost connection.
    pub async fn process(&self, urls: &[String], max_offers: Option<usize>) -> Result<IngestReport> {
        let mut known = match self.store.known_urls().await {
            Ok(urls) => urls,
            Err(e) if e.is_connection_lost() => return Err(e.into()),
            Err(e) => {
                warn!("could not load stored offer URLs, treating all as new: {e:#}");
                HashSet::new()
            }
        };
        info!(candidates = urls.len(), known = known.len(), "processing offers");

        let mut report = IngestReport::default();
        for url in urls.iter().take(max_offers.unwrap_or(usize::MAX)) {
            report.processed += 1;
            let outcome = self.process_one(url, &mut known).await;
            self.pacer.pause(self.delays.offer_delay).await;

            match outcome {
                Ok(Outcome::Inserted) => {
                    report.inserted += 1;
                    info!(url = %url, "offer stored");
                }
                Ok(Outcome::AlreadyKnown) => {
                    report.already_known += 1;
                    debug!(url = %url, "offer already stored");
                }
                Err(e) if db::is_connection_lost(&e) => {
                    warn!(url = %url, "database connection lost, aborting run");
                    return Err(e);
                }
                Err(e) => {
                    report.failed += 1;
                    warn!(url = %url, "offer failed: {e:#}");
                }
            }
        }

        Ok(report)
    }

    async fn process_one(&self, url: &str, known: &mut HashSet<String>) -> Result<Outcome> {
        // Known URLs are still visited and extracted before being discarded
        self.driver.goto(url).await?;
        self.pacer.pause(self.delays.page_settle).await;
        let html = self.driver.content().await?;
        let offer = self.extractor.extract(url, &html);

        if known.contains(url) {
            return Ok(Outcome::AlreadyKnown);
        }
        let inserted = self.store.insert_offer(&offer).await?;
        known.insert(url.to_string());
        Ok(if inserted {
            Outcome::Inserted
        } else {
            Outcome::AlreadyKnown
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct ScrapeOptions {
    pub listing_url: Option<String>,
    pub max_links: Option<usize>,
    pub max_offers: Option<usize>,
    pub fire_trigger: bool,
}

pub async fn run_scrape(config: &Config, opts: &ScrapeOptions) -> Result<()> {
    let pool = db::connect(config).await?;
    let store = SqliteStore::new(pool);
    let extractor = OfferExtractor::new(&config.selectors, config.scrape.max_field_length)?;
    let pacer = TokioPacer;
    let listing_url = opts
        .listing_url
        .clone()
        .unwrap_or_else(|| config.source.listing_url.clone());

    let driver = ChromeDriver::launch(config).await?;
    let result = async {
        let collector = LinkCollector::new(config, &pacer)?;
        let collected = collector
            .collect(&driver, &listing_url, opts.max_links)
            .await?;
        let ingest = OfferIngest::new(
            &driver,
            &store,
            &extractor,
            &pacer,
            Delays::from(&config.pacing),
        );
        let report = ingest.process(&collected.links, opts.max_offers).await?;
        anyhow::Ok((collected, report))
    }
    .await;
    driver.close().await;
    let (collected, report) = result?;

    println!("scrape {}", listing_url);
    println!("  links found: {}", collected.links.len());
    println!("  scroll iterations: {}", collected.iterations);
    println!("  offers processed: {}", report.processed);
    println!("  offers stored: {}", report.inserted);
    println!("  already stored: {}", report.already_known);
    println!("  failed: {}", report.failed);
    println!("ok");

    store.pool().close().await;

    if opts.fire_trigger {
        trigger::invoke_downstream(config).await;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use job_atlas_core::store::memory::InMemoryStore;

    use crate::config::SelectorConfig;
    use crate::pacing::RecordingPacer;

    /// Serves fixed HTML per URL; unknown URLs fail navigation.
    struct FakeSite {
        pages: HashMap<String, String>,
        current: Mutex<Option<String>>,
        visits: Mutex<Vec<String>>,
    }

    impl FakeSite {
        fn new(pages: &[(&str, &str)]) -> Self {
            Self {
                pages: pages
                    .iter()
                    .map(|(u, h)| (u.to_string(), h.to_string()))
                    .collect(),
                current: Mutex::new(None),
                visits: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl PageDriver for FakeSite {
        async fn goto(&self, url: &str) -> Result<()> {
            self.visits.lock().unwrap().push(url.to_string());
            if !self.pages.contains_key(url) {
                anyhow::bail!("navigation timed out");
            }
            *self.current.lock().unwrap() = Some(url.to_string());
            Ok(())
        }

        async fn content(&self) -> Result<String> {
            let current = self.current.lock().unwrap().clone().unwrap_or_default();
            Ok(self.pages.get(&current).cloned().unwrap_or_default())
        }

        async fn scroll_viewport(&self) -> Result<()> {
            Ok(())
        }
    }

    fn page(title: &str) -> String {
        format!("<html><body><h1>{title}</h1></body></html>")
    }

    fn urls(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn delays() -> Delays {
        Delays::from(&crate::config::PacingConfig::default())
    }

    #[tokio::test]
    async fn stores_new_offers_and_skips_known_ones() {
        let a = page("A");
        let b = page("B");
        let site = FakeSite::new(&[("https://j.test/job-offer/a", &a), ("https://j.test/job-offer/b", &b)]);
        let store = InMemoryStore::new();
        let extractor = OfferExtractor::new(&SelectorConfig::default(), None).unwrap();
        let pacer = RecordingPacer::new();
        let ingest = OfferIngest::new(&site, &store, &extractor, &pacer, delays());

        let list = urls(&["https://j.test/job-offer/a", "https://j.test/job-offer/b", "https://j.test/job-offer/a"]);
        let report = ingest.process(&list, None).await.unwrap();
        assert_eq!(report.inserted, 2);
        assert_eq!(report.already_known, 1);

        let again = ingest.process(&list, None).await.unwrap();
        assert_eq!(again.inserted, 0);
        assert_eq!(again.already_known, 3);
        assert_eq!(store.count_offers().await.unwrap(), 2);
        assert_eq!(
            store.offer("https://j.test/job-offer/a").unwrap().title.as_deref(),
            Some("A")
        );
        // known URLs are still visited
        assert_eq!(site.visits.lock().unwrap().len(), 6);
    }

    #[tokio::test]
    async fn navigation_failure_is_isolated_and_paced() {
        let a = page("A");
        let site = FakeSite::new(&[("https://j.test/job-offer/a", &a)]);
        let store = InMemoryStore::new();
        let extractor = OfferExtractor::new(&SelectorConfig::default(), None).unwrap();
        let pacer = RecordingPacer::new();
        let d = delays();
        let ingest = OfferIngest::new(&site, &store, &extractor, &pacer, d);

        let list = urls(&["https://j.test/job-offer/missing", "https://j.test/job-offer/a"]);
        let report = ingest.process(&list, None).await.unwrap();
        assert_eq!(report.failed, 1);
        assert_eq!(report.inserted, 1);
        let offer_pauses = pacer.pauses().iter().filter(|p| **p == d.offer_delay).count();
        assert_eq!(offer_pauses, 2);
    }

    #[tokio::test]
    async fn max_offers_caps_the_batch() {
        let a = page("A");
        let b = page("B");
        let site = FakeSite::new(&[("https://j.test/job-offer/a", &a), ("https://j.test/job-offer/b", &b)]);
        let store = InMemoryStore::new();
        let extractor = OfferExtractor::new(&SelectorConfig::default(), None).unwrap();
        let pacer = RecordingPacer::new();
        let ingest = OfferIngest::new(&site, &store, &extractor, &pacer, delays());

        let list = urls(&["https://j.test/job-offer/a", "https://j.test/job-offer/b"]);
        let report = ingest.process(&list, Some(1)).await.unwrap();
        assert_eq!(report.processed, 1);
        assert_eq!(store.count_offers().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn lost_connection_aborts_the_run() {
        let a = page("A");
        let site = FakeSite::new(&[("https://j.test/job-offer/a", &a)]);
        let store = InMemoryStore::new();
        store.close();
        let extractor = OfferExtractor::new(&SelectorConfig::default(), None).unwrap();
        let pacer = RecordingPacer::new();
        let ingest = OfferIngest::new(&site, &store, &extractor, &pacer, delays());

        let err = ingest
            .process(&urls(&["https://j.test/job-offer/a"]), None)
            .await
            .unwrap_err();
        assert!(db::is_connection_lost(&err));
        assert!(site.visits.lock().unwrap().is_empty());
    }
}
