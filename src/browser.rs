//! Headless browser access.
//!
//! The pipeline only needs three things from a browser: navigate, read the
//! rendered HTML, and scroll one viewport. [`PageDriver`] captures that so
//! link collection and offer extraction can be driven by canned HTML in
//! tests. [`ChromeDriver`] is the real implementation over a single
//! Chromium tab.

use std::future::Future;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::Page;
use futures::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::config::Config;

#[async_trait]
pub trait PageDriver: Send + Sync {
    /// Load `url` and wait for it to finish loading.
    async fn goto(&self, url: &str) -> Result<()>;

    /// Current rendered document as HTML.
    async fn content(&self) -> Result<String>;

    /// Scroll down by one viewport height.
    async fn scroll_viewport(&self) -> Result<()>;
}

async fn with_timeout<T, F>(limit: Duration, what: &str, fut: F) -> Result<T>
where
    F: Future<Output = std::result::Result<T, chromiumoxide::error::CdpError>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(Ok(v)) => Ok(v),
        Ok(Err(e)) => Err(anyhow!("{what} failed: {e}")),
        Err(_) => Err(anyhow!("{what} timed out after {}s", limit.as_secs_f32())),
    }
}

/// One Chromium tab plus the task pumping its CDP event stream.
pub struct ChromeDriver {
    browser: Browser,
    page: Page,
    handler: JoinHandle<()>,
    navigation_timeout: Duration,
    read_timeout: Duration,
}

impl ChromeDriver {
    pub async fn launch(config: &Config) -> Result<Self> {
        let mut builder = BrowserConfig::builder()
            .request_timeout(config.scrape.navigation_timeout())
            .window_size(1920, 1080);
        if !config.source.headless {
            builder = builder.with_head();
        }
        let browser_config = builder
            .build()
            .map_err(|e| anyhow!("invalid browser config: {e}"))?;

        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .context("Failed to launch Chromium")?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("browser handler stopped: {e}");
                    break;
                }
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .context("Failed to open browser tab")?;

        Ok(Self {
            browser,
            page,
            handler,
            navigation_timeout: config.scrape.navigation_timeout(),
            read_timeout: config.scrape.read_timeout(),
        })
    }

    /// Close the tab and the browser process.
    pub async fn close(mut self) {
        if let Err(e) = self.page.clone().close().await {
            debug!("closing tab: {e}");
        }
        if let Err(e) = self.browser.close().await {
            warn!("closing browser: {e}");
        }
        let _ = self.browser.wait().await;
        self.handler.abort();
    }
}

#[async_trait]
impl PageDriver for ChromeDriver {
    async fn goto(&self, url: &str) -> Result<()> {
        let page = &self.page;
        with_timeout(self.navigation_timeout, "navigation", async {
            page.goto(url).await?;
            page.wait_for_navigation().await?;
            Ok(())
        })
        .await
    }

    async fn content(&self) -> Result<String> {
        with_timeout(self.navigation_timeout, "content read", self.page.content()).await
    }

    async fn scroll_viewport(&self) -> Result<()> {
        with_timeout(
            self.read_timeout,
            "scroll",
            self.page.evaluate("window.scrollBy(0, window.innerHeight)"),
        )
        .await
        .map(|_| ())
    }
}
