use anyhow::{Context, Result};
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::page::Page;
use futures::StreamExt;

use crate::engine::cdp::CdpDocument;

/// A launched Chrome with the single page every action runs against.
pub struct BrowserSession {
    browser: Browser,
    handler_task: tokio::task::JoinHandle<()>,
    page: Page,
}

impl BrowserSession {
    /// Launch Chrome and open a blank page.
    pub async fn launch(headless: bool) -> Result<Self> {
        let mut builder = BrowserConfig::builder();

        if !headless {
            builder = builder.with_head();
        }

        builder = builder
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .arg("--disable-background-networking")
            .arg("--disable-default-apps")
            .arg("--disable-extensions")
            .arg("--disable-popup-blocking")
            .arg("--disable-sync")
            .arg("--disable-translate")
            .window_size(1280, 720);

        let config = builder.build().map_err(|e| anyhow::anyhow!("{}", e))?;

        let (browser, mut handler) =
            Browser::launch(config).await.context("Failed to launch Chrome")?;

        let handler_task = tokio::spawn(async move {
            while let Some(_event) = handler.next().await {}
        });

        let page = browser
            .new_page("about:blank")
            .await
            .context("Failed to create initial page")?;

        tracing::info!("Browser session started (headless: {})", headless);

        Ok(Self {
            browser,
            handler_task,
            page,
        })
    }

    /// The active page seen through the document-engine interface.
    pub fn document(&self) -> CdpDocument {
        CdpDocument::new(self.page.clone())
    }

    pub async fn close(mut self) -> Result<()> {
        self.browser.close().await.context("Failed to close Chrome")?;
        self.handler_task.abort();
        tracing::info!("Browser session closed");
        Ok(())
    }
}
