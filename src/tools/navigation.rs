use anyhow::{Context, Result};
use chromiumoxide::page::Page;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, schemars::JsonSchema)]
pub struct NavigateParams {
    #[schemars(description = "URL to navigate to")]
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct NavigateResult {
    pub url: String,
    pub title: String,
}

/// Load `url` and report where the page ended up. Elements the page renders
/// later are the element tools' job to wait for.
pub async fn navigate(page: &Page, params: &NavigateParams) -> Result<NavigateResult> {
    tracing::info!("Navigating to: {}", params.url);
    page.goto(&params.url)
        .await
        .with_context(|| format!("Failed to navigate to {}", params.url))?;

    let url = page.url().await?.unwrap_or_default();
    let title = page.get_title().await?.unwrap_or_default();

    Ok(NavigateResult { url, title })
}
