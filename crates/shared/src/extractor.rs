use anyhow::{Context, Result};
use reqwest::Client;
use tracing::{debug, warn};

/// Width passed to html2text; lines are re-joined afterwards.
const RENDER_WIDTH: usize = 200;

pub struct ContentExtractor {
    client: Client,
}

impl ContentExtractor {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .user_agent("Mozilla/5.0 (compatible; NewsPoster/1.0)")
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client })
    }

    /// Visible text of the page at `url`, capped at `max_chars` characters.
    ///
    /// Best effort: any failure is logged and yields `None`.
    pub async fn fetch_text(&self, url: &str, max_chars: usize) -> Option<String> {
        match self.try_fetch(url).await {
            Ok(Some(text)) => {
                let text = truncate_chars(&text, max_chars);
                debug!(url, chars = text.chars().count(), "Extracted page text");
                Some(text)
            }
            Ok(None) => {
                warn!(url, "No usable text on page");
                None
            }
            Err(e) => {
                warn!(url, error = %e, "Failed to fetch page");
                None
            }
        }
    }

    async fn try_fetch(&self, url: &str) -> Result<Option<String>> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to send HTTP request")?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("HTTP error: {}", status);
        }

        let html = response.text().await.context("Failed to read response body")?;
        let text = html_to_text(&html);

        if text.is_empty() {
            return Ok(None);
        }

        Ok(Some(text))
    }
}

/// Render HTML to plain text with whitespace collapsed to single spaces.
pub fn html_to_text(html: &str) -> String {
    let rendered = html2text::from_read(html.as_bytes(), RENDER_WIDTH);
    rendered.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// First `max_chars` characters of `text`.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => text[..end].to_string(),
        None => text.to_string(),
    }
}
