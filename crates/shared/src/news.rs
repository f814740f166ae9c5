use anyhow::{Context, Result};
use chrono::{Duration, NaiveDate, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::models::Article;

pub const DEFAULT_BASE_URL: &str = "https://eventregistry.org/api/v1";

/// Articles are restricted to sources located here.
const SOURCE_LOCATION_URI: &str = "http://en.wikipedia.org/wiki/United_States";
/// Concept whose articles are excluded from every lookup.
const EXCLUDED_CONCEPT: &str = "Stock Market";
const MAX_ARTICLES: usize = 5;

#[derive(Debug, Deserialize)]
struct ConceptSuggestion {
    uri: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ArticleQuery<'a> {
    action: &'a str,
    concept_uri: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    ignore_concept_uri: Option<&'a str>,
    source_location_uri: Vec<&'a str>,
    date_start: String,
    articles_sort_by: &'a str,
    articles_sort_by_asc: bool,
    articles_count: usize,
    result_type: &'a str,
    api_key: &'a str,
}

#[derive(Debug, Deserialize)]
struct ArticlesResponse {
    articles: ArticlePage,
}

#[derive(Debug, Deserialize)]
struct ArticlePage {
    #[serde(default)]
    results: Vec<RawArticle>,
}

#[derive(Debug, Deserialize)]
struct RawArticle {
    #[serde(default)]
    body: String,
    url: String,
    #[serde(default)]
    image: Option<String>,
}

impl From<RawArticle> for Article {
    fn from(raw: RawArticle) -> Self {
        let image = raw.image.filter(|i| !i.trim().is_empty());
        Article::new(raw.body, raw.url, image)
    }
}

/// Client for the Event Registry article index.
pub struct NewsClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl NewsClient {
    pub fn new(api_key: String) -> Result<Self> {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(api_key: String, base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            api_key,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// The index's concept URI for `label`, if it knows one.
    pub async fn concept_uri(&self, label: &str) -> Result<Option<String>> {
        let url = format!(
            "{}/suggestConceptsFast?prefix={}&lang=eng&apiKey={}",
            self.base_url,
            urlencoding::encode(label),
            urlencoding::encode(&self.api_key)
        );

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("Failed to query concept suggestions")?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| String::from("unknown error"));
            anyhow::bail!("News API returned error: {} - {}", status, error_text);
        }

        let suggestions = response
            .json::<Vec<ConceptSuggestion>>()
            .await
            .context("Failed to parse concept suggestions")?;

        Ok(suggestions.into_iter().next().map(|s| s.uri))
    }

    /// Top articles of the last day about `topic`, most important sources first.
    pub async fn top_articles(&self, topic: &str) -> Result<Vec<Article>> {
        let concept = self
            .concept_uri(topic)
            .await?
            .with_context(|| format!("No concept found for topic: {}", topic))?;
        info!(topic, concept = %concept, "Resolved topic");

        let excluded = self.concept_uri(EXCLUDED_CONCEPT).await?;
        if excluded.is_none() {
            warn!("Could not resolve excluded concept {:?}; not filtering it", EXCLUDED_CONCEPT);
        }

        let query = ArticleQuery {
            action: "getArticles",
            concept_uri: &concept,
            ignore_concept_uri: excluded.as_deref(),
            source_location_uri: vec![SOURCE_LOCATION_URI],
            date_start: date_start(Utc::now().date_naive()),
            articles_sort_by: "sourceImportance",
            articles_sort_by_asc: false,
            articles_count: MAX_ARTICLES,
            result_type: "articles",
            api_key: &self.api_key,
        };

        let response = self
            .client
            .post(format!("{}/article/getArticles", self.base_url))
            .json(&query)
            .send()
            .await
            .context("Failed to fetch articles")?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| String::from("unknown error"));
            anyhow::bail!("News API returned error: {} - {}", status, error_text);
        }

        let page = response
            .json::<ArticlesResponse>()
            .await
            .context("Failed to parse article results")?;

        let articles: Vec<Article> = page
            .articles
            .results
            .into_iter()
            .take(MAX_ARTICLES)
            .map(Article::from)
            .collect();
        debug!(count = articles.len(), "Fetched articles");

        Ok(articles)
    }
}

/// Start of the trailing one-day window.
fn date_start(today: NaiveDate) -> String {
    (today - Duration::days(1)).format("%Y-%m-%d").to_string()
}
