use anyhow::Result;
use rand::seq::SliceRandom;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::extractor::ContentExtractor;
use crate::linkedin::LinkedInClient;
use crate::models::{Article, ChatMessage};
use crate::news::NewsClient;
use crate::summarizer::ChatSummarizer;

/// Operator interaction: blocking prompts and status output.
pub trait Console {
    fn read_line(&mut self, prompt: &str) -> Result<String>;
    fn print(&mut self, text: &str);
}

/// The parts of [`Config`] the workflow needs.
#[derive(Debug, Clone)]
pub struct Settings {
    pub preamble: String,
    pub bio: String,
    pub token_limit: u32,
    pub scrape_char_limit: usize,
    pub scrape_pages: bool,
}

impl From<&Config> for Settings {
    fn from(config: &Config) -> Self {
        Self {
            preamble: config.gpt_preamble.clone(),
            bio: config.bio.clone(),
            token_limit: config.gpt_token_limit,
            scrape_char_limit: config.scrape_char_limit,
            scrape_pages: config.scraper,
        }
    }
}

/// Answers supplied up front instead of prompting.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub topic: Option<String>,
    pub assume_yes: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Published { media: usize },
    NoArticles,
    NoSummary,
    Declined,
    PublishFailed(String),
}

pub struct Workflow {
    settings: Settings,
    news: NewsClient,
    extractor: ContentExtractor,
    summarizer: ChatSummarizer,
    linkedin: LinkedInClient,
}

impl Workflow {
    pub fn new(
        settings: Settings,
        news: NewsClient,
        extractor: ContentExtractor,
        summarizer: ChatSummarizer,
        linkedin: LinkedInClient,
    ) -> Self {
        Self {
            settings,
            news,
            extractor,
            summarizer,
            linkedin,
        }
    }

    pub async fn run(&mut self, console: &mut dyn Console, options: RunOptions) -> Result<Outcome> {
        let topic = match options.topic {
            Some(topic) => topic,
            None => console.read_line("\nInput a topic: ")?,
        };
        let topic = topic.trim();

        console.print(&format!("\n📰 Looking up news for \"{}\"...", topic));
        let articles = self.news.top_articles(topic).await?;
        if articles.is_empty() {
            console.print("No articles found for that topic.");
            return Ok(Outcome::NoArticles);
        }
        console.print(&format!("✓ Found {} articles", articles.len()));

        let images = collect_images(&articles);

        let mut content = if self.settings.scrape_pages {
            console.print("\n🌐 Extracting article content...");
            self.scrape_content(&articles).await
        } else {
            direct_content(&articles)
        };
        content.shuffle(&mut rand::rng());

        let messages = build_messages(&self.settings.preamble, &self.settings.bio, &content);

        console.print("\n🤖 Generating post...");
        let text = match self
            .summarizer
            .summarize(&messages, self.settings.token_limit)
            .await
        {
            Ok(Some(text)) => text,
            Ok(None) => {
                error!("Error: gpt response empty");
                return Ok(Outcome::NoSummary);
            }
            Err(e) => {
                error!(error = %e, "Error: gpt response empty");
                return Ok(Outcome::NoSummary);
            }
        };

        console.print(&format!("\n{}", text));

        let confirmed = options.assume_yes || {
            let answer = console.read_line("\nProceed? (y/n): ")?;
            answer.trim().eq_ignore_ascii_case("y")
        };
        if !confirmed {
            console.print("Not posted.");
            return Ok(Outcome::Declined);
        }

        let outcome = match self.linkedin.publish_with_media(&text, &images).await {
            Ok(media) => {
                console.print(&format!("✅ Posted with {} images", media));
                Outcome::Published { media }
            }
            Err(e) => {
                console.print(&format!("⚠ Post failed: {}", e));
                Outcome::PublishFailed(e.to_string())
            }
        };
        info!(?outcome, "Run finished");

        Ok(outcome)
    }

    async fn scrape_content(&self, articles: &[Article]) -> Vec<String> {
        let mut content = Vec::new();
        for article in articles {
            match self
                .extractor
                .fetch_text(&article.url, self.settings.scrape_char_limit)
                .await
            {
                Some(data) => content.push(format_content(&article.url, &data)),
                None => warn!(url = %article.url, "Skipping article without extractable text"),
            }
        }
        content
    }
}

/// One user message: the article URL followed by its text.
pub fn format_content(url: &str, data: &str) -> String {
    format!("url: {}data: {}", url, data)
}

/// Content items built from the text already returned by the news index.
pub fn direct_content(articles: &[Article]) -> Vec<String> {
    articles
        .iter()
        .map(|a| format_content(&a.url, &a.text))
        .collect()
}

/// Preamble and bio as system messages, then one user message per content item.
pub fn build_messages(preamble: &str, bio: &str, content: &[String]) -> Vec<ChatMessage> {
    let mut messages = vec![ChatMessage::system(preamble), ChatMessage::system(bio)];
    messages.extend(content.iter().map(ChatMessage::user));
    messages
}

pub fn collect_images(articles: &[Article]) -> Vec<String> {
    articles.iter().filter_map(|a| a.image.clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;

    fn articles() -> Vec<Article> {
        vec![
            Article::new("A", "u1", Some("i1".to_string())),
            Article::new("B", "u2", Some("i2".to_string())),
        ]
    }

    #[test]
    fn direct_content_joins_url_and_text() {
        assert_eq!(
            direct_content(&articles()),
            vec!["url: u1data: A".to_string(), "url: u2data: B".to_string()]
        );
    }

    #[test]
    fn messages_start_with_preamble_and_bio() {
        let content = direct_content(&articles());
        let messages = build_messages("preamble", "bio", &content);

        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0], ChatMessage::system("preamble"));
        assert_eq!(messages[1], ChatMessage::system("bio"));
        assert!(messages[2..].iter().all(|m| m.role == Role::User));
        assert_eq!(messages[2].content, "url: u1data: A");
    }

    #[test]
    fn images_skip_articles_without_one() {
        let mut list = articles();
        list.push(Article::new("C", "u3", None));
        assert_eq!(collect_images(&list), vec!["i1", "i2"]);
    }
}
