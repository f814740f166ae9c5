use serde::{Deserialize, Serialize};

/// A news article as returned by the news lookup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    pub text: String,
    pub url: String,
    pub image: Option<String>,
}

impl Article {
    pub fn new(text: impl Into<String>, url: impl Into<String>, image: Option<String>) -> Self {
        Self {
            text: text.into(),
            url: url.into(),
            image,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One role-tagged message handed to the summarizer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MediaCategory {
    Image,
    Video,
    Document,
}

/// An uploaded piece of media, ready to be attached to a post
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaItem {
    pub category: MediaCategory,
    pub media_urn: String,
    pub tap_targets: Vec<serde_json::Value>,
}

impl MediaItem {
    pub fn image(media_urn: impl Into<String>) -> Self {
        Self {
            category: MediaCategory::Image,
            media_urn: media_urn.into(),
            tap_targets: Vec::new(),
        }
    }
}
