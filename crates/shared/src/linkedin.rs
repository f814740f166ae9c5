//! Client for LinkedIn's private "voyager" API.
//!
//! Authentication rides entirely on browser session cookies. Every request
//! carries the cookie header plus a `csrf-token` equal to the `JSESSIONID`
//! value; refreshed cookies returned by the server are applied in memory and
//! written back through a [`CookieSink`].

use anyhow::Context;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE, SET_COOKIE};
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, error, info, warn};

use crate::io::CookieSink;
use crate::models::MediaItem;
use crate::session::SessionCookies;

pub const BASE_URL: &str = "https://www.linkedin.com";
pub const POST_CHAR_LIMIT: usize = 3000;

const POST_PATH: &str = "/voyager/api/contentcreation/normShares";
const UPLOAD_PATH: &str = "/voyager/api/voyagerVideoDashMediaUploadMetadata?action=upload";

const ACCEPT: &str = "application/vnd.linkedin.normalized+json+2.1";
const JSON_CONTENT_TYPE: &str = "application/json; charset=UTF-8";
const MEDIA_TYPE_FAMILY: &str = "media-type-family";
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/119.0.0.0 Safari/537.36 Edg/119.0.0.0";

#[derive(Debug, thiserror::Error)]
pub enum PostError {
    #[error("post is {len} characters, the limit is {limit}")]
    ContentTooLong { len: usize, limit: usize },
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server returned {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("invalid header value: {0}")]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),
    #[error("unexpected upload response: {0}")]
    MalformedUpload(String),
    #[error("none of the {attempted} media files could be uploaded")]
    NoMediaUploaded { attempted: usize },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SharePayload<'a> {
    visible_to_connections_only: bool,
    external_audience_providers: Vec<String>,
    #[serde(rename = "commentaryV2")]
    commentary: Commentary<'a>,
    origin: &'a str,
    allowed_commenters_scope: &'a str,
    post_state: &'a str,
    media: &'a [MediaItem],
}

#[derive(Serialize)]
struct Commentary<'a> {
    text: &'a str,
    attributes: Vec<serde_json::Value>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UploadRequest<'a> {
    media_upload_type: &'a str,
    file_size: usize,
    filename: &'a str,
}

#[derive(Deserialize)]
struct UploadEnvelope {
    data: UploadData,
}

#[derive(Deserialize)]
struct UploadData {
    value: UploadSlot,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadSlot {
    single_upload_url: String,
    #[serde(default)]
    single_upload_headers: HashMap<String, String>,
    urn: String,
}

/// Per-request header variations. Everything else derives from the cookies.
#[derive(Debug, Clone, Copy)]
struct RequestContext<'a> {
    content_type: &'a str,
    media_type_family: Option<&'a str>,
}

impl Default for RequestContext<'_> {
    fn default() -> Self {
        Self {
            content_type: JSON_CONTENT_TYPE,
            media_type_family: None,
        }
    }
}

pub struct LinkedInClient {
    client: Client,
    base_url: String,
    cookies: SessionCookies,
    sink: Box<dyn CookieSink>,
}

impl LinkedInClient {
    pub fn new(cookies: SessionCookies, sink: Box<dyn CookieSink>) -> anyhow::Result<Self> {
        Self::with_base_url(cookies, sink, BASE_URL)
    }

    pub fn with_base_url(
        cookies: SessionCookies,
        sink: Box<dyn CookieSink>,
        base_url: impl Into<String>,
    ) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            cookies,
            sink,
        })
    }

    pub fn cookies(&self) -> &SessionCookies {
        &self.cookies
    }

    fn headers(&self, ctx: RequestContext<'_>) -> Result<HeaderMap, PostError> {
        let mut headers = HeaderMap::new();
        headers.insert("accept", HeaderValue::from_static(ACCEPT));
        headers.insert("accept-language", HeaderValue::from_static("en-US,en;q=0.9"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_str(ctx.content_type)?);
        headers.insert(
            "csrf-token",
            HeaderValue::from_str(self.cookies.csrf_token().unwrap_or_default())?,
        );
        headers.insert("origin", HeaderValue::from_str(&self.base_url)?);
        headers.insert("cookie", HeaderValue::from_str(&self.cookies.header_value())?);
        headers.insert(
            "referer",
            HeaderValue::from_str(&format!("{}/feed/", self.base_url))?,
        );
        headers.insert("user-agent", HeaderValue::from_static(USER_AGENT));
        if let Some(family) = ctx.media_type_family {
            headers.insert(
                HeaderName::from_static(MEDIA_TYPE_FAMILY),
                HeaderValue::from_str(family)?,
            );
        }
        Ok(headers)
    }

    /// Publish a post with the given media attached.
    ///
    /// Text over [`POST_CHAR_LIMIT`] characters is rejected before anything
    /// is sent. Failures are logged here; callers decide whether to care.
    pub async fn publish(&mut self, text: &str, media: &[MediaItem]) -> Result<(), PostError> {
        let result = self.try_publish(text, media).await;
        match &result {
            Ok(()) => info!(media = media.len(), "Posted to LinkedIn"),
            Err(e) => error!(error = %e, "Error posting to LinkedIn"),
        }
        result
    }

    async fn try_publish(&mut self, text: &str, media: &[MediaItem]) -> Result<(), PostError> {
        check_length(text)?;

        let payload = SharePayload {
            visible_to_connections_only: false,
            external_audience_providers: Vec::new(),
            commentary: Commentary {
                text,
                attributes: Vec::new(),
            },
            origin: "FEED",
            allowed_commenters_scope: "ALL",
            post_state: "PUBLISHED",
            media,
        };

        let response = self
            .client
            .post(format!("{}{}", self.base_url, POST_PATH))
            .headers(self.headers(RequestContext::default())?)
            .json(&payload)
            .send()
            .await?;
        let response = ensure_success(response).await?;

        self.refresh_session(response.headers());
        Ok(())
    }

    /// Upload every file in `file_urls` and publish `text` with the ones that
    /// made it. Returns the number of attached media items.
    ///
    /// An empty list publishes text only. If every upload fails nothing is
    /// posted and [`PostError::NoMediaUploaded`] is returned. Text over the
    /// limit is rejected before any file is uploaded.
    pub async fn publish_with_media(
        &mut self,
        text: &str,
        file_urls: &[String],
    ) -> Result<usize, PostError> {
        if let Err(err) = check_length(text) {
            error!(error = %err, "Error posting to LinkedIn");
            return Err(err);
        }

        if file_urls.is_empty() {
            self.publish(text, &[]).await?;
            return Ok(0);
        }

        let mut media_items = Vec::new();
        for file_url in file_urls {
            match self.upload_image(file_url).await {
                Ok(item) => {
                    debug!(file_url = %file_url, urn = %item.media_urn, "Uploaded image");
                    media_items.push(item);
                }
                Err(e) => error!(file_url = %file_url, error = %e, "Error posting file to LinkedIn"),
            }
        }

        if media_items.is_empty() {
            let err = PostError::NoMediaUploaded {
                attempted: file_urls.len(),
            };
            error!(error = %err, "Skipping post");
            return Err(err);
        }

        self.publish(text, &media_items).await?;
        Ok(media_items.len())
    }

    async fn upload_image(&mut self, file_url: &str) -> Result<MediaItem, PostError> {
        let download = self.client.get(file_url).send().await?;
        let download = ensure_success(download).await?;

        let content_type = download
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("application/octet-stream")
            .to_string();
        let bytes = download.bytes().await?;
        let filename = file_name(file_url);

        let request = UploadRequest {
            media_upload_type: "IMAGE_SHARING",
            file_size: bytes.len(),
            filename: &filename,
        };

        let response = self
            .client
            .post(format!("{}{}", self.base_url, UPLOAD_PATH))
            .headers(self.headers(RequestContext::default())?)
            .json(&request)
            .send()
            .await?;
        let response = ensure_success(response).await?;
        self.refresh_session(response.headers());

        let body = response.text().await?;
        let slot = serde_json::from_str::<UploadEnvelope>(&body)
            .map_err(|e| PostError::MalformedUpload(e.to_string()))?
            .data
            .value;

        let ctx = RequestContext {
            content_type: &content_type,
            media_type_family: slot
                .single_upload_headers
                .get(MEDIA_TYPE_FAMILY)
                .map(String::as_str),
        };
        let upload = self
            .client
            .put(&slot.single_upload_url)
            .headers(self.headers(ctx)?)
            .body(bytes)
            .send()
            .await?;
        ensure_success(upload).await?;

        Ok(MediaItem::image(slot.urn))
    }

    /// Ping the site with the current session and pick up refreshed cookies.
    pub async fn check_session(&mut self) -> Result<bool, PostError> {
        let response = self
            .client
            .get(format!("{}/", self.base_url))
            .headers(self.headers(RequestContext::default())?)
            .send()
            .await?;
        let response = ensure_success(response).await?;
        Ok(self.refresh_session(response.headers()))
    }

    /// Apply refreshed session cookies from a response and persist them if
    /// anything changed. Returns true on change.
    pub fn refresh_session(&mut self, headers: &HeaderMap) -> bool {
        let values = headers
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok());
        if !self.cookies.refresh_from(values) {
            return false;
        }

        match self.sink.persist(&self.cookies) {
            Ok(()) => info!("Cookies updated in config file"),
            Err(e) => warn!(error = %e, "Error updating config file; keeping refreshed cookies in memory"),
        }
        true
    }
}

fn check_length(text: &str) -> Result<(), PostError> {
    let len = text.chars().count();
    if len > POST_CHAR_LIMIT {
        return Err(PostError::ContentTooLong {
            len,
            limit: POST_CHAR_LIMIT,
        });
    }
    Ok(())
}

async fn ensure_success(response: Response) -> Result<Response, PostError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(PostError::Status { status, body })
}

/// Last path segment of `file_url`, used as the upload filename.
fn file_name(file_url: &str) -> String {
    let from_url = url::Url::parse(file_url).ok().and_then(|u| {
        u.path_segments()
            .and_then(|mut segments| segments.next_back().map(str::to_string))
    });
    from_url
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| file_url.rsplit('/').next().unwrap_or(file_url).to_string())
}
