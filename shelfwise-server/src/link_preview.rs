//! Fetches a page and extracts Open Graph / Twitter card metadata for link previews.

use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::OnceLock;
use std::time::Duration;

use regex::{Captures, Regex};
use reqwest::header::CONTENT_TYPE;
use reqwest::{redirect, Client, StatusCode, Url};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

const USER_AGENT: &str = "Shelfwise-LinkPreview";
const MAX_REDIRECTS: usize = 5;

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct LinkPreview {
    pub url: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
    pub site_name: Option<String>,
    pub favicon: Option<String>,
}

impl LinkPreview {
    /// Metadata derivable without looking at the page body.
    pub fn from_url(url: &Url) -> Self {
        Self {
            url: url.to_string(),
            site_name: url.host_str().map(str::to_string),
            favicon: resolve(url, "/favicon.ico"),
            ..Default::default()
        }
    }
}

#[derive(Debug, Error)]
pub enum PreviewError {
    #[error("Only http and https URLs can be previewed: {0}")]
    InvalidUrl(String),

    #[error("Failed to fetch {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} responded with {status}")]
    Status { url: String, status: StatusCode },
}

pub fn parse_url(raw: &str) -> Result<Url, PreviewError> {
    let url = Url::parse(raw.trim()).map_err(|_| PreviewError::InvalidUrl(raw.to_string()))?;
    match url.scheme() {
        "http" | "https" if url.host_str().is_some() => Ok(url),
        _ => Err(PreviewError::InvalidUrl(raw.to_string())),
    }
}

#[derive(Clone)]
pub struct LinkPreviewer {
    client: Client,
    max_bytes: usize,
}

impl LinkPreviewer {
    pub fn new(timeout: Duration, max_bytes: usize) -> reqwest::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .redirect(redirect::Policy::limited(MAX_REDIRECTS))
            .build()?;

        Ok(Self { client, max_bytes })
    }

    pub async fn preview(&self, raw: &str) -> Result<LinkPreview, PreviewError> {
        let url = parse_url(raw)?;
        let fetch_error = |source| PreviewError::Fetch {
            url: url.to_string(),
            source,
        };

        let mut response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(fetch_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(PreviewError::Status {
                url: url.to_string(),
                status,
            });
        }

        // relative links resolve against wherever redirects ended up
        let page_url = response.url().clone();
        let is_html = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map_or(true, |value| value.to_ascii_lowercase().contains("html"));
        if !is_html {
            debug!("Skipping non-HTML body from {page_url}");
            return Ok(LinkPreview {
                url: url.to_string(),
                ..LinkPreview::from_url(&page_url)
            });
        }

        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(fetch_error)? {
            let room = self.max_bytes - body.len();
            body.extend_from_slice(&chunk[..chunk.len().min(room)]);
            if body.len() >= self.max_bytes {
                debug!("Truncated {page_url} after {} bytes", self.max_bytes);
                break;
            }
        }

        let html = String::from_utf8_lossy(&body);
        Ok(LinkPreview {
            url: url.to_string(),
            ..extract(&html, &page_url)
        })
    }
}

fn entity_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"&(#[0-9]{1,7}|#[xX][0-9a-fA-F]{1,6}|[a-zA-Z]+);").expect("entity pattern is valid")
    })
}

fn decode_entities(text: &str) -> Cow<'_, str> {
    entity_pattern().replace_all(text, |caps: &Captures| {
        let decoded = match &caps[1] {
            "amp" => Some('&'),
            "lt" => Some('<'),
            "gt" => Some('>'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            "nbsp" => Some(' '),
            numeric => numeric
                .strip_prefix('#')
                .and_then(|n| match n.strip_prefix(|c| c == 'x' || c == 'X') {
                    Some(hex) => u32::from_str_radix(hex, 16).ok(),
                    None => n.parse().ok(),
                })
                .and_then(char::from_u32),
        };

        match decoded {
            Some(c) if c.is_control() && !c.is_whitespace() => String::new(),
            Some(c) => c.to_string(),
            None => caps[0].to_string(),
        }
    })
}

/// Decodes entities and collapses whitespace; blank text becomes `None`.
fn clean(text: &str) -> Option<String> {
    let collapsed = decode_entities(text)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    (!collapsed.is_empty()).then_some(collapsed)
}

fn resolve(base: &Url, href: &str) -> Option<String> {
    base.join(href.trim())
        .ok()
        .filter(|url| matches!(url.scheme(), "http" | "https"))
        .map(String::from)
}

/// Extracts preview metadata from a page. Relative URLs resolve against `page_url`.
pub fn extract(html: &str, page_url: &Url) -> LinkPreview {
    let dom = match tl::parse(html, tl::ParserOptions::default()) {
        Ok(dom) => dom,
        Err(e) => {
            warn!("Unparseable markup from {page_url}: {e}");
            return LinkPreview::from_url(page_url);
        }
    };
    let parser = dom.parser();

    let mut meta: HashMap<String, String> = HashMap::new();
    let mut title_tag = None;
    let mut icon_href = None;

    for node in dom.nodes() {
        let Some(tag) = node.as_tag() else {
            continue;
        };
        let attributes = tag.attributes();
        let attr = |key: &str| {
            attributes
                .get(key)
                .flatten()
                .map(|value| value.as_utf8_str().into_owned())
        };

        match tag.name().as_utf8_str().to_ascii_lowercase().as_str() {
            "meta" => {
                let key = attr("property").or_else(|| attr("name"));
                if let (Some(key), Some(content)) = (key, attr("content")) {
                    meta.entry(key.trim().to_ascii_lowercase()).or_insert(content);
                }
            }
            "title" if title_tag.is_none() => {
                title_tag = Some(tag.inner_text(parser).into_owned());
            }
            "link" if icon_href.is_none() => {
                let is_icon = attr("rel").is_some_and(|rel| {
                    rel.split_ascii_whitespace()
                        .any(|kind| kind.eq_ignore_ascii_case("icon"))
                });
                if is_icon {
                    icon_href = attr("href");
                }
            }
            _ => {}
        }
    }

    let first = |keys: &[&str]| keys.iter().find_map(|key| meta.get(*key).and_then(|v| clean(v)));
    let fallback = LinkPreview::from_url(page_url);

    LinkPreview {
        url: fallback.url,
        title: first(&["og:title", "twitter:title"])
            .or_else(|| title_tag.as_deref().and_then(clean)),
        description: first(&["og:description", "twitter:description", "description"]),
        image: first(&["og:image", "twitter:image"]).and_then(|src| resolve(page_url, &src)),
        site_name: first(&["og:site_name"]).or(fallback.site_name),
        favicon: icon_href
            .as_deref()
            .and_then(|href| resolve(page_url, href))
            .or(fallback.favicon),
    }
}
