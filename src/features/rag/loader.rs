use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;

use super::{chunker, RagError};

lazy_static! {
    static ref TITLE_RE: Regex = Regex::new(r"(?is)<title[^>]*>(.*?)</title>").unwrap();
    static ref SCRIPT_STYLE_RE: Regex =
        Regex::new(r"(?is)<script[^>]*>.*?</script>|<style[^>]*>.*?</style>").unwrap();
    static ref TAG_RE: Regex = Regex::new(r"(?s)<[^>]+>").unwrap();
    static ref WHITESPACE_RE: Regex = Regex::new(r"\s+").unwrap();
}

/// A fetched document reduced to ordered chunks plus its title.
#[derive(Debug, Clone)]
pub struct LoadedDocument {
    pub title: String,
    pub chunks: Vec<String>,
}

/// Ingestion collaborator: fetches a source document and splits it into
/// ordered, embedding-ready chunks.
#[async_trait]
pub trait DocumentLoader: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<LoadedDocument, RagError>;
}

/// Checks the URL host against the allow-list: the domain itself or any
/// subdomain of it. Non-http(s) and unparseable URLs are rejected.
pub fn url_is_allowed(url: &str, allowed_domains: &[String]) -> bool {
    let Ok(parsed) = reqwest::Url::parse(url) else {
        return false;
    };
    if !matches!(parsed.scheme(), "http" | "https") {
        return false;
    }
    let Some(host) = parsed.host_str() else {
        return false;
    };

    allowed_domains
        .iter()
        .any(|domain| host == domain.as_str() || host.ends_with(&format!(".{domain}")))
}

/// Fetches a web page over HTTP, strips the markup and chunks the text.
pub struct HttpPageLoader {
    client: reqwest::Client,
    allowed_domains: Vec<String>,
    chunk_size: usize,
    chunk_overlap: usize,
}

impl HttpPageLoader {
    pub fn new(
        client: reqwest::Client,
        allowed_domains: Vec<String>,
        chunk_size: usize,
        chunk_overlap: usize,
    ) -> Self {
        Self {
            client,
            allowed_domains,
            chunk_size,
            chunk_overlap,
        }
    }
}

#[async_trait]
impl DocumentLoader for HttpPageLoader {
    async fn fetch(&self, url: &str) -> Result<LoadedDocument, RagError> {
        if !url_is_allowed(url, &self.allowed_domains) {
            return Err(RagError::Load(format!("URL is not allow-listed: {url}")));
        }

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| RagError::Load(format!("Could not load the URL: {url}. Error: {e}")))?;

        if !response.status().is_success() {
            return Err(RagError::Load(format!(
                "Could not load the URL: {url}. Status: {}",
                response.status()
            )));
        }

        let html = response
            .text()
            .await
            .map_err(|e| RagError::Load(format!("Could not read the response body: {e}")))?;

        let title = extract_title(&html).unwrap_or_else(|| "Untitled document".to_string());
        let text = extract_text(&html);
        if text.is_empty() {
            return Err(RagError::Load(format!("Document has no text content: {url}")));
        }

        Ok(LoadedDocument {
            title,
            chunks: chunker::chunk_text(&text, self.chunk_size, self.chunk_overlap),
        })
    }
}

fn extract_title(html: &str) -> Option<String> {
    TITLE_RE
        .captures(html)
        .map(|captures| WHITESPACE_RE.replace_all(captures[1].trim(), " ").to_string())
        .filter(|title| !title.is_empty())
}

fn extract_text(html: &str) -> String {
    let without_scripts = SCRIPT_STYLE_RE.replace_all(html, " ");
    let without_tags = TAG_RE.replace_all(&without_scripts, " ");
    WHITESPACE_RE.replace_all(without_tags.trim(), " ").to_string()
}
