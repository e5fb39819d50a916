//! Legacy document retrieval.
//!
//! Projudi serves docket attachments as standalone pre-UTF-8 HTML pages.
//! They are fetched with a single GET, decoded as windows-1252 and reduced
//! to plain text.

use std::sync::LazyLock;
#[cfg(feature = "fetch")]
use std::time::Duration;

use encoding_rs::WINDOWS_1252;
use regex::Regex;
#[cfg(feature = "fetch")]
use reqwest::Client;
#[cfg(feature = "fetch")]
use tracing::debug;
use url::Url;

use crate::text::{html_to_text, strip_script_tags};
use crate::{Result, ScrapeError};

static BODY: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?is)<body.*</body>").unwrap());

/// HTTP client configuration for legacy document fetches.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Request timeout in seconds.
    pub timeout: u64,
    /// Custom User-Agent string.
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self { timeout: 30, user_agent: "Mozilla/5.0 (compatible; juscrape/0.1)".to_string() }
    }
}

/// Source of legacy document bytes.
///
/// [`HttpFetcher`] is the production implementation; tests provide canned
/// responses.
#[allow(async_fn_in_trait)]
pub trait LegacyFetcher {
    /// Fetches the raw body at `url`.
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeError::DocumentFetch`] for non-2xx responses.
    async fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

/// Fetcher backed by reqwest.
#[cfg(feature = "fetch")]
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    config: FetchConfig,
}

#[cfg(feature = "fetch")]
impl HttpFetcher {
    pub fn new(config: FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout))
            .build()
            .map_err(ScrapeError::HttpError)?;
        Ok(Self { client, config })
    }
}

#[cfg(feature = "fetch")]
impl LegacyFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let parsed_url = Url::parse(url).map_err(|e| ScrapeError::InvalidUrl(e.to_string()))?;
        debug!(url, "fetching legacy document");

        let response = self
            .client
            .get(parsed_url)
            .header("User-Agent", &self.config.user_agent)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() { ScrapeError::Timeout { timeout: self.config.timeout } } else { ScrapeError::HttpError(e) }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScrapeError::DocumentFetch { url: url.to_string(), status: status.as_u16() });
        }

        Ok(response.bytes().await?.to_vec())
    }
}

/// A fetcher for offline runs; every call fails with
/// [`ScrapeError::FetchDisabled`].
#[derive(Debug, Clone, Copy, Default)]
pub struct NoFetch;

impl LegacyFetcher for NoFetch {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        Err(ScrapeError::FetchDisabled { url: url.to_string() })
    }
}

/// Decodes windows-1252 bytes.
pub fn decode_windows_1252(bytes: &[u8]) -> String {
    let (text, _, _) = WINDOWS_1252.decode(bytes);
    text.into_owned()
}

/// Plain text of a legacy HTML page.
///
/// Only the `<body>` element is kept (the whole page is wrapped in one when
/// it has none), scripts are removed and the rest is rendered to text.
pub fn legacy_body_text(html: &str) -> String {
    let body = match BODY.find(html) {
        Some(found) => found.as_str().to_string(),
        None => format!("<body>{}</body>", html),
    };
    html_to_text(&strip_script_tags(&body), &[])
}

/// Fetches a legacy document and returns its text.
pub async fn fetch_legacy_text<F: LegacyFetcher + ?Sized>(fetcher: &F, url: &str) -> Result<String> {
    let bytes = fetcher.fetch(url).await?;
    Ok(legacy_body_text(&decode_windows_1252(&bytes)))
}

/// Resolves a possibly relative `href` against the page URL.
pub fn resolve_url(base: &str, href: &str) -> Result<String> {
    let base = Url::parse(base).map_err(|e| ScrapeError::InvalidUrl(e.to_string()))?;
    base.join(href).map(String::from).map_err(|e| ScrapeError::InvalidUrl(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Canned(Vec<u8>);

    impl LegacyFetcher for Canned {
        async fn fetch(&self, _url: &str) -> Result<Vec<u8>> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn test_fetch_config_default() {
        let config = FetchConfig::default();
        assert_eq!(config.timeout, 30);
        assert!(config.user_agent.contains("juscrape"));
    }

    #[test]
    fn test_decode_windows_1252() {
        let bytes = b"Peti\xe7\xe3o \x96 a\xe7\xe3o";
        assert_eq!(decode_windows_1252(bytes), "Petição – ação");
    }

    #[test]
    fn test_legacy_body_text() {
        let html = "<html><head><title>x</title></head><body><script>alert(1)</script><p>Vistos.</p>\n\n<p>Cite-se.</p></body></html>";
        assert_eq!(legacy_body_text(html), "Vistos.\nCite-se.");

        assert_eq!(legacy_body_text("<p>Sem corpo</p>"), "Sem corpo");
    }

    #[tokio::test]
    async fn test_fetch_legacy_text() {
        let fetcher = Canned(b"<body><p>Decis\xe3o</p></body>".to_vec());
        let text = fetch_legacy_text(&fetcher, "https://projudi.tjba.jus.br/online.html").await.unwrap();
        assert_eq!(text, "Decisão");
    }

    #[tokio::test]
    async fn test_no_fetch() {
        let result = fetch_legacy_text(&NoFetch, "https://projudi.tjba.jus.br/online.html").await;
        assert!(matches!(result, Err(ScrapeError::FetchDisabled { .. })));
    }

    #[test]
    fn test_resolve_url() {
        let base = "https://projudi.tjba.jus.br/projudi/listagens/DadosProcesso?numeroProcesso=1";
        assert_eq!(
            resolve_url(base, "/projudi/arquivo/online.html").unwrap(),
            "https://projudi.tjba.jus.br/projudi/arquivo/online.html"
        );
        assert!(resolve_url("not-a-url", "x").is_err());
    }

    #[cfg(feature = "fetch")]
    #[tokio::test]
    async fn test_http_fetcher_invalid_url() {
        let fetcher = HttpFetcher::new(FetchConfig::default()).unwrap();
        assert!(matches!(fetcher.fetch("not-a-url").await, Err(ScrapeError::InvalidUrl(_))));
    }
}
