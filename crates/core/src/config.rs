use std::time::Duration;

use crate::fetch::FetchConfig;

/// Configuration for one extraction.
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use juscrape_core::ScrapeConfig;
///
/// let config = ScrapeConfig::builder()
///     .wait_timeout(Duration::from_secs(10))
///     .fetch_documents(false)
///     .build();
/// assert_eq!(config.poll_interval, Duration::from_millis(250));
/// ```
#[derive(Debug, Clone)]
pub struct ScrapeConfig {
    /// Delay between readiness polls (default: 250 ms).
    pub poll_interval: Duration,

    /// Delay between polls of a nested frame that is loading (default: 350 ms).
    pub frame_poll_interval: Duration,

    /// Extra pause after a frame settled, before reading it (default: 250 ms).
    pub settle_delay: Duration,

    /// Upper bound of every readiness wait (default: 30 s).
    pub wait_timeout: Duration,

    /// Whether docket documents are retrieved (default: true).
    ///
    /// When false, observations only carry the text shown in the timeline.
    pub fetch_documents: bool,

    /// Whether PDF documents shown in an embedded viewer are read (default: false).
    pub read_pdf_viewer: bool,

    /// HTTP settings for legacy document fetches.
    pub fetch: FetchConfig,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(250),
            frame_poll_interval: Duration::from_millis(350),
            settle_delay: Duration::from_millis(250),
            wait_timeout: Duration::from_secs(30),
            fetch_documents: true,
            read_pdf_viewer: false,
            fetch: FetchConfig::default(),
        }
    }
}

impl ScrapeConfig {
    /// Creates a new builder for ScrapeConfig.
    pub fn builder() -> ScrapeConfigBuilder {
        ScrapeConfigBuilder::new()
    }
}

/// Builder for ScrapeConfig.
pub struct ScrapeConfigBuilder {
    config: ScrapeConfig,
}

impl ScrapeConfigBuilder {
    /// Creates a new builder with default values.
    pub fn new() -> Self {
        Self { config: ScrapeConfig::default() }
    }

    pub fn poll_interval(mut self, value: Duration) -> Self {
        self.config.poll_interval = value;
        self
    }

    pub fn frame_poll_interval(mut self, value: Duration) -> Self {
        self.config.frame_poll_interval = value;
        self
    }

    pub fn settle_delay(mut self, value: Duration) -> Self {
        self.config.settle_delay = value;
        self
    }

    pub fn wait_timeout(mut self, value: Duration) -> Self {
        self.config.wait_timeout = value;
        self
    }

    pub fn fetch_documents(mut self, value: bool) -> Self {
        self.config.fetch_documents = value;
        self
    }

    pub fn read_pdf_viewer(mut self, value: bool) -> Self {
        self.config.read_pdf_viewer = value;
        self
    }

    pub fn fetch(mut self, value: FetchConfig) -> Self {
        self.config.fetch = value;
        self
    }

    /// Builds the config.
    pub fn build(self) -> ScrapeConfig {
        self.config
    }
}

impl Default for ScrapeConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
