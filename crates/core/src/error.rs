//! Error types for case extraction.
//!
//! This module defines [`ScrapeError`], which covers every way an extraction
//! can stop: the expected "not a case page" signal, fatal markup surprises,
//! readiness waits that never settle, and legacy document fetch failures.
//!
//! Best-effort field misses are *not* errors: getters return `Ok(None)` or an
//! empty collection for those.
//!
//! # Example
//!
//! ```rust
//! use juscrape_core::{ScrapeError, Result};
//!
//! fn required(value: Option<String>, selector: &str) -> Result<String> {
//!     value.ok_or_else(|| ScrapeError::MissingNode { selector: selector.to_string() })
//! }
//!
//! assert!(required(None, "#Partes").is_err());
//! ```

use std::time::Duration;
use thiserror::Error;

/// Main error type for extraction operations.
#[derive(Error, Debug)]
pub enum ScrapeError {
    /// HTTP request errors from reqwest.
    #[cfg(feature = "fetch")]
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Legacy document request timeout.
    #[error("Request timed out after {timeout} seconds")]
    Timeout { timeout: u64 },

    /// Invalid URL provided or found in the page.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Invalid CSS selector or unparseable markup.
    #[error("Failed to parse HTML: {0}")]
    HtmlParseError(String),

    /// A date string did not match the system's locale format.
    #[error("Invalid date: {0}")]
    InvalidDate(String),

    /// The page is not a case-detail page.
    ///
    /// This is a control-flow signal: [`crate::fetch_case_info`] swallows it
    /// without logging.
    #[error("The page \"{url}\" is not a case homepage")]
    NotHomepage { url: String },

    /// The page is a known utility page of the court system (viewer, loader,
    /// download endpoint) and is skipped silently.
    #[error("The page \"{url}\" is an ignored utility page")]
    IgnoredPage { url: String },

    /// An anchor node every other extraction step depends on is missing.
    #[error("Checkpoint \"{name}\" not found ({selector})")]
    MissingCheckpoint { name: &'static str, selector: String },

    /// A node the extraction cannot continue without is missing.
    #[error("Required node not found: {selector}")]
    MissingNode { selector: String },

    /// A readiness wait exceeded its deadline.
    #[error("Timed out after {waited:?} waiting for \"{selector}\"")]
    ReadinessTimeout { selector: String, waited: Duration },

    /// The caller cancelled the extraction.
    #[error("Extraction cancelled")]
    Cancelled,

    /// Document fetching is switched off for this adapter.
    #[error("Document fetching is disabled: {url}")]
    FetchDisabled { url: String },

    /// The legacy document endpoint answered with a non-2xx status.
    #[error("Could not fetch document {url}: HTTP {status}")]
    DocumentFetch { url: String, status: u16 },
}

impl ScrapeError {
    /// True for the silent "not a case page" outcomes.
    pub fn is_not_homepage(&self) -> bool {
        matches!(self, ScrapeError::NotHomepage { .. } | ScrapeError::IgnoredPage { .. })
    }

    /// True when running the same extraction again may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ScrapeError::ReadinessTimeout { .. } | ScrapeError::Timeout { .. })
    }
}

/// Result type alias for ScrapeError.
pub type Result<T> = std::result::Result<T, ScrapeError>;
