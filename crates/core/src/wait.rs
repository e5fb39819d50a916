//! Readiness waits for pages that are still loading.
//!
//! Court systems inject most of their content asynchronously, and several
//! fields only appear after a simulated click. [`wait_for`] polls a
//! [`Page`] until a node (or its text) shows up, resolving immediately when
//! the condition already holds. Every wait is bounded by a timeout and
//! observes a [`CancelToken`], so a frame that never loads surfaces as
//! [`ScrapeError::ReadinessTimeout`] instead of hanging the extraction.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;
use tracing::debug;

use crate::page::{Page, ReadyState};
use crate::parse::Document;
use crate::{Result, ScrapeConfig, ScrapeError};

/// Cooperative cancellation shared between a caller and an extraction.
///
/// # Example
///
/// ```rust
/// use juscrape_core::CancelToken;
///
/// let token = CancelToken::new();
/// let handle = token.clone();
/// handle.cancel();
/// assert!(token.is_cancelled());
/// ```
#[derive(Debug, Clone)]
pub struct CancelToken {
    sender: Arc<watch::Sender<bool>>,
}

impl CancelToken {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(false);
        Self { sender: Arc::new(sender) }
    }

    /// Requests cancellation; every clone observes it.
    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.sender.borrow()
    }

    /// Resolves once [`cancel`](Self::cancel) has been called.
    pub async fn cancelled(&self) {
        let mut receiver = self.sender.subscribe();
        let _ = receiver.wait_for(|cancelled| *cancelled).await;
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Options for [`wait_for`].
#[derive(Debug, Clone)]
pub struct WaitOptions {
    /// Search inside the document of this frame, falling back to the outer
    /// page while the frame has no document.
    pub frame: Option<String>,
    /// Require non-empty text content (whitespace counts), not just presence.
    pub require_text: bool,
    /// Selector of the node to return once the condition holds
    /// (defaults to the awaited selector).
    pub return_selector: Option<String>,
    /// Delay between polls.
    pub interval: Duration,
    /// Upper bound for the whole wait.
    pub timeout: Duration,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            frame: None,
            require_text: false,
            return_selector: None,
            interval: Duration::from_millis(250),
            timeout: Duration::from_secs(30),
        }
    }
}

impl WaitOptions {
    /// Default options with the interval and timeout of `config`.
    pub fn from_config(config: &ScrapeConfig) -> Self {
        Self { interval: config.poll_interval, timeout: config.wait_timeout, ..Default::default() }
    }

    pub fn in_frame(mut self, selector: impl Into<String>) -> Self {
        self.frame = Some(selector.into());
        self
    }

    pub fn require_text(mut self) -> Self {
        self.require_text = true;
        self
    }

    pub fn returning(mut self, selector: impl Into<String>) -> Self {
        self.return_selector = Some(selector.into());
        self
    }

    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// An owned copy of a node found by a wait.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeSnapshot {
    pub outer_html: String,
    pub inner_html: String,
    pub text: String,
}

impl NodeSnapshot {
    /// Parses the node's outer markup as a detached fragment.
    pub fn document(&self) -> Result<Document> {
        Document::parse_fragment(&self.outer_html)
    }
}

/// Waits until `selector` is satisfied on `page`.
///
/// Returns the node matched by the return selector (or `None` if that one
/// does not match) as soon as the awaited condition holds. The first check
/// happens before any sleep.
///
/// # Errors
///
/// - [`ScrapeError::ReadinessTimeout`] when `options.timeout` elapses.
/// - [`ScrapeError::Cancelled`] when `cancel` fires.
/// - [`ScrapeError::HtmlParseError`] for invalid selectors.
pub async fn wait_for(
    page: &dyn Page, selector: &str, options: &WaitOptions, cancel: &CancelToken,
) -> Result<Option<NodeSnapshot>> {
    let started = Instant::now();
    let mut polls = 0usize;

    loop {
        if cancel.is_cancelled() {
            return Err(ScrapeError::Cancelled);
        }

        if let Some(found) = evaluate(page, selector, options)? {
            if polls > 0 {
                debug!(selector, polls, waited = ?started.elapsed(), "readiness wait satisfied");
            }
            return Ok(found);
        }

        let waited = started.elapsed();
        if waited >= options.timeout {
            return Err(ScrapeError::ReadinessTimeout { selector: selector.to_string(), waited });
        }

        polls += 1;
        let nap = options.interval.min(options.timeout - waited);
        tokio::select! {
            _ = tokio::time::sleep(nap) => {}
            _ = cancel.cancelled() => return Err(ScrapeError::Cancelled),
        }
    }
}

/// One readiness check: `Some(result)` when satisfied, `None` otherwise.
fn evaluate(page: &dyn Page, selector: &str, options: &WaitOptions) -> Result<Option<Option<NodeSnapshot>>> {
    let nested = match &options.frame {
        Some(frame) => page.frame(frame)?,
        None => None,
    };
    let doc = match nested {
        Some(frame) => frame.document()?,
        None => page.document()?,
    };

    let satisfied = match doc.select_first(selector)? {
        Some(awaited) if options.require_text => !awaited.text().is_empty(),
        Some(_) => true,
        None => false,
    };
    if !satisfied {
        return Ok(None);
    }

    let target = options.return_selector.as_deref().unwrap_or(selector);
    Ok(Some(doc.select_first(target)?.map(|el| NodeSnapshot {
        outer_html: el.outer_html(),
        inner_html: el.inner_html(),
        text: el.text(),
    })))
}

/// Waits for the frame hosted by `frame_selector` to finish loading.
///
/// Sleeps one interval first (the frame is usually being replaced by the
/// click that preceded the wait), then polls until the frame reports a
/// complete ready state *and* its body child count is unchanged since the
/// previous poll.
pub async fn wait_for_frame_settled(
    page: &dyn Page, frame_selector: &str, options: &WaitOptions, cancel: &CancelToken,
) -> Result<Document> {
    let started = Instant::now();
    let mut last_len: Option<usize> = None;

    loop {
        tokio::select! {
            _ = tokio::time::sleep(options.interval) => {}
            _ = cancel.cancelled() => return Err(ScrapeError::Cancelled),
        }

        let frame = page.frame(frame_selector)?;
        if let Some(frame) = frame {
            let doc = frame.document()?;
            let len = Some(doc.body_children_count());
            let settled = frame.ready_state == ReadyState::Complete && len == last_len;
            last_len = len;
            if settled {
                debug!(frame = frame_selector, waited = ?started.elapsed(), "frame settled");
                return Ok(doc);
            }
        } else {
            last_len = None;
        }

        let waited = started.elapsed();
        if waited >= options.timeout {
            return Err(ScrapeError::ReadinessTimeout { selector: frame_selector.to_string(), waited });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::{FrameSnapshot, Mutation, ScriptedPage};

    const URL: &str = "https://pje.trt5.jus.br/pjekz/processo/123/detalhe";

    #[tokio::test(start_paused = true)]
    async fn test_already_present_resolves_without_polling() {
        let page = ScriptedPage::new(URL, "<span class='test'>ok</span>");
        let started = Instant::now();

        let found = wait_for(&page, "span.test", &WaitOptions::default(), &CancelToken::new())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(found.text, "ok");
        assert_eq!(page.reads(), 1);
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_waits_for_injected_node() {
        let page = ScriptedPage::new(URL, "<div></div>");
        page.mutate(Mutation::replace_html("<div><span class='test'>late</span></div>").after(Duration::from_secs(1)));

        let started = Instant::now();
        let found = wait_for(&page, "span.test", &WaitOptions::default(), &CancelToken::new())
            .await
            .unwrap();

        assert_eq!(found.unwrap().text, "late");
        assert!(started.elapsed() >= Duration::from_secs(1));
        assert!(page.reads() > 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_require_text() {
        let page = ScriptedPage::new(URL, "<mat-card-content><span></span></mat-card-content>");
        page.mutate(
            Mutation::replace_html("<mat-card-content><span>Despacho</span></mat-card-content>")
                .after(Duration::from_millis(700)),
        );

        let options = WaitOptions::default().require_text();
        let found = wait_for(&page, "mat-card-content > span", &options, &CancelToken::new())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.text, "Despacho");
    }

    #[tokio::test(start_paused = true)]
    async fn test_require_text_accepts_whitespace() {
        let page = ScriptedPage::new(URL, "<mat-card-content><span> </span></mat-card-content>");
        let started = Instant::now();

        let options = WaitOptions::default().require_text();
        let found = wait_for(&page, "mat-card-content > span", &options, &CancelToken::new())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.text, " ");
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_returning_other_selector() {
        let page = ScriptedPage::new(URL, "<div id='processo'><div class='d'><ul></ul></div></div>");
        let options = WaitOptions::default().returning("#processo > div");

        let found = wait_for(&page, "ul", &options, &CancelToken::new()).await.unwrap().unwrap();
        assert!(found.outer_html.starts_with("<div class=\"d\">"));

        let missing = wait_for(&page, "ul", &WaitOptions::default().returning("#nada"), &CancelToken::new())
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_searches_nested_frame_with_fallback() {
        let page = ScriptedPage::new(URL, "<object id='viewer'></object><div id='viewer-text'>fora</div>");

        let options = WaitOptions::default().in_frame("#viewer");
        let outer = wait_for(&page, "#viewer-text", &options, &CancelToken::new()).await.unwrap().unwrap();
        assert_eq!(outer.text, "fora");

        page.mutate(Mutation::set_frame("#viewer", FrameSnapshot::complete("<div id='viewer-text'>dentro</div>")));
        let inner = wait_for(&page, "#viewer-text", &options, &CancelToken::new()).await.unwrap().unwrap();
        assert_eq!(inner.text, "dentro");
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout() {
        let page = ScriptedPage::new(URL, "<div></div>");
        let options = WaitOptions::default().timeout(Duration::from_secs(2));

        let result = wait_for(&page, "span.never", &options, &CancelToken::new()).await;
        match result {
            Err(ScrapeError::ReadinessTimeout { selector, waited }) => {
                assert_eq!(selector, "span.never");
                assert_eq!(waited, Duration::from_secs(2));
            }
            other => panic!("expected timeout, got {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation() {
        let page = ScriptedPage::new(URL, "<div></div>");
        let cancel = CancelToken::new();
        let trigger = cancel.clone();

        let options = WaitOptions::default();
        let (result, _) = tokio::join!(wait_for(&page, "span.never", &options, &cancel), async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            trigger.cancel();
        });

        assert!(matches!(result, Err(ScrapeError::Cancelled)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_frame_settles_after_loading() {
        let page = ScriptedPage::new(URL, "<iframe id='frameHtml'></iframe>")
            .with_frame("#frameHtml", FrameSnapshot::loading("<body><p>a</p></body>"));
        page.mutate(
            Mutation::set_frame("#frameHtml", FrameSnapshot::complete("<body><p>a</p><p>b</p></body>"))
                .after(Duration::from_secs(1)),
        );

        let options = WaitOptions::default().interval(Duration::from_millis(350));
        let doc = wait_for_frame_settled(&page, "#frameHtml", &options, &CancelToken::new()).await.unwrap();
        assert_eq!(doc.body_children_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_frame_never_loads() {
        let page = ScriptedPage::new(URL, "<iframe id='frameHtml'></iframe>");
        let options = WaitOptions::default().interval(Duration::from_millis(350)).timeout(Duration::from_secs(3));

        let result = wait_for_frame_settled(&page, "#frameHtml", &options, &CancelToken::new()).await;
        assert!(matches!(result, Err(ScrapeError::ReadinessTimeout { .. })));
    }
}
