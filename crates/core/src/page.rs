//! The live page seam.
//!
//! Extraction never owns the page: an external agent (a browser, a test, the
//! CLI) has already navigated to it. [`Page`] is the narrow surface the
//! engine needs from that agent: the URL, a markup snapshot of the outer
//! document, snapshots of nested sub-documents (iframes, embedded viewers),
//! and simulated clicks.
//!
//! [`ScriptedPage`] implements [`Page`] over saved markup. Clicks and
//! timers can be scripted to mutate it, which is how the readiness waiter and
//! the click-driven docket extraction are exercised offline.

use std::cell::RefCell;
use std::collections::HashMap;
use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

use crate::parse::Document;
use crate::{Result, ScrapeError};

/// `document.readyState` of a nested frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadyState {
    Loading,
    Interactive,
    #[default]
    Complete,
}

/// Markup of a nested sub-document at one point in time.
#[derive(Debug, Clone)]
pub struct FrameSnapshot {
    pub html: String,
    pub ready_state: ReadyState,
}

impl FrameSnapshot {
    /// A fully loaded frame.
    pub fn complete(html: impl Into<String>) -> Self {
        Self { html: html.into(), ready_state: ReadyState::Complete }
    }

    /// A frame still loading.
    pub fn loading(html: impl Into<String>) -> Self {
        Self { html: html.into(), ready_state: ReadyState::Loading }
    }

    /// Parses the frame markup.
    pub fn document(&self) -> Result<Document> {
        Document::parse(&self.html)
    }
}

/// A live HTML document the extraction runs against.
///
/// Implementations may change between calls: every call observes the page
/// as it is *now*. `click` has real side effects (in-page navigation), so
/// callers must not interleave clicks from different extractions.
pub trait Page {
    /// The URL the page was navigated to.
    fn url(&self) -> String;

    /// Current markup of the outer document.
    fn html(&self) -> Result<String>;

    /// Current content of the nested document hosted by the first element
    /// matching `selector`, or `None` when that element is absent or has no
    /// document yet.
    fn frame(&self, selector: &str) -> Result<Option<FrameSnapshot>>;

    /// Simulates a click on the first element matching `selector`.
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeError::MissingNode`] if nothing matches.
    fn click(&self, selector: &str) -> Result<()>;

    /// Parses the current outer markup.
    fn document(&self) -> Result<Document> {
        Document::parse(&self.html()?)
    }
}

/// A scripted change to a [`ScriptedPage`].
#[derive(Debug, Clone)]
pub enum Mutation {
    /// Replace the whole outer markup.
    ReplaceHtml(String),
    /// Attach (or replace) the document of a nested frame.
    SetFrame { selector: String, frame: FrameSnapshot },
    /// Detach the document of a nested frame.
    RemoveFrame(String),
    /// Apply the inner mutation once `delay` has elapsed.
    Delayed { delay: Duration, mutation: Box<Mutation> },
}

impl Mutation {
    pub fn replace_html(html: impl Into<String>) -> Self {
        Mutation::ReplaceHtml(html.into())
    }

    pub fn set_frame(selector: impl Into<String>, frame: FrameSnapshot) -> Self {
        Mutation::SetFrame { selector: selector.into(), frame }
    }

    pub fn remove_frame(selector: impl Into<String>) -> Self {
        Mutation::RemoveFrame(selector.into())
    }

    /// Defers this mutation.
    pub fn after(self, delay: Duration) -> Self {
        Mutation::Delayed { delay, mutation: Box::new(self) }
    }
}

#[derive(Debug, Default)]
struct PageState {
    html: String,
    frames: HashMap<String, FrameSnapshot>,
    triggers: Vec<(String, Vec<Mutation>)>,
    scheduled: Vec<(Instant, Mutation)>,
    reads: usize,
    clicks: Vec<String>,
}

impl PageState {
    fn apply(&mut self, mutation: Mutation) {
        match mutation {
            Mutation::ReplaceHtml(html) => self.html = html,
            Mutation::SetFrame { selector, frame } => {
                self.frames.insert(selector, frame);
            }
            Mutation::RemoveFrame(selector) => {
                self.frames.remove(&selector);
            }
            Mutation::Delayed { delay, mutation } => self.scheduled.push((Instant::now() + delay, *mutation)),
        }
    }

    fn apply_due(&mut self) {
        let now = Instant::now();
        let mut due: Vec<(Instant, Mutation)> = Vec::new();
        let mut pending = Vec::new();
        for (at, mutation) in self.scheduled.drain(..) {
            if at <= now { due.push((at, mutation)) } else { pending.push((at, mutation)) }
        }
        self.scheduled = pending;

        due.sort_by_key(|(at, _)| *at);
        for (_, mutation) in due {
            self.apply(mutation);
        }
    }
}

/// A [`Page`] backed by in-memory markup with scripted behavior.
///
/// # Example
///
/// ```rust
/// use juscrape_core::page::{Mutation, Page, ScriptedPage};
///
/// let page = ScriptedPage::new("https://pje.trt5.jus.br/pjekz/processo/1/detalhe", "<button id='x'></button>")
///     .on_click("#x", vec![Mutation::replace_html("<p class='open'>aberto</p>")]);
///
/// page.click("#x").unwrap();
/// assert!(page.html().unwrap().contains("aberto"));
/// ```
#[derive(Debug)]
pub struct ScriptedPage {
    url: String,
    state: RefCell<PageState>,
}

impl ScriptedPage {
    pub fn new(url: impl Into<String>, html: impl Into<String>) -> Self {
        Self { url: url.into(), state: RefCell::new(PageState { html: html.into(), ..Default::default() }) }
    }

    /// Attaches a nested document to the element matching `selector`.
    pub fn with_frame(self, selector: impl Into<String>, frame: FrameSnapshot) -> Self {
        self.state.borrow_mut().frames.insert(selector.into(), frame);
        self
    }

    /// Registers mutations applied whenever a clicked element matches
    /// `trigger`.
    pub fn on_click(self, trigger: impl Into<String>, mutations: Vec<Mutation>) -> Self {
        self.state.borrow_mut().triggers.push((trigger.into(), mutations));
        self
    }

    /// Applies a mutation immediately (use [`Mutation::after`] to defer it).
    pub fn mutate(&self, mutation: Mutation) {
        self.state.borrow_mut().apply(mutation);
    }

    /// Number of snapshots taken so far (outer markup and frames).
    pub fn reads(&self) -> usize {
        self.state.borrow().reads
    }

    /// Selectors clicked so far, in order.
    pub fn clicks(&self) -> Vec<String> {
        self.state.borrow().clicks.clone()
    }
}

impl Page for ScriptedPage {
    fn url(&self) -> String {
        self.url.clone()
    }

    fn html(&self) -> Result<String> {
        let mut state = self.state.borrow_mut();
        state.apply_due();
        state.reads += 1;
        Ok(state.html.clone())
    }

    fn frame(&self, selector: &str) -> Result<Option<FrameSnapshot>> {
        let mut state = self.state.borrow_mut();
        state.apply_due();
        state.reads += 1;

        let Some(frame) = state.frames.get(selector).cloned() else {
            return Ok(None);
        };
        let outer = Document::parse(&state.html)?;
        if outer.select_first(selector)?.is_none() {
            return Ok(None);
        }
        Ok(Some(frame))
    }

    fn click(&self, selector: &str) -> Result<()> {
        let mut state = self.state.borrow_mut();
        state.apply_due();

        let doc = Document::parse(&state.html)?;
        let target = doc
            .select_first(selector)?
            .ok_or_else(|| ScrapeError::MissingNode { selector: selector.to_string() })?;

        let mut fired = Vec::new();
        for (trigger, mutations) in &state.triggers {
            if target.matches(trigger)? {
                fired.extend(mutations.iter().cloned());
            }
        }
        drop(doc);

        debug!(selector, mutations = fired.len(), "simulated click");
        state.clicks.push(selector.to_string());
        for mutation in fired {
            state.apply(mutation);
        }
        Ok(())
    }
}
