//! The court-system adapter contract and the extraction sequence.
//!
//! Every supported system implements [`CourtAdapter`]. An extraction runs
//! through fixed states:
//!
//! 1. the page URL is checked against the adapter's [`HomepageRules`]
//!    (ignored utility pages and foreign pages stop here, silently);
//! 2. the checkpoints (anchor nodes every other step depends on) are
//!    located once in a snapshot of the page;
//! 3. the docket, the parties and then every metadata field are extracted
//!    from an immutable [`ExtractionContext`].
//!
//! Only `load_checkpoints` and `docket` may click on the page. Both run
//! strictly sequentially.

mod pje_tjba;
mod pje_trt5;
mod projudi;

pub use pje_tjba::{Pje1gTjba, PjeTjbaCheckpoints};
pub use pje_trt5::{Pje1gTrt5, Trt5Checkpoints};
pub use projudi::{ProjudiCheckpoints, ProjudiTjba};

use std::future::Future;
use std::time::Duration;

use time::OffsetDateTime;
use tracing::{debug, error, warn};

use crate::model::{Case, CourtSystem, DocketEntry, ExtractionStep, JudicialUnit, Party, StepFailure, Tag};
use crate::page::Page;
use crate::parse::Document;
use crate::wait::{CancelToken, NodeSnapshot, WaitOptions, wait_for};
use crate::{Result, ScrapeConfig, ScrapeError};

/// A URL pattern an adapter ignores.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UrlPattern {
    /// Ignore URLs containing this text.
    Contains(&'static str),
    /// Ignore exactly this URL.
    Exact(&'static str),
}

impl UrlPattern {
    pub fn matches(&self, url: &str) -> bool {
        match self {
            UrlPattern::Contains(part) => url.contains(part),
            UrlPattern::Exact(full) => url == *full,
        }
    }
}

/// Recognizes the case-detail page of a system.
#[derive(Debug, Clone)]
pub struct HomepageRules {
    /// Path fragment every case page URL contains.
    pub required_path: &'static str,
    /// Utility pages of the system that are skipped without complaint.
    pub ignore: Vec<UrlPattern>,
}

impl HomepageRules {
    /// Classifies `url`.
    ///
    /// Returns `Ok(false)` for ignored pages (ignoring wins over the required
    /// path) and `Ok(true)` for case pages.
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeError::NotHomepage`] when the URL lacks the required
    /// path.
    ///
    /// # Example
    ///
    /// ```rust
    /// use juscrape_core::adapter::{HomepageRules, UrlPattern};
    ///
    /// let rules = HomepageRules {
    ///     required_path: "/pjekz/processo/",
    ///     ignore: vec![UrlPattern::Contains("/pjekz/downloadBinario.seam")],
    /// };
    /// assert!(rules.check("https://pje.trt5.jus.br/pjekz/processo/1/detalhe").unwrap());
    /// assert!(!rules.check("https://pje.trt5.jus.br/pjekz/downloadBinario.seam?id=1").unwrap());
    /// assert!(rules.check("https://pje.trt5.jus.br/pjekz/painel").is_err());
    /// ```
    pub fn check(&self, url: &str) -> Result<bool> {
        if self.ignore.iter().any(|pattern| pattern.matches(url)) {
            return Ok(false);
        }
        if url.is_empty() || !url.contains(self.required_path) {
            return Err(ScrapeError::NotHomepage { url: url.to_string() });
        }
        Ok(true)
    }
}

/// The live page and the knobs of one extraction.
#[derive(Clone, Copy)]
pub struct Session<'a> {
    pub page: &'a dyn Page,
    pub config: &'a ScrapeConfig,
    pub cancel: &'a CancelToken,
}

impl<'a> Session<'a> {
    pub fn new(page: &'a dyn Page, config: &'a ScrapeConfig, cancel: &'a CancelToken) -> Self {
        Self { page, config, cancel }
    }

    /// Wait options carrying the configured interval and timeout.
    pub fn wait_options(&self) -> WaitOptions {
        WaitOptions::from_config(self.config)
    }

    /// [`wait_for`] on this session's page.
    pub async fn wait_for(&self, selector: &str, options: &WaitOptions) -> Result<Option<NodeSnapshot>> {
        wait_for(self.page, selector, options, self.cancel).await
    }

    /// Clicks the first element matching `selector`, unless cancelled.
    pub fn click(&self, selector: &str) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(ScrapeError::Cancelled);
        }
        self.page.click(selector)
    }

    /// A fresh snapshot of the page.
    pub fn snapshot(&self) -> Result<Document> {
        self.page.document()
    }

    /// Sleeps for `duration`, or fails early on cancellation.
    pub async fn pause(&self, duration: Duration) -> Result<()> {
        tokio::select! {
            _ = tokio::time::sleep(duration) => Ok(()),
            _ = self.cancel.cancelled() => Err(ScrapeError::Cancelled),
        }
    }

    /// Runs `operation`, failing early on cancellation.
    pub async fn cancellable<T>(&self, operation: impl Future<Output = Result<T>>) -> Result<T> {
        tokio::select! {
            result = operation => result,
            _ = self.cancel.cancelled() => Err(ScrapeError::Cancelled),
        }
    }
}

/// Everything a field getter may look at.
pub struct ExtractionContext<'a, C> {
    pub session: Session<'a>,
    /// Snapshot of the page taken when the extraction started.
    pub document: &'a Document,
    pub checkpoints: C,
}

/// The three party groups of a case.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Parties {
    pub claimants: Vec<Party>,
    pub respondents: Vec<Party>,
    pub others: Vec<Party>,
}

/// Extraction of one court system.
///
/// Field getters are pure reads of the context: a value the page does not
/// show is `Ok(None)` or empty, and an `Err` aborts the whole extraction.
/// Defaults cover the fields a system never shows.
#[allow(async_fn_in_trait)]
pub trait CourtAdapter {
    /// Anchor nodes located once per extraction.
    type Checkpoints<'d>;

    fn system(&self) -> CourtSystem;

    fn homepage_rules(&self) -> HomepageRules;

    /// See [`HomepageRules::check`].
    fn is_case_homepage(&self, url: &str) -> Result<bool> {
        self.homepage_rules().check(url)
    }

    /// Locates the checkpoints in `document`.
    ///
    /// May click on the page to reveal content.
    async fn load_checkpoints<'d>(
        &self, session: Session<'d>, document: &'d Document,
    ) -> Result<Self::Checkpoints<'d>>;

    fn parties(&self, ctx: &ExtractionContext<'_, Self::Checkpoints<'_>>) -> Result<Parties>;

    /// Timeline of the case, in reverse page order.
    ///
    /// Side-effecting: documents are opened by clicking on them, one at a
    /// time.
    async fn docket(&self, ctx: &ExtractionContext<'_, Self::Checkpoints<'_>>) -> Result<Vec<DocketEntry>>;

    fn case_number(&self, ctx: &ExtractionContext<'_, Self::Checkpoints<'_>>) -> Result<String>;

    fn source_url(&self, ctx: &ExtractionContext<'_, Self::Checkpoints<'_>>) -> Result<Option<String>> {
        Ok(Some(ctx.session.page.url()))
    }

    fn filing_date(&self, _ctx: &ExtractionContext<'_, Self::Checkpoints<'_>>) -> Result<Option<OffsetDateTime>> {
        Ok(None)
    }

    fn claim_value(&self, _ctx: &ExtractionContext<'_, Self::Checkpoints<'_>>) -> Result<Option<f64>> {
        Ok(None)
    }

    fn causes_of_action(&self, _ctx: &ExtractionContext<'_, Self::Checkpoints<'_>>) -> Result<Vec<Tag>> {
        Ok(Vec::new())
    }

    fn action_types(&self, _ctx: &ExtractionContext<'_, Self::Checkpoints<'_>>) -> Result<Vec<Tag>> {
        Ok(Vec::new())
    }

    fn judicial_unit(&self, _ctx: &ExtractionContext<'_, Self::Checkpoints<'_>>) -> Result<Option<JudicialUnit>> {
        Ok(None)
    }

    fn presiding_judge(&self, _ctx: &ExtractionContext<'_, Self::Checkpoints<'_>>) -> Result<Option<String>> {
        Ok(None)
    }

    fn next_hearing(
        &self, _ctx: &ExtractionContext<'_, Self::Checkpoints<'_>>, _docket: &[DocketEntry],
    ) -> Result<Option<DocketEntry>> {
        Ok(None)
    }

    fn secrecy(&self, _ctx: &ExtractionContext<'_, Self::Checkpoints<'_>>) -> Result<Option<bool>> {
        Ok(None)
    }

    fn parent_case(&self, _ctx: &ExtractionContext<'_, Self::Checkpoints<'_>>) -> Result<Option<String>> {
        Ok(None)
    }

    fn regional_number(&self, _ctx: &ExtractionContext<'_, Self::Checkpoints<'_>>) -> Result<Option<String>> {
        Ok(None)
    }

    fn incident_numbers(&self, _ctx: &ExtractionContext<'_, Self::Checkpoints<'_>>) -> Result<Vec<String>> {
        Ok(Vec::new())
    }

    fn related_numbers(&self, _ctx: &ExtractionContext<'_, Self::Checkpoints<'_>>) -> Result<Vec<String>> {
        Ok(Vec::new())
    }

    fn claims(&self, _ctx: &ExtractionContext<'_, Self::Checkpoints<'_>>) -> Result<Vec<String>> {
        Ok(Vec::new())
    }
}

/// Extracts the case shown on `page`.
///
/// Returns `None` silently for pages that are not case pages, and logs any
/// other failure before returning `None`. Use [`try_fetch_case_info`] to
/// get the error instead.
pub async fn fetch_case_info<A: CourtAdapter>(
    adapter: &A, page: &dyn Page, config: &ScrapeConfig, cancel: &CancelToken,
) -> Option<Case> {
    match try_fetch_case_info(adapter, page, config, cancel).await {
        Ok(case) => Some(case),
        Err(e) if e.is_not_homepage() => None,
        Err(e) => {
            error!(system = %adapter.system(), url = %page.url(), error = %e, "case extraction failed");
            None
        }
    }
}

/// Extracts the case shown on `page`, returning the failure.
///
/// # Errors
///
/// - [`ScrapeError::IgnoredPage`] / [`ScrapeError::NotHomepage`] for pages
///   that are not case pages.
/// - [`ScrapeError::MissingCheckpoint`] when an anchor node is absent.
/// - Any error of a metadata getter, a readiness timeout while loading the
///   checkpoints, or [`ScrapeError::Cancelled`].
///
/// Failures of the docket or party extraction do not abort the record: they
/// are logged and collected in [`Case::errors`].
pub async fn try_fetch_case_info<A: CourtAdapter>(
    adapter: &A, page: &dyn Page, config: &ScrapeConfig, cancel: &CancelToken,
) -> Result<Case> {
    let url = page.url();
    if !adapter.is_case_homepage(&url)? {
        return Err(ScrapeError::IgnoredPage { url });
    }

    let session = Session::new(page, config, cancel);
    let document = page.document()?;
    let checkpoints = adapter.load_checkpoints(session, &document).await?;
    debug!(system = %adapter.system(), url = %url, "checkpoints loaded");

    let ctx = ExtractionContext { session, document: &document, checkpoints };
    let mut errors = Vec::new();

    let docket = match adapter.docket(&ctx).await {
        Ok(docket) => docket,
        Err(ScrapeError::Cancelled) => return Err(ScrapeError::Cancelled),
        Err(e) => {
            warn!(system = %adapter.system(), error = %e, "docket extraction failed");
            errors.push(StepFailure::new(ExtractionStep::Docket, &e));
            Vec::new()
        }
    };

    let parties = match adapter.parties(&ctx) {
        Ok(parties) => parties,
        Err(e) => {
            warn!(system = %adapter.system(), error = %e, "party extraction failed");
            errors.push(StepFailure::new(ExtractionStep::Parties, &e));
            Parties::default()
        }
    };

    let mut case = Case::new(adapter.case_number(&ctx)?, adapter.system());
    case.claims = adapter.claims(&ctx)?;
    case.url = adapter.source_url(&ctx)?;
    case.filing_date = adapter.filing_date(&ctx)?;
    case.claim_value = adapter.claim_value(&ctx)?;
    case.causes_of_action = adapter.causes_of_action(&ctx)?;
    case.judicial_unit = adapter.judicial_unit(&ctx)?;
    case.judge = adapter.presiding_judge(&ctx)?;
    case.next_hearing = adapter.next_hearing(&ctx, &docket)?;
    case.action_types = adapter.action_types(&ctx)?;
    case.secrecy = adapter.secrecy(&ctx)?;
    case.parent_case = adapter.parent_case(&ctx)?;
    case.regional_number = adapter.regional_number(&ctx)?;
    case.incident_numbers = adapter.incident_numbers(&ctx)?;
    case.related_numbers = adapter.related_numbers(&ctx)?;

    case.claimants = parties.claimants;
    case.respondents = parties.respondents;
    case.others = parties.others;
    case.docket = docket;
    case.errors = errors;

    debug!(
        system = %case.system,
        number = %case.number,
        entries = case.docket.len(),
        parties = case.parties().count(),
        errors = case.errors.len(),
        "case extracted"
    );
    Ok(case)
}

/// Fails with [`ScrapeError::MissingCheckpoint`] when `found` is `None`.
pub(crate) fn required<T>(found: Option<T>, name: &'static str, selector: &str) -> Result<T> {
    found.ok_or_else(|| ScrapeError::MissingCheckpoint { name, selector: selector.to_string() })
}

/// Fails with [`ScrapeError::MissingNode`] when `found` is `None`.
pub(crate) fn node<T>(found: Option<T>, selector: &str) -> Result<T> {
    found.ok_or_else(|| ScrapeError::MissingNode { selector: selector.to_string() })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::ScriptedPage;
    use crate::parse::Element;

    fn rules() -> HomepageRules {
        HomepageRules {
            required_path: "/projudi/listagens/DadosProcesso?numeroProcesso=",
            ignore: vec![
                UrlPattern::Contains("/projudi/Cabecalho.jsp"),
                UrlPattern::Exact("https://projudi.tjba.jus.br/projudi/"),
            ],
        }
    }

    #[test]
    fn test_check_precedence() {
        let rules = rules();
        assert!(!rules.check("https://projudi.tjba.jus.br/projudi/").unwrap());
        assert!(!rules.check("https://projudi.tjba.jus.br/projudi/Cabecalho.jsp?numeroProcesso=").unwrap());
        assert!(
            !rules
                .check("https://projudi.tjba.jus.br/projudi/Cabecalho.jsp?x=/projudi/listagens/DadosProcesso?numeroProcesso=1")
                .unwrap()
        );
        assert!(
            rules
                .check("https://projudi.tjba.jus.br/projudi/listagens/DadosProcesso?numeroProcesso=1")
                .unwrap()
        );
    }

    #[test]
    fn test_check_not_homepage() {
        let err = rules().check("https://projudi.tjba.jus.br/projudi/buscas/Processos").unwrap_err();
        assert!(matches!(err, ScrapeError::NotHomepage { ref url } if url.ends_with("Processos")));
        assert!(rules().check("").is_err());
    }

    /// Minimal adapter over a `<dl>` page.
    struct Toy {
        fail_docket: bool,
        fail_number: bool,
    }

    impl CourtAdapter for Toy {
        type Checkpoints<'d> = Element<'d>;

        fn system(&self) -> CourtSystem {
            CourtSystem::Pje1gTjba
        }

        fn homepage_rules(&self) -> HomepageRules {
            HomepageRules { required_path: "/detalhe", ignore: vec![UrlPattern::Contains("download")] }
        }

        async fn load_checkpoints<'d>(&self, _session: Session<'d>, document: &'d Document) -> Result<Element<'d>> {
            required(document.select_first("#card")?, "card", "#card")
        }

        fn parties(&self, _ctx: &ExtractionContext<'_, Element<'_>>) -> Result<Parties> {
            Err(ScrapeError::MissingNode { selector: "#polo".to_string() })
        }

        async fn docket(&self, ctx: &ExtractionContext<'_, Self::Checkpoints<'_>>) -> Result<Vec<DocketEntry>> {
            if self.fail_docket {
                return Err(ScrapeError::ReadinessTimeout {
                    selector: "#timeline".to_string(),
                    waited: Duration::from_secs(1),
                });
            }
            ctx.session.pause(Duration::from_millis(10)).await?;
            Ok(Vec::new())
        }

        fn case_number(&self, ctx: &ExtractionContext<'_, Element<'_>>) -> Result<String> {
            if self.fail_number {
                return Err(ScrapeError::MissingNode { selector: "h1".to_string() });
            }
            Ok(node(ctx.checkpoints.select_first("h1")?, "h1")?.trimmed_text())
        }
    }

    const PAGE: &str = "<div id='card'><h1> 0000001-02.2023.8.05.0001 </h1></div>";

    #[tokio::test(start_paused = true)]
    async fn test_contained_failures_are_collected() {
        let page = ScriptedPage::new("https://pje.tjba.jus.br/detalhe", PAGE);
        let adapter = Toy { fail_docket: true, fail_number: false };

        let case = try_fetch_case_info(&adapter, &page, &ScrapeConfig::default(), &CancelToken::new())
            .await
            .unwrap();

        assert_eq!(case.number, "0000001-02.2023.8.05.0001");
        assert_eq!(case.url.as_deref(), Some("https://pje.tjba.jus.br/detalhe"));
        assert_eq!(case.errors.len(), 2);
        assert_eq!(case.errors[0].step, ExtractionStep::Docket);
        assert_eq!(case.errors[1].step, ExtractionStep::Parties);
        assert!(case.errors[0].to_string().starts_with("docket: "));
    }

    #[tokio::test(start_paused = true)]
    async fn test_metadata_failure_is_fatal() {
        let page = ScriptedPage::new("https://pje.tjba.jus.br/detalhe", PAGE);
        let adapter = Toy { fail_docket: false, fail_number: true };

        let result = try_fetch_case_info(&adapter, &page, &ScrapeConfig::default(), &CancelToken::new()).await;
        assert!(matches!(result, Err(ScrapeError::MissingNode { .. })));
        assert!(fetch_case_info(&adapter, &page, &ScrapeConfig::default(), &CancelToken::new()).await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_not_homepage_and_ignored() {
        let adapter = Toy { fail_docket: false, fail_number: false };
        let config = ScrapeConfig::default();
        let cancel = CancelToken::new();

        let ignored = ScriptedPage::new("https://pje.tjba.jus.br/detalhe/download", PAGE);
        assert!(matches!(
            try_fetch_case_info(&adapter, &ignored, &config, &cancel).await,
            Err(ScrapeError::IgnoredPage { .. })
        ));

        let foreign = ScriptedPage::new("https://pje.tjba.jus.br/painel", PAGE);
        assert!(matches!(
            try_fetch_case_info(&adapter, &foreign, &config, &cancel).await,
            Err(ScrapeError::NotHomepage { .. })
        ));
        assert!(fetch_case_info(&adapter, &foreign, &config, &cancel).await.is_none());
        assert_eq!(foreign.reads(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_checkpoint() {
        let page = ScriptedPage::new("https://pje.tjba.jus.br/detalhe", "<p>login</p>");
        let adapter = Toy { fail_docket: false, fail_number: false };

        let result = try_fetch_case_info(&adapter, &page, &ScrapeConfig::default(), &CancelToken::new()).await;
        assert!(matches!(result, Err(ScrapeError::MissingCheckpoint { name: "card", .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_docket_aborts() {
        let page = ScriptedPage::new("https://pje.tjba.jus.br/detalhe", PAGE);
        let adapter = Toy { fail_docket: false, fail_number: false };
        let cancel = CancelToken::new();
        cancel.cancel();

        let result = try_fetch_case_info(&adapter, &page, &ScrapeConfig::default(), &cancel).await;
        assert!(matches!(result, Err(ScrapeError::Cancelled)));
    }
}
