//! PJe first grade, Tribunal Regional do Trabalho da 5ª Região.
//!
//! An Angular application: the parties only exist while the case summary
//! is open, and the docket must be expanded before its cards are rendered.
//! Document texts are shown one at a time in `pje-historico-scroll-documento`.

use time::OffsetDateTime;
use tracing::{debug, warn};

use super::{CourtAdapter, ExtractionContext, HomepageRules, Parties, Session, UrlPattern, node, required};
use crate::date::DateFormat;
use crate::docket::strip_trailing_parenthetical;
use crate::locate::locate_value;
use crate::model::{CourtSystem, DocketEntry, JudicialUnit, Party, PartyRole, Tag, TaxId};
use crate::parse::{Document, Element};
use crate::party::find_email;
use crate::text::{Replace, html_to_text, parse_currency, squash_whitespace, strip_blank_lines, strip_script_tags};
use crate::wait::NodeSnapshot;
use crate::{Result, ScrapeError};

const NOT_REGISTERED: &str = "Não cadastrado no PJe";
const SUMMARY_TOGGLE: &str = "[aria-label*='resumo do processo']";
const EXPAND_DOCKET: &str = "button[aria-label='Exibir movimentos.']";
const DOCUMENT_AREA: &str = "pje-historico-scroll-documento";
const PDF_VIEWER: &str = "pje-historico-scroll-documento object";

/// Procedure codes shown next to the case number.
const ACTION_TYPES: [(&str, &str); 3] = [
    ("ATOrd", "Ação Trabalhista Ordinária"),
    ("ATSum", "Ação Trabalhista - Rito Sumaríssimo"),
    ("ATAlc", "Ação Trabalhista - Rito Sumário (Alçada)"),
];

/// Anchor nodes of a PJe TRT5 case page.
pub struct Trt5Checkpoints<'d> {
    /// `pje-resumo-processo`, the case header.
    pub summary: Element<'d>,
    /// Copy of the case summary panel taken while it was open.
    pub details: Document,
}

/// PJe 1st grade TRT5 adapter.
#[derive(Debug, Clone, Copy, Default)]
pub struct Pje1gTrt5;

impl Pje1gTrt5 {
    pub fn new() -> Self {
        Self
    }

    /// Closes the summary panel through the link preceding `pje-autuacao`.
    fn close_details(&self, session: Session<'_>) -> Result<()> {
        let page = session.snapshot()?;
        let Some(anchor) = page.select_first("pje-autuacao")? else {
            return Err(ScrapeError::MissingNode { selector: "pje-autuacao".to_string() });
        };

        let mut current = anchor.prev_sibling_element();
        while let Some(sibling) = current {
            if sibling.tag_name() == "a" {
                return session.click(&sibling.css_path());
            }
            current = sibling.prev_sibling_element();
        }
        Err(ScrapeError::MissingNode { selector: "a ~ pje-autuacao".to_string() })
    }

    fn detail_list<'d>(&self, ctx: &'d ExtractionContext<'_, Trt5Checkpoints<'d>>) -> Result<Option<Element<'d>>> {
        ctx.checkpoints.details.select_first("div:first-child > dl:only-child")
    }

    fn polo(&self, details: &Document, label: &str, role: PartyRole) -> Result<Vec<Party>> {
        let mut section = None;
        for container in details.select(".is-item-pilha-parte")? {
            let polo = container.select_first(".polo")?.map(|p| p.trimmed_text().to_lowercase());
            if polo.is_some_and(|polo| polo.contains(label)) {
                section = container.select_first("pje-parte-processo > section")?;
                break;
            }
        }
        let Some(section) = section else {
            return Ok(Vec::new());
        };

        section
            .children_matching("ul")?
            .iter()
            .map(|item| self.party(item, role))
            .collect()
    }

    /// The first child of each party item holds up to three wrappers: the
    /// tax id, the email and the address.
    fn party(&self, item: &Element<'_>, role: PartyRole) -> Result<Party> {
        let name = node(item.select_first("pje-nome-parte")?, "pje-nome-parte")?
            .trimmed_text()
            .to_uppercase();

        let mut tax_id = None;
        let mut email = None;
        let mut address = None;
        if let Some(first) = item.children().first() {
            for wrapper in first.children_matching("span.ng-star-inserted")? {
                let text = squash_whitespace(&wrapper.text());
                let lowered = text.to_lowercase();
                if lowered.starts_with("cpf:") || lowered.starts_with("cnpj:") {
                    tax_id.get_or_insert_with(|| TaxId::classify(&text, NOT_REGISTERED));
                } else if lowered.starts_with("(email:") {
                    email = email.or_else(|| find_email(&lowered));
                } else if address.is_none() && !text.is_empty() {
                    address = Some(text);
                }
            }
        }

        let mut party = Party::new(name, role, tax_id.unwrap_or_else(|| TaxId::classify("", NOT_REGISTERED)));
        party.email = email;
        party.address = address;
        for representative in item.select(".partes-representante")? {
            party.lawyers.push(self.lawyer(&representative)?);
        }
        Ok(party)
    }

    fn lawyer(&self, representative: &Element<'_>) -> Result<Party> {
        let selector = "span:not(.ng-star-inserted)";
        let name = node(representative.select_first(selector)?, selector)?
            .text()
            .to_uppercase()
            .replace("(ADVOGADO)", "");
        let details: Vec<String> = representative
            .select("span.span-informacao")?
            .iter()
            .map(|span| squash_whitespace(&span.text()))
            .collect();

        let cpf = details
            .iter()
            .find(|info| info.to_lowercase().contains("(cpf:"))
            .map(|info| TaxId::for_lawyer(info))
            .unwrap_or(TaxId::Unknown);
        let oab = details
            .iter()
            .find(|info| info.contains("(OAB:"))
            .map(|info| info.replace("(OAB:", "").replace(')', "").trim().to_string());

        let mut lawyer = Party::lawyer(name.trim(), cpf, oab);
        lawyer.email = details.iter().find_map(|info| find_email(&info.to_lowercase()));
        Ok(lawyer)
    }

    async fn docket_entry(&self, session: Session<'_>, item: &Element<'_>) -> Result<Option<DocketEntry>> {
        let Some(card) = item
            .children_matching("div")?
            .iter()
            .find_map(|div| div.children_matching("mat-card").ok()?.into_iter().next())
        else {
            return Ok(None);
        };

        let time = card
            .select_first("div.tl-item-hora")?
            .map(|hour| hour.trimmed_text())
            .filter(|hour| !hour.is_empty());

        let mut id = None;
        let mut cancelled = false;
        let mut title = String::new();
        let mut content = None;

        if card.id().is_some_and(|id| id.starts_with("doc")) {
            cancelled = card.select_first("a.is-inativo")?.is_some();
            title = self.document_title(&card)?;
            id = card
                .select_first("div > a > span.ng-star-inserted")?
                .map(|span| span.text().replace("- ", "").trim().to_string())
                .filter(|id| !id.is_empty());

            if !cancelled
                && session.config.fetch_documents
                && let Some(anchor) = card.select_first("a:not(.ng-star-inserted)")?
            {
                session.click(&anchor.css_path())?;
                content = self.document_text(session).await?;
            }
        }

        let date = self.entry_date(item, time.as_deref())?;
        let label = if title.is_empty() {
            card.children_matching("div")?
                .first()
                .map(|div| div.text().replace("Descrição do movimento:", "").trim().to_string())
                .unwrap_or_default()
        } else {
            strip_trailing_parenthetical(&title)
        };

        let mut entry = DocketEntry::new(label, date);
        entry.id = id;
        entry.cancelled = cancelled;
        let observation = strip_blank_lines(&format!("{}\n{}", title, content.unwrap_or_default()));
        entry.observation = (!observation.is_empty()).then_some(observation);
        Ok(Some(entry))
    }

    /// Document links show the title and, in parentheses, its type; both are
    /// kept unless they repeat each other.
    fn document_title(&self, card: &Element<'_>) -> Result<String> {
        let mut spans = Vec::new();
        for div in card.children_matching("div")? {
            for link in div.children_matching("a")? {
                spans.extend(link.children_matching("span:not([class])")?.iter().map(|span| span.trimmed_text()));
            }
        }

        Ok(match spans.as_slice() {
            [] => String::new(),
            [only] => only.clone(),
            [first, second, ..] if *first == format!("({})", second) => first.clone(),
            [first, second, ..] => format!("{} {}", first, second),
        })
    }

    /// Day headers (`div[role=heading]`) sit in the first item of each day.
    fn entry_date(&self, item: &Element<'_>, time: Option<&str>) -> Result<OffsetDateTime> {
        let mut current = Some(*item);
        while let Some(candidate) = current {
            if let Some(heading) = candidate.children_matching("div[role=heading]")?.first() {
                return DateFormat::AbbreviatedMonth.parse(&heading.trimmed_text(), time);
            }
            current = candidate.prev_sibling_element();
        }
        Err(ScrapeError::MissingNode { selector: "div[role=heading]".to_string() })
    }

    /// Reads the document opened in the document area.
    ///
    /// PDFs are rendered by an embedded viewer and are only read when
    /// [`ScrapeConfig::read_pdf_viewer`](crate::ScrapeConfig) is set.
    async fn document_text(&self, session: Session<'_>) -> Result<Option<String>> {
        let options = session.wait_options();
        let Some(area) = session.wait_for(DOCUMENT_AREA, &options).await? else {
            return Ok(None);
        };

        let content = if area.document()?.select_first("div.container-pdf > object")?.is_some() {
            if !session.config.read_pdf_viewer {
                debug!("skipping PDF document");
                return Ok(None);
            }
            session.wait_for(PDF_VIEWER, &options).await?;
            let viewer = options.clone().in_frame(PDF_VIEWER).returning("body div#viewer");
            session.wait_for("body div#viewer div.endOfContent", &viewer).await?
        } else {
            let inline = options.require_text();
            session.wait_for("pje-historico-scroll-documento mat-card-content > span", &inline).await?
        };

        Ok(content.map(|found: NodeSnapshot| {
            html_to_text(&strip_script_tags(&found.inner_html), &[Replace::line_breaks()])
        }))
    }
}

impl CourtAdapter for Pje1gTrt5 {
    type Checkpoints<'d> = Trt5Checkpoints<'d>;

    fn system(&self) -> CourtSystem {
        CourtSystem::Pje1gTrt5
    }

    fn homepage_rules(&self) -> HomepageRules {
        HomepageRules {
            required_path: "/pjekz/processo/",
            ignore: vec![
                UrlPattern::Contains("https://pje.trt5.jus.br/pjekz/assets/pdf/web/viewer.html"),
                UrlPattern::Contains("https://pje.trt5.jus.br/pjekz/downloadBinario.seam"),
            ],
        }
    }

    /// Opens the case summary, copies it and closes it again.
    async fn load_checkpoints<'d>(&self, session: Session<'d>, document: &'d Document) -> Result<Trt5Checkpoints<'d>> {
        let summary = required(document.select_first("pje-resumo-processo")?, "summary", "pje-resumo-processo")?;

        session.click(SUMMARY_TOGGLE)?;
        let options = session.wait_options().returning("#processo > div");
        let snapshot = session.wait_for("pje-parte-processo > section > ul", &options).await?;
        let details = required(snapshot, "details", "#processo > div")?.document()?;

        if let Err(e) = self.close_details(session) {
            warn!(error = %e, "could not close the case summary");
        }
        Ok(Trt5Checkpoints { summary, details })
    }

    fn parties(&self, ctx: &ExtractionContext<'_, Trt5Checkpoints<'_>>) -> Result<Parties> {
        let details = &ctx.checkpoints.details;
        Ok(Parties {
            claimants: self.polo(details, "ativo", PartyRole::Claimant)?,
            respondents: self.polo(details, "passivo", PartyRole::Respondent)?,
            others: self.polo(details, "outros", PartyRole::Other)?,
        })
    }

    async fn docket(&self, ctx: &ExtractionContext<'_, Self::Checkpoints<'_>>) -> Result<Vec<DocketEntry>> {
        let session = ctx.session;
        session.click(EXPAND_DOCKET)?;
        session
            .wait_for(".pje-timeline > li > div > mat-card[id^='mov']", &session.wait_options())
            .await?;

        let timeline = session.snapshot()?;
        let mut entries = Vec::new();
        for item in timeline.select(".pje-timeline > li")? {
            if let Some(entry) = self.docket_entry(session, &item).await? {
                entries.push(entry);
            }
        }
        entries.reverse();
        Ok(entries)
    }

    fn case_number(&self, ctx: &ExtractionContext<'_, Trt5Checkpoints<'_>>) -> Result<String> {
        let selector = "[aria-label*='Abre o resumo do processo']";
        Ok(node(ctx.document.select_first(selector)?, selector)?.trimmed_text())
    }

    fn filing_date(&self, ctx: &ExtractionContext<'_, Trt5Checkpoints<'_>>) -> Result<Option<OffsetDateTime>> {
        let Some(value) = locate_value(&ctx.checkpoints.summary, "#dataAutuacao", "dl dt", "Autuado") else {
            return Ok(None);
        };
        match DateFormat::Numeric.parse(&value, None) {
            Ok(date) => Ok(Some(date)),
            Err(e) => {
                warn!(value = %value, error = %e, "unreadable filing date");
                Ok(None)
            }
        }
    }

    fn claim_value(&self, ctx: &ExtractionContext<'_, Trt5Checkpoints<'_>>) -> Result<Option<f64>> {
        Ok(locate_value(&ctx.checkpoints.summary, "#valorCausa", "dl dt", "valor da causa")
            .and_then(|value| parse_currency(&value)))
    }

    /// The procedure code (`ATOrd`), spelled out when known.
    fn action_types(&self, ctx: &ExtractionContext<'_, Trt5Checkpoints<'_>>) -> Result<Vec<Tag>> {
        let Some(description) = ctx.document.select_first("pje-descricao-processo")? else {
            return Ok(Vec::new());
        };
        let Some(code) = description
            .select_first("span:first-child")?
            .and_then(|outer| outer.select_first("span:last-child").ok().flatten())
            .map(|span| span.trimmed_text())
            .filter(|code| !code.is_empty())
        else {
            return Ok(Vec::new());
        };

        let name = ACTION_TYPES
            .iter()
            .find(|(known, _)| *known == code)
            .map(|(_, name)| name.to_string())
            .unwrap_or(code);
        Ok(vec![Tag::new(name)])
    }

    fn causes_of_action(&self, ctx: &ExtractionContext<'_, Trt5Checkpoints<'_>>) -> Result<Vec<Tag>> {
        let Some(list) = self.detail_list(ctx)? else {
            return Ok(Vec::new());
        };
        Ok(locate_value(&list, "dt:last-of-type", "*", "Assunto(s)")
            .filter(|value| !value.is_empty())
            .map(Tag::new)
            .into_iter()
            .collect())
    }

    fn judicial_unit(&self, ctx: &ExtractionContext<'_, Trt5Checkpoints<'_>>) -> Result<Option<JudicialUnit>> {
        let Some(list) = self.detail_list(ctx)? else {
            return Ok(None);
        };
        Ok(locate_value(&list, "dt:first-child", "dl dt", "Órgão julgador")
            .filter(|value| !value.is_empty())
            .map(JudicialUnit::new))
    }
}
