//! PJe first grade, Tribunal de Justiça da Bahia.
//!
//! Metadata and parties are server-rendered. Document texts are shown in the
//! `#frameHtml` frame after clicking their timeline entry.

use std::sync::LazyLock;

use regex::Regex;
use time::OffsetDateTime;
use tracing::{debug, warn};

use super::{CourtAdapter, ExtractionContext, HomepageRules, Parties, Session, UrlPattern, node, required};
use crate::date::DateFormat;
use crate::docket::{split_numbered_title, strip_trailing_parenthetical};
use crate::locate::locate_value;
use crate::model::{CourtSystem, DocketEntry, JudicialUnit, Party, PartyRole, Tag, TaxId};
use crate::parse::{Document, Element};
use crate::party::{composite_name, find_oab, find_tax_id};
use crate::text::{html_to_text, parse_currency, squash_whitespace, strip_blank_lines, strip_script_tags};
use crate::wait::wait_for_frame_settled;
use crate::{Result, ScrapeError};

const NOT_REGISTERED: &str = "Não cadastrado no PJe";
const LABELS: &str = "dl dt";
const DOCUMENT_FRAME: &str = "#frameHtml";

static CNJ_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{7}-\d{2}\.\d{4}\.\d\.\d{2}\.\d{4}").unwrap());
static CODED_VALUE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(.*)\((\d+)\)$").unwrap());

/// Anchor nodes of a PJe TJBA case page.
#[derive(Debug, Clone, Copy)]
pub struct PjeTjbaCheckpoints<'d> {
    /// `#maisDetalhes`, the metadata definition lists.
    pub details: Element<'d>,
}

/// PJe 1st grade TJBA adapter.
#[derive(Debug, Clone, Copy, Default)]
pub struct Pje1gTjba;

/// Splits `"PROCEDIMENTO COMUM CÍVEL (7)"` into the label and its code.
fn coded_tag(value: &str) -> Tag {
    let value = value.trim();
    match CODED_VALUE.captures(value) {
        Some(caps) => match caps[2].parse() {
            Ok(id) => Tag::with_id(id, caps[1].trim()),
            Err(_) => Tag::new(caps[1].trim()),
        },
        None => Tag::new(value),
    }
}

impl Pje1gTjba {
    pub fn new() -> Self {
        Self
    }

    fn detail(&self, ctx: &ExtractionContext<'_, PjeTjbaCheckpoints<'_>>, fast_guess: &str, label: &str) -> Option<String> {
        locate_value(&ctx.checkpoints.details, fast_guess, LABELS, label).filter(|value| !value.is_empty())
    }

    fn polo(&self, document: &Document, selector: &str, role: PartyRole) -> Result<Vec<Party>> {
        let Some(tbody) = document.select_first(selector)? else {
            debug!(selector, "party table not found");
            return Ok(Vec::new());
        };

        tbody
            .children_matching("tr")?
            .iter()
            .map(|row| self.party(row, role))
            .collect()
    }

    /// Rows read `NAME - CPF: 000.000.000-00 (ROLE)`, with the lawyers in the
    /// first list of the row.
    fn party(&self, row: &Element<'_>, role: PartyRole) -> Result<Party> {
        let selector = "td:nth-child(1) > span:nth-child(1) > span";
        let composite = squash_whitespace(&node(row.select_first(selector)?, selector)?.text());

        let tax_id = TaxId::classify(&find_tax_id(&composite).unwrap_or_default(), NOT_REGISTERED);
        let mut party = Party::new(composite_name(&composite), role, tax_id);

        let mut lists = Vec::new();
        for cell in row.children_matching("td")? {
            lists.extend(cell.children_matching("ul")?);
        }
        if let Some(list) = lists.first() {
            for item in list.children_matching("li")? {
                if let Some(lawyer) = item.select_first("small > span > span")? {
                    party.lawyers.push(self.lawyer(&squash_whitespace(&lawyer.text())));
                }
            }
        }
        Ok(party)
    }

    fn lawyer(&self, composite: &str) -> Party {
        Party::lawyer(
            composite_name(composite),
            TaxId::for_lawyer(&find_tax_id(composite).unwrap_or_default()),
            find_oab(composite),
        )
    }

    async fn docket_entry(&self, session: Session<'_>, item: &Element<'_>) -> Result<Option<DocketEntry>> {
        let Some(body) = item.select_first(".media-body")? else {
            return Ok(None);
        };
        let time = body
            .select_first("small.text-muted")?
            .map(|small| small.trimmed_text())
            .filter(|time| !time.is_empty());

        let mut id = None;
        let mut cancelled = false;
        let mut title = String::new();
        let mut content = None;

        if item.has_class("tipo-D") {
            let raw_title = match body.select_first(".anexos > .anexos-inativos")? {
                Some(inactive) => {
                    cancelled = true;
                    inactive
                        .children_matching("span")?
                        .first()
                        .map(|span| span.trimmed_text())
                        .unwrap_or_default()
                }
                None => {
                    let selector = ".anexos > a:first-child";
                    let anchor = node(body.select_first(selector)?, selector)?;
                    if session.config.fetch_documents {
                        content = self.document_text(session, &anchor).await?;
                    }
                    anchor
                        .children_matching("span")?
                        .first()
                        .map(|span| span.trimmed_text())
                        .unwrap_or_default()
                }
            };
            (id, title) = split_numbered_title(&raw_title);
        }

        let date = self.entry_date(item, time.as_deref())?;
        let label = if title.is_empty() { self.movement_title(&body)? } else { strip_trailing_parenthetical(&title) };

        let mut entry = DocketEntry::new(label, date);
        entry.id = id;
        entry.cancelled = cancelled;
        let observation = strip_blank_lines(&format!("{}\n{}", title, content.unwrap_or_default()));
        entry.observation = (!observation.is_empty()).then_some(observation);
        Ok(Some(entry))
    }

    /// Day headers (`.data`) precede the items of that day.
    fn entry_date(&self, item: &Element<'_>, time: Option<&str>) -> Result<OffsetDateTime> {
        let mut current = item.prev_sibling_element();
        while let Some(sibling) = current {
            if sibling.has_class("data") {
                return DateFormat::AbbreviatedMonth.parse(&sibling.trimmed_text(), time);
            }
            current = sibling.prev_sibling_element();
        }
        Err(ScrapeError::MissingNode { selector: ".media.data".to_string() })
    }

    /// Title of a movement without document.
    fn movement_title(&self, body: &Element<'_>) -> Result<String> {
        for child in body.children() {
            if child.matches(".anexos, .col-sm-12")? {
                continue;
            }
            return Ok(child.select_first("span")?.map(|span| span.trimmed_text()).unwrap_or_default());
        }
        Ok(String::new())
    }

    /// Opens a document in the viewer frame and reads its text.
    ///
    /// PDFs are not rendered in the frame and yield `None`, as does the
    /// landing page the viewer sometimes shows instead of the document.
    async fn document_text(&self, session: Session<'_>, anchor: &Element<'_>) -> Result<Option<String>> {
        let is_pdf = anchor
            .children()
            .first()
            .is_some_and(|icon| icon.tag_name() == "i" && icon.has_class("fa-file-pdf-o"));
        if is_pdf {
            debug!("skipping PDF document");
            return Ok(None);
        }

        session.click(&anchor.css_path())?;
        let options = session.wait_options().interval(session.config.frame_poll_interval);
        let settled = wait_for_frame_settled(session.page, DOCUMENT_FRAME, &options, session.cancel).await?;
        session.pause(session.config.settle_delay).await?;

        let document = match session.page.frame(DOCUMENT_FRAME)? {
            Some(frame) => frame.document()?,
            None => settled,
        };
        if document.head_children_count() > 3 {
            debug!("document viewer showed its landing page");
            return Ok(None);
        }
        Ok(Some(html_to_text(&strip_script_tags(&document.body_inner_html()), &[])))
    }
}

impl CourtAdapter for Pje1gTjba {
    type Checkpoints<'d> = PjeTjbaCheckpoints<'d>;

    fn system(&self) -> CourtSystem {
        CourtSystem::Pje1gTjba
    }

    fn homepage_rules(&self) -> HomepageRules {
        HomepageRules {
            required_path: "/pje/Processo/ConsultaProcesso/Detalhe/",
            ignore: vec![UrlPattern::Contains("https://pje.tjba.jus.br/pje/downloadBinario.seam")],
        }
    }

    async fn load_checkpoints<'d>(&self, _session: Session<'d>, document: &'d Document) -> Result<PjeTjbaCheckpoints<'d>> {
        let details = required(document.select_first("#maisDetalhes")?, "details", "#maisDetalhes")?;
        Ok(PjeTjbaCheckpoints { details })
    }

    fn parties(&self, ctx: &ExtractionContext<'_, PjeTjbaCheckpoints<'_>>) -> Result<Parties> {
        Ok(Parties {
            claimants: self.polo(ctx.document, "#poloAtivo > table > tbody", PartyRole::Claimant)?,
            respondents: self.polo(ctx.document, "#poloPassivo > table > tbody", PartyRole::Respondent)?,
            others: Vec::new(),
        })
    }

    async fn docket(&self, ctx: &ExtractionContext<'_, Self::Checkpoints<'_>>) -> Result<Vec<DocketEntry>> {
        let Some(timeline) = ctx.document.select_first("[id='divTimeLine:eventosTimeLineElement']")? else {
            debug!("timeline not found");
            return Ok(Vec::new());
        };

        let mut entries = Vec::new();
        for item in timeline.children_matching(".media:not(.data)")? {
            if let Some(entry) = self.docket_entry(ctx.session, &item).await? {
                entries.push(entry);
            }
        }
        entries.reverse();
        Ok(entries)
    }

    /// The CNJ number inside the page title link.
    fn case_number(&self, ctx: &ExtractionContext<'_, PjeTjbaCheckpoints<'_>>) -> Result<String> {
        for link in ctx.document.select("a.titulo-topo")? {
            if link.select_first("i")?.is_none() {
                continue;
            }
            if let Some(number) = CNJ_NUMBER.find(&link.own_text()) {
                return Ok(number.as_str().to_string());
            }
        }
        Err(ScrapeError::MissingNode { selector: "a.titulo-topo".to_string() })
    }

    fn filing_date(&self, ctx: &ExtractionContext<'_, PjeTjbaCheckpoints<'_>>) -> Result<Option<OffsetDateTime>> {
        let Some(value) = self.detail(ctx, "dl > dt:nth-child(7)", "autuação") else {
            return Ok(None);
        };
        match DateFormat::AbbreviatedMonth.parse(&value, None) {
            Ok(date) => Ok(Some(date)),
            Err(e) => {
                warn!(value = %value, error = %e, "unreadable filing date");
                Ok(None)
            }
        }
    }

    fn claim_value(&self, ctx: &ExtractionContext<'_, PjeTjbaCheckpoints<'_>>) -> Result<Option<f64>> {
        Ok(self
            .detail(ctx, "dl > dt:nth-child(11)", "valor da causa")
            .and_then(|value| parse_currency(&value)))
    }

    fn causes_of_action(&self, ctx: &ExtractionContext<'_, PjeTjbaCheckpoints<'_>>) -> Result<Vec<Tag>> {
        Ok(self.detail(ctx, "dl > dt:nth-child(3)", "assunto").map(|value| coded_tag(&value)).into_iter().collect())
    }

    fn action_types(&self, ctx: &ExtractionContext<'_, PjeTjbaCheckpoints<'_>>) -> Result<Vec<Tag>> {
        Ok(self
            .detail(ctx, "dl > dt:nth-child(1)", "classe judicial")
            .map(|value| coded_tag(&value))
            .into_iter()
            .collect())
    }

    fn judicial_unit(&self, ctx: &ExtractionContext<'_, PjeTjbaCheckpoints<'_>>) -> Result<Option<JudicialUnit>> {
        Ok(self.detail(ctx, "div:nth-child(2) > dl > dt", "órgão julgador").map(JudicialUnit::new))
    }

    fn secrecy(&self, ctx: &ExtractionContext<'_, PjeTjbaCheckpoints<'_>>) -> Result<Option<bool>> {
        Ok(self
            .detail(ctx, "dl > dt:nth-child(13)", "segredo de justiça")
            .map(|value| value.to_lowercase() == "sim"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("PROCEDIMENTO COMUM CÍVEL (7)", Some(7), "PROCEDIMENTO COMUM CÍVEL")]
    #[case("Indenização por Dano Moral (10433)", Some(10433), "Indenização por Dano Moral")]
    #[case("Sem código", None, "Sem código")]
    fn test_coded_tag(#[case] value: &str, #[case] id: Option<u32>, #[case] label: &str) {
        let tag = coded_tag(value);
        assert_eq!(tag.id, id);
        assert_eq!(tag.value, label);
    }

    #[test]
    fn test_homepage_rules() {
        let adapter = Pje1gTjba::new();
        assert!(
            adapter
                .is_case_homepage("https://pje.tjba.jus.br/pje/Processo/ConsultaProcesso/Detalhe/listProcessoCompletoAdvogado.seam?id=1")
                .unwrap()
        );
        assert!(
            !adapter
                .is_case_homepage("https://pje.tjba.jus.br/pje/downloadBinario.seam?arquivoId=1")
                .unwrap()
        );
    }

    #[test]
    fn test_party_row() {
        let doc = Document::parse(
            r#"<table><tbody><tr><td>
                <span><span>EMPRESA X LTDA - CNPJ: 12.345.678/0001-90 (RÉU)</span></span>
                <ul>
                    <li><small><span><span>MARIA SOUZA - OAB BA12345 - CPF: 111.222.333-44 (ADVOGADO)</span></span></small></li>
                </ul>
                <ul><li><small><span><span>IGNORADO</span></span></small></li></ul>
            </td></tr></tbody></table>"#,
        )
        .unwrap();
        let row = doc.select_first("tr").unwrap().unwrap();

        let party = Pje1gTjba::new().party(&row, PartyRole::Respondent).unwrap();
        assert_eq!(party.name, "EMPRESA X LTDA");
        assert_eq!(party.cnpj(), Some("12345678000190"));
        assert_eq!(party.lawyers.len(), 1);
        assert_eq!(party.lawyers[0].name, "MARIA SOUZA");
        assert_eq!(party.lawyers[0].cpf(), Some("11122233344"));
        assert_eq!(party.lawyers[0].oab.as_deref(), Some("BA12345"));
    }

    #[test]
    fn test_party_without_tax_id() {
        let doc = Document::parse(
            "<table><tbody><tr><td><span><span>FULANO DE TAL (AUTOR)</span></span></td></tr></tbody></table>",
        )
        .unwrap();
        let row = doc.select_first("tr").unwrap().unwrap();

        let party = Pje1gTjba::new().party(&row, PartyRole::Claimant).unwrap();
        assert_eq!(party.name, "FULANO DE TAL");
        assert_eq!(party.no_cpf_cnpj_reason(), Some(NOT_REGISTERED));
        assert!(party.lawyers.is_empty());
    }
}
