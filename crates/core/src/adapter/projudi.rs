//! Projudi, Tribunal de Justiça da Bahia.
//!
//! A server-rendered legacy system: everything lives in the initial
//! snapshot except the docket attachments, which are standalone
//! windows-1252 pages fetched over HTTP.

use time::OffsetDateTime;
use tracing::{debug, warn};

use super::{CourtAdapter, ExtractionContext, HomepageRules, Parties, Session, UrlPattern, node, required};
use crate::date::DateFormat;
use crate::docket::{is_return_receipt, next_hearing};
use crate::fetch::{LegacyFetcher, NoFetch, fetch_legacy_text, resolve_url};
use crate::locate::{locate_value, locate_value_element};
use crate::model::{CourtSystem, DocketEntry, JudicialUnit, Party, PartyRole, Tag, TaxId};
use crate::parse::{Document, Element};
use crate::party::parse_contact;
use crate::text::{parse_currency, squash_whitespace, strip_blank_lines};
use crate::{Result, ScrapeError};

const CASE_PATH: &str = "/projudi/listagens/DadosProcesso?numeroProcesso=";
const NOT_REGISTERED: &str = "Não cadastrado no Projudi";
const LABELS: &str = "tr td";

/// Anchor nodes of a Projudi case page.
#[derive(Debug, Clone, Copy)]
pub struct ProjudiCheckpoints<'d> {
    /// `#Partes`, holding the case number link.
    pub parties: Element<'d>,
    /// The label/value table inside `#Partes`.
    pub details: Element<'d>,
    /// Body of the `#Arquivos` table, absent on pages without a docket.
    pub docket: Option<Element<'d>>,
}

/// Projudi TJBA adapter.
///
/// `F` fetches the legacy docket attachments.
#[derive(Debug, Clone)]
pub struct ProjudiTjba<F = NoFetch> {
    fetcher: F,
}

impl ProjudiTjba<NoFetch> {
    /// An adapter that never fetches attachments.
    pub fn offline() -> Self {
        Self { fetcher: NoFetch }
    }
}

impl<F: LegacyFetcher> ProjudiTjba<F> {
    pub fn new(fetcher: F) -> Self {
        Self { fetcher }
    }

    fn number_link<'d>(&self, ctx: &ExtractionContext<'_, ProjudiCheckpoints<'d>>) -> Result<Element<'d>> {
        let selector = format!("a[href*=\"{}\"]", CASE_PATH);
        node(ctx.checkpoints.parties.select_first(&selector)?, &selector)
    }

    fn detail(&self, ctx: &ExtractionContext<'_, ProjudiCheckpoints<'_>>, fast_guess: &str, label: &str) -> Option<String> {
        locate_value(&ctx.checkpoints.details, fast_guess, LABELS, label)
    }

    /// The "Juízo" cell reads `<unit> Juiz: <name> Histórico de Juízes`.
    fn court_and_judge(&self, ctx: &ExtractionContext<'_, ProjudiCheckpoints<'_>>) -> Option<(String, Option<String>)> {
        let cell = squash_whitespace(&self.detail(ctx, "tr:nth-child(7) > td:first-child", "juízo")?);
        let (unit, judge) = match cell.split_once(" Juiz: ") {
            Some((unit, judge)) => (unit, Some(judge.replace(" Histórico de Juízes", "").trim().to_string())),
            None => (cell.as_str(), None),
        };
        Some((unit.trim().to_string(), judge.filter(|j| !j.is_empty())))
    }

    fn breadcrumb_tags(&self, value: Option<String>) -> Vec<Tag> {
        value
            .map(|value| value.rsplit(" « ").map(|part| Tag::new(part.trim())).collect())
            .unwrap_or_default()
    }

    fn polo(&self, cell: Option<Element<'_>>, role: PartyRole) -> Result<Vec<Party>> {
        let Some(cell) = cell else {
            return Ok(Vec::new());
        };
        let Some(tbody) = cell.select_first("table.tabelaLista[id^=tabelaPartes] > tbody")? else {
            return Ok(Vec::new());
        };

        tbody
            .children_matching("tr[id]:not([id^=trAdv])")?
            .into_iter()
            .map(|row| self.party(&cell, &row, role))
            .collect()
    }

    fn party(&self, cell: &Element<'_>, row: &Element<'_>, role: PartyRole) -> Result<Party> {
        let cells = row.children_matching("td")?;
        let name = node(cells.get(1), "td:nth-child(2)")?.trimmed_text();
        let tax_id = cells
            .get(3)
            .map(|td| td.trimmed_text())
            .unwrap_or_default()
            .lines()
            .next()
            .map(|line| TaxId::classify(line, NOT_REGISTERED))
            .unwrap_or_else(|| TaxId::classify("", NOT_REGISTERED));

        let id = row.id().unwrap_or_default().replacen("tr", "", 1);
        let mut party = Party::new(name, role, tax_id);

        if let Some(span) = cell.select_first(&format!("span[id^=\"spanEnd{}\"]", id))? {
            let contact = parse_contact(&squash_whitespace(&span.text()));
            party.address = contact.address;
            party.email = contact.email;
            party.phone = contact.phone;
        }

        let lawyers = format!("span[id^=\"spanAdv{}\"] table[id^=\"tabelaAdvogadoPartes\"] > tbody", id);
        if let Some(tbody) = cell.select_first(&lawyers)? {
            for row in tbody.select("tr[class]:not([class=\"ultimaLinha\"])")? {
                party.lawyers.push(self.lawyer(&row)?);
            }
        }

        party.id = (!id.is_empty()).then_some(id);
        Ok(party)
    }

    /// Lawyer rows read `NAME (CPF: 000.000.000-00)` followed by the OAB cell.
    fn lawyer(&self, row: &Element<'_>) -> Result<Party> {
        let cells = row.children_matching("td")?;
        let identity = node(cells.first(), "td:nth-child(1)")?.trimmed_text();
        let oab = cells.get(1).map(|td| td.trimmed_text()).filter(|oab| !oab.is_empty());

        let (name, cpf) = match identity.split_once(" (CPF:") {
            Some((name, cpf)) => (name, cpf.replace(')', "")),
            None => (identity.as_str(), String::new()),
        };
        Ok(Party::lawyer(name.trim(), TaxId::for_lawyer(&cpf), oab))
    }

    async fn docket_entry(&self, session: Session<'_>, row: &Element<'_>) -> Result<DocketEntry> {
        let inner = node(row.select_first("td > table > tbody > tr")?, "td > table > tbody > tr")?;
        let cells = inner.children_matching("td")?;
        let cell = |index: usize| node(cells.get(index).copied(), &format!("td:nth-child({})", index + 1));

        let name_cell = cell(1)?;
        let cancelled = name_cell.inner_html().contains("strike");
        let label = name_cell
            .select_first("b > font")?
            .map(|font| font.trimmed_text())
            .unwrap_or_default();
        let date = DateFormat::Numeric.parse(&cell(2)?.trimmed_text(), None)?;

        let mut entry = DocketEntry::new(label, date);
        entry.cancelled = cancelled;
        entry.id = Some(cell(0)?.trimmed_text()).filter(|id| !id.is_empty());
        entry.agent = Some(cell(3)?.trimmed_text()).filter(|agent| !agent.is_empty());

        let under_label = if cancelled {
            name_cell.select_first("strike")?.map(|s| s.trimmed_text()).unwrap_or_default()
        } else {
            name_cell.own_text()
        };
        let in_button = row
            .select_first("td > table + span:first-of-type")?
            .map(|span| span.trimmed_text())
            .unwrap_or_default();

        let mut document = String::new();
        if session.config.fetch_documents
            && let Some(url) = self.attachment_url(session, row)?
        {
            match session.cancellable(fetch_legacy_text(&self.fetcher, &url)).await {
                Ok(text) if is_return_receipt(&text) => debug!(url = %url, "discarding return receipt"),
                Ok(text) => document = text,
                Err(ScrapeError::Cancelled) => return Err(ScrapeError::Cancelled),
                Err(ScrapeError::FetchDisabled { .. }) => debug!(url = %url, "attachment not fetched"),
                Err(e) => {
                    warn!(url = %url, error = %e, "attachment fetch failed");
                    entry.errors.push(e.to_string());
                }
            }
        }

        let observation = strip_blank_lines(&format!("{}\n{}\n{}", under_label, in_button, document));
        entry.observation = (!observation.is_empty()).then_some(observation);
        Ok(entry)
    }

    /// URL of the last `online.html` attachment listed under a docket row.
    fn attachment_url(&self, session: Session<'_>, row: &Element<'_>) -> Result<Option<String>> {
        let mut href = None;
        for attachment in row.select("td > table ~ span[id^=\"sub\"] > div > div > table > tbody > tr")? {
            if let Some(link) = attachment.select_first("td:nth-child(4) > a")?
                && link.trimmed_text() == "online.html"
            {
                href = link.attr("href");
            }
        }
        href.map(|href| resolve_url(&session.page.url(), href)).transpose()
    }
}

impl<F: LegacyFetcher> CourtAdapter for ProjudiTjba<F> {
    type Checkpoints<'d> = ProjudiCheckpoints<'d>;

    fn system(&self) -> CourtSystem {
        CourtSystem::ProjudiTjba
    }

    fn homepage_rules(&self) -> HomepageRules {
        HomepageRules {
            required_path: CASE_PATH,
            ignore: vec![
                UrlPattern::Contains("https://projudi.tjba.jus.br/projudi/scripts/subModal/carregando.html"),
                UrlPattern::Contains("https://projudi.tjba.jus.br/projudi/Cabecalho.jsp"),
                UrlPattern::Contains("https://projudi.tjba.jus.br/projudi/advogado/CentroAdvogado"),
                UrlPattern::Exact("https://projudi.tjba.jus.br/projudi/"),
            ],
        }
    }

    async fn load_checkpoints<'d>(&self, _session: Session<'d>, document: &'d Document) -> Result<ProjudiCheckpoints<'d>> {
        let parties = required(document.select_first("#Partes")?, "parties", "#Partes")?;
        let details = required(parties.select_first("table > tbody")?, "details", "#Partes table > tbody")?;
        let docket = document.select_first("#Arquivos > table > tbody")?;
        Ok(ProjudiCheckpoints { parties, details, docket })
    }

    fn parties(&self, ctx: &ExtractionContext<'_, ProjudiCheckpoints<'_>>) -> Result<Parties> {
        let rows = ctx.checkpoints.details.children_matching("tr")?;

        let claimants = self.polo(polo_cell(&rows, 1)?, PartyRole::Claimant)?;
        let respondents = self.polo(polo_cell(&rows, 2)?, PartyRole::Respondent)?;
        let mut others = self.polo(polo_cell(&rows, 3)?, PartyRole::Witness)?;
        others.extend(self.polo(polo_cell(&rows, 4)?, PartyRole::ThirdParty)?);

        Ok(Parties { claimants, respondents, others })
    }

    async fn docket(&self, ctx: &ExtractionContext<'_, Self::Checkpoints<'_>>) -> Result<Vec<DocketEntry>> {
        let Some(tbody) = ctx.checkpoints.docket else {
            debug!("page has no docket table");
            return Ok(Vec::new());
        };

        let mut entries = Vec::new();
        for row in tbody.children_matching("tr")?.iter().skip(1) {
            entries.push(self.docket_entry(ctx.session, row).await?);
        }
        entries.reverse();
        Ok(entries)
    }

    fn case_number(&self, ctx: &ExtractionContext<'_, ProjudiCheckpoints<'_>>) -> Result<String> {
        Ok(self.number_link(ctx)?.trimmed_text())
    }

    fn source_url(&self, ctx: &ExtractionContext<'_, ProjudiCheckpoints<'_>>) -> Result<Option<String>> {
        match self.number_link(ctx)?.attr("href") {
            Some(href) => resolve_url(&ctx.session.page.url(), href).map(Some),
            None => Ok(Some(ctx.session.page.url())),
        }
    }

    fn filing_date(&self, ctx: &ExtractionContext<'_, ProjudiCheckpoints<'_>>) -> Result<Option<OffsetDateTime>> {
        let Some(value) = self.detail(ctx, "tr:nth-child(14) > td:nth-child(3)", "data de distribuição") else {
            return Ok(None);
        };
        match DateFormat::ExtendedPortuguese.parse(&value, None) {
            Ok(date) => Ok(Some(date)),
            Err(e) => {
                warn!(value = %value, error = %e, "unreadable filing date");
                Ok(None)
            }
        }
    }

    fn claim_value(&self, ctx: &ExtractionContext<'_, ProjudiCheckpoints<'_>>) -> Result<Option<f64>> {
        Ok(self
            .detail(ctx, "tr:nth-child(15) > td:first-child", "valor da causa")
            .and_then(|value| parse_currency(&value)))
    }

    fn causes_of_action(&self, ctx: &ExtractionContext<'_, ProjudiCheckpoints<'_>>) -> Result<Vec<Tag>> {
        Ok(self.breadcrumb_tags(self.detail(ctx, "tr:nth-child(8) > td:first-child", "assunto")))
    }

    fn action_types(&self, ctx: &ExtractionContext<'_, ProjudiCheckpoints<'_>>) -> Result<Vec<Tag>> {
        Ok(self.breadcrumb_tags(self.detail(ctx, "tr:nth-child(10) > td:first-child", "classe")))
    }

    fn judicial_unit(&self, ctx: &ExtractionContext<'_, ProjudiCheckpoints<'_>>) -> Result<Option<JudicialUnit>> {
        Ok(self
            .court_and_judge(ctx)
            .map(|(unit, _)| unit)
            .filter(|unit| !unit.is_empty())
            .map(JudicialUnit::new))
    }

    fn presiding_judge(&self, ctx: &ExtractionContext<'_, ProjudiCheckpoints<'_>>) -> Result<Option<String>> {
        Ok(self.court_and_judge(ctx).and_then(|(_, judge)| judge))
    }

    fn next_hearing(
        &self, _ctx: &ExtractionContext<'_, ProjudiCheckpoints<'_>>, docket: &[DocketEntry],
    ) -> Result<Option<DocketEntry>> {
        Ok(next_hearing(docket))
    }

    fn secrecy(&self, ctx: &ExtractionContext<'_, ProjudiCheckpoints<'_>>) -> Result<Option<bool>> {
        Ok(Some(
            self.detail(ctx, "tr:nth-child(11) > td:first-child", "segredo de justiça")
                .is_some_and(|value| value == "SIM"),
        ))
    }

    fn parent_case(&self, ctx: &ExtractionContext<'_, ProjudiCheckpoints<'_>>) -> Result<Option<String>> {
        Ok(self
            .detail(ctx, "tr:nth-child(6) > td:first-child", "proc. principal")
            .filter(|value| !value.is_empty() && !value.to_lowercase().contains("o próprio")))
    }

    fn related_numbers(&self, ctx: &ExtractionContext<'_, ProjudiCheckpoints<'_>>) -> Result<Vec<String>> {
        Ok(self
            .detail(ctx, "tr:nth-child(6) > td:nth-child(3)", "proc. dependentes")
            .filter(|value| !value.is_empty())
            .into_iter()
            .collect())
    }

    /// Complementary claims, one per row of the nested table.
    fn claims(&self, ctx: &ExtractionContext<'_, ProjudiCheckpoints<'_>>) -> Result<Vec<String>> {
        let Some(cell) = locate_value_element(
            &ctx.checkpoints.details,
            "tr:nth-child(9) > td:first-child",
            LABELS,
            "complementares",
        ) else {
            return Ok(Vec::new());
        };

        Ok(cell
            .select("table > tbody > tr")?
            .iter()
            .map(|row| squash_whitespace(&row.text()))
            .filter(|claim| !claim.is_empty())
            .collect())
    }
}

/// Second cell of the details row at `index` (claimants, respondents,
/// witnesses and third parties sit in rows 1 to 4).
fn polo_cell<'d>(rows: &[Element<'d>], index: usize) -> Result<Option<Element<'d>>> {
    match rows.get(index) {
        Some(row) => Ok(row.children_matching("td")?.get(1).copied()),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::try_fetch_case_info;
    use crate::page::ScriptedPage;
    use crate::wait::CancelToken;
    use crate::ScrapeConfig;
    use time::macros::datetime;

    const URL: &str = "https://projudi.tjba.jus.br/projudi/listagens/DadosProcesso?numeroProcesso=0000001";

    struct Canned(&'static [u8]);

    impl LegacyFetcher for Canned {
        async fn fetch(&self, _url: &str) -> Result<Vec<u8>> {
            Ok(self.0.to_vec())
        }
    }

    struct NotFound;

    impl LegacyFetcher for NotFound {
        async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
            Err(ScrapeError::DocumentFetch { url: url.to_string(), status: 404 })
        }
    }

    fn page(details: &str, docket_rows: &str) -> String {
        format!(
            r#"<html><body>
            <div id="Partes"><table><tbody>
                <tr><td>Processo</td><td><a href="/projudi/listagens/DadosProcesso?numeroProcesso=0000001">0000001-02.2023.8.05.0001</a></td></tr>
                {details}
            </tbody></table></div>
            <div id="Arquivos"><table><tbody>
                <tr><th>Seq</th></tr>
                {docket_rows}
            </tbody></table></div>
            </body></html>"#
        )
    }

    fn docket_row(id: &str, name_cell: &str, date: &str, attachment: &str) -> String {
        format!(
            r#"<tr><td><table><tbody><tr><td>{id}</td><td>{name_cell}</td><td>{date}</td><td>SERVIDOR</td></tr></tbody></table><span></span>
            <span id="sub{id}"><div><div><table><tbody><tr><td></td><td></td><td></td><td><a href="/projudi/arquivo/{id}/online.html">{attachment}</a></td></tr></tbody></table></div></div></span>
            </td></tr>"#
        )
    }

    async fn extract<F: LegacyFetcher>(adapter: &ProjudiTjba<F>, html: &str) -> crate::model::Case {
        let page = ScriptedPage::new(URL, html);
        try_fetch_case_info(adapter, &page, &ScrapeConfig::default(), &CancelToken::new()).await.unwrap()
    }

    #[test]
    fn test_homepage_rules() {
        let adapter = ProjudiTjba::offline();
        assert!(adapter.is_case_homepage(URL).unwrap());
        assert!(!adapter.is_case_homepage("https://projudi.tjba.jus.br/projudi/").unwrap());
        assert!(adapter.is_case_homepage("https://projudi.tjba.jus.br/projudi/buscas").is_err());
    }

    #[tokio::test]
    async fn test_docket_order_and_cancellation() {
        let rows = [
            docket_row("1", "<b><font>Distribuição</font></b> Por sorteio", "10/01/2023", "outro.pdf"),
            docket_row("2", "<b><font>Despacho</font></b><strike>Cite-se</strike>", "11/01/23", "outro.pdf"),
        ]
        .concat();
        let case = extract(&ProjudiTjba::offline(), &page("", &rows)).await;

        assert_eq!(case.docket.len(), 2);
        assert_eq!(case.docket[0].label, "Despacho");
        assert!(case.docket[0].cancelled);
        assert_eq!(case.docket[0].observation.as_deref(), Some("Cite-se"));
        assert_eq!(case.docket[0].date, datetime!(2023-01-11 0:00 -3));
        assert_eq!(case.docket[1].observation.as_deref(), Some("Por sorteio"));
        assert_eq!(case.docket[1].agent.as_deref(), Some("SERVIDOR"));
        assert!(case.errors.is_empty());
    }

    #[tokio::test]
    async fn test_attachment_text_and_fetch_failure() {
        let rows = docket_row("7", "<b><font>Sentença</font></b>", "10/01/2023", "online.html");

        let case = extract(&ProjudiTjba::new(Canned(b"<body><p>Julgo procedente.</p></body>")), &page("", &rows)).await;
        assert_eq!(case.docket[0].observation.as_deref(), Some("Julgo procedente."));

        let case = extract(&ProjudiTjba::new(NotFound), &page("", &rows)).await;
        assert_eq!(case.docket[0].observation, None);
        assert_eq!(case.docket[0].errors.len(), 1);
        assert!(case.docket[0].errors[0].contains("404"));
        assert!(case.errors.is_empty());
    }

    #[tokio::test]
    async fn test_offline_skips_attachments_quietly() {
        let rows = docket_row("7", "<b><font>Sentença</font></b>", "10/01/2023", "online.html");

        let case = extract(&ProjudiTjba::offline(), &page("", &rows)).await;
        assert_eq!(case.docket[0].label, "Sentença");
        assert_eq!(case.docket[0].observation, None);
        assert!(case.docket[0].errors.is_empty());
        assert!(case.errors.is_empty());
    }

    #[tokio::test]
    async fn test_page_without_docket() {
        let html = page("", "").replace(r#"<div id="Arquivos">"#, r#"<div id="Outros">"#);

        let case = extract(&ProjudiTjba::offline(), &html).await;
        assert!(case.docket.is_empty());
        assert!(case.errors.is_empty());
        assert_eq!(case.number, "0000001-02.2023.8.05.0001");
    }

    #[tokio::test]
    async fn test_return_receipt_is_discarded() {
        let rows = docket_row("7", "<b><font>AR</font></b> Juntada", "10/01/2023", "online.html");
        let receipt: &[u8] =
            b"<body>Endere\xe7o para devolu\xe7\xe3o do AR<br>Assinatura do recebedor<br>Rubrica e matr\xedcula do carteiro</body>";

        let case = extract(&ProjudiTjba::new(Canned(receipt)), &page("", &rows)).await;
        assert_eq!(case.docket[0].observation.as_deref(), Some("Juntada"));
    }

    #[tokio::test]
    async fn test_judge_and_unit() {
        let details = r#"<tr><td>Juízo:</td><td>1ª VARA CÍVEL DE SALVADOR  Juiz: FULANO DE TAL Histórico de Juízes</td></tr>"#;
        let case = extract(&ProjudiTjba::offline(), &page(details, "")).await;

        assert_eq!(case.judicial_unit, Some(JudicialUnit::new("1ª VARA CÍVEL DE SALVADOR")));
        assert_eq!(case.judge.as_deref(), Some("FULANO DE TAL"));
        assert_eq!(case.secrecy, Some(false));
    }
}
