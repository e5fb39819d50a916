//! The extracted case record.
//!
//! Every value here is built fresh by one extraction and handed to the
//! caller; nothing is shared between calls.

use std::fmt;

use serde::Serialize;
use time::OffsetDateTime;

use crate::{Result, ScrapeError};

/// The court-management system a record was extracted from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum CourtSystem {
    /// Projudi, Tribunal de Justiça da Bahia.
    ProjudiTjba,
    /// PJe first grade, Tribunal de Justiça da Bahia.
    Pje1gTjba,
    /// PJe first grade, Tribunal Regional do Trabalho da 5ª Região.
    Pje1gTrt5,
}

impl CourtSystem {
    pub const ALL: [CourtSystem; 3] = [CourtSystem::ProjudiTjba, CourtSystem::Pje1gTjba, CourtSystem::Pje1gTrt5];

    /// Stable identifier, as serialized.
    pub fn id(&self) -> &'static str {
        match self {
            CourtSystem::ProjudiTjba => "projudiTjba",
            CourtSystem::Pje1gTjba => "pje1gTjba",
            CourtSystem::Pje1gTrt5 => "pje1gTrt5",
        }
    }

    /// Host serving the system.
    pub fn host(&self) -> &'static str {
        match self {
            CourtSystem::ProjudiTjba => "projudi.tjba.jus.br",
            CourtSystem::Pje1gTjba => "pje.tjba.jus.br",
            CourtSystem::Pje1gTrt5 => "pje.trt5.jus.br",
        }
    }

    /// The system served by `host`, if any.
    pub fn from_host(host: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|system| system.host().eq_ignore_ascii_case(host))
    }
}

impl std::fmt::Display for CourtSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}

/// A labelled value with the id the source system assigns to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tag {
    pub id: Option<u32>,
    pub value: String,
}

impl Tag {
    pub fn new(value: impl Into<String>) -> Self {
        Self { id: None, value: value.into() }
    }

    pub fn with_id(id: u32, value: impl Into<String>) -> Self {
        Self { id: Some(id), value: value.into() }
    }
}

/// Role of a party in the case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PartyRole {
    Claimant,
    Respondent,
    Witness,
    ThirdParty,
    OpposingCounsel,
    Magistrate,
    Expert,
    Assistant,
    Administrator,
    Clerk,
    Other,
}

/// Brazilian tax registration of a party.
///
/// Identifiers are kept as bare digits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TaxId {
    /// CPF, 11 digits.
    Personal { cpf: String },
    /// CNPJ, 14 digits.
    Corporate { cnpj: String },
    /// The system has no usable registration for the party.
    NotRegistered { reason: String },
    /// Not shown by the system (lawyers usually).
    Unknown,
}

impl TaxId {
    /// Classifies a raw identifier by its digit count.
    ///
    /// 11 digits is a CPF, 14 a CNPJ; anything else (including an empty
    /// string) is reported as not registered with `reason`.
    ///
    /// # Example
    ///
    /// ```rust
    /// use juscrape_core::model::TaxId;
    ///
    /// let id = TaxId::classify("123.456.789-01", "Não cadastrado no PJe");
    /// assert_eq!(id.cpf(), Some("12345678901"));
    /// assert!(!id.dont_have_cpf_cnpj());
    /// ```
    pub fn classify(raw: &str, reason: &str) -> Self {
        let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
        match digits.len() {
            11 => TaxId::Personal { cpf: digits },
            14 => TaxId::Corporate { cnpj: digits },
            _ => TaxId::NotRegistered { reason: reason.to_string() },
        }
    }

    /// Lawyers: a CPF when 11 digits are present, otherwise unknown.
    pub fn for_lawyer(raw: &str) -> Self {
        let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
        if digits.len() == 11 { TaxId::Personal { cpf: digits } } else { TaxId::Unknown }
    }

    pub fn cpf(&self) -> Option<&str> {
        match self {
            TaxId::Personal { cpf } => Some(cpf),
            _ => None,
        }
    }

    pub fn cnpj(&self) -> Option<&str> {
        match self {
            TaxId::Corporate { cnpj } => Some(cnpj),
            _ => None,
        }
    }

    pub fn dont_have_cpf_cnpj(&self) -> bool {
        matches!(self, TaxId::NotRegistered { .. })
    }

    pub fn no_cpf_cnpj_reason(&self) -> Option<&str> {
        match self {
            TaxId::NotRegistered { reason } => Some(reason),
            _ => None,
        }
    }
}

/// A party, or a lawyer representing one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Party {
    pub name: String,
    pub role: PartyRole,
    pub tax_id: TaxId,
    /// Identifier of the party inside the court system.
    pub id: Option<String>,
    pub address: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    /// Bar registration (OAB), lawyers only.
    pub oab: Option<String>,
    pub lawyers: Vec<Party>,
    pub errors: Vec<String>,
}

impl Party {
    pub fn new(name: impl Into<String>, role: PartyRole, tax_id: TaxId) -> Self {
        Self {
            name: name.into(),
            role,
            tax_id,
            id: None,
            address: None,
            email: None,
            phone: None,
            oab: None,
            lawyers: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// A lawyer; the role is always [`PartyRole::OpposingCounsel`].
    pub fn lawyer(name: impl Into<String>, tax_id: TaxId, oab: Option<String>) -> Self {
        Self { oab, ..Self::new(name, PartyRole::OpposingCounsel, tax_id) }
    }

    pub fn cpf(&self) -> Option<&str> {
        self.tax_id.cpf()
    }

    pub fn cnpj(&self) -> Option<&str> {
        self.tax_id.cnpj()
    }

    pub fn dont_have_cpf_cnpj(&self) -> bool {
        self.tax_id.dont_have_cpf_cnpj()
    }

    pub fn no_cpf_cnpj_reason(&self) -> Option<&str> {
        self.tax_id.no_cpf_cnpj_reason()
    }
}

/// One event of the case timeline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocketEntry {
    /// Label as the court system shows it.
    pub label: String,
    #[serde(with = "time::serde::rfc3339")]
    pub date: OffsetDateTime,
    pub id: Option<String>,
    /// Title plus any document text.
    pub observation: Option<String>,
    pub agent: Option<String>,
    pub cancelled: bool,
    pub errors: Vec<String>,
}

impl DocketEntry {
    pub fn new(label: impl Into<String>, date: OffsetDateTime) -> Self {
        Self { label: label.into(), date, id: None, observation: None, agent: None, cancelled: false, errors: Vec::new() }
    }

    /// A copy of this entry dated `date`.
    pub fn with_date(&self, date: OffsetDateTime) -> Self {
        Self { date, ..self.clone() }
    }
}

/// The court unit handling a case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JudicialUnit {
    pub name: String,
}

impl JudicialUnit {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// A case record.
///
/// `number` and `system` are always present; everything else is best-effort.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Case {
    pub number: String,
    pub system: CourtSystem,
    pub url: Option<String>,
    pub claimants: Vec<Party>,
    pub respondents: Vec<Party>,
    pub others: Vec<Party>,
    /// Timeline in reverse page order.
    pub docket: Vec<DocketEntry>,
    pub claims: Vec<String>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub filing_date: Option<OffsetDateTime>,
    pub claim_value: Option<f64>,
    pub causes_of_action: Vec<Tag>,
    pub action_types: Vec<Tag>,
    pub judicial_unit: Option<JudicialUnit>,
    pub judge: Option<String>,
    pub next_hearing: Option<DocketEntry>,
    pub secrecy: Option<bool>,
    pub parent_case: Option<String>,
    pub regional_number: Option<String>,
    pub incident_numbers: Vec<String>,
    pub related_numbers: Vec<String>,
    /// Extraction steps that failed without aborting the record.
    pub errors: Vec<StepFailure>,
}

/// A step of the extraction whose failure is contained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionStep {
    Docket,
    Parties,
}

impl fmt::Display for ExtractionStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtractionStep::Docket => f.write_str("docket"),
            ExtractionStep::Parties => f.write_str("parties"),
        }
    }
}

/// A contained failure, keeping what callers need to decide on a retry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepFailure {
    pub step: ExtractionStep,
    pub message: String,
    /// Whether [`ScrapeError::is_retryable`] held for the underlying error.
    pub retryable: bool,
}

impl StepFailure {
    pub fn new(step: ExtractionStep, error: &ScrapeError) -> Self {
        Self { step, message: error.to_string(), retryable: error.is_retryable() }
    }
}

impl fmt::Display for StepFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.step, self.message)
    }
}

impl Case {
    pub fn new(number: impl Into<String>, system: CourtSystem) -> Self {
        Self {
            number: number.into(),
            system,
            url: None,
            claimants: Vec::new(),
            respondents: Vec::new(),
            others: Vec::new(),
            docket: Vec::new(),
            claims: Vec::new(),
            filing_date: None,
            claim_value: None,
            causes_of_action: Vec::new(),
            action_types: Vec::new(),
            judicial_unit: None,
            judge: None,
            next_hearing: None,
            secrecy: None,
            parent_case: None,
            regional_number: None,
            incident_numbers: Vec::new(),
            related_numbers: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// All parties, claimants first.
    pub fn parties(&self) -> impl Iterator<Item = &Party> {
        self.claimants.iter().chain(&self.respondents).chain(&self.others)
    }

    /// Serializes the record to a JSON value.
    pub fn to_json(&self) -> Result<serde_json::Value> {
        serde_json::to_value(self).map_err(|e| ScrapeError::HtmlParseError(e.to_string()))
    }
}
