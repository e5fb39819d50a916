//! Decomposition of composite party strings.
//!
//! Court systems render a party as one text blob mixing the name, a role
//! tag, a formatted tax id, a bar registration and contact details. The
//! helpers here peel the known patterns off one at a time and keep what is
//! left.

use std::sync::LazyLock;

use regex::Regex;

use crate::text::extended_trim;

static ROLE_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s*\(\p{L}[\p{L} ]*\)\s*$").unwrap());
static LABELLED_TAX_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(CPF: \d{3}\.\d{3}\.\d{3}-\d{2})|(CNPJ: \d{2}\.\d{3}\.\d{3}/\d{4}-\d{2})").unwrap()
});
static TAX_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{3}\.\d{3}\.\d{3}-\d{2})|(\d{2}\.\d{3}\.\d{3}/\d{4}-\d{2})").unwrap());
static OAB: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"OAB ([A-Z]{2}\d{4,}[A-Z]?)").unwrap());
static DANGLING_SEPARATOR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s*-\s*$").unwrap());
static PHONE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\(Contato: (\+?[0-9 ]{10,})\)").unwrap());

/// Email addresses as PJe prints them (lower case).
pub static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"[a-z0-9!#$%&'*+/=?^_`{|}~-]+(?:\.[a-z0-9!#$%&'*+/=?^_`{|}~-]+)*@(?:[a-z0-9](?:[a-z0-9-]*[a-z0-9])?\.)+[a-z0-9](?:[a-z0-9-]*[a-z0-9])?",
    )
    .unwrap()
});

/// Email addresses in free text, any case.
static LOOSE_EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[a-zA-Z0-9.!#$%&’*+/=?^_`{|}~-]+@[a-zA-Z0-9-]+(\.[a-zA-Z0-9-]+)*").unwrap());

/// Bare name of a composite party string.
///
/// Strips, in order: the trailing role tag, a labelled tax id, a dangling
/// separator, the bar registration, and another dangling separator.
///
/// # Example
///
/// ```rust
/// use juscrape_core::party::composite_name;
///
/// assert_eq!(composite_name("JOÃO DA SILVA - CPF: 123.456.789-01 (AUTOR)"), "JOÃO DA SILVA");
/// assert_eq!(composite_name("MARIA SOUZA - OAB BA12345 - CPF: 111.222.333-44 (ADVOGADO)"), "MARIA SOUZA");
/// ```
pub fn composite_name(composite: &str) -> String {
    let without_role = ROLE_TAG.replace(composite.trim(), "");
    let without_tax_id = LABELLED_TAX_ID.replace(&without_role, "");
    let trimmed = DANGLING_SEPARATOR.replace(without_tax_id.trim_end(), "");
    let without_oab = OAB.replace(&trimmed, "");
    DANGLING_SEPARATOR.replace(without_oab.trim_end(), "").trim().to_string()
}

/// First formatted CPF or CNPJ found in `text`.
pub fn find_tax_id(text: &str) -> Option<String> {
    TAX_ID.find(text).map(|m| m.as_str().to_string())
}

/// Bar registration (`BA12345`) found in `text`.
pub fn find_oab(text: &str) -> Option<String> {
    OAB.captures(text).map(|c| c[1].to_string())
}

/// First strict email address found in `text`.
pub fn find_email(text: &str) -> Option<String> {
    EMAIL.find(text).map(|m| m.as_str().to_string())
}

/// Contact details of a party.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Contact {
    pub address: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

/// Splits a squashed contact blob into email, phone and address.
///
/// The email (lower-cased) and the `(Contato: ...)` tag are removed from the
/// blob; what remains, trimmed of commas, is the address.
///
/// # Example
///
/// ```rust
/// use juscrape_core::party::parse_contact;
///
/// let contact = parse_contact("Rua A, 10, Salvador - BA, Fulano@Mail.com (Contato: 71 99999 0000)");
/// assert_eq!(contact.email.as_deref(), Some("fulano@mail.com"));
/// assert_eq!(contact.phone.as_deref(), Some("71 99999 0000"));
/// assert_eq!(contact.address.as_deref(), Some("Rua A, 10, Salvador - BA"));
/// ```
pub fn parse_contact(blob: &str) -> Contact {
    let mut rest = blob.to_string();

    let email = LOOSE_EMAIL.find(blob).map(|m| m.as_str().to_string());
    if let Some(email) = &email {
        rest = rest.replacen(email.as_str(), "", 1);
    }

    let phone = PHONE.captures(blob).map(|c| (c[0].to_string(), c[1].trim().to_string()));
    if let Some((tag, _)) = &phone {
        rest = rest.replacen(tag.as_str(), "", 1);
    }

    let address = extended_trim(&rest, &[',']);
    Contact {
        address: (!address.is_empty()).then_some(address),
        email: email.map(|e| e.to_lowercase()),
        phone: phone.map(|(_, number)| number),
    }
}
