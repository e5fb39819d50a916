//! Helpers shared by the docket extractors.

use std::sync::LazyLock;

use regex::Regex;

use crate::date::find_extended_date;
use crate::model::DocketEntry;

static TRAILING_PARENTHETICAL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(.+)\(.+\)$").unwrap());
static NUMBERED: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(\d+) - (.+)$").unwrap());

/// Splits a numbered document title (`"123 - Petição"`) into id and title.
///
/// Titles without the numeric prefix have no id and keep their text.
pub fn split_numbered_title(title: &str) -> (Option<String>, String) {
    let title = title.trim();
    match NUMBERED.captures(title) {
        Some(caps) => (Some(caps[1].to_string()), caps[2].trim().to_string()),
        None => (None, title.to_string()),
    }
}

/// Drops a trailing parenthetical from a document title.
///
/// # Example
///
/// ```rust
/// use juscrape_core::docket::strip_trailing_parenthetical;
///
/// assert_eq!(strip_trailing_parenthetical("Petição Inicial (Petição Inicial)"), "Petição Inicial");
/// assert_eq!(strip_trailing_parenthetical("Despacho"), "Despacho");
/// ```
pub fn strip_trailing_parenthetical(title: &str) -> String {
    match TRAILING_PARENTHETICAL.captures(title.trim()) {
        Some(caps) if !caps[1].trim().is_empty() => caps[1].trim().to_string(),
        _ => title.trim().to_string(),
    }
}

/// Whether a document is the postal return-receipt (AR) template.
pub fn is_return_receipt(text: &str) -> bool {
    let text = text.to_lowercase();
    ["endereço para devolução do ar", "assinatura do recebedor", "rubrica e matrícula do carteiro"]
        .iter()
        .all(|marker| text.contains(marker))
}

/// The upcoming hearing announced in the docket.
///
/// Considers the entries whose label mentions a hearing and that were not
/// cancelled; the last one of those must carry an extended date in its
/// observation, which becomes the date of the returned copy.
pub fn next_hearing(docket: &[DocketEntry]) -> Option<DocketEntry> {
    let last = docket
        .iter()
        .filter(|entry| !entry.cancelled && entry.label.to_lowercase().contains("audiência"))
        .next_back()?;
    let scheduled = find_extended_date(last.observation.as_deref()?)?;
    Some(last.with_date(scheduled))
}
