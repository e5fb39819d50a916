//! Label-driven value lookup.
//!
//! Case pages present metadata as label/value sibling pairs (`dt`/`dd`,
//! `td`/`td`) whose position drifts between page versions. The locator first
//! tries the position the value usually has, then scans every candidate
//! label in document order.

use crate::parse::Element;

/// Finds the element following the label that contains `label`.
///
/// `fast_guess` is tried first; when its text does not contain `label`
/// (case-insensitive), every element matching `iterable` under `container`
/// is checked in document order and the first match wins. An invalid
/// selector counts as no match.
pub fn locate_value_element<'a>(
    container: &Element<'a>, fast_guess: &str, iterable: &str, label: &str,
) -> Option<Element<'a>> {
    let needle = label.to_lowercase();
    let is_label = |el: &Element<'a>| el.text().to_lowercase().contains(&needle);

    if let Ok(Some(guess)) = container.select_first(fast_guess)
        && is_label(&guess)
    {
        return guess.next_sibling_element();
    }

    container
        .select(iterable)
        .ok()?
        .into_iter()
        .find(is_label)
        .and_then(|found| found.next_sibling_element())
}

/// Trimmed text of the value following `label`, or `None` when absent.
///
/// # Example
///
/// ```rust
/// use juscrape_core::locate::locate_value;
/// use juscrape_core::parse::Document;
///
/// let doc = Document::parse(
///     "<table><tr><td>Valor da Causa:</td><td> R$ 1.234,56 </td></tr></table>",
/// )
/// .unwrap();
/// let value = locate_value(&doc.root(), "tr:nth-child(15) > td", "tr td", "valor da causa");
/// assert_eq!(value.as_deref(), Some("R$ 1.234,56"));
/// ```
pub fn locate_value(container: &Element<'_>, fast_guess: &str, iterable: &str, label: &str) -> Option<String> {
    locate_value_element(container, fast_guess, iterable, label).map(|el| el.trimmed_text())
}
