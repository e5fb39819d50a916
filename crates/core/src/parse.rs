//! HTML parsing and DOM navigation.
//!
//! This module provides the [`Document`] and [`Element`] types used by every
//! extractor: a parsed snapshot of a page (or of a fragment of one) and a
//! borrowed handle to one of its elements.
//!
//! # Example
//!
//! ```rust
//! use juscrape_core::parse::Document;
//!
//! let html = r#"
//!     <html>
//!         <body>
//!             <dl><dt>Valor da causa</dt><dd>R$ 10,00</dd></dl>
//!         </body>
//!     </html>
//! "#;
//!
//! let doc = Document::parse(html).unwrap();
//! let label = doc.select_first("dt").unwrap().unwrap();
//! assert_eq!(label.next_sibling_element().unwrap().text(), "R$ 10,00");
//! ```

use scraper::{ElementRef, Html, Selector};

use crate::{Result, ScrapeError};

/// Parses a CSS selector, mapping failures to [`ScrapeError::HtmlParseError`].
pub fn selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| ScrapeError::HtmlParseError(format!("Invalid selector {}: {}", selector, e)))
}

/// A parsed HTML snapshot.
///
/// Snapshots are immutable: when the live page changes (after a click or an
/// asynchronous injection) a new snapshot is taken.
pub struct Document {
    html: Html,
}

impl Document {
    /// Parses a full HTML document.
    pub fn parse(html: &str) -> Result<Self> {
        Ok(Self { html: Html::parse_document(html) })
    }

    /// Parses a markup fragment as if injected into a detached `<div>`.
    pub fn parse_fragment(html: &str) -> Result<Self> {
        Ok(Self { html: Html::parse_fragment(html) })
    }

    /// Gets the raw HTML representation.
    pub fn html(&self) -> &Html {
        &self.html
    }

    /// Gets the entire HTML as a string.
    pub fn as_string(&self) -> String {
        self.html.html()
    }

    /// The root element (`<html>`), usable as a search container.
    pub fn root(&self) -> Element<'_> {
        Element { element: self.html.root_element() }
    }

    /// Selects elements using a CSS selector.
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeError::HtmlParseError`] if the selector is invalid.
    ///
    /// # Example
    ///
    /// ```rust
    /// use juscrape_core::parse::Document;
    ///
    /// let html = r#"<p class="content">First</p><p class="content">Second</p>"#;
    /// let doc = Document::parse(html).unwrap();
    /// let elements = doc.select("p.content").unwrap();
    /// assert_eq!(elements.len(), 2);
    /// ```
    pub fn select(&'_ self, selector: &str) -> Result<Vec<Element<'_>>> {
        let sel = self::selector(selector)?;
        Ok(self.html.select(&sel).map(|el| Element { element: el }).collect())
    }

    /// Selects the first element matching a CSS selector, in document order.
    pub fn select_first(&'_ self, selector: &str) -> Result<Option<Element<'_>>> {
        let sel = self::selector(selector)?;
        Ok(self.html.select(&sel).next().map(|el| Element { element: el }))
    }

    /// Gets all text content from the document.
    pub fn text_content(&self) -> String {
        self.html.root_element().text().collect()
    }

    /// Number of element children of `<head>` (0 when there is none).
    pub fn head_children_count(&self) -> usize {
        self.select_first("head")
            .ok()
            .flatten()
            .map(|head| head.children().len())
            .unwrap_or(0)
    }

    /// Number of element children of `<body>` (0 when there is none).
    pub fn body_children_count(&self) -> usize {
        self.select_first("body")
            .ok()
            .flatten()
            .map(|body| body.children().len())
            .unwrap_or(0)
    }

    /// Inner markup of `<body>`, or the whole document when there is no body.
    pub fn body_inner_html(&self) -> String {
        match self.select_first("body").ok().flatten() {
            Some(body) => body.inner_html(),
            None => self.as_string(),
        }
    }
}

/// A wrapper around scraper's ElementRef.
///
/// # Example
///
/// ```rust
/// use juscrape_core::parse::Document;
///
/// let html = r#"<a href="/projudi/listagens/DadosProcesso?numeroProcesso=1">0000001-02.2023.8.05.0001</a>"#;
/// let doc = Document::parse(html).unwrap();
/// let link = &doc.select("a").unwrap()[0];
///
/// assert_eq!(link.text(), "0000001-02.2023.8.05.0001");
/// assert!(link.attr("href").unwrap().contains("DadosProcesso"));
/// ```
#[derive(Clone, Copy, Debug)]
pub struct Element<'a> {
    element: ElementRef<'a>,
}

impl<'a> Element<'a> {
    /// Gets the inner HTML of this element.
    pub fn inner_html(&self) -> String {
        self.element.inner_html()
    }

    /// Gets the outer HTML of this element.
    pub fn outer_html(&self) -> String {
        self.element.html()
    }

    /// Gets the text content of this element (all descendant text nodes).
    pub fn text(&self) -> String {
        self.element.text().collect()
    }

    /// Gets the trimmed text content of this element.
    pub fn trimmed_text(&self) -> String {
        self.text().trim().to_string()
    }

    /// Text of the direct text-node children only, trimmed.
    pub fn own_text(&self) -> String {
        self.element
            .children()
            .filter_map(|node| node.value().as_text().map(|t| t.to_string()))
            .collect::<String>()
            .trim()
            .to_string()
    }

    /// Gets the value of an attribute.
    pub fn attr(&self, name: &str) -> Option<&'a str> {
        self.element.value().attr(name)
    }

    /// Gets the `id` attribute.
    pub fn id(&self) -> Option<&'a str> {
        self.element.value().id()
    }

    /// Gets the lowercase tag name.
    pub fn tag_name(&self) -> String {
        self.element.value().name().to_lowercase()
    }

    /// Whether the element carries the given class.
    pub fn has_class(&self, class: &str) -> bool {
        self.element.value().classes().any(|c| c == class)
    }

    /// Selects descendant elements using a CSS selector.
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeError::HtmlParseError`] if the selector is invalid.
    pub fn select(&self, selector: &str) -> Result<Vec<Element<'a>>> {
        let sel = self::selector(selector)?;
        Ok(self.element.select(&sel).map(|el| Element { element: el }).collect())
    }

    /// Selects the first descendant matching a CSS selector.
    pub fn select_first(&self, selector: &str) -> Result<Option<Element<'a>>> {
        let sel = self::selector(selector)?;
        Ok(self.element.select(&sel).next().map(|el| Element { element: el }))
    }

    /// Whether this element itself matches a CSS selector.
    pub fn matches(&self, selector: &str) -> Result<bool> {
        let sel = self::selector(selector)?;
        Ok(sel.matches(&self.element))
    }

    /// Direct element children, in document order.
    pub fn children(&self) -> Vec<Element<'a>> {
        self.element
            .children()
            .filter_map(ElementRef::wrap)
            .map(|el| Element { element: el })
            .collect()
    }

    /// Direct element children matching a CSS selector.
    pub fn children_matching(&self, selector: &str) -> Result<Vec<Element<'a>>> {
        let sel = self::selector(selector)?;
        Ok(self
            .element
            .children()
            .filter_map(ElementRef::wrap)
            .filter(|el| sel.matches(el))
            .map(|el| Element { element: el })
            .collect())
    }

    /// The next element sibling, skipping text and comment nodes.
    pub fn next_sibling_element(&self) -> Option<Element<'a>> {
        self.element
            .next_siblings()
            .find_map(ElementRef::wrap)
            .map(|el| Element { element: el })
    }

    /// The previous element sibling, skipping text and comment nodes.
    pub fn prev_sibling_element(&self) -> Option<Element<'a>> {
        self.element
            .prev_siblings()
            .find_map(ElementRef::wrap)
            .map(|el| Element { element: el })
    }

    /// The parent element, if any.
    pub fn parent_element(&self) -> Option<Element<'a>> {
        self.element.parent().and_then(ElementRef::wrap).map(|el| Element { element: el })
    }

    /// A structural selector (`html > body:nth-child(2) > ...`) that
    /// addresses this element in the snapshot it came from.
    ///
    /// Used to replay simulated clicks on the live page.
    pub fn css_path(&self) -> String {
        let mut segments = Vec::new();
        let mut current = Some(*self);

        while let Some(el) = current {
            let parent = el.parent_element();
            let segment = match parent {
                Some(p) => {
                    let position = p
                        .children()
                        .iter()
                        .position(|child| child.element == el.element)
                        .map(|i| i + 1)
                        .unwrap_or(1);
                    format!("{}:nth-child({})", el.tag_name(), position)
                }
                None => el.tag_name(),
            };
            segments.push(segment);
            current = parent;
        }

        segments.reverse();
        segments.join(" > ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_HTML: &str = r#"
        <!DOCTYPE html>
        <html lang="pt-BR">
        <head>
            <meta charset="UTF-8">
            <title>Consulta Processual</title>
        </head>
        <body>
            <div id="maisDetalhes">
                <dl>
                    <dt>Classe judicial</dt>
                    <dd>PROCEDIMENTO COMUM CÍVEL (7)</dd>
                    <dt>Assunto</dt>
                    <dd>Indenização por Dano Moral (10433)</dd>
                </dl>
            </div>
            <td class="obs">Juntada <b>de</b> petição</td>
            <a href="https://example.com">Link</a>
        </body>
        </html>
    "#;

    #[test]
    fn test_parse_document() {
        let doc = Document::parse(SAMPLE_HTML).unwrap();
        assert_eq!(doc.head_children_count(), 2);
    }

    #[test]
    fn test_select_and_siblings() {
        let doc = Document::parse(SAMPLE_HTML).unwrap();
        let labels = doc.select("#maisDetalhes dt").unwrap();

        assert_eq!(labels.len(), 2);
        assert_eq!(labels[1].next_sibling_element().unwrap().trimmed_text(), "Indenização por Dano Moral (10433)");
        assert_eq!(labels[1].prev_sibling_element().unwrap().tag_name(), "dd");
    }

    #[test]
    fn test_own_text_skips_descendants() {
        let doc = Document::parse("<div class='obs'>Juntada <b>de</b> petição</div>").unwrap();
        let el = doc.select_first("div.obs").unwrap().unwrap();
        assert_eq!(el.own_text(), "Juntada  petição");
        assert_eq!(el.text(), "Juntada de petição");
    }

    #[test]
    fn test_invalid_selector() {
        let doc = Document::parse(SAMPLE_HTML).unwrap();
        let result = doc.select("[[invalid");

        assert!(matches!(result, Err(ScrapeError::HtmlParseError(_))));
    }

    #[test]
    fn test_css_path_round_trips() {
        let doc = Document::parse(SAMPLE_HTML).unwrap();
        let dd = doc.select("#maisDetalhes dd").unwrap()[1];
        let path = dd.css_path();

        assert!(path.starts_with("html > body:nth-child(2)"));
        let found = doc.select_first(&path).unwrap().unwrap();
        assert_eq!(found.trimmed_text(), "Indenização por Dano Moral (10433)");
    }

    #[test]
    fn test_children_matching() {
        let doc = Document::parse("<ul><li class='a'>1</li><li>2</li><li class='a'>3</li></ul>").unwrap();
        let ul = doc.select_first("ul").unwrap().unwrap();
        let items = ul.children_matching("li.a").unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[1].text(), "3");
    }
}
