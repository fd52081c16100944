use scraper::{ElementRef, Html, HtmlTreeSink, Selector};
use xml5ever::driver::{XmlParseOpts, parse_document};
use xml5ever::tendril::TendrilSink;

use crate::{ErrorKind, Result};

/// A parsed HTML or XML response body that can be queried with CSS
/// selectors.
///
/// # Examples
///
/// ```
/// # use courier_lib::Document;
/// let document = Document::parse_html("<ul><li>one</li><li>two</li></ul>");
/// let items = document.select("li").unwrap();
/// assert_eq!(items.len(), 2);
/// assert_eq!(items.texts(), vec!["one", "two"]);
/// ```
#[derive(Debug)]
pub struct Document {
    tree: Html,
}

impl Document {
    /// Parse `text` with the HTML5 parsing algorithm.
    #[must_use]
    pub fn parse_html(text: &str) -> Self {
        Self {
            tree: Html::parse_document(text),
        }
    }

    /// Parse `text` as XML.
    ///
    /// Unlike HTML, elements nested in `<script>` or `<style>` are real
    /// elements and can be selected.
    #[must_use]
    pub fn parse_xml(text: &str) -> Self {
        let sink = HtmlTreeSink::new(Html::new_document());
        Self {
            tree: parse_document(sink, XmlParseOpts::default()).one(text),
        }
    }

    /// Select all elements matching a CSS selector, in document order.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::InvalidConfig`] if `css` is not a valid selector.
    pub fn select(&self, css: &str) -> Result<Selection<'_>> {
        let selector = Selector::parse(css)
            .map_err(|e| ErrorKind::InvalidConfig(format!("Invalid CSS selector `{css}`: {e}")))?;
        Ok(Selection {
            elements: self.tree.select(&selector).collect(),
        })
    }

    /// The underlying `scraper` tree
    #[must_use]
    pub const fn tree(&self) -> &Html {
        &self.tree
    }
}

/// The elements matched by [`Document::select`]
#[derive(Debug, Clone)]
pub struct Selection<'a> {
    elements: Vec<ElementRef<'a>>,
}

impl<'a> Selection<'a> {
    /// Number of matched elements
    #[must_use]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Returns `true` if nothing matched.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// The combined text content of all matched elements
    #[must_use]
    pub fn text(&self) -> String {
        self.elements
            .iter()
            .flat_map(ElementRef::text)
            .collect()
    }

    /// The text content of each matched element
    #[must_use]
    pub fn texts(&self) -> Vec<String> {
        self.elements
            .iter()
            .map(|element| element.text().collect())
            .collect()
    }

    /// The value of an attribute on the first matched element
    #[must_use]
    pub fn attr(&self, name: &str) -> Option<&'a str> {
        self.elements.first().and_then(|element| element.attr(name))
    }

    /// Iterate over the matched elements
    pub fn iter(&self) -> impl Iterator<Item = &ElementRef<'a>> {
        self.elements.iter()
    }
}
