//! Page fetching and field extraction for the statistics site

pub mod columns;
pub mod event;
pub mod fetcher;
pub mod fight_detail;
pub mod fighter;
pub mod rounds;
pub mod stat_text;
pub mod units;

use fetcher::FetchError;
use scraper::{ElementRef, Html};
use url::Url;

/// A parsed document together with the URL it was fetched from
pub struct Page {
    pub document: Html,
    pub url: String,
}

impl Page {
    pub fn parse(html: &str, url: &str) -> Self {
        Page {
            document: Html::parse_document(html),
            url: url.to_string(),
        }
    }

    /// Absolute form of a link found on this page
    pub fn resolve(&self, href: &str) -> Option<String> {
        join_url(&self.url, href)
    }

    /// Text and absolute target of an anchor element
    pub fn link(&self, anchor: ElementRef) -> Option<PageLink> {
        let text = non_empty_text(anchor)?;
        let url = anchor.value().attr("href").and_then(|href| self.resolve(href));
        Some(PageLink { text, url })
    }
}

/// An anchor found on a page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageLink {
    pub text: String,
    pub url: Option<String>,
}

/// Trait for anything that can retrieve a page body by URL
pub trait Fetch {
    /// Fetch the HTML text of a page
    fn fetch(&self, url: &str) -> std::result::Result<String, FetchError>;
}

impl<F: Fetch + ?Sized> Fetch for &F {
    fn fetch(&self, url: &str) -> std::result::Result<String, FetchError> {
        (**self).fetch(url)
    }
}

/// A named extraction strategy
pub type Strategy<I, T> = (&'static str, fn(&I) -> Option<T>);

/// Try each strategy in order and return the first value produced
pub fn first_match<I, T>(input: &I, what: &str, strategies: &[Strategy<I, T>]) -> Option<T> {
    for (name, strategy) in strategies {
        if let Some(value) = strategy(input) {
            log::debug!("{} found by {}", what, name);
            return Some(value);
        }
    }
    log::debug!("{}: no strategy matched", what);
    None
}

/// Text content of an element with whitespace collapsed
pub fn text_of(element: ElementRef) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Text content, or `None` when it is blank
pub fn non_empty_text(element: ElementRef) -> Option<String> {
    let text = text_of(element);
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Nearest parent element
pub fn parent_element(element: ElementRef) -> Option<ElementRef> {
    element.ancestors().find_map(ElementRef::wrap)
}

/// Resolve a possibly relative link against the page it was found on
pub fn join_url(base: &str, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }
    match Url::parse(base) {
        Ok(base) => base.join(href).ok().map(String::from),
        Err(_) => Url::parse(href).ok().map(String::from),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::{Html, Selector};

    fn by_id(doc: &Html) -> Option<String> {
        let selector = Selector::parse("#name").unwrap();
        doc.select(&selector).next().and_then(non_empty_text)
    }

    fn by_heading(doc: &Html) -> Option<String> {
        let selector = Selector::parse("h2").unwrap();
        doc.select(&selector).next().and_then(non_empty_text)
    }

    #[test]
    fn test_first_match_order() {
        let doc = Html::parse_document("<h2> Fallback   name </h2>");
        let strategies: &[Strategy<Html, String>] = &[("id", by_id), ("heading", by_heading)];
        assert_eq!(
            first_match(&doc, "name", strategies),
            Some("Fallback name".to_string())
        );

        let doc = Html::parse_document("<p id='name'>Primary</p><h2>Other</h2>");
        assert_eq!(first_match(&doc, "name", strategies), Some("Primary".to_string()));

        let doc = Html::parse_document("<p>nothing</p>");
        assert_eq!(first_match(&doc, "name", strategies), None);
    }

    #[test]
    fn test_join_url() {
        assert_eq!(
            join_url("http://ufcstats.com/event-details/abc", "/fighter-details/1"),
            Some("http://ufcstats.com/fighter-details/1".to_string())
        );
        assert_eq!(
            join_url("http://ufcstats.com/a", "http://other.com/b"),
            Some("http://other.com/b".to_string())
        );
        assert_eq!(join_url("http://ufcstats.com/a", "  "), None);
    }
}
