//! HTML interrogation: link and form extraction
//!
//! Produces the structured DOM summary the engine works with: a flat list
//! of absolute link URLs plus a descriptor for every form, so login-form
//! detection stays a pure function independent of the rendering layer.

use crate::auth::{FormDescriptor, InputDescriptor};
use scraper::{ElementRef, Html, Selector};
use url::Url;

/// Extracted summary of an HTML page
#[derive(Debug, Clone, Default)]
pub struct ParsedPage {
    /// All followable links, as absolute URLs
    pub links: Vec<String>,

    /// Every form on the page, in document order
    pub forms: Vec<FormDescriptor>,
}

/// Parses HTML content into links and form descriptors
///
/// Link extraction follows `<a href>` tags, resolves relative hrefs against
/// the base URL, and drops `javascript:`, `mailto:`, `tel:`, `data:` and
/// fragment-only hrefs, as well as anything that is not HTTP(S) after
/// resolution.
pub fn parse_page(html: &str, base_url: &Url) -> ParsedPage {
    let document = Html::parse_document(html);

    ParsedPage {
        links: extract_links(&document, base_url),
        forms: extract_forms(&document, base_url),
    }
}

fn extract_links(document: &Html, base_url: &Url) -> Vec<String> {
    let mut links = Vec::new();

    if let Ok(selector) = Selector::parse("a[href]") {
        for element in document.select(&selector) {
            if let Some(href) = element.value().attr("href") {
                if let Some(absolute) = resolve_link(href, base_url) {
                    links.push(absolute);
                }
            }
        }
    }

    links
}

fn extract_forms(document: &Html, base_url: &Url) -> Vec<FormDescriptor> {
    let mut forms = Vec::new();

    let form_selector = match Selector::parse("form") {
        Ok(s) => s,
        Err(_) => return forms,
    };
    let input_selector = match Selector::parse("input") {
        Ok(s) => s,
        Err(_) => return forms,
    };

    for form in document.select(&form_selector) {
        let action = resolve_action(&form, base_url);
        let method = form
            .value()
            .attr("method")
            .unwrap_or("get")
            .to_lowercase();

        let inputs = form
            .select(&input_selector)
            .map(|input| {
                let element = input.value();
                InputDescriptor::new(
                    element.attr("name").unwrap_or(""),
                    element.attr("type").unwrap_or("text"),
                    element.attr("value"),
                )
            })
            .collect();

        forms.push(FormDescriptor {
            action,
            method,
            inputs,
        });
    }

    forms
}

/// Resolves a form's action attribute against the page URL
///
/// A missing or empty action submits back to the current page, per HTML
/// semantics.
fn resolve_action(form: &ElementRef<'_>, base_url: &Url) -> String {
    match form.value().attr("action").map(str::trim) {
        Some(action) if !action.is_empty() => base_url
            .join(action)
            .map(|u| u.to_string())
            .unwrap_or_else(|_| action.to_string()),
        _ => base_url.to_string(),
    }
}

/// Resolves an href to an absolute URL, or None if it should be excluded
fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    if href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("data:")
    {
        return None;
    }

    match base_url.join(href) {
        Ok(absolute) if absolute.scheme() == "http" || absolute.scheme() == "https" => {
            Some(absolute.to_string())
        }
        _ => None,
    }
}
