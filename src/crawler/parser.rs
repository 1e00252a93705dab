//! HTML parser for extracting readable documentation content
//!
//! This module handles parsing HTML content to extract:
//! - The page title
//! - Cleaned main-content text, with scripts and navigational chrome removed
//! - Outbound links to follow
//! - Section headings and code samples
//! - Navigation-menu links used to discover related topics

use scraper::{ElementRef, Html, Node, Selector};
use serde::Serialize;
use std::collections::HashSet;
use url::Url;

/// Elements whose text never counts as page content
const SKIPPED_ELEMENTS: &[&str] = &[
    "script", "style", "noscript", "nav", "header", "footer", "aside",
];

/// Main-content containers, in order of preference
const CONTENT_SELECTORS: &[&str] = &[
    "main",
    "article",
    "[role=\"main\"]",
    ".documentation",
    ".content",
    "#content",
];

/// Containers whose links describe the site's documentation structure
const NAVIGATION_SELECTORS: &[&str] = &[
    "nav a[href]",
    ".navigation a[href]",
    ".sidebar a[href]",
    ".menu a[href]",
    "[role=\"navigation\"] a[href]",
    ".docs-sidebar a[href]",
];

/// Elements holding code samples
const CODE_SELECTOR: &str = "pre code, .highlight code, .code-block";

/// Language reported for code samples without a language class
const DEFAULT_CODE_LANGUAGE: &str = "text";

/// A section heading in document order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Heading {
    /// 1 for `<h1>` through 6 for `<h6>`
    pub level: u8,
    pub text: String,
}

/// A code sample with its declared language
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CodeBlock {
    pub language: String,
    pub code: String,
}

/// A navigation-menu link with its visible text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationLink {
    pub text: String,
    pub url: Url,
}

/// Extracted information from an HTML page
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedPage {
    /// `<title>`, else the first `<h1>`, else "Untitled"
    pub title: String,

    /// Whitespace-collapsed text, truncated to the content limit
    pub content: String,

    /// Absolute http(s) links without fragments, de-duplicated in document order
    pub links: Vec<Url>,

    /// Non-empty `<h1>`..`<h6>` headings
    pub headings: Vec<Heading>,

    pub code_blocks: Vec<CodeBlock>,
}

/// Parses HTML content and extracts title, content and links
///
/// # Link Extraction Rules
///
/// **Include:** `<a href="...">` anywhere in the document.
///
/// **Exclude:**
/// - `<a href="..." download>`
/// - `javascript:`, `mailto:`, `tel:` links and data URIs
/// - Fragment-only links (same-page anchors)
/// - Anything that is not http(s) after resolution
///
/// # Example
///
/// ```
/// use doc_harvest::crawler::parse_page;
/// use url::Url;
///
/// let html = r#"<html><head><title>Intro</title></head>
///     <body><main><p>Hello   docs</p><a href="/docs/next#top">Next</a></main></body></html>"#;
/// let base_url = Url::parse("https://example.com/docs/").unwrap();
/// let parsed = parse_page(html, &base_url, 50_000);
/// assert_eq!(parsed.title, "Intro");
/// assert_eq!(parsed.content, "Hello docs Next");
/// assert_eq!(parsed.links[0].as_str(), "https://example.com/docs/next");
/// ```
pub fn parse_page(html: &str, base_url: &Url, content_limit: usize) -> ParsedPage {
    let document = Html::parse_document(html);

    ParsedPage {
        title: extract_title(&document),
        content: extract_content(&document, content_limit),
        links: extract_anchors(&document, base_url, "a[href]")
            .into_iter()
            .map(|anchor| anchor.url)
            .collect(),
        headings: extract_headings(&document),
        code_blocks: extract_code_blocks(&document),
    }
}

/// Extracts links from the page's navigation containers
///
/// Returns absolute URLs without fragments, de-duplicated across all
/// containers. No site scoping is applied here.
pub fn extract_navigation_links(html: &str, base_url: &Url) -> Vec<Url> {
    extract_navigation_entries(html, base_url)
        .into_iter()
        .map(|entry| entry.url)
        .collect()
}

/// Like [`extract_navigation_links`], keeping each link's text
///
/// The first occurrence of a URL wins; its text may be empty.
pub fn extract_navigation_entries(html: &str, base_url: &Url) -> Vec<NavigationLink> {
    let document = Html::parse_document(html);
    let mut seen = HashSet::new();
    let mut entries = Vec::new();

    for selector in NAVIGATION_SELECTORS {
        for entry in extract_anchors(&document, base_url, selector) {
            if seen.insert(entry.url.to_string()) {
                entries.push(entry);
            }
        }
    }

    entries
}

fn extract_headings(document: &Html) -> Vec<Heading> {
    let Ok(selector) = Selector::parse("h1, h2, h3, h4, h5, h6") else {
        return Vec::new();
    };

    document
        .select(&selector)
        .filter_map(|element| {
            let level = element.value().name()[1..].parse().ok()?;
            let text = collapse_whitespace(&element.text().collect::<String>());
            (!text.is_empty()).then_some(Heading { level, text })
        })
        .collect()
}

/// Collects code samples, keeping the innermost of nested matches
fn extract_code_blocks(document: &Html) -> Vec<CodeBlock> {
    let Ok(selector) = Selector::parse(CODE_SELECTOR) else {
        return Vec::new();
    };

    let matched: HashSet<_> = document.select(&selector).map(|el| el.id()).collect();
    let mut blocks = Vec::new();

    for element in document.select(&selector) {
        if element
            .descendants()
            .skip(1)
            .any(|node| matched.contains(&node.id()))
        {
            continue;
        }

        let code = element.text().collect::<String>();
        let code = code.trim();
        if code.is_empty() {
            continue;
        }

        blocks.push(CodeBlock {
            language: code_language(element),
            code: code.to_string(),
        });
    }

    blocks
}

/// Reads `language-*` / `lang-*` from the element's classes, then its parent's
fn code_language(element: ElementRef<'_>) -> String {
    let parent = element.parent().and_then(ElementRef::wrap);

    std::iter::once(element)
        .chain(parent)
        .flat_map(|el| el.value().classes())
        .find_map(|class| {
            let name = class
                .strip_prefix("language-")
                .or_else(|| class.strip_prefix("lang-"))?;
            let name: String = name
                .chars()
                .take_while(|c| c.is_ascii_alphanumeric() || *c == '_')
                .collect();
            (!name.is_empty()).then_some(name)
        })
        .unwrap_or_else(|| DEFAULT_CODE_LANGUAGE.to_string())
}

fn extract_title(document: &Html) -> String {
    first_text(document, "title")
        .or_else(|| first_text(document, "h1"))
        .unwrap_or_else(|| "Untitled".to_string())
}

fn first_text(document: &Html, selector: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;

    document
        .select(&selector)
        .next()
        .map(|element| collapse_whitespace(&element.text().collect::<String>()))
        .filter(|s| !s.is_empty())
}

/// Picks the first content container with text, falling back to `<body>`
fn extract_content(document: &Html, content_limit: usize) -> String {
    let mut text = None;

    for selector in CONTENT_SELECTORS {
        let Ok(selector) = Selector::parse(selector) else {
            continue;
        };
        if let Some(element) = document.select(&selector).next() {
            let candidate = readable_text(element);
            if !candidate.is_empty() {
                text = Some(candidate);
                break;
            }
        }
    }

    let text = text.unwrap_or_else(|| {
        Selector::parse("body")
            .ok()
            .and_then(|body| document.select(&body).next())
            .map(readable_text)
            .unwrap_or_else(|| readable_text(document.root_element()))
    });

    truncate_chars(text, content_limit)
}

/// Collects text below `element`, skipping script and chrome subtrees
fn readable_text(element: ElementRef<'_>) -> String {
    let mut raw = String::new();
    collect_text(element, &mut raw);
    collapse_whitespace(&raw)
}

fn collect_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => {
                out.push_str(text);
                out.push(' ');
            }
            Node::Element(el) if SKIPPED_ELEMENTS.contains(&el.name()) => {}
            Node::Element(_) => {
                if let Some(child) = ElementRef::wrap(child) {
                    collect_text(child, out);
                }
            }
            _ => {}
        }
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn truncate_chars(text: String, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((byte_index, _)) => text[..byte_index].to_string(),
        None => text,
    }
}

fn extract_anchors(document: &Html, base_url: &Url, selector: &str) -> Vec<NavigationLink> {
    let Ok(selector) = Selector::parse(selector) else {
        return Vec::new();
    };

    let mut seen = HashSet::new();
    let mut anchors = Vec::new();

    for element in document.select(&selector) {
        if element.value().attr("download").is_some() {
            continue;
        }

        if let Some(url) = element
            .value()
            .attr("href")
            .and_then(|href| resolve_link(href, base_url))
        {
            if seen.insert(url.to_string()) {
                anchors.push(NavigationLink {
                    text: collapse_whitespace(&element.text().collect::<String>()),
                    url,
                });
            }
        }
    }

    anchors
}

/// Resolves a link href to an absolute URL and validates it
///
/// Returns None if the link should be excluded:
/// - javascript:, mailto:, tel: schemes
/// - data: URIs
/// - Fragment-only anchors
/// - Invalid URLs
/// - Non-HTTP(S) URLs after resolution
fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lower = href.to_lowercase();
    if lower.starts_with("javascript:")
        || lower.starts_with("mailto:")
        || lower.starts_with("tel:")
        || lower.starts_with("data:")
    {
        return None;
    }

    let mut absolute_url = base_url.join(href).ok()?;
    if absolute_url.scheme() != "http" && absolute_url.scheme() != "https" {
        return None;
    }

    absolute_url.set_fragment(None);
    Some(absolute_url)
}
