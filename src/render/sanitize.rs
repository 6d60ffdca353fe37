//! Allow-list HTML sanitizer.
//!
//! Fragments are parsed with `scraper` (an HTML5 tree builder) and
//! re-serialized from the tree, so the output is always well-formed with
//! respect to what survived: allowed tags keep their allowed attributes,
//! other tags are unwrapped (children kept), and a small set of
//! active-content tags is dropped together with whatever they contain.
//! Script and style bodies are raw text to the parser, so a `<` inside them
//! never swallows the markup that follows.

use html_escape::{encode_double_quoted_attribute, encode_text};
use scraper::{ElementRef, Html, Node};

/// Cleans an HTML fragment for consumers that only accept a safe subset.
pub trait Sanitizer: Send + Sync {
    fn sanitize(&self, html: &str) -> String;
}

/// Tag name and the attributes it may keep, in output order.
type Rule = (&'static str, &'static [&'static str]);

const CLASS: &[&str] = &["class"];

/// Tags (and per-tag attributes) accepted by partner feed readers.
pub const FEED_ALLOW_LIST: &[Rule] = &[
    ("p", &[]),
    ("br", &[]),
    ("strong", &[]),
    ("em", &[]),
    ("b", &[]),
    ("i", &[]),
    ("u", &[]),
    ("h2", &[]),
    ("h3", &[]),
    ("h4", &[]),
    ("ul", &[]),
    ("ol", &[]),
    ("li", &[]),
    ("blockquote", &[]),
    ("section", CLASS),
    ("div", CLASS),
    ("span", CLASS),
    ("figure", CLASS),
    ("figcaption", CLASS),
    ("img", &["class", "src", "alt"]),
    ("a", &["href", "title", "rel", "target"]),
];

/// Dropped along with their content rather than unwrapped.
const DROP_WITH_CONTENT: &[&str] = &[
    "script", "style", "iframe", "object", "embed", "noscript", "template",
];

const VOID_TAGS: &[&str] = &["br", "img"];

const URL_ATTRIBUTES: &[&str] = &["href", "src"];

const SAFE_SCHEMES: &[&str] = &["http", "https", "mailto"];

/// [`Sanitizer`] backed by a static tag/attribute allow-list.
#[derive(Debug, Clone, Copy)]
pub struct HtmlSanitizer {
    rules: &'static [Rule],
}

impl Default for HtmlSanitizer {
    fn default() -> Self {
        Self::new(FEED_ALLOW_LIST)
    }
}

impl HtmlSanitizer {
    pub fn new(rules: &'static [Rule]) -> Self {
        Self { rules }
    }

    fn rule(&self, tag: &str) -> Option<&'static [&'static str]> {
        self.rules
            .iter()
            .find(|(name, _)| *name == tag)
            .map(|(_, attrs)| *attrs)
    }

    fn write_children(&self, parent: ElementRef<'_>, out: &mut String) {
        for child in parent.children() {
            match child.value() {
                Node::Text(text) => out.push_str(&encode_text(&**text)),
                Node::Element(_) => {
                    if let Some(element) = ElementRef::wrap(child) {
                        self.write_element(element, out);
                    }
                }
                _ => {}
            }
        }
    }

    fn write_element(&self, element: ElementRef<'_>, out: &mut String) {
        let name = element.value().name().to_ascii_lowercase();
        if DROP_WITH_CONTENT.contains(&name.as_str()) {
            tracing::debug!(tag = %name, "Dropping active content");
            return;
        }

        let allowed = self.rule(&name);
        if let Some(attrs) = allowed {
            out.push('<');
            out.push_str(&name);
            write_attributes(element, attrs, out);
            if VOID_TAGS.contains(&name.as_str()) {
                out.push_str(" />");
            } else {
                out.push('>');
            }
        }

        self.write_children(element, out);

        if allowed.is_some() && !VOID_TAGS.contains(&name.as_str()) {
            out.push_str("</");
            out.push_str(&name);
            out.push('>');
        }
    }
}

impl Sanitizer for HtmlSanitizer {
    fn sanitize(&self, html: &str) -> String {
        let fragment = Html::parse_fragment(html);
        let mut out = String::with_capacity(html.len());
        self.write_children(fragment.root_element(), &mut out);
        out
    }
}

fn write_attributes(element: ElementRef<'_>, allowed: &[&str], out: &mut String) {
    for name in allowed {
        let Some(value) = element.value().attr(name) else {
            continue;
        };
        if URL_ATTRIBUTES.contains(name) && !has_safe_scheme(value) {
            tracing::debug!(attribute = %name, value = %value, "Dropping unsafe URL");
            continue;
        }
        out.push(' ');
        out.push_str(name);
        out.push_str("=\"");
        out.push_str(&encode_double_quoted_attribute(value));
        out.push('"');
    }
}

/// Relative references pass; absolute ones need an allowed scheme.
fn has_safe_scheme(value: &str) -> bool {
    let value = value.trim();
    let Some(colon) = value.find(':') else {
        return true;
    };
    if value[..colon].contains(['/', '?', '#']) {
        return true;
    }
    let scheme = value[..colon].to_ascii_lowercase();
    SAFE_SCHEMES.contains(&scheme.as_str())
}
