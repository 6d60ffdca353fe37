use html_escape::{decode_html_entities, encode_double_quoted_attribute, encode_text};
use regex::Regex;
use std::sync::LazyLock;
use url::Url;

/// Hosts that wrap third-party embeds unless configured otherwise.
pub const DEFAULT_PROXY_DOMAINS: &[&str] = &["cdn.embedly.com"];

/// Absolute or scheme-relative (`//host/...`) URLs inside embed markup.
static URL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?:https?:)?//[^\s"'<>/][^\s"'<>]*"#).expect("URL pattern is valid")
});

/// Query parameters an embed proxy carries the wrapped URL in, most
/// specific first: `url` names the original page, `src` the player.
const WRAPPED_URL_PARAMS: &[&str] = &["url", "src"];

/// Recovers the original source URL of an embed.
///
/// Embeds are usually stored as proxy iframes; feeds that cannot run the
/// iframe link to the original page instead.
#[derive(Debug, Clone)]
pub struct EmbedUnwrapper {
    proxy_domains: Vec<String>,
}

impl Default for EmbedUnwrapper {
    fn default() -> Self {
        Self::new(DEFAULT_PROXY_DOMAINS.iter().copied())
    }
}

impl EmbedUnwrapper {
    pub fn new<I, S>(proxy_domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let proxy_domains = proxy_domains
            .into_iter()
            .map(|d| d.as_ref().trim().trim_start_matches('.').to_ascii_lowercase())
            .filter(|d| !d.is_empty())
            .collect();
        Self { proxy_domains }
    }

    /// Whether the URL's host is a proxy domain or a subdomain of one.
    pub fn is_proxied(&self, url: &Url) -> bool {
        let Some(host) = url.host_str() else {
            return false;
        };
        let host = host.to_ascii_lowercase();
        self.proxy_domains.iter().any(|domain| {
            host == *domain
                || host
                    .strip_suffix(domain.as_str())
                    .is_some_and(|rest| rest.ends_with('.'))
        })
    }

    /// The original URL behind an embed.
    ///
    /// A stored link wins when it is not itself proxied, then the first
    /// non-proxy URL in the markup. Failing both, a proxied URL that wraps a
    /// non-proxy one in its query is unwrapped.
    pub fn original_url(&self, link: Option<&str>, markup: Option<&str>) -> Option<Url> {
        let decoded = markup.map(decode_html_entities);
        let candidates: Vec<Url> = link
            .and_then(parse_http)
            .into_iter()
            .chain(
                decoded
                    .as_deref()
                    .into_iter()
                    .flat_map(|m| URL_PATTERN.find_iter(m))
                    .filter_map(|m| parse_http(m.as_str().trim_end_matches(['.', ',', ';', ')']))),
            )
            .collect();

        if let Some(direct) = candidates.iter().find(|u| !self.is_proxied(u)) {
            return Some(direct.clone());
        }

        let unwrapped = candidates.iter().find_map(|proxied| {
            WRAPPED_URL_PARAMS.iter().find_map(|param| {
                proxied
                    .query_pairs()
                    .filter(|(key, _)| key == param)
                    .filter_map(|(_, value)| parse_http(&value))
                    .find(|inner| !self.is_proxied(inner))
            })
        });
        if unwrapped.is_none() && !candidates.is_empty() {
            tracing::debug!(count = candidates.len(), "Embed only references proxy URLs");
        }
        unwrapped
    }

    /// A paragraph linking to the original URL, or nothing.
    pub fn link_html(&self, link: Option<&str>, markup: Option<&str>) -> String {
        match self.original_url(link, markup) {
            Some(url) => format!(
                r#"<p><a href="{}">{}</a></p>"#,
                encode_double_quoted_attribute(url.as_str()),
                encode_text(url.as_str())
            ),
            None => String::new(),
        }
    }
}

fn parse_http(raw: &str) -> Option<Url> {
    let raw = raw.trim();
    let parsed = match raw.strip_prefix("//") {
        Some(rest) => Url::parse(&format!("https://{rest}")),
        None => Url::parse(raw),
    };
    parsed
        .ok()
        .filter(|u| matches!(u.scheme(), "http" | "https") && u.host_str().is_some())
}
