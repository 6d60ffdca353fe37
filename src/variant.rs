use serde::Deserialize;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// The two feed flavours served from the same content.
///
/// Every per-flavour difference hangs off this enum: channel wording, the
/// MRSS namespace, hero shape, HTML sanitisation and which widgets may emit
/// third-party markup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedVariant {
    Msn,
    Samsung,
}

#[derive(Debug, Error, PartialEq)]
#[error("Unknown feed: {0}")]
pub struct UnknownFeed(pub String);

impl FeedVariant {
    pub const ALL: [FeedVariant; 2] = [FeedVariant::Msn, FeedVariant::Samsung];

    /// Endpoint name the feed is registered under.
    pub fn slug(self) -> &'static str {
        match self {
            FeedVariant::Msn => "msn_feed",
            FeedVariant::Samsung => "samsung_feed",
        }
    }

    /// Variant served at an endpoint slug (exact match).
    pub fn from_slug(slug: &str) -> Option<Self> {
        FeedVariant::ALL.into_iter().find(|v| v.slug() == slug)
    }

    pub fn label(self) -> &'static str {
        match self {
            FeedVariant::Msn => "MSN",
            FeedVariant::Samsung => "Samsung",
        }
    }

    /// Custom field a post must have switched on to appear in this feed.
    pub fn flag_field(self) -> &'static str {
        match self {
            FeedVariant::Msn => "publish_to_msn",
            FeedVariant::Samsung => "publish_to_samsung",
        }
    }

    pub fn channel_title(self, site_name: &str) -> String {
        format!("{} \u{2013} {} News", site_name, self.label())
    }

    pub fn channel_description(self) -> String {
        format!("Custom {}-compatible feed", self.label())
    }

    /// Samsung items carry `media:content`, so the channel declares MRSS.
    pub fn uses_media_namespace(self) -> bool {
        matches!(self, FeedVariant::Samsung)
    }

    /// Whether third-party embed markup and looping video may be emitted.
    pub fn permits_raw_embeds(self) -> bool {
        matches!(self, FeedVariant::Msn)
    }

    /// Whether rendered HTML is run through the allow-list sanitizer.
    pub fn sanitizes_html(self) -> bool {
        matches!(self, FeedVariant::Samsung)
    }
}

impl fmt::Display for FeedVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for FeedVariant {
    type Err = UnknownFeed;

    /// Accepts the endpoint slug or the bare flavour name, any case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        FeedVariant::ALL
            .into_iter()
            .find(|v| wanted == v.slug() || wanted == v.label().to_ascii_lowercase())
            .ok_or_else(|| UnknownFeed(s.to_string()))
    }
}
