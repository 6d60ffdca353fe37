use super::de;
use crate::util::non_blank;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

/// Identifier of a media attachment in the content store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(transparent)]
pub struct AttachmentId(pub u64);

impl fmt::Display for AttachmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AttachmentId {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_u64().map(Self),
            Value::String(s) => s.trim().parse().ok().map(Self),
            _ => None,
        }
    }
}

/// An image as stored on a widget or in a post's hero list.
///
/// The store holds either a bare attachment id (resolved later through an
/// [`AttachmentLookup`](super::AttachmentLookup)) or the expanded image object.
#[derive(Debug, Clone, PartialEq)]
pub enum ImageRef {
    Attachment(AttachmentId),
    Inline(InlineImage),
}

impl ImageRef {
    /// Numbers and numeric strings are attachment ids, objects are inline
    /// images; everything else (`false`, `""`, `null`) is no image.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(_) => serde_json::from_value(value).ok().map(ImageRef::Inline),
            other => AttachmentId::from_value(&other).map(ImageRef::Attachment),
        }
    }
}

impl<'de> Deserialize<'de> for ImageRef {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        ImageRef::from_value(value)
            .ok_or_else(|| serde::de::Error::custom("expected an attachment id or image object"))
    }
}

/// Expanded image object.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct InlineImage {
    #[serde(deserialize_with = "attachment_id")]
    pub id: Option<AttachmentId>,
    #[serde(deserialize_with = "de::text")]
    pub url: Option<String>,
    #[serde(deserialize_with = "de::text")]
    pub alt: Option<String>,
    #[serde(deserialize_with = "de::text")]
    pub caption: Option<String>,
    #[serde(deserialize_with = "de::text")]
    pub description: Option<String>,
    #[serde(deserialize_with = "de::text")]
    pub mime_type: Option<String>,
    /// Top-level media type, e.g. `image` or `video`.
    #[serde(rename = "type", deserialize_with = "de::text")]
    pub kind: Option<String>,
    #[serde(deserialize_with = "de::text")]
    pub subtype: Option<String>,
    /// Size name to URL. Width/height entries stored alongside are ignored.
    #[serde(deserialize_with = "sizes")]
    pub sizes: HashMap<String, String>,
    #[serde(deserialize_with = "de::text")]
    pub credit: Option<String>,
    #[serde(deserialize_with = "de::text")]
    pub copyright: Option<String>,
}

fn attachment_id<'de, D: Deserializer<'de>>(d: D) -> Result<Option<AttachmentId>, D::Error> {
    Ok(AttachmentId::from_value(&Value::deserialize(d)?))
}

pub(crate) fn sizes<'de, D: Deserializer<'de>>(d: D) -> Result<HashMap<String, String>, D::Error> {
    let Value::Object(map) = Value::deserialize(d)? else {
        return Ok(HashMap::new());
    };
    Ok(map
        .into_iter()
        .filter_map(|(name, url)| match url {
            Value::String(url) => Some((name, url)),
            _ => None,
        })
        .collect())
}

/// Media shown at the top of a listicle entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListicleMedia {
    Image,
    Loop,
    Embed,
}

fn listicle_media<'de, D: Deserializer<'de>>(d: D) -> Result<Option<ListicleMedia>, D::Error> {
    Ok(serde_json::from_value(Value::deserialize(d)?).ok())
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ListicleItem {
    #[serde(deserialize_with = "listicle_media")]
    pub media_type: Option<ListicleMedia>,
    #[serde(deserialize_with = "de::image")]
    pub image: Option<ImageRef>,
    #[serde(deserialize_with = "de::text")]
    pub video: Option<String>,
    #[serde(deserialize_with = "de::text")]
    pub embed: Option<String>,
    #[serde(deserialize_with = "de::text")]
    pub embed_link: Option<String>,
    #[serde(deserialize_with = "de::text")]
    pub title: Option<String>,
    #[serde(deserialize_with = "de::text")]
    pub paragraph: Option<String>,
    #[serde(deserialize_with = "de::text")]
    pub label: Option<String>,
    #[serde(deserialize_with = "de::text")]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Product {
    #[serde(deserialize_with = "de::image")]
    pub thumbnail: Option<ImageRef>,
    #[serde(rename = "product_text", deserialize_with = "de::text")]
    pub name: Option<String>,
    #[serde(deserialize_with = "de::text")]
    pub price: Option<String>,
    #[serde(rename = "product_description", deserialize_with = "de::text")]
    pub description: Option<String>,
    #[serde(deserialize_with = "de::text")]
    pub button_text: Option<String>,
    #[serde(deserialize_with = "de::text")]
    pub button_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ListEntry {
    #[serde(deserialize_with = "de::text")]
    pub header: Option<String>,
    #[serde(deserialize_with = "de::text")]
    pub body: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Step {
    #[serde(deserialize_with = "de::text")]
    pub text: Option<String>,
}

/// One block of an article body, tagged by its `acf_fc_layout`.
///
/// Tags this crate does not know deserialize to [`Widget::Unknown`] and render
/// to nothing, so newer content types can ship before the feeds learn them.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "acf_fc_layout")]
pub enum Widget {
    #[serde(rename = "paragraph")]
    Paragraph {
        #[serde(default, deserialize_with = "de::text")]
        paragraph: Option<String>,
    },
    #[serde(rename = "divider")]
    Divider {
        #[serde(default, deserialize_with = "de::text")]
        divider: Option<String>,
    },
    #[serde(rename = "heading")]
    Heading {
        #[serde(default, deserialize_with = "de::text")]
        text: Option<String>,
    },
    #[serde(rename = "image")]
    Image {
        #[serde(default, deserialize_with = "de::image")]
        image: Option<ImageRef>,
    },
    #[serde(rename = "html")]
    Html {
        #[serde(default, deserialize_with = "de::text")]
        html: Option<String>,
    },
    #[serde(rename = "listicle")]
    Listicle {
        #[serde(rename = "item", default, deserialize_with = "de::list")]
        items: Vec<ListicleItem>,
    },
    #[serde(rename = "embed")]
    Embed {
        #[serde(default, deserialize_with = "de::text")]
        embed: Option<String>,
        #[serde(default, deserialize_with = "de::text")]
        embed_link: Option<String>,
    },
    #[serde(rename = "button")]
    Button {
        #[serde(default, deserialize_with = "de::text")]
        url: Option<String>,
        #[serde(default, deserialize_with = "de::text")]
        label: Option<String>,
    },
    #[serde(rename = "pull-quote")]
    PullQuote {
        #[serde(default, deserialize_with = "de::text")]
        text: Option<String>,
        #[serde(default, deserialize_with = "de::text")]
        quote_author: Option<String>,
    },
    #[serde(rename = "product-carousel")]
    ProductCarousel {
        #[serde(default, deserialize_with = "de::list")]
        products: Vec<Product>,
    },
    #[serde(rename = "looping_video")]
    LoopingVideo {
        #[serde(default, deserialize_with = "de::text")]
        video: Option<String>,
    },
    #[serde(rename = "list_widget")]
    ListWidget {
        #[serde(rename = "ingredients", default, deserialize_with = "de::list")]
        entries: Vec<ListEntry>,
    },
    #[serde(rename = "instructions")]
    Instructions {
        #[serde(default, deserialize_with = "de::list")]
        steps: Vec<Step>,
    },
    #[serde(rename = "interactive_image")]
    InteractiveImage {
        #[serde(default, deserialize_with = "de::image")]
        first_image: Option<ImageRef>,
    },
    #[serde(other)]
    Unknown,
}

impl Widget {
    /// Decode one stored widget; anything undecodable becomes `Unknown`.
    pub fn from_value(value: Value) -> Self {
        serde_json::from_value(value).unwrap_or_else(|e| {
            tracing::debug!(error = %e, "Undecodable widget, rendering nothing");
            Widget::Unknown
        })
    }
}

fn widgets<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<Widget>, D::Error> {
    let Value::Array(rows) = Value::deserialize(d)? else {
        return Ok(Vec::new());
    };
    Ok(rows.into_iter().map(Widget::from_value).collect())
}

fn default_post_type() -> String {
    "post".to_string()
}

/// A published article as exported by the content store.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Post {
    pub id: u64,
    #[serde(default = "default_post_type")]
    pub post_type: String,
    #[serde(default)]
    pub title: String,
    /// Author display name.
    #[serde(default)]
    pub author: String,
    pub published: DateTime<Utc>,
    pub permalink: String,
    #[serde(default, deserialize_with = "de::text")]
    pub seo_description: Option<String>,
    #[serde(default, deserialize_with = "de::text")]
    pub excerpt: Option<String>,
    #[serde(default, deserialize_with = "widgets")]
    pub widgets: Vec<Widget>,
    #[serde(default, deserialize_with = "de::list")]
    pub hero_images: Vec<ImageRef>,
    /// Custom fields, including the per-feed publish flags.
    #[serde(default)]
    pub meta: HashMap<String, Value>,
}

impl Post {
    /// Whether a true/false custom field is switched on.
    ///
    /// The store writes checkbox fields as `true`, `1` or `"1"`.
    pub fn flag(&self, key: &str) -> bool {
        match self.meta.get(key) {
            Some(Value::Bool(b)) => *b,
            Some(Value::Number(n)) => n.as_u64() == Some(1),
            Some(Value::String(s)) => matches!(s.trim(), "1" | "true"),
            _ => false,
        }
    }

    /// SEO description when set, otherwise the platform excerpt (unescaped).
    pub fn summary(&self) -> &str {
        non_blank(self.seo_description.as_deref())
            .or_else(|| non_blank(self.excerpt.as_deref()))
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_unknown_layout_decodes_to_unknown() {
        let w: Widget = serde_json::from_value(json!({
            "acf_fc_layout": "poll",
            "question": "Tea or coffee?"
        }))
        .unwrap();
        assert_eq!(w, Widget::Unknown);
    }

    #[test]
    fn test_missing_layout_tag_decodes_to_unknown() {
        assert_eq!(Widget::from_value(json!({ "text": "x" })), Widget::Unknown);
        assert_eq!(Widget::from_value(json!("paragraph")), Widget::Unknown);
    }

    #[test]
    fn test_list_widget_reads_ingredients() {
        let w = Widget::from_value(json!({
            "acf_fc_layout": "list_widget",
            "ingredients": [{ "header": "First", "body": "<p>One</p>" }]
        }));
        assert_eq!(
            w,
            Widget::ListWidget {
                entries: vec![ListEntry {
                    header: Some("First".into()),
                    body: Some("<p>One</p>".into()),
                }]
            }
        );
    }

    #[test]
    fn test_image_ref_shapes() {
        assert_eq!(
            ImageRef::from_value(json!(42)),
            Some(ImageRef::Attachment(AttachmentId(42)))
        );
        assert_eq!(
            ImageRef::from_value(json!("42")),
            Some(ImageRef::Attachment(AttachmentId(42)))
        );
        assert_eq!(ImageRef::from_value(json!(false)), None);
        assert_eq!(ImageRef::from_value(json!("")), None);

        let Some(ImageRef::Inline(inline)) = ImageRef::from_value(json!({
            "id": "7",
            "url": "https://img.example.com/a.jpg",
            "type": "image",
            "sizes": { "square": "https://img.example.com/a-sq.jpg", "square-width": 300 }
        })) else {
            panic!("expected inline image");
        };
        assert_eq!(inline.id, Some(AttachmentId(7)));
        assert_eq!(inline.kind.as_deref(), Some("image"));
        assert_eq!(inline.sizes.len(), 1);
    }

    #[test]
    fn test_widget_with_false_image_still_decodes() {
        let w = Widget::from_value(json!({ "acf_fc_layout": "image", "image": false }));
        assert_eq!(w, Widget::Image { image: None });
    }

    #[test]
    fn test_post_flag_and_summary() {
        let post: Post = serde_json::from_value(json!({
            "id": 1,
            "title": "Hello",
            "published": "2024-03-01T09:30:00Z",
            "permalink": "https://www.example.com/hello",
            "seo_description": "  ",
            "excerpt": "Plain excerpt",
            "widgets": false,
            "meta": { "publish_to_msn": "1", "publish_to_samsung": 0 }
        }))
        .unwrap();

        assert_eq!(post.post_type, "post");
        assert!(post.flag("publish_to_msn"));
        assert!(!post.flag("publish_to_samsung"));
        assert!(!post.flag("missing"));
        assert_eq!(post.summary(), "Plain excerpt");
        assert!(post.widgets.is_empty());
    }
}
