use crate::content::{AttachmentId, AttachmentLookup, ImageRef, InlineImage};
use crate::util::non_blank;
use std::collections::HashMap;

/// Mime type assumed when nothing better is recorded.
pub const DEFAULT_IMAGE_MIME: &str = "image/jpeg";

/// The fields of an image, whichever way it was stored.
///
/// Produced from an [`ImageRef`] by [`ImageFields::resolve`]; the renderers
/// only ever work with this shape.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImageFields {
    pub attachment_id: Option<AttachmentId>,
    pub url: Option<String>,
    pub sizes: HashMap<String, String>,
    pub alt: Option<String>,
    pub caption: Option<String>,
    pub mime_type: Option<String>,
    /// Declared top-level media type (`image`, `video`, ...).
    pub kind: Option<String>,
    pub subtype: Option<String>,
    pub credit: Option<String>,
}

impl ImageFields {
    /// Resolve an image reference, looking attachment ids up as needed.
    ///
    /// Returns `None` only for an attachment id the lookup does not know.
    pub fn resolve(image: &ImageRef, attachments: &dyn AttachmentLookup) -> Option<Self> {
        match image {
            ImageRef::Inline(inline) => Some(Self::from_inline(inline)),
            ImageRef::Attachment(id) => {
                let Some(meta) = attachments.attachment(*id) else {
                    tracing::debug!(attachment = %id, "Unknown attachment id");
                    return None;
                };
                let (kind, subtype) = split_mime(meta.mime_type.as_deref());
                Some(Self {
                    attachment_id: Some(*id),
                    url: meta.url,
                    sizes: meta.sizes,
                    alt: meta.alt,
                    caption: meta.description,
                    mime_type: meta.mime_type,
                    kind,
                    subtype,
                    credit: meta.credit,
                })
            }
        }
    }

    fn from_inline(inline: &InlineImage) -> Self {
        Self {
            attachment_id: inline.id,
            url: inline.url.clone(),
            sizes: inline.sizes.clone(),
            alt: inline.alt.clone(),
            caption: non_blank(inline.caption.as_deref())
                .or_else(|| non_blank(inline.description.as_deref()))
                .map(str::to_string),
            mime_type: inline.mime_type.clone(),
            kind: inline.kind.clone(),
            subtype: inline.subtype.clone(),
            credit: non_blank(inline.credit.as_deref())
                .or_else(|| non_blank(inline.copyright.as_deref()))
                .map(str::to_string),
        }
    }

    /// URL of the named size variant if stored, else the generic URL.
    pub fn source(&self, preferred_size: &str) -> Option<&str> {
        non_blank(self.sizes.get(preferred_size).map(String::as_str))
            .or_else(|| non_blank(self.url.as_deref()))
    }

    /// Generic URL first, falling back to the named size variant.
    pub fn original(&self, fallback_size: &str) -> Option<&str> {
        non_blank(self.url.as_deref())
            .or_else(|| non_blank(self.sizes.get(fallback_size).map(String::as_str)))
    }

    /// False when a media type is declared and it is not `image`.
    pub fn is_image(&self) -> bool {
        non_blank(self.kind.as_deref()).map_or(true, |kind| kind.eq_ignore_ascii_case("image"))
    }

    /// Explicit mime type, else `type/subtype`, else [`DEFAULT_IMAGE_MIME`].
    pub fn mime(&self) -> String {
        if let Some(mime) = non_blank(self.mime_type.as_deref()) {
            return mime.to_string();
        }
        match (non_blank(self.kind.as_deref()), non_blank(self.subtype.as_deref())) {
            (Some(kind), Some(subtype)) => format!("{kind}/{subtype}"),
            _ => DEFAULT_IMAGE_MIME.to_string(),
        }
    }

    pub fn alt(&self) -> &str {
        self.alt.as_deref().map(str::trim).unwrap_or_default()
    }

    pub fn caption(&self) -> Option<&str> {
        non_blank(self.caption.as_deref())
    }
}

fn split_mime(mime: Option<&str>) -> (Option<String>, Option<String>) {
    match non_blank(mime).and_then(|m| m.split_once('/')) {
        Some((kind, subtype)) => (Some(kind.to_string()), Some(subtype.to_string())),
        None => (None, None),
    }
}
