use super::probe::ContentLengthProbe;
use crate::content::{AttachmentLookup, ImageRef};
use crate::image::{ImageFields, ImageUrlResolver};
use crate::render::BODY_IMAGE_SIZE;
use crate::util::{non_blank, strip_invalid_xml_chars};
use crate::variant::FeedVariant;
use anyhow::{Context, Result};
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::io::{Cursor, Write};
use std::sync::Arc;
use url::Url;

/// The element an item's lead image is published as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeroBlock {
    /// `<enclosure url type length/>`; an unknown length is written empty.
    Enclosure {
        url: String,
        mime: String,
        length: Option<u64>,
    },
    /// `<media:content url type>` with an optional `<media:credit>` child.
    MediaContent {
        url: String,
        mime: String,
        credit: Option<String>,
    },
}

impl HeroBlock {
    pub fn url(&self) -> &str {
        match self {
            HeroBlock::Enclosure { url, .. } | HeroBlock::MediaContent { url, .. } => url,
        }
    }

    pub fn write_to<W: Write>(&self, writer: &mut Writer<W>) -> Result<()> {
        match self {
            HeroBlock::Enclosure { url, mime, length } => {
                let length = length.map(|l| l.to_string()).unwrap_or_default();
                let mime = strip_invalid_xml_chars(mime);
                let mut enclosure = BytesStart::new("enclosure");
                enclosure.push_attribute(("url", url.as_str()));
                enclosure.push_attribute(("type", &*mime));
                enclosure.push_attribute(("length", length.as_str()));
                writer
                    .write_event(Event::Empty(enclosure))
                    .context("Failed to write enclosure element")?;
            }
            HeroBlock::MediaContent { url, mime, credit } => {
                let mime = strip_invalid_xml_chars(mime);
                let mut content = BytesStart::new("media:content");
                content.push_attribute(("url", url.as_str()));
                content.push_attribute(("type", &*mime));
                let Some(credit) = credit else {
                    writer
                        .write_event(Event::Empty(content))
                        .context("Failed to write media:content element")?;
                    return Ok(());
                };
                writer
                    .write_event(Event::Start(content))
                    .context("Failed to write media:content element")?;
                writer
                    .write_event(Event::Start(BytesStart::new("media:credit")))
                    .context("Failed to write media:credit element")?;
                writer
                    .write_event(Event::Text(BytesText::new(&strip_invalid_xml_chars(credit))))
                    .context("Failed to write media:credit text")?;
                writer
                    .write_event(Event::End(BytesEnd::new("media:credit")))
                    .context("Failed to write media:credit end")?;
                writer
                    .write_event(Event::End(BytesEnd::new("media:content")))
                    .context("Failed to write media:content end")?;
            }
        }
        Ok(())
    }

    /// Standalone XML fragment for this block.
    pub fn to_xml(&self) -> Result<String> {
        let mut writer = Writer::new(Cursor::new(Vec::new()));
        self.write_to(&mut writer)?;
        String::from_utf8(writer.into_inner().into_inner())
            .context("Generated hero block contains invalid UTF-8")
    }
}

/// A hero image that passed selection.
#[derive(Debug, Clone, PartialEq)]
pub struct HeroImage {
    pub url: Url,
    pub mime: String,
    pub fields: ImageFields,
}

/// Picks a post's lead image and renders it for a feed variant.
pub struct HeroRenderer {
    images: ImageUrlResolver,
    attachments: Arc<dyn AttachmentLookup>,
    probe: Arc<dyn ContentLengthProbe>,
}

impl HeroRenderer {
    pub fn new(
        images: ImageUrlResolver,
        attachments: Arc<dyn AttachmentLookup>,
        probe: Arc<dyn ContentLengthProbe>,
    ) -> Self {
        Self {
            images,
            attachments,
            probe,
        }
    }

    /// The first hero entry, when it is a static image with a valid URL.
    ///
    /// Later entries are never considered, even if the first is rejected.
    pub fn select(&self, heroes: &[ImageRef]) -> Option<HeroImage> {
        let first = heroes.first()?;
        let fields = ImageFields::resolve(first, self.attachments.as_ref())?;
        if !fields.is_image() {
            tracing::debug!(kind = ?fields.kind, "Hero is not an image, skipping");
            return None;
        }

        let source = fields.original(BODY_IMAGE_SIZE)?;
        let url = match self.images.resolve(source) {
            Ok(url) => url,
            Err(e) => {
                tracing::debug!(source = %source, error = %e, "Rejected hero image");
                return None;
            }
        };

        Some(HeroImage {
            url,
            mime: fields.mime(),
            fields,
        })
    }

    pub async fn render(&self, heroes: &[ImageRef], variant: FeedVariant) -> Option<HeroBlock> {
        let hero = self.select(heroes)?;
        let url = String::from(hero.url);

        let block = match variant {
            FeedVariant::Msn => HeroBlock::Enclosure {
                length: self.probe.content_length(&url).await,
                url,
                mime: hero.mime,
            },
            FeedVariant::Samsung => HeroBlock::MediaContent {
                credit: self.credit(&hero.fields),
                url,
                mime: hero.mime,
            },
        };
        Some(block)
    }

    /// The image's own credit (or copyright), else the credit recorded on
    /// the attachment it came from.
    fn credit(&self, fields: &ImageFields) -> Option<String> {
        if let Some(credit) = non_blank(fields.credit.as_deref()) {
            return Some(credit.to_string());
        }
        let meta = self.attachments.attachment(fields.attachment_id?)?;
        non_blank(meta.credit.as_deref()).map(str::to_string)
    }
}
