use super::hero::HeroBlock;
use crate::util::strip_invalid_xml_chars;
use anyhow::{Context, Result};
use quick_xml::events::{BytesCData, BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::io::{Cursor, Write};

pub const DC_NAMESPACE: &str = "http://purl.org/dc/elements/1.1/";
pub const ATOM_NAMESPACE: &str = "http://www.w3.org/2005/Atom";
pub const CONTENT_NAMESPACE: &str = "http://purl.org/rss/1.0/modules/content/";
pub const MEDIA_NAMESPACE: &str = "http://search.yahoo.com/mrss/";

/// Channel-level fields of the RSS document.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelHeader {
    pub title: String,
    pub link: String,
    pub description: String,
    pub language: String,
    /// Absolute URL the feed was requested at, for `atom:link rel="self"`.
    pub self_link: String,
    /// Declare the MRSS namespace for `media:*` elements.
    pub media_namespace: bool,
}

/// One post, fully rendered for a feed.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedItem {
    pub title: String,
    pub link: String,
    pub guid: String,
    /// RFC 822 date in GMT, e.g. `Tue, 02 Jan 2024 09:30:00 GMT`.
    pub pub_date: String,
    pub creator: String,
    /// HTML-escaped summary.
    pub description: String,
    pub hero: Option<HeroBlock>,
    /// Rendered widget HTML for `content:encoded`.
    pub content_html: String,
}

/// Writes the complete RSS 2.0 document.
///
/// Every text field is stripped of characters XML 1.0 cannot carry, so stored
/// titles or names with stray control characters still yield a well-formed
/// document.
pub fn write_channel(header: &ChannelHeader, items: &[RenderedItem]) -> Result<String> {
    let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);

    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .context("Failed to write XML declaration")?;

    let mut rss = BytesStart::new("rss");
    rss.push_attribute(("version", "2.0"));
    rss.push_attribute(("xmlns:dc", DC_NAMESPACE));
    rss.push_attribute(("xmlns:atom", ATOM_NAMESPACE));
    rss.push_attribute(("xmlns:content", CONTENT_NAMESPACE));
    if header.media_namespace {
        rss.push_attribute(("xmlns:media", MEDIA_NAMESPACE));
    }
    writer
        .write_event(Event::Start(rss))
        .context("Failed to write rss element")?;
    writer
        .write_event(Event::Start(BytesStart::new("channel")))
        .context("Failed to write channel element")?;

    write_cdata_element(&mut writer, "title", &header.title)?;
    write_text_element(&mut writer, "link", &header.link)?;
    write_cdata_element(&mut writer, "description", &header.description)?;
    write_text_element(&mut writer, "language", &header.language)?;

    let mut self_link = BytesStart::new("atom:link");
    let href = strip_invalid_xml_chars(&header.self_link);
    self_link.push_attribute(("href", &*href));
    self_link.push_attribute(("rel", "self"));
    self_link.push_attribute(("type", "application/rss+xml"));
    writer
        .write_event(Event::Empty(self_link))
        .context("Failed to write atom:link element")?;

    for item in items {
        write_item(&mut writer, item)?;
    }

    writer
        .write_event(Event::End(BytesEnd::new("channel")))
        .context("Failed to write channel end")?;
    writer
        .write_event(Event::End(BytesEnd::new("rss")))
        .context("Failed to write rss end")?;

    let result = writer.into_inner().into_inner();
    String::from_utf8(result).context("Generated feed contains invalid UTF-8")
}

fn write_item<W: Write>(writer: &mut Writer<W>, item: &RenderedItem) -> Result<()> {
    writer
        .write_event(Event::Start(BytesStart::new("item")))
        .context("Failed to write item element")?;

    write_cdata_element(writer, "title", &item.title)?;
    write_text_element(writer, "link", &item.link)?;
    write_text_element(writer, "guid", &item.guid)?;
    write_text_element(writer, "pubDate", &item.pub_date)?;
    write_cdata_element(writer, "dc:creator", &item.creator)?;
    write_cdata_element(writer, "description", &item.description)?;
    if let Some(hero) = &item.hero {
        hero.write_to(writer)?;
    }
    write_cdata_element(writer, "content:encoded", &item.content_html)?;

    writer
        .write_event(Event::End(BytesEnd::new("item")))
        .context("Failed to write item end")?;
    Ok(())
}

fn write_text_element<W: Write>(writer: &mut Writer<W>, name: &str, text: &str) -> Result<()> {
    writer
        .write_event(Event::Start(BytesStart::new(name)))
        .with_context(|| format!("Failed to write {name} element"))?;
    writer
        .write_event(Event::Text(BytesText::new(&strip_invalid_xml_chars(text))))
        .with_context(|| format!("Failed to write {name} text"))?;
    writer
        .write_event(Event::End(BytesEnd::new(name)))
        .with_context(|| format!("Failed to write {name} end"))?;
    Ok(())
}

fn write_cdata_element<W: Write>(writer: &mut Writer<W>, name: &str, text: &str) -> Result<()> {
    writer
        .write_event(Event::Start(BytesStart::new(name)))
        .with_context(|| format!("Failed to write {name} element"))?;
    let text = strip_invalid_xml_chars(text);
    for section in cdata_sections(&text) {
        writer
            .write_event(Event::CData(BytesCData::new(section)))
            .with_context(|| format!("Failed to write {name} CDATA"))?;
    }
    writer
        .write_event(Event::End(BytesEnd::new(name)))
        .with_context(|| format!("Failed to write {name} end"))?;
    Ok(())
}

/// Split text so no section contains `]]>`; the terminator is broken
/// between `]]` and `>` across two sections.
fn cdata_sections(text: &str) -> Vec<&str> {
    let mut sections = Vec::new();
    let mut rest = text;
    while let Some(pos) = rest.find("]]>") {
        sections.push(&rest[..pos + 2]);
        rest = &rest[pos + 2..];
    }
    sections.push(rest);
    sections
}
