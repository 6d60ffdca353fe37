use super::embed::EmbedUnwrapper;
use super::sanitize::Sanitizer;
use crate::content::{
    AttachmentLookup, ImageRef, ListEntry, ListicleItem, ListicleMedia, Product, Step, Widget,
};
use crate::image::{ImageFields, ImageUrlResolver};
use crate::util::{non_blank, strip_invalid_xml_chars};
use crate::variant::FeedVariant;
use html_escape::{encode_double_quoted_attribute as attr, encode_text as text};
use std::fmt::Write as _;
use std::sync::Arc;
use url::Url;

/// Size variant preferred for images inside the article body.
pub const BODY_IMAGE_SIZE: &str = "square";

/// Renders article widgets into the flat HTML placed in `content:encoded`.
///
/// The renderer itself holds only configuration and collaborators; all state
/// of one rendering (such as the pull-quote numbering) lives in the call to
/// [`render`](Self::render), so the same renderer serves every request.
pub struct WidgetRenderer {
    images: ImageUrlResolver,
    attachments: Arc<dyn AttachmentLookup>,
    sanitizer: Arc<dyn Sanitizer>,
    embeds: EmbedUnwrapper,
}

impl WidgetRenderer {
    pub fn new(
        images: ImageUrlResolver,
        attachments: Arc<dyn AttachmentLookup>,
        sanitizer: Arc<dyn Sanitizer>,
        embeds: EmbedUnwrapper,
    ) -> Self {
        Self {
            images,
            attachments,
            sanitizer,
            embeds,
        }
    }

    /// Render widgets in order for one feed variant.
    ///
    /// Unknown widgets and widgets missing what they need render to nothing.
    /// The result never contains characters that are illegal in XML.
    pub fn render(&self, widgets: &[Widget], variant: FeedVariant) -> String {
        let mut pass = RenderPass {
            renderer: self,
            variant,
            out: String::new(),
            boxouts: 0,
        };
        for widget in widgets {
            pass.widget(widget);
        }

        let html = if variant.sanitizes_html() {
            self.sanitizer.sanitize(&pass.out)
        } else {
            pass.out
        };
        strip_invalid_xml_chars(&html).into_owned()
    }

    /// Resolve a body image to its URL and fields; `None` when the image is
    /// unknown or its URL fails validation.
    fn body_image(&self, image: &ImageRef) -> Option<(Url, ImageFields)> {
        let fields = ImageFields::resolve(image, self.attachments.as_ref())?;
        let source = fields.source(BODY_IMAGE_SIZE)?;
        match self.images.resolve(source) {
            Ok(url) => Some((url, fields)),
            Err(e) => {
                tracing::debug!(source = %source, error = %e, "Skipping body image");
                None
            }
        }
    }
}

/// State for one [`WidgetRenderer::render`] call.
struct RenderPass<'a> {
    renderer: &'a WidgetRenderer,
    variant: FeedVariant,
    out: String,
    /// Pull quotes emitted so far; numbers the `boxout_N` ids.
    boxouts: u32,
}

impl RenderPass<'_> {
    fn widget(&mut self, widget: &Widget) {
        match widget {
            Widget::Paragraph { paragraph: html } | Widget::Divider { divider: html } => {
                self.raw(html.as_deref());
            }
            Widget::Html { html } => self.html(html.as_deref()),
            Widget::Heading { text: heading } => {
                if let Some(heading) = non_blank(heading.as_deref()) {
                    let _ = write!(self.out, "<h2>{}</h2>", text(heading));
                }
            }
            Widget::Image { image } => self.image(image.as_ref()),
            Widget::InteractiveImage { first_image } => self.interactive_image(first_image.as_ref()),
            Widget::Listicle { items } => self.listicle(items),
            Widget::Embed { embed, embed_link } => {
                self.embed(embed.as_deref(), embed_link.as_deref())
            }
            Widget::Button { url, label } => self.button(url.as_deref(), label.as_deref()),
            Widget::PullQuote { text, quote_author } => {
                self.pull_quote(text.as_deref(), quote_author.as_deref())
            }
            Widget::ProductCarousel { products } => self.product_carousel(products),
            Widget::LoopingVideo { video } => self.looping_video(video.as_deref()),
            Widget::ListWidget { entries } => self.list_widget(entries),
            Widget::Instructions { steps } => self.instructions(steps),
            Widget::Unknown => {}
        }
    }

    fn raw(&mut self, html: Option<&str>) {
        if let Some(html) = html {
            self.out.push_str(html);
        }
    }

    fn html(&mut self, html: Option<&str>) {
        let Some(html) = html else {
            return;
        };
        if self.variant.sanitizes_html() {
            let clean = self.renderer.sanitizer.sanitize(html);
            self.out.push_str(&clean);
        } else {
            self.out.push_str(html);
        }
    }

    fn image(&mut self, image: Option<&ImageRef>) {
        let Some((url, fields)) = image.and_then(|i| self.renderer.body_image(i)) else {
            return;
        };
        let _ = write!(
            self.out,
            r#"<figure class="pp-media pp-media--pull-centre"><img class="pp-media__image" src="{}" alt="{}" />"#,
            attr(url.as_str()),
            attr(fields.alt())
        );
        if let Some(caption) = fields.caption() {
            let _ = write!(
                self.out,
                r#"<figcaption class="pp-media__caption">{}</figcaption>"#,
                text(caption)
            );
        }
        self.out.push_str("</figure>");
    }

    fn interactive_image(&mut self, image: Option<&ImageRef>) {
        let Some((url, fields)) = image.and_then(|i| self.renderer.body_image(i)) else {
            return;
        };
        let _ = write!(
            self.out,
            r#"<figure><img src="{}" alt="{}" /></figure>"#,
            attr(url.as_str()),
            attr(fields.alt())
        );
    }

    fn listicle(&mut self, items: &[ListicleItem]) {
        if items.is_empty() {
            return;
        }
        self.out.push_str(r#"<section class="listicle">"#);
        for item in items {
            self.listicle_item(item);
        }
        self.out.push_str("</section>");
    }

    fn listicle_item(&mut self, item: &ListicleItem) {
        // Fields for other media kinds can hold stale values from earlier edits
        let shows = |media: ListicleMedia| item.media_type == Some(media);

        if shows(ListicleMedia::Image) {
            if let Some((url, fields)) = item.image.as_ref().and_then(|i| self.renderer.body_image(i))
            {
                let _ = write!(
                    self.out,
                    r#"<figure class="pp-media listicle__image"><img class="pp-media__image" src="{}" alt="{}" />"#,
                    attr(url.as_str()),
                    attr(fields.alt())
                );
                if let Some(caption) = fields.caption() {
                    let _ = write!(
                        self.out,
                        r#"<figcaption class="pp-media__caption">{}</figcaption>"#,
                        text(caption)
                    );
                }
                self.out.push_str("</figure>");
            }
        }
        if shows(ListicleMedia::Loop) {
            self.looping_video(item.video.as_deref());
        }
        if shows(ListicleMedia::Embed) {
            let markup = non_blank(item.embed.as_deref());
            if self.variant.permits_raw_embeds() {
                self.raw(markup);
            } else if markup.is_some() || non_blank(item.embed_link.as_deref()).is_some() {
                let link = self.renderer.embeds.link_html(item.embed_link.as_deref(), markup);
                self.out.push_str(&link);
            }
        }

        if let Some(title) = non_blank(item.title.as_deref()) {
            let _ = write!(self.out, r#"<h4 class="listicle__title">{}</h4>"#, text(title));
        }
        if let Some(paragraph) = non_blank(item.paragraph.as_deref()) {
            let _ = write!(self.out, r#"<div class="listicle__paragraph">{paragraph}</div>"#);
        }
        if let (Some(url), Some(label)) = (
            non_blank(item.url.as_deref()),
            non_blank(item.label.as_deref()),
        ) {
            let _ = write!(
                self.out,
                r#"<a class="listicle__link" href="{}">{}</a>"#,
                attr(url),
                text(label)
            );
        }
    }

    fn embed(&mut self, markup: Option<&str>, link: Option<&str>) {
        let markup = non_blank(markup);
        if self.variant.permits_raw_embeds() {
            let Some(markup) = markup else {
                return;
            };
            if link.is_some_and(|l| l.contains("youtube")) {
                let _ = write!(self.out, r#"<p class="stylist-youtube">{markup}</p>"#);
            } else {
                self.out.push_str(markup);
            }
        } else {
            let html = self.renderer.embeds.link_html(link, markup);
            self.out.push_str(&html);
        }
    }

    fn button(&mut self, url: Option<&str>, label: Option<&str>) {
        let (Some(url), Some(label)) = (non_blank(url), non_blank(label)) else {
            return;
        };
        let _ = write!(
            self.out,
            r#"<a class="button" href="{}">{}</a>"#,
            attr(url),
            text(label)
        );
    }

    fn pull_quote(&mut self, quote: Option<&str>, author: Option<&str>) {
        let quote = non_blank(quote).unwrap_or_default();
        self.boxouts += 1;
        let _ = write!(
            self.out,
            concat!(
                r#"<section class="pp-article__boxout">"#,
                r#"<div id="boxout_{}" class="pp-boxout" style="background-color:#606060;">"#,
                r#"<div class="pp-boxout__body"><h4>{}</h4>"#
            ),
            self.boxouts,
            text(quote)
        );
        if let Some(author) = non_blank(author) {
            let _ = write!(self.out, "<p>{}</p>", text(author));
        }
        self.out.push_str("</div></div></section>");
    }

    fn product_carousel(&mut self, products: &[Product]) {
        if products.is_empty() {
            return;
        }
        self.out.push_str(r#"<section class="product-carousel">"#);
        for product in products {
            self.product(product);
        }
        self.out.push_str("</section>");
    }

    fn product(&mut self, product: &Product) {
        let name = non_blank(product.name.as_deref()).unwrap_or_default();
        self.out.push_str(r#"<div class="product">"#);
        if let Some((url, fields)) = product
            .thumbnail
            .as_ref()
            .and_then(|t| self.renderer.body_image(t))
        {
            let alt = non_blank(Some(fields.alt())).unwrap_or(name);
            let _ = write!(
                self.out,
                r#"<img class="product__image" src="{}" alt="{}" />"#,
                attr(url.as_str()),
                attr(alt)
            );
        }
        let _ = write!(self.out, r#"<h4 class="product__name">{}</h4>"#, text(name));
        if let Some(price) = non_blank(product.price.as_deref()) {
            let _ = write!(self.out, r#"<span class="product__price">{}</span>"#, text(price));
        }
        if let Some(description) = non_blank(product.description.as_deref()) {
            let _ = write!(self.out, r#"<div class="product__description">{description}</div>"#);
        }
        if let (Some(label), Some(url)) = (
            non_blank(product.button_text.as_deref()),
            non_blank(product.button_url.as_deref()),
        ) {
            let _ = write!(
                self.out,
                r#"<a class="product__button" href="{}">{}</a>"#,
                attr(url),
                text(label)
            );
        }
        self.out.push_str("</div>");
    }

    fn looping_video(&mut self, video: Option<&str>) {
        if !self.variant.permits_raw_embeds() {
            return;
        }
        let Some(video) = non_blank(video) else {
            return;
        };
        let url = match self.renderer.images.absolute(video) {
            Ok(url) => url,
            Err(e) => {
                tracing::debug!(video = %video, error = %e, "Skipping looping video");
                return;
            }
        };
        let _ = write!(
            self.out,
            concat!(
                r#"<video src="{}" preload="auto" muted autoplay loop playsinline "#,
                r#"webkit-playsinline x5-playsinline style="width:100%;height:auto;"></video>"#
            ),
            attr(url.as_str())
        );
    }

    fn list_widget(&mut self, entries: &[ListEntry]) {
        if entries.is_empty() {
            return;
        }
        self.out.push_str("<ol>");
        for entry in entries {
            self.out.push_str("<li>");
            if let Some(header) = non_blank(entry.header.as_deref()) {
                let _ = write!(self.out, "<strong>{}</strong> ", text(header));
            }
            self.raw(entry.body.as_deref());
            self.out.push_str("</li>");
        }
        self.out.push_str("</ol>");
    }

    fn instructions(&mut self, steps: &[Step]) {
        if steps.is_empty() {
            return;
        }
        self.out.push_str("<ol>");
        for step in steps {
            self.out.push_str("<li>");
            self.raw(step.text.as_deref());
            self.out.push_str("</li>");
        }
        self.out.push_str("</ol>");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{AttachmentId, AttachmentMeta, InMemoryAttachments, InlineImage};
    use crate::render::HtmlSanitizer;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn renderer() -> WidgetRenderer {
        let attachments: InMemoryAttachments = [(
            AttachmentId(5),
            AttachmentMeta {
                sizes: HashMap::from([(
                    "square".to_string(),
                    "/uploads/five-sq.jpg".to_string(),
                )]),
                url: Some("/uploads/five.jpg".to_string()),
                alt: Some("Five".to_string()),
                ..Default::default()
            },
        )]
        .into_iter()
        .collect();
        WidgetRenderer::new(
            ImageUrlResolver::new("https://www.example.com", None),
            Arc::new(attachments),
            Arc::new(HtmlSanitizer::default()),
            EmbedUnwrapper::default(),
        )
    }

    fn inline(url: &str, alt: &str) -> ImageRef {
        ImageRef::Inline(InlineImage {
            url: Some(url.to_string()),
            alt: Some(alt.to_string()),
            ..Default::default()
        })
    }

    #[test]
    fn test_heading_is_escaped() {
        let html = renderer().render(
            &[Widget::Heading {
                text: Some("Salt & <pepper>".into()),
            }],
            FeedVariant::Msn,
        );
        assert_eq!(html, "<h2>Salt &amp; &lt;pepper&gt;</h2>");
    }

    #[test]
    fn test_image_prefers_square_size() {
        let html = renderer().render(
            &[Widget::Image {
                image: Some(ImageRef::Attachment(AttachmentId(5))),
            }],
            FeedVariant::Msn,
        );
        assert_eq!(
            html,
            r#"<figure class="pp-media pp-media--pull-centre"><img class="pp-media__image" src="https://www.example.com/uploads/five-sq.jpg" alt="Five" /></figure>"#
        );
    }

    #[test]
    fn test_image_with_caption() {
        let image = ImageRef::Inline(InlineImage {
            url: Some("https://img.example.com/a.png".into()),
            caption: Some("A \"quoted\" caption".into()),
            ..Default::default()
        });
        let html = renderer().render(&[Widget::Image { image: Some(image) }], FeedVariant::Msn);
        assert!(html.contains(r#"<figcaption class="pp-media__caption">A "quoted" caption</figcaption>"#));
        assert!(html.contains(r#"alt="""#));
    }

    #[test]
    fn test_invalid_image_renders_nothing() {
        let html = renderer().render(
            &[
                Widget::Image {
                    image: Some(inline("https://img.example.com/clip.mp4", "x")),
                },
                Widget::Image {
                    image: Some(ImageRef::Attachment(AttachmentId(404))),
                },
                Widget::Image { image: None },
            ],
            FeedVariant::Msn,
        );
        assert_eq!(html, "");
    }

    #[test]
    fn test_pull_quote_counter_restarts_per_render() {
        let widgets = vec![
            Widget::PullQuote {
                text: Some("One".into()),
                quote_author: Some("Ann".into()),
            },
            Widget::PullQuote {
                text: Some("Two".into()),
                quote_author: None,
            },
        ];
        let renderer = renderer();
        let first = renderer.render(&widgets, FeedVariant::Msn);
        assert!(first.contains(r#"id="boxout_1""#));
        assert!(first.contains(r#"id="boxout_2""#));
        assert!(!first.contains("boxout_3"));
        assert!(first.contains("<h4>One</h4><p>Ann</p>"));
        assert_eq!(renderer.render(&widgets, FeedVariant::Msn), first);
    }

    #[test]
    fn test_pull_quote_without_text_keeps_author_block() {
        let widgets = vec![
            Widget::PullQuote {
                text: Some("  ".into()),
                quote_author: Some("Ann".into()),
            },
            Widget::PullQuote {
                text: Some("Two".into()),
                quote_author: None,
            },
        ];
        let html = renderer().render(&widgets, FeedVariant::Msn);
        assert!(html.contains(r#"id="boxout_1""#));
        assert!(html.contains("<h4></h4><p>Ann</p>"));
        assert!(html.contains(r#"id="boxout_2""#));
        assert!(html.contains("<h4>Two</h4>"));
    }

    #[test]
    fn test_button_needs_url_and_label() {
        let r = renderer();
        assert_eq!(
            r.render(
                &[Widget::Button {
                    url: Some("https://shop.example.com/?a=1&b=2".into()),
                    label: Some("Buy".into()),
                }],
                FeedVariant::Msn
            ),
            r#"<a class="button" href="https://shop.example.com/?a=1&amp;b=2">Buy</a>"#
        );
        assert_eq!(
            r.render(
                &[Widget::Button {
                    url: None,
                    label: Some("Buy".into()),
                }],
                FeedVariant::Msn
            ),
            ""
        );
    }

    #[test]
    fn test_youtube_embed_wrapped_on_msn() {
        let widget = Widget::Embed {
            embed: Some("<iframe src=\"https://www.youtube.com/embed/abc\"></iframe>".into()),
            embed_link: Some("https://www.youtube.com/watch?v=abc".into()),
        };
        assert_eq!(
            renderer().render(&[widget], FeedVariant::Msn),
            r#"<p class="stylist-youtube"><iframe src="https://www.youtube.com/embed/abc"></iframe></p>"#
        );
    }

    #[test]
    fn test_embed_becomes_link_on_samsung() {
        let widget = Widget::Embed {
            embed: Some(
                r#"<iframe src="https://cdn.embedly.com/widgets/media.html?url=https%3A%2F%2Ftwitter.com%2Fa"></iframe>"#
                    .into(),
            ),
            embed_link: None,
        };
        assert_eq!(
            renderer().render(&[widget], FeedVariant::Samsung),
            r#"<p><a href="https://twitter.com/a">https://twitter.com/a</a></p>"#
        );
    }

    #[test]
    fn test_listicle_samsung_drops_video_and_embed_markup() {
        let items = vec![
            ListicleItem {
                media_type: Some(ListicleMedia::Loop),
                video: Some("https://media.example.com/loop.mp4".into()),
                title: Some("First".into()),
                paragraph: Some("<p>Body</p>".into()),
                ..Default::default()
            },
            ListicleItem {
                media_type: Some(ListicleMedia::Embed),
                embed: Some("<blockquote>https://www.instagram.com/p/x/</blockquote>".into()),
                label: Some("More".into()),
                url: Some("https://www.example.com/more".into()),
                ..Default::default()
            },
        ];
        let html = renderer().render(&[Widget::Listicle { items }], FeedVariant::Samsung);
        assert!(!html.contains("<video"));
        assert!(!html.contains("<blockquote>"));
        assert!(html.contains(
            r#"<p><a href="https://www.instagram.com/p/x/">https://www.instagram.com/p/x/</a></p>"#
        ));
        assert!(html.contains(r#"<div class="listicle__paragraph"><p>Body</p></div>"#));
        assert!(html.starts_with(r#"<section class="listicle">"#));
    }

    #[test]
    fn test_listicle_msn_keeps_media() {
        let items = vec![ListicleItem {
            media_type: Some(ListicleMedia::Image),
            image: Some(inline("/uploads/one.jpg", "One")),
            title: Some("One".into()),
            ..Default::default()
        }];
        let html = renderer().render(&[Widget::Listicle { items }], FeedVariant::Msn);
        assert_eq!(
            html,
            concat!(
                r#"<section class="listicle"><figure class="pp-media listicle__image">"#,
                r#"<img class="pp-media__image" src="https://www.example.com/uploads/one.jpg" alt="One" /></figure>"#,
                r#"<h4 class="listicle__title">One</h4></section>"#
            )
        );
    }

    #[test]
    fn test_listicle_shows_only_selected_media() {
        let items = vec![
            ListicleItem {
                media_type: None,
                image: Some(inline("/uploads/stale.jpg", "Stale")),
                video: Some("https://media.example.com/stale.mp4".into()),
                embed: Some("<blockquote>stale</blockquote>".into()),
                title: Some("No media".into()),
                ..Default::default()
            },
            ListicleItem {
                media_type: Some(ListicleMedia::Loop),
                image: Some(inline("/uploads/old.jpg", "Old")),
                video: Some("https://media.example.com/current.mp4".into()),
                title: Some("Video".into()),
                ..Default::default()
            },
        ];
        let html = renderer().render(&[Widget::Listicle { items }], FeedVariant::Msn);
        assert!(!html.contains("<figure"));
        assert!(!html.contains("stale"));
        assert!(html.contains(r#"src="https://media.example.com/current.mp4""#));
        assert_eq!(html.matches("<video").count(), 1);
        assert!(html.contains(r#"<h4 class="listicle__title">No media</h4>"#));
    }

    #[test]
    fn test_product_carousel() {
        let products = vec![Product {
            thumbnail: Some(ImageRef::Attachment(AttachmentId(5))),
            name: Some("Kettle".into()),
            price: Some("£20".into()),
            description: Some("<p>Boils</p>".into()),
            button_text: Some("Shop".into()),
            button_url: Some("https://shop.example.com/kettle".into()),
        }];
        let html = renderer().render(&[Widget::ProductCarousel { products }], FeedVariant::Msn);
        assert_eq!(
            html,
            concat!(
                r#"<section class="product-carousel"><div class="product">"#,
                r#"<img class="product__image" src="https://www.example.com/uploads/five-sq.jpg" alt="Five" />"#,
                r#"<h4 class="product__name">Kettle</h4><span class="product__price">£20</span>"#,
                r#"<div class="product__description"><p>Boils</p></div>"#,
                r#"<a class="product__button" href="https://shop.example.com/kettle">Shop</a>"#,
                r#"</div></section>"#
            )
        );
    }

    #[test]
    fn test_samsung_html_widget_sanitized() {
        let html = renderer().render(
            &[Widget::Html {
                html: Some(r#"<p onclick="x()">Hi<script>bad()</script></p>"#.into()),
            }],
            FeedVariant::Samsung,
        );
        assert_eq!(html, "<p>Hi</p>");
    }

    #[test]
    fn test_msn_html_widget_verbatim() {
        let raw = r#"<div data-x="1"><script>ok()</script></div>"#;
        let html = renderer().render(
            &[Widget::Html {
                html: Some(raw.into()),
            }],
            FeedVariant::Msn,
        );
        assert_eq!(html, raw);
    }

    #[test]
    fn test_invalid_xml_chars_removed() {
        let html = renderer().render(
            &[Widget::Paragraph {
                paragraph: Some("<p>a\u{0}b\u{b}c</p>".into()),
            }],
            FeedVariant::Msn,
        );
        assert_eq!(html, "<p>abc</p>");
    }
}
