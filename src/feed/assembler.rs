use super::channel::{write_channel, ChannelHeader, RenderedItem};
use super::hero::HeroRenderer;
use super::probe::ContentLengthProbe;
use crate::config::FeedConfig;
use crate::content::{AttachmentLookup, Post, PostQuery, PostSource};
use crate::error::FeedError;
use crate::render::{EmbedUnwrapper, HtmlSanitizer, WidgetRenderer};
use crate::variant::FeedVariant;
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use html_escape::encode_quoted_attribute;
use std::sync::Arc;
use url::Url;

/// RFC 822 date as feed readers expect it, always in GMT.
const PUB_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// A finished feed, ready to be sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedResponse {
    /// `application/xml; charset=<configured charset>`
    pub content_type: String,
    pub body: String,
}

/// Builds complete feed documents.
///
/// One assembler serves any number of requests; every request queries the
/// source again and renders from scratch.
pub struct FeedAssembler {
    config: FeedConfig,
    source: Arc<dyn PostSource>,
    widgets: WidgetRenderer,
    heroes: HeroRenderer,
}

impl FeedAssembler {
    pub fn new(
        config: FeedConfig,
        source: Arc<dyn PostSource>,
        attachments: Arc<dyn AttachmentLookup>,
        probe: Arc<dyn ContentLengthProbe>,
    ) -> Self {
        let widgets = WidgetRenderer::new(
            config.image_resolver(),
            Arc::clone(&attachments),
            Arc::new(HtmlSanitizer::default()),
            EmbedUnwrapper::new(&config.embed_proxy_domains),
        );
        let heroes = HeroRenderer::new(config.image_resolver(), attachments, probe);
        Self {
            config,
            source,
            widgets,
            heroes,
        }
    }

    pub fn config(&self) -> &FeedConfig {
        &self.config
    }

    pub fn query(&self, variant: FeedVariant) -> PostQuery {
        PostQuery::for_variant(
            variant,
            &self.config.extra_post_types,
            self.config.item_limit(),
        )
    }

    /// The feed document plus the content type to send it with.
    pub async fn respond(
        &self,
        variant: FeedVariant,
        request_uri: &str,
    ) -> Result<FeedResponse, FeedError> {
        let body = self.build_channel(variant, request_uri).await?;
        Ok(FeedResponse {
            content_type: format!("application/xml; charset={}", self.config.charset.trim()),
            body,
        })
    }

    /// Query, render and write the RSS document for one variant.
    ///
    /// `request_uri` is the URI the feed was requested at; only its path is
    /// used, for the channel's self link.
    pub async fn build_channel(
        &self,
        variant: FeedVariant,
        request_uri: &str,
    ) -> Result<String, FeedError> {
        let query = self.query(variant);
        let mut posts = self
            .source
            .recent_posts(&query)
            .await
            .map_err(FeedError::Source)?;
        posts.truncate(query.limit);

        tracing::debug!(feed = %variant, posts = posts.len(), "Building feed");

        let items = self.render_items(&posts, variant).await;
        let header = self.channel_header(variant, request_uri);
        write_channel(&header, &items).map_err(FeedError::Serialize)
    }

    pub fn channel_header(&self, variant: FeedVariant, request_uri: &str) -> ChannelHeader {
        let site_base = self.config.site_base();
        ChannelHeader {
            title: variant.channel_title(self.config.site_name.trim()),
            link: site_base.to_string(),
            description: variant.channel_description(),
            language: self.config.language.clone(),
            self_link: format!("{}{}", site_base, request_path(request_uri)),
            media_namespace: variant.uses_media_namespace(),
        }
    }

    /// Render posts in order; hero lookups for several posts run at once.
    pub async fn render_items(&self, posts: &[Post], variant: FeedVariant) -> Vec<RenderedItem> {
        stream::iter(posts)
            .map(|post| self.render_item(post, variant))
            .buffered(self.config.probe.concurrency())
            .collect()
            .await
    }

    pub async fn render_item(&self, post: &Post, variant: FeedVariant) -> RenderedItem {
        let hero = self.heroes.render(&post.hero_images, variant).await;
        if hero.is_none() && !post.hero_images.is_empty() {
            tracing::debug!(post = post.id, "No usable hero image");
        }

        RenderedItem {
            title: post.title.clone(),
            link: post.permalink.clone(),
            guid: post.permalink.clone(),
            pub_date: format_pub_date(post.published),
            creator: post.author.clone(),
            description: encode_quoted_attribute(post.summary()).into_owned(),
            hero,
            content_html: self.widgets.render(&post.widgets, variant),
        }
    }
}

pub fn format_pub_date(published: DateTime<Utc>) -> String {
    published.format(PUB_DATE_FORMAT).to_string()
}

/// Path component of a request URI (absolute or origin-form), without
/// query or fragment. Non-empty paths always start with `/`.
fn request_path(request_uri: &str) -> String {
    let request_uri = request_uri.trim();
    if let Ok(url) = Url::parse(request_uri) {
        return url.path().to_string();
    }
    let end = request_uri.find(['?', '#']).unwrap_or(request_uri.len());
    let path = &request_uri[..end];
    if path.is_empty() || path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_pub_date_format() {
        let date = Utc.with_ymd_and_hms(2024, 1, 2, 9, 30, 0).unwrap();
        assert_eq!(format_pub_date(date), "Tue, 02 Jan 2024 09:30:00 GMT");
    }

    #[test]
    fn test_request_path_strips_query() {
        assert_eq!(request_path("/msn_feed?utm=x"), "/msn_feed");
        assert_eq!(request_path("/feed/samsung_feed/#top"), "/feed/samsung_feed/");
        assert_eq!(request_path("https://www.example.com/msn_feed?a=1"), "/msn_feed");
        assert_eq!(request_path(""), "");
    }

    #[test]
    fn test_request_path_gets_leading_slash() {
        assert_eq!(request_path("msn_feed"), "/msn_feed");
        assert_eq!(request_path("feed/samsung_feed?x=1"), "/feed/samsung_feed");
    }
}
