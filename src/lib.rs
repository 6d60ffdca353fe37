//! MSN and Samsung partner feeds for block-based articles.
//!
//! Posts come from a [`content::PostSource`]; their widget bodies are turned
//! into flat HTML by [`render::WidgetRenderer`], their lead image into an
//! `<enclosure>` or `<media:content>` by [`feed::HeroRenderer`], and
//! [`feed::FeedAssembler`] writes the RSS 2.0 document.
//!
//! ```ignore
//! let mut config = FeedConfig::load(Path::new("partnerfeed.toml"))?;
//! config.apply_env();
//! config.validate()?;
//!
//! let source = Arc::new(JsonPostSource::load(Path::new("posts.json"))?);
//! let probe = feed::http_probe(&config.probe)?;
//! let assembler = FeedAssembler::new(config, source, attachments, probe);
//!
//! let variant = FeedVariant::from_slug("msn_feed").expect("registered endpoint");
//! let response = assembler.respond(variant, "/msn_feed").await?;
//! ```

pub mod config;
pub mod content;
pub mod error;
pub mod feed;
pub mod image;
pub mod render;
pub mod util;
pub mod variant;

pub use config::{ConfigError, FeedConfig, ProbeConfig};
pub use error::FeedError;
pub use feed::{FeedAssembler, FeedResponse};
pub use variant::{FeedVariant, UnknownFeed};
