//! RSS channel assembly for the partner feeds.
//!
//! - `assembler` - queries posts and renders the full document
//! - `hero` - the lead image as `<enclosure>` or `<media:content>`
//! - `probe` - best-effort enclosure length lookup over HTTP
//! - `channel` - the quick-xml writer for the RSS document
//!
//! # Example
//!
//! ```ignore
//! let assembler = FeedAssembler::new(config, source, attachments, http_probe(&config.probe)?);
//! let response = assembler.respond(FeedVariant::Msn, "/msn_feed").await?;
//! ```

mod assembler;
mod channel;
mod hero;
mod probe;

pub use assembler::{format_pub_date, FeedAssembler, FeedResponse};
pub use channel::{
    write_channel, ChannelHeader, RenderedItem, ATOM_NAMESPACE, CONTENT_NAMESPACE, DC_NAMESPACE,
    MEDIA_NAMESPACE,
};
pub use hero::{HeroBlock, HeroImage, HeroRenderer};
pub use probe::{
    http_probe, probe_client, CachedLengthProbe, ContentLengthProbe, HttpLengthProbe,
    NoLengthProbe, DEFAULT_PROBE_TIMEOUT,
};
