//! Article body rendering.
//!
//! [`WidgetRenderer`] turns the stored widget list into one HTML fragment per
//! feed variant. Samsung output goes through [`HtmlSanitizer`]; embeds it
//! cannot show are replaced by a link found by [`EmbedUnwrapper`].

mod embed;
mod sanitize;
mod widgets;

pub use embed::{EmbedUnwrapper, DEFAULT_PROXY_DOMAINS};
pub use sanitize::{HtmlSanitizer, Sanitizer, FEED_ALLOW_LIST};
pub use widgets::{WidgetRenderer, BODY_IMAGE_SIZE};
