use thiserror::Error;

/// Errors that fail a whole feed request.
///
/// Problems with single widgets or hero images never surface here; they are
/// logged and the affected markup is left out.
#[derive(Debug, Error)]
pub enum FeedError {
    /// The post source could not supply posts.
    #[error("Failed to load posts: {0:#}")]
    Source(#[source] anyhow::Error),
    /// The RSS document could not be written.
    #[error("Failed to write feed: {0:#}")]
    Serialize(#[source] anyhow::Error),
}
