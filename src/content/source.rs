use super::model::Post;
use crate::variant::FeedVariant;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::Path;

/// Upper bound on items in one feed document.
pub const MAX_POSTS: usize = 30;

/// Built-in post type that is always queried.
pub const BUILTIN_POST_TYPE: &str = "post";

/// Which posts a feed asks the content store for.
///
/// Results must be ordered newest first and contain at most `limit` posts;
/// no total count is needed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostQuery {
    /// `post` followed by the public custom types.
    pub post_types: Vec<String>,
    /// Custom field that must be switched on.
    pub flag_field: String,
    pub limit: usize,
}

impl PostQuery {
    pub fn for_variant(variant: FeedVariant, public_types: &[String], limit: usize) -> Self {
        let mut post_types = vec![BUILTIN_POST_TYPE.to_string()];
        for post_type in public_types {
            if !post_types.contains(post_type) {
                post_types.push(post_type.clone());
            }
        }

        Self {
            post_types,
            flag_field: variant.flag_field().to_string(),
            limit: limit.clamp(1, MAX_POSTS),
        }
    }

    /// Whether a post satisfies the type and flag filters.
    pub fn matches(&self, post: &Post) -> bool {
        self.post_types.contains(&post.post_type) && post.flag(&self.flag_field)
    }
}

/// Supplies the posts for a feed request.
///
/// Failures are opaque to the feed core and fail the whole request.
#[async_trait]
pub trait PostSource: Send + Sync {
    async fn recent_posts(&self, query: &PostQuery) -> Result<Vec<Post>>;
}

/// Post source over a JSON export (an array of posts).
#[derive(Debug, Clone, Default)]
pub struct JsonPostSource {
    posts: Vec<Post>,
}

impl JsonPostSource {
    pub fn new(posts: Vec<Post>) -> Self {
        Self { posts }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let posts: Vec<Post> =
            serde_json::from_str(json).context("Failed to parse post export as JSON")?;
        tracing::debug!(posts = posts.len(), "Loaded post export");
        Ok(Self::new(posts))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read post export '{}'", path.display()))?;
        Self::from_json(&json)
    }
}

#[async_trait]
impl PostSource for JsonPostSource {
    async fn recent_posts(&self, query: &PostQuery) -> Result<Vec<Post>> {
        let mut posts: Vec<Post> = self
            .posts
            .iter()
            .filter(|post| query.matches(post))
            .cloned()
            .collect();
        posts.sort_by(|a, b| b.published.cmp(&a.published));
        posts.truncate(query.limit);
        Ok(posts)
    }
}
