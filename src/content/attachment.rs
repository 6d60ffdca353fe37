use super::model::{sizes, AttachmentId};
use crate::content::de;
use serde::Deserialize;
use std::collections::HashMap;

/// Metadata the content store keeps for a media attachment.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct AttachmentMeta {
    /// Size name to URL (`square`, `landscape`, ...).
    #[serde(alias = "doris_sizes", deserialize_with = "sizes")]
    pub sizes: HashMap<String, String>,
    #[serde(deserialize_with = "de::text")]
    pub url: Option<String>,
    #[serde(deserialize_with = "de::text")]
    pub alt: Option<String>,
    #[serde(deserialize_with = "de::text")]
    pub description: Option<String>,
    #[serde(deserialize_with = "de::text")]
    pub mime_type: Option<String>,
    #[serde(deserialize_with = "de::text")]
    pub credit: Option<String>,
}

/// Looks up attachment metadata by id.
///
/// Implemented by whatever fronts the media library; lookups are expected to
/// be cheap (in-process or already cached) since widgets call them inline.
pub trait AttachmentLookup: Send + Sync {
    fn attachment(&self, id: AttachmentId) -> Option<AttachmentMeta>;
}

/// Attachment metadata held in memory, e.g. loaded alongside a JSON export.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct InMemoryAttachments {
    entries: HashMap<AttachmentId, AttachmentMeta>,
}

impl InMemoryAttachments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: AttachmentId, meta: AttachmentMeta) {
        self.entries.insert(id, meta);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(AttachmentId, AttachmentMeta)> for InMemoryAttachments {
    fn from_iter<I: IntoIterator<Item = (AttachmentId, AttachmentMeta)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl AttachmentLookup for InMemoryAttachments {
    fn attachment(&self, id: AttachmentId) -> Option<AttachmentMeta> {
        self.entries.get(&id).cloned()
    }
}
