//! Article content as exported by the content store.
//!
//! - `model` - posts, widgets and image references
//! - `attachment` - attachment metadata and the lookup collaborator
//! - `source` - the post query and the post source collaborator
//!
//! Decoding is forgiving: a malformed field is treated as unset and a
//! malformed widget as an unknown one.

mod attachment;
mod de;
mod model;
mod source;

pub use attachment::{AttachmentLookup, AttachmentMeta, InMemoryAttachments};
pub use model::{
    AttachmentId, ImageRef, InlineImage, ListEntry, ListicleItem, ListicleMedia, Post, Product,
    Step, Widget,
};
pub use source::{JsonPostSource, PostQuery, PostSource, BUILTIN_POST_TYPE, MAX_POSTS};
