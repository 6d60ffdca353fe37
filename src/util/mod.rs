//! Small text helpers shared by the renderers and the channel writer.
//!
//! - **XML-safe text**: removal of characters XML 1.0 cannot carry
//! - **Presence checks**: treating blank stored fields as absent

mod text;

pub use text::{non_blank, strip_invalid_xml_chars};
