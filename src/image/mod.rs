//! Image handling shared by body widgets and hero blocks.
//!
//! - [`ImageUrlResolver`] normalizes stored references into absolute URLs and
//!   restricts them to static image formats
//! - [`ImageFields`] flattens inline images and attachment ids into one shape

mod fields;
mod url;

pub use fields::{ImageFields, DEFAULT_IMAGE_MIME};
pub use url::{validate_image_path, ImageUrlError, ImageUrlResolver, IMAGE_EXTENSIONS};
