use crate::util::non_blank;
use thiserror::Error;
use url::Url;

/// File extensions accepted for feed images (compared case-insensitively).
pub const IMAGE_EXTENSIONS: [&str; 6] = ["jpg", "jpeg", "png", "gif", "webp", "avif"];

/// Reasons an image reference was rejected.
///
/// Renderers never surface these; a rejected image is simply left out of the
/// output. The variants exist so the reason can be logged.
#[derive(Error, Debug, PartialEq)]
pub enum ImageUrlError {
    /// Nothing left after trimming.
    #[error("Empty image reference")]
    Empty,
    /// The joined URL could not be parsed.
    #[error("Invalid image URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    /// The reference carries a scheme other than http or https.
    #[error("Unsupported scheme: {0} (only http/https allowed)")]
    UnsupportedScheme(String),
    /// The configured images host could not be applied to the URL.
    #[error("Invalid images host override: {0}")]
    InvalidHost(String),
    /// The URL has no file path (empty or `/`).
    #[error("Image URL has no file path")]
    MissingPath,
    /// The path does not end in one of [`IMAGE_EXTENSIONS`].
    #[error("Not a static image: {0}")]
    UnsupportedExtension(String),
}

/// Turns stored image references into absolute, validated image URLs.
///
/// Holds the site base URL (used for relative references) and an optional
/// images host that replaces the host of every resolved URL.
#[derive(Debug, Clone)]
pub struct ImageUrlResolver {
    site_base: String,
    images_host: Option<String>,
}

impl ImageUrlResolver {
    /// `site_base` is used verbatim minus trailing slashes; a blank
    /// `images_host` means no override.
    pub fn new(site_base: &str, images_host: Option<&str>) -> Self {
        Self {
            site_base: site_base.trim().trim_end_matches('/').to_string(),
            images_host: non_blank(images_host).map(str::to_string),
        }
    }

    pub fn site_base(&self) -> &str {
        &self.site_base
    }

    /// Normalize a raw reference into an absolute http(s) URL.
    ///
    /// - `//host/path` is treated as scheme-relative and gets `https:`
    /// - `/path` is appended to the site base
    /// - anything without a scheme is resolved against the site base
    /// - with an images host configured, the host is replaced and port,
    ///   query and fragment are dropped
    ///
    /// No file-type validation happens here; see [`resolve`](Self::resolve).
    pub fn normalize(&self, raw: &str) -> Result<Url, ImageUrlError> {
        let mut url = self.absolute(raw)?;

        if let Some(host) = &self.images_host {
            url.set_host(Some(host))
                .map_err(|_| ImageUrlError::InvalidHost(host.clone()))?;
            // Only fails for cannot-be-a-base URLs, which http(s) never is
            let _ = url.set_port(None);
            url.set_query(None);
            url.set_fragment(None);
        }

        Ok(url)
    }

    /// Absolute http(s) form of a reference, without the images host
    /// rewrite. Used for media that is not served from the images host.
    pub fn absolute(&self, raw: &str) -> Result<Url, ImageUrlError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(ImageUrlError::Empty);
        }

        let url = if raw.starts_with("//") {
            Url::parse(&format!("https:{raw}"))?
        } else if raw.starts_with('/') {
            Url::parse(&format!("{}{}", self.site_base, raw))?
        } else {
            match Url::parse(raw) {
                Ok(url) => url,
                Err(url::ParseError::RelativeUrlWithoutBase) => {
                    Url::parse(&format!("{}/{}", self.site_base, raw))?
                }
                Err(e) => return Err(e.into()),
            }
        };

        match url.scheme() {
            "http" | "https" => Ok(url),
            scheme => Err(ImageUrlError::UnsupportedScheme(scheme.to_owned())),
        }
    }

    /// Normalize and then require a static image file path.
    ///
    /// # Examples
    ///
    /// ```
    /// use partnerfeed::image::ImageUrlResolver;
    ///
    /// let resolver = ImageUrlResolver::new("https://www.example.com", None);
    /// let url = resolver.resolve("/uploads/cat.JPG").unwrap();
    /// assert_eq!(url.as_str(), "https://www.example.com/uploads/cat.JPG");
    ///
    /// assert!(resolver.resolve("https://cdn.example.com/clip.mp4").is_err());
    /// ```
    pub fn resolve(&self, raw: &str) -> Result<Url, ImageUrlError> {
        let url = self.normalize(raw)?;
        validate_image_path(&url)?;
        Ok(url)
    }

    /// String form of [`resolve`](Self::resolve): the URL, or `""` when the
    /// reference is rejected.
    pub fn resolve_or_empty(&self, raw: &str) -> String {
        match self.resolve(raw) {
            Ok(url) => url.into(),
            Err(e) => {
                tracing::debug!(raw = %raw, error = %e, "Rejected image reference");
                String::new()
            }
        }
    }
}

/// Require the URL path to name a file with an [`IMAGE_EXTENSIONS`] suffix.
pub fn validate_image_path(url: &Url) -> Result<(), ImageUrlError> {
    let path = url.path();
    if path.is_empty() || path == "/" {
        return Err(ImageUrlError::MissingPath);
    }

    let file = path.rsplit('/').next().unwrap_or_default();
    let ext = file
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();

    if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
        Ok(())
    } else {
        Err(ImageUrlError::UnsupportedExtension(file.to_string()))
    }
}
