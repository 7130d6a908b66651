//! Downloading the image to caption.

use mime::Mime;
use reqwest::{header::CONTENT_TYPE, Client, ClientBuilder};
use snafu::{ensure, ResultExt, Snafu};
use std::time::Duration;
use tracing::instrument;
use url::Url;

use crate::image::ImageResource;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display("unsupported URL scheme '{scheme}' in '{url}'; expected http or https"))]
    UnsupportedScheme { scheme: String, url: Url },

    #[snafu(display("failed to build HTTP client"))]
    BuildClient { source: reqwest::Error },

    #[snafu(display("failed to fetch image from '{url}'"))]
    Request { source: reqwest::Error, url: Url },

    #[snafu(display("image request to '{url}' failed with status {code}"))]
    Status { code: u16, url: Url },

    #[snafu(display("failed to read image body from '{url}'"))]
    Body { source: reqwest::Error, url: Url },
}

/// How the MIME type of a downloaded image is decided.
#[derive(Debug, Clone, PartialEq)]
pub enum MimeStrategy {
    /// Always use this type, whatever the server says.
    Fixed(Mime),
    /// Prefer an `image/*` `Content-Type`, then the URL extension, then `image/jpeg`.
    Detect,
}

impl Default for MimeStrategy {
    fn default() -> Self {
        MimeStrategy::Fixed(mime::IMAGE_JPEG)
    }
}

impl MimeStrategy {
    fn resolve(&self, content_type: Option<&str>, url: &Url) -> Mime {
        match self {
            MimeStrategy::Fixed(mime) => mime.clone(),
            MimeStrategy::Detect => content_type
                .and_then(|value| value.parse::<Mime>().ok())
                .filter(|mime| mime.type_() == mime::IMAGE)
                .or_else(|| {
                    mime_guess::from_path(url.path())
                        .iter()
                        .find(|mime| mime.type_() == mime::IMAGE)
                })
                .unwrap_or(mime::IMAGE_JPEG),
        }
    }
}

/// Performs the single HTTP GET for an image.
#[derive(Debug, Clone)]
pub struct ImageFetcher {
    http_client: Client,
    mime_strategy: MimeStrategy,
}

impl ImageFetcher {
    pub fn new() -> Result<Self, Error> {
        Self::with_options(MimeStrategy::default(), None)
    }

    pub fn with_options(
        mime_strategy: MimeStrategy,
        timeout: Option<Duration>,
    ) -> Result<Self, Error> {
        let mut builder = ClientBuilder::new();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http_client = builder.build().context(BuildClientSnafu)?;
        Ok(Self {
            http_client,
            mime_strategy,
        })
    }

    /// Download `url` and return its body as an [`ImageResource`].
    ///
    /// Only `http` and `https` URLs are accepted; anything else fails before a
    /// request is made. A non-2xx status is an error; an empty body is
    /// returned as an empty image.
    #[instrument(skip_all, fields(url = %url))]
    pub async fn fetch(&self, url: &Url) -> Result<ImageResource, Error> {
        ensure!(
            matches!(url.scheme(), "http" | "https"),
            UnsupportedSchemeSnafu {
                scheme: url.scheme(),
                url: url.clone(),
            }
        );

        let response = self
            .http_client
            .get(url.clone())
            .send()
            .await
            .context(RequestSnafu { url: url.clone() })?;

        let status = response.status();
        ensure!(
            status.is_success(),
            StatusSnafu {
                code: status.as_u16(),
                url: url.clone(),
            }
        );

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);
        let bytes = response
            .bytes()
            .await
            .context(BodySnafu { url: url.clone() })?;

        let mime_type = self.mime_strategy.resolve(content_type.as_deref(), url);
        tracing::debug!(bytes = bytes.len(), mime = %mime_type, "image downloaded");

        Ok(ImageResource::new(bytes.to_vec(), mime_type).with_source(url.clone()))
    }
}
