//! The fetch → encode → caption → report sequence.
//!
//! Each stage consumes the previous stage's output and runs exactly once. A
//! failing stage ends the run, so nothing is written unless a caption came back.
//!
//! ```rust,ignore
//! use gemini_caption::{CaptionPipeline, Gemini, GeminiCaptioner, ImageFetcher, Reporter};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = Gemini::new(std::env::var("GEMINI_API_KEY")?)?;
//!     let pipeline = CaptionPipeline::new(ImageFetcher::new()?, GeminiCaptioner::new(client));
//!     let url = "https://example.com/photo.jpg".parse()?;
//!     pipeline.run(&url, &mut Reporter::stdout()).await?;
//!     Ok(())
//! }
//! ```

use async_trait::async_trait;
use snafu::{ResultExt, Snafu};
use std::io::Write;
use tracing::instrument;
use url::Url;

use crate::{
    caption::{self, CaptionModel, CaptionRequest, DEFAULT_PROMPT},
    fetch::{self, ImageFetcher},
    image::ImageResource,
    report::Reporter,
};

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("failed to fetch image"))]
    Fetch { source: fetch::Error },

    #[snafu(display("failed to caption image"))]
    Caption { source: caption::Error },

    #[snafu(display("failed to write caption"))]
    Report { source: std::io::Error },
}

/// Where images come from.
#[async_trait]
pub trait ImageSource {
    async fn fetch(&self, url: &Url) -> Result<ImageResource, fetch::Error>;
}

#[async_trait]
impl ImageSource for ImageFetcher {
    async fn fetch(&self, url: &Url) -> Result<ImageResource, fetch::Error> {
        ImageFetcher::fetch(self, url).await
    }
}

/// Runs one image through fetch, encode, caption and report.
#[derive(Debug, Clone)]
pub struct CaptionPipeline<S, M> {
    source: S,
    model: M,
    prompt: String,
}

impl<S, M> CaptionPipeline<S, M>
where
    S: ImageSource + Sync,
    M: CaptionModel + Sync,
{
    pub fn new(source: S, model: M) -> Self {
        Self {
            source,
            model,
            prompt: DEFAULT_PROMPT.to_string(),
        }
    }

    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    /// Caption the image at `url` and return the text without printing it.
    #[instrument(skip_all, fields(url = %url))]
    pub async fn caption(&self, url: &Url) -> Result<String, Error> {
        let image = self.source.fetch(url).await.context(FetchSnafu)?;
        tracing::debug!(bytes = image.len(), mime = %image.mime_type(), "encoding image");

        let request = CaptionRequest::new(image.encode(), self.prompt.clone());
        let response = self.model.caption(request).await.context(CaptionSnafu)?;
        tracing::debug!(finish_reason = ?response.finish_reason, "caption received");

        Ok(response.text)
    }

    /// Caption the image at `url` and write the text to `reporter`.
    pub async fn run<W: Write>(&self, url: &Url, reporter: &mut Reporter<W>) -> Result<(), Error> {
        let text = self.caption(url).await?;
        reporter.report(&text).context(ReportSnafu)
    }
}
