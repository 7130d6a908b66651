//! Turning an encoded image and a prompt into caption text.

use async_trait::async_trait;
use snafu::{ensure, ResultExt, Snafu};
use tracing::instrument;

use crate::{
    client::{Error as ClientError, Gemini},
    generation::{BlockReason, FinishReason, UsageMetadata},
    models::Blob,
};

/// Prompt used when the caller does not supply one.
pub const DEFAULT_PROMPT: &str = "Caption this image.";

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display("client invocation error"))]
    Client { source: Box<ClientError> },

    #[snafu(display(
        "model returned no caption (finish reason: {finish_reason:?}, block reason: {block_reason:?})"
    ))]
    NoCaption {
        finish_reason: Option<FinishReason>,
        block_reason: Option<BlockReason>,
    },
}

/// An encoded image and the prompt to send with it.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptionRequest {
    pub image: Blob,
    pub prompt: String,
}

impl CaptionRequest {
    pub fn new(image: Blob, prompt: impl Into<String>) -> Self {
        Self {
            image,
            prompt: prompt.into(),
        }
    }
}

/// Text produced by the model for a [`CaptionRequest`].
#[derive(Debug, Clone, PartialEq)]
pub struct CaptionResponse {
    pub text: String,
    pub finish_reason: Option<FinishReason>,
    pub usage: Option<UsageMetadata>,
}

impl CaptionResponse {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            finish_reason: None,
            usage: None,
        }
    }
}

/// A model able to caption an inline image.
#[async_trait]
pub trait CaptionModel {
    async fn caption(&self, request: CaptionRequest) -> Result<CaptionResponse, Error>;
}

/// Captions images through the Gemini `generateContent` endpoint.
#[derive(Debug, Clone)]
pub struct GeminiCaptioner {
    client: Gemini,
    temperature: Option<f32>,
    max_output_tokens: Option<i32>,
}

impl GeminiCaptioner {
    pub fn new(client: Gemini) -> Self {
        Self {
            client,
            temperature: None,
            max_output_tokens: None,
        }
    }

    /// Sampling temperature sent with every caption request.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Upper bound on the tokens generated for a caption.
    pub fn with_max_output_tokens(mut self, max_output_tokens: i32) -> Self {
        self.max_output_tokens = Some(max_output_tokens);
        self
    }
}

#[async_trait]
impl CaptionModel for GeminiCaptioner {
    #[instrument(skip_all, fields(
        model = %self.client.model(),
        mime = %request.image.mime_type,
        payload.len = request.image.data.len(),
    ))]
    async fn caption(&self, request: CaptionRequest) -> Result<CaptionResponse, Error> {
        let mut builder = self
            .client
            .generate_content()
            .with_image_and_prompt(request.image, request.prompt);
        if let Some(temperature) = self.temperature {
            builder = builder.with_temperature(temperature);
        }
        if let Some(max_output_tokens) = self.max_output_tokens {
            builder = builder.with_max_output_tokens(max_output_tokens);
        }

        let response = builder.execute().await.map_err(Box::new).context(ClientSnafu)?;

        let text = response.text();
        ensure!(
            !text.is_empty(),
            NoCaptionSnafu {
                finish_reason: response.finish_reason().cloned(),
                block_reason: response.block_reason().cloned(),
            }
        );

        if let Some(usage) = &response.usage_metadata {
            tracing::info!(
                prompt_tokens = usage.prompt_token_count,
                response_tokens = usage.candidates_token_count,
                total_tokens = usage.total_token_count,
                "caption generated"
            );
        }

        Ok(CaptionResponse {
            text,
            finish_reason: response.finish_reason().cloned(),
            usage: response.usage_metadata,
        })
    }
}
