use std::sync::Arc;
use tracing::instrument;

use crate::{
    client::{Error as ClientError, GeminiClient},
    generation::{GenerateContentRequest, GenerationConfig, GenerationResponse},
    models::{Blob, Content, Part, Role},
};

/// Builder for content generation requests
#[derive(Clone, Debug)]
pub struct ContentBuilder {
    client: Arc<GeminiClient>,
    pub contents: Vec<Content>,
    generation_config: Option<GenerationConfig>,
}

impl ContentBuilder {
    /// Creates a new `ContentBuilder`.
    pub(crate) fn new(client: Arc<GeminiClient>) -> Self {
        Self {
            client,
            contents: Vec::new(),
            generation_config: None,
        }
    }

    /// Adds a single user turn holding an image followed by a text prompt.
    ///
    /// Both parts travel in the same `Content`, image first.
    pub fn with_image_and_prompt(mut self, image: Blob, prompt: impl Into<String>) -> Self {
        let content = Content::with_parts(vec![
            Part::InlineData { inline_data: image },
            Part::text(prompt),
        ])
        .with_role(Role::User);
        self.contents.push(content);
        self
    }

    /// Sets the temperature for the request.
    ///
    /// Temperature controls the randomness of the output. Higher values (e.g., 1.0) produce
    /// more creative results, while lower values (e.g., 0.2) produce more deterministic results.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.generation_config
            .get_or_insert_with(Default::default)
            .temperature = Some(temperature);
        self
    }

    /// Sets the maximum number of output tokens for the request.
    pub fn with_max_output_tokens(mut self, max_output_tokens: i32) -> Self {
        self.generation_config
            .get_or_insert_with(Default::default)
            .max_output_tokens = Some(max_output_tokens);
        self
    }

    /// Builds the `GenerateContentRequest`.
    pub fn build(self) -> GenerateContentRequest {
        GenerateContentRequest {
            contents: self.contents,
            generation_config: self.generation_config,
        }
    }

    /// Executes the content generation request.
    #[instrument(skip_all, fields(
        messages.parts.count = self.contents.len(),
        generation.config.present = self.generation_config.is_some(),
    ))]
    pub async fn execute(self) -> Result<GenerationResponse, ClientError> {
        let client = self.client.clone();
        let request = self.build();
        client.generate_content_raw(request).await
    }
}
