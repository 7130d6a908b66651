use reqwest::{
    header::{HeaderMap, HeaderValue, InvalidHeaderValue},
    Client, ClientBuilder, Response,
};
use snafu::{ResultExt, Snafu};
use std::{fmt, sync::Arc, time::Duration};
use tracing::instrument;
use url::Url;

use crate::generation::{ContentBuilder, GenerateContentRequest, GenerationResponse};

/// Base URL of the public Gemini API.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/";
const API_KEY_HEADER: &str = "x-goog-api-key";

/// Gemini model to send requests to
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Model {
    #[default]
    Gemini15Pro,
    Gemini15Flash,
    Gemini25Flash,
    Gemini25Pro,
    /// Any other model, e.g. `models/gemini-2.0-flash` or `tunedModels/my-model`
    Custom(String),
}

impl Model {
    /// Resource name of the model, e.g. `models/gemini-1.5-pro` or `tunedModels/my-model`
    pub fn as_str(&self) -> &str {
        match self {
            Model::Gemini15Pro => "models/gemini-1.5-pro",
            Model::Gemini15Flash => "models/gemini-1.5-flash",
            Model::Gemini25Flash => "models/gemini-2.5-flash",
            Model::Gemini25Pro => "models/gemini-2.5-pro",
            Model::Custom(name) => name,
        }
    }
}

impl From<String> for Model {
    fn from(name: String) -> Self {
        let name = if name.contains('/') {
            name
        } else {
            format!("models/{name}")
        };
        match name.as_str() {
            "models/gemini-1.5-pro" => Model::Gemini15Pro,
            "models/gemini-1.5-flash" => Model::Gemini15Flash,
            "models/gemini-2.5-flash" => Model::Gemini25Flash,
            "models/gemini-2.5-pro" => Model::Gemini25Pro,
            _ => Model::Custom(name),
        }
    }
}

impl From<&str> for Model {
    fn from(name: &str) -> Self {
        Model::from(name.to_string())
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display("failed to parse API key"))]
    InvalidApiKey { source: InvalidHeaderValue },

    #[snafu(display("failed to build HTTP client"))]
    BuildClient { source: reqwest::Error },

    #[snafu(display("failed to construct URL (probably incorrect model name): {suffix}"))]
    ConstructUrl {
        source: url::ParseError,
        suffix: String,
    },

    #[snafu(display("failed to perform request to '{url}'"))]
    PerformRequest { source: reqwest::Error, url: Url },

    #[snafu(display(
        "bad response from server; code {code}; description: {}",
        description.as_deref().unwrap_or("none")
    ))]
    BadResponse {
        /// HTTP status code
        code: u16,
        /// HTTP error description
        description: Option<String>,
    },

    #[snafu(display("failed to read response body"))]
    DecodeResponse { source: reqwest::Error },

    #[snafu(display("failed to deserialize JSON response"))]
    Deserialize { source: serde_json::Error },
}

/// Internal client for making requests to the Gemini API
#[derive(Debug)]
pub(crate) struct GeminiClient {
    http_client: Client,
    pub model: Model,
    base_url: Url,
}

impl GeminiClient {
    /// Create a new client with custom base URL
    fn with_base_url(
        api_key: impl AsRef<str>,
        model: Model,
        mut base_url: Url,
        timeout: Option<Duration>,
    ) -> Result<Self, Error> {
        // `Url::join` replaces the last segment unless the path ends in '/'
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let mut headers = HeaderMap::new();
        let mut key = HeaderValue::from_str(api_key.as_ref()).context(InvalidApiKeySnafu)?;
        key.set_sensitive(true);
        headers.insert(API_KEY_HEADER, key);

        let mut builder = ClientBuilder::new().default_headers(headers);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http_client = builder.build().context(BuildClientSnafu)?;

        Ok(Self {
            http_client,
            model,
            base_url,
        })
    }

    /// Generate content
    #[instrument(skip_all, fields(model = %self.model))]
    pub(crate) async fn generate_content_raw(
        &self,
        request: GenerateContentRequest,
    ) -> Result<GenerationResponse, Error> {
        let url = self.build_url("generateContent")?;

        let response = self
            .http_client
            .post(url.clone())
            .json(&request)
            .send()
            .await
            .context(PerformRequestSnafu { url })?;

        let response = Self::check_response(response).await?;
        let bytes = response.bytes().await.context(DecodeResponseSnafu)?;
        let response: GenerationResponse =
            serde_json::from_slice(&bytes).context(DeserializeSnafu)?;

        tracing::debug!(
            candidates = response.candidates.len(),
            model_version = response.model_version.as_deref(),
            "received generateContent response"
        );
        Ok(response)
    }

    /// Turn a non-2xx status into [`Error::BadResponse`]
    async fn check_response(response: Response) -> Result<Response, Error> {
        let status = response.status();
        if !status.is_success() {
            let description = response.text().await.ok();
            return BadResponseSnafu {
                code: status.as_u16(),
                description,
            }
            .fail();
        }
        Ok(response)
    }

    /// Build a URL for the API
    fn build_url(&self, endpoint: &str) -> Result<Url, Error> {
        let suffix = format!("{}:{endpoint}", self.model);
        self.base_url
            .join(&suffix)
            .context(ConstructUrlSnafu { suffix })
    }
}

/// Client for the Gemini API
#[derive(Debug, Clone)]
pub struct Gemini {
    client: Arc<GeminiClient>,
}

impl Gemini {
    /// Create a new client with the specified API key
    pub fn new(api_key: impl AsRef<str>) -> Result<Self, Error> {
        Self::with_model(api_key, Model::default())
    }

    /// Create a new client with the specified API key and model
    pub fn with_model(api_key: impl AsRef<str>, model: impl Into<Model>) -> Result<Self, Error> {
        let base_url = Url::parse(DEFAULT_BASE_URL).context(ConstructUrlSnafu {
            suffix: DEFAULT_BASE_URL,
        })?;
        Self::with_model_and_base_url(api_key, model, base_url)
    }

    /// Create a new client with custom base URL
    pub fn with_base_url(api_key: impl AsRef<str>, base_url: Url) -> Result<Self, Error> {
        Self::with_model_and_base_url(api_key, Model::default(), base_url)
    }

    /// Create a new client with the specified API key, model, and base URL
    pub fn with_model_and_base_url(
        api_key: impl AsRef<str>,
        model: impl Into<Model>,
        base_url: Url,
    ) -> Result<Self, Error> {
        Self::with_options(api_key, model, base_url, None)
    }

    /// Create a new client, additionally bounding every request with `timeout`
    pub fn with_options(
        api_key: impl AsRef<str>,
        model: impl Into<Model>,
        base_url: Url,
        timeout: Option<Duration>,
    ) -> Result<Self, Error> {
        let client = GeminiClient::with_base_url(api_key, model.into(), base_url, timeout)?;
        Ok(Self {
            client: Arc::new(client),
        })
    }

    /// Model this client sends requests to
    pub fn model(&self) -> &Model {
        &self.client.model
    }

    /// Start building a content generation request
    pub fn generate_content(&self) -> ContentBuilder {
        ContentBuilder::new(self.client.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_names_get_models_prefix() {
        assert_eq!(Model::from("gemini-2.0-flash").as_str(), "models/gemini-2.0-flash");
        assert_eq!(
            Model::from("models/gemini-2.0-flash").as_str(),
            "models/gemini-2.0-flash"
        );
    }

    #[test]
    fn known_model_names_map_to_variants() {
        assert_eq!(Model::from("gemini-1.5-pro"), Model::Gemini15Pro);
        assert_eq!(Model::from("models/gemini-2.5-flash"), Model::Gemini25Flash);
        assert_eq!(Model::default().to_string(), "models/gemini-1.5-pro");
    }

    #[test]
    fn build_url_joins_model_and_endpoint() {
        let base = Url::parse("http://localhost:8080/v1beta/").unwrap();
        let client = GeminiClient::with_base_url("key", Model::Gemini15Pro, base, None).unwrap();
        let url = client.build_url("generateContent").unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:8080/v1beta/models/gemini-1.5-pro:generateContent"
        );
        assert!(url.query().is_none());
    }

    #[test]
    fn build_url_keeps_base_path_without_trailing_slash() {
        let base = Url::parse("http://localhost:8080/v1beta").unwrap();
        let client = GeminiClient::with_base_url("key", Model::Gemini15Pro, base, None).unwrap();
        let url = client.build_url("generateContent").unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:8080/v1beta/models/gemini-1.5-pro:generateContent"
        );
    }

    #[test]
    fn names_with_a_collection_keep_it() {
        assert_eq!(
            Model::from("tunedModels/caption-tuned").as_str(),
            "tunedModels/caption-tuned"
        );
        assert_eq!(
            Model::from("tunedModels/caption-tuned"),
            Model::Custom("tunedModels/caption-tuned".to_string())
        );
    }

    #[test]
    fn with_base_url_keeps_default_model() {
        let base = Url::parse("http://localhost:8080/v1beta/").unwrap();
        let client = Gemini::with_base_url("key", base).unwrap();
        assert_eq!(client.model(), &Model::Gemini15Pro);
    }

    #[test]
    fn api_key_with_newline_is_rejected() {
        let err = Gemini::new("bad\nkey").unwrap_err();
        assert!(matches!(err, Error::InvalidApiKey { .. }));
    }
}
