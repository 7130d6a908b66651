//! # gemini-caption
//!
//! Fetch an image over HTTP, base64-encode it and ask a Gemini model for a caption.
//!
//! The crate is organised along the four stages of that sequence:
//! [`ImageFetcher`] downloads, [`ImageResource::encode`] encodes,
//! [`GeminiCaptioner`] captions and [`Reporter`] prints. [`CaptionPipeline`]
//! runs them in order.

mod caption;
mod client;
mod fetch;
mod generation;
mod image;
mod models;
mod pipeline;
mod report;


pub use caption::{
    CaptionModel, CaptionRequest, CaptionResponse, Error as CaptionError, GeminiCaptioner,
    DEFAULT_PROMPT,
};
pub use client::{Error as ClientError, Gemini, Model, DEFAULT_BASE_URL};
pub use fetch::{Error as FetchError, ImageFetcher, MimeStrategy};
pub use generation::{
    BlockReason, Candidate, ContentBuilder, FinishReason, GenerateContentRequest,
    GenerationConfig, GenerationResponse, PromptFeedback, UsageMetadata,
};
pub use image::ImageResource;
pub use models::{Blob, Content, Part, Role};
pub use pipeline::{CaptionPipeline, Error as PipelineError, ImageSource};
pub use report::Reporter;
