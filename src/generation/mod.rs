pub mod builder;
pub mod model;

pub use builder::ContentBuilder;
pub use model::{
    BlockReason, Candidate, FinishReason, GenerateContentRequest, GenerationConfig,
    GenerationResponse, PromptFeedback, UsageMetadata,
};
