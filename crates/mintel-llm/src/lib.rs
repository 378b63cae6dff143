//! Model-facing half of the pipeline: prompt builders, the completion
//! client, the lenient JSON decoder and the truncation retry.

pub mod analyst;
pub mod client;
pub mod decode;
pub mod error;
pub mod prompts;
pub mod retry;

pub use analyst::{complete_and_parse, Analyst};
pub use client::{AnthropicClient, Completion, CompletionClient};
pub use decode::decode;
pub use error::{DecodeError, LlmError};
pub use prompts::{
    build_overview_prompt, build_strategy_prompt, build_video_prompt, ResearchContext,
    TRUNCATION_RETRY_NOTICE,
};
pub use retry::{Attempt, RetryDecision, RetryPolicy};
