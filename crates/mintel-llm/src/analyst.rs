//! Prompt → completion → decode → typed section.

use mintel_core::{
    coerce_video_analyses, ContentItem, LlmSettings, MarketOverview, Platform, StrategyReport,
    VideoAnalysis,
};
use serde_json::Value;

use crate::client::CompletionClient;
use crate::decode::decode;
use crate::error::LlmError;
use crate::prompts::{
    build_overview_prompt, build_strategy_prompt, build_video_prompt, ResearchContext,
    TRUNCATION_RETRY_NOTICE,
};
use crate::retry::{RetryDecision, RetryPolicy};

/// Calls the model once and decodes the result; if the response was cut off,
/// asks once more with a larger budget and an explicit completeness notice.
///
/// # Errors
///
/// Returns [`LlmError::Decode`] if the final response still fails to
/// decode, or the transport error of the failing call.
pub async fn complete_and_parse<C: CompletionClient>(
    client: &C,
    prompt: &str,
    max_tokens: u32,
    policy: RetryPolicy,
) -> Result<Value, LlmError> {
    policy
        .attempt(
            max_tokens,
            |e: &LlmError| {
                if e.is_incomplete() {
                    RetryDecision::Retry
                } else {
                    RetryDecision::GiveUp
                }
            },
            |attempt| async move {
                let completion = if attempt.is_retry() {
                    let retry_prompt = format!("{prompt}{TRUNCATION_RETRY_NOTICE}");
                    client.complete(&retry_prompt, attempt.max_tokens).await?
                } else {
                    client.complete(prompt, attempt.max_tokens).await?
                };
                if completion.hit_token_limit() {
                    tracing::warn!(
                        attempt = attempt.number,
                        max_tokens = attempt.max_tokens,
                        "llm: completion stopped at token limit, decoding anyway"
                    );
                }
                decode(&completion.text).map_err(|e| {
                    tracing::debug!(
                        raw = %completion.text,
                        error = %e,
                        "llm: undecodable completion"
                    );
                    LlmError::Decode(e)
                })
            },
        )
        .await
}

/// Runs the three analysis prompts against one completion backend.
pub struct Analyst<C> {
    client: C,
    max_tokens: u32,
    policy: RetryPolicy,
}

impl<C: CompletionClient> Analyst<C> {
    #[must_use]
    pub fn new(client: C, settings: &LlmSettings) -> Self {
        Self {
            client,
            max_tokens: settings.max_tokens,
            policy: RetryPolicy::single_retry(settings.max_tokens_ceiling),
        }
    }

    /// # Errors
    ///
    /// Returns an [`LlmError`] when the call fails, the response cannot be
    /// decoded, or it is not a JSON object.
    pub async fn market_overview(
        &self,
        ctx: &ResearchContext<'_>,
    ) -> Result<MarketOverview, LlmError> {
        let prompt = build_overview_prompt(ctx);
        let value = complete_and_parse(&self.client, &prompt, self.max_tokens, self.policy).await?;
        Ok(MarketOverview::from_value(&value)?)
    }

    /// # Errors
    ///
    /// As [`Analyst::market_overview`].
    pub async fn strategy(&self, ctx: &ResearchContext<'_>) -> Result<StrategyReport, LlmError> {
        let prompt = build_strategy_prompt(ctx);
        let value = complete_and_parse(&self.client, &prompt, self.max_tokens, self.policy).await?;
        Ok(StrategyReport::from_value(&value)?)
    }

    /// Deep dive on `top_items`; `None` when there were no items to analyse.
    ///
    /// # Errors
    ///
    /// Returns an [`LlmError`] when the call fails or the response cannot be
    /// decoded.
    pub async fn video_analyses(
        &self,
        platform: Platform,
        top_items: &[ContentItem],
    ) -> Result<Option<Vec<VideoAnalysis>>, LlmError> {
        let Some(prompt) = build_video_prompt(platform, top_items) else {
            return Ok(None);
        };
        let value = complete_and_parse(&self.client, &prompt, self.max_tokens, self.policy).await?;
        Ok(Some(coerce_video_analyses(&value)))
    }
}

#[cfg(test)]
#[path = "analyst_test.rs"]
mod tests;
