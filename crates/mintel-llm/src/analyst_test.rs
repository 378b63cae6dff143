use std::collections::VecDeque;
use std::sync::Mutex;

use mintel_core::{EnrichedCompetitor, TimeframeDays};

use super::*;
use crate::client::Completion;
use crate::error::DecodeError;

/// Replays canned completions and records every call.
struct ScriptedClient {
    replies: Mutex<VecDeque<String>>,
    calls: Mutex<Vec<(String, u32)>>,
}

impl ScriptedClient {
    fn new(replies: &[&str]) -> Self {
        Self {
            replies: Mutex::new(replies.iter().map(|s| (*s).to_owned()).collect()),
            calls: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> Vec<(String, u32)> {
        self.calls.lock().unwrap().clone()
    }
}

impl CompletionClient for ScriptedClient {
    async fn complete(&self, prompt: &str, max_tokens: u32) -> Result<Completion, LlmError> {
        self.calls
            .lock()
            .unwrap()
            .push((prompt.to_owned(), max_tokens));
        let text = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .expect("unexpected extra completion call");
        Ok(Completion {
            text,
            stop_reason: Some("end_turn".to_owned()),
        })
    }
}

const POLICY: RetryPolicy = RetryPolicy {
    max_attempts: 2,
    max_tokens_ceiling: 8192,
};

#[tokio::test]
async fn parses_on_first_attempt() {
    let client = ScriptedClient::new(&["```json\n{\"a\": 1}\n```"]);
    let value = complete_and_parse(&client, "p", 4096, POLICY).await.unwrap();
    assert_eq!(value, serde_json::json!({ "a": 1 }));
    assert_eq!(client.calls().len(), 1);
}

#[tokio::test]
async fn incomplete_retries_once_with_notice_and_bigger_budget() {
    let client = ScriptedClient::new(&["{\"a\": [1, 2", "{\"a\": [1, 2]}"]);
    let value = complete_and_parse(&client, "prompt", 4096, POLICY)
        .await
        .unwrap();
    assert_eq!(value, serde_json::json!({ "a": [1, 2] }));

    let calls = client.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0], ("prompt".to_owned(), 4096));
    assert!(calls[1].0.starts_with("prompt"));
    assert!(calls[1].0.ends_with(TRUNCATION_RETRY_NOTICE));
    assert!(calls[1].1 >= 4096);
    assert_eq!(calls[1].1, 6144);
}

#[tokio::test]
async fn second_incomplete_propagates() {
    let client = ScriptedClient::new(&["{\"a\":", "[1, 2"]);
    let err = complete_and_parse(&client, "p", 4096, POLICY)
        .await
        .unwrap_err();
    assert!(err.is_incomplete());
    assert!(err.to_string().contains("incomplete"));
    assert_eq!(client.calls().len(), 2);
}

#[tokio::test]
async fn malformed_is_not_retried() {
    let client = ScriptedClient::new(&["{\"a\": 1 oops}"]);
    let err = complete_and_parse(&client, "p", 4096, POLICY)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        LlmError::Decode(DecodeError::Malformed { .. })
    ));
    assert_eq!(client.calls().len(), 1);
}

fn settings() -> LlmSettings {
    LlmSettings {
        api_key: Some("k".to_owned()),
        model: "m".to_owned(),
        max_tokens: 4096,
        max_tokens_ceiling: 8192,
        temperature: 0.2,
        timeout_secs: 5,
    }
}

#[tokio::test]
async fn sections_are_validated() {
    let client = ScriptedClient::new(&[
        r#"{"executive_summary": "Mercado joven", "dominant_patterns": [{"pattern": "Listas", "description": "Top 5"}], "market_gaps": "n/a"}"#,
        r#"["not", "an", "object"]"#,
    ]);
    let analyst = Analyst::new(client, &settings());
    let comps = [EnrichedCompetitor::empty(
        Platform::Youtube,
        "https://youtube.com/@a",
    )];
    let ctx = ResearchContext {
        platform: Platform::Youtube,
        timeframe: TimeframeDays::Thirty,
        competitors: &comps,
    };

    let overview = analyst.market_overview(&ctx).await.unwrap();
    assert_eq!(overview.executive_summary, "Mercado joven");
    assert_eq!(overview.dominant_patterns.len(), 1);
    assert!(overview.market_gaps.is_empty());
    assert_eq!(overview.saturation_level, "");

    let err = analyst.strategy(&ctx).await.unwrap_err();
    assert!(matches!(err, LlmError::Report(_)));
}

#[tokio::test]
async fn video_analyses_skip_call_without_items() {
    let analyst = Analyst::new(ScriptedClient::new(&[]), &settings());
    let result = analyst.video_analyses(Platform::Youtube, &[]).await.unwrap();
    assert!(result.is_none());
    assert!(analyst.client.calls().is_empty());
}

#[tokio::test]
async fn video_analyses_are_coerced() {
    let client = ScriptedClient::new(&[r#"{"videos": [{"title": "A", "views": "12"}, 7]}"#]);
    let analyst = Analyst::new(client, &settings());
    let items = [ContentItem {
        video_id: "a".to_owned(),
        title: "A".to_owned(),
        views: 12,
        ..ContentItem::default()
    }];
    let videos = analyst
        .video_analyses(Platform::Youtube, &items)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(videos.len(), 1);
    assert_eq!(videos[0].views, 12);
}
