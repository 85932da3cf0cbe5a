//! Short, friendly comments on diary entries from a language model.

use std::time::Duration;

use async_trait::async_trait;

use crate::models::entry::Mood;

/// Returned whenever a generated comment is unavailable.
pub const FALLBACK_COMMENT: &str =
    "Thanks for leaving today's note here. I'm cheering you on for tomorrow too!";

const MAX_TOKENS: u32 = 120;

#[async_trait]
pub trait CommentGenerator: Send + Sync {
    /// Never fails: any upstream problem yields [`FALLBACK_COMMENT`].
    async fn comment(&self, content: &str, mood: Mood) -> String;
}

/// Returns the fallback for every entry. Used when no API key is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackCommenter;

#[async_trait]
impl CommentGenerator for FallbackCommenter {
    async fn comment(&self, _content: &str, _mood: Mood) -> String {
        FALLBACK_COMMENT.to_string()
    }
}

#[derive(Clone)]
pub struct ClaudeCommenter {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl ClaudeCommenter {
    pub fn new(base_url: &str, api_key: &str, model: &str) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        })
    }

    async fn call_claude(&self, prompt: &str) -> Result<String, anyhow::Error> {
        if self.api_key.is_empty() {
            anyhow::bail!("no API key configured");
        }

        let response = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&serde_json::json!({
                "model": self.model,
                "max_tokens": MAX_TOKENS,
                "temperature": 0.7,
                "messages": [{
                    "role": "user",
                    "content": prompt
                }]
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Claude API error {}: {}", status, body);
        }

        let body: serde_json::Value = response.json().await?;
        let text = body["content"][0]["text"]
            .as_str()
            .map(str::trim)
            .unwrap_or_default();
        if text.is_empty() {
            anyhow::bail!("Claude API returned no text");
        }
        Ok(text.to_string())
    }
}

#[async_trait]
impl CommentGenerator for ClaudeCommenter {
    async fn comment(&self, content: &str, mood: Mood) -> String {
        match self.call_claude(&build_prompt(content, mood)).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(error = %e, "Comment generation failed, using fallback");
                FALLBACK_COMMENT.to_string()
            }
        }
    }
}

pub fn build_prompt(content: &str, mood: Mood) -> String {
    format!(
        r#"Read the diary line below and reply with one short paragraph, the way a close friend would text back.

Just say the first reaction that comes to mind. Do not try to say something meaningful.

Rules:
- Do not sound like a counselor or therapist.
- Do not summarize the situation or label the feelings.
- No lessons, conclusions or life advice. At most one short suggestion, only if it is clearly needed.
- Do not ask questions.
- Avoid phrases like "that seems important", "a meaningful experience" or "something to learn from".

Tone:
- Casual, like a message between friends. Light humor or a calm tone are both fine.
- No forced empathy and no over-the-top comfort.
- Pick the single strongest point of the entry and react to that.
- If the mood and the text do not quite match, do not analyse it; react to whatever feels natural.
- Around five sentences, written in the same language as the diary.

Mood: {mood}
Diary: {content}"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_prompt_carries_mood_and_content() {
        let prompt = build_prompt("long day of meetings", Mood::Angry);
        assert!(prompt.contains("Mood: angry"));
        assert!(prompt.ends_with("Diary: long day of meetings"));
    }

    #[tokio::test]
    async fn test_returns_generated_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .and(header("x-api-key", "key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "content": [{ "type": "text", "text": "  Dinner saved the day, nice.  " }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let commenter = ClaudeCommenter::new(&server.uri(), "key", "model").unwrap();
        assert_eq!(
            commenter.comment("dinner", Mood::Love).await,
            "Dinner saved the day, nice."
        );
    }

    #[tokio::test]
    async fn test_falls_back_on_upstream_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(529).set_body_string("overloaded"))
            .mount(&server)
            .await;

        let commenter = ClaudeCommenter::new(&server.uri(), "key", "model").unwrap();
        assert_eq!(commenter.comment("x", Mood::Sad).await, FALLBACK_COMMENT);
    }

    #[tokio::test]
    async fn test_falls_back_on_malformed_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "content": []
            })))
            .mount(&server)
            .await;

        let commenter = ClaudeCommenter::new(&server.uri(), "key", "model").unwrap();
        assert_eq!(commenter.comment("x", Mood::Happy).await, FALLBACK_COMMENT);
    }

    #[tokio::test]
    async fn test_missing_key_skips_the_network() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let commenter = ClaudeCommenter::new(&server.uri(), "", "model").unwrap();
        assert_eq!(commenter.comment("x", Mood::Neutral).await, FALLBACK_COMMENT);
        assert_eq!(FallbackCommenter.comment("x", Mood::Neutral).await, FALLBACK_COMMENT);
    }
}
