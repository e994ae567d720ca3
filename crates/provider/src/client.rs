//! HTTP voice provider client

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode};
use serde_json::{json, Value};

use claimcall_config::ProviderConfig;
use claimcall_core::{ConversationState, DispatchedCall, Result, VoiceProvider};

use crate::adapter::parse_conversation_payload;
use crate::ProviderError;

/// reqwest-backed [`VoiceProvider`]
#[derive(Clone)]
pub struct HttpVoiceProvider {
    client: Client,
    config: ProviderConfig,
}

impl HttpVoiceProvider {
    pub fn new(config: ProviderConfig) -> std::result::Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| {
                ProviderError::Configuration(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self { client, config })
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}/v1/convai{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// Execute a single request (used by the retry loop)
    async fn execute_request(
        &self,
        method: Method,
        url: &str,
        body: Option<&Value>,
    ) -> std::result::Result<Value, ProviderError> {
        let mut request = self
            .client
            .request(method, url)
            .header("xi-api-key", &self.config.api_key);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Err(ProviderError::NotFound(url.to_string()));
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api { status: status.as_u16(), message });
        }

        if status == StatusCode::NO_CONTENT {
            return Ok(Value::Null);
        }
        response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))
    }

    fn is_retryable(error: &ProviderError) -> bool {
        matches!(
            error,
            ProviderError::Network(_)
                | ProviderError::Timeout
                | ProviderError::Api { status: 500..=599, .. }
        )
    }

    /// Request with exponential-backoff retry for transient failures
    async fn request_with_retry(
        &self,
        method: Method,
        url: &str,
        body: Option<&Value>,
    ) -> std::result::Result<Value, ProviderError> {
        let mut backoff = Duration::from_millis(self.config.initial_backoff_ms);
        let mut last_error = None;

        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                tracing::warn!(
                    url,
                    attempt,
                    max = self.config.max_retries,
                    "provider request failed, retrying in {:?}",
                    backoff
                );
                tokio::time::sleep(backoff).await;
                backoff *= 2;
            }

            match self.execute_request(method.clone(), url, body).await {
                Ok(value) => return Ok(value),
                Err(e) if Self::is_retryable(&e) => last_error = Some(e),
                Err(e) => return Err(e),
            }
        }

        Err(last_error.unwrap_or(ProviderError::Timeout))
    }
}

#[async_trait]
impl VoiceProvider for HttpVoiceProvider {
    async fn fetch_conversation(&self, conversation_id: &str) -> Result<ConversationState> {
        let url = self.api_url(&format!("/conversations/{}", conversation_id));
        let payload = self.request_with_retry(Method::GET, &url, None).await?;
        Ok(parse_conversation_payload(&payload))
    }

    async fn create_call(&self, to_number: &str) -> Result<DispatchedCall> {
        let url = self.api_url("/twilio/outbound-call");
        let body = json!({
            "agent_id": self.config.agent_id,
            "agent_phone_number_id": self.config.phone_number_id,
            "to_number": to_number,
        });
        // Call creation is never retried: a timed-out create may still
        // have gone through, and a duplicate dial would break the
        // single-active-call invariant.
        let payload = self
            .execute_request(Method::POST, &url, Some(&body))
            .await?;

        Ok(DispatchedCall {
            conversation_id: payload
                .get("conversation_id")
                .and_then(Value::as_str)
                .map(String::from),
            call_sid: payload
                .get("callSid")
                .or_else(|| payload.get("call_sid"))
                .and_then(Value::as_str)
                .map(String::from),
        })
    }

    async fn update_agent_prompt(&self, prompt: &str) -> Result<()> {
        let url = self.api_url(&format!("/agents/{}", self.config.agent_id));
        let body = json!({
            "conversation_config": {"agent": {"prompt": {"prompt": prompt}}}
        });
        self.request_with_retry(Method::PATCH, &url, Some(&body)).await?;
        Ok(())
    }

    async fn end_conversation(&self, conversation_id: &str) -> Result<()> {
        let url = self.api_url(&format!("/conversations/{}/end", conversation_id));
        self.execute_request(Method::POST, &url, None).await?;
        Ok(())
    }

    async fn delete_conversation(&self, conversation_id: &str) -> Result<()> {
        let url = self.api_url(&format!("/conversations/{}", conversation_id));
        self.execute_request(Method::DELETE, &url, None).await?;
        Ok(())
    }

    async fn patch_conversation_done(&self, conversation_id: &str) -> Result<()> {
        let url = self.api_url(&format!("/conversations/{}", conversation_id));
        let body = json!({"status": "done"});
        self.execute_request(Method::PATCH, &url, Some(&body)).await?;
        Ok(())
    }

    async fn hangup(&self, conversation_id: &str) -> Result<()> {
        let url = self.api_url(&format!("/conversations/{}/hangup", conversation_id));
        self.execute_request(Method::POST, &url, None).await?;
        Ok(())
    }

    async fn end_carrier_call(&self, call_sid: &str) -> Result<()> {
        let url = self.api_url(&format!("/twilio/calls/{}/end", call_sid));
        self.execute_request(Method::POST, &url, None).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_url_strips_trailing_slash() {
        let config = ProviderConfig {
            base_url: "https://api.example.com/".to_string(),
            ..Default::default()
        };
        let provider = HttpVoiceProvider::new(config).unwrap();
        assert_eq!(
            provider.api_url("/conversations/abc"),
            "https://api.example.com/v1/convai/conversations/abc"
        );
    }

    #[test]
    fn test_retryable_classification() {
        assert!(HttpVoiceProvider::is_retryable(&ProviderError::Timeout));
        assert!(HttpVoiceProvider::is_retryable(&ProviderError::Api {
            status: 503,
            message: String::new()
        }));
        assert!(!HttpVoiceProvider::is_retryable(&ProviderError::Api {
            status: 400,
            message: String::new()
        }));
        assert!(!HttpVoiceProvider::is_retryable(&ProviderError::NotFound("x".into())));
    }
}
