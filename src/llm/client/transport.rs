//! HTTP传输层

use async_trait::async_trait;
use reqwest::header::RETRY_AFTER;

use crate::config::LLMConfig;
use crate::llm::client::error::LlmError;
use crate::llm::client::types::{ChatRequest, HttpReply};

/// 发送一次chat completion请求并返回原始应答，状态码的解释交给上层
#[async_trait]
pub trait Transport: Send + Sync {
    async fn post(&self, request: &ChatRequest) -> Result<HttpReply, LlmError>;
}

/// 基于reqwest的传输实现
pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl HttpTransport {
    pub fn new(config: &LLMConfig) -> Result<Self, LlmError> {
        let api_key = config.api_key.trim();
        if api_key.is_empty() {
            return Err(LlmError::MissingApiKey);
        }

        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint(),
            api_key: api_key.to_string(),
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post(&self, request: &ChatRequest) -> Result<HttpReply, LlmError> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await?;

        let status = response.status().as_u16();
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.trim().to_string());
        let body = response.text().await?;

        Ok(HttpReply {
            status,
            retry_after,
            body,
        })
    }
}
