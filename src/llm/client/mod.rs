//! LLM客户端 - 提供统一的LLM服务接口

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::config::LLMConfig;

mod error;
mod transport;
pub mod types;

pub use error::LlmError;
pub use transport::{HttpTransport, Transport};
pub use types::{ChatMessage, ChatRequest, ChatResponse, HttpReply};

/// 429之后最多重试的次数
pub const MAX_RATE_LIMIT_RETRIES: u32 = 1;

/// 文本补全能力，流水线只依赖这个接口
#[async_trait]
pub trait Completion: Send + Sync {
    /// 以system/user两条消息发起一次补全，返回第一个choice的文本
    async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        max_tokens: u32,
    ) -> Result<String, LlmError>;

    /// 使用的模型标识，写入报告元数据
    fn model(&self) -> &str;
}

/// LLM客户端
#[derive(Clone)]
pub struct LLMClient {
    config: LLMConfig,
    transport: Arc<dyn Transport>,
}

impl LLMClient {
    /// 创建基于HTTP的LLM客户端
    pub fn new(config: LLMConfig) -> Result<Self, LlmError> {
        let transport = HttpTransport::new(&config)?;
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    /// 使用自定义传输层创建客户端
    pub fn with_transport(config: LLMConfig, transport: Arc<dyn Transport>) -> Self {
        Self { config, transport }
    }

    pub fn config(&self) -> &LLMConfig {
        &self.config
    }

    /// 检查模型连接和功能是否正常
    pub async fn check_connection(&self) -> Result<(), LlmError> {
        println!("🔄 正在检查模型连接...");
        match self
            .complete("You are a helpful assistant.", "Hello", 8)
            .await
        {
            Ok(_) => {
                println!("✅ 模型连接正常");
                Ok(())
            }
            Err(e) => {
                eprintln!("❌ 模型连接失败: {}", e);
                Err(e)
            }
        }
    }
}

#[async_trait]
impl Completion for LLMClient {
    async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        max_tokens: u32,
    ) -> Result<String, LlmError> {
        let request = ChatRequest::new(&self.config, system_prompt, user_prompt, max_tokens);
        let mut rate_limit_retries = 0;

        loop {
            let reply = self.transport.post(&request).await?;
            tracing::debug!(status = reply.status, max_tokens, "chat completion replied");

            match reply.status {
                200 => return parse_completion(&reply.body),
                429 => {
                    let wait_secs = parse_retry_after(
                        reply.retry_after.as_deref(),
                        self.config.default_retry_after_secs,
                    );
                    if rate_limit_retries >= MAX_RATE_LIMIT_RETRIES {
                        return Err(LlmError::RateLimited {
                            retry_after_secs: wait_secs,
                        });
                    }
                    rate_limit_retries += 1;
                    tracing::warn!(
                        wait_secs,
                        attempt = rate_limit_retries,
                        "rate limited by chat completion API, retrying"
                    );
                    tokio::time::sleep(Duration::from_secs(wait_secs)).await;
                }
                status => {
                    return Err(LlmError::Api {
                        status,
                        body: reply.body,
                    });
                }
            }
        }
    }

    fn model(&self) -> &str {
        &self.config.model
    }
}

/// 解析200响应体，取 `choices[0].message.content`
pub fn parse_completion(body: &str) -> Result<String, LlmError> {
    let response: ChatResponse = serde_json::from_str(body)
        .map_err(|e| LlmError::MalformedResponse(format!("{} in body {}", e, body)))?;
    response
        .into_first_content()
        .ok_or_else(|| LlmError::MalformedResponse(body.to_string()))
}

/// `Retry-After` 只接受整数秒，缺失或无法解析时使用默认值
pub fn parse_retry_after(value: Option<&str>, default_secs: u64) -> u64 {
    value
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(default_secs)
}
