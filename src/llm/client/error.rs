use thiserror::Error;

/// LLM调用错误
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LlmError {
    /// 重试一次后仍被限流
    #[error("Rate limit exceeded after one retry, wait {retry_after_secs}s before trying again")]
    RateLimited { retry_after_secs: u64 },

    /// 非200、非429的响应
    #[error("API Error: {status} - {body}")]
    Api { status: u16, body: String },

    /// 网络错误或超时
    #[error("Request Error: {0}")]
    Transport(String),

    /// 响应结构不符合预期
    #[error("API Response Error: invalid response format - {0}")]
    MalformedResponse(String),

    #[error("API key is not configured")]
    MissingApiKey,
}

impl LlmError {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, LlmError::RateLimited { .. })
    }

    /// 响应状态码（仅Api错误携带）
    pub fn status(&self) -> Option<u16> {
        match self {
            LlmError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        LlmError::Transport(err.to_string())
    }
}
