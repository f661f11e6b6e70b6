use std::sync::Arc;

use anyhow::Result;

use crate::{
    config::Config,
    llm::client::{Completion, LLMClient},
};

#[derive(Clone)]
pub struct GeneratorContext {
    /// LLM调用器，用于与AI通信
    pub llm_client: Arc<dyn Completion>,
    /// 配置
    pub config: Config,
}

impl GeneratorContext {
    /// 创建基于HTTP客户端的生成器上下文
    pub fn new(config: Config) -> Result<Self> {
        let llm_client = LLMClient::new(config.llm.clone())?;
        Ok(Self::with_completion(config, Arc::new(llm_client)))
    }

    /// 使用自定义补全后端创建上下文
    pub fn with_completion(config: Config, llm_client: Arc<dyn Completion>) -> Self {
        Self { llm_client, config }
    }
}
