use async_trait::async_trait;

use crate::config::PipelineConfig;
use crate::generator::types::{AnalysisRun, StageError, StageKind};
use crate::llm::client::Completion;

/// 模型输出中出现该标记即视为阶段失败
pub const ERROR_MARKER: &str = "Error:";

/// 数据源配置 - 声明阶段prompt需要的输入
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSource {
    /// 用户查询
    Query,
    /// 前置阶段的输出
    StageOutput(StageKind),
}

/// Prompt模板配置
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    /// 系统提示词
    pub system_prompt: String,
    /// 开头的说明性指令，后接查询文本
    pub opening_instruction: String,
    /// 结尾的强调性指令
    pub closing_instruction: String,
}

/// 标准的阶段Prompt构建器
pub struct StagePromptBuilder {
    template: PromptTemplate,
}

impl StagePromptBuilder {
    pub fn new(template: PromptTemplate) -> Self {
        Self { template }
    }

    /// 构建system与user两段prompt
    pub fn build_prompts(
        &self,
        run: &AnalysisRun,
        data_sources: &[DataSource],
    ) -> Result<(String, String), StageError> {
        let system_prompt = self.template.system_prompt.clone();
        let user_prompt = self.build_user_prompt(run, data_sources)?;
        Ok((system_prompt, user_prompt))
    }

    fn build_user_prompt(
        &self,
        run: &AnalysisRun,
        data_sources: &[DataSource],
    ) -> Result<String, StageError> {
        let mut prompt = String::new();
        prompt.push_str(&self.template.opening_instruction);

        for source in data_sources {
            match source {
                DataSource::Query => {
                    prompt.push_str(&format!(" '{}'\n\n", run.query()));
                }
                DataSource::StageOutput(stage) => {
                    let output = run
                        .output(*stage)
                        .ok_or(StageError::MissingInput(*stage))?;
                    prompt.push_str(&format!(
                        "{}:\n{}\n\n",
                        stage.prompt_section_title(),
                        output.trim()
                    ));
                }
            }
        }

        prompt.push_str(&self.template.closing_instruction);
        Ok(prompt)
    }
}

/// 阶段智能体 - 固定的系统提示词与用户提示词模板的组合
#[async_trait]
pub trait StageAgent: Send + Sync {
    /// 对应的阶段
    fn kind(&self) -> StageKind;

    /// 数据源配置，按出现在prompt中的顺序
    fn data_sources(&self) -> Vec<DataSource>;

    /// Prompt模板配置
    fn prompt_template(&self) -> PromptTemplate;

    /// 本阶段的max_tokens预算
    fn max_tokens(&self, config: &PipelineConfig) -> u32;

    /// 默认实现：构建prompt，调用一次模型，检查错误标记
    async fn execute(
        &self,
        llm: &dyn Completion,
        run: &AnalysisRun,
        config: &PipelineConfig,
    ) -> Result<String, StageError> {
        let builder = StagePromptBuilder::new(self.prompt_template());
        let (system_prompt, user_prompt) = builder.build_prompts(run, &self.data_sources())?;

        let text = llm
            .complete(&system_prompt, &user_prompt, self.max_tokens(config))
            .await?;

        if text.contains(ERROR_MARKER) {
            return Err(StageError::ErrorMarker(text));
        }
        Ok(text)
    }
}
