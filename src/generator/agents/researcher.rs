use crate::config::PipelineConfig;
use crate::generator::stage_agent::{DataSource, PromptTemplate, StageAgent};
use crate::generator::types::StageKind;

/// 调研员 - 负责收集与查询相关的事实、数据、观点与趋势
#[derive(Default)]
pub struct Researcher;

impl StageAgent for Researcher {
    fn kind(&self) -> StageKind {
        StageKind::Research
    }

    fn data_sources(&self) -> Vec<DataSource> {
        vec![DataSource::Query]
    }

    fn max_tokens(&self, config: &PipelineConfig) -> u32 {
        config.research_max_tokens
    }

    fn prompt_template(&self) -> PromptTemplate {
        PromptTemplate {
            system_prompt: r#"You are a Senior Research Specialist with broad knowledge across many domains.
Your job is to research the given topic using your knowledge base.

For each query:
1. Give the key facts and current information
2. Include relevant statistics and data points
3. Present multiple perspectives and viewpoints
4. Add the context and background needed to understand the topic
5. Point out recent developments and trends

Organise the response under clear headings. Be thorough but concise and keep to the most relevant information."#
                .to_string(),

            opening_instruction: "Conduct comprehensive research on:".to_string(),

            closing_instruction: "Cover facts, statistics, perspectives and trends.".to_string(),
        }
    }
}
