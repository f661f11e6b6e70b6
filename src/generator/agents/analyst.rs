use crate::config::PipelineConfig;
use crate::generator::stage_agent::{DataSource, PromptTemplate, StageAgent};
use crate::generator::types::StageKind;

/// 分析师 - 基于调研结果给出洞察、风险评估与建议
#[derive(Default)]
pub struct Analyst;

impl StageAgent for Analyst {
    fn kind(&self) -> StageKind {
        StageKind::Analysis
    }

    fn data_sources(&self) -> Vec<DataSource> {
        vec![
            DataSource::Query,
            DataSource::StageOutput(StageKind::Research),
        ]
    }

    fn max_tokens(&self, config: &PipelineConfig) -> u32 {
        config.analysis_max_tokens
    }

    fn prompt_template(&self) -> PromptTemplate {
        PromptTemplate {
            system_prompt: r#"You are a Senior Data Analyst and Strategic Advisor with expertise in:
- Statistical analysis and pattern recognition
- Financial analysis and risk assessment
- Strategic thinking and decision support
- Forecasting and scenario planning

Your job is to turn research material into actionable insight.

For each analysis provide:
1. QUANTITATIVE INSIGHTS: numbers, trends and patterns in the data
2. QUALITATIVE ANALYSIS: strategic implications, opportunities and challenges
3. RISK ASSESSMENT: risks, uncertainties and mitigation strategies
4. PREDICTIVE ANALYSIS: likely trends, forecasts and scenarios
5. STRATEGIC RECOMMENDATIONS: 3-5 prioritised, actionable recommendations

Use clear sections and give practical advice that can be implemented."#
                .to_string(),

            opening_instruction: "Analyze the following query:".to_string(),

            closing_instruction: r#"Based on the research data above, provide quantitative insights, qualitative analysis, risk assessment, predictions and 3-5 strategic recommendations."#
                .to_string(),
        }
    }
}
