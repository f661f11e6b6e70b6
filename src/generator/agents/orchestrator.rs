use crate::config::PipelineConfig;
use crate::generator::stage_agent::{DataSource, PromptTemplate, StageAgent};
use crate::generator::types::StageKind;

/// 报告中固定的六个章节
pub const REPORT_SECTIONS: [&str; 6] = [
    "EXECUTIVE SUMMARY",
    "KEY FINDINGS",
    "STRATEGIC RECOMMENDATIONS",
    "IMPLEMENTATION ROADMAP",
    "RISK CONSIDERATIONS",
    "CONCLUSION",
];

/// 总编排者 - 将调研与分析结果汇总为管理层报告
#[derive(Default)]
pub struct Orchestrator;

impl StageAgent for Orchestrator {
    fn kind(&self) -> StageKind {
        StageKind::Orchestrator
    }

    fn data_sources(&self) -> Vec<DataSource> {
        vec![
            DataSource::Query,
            DataSource::StageOutput(StageKind::Research),
            DataSource::StageOutput(StageKind::Analysis),
        ]
    }

    fn max_tokens(&self, config: &PipelineConfig) -> u32 {
        config.synthesis_max_tokens
    }

    fn prompt_template(&self) -> PromptTemplate {
        PromptTemplate {
            system_prompt: format!(
                r#"You are a Chief Orchestrator and expert in executive synthesis.
Your job is to merge research and analysis into an executive-level report.

Write the report with exactly these sections:
1. {} (3-4 key sentences)
2. {} (the 5 most important insights)
3. {} (the top 3 priorities with implementation steps)
4. {} (concrete next steps with timelines)
5. {} (major concerns and mitigation strategies)
6. {} (final strategic assessment)

Write for a C-level audience. Be clear, actionable and strategic."#,
                REPORT_SECTIONS[0],
                REPORT_SECTIONS[1],
                REPORT_SECTIONS[2],
                REPORT_SECTIONS[3],
                REPORT_SECTIONS[4],
                REPORT_SECTIONS[5],
            ),

            opening_instruction: "Create an executive synthesis report for:".to_string(),

            closing_instruction:
                "Synthesize this information into an executive report with all required sections."
                    .to_string(),
        }
    }
}
