//! 纯文本报告

use crate::generator::outlet::{ARCHITECTURE_LABEL, SYSTEM_LABEL, TIMESTAMP_FORMAT, agent_chain};
use crate::generator::types::{AnalysisRun, StageKind};

const RULE: &str = "═══════════════════════════════════════════════════════════════════════════════";

/// 渲染纯文本报告，所有时间都取自run本身
pub fn render_text(run: &AnalysisRun) -> String {
    let mut report = String::new();

    push_heading(&mut report, "MULTI-AGENT AI ANALYSIS REPORT");
    report.push_str(&format!("Query: {}\n", run.query()));
    report.push_str(&format!(
        "Generated: {}\n",
        run.created_at().format(TIMESTAMP_FORMAT)
    ));
    report.push_str(&format!("Model: {}\n", run.model()));
    report.push_str(&format!("System: {}\n", SYSTEM_LABEL));
    report.push_str(&format!("Agents: {}\n\n", agent_chain()));

    for stage in StageKind::ALL {
        push_heading(&mut report, stage.report_heading());
        report.push_str(run.output(stage).unwrap_or_default().trim());
        report.push_str("\n\n");
    }

    report.push_str(RULE);
    report.push('\n');
    report.push_str("Report generated by the Multi-Agent AI Analysis System\n");
    report.push_str(&format!(
        "Architecture: {} | Processing time: {:.1}s\n",
        ARCHITECTURE_LABEL,
        run.total_elapsed_ms() as f64 / 1000.0
    ));
    report.push_str(RULE);
    report.push('\n');

    report
}

fn push_heading(report: &mut String, title: &str) {
    report.push_str(title);
    report.push('\n');
    report.push_str(&"=".repeat(title.chars().count()));
    report.push_str("\n\n");
}
