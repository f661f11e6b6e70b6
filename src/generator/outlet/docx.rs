//! Word (.docx) 报告

use docx_rs::{AlignmentType, Docx, Paragraph, Run, Style, StyleType};
use std::io::Cursor;

use crate::generator::outlet::summary::extract_executive_summary;
use crate::generator::outlet::{
    ARCHITECTURE_LABEL, ReportError, SYSTEM_LABEL, TIMESTAMP_FORMAT, agent_chain,
};
use crate::generator::types::{AnalysisRun, StageKind};

const STYLE_TITLE: &str = "TriadTitle";
const STYLE_HEADING: &str = "TriadHeading1";
const STYLE_SUBHEADING: &str = "TriadHeading2";
const STYLE_CALLOUT: &str = "TriadCallout";
const STYLE_FOOTER: &str = "TriadFooter";

const ACCENT_COLOR: &str = "1F497D";

/// 渲染Word报告
pub fn render_docx(run: &AnalysisRun) -> Result<Vec<u8>, ReportError> {
    let mut docx = with_styles(Docx::new());

    docx = docx.add_paragraph(
        Paragraph::new()
            .style(STYLE_TITLE)
            .align(AlignmentType::Center)
            .add_run(Run::new().add_text("Multi-Agent AI Analysis Report")),
    );

    let generated = run.created_at().format(TIMESTAMP_FORMAT).to_string();
    let query = run.query().to_string();
    let agents = agent_chain();
    for (label, value) in [
        ("Query", query.as_str()),
        ("Generated", generated.as_str()),
        ("Model", run.model()),
        ("Agents", agents.as_str()),
    ] {
        docx = docx.add_paragraph(metadata_paragraph(label, value));
    }

    // 执行摘要
    let final_report = run.output(StageKind::Orchestrator).unwrap_or_default();
    docx = docx.add_paragraph(heading(STYLE_HEADING, "Executive Summary"));
    for line in extract_executive_summary(final_report).lines() {
        docx = docx.add_paragraph(
            Paragraph::new()
                .style(STYLE_CALLOUT)
                .add_run(Run::new().add_text(line).italic()),
        );
    }

    for stage in StageKind::ALL {
        docx = docx.add_paragraph(heading(
            STYLE_HEADING,
            &format!("{} ({})", stage.prompt_section_title(), stage.agent_name()),
        ));
        docx = add_body(docx, run.output(stage).unwrap_or_default());
    }

    docx = docx
        .add_paragraph(heading(STYLE_SUBHEADING, "System Metadata"))
        .add_paragraph(footer_paragraph(&format!("System: {}", SYSTEM_LABEL)))
        .add_paragraph(footer_paragraph(&format!(
            "Architecture: {}",
            ARCHITECTURE_LABEL
        )))
        .add_paragraph(footer_paragraph(&format!(
            "Processing time: {:.1}s",
            run.total_elapsed_ms() as f64 / 1000.0
        )))
        .add_paragraph(footer_paragraph(&format!("Run: {}", run.id())));

    let mut buffer = Cursor::new(Vec::new());
    docx.build()
        .pack(&mut buffer)
        .map_err(|e| ReportError::Docx(e.to_string()))?;
    Ok(buffer.into_inner())
}

fn with_styles(docx: Docx) -> Docx {
    docx.add_style(
        Style::new(STYLE_TITLE, StyleType::Paragraph)
            .name("Report Title")
            .size(40)
            .bold()
            .color(ACCENT_COLOR),
    )
    .add_style(
        Style::new(STYLE_HEADING, StyleType::Paragraph)
            .name("Report Heading 1")
            .size(30)
            .bold()
            .color(ACCENT_COLOR),
    )
    .add_style(
        Style::new(STYLE_SUBHEADING, StyleType::Paragraph)
            .name("Report Heading 2")
            .size(24)
            .bold(),
    )
    .add_style(
        Style::new(STYLE_CALLOUT, StyleType::Paragraph)
            .name("Report Callout")
            .italic()
            .color(ACCENT_COLOR),
    )
    .add_style(
        Style::new(STYLE_FOOTER, StyleType::Paragraph)
            .name("Report Footer")
            .size(18)
            .color("666666"),
    )
}

fn heading(style: &str, text: &str) -> Paragraph {
    Paragraph::new()
        .style(style)
        .add_run(Run::new().add_text(text))
}

fn metadata_paragraph(label: &str, value: &str) -> Paragraph {
    Paragraph::new()
        .add_run(Run::new().add_text(format!("{}: ", label)).bold())
        .add_run(Run::new().add_text(value))
}

fn footer_paragraph(text: &str) -> Paragraph {
    Paragraph::new()
        .style(STYLE_FOOTER)
        .add_run(Run::new().add_text(text))
}

/// 模型输出按行写入，markdown标题行转为小标题
fn add_body(mut docx: Docx, body: &str) -> Docx {
    for line in body.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let text = trimmed.replace("**", "");
        let paragraph = if trimmed.starts_with('#') {
            heading(STYLE_SUBHEADING, text.trim_start_matches('#').trim())
        } else {
            Paragraph::new().add_run(Run::new().add_text(text))
        };
        docx = docx.add_paragraph(paragraph);
    }
    docx
}
