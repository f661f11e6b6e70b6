use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::generator::types::{AnalysisRun, StageKind};

pub mod docx;
pub mod summary;
pub mod text;

pub use summary::extract_executive_summary;

pub const SYSTEM_LABEL: &str = "Direct LLM Multi-Agent Architecture";
pub const ARCHITECTURE_LABEL: &str = "Research → Analysis → Synthesis";
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const FILENAME_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";
const SLUG_MAX_CHARS: usize = 40;
const SLUG_MAX_WORDS: usize = 6;

/// 报告格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Text,
    Docx,
}

impl ReportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ReportFormat::Text => "txt",
            ReportFormat::Docx => "docx",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            ReportFormat::Text => "text/plain; charset=utf-8",
            ReportFormat::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
        }
    }
}

/// 渲染结果
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedReport {
    pub format: ReportFormat,
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl RenderedReport {
    pub fn mime_type(&self) -> &'static str {
        self.format.mime_type()
    }
}

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("analysis run is not complete, nothing to render")]
    Incomplete,

    #[error("failed to build docx document: {0}")]
    Docx(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// 将已完成的run渲染为指定格式，不修改run
pub fn render(run: &AnalysisRun, format: ReportFormat) -> Result<RenderedReport, ReportError> {
    if !run.is_complete() {
        return Err(ReportError::Incomplete);
    }

    let bytes = match format {
        ReportFormat::Text => text::render_text(run).into_bytes(),
        ReportFormat::Docx => docx::render_docx(run)?,
    };

    Ok(RenderedReport {
        format,
        filename: report_filename(run, format),
        bytes,
    })
}

/// `Multi_Agent_Analysis_<slug>_<YYYYMMDD_HHMMSS>.<ext>`
pub fn report_filename(run: &AnalysisRun, format: ReportFormat) -> String {
    let timestamp = run.created_at().format(FILENAME_TIMESTAMP_FORMAT);
    let slug = query_slug(run.query().as_str());
    if slug.is_empty() {
        format!("Multi_Agent_Analysis_{}.{}", timestamp, format.extension())
    } else {
        format!(
            "Multi_Agent_Analysis_{}_{}.{}",
            slug,
            timestamp,
            format.extension()
        )
    }
}

/// 取查询的前几个单词，转为小写ASCII并以下划线连接
pub fn query_slug(query: &str) -> String {
    let mut slug = String::new();
    let words = query
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|w| !w.is_empty())
        .take(SLUG_MAX_WORDS);

    for word in words {
        let separator = usize::from(!slug.is_empty());
        if slug.len() + separator + word.len() > SLUG_MAX_CHARS {
            break;
        }
        if separator == 1 {
            slug.push('_');
        }
        slug.push_str(&word.to_ascii_lowercase());
    }
    slug
}

pub(crate) fn agent_chain() -> String {
    StageKind::ALL
        .iter()
        .map(|stage| stage.agent_name())
        .collect::<Vec<_>>()
        .join(" → ")
}

pub trait Outlet {
    fn save(&self, run: &AnalysisRun) -> Result<(), ReportError>;
}

/// 将报告写入输出目录
pub struct DiskOutlet {
    output_dir: PathBuf,
    formats: Vec<ReportFormat>,
}

impl DiskOutlet {
    pub fn new(output_dir: &Path, formats: Vec<ReportFormat>) -> Self {
        Self {
            output_dir: output_dir.to_path_buf(),
            formats,
        }
    }

    /// 渲染并写出所有格式，返回写出的文件路径
    pub fn write_reports(&self, run: &AnalysisRun) -> Result<Vec<PathBuf>, ReportError> {
        fs::create_dir_all(&self.output_dir)?;

        let mut written = Vec::with_capacity(self.formats.len());
        for format in &self.formats {
            let report = render(run, *format)?;
            let path = self.output_dir.join(&report.filename);
            fs::write(&path, &report.bytes)?;
            println!("💾 已保存报告: {}", path.display());
            written.push(path);
        }
        Ok(written)
    }
}

impl Outlet for DiskOutlet {
    fn save(&self, run: &AnalysisRun) -> Result<(), ReportError> {
        println!("\n🖊️ 报告存储中...");
        let written = self.write_reports(run)?;
        tracing::info!(
            run_id = %run.id(),
            files = written.len(),
            output_dir = %self.output_dir.display(),
            "reports saved"
        );
        Ok(())
    }
}

/// 在终端打印执行摘要和各阶段输出
pub struct ConsoleOutlet;

impl Outlet for ConsoleOutlet {
    fn save(&self, run: &AnalysisRun) -> Result<(), ReportError> {
        if !run.is_complete() {
            return Err(ReportError::Incomplete);
        }

        println!("\n📋 Multi-Agent Analysis Results");
        println!("\n🎯 Executive Summary");
        let final_report = run.output(StageKind::Orchestrator).unwrap_or_default();
        println!("{}", extract_executive_summary(final_report));

        for result in run.results() {
            println!("\n{}", result.stage().report_heading());
            println!("{}", result.content().trim());
        }
        Ok(())
    }
}
