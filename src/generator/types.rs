use chrono::{DateTime, Local};
use std::fmt::Display;
use thiserror::Error;
use unicode_general_category::{GeneralCategory, get_general_category};
use uuid::Uuid;

use crate::llm::client::LlmError;

/// 查询校验错误，在发起任何调用之前返回
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Query is empty")]
    Empty,

    #[error("Query too long ({len} characters), please limit to {max} characters")]
    TooLong { len: usize, max: usize },

    #[error("Invalid character {ch:?} in query, please use standard text")]
    NonPrintable { ch: char },
}

/// 经过校验的用户查询
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query(String);

impl Query {
    /// 校验并构造查询：长度与可打印字符按原始输入检查，去掉首尾空格后不能为空
    pub fn parse(raw: &str, max_chars: usize) -> Result<Self, ValidationError> {
        let len = raw.chars().count();
        if len > max_chars {
            return Err(ValidationError::TooLong {
                len,
                max: max_chars,
            });
        }

        if let Some(ch) = raw.chars().find(|ch| !is_printable(*ch)) {
            return Err(ValidationError::NonPrintable { ch });
        }

        let text = raw.trim();
        if text.is_empty() {
            return Err(ValidationError::Empty);
        }

        Ok(Self(text.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for Query {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// 按Unicode通用类别判断：控制、格式、代理、私用、未分配字符和各类分隔符都不可打印，ASCII空格除外
fn is_printable(ch: char) -> bool {
    if ch == ' ' {
        return true;
    }
    !matches!(
        get_general_category(ch),
        GeneralCategory::Control
            | GeneralCategory::Format
            | GeneralCategory::Surrogate
            | GeneralCategory::PrivateUse
            | GeneralCategory::Unassigned
            | GeneralCategory::SpaceSeparator
            | GeneralCategory::LineSeparator
            | GeneralCategory::ParagraphSeparator
    )
}

/// 三个固定阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageKind {
    Research,
    Analysis,
    Orchestrator,
}

impl StageKind {
    pub const ALL: [StageKind; 3] = [
        StageKind::Research,
        StageKind::Analysis,
        StageKind::Orchestrator,
    ];

    /// 阶段序号，从1开始
    pub fn sequence(&self) -> usize {
        match self {
            StageKind::Research => 1,
            StageKind::Analysis => 2,
            StageKind::Orchestrator => 3,
        }
    }

    /// 进度提示文本
    pub fn progress_label(&self) -> &'static str {
        match self {
            StageKind::Research => "🔍 Research Agent analyzing query...",
            StageKind::Analysis => "📊 Analysis Agent processing insights...",
            StageKind::Orchestrator => "🎯 Orchestrator creating executive report...",
        }
    }

    /// 智能体角色名
    pub fn agent_name(&self) -> &'static str {
        match self {
            StageKind::Research => "Research Specialist",
            StageKind::Analysis => "Data Analyst",
            StageKind::Orchestrator => "Executive Orchestrator",
        }
    }

    /// 作为后续阶段输入时在prompt中的小节标题
    pub fn prompt_section_title(&self) -> &'static str {
        match self {
            StageKind::Research => "RESEARCH FINDINGS",
            StageKind::Analysis => "ANALYSIS RESULTS",
            StageKind::Orchestrator => "EXECUTIVE REPORT",
        }
    }

    /// 报告中的章节标题
    pub fn report_heading(&self) -> &'static str {
        match self {
            StageKind::Research => "🔍 RESEARCH FINDINGS",
            StageKind::Analysis => "📊 COMPREHENSIVE ANALYSIS",
            StageKind::Orchestrator => "🎯 EXECUTIVE SYNTHESIS",
        }
    }
}

impl Display for StageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let str = match self {
            StageKind::Research => "Research",
            StageKind::Analysis => "Analysis",
            StageKind::Orchestrator => "Orchestration",
        };
        write!(f, "{}", str)
    }
}

/// 单个阶段失败的原因
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StageError {
    #[error(transparent)]
    Llm(#[from] LlmError),

    /// 模型返回的文本中带有 "Error:" 标记
    #[error("{0}")]
    ErrorMarker(String),

    /// 前置阶段的输出不可用
    #[error("required {0} output is not available")]
    MissingInput(StageKind),

    #[error("cancelled before the stage started")]
    Cancelled,
}

/// 带阶段标记的失败
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{stage} phase failed: {error}")]
pub struct StageFailure {
    pub stage: StageKind,
    pub error: StageError,
}

impl StageFailure {
    pub fn is_rate_limited(&self) -> bool {
        matches!(&self.error, StageError::Llm(e) if e.is_rate_limited())
    }

    /// 接口返回401，通常是API KEY无效
    pub fn is_unauthorized(&self) -> bool {
        matches!(&self.error, StageError::Llm(e) if e.status() == Some(401))
    }
}

/// 单个阶段的输出，产生后不可变
#[derive(Debug, Clone, PartialEq)]
pub struct StageResult {
    stage: StageKind,
    content: String,
    elapsed_ms: u64,
}

impl StageResult {
    pub fn stage(&self) -> StageKind {
        self.stage
    }

    pub fn sequence(&self) -> usize {
        self.stage.sequence()
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed_ms
    }
}

/// 运行状态
#[derive(Debug, Clone, PartialEq)]
pub enum RunStatus {
    InProgress,
    Complete,
    Failed(StageFailure),
}

/// 一次提交对应的分析记录，由调用方持有
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisRun {
    id: Uuid,
    query: Query,
    created_at: DateTime<Local>,
    model: String,
    results: Vec<StageResult>,
    status: RunStatus,
}

impl AnalysisRun {
    pub fn new(query: Query, model: &str) -> Self {
        Self::new_at(query, model, Local::now())
    }

    /// 使用指定创建时间构造
    pub fn new_at(query: Query, model: &str, created_at: DateTime<Local>) -> Self {
        Self {
            id: Uuid::new_v4(),
            query,
            created_at,
            model: model.to_string(),
            results: Vec::new(),
            status: RunStatus::InProgress,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn query(&self) -> &Query {
        &self.query
    }

    pub fn created_at(&self) -> DateTime<Local> {
        self.created_at
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn results(&self) -> &[StageResult] {
        &self.results
    }

    pub fn status(&self) -> &RunStatus {
        &self.status
    }

    pub fn is_complete(&self) -> bool {
        self.status == RunStatus::Complete
    }

    /// 下一个待执行的阶段
    pub fn next_stage(&self) -> Option<StageKind> {
        StageKind::ALL.get(self.results.len()).copied()
    }

    /// 指定阶段的输出文本
    pub fn output(&self, stage: StageKind) -> Option<&str> {
        self.results
            .iter()
            .find(|r| r.stage == stage)
            .map(|r| r.content.as_str())
    }

    /// 所有阶段耗时之和
    pub fn total_elapsed_ms(&self) -> u64 {
        self.results.iter().map(|r| r.elapsed_ms).sum()
    }

    /// 追加阶段结果，只能按阶段顺序追加
    pub(crate) fn append(&mut self, stage: StageKind, content: String, elapsed_ms: u64) {
        debug_assert_eq!(Some(stage), self.next_stage());
        debug_assert_eq!(self.status, RunStatus::InProgress);
        self.results.push(StageResult {
            stage,
            content,
            elapsed_ms,
        });
    }

    pub(crate) fn mark_complete(&mut self) {
        self.status = RunStatus::Complete;
    }

    pub(crate) fn mark_failed(&mut self, failure: StageFailure) {
        self.status = RunStatus::Failed(failure);
    }
}
