use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::generator::outlet::ReportFormat;

/// 读取API KEY的环境变量，按顺序优先
pub const API_KEY_ENV_VARS: [&str; 2] = ["TRIAD_API_KEY", "GROQ_API_KEY"];

/// 默认配置文件名
pub const DEFAULT_CONFIG_FILE: &str = "triad.toml";

/// 进度百分比方案
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProgressProfile {
    /// 25/60/90/100
    #[serde(rename = "weighted")]
    #[default]
    Weighted,
    /// 25/50/75/100
    #[serde(rename = "even")]
    Even,
}

impl ProgressProfile {
    /// 各阶段开始时上报的百分比（research, analysis, synthesis）
    pub fn stage_percents(&self) -> [u8; 3] {
        match self {
            ProgressProfile::Weighted => [25, 60, 90],
            ProgressProfile::Even => [25, 50, 75],
        }
    }
}

impl std::fmt::Display for ProgressProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProgressProfile::Weighted => write!(f, "weighted"),
            ProgressProfile::Even => write!(f, "even"),
        }
    }
}

impl std::str::FromStr for ProgressProfile {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "weighted" => Ok(ProgressProfile::Weighted),
            "even" => Ok(ProgressProfile::Even),
            _ => Err(format!("Unknown progress profile: {}", s)),
        }
    }
}

/// 报告导出格式
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    #[serde(rename = "txt")]
    #[default]
    Txt,
    #[serde(rename = "docx")]
    Docx,
    #[serde(rename = "all")]
    All,
}

impl ExportFormat {
    /// 展开为需要渲染的报告格式列表
    pub fn report_formats(&self) -> Vec<ReportFormat> {
        match self {
            ExportFormat::Txt => vec![ReportFormat::Text],
            ExportFormat::Docx => vec![ReportFormat::Docx],
            ExportFormat::All => vec![ReportFormat::Text, ReportFormat::Docx],
        }
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExportFormat::Txt => write!(f, "txt"),
            ExportFormat::Docx => write!(f, "docx"),
            ExportFormat::All => write!(f, "all"),
        }
    }
}

impl std::str::FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "txt" | "text" => Ok(ExportFormat::Txt),
            "docx" | "word" => Ok(ExportFormat::Docx),
            "all" | "both" => Ok(ExportFormat::All),
            _ => Err(format!("Unknown export format: {}", s)),
        }
    }
}

/// 应用程序配置
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    /// LLM服务配置
    pub llm: LLMConfig,

    /// 三阶段流水线配置
    pub pipeline: PipelineConfig,

    /// 报告输出配置
    pub output: OutputConfig,

    /// 是否启用详细日志
    pub verbose: bool,
}

/// LLM服务配置
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct LLMConfig {
    /// LLM API KEY
    pub api_key: String,

    /// LLM API基地址，请求会发往 `{api_base_url}/chat/completions`
    pub api_base_url: String,

    /// 模型标识
    pub model: String,

    /// 温度
    pub temperature: f64,

    /// 超时时间（秒）
    pub timeout_seconds: u64,

    /// 429响应未携带Retry-After时的等待秒数
    pub default_retry_after_secs: u64,
}

/// 三阶段流水线配置
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct PipelineConfig {
    /// 查询最大字符数
    pub max_query_chars: usize,

    /// Research阶段的max_tokens
    pub research_max_tokens: u32,

    /// Analysis阶段的max_tokens
    pub analysis_max_tokens: u32,

    /// Orchestrator阶段的max_tokens
    pub synthesis_max_tokens: u32,

    /// 阶段之间的固定等待时间（毫秒）
    pub stage_delay_ms: u64,

    /// 每分钟请求数上限，设置后阶段间隔不小于 60s / rpm
    pub requests_per_minute: Option<u32>,

    /// 进度百分比方案
    pub progress_profile: ProgressProfile,
}

/// 报告输出配置
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct OutputConfig {
    /// 输出目录
    pub output_path: PathBuf,

    /// 导出格式
    pub format: ExportFormat,

    /// 是否写出报告文件
    pub export: bool,
}

impl Config {
    /// 从文件加载配置
    pub fn from_file(path: &Path) -> Result<Self> {
        let mut file =
            File::open(path).context(format!("Failed to open config file: {:?}", path))?;
        let mut content = String::new();
        file.read_to_string(&mut content)
            .context("Failed to read config file")?;

        let config: Config = toml::from_str(&content).context("Failed to parse config file")?;
        Ok(config)
    }
}

impl LLMConfig {
    /// chat completion 接口地址
    pub fn endpoint(&self) -> String {
        format!(
            "{}/chat/completions",
            self.api_base_url.trim_end_matches('/')
        )
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl PipelineConfig {
    /// 实际的阶段间隔：固定间隔与每分钟请求上限换算出的间隔取较大者
    pub fn effective_stage_delay(&self) -> Duration {
        let rpm_floor_ms = match self.requests_per_minute {
            Some(rpm) if rpm > 0 => 60_000 / u64::from(rpm),
            _ => 0,
        };
        Duration::from_millis(self.stage_delay_ms.max(rpm_floor_ms))
    }
}

/// 从环境变量读取API KEY
pub fn api_key_from_env() -> Option<String> {
    API_KEY_ENV_VARS
        .iter()
        .filter_map(|name| std::env::var(name).ok())
        .map(|key| key.trim().to_string())
        .find(|key| !key.is_empty())
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            api_key: api_key_from_env().unwrap_or_default(),
            api_base_url: String::from("https://api.groq.com/openai/v1"),
            model: String::from("llama-3.1-8b-instant"),
            temperature: 0.1,
            timeout_seconds: 60,
            default_retry_after_secs: 10,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_query_chars: 2000,
            research_max_tokens: 800,
            analysis_max_tokens: 1000,
            synthesis_max_tokens: 1200,
            stage_delay_ms: 3000,
            requests_per_minute: None,
            progress_profile: ProgressProfile::default(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            output_path: PathBuf::from("./triad.reports"),
            format: ExportFormat::default(),
            export: true,
        }
    }
}
