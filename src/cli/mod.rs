use crate::config::{Config, DEFAULT_CONFIG_FILE, ExportFormat, ProgressProfile};
use anyhow::{Context, Result, bail};
use clap::Parser;
use std::path::PathBuf;

/// Triad Analyst - Research → Analysis → Synthesis 三阶段多智能体分析引擎
#[derive(Parser, Debug)]
#[command(name = "triad-analyst")]
#[command(
    about = "Multi-agent analysis engine. A research agent, an analysis agent and an executive orchestrator are chained over a chat-completion API to turn a question into an executive report."
)]
#[command(version)]
pub struct Args {
    /// 需要分析的问题
    pub query: Option<String>,

    /// 配置文件路径
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// 报告输出目录
    #[arg(short, long)]
    pub output_path: Option<PathBuf>,

    /// 导出格式 (txt, docx, all)
    #[arg(short, long)]
    pub format: Option<String>,

    /// 不写出报告文件
    #[arg(long)]
    pub no_export: bool,

    /// LLM API KEY
    #[arg(long)]
    pub api_key: Option<String>,

    /// LLM API基地址
    #[arg(long)]
    pub api_base_url: Option<String>,

    /// 模型标识
    #[arg(long)]
    pub model: Option<String>,

    /// 温度参数
    #[arg(long)]
    pub temperature: Option<f64>,

    /// 请求超时（秒）
    #[arg(long)]
    pub timeout_seconds: Option<u64>,

    /// 阶段之间的等待时间（毫秒）
    #[arg(long)]
    pub stage_delay_ms: Option<u64>,

    /// 每分钟请求数上限
    #[arg(long)]
    pub requests_per_minute: Option<u32>,

    /// 查询最大字符数
    #[arg(long)]
    pub max_query_chars: Option<usize>,

    /// 进度百分比方案 (weighted, even)
    #[arg(long)]
    pub progress_profile: Option<String>,

    /// 是否启用详细日志
    #[arg(short, long)]
    pub verbose: bool,

    /// 只检查模型连接
    #[arg(long)]
    pub check_connection: bool,
}

impl Args {
    /// 将CLI参数转换为配置
    pub fn into_config(self) -> Result<Config> {
        let mut config = match &self.config {
            // 显式指定的配置文件必须可读
            Some(config_path) => Config::from_file(config_path)
                .with_context(|| format!("无法读取配置文件 {:?}", config_path))?,
            None => {
                let default_config_path = std::env::current_dir()
                    .unwrap_or_else(|_| PathBuf::from("."))
                    .join(DEFAULT_CONFIG_FILE);

                if default_config_path.exists() {
                    Config::from_file(&default_config_path).with_context(|| {
                        format!("无法读取默认配置文件 {:?}", default_config_path)
                    })?
                } else {
                    Config::default()
                }
            }
        };

        // 覆盖LLM配置
        if let Some(api_key) = self.api_key {
            config.llm.api_key = api_key;
        }
        if let Some(api_base_url) = self.api_base_url {
            config.llm.api_base_url = api_base_url;
        }
        if let Some(model) = self.model {
            config.llm.model = model;
        }
        if let Some(temperature) = self.temperature {
            config.llm.temperature = temperature;
        }
        if let Some(timeout_seconds) = self.timeout_seconds {
            config.llm.timeout_seconds = timeout_seconds;
        }

        // 覆盖流水线配置
        if let Some(stage_delay_ms) = self.stage_delay_ms {
            config.pipeline.stage_delay_ms = stage_delay_ms;
        }
        if let Some(rpm) = self.requests_per_minute {
            config.pipeline.requests_per_minute = Some(rpm);
        }
        if let Some(max_query_chars) = self.max_query_chars {
            config.pipeline.max_query_chars = max_query_chars;
        }
        if let Some(profile_str) = self.progress_profile {
            match profile_str.parse::<ProgressProfile>() {
                Ok(profile) => config.pipeline.progress_profile = profile,
                Err(e) => bail!(e),
            }
        }

        // 输出配置
        if let Some(output_path) = self.output_path {
            config.output.output_path = output_path;
        }
        if let Some(format_str) = self.format {
            match format_str.parse::<ExportFormat>() {
                Ok(format) => config.output.format = format,
                Err(e) => bail!(e),
            }
        }
        if self.no_export {
            config.output.export = false;
        }

        if self.verbose {
            config.verbose = true;
        }

        Ok(config)
    }
}
