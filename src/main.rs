use std::io::{self, BufRead, IsTerminal, Write};

use anyhow::{Result, bail};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use triad_analyst::cli::Args;
use triad_analyst::config::{Config, api_key_from_env};
use triad_analyst::generator::workflow::{CancelFlag, PipelineError, launch, watch_interrupts};
use triad_analyst::llm::client::LLMClient;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let query = args.query.clone();
    let check_connection = args.check_connection;
    let mut config = args.into_config()?;

    init_tracing(config.verbose);
    resolve_api_key(&mut config)?;

    if check_connection {
        let client = LLMClient::new(config.llm.clone())?;
        client.check_connection().await?;
        return Ok(());
    }

    let Some(query) = query else {
        bail!("请提供需要分析的问题，例如: triad-analyst \"What are the key trends in AI for 2025?\"");
    };

    let cancel = CancelFlag::new();
    let signal_flag = cancel.clone();
    tokio::spawn(async move {
        // 第二次中断不再等待进行中的请求
        if watch_interrupts(signal_flag, || async { tokio::signal::ctrl_c().await.is_ok() }).await {
            eprintln!("\n⏹️ 立即退出");
            std::process::exit(130);
        }
    });

    match launch(&config, &query, cancel).await {
        Ok(_) => Ok(()),
        Err(err) => {
            print_failure_hint(&err);
            Err(err)
        }
    }
}

/// RUST_LOG优先，否则按verbose选择级别
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .try_init();
}

/// 参数/配置文件 -> 环境变量 -> 终端交互输入
fn resolve_api_key(config: &mut Config) -> Result<()> {
    if !config.llm.api_key.trim().is_empty() {
        return Ok(());
    }
    if let Some(key) = api_key_from_env() {
        config.llm.api_key = key;
        return Ok(());
    }
    if !io::stdin().is_terminal() {
        bail!("缺少API KEY，请通过 --api-key、配置文件或 TRIAD_API_KEY/GROQ_API_KEY 环境变量提供");
    }

    print!("🔑 请输入API KEY: ");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    let key = line.trim();
    if key.is_empty() {
        bail!("未输入API KEY");
    }
    config.llm.api_key = key.to_string();
    Ok(())
}

fn print_failure_hint(err: &anyhow::Error) {
    let Some(PipelineError::Stage { failure, .. }) = err.downcast_ref::<PipelineError>() else {
        return;
    };

    if failure.is_rate_limited() {
        eprintln!("💡 已触发速率限制，请等待约30秒后重试");
    } else if failure.is_unauthorized() {
        eprintln!("💡 API KEY可能无效，请检查后重试");
    } else {
        eprintln!("💡 请稍后重试，或使用 --check-connection 检查网络与模型连接");
    }
}
