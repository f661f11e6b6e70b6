use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use anyhow::Result;
use thiserror::Error;

use crate::config::{Config, PipelineConfig};
use crate::generator::agents::{Analyst, Orchestrator, Researcher};
use crate::generator::context::GeneratorContext;
use crate::generator::outlet::{ConsoleOutlet, DiskOutlet, Outlet};
use crate::generator::stage_agent::StageAgent;
use crate::generator::types::{
    AnalysisRun, Query, StageError, StageFailure, StageKind, ValidationError,
};
use crate::llm::client::Completion;

/// 时间跟踪作用域
pub struct TimingScope {
    start_time: Instant,
    phase_start_times: HashMap<String, Instant>,
    phase_durations: Vec<(String, Duration)>,
}

impl Default for TimingScope {
    fn default() -> Self {
        Self::new()
    }
}

impl TimingScope {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            phase_start_times: HashMap::new(),
            phase_durations: Vec::new(),
        }
    }

    /// 开始一个新的阶段计时
    pub fn start_phase(&mut self, phase_name: &str) {
        self.phase_start_times
            .insert(phase_name.to_string(), Instant::now());
    }

    /// 结束一个阶段的计时
    pub fn end_phase(&mut self, phase_name: &str) -> Option<Duration> {
        let start_time = self.phase_start_times.remove(phase_name)?;
        let duration = start_time.elapsed();
        self.phase_durations
            .push((phase_name.to_string(), duration));
        Some(duration)
    }

    /// 获取总执行时间
    pub fn get_total_duration(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// 按结束顺序返回各阶段的执行时间
    pub fn get_phase_durations(&self) -> &[(String, Duration)] {
        &self.phase_durations
    }

    /// 获取格式化的执行时间报告
    pub fn generate_timing_report(&self) -> String {
        let mut report = format!(
            "总执行时间: {:.2}秒\n",
            self.get_total_duration().as_secs_f64()
        );

        if !self.phase_durations.is_empty() {
            report.push_str("\n各阶段执行时间:\n");
            for (phase, duration) in &self.phase_durations {
                report.push_str(&format!("- {}: {:.3}秒\n", phase, duration.as_secs_f64()));
            }
        }

        report
    }
}

/// 流水线状态机
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineState {
    Idle,
    Researching,
    Analyzing,
    Synthesizing,
    Complete,
    Failed { stage: StageKind, reason: String },
}

impl PipelineState {
    fn running(stage: StageKind) -> Self {
        match stage {
            StageKind::Research => PipelineState::Researching,
            StageKind::Analysis => PipelineState::Analyzing,
            StageKind::Orchestrator => PipelineState::Synthesizing,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineState::Complete | PipelineState::Failed { .. })
    }
}

/// 进度通知
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressEvent {
    /// 完成通知时为None
    pub stage: Option<StageKind>,
    pub label: String,
    pub percent: u8,
}

/// 取消标记，只在阶段边界生效
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// 处理中断信号：第一次设置取消标记，第二次返回true表示需要立即退出
///
/// `next_signal` 在信号到达时返回 `true`，信号源不可用时返回 `false`。
pub async fn watch_interrupts<F, Fut>(cancel: CancelFlag, mut next_signal: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    if !next_signal().await {
        return false;
    }
    eprintln!("\n⏹️ 收到中断信号，将在当前阶段结束后停止（再按一次 Ctrl-C 立即退出）...");
    tracing::info!("interrupt received, cancelling at next stage boundary");
    cancel.cancel();

    next_signal().await
}

/// 流水线错误
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// 某个阶段失败，已收集的阶段结果保留在run中
    #[error("{failure}")]
    Stage {
        failure: StageFailure,
        run: Box<AnalysisRun>,
    },

    #[error("pipeline runner has already been used, create a new runner for each run")]
    AlreadyStarted,
}

pub const COMPLETE_LABEL: &str = "✅ Multi-Agent Analysis Complete!";

/// 三阶段流水线执行器
pub struct PipelineRunner {
    llm: Arc<dyn Completion>,
    config: PipelineConfig,
    state: PipelineState,
    cancel: CancelFlag,
}

impl PipelineRunner {
    pub fn new(llm: Arc<dyn Completion>, config: PipelineConfig) -> Self {
        Self {
            llm,
            config,
            state: PipelineState::Idle,
            cancel: CancelFlag::new(),
        }
    }

    pub fn from_context(context: &GeneratorContext) -> Self {
        Self::new(context.llm_client.clone(), context.config.pipeline.clone())
    }

    pub fn with_cancel_flag(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn state(&self) -> &PipelineState {
        &self.state
    }

    /// 依次执行 Research -> Analysis -> Orchestrator
    pub async fn run<F>(&mut self, query: &str, mut progress: F) -> Result<AnalysisRun, PipelineError>
    where
        F: FnMut(&ProgressEvent),
    {
        if self.state != PipelineState::Idle {
            return Err(PipelineError::AlreadyStarted);
        }

        let query = Query::parse(query, self.config.max_query_chars)?;
        let mut run = AnalysisRun::new(query, self.llm.model());
        let mut timing = TimingScope::new();
        let percents = self.config.progress_profile.stage_percents();
        let stage_delay = self.config.effective_stage_delay();

        tracing::info!(run_id = %run.id(), model = run.model(), "starting multi-agent analysis");

        let agents: [&dyn StageAgent; 3] = [&Researcher, &Analyst, &Orchestrator];
        for (index, agent) in agents.into_iter().enumerate() {
            let stage = agent.kind();

            // 自我限流
            if index > 0 && !stage_delay.is_zero() {
                tracing::debug!(delay_ms = stage_delay.as_millis() as u64, "waiting between stages");
                tokio::time::sleep(stage_delay).await;
            }

            if self.cancel.is_cancelled() {
                return Err(self.fail(run, stage, StageError::Cancelled));
            }

            self.state = PipelineState::running(stage);
            progress(&ProgressEvent {
                stage: Some(stage),
                label: stage.progress_label().to_string(),
                percent: percents[index],
            });

            timing.start_phase(&stage.to_string());
            let outcome = agent.execute(self.llm.as_ref(), &run, &self.config).await;
            let elapsed = timing.end_phase(&stage.to_string()).unwrap_or_default();

            match outcome {
                Ok(text) => {
                    tracing::info!(
                        run_id = %run.id(),
                        stage = %stage,
                        elapsed_ms = elapsed.as_millis() as u64,
                        chars = text.len(),
                        "stage completed"
                    );
                    run.append(stage, text, elapsed.as_millis() as u64);
                }
                Err(error) => return Err(self.fail(run, stage, error)),
            }
        }

        run.mark_complete();
        self.state = PipelineState::Complete;
        progress(&ProgressEvent {
            stage: None,
            label: COMPLETE_LABEL.to_string(),
            percent: 100,
        });
        tracing::debug!("{}", timing.generate_timing_report());

        Ok(run)
    }

    fn fail(&mut self, mut run: AnalysisRun, stage: StageKind, error: StageError) -> PipelineError {
        let failure = StageFailure { stage, error };
        tracing::warn!(run_id = %run.id(), stage = %stage, error = %failure, "stage failed");

        self.state = PipelineState::Failed {
            stage,
            reason: failure.to_string(),
        };
        run.mark_failed(failure.clone());
        PipelineError::Stage {
            failure,
            run: Box::new(run),
        }
    }
}

/// 启动分析工作流
pub async fn launch(config: &Config, query: &str, cancel: CancelFlag) -> Result<AnalysisRun> {
    let context = GeneratorContext::new(config.clone())?;
    execute(&context, query, cancel).await
}

/// 执行流水线，并把结果输出到终端与磁盘
pub async fn execute(
    context: &GeneratorContext,
    query: &str,
    cancel: CancelFlag,
) -> Result<AnalysisRun> {
    println!("🚀 开始执行 Multi-Agent 分析流程...");

    let mut runner = PipelineRunner::from_context(context).with_cancel_flag(cancel);
    let run = runner
        .run(query, |event| {
            println!("[{:>3}%] {}", event.percent, event.label);
        })
        .await?;

    ConsoleOutlet.save(&run)?;

    let output = &context.config.output;
    if output.export {
        let outlet = DiskOutlet::new(&output.output_path, output.format.report_formats());
        outlet.save(&run)?;
    }

    Ok(run)
}

// Include tests
#[cfg(test)]
mod tests;
