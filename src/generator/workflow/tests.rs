#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use crate::config::{PipelineConfig, ProgressProfile};
    use crate::generator::types::{RunStatus, StageError, StageKind, ValidationError};
    use crate::generator::workflow::{
        CancelFlag, PipelineError, PipelineRunner, PipelineState, ProgressEvent, TimingScope,
        watch_interrupts,
    };
    use crate::llm::client::{Completion, LlmError};

    #[derive(Debug, Clone)]
    struct RecordedCall {
        system_prompt: String,
        user_prompt: String,
        max_tokens: u32,
    }

    /// 按脚本返回文本的补全后端，脚本耗尽后返回 "stage N output"
    #[derive(Default)]
    struct ScriptedCompletion {
        replies: Mutex<VecDeque<Result<String, LlmError>>>,
        calls: Mutex<Vec<RecordedCall>>,
        cancel_on_call: Option<CancelFlag>,
    }

    impl ScriptedCompletion {
        fn with_replies(replies: Vec<Result<String, LlmError>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
                ..Default::default()
            })
        }

        fn calls(&self) -> Vec<RecordedCall> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Completion for ScriptedCompletion {
        async fn complete(
            &self,
            system_prompt: &str,
            user_prompt: &str,
            max_tokens: u32,
        ) -> Result<String, LlmError> {
            let mut calls = self.calls.lock().unwrap();
            calls.push(RecordedCall {
                system_prompt: system_prompt.to_string(),
                user_prompt: user_prompt.to_string(),
                max_tokens,
            });
            if let Some(cancel) = &self.cancel_on_call {
                cancel.cancel();
            }
            let n = calls.len();
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(format!("stage {} output", n)))
        }

        fn model(&self) -> &str {
            "scripted-model"
        }
    }

    fn fast_config() -> PipelineConfig {
        PipelineConfig {
            stage_delay_ms: 0,
            ..Default::default()
        }
    }

    fn runner(llm: &Arc<ScriptedCompletion>, config: PipelineConfig) -> PipelineRunner {
        PipelineRunner::new(llm.clone(), config)
    }

    #[tokio::test]
    async fn test_successful_run_produces_three_ordered_results() {
        let llm = ScriptedCompletion::with_replies(vec![]);
        let mut runner = runner(&llm, fast_config());

        let run = runner
            .run("What are the key trends in AI for 2025?", |_| {})
            .await
            .unwrap();

        let sequences: Vec<usize> = run.results().iter().map(|r| r.sequence()).collect();
        assert_eq!(sequences, vec![1, 2, 3]);
        assert_eq!(run.results()[0].stage(), StageKind::Research);
        assert_eq!(run.results()[2].content(), "stage 3 output");
        assert_eq!(run.status(), &RunStatus::Complete);
        assert_eq!(run.model(), "scripted-model");
        assert_eq!(runner.state(), &PipelineState::Complete);
        assert!(runner.state().is_terminal());
        assert_eq!(llm.calls().len(), 3);
    }

    #[tokio::test]
    async fn test_outputs_are_threaded_into_later_prompts() {
        let llm = ScriptedCompletion::with_replies(vec![
            Ok("RESEARCH-TEXT about AI adoption".to_string()),
            Ok("ANALYSIS-TEXT with recommendations".to_string()),
            Ok("EXECUTIVE SUMMARY\nAll good.".to_string()),
        ]);
        let mut runner = runner(&llm, fast_config());

        let run = runner
            .run("What are the key trends in AI for 2025?", |_| {})
            .await
            .unwrap();
        assert!(run.is_complete());

        let calls = llm.calls();
        assert!(calls[0].user_prompt.contains("What are the key trends in AI for 2025?"));
        assert!(!calls[0].user_prompt.contains("RESEARCH-TEXT"));

        assert!(calls[1].user_prompt.contains("What are the key trends in AI for 2025?"));
        assert!(calls[1].user_prompt.contains("RESEARCH-TEXT about AI adoption"));

        assert!(calls[2].user_prompt.contains("RESEARCH-TEXT about AI adoption"));
        assert!(calls[2].user_prompt.contains("ANALYSIS-TEXT with recommendations"));
        assert!(calls[2].system_prompt.contains("EXECUTIVE SUMMARY"));
        assert!(calls[2].system_prompt.contains("IMPLEMENTATION ROADMAP"));
    }

    #[tokio::test]
    async fn test_stage_token_budgets_increase() {
        let llm = ScriptedCompletion::with_replies(vec![]);
        let mut runner = runner(&llm, fast_config());
        runner.run("topic", |_| {}).await.unwrap();

        let budgets: Vec<u32> = llm.calls().iter().map(|c| c.max_tokens).collect();
        assert_eq!(budgets, vec![800, 1000, 1200]);
    }

    #[tokio::test]
    async fn test_too_long_query_makes_no_calls() {
        let llm = ScriptedCompletion::with_replies(vec![]);
        let config = PipelineConfig {
            max_query_chars: 20,
            ..fast_config()
        };
        let mut runner = runner(&llm, config);

        let err = runner.run(&"x".repeat(21), |_| {}).await.unwrap_err();

        assert!(matches!(
            err,
            PipelineError::Validation(ValidationError::TooLong { len: 21, max: 20 })
        ));
        assert!(llm.calls().is_empty());
        assert_eq!(runner.state(), &PipelineState::Idle);
    }

    #[tokio::test]
    async fn test_non_printable_query_makes_no_calls() {
        let llm = ScriptedCompletion::with_replies(vec![]);
        let mut runner = runner(&llm, fast_config());

        let err = runner.run("first line\u{0}second", |_| {}).await.unwrap_err();

        assert!(matches!(
            err,
            PipelineError::Validation(ValidationError::NonPrintable { .. })
        ));
        assert!(llm.calls().is_empty());
    }

    #[tokio::test]
    async fn test_empty_query_makes_no_calls() {
        let llm = ScriptedCompletion::with_replies(vec![]);
        let mut runner = runner(&llm, fast_config());

        let err = runner.run("   ", |_| {}).await.unwrap_err();

        assert!(matches!(err, PipelineError::Validation(ValidationError::Empty)));
        assert!(llm.calls().is_empty());
    }

    #[tokio::test]
    async fn test_error_text_in_research_halts_pipeline() {
        let llm = Arc::new(ScriptedCompletion {
            replies: Mutex::new(
                vec![
                    Ok("API Error: 500 - server down".to_string()),
                    Ok("API Error: 500 - server down".to_string()),
                    Ok("API Error: 500 - server down".to_string()),
                ]
                .into(),
            ),
            ..Default::default()
        });
        let mut runner = runner(&llm, fast_config());

        let err = runner.run("topic", |_| {}).await.unwrap_err();

        match err {
            PipelineError::Stage { failure, run } => {
                assert_eq!(failure.stage, StageKind::Research);
                assert!(matches!(failure.error, StageError::ErrorMarker(_)));
                assert_eq!(
                    failure.to_string(),
                    "Research phase failed: API Error: 500 - server down"
                );
                assert!(run.results().is_empty());
                assert_eq!(run.status(), &RunStatus::Failed(failure.clone()));
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(llm.calls().len(), 1);
        assert!(matches!(
            runner.state(),
            PipelineState::Failed {
                stage: StageKind::Research,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_error_text_in_analysis_keeps_research_result() {
        let llm = ScriptedCompletion::with_replies(vec![
            Ok("research body".to_string()),
            Ok("Request Error: connection reset".to_string()),
        ]);
        let mut runner = runner(&llm, fast_config());

        let err = runner.run("topic", |_| {}).await.unwrap_err();

        let PipelineError::Stage { failure, run } = err else {
            panic!("expected a stage failure");
        };
        assert_eq!(failure.stage, StageKind::Analysis);
        assert_eq!(run.results().len(), 1);
        assert_eq!(run.output(StageKind::Research), Some("research body"));
        // synthesis is never attempted
        assert_eq!(llm.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_llm_error_in_synthesis_is_tagged() {
        let llm = ScriptedCompletion::with_replies(vec![
            Ok("research".to_string()),
            Ok("analysis".to_string()),
            Err(LlmError::RateLimited {
                retry_after_secs: 10,
            }),
        ]);
        let mut runner = runner(&llm, fast_config());

        let err = runner.run("topic", |_| {}).await.unwrap_err();

        let PipelineError::Stage { failure, run } = err else {
            panic!("expected a stage failure");
        };
        assert_eq!(failure.stage, StageKind::Orchestrator);
        assert!(failure.is_rate_limited());
        assert!(failure.to_string().starts_with("Orchestration phase failed"));
        assert_eq!(run.results().len(), 2);
    }

    #[tokio::test]
    async fn test_progress_events_weighted_profile() {
        let llm = ScriptedCompletion::with_replies(vec![]);
        let mut runner = runner(&llm, fast_config());
        let mut events: Vec<ProgressEvent> = Vec::new();

        runner
            .run("topic", |event| events.push(event.clone()))
            .await
            .unwrap();

        let percents: Vec<u8> = events.iter().map(|e| e.percent).collect();
        assert_eq!(percents, vec![25, 60, 90, 100]);
        assert_eq!(events[0].stage, Some(StageKind::Research));
        assert_eq!(events[3].stage, None);
    }

    #[tokio::test]
    async fn test_progress_events_even_profile() {
        let llm = ScriptedCompletion::with_replies(vec![]);
        let config = PipelineConfig {
            progress_profile: ProgressProfile::Even,
            ..fast_config()
        };
        let mut runner = runner(&llm, config);
        let mut percents = Vec::new();

        runner
            .run("topic", |event| percents.push(event.percent))
            .await
            .unwrap();

        assert_eq!(percents, vec![25, 50, 75, 100]);
    }

    #[tokio::test]
    async fn test_no_completion_event_on_failure() {
        let llm = ScriptedCompletion::with_replies(vec![Ok("Error: quota".to_string())]);
        let mut runner = runner(&llm, fast_config());
        let mut percents = Vec::new();

        let _ = runner.run("topic", |event| percents.push(event.percent)).await;

        assert_eq!(percents, vec![25]);
    }

    #[tokio::test]
    async fn test_cancel_before_start_makes_no_calls() {
        let llm = ScriptedCompletion::with_replies(vec![]);
        let cancel = CancelFlag::new();
        cancel.cancel();
        let mut runner = runner(&llm, fast_config()).with_cancel_flag(cancel);

        let err = runner.run("topic", |_| {}).await.unwrap_err();

        let PipelineError::Stage { failure, .. } = err else {
            panic!("expected a stage failure");
        };
        assert_eq!(failure.stage, StageKind::Research);
        assert_eq!(failure.error, StageError::Cancelled);
        assert!(llm.calls().is_empty());
    }

    #[tokio::test]
    async fn test_cancel_takes_effect_at_stage_boundary() {
        let cancel = CancelFlag::new();
        let llm = Arc::new(ScriptedCompletion {
            cancel_on_call: Some(cancel.clone()),
            ..Default::default()
        });
        let mut runner = runner(&llm, fast_config()).with_cancel_flag(cancel);

        let err = runner.run("topic", |_| {}).await.unwrap_err();

        let PipelineError::Stage { failure, run } = err else {
            panic!("expected a stage failure");
        };
        // research finishes, analysis never starts
        assert_eq!(failure.stage, StageKind::Analysis);
        assert_eq!(failure.error, StageError::Cancelled);
        assert_eq!(run.results().len(), 1);
        assert_eq!(llm.calls().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fixed_delay_between_stages() {
        let llm = ScriptedCompletion::with_replies(vec![]);
        let config = PipelineConfig {
            stage_delay_ms: 3000,
            ..Default::default()
        };
        let mut runner = runner(&llm, config);

        let started = tokio::time::Instant::now();
        runner.run("topic", |_| {}).await.unwrap();

        // research -> analysis -> synthesis 共两次等待
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(6000));
        assert!(elapsed < Duration::from_millis(9000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rpm_ceiling_raises_delay() {
        let llm = ScriptedCompletion::with_replies(vec![]);
        let config = PipelineConfig {
            stage_delay_ms: 3000,
            requests_per_minute: Some(6),
            ..Default::default()
        };
        let mut runner = runner(&llm, config);

        let started = tokio::time::Instant::now();
        runner.run("topic", |_| {}).await.unwrap();

        assert!(started.elapsed() >= Duration::from_secs(20));
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_delay_after_failed_first_stage() {
        let llm = ScriptedCompletion::with_replies(vec![Ok("Error: nope".to_string())]);
        let config = PipelineConfig {
            stage_delay_ms: 10_000,
            ..Default::default()
        };
        let mut runner = runner(&llm, config);

        let started = tokio::time::Instant::now();
        let _ = runner.run("topic", |_| {}).await;

        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_runner_cannot_be_reused() {
        let llm = ScriptedCompletion::with_replies(vec![]);
        let mut runner = runner(&llm, fast_config());
        runner.run("topic", |_| {}).await.unwrap();

        let err = runner.run("topic", |_| {}).await.unwrap_err();
        assert!(matches!(err, PipelineError::AlreadyStarted));
        assert_eq!(llm.calls().len(), 3);
    }

    #[tokio::test]
    async fn test_concurrent_runs_are_isolated() {
        let llm_a = ScriptedCompletion::with_replies(vec![Ok("alpha research".to_string())]);
        let llm_b = ScriptedCompletion::with_replies(vec![Ok("beta research".to_string())]);
        let mut runner_a = runner(&llm_a, fast_config());
        let mut runner_b = runner(&llm_b, fast_config());

        let (run_a, run_b) = tokio::join!(
            runner_a.run("query a", |_| {}),
            runner_b.run("query b", |_| {})
        );
        let (run_a, run_b) = (run_a.unwrap(), run_b.unwrap());

        assert_eq!(run_a.output(StageKind::Research), Some("alpha research"));
        assert_eq!(run_b.output(StageKind::Research), Some("beta research"));
        assert_ne!(run_a.id(), run_b.id());
    }

    #[test]
    fn test_timing_scope_phases() {
        let mut timing = TimingScope::new();
        timing.start_phase("Research");
        assert!(timing.end_phase("Research").is_some());
        assert!(timing.end_phase("Research").is_none());
        assert!(timing.end_phase("Analysis").is_none());

        assert_eq!(timing.get_phase_durations().len(), 1);
        assert_eq!(timing.get_phase_durations()[0].0, "Research");

        let report = timing.generate_timing_report();
        assert!(report.contains("总执行时间"));
        assert!(report.contains("- Research:"));
    }

    /// 依次返回预设信号结果，耗尽后视为信号源关闭
    fn scripted_signals(signals: Vec<bool>) -> impl FnMut() -> std::future::Ready<bool> {
        let mut signals = VecDeque::from(signals);
        move || std::future::ready(signals.pop_front().unwrap_or(false))
    }

    #[tokio::test]
    async fn test_first_interrupt_cancels_second_requests_exit() {
        let cancel = CancelFlag::new();

        let exit_now = watch_interrupts(cancel.clone(), scripted_signals(vec![true, true])).await;

        assert!(cancel.is_cancelled());
        assert!(exit_now);
    }

    #[tokio::test]
    async fn test_single_interrupt_only_cancels() {
        let cancel = CancelFlag::new();

        let exit_now = watch_interrupts(cancel.clone(), scripted_signals(vec![true])).await;

        assert!(cancel.is_cancelled());
        assert!(!exit_now);
    }

    #[tokio::test]
    async fn test_unavailable_signal_source_does_nothing() {
        let cancel = CancelFlag::new();

        let exit_now = watch_interrupts(cancel.clone(), scripted_signals(vec![false])).await;

        assert!(!cancel.is_cancelled());
        assert!(!exit_now);
    }
}
