//! 디스패치 파이프라인 -- 입력/분류/팬아웃/팬인/출력의 전체 흐름을 관리합니다.
//!
//! # 내부 아키텍처
//! ```text
//!                                   ┌─> RuleWorker ─┐
//! Input -> mpsc -> Classifier ──────┼─> RuleWorker ─┼──> mpsc -> Output
//!                                   └─> RuleWorker ─┘       ^
//!                                   WindowScheduler ────────┘
//! ```
//!
//! 분류된 이벤트는 모든 규칙의 입력 큐에 차례로 전달됩니다 (blocking broadcast).
//! 가장 느린 규칙이 전체 수집 속도를 결정합니다.
//!
//! # 종료 순서
//! 1. 입력 소진 (또는 종료 요청)
//! 2. 윈도우 스케줄러 정지
//! 3. 규칙 입력 큐 닫기, 드레인 태스크 대기 (`close` 호출 포함)
//! 4. 출력 큐 닫기, 출력 태스크 대기

use std::collections::HashSet;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use shoal_core::error::PipelineError;
use shoal_core::metrics as m;
use shoal_core::{Input, Output, Rule, RuleOutput};

use crate::classifier::EventClassifier;
use crate::config::PipelineConfig;
use crate::error::RulePipelineError;
use crate::instance::{DrainReport, RuleInstance, RuleWorker};
use crate::loader::RuleLoader;
use crate::output::ChannelOutput;
use crate::registry::RuleRegistry;
use crate::window::{WindowReport, WindowSchedule, WindowScheduler};

/// 파이프라인 실행 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PipelineState {
    /// 빌드됨, 아직 실행하지 않음
    Initialized,
    /// 실행 중
    Running,
    /// 실행 완료 (재실행 불가)
    Finished,
}

/// 실행 결과 요약
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    /// 입력에서 받은 원시 메시지 수
    pub messages_received: u64,
    /// 분류 실패로 버린 메시지 수
    pub classify_errors: u64,
    /// 모든 규칙에 전달된 이벤트 수
    pub events_broadcast: u64,
    /// 로드/초기화 단계에서 제외된 규칙 수
    pub rules_skipped: u64,
    /// 규칙별 드레인 리포트 (시작 순서)
    pub rules: Vec<DrainReport>,
    /// 윈도우 스케줄별 리포트
    pub windows: Vec<WindowReport>,
    /// 출력이 기록한 레코드 수
    pub records_written: u64,
    /// 출력 실패 사유
    pub output_error: Option<String>,
}

impl RunSummary {
    /// 규칙과 윈도우가 생성한 결과 총합
    pub fn total_emitted(&self) -> u64 {
        self.rules.iter().map(|r| r.emitted).sum::<u64>()
            + self.windows.iter().map(|w| w.emitted).sum::<u64>()
    }
}

/// 규칙 실행 파이프라인
///
/// # 사용 예시
/// ```ignore
/// use shoal_pipeline::{RulePipelineBuilder, input::ChannelInput};
///
/// let (mut pipeline, output_rx) = RulePipelineBuilder::new()
///     .config(config)
///     .input(Box::new(ChannelInput::preloaded(["a", "bb", "c"])))
///     .build()?;
///
/// // 결과 채널은 실행과 동시에 소비해야 합니다
/// let mut output_rx = output_rx.expect("default output");
/// let consumer = tokio::spawn(async move {
///     while let Some(output) = output_rx.recv().await {
///         println!("{output:?}");
///     }
/// });
///
/// let summary = pipeline.run().await?;
/// consumer.await?;
/// ```
///
/// 결과 채널이 가득 차면 출력 큐와 규칙 드레인이 차례로 막히고 결국
/// 브로드캐스트까지 멈춥니다. 수신측을 `run` 이후에 읽으면 결과가 채널 용량을
/// 넘는 순간 실행이 끝나지 않습니다. 수신측을 drop하면 결과는 버려집니다.
pub struct RulePipeline {
    config: PipelineConfig,
    state: PipelineState,
    registry: RuleRegistry,
    classifier: EventClassifier,
    rules: Vec<Box<dyn Rule>>,
    input: Option<Box<dyn Input>>,
    output: Option<Box<dyn Output>>,
    shutdown: CancellationToken,
}

impl RulePipeline {
    /// 현재 상태를 반환합니다.
    pub fn state_name(&self) -> &str {
        match self.state {
            PipelineState::Initialized => "initialized",
            PipelineState::Running => "running",
            PipelineState::Finished => "finished",
        }
    }

    /// 파이프라인 설정
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// 종료 요청 토큰. 취소하면 입력 수신을 멈추고 드레인 단계로 넘어갑니다.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// 입력이 소진될 때까지 파이프라인을 실행합니다.
    ///
    /// 한 번만 실행할 수 있습니다.
    ///
    /// # Errors
    /// - 이미 실행한 경우 ([`PipelineError::AlreadyRan`])
    /// - 입력 초기화 실패, 규칙 디렉토리를 읽을 수 없는 경우 등 시작 단계의 치명적 에러.
    ///   이 경우 어떤 태스크도 생성되지 않습니다.
    pub async fn run(&mut self) -> Result<RunSummary, RulePipelineError> {
        if self.state != PipelineState::Initialized {
            return Err(PipelineError::AlreadyRan.into());
        }
        self.state = PipelineState::Running;

        let result = self.execute().await;
        self.state = PipelineState::Finished;
        metrics::gauge!(m::PIPELINE_RULES_ACTIVE).set(0.0);
        result
    }

    async fn execute(&mut self) -> Result<RunSummary, RulePipelineError> {
        let mut input = self.input.take().ok_or_else(|| RulePipelineError::Config {
            field: "input".to_owned(),
            reason: "input adapter is required".to_owned(),
        })?;
        let output = self.output.take().ok_or_else(|| RulePipelineError::Config {
            field: "output".to_owned(),
            reason: "output adapter is required".to_owned(),
        })?;

        let mut summary = RunSummary::default();

        // 1. 입력 초기화
        input.initialize().await?;
        tracing::info!(input = %input.name(), "input initialized");

        // 2. 규칙 수집 및 초기화
        let instances = self.prepare_rules(&mut summary).await?;
        metrics::gauge!(m::PIPELINE_RULES_ACTIVE).set(instances.len() as f64);
        if instances.is_empty() {
            tracing::warn!("no active rules, events will be classified and dropped");
        }

        // 3. 출력 태스크
        let (out_tx, out_rx) = mpsc::channel::<RuleOutput>(self.config.output_queue_capacity);
        let output_name = output.name().to_owned();
        let output_task = tokio::spawn(output.sink(out_rx));

        // 4. 윈도우 스케줄러
        let mut scheduler = WindowScheduler::new(out_tx.clone());
        for instance in &instances {
            let interval = instance.window_interval();
            scheduler.add(WindowSchedule {
                name: instance.name().to_owned(),
                rule: instance.rule(),
                interval,
            });
        }
        scheduler.start();

        // 5. 규칙 드레인 태스크
        let mut workers: Vec<RuleWorker> = Vec::with_capacity(instances.len());
        for instance in instances {
            workers.push(instance.start(out_tx.clone(), self.config.rule_queue_capacity)?);
        }

        tracing::info!(
            rules = workers.len(),
            windows = scheduler.len(),
            output = %output_name,
            "rule pipeline running"
        );

        // 6. 입력 태스크와 메인 루프
        let (raw_tx, mut raw_rx) = mpsc::channel(self.config.input_queue_capacity);
        let input_name = input.name().to_owned();
        let input_task = tokio::spawn(input.retrieve(raw_tx));

        let mut interrupted = false;
        loop {
            let raw = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => {
                    interrupted = true;
                    break;
                }
                raw = raw_rx.recv() => match raw {
                    Some(raw) => raw,
                    None => break,
                },
            };

            summary.messages_received += 1;
            metrics::counter!(m::PIPELINE_MESSAGES_RECEIVED_TOTAL).increment(1);

            let event = match self.classifier.classify(&raw) {
                Ok(event) => event,
                Err(e) => {
                    summary.classify_errors += 1;
                    metrics::counter!(m::PIPELINE_CLASSIFY_ERRORS_TOTAL).increment(1);
                    tracing::warn!(source = %raw.source, error = %e, "failed to classify message");
                    continue;
                }
            };

            tracing::debug!(event = %event, "broadcasting event");
            for worker in &workers {
                if worker.deliver(event.clone()).await.is_err() {
                    tracing::warn!(rule = %worker.name(), "rule worker stopped, event dropped");
                }
            }
            summary.events_broadcast += 1;
            metrics::counter!(m::PIPELINE_EVENTS_BROADCAST_TOTAL, m::LABEL_EVENT_TYPE => event.event_type().to_owned())
                .increment(1);
        }

        // 7. 입력 종료
        drop(raw_rx);
        if interrupted {
            tracing::info!("shutdown requested, stopping input");
            input_task.abort();
        }
        match input_task.await {
            Ok(Ok(())) => tracing::info!(input = %input_name, "input exhausted"),
            Ok(Err(e)) => {
                tracing::warn!(input = %input_name, error = %e, "input failed, treating as exhausted");
            }
            Err(e) if e.is_cancelled() => {}
            Err(e) => tracing::error!(input = %input_name, error = %e, "input task failed"),
        }

        // 8. 윈도우 정지 후 규칙 드레인
        summary.windows = scheduler.stop().await;

        let handles: Vec<_> = workers.into_iter().map(RuleWorker::shutdown).collect();
        for handle in handles {
            let name = handle.name().to_owned();
            match handle.join().await {
                Ok(report) => summary.rules.push(report),
                Err(e) => tracing::error!(rule = %name, error = %e, "rule drain failed"),
            }
        }

        // 9. 출력 종료
        drop(out_tx);
        match output_task.await {
            Ok(Ok(written)) => summary.records_written = written,
            Ok(Err(e)) => {
                tracing::error!(output = %output_name, error = %e, "output failed");
                summary.output_error = Some(e.to_string());
            }
            Err(e) => {
                tracing::error!(output = %output_name, error = %e, "output task failed");
                summary.output_error = Some(e.to_string());
            }
        }

        tracing::info!(
            messages = summary.messages_received,
            classify_errors = summary.classify_errors,
            broadcast = summary.events_broadcast,
            records = summary.records_written,
            "rule pipeline finished"
        );
        Ok(summary)
    }

    /// 빌더와 규칙 디렉토리에서 규칙을 모아 초기화합니다.
    ///
    /// 이름 중복과 초기화 실패는 건너뜁니다.
    async fn prepare_rules(
        &mut self,
        summary: &mut RunSummary,
    ) -> Result<Vec<RuleInstance>, RulePipelineError> {
        let mut rules = std::mem::take(&mut self.rules);

        if let Some(dir) = &self.config.rule_dir {
            let report = RuleLoader::load_directory(dir, &self.registry).await?;
            summary.rules_skipped += report.skipped.len() as u64;
            rules.extend(report.rules);
        }

        let mut seen = HashSet::new();
        let mut instances = Vec::with_capacity(rules.len());
        for rule in rules {
            let mut instance = RuleInstance::new(rule);

            if !seen.insert(instance.name().to_owned()) {
                summary.rules_skipped += 1;
                metrics::counter!(m::PIPELINE_RULES_SKIPPED_TOTAL).increment(1);
                tracing::warn!(rule = %instance.name(), "duplicate rule name, skipping");
                continue;
            }

            if let Err(e) = instance.initialize() {
                summary.rules_skipped += 1;
                metrics::counter!(m::PIPELINE_RULES_SKIPPED_TOTAL).increment(1);
                tracing::warn!(rule = %instance.name(), error = %e, "rule initialization failed, skipping");
                continue;
            }

            tracing::info!(rule = %instance.name(), "rule activated");
            instances.push(instance);
        }

        Ok(instances)
    }
}

impl std::fmt::Debug for RulePipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RulePipeline")
            .field("state", &self.state)
            .field("config", &self.config)
            .field("rules", &self.rules.len())
            .field("classifier", &self.classifier.matcher_names())
            .finish()
    }
}

/// 규칙 파이프라인 빌더
pub struct RulePipelineBuilder {
    config: PipelineConfig,
    registry: Option<RuleRegistry>,
    classifier: Option<EventClassifier>,
    rules: Vec<Box<dyn Rule>>,
    input: Option<Box<dyn Input>>,
    output: Option<Box<dyn Output>>,
    shutdown: Option<CancellationToken>,
    output_channel_capacity: usize,
}

impl RulePipelineBuilder {
    /// 새 빌더를 생성합니다.
    pub fn new() -> Self {
        Self {
            config: PipelineConfig::default(),
            registry: None,
            classifier: None,
            rules: Vec::new(),
            input: None,
            output: None,
            shutdown: None,
            output_channel_capacity: 1024,
        }
    }

    /// 파이프라인 설정을 지정합니다.
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// 규칙 디렉토리 로딩에 사용할 레지스트리를 지정합니다.
    ///
    /// 지정하지 않으면 내장 규칙 레지스트리를 사용합니다.
    pub fn registry(mut self, registry: RuleRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// 이벤트 분류기를 지정합니다. 기본값은 [`EventClassifier::with_defaults`]입니다.
    pub fn classifier(mut self, classifier: EventClassifier) -> Self {
        self.classifier = Some(classifier);
        self
    }

    /// 규칙을 직접 추가합니다. 규칙 디렉토리의 규칙보다 먼저 시작됩니다.
    pub fn rule(mut self, rule: Box<dyn Rule>) -> Self {
        self.rules.push(rule);
        self
    }

    /// 규칙 여러 개를 직접 추가합니다.
    pub fn rules(mut self, rules: impl IntoIterator<Item = Box<dyn Rule>>) -> Self {
        self.rules.extend(rules);
        self
    }

    /// 입력 어댑터를 지정합니다 (필수).
    pub fn input(mut self, input: Box<dyn Input>) -> Self {
        self.input = Some(input);
        self
    }

    /// 출력 어댑터를 지정합니다.
    ///
    /// 지정하지 않으면 빌더가 [`ChannelOutput`]을 만들고 수신측을 반환합니다.
    /// 반환된 수신측은 [`RulePipeline::run`]과 동시에 소비하거나 drop해야 합니다.
    pub fn output(mut self, output: Box<dyn Output>) -> Self {
        self.output = Some(output);
        self
    }

    /// 외부 종료 토큰을 연결합니다.
    pub fn shutdown_token(mut self, token: CancellationToken) -> Self {
        self.shutdown = Some(token);
        self
    }

    /// 결과 채널 용량을 설정합니다 (출력 어댑터 미지정 시).
    pub fn output_channel_capacity(mut self, capacity: usize) -> Self {
        self.output_channel_capacity = capacity;
        self
    }

    /// 파이프라인을 빌드합니다.
    ///
    /// # Returns
    /// - `RulePipeline`: 파이프라인 인스턴스
    /// - `Option<mpsc::Receiver<RuleOutput>>`: 결과 수신 채널
    ///   (외부 출력 어댑터를 지정한 경우 None)
    pub fn build(
        self,
    ) -> Result<(RulePipeline, Option<mpsc::Receiver<RuleOutput>>), RulePipelineError> {
        self.config.validate()?;

        let input = self.input.ok_or_else(|| RulePipelineError::Config {
            field: "input".to_owned(),
            reason: "input adapter is required".to_owned(),
        })?;

        let (output, output_rx) = match self.output {
            Some(output) => (output, None),
            None => {
                let (output, rx) = ChannelOutput::channel(self.output_channel_capacity);
                (Box::new(output) as Box<dyn Output>, Some(rx))
            }
        };

        let pipeline = RulePipeline {
            config: self.config,
            state: PipelineState::Initialized,
            registry: self.registry.unwrap_or_else(RuleRegistry::with_builtins),
            classifier: self
                .classifier
                .unwrap_or_else(EventClassifier::with_defaults),
            rules: self.rules,
            input: Some(input),
            output: Some(output),
            shutdown: self.shutdown.unwrap_or_default(),
        };

        Ok((pipeline, output_rx))
    }
}

impl Default for RulePipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}
