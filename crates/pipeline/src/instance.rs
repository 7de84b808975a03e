//! 규칙 인스턴스 -- 규칙 하나의 생명주기와 전용 입력 큐
//!
//! ```text
//! Uninitialized --initialize--> Active --입력 큐 소진 + close--> Closed
//! ```
//!
//! [`RuleInstance::start`]는 전용 입력 큐와 드레인 태스크를 만들고 [`RuleWorker`]를 반환합니다.
//! 드레인 태스크는 입력 큐가 닫히고 비워질 때까지 `process`를 도착 순서대로 호출한 뒤
//! `close`를 정확히 한 번 호출합니다.

use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use shoal_core::error::{PipelineError, RuleError};
use shoal_core::metrics as m;
use shoal_core::{Rule, RuleOutput, TypedEvent};

use crate::error::RulePipelineError;

/// 규칙 인스턴스 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleState {
    /// 로드됨, 아직 초기화하지 않음
    Uninitialized,
    /// 초기화 완료, 이벤트 처리 가능
    Active,
    /// 입력이 소진되고 `close`가 호출됨 (종료 상태)
    Closed,
}

impl RuleState {
    /// 상태 이름
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::Active => "active",
            Self::Closed => "closed",
        }
    }
}

impl std::fmt::Display for RuleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 드레인 태스크 종료 리포트
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DrainReport {
    /// 규칙 이름
    pub name: String,
    /// 처리한 이벤트 수
    pub processed: u64,
    /// 출력 큐로 보낸 결과 수
    pub emitted: u64,
    /// `process` 중 발생한 panic 수
    pub panics: u64,
}

/// 로드된 규칙 하나
pub struct RuleInstance {
    name: String,
    rule: Arc<dyn Rule>,
    state: watch::Sender<RuleState>,
}

impl RuleInstance {
    /// 규칙을 감쌉니다. 상태는 `Uninitialized`입니다.
    pub fn new(rule: Box<dyn Rule>) -> Self {
        let name = rule.name().to_owned();
        let (state, _) = watch::channel(RuleState::Uninitialized);
        Self {
            name,
            rule: Arc::from(rule),
            state,
        }
    }

    /// 규칙 이름
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 현재 상태
    pub fn state(&self) -> RuleState {
        *self.state.borrow()
    }

    /// 윈도우 스케줄러와 공유할 규칙 핸들
    pub fn rule(&self) -> Arc<dyn Rule> {
        Arc::clone(&self.rule)
    }

    /// 규칙의 윈도우 주기. `window_interval`이 panic하면 윈도우 없음으로 취급합니다.
    pub fn window_interval(&self) -> Duration {
        match catch_unwind(AssertUnwindSafe(|| self.rule.window_interval())) {
            Ok(interval) => interval,
            Err(panic) => {
                tracing::warn!(
                    rule = %self.name,
                    panic = %panic_message(panic.as_ref()),
                    "window_interval panicked, treating rule as event-driven only"
                );
                Duration::ZERO
            }
        }
    }

    /// 규칙을 초기화하고 `Active`로 전환합니다.
    ///
    /// # Errors
    /// - `Uninitialized`가 아닌 상태에서 호출한 경우 (두 번째 초기화 포함)
    /// - 규칙의 `initialize`가 에러를 반환하거나 panic한 경우
    pub fn initialize(&mut self) -> Result<(), RulePipelineError> {
        let current = self.state();
        if current != RuleState::Uninitialized {
            return Err(self.invalid_transition(current, RuleState::Active));
        }

        let rule = Arc::get_mut(&mut self.rule).ok_or_else(|| {
            PipelineError::InitFailed(format!(
                "rule '{}' is shared and cannot be initialized",
                self.name
            ))
        })?;

        match catch_unwind(AssertUnwindSafe(|| rule.initialize())) {
            Ok(Ok(())) => {
                self.state.send_replace(RuleState::Active);
                tracing::debug!(rule = %self.name, "rule initialized");
                Ok(())
            }
            Ok(Err(e)) => Err(e.into()),
            Err(panic) => Err(RuleError::Init {
                rule: self.name.clone(),
                reason: format!("panicked: {}", panic_message(panic.as_ref())),
            }
            .into()),
        }
    }

    /// 전용 입력 큐와 드레인 태스크를 생성합니다.
    ///
    /// # Errors
    /// `Active` 상태가 아니면 에러입니다.
    pub fn start(
        self,
        output: mpsc::Sender<RuleOutput>,
        capacity: usize,
    ) -> Result<RuleWorker, RulePipelineError> {
        let current = self.state();
        if current != RuleState::Active {
            return Err(PipelineError::InvalidTransition {
                rule: self.name.clone(),
                from: current.as_str().to_owned(),
                to: "started".to_owned(),
            }
            .into());
        }

        let (input, rx) = mpsc::channel(capacity);
        let state = self.state.subscribe();
        let name = self.name.clone();
        let task = tokio::spawn(drain(self.name, self.rule, self.state, rx, output));

        Ok(RuleWorker {
            name,
            input,
            state,
            task,
        })
    }

    fn invalid_transition(&self, from: RuleState, to: RuleState) -> RulePipelineError {
        PipelineError::InvalidTransition {
            rule: self.name.clone(),
            from: from.as_str().to_owned(),
            to: to.as_str().to_owned(),
        }
        .into()
    }
}

impl std::fmt::Debug for RuleInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuleInstance")
            .field("name", &self.name)
            .field("state", &self.state())
            .finish()
    }
}

/// 시작된 규칙 인스턴스
///
/// 입력 큐 송신측을 보유합니다. [`RuleWorker::shutdown`]으로 입력 큐를 닫으면
/// 드레인 태스크가 남은 이벤트를 처리하고 `close`를 호출한 뒤 종료합니다.
pub struct RuleWorker {
    name: String,
    input: mpsc::Sender<TypedEvent>,
    state: watch::Receiver<RuleState>,
    task: JoinHandle<DrainReport>,
}

impl RuleWorker {
    /// 규칙 이름
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 현재 상태
    pub fn state(&self) -> RuleState {
        *self.state.borrow()
    }

    /// 이벤트를 입력 큐에 넣습니다. 큐가 가득 차면 자리가 날 때까지 기다립니다.
    ///
    /// 드레인 태스크가 이미 종료되었으면 이벤트를 돌려줍니다.
    pub async fn deliver(&self, event: TypedEvent) -> Result<(), TypedEvent> {
        self.input.send(event).await.map_err(|e| e.0)
    }

    /// 입력 큐를 닫습니다. 반환된 핸들로 드레인 완료를 기다립니다.
    pub fn shutdown(self) -> DrainHandle {
        drop(self.input);
        DrainHandle {
            name: self.name,
            state: self.state,
            task: self.task,
        }
    }
}

/// 입력 큐가 닫힌 규칙의 드레인 대기 핸들
pub struct DrainHandle {
    name: String,
    state: watch::Receiver<RuleState>,
    task: JoinHandle<DrainReport>,
}

impl DrainHandle {
    /// 규칙 이름
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 드레인 태스크가 끝날 때까지 기다립니다.
    pub async fn join(self) -> Result<DrainReport, RulePipelineError> {
        let report = self.task.await.map_err(|e| {
            RulePipelineError::Task(format!("rule '{}' drain task failed: {e}", self.name))
        })?;
        debug_assert_eq!(*self.state.borrow(), RuleState::Closed);
        Ok(report)
    }
}

async fn drain(
    name: String,
    rule: Arc<dyn Rule>,
    state: watch::Sender<RuleState>,
    mut rx: mpsc::Receiver<TypedEvent>,
    output: mpsc::Sender<RuleOutput>,
) -> DrainReport {
    let mut report = DrainReport {
        name: name.clone(),
        ..Default::default()
    };
    let mut output = Some(output);

    while let Some(event) = rx.recv().await {
        report.processed += 1;
        metrics::counter!(m::RULE_EVENTS_PROCESSED_TOTAL, m::LABEL_RULE => name.clone())
            .increment(1);

        let started = Instant::now();
        let result = catch_unwind(AssertUnwindSafe(|| rule.process(&event)));
        metrics::histogram!(m::RULE_PROCESS_DURATION_SECONDS, m::LABEL_RULE => name.clone())
            .record(started.elapsed().as_secs_f64());

        match result {
            Ok(Some(out)) => {
                let Some(tx) = output.as_ref() else {
                    continue;
                };
                if tx.send(out).await.is_ok() {
                    report.emitted += 1;
                    metrics::counter!(m::RULE_OUTPUTS_TOTAL, m::LABEL_RULE => name.clone())
                        .increment(1);
                } else {
                    tracing::warn!(
                        rule = %name,
                        "output queue closed, discarding further rule output"
                    );
                    output = None;
                }
            }
            Ok(None) => {}
            Err(panic) => {
                report.panics += 1;
                metrics::counter!(m::RULE_PROCESS_PANICS_TOTAL, m::LABEL_RULE => name.clone())
                    .increment(1);
                tracing::error!(
                    rule = %name,
                    event_id = %event.id(),
                    panic = %panic_message(panic.as_ref()),
                    "rule panicked while processing event"
                );
            }
        }
    }

    if let Err(panic) = catch_unwind(AssertUnwindSafe(|| rule.close())) {
        tracing::error!(
            rule = %name,
            panic = %panic_message(panic.as_ref()),
            "rule panicked in close"
        );
    }
    state.send_replace(RuleState::Closed);
    drop(output);

    tracing::info!(
        rule = %name,
        processed = report.processed,
        emitted = report.emitted,
        panics = report.panics,
        "rule drained and closed"
    );
    report
}

/// panic payload에서 메시지를 추출합니다.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_owned()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic payload".to_owned()
    }
}
