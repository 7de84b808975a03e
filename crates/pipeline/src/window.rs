//! 윈도우 스케줄러 -- 주기를 선언한 규칙마다 독립 타이머 태스크를 실행합니다.
//!
//! 각 스케줄은 첫 주기가 지난 뒤부터 매 주기마다 `window_flush`를 호출하고
//! 결과를 공유 출력 큐로 보냅니다. 밀린 틱은 건너뜁니다.
//! 플러시 실패나 panic은 로그와 카운트만 남기고 다음 틱에서 계속합니다.
//!
//! [`WindowScheduler::stop`]은 모든 타이머를 취소하고 태스크 종료를 기다립니다.
//! 취소는 틱 사이에서만 확인하므로 이미 반환된 플러시 결과는 모두 출력 큐로
//! 전달된 뒤에 태스크가 끝납니다. 따라서 `stop` 동안 출력 큐를 소비하는 쪽이
//! 살아 있어야 합니다.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use shoal_core::metrics as m;
use shoal_core::{Rule, RuleOutput};

use crate::instance::panic_message;

/// 규칙 하나의 윈도우 스케줄
pub struct WindowSchedule {
    /// 규칙 이름
    pub name: String,
    /// 규칙 핸들 (드레인 태스크와 공유)
    pub rule: Arc<dyn Rule>,
    /// 플러시 주기
    pub interval: Duration,
}

impl std::fmt::Debug for WindowSchedule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WindowSchedule")
            .field("name", &self.name)
            .field("interval", &self.interval)
            .finish()
    }
}

/// 스케줄 종료 리포트
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WindowReport {
    /// 규칙 이름
    pub name: String,
    /// `window_flush` 호출 수
    pub ticks: u64,
    /// 실패(에러 또는 panic)한 플러시 수
    pub errors: u64,
    /// 출력 큐로 보낸 결과 수
    pub emitted: u64,
}

/// 윈도우 스케줄러
pub struct WindowScheduler {
    output: mpsc::Sender<RuleOutput>,
    pending: Vec<WindowSchedule>,
    tasks: Vec<(String, JoinHandle<WindowReport>)>,
    cancel: CancellationToken,
}

impl WindowScheduler {
    /// 결과를 보낼 출력 큐로 스케줄러를 생성합니다.
    pub fn new(output: mpsc::Sender<RuleOutput>) -> Self {
        Self {
            output,
            pending: Vec::new(),
            tasks: Vec::new(),
            cancel: CancellationToken::new(),
        }
    }

    /// 스케줄을 등록합니다. 주기가 0이면 등록하지 않고 `false`를 반환합니다.
    pub fn add(&mut self, schedule: WindowSchedule) -> bool {
        if schedule.interval.is_zero() {
            return false;
        }
        tracing::debug!(
            rule = %schedule.name,
            interval_ms = schedule.interval.as_millis() as u64,
            "registered window schedule"
        );
        self.pending.push(schedule);
        true
    }

    /// 등록된 스케줄 수 (시작 전후 모두 포함)
    pub fn len(&self) -> usize {
        self.pending.len() + self.tasks.len()
    }

    /// 등록된 스케줄이 없는지 확인합니다.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 등록된 스케줄마다 타이머 태스크를 시작합니다.
    ///
    /// 첫 플러시는 호출 시점부터 한 주기 뒤입니다.
    pub fn start(&mut self) {
        let now = Instant::now();
        for schedule in self.pending.drain(..) {
            let name = schedule.name.clone();
            let first_tick = now + schedule.interval;
            let task = tokio::spawn(run_schedule(
                schedule,
                first_tick,
                self.output.clone(),
                self.cancel.clone(),
            ));
            self.tasks.push((name, task));
        }
    }

    /// 모든 타이머를 취소하고 종료를 기다립니다.
    ///
    /// 전달 중인 플러시 결과는 끝까지 보낸 뒤 종료합니다.
    /// 반환 시점에는 스케줄러가 가진 출력 큐 송신측이 모두 drop되어 있습니다.
    pub async fn stop(self) -> Vec<WindowReport> {
        self.cancel.cancel();
        drop(self.output);

        let mut reports = Vec::with_capacity(self.tasks.len());
        for (name, task) in self.tasks {
            match task.await {
                Ok(report) => reports.push(report),
                Err(e) => tracing::error!(rule = %name, error = %e, "window task failed"),
            }
        }
        reports
    }
}

async fn run_schedule(
    schedule: WindowSchedule,
    first_tick: Instant,
    output: mpsc::Sender<RuleOutput>,
    cancel: CancellationToken,
) -> WindowReport {
    let mut report = WindowReport {
        name: schedule.name.clone(),
        ..Default::default()
    };

    let mut ticker = tokio::time::interval_at(first_tick, schedule.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        report.ticks += 1;
        metrics::counter!(m::WINDOW_FLUSHES_TOTAL, m::LABEL_RULE => schedule.name.clone())
            .increment(1);

        let events = match catch_unwind(AssertUnwindSafe(|| schedule.rule.window_flush())) {
            Ok(Ok(events)) => events,
            Ok(Err(e)) => {
                report.errors += 1;
                metrics::counter!(m::WINDOW_FLUSH_ERRORS_TOTAL, m::LABEL_RULE => schedule.name.clone())
                    .increment(1);
                tracing::warn!(rule = %schedule.name, error = %e, "window flush failed");
                continue;
            }
            Err(panic) => {
                report.errors += 1;
                metrics::counter!(m::WINDOW_FLUSH_ERRORS_TOTAL, m::LABEL_RULE => schedule.name.clone())
                    .increment(1);
                tracing::error!(
                    rule = %schedule.name,
                    panic = %panic_message(panic.as_ref()),
                    "rule panicked in window flush"
                );
                continue;
            }
        };

        if !events.is_empty() {
            tracing::debug!(rule = %schedule.name, count = events.len(), "window flushed");
        }

        // 플러시가 규칙 상태를 이미 비웠으므로 취소 요청이 있어도 끝까지 보냄
        for event in events {
            if output.send(RuleOutput::Output(event)).await.is_err() {
                tracing::warn!(rule = %schedule.name, "output queue closed, stopping window");
                return report;
            }
            report.emitted += 1;
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};

    use shoal_core::error::RuleError;
    use shoal_core::{OutputEvent, TypedEvent};

    struct Ticking {
        interval: Duration,
        flushes: Arc<AtomicU64>,
        fail: bool,
    }

    impl Rule for Ticking {
        fn name(&self) -> &str {
            "ticking"
        }

        fn initialize(&mut self) -> Result<(), RuleError> {
            Ok(())
        }

        fn process(&self, _event: &TypedEvent) -> Option<RuleOutput> {
            None
        }

        fn window_interval(&self) -> Duration {
            self.interval
        }

        fn window_flush(&self) -> Result<Vec<OutputEvent>, RuleError> {
            let n = self.flushes.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(RuleError::Window {
                    rule: "ticking".to_owned(),
                    reason: format!("flush {n} failed"),
                });
            }
            Ok(vec![OutputEvent::new("test", "Tick").with_event_id(n.to_string())])
        }
    }

    fn schedule(interval: Duration, fail: bool) -> (WindowSchedule, Arc<AtomicU64>) {
        let flushes = Arc::new(AtomicU64::new(0));
        let rule = Ticking {
            interval,
            flushes: Arc::clone(&flushes),
            fail,
        };
        (
            WindowSchedule {
                name: "ticking".to_owned(),
                rule: Arc::new(rule),
                interval,
            },
            flushes,
        )
    }

    #[test]
    fn zero_interval_is_not_registered() {
        let (tx, _rx) = mpsc::channel(1);
        let mut scheduler = WindowScheduler::new(tx);
        let (s, _) = schedule(Duration::ZERO, false);
        assert!(!scheduler.add(s));
        assert!(scheduler.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn flushes_once_per_interval() {
        let (tx, mut rx) = mpsc::channel(16);
        let mut scheduler = WindowScheduler::new(tx);
        let (s, flushes) = schedule(Duration::from_millis(100), false);
        assert!(scheduler.add(s));
        scheduler.start();

        tokio::time::sleep(Duration::from_millis(350)).await;
        let reports = scheduler.stop().await;

        assert_eq!(flushes.load(Ordering::SeqCst), 3);
        assert_eq!(reports[0].ticks, 3);
        assert_eq!(reports[0].emitted, 3);

        let mut ids = Vec::new();
        while let Some(out) = rx.recv().await {
            ids.push(out.as_output().unwrap().event_id.clone());
        }
        assert_eq!(ids, vec!["0", "1", "2"]);
    }

    #[tokio::test(start_paused = true)]
    async fn failing_flush_keeps_ticking() {
        let (tx, mut rx) = mpsc::channel(1);
        let mut scheduler = WindowScheduler::new(tx);
        let (s, flushes) = schedule(Duration::from_secs(1), true);
        scheduler.add(s);
        scheduler.start();

        tokio::time::sleep(Duration::from_millis(3500)).await;
        let reports = scheduler.stop().await;

        assert_eq!(flushes.load(Ordering::SeqCst), 3);
        assert_eq!(reports[0].errors, 3);
        assert_eq!(reports[0].emitted, 0);
        assert!(rx.recv().await.is_none());
    }

    struct Burst {
        flushes: Arc<AtomicU64>,
    }

    impl Rule for Burst {
        fn name(&self) -> &str {
            "burst"
        }

        fn initialize(&mut self) -> Result<(), RuleError> {
            Ok(())
        }

        fn process(&self, _event: &TypedEvent) -> Option<RuleOutput> {
            None
        }

        fn window_interval(&self) -> Duration {
            Duration::from_millis(10)
        }

        fn window_flush(&self) -> Result<Vec<OutputEvent>, RuleError> {
            self.flushes.fetch_add(1, Ordering::SeqCst);
            Ok((0..5)
                .map(|i| OutputEvent::new("test", "Burst").with_event_id(i.to_string()))
                .collect())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn stop_delivers_already_flushed_results() {
        let (tx, mut rx) = mpsc::channel(1);
        let mut scheduler = WindowScheduler::new(tx);
        let flushes = Arc::new(AtomicU64::new(0));
        scheduler.add(WindowSchedule {
            name: "burst".to_owned(),
            rule: Arc::new(Burst {
                flushes: Arc::clone(&flushes),
            }),
            interval: Duration::from_millis(10),
        });
        scheduler.start();

        // 느린 소비자: 결과 하나당 20ms
        let consumer = tokio::spawn(async move {
            let mut ids = Vec::new();
            while let Some(out) = rx.recv().await {
                ids.push(out.as_output().unwrap().event_id.clone());
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
            ids
        });

        // 첫 플러시 직후, 결과 전송이 막혀 있는 동안 중지
        tokio::time::sleep(Duration::from_millis(15)).await;
        let reports = scheduler.stop().await;

        assert_eq!(flushes.load(Ordering::SeqCst), 1);
        assert_eq!(reports[0].ticks, 1);
        assert_eq!(reports[0].emitted, 5);
        assert_eq!(consumer.await.unwrap(), vec!["0", "1", "2", "3", "4"]);
    }

    #[tokio::test(start_paused = true)]
    async fn closed_output_queue_ends_schedule() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let mut scheduler = WindowScheduler::new(tx);
        let (s, flushes) = schedule(Duration::from_millis(10), false);
        scheduler.add(s);
        scheduler.start();

        tokio::time::sleep(Duration::from_millis(55)).await;
        let reports = scheduler.stop().await;

        // 첫 결과 전송이 실패하면 스케줄이 끝남
        assert_eq!(flushes.load(Ordering::SeqCst), 1);
        assert_eq!(reports[0].emitted, 0);
    }
}
