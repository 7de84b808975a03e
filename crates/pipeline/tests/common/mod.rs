//! 통합 테스트 공용 규칙/어댑터

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;

use shoal_core::error::{AdapterError, RuleError};
use shoal_core::{BoxFuture, OutputEvent, Output, Rule, RuleOutput, TypedEvent};
use shoal_pipeline::classifier::ExampleEvent;

/// 규칙과 출력이 이벤트를 순서대로 기록하는 공유 로그
#[derive(Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn position(&self, entry: &str) -> Option<usize> {
        self.entries().iter().position(|e| e == entry)
    }
}

fn text_of(event: &TypedEvent) -> String {
    event
        .downcast_ref::<ExampleEvent>()
        .map(|e| e.text.clone())
        .unwrap_or_default()
}

/// 받은 이벤트 본문을 순서대로 기록하는 규칙
pub struct RecordingRule {
    name: String,
    seen: Arc<Mutex<Vec<String>>>,
    journal: Journal,
}

impl RecordingRule {
    pub fn new(name: &str, journal: &Journal) -> (Self, Arc<Mutex<Vec<String>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                name: name.to_owned(),
                seen: Arc::clone(&seen),
                journal: journal.clone(),
            },
            seen,
        )
    }
}

impl Rule for RecordingRule {
    fn name(&self) -> &str {
        &self.name
    }

    fn initialize(&mut self) -> Result<(), RuleError> {
        Ok(())
    }

    fn process(&self, event: &TypedEvent) -> Option<RuleOutput> {
        self.seen.lock().unwrap().push(text_of(event));
        None
    }

    fn close(&self) {
        self.journal.push(format!("close:{}", self.name));
    }
}

/// 게이트가 열릴 때까지 스레드를 막는 규칙 (multi_thread 런타임 전용)
pub struct GatedRule {
    pub gate: Arc<AtomicBool>,
    pub processed: Arc<AtomicU64>,
}

impl Rule for GatedRule {
    fn name(&self) -> &str {
        "gated"
    }

    fn initialize(&mut self) -> Result<(), RuleError> {
        Ok(())
    }

    fn process(&self, _event: &TypedEvent) -> Option<RuleOutput> {
        while !self.gate.load(Ordering::SeqCst) {
            std::thread::sleep(Duration::from_millis(5));
        }
        self.processed.fetch_add(1, Ordering::SeqCst);
        None
    }
}

/// 특정 본문에서 panic하는 규칙
pub struct PanickingRule {
    pub trigger: &'static str,
    pub journal: Journal,
}

impl Rule for PanickingRule {
    fn name(&self) -> &str {
        "panicky"
    }

    fn initialize(&mut self) -> Result<(), RuleError> {
        Ok(())
    }

    fn process(&self, event: &TypedEvent) -> Option<RuleOutput> {
        if text_of(event) == self.trigger {
            panic!("cannot handle {}", self.trigger);
        }
        Some(RuleOutput::Passthrough(event.clone()))
    }

    fn close(&self) {
        self.journal.push("close:panicky");
    }
}

/// 호출 횟수를 세는 규칙. 윈도우 주기마다 결과 하나를 냅니다.
pub struct ProbeRule {
    pub name: &'static str,
    pub interval: Duration,
    pub processed: Arc<AtomicU64>,
    pub flushes: Arc<AtomicU64>,
}

impl ProbeRule {
    pub fn new(name: &'static str, interval: Duration) -> Self {
        Self {
            name,
            interval,
            processed: Arc::new(AtomicU64::new(0)),
            flushes: Arc::new(AtomicU64::new(0)),
        }
    }
}

impl Rule for ProbeRule {
    fn name(&self) -> &str {
        self.name
    }

    fn initialize(&mut self) -> Result<(), RuleError> {
        Ok(())
    }

    fn process(&self, _event: &TypedEvent) -> Option<RuleOutput> {
        self.processed.fetch_add(1, Ordering::SeqCst);
        None
    }

    fn window_interval(&self) -> Duration {
        self.interval
    }

    fn window_flush(&self) -> Result<Vec<OutputEvent>, RuleError> {
        self.flushes.fetch_add(1, Ordering::SeqCst);
        Ok(vec![OutputEvent::new("probe", self.name)])
    }
}

/// 출력 큐가 닫히면 `output-closed`를 기록하는 출력
pub struct JournalOutput {
    pub journal: Journal,
}

impl Output for JournalOutput {
    fn name(&self) -> &str {
        "journal"
    }

    fn sink(
        self: Box<Self>,
        mut rx: mpsc::Receiver<RuleOutput>,
    ) -> BoxFuture<'static, Result<u64, AdapterError>> {
        Box::pin(async move {
            let mut count = 0;
            while rx.recv().await.is_some() {
                count += 1;
            }
            self.journal.push("output-closed");
            Ok(count)
        })
    }
}

/// `0`부터 `n-1`까지의 문자열 메시지
pub fn numbered(n: usize) -> Vec<String> {
    (0..n).map(|i| i.to_string()).collect()
}
