//! `event_count` 규칙 -- 윈도우 주기마다 이벤트 타입별 개수를 집계합니다.
//!
//! 이벤트 처리 경로와 윈도우 경로가 동시에 카운터에 접근하므로 `Mutex`로 보호합니다.
//!
//! ```yaml
//! rule: event_count
//! params:
//!   interval_ms: 60000
//! ```

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Deserialize;

use shoal_core::error::RuleError;
use shoal_core::{OutputEvent, Rule, RuleOutput, TypedEvent};

use crate::manifest::{RuleManifest, decode_params};

/// 레지스트리 종류 이름
pub const KIND: &str = "event_count";

/// 기본 윈도우 주기 (ms)
pub const DEFAULT_INTERVAL_MS: u64 = 60_000;

/// 결과 레코드 소스
pub const OUTPUT_SOURCE: &str = "shoal";

/// 결과 레코드 이름
pub const OUTPUT_NAME: &str = "EventCount";

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct EventCountParams {
    interval_ms: u64,
}

impl Default for EventCountParams {
    fn default() -> Self {
        Self {
            interval_ms: DEFAULT_INTERVAL_MS,
        }
    }
}

/// 이벤트 타입별 카운터 규칙
pub struct EventCountRule {
    name: String,
    interval: Duration,
    counts: Mutex<BTreeMap<String, u64>>,
}

impl EventCountRule {
    /// 윈도우 주기로 규칙을 생성합니다.
    pub fn new(name: impl Into<String>, interval: Duration) -> Self {
        Self {
            name: name.into(),
            interval,
            counts: Mutex::new(BTreeMap::new()),
        }
    }

    // 카운터는 항상 일관된 상태이므로 poison은 무시
    fn counts(&self) -> MutexGuard<'_, BTreeMap<String, u64>> {
        self.counts.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Rule for EventCountRule {
    fn name(&self) -> &str {
        &self.name
    }

    fn initialize(&mut self) -> Result<(), RuleError> {
        self.counts().clear();
        Ok(())
    }

    fn process(&self, event: &TypedEvent) -> Option<RuleOutput> {
        *self
            .counts()
            .entry(event.event_type().to_owned())
            .or_insert(0) += 1;
        None
    }

    fn window_interval(&self) -> Duration {
        self.interval
    }

    fn window_flush(&self) -> Result<Vec<OutputEvent>, RuleError> {
        let counts = std::mem::take(&mut *self.counts());
        Ok(counts
            .into_iter()
            .map(|(event_type, count)| {
                OutputEvent::new(OUTPUT_SOURCE, OUTPUT_NAME)
                    .with_event_type(event_type)
                    .with_entity(count.to_string())
            })
            .collect())
    }

    fn close(&self) {
        let pending: u64 = self.counts().values().sum();
        if pending > 0 {
            tracing::debug!(rule = %self.name, pending, "discarding unflushed counts");
        }
    }
}

pub(crate) fn factory(manifest: &RuleManifest) -> Result<Box<dyn Rule>, RuleError> {
    let params: EventCountParams =
        decode_params(&manifest.params).map_err(|e| super::invalid_params(KIND, e))?;
    if params.interval_ms == 0 {
        return Err(super::invalid_params(KIND, "interval_ms must be greater than 0"));
    }
    Ok(Box::new(EventCountRule::new(
        manifest.instance_name(),
        Duration::from_millis(params.interval_ms),
    )))
}
