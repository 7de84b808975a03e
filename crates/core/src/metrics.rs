//! 메트릭 상수 및 설명 등록
//!
//! 모든 Prometheus 메트릭의 이름과 설명을 중앙에서 정의합니다.
//! 각 모듈은 이 상수를 사용하여 `metrics::counter!()`, `metrics::gauge!()`,
//! `metrics::histogram!()` 매크로를 호출합니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `shoal_`
//! - 영역: `pipeline_`, `rule_`, `window_`, `output_`, `daemon_`
//! - 접미어: `_total` (counter), `_seconds` (histogram/latency), 없음 (gauge)
//!
//! # 사용 예시
//!
//! ```ignore
//! use metrics::counter;
//!
//! counter!(shoal_core::metrics::PIPELINE_MESSAGES_RECEIVED_TOTAL).increment(1);
//! ```

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// 규칙 이름 레이블 키
pub const LABEL_RULE: &str = "rule";

/// 이벤트 타입 레이블 키
pub const LABEL_EVENT_TYPE: &str = "event_type";

// ─── Pipeline 메트릭 ────────────────────────────────────────────────

/// Pipeline: 입력에서 받은 원시 메시지 수 (counter)
pub const PIPELINE_MESSAGES_RECEIVED_TOTAL: &str = "shoal_pipeline_messages_received_total";

/// Pipeline: 분류 실패로 버려진 메시지 수 (counter)
pub const PIPELINE_CLASSIFY_ERRORS_TOTAL: &str = "shoal_pipeline_classify_errors_total";

/// Pipeline: 모든 규칙에 브로드캐스트된 이벤트 수 (counter, label: event_type)
pub const PIPELINE_EVENTS_BROADCAST_TOTAL: &str = "shoal_pipeline_events_broadcast_total";

/// Pipeline: 활성 규칙 수 (gauge)
pub const PIPELINE_RULES_ACTIVE: &str = "shoal_pipeline_rules_active";

/// Pipeline: 로드 또는 초기화에 실패해 제외된 규칙 수 (counter)
pub const PIPELINE_RULES_SKIPPED_TOTAL: &str = "shoal_pipeline_rules_skipped_total";

// ─── Rule 메트릭 ────────────────────────────────────────────────────

/// Rule: 처리한 이벤트 수 (counter, label: rule)
pub const RULE_EVENTS_PROCESSED_TOTAL: &str = "shoal_rule_events_processed_total";

/// Rule: 출력 큐로 보낸 결과 수 (counter, label: rule)
pub const RULE_OUTPUTS_TOTAL: &str = "shoal_rule_outputs_total";

/// Rule: `process` 중 발생한 panic 수 (counter, label: rule)
pub const RULE_PROCESS_PANICS_TOTAL: &str = "shoal_rule_process_panics_total";

/// Rule: 이벤트 하나 처리 시간 (histogram, 초, label: rule)
pub const RULE_PROCESS_DURATION_SECONDS: &str = "shoal_rule_process_duration_seconds";

// ─── Window 메트릭 ──────────────────────────────────────────────────

/// Window: 플러시 호출 수 (counter, label: rule)
pub const WINDOW_FLUSHES_TOTAL: &str = "shoal_window_flushes_total";

/// Window: 플러시 실패 수 (counter, label: rule)
pub const WINDOW_FLUSH_ERRORS_TOTAL: &str = "shoal_window_flush_errors_total";

// ─── Output 메트릭 ──────────────────────────────────────────────────

/// Output: 싱크가 기록한 레코드 수 (counter)
pub const OUTPUT_RECORDS_WRITTEN_TOTAL: &str = "shoal_output_records_written_total";

// ─── Daemon 메트릭 ──────────────────────────────────────────────────

/// Daemon: 빌드 정보 (gauge, 항상 1, label: version)
pub const DAEMON_BUILD_INFO: &str = "shoal_daemon_build_info";

// ─── 히스토그램 버킷 정의 ────────────────────────────────────────────

/// 이벤트 처리 시간 히스토그램 버킷 (초)
///
/// 10us ~ 1s 범위
pub const PROCESS_DURATION_BUCKETS: [f64; 9] = [
    0.00001, 0.00005, 0.0001, 0.0005, 0.001, 0.005, 0.01, 0.1, 1.0,
];

// ─── 설명 등록 함수 ─────────────────────────────────────────────────

/// 모든 메트릭의 설명(description)을 등록합니다.
///
/// 전역 레코더 설치 후 한 번만 호출해야 합니다.
pub fn describe_all() {
    use metrics::{describe_counter, describe_gauge, describe_histogram};

    // Pipeline
    describe_counter!(
        PIPELINE_MESSAGES_RECEIVED_TOTAL,
        "Total number of raw messages received from the input"
    );
    describe_counter!(
        PIPELINE_CLASSIFY_ERRORS_TOTAL,
        "Total number of raw messages dropped because no event type matched"
    );
    describe_counter!(
        PIPELINE_EVENTS_BROADCAST_TOTAL,
        "Total number of typed events broadcast to every active rule"
    );
    describe_gauge!(PIPELINE_RULES_ACTIVE, "Number of active rule instances");
    describe_counter!(
        PIPELINE_RULES_SKIPPED_TOTAL,
        "Total number of rules skipped at load or initialization"
    );

    // Rule
    describe_counter!(
        RULE_EVENTS_PROCESSED_TOTAL,
        "Total number of events processed per rule"
    );
    describe_counter!(
        RULE_OUTPUTS_TOTAL,
        "Total number of outputs forwarded per rule"
    );
    describe_counter!(
        RULE_PROCESS_PANICS_TOTAL,
        "Total number of panics caught while a rule processed an event"
    );
    describe_histogram!(
        RULE_PROCESS_DURATION_SECONDS,
        "Time spent processing a single event in seconds"
    );

    // Window
    describe_counter!(
        WINDOW_FLUSHES_TOTAL,
        "Total number of window flushes per rule"
    );
    describe_counter!(
        WINDOW_FLUSH_ERRORS_TOTAL,
        "Total number of failed window flushes per rule"
    );

    // Output
    describe_counter!(
        OUTPUT_RECORDS_WRITTEN_TOTAL,
        "Total number of records written by the output sink"
    );

    // Daemon
    describe_gauge!(
        DAEMON_BUILD_INFO,
        "Build information (always 1, with version label)"
    );
}
