//! shoal 공통 크레이트 -- 모든 크레이트가 공유하는 타입, trait, 에러, 설정
//!
//! # 모듈 구성
//!
//! - [`config`]: JSON 설정 파일 파싱 및 환경변수 오버라이드
//! - [`error`]: 도메인별 에러 타입
//! - [`event`]: 파이프라인을 흐르는 메시지 ([`RawMessage`], [`TypedEvent`], [`OutputEvent`])
//! - [`pipeline`]: 확장 지점 trait ([`Rule`], [`Input`], [`Output`], [`EventTypeMatcher`])
//! - [`metrics`]: 메트릭 이름 상수
//! - [`types`]: 공통 열거형 ([`Level`])

pub mod config;
pub mod error;
pub mod event;
pub mod metrics;
pub mod pipeline;
pub mod types;

// --- 주요 타입 re-export ---

// 에러
pub use error::{AdapterError, ClassifyError, ConfigError, PipelineError, RuleError, ShoalError};

// 설정
pub use config::ShoalConfig;

// 이벤트
pub use event::{EventPayload, OutputEvent, RawMessage, RuleOutput, TypedEvent};

// 확장 지점 trait
pub use pipeline::{BoxFuture, EventTypeMatcher, Input, Output, Rule};

// 도메인 타입
pub use types::Level;
