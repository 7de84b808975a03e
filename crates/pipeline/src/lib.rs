#![doc = include_str!("../README.md")]
//!
//! # 모듈 구성
//!
//! - [`manifest`]: YAML 매니페스트 (규칙/이벤트 타입) 파싱
//! - [`registry`]: 규칙 종류 레지스트리
//! - [`loader`]: 규칙 디렉토리 로더
//! - [`instance`]: 규칙 인스턴스 생명주기와 드레인 태스크
//! - [`window`]: 윈도우 스케줄러
//! - [`classifier`]: 이벤트 분류기와 내장 이벤트 타입
//! - [`rules`]: 내장 규칙
//! - [`input`] / [`output`]: 입력/출력 어댑터
//! - [`pipeline`]: 디스패치 파이프라인 (팬아웃/팬인, 드레인 종료)
//! - [`config`]: 파이프라인 설정 (core 설정에서 추출)
//! - [`error`]: 도메인 에러 타입

pub mod config;
pub mod error;
pub mod pipeline;

pub mod classifier;
pub mod input;
pub mod instance;
pub mod loader;
pub mod manifest;
pub mod output;
pub mod registry;
pub mod rules;
pub mod window;

// --- 주요 타입 re-export ---

// 파이프라인
pub use pipeline::{RulePipeline, RulePipelineBuilder, RunSummary};

// 설정
pub use config::{PipelineConfig, PipelineConfigBuilder};

// 에러
pub use error::RulePipelineError;

// 규칙 로딩
pub use loader::{LoadReport, RuleLoader};
pub use manifest::{EventTypeManifest, RuleManifest};
pub use registry::RuleRegistry;

// 규칙 실행
pub use instance::{DrainReport, RuleInstance, RuleState, RuleWorker};
pub use window::{WindowReport, WindowSchedule, WindowScheduler};

// 분류기
pub use classifier::{EventClassifier, EventTypeRegistry};

// 어댑터
pub use input::{ChannelInput, FileInput, StdinInput};
pub use output::{ChannelOutput, FileOutput, StdoutOutput};
