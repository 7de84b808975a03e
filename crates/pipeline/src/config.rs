//! 규칙 파이프라인 설정
//!
//! [`PipelineConfig`]는 core의 [`ShoalConfig`](shoal_core::config::ShoalConfig)에서
//! 파이프라인이 사용하는 부분(디렉토리, 큐 용량)만 추려냅니다.
//!
//! # 사용 예시
//! ```ignore
//! use shoal_core::config::ShoalConfig;
//! use shoal_pipeline::config::PipelineConfig;
//!
//! let core_config = ShoalConfig::default();
//! let config = PipelineConfig::from_core(&core_config);
//! ```

use serde::{Deserialize, Serialize};

use shoal_core::config::{MAX_QUEUE_CAPACITY, ShoalConfig};

use crate::error::RulePipelineError;

/// 규칙 파이프라인 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// 규칙 매니페스트 디렉토리 (없으면 빌더로 등록한 규칙만 사용)
    pub rule_dir: Option<String>,
    /// 원시 메시지 큐 용량
    pub input_queue_capacity: usize,
    /// 규칙별 입력 큐 용량
    pub rule_queue_capacity: usize,
    /// 공유 출력 큐 용량
    pub output_queue_capacity: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            rule_dir: None,
            input_queue_capacity: 1,
            rule_queue_capacity: 1,
            output_queue_capacity: 1,
        }
    }
}

impl PipelineConfig {
    /// core 설정에서 파이프라인 설정을 생성합니다.
    pub fn from_core(core: &ShoalConfig) -> Self {
        Self {
            rule_dir: core.rule_folder.clone(),
            input_queue_capacity: core.pipeline.input_queue_capacity,
            rule_queue_capacity: core.pipeline.rule_queue_capacity,
            output_queue_capacity: core.pipeline.output_queue_capacity,
        }
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), RulePipelineError> {
        for (field, value) in [
            ("input_queue_capacity", self.input_queue_capacity),
            ("rule_queue_capacity", self.rule_queue_capacity),
            ("output_queue_capacity", self.output_queue_capacity),
        ] {
            if value == 0 || value > MAX_QUEUE_CAPACITY {
                return Err(RulePipelineError::Config {
                    field: field.to_owned(),
                    reason: format!("must be 1-{MAX_QUEUE_CAPACITY}"),
                });
            }
        }

        if self.rule_dir.as_deref().is_some_and(str::is_empty) {
            return Err(RulePipelineError::Config {
                field: "rule_dir".to_owned(),
                reason: "must not be empty".to_owned(),
            });
        }

        Ok(())
    }
}

/// 파이프라인 설정 빌더
#[derive(Default)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    /// 새 빌더를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 규칙 디렉토리를 설정합니다.
    pub fn rule_dir(mut self, dir: impl Into<String>) -> Self {
        self.config.rule_dir = Some(dir.into());
        self
    }

    /// 원시 메시지 큐 용량을 설정합니다.
    pub fn input_queue_capacity(mut self, capacity: usize) -> Self {
        self.config.input_queue_capacity = capacity;
        self
    }

    /// 규칙별 입력 큐 용량을 설정합니다.
    pub fn rule_queue_capacity(mut self, capacity: usize) -> Self {
        self.config.rule_queue_capacity = capacity;
        self
    }

    /// 출력 큐 용량을 설정합니다.
    pub fn output_queue_capacity(mut self, capacity: usize) -> Self {
        self.config.output_queue_capacity = capacity;
        self
    }

    /// 설정을 검증하고 `PipelineConfig`를 생성합니다.
    pub fn build(self) -> Result<PipelineConfig, RulePipelineError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
