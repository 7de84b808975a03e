//! 규칙 파이프라인 에러 타입
//!
//! [`RulePipelineError`]는 파이프라인 크레이트 내부에서 발생하는 모든 에러를 표현합니다.
//! `From<RulePipelineError> for ShoalError` 변환이 구현되어 있어
//! 상위 레이어에서 `?` 연산자로 자연스럽게 전파할 수 있습니다.

use shoal_core::error::{
    AdapterError, ClassifyError, ConfigError, PipelineError, RuleError, ShoalError,
};

/// 규칙 파이프라인 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum RulePipelineError {
    /// 규칙 디렉토리 로딩 실패 (치명적)
    #[error("rule load error: {path}: {reason}")]
    RuleLoad {
        /// 디렉토리 또는 파일 경로
        path: String,
        /// 실패 사유
        reason: String,
    },

    /// 이벤트 타입 디렉토리 로딩 실패 (치명적)
    #[error("event type load error: {path}: {reason}")]
    EventTypeLoad {
        /// 디렉토리 또는 파일 경로
        path: String,
        /// 실패 사유
        reason: String,
    },

    /// 매니페스트 파일 하나의 읽기/파싱 실패
    #[error("manifest error: {path}: {reason}")]
    Manifest {
        /// 매니페스트 파일 경로
        path: String,
        /// 실패 사유
        reason: String,
    },

    /// 규칙 생성/초기화 에러
    #[error(transparent)]
    Rule(#[from] RuleError),

    /// 분류 에러
    #[error(transparent)]
    Classify(#[from] ClassifyError),

    /// 입력/출력 어댑터 에러
    #[error(transparent)]
    Adapter(#[from] AdapterError),

    /// 생명주기 에러 (이미 실행됨, 잘못된 상태 전환 등)
    #[error(transparent)]
    Lifecycle(#[from] PipelineError),

    /// 설정 에러
    #[error("config error: {field}: {reason}")]
    Config {
        /// 설정 필드명
        field: String,
        /// 에러 사유
        reason: String,
    },

    /// 태스크 join 실패
    #[error("task error: {0}")]
    Task(String),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<RulePipelineError> for ShoalError {
    fn from(err: RulePipelineError) -> Self {
        match err {
            RulePipelineError::Rule(e) => ShoalError::Rule(e),
            RulePipelineError::Classify(e) => ShoalError::Classify(e),
            RulePipelineError::Adapter(e) => ShoalError::Adapter(e),
            RulePipelineError::Lifecycle(e) => ShoalError::Pipeline(e),
            RulePipelineError::Io(e) => ShoalError::Io(e),
            RulePipelineError::Config { field, reason } => {
                ShoalError::Config(ConfigError::InvalidValue { field, reason })
            }
            other => ShoalError::Pipeline(PipelineError::InitFailed(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rule_load_error_display() {
        let err = RulePipelineError::RuleLoad {
            path: "/etc/shoal/rules".to_owned(),
            reason: "permission denied".to_owned(),
        };
        let msg = err.to_string();
        assert!(msg.contains("/etc/shoal/rules"));
        assert!(msg.contains("permission denied"));
    }

    #[test]
    fn lifecycle_error_keeps_variant_in_shoal_error() {
        let err: ShoalError = RulePipelineError::from(PipelineError::AlreadyRan).into();
        assert!(matches!(err, ShoalError::Pipeline(PipelineError::AlreadyRan)));
    }

    #[test]
    fn config_error_converts_to_invalid_value() {
        let err: ShoalError = RulePipelineError::Config {
            field: "rule_queue_capacity".to_owned(),
            reason: "must be 1-65536".to_owned(),
        }
        .into();
        assert!(matches!(
            err,
            ShoalError::Config(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn load_errors_convert_to_init_failed() {
        let err: ShoalError = RulePipelineError::EventTypeLoad {
            path: "/nope".to_owned(),
            reason: "missing".to_owned(),
        }
        .into();
        assert!(matches!(
            err,
            ShoalError::Pipeline(PipelineError::InitFailed(_))
        ));
        assert!(err.to_string().contains("/nope"));
    }
}
