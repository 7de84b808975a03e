//! 에러 타입 — 도메인별 에러 정의

/// shoal 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum ShoalError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 파이프라인 처리 에러
    #[error("pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// 규칙 에러
    #[error("rule error: {0}")]
    Rule(#[from] RuleError),

    /// 이벤트 분류 에러
    #[error("classify error: {0}")]
    Classify(#[from] ClassifyError),

    /// 입력/출력 어댑터 에러
    #[error("adapter error: {0}")]
    Adapter(#[from] AdapterError),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// 파이프라인 처리 에러
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// 채널 전송 실패
    #[error("channel send failed: {0}")]
    ChannelSend(String),

    /// 파이프라인 초기화 실패
    #[error("pipeline init failed: {0}")]
    InitFailed(String),

    /// 이미 실행된 파이프라인을 다시 실행하려 함
    #[error("pipeline already ran; a run is terminal")]
    AlreadyRan,

    /// 허용되지 않는 생명주기 전환
    #[error("rule '{rule}' cannot move from {from} to {to}")]
    InvalidTransition {
        rule: String,
        from: String,
        to: String,
    },
}

/// 규칙 에러
///
/// 규칙 구현체가 `initialize`/`window_flush`에서 반환하거나,
/// 레지스트리가 규칙을 생성할 때 반환합니다.
#[derive(Debug, thiserror::Error)]
pub enum RuleError {
    /// 규칙 초기화 실패
    #[error("rule '{rule}' failed to initialize: {reason}")]
    Init { rule: String, reason: String },

    /// 윈도우 플러시 실패
    #[error("rule '{rule}' window flush failed: {reason}")]
    Window { rule: String, reason: String },

    /// 등록되지 않은 규칙 종류
    #[error("no rule registered for kind '{0}'")]
    UnknownKind(String),

    /// 규칙 파라미터가 규칙 종류의 요구사항을 만족하지 않음
    #[error("invalid params for rule kind '{kind}': {reason}")]
    InvalidParams { kind: String, reason: String },
}

/// 이벤트 분류 에러
#[derive(Debug, thiserror::Error)]
pub enum ClassifyError {
    /// 어떤 이벤트 타입에도 매칭되지 않음
    #[error("no event type matched message of {len} bytes")]
    NoMatch { len: usize },

    /// 매칭된 이벤트 타입이 이벤트 생성에 실패
    #[error("event type '{event_type}' failed to build event: {reason}")]
    Build { event_type: String, reason: String },

    /// 등록되지 않은 이벤트 타입 종류
    #[error("no event type registered for kind '{0}'")]
    UnknownKind(String),

    /// 이벤트 타입 파라미터 오류
    #[error("invalid params for event type kind '{kind}': {reason}")]
    InvalidParams { kind: String, reason: String },
}

/// 입력/출력 어댑터 에러
#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    /// 어댑터 초기화 실패
    #[error("{adapter} init failed: {reason}")]
    Init { adapter: String, reason: String },

    /// 어댑터 I/O 실패
    #[error("{adapter} io failed: {source}")]
    Io {
        adapter: String,
        #[source]
        source: std::io::Error,
    },

    /// 레코드 직렬화 실패
    #[error("{adapter} failed to encode record: {reason}")]
    Encode { adapter: String, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_converts_to_top_level() {
        let err: ShoalError = ConfigError::InvalidValue {
            field: "input".to_owned(),
            reason: "must be selected".to_owned(),
        }
        .into();
        assert!(matches!(err, ShoalError::Config(_)));
        assert!(err.to_string().contains("input"));
    }

    #[test]
    fn invalid_transition_display() {
        let err = PipelineError::InvalidTransition {
            rule: "length".to_owned(),
            from: "closed".to_owned(),
            to: "active".to_owned(),
        };
        let msg = err.to_string();
        assert!(msg.contains("length"));
        assert!(msg.contains("closed"));
        assert!(msg.contains("active"));
    }

    #[test]
    fn adapter_io_error_keeps_source() {
        let err = AdapterError::Io {
            adapter: "file".to_owned(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        };
        assert!(std::error::Error::source(&err).is_some());
        assert!(err.to_string().contains("file"));
    }

    #[test]
    fn classify_no_match_reports_length() {
        let err = ClassifyError::NoMatch { len: 42 };
        assert!(err.to_string().contains("42"));
    }
}
