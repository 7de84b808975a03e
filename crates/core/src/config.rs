//! 설정 관리 — JSON 설정 파일 파싱 및 런타임 설정
//!
//! [`ShoalConfig`]는 데몬과 파이프라인이 사용하는 최상위 구조체입니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`SHOAL_RULE_FOLDER=/etc/shoal/rules` 형식)
//! 3. 설정 파일 (`shoal.json`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), shoal_core::error::ShoalError> {
//! use shoal_core::config::ShoalConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드 + 검증
//! let config = ShoalConfig::load("shoal.json").await?;
//!
//! // JSON 문자열에서 직접 파싱
//! let config = ShoalConfig::parse(r#"{"input": "stdin", "output": "stdout"}"#)?;
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, ShoalError};

/// 큐 용량 상한
pub const MAX_QUEUE_CAPACITY: usize = 65_536;

/// shoal 통합 설정
///
/// 최상위 키 `input`, `output`, `fileConfig`, `RuleFolder`, `EventTypeFolder`는
/// 기존 설정 파일과 호환되는 이름을 사용합니다. 어댑터 값은 대소문자를
/// 구분하지 않습니다 (`"File"`, `"file"`).
/// 알 수 없는 키(예: `kafkaConfig`)는 무시됩니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShoalConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// 입력 어댑터 선택
    #[serde(default)]
    pub input: Option<InputKind>,
    /// 출력 어댑터 선택
    #[serde(default)]
    pub output: Option<OutputKind>,
    /// 파일 어댑터 설정
    #[serde(rename = "fileConfig", default)]
    pub file_config: FileConfig,
    /// 규칙 매니페스트 디렉토리
    #[serde(rename = "RuleFolder", default)]
    pub rule_folder: Option<String>,
    /// 이벤트 타입 매니페스트 디렉토리
    #[serde(rename = "EventTypeFolder", default)]
    pub event_type_folder: Option<String>,
    /// 큐 용량 설정
    #[serde(default)]
    pub pipeline: PipelineSettings,
    /// 메트릭 설정
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl ShoalConfig {
    /// JSON 파일에서 설정을 로드하고 환경변수 오버라이드 및 검증을 적용합니다.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, ShoalError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// JSON 파일에서 설정을 로드합니다 (환경변수 오버라이드 및 검증 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, ShoalError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ShoalError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                ShoalError::Io(e)
            }
        })?;
        Self::parse(&content)
    }

    /// JSON 문자열에서 설정을 파싱합니다.
    pub fn parse(json: &str) -> Result<Self, ShoalError> {
        serde_json::from_str(json).map_err(|e| {
            ShoalError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `SHOAL_{SECTION}_{FIELD}`
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "SHOAL_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "SHOAL_GENERAL_LOG_FORMAT");

        // Adapters
        override_parsed(&mut self.input, "SHOAL_INPUT");
        override_parsed(&mut self.output, "SHOAL_OUTPUT");
        override_opt_string(&mut self.file_config.input_file, "SHOAL_FILE_INPUT_FILE");
        override_opt_string(
            &mut self.file_config.output_file,
            "SHOAL_FILE_OUTPUT_FILE",
        );

        // Folders
        override_opt_string(&mut self.rule_folder, "SHOAL_RULE_FOLDER");
        override_opt_string(&mut self.event_type_folder, "SHOAL_EVENT_TYPE_FOLDER");

        // Pipeline
        override_usize(
            &mut self.pipeline.input_queue_capacity,
            "SHOAL_PIPELINE_INPUT_QUEUE_CAPACITY",
        );
        override_usize(
            &mut self.pipeline.rule_queue_capacity,
            "SHOAL_PIPELINE_RULE_QUEUE_CAPACITY",
        );
        override_usize(
            &mut self.pipeline.output_queue_capacity,
            "SHOAL_PIPELINE_OUTPUT_QUEUE_CAPACITY",
        );

        // Metrics
        override_bool(&mut self.metrics.enabled, "SHOAL_METRICS_ENABLED");
        override_string(&mut self.metrics.listen_addr, "SHOAL_METRICS_LISTEN_ADDR");
        override_u16(&mut self.metrics.port, "SHOAL_METRICS_PORT");
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), ShoalError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(invalid(
                "general.log_level",
                format!("must be one of: {}", valid_levels.join(", ")),
            ));
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(invalid(
                "general.log_format",
                format!("must be one of: {}", valid_formats.join(", ")),
            ));
        }

        match self.input {
            None => return Err(invalid("input", "an input must be selected".to_owned())),
            Some(InputKind::File) if is_blank(&self.file_config.input_file) => {
                return Err(invalid(
                    "fileConfig.inputFile",
                    "required when input is 'file'".to_owned(),
                ));
            }
            Some(_) => {}
        }

        match self.output {
            None => return Err(invalid("output", "an output must be selected".to_owned())),
            Some(OutputKind::File) if is_blank(&self.file_config.output_file) => {
                return Err(invalid(
                    "fileConfig.outputFile",
                    "required when output is 'file'".to_owned(),
                ));
            }
            Some(_) => {}
        }

        if self.rule_folder.as_deref().is_some_and(str::is_empty) {
            return Err(invalid("RuleFolder", "must not be empty".to_owned()));
        }
        if self.event_type_folder.as_deref().is_some_and(str::is_empty) {
            return Err(invalid("EventTypeFolder", "must not be empty".to_owned()));
        }

        self.pipeline.validate()?;

        if self.metrics.enabled {
            if self.metrics.port == 0 {
                return Err(invalid(
                    "metrics.port",
                    "must be non-zero when metrics are enabled".to_owned(),
                ));
            }
            if self.metrics.listen_addr.trim().is_empty() {
                return Err(invalid(
                    "metrics.listen_addr",
                    "must not be empty when metrics are enabled".to_owned(),
                ));
            }
        }

        Ok(())
    }
}

fn invalid(field: &str, reason: String) -> ShoalError {
    ConfigError::InvalidValue {
        field: field.to_owned(),
        reason,
    }
    .into()
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().is_none_or(|v| v.trim().is_empty())
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "json".to_owned(),
        }
    }
}

/// 입력 어댑터 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum InputKind {
    /// 파일 한 줄당 메시지 하나
    File,
    /// 표준 입력
    Stdin,
}

impl fmt::Display for InputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File => write!(f, "file"),
            Self::Stdin => write!(f, "stdin"),
        }
    }
}

impl TryFrom<String> for InputKind {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl FromStr for InputKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "file" => Ok(Self::File),
            "stdin" => Ok(Self::Stdin),
            other => Err(ConfigError::InvalidValue {
                field: "input".to_owned(),
                reason: format!("unsupported input '{other}'"),
            }),
        }
    }
}

/// 출력 어댑터 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum OutputKind {
    /// JSON lines 파일
    File,
    /// 표준 출력
    Stdout,
}

impl fmt::Display for OutputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File => write!(f, "file"),
            Self::Stdout => write!(f, "stdout"),
        }
    }
}

impl TryFrom<String> for OutputKind {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl FromStr for OutputKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "file" => Ok(Self::File),
            "stdout" => Ok(Self::Stdout),
            other => Err(ConfigError::InvalidValue {
                field: "output".to_owned(),
                reason: format!("unsupported output '{other}'"),
            }),
        }
    }
}

/// 파일 어댑터 설정
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FileConfig {
    /// 입력 파일 경로
    pub input_file: Option<String>,
    /// 출력 파일 경로
    pub output_file: Option<String>,
}

/// 큐 용량 설정
///
/// 모든 큐의 기본 용량은 1입니다 (송신자가 수신자를 기다리는 hand-off에 가장 가까운 값).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    /// 원시 메시지 큐 용량
    pub input_queue_capacity: usize,
    /// 규칙별 입력 큐 용량
    pub rule_queue_capacity: usize,
    /// 공유 출력 큐 용량
    pub output_queue_capacity: usize,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            input_queue_capacity: 1,
            rule_queue_capacity: 1,
            output_queue_capacity: 1,
        }
    }
}

impl PipelineSettings {
    /// 큐 용량이 `1..=MAX_QUEUE_CAPACITY` 범위인지 검증합니다.
    pub fn validate(&self) -> Result<(), ShoalError> {
        for (field, value) in [
            ("pipeline.input_queue_capacity", self.input_queue_capacity),
            ("pipeline.rule_queue_capacity", self.rule_queue_capacity),
            ("pipeline.output_queue_capacity", self.output_queue_capacity),
        ] {
            if value == 0 || value > MAX_QUEUE_CAPACITY {
                return Err(invalid(
                    field,
                    format!("must be between 1 and {MAX_QUEUE_CAPACITY}"),
                ));
            }
        }
        Ok(())
    }
}

/// 메트릭 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Prometheus 엔드포인트 활성화 여부
    pub enabled: bool,
    /// 바인드 주소
    pub listen_addr: String,
    /// 포트
    pub port: u16,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            listen_addr: "127.0.0.1".to_owned(),
            port: 9100,
        }
    }
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_opt_string(target: &mut Option<String>, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = Some(val);
    }
}

fn override_parsed<T>(target: &mut Option<T>, env_key: &str)
where
    T: FromStr,
    T::Err: fmt::Display,
{
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<T>() {
            Ok(parsed) => *target = Some(parsed),
            Err(e) => warn!(
                env_key,
                value = val.as_str(),
                error = %e,
                "failed to parse env var, ignoring"
            ),
        }
    }
}

fn override_bool(target: &mut bool, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<bool>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse bool from env var, ignoring"
            ),
        }
    }
}

fn override_usize(target: &mut usize, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<usize>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse usize from env var, ignoring"
            ),
        }
    }
}

fn override_u16(target: &mut u16, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u16>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u16 from env var, ignoring"
            ),
        }
    }
}
