//! 매니페스트 파일 -- 규칙/이벤트 타입 디렉토리의 YAML 파일 형식과 스캐너
//!
//! 규칙 디렉토리와 이벤트 타입 디렉토리는 같은 스캔 규칙을 공유합니다.
//!
//! - 하위 디렉토리는 탐색하지 않음
//! - `.yml`/`.yaml` 확장자만 처리
//! - 파일 이름 순으로 정렬 (발견 순서가 결정적)
//!
//! ```yaml
//! rule: length          # 등록된 규칙 종류
//! name: single-char     # 인스턴스 이름 (생략 시 종류 이름)
//! params:
//!   length: 1
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::error::RulePipelineError;

/// 매니페스트 파일 최대 크기
pub const MAX_MANIFEST_FILE_SIZE: u64 = 1024 * 1024; // 1MB

/// 규칙 매니페스트
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleManifest {
    /// 레지스트리에 등록된 규칙 종류
    pub rule: String,
    /// 인스턴스 이름
    #[serde(default)]
    pub name: Option<String>,
    /// 규칙 종류별 파라미터
    #[serde(default)]
    pub params: serde_yaml::Value,
}

impl RuleManifest {
    /// 파라미터 없이 매니페스트를 생성합니다.
    pub fn new(rule: impl Into<String>) -> Self {
        Self {
            rule: rule.into(),
            name: None,
            params: serde_yaml::Value::Null,
        }
    }

    /// 인스턴스 이름을 설정합니다.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// 파라미터를 설정합니다.
    pub fn with_params(mut self, params: serde_yaml::Value) -> Self {
        self.params = params;
        self
    }

    /// 인스턴스 이름. 지정하지 않았으면 규칙 종류 이름입니다.
    pub fn instance_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.rule)
    }
}

/// 이벤트 타입 매니페스트
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EventTypeManifest {
    /// 레지스트리에 등록된 이벤트 타입 종류
    pub event_type: String,
    /// 매처 이름
    #[serde(default)]
    pub name: Option<String>,
    /// 종류별 파라미터
    #[serde(default)]
    pub params: serde_yaml::Value,
}

impl EventTypeManifest {
    /// 파라미터 없이 매니페스트를 생성합니다.
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            name: None,
            params: serde_yaml::Value::Null,
        }
    }

    /// 매처 이름. 지정하지 않았으면 이벤트 타입 종류 이름입니다.
    pub fn instance_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.event_type)
    }
}

/// 파라미터를 구체 타입으로 변환합니다.
///
/// `params`가 없거나 null이면 `T::default()`를 반환합니다.
pub fn decode_params<T>(params: &serde_yaml::Value) -> Result<T, serde_yaml::Error>
where
    T: DeserializeOwned + Default,
{
    if params.is_null() {
        return Ok(T::default());
    }
    serde_yaml::from_value(params.clone())
}

/// 디렉토리에서 매니페스트 파일 경로를 이름 순으로 나열합니다.
///
/// 디렉토리를 읽을 수 없으면 에러입니다. 호출자는 이를 치명적 에러로 다룹니다.
pub async fn list_manifests(dir: &Path) -> Result<Vec<PathBuf>, std::io::Error> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut paths = Vec::new();

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();

        let is_yaml = path
            .extension()
            .is_some_and(|ext| ext == "yml" || ext == "yaml");
        if !is_yaml {
            continue;
        }

        match entry.file_type().await {
            Ok(file_type) if file_type.is_dir() => continue,
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to stat manifest, skipping"
                );
                continue;
            }
        }

        paths.push(path);
    }

    paths.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(paths)
}

/// 매니페스트 파일 하나를 읽고 파싱합니다.
pub async fn read_manifest<T: DeserializeOwned>(path: &Path) -> Result<T, RulePipelineError> {
    let metadata = tokio::fs::metadata(path)
        .await
        .map_err(|e| RulePipelineError::Manifest {
            path: path.display().to_string(),
            reason: format!("failed to read file metadata: {e}"),
        })?;

    if metadata.len() > MAX_MANIFEST_FILE_SIZE {
        return Err(RulePipelineError::Manifest {
            path: path.display().to_string(),
            reason: format!(
                "file too large: {} bytes (max: {MAX_MANIFEST_FILE_SIZE})",
                metadata.len()
            ),
        });
    }

    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| RulePipelineError::Manifest {
            path: path.display().to_string(),
            reason: format!("failed to read file: {e}"),
        })?;

    parse_manifest(&content, &path.display().to_string())
}

/// YAML 문자열을 매니페스트로 파싱합니다.
pub fn parse_manifest<T: DeserializeOwned>(
    yaml_str: &str,
    source: &str,
) -> Result<T, RulePipelineError> {
    serde_yaml::from_str(yaml_str).map_err(|e| RulePipelineError::Manifest {
        path: source.to_owned(),
        reason: format!("YAML parse error: {e}"),
    })
}
