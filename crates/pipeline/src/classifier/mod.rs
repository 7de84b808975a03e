//! 이벤트 분류 모듈 -- 원시 메시지에 의미 타입을 부여합니다.
//!
//! [`EventClassifier`]는 등록된 [`EventTypeMatcher`]를 순서대로 시도하여
//! 처음 매칭된 매처로 [`TypedEvent`]를 생성합니다.
//!
//! # 내장 이벤트 타입
//! - `example` ([`ExampleMatcher`]): UTF-8 문자열 → [`ExampleEvent`]
//! - `certstream` ([`CertStreamMatcher`]): CertStream JSON → [`CertStreamEvent`]
//! - `json` ([`JsonMatcher`]): JSON 객체 → [`JsonEvent`]
//!
//! # 사용 예시
//! ```ignore
//! use shoal_pipeline::classifier::{EventClassifier, CertStreamMatcher, ExampleMatcher};
//!
//! let classifier = EventClassifier::new()
//!     .register(Box::new(CertStreamMatcher::new()))
//!     .register(Box::new(ExampleMatcher::new()));
//!
//! let event = classifier.classify(&raw)?;
//! ```

pub mod certstream;
pub mod example;
pub mod json;

pub use certstream::{CertStreamEvent, CertStreamMatcher};
pub use example::{ExampleEvent, ExampleMatcher};
pub use json::{JsonEvent, JsonMatcher};

use std::collections::HashMap;
use std::path::Path;

use shoal_core::error::ClassifyError;
use shoal_core::{EventTypeMatcher, RawMessage, TypedEvent};

use crate::error::RulePipelineError;
use crate::manifest::{EventTypeManifest, list_manifests, read_manifest};

/// 이벤트 타입 매처 생성 함수
pub type EventTypeFactory = Box<
    dyn Fn(&EventTypeManifest) -> Result<Box<dyn EventTypeMatcher>, ClassifyError> + Send + Sync,
>;

/// 이벤트 타입 레지스트리
#[derive(Default)]
pub struct EventTypeRegistry {
    factories: HashMap<String, EventTypeFactory>,
}

impl EventTypeRegistry {
    /// 빈 레지스트리를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 내장 이벤트 타입(`example`, `certstream`, `json`)이 등록된 레지스트리를 생성합니다.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(example::KIND, example::factory);
        registry.register(certstream::KIND, certstream::factory);
        registry.register(json::KIND, json::factory);
        registry
    }

    /// 이벤트 타입 종류를 등록합니다. 같은 이름이 있으면 교체합니다.
    pub fn register<F>(&mut self, kind: impl Into<String>, factory: F)
    where
        F: Fn(&EventTypeManifest) -> Result<Box<dyn EventTypeMatcher>, ClassifyError>
            + Send
            + Sync
            + 'static,
    {
        self.factories.insert(kind.into(), Box::new(factory));
    }

    /// 등록된 종류 이름 (정렬됨)
    pub fn kinds(&self) -> Vec<&str> {
        let mut kinds: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        kinds.sort_unstable();
        kinds
    }

    /// 매니페스트로부터 매처를 생성합니다.
    pub fn create(
        &self,
        manifest: &EventTypeManifest,
    ) -> Result<Box<dyn EventTypeMatcher>, ClassifyError> {
        let factory = self
            .factories
            .get(&manifest.event_type)
            .ok_or_else(|| ClassifyError::UnknownKind(manifest.event_type.clone()))?;
        factory(manifest)
    }
}

/// 이벤트 분류기 -- 등록 순서대로 매처를 시도합니다.
pub struct EventClassifier {
    /// 등록된 매처 목록 (순서대로 시도)
    matchers: Vec<Box<dyn EventTypeMatcher>>,
}

impl EventClassifier {
    /// 빈 분류기를 생성합니다.
    pub fn new() -> Self {
        Self {
            matchers: Vec::new(),
        }
    }

    /// 기본 매처 세트 (JSON → Example)로 분류기를 생성합니다.
    pub fn with_defaults() -> Self {
        Self::new()
            .register(Box::new(JsonMatcher::new()))
            .register(Box::new(ExampleMatcher::new()))
    }

    /// 매처를 등록합니다. 등록 순서대로 시도됩니다.
    pub fn register(mut self, matcher: Box<dyn EventTypeMatcher>) -> Self {
        self.matchers.push(matcher);
        self
    }

    /// 원시 메시지를 분류합니다.
    ///
    /// # Errors
    /// - 어떤 매처도 매칭되지 않으면 [`ClassifyError::NoMatch`]
    /// - 매칭된 매처가 이벤트 생성에 실패하면 그 에러
    pub fn classify(&self, raw: &RawMessage) -> Result<TypedEvent, ClassifyError> {
        let data = raw.as_bytes();
        for matcher in &self.matchers {
            if matcher.matches(data) {
                return matcher.build(raw);
            }
        }
        Err(ClassifyError::NoMatch { len: data.len() })
    }

    /// 등록된 매처 이름 목록
    pub fn matcher_names(&self) -> Vec<&str> {
        self.matchers.iter().map(|m| m.name()).collect()
    }

    /// 등록된 매처 수
    pub fn len(&self) -> usize {
        self.matchers.len()
    }

    /// 등록된 매처가 없는지 확인합니다.
    pub fn is_empty(&self) -> bool {
        self.matchers.is_empty()
    }

    /// 이벤트 타입 디렉토리에서 매처를 로드합니다.
    ///
    /// 개별 매니페스트 실패는 경고 로그를 남기고 건너뜁니다.
    /// 로드된 매처가 하나도 없으면 기본 매처 세트를 사용합니다.
    ///
    /// # Errors
    /// 디렉토리를 읽을 수 없는 경우
    pub async fn load_directory(
        dir: impl AsRef<Path>,
        registry: &EventTypeRegistry,
    ) -> Result<Self, RulePipelineError> {
        let dir = dir.as_ref();

        let paths = list_manifests(dir)
            .await
            .map_err(|e| RulePipelineError::EventTypeLoad {
                path: dir.display().to_string(),
                reason: format!("failed to read directory: {e}"),
            })?;

        let mut classifier = Self::new();
        for path in paths {
            let manifest: EventTypeManifest = match read_manifest(&path).await {
                Ok(manifest) => manifest,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "skipping event type manifest");
                    continue;
                }
            };

            match registry.create(&manifest) {
                Ok(matcher) => {
                    tracing::debug!(
                        event_type = %matcher.name(),
                        path = %path.display(),
                        "loaded event type"
                    );
                    classifier.matchers.push(matcher);
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "skipping event type manifest");
                }
            }
        }

        if classifier.is_empty() {
            tracing::warn!(
                dir = %dir.display(),
                "no event types loaded, falling back to default event types"
            );
            return Ok(Self::with_defaults());
        }

        tracing::info!(
            dir = %dir.display(),
            event_types = ?classifier.matcher_names(),
            "loaded event types"
        );
        Ok(classifier)
    }
}

impl Default for EventClassifier {
    fn default() -> Self {
        Self::with_defaults()
    }
}
