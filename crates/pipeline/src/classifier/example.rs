//! Example 이벤트 타입 -- UTF-8 문자열 메시지

use serde::{Deserialize, Serialize};

use shoal_core::error::ClassifyError;
use shoal_core::{EventTypeMatcher, RawMessage, TypedEvent};

use crate::manifest::EventTypeManifest;

/// 레지스트리 종류 이름
pub const KIND: &str = "example";

/// 문자열 하나를 담는 이벤트
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExampleEvent {
    /// 메시지 본문
    #[serde(rename = "Str")]
    pub text: String,
}

/// UTF-8로 디코딩 가능한 모든 메시지를 [`ExampleEvent`]로 분류합니다.
pub struct ExampleMatcher {
    name: String,
}

impl ExampleMatcher {
    /// `example` 이름으로 매처를 생성합니다.
    pub fn new() -> Self {
        Self {
            name: KIND.to_owned(),
        }
    }

    /// 이벤트 타입 이름을 지정합니다.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

impl Default for ExampleMatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl EventTypeMatcher for ExampleMatcher {
    fn name(&self) -> &str {
        &self.name
    }

    fn matches(&self, data: &[u8]) -> bool {
        std::str::from_utf8(data).is_ok()
    }

    fn build(&self, raw: &RawMessage) -> Result<TypedEvent, ClassifyError> {
        let text = std::str::from_utf8(raw.as_bytes()).map_err(|e| ClassifyError::Build {
            event_type: self.name.clone(),
            reason: e.to_string(),
        })?;
        Ok(TypedEvent::from_raw(
            &self.name,
            raw,
            ExampleEvent {
                text: text.to_owned(),
            },
        ))
    }
}

pub(crate) fn factory(
    manifest: &EventTypeManifest,
) -> Result<Box<dyn EventTypeMatcher>, ClassifyError> {
    Ok(Box::new(
        ExampleMatcher::new().with_name(manifest.instance_name()),
    ))
}
