//! JSON 이벤트 타입 -- 임의의 JSON 객체
//!
//! `require_key` 파라미터를 지정하면 해당 최상위 키를 가진 객체만 매칭합니다.
//!
//! ```yaml
//! event_type: json
//! name: audit
//! params:
//!   require_key: actor
//! ```

use serde::{Deserialize, Serialize};

use shoal_core::error::ClassifyError;
use shoal_core::{EventTypeMatcher, RawMessage, TypedEvent};

use crate::manifest::{EventTypeManifest, decode_params};

/// 레지스트리 종류 이름
pub const KIND: &str = "json";

/// JSON 객체 이벤트
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct JsonEvent(pub serde_json::Map<String, serde_json::Value>);

impl JsonEvent {
    /// 최상위 필드를 조회합니다.
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.0.get(key)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct JsonParams {
    #[serde(default)]
    require_key: Option<String>,
}

/// JSON 객체 매처
pub struct JsonMatcher {
    name: String,
    require_key: Option<String>,
}

impl JsonMatcher {
    /// `json` 이름으로 매처를 생성합니다.
    pub fn new() -> Self {
        Self {
            name: KIND.to_owned(),
            require_key: None,
        }
    }

    /// 이벤트 타입 이름을 지정합니다.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// 지정한 최상위 키를 가진 객체만 매칭합니다.
    pub fn with_required_key(mut self, key: impl Into<String>) -> Self {
        self.require_key = Some(key.into());
        self
    }

    fn parse(&self, data: &[u8]) -> Option<serde_json::Map<String, serde_json::Value>> {
        let first = data.iter().find(|b| !b.is_ascii_whitespace())?;
        if *first != b'{' {
            return None;
        }
        let object: serde_json::Map<String, serde_json::Value> =
            serde_json::from_slice(data).ok()?;
        match &self.require_key {
            Some(key) if !object.contains_key(key) => None,
            _ => Some(object),
        }
    }
}

impl Default for JsonMatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl EventTypeMatcher for JsonMatcher {
    fn name(&self) -> &str {
        &self.name
    }

    fn matches(&self, data: &[u8]) -> bool {
        self.parse(data).is_some()
    }

    fn build(&self, raw: &RawMessage) -> Result<TypedEvent, ClassifyError> {
        let object = self.parse(raw.as_bytes()).ok_or_else(|| ClassifyError::Build {
            event_type: self.name.clone(),
            reason: "not a matching JSON object".to_owned(),
        })?;
        Ok(TypedEvent::from_raw(&self.name, raw, JsonEvent(object)))
    }
}

pub(crate) fn factory(
    manifest: &EventTypeManifest,
) -> Result<Box<dyn EventTypeMatcher>, ClassifyError> {
    let params: JsonParams =
        decode_params(&manifest.params).map_err(|e| ClassifyError::InvalidParams {
            kind: KIND.to_owned(),
            reason: e.to_string(),
        })?;
    let mut matcher = JsonMatcher::new().with_name(manifest.instance_name());
    if let Some(key) = params.require_key {
        matcher = matcher.with_required_key(key);
    }
    Ok(Box::new(matcher))
}
