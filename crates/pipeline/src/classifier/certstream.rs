//! CertStream 이벤트 타입 -- 인증서 투명성 로그 스트림 메시지
//!
//! `message_type` 필드를 가진 JSON 객체를 매칭합니다.
//! 알려지지 않은 필드는 무시하고, 없는 필드는 기본값으로 채웁니다.

use serde::{Deserialize, Serialize};

use shoal_core::error::ClassifyError;
use shoal_core::{EventTypeMatcher, RawMessage, TypedEvent};

use crate::manifest::EventTypeManifest;

/// 레지스트리 종류 이름
pub const KIND: &str = "certstream";

/// 하트비트 메시지 타입
pub const HEARTBEAT: &str = "heartbeat";

/// CertStream 메시지
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CertStreamEvent {
    /// 메시지 종류 (`certificate_update`, `heartbeat` 등)
    pub message_type: String,
    /// 인증서 데이터
    pub data: CertData,
}

impl CertStreamEvent {
    /// 하트비트 메시지인지 확인합니다.
    pub fn is_heartbeat(&self) -> bool {
        self.message_type == HEARTBEAT
    }
}

/// 인증서 갱신 데이터
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CertData {
    pub update_type: String,
    pub leaf_cert: LeafCert,
    pub cert_index: u64,
    pub cert_link: String,
    /// 로그에서 관측된 시각 (Unix 초, 소수부 포함)
    pub seen: f64,
    pub source: CertSource,
}

/// 리프 인증서
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LeafCert {
    /// SAN을 포함한 모든 도메인
    pub all_domains: Vec<String>,
    pub fingerprint: String,
    pub not_before: Option<f64>,
    pub not_after: Option<f64>,
    pub serial_number: String,
}

/// 인증서를 기록한 CT 로그
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CertSource {
    pub name: String,
    pub url: String,
}

#[derive(Deserialize)]
struct Probe<'a> {
    #[serde(borrow)]
    message_type: std::borrow::Cow<'a, str>,
}

/// CertStream 메시지 매처
pub struct CertStreamMatcher {
    name: String,
}

impl CertStreamMatcher {
    /// `certstream` 이름으로 매처를 생성합니다.
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

impl Default for CertStreamMatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl EventTypeMatcher for CertStreamMatcher {
    fn name(&self) -> &str {
        &self.name
    }

    fn matches(&self, data: &[u8]) -> bool {
        serde_json::from_slice::<Probe<'_>>(data)
            .map(|probe| !probe.message_type.is_empty())
            .unwrap_or(false)
    }

    fn build(&self, raw: &RawMessage) -> Result<TypedEvent, ClassifyError> {
        let event: CertStreamEvent =
            serde_json::from_slice(raw.as_bytes()).map_err(|e| ClassifyError::Build {
                event_type: self.name.clone(),
                reason: e.to_string(),
            })?;
        Ok(TypedEvent::from_raw(&self.name, raw, event))
    }
}

pub(crate) fn factory(
    manifest: &EventTypeManifest,
) -> Result<Box<dyn EventTypeMatcher>, ClassifyError> {
    Ok(Box::new(
        CertStreamMatcher::new().with_name(manifest.instance_name()),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    const UPDATE: &str = r#"{
        "message_type": "certificate_update",
        "data": {
            "update_type": "X509LogEntry",
            "leaf_cert": {"all_domains": ["www.example.com", "example.com"]},
            "cert_index": 42,
            "seen": 1700000000.5,
            "source": {"name": "Google 'Argon2024' log", "url": "ct.googleapis.com/logs/argon2024/"}
        }
    }"#;

    #[test]
    fn builds_certificate_update() {
        let matcher = CertStreamMatcher::new();
        let raw = RawMessage::new(UPDATE.as_bytes().to_vec(), "test");
        assert!(matcher.matches(raw.as_bytes()));

        let event = matcher.build(&raw).unwrap();
        let cert = event.downcast_ref::<CertStreamEvent>().unwrap();
        assert_eq!(cert.message_type, "certificate_update");
        assert_eq!(cert.data.cert_index, 42);
        assert_eq!(cert.data.leaf_cert.all_domains.len(), 2);
        assert_eq!(cert.data.source.name, "Google 'Argon2024' log");
        assert!(!cert.is_heartbeat());
    }

    #[test]
    fn heartbeat_without_data_uses_defaults() {
        let matcher = CertStreamMatcher::new();
        let raw = RawMessage::new(
            &br#"{"message_type":"heartbeat","timestamp":1700000000.0}"#[..],
            "test",
        );
        let event = matcher.build(&raw).unwrap();
        let cert = event.downcast_ref::<CertStreamEvent>().unwrap();
        assert!(cert.is_heartbeat());
        assert!(cert.data.leaf_cert.all_domains.is_empty());
    }

    #[test]
    fn requires_message_type() {
        let matcher = CertStreamMatcher::new();
        assert!(!matcher.matches(br#"{"data":{}}"#));
        assert!(!matcher.matches(br#"{"message_type":""}"#));
        assert!(!matcher.matches(b"www.example.com"));
    }
}
