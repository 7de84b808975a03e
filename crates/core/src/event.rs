//! 이벤트 시스템 — 파이프라인을 흐르는 메시지 단위
//!
//! ```text
//! Input --RawMessage--> Classifier --TypedEvent--> Rule --RuleOutput--> Output
//! ```
//!
//! - [`RawMessage`]: 입력 어댑터가 생성하는 구조 없는 바이트
//! - [`TypedEvent`]: 분류기가 의미 타입을 부여한 이벤트. 파이프라인은 페이로드를 들여다보지 않고
//!   라우팅만 합니다.
//! - [`OutputEvent`]: 규칙이 생성하는 정규화된 결과 레코드
//! - [`RuleOutput`]: 공유 출력 큐의 원소

use std::any::Any;
use std::fmt;
use std::sync::Arc;
use std::time::SystemTime;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::ser::{Error as _, SerializeStruct};
use serde::{Deserialize, Serialize, Serializer};

use crate::types::Level;

/// 입력 어댑터가 수집한 원시 메시지
#[derive(Debug, Clone)]
pub struct RawMessage {
    /// 원시 바이트
    pub data: Bytes,
    /// 수집 소스 식별자 (예: "file:/var/log/certs.log", "stdin")
    pub source: String,
    /// 수집 시각
    pub received_at: SystemTime,
}

impl RawMessage {
    /// 새 RawMessage를 생성합니다.
    pub fn new(data: impl Into<Bytes>, source: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            source: source.into(),
            received_at: SystemTime::now(),
        }
    }

    /// 원시 바이트 슬라이스를 반환합니다.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// 바이트 길이
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// 빈 메시지인지 확인합니다.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// 타입 이벤트의 페이로드
///
/// `Serialize + Debug + Send + Sync + 'static`인 모든 타입은 자동으로 구현됩니다.
/// 규칙은 [`TypedEvent::downcast_ref`]로 구체 타입을 복원합니다.
pub trait EventPayload: Any + Send + Sync + fmt::Debug {
    /// 다운캐스트용 `Any` 참조
    fn as_any(&self) -> &dyn Any;

    /// 출력 싱크로 내보내기 위한 JSON 표현
    fn to_json(&self) -> Result<serde_json::Value, serde_json::Error>;
}

impl<T> EventPayload for T
where
    T: Any + Send + Sync + fmt::Debug + Serialize,
{
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn to_json(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}

/// 의미 타입이 부여된 이벤트
///
/// 페이로드는 `Arc`로 공유되므로 모든 규칙에 브로드캐스트할 때 복제 비용이 작습니다.
#[derive(Clone)]
pub struct TypedEvent {
    id: String,
    event_type: String,
    source: String,
    received_at: SystemTime,
    payload: Arc<dyn EventPayload>,
}

impl TypedEvent {
    /// 원시 메시지 없이 이벤트를 생성합니다.
    pub fn new<T: EventPayload>(event_type: impl Into<String>, payload: T) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            event_type: event_type.into(),
            source: String::new(),
            received_at: SystemTime::now(),
            payload: Arc::new(payload),
        }
    }

    /// 원시 메시지의 소스와 수집 시각을 이어받아 이벤트를 생성합니다.
    pub fn from_raw<T: EventPayload>(
        event_type: impl Into<String>,
        raw: &RawMessage,
        payload: T,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            event_type: event_type.into(),
            source: raw.source.clone(),
            received_at: raw.received_at,
            payload: Arc::new(payload),
        }
    }

    /// 이벤트 고유 ID (UUID v4)
    pub fn id(&self) -> &str {
        &self.id
    }

    /// 이벤트 타입명
    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    /// 원시 메시지의 수집 소스
    pub fn source(&self) -> &str {
        &self.source
    }

    /// 원시 메시지 수집 시각
    pub fn received_at(&self) -> SystemTime {
        self.received_at
    }

    /// 페이로드를 구체 타입으로 다운캐스트합니다.
    ///
    /// 타입이 다르면 `None`을 반환합니다.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        (*self.payload).as_any().downcast_ref::<T>()
    }

    /// 페이로드가 `T` 타입인지 확인합니다.
    pub fn is<T: Any>(&self) -> bool {
        self.downcast_ref::<T>().is_some()
    }

    /// 페이로드의 JSON 표현을 반환합니다.
    pub fn payload_json(&self) -> Result<serde_json::Value, serde_json::Error> {
        self.payload.to_json()
    }
}

impl fmt::Debug for TypedEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypedEvent")
            .field("id", &self.id)
            .field("event_type", &self.event_type)
            .field("source", &self.source)
            .field("payload", &self.payload)
            .finish()
    }
}

impl fmt::Display for TypedEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "TypedEvent[{}] type={} source={}",
            &self.id[..8.min(self.id.len())],
            self.event_type,
            self.source,
        )
    }
}

impl Serialize for TypedEvent {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let payload = self.payload.to_json().map_err(S::Error::custom)?;
        let mut state = serializer.serialize_struct("TypedEvent", 4)?;
        state.serialize_field("id", &self.id)?;
        state.serialize_field("event_type", &self.event_type)?;
        state.serialize_field("source", &self.source)?;
        state.serialize_field("payload", &payload)?;
        state.end()
    }
}

/// 정규화된 결과 레코드
///
/// 규칙의 이벤트 처리 경로 또는 윈도우 플러시 경로에서 생성되며, 생성 후 불변입니다.
/// JSON 필드명은 `Source`, `EventTime`, `EventType`, `Name`, `Level`, `EventId`, `Entity`입니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct OutputEvent {
    /// 결과를 만든 데이터 출처 (예: "CertStream")
    pub source: String,
    /// 이벤트 발생 시각
    pub event_time: DateTime<Utc>,
    /// 원본 이벤트 타입
    pub event_type: String,
    /// 결과 이름 (예: "DomainNameSeenInCertificate")
    pub name: String,
    /// 레벨
    pub level: Level,
    /// 이벤트 ID
    pub event_id: String,
    /// 관련 엔티티
    pub entity: String,
}

impl OutputEvent {
    /// 현재 시각과 새 UUID로 결과 레코드를 생성합니다.
    pub fn new(source: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            event_time: Utc::now(),
            event_type: String::new(),
            name: name.into(),
            level: Level::Info,
            event_id: uuid::Uuid::new_v4().to_string(),
            entity: String::new(),
        }
    }

    /// 이벤트 발생 시각을 설정합니다.
    pub fn with_event_time(mut self, event_time: DateTime<Utc>) -> Self {
        self.event_time = event_time;
        self
    }

    /// 이벤트 타입을 설정합니다.
    pub fn with_event_type(mut self, event_type: impl Into<String>) -> Self {
        self.event_type = event_type.into();
        self
    }

    /// 레벨을 설정합니다.
    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// 이벤트 ID를 설정합니다.
    pub fn with_event_id(mut self, event_id: impl Into<String>) -> Self {
        self.event_id = event_id.into();
        self
    }

    /// 엔티티를 설정합니다.
    pub fn with_entity(mut self, entity: impl Into<String>) -> Self {
        self.entity = entity.into();
        self
    }
}

impl fmt::Display for OutputEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} {} entity={} ({})",
            self.level, self.source, self.name, self.entity, self.event_id,
        )
    }
}

/// 공유 출력 큐의 원소
///
/// 필터형 규칙은 받은 이벤트를 그대로 통과시키고([`RuleOutput::Passthrough`]),
/// 탐지형 규칙과 윈도우 플러시는 정규화된 레코드([`RuleOutput::Output`])를 내보냅니다.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum RuleOutput {
    /// 규칙이 통과시키거나 파생한 타입 이벤트
    Passthrough(TypedEvent),
    /// 정규화된 결과 레코드
    Output(OutputEvent),
}

impl RuleOutput {
    /// 결과 레코드이면 참조를 반환합니다.
    pub fn as_output(&self) -> Option<&OutputEvent> {
        match self {
            Self::Output(event) => Some(event),
            Self::Passthrough(_) => None,
        }
    }

    /// 통과 이벤트이면 참조를 반환합니다.
    pub fn as_event(&self) -> Option<&TypedEvent> {
        match self {
            Self::Passthrough(event) => Some(event),
            Self::Output(_) => None,
        }
    }
}

impl From<OutputEvent> for RuleOutput {
    fn from(event: OutputEvent) -> Self {
        Self::Output(event)
    }
}

impl From<TypedEvent> for RuleOutput {
    fn from(event: TypedEvent) -> Self {
        Self::Passthrough(event)
    }
}

impl fmt::Display for RuleOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Passthrough(event) => event.fmt(f),
            Self::Output(event) => event.fmt(f),
        }
    }
}
