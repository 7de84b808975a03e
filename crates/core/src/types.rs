//! 도메인 타입 — 시스템 전역에서 사용되는 공통 열거형

use std::fmt;

use serde::{Deserialize, Serialize};

/// 결과 레코드 레벨
///
/// [`OutputEvent`](crate::event::OutputEvent)의 중요도를 나타냅니다.
/// `Ord` 구현으로 비교가 가능합니다 (`Info < Warning < Critical`).
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Level {
    /// 정보성 결과
    #[default]
    Info,
    /// 주의가 필요한 결과
    Warning,
    /// 치명적 — 즉시 대응 필요
    Critical,
}

impl Level {
    /// 문자열에서 레벨을 파싱합니다.
    ///
    /// 대소문자를 구분하지 않습니다.
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "info" | "informational" => Some(Self::Info),
            "warn" | "warning" => Some(Self::Warning),
            "critical" | "crit" => Some(Self::Critical),
            _ => None,
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "Info"),
            Self::Warning => write!(f, "Warning"),
            Self::Critical => write!(f, "Critical"),
        }
    }
}
