//! 내장 규칙
//!
//! | 종류 | 설명 |
//! |------|------|
//! | `length` | 지정 길이의 [`ExampleEvent`](crate::classifier::ExampleEvent)를 통과시킴 |
//! | `domain_cert_issued` | 패턴과 일치하는 도메인의 인증서 발급을 탐지 |
//! | `event_count` | 윈도우 주기마다 이벤트 타입별 개수를 집계 |

pub mod domain_cert;
pub mod event_count;
pub mod length;

pub use domain_cert::DomainCertIssuedRule;
pub use event_count::EventCountRule;
pub use length::LengthRule;

use shoal_core::error::RuleError;

use crate::registry::RuleRegistry;

/// 내장 규칙 종류를 레지스트리에 등록합니다.
pub fn register_builtins(registry: &mut RuleRegistry) {
    registry.register(length::KIND, length::factory);
    registry.register(domain_cert::KIND, domain_cert::factory);
    registry.register(event_count::KIND, event_count::factory);
}

fn invalid_params(kind: &str, reason: impl std::fmt::Display) -> RuleError {
    RuleError::InvalidParams {
        kind: kind.to_owned(),
        reason: reason.to_string(),
    }
}
