//! `domain_cert_issued` 규칙 -- 패턴과 일치하는 도메인의 인증서 발급 탐지
//!
//! CertStream 인증서 갱신 메시지에서 `leaf_cert.all_domains` 중 하나라도
//! 패턴과 일치하면 결과 레코드를 하나 생성합니다. 하트비트는 무시합니다.
//!
//! ```yaml
//! rule: domain_cert_issued
//! params:
//!   pattern: "^www\\..*\\.example\\.com$"
//!   level: warning
//! ```

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::Deserialize;

use shoal_core::error::RuleError;
use shoal_core::{Level, OutputEvent, Rule, RuleOutput, TypedEvent};

use crate::classifier::CertStreamEvent;
use crate::manifest::{RuleManifest, decode_params};

/// 레지스트리 종류 이름
pub const KIND: &str = "domain_cert_issued";

/// 기본 도메인 패턴
pub const DEFAULT_PATTERN: &str = "^www.*";

/// 결과 레코드 소스
pub const OUTPUT_SOURCE: &str = "CertStream";

/// 결과 레코드 이름
pub const OUTPUT_NAME: &str = "DomainNameSeenInCertificate";

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct DomainCertParams {
    pattern: String,
    level: String,
}

impl Default for DomainCertParams {
    fn default() -> Self {
        Self {
            pattern: DEFAULT_PATTERN.to_owned(),
            level: "info".to_owned(),
        }
    }
}

/// 도메인 인증서 발급 탐지 규칙
///
/// 정규식은 `initialize`에서 컴파일됩니다. 컴파일에 실패하면 초기화 에러로
/// 규칙이 제외됩니다.
pub struct DomainCertIssuedRule {
    name: String,
    pattern: String,
    level: Level,
    regex: Option<Regex>,
}

impl DomainCertIssuedRule {
    /// 도메인 패턴으로 규칙을 생성합니다.
    pub fn new(name: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pattern: pattern.into(),
            level: Level::Info,
            regex: None,
        }
    }

    /// 결과 레코드 레벨을 지정합니다.
    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }
}

impl Rule for DomainCertIssuedRule {
    fn name(&self) -> &str {
        &self.name
    }

    fn initialize(&mut self) -> Result<(), RuleError> {
        let regex = Regex::new(&self.pattern).map_err(|e| RuleError::Init {
            rule: self.name.clone(),
            reason: format!("invalid domain pattern '{}': {e}", self.pattern),
        })?;
        self.regex = Some(regex);
        Ok(())
    }

    fn process(&self, event: &TypedEvent) -> Option<RuleOutput> {
        let cert = event.downcast_ref::<CertStreamEvent>()?;
        if cert.is_heartbeat() {
            return None;
        }
        let regex = self.regex.as_ref()?;

        cert.data
            .leaf_cert
            .all_domains
            .iter()
            .find(|domain| regex.is_match(domain))?;

        let event_time =
            DateTime::<Utc>::from_timestamp(cert.data.seen as i64, 0).unwrap_or_else(Utc::now);
        Some(
            OutputEvent::new(OUTPUT_SOURCE, OUTPUT_NAME)
                .with_event_time(event_time)
                .with_event_type(cert.message_type.clone())
                .with_level(self.level)
                .with_event_id(cert.data.cert_index.to_string())
                .with_entity(cert.data.source.name.clone())
                .into(),
        )
    }
}

pub(crate) fn factory(manifest: &RuleManifest) -> Result<Box<dyn Rule>, RuleError> {
    let params: DomainCertParams =
        decode_params(&manifest.params).map_err(|e| super::invalid_params(KIND, e))?;
    let level = Level::from_str_loose(&params.level)
        .ok_or_else(|| super::invalid_params(KIND, format!("unknown level '{}'", params.level)))?;
    Ok(Box::new(
        DomainCertIssuedRule::new(manifest.instance_name(), params.pattern).with_level(level),
    ))
}
