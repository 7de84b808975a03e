//! 규칙 레지스트리 -- 규칙 종류 이름과 생성 함수의 매핑
//!
//! 규칙 구현체는 정적으로 링크되고 종류(kind) 이름으로 등록됩니다.
//! 매니페스트의 `rule` 키가 등록된 종류를 가리키면 해당 팩토리가 파라미터를 검증하고
//! 규칙 인스턴스를 생성합니다.

use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};

use shoal_core::Rule;
use shoal_core::error::RuleError;

use crate::instance::panic_message;
use crate::manifest::RuleManifest;

/// 규칙 생성 함수
pub type RuleFactory =
    Box<dyn Fn(&RuleManifest) -> Result<Box<dyn Rule>, RuleError> + Send + Sync>;

/// 규칙 종류 레지스트리
#[derive(Default)]
pub struct RuleRegistry {
    factories: HashMap<String, RuleFactory>,
}

impl RuleRegistry {
    /// 빈 레지스트리를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 내장 규칙(`length`, `domain_cert_issued`, `event_count`)이 등록된 레지스트리를 생성합니다.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        crate::rules::register_builtins(&mut registry);
        registry
    }

    /// 규칙 종류를 등록합니다. 같은 이름이 있으면 교체합니다.
    pub fn register<F>(&mut self, kind: impl Into<String>, factory: F)
    where
        F: Fn(&RuleManifest) -> Result<Box<dyn Rule>, RuleError> + Send + Sync + 'static,
    {
        let kind = kind.into();
        if self
            .factories
            .insert(kind.clone(), Box::new(factory))
            .is_some()
        {
            tracing::debug!(kind = %kind, "replaced rule factory");
        }
    }

    /// 등록된 종류 이름 (정렬됨)
    pub fn kinds(&self) -> Vec<&str> {
        let mut kinds: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        kinds.sort_unstable();
        kinds
    }

    /// 매니페스트로부터 규칙을 생성합니다.
    ///
    /// # Errors
    /// - 종류가 등록되지 않은 경우 [`RuleError::UnknownKind`]
    /// - 팩토리가 파라미터를 거부하거나 panic한 경우 [`RuleError::InvalidParams`]
    pub fn create(&self, manifest: &RuleManifest) -> Result<Box<dyn Rule>, RuleError> {
        let factory = self
            .factories
            .get(&manifest.rule)
            .ok_or_else(|| RuleError::UnknownKind(manifest.rule.clone()))?;

        match catch_unwind(AssertUnwindSafe(|| factory(manifest))) {
            Ok(result) => result,
            Err(panic) => Err(RuleError::InvalidParams {
                kind: manifest.rule.clone(),
                reason: format!("factory panicked: {}", panic_message(panic.as_ref())),
            }),
        }
    }
}

impl std::fmt::Debug for RuleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuleRegistry")
            .field("kinds", &self.kinds())
            .finish()
    }
}
