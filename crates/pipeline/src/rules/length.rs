//! `length` 규칙 -- 지정한 바이트 길이의 문자열 이벤트만 통과시킵니다.
//!
//! ```yaml
//! rule: length
//! name: single-char
//! params:
//!   length: 1
//! ```

use serde::Deserialize;

use shoal_core::error::RuleError;
use shoal_core::{Rule, RuleOutput, TypedEvent};

use crate::classifier::ExampleEvent;
use crate::manifest::{RuleManifest, decode_params};

/// 레지스트리 종류 이름
pub const KIND: &str = "length";

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct LengthParams {
    length: usize,
}

impl Default for LengthParams {
    fn default() -> Self {
        Self { length: 1 }
    }
}

/// 길이 필터 규칙
pub struct LengthRule {
    name: String,
    length: usize,
}

impl LengthRule {
    /// 통과시킬 길이로 규칙을 생성합니다.
    pub fn new(name: impl Into<String>, length: usize) -> Self {
        Self {
            name: name.into(),
            length,
        }
    }
}

impl Rule for LengthRule {
    fn name(&self) -> &str {
        &self.name
    }

    fn initialize(&mut self) -> Result<(), RuleError> {
        Ok(())
    }

    fn process(&self, event: &TypedEvent) -> Option<RuleOutput> {
        let example = event.downcast_ref::<ExampleEvent>()?;
        (example.text.len() == self.length).then(|| RuleOutput::Passthrough(event.clone()))
    }
}

pub(crate) fn factory(manifest: &RuleManifest) -> Result<Box<dyn Rule>, RuleError> {
    let params: LengthParams =
        decode_params(&manifest.params).map_err(|e| super::invalid_params(KIND, e))?;
    Ok(Box::new(LengthRule::new(
        manifest.instance_name(),
        params.length,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn example(text: &str) -> TypedEvent {
        TypedEvent::new(
            "example",
            ExampleEvent {
                text: text.to_owned(),
            },
        )
    }

    #[test]
    fn passes_only_matching_length() {
        let rule = LengthRule::new("length", 1);
        let out = rule.process(&example("a")).unwrap();
        assert_eq!(
            out.as_event()
                .unwrap()
                .downcast_ref::<ExampleEvent>()
                .unwrap()
                .text,
            "a"
        );
        assert!(rule.process(&example("bb")).is_none());
        assert!(rule.process(&example("")).is_none());
    }

    #[test]
    fn ignores_other_event_types() {
        let rule = LengthRule::new("length", 1);
        assert!(rule.process(&TypedEvent::new("other", 1u32)).is_none());
    }

    #[test]
    fn factory_defaults_to_single_byte() {
        let rule = factory(&RuleManifest::new(KIND)).unwrap();
        assert_eq!(rule.name(), "length");
        assert!(rule.process(&example("x")).is_some());
    }

    #[test]
    fn factory_reads_length_param() {
        let manifest = RuleManifest::new(KIND)
            .with_name("pairs")
            .with_params(serde_yaml::from_str("length: 2").unwrap());
        let rule = factory(&manifest).unwrap();
        assert_eq!(rule.name(), "pairs");
        assert!(rule.process(&example("bb")).is_some());
    }

    #[test]
    fn factory_rejects_bad_params() {
        let manifest =
            RuleManifest::new(KIND).with_params(serde_yaml::from_str("length: -1").unwrap());
        assert!(matches!(
            factory(&manifest).err().unwrap(),
            RuleError::InvalidParams { .. }
        ));
    }
}
