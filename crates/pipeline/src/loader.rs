//! 규칙 로더 -- 규칙 디렉토리의 매니페스트를 스캔하여 규칙을 생성합니다.
//!
//! 개별 매니페스트 실패(읽기/파싱 실패, 미등록 종류, 파라미터 거부, 이름 중복)는
//! 경고 로그를 남기고 건너뛰며 다음 파일을 계속 처리합니다.
//! 디렉토리 자체를 읽을 수 없는 경우만 치명적 에러입니다.

use std::collections::HashSet;
use std::path::Path;

use shoal_core::Rule;
use shoal_core::metrics as m;

use crate::error::RulePipelineError;
use crate::manifest::{RuleManifest, list_manifests, read_manifest};
use crate::registry::RuleRegistry;

/// 디렉토리당 최대 규칙 수
pub const MAX_RULES_COUNT: usize = 1_000;

/// 건너뛴 매니페스트
#[derive(Debug, Clone)]
pub struct SkippedManifest {
    /// 매니페스트 파일 경로
    pub path: String,
    /// 건너뛴 사유
    pub reason: String,
}

/// 디렉토리 로딩 결과
#[derive(Default)]
pub struct LoadReport {
    /// 발견 순서대로 생성된 규칙
    pub rules: Vec<Box<dyn Rule>>,
    /// 건너뛴 매니페스트
    pub skipped: Vec<SkippedManifest>,
}

impl LoadReport {
    /// 로드된 규칙 이름 (발견 순서)
    pub fn rule_names(&self) -> Vec<&str> {
        self.rules.iter().map(|r| r.name()).collect()
    }
}

impl std::fmt::Debug for LoadReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadReport")
            .field("rules", &self.rule_names())
            .field("skipped", &self.skipped)
            .finish()
    }
}

/// 규칙 디렉토리 로더
pub struct RuleLoader;

impl RuleLoader {
    /// 디렉토리에서 모든 규칙 매니페스트를 로드합니다.
    ///
    /// `.yml` 또는 `.yaml` 확장자를 가진 파일만 파일 이름 순으로 처리합니다.
    ///
    /// # Errors
    /// - 디렉토리를 읽을 수 없는 경우
    /// - 규칙 수가 [`MAX_RULES_COUNT`]를 초과하는 경우
    pub async fn load_directory(
        dir: impl AsRef<Path>,
        registry: &RuleRegistry,
    ) -> Result<LoadReport, RulePipelineError> {
        let dir = dir.as_ref();

        let paths = list_manifests(dir)
            .await
            .map_err(|e| RulePipelineError::RuleLoad {
                path: dir.display().to_string(),
                reason: format!("failed to read directory: {e}"),
            })?;

        let mut report = LoadReport::default();
        let mut seen_names = HashSet::new();

        for path in paths {
            let path_str = path.display().to_string();

            let manifest: RuleManifest = match read_manifest(&path).await {
                Ok(manifest) => manifest,
                Err(e) => {
                    Self::skip(&mut report, path_str, e.to_string());
                    continue;
                }
            };

            let rule = match registry.create(&manifest) {
                Ok(rule) => rule,
                Err(e) => {
                    Self::skip(&mut report, path_str, e.to_string());
                    continue;
                }
            };

            if !seen_names.insert(rule.name().to_owned()) {
                let reason = format!("duplicate rule name '{}'", rule.name());
                Self::skip(&mut report, path_str, reason);
                continue;
            }

            tracing::debug!(
                rule = %rule.name(),
                kind = %manifest.rule,
                path = %path_str,
                "loaded rule manifest"
            );
            report.rules.push(rule);

            if report.rules.len() > MAX_RULES_COUNT {
                return Err(RulePipelineError::RuleLoad {
                    path: dir.display().to_string(),
                    reason: format!("too many rules: max {MAX_RULES_COUNT}"),
                });
            }
        }

        tracing::info!(
            dir = %dir.display(),
            count = report.rules.len(),
            skipped = report.skipped.len(),
            "loaded rules"
        );

        Ok(report)
    }

    fn skip(report: &mut LoadReport, path: String, reason: String) {
        tracing::warn!(path = %path, reason = %reason, "skipping rule manifest");
        metrics::counter!(m::PIPELINE_RULES_SKIPPED_TOTAL).increment(1);
        report.skipped.push(SkippedManifest { path, reason });
    }
}
