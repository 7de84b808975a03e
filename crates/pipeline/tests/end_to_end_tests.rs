//! 종단 간 통합 테스트 -- 파일 입력, 매니페스트 디렉토리, 파일 출력

use std::collections::BTreeSet;
use std::fs;

use shoal_pipeline::{
    EventClassifier, EventTypeRegistry, FileInput, FileOutput, PipelineConfig,
    PipelineConfigBuilder, RulePipelineBuilder,
};

fn write(dir: &std::path::Path, name: &str, contents: &str) {
    fs::write(dir.join(name), contents).unwrap();
}

/// 입력 ["a","bb","c"], 길이 1 규칙 -> 출력 {a, c}
#[tokio::test]
async fn length_rule_end_to_end() {
    let root = tempfile::tempdir().unwrap();
    let rules = root.path().join("rules");
    let event_types = root.path().join("event-types");
    fs::create_dir_all(&rules).unwrap();
    fs::create_dir_all(&event_types).unwrap();

    write(&rules, "length.yml", "rule: length\nparams:\n  length: 1\n");
    write(&event_types, "example.yml", "event_type: example\n");
    let input_path = root.path().join("input.log");
    let output_path = root.path().join("output.jsonl");
    fs::write(&input_path, "a\nbb\nc\n").unwrap();

    let config = PipelineConfigBuilder::new()
        .rule_dir(rules.display().to_string())
        .build()
        .unwrap();
    let classifier = EventClassifier::load_directory(&event_types, &EventTypeRegistry::with_builtins())
        .await
        .unwrap();

    let (mut pipeline, rx) = RulePipelineBuilder::new()
        .config(config)
        .classifier(classifier)
        .input(Box::new(FileInput::new(&input_path)))
        .output(Box::new(FileOutput::create(&output_path).await.unwrap()))
        .build()
        .unwrap();
    assert!(rx.is_none());

    let summary = pipeline.run().await.unwrap();
    assert_eq!(summary.records_written, 2);
    assert!(summary.output_error.is_none());

    let written: BTreeSet<String> = fs::read_to_string(&output_path)
        .unwrap()
        .lines()
        .map(|line| {
            let record: serde_json::Value = serde_json::from_str(line).unwrap();
            assert_eq!(record["event_type"], "example");
            record["payload"]["Str"].as_str().unwrap().to_owned()
        })
        .collect();
    assert_eq!(written, BTreeSet::from(["a".to_owned(), "c".to_owned()]));
}

/// 파라미터 검증에 실패한 매니페스트는 제외되고 이후 매니페스트 로딩을 막지 않음
#[tokio::test]
async fn rejected_manifest_does_not_stall_discovery() {
    let rules = tempfile::tempdir().unwrap();
    write(rules.path(), "10-bad.yml", "rule: length\nname: bad\nparams:\n  length: many\n");
    write(rules.path(), "20-unknown.yml", "rule: no_such_rule\n");
    write(rules.path(), "30-good.yml", "rule: length\nname: good\n");

    let config = PipelineConfig {
        rule_dir: Some(rules.path().display().to_string()),
        ..Default::default()
    };
    let (mut pipeline, rx) = RulePipelineBuilder::new()
        .config(config)
        .input(Box::new(shoal_pipeline::ChannelInput::preloaded(["x", "yy"])))
        .build()
        .unwrap();
    let mut rx = rx.unwrap();

    let summary = pipeline.run().await.unwrap();
    assert_eq!(summary.rules_skipped, 2);
    let names: Vec<&str> = summary.rules.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["good"]);

    let mut outputs = 0;
    while rx.recv().await.is_some() {
        outputs += 1;
    }
    assert_eq!(outputs, 1);
}

/// certstream 이벤트와 도메인 규칙
#[tokio::test]
async fn certstream_domain_rule_end_to_end() {
    let rules = tempfile::tempdir().unwrap();
    write(rules.path(), "domain.yml", "rule: domain_cert_issued\n");

    let lines = [
        r#"{"message_type":"heartbeat","timestamp":1700000000.0}"#,
        r#"{"message_type":"certificate_update","data":{"leaf_cert":{"all_domains":["www.example.com"]},"cert_index":7,"seen":1700000000.0,"source":{"name":"Argon"}}}"#,
        r#"{"message_type":"certificate_update","data":{"leaf_cert":{"all_domains":["mail.example.com"]},"cert_index":8,"seen":1700000001.0,"source":{"name":"Argon"}}}"#,
    ];

    let classifier = EventClassifier::new()
        .register(Box::new(shoal_pipeline::classifier::CertStreamMatcher::new()));
    let (mut pipeline, rx) = RulePipelineBuilder::new()
        .config(PipelineConfig {
            rule_dir: Some(rules.path().display().to_string()),
            ..Default::default()
        })
        .classifier(classifier)
        .input(Box::new(shoal_pipeline::ChannelInput::preloaded(lines)))
        .build()
        .unwrap();
    let mut rx = rx.unwrap();

    pipeline.run().await.unwrap();

    let mut ids = Vec::new();
    while let Some(output) = rx.recv().await {
        let event = output.as_output().unwrap();
        assert_eq!(event.name, "DomainNameSeenInCertificate");
        assert_eq!(event.entity, "Argon");
        ids.push(event.event_id.clone());
    }
    assert_eq!(ids, vec!["7"]);
}
