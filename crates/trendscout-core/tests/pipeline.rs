use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tempfile::tempdir;

use trendscout_core::config::PersonaConfig;
use trendscout_core::{
    Agent, Enrichment, FailurePolicy, Orchestrator, PipelineStage, PipelineVariant, RunOutcome,
    ScoutKind, ScoutOutcome, ScoutSet, ScoutStatus, ScriptedModel,
};

struct CannedScout {
    kind: ScoutKind,
    report: &'static str,
}

#[async_trait]
impl Agent for CannedScout {
    type Input = String;
    type Output = ScoutOutcome;

    fn name(&self) -> &'static str {
        "canned_scout"
    }

    fn failure_policy(&self) -> FailurePolicy {
        FailurePolicy::SilentDegrade
    }

    async fn execute(&self, _seed: String) -> trendscout_core::Result<ScoutOutcome> {
        Ok(ScoutOutcome {
            kind: self.kind,
            status: ScoutStatus::Completed {
                queries: 1,
                records: 3,
            },
            report: self.report.to_string(),
        })
    }
}

fn canned_scouts() -> ScoutSet {
    ScoutSet {
        news: Arc::new(CannedScout {
            kind: ScoutKind::News,
            report: "Report A",
        }),
        repository: Arc::new(CannedScout {
            kind: ScoutKind::Repository,
            report: "Report B",
        }),
        preprint: Arc::new(CannedScout {
            kind: ScoutKind::Preprint,
            report: "Report C",
        }),
    }
}

#[tokio::test]
async fn multi_stage_run_persists_verified_report() {
    let model = Arc::new(ScriptedModel::with_responses([
        r#"```json
{"top_trends":[{"rank":1,"trend_name":"X","investment_thesis":"..."}]}
```"#,
        r#"{"startups":[{"name":"Co","summary":"s","rationale":"r"}]}"#,
        r#"{"trends":[],"verification_summary":{"confidence_score":8,"assessment":"Coherent.","potential_blind_spots":["Market timing"]}}"#,
    ]));
    let dir = tempdir().unwrap();
    let output = dir.path().join("final_verified_trends_report.json");
    let orchestrator = Orchestrator::new(
        canned_scouts(),
        Enrichment::for_variant(PipelineVariant::MultiStage, model.clone()),
        PersonaConfig::default(),
        &output,
    );

    let outcome = orchestrator.run().await.unwrap();
    let RunOutcome::Completed {
        output_path, json, ..
    } = &outcome
    else {
        panic!("expected a completed run, got {outcome:?}");
    };
    assert_eq!(output_path, &output);

    let persisted: Value =
        serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
    let keys: Vec<&String> = persisted.as_object().unwrap().keys().collect();
    assert_eq!(keys, vec!["trends", "verification_summary"]);
    assert_eq!(persisted["trends"][0]["startups"][0]["name"], "Co");
    assert_eq!(persisted["trends"][0]["trend_name"], "X");
    assert_eq!(persisted["verification_summary"]["confidence_score"], 8);
    assert_eq!(&std::fs::read_to_string(&output).unwrap(), json);

    let prompts = model.prompts();
    assert_eq!(prompts.len(), 3);
    assert!(prompts[0].contains("Report A\n\n---\n\nReport B\n\n---\n\nReport C"));
    assert!(prompts[1].contains("\"X\""));

    let stages = outcome.trace().stages();
    assert_eq!(
        stages,
        vec![
            "not_started",
            "scouting_news",
            "scouting_repo",
            "scouting_preprint",
            "synthesizing",
            "enriching[0]",
            "verifying",
            "persisted",
        ]
    );
}

#[tokio::test]
async fn unparseable_synthesis_aborts_without_writing() {
    let model = Arc::new(ScriptedModel::with_responses([
        "Top trend: X. Second trend: Y.",
    ]));
    let dir = tempdir().unwrap();
    let output = dir.path().join("final_verified_trends_report.json");
    let orchestrator = Orchestrator::new(
        canned_scouts(),
        Enrichment::for_variant(PipelineVariant::MultiStage, model.clone()),
        PersonaConfig::default(),
        &output,
    );

    let outcome = orchestrator.run().await.unwrap();
    match &outcome {
        RunOutcome::Aborted { stage, reason, .. } => {
            assert_eq!(*stage, PipelineStage::Synthesizing);
            assert!(reason.contains("Top trend: X"));
        }
        other => panic!("expected an aborted run, got {other:?}"),
    }
    assert!(!output.exists());
    assert_eq!(model.prompts().len(), 1);
    assert_eq!(outcome.trace().stages().last().copied(), Some("aborted"));
}

#[tokio::test]
async fn verification_format_failure_still_persists() {
    let model = Arc::new(ScriptedModel::with_responses([
        r#"{"top_trends":[{"rank":1,"trend_name":"X","investment_thesis":"..."}]}"#,
        "no startups come to mind",
        "Verified, all good.",
    ]));
    let dir = tempdir().unwrap();
    let output = dir.path().join("report.json");
    let orchestrator = Orchestrator::new(
        canned_scouts(),
        Enrichment::for_variant(PipelineVariant::MultiStage, model),
        PersonaConfig::default(),
        &output,
    );

    let outcome = orchestrator.run().await.unwrap();
    assert!(matches!(outcome, RunOutcome::Completed { .. }));

    let persisted: Value =
        serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
    assert_eq!(persisted["trends"][0]["startups"], Value::Array(vec![]));
    assert_eq!(
        persisted["verification_summary"]["assessment"],
        "Verification failed due to LLM format error."
    );
    assert_eq!(
        persisted["verification_summary"]["raw_output"],
        "Verified, all good."
    );
}
