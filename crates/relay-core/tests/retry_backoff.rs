//! Reintento acotado con backoff para errores transitorios del provider.

use std::sync::Arc;

use relay_adapters::{Script, ScriptedProvider};
use relay_core::{ActionError, ActionSpec, CancelToken, EngineConfig, PipelineDefinition, PipelineEngine,
                 RunEventKind, RunStatus, Stage};
use uuid::Uuid;

fn single_build(name: &str) -> PipelineDefinition {
    PipelineDefinition::new("retryable", vec![Stage::new("Build", vec![ActionSpec::build(name)])])
}

#[tokio::test(start_paused = true)]
async fn transient_outage_retries_until_success() {
    let provider = Arc::new(ScriptedProvider::new().script("compile", Script::flaky(2, Script::succeed())));
    let engine = PipelineEngine::builder(provider.clone()).config(EngineConfig { max_retries: 2,
                                                                                 retry_backoff_ms: 50 })
                                                          .build();

    let run_id = Uuid::new_v4();
    let report = engine.run_with(run_id, &single_build("compile"), CancelToken::new())
                       .await
                       .expect("run should complete");
    assert_eq!(report.status, RunStatus::Succeeded);
    assert_eq!(report.record("Build", "compile").unwrap().attempts, 3);
    assert_eq!(provider.invocation_count("compile"), 3);

    // backoff lineal: 50ms tras el primer intento, 100ms tras el segundo
    let delays: Vec<u64> = engine.list_events(run_id)
                                 .iter()
                                 .filter_map(|e| match &e.kind {
                                     RunEventKind::RetryScheduled { delay_ms, .. } => Some(*delay_ms),
                                     _ => None,
                                 })
                                 .collect();
    assert_eq!(delays, vec![50, 100]);
}

#[tokio::test(start_paused = true)]
async fn exhausted_retries_surface_provider_unavailable() {
    let provider = Arc::new(ScriptedProvider::new().script("compile", Script::flaky(5, Script::succeed())));
    let engine = PipelineEngine::builder(provider.clone()).config(EngineConfig { max_retries: 1,
                                                                                 retry_backoff_ms: 10 })
                                                          .build();

    let report = engine.run(&single_build("compile")).await.expect("run should complete");
    assert_eq!(report.status, RunStatus::Failed);
    let record = report.record("Build", "compile").unwrap();
    assert_eq!(record.attempts, 2);
    assert!(matches!(record.error, Some(ActionError::ProviderUnavailable(_))));
    assert_eq!(provider.invocation_count("compile"), 2);
}

#[tokio::test(start_paused = true)]
async fn terminal_errors_are_never_retried() {
    let provider = Arc::new(ScriptedProvider::new()
        .script("fetch", Script::Fail(ActionError::RefNotFound("main".into()))));
    let engine = PipelineEngine::builder(provider.clone()).config(EngineConfig { max_retries: 3,
                                                                                 retry_backoff_ms: 10 })
                                                          .build();
    let definition = PipelineDefinition::new("no-retry",
                                             vec![Stage::new("Source",
                                                             vec![ActionSpec::source("fetch", "code")])]);

    let report = engine.run(&definition).await.expect("run should complete");
    assert_eq!(report.status, RunStatus::Failed);
    assert_eq!(report.record("Source", "fetch").unwrap().attempts, 1);
    assert_eq!(provider.invocation_count("fetch"), 1);
}
