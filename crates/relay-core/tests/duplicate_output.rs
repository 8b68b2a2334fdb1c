//! Escrituras duplicadas: violación de invariante, no fallo ordinario.

use std::sync::Arc;

use relay_adapters::{Script, ScriptedProvider};
use relay_core::{ActionError, ActionSpec, InvariantFault, PipelineDefinition, PipelineEngine, RunError,
                 RunStatus, Stage};

#[tokio::test]
async fn duplicate_artifact_write_halts_the_run() {
    // el guion produce dos veces el mismo nombre declarado: el contrato
    // pasa por nombre y la segunda escritura viola el write-once
    let provider = Arc::new(ScriptedProvider::new()
        .script("fetch", Script::succeed().artifact("app", b"a").artifact("app", b"b")));
    let engine = PipelineEngine::builder(provider).build();
    let definition = PipelineDefinition::new("dup-artifact",
                                             vec![Stage::new("Source",
                                                             vec![ActionSpec::source("fetch", "app")])]);

    let err = engine.run(&definition).await.expect_err("run must halt");
    assert!(matches!(err, RunError::Fault(InvariantFault::DuplicateArtifact(name)) if name == "app"));
}

#[tokio::test]
async fn duplicate_variable_write_halts_the_run() {
    let provider = Arc::new(ScriptedProvider::new()
        .script("scan", Script::succeed().variable("checks_failed", "1").variable("checks_failed", "2")));
    let engine = PipelineEngine::builder(provider).build();
    let definition = PipelineDefinition::new(
        "dup-variable",
        vec![Stage::new("Scan",
                        vec![ActionSpec::build("scan").namespace("SCAN").export("checks_failed")])],
    );

    let err = engine.run(&definition).await.expect_err("run must halt");
    assert!(matches!(err,
                     RunError::Fault(InvariantFault::DuplicateVariable { namespace, key })
                     if namespace == "SCAN" && key == "checks_failed"));
}

#[tokio::test]
async fn undeclared_outputs_are_contract_failures_not_faults() {
    // producir un artifact no declarado es un fallo terminal de la acción
    // (con detalle), no una violación de invariante que tumba el run
    let provider = Arc::new(ScriptedProvider::new()
        .script("fetch", Script::succeed().artifact("app", b"a").artifact("extra", b"x")));
    let engine = PipelineEngine::builder(provider).build();
    let definition = PipelineDefinition::new("contract",
                                             vec![Stage::new("Source",
                                                             vec![ActionSpec::source("fetch", "app")])]);

    let report = engine.run(&definition).await.expect("run completes with a failed record");
    assert_eq!(report.status, RunStatus::Failed);
    let fetch = report.record("Source", "fetch").unwrap();
    assert!(matches!(&fetch.error,
                     Some(ActionError::BuildFailed(detail)) if detail.contains("extra")));
}

#[tokio::test]
async fn missing_declared_artifact_is_a_contract_failure() {
    let provider = Arc::new(ScriptedProvider::new().script("fetch", Script::succeed()));
    let engine = PipelineEngine::builder(provider).build();
    let definition = PipelineDefinition::new("short",
                                             vec![Stage::new("Source",
                                                             vec![ActionSpec::source("fetch", "app")])]);

    let report = engine.run(&definition).await.expect("run completes with a failed record");
    assert_eq!(report.status, RunStatus::Failed);
    let fetch = report.record("Source", "fetch").unwrap();
    assert!(matches!(&fetch.error,
                     Some(ActionError::BuildFailed(detail)) if detail.contains("app")));
}
