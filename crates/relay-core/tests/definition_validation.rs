//! Validación fail-fast de definiciones: cada regla con su error.

use relay_core::{validate, ActionSpec, DefinitionError, PipelineDefinition, Stage};
use serde_json::json;

fn def(stages: Vec<Stage>) -> PipelineDefinition {
    PipelineDefinition::new("under-test", stages)
}

#[test]
fn accepts_the_full_release_shape() {
    // la forma completa: source -> scan -> [review, plan, plan-review,
    // apply] con run orders 1..4 y namespaces encadenados
    let definition = def(vec![
        Stage::new("Source", vec![ActionSpec::source("fetch", "code")]),
        Stage::new("Scan",
                   vec![ActionSpec::build("tfsec").input("code")
                                                  .namespace("TFSEC")
                                                  .export("checks_failed")
                                                  .export("Region")]),
        Stage::new("Terraform",
                   vec![ActionSpec::approval("security-review")
                            .run_order(1)
                            .summary("tfsec errors found: #{TFSEC.checks_failed}"),
                        ActionSpec::build("plan").run_order(2)
                                                 .input("code")
                                                 .namespace("TERRAFORM")
                                                 .export("BuildID"),
                        ActionSpec::approval("plan-review")
                            .run_order(3)
                            .external_link("https://#{TFSEC.Region}.example.com/#{TERRAFORM.BuildID}"),
                        ActionSpec::deploy("apply").run_order(4).input("code")]),
    ]);
    assert!(validate(&definition).is_ok());
}

#[test]
fn rejects_empty_pipeline() {
    assert!(matches!(validate(&def(vec![])), Err(DefinitionError::EmptyPipeline)));
}

#[test]
fn rejects_duplicate_stage_names() {
    let definition = def(vec![Stage::new("Build", vec![]), Stage::new("Build", vec![])]);
    assert!(matches!(validate(&definition), Err(DefinitionError::DuplicateStage(name)) if name == "Build"));
}

#[test]
fn rejects_duplicate_action_names_within_a_stage() {
    let definition = def(vec![Stage::new("Build",
                                         vec![ActionSpec::build("compile"), ActionSpec::build("compile")])]);
    assert!(matches!(validate(&definition), Err(DefinitionError::DuplicateAction { .. })));
}

#[test]
fn rejects_run_order_zero() {
    let definition = def(vec![Stage::new("Build", vec![ActionSpec::build("compile").run_order(0)])]);
    assert!(matches!(validate(&definition),
                     Err(DefinitionError::InvalidRunOrder { run_order: 0, .. })));
}

#[test]
fn rejects_source_without_exactly_one_output() {
    let no_output = def(vec![Stage::new("Source",
                                        vec![ActionSpec::new("fetch", relay_core::ActionKind::Source)])]);
    assert!(matches!(validate(&no_output), Err(DefinitionError::SourceShape { .. })));

    let with_input = def(vec![Stage::new("Source",
                                         vec![ActionSpec::build("seed").output("seed-art"),
                                              ActionSpec::source("fetch", "code").run_order(2)
                                                                                 .input("seed-art")])]);
    assert!(matches!(validate(&with_input), Err(DefinitionError::SourceShape { .. })));
}

#[test]
fn rejects_approval_with_artifacts_or_variables() {
    let definition = def(vec![Stage::new("Gate", vec![ActionSpec::approval("review").output("x")])]);
    assert!(matches!(validate(&definition), Err(DefinitionError::ApprovalShape { .. })));
}

#[test]
fn rejects_input_never_produced_earlier() {
    let definition = def(vec![Stage::new("Build", vec![ActionSpec::build("compile").input("code")])]);
    assert!(matches!(validate(&definition),
                     Err(DefinitionError::UnknownArtifact { artifact, .. }) if artifact == "code"));
}

#[test]
fn same_wave_output_is_not_visible_as_input() {
    // misma ola = concurrente: el output del vecino no cuenta como
    // "producido estrictamente antes"
    let definition = def(vec![Stage::new("Build",
                                         vec![ActionSpec::build("producer").output("bin"),
                                              ActionSpec::build("consumer").input("bin")])]);
    assert!(matches!(validate(&definition), Err(DefinitionError::UnknownArtifact { .. })));

    // con run orders separados sí es válido
    let sequenced = def(vec![Stage::new("Build",
                                        vec![ActionSpec::build("producer").output("bin"),
                                             ActionSpec::build("consumer").run_order(2).input("bin")])]);
    assert!(validate(&sequenced).is_ok());
}

#[test]
fn rejects_duplicate_artifact_names_across_the_pipeline() {
    let definition = def(vec![Stage::new("A", vec![ActionSpec::source("fetch", "code")]),
                              Stage::new("B", vec![ActionSpec::build("rebuild").output("code")])]);
    assert!(matches!(validate(&definition),
                     Err(DefinitionError::DuplicateArtifactName(name)) if name == "code"));
}

#[test]
fn rejects_duplicate_namespaces() {
    let definition = def(vec![Stage::new("A",
                                         vec![ActionSpec::build("scan1").namespace("SCAN").export("a")]),
                              Stage::new("B",
                                         vec![ActionSpec::build("scan2").namespace("SCAN").export("b")])]);
    assert!(matches!(validate(&definition),
                     Err(DefinitionError::DuplicateNamespace(ns)) if ns == "SCAN"));
}

#[test]
fn rejects_reference_to_unknown_namespace() {
    let definition = def(vec![Stage::new("Apply",
                                         vec![ActionSpec::deploy("apply")
                                                  .config(json!({"id": "#{TFSEC.BuildID}"}))])]);
    assert!(matches!(validate(&definition),
                     Err(DefinitionError::UnknownNamespace { namespace, .. }) if namespace == "TFSEC"));
}

#[test]
fn rejects_reference_to_undeclared_variable_key() {
    let definition = def(vec![Stage::new("Scan",
                                         vec![ActionSpec::build("tfsec").namespace("TFSEC").export("BuildID")]),
                              Stage::new("Apply",
                                         vec![ActionSpec::deploy("apply")
                                                  .config(json!({"n": "#{TFSEC.checks_failed}"}))])]);
    assert!(matches!(validate(&definition),
                     Err(DefinitionError::UnknownVariable { key, .. }) if key == "checks_failed"));
}

#[test]
fn rejects_malformed_tokens() {
    let definition = def(vec![Stage::new("Gate",
                                         vec![ActionSpec::approval("review").summary("left open #{TFSEC.x")])]);
    assert!(matches!(validate(&definition), Err(DefinitionError::MalformedToken { .. })));
}

#[test]
fn namespace_of_the_same_wave_is_not_visible() {
    let definition = def(vec![Stage::new("Mixed",
                                         vec![ActionSpec::build("scan").namespace("SCAN").export("n"),
                                              ActionSpec::build("report").config(json!({"n": "#{SCAN.n}"}))])]);
    assert!(matches!(validate(&definition), Err(DefinitionError::UnknownNamespace { .. })));
}
