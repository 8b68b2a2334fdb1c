//! Carga del documento JSON y conversión a definición.

use relay_adapters::document;
use relay_adapters::DocumentError;
use relay_core::{validate, ActionKind};

const TERRAFORM_PIPELINE: &str = r#"{
  "name": "terraform-release",
  "stages": [
    {
      "name": "Source",
      "actions": [
        { "name": "fetch", "kind": "source", "outputs": ["code"],
          "config": { "repository": "terraform-code", "branch": "main" } }
      ]
    },
    {
      "name": "Scan",
      "actions": [
        { "name": "tfsec", "kind": "build", "inputs": ["code"],
          "namespace": "TFSEC",
          "output_variables": ["BuildID", "BuildTag", "Region", "checks_failed"] }
      ]
    },
    {
      "name": "Terraform",
      "actions": [
        { "name": "security-review", "kind": "approval", "run_order": 1,
          "summary": "tfsec errors found: #{TFSEC.checks_failed}",
          "external_link": "https://#{TFSEC.Region}.console.example.com/#{TFSEC.BuildID}" },
        { "name": "plan", "kind": "build", "run_order": 2, "inputs": ["code"],
          "namespace": "TERRAFORM", "output_variables": ["BuildID", "BuildTag", "Region"] },
        { "name": "plan-review", "kind": "approval", "run_order": 3,
          "summary": "Terraform plan review" },
        { "name": "apply", "kind": "deploy", "run_order": 4, "inputs": ["code"] }
      ]
    }
  ]
}"#;

#[test]
fn loads_the_release_pipeline_document() {
    let definition = document::from_str(TERRAFORM_PIPELINE).expect("document should parse");
    assert_eq!(definition.name, "terraform-release");
    assert_eq!(definition.stages.len(), 3);
    assert_eq!(definition.action_count(), 6);
    validate(&definition).expect("parsed definition should validate");

    let tfsec = &definition.stages[1].actions[0];
    assert_eq!(tfsec.kind, ActionKind::Build);
    assert_eq!(tfsec.namespace.as_deref(), Some("TFSEC"));
    assert_eq!(tfsec.output_variables.len(), 4);

    let terraform = &definition.stages[2];
    let orders: Vec<u32> = terraform.actions.iter().map(|a| a.run_order).collect();
    assert_eq!(orders, vec![1, 2, 3, 4]);
}

#[test]
fn run_order_defaults_to_one() {
    let doc = r#"{"name": "p", "stages": [
        {"name": "Build", "actions": [{"name": "compile", "kind": "build"}]}
    ]}"#;
    let definition = document::from_str(doc).unwrap();
    assert_eq!(definition.stages[0].actions[0].run_order, 1);
}

#[test]
fn unknown_kind_is_a_load_error() {
    let doc = r#"{"name": "p", "stages": [
        {"name": "Build", "actions": [{"name": "x", "kind": "terraform"}]}
    ]}"#;
    let err = document::from_str(doc).unwrap_err();
    assert!(matches!(err, DocumentError::UnknownKind(kind) if kind == "terraform"));
}

#[test]
fn malformed_json_is_a_load_error() {
    assert!(matches!(document::from_str("{not json"), Err(DocumentError::Json(_))));
}

#[test]
fn missing_file_reports_the_path() {
    let err = document::from_path(std::path::Path::new("/no/such/pipeline.json")).unwrap_err();
    assert!(matches!(err, DocumentError::Io { path, .. } if path.contains("pipeline.json")));
}
