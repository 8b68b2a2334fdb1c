//! Validación fail-fast de la definición.
//!
//! Se ejecuta completa antes de arrancar nada: si algo falla aquí el run no
//! emite ni un evento. El recorrido reproduce el orden real de ejecución
//! (stage a stage, ola a ola) para decidir qué artifacts y namespaces son
//! visibles "estrictamente antes" de cada acción.

use std::collections::{HashMap, HashSet};

use crate::errors::DefinitionError;
use crate::model::{variable, ActionKind, ActionSpec, PipelineDefinition};

use super::scheduler;

pub fn validate(definition: &PipelineDefinition) -> Result<(), DefinitionError> {
    if definition.stages.is_empty() {
        return Err(DefinitionError::EmptyPipeline);
    }

    let mut stage_names: HashSet<&str> = HashSet::new();
    for stage in &definition.stages {
        if !stage_names.insert(&stage.name) {
            return Err(DefinitionError::DuplicateStage(stage.name.clone()));
        }
        let mut action_names: HashSet<&str> = HashSet::new();
        for action in &stage.actions {
            if !action_names.insert(&action.name) {
                return Err(DefinitionError::DuplicateAction { stage: stage.name.clone(),
                                                              action: action.name.clone() });
            }
            if action.run_order < 1 {
                return Err(DefinitionError::InvalidRunOrder { action: action.name.clone(),
                                                              run_order: action.run_order });
            }
            check_shape(action)?;
        }
    }

    // Artifacts y namespaces visibles hasta el punto recorrido. Los outputs
    // de una ola sólo se vuelven visibles al cerrarse la ola.
    let mut produced: HashSet<&str> = HashSet::new();
    let mut namespaces: HashMap<&str, HashSet<&str>> = HashMap::new();
    for stage in &definition.stages {
        for wave in scheduler::order(&stage.actions) {
            for &action in &wave {
                for input in &action.inputs {
                    if !produced.contains(input.as_str()) {
                        return Err(DefinitionError::UnknownArtifact { action: action.name.clone(),
                                                                      artifact: input.clone() });
                    }
                }
                check_tokens(action, &namespaces)?;
            }
            for &action in &wave {
                for output in &action.outputs {
                    if !produced.insert(output.as_str()) {
                        return Err(DefinitionError::DuplicateArtifactName(output.clone()));
                    }
                }
                if let Some(ns) = &action.namespace {
                    let keys = action.output_variables.iter().map(String::as_str).collect();
                    if namespaces.insert(ns.as_str(), keys).is_some() {
                        return Err(DefinitionError::DuplicateNamespace(ns.clone()));
                    }
                }
            }
        }
    }

    Ok(())
}

fn check_shape(action: &ActionSpec) -> Result<(), DefinitionError> {
    match action.kind {
        ActionKind::Source => {
            if !action.inputs.is_empty() || action.outputs.len() != 1 {
                return Err(DefinitionError::SourceShape { action: action.name.clone() });
            }
        }
        ActionKind::ManualApproval => {
            let clean = action.inputs.is_empty()
                        && action.outputs.is_empty()
                        && action.namespace.is_none()
                        && action.output_variables.is_empty();
            if !clean {
                return Err(DefinitionError::ApprovalShape { action: action.name.clone() });
            }
        }
        ActionKind::Build | ActionKind::Deploy => {}
    }
    Ok(())
}

fn check_tokens(action: &ActionSpec, namespaces: &HashMap<&str, HashSet<&str>>) -> Result<(), DefinitionError> {
    let malformed = |token: String| {
        DefinitionError::MalformedToken { action: action.name.clone(),
                                          token }
    };
    let mut refs = variable::extract_refs_value(&action.config).map_err(malformed)?;
    for text in [&action.summary, &action.external_link].into_iter().flatten() {
        refs.extend(variable::extract_refs(text).map_err(malformed)?);
    }

    for r in refs {
        match namespaces.get(r.namespace.as_str()) {
            None => {
                return Err(DefinitionError::UnknownNamespace { action: action.name.clone(),
                                                               namespace: r.namespace });
            }
            Some(keys) if !keys.contains(r.key.as_str()) => {
                return Err(DefinitionError::UnknownVariable { action: action.name.clone(),
                                                              namespace: r.namespace,
                                                              key: r.key });
            }
            Some(_) => {}
        }
    }
    Ok(())
}
