//! CLI mínima: `relay validate --file p.json` y `relay simulate --file
//! p.json [--auto-approve|--auto-reject] [--approve-delay-ms N]`.
//!
//! `simulate` ejecuta el pipeline contra el provider guionable en modo
//! síntesis (cada acción produce sus outputs declarados), con las
//! aprobaciones entregadas por consola salvo que se pida resolución
//! automática. Códigos de salida: 0 ok, 1 run fallido, 2 uso, 3 documento
//! ilegible, 4 definición inválida, 5 fallo interno.

use std::path::Path;
use std::sync::Arc;

use relay_adapters::{document, AutoApprover, ConsoleApprovals, ScriptedProvider};
use relay_core::{validate, ActionStatus, CancelToken, PipelineDefinition, PipelineEngine, RunError};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

fn usage() -> ! {
    eprintln!("usage: relay <validate|simulate> --file <pipeline.json> [options]");
    eprintln!();
    eprintln!("  validate --file <pipeline.json>");
    eprintln!("  simulate --file <pipeline.json> [--auto-approve | --auto-reject] [--approve-delay-ms <N>]");
    std::process::exit(2);
}

fn load(file: Option<&str>) -> PipelineDefinition {
    let Some(path) = file else { usage() };
    let definition = match document::from_path(Path::new(path)) {
        Ok(d) => d,
        Err(e) => {
            eprintln!("[relay] {e}");
            std::process::exit(3);
        }
    };
    if let Err(e) = validate(&definition) {
        eprintln!("[relay] invalid definition: {e}");
        std::process::exit(4);
    }
    definition
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("relay=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        usage();
    }

    let mut file: Option<String> = None;
    let mut auto_approve = false;
    let mut auto_reject = false;
    let mut approve_delay_ms: u64 = 0;
    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            "--file" => {
                i += 1;
                if i < args.len() {
                    file = Some(args[i].clone());
                }
            }
            "--auto-approve" => auto_approve = true,
            "--auto-reject" => auto_reject = true,
            "--approve-delay-ms" => {
                i += 1;
                if i < args.len() {
                    approve_delay_ms = args[i].parse().unwrap_or(0);
                }
            }
            _ => usage(),
        }
        i += 1;
    }

    match args[1].as_str() {
        "validate" => {
            let definition = load(file.as_deref());
            println!("ok: {} ({} stages, {} actions)",
                     definition.name,
                     definition.stages.len(),
                     definition.action_count());
        }
        "simulate" => {
            let definition = load(file.as_deref());
            let engine = PipelineEngine::builder(Arc::new(ScriptedProvider::new()))
                .config(relay_core::EngineConfig::from_env())
                .build();

            let approver = if auto_approve {
                AutoApprover::approve_all(engine.approval_gate()).delay_ms(approve_delay_ms)
                                                                 .spawn()
            } else if auto_reject {
                AutoApprover::reject_all(engine.approval_gate()).delay_ms(approve_delay_ms)
                                                                .spawn()
            } else {
                ConsoleApprovals::new(engine.approval_gate()).spawn()
            };

            let run_id = Uuid::new_v4();
            println!("run {run_id}: {}", definition.name);
            let report = match engine.run_with(run_id, &definition, CancelToken::new()).await {
                Ok(report) => report,
                Err(RunError::Definition(e)) => {
                    eprintln!("[relay] invalid definition: {e}");
                    std::process::exit(4);
                }
                Err(RunError::Fault(fault)) => {
                    eprintln!("[relay] run halted on invariant violation: {fault}");
                    std::process::exit(5);
                }
            };
            approver.abort();

            for record in &report.records {
                let status = match record.status {
                    ActionStatus::Pending => "pending",
                    ActionStatus::Running => "running",
                    ActionStatus::Succeeded => "ok",
                    ActionStatus::Failed => "failed",
                    ActionStatus::Cancelled => "cancelled",
                };
                match &record.error {
                    Some(error) => println!("{status:>9}  {}/{} ({error})", record.stage, record.action),
                    None => println!("{status:>9}  {}/{}", record.stage, record.action),
                }
            }
            println!("run {run_id} finished: {:?}", report.status);
            if !report.succeeded() {
                std::process::exit(1);
            }
        }
        _ => usage(),
    }
}
