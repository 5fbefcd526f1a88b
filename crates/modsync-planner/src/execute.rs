use modsync_core::{ComponentRegistry, StagedPackage};
use tracing::{debug, info};

use crate::classify::prepare_candidates;
use crate::error::{ExecutionFailure, PlanError};
use crate::operation::{Operation, OperationBag, OperationKind};
use crate::plan::build_plan;
use crate::schedule::extract_next;

/// Plans and applies a bundle's packages, returning one line per operation.
///
/// Nothing is rolled back on failure; the lines already produced come back
/// inside the [`ExecutionFailure`].
pub fn plan_and_execute<R>(
    packages: Vec<StagedPackage>,
    registry: &mut R,
) -> Result<Vec<String>, ExecutionFailure>
where
    R: ComponentRegistry + ?Sized,
{
    let abort = |error| ExecutionFailure {
        log: Vec::new(),
        error,
    };
    let candidates = prepare_candidates(packages, &*registry).map_err(abort)?;
    let bag = build_plan(candidates, &*registry).map_err(abort)?;
    debug!(operations = bag.len(), "built operation plan");
    execute_plan(bag, registry)
}

pub fn execute_plan<R>(mut bag: OperationBag, registry: &mut R) -> Result<Vec<String>, ExecutionFailure>
where
    R: ComponentRegistry + ?Sized,
{
    let mut log = Vec::new();
    loop {
        let step = extract_next(&mut bag, &*registry).and_then(|next| match next {
            Some(operation) => execute_operation(operation, registry, &mut bag).map(Some),
            None => Ok(None),
        });
        match step {
            Ok(Some(line)) => {
                info!("{line}");
                log.push(line);
            }
            Ok(None) => return Ok(log),
            Err(error) => return Err(ExecutionFailure { log, error }),
        }
    }
}

fn execute_operation<R>(
    operation: Operation,
    registry: &mut R,
    bag: &mut OperationBag,
) -> Result<String, PlanError>
where
    R: ComponentRegistry + ?Sized,
{
    match operation {
        Operation::Skip(candidate) => Ok(format!(
            "Skipped {} because {}",
            candidate.original_filename,
            candidate.skip_reason().unwrap_or("it was not selected")
        )),
        Operation::Stop(component) => {
            registry
                .stop(&component.id, false)
                .map_err(PlanError::Registry)?;
            Ok(format!("Stopped {} version {}", component.id, component.version))
        }
        Operation::Remove(component) => {
            registry
                .uninstall(&component.id)
                .map_err(PlanError::Registry)?;
            Ok(format!("Removed {} version {}", component.id, component.version))
        }
        Operation::Install(candidate) => {
            let filename = candidate.original_filename.clone();
            let installed = registry
                .install(candidate.into_package())
                .map_err(|cause| PlanError::Install { filename, cause })?;
            if !bag.has_pending(OperationKind::Start, &installed.id) {
                bag.push(Operation::Start(installed.clone()));
            }
            Ok(format!("Installed {} version {}", installed.id, installed.version))
        }
        Operation::Start(component) => {
            let started = registry
                .start(&component.id)
                .map_err(PlanError::Registry)?;
            if let Some(cause) = started.start_failure {
                return Err(PlanError::StartFailure {
                    id: started.id,
                    cause,
                });
            }
            if !started.running {
                return Err(PlanError::StartFailure {
                    id: started.id,
                    cause: "the registry did not report it running".to_string(),
                });
            }
            Ok(format!("Started {} version {}", started.id, started.version))
        }
    }
}
