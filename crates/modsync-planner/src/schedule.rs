use modsync_core::{ComponentRegistry, InstalledComponent};
use tracing::debug;

use crate::error::PlanError;
use crate::operation::{Operation, OperationBag, OperationKind};

/// Removes and returns the next operation that may safely run.
///
/// The lowest-priority verb wins; among equal verbs bag order decides. Starts
/// are only released once every required component is running, scanning all
/// pending starts rather than only the first.
pub fn extract_next<R>(bag: &mut OperationBag, registry: &R) -> Result<Option<Operation>, PlanError>
where
    R: ComponentRegistry + ?Sized,
{
    let Some((index, lowest)) = bag
        .iter()
        .map(Operation::kind)
        .enumerate()
        .min_by_key(|&(_, kind)| kind)
    else {
        return Ok(None);
    };

    if lowest != OperationKind::Start {
        return Ok(Some(bag.remove(index)));
    }

    let mut ready_index = None;
    for (index, operation) in bag.iter().enumerate() {
        let Operation::Start(component) = operation else {
            continue;
        };
        if start_is_ready(component, registry)? {
            ready_index = Some(index);
            break;
        }
        debug!(id = %component.id, "start not ready yet");
    }

    match ready_index {
        Some(index) => Ok(Some(bag.remove(index))),
        None => {
            let mut blocked = bag
                .iter()
                .filter_map(Operation::target_id)
                .map(str::to_string)
                .collect::<Vec<_>>();
            blocked.sort();
            blocked.dedup();
            Err(PlanError::Deadlock { blocked })
        }
    }
}

fn start_is_ready<R>(component: &InstalledComponent, registry: &R) -> Result<bool, PlanError>
where
    R: ComponentRegistry + ?Sized,
{
    let requirements = registry
        .required_dependencies(&component.id)
        .map_err(PlanError::Registry)?;
    for requirement in requirements {
        if !registry
            .is_running(&requirement.id)
            .map_err(PlanError::Registry)?
        {
            return Ok(false);
        }
    }
    Ok(true)
}
