use std::collections::BTreeSet;

use modsync_core::{running_dependents_of, ComponentRegistry, InstalledComponent};
use tracing::debug;

use crate::candidate::{Action, Candidate};
use crate::error::PlanError;
use crate::operation::{Operation, OperationBag, OperationKind};

/// Expands classified candidates into the operations that realize them.
///
/// Stopping a component first stops every running component that depends on
/// it, directly or transitively, and queues a restart for each one once the
/// rest of the bag has drained. Components reinstalled in this run get their
/// start from the install instead.
pub fn build_plan<R>(candidates: Vec<Candidate>, registry: &R) -> Result<OperationBag, PlanError>
where
    R: ComponentRegistry + ?Sized,
{
    let installed = registry.list_installed().map_err(PlanError::Registry)?;
    let reinstalled: BTreeSet<String> = candidates
        .iter()
        .filter(|candidate| {
            matches!(
                candidate.action,
                Some(Action::Install | Action::Upgrade { .. })
            )
        })
        .filter_map(|candidate| candidate.component_id.clone())
        .collect();

    let mut bag = OperationBag::new();
    let mut restarts = Vec::new();

    for mut candidate in candidates {
        match candidate.action.clone() {
            None => {
                candidate.skip("it was never classified");
                bag.push(Operation::Skip(candidate));
            }
            Some(Action::Skip { .. }) => bag.push(Operation::Skip(candidate)),
            Some(Action::StartOnly { existing }) => {
                if !bag.has_pending(OperationKind::Start, &existing.id) {
                    bag.push(Operation::Start(existing));
                }
            }
            Some(Action::Install) => bag.push(Operation::Install(candidate)),
            Some(Action::Upgrade { existing }) => {
                stop_with_dependents(&existing, &installed, &mut bag, &mut restarts);
                bag.push(Operation::Remove(existing));
                bag.push(Operation::Install(candidate));
            }
        }
    }

    for dependent in restarts {
        if reinstalled.contains(&dependent.id)
            || bag.has_pending(OperationKind::Start, &dependent.id)
        {
            continue;
        }
        debug!(id = %dependent.id, "queued restart of stopped dependent");
        bag.push(Operation::Start(dependent));
    }

    Ok(bag)
}

fn stop_with_dependents(
    target: &InstalledComponent,
    installed: &[InstalledComponent],
    bag: &mut OperationBag,
    restarts: &mut Vec<InstalledComponent>,
) {
    for dependent_id in running_dependents_of(&target.id, installed) {
        if bag.has_pending(OperationKind::Stop, &dependent_id) {
            continue;
        }
        let Some(dependent) = installed.iter().find(|entry| entry.id == dependent_id) else {
            continue;
        };
        debug!(id = %dependent.id, cause = %target.id, "cascading stop to dependent");
        bag.push(Operation::Stop(dependent.clone()));
        restarts.push(dependent.clone());
    }

    if !bag.has_pending(OperationKind::Stop, &target.id) {
        bag.push(Operation::Stop(target.clone()));
    }
}
