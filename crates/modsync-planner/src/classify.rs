use std::cmp::Ordering;
use std::collections::BTreeSet;

use modsync_core::{
    should_install, ComponentRegistry, ComponentVersion, DescriptorError, StagedPackage,
};
use tracing::{debug, warn};

use crate::candidate::{Action, Candidate};
use crate::error::PlanError;

pub const ALREADY_INSTALLED_REASON: &str = "version already installed";
pub const NEWER_INSTALLED_REASON: &str = "a newer version is already installed";
pub const DUPLICATE_REASON: &str = "another package in this bundle targets the same component";

/// Sets the candidate's action from the installed state of its component.
///
/// A present but stopped component is started even when its version would
/// otherwise be skipped; that override never replaces an upgrade.
pub fn classify<R>(candidate: &mut Candidate, registry: &R) -> Result<(), PlanError>
where
    R: ComponentRegistry + ?Sized,
{
    let (Some(id), Some(version)) = (&candidate.component_id, &candidate.version) else {
        return Err(PlanError::Descriptor(DescriptorError::InvalidDescriptor(
            format!("descriptor of {} has not been read", candidate.original_filename),
        )));
    };

    let Some(existing) = registry.find(id).map_err(PlanError::Registry)? else {
        candidate.action = Some(Action::Install);
        return Ok(());
    };

    let action = if should_install(version, &existing.version)? {
        Action::Upgrade { existing }
    } else {
        let candidate_version = ComponentVersion::parse(version)?;
        let existing_version = ComponentVersion::parse(&existing.version)?;
        let reason = match candidate_version.cmp_numeric(&existing_version) {
            Ordering::Less => NEWER_INSTALLED_REASON,
            Ordering::Equal | Ordering::Greater => ALREADY_INSTALLED_REASON,
        };
        if existing.running {
            Action::Skip {
                reason: reason.to_string(),
            }
        } else {
            Action::StartOnly { existing }
        }
    };

    debug!(
        file = %candidate.original_filename,
        action = action.as_str(),
        "classified candidate"
    );
    candidate.action = Some(action);
    Ok(())
}

/// Reads and classifies every staged package, in bundle order.
///
/// Descriptor and version errors skip the affected candidate only; registry
/// failures abort.
pub fn prepare_candidates<R>(
    packages: Vec<StagedPackage>,
    registry: &R,
) -> Result<Vec<Candidate>, PlanError>
where
    R: ComponentRegistry + ?Sized,
{
    let mut claimed = BTreeSet::new();
    let mut candidates = Vec::with_capacity(packages.len());

    for package in packages {
        let mut candidate = Candidate::new(package);
        let outcome = candidate
            .read_descriptor()
            .map_err(PlanError::from)
            .and_then(|()| classify(&mut candidate, registry));

        match outcome {
            Ok(()) => {}
            Err(err) if err.is_candidate_scoped() => {
                warn!(file = %candidate.original_filename, error = %err, "skipping candidate");
                candidate.skip(err.to_string());
            }
            Err(err) => return Err(err),
        }

        if candidate.skip_reason().is_none() {
            if let Some(id) = &candidate.component_id {
                if !claimed.insert(id.clone()) {
                    candidate.skip(DUPLICATE_REASON);
                }
            }
        }
        candidates.push(candidate);
    }

    Ok(candidates)
}
