use std::collections::BTreeSet;

use anyhow::Result;

use crate::descriptor::Requirement;
use crate::package::StagedPackage;
use crate::version::satisfies_minimum;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledComponent {
    pub id: String,
    pub version: String,
    pub running: bool,
    pub requires: Vec<Requirement>,
    /// Cause recorded by the last failed start, cleared by a successful one.
    pub start_failure: Option<String>,
}

impl InstalledComponent {
    pub fn new(id: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            version: version.into(),
            running: false,
            requires: Vec::new(),
            start_failure: None,
        }
    }

    pub fn depends_on(&self, id: &str) -> bool {
        self.requires.iter().any(|requirement| requirement.id == id)
    }
}

/// Host capability that owns installed components and their lifecycle.
///
/// `start` does not report a refused start as an error: the cause lands in
/// the returned component's `start_failure` and callers must check it.
pub trait ComponentRegistry {
    fn find(&self, id: &str) -> Result<Option<InstalledComponent>>;

    fn list_installed(&self) -> Result<Vec<InstalledComponent>>;

    fn install(&mut self, package: StagedPackage) -> Result<InstalledComponent>;

    fn uninstall(&mut self, id: &str) -> Result<()>;

    fn start(&mut self, id: &str) -> Result<InstalledComponent>;

    fn stop(&mut self, id: &str, cascade_dependents: bool) -> Result<()>;

    fn is_running(&self, id: &str) -> Result<bool> {
        Ok(self.find(id)?.is_some_and(|component| component.running))
    }

    fn required_dependencies(&self, id: &str) -> Result<Vec<Requirement>> {
        Ok(self
            .find(id)?
            .map(|component| component.requires)
            .unwrap_or_default())
    }

    fn list_running(&self) -> Result<BTreeSet<String>> {
        Ok(self
            .list_installed()?
            .into_iter()
            .filter(|component| component.running)
            .map(|component| component.id)
            .collect())
    }
}

/// Explains why `component` cannot start given the installed set, if it cannot.
pub fn start_blocker(
    component: &InstalledComponent,
    installed: &[InstalledComponent],
) -> Option<String> {
    for requirement in &component.requires {
        let Some(dependency) = installed.iter().find(|entry| entry.id == requirement.id) else {
            return Some(format!("required component '{}' is not installed", requirement.id));
        };
        if !dependency.running {
            return Some(format!("required component '{}' is not running", requirement.id));
        }
        if let Some(min_version) = &requirement.min_version {
            match satisfies_minimum(&dependency.version, min_version) {
                Ok(true) => {}
                Ok(false) => {
                    return Some(format!(
                        "required component '{}' is version {} but at least {} is needed",
                        requirement.id, dependency.version, min_version
                    ));
                }
                Err(err) => return Some(err.to_string()),
            }
        }
    }
    None
}

/// Running components that must stop before `id` stops, deepest dependents first.
pub fn running_dependents_of(id: &str, installed: &[InstalledComponent]) -> Vec<String> {
    let mut ordered = Vec::new();
    let mut visited = BTreeSet::from([id.to_string()]);
    collect_running_dependents(id, installed, &mut visited, &mut ordered);
    ordered
}

fn collect_running_dependents(
    id: &str,
    installed: &[InstalledComponent],
    visited: &mut BTreeSet<String>,
    ordered: &mut Vec<String>,
) {
    for dependent in installed
        .iter()
        .filter(|component| component.running && component.depends_on(id))
    {
        if !visited.insert(dependent.id.clone()) {
            continue;
        }
        collect_running_dependents(&dependent.id, installed, visited, ordered);
        ordered.push(dependent.id.clone());
    }
}
