use std::collections::BTreeMap;

use anyhow::{anyhow, Context, Result};

use crate::package::{read_descriptor, StagedPackage};
use crate::registry::{running_dependents_of, start_blocker, ComponentRegistry, InstalledComponent};

/// Registry held entirely in memory; used for dry runs and engine tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryRegistry {
    components: BTreeMap<String, InstalledComponent>,
    history: Vec<String>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_components(components: impl IntoIterator<Item = InstalledComponent>) -> Self {
        Self {
            components: components
                .into_iter()
                .map(|component| (component.id.clone(), component))
                .collect(),
            history: Vec::new(),
        }
    }

    pub fn with_component(mut self, component: InstalledComponent) -> Self {
        self.components.insert(component.id.clone(), component);
        self
    }

    /// Registry calls that mutated state, as `verb id` tokens in call order.
    pub fn history(&self) -> &[String] {
        &self.history
    }

    fn component_mut(&mut self, id: &str) -> Result<&mut InstalledComponent> {
        self.components
            .get_mut(id)
            .ok_or_else(|| anyhow!("component '{id}' is not installed"))
    }
}

impl ComponentRegistry for MemoryRegistry {
    fn find(&self, id: &str) -> Result<Option<InstalledComponent>> {
        Ok(self.components.get(id).cloned())
    }

    fn list_installed(&self) -> Result<Vec<InstalledComponent>> {
        Ok(self.components.values().cloned().collect())
    }

    fn install(&mut self, package: StagedPackage) -> Result<InstalledComponent> {
        let descriptor = read_descriptor(package.data())
            .with_context(|| format!("failed to install {}", package.original_filename()))?;
        if self.components.contains_key(&descriptor.id) {
            return Err(anyhow!("component '{}' is already installed", descriptor.id));
        }

        let component = InstalledComponent {
            id: descriptor.id,
            version: descriptor.version,
            running: false,
            requires: descriptor.requires,
            start_failure: None,
        };
        self.history.push(format!("install {}", component.id));
        self.components
            .insert(component.id.clone(), component.clone());
        Ok(component)
    }

    fn uninstall(&mut self, id: &str) -> Result<()> {
        let component = self.component_mut(id)?;
        if component.running {
            return Err(anyhow!("cannot uninstall running component '{id}'"));
        }
        self.components.remove(id);
        self.history.push(format!("uninstall {id}"));
        Ok(())
    }

    fn start(&mut self, id: &str) -> Result<InstalledComponent> {
        let installed = self.list_installed()?;
        let component = self.component_mut(id)?;
        match start_blocker(component, &installed) {
            Some(cause) => {
                component.running = false;
                component.start_failure = Some(cause);
            }
            None => {
                component.running = true;
                component.start_failure = None;
            }
        }
        let component = component.clone();
        self.history.push(format!("start {id}"));
        Ok(component)
    }

    fn stop(&mut self, id: &str, cascade_dependents: bool) -> Result<()> {
        if cascade_dependents {
            let installed = self.list_installed()?;
            for dependent in running_dependents_of(id, &installed) {
                self.component_mut(&dependent)?.running = false;
                self.history.push(format!("stop {dependent}"));
            }
        }
        self.component_mut(id)?.running = false;
        self.history.push(format!("stop {id}"));
        Ok(())
    }
}
