use anyhow::{anyhow, Context, Result};
use modsync_core::{
    read_descriptor, running_dependents_of, start_blocker, validate_component_id,
    ComponentRegistry, InstalledComponent, StagedPackage,
};
use sha2::{Digest, Sha256};
use std::fs;
use tracing::{debug, info, warn};

use crate::fs_utils::{remove_dir_if_empty, remove_file_if_exists};
use crate::receipts::{
    current_unix_timestamp, read_component_receipt, read_component_receipts,
    write_component_receipt, ComponentReceipt,
};
use crate::HostLayout;

/// Component registry persisted under a host prefix.
#[derive(Debug, Clone)]
pub struct HostRegistry {
    layout: HostLayout,
}

impl HostRegistry {
    pub fn open(layout: HostLayout) -> Result<Self> {
        layout.ensure_base_dirs()?;
        Ok(Self { layout })
    }

    pub fn layout(&self) -> &HostLayout {
        &self.layout
    }

    pub fn receipts(&self) -> Result<Vec<ComponentReceipt>> {
        read_component_receipts(&self.layout)
    }

    fn require_receipt(&self, id: &str) -> Result<ComponentReceipt> {
        validate_component_id(id)?;
        read_component_receipt(&self.layout, id)?
            .ok_or_else(|| anyhow!("component '{id}' is not installed"))
    }

    fn set_running(&self, id: &str, running: bool) -> Result<()> {
        let mut receipt = self.require_receipt(id)?;
        if receipt.running == running {
            return Ok(());
        }
        receipt.running = running;
        write_component_receipt(&self.layout, &receipt)?;
        Ok(())
    }
}

impl ComponentRegistry for HostRegistry {
    fn find(&self, id: &str) -> Result<Option<InstalledComponent>> {
        validate_component_id(id)?;
        Ok(read_component_receipt(&self.layout, id)?.map(|receipt| receipt.to_component()))
    }

    fn list_installed(&self) -> Result<Vec<InstalledComponent>> {
        Ok(self
            .receipts()?
            .iter()
            .map(ComponentReceipt::to_component)
            .collect())
    }

    fn install(&mut self, package: StagedPackage) -> Result<InstalledComponent> {
        let descriptor = read_descriptor(package.data()).with_context(|| {
            format!("failed to read descriptor of {}", package.original_filename())
        })?;
        if read_component_receipt(&self.layout, &descriptor.id)?.is_some() {
            return Err(anyhow!(
                "component '{}' is already installed; remove it first",
                descriptor.id
            ));
        }

        let package_path = self.layout.package_path(&descriptor.id, &descriptor.version);
        if let Some(parent) = package_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        fs::write(&package_path, package.data())
            .with_context(|| format!("failed to write package: {}", package_path.display()))?;

        let receipt = ComponentReceipt {
            id: descriptor.id,
            version: descriptor.version,
            requires: descriptor.requires,
            running: false,
            start_failure: None,
            original_filename: Some(package.original_filename().to_string()),
            package_sha256: Some(hex::encode(Sha256::digest(package.data()))),
            installed_at_unix: current_unix_timestamp()?,
        };
        write_component_receipt(&self.layout, &receipt)?;
        info!(id = %receipt.id, version = %receipt.version, "installed component");
        Ok(receipt.to_component())
    }

    fn uninstall(&mut self, id: &str) -> Result<()> {
        let receipt = self.require_receipt(id)?;
        if receipt.running {
            return Err(anyhow!("cannot uninstall running component '{id}'"));
        }

        let package_path = self.layout.package_path(&receipt.id, &receipt.version);
        remove_file_if_exists(&package_path)
            .with_context(|| format!("failed to remove package: {}", package_path.display()))?;
        let component_dir = self.layout.component_dir(id);
        remove_dir_if_empty(&component_dir)
            .with_context(|| format!("failed to remove {}", component_dir.display()))?;
        let receipt_path = self.layout.receipt_path(id);
        remove_file_if_exists(&receipt_path)
            .with_context(|| format!("failed to remove receipt: {}", receipt_path.display()))?;
        info!(id, version = %receipt.version, "uninstalled component");
        Ok(())
    }

    fn start(&mut self, id: &str) -> Result<InstalledComponent> {
        let mut receipt = self.require_receipt(id)?;
        let installed = self.list_installed()?;
        match start_blocker(&receipt.to_component(), &installed) {
            Some(cause) => {
                warn!(id, %cause, "component failed to start");
                receipt.running = false;
                receipt.start_failure = Some(cause);
            }
            None => {
                debug!(id, "component started");
                receipt.running = true;
                receipt.start_failure = None;
            }
        }
        write_component_receipt(&self.layout, &receipt)?;
        Ok(receipt.to_component())
    }

    fn stop(&mut self, id: &str, cascade_dependents: bool) -> Result<()> {
        self.require_receipt(id)?;
        if cascade_dependents {
            let installed = self.list_installed()?;
            for dependent in running_dependents_of(id, &installed) {
                debug!(id, dependent = %dependent, "stopping dependent");
                self.set_running(&dependent, false)?;
            }
        }
        self.set_running(id, false)?;
        debug!(id, "component stopped");
        Ok(())
    }
}
