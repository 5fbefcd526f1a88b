use anyhow::{Context, Result};
use modsync_core::{InstalledComponent, Requirement};
use std::fs;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::HostLayout;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentReceipt {
    pub id: String,
    pub version: String,
    pub requires: Vec<Requirement>,
    pub running: bool,
    pub start_failure: Option<String>,
    pub original_filename: Option<String>,
    pub package_sha256: Option<String>,
    pub installed_at_unix: u64,
}

impl ComponentReceipt {
    pub fn to_component(&self) -> InstalledComponent {
        InstalledComponent {
            id: self.id.clone(),
            version: self.version.clone(),
            running: self.running,
            requires: self.requires.clone(),
            start_failure: self.start_failure.clone(),
        }
    }
}

pub fn write_component_receipt(layout: &HostLayout, receipt: &ComponentReceipt) -> Result<PathBuf> {
    let mut payload = String::new();
    payload.push_str(&format!("id={}\n", receipt.id));
    payload.push_str(&format!("version={}\n", receipt.version));
    for requirement in &receipt.requires {
        payload.push_str(&format!("requires={}\n", requirement.to_token()));
    }
    payload.push_str(&format!("running={}\n", receipt.running));
    if let Some(cause) = &receipt.start_failure {
        payload.push_str(&format!("start_failure={}\n", single_line(cause)));
    }
    if let Some(filename) = &receipt.original_filename {
        payload.push_str(&format!("original_filename={}\n", filename));
    }
    if let Some(sha256) = &receipt.package_sha256 {
        payload.push_str(&format!("package_sha256={}\n", sha256));
    }
    payload.push_str(&format!(
        "installed_at_unix={}\n",
        receipt.installed_at_unix
    ));

    let path = layout.receipt_path(&receipt.id);
    fs::write(&path, payload.as_bytes())
        .with_context(|| format!("failed to write component receipt: {}", path.display()))?;
    Ok(path)
}

pub fn read_component_receipt(layout: &HostLayout, id: &str) -> Result<Option<ComponentReceipt>> {
    let path = layout.receipt_path(id);
    if !path.exists() {
        return Ok(None);
    }

    let raw = fs::read_to_string(&path)
        .with_context(|| format!("failed to read component receipt: {}", path.display()))?;
    let receipt = parse_receipt(&raw)
        .with_context(|| format!("failed to parse component receipt: {}", path.display()))?;
    Ok(Some(receipt))
}

pub fn read_component_receipts(layout: &HostLayout) -> Result<Vec<ComponentReceipt>> {
    let dir = layout.installed_state_dir();
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut receipts = Vec::new();
    for entry in fs::read_dir(&dir)
        .with_context(|| format!("failed to read component state directory: {}", dir.display()))?
    {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }

        let path = entry.path();
        if path.extension().and_then(|v| v.to_str()) != Some("receipt") {
            continue;
        }

        let raw = fs::read_to_string(&path)
            .with_context(|| format!("failed to read component receipt: {}", path.display()))?;
        let receipt = parse_receipt(&raw)
            .with_context(|| format!("failed to parse component receipt: {}", path.display()))?;
        receipts.push(receipt);
    }

    receipts.sort_by(|a, b| a.id.cmp(&b.id));
    Ok(receipts)
}

pub(crate) fn parse_receipt(raw: &str) -> Result<ComponentReceipt> {
    let mut id = None;
    let mut version = None;
    let mut requires = Vec::new();
    let mut running = false;
    let mut start_failure = None;
    let mut original_filename = None;
    let mut package_sha256 = None;
    let mut installed_at_unix = None;

    for line in raw.lines().map(str::trim).filter(|line| !line.is_empty()) {
        let Some((k, v)) = line.split_once('=') else {
            continue;
        };
        match k {
            "id" => id = Some(v.to_string()),
            "version" => version = Some(v.to_string()),
            "requires" => requires.push(Requirement::from_token(v)),
            "running" => running = v.parse().context("running must be true or false")?,
            "start_failure" => start_failure = Some(v.to_string()),
            "original_filename" => original_filename = Some(v.to_string()),
            "package_sha256" => package_sha256 = Some(v.to_string()),
            "installed_at_unix" => {
                installed_at_unix = Some(v.parse().context("installed_at_unix must be u64")?)
            }
            _ => {}
        }
    }

    Ok(ComponentReceipt {
        id: id.context("missing id")?,
        version: version.context("missing version")?,
        requires,
        running,
        start_failure,
        original_filename,
        package_sha256,
        installed_at_unix: installed_at_unix.context("missing installed_at_unix")?,
    })
}

pub fn current_unix_timestamp() -> Result<u64> {
    Ok(SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .context("system time is before unix epoch")?
        .as_secs())
}

fn single_line(value: &str) -> String {
    value.replace(['\r', '\n'], " ")
}
