use std::fs;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use modsync_core::{
    read_bundle_file, read_descriptor, write_package, ComponentDescriptor, ComponentRegistry,
    InstalledComponent, MemoryRegistry, StagedPackage, DESCRIPTOR_PATH,
};
use modsync_planner::{plan_and_execute, ExecutionFailure};
use serde::Serialize;
use tracing::{debug, info};

use crate::render::{print_lines, render_activity_lines, render_status_line, OutputStyle};

#[derive(Debug, Clone, Copy)]
pub(crate) struct ApplyOptions {
    pub(crate) dry_run: bool,
    pub(crate) json: bool,
    pub(crate) style: OutputStyle,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub(crate) struct ApplyReport {
    pub(crate) dry_run: bool,
    pub(crate) status: &'static str,
    pub(crate) log: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) error: Option<String>,
}

impl ApplyReport {
    pub(crate) fn from_outcome(
        dry_run: bool,
        outcome: &std::result::Result<Vec<String>, ExecutionFailure>,
    ) -> Self {
        match outcome {
            Ok(log) => Self {
                dry_run,
                status: "ok",
                log: log.clone(),
                error: None,
            },
            Err(failure) => Self {
                dry_run,
                status: "failed",
                log: failure.log.clone(),
                error: Some(failure.error.to_string()),
            },
        }
    }
}

/// Runs the bundle against `registry`, or against an in-memory copy of it for a dry run.
pub(crate) fn apply_packages<R>(
    registry: &mut R,
    packages: Vec<StagedPackage>,
    dry_run: bool,
) -> Result<std::result::Result<Vec<String>, ExecutionFailure>>
where
    R: ComponentRegistry + ?Sized,
{
    if dry_run {
        let mut shadow = MemoryRegistry::from_components(registry.list_installed()?);
        return Ok(plan_and_execute(packages, &mut shadow));
    }
    Ok(plan_and_execute(packages, registry))
}

pub(crate) fn run_apply<R>(registry: &mut R, bundle: &Path, options: ApplyOptions) -> Result<()>
where
    R: ComponentRegistry + ?Sized,
{
    let packages = read_bundle_file(bundle)?;
    info!(
        bundle = %bundle.display(),
        packages = packages.len(),
        dry_run = options.dry_run,
        "applying bundle"
    );
    let outcome = apply_packages(registry, packages, options.dry_run)?;

    if options.json {
        let report = ApplyReport::from_outcome(options.dry_run, &outcome);
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("failed to encode apply report")?
        );
    } else {
        let log = match &outcome {
            Ok(log) => log,
            Err(failure) => &failure.log,
        };
        print_lines(options.style, &render_activity_lines(options.style, log));
        if options.dry_run && outcome.is_ok() {
            print_lines(
                options.style,
                &[render_status_line(
                    options.style,
                    "warn",
                    "dry run: no changes were made to the host",
                )],
            );
        }
    }

    match outcome {
        Ok(_) => Ok(()),
        Err(failure) => {
            let completed = failure.log.len();
            Err(anyhow::Error::new(failure.error)
                .context(format!("bundle apply aborted after {completed} operation(s)")))
        }
    }
}

pub(crate) fn format_component_lines(components: &[InstalledComponent]) -> Vec<String> {
    components
        .iter()
        .map(|component| {
            let state = if component.running {
                "running"
            } else {
                "stopped"
            };
            let mut line = format!("{} {} {}", component.id, component.version, state);
            if !component.requires.is_empty() {
                let requires = component
                    .requires
                    .iter()
                    .map(|requirement| requirement.to_token())
                    .collect::<Vec<_>>()
                    .join(",");
                line.push_str(&format!(" requires={requires}"));
            }
            if let Some(cause) = &component.start_failure {
                line.push_str(&format!(" last-start-failure=\"{cause}\""));
            }
            line
        })
        .collect()
}

pub(crate) fn run_list<R>(registry: &R, style: OutputStyle) -> Result<()>
where
    R: ComponentRegistry + ?Sized,
{
    let components = registry.list_installed()?;
    if components.is_empty() {
        print_lines(
            style,
            &[render_status_line(style, "warn", "no components installed")],
        );
        return Ok(());
    }
    print_lines(style, &format_component_lines(&components));
    Ok(())
}

pub(crate) fn start_component<R>(registry: &mut R, id: &str) -> Result<InstalledComponent>
where
    R: ComponentRegistry + ?Sized,
{
    let started = registry.start(id)?;
    if let Some(cause) = &started.start_failure {
        return Err(anyhow!("component '{id}' failed to start: {cause}"));
    }
    Ok(started)
}

pub(crate) fn run_start<R>(registry: &mut R, id: &str, style: OutputStyle) -> Result<()>
where
    R: ComponentRegistry + ?Sized,
{
    let started = start_component(registry, id)?;
    let message = format!("Started {} version {}", started.id, started.version);
    print_lines(style, &[render_status_line(style, "ok", &message)]);
    Ok(())
}

pub(crate) fn run_stop<R>(registry: &mut R, id: &str, style: OutputStyle) -> Result<()>
where
    R: ComponentRegistry + ?Sized,
{
    let before = registry.list_running()?;
    registry.stop(id, true)?;
    let after = registry.list_running()?;

    let lines = before
        .difference(&after)
        .map(|stopped| render_status_line(style, "ok", &format!("Stopped {stopped}")))
        .collect::<Vec<_>>();
    if lines.is_empty() {
        let message = format!("{id} was not running");
        print_lines(style, &[render_status_line(style, "warn", &message)]);
    } else {
        print_lines(style, &lines);
    }
    Ok(())
}

pub(crate) fn format_descriptor_lines(descriptor: &ComponentDescriptor) -> Vec<String> {
    let mut lines = vec![
        format!("id: {}", descriptor.id),
        format!("version: {}", descriptor.version),
    ];
    if descriptor.requires.is_empty() {
        lines.push("requires: none".to_string());
    } else {
        for requirement in &descriptor.requires {
            match &requirement.min_version {
                Some(min_version) => {
                    lines.push(format!("requires: {} >= {}", requirement.id, min_version))
                }
                None => lines.push(format!("requires: {}", requirement.id)),
            }
        }
    }
    lines
}

pub(crate) fn run_inspect(package: &Path) -> Result<()> {
    let staged = StagedPackage::from_path(package)?;
    let descriptor = read_descriptor(staged.data())
        .with_context(|| format!("failed to inspect {}", staged.original_filename()))?;
    for line in format_descriptor_lines(&descriptor) {
        println!("{line}");
    }
    Ok(())
}

pub(crate) fn run_pack(descriptor: &Path, payload: Option<&Path>, output: &Path) -> Result<()> {
    let raw = fs::read_to_string(descriptor)
        .with_context(|| format!("failed to read descriptor: {}", descriptor.display()))?;
    let parsed = ComponentDescriptor::from_toml_str(&raw)
        .with_context(|| format!("invalid descriptor: {}", descriptor.display()))?;

    let mut files = Vec::new();
    if let Some(payload) = payload {
        collect_payload_files(payload, "", &mut files)?;
    }
    let bytes = write_package(&parsed, &files)?;

    if let Some(parent) = output.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    fs::write(output, &bytes)
        .with_context(|| format!("failed to write package: {}", output.display()))?;
    println!(
        "packed {} version {} ({} payload file(s)) into {}",
        parsed.id,
        parsed.version,
        files.len(),
        output.display()
    );
    Ok(())
}

/// Payload files as archive paths with '/' separators, sorted for stable output.
pub(crate) fn collect_payload_files(
    dir: &Path,
    relative: &str,
    files: &mut Vec<(String, Vec<u8>)>,
) -> Result<()> {
    let mut entries = fs::read_dir(dir)
        .with_context(|| format!("failed to read payload directory: {}", dir.display()))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .with_context(|| format!("failed to list payload directory: {}", dir.display()))?;
    entries.sort_by_key(|entry| entry.file_name());

    for entry in entries {
        let name = entry.file_name().to_string_lossy().into_owned();
        let archive_path = if relative.is_empty() {
            name
        } else {
            format!("{relative}/{name}")
        };
        let path = entry.path();
        if path.is_dir() {
            collect_payload_files(&path, &archive_path, files)?;
            continue;
        }
        if archive_path == DESCRIPTOR_PATH {
            debug!(path = %path.display(), "payload descriptor ignored in favour of --descriptor");
            continue;
        }
        let bytes = fs::read(&path)
            .with_context(|| format!("failed to read payload file: {}", path.display()))?;
        files.push((archive_path, bytes));
    }
    Ok(())
}
