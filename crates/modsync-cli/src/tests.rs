use super::*;

use std::path::Path;

use modsync_core::{
    read_bundle_file, read_descriptor, write_package, ComponentDescriptor, ComponentRegistry,
    InstalledComponent, MemoryRegistry, Requirement, StagedPackage,
};
use modsync_planner::PlanError;
use tempfile::TempDir;

use crate::config::CliConfig;
use crate::flows::{
    apply_packages, collect_payload_files, format_component_lines, format_descriptor_lines,
    start_component, ApplyReport,
};
use crate::render::{output_style_from, render_activity_lines, render_status_line, OutputStyle};

fn package_bytes(descriptor: &ComponentDescriptor) -> Vec<u8> {
    write_package(descriptor, &[]).expect("package must build")
}

fn write_bundle(dir: &Path, descriptors: &[ComponentDescriptor]) -> std::path::PathBuf {
    let mut builder = tar::Builder::new(Vec::new());
    for descriptor in descriptors {
        let bytes = package_bytes(descriptor);
        let mut header = tar::Header::new_gnu();
        header.set_size(bytes.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        let name = format!("{}-{}.cpk", descriptor.id, descriptor.version);
        builder
            .append_data(&mut header, name, bytes.as_slice())
            .expect("bundle entry must append");
    }
    let path = dir.join("bundle.tar");
    std::fs::write(&path, builder.into_inner().expect("bundle must finish"))
        .expect("bundle must write");
    path
}

fn host(dir: &TempDir) -> HostRegistry {
    HostRegistry::open(HostLayout::new(dir.path().join("host"))).expect("host must open")
}

fn running(id: &str, version: &str) -> InstalledComponent {
    let mut component = InstalledComponent::new(id, version);
    component.running = true;
    component
}

#[test]
fn config_parses_output_and_log_sections() {
    let config = CliConfig::from_toml_str(
        "[output]\nstyle = \"plain\"\n\n[log]\nfilter = \"modsync_planner=debug\"\n",
    )
    .expect("config must parse");
    assert_eq!(config.output.style, Some(OutputStyle::Plain));
    assert_eq!(config.log_filter(), "modsync_planner=debug");
}

#[test]
fn empty_config_uses_defaults() {
    let config = CliConfig::from_toml_str("").expect("empty config must parse");
    assert_eq!(config, CliConfig::default());
    assert_eq!(config.log_filter(), "warn");
}

#[test]
fn config_rejects_unknown_keys() {
    let err = CliConfig::from_toml_str("[output]\ncolour = true\n").expect_err("must reject");
    assert!(err.to_string().contains("failed to parse modsync config"));
}

#[test]
fn missing_optional_config_falls_back_to_default() {
    let dir = TempDir::new().expect("temp dir");
    let config =
        CliConfig::load_optional(&dir.path().join("config.toml")).expect("must load default");
    assert_eq!(config, CliConfig::default());
    assert!(CliConfig::load(&dir.path().join("config.toml")).is_err());
}

#[test]
fn output_style_prefers_env_then_config_then_terminal() {
    assert_eq!(
        output_style_from(Some(OutputStyle::Plain), Some(OutputStyle::Rich), true),
        OutputStyle::Plain
    );
    assert_eq!(
        output_style_from(None, Some(OutputStyle::Rich), false),
        OutputStyle::Rich
    );
    assert_eq!(output_style_from(None, None, true), OutputStyle::Rich);
    assert_eq!(output_style_from(None, None, false), OutputStyle::Plain);
    assert_eq!(OutputStyle::parse(" RICH "), Some(OutputStyle::Rich));
    assert_eq!(OutputStyle::parse("fancy"), None);
}

#[test]
fn activity_lines_carry_badges_only_in_rich_style() {
    let log = vec![
        "Skipped base-1.0.cpk because version already installed".to_string(),
        "Stopped app version 1.0".to_string(),
        "Installed app version 2.0".to_string(),
    ];
    assert_eq!(render_activity_lines(OutputStyle::Plain, &log), log);
    assert_eq!(
        render_activity_lines(OutputStyle::Rich, &log),
        vec![
            "[SKIP] Skipped base-1.0.cpk because version already installed",
            "[..] Stopped app version 1.0",
            "[OK] Installed app version 2.0",
        ]
    );
    assert_eq!(
        render_status_line(OutputStyle::Rich, "error", "boom"),
        "[ERR] boom"
    );
}

#[test]
fn component_lines_show_state_requirements_and_failures() {
    let mut app = InstalledComponent::new("app", "1.0");
    app.requires = vec![Requirement::at_least("base", "1.0"), Requirement::new("log")];
    app.start_failure = Some("required component 'base' is not running".to_string());
    let lines = format_component_lines(&[running("base", "1.0"), app]);
    assert_eq!(
        lines,
        vec![
            "base 1.0 running".to_string(),
            "app 1.0 stopped requires=base@1.0,log last-start-failure=\"required component 'base' is not running\"".to_string(),
        ]
    );
}

#[test]
fn descriptor_lines_list_requirements() {
    let descriptor = ComponentDescriptor::new("app", "2.0")
        .requiring(Requirement::at_least("base", "1.1"))
        .requiring(Requirement::new("log"));
    assert_eq!(
        format_descriptor_lines(&descriptor),
        vec!["id: app", "version: 2.0", "requires: base >= 1.1", "requires: log"]
    );
    assert_eq!(
        format_descriptor_lines(&ComponentDescriptor::new("base", "1.0"))[2],
        "requires: none"
    );
}

#[test]
fn cli_parses_apply_flags_and_global_prefix() {
    let cli = Cli::try_parse_from([
        "modsync",
        "apply",
        "bundle.tar.gz",
        "--dry-run",
        "--json",
        "--prefix",
        "/tmp/host",
    ])
    .expect("must parse");
    assert_eq!(cli.prefix.as_deref(), Some(Path::new("/tmp/host")));
    match cli.command {
        Commands::Apply {
            bundle,
            dry_run,
            json,
        } => {
            assert_eq!(bundle, Path::new("bundle.tar.gz"));
            assert!(dry_run);
            assert!(json);
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn cli_requires_pack_output() {
    assert!(Cli::try_parse_from(["modsync", "pack", "component.toml"]).is_err());
    let cli = Cli::try_parse_from(["modsync", "pack", "component.toml", "-o", "out.cpk"])
        .expect("must parse");
    assert!(matches!(cli.command, Commands::Pack { payload: None, .. }));
}

#[test]
fn bash_completions_mention_subcommands() {
    let mut script = Vec::new();
    write_completions_script(CliCompletionShell::Bash, &mut script).expect("must generate");
    let script = String::from_utf8(script).expect("utf8 script");
    assert!(script.contains("modsync"));
    assert!(script.contains("apply"));
}

#[test]
fn apply_bundle_installs_and_starts_in_dependency_order() {
    let dir = TempDir::new().expect("temp dir");
    let bundle = write_bundle(
        dir.path(),
        &[
            ComponentDescriptor::new("app", "1.0").requiring(Requirement::new("base")),
            ComponentDescriptor::new("base", "1.0"),
        ],
    );
    let mut registry = host(&dir);
    let packages = read_bundle_file(&bundle).expect("bundle must read");

    let log = apply_packages(&mut registry, packages, false)
        .expect("registry must list")
        .expect("apply must succeed");

    assert_eq!(
        log,
        vec![
            "Installed app version 1.0",
            "Installed base version 1.0",
            "Started base version 1.0",
            "Started app version 1.0",
        ]
    );
    assert_eq!(
        registry.list_running().expect("must list running").len(),
        2
    );
}

#[test]
fn dry_run_leaves_host_untouched() {
    let dir = TempDir::new().expect("temp dir");
    let bundle = write_bundle(dir.path(), &[ComponentDescriptor::new("base", "1.0")]);
    let mut registry = host(&dir);

    run_apply(
        &mut registry,
        &bundle,
        ApplyOptions {
            dry_run: true,
            json: false,
            style: OutputStyle::Plain,
        },
    )
    .expect("dry run must succeed");

    assert!(registry
        .list_installed()
        .expect("must list installed")
        .is_empty());
}

#[test]
fn failed_apply_keeps_partial_log_in_report() {
    let mut registry = MemoryRegistry::new();
    let packages = vec![StagedPackage::new(
        "app-1.0.cpk",
        package_bytes(&ComponentDescriptor::new("app", "1.0").requiring(Requirement::new("ghost"))),
    )];

    let outcome = apply_packages(&mut registry, packages, false).expect("registry must list");
    let report = ApplyReport::from_outcome(false, &outcome);

    let failure = outcome.expect_err("apply must fail");
    assert!(matches!(failure.error, PlanError::Deadlock { ref blocked } if blocked == &["app"]));
    assert_eq!(report.status, "failed");
    assert_eq!(report.log, vec!["Installed app version 1.0"]);
    let encoded = serde_json::to_value(&report).expect("report must encode");
    assert_eq!(encoded["dry_run"], false);
    assert!(encoded["error"]
        .as_str()
        .expect("error string")
        .contains("blocked components: app"));
}

#[test]
fn successful_report_omits_error() {
    let report = ApplyReport::from_outcome(true, &Ok(vec!["Started base version 1.0".to_string()]));
    let encoded = serde_json::to_value(&report).expect("report must encode");
    assert_eq!(encoded["status"], "ok");
    assert_eq!(encoded["dry_run"], true);
    assert!(encoded.get("error").is_none());
}

#[test]
fn start_component_reports_recorded_failure() {
    let mut app = InstalledComponent::new("app", "1.0");
    app.requires = vec![Requirement::new("base")];
    let mut registry = MemoryRegistry::new()
        .with_component(InstalledComponent::new("base", "1.0"))
        .with_component(app);

    let err = start_component(&mut registry, "app").expect_err("app must not start");
    assert!(err
        .to_string()
        .contains("required component 'base' is not running"));

    start_component(&mut registry, "base").expect("base must start");
    let started = start_component(&mut registry, "app").expect("app must start");
    assert!(started.running);
}

#[test]
fn stop_command_cascades_to_running_dependents() {
    let mut app = running("app", "1.0");
    app.requires = vec![Requirement::new("base")];
    let mut registry = MemoryRegistry::new()
        .with_component(running("base", "1.0"))
        .with_component(app)
        .with_component(running("other", "1.0"));

    run_stop(&mut registry, "base", OutputStyle::Plain).expect("stop must succeed");

    let still_running = registry.list_running().expect("must list running");
    assert_eq!(still_running.into_iter().collect::<Vec<_>>(), vec!["other"]);
}

#[test]
fn pack_then_inspect_round_trips_descriptor_and_payload() {
    let dir = TempDir::new().expect("temp dir");
    let descriptor_path = dir.path().join("component.toml");
    std::fs::write(
        &descriptor_path,
        "id = \"app\"\nversion = \"1.2-SNAPSHOT\"\n\n[[requires]]\nid = \"base\"\nmin_version = \"1.0\"\n",
    )
    .expect("descriptor must write");
    let payload = dir.path().join("payload");
    std::fs::create_dir_all(payload.join("lib")).expect("payload dirs");
    std::fs::write(payload.join("lib/app.jar"), b"jar").expect("payload file");
    std::fs::write(payload.join("README"), b"readme").expect("payload file");

    let mut files = Vec::new();
    collect_payload_files(&payload, "", &mut files).expect("payload must collect");
    assert_eq!(
        files.iter().map(|(path, _)| path.as_str()).collect::<Vec<_>>(),
        vec!["README", "lib/app.jar"]
    );

    let output = dir.path().join("out/app-1.2-SNAPSHOT.cpk");
    run_pack(&descriptor_path, Some(&payload), &output).expect("pack must succeed");
    run_inspect(&output).expect("inspect must succeed");

    let staged = StagedPackage::from_path(&output).expect("package must read");
    let descriptor = read_descriptor(staged.data()).expect("descriptor must read");
    assert_eq!(descriptor.id, "app");
    assert_eq!(descriptor.version, "1.2-SNAPSHOT");
    assert_eq!(descriptor.requires, vec![Requirement::at_least("base", "1.0")]);
}
