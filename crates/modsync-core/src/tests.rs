use std::cmp::Ordering;
use std::io::Write;

use flate2::write::GzEncoder;
use flate2::Compression;

use super::*;

fn package(id: &str, version: &str) -> Vec<u8> {
    write_package(&ComponentDescriptor::new(id, version), &[]).expect("package must build")
}

fn tar_of(entries: &[(&str, Vec<u8>)]) -> Vec<u8> {
    let mut builder = tar::Builder::new(Vec::new());
    for (path, bytes) in entries {
        let mut header = tar::Header::new_gnu();
        header.set_size(bytes.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_data(&mut header, path, bytes.as_slice())
            .expect("entry must append");
    }
    builder.into_inner().expect("archive must finish")
}

fn gzip(bytes: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(bytes).expect("gzip write");
    encoder.finish().expect("gzip finish")
}

#[test]
fn should_install_matches_snapshot_table() {
    let cases = [
        ("1.0-SNAPSHOT", "1.0", false),
        ("1.0", "1.0-SNAPSHOT", true),
        ("1.0-SNAPSHOT", "1.0-SNAPSHOT", true),
        ("1.0", "0.9.5", true),
        ("0.9.5", "1.0", false),
        ("1.0-SNAPSHOT", "0.9", true),
        ("1.0-SNAPSHOT", "1.1", false),
    ];
    for (candidate, reference, expected) in cases {
        assert_eq!(
            should_install(candidate, reference).expect("versions must parse"),
            expected,
            "{candidate} vs {reference}"
        );
    }
}

#[test]
fn equal_releases_are_not_reinstalled() {
    assert!(!should_install("2.3.1", "2.3.1").expect("versions must parse"));
    assert!(!should_install("2.3", "2.3.0").expect("versions must parse"));
}

#[test]
fn compare_treats_missing_components_as_zero() {
    assert_eq!(
        compare_versions("1.0", "1.0.0").expect("versions must parse"),
        Ordering::Equal
    );
    assert_eq!(
        compare_versions("1.10", "1.9").expect("versions must parse"),
        Ordering::Greater
    );
}

#[test]
fn release_outranks_snapshot_at_same_number() {
    assert_eq!(
        compare_versions("1.0", "1.0-SNAPSHOT").expect("versions must parse"),
        Ordering::Greater
    );
    assert_eq!(
        compare_versions("1.0-snapshot", "1.0-SNAPSHOT").expect("versions must parse"),
        Ordering::Equal
    );
}

#[test]
fn malformed_version_names_offending_string() {
    let err = ComponentVersion::parse("beta.1").expect_err("must reject");
    assert_eq!(err.version, "beta.1");
    assert!(err.to_string().contains("beta.1"));

    assert!(ComponentVersion::parse("").is_err());
    assert!(ComponentVersion::parse("-SNAPSHOT").is_err());
    assert!(should_install("1.0", "x").is_err());
}

#[test]
fn version_display_normalizes_qualifier() {
    let version = ComponentVersion::parse("1.2-snapshot").expect("must parse");
    assert!(version.is_snapshot());
    assert_eq!(version.to_string(), "1.2-SNAPSHOT");
}

#[test]
fn satisfies_minimum_accepts_equal_and_newer() {
    assert!(satisfies_minimum("1.1", "1.1").expect("must parse"));
    assert!(satisfies_minimum("1.2", "1.1").expect("must parse"));
    assert!(!satisfies_minimum("1.0", "1.1").expect("must parse"));
    assert!(!satisfies_minimum("1.1-SNAPSHOT", "1.1").expect("must parse"));
}

#[test]
fn parse_descriptor_with_requirements() {
    let raw = r#"
id = "uiframework"
version = "1.3"

[[requires]]
id = "uilibrary"
min_version = "1.1"

[[requires]]
id = "logging"
"#;
    let descriptor = ComponentDescriptor::from_toml_str(raw).expect("descriptor should parse");
    assert_eq!(descriptor.id, "uiframework");
    assert_eq!(descriptor.version, "1.3");
    assert_eq!(
        descriptor.requires,
        vec![
            Requirement::at_least("uilibrary", "1.1"),
            Requirement::new("logging")
        ]
    );
}

#[test]
fn rejects_descriptor_without_id() {
    let err = ComponentDescriptor::from_toml_str("id = \"  \"\nversion = \"1.0\"\n")
        .expect_err("must reject");
    assert!(matches!(err, DescriptorError::InvalidDescriptor(_)));

    let err = ComponentDescriptor::from_toml_str("version = \"1.0\"\n").expect_err("must reject");
    assert!(matches!(err, DescriptorError::InvalidDescriptor(_)));
}

#[test]
fn rejects_self_and_duplicate_requirements() {
    let self_requiring = ComponentDescriptor::new("a", "1.0").requiring(Requirement::new("a"));
    let raw = self_requiring.to_toml_string().expect("must serialize");
    assert!(ComponentDescriptor::from_toml_str(&raw).is_err());

    let duplicated = ComponentDescriptor::new("a", "1.0")
        .requiring(Requirement::new("b"))
        .requiring(Requirement::at_least("b", "2.0"));
    let raw = duplicated.to_toml_string().expect("must serialize");
    assert!(ComponentDescriptor::from_toml_str(&raw).is_err());
}

#[test]
fn rejects_ids_that_are_not_a_single_path_segment() {
    for id in ["../../escaped", "a/b", "a\\b", "..", ".hidden", "a..b", "line\nbreak", "lib@1"] {
        let raw = format!("id = {id:?}\nversion = \"1.0\"\n");
        let err = ComponentDescriptor::from_toml_str(&raw).expect_err("must reject id");
        assert!(
            matches!(err, DescriptorError::InvalidDescriptor(ref message) if message.contains("invalid component id")),
            "unexpected error for {id:?}: {err}"
        );
    }

    let raw = "id = \"app\"\nversion = \"1.0\"\n\n[[requires]]\nid = \"../base\"\n";
    assert!(ComponentDescriptor::from_toml_str(raw).is_err());

    assert!(validate_component_id("org.openmrs.module-ui_2").is_ok());
}

#[test]
fn rejects_versions_with_separators_or_control_characters() {
    for version in ["1.0\nrunning=true", "../1.0", "1.0\\x"] {
        let raw = format!("id = \"app\"\nversion = {version:?}\n");
        let err = ComponentDescriptor::from_toml_str(&raw).expect_err("must reject version");
        assert!(err.to_string().contains("invalid version"));
    }
}

#[test]
fn requirement_tokens() {
    assert_eq!(Requirement::from_token("lib@1.2"), Requirement::at_least("lib", "1.2"));
    assert_eq!(Requirement::from_token("lib"), Requirement::new("lib"));
    assert_eq!(Requirement::from_token("lib@"), Requirement::new("lib"));
    assert_eq!(Requirement::at_least("lib", "1.2").to_token(), "lib@1.2");
}

#[test]
fn reads_descriptor_from_written_package() {
    let descriptor = ComponentDescriptor::new("appframework", "1.0")
        .requiring(Requirement::at_least("uilibrary", "1.1"));
    let bytes = write_package(
        &descriptor,
        &[("lib/appframework.bin".to_string(), b"payload".to_vec())],
    )
    .expect("package must build");

    assert_eq!(read_descriptor(&bytes).expect("must read"), descriptor);
    assert_eq!(read_descriptor(&gzip(&bytes)).expect("must read gz"), descriptor);
}

#[test]
fn reading_package_without_descriptor_fails() {
    let bytes = tar_of(&[("lib/other.bin", b"x".to_vec())]);
    let err = read_descriptor(&bytes).expect_err("must fail");
    assert!(matches!(err, DescriptorError::MissingDescriptor));
}

#[test]
fn bundle_stages_packages_with_simple_filenames() {
    let bundle = gzip(&tar_of(&[
        ("dist/uiframework-1.3.cpk", package("uiframework", "1.3")),
        ("uilibrary-1.1.cpk", package("uilibrary", "1.1")),
    ]));

    let staged = read_bundle(&bundle).expect("bundle must read");
    let names = staged
        .iter()
        .map(StagedPackage::original_filename)
        .collect::<Vec<_>>();
    assert_eq!(names, vec!["uiframework-1.3.cpk", "uilibrary-1.1.cpk"]);
    assert_eq!(
        read_descriptor(staged[0].data()).expect("must read").id,
        "uiframework"
    );
}

#[test]
fn bundle_rejects_foreign_entries() {
    let bundle = tar_of(&[
        ("a-1.0.cpk", package("a", "1.0")),
        ("README.txt", b"hello".to_vec()),
    ]);
    let err = read_bundle(&bundle).expect_err("must reject");
    assert!(matches!(err, BundleError::UnexpectedEntry(name) if name == "README.txt"));
}

#[test]
fn empty_bundle_has_no_packages() {
    let bundle = tar_of(&[]);
    assert!(read_bundle(&bundle).expect("bundle must read").is_empty());
}

#[test]
fn simple_filename_strips_both_separators() {
    assert_eq!(simple_filename("a/b/c.cpk"), "c.cpk");
    assert_eq!(simple_filename("a\\c.cpk"), "c.cpk");
    assert_eq!(simple_filename("c.cpk"), "c.cpk");
}

#[test]
fn memory_registry_start_records_failure_instead_of_erroring() {
    let mut registry = MemoryRegistry::new().with_component(InstalledComponent {
        requires: vec![Requirement::new("base")],
        ..InstalledComponent::new("app", "1.0")
    });

    let started = registry.start("app").expect("start call must succeed");
    assert!(!started.running);
    assert_eq!(
        started.start_failure.as_deref(),
        Some("required component 'base' is not installed")
    );
}

#[test]
fn memory_registry_stop_cascades_to_running_dependents() {
    let running = |id: &str, requires: &[&str]| InstalledComponent {
        running: true,
        requires: requires.iter().map(|id| Requirement::new(*id)).collect(),
        ..InstalledComponent::new(id, "1.0")
    };
    let mut registry = MemoryRegistry::from_components([
        running("base", &[]),
        running("mid", &["base"]),
        running("top", &["mid"]),
    ]);

    registry.stop("base", true).expect("stop must succeed");
    assert_eq!(registry.history(), ["stop top", "stop mid", "stop base"]);
    assert!(registry.list_running().expect("list").is_empty());
}

#[test]
fn start_blocker_checks_minimum_versions() {
    let base = InstalledComponent {
        running: true,
        ..InstalledComponent::new("base", "1.0")
    };
    let app = InstalledComponent {
        requires: vec![Requirement::at_least("base", "1.2")],
        ..InstalledComponent::new("app", "1.0")
    };
    let cause = start_blocker(&app, &[base]).expect("must block");
    assert!(cause.contains("at least 1.2"));
}
