mod bundle;
mod descriptor;
mod memory;
mod package;
mod registry;
mod version;

pub use bundle::{read_bundle, read_bundle_file, simple_filename, BundleError, PACKAGE_EXTENSION};
pub use descriptor::{
    validate_component_id, ComponentDescriptor, DescriptorError, Requirement, DESCRIPTOR_PATH,
};
pub use memory::MemoryRegistry;
pub use package::{read_descriptor, write_package, StagedPackage};
pub use registry::{running_dependents_of, start_blocker, ComponentRegistry, InstalledComponent};
pub use version::{
    compare_versions, satisfies_minimum, should_install, ComponentVersion, VersionParseError,
    SNAPSHOT_QUALIFIER,
};

#[cfg(test)]
mod tests;
