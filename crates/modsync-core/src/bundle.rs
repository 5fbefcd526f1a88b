use std::io::Read;
use std::path::Path;

use thiserror::Error;
use tracing::debug;

use crate::package::{open_archive, StagedPackage};

pub const PACKAGE_EXTENSION: &str = ".cpk";

#[derive(Debug, Error)]
pub enum BundleError {
    #[error("bundle may only contain .cpk packages, but it contains: {0}")]
    UnexpectedEntry(String),
    #[error("failed to read bundle {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to read bundle archive: {0}")]
    Archive(#[from] std::io::Error),
}

pub fn read_bundle_file(path: &Path) -> Result<Vec<StagedPackage>, BundleError> {
    let data = std::fs::read(path).map_err(|source| BundleError::Read {
        path: path.display().to_string(),
        source,
    })?;
    read_bundle(&data)
}

/// Stages every package of a tar or tar.gz bundle, in archive order.
pub fn read_bundle(data: &[u8]) -> Result<Vec<StagedPackage>, BundleError> {
    let mut archive = open_archive(data);
    let mut staged = Vec::new();
    for entry in archive.entries()? {
        let mut entry = entry?;
        if entry.header().entry_type().is_dir() {
            continue;
        }

        let entry_name = entry.path()?.to_string_lossy().into_owned();
        if !entry_name.ends_with(PACKAGE_EXTENSION) {
            return Err(BundleError::UnexpectedEntry(entry_name));
        }

        let mut bytes = Vec::new();
        entry.read_to_end(&mut bytes)?;
        let filename = simple_filename(&entry_name);
        debug!(entry = %entry_name, size = bytes.len(), "staged bundle entry");
        staged.push(StagedPackage::new(filename, bytes));
    }
    Ok(staged)
}

pub fn simple_filename(name: &str) -> &str {
    name.rsplit(['/', '\\']).next().unwrap_or(name)
}
