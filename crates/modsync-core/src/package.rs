use std::io::{Cursor, Read};
use std::path::Path;

use anyhow::{Context, Result};
use flate2::read::GzDecoder;
use tar::{Archive, Builder, Header};

use crate::descriptor::{ComponentDescriptor, DescriptorError, DESCRIPTOR_PATH};

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Package bytes extracted from a bundle, consumed at most once by an install.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedPackage {
    original_filename: String,
    data: Vec<u8>,
}

impl StagedPackage {
    pub fn new(original_filename: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            original_filename: original_filename.into(),
            data,
        }
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let data = std::fs::read(path)
            .with_context(|| format!("failed to read package: {}", path.display()))?;
        let original_filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self::new(original_filename, data))
    }

    pub fn original_filename(&self) -> &str {
        &self.original_filename
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }
}

pub(crate) fn open_archive(data: &[u8]) -> Archive<Box<dyn Read + '_>> {
    let reader: Box<dyn Read + '_> = if data.starts_with(&GZIP_MAGIC) {
        Box::new(GzDecoder::new(data))
    } else {
        Box::new(Cursor::new(data))
    };
    Archive::new(reader)
}

pub fn read_descriptor(data: &[u8]) -> Result<ComponentDescriptor, DescriptorError> {
    let mut archive = open_archive(data);
    for entry in archive.entries()? {
        let mut entry = entry?;
        let path = entry.path()?;
        let normalized = path.to_string_lossy().trim_start_matches("./").to_string();
        if normalized != DESCRIPTOR_PATH {
            continue;
        }

        let mut raw = String::new();
        entry.read_to_string(&mut raw)?;
        return ComponentDescriptor::from_toml_str(&raw);
    }

    Err(DescriptorError::MissingDescriptor)
}

/// Builds an uncompressed package archive holding the descriptor and payload files.
pub fn write_package(
    descriptor: &ComponentDescriptor,
    payload: &[(String, Vec<u8>)],
) -> Result<Vec<u8>> {
    let mut builder = Builder::new(Vec::new());
    let descriptor_toml = descriptor.to_toml_string()?;
    append_file(&mut builder, DESCRIPTOR_PATH, descriptor_toml.as_bytes())?;
    for (path, bytes) in payload {
        if path.trim_start_matches("./") == DESCRIPTOR_PATH {
            continue;
        }
        append_file(&mut builder, path, bytes)?;
    }
    builder
        .into_inner()
        .context("failed to finish package archive")
}

fn append_file(builder: &mut Builder<Vec<u8>>, path: &str, bytes: &[u8]) -> Result<()> {
    let mut header = Header::new_gnu();
    header.set_size(bytes.len() as u64);
    header.set_mode(0o644);
    header.set_cksum();
    builder
        .append_data(&mut header, path, bytes)
        .with_context(|| format!("failed to append '{path}' to package archive"))
}
