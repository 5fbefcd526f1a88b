use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::version::ComponentVersion;

pub const DESCRIPTOR_PATH: &str = "metadata/component.toml";

#[derive(Debug, Error)]
pub enum DescriptorError {
    #[error("cannot find metadata/component.toml in package")]
    MissingDescriptor,
    #[error("invalid component descriptor: {0}")]
    InvalidDescriptor(String),
    #[error("failed to read package archive: {0}")]
    Archive(#[from] std::io::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Requirement {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_version: Option<String>,
}

impl Requirement {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            min_version: None,
        }
    }

    pub fn at_least(id: impl Into<String>, min_version: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            min_version: Some(min_version.into()),
        }
    }

    /// Receipt token form: `id` or `id@min_version`.
    pub fn to_token(&self) -> String {
        match &self.min_version {
            Some(min_version) => format!("{}@{}", self.id, min_version),
            None => self.id.clone(),
        }
    }

    pub fn from_token(token: &str) -> Self {
        match token.split_once('@') {
            Some((id, min_version)) if !min_version.is_empty() => Self::at_least(id, min_version),
            Some((id, _)) => Self::new(id),
            None => Self::new(token),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ComponentDescriptor {
    pub id: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub requires: Vec<Requirement>,
}

impl ComponentDescriptor {
    pub fn new(id: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            version: version.into(),
            requires: Vec::new(),
        }
    }

    pub fn requiring(mut self, requirement: Requirement) -> Self {
        self.requires.push(requirement);
        self
    }

    pub fn from_toml_str(input: &str) -> Result<Self, DescriptorError> {
        let mut descriptor: Self = toml::from_str(input)
            .map_err(|err| DescriptorError::InvalidDescriptor(err.to_string()))?;
        descriptor.id = descriptor.id.trim().to_string();
        descriptor.version = descriptor.version.trim().to_string();

        validate_component_id(&descriptor.id)?;
        validate_version_text(&descriptor.id, &descriptor.version)?;

        let mut seen = HashSet::new();
        for requirement in &descriptor.requires {
            validate_component_id(&requirement.id)?;
            if requirement.id == descriptor.id {
                return Err(DescriptorError::InvalidDescriptor(format!(
                    "component '{}' requires itself",
                    descriptor.id
                )));
            }
            if !seen.insert(requirement.id.as_str()) {
                return Err(DescriptorError::InvalidDescriptor(format!(
                    "component '{}' declares requirement '{}' twice",
                    descriptor.id, requirement.id
                )));
            }
            if let Some(min_version) = &requirement.min_version {
                ComponentVersion::parse(min_version).map_err(|err| {
                    DescriptorError::InvalidDescriptor(format!(
                        "requirement '{}' of '{}': {err}",
                        requirement.id, descriptor.id
                    ))
                })?;
            }
        }

        Ok(descriptor)
    }

    pub fn to_toml_string(&self) -> Result<String, DescriptorError> {
        toml::to_string(self).map_err(|err| DescriptorError::InvalidDescriptor(err.to_string()))
    }
}

/// Component ids name host directories and receipt files, so they must stay a
/// single plain path segment.
pub fn validate_component_id(id: &str) -> Result<(), DescriptorError> {
    if id.is_empty() {
        return Err(DescriptorError::InvalidDescriptor(
            "component id must not be empty".to_string(),
        ));
    }
    if id.len() > 128 {
        return Err(DescriptorError::InvalidDescriptor(format!(
            "component id '{id}' is longer than 128 characters"
        )));
    }

    let mut chars = id.chars();
    let first_is_valid = chars
        .next()
        .is_some_and(|first| first.is_ascii_alphanumeric());
    let rest_is_valid =
        chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' || ch == '.');
    if !first_is_valid || !rest_is_valid || id.contains("..") {
        return Err(DescriptorError::InvalidDescriptor(format!(
            "invalid component id '{}': use letters, digits, '-', '_' or '.'",
            id.escape_debug()
        )));
    }
    Ok(())
}

fn validate_version_text(id: &str, version: &str) -> Result<(), DescriptorError> {
    if version.is_empty() {
        return Err(DescriptorError::InvalidDescriptor(format!(
            "component '{id}' has an empty version"
        )));
    }
    if version
        .chars()
        .any(|ch| ch.is_control() || ch == '/' || ch == '\\')
    {
        return Err(DescriptorError::InvalidDescriptor(format!(
            "component '{id}' has an invalid version '{}'",
            version.escape_debug()
        )));
    }
    Ok(())
}
