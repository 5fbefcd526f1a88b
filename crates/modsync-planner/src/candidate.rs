use modsync_core::{read_descriptor, DescriptorError, InstalledComponent, StagedPackage};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Install,
    Upgrade { existing: InstalledComponent },
    Skip { reason: String },
    StartOnly { existing: InstalledComponent },
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Install => "install",
            Self::Upgrade { .. } => "upgrade",
            Self::Skip { .. } => "skip",
            Self::StartOnly { .. } => "start-only",
        }
    }
}

/// One package from a bundle, carried from descriptor read through scheduling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub original_filename: String,
    pub component_id: Option<String>,
    pub version: Option<String>,
    pub action: Option<Action>,
    package: StagedPackage,
}

impl Candidate {
    pub fn new(package: StagedPackage) -> Self {
        Self {
            original_filename: package.original_filename().to_string(),
            component_id: None,
            version: None,
            action: None,
            package,
        }
    }

    pub fn read_descriptor(&mut self) -> Result<(), DescriptorError> {
        let descriptor = read_descriptor(self.package.data())?;
        self.component_id = Some(descriptor.id);
        self.version = Some(descriptor.version);
        Ok(())
    }

    pub fn skip(&mut self, reason: impl Into<String>) {
        self.action = Some(Action::Skip {
            reason: reason.into(),
        });
    }

    pub fn skip_reason(&self) -> Option<&str> {
        match &self.action {
            Some(Action::Skip { reason }) => Some(reason),
            _ => None,
        }
    }

    pub fn existing(&self) -> Option<&InstalledComponent> {
        match &self.action {
            Some(Action::Upgrade { existing } | Action::StartOnly { existing }) => Some(existing),
            _ => None,
        }
    }

    pub fn label(&self) -> String {
        match (&self.component_id, &self.version) {
            (Some(id), Some(version)) => format!("{id} version {version}"),
            _ => self.original_filename.clone(),
        }
    }

    pub fn into_package(self) -> StagedPackage {
        self.package
    }
}
