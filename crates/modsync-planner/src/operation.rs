use std::fmt;

use modsync_core::InstalledComponent;

use crate::candidate::Candidate;

/// Operation verbs in extraction priority order, lowest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OperationKind {
    Skip,
    Stop,
    Remove,
    Install,
    Start,
}

impl OperationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Skip => "skip",
            Self::Stop => "stop",
            Self::Remove => "remove",
            Self::Install => "install",
            Self::Start => "start",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    Skip(Candidate),
    Stop(InstalledComponent),
    Remove(InstalledComponent),
    Install(Candidate),
    Start(InstalledComponent),
}

impl Operation {
    pub fn kind(&self) -> OperationKind {
        match self {
            Self::Skip(_) => OperationKind::Skip,
            Self::Stop(_) => OperationKind::Stop,
            Self::Remove(_) => OperationKind::Remove,
            Self::Install(_) => OperationKind::Install,
            Self::Start(_) => OperationKind::Start,
        }
    }

    pub fn target_id(&self) -> Option<&str> {
        match self {
            Self::Skip(candidate) | Self::Install(candidate) => candidate.component_id.as_deref(),
            Self::Stop(component) | Self::Remove(component) | Self::Start(component) => {
                Some(&component.id)
            }
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Skip(candidate) | Self::Install(candidate) => {
                write!(f, "{} {}", self.kind().as_str(), candidate.label())
            }
            Self::Stop(component) | Self::Remove(component) | Self::Start(component) => write!(
                f,
                "{} {} version {}",
                self.kind().as_str(),
                component.id,
                component.version
            ),
        }
    }
}

/// Pending operations, kept in insertion order.
#[derive(Debug, Clone, Default)]
pub struct OperationBag {
    operations: Vec<Operation>,
}

impl OperationBag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, operation: Operation) {
        self.operations.push(operation);
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Operation> {
        self.operations.iter()
    }

    pub fn has_pending(&self, kind: OperationKind, id: &str) -> bool {
        self.operations
            .iter()
            .any(|operation| operation.kind() == kind && operation.target_id() == Some(id))
    }

    pub(crate) fn remove(&mut self, index: usize) -> Operation {
        self.operations.remove(index)
    }
}
