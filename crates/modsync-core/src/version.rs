use std::cmp::Ordering;
use std::fmt;

use thiserror::Error;

/// Marks a build that is not an immutable release and may be reinstalled.
pub const SNAPSHOT_QUALIFIER: &str = "-SNAPSHOT";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed version '{version}': {detail}")]
pub struct VersionParseError {
    pub version: String,
    pub detail: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentVersion {
    numbers: Vec<u64>,
    snapshot: bool,
}

impl ComponentVersion {
    pub fn parse(input: &str) -> Result<Self, VersionParseError> {
        let trimmed = input.trim();
        let malformed = |detail: &str| VersionParseError {
            version: input.to_string(),
            detail: detail.to_string(),
        };
        if trimmed.is_empty() {
            return Err(malformed("version is empty"));
        }

        let (base, snapshot) = strip_snapshot_qualifier(trimmed);
        let numeric = base.split('-').next().unwrap_or(base);

        let mut numbers = Vec::new();
        for component in numeric.split('.') {
            let digits: String = component
                .chars()
                .take_while(|ch| ch.is_ascii_digit())
                .collect();
            if digits.is_empty() {
                return Err(malformed(&format!(
                    "component '{component}' does not start with a digit"
                )));
            }
            let value = digits
                .parse::<u64>()
                .map_err(|_| malformed(&format!("component '{component}' is out of range")))?;
            numbers.push(value);
        }

        Ok(Self { numbers, snapshot })
    }

    pub fn is_snapshot(&self) -> bool {
        self.snapshot
    }

    /// Compares dotted numeric parts only; missing trailing parts count as 0.
    pub fn cmp_numeric(&self, other: &Self) -> Ordering {
        let len = self.numbers.len().max(other.numbers.len());
        for index in 0..len {
            let left = self.numbers.get(index).copied().unwrap_or(0);
            let right = other.numbers.get(index).copied().unwrap_or(0);
            match left.cmp(&right) {
                Ordering::Equal => continue,
                unequal => return unequal,
            }
        }
        Ordering::Equal
    }
}

impl Ord for ComponentVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.cmp_numeric(other)
            .then_with(|| match (self.snapshot, other.snapshot) {
                (false, true) => Ordering::Greater,
                (true, false) => Ordering::Less,
                _ => Ordering::Equal,
            })
    }
}

impl PartialOrd for ComponentVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for ComponentVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let numbers = self
            .numbers
            .iter()
            .map(u64::to_string)
            .collect::<Vec<_>>()
            .join(".");
        if self.snapshot {
            write!(f, "{numbers}{SNAPSHOT_QUALIFIER}")
        } else {
            f.write_str(&numbers)
        }
    }
}

fn strip_snapshot_qualifier(input: &str) -> (&str, bool) {
    let split = input.len().saturating_sub(SNAPSHOT_QUALIFIER.len());
    match (input.get(..split), input.get(split..)) {
        (Some(base), Some(suffix)) if suffix.eq_ignore_ascii_case(SNAPSHOT_QUALIFIER) => {
            (base, true)
        }
        _ => (input, false),
    }
}

pub fn compare_versions(candidate: &str, reference: &str) -> Result<Ordering, VersionParseError> {
    let candidate = ComponentVersion::parse(candidate)?;
    let reference = ComponentVersion::parse(reference)?;
    Ok(candidate.cmp(&reference))
}

/// Decides whether `candidate` should replace an installed `reference`.
///
/// Differing numeric parts decide outright. At equal numeric parts a
/// snapshot reference is always replaced (a release supersedes it, and a
/// snapshot build is always fresh), while a release reference is kept.
pub fn should_install(candidate: &str, reference: &str) -> Result<bool, VersionParseError> {
    let candidate = ComponentVersion::parse(candidate)?;
    let reference = ComponentVersion::parse(reference)?;
    Ok(match candidate.cmp_numeric(&reference) {
        Ordering::Greater => true,
        Ordering::Less => false,
        Ordering::Equal => reference.is_snapshot(),
    })
}

pub fn satisfies_minimum(version: &str, minimum: &str) -> Result<bool, VersionParseError> {
    Ok(compare_versions(version, minimum)? != Ordering::Less)
}
