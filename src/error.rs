use std::fmt;

/// Result alias used throughout the crate for fallible, recoverable operations.
///
/// Programmer errors (invariant violations in the hot path) are not
/// represented here; those panic, matching the original engine's
/// `assert`-as-fatal convention.
pub type Result<T> = std::result::Result<T, StrideError>;

#[derive(Debug)]
pub enum StrideError {
    Config(String),
    Io(std::io::Error),
    EmptyWeights,
    NotEnoughCandidates { deficit: usize },
    InvariantViolation(String),
    InvalidLogMode(String),
}

impl fmt::Display for StrideError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StrideError::Config(msg) => write!(f, "configuration error: {}", msg),
            StrideError::Io(e) => write!(f, "I/O error: {}", e),
            StrideError::EmptyWeights => write!(f, "alias sampler built from empty or zero-sum weights"),
            StrideError::NotEnoughCandidates { deficit } => {
                write!(f, "population has no {} remaining candidates matching predicate", deficit)
            }
            StrideError::InvariantViolation(msg) => write!(f, "invariant violation: {}", msg),
            StrideError::InvalidLogMode(s) => write!(f, "invalid log mode: {}", s),
        }
    }
}

impl std::error::Error for StrideError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StrideError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for StrideError {
    fn from(e: std::io::Error) -> Self {
        StrideError::Io(e)
    }
}

impl From<serde_json::Error> for StrideError {
    fn from(e: serde_json::Error) -> Self {
        StrideError::Config(e.to_string())
    }
}

impl From<serde_yaml::Error> for StrideError {
    fn from(e: serde_yaml::Error) -> Self {
        StrideError::Config(e.to_string())
    }
}
