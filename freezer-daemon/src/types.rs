//! Request-scoped values shared by every layer.

use std::fmt;
use std::str::FromStr;

/// UID of a pod, taken from an authenticated token and never from a request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PodIdentity(String);

impl PodIdentity {
    pub fn new(uid: impl Into<String>) -> Self {
        Self(uid.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PodIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Runtime-native container ID. Only meaningful to the runtime client that
/// produced it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContainerRef(String);

impl ContainerRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContainerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ContainerRef {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// A container as listed by a runtime, before eligibility filtering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerInfo {
    pub id: ContainerRef,
    /// Kubernetes container name (`queue-proxy`, `user-container`, ...).
    pub name: String,
}

impl ContainerInfo {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: ContainerRef::new(id),
            name: name.into(),
        }
    }
}

/// The two operations the engine exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Freeze,
    Thaw,
}

impl Action {
    /// Verb used in logs and error messages.
    pub fn verb(&self) -> &'static str {
        match self {
            Action::Freeze => "pause",
            Action::Thaw => "resume",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Freeze => write!(f, "freeze"),
            Action::Thaw => write!(f, "thaw"),
        }
    }
}

/// Unrecognised action name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownAction(pub String);

impl fmt::Display for UnknownAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown action: {:?}", self.0)
    }
}

impl std::error::Error for UnknownAction {}

impl FromStr for Action {
    type Err = UnknownAction;

    /// Accepts both the body vocabulary (`pause`/`resume`) and the path
    /// vocabulary (`freeze`/`thaw`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pause" | "freeze" => Ok(Action::Freeze),
            "resume" | "thaw" => Ok(Action::Thaw),
            other => Err(UnknownAction(other.to_string())),
        }
    }
}
