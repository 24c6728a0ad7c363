use thiserror::Error;

/// An error reported by an accelerator runtime
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum RuntimeError {
    /// The runtime could not be loaded at all
    #[error("failed to load accelerator runtime: {0}")]
    Unavailable(String),

    /// The request was refused because the process lacks the necessary privilege
    ///
    /// This is an expected outcome of privileged requests rather than a malfunction.
    #[error("{call} was not permitted")]
    NotPermitted { call: &'static str },

    /// An enumeration returned fewer entries than are available, carrying the raw result code of the runtime
    #[error("{call} returned a truncated result: result code {code}")]
    Truncated { call: &'static str, code: i32 },

    /// Any other failure, carrying the raw result code of the runtime
    #[error("{call} failed: result code {code}")]
    Failed { call: &'static str, code: i32 },
}

impl RuntimeError {
    /// Returns the raw result code of the runtime, if there is one
    pub fn code(&self) -> Option<i32> {
        match self {
            Self::Truncated { code, .. } | Self::Failed { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Returns whether this error signals a denial by policy
    pub fn is_not_permitted(&self) -> bool {
        matches!(self, Self::NotPermitted { .. })
    }
}

/// A failure of the accelerator negotiator
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum NegotiationFailure {
    #[error("failed to enumerate accelerators: {0}")]
    Enumeration(RuntimeError),

    /// No accelerator meets the minimum version and has a suitable queue family
    #[error("no suitable accelerator/queue family")]
    NoSuitableAccelerator,

    #[error("failed to create execution context: {0}")]
    ContextCreation(RuntimeError),
}

/// A failure of the probe as a whole
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum ProbeError {
    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    #[error(transparent)]
    Negotiation(#[from] NegotiationFailure),
}
