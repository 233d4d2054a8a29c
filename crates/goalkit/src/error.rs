//! Error types for goal resolution.

use callkit::CallError;
use thiserror::Error;

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;

/// A goal's source could not produce a value.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ResolveError {
    /// The report has no aggregate with this api-name.
    #[error("metric {0} not found")]
    MetricNotFound(String),

    /// The report did not have the expected shape.
    #[error("report {report_id} is malformed: {reason}")]
    MalformedReport {
        /// Report that was fetched.
        report_id: String,
        /// What was missing or wrong.
        reason: String,
    },

    /// The goal's source parameters are unusable.
    #[error("goal {goal} has an invalid source: {reason}")]
    MalformedSource {
        /// Configured goal id.
        goal: String,
        /// What is wrong with it.
        reason: String,
    },

    /// No credential could be obtained for the report service.
    #[error("report service credential: {0}")]
    Credential(String),
}

/// Errors that abort a synchronization pass.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    /// A referenced goal id is not configured.
    #[error("referenced goal '{0}' does not exist")]
    UnknownGoal(String),

    /// Goal ids that depend on themselves, from first occurrence to re-entry.
    #[error("cyclic goal dependency: {}", .0.join(" -> "))]
    CyclicDependency(Vec<String>),

    /// A remote call failed.
    #[error(transparent)]
    Upstream(#[from] CallError),

    /// A goal's source could not produce a value.
    #[error("goal '{goal}': {source}")]
    Resolve {
        /// Configured goal id.
        goal: String,
        /// Underlying cause.
        #[source]
        source: ResolveError,
    },

    /// The goal store reports a zero target, so no ratio exists.
    #[error("goal '{goal}' has a zero target value")]
    ZeroTarget {
        /// Configured goal id.
        goal: String,
    },
}

impl EngineError {
    /// Wrap a resolve error with the goal it happened in.
    pub fn resolve(goal: impl Into<String>, source: ResolveError) -> Self {
        Self::Resolve {
            goal: goal.into(),
            source,
        }
    }

    /// The underlying call error, if this is an upstream failure.
    pub fn call_error(&self) -> Option<&CallError> {
        match self {
            Self::Upstream(e) => Some(e),
            _ => None,
        }
    }
}

/// Errors from the report service: either the call failed or its answer was unusable.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ReportError {
    #[error(transparent)]
    Call(#[from] CallError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),
}

impl ReportError {
    /// Attach a goal id, producing an engine error.
    pub fn for_goal(self, goal: &str) -> EngineError {
        match self {
            Self::Call(e) => EngineError::Upstream(e),
            Self::Resolve(e) => EngineError::resolve(goal, e),
        }
    }
}
