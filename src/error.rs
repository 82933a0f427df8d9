//! Error types for enhancer pipelines.
//!
//! Only failures that must reach a caller live here. Usage mistakes made
//! while *declaring* an enhancer (a `render` entry in a hook set, a hook with
//! the wrong shape) are reported through `tracing` and skipped instead.

use thiserror::Error;

/// Errors raised while rendering an enhanced unit or applying state updates.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EnhanceError {
    /// A state handler failed while computing its partial state.
    #[error("state handler `{name}` failed: {message}")]
    Handler { name: String, message: String },

    /// A branch predicate could not be evaluated.
    #[error("branch predicate failed: {0}")]
    Predicate(String),

    /// A rendering unit failed to produce output.
    #[error("unit `{unit}` failed to render: {message}")]
    Render { unit: String, message: String },

    /// A props field was expected to hold a callback.
    #[error("field `{0}` is not callable")]
    NotCallable(String),

    /// A props field required by a unit is absent.
    #[error("missing field `{0}`")]
    MissingField(String),

    /// A custom lifecycle method was called but never declared.
    #[error("unknown instance method `{0}`")]
    UnknownMethod(String),

    /// A name that is not one of the lifecycle phases was parsed as a hook.
    #[error("unknown lifecycle hook `{0}`")]
    UnknownHook(String),

    /// The host was re-entered while it was already mutating the tree.
    #[error("host re-entered during render")]
    Reentrant,

    /// State updates kept scheduling more updates past the configured limit.
    #[error("update limit of {0} exceeded; a hook keeps scheduling state updates")]
    UpdateLoop(usize),
}

impl EnhanceError {
    /// Build a handler error from any displayable message.
    pub fn handler(name: impl Into<String>, message: impl std::fmt::Display) -> Self {
        EnhanceError::Handler {
            name: name.into(),
            message: message.to_string(),
        }
    }

    /// Build a render error from any displayable message.
    pub fn render(unit: impl Into<String>, message: impl std::fmt::Display) -> Self {
        EnhanceError::Render {
            unit: unit.into(),
            message: message.to_string(),
        }
    }
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, EnhanceError>;
