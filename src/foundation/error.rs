/// Crate-wide result alias.
pub type StrataResult<T> = Result<T, StrataError>;

/// Errors raised by the document model and the compositor.
#[derive(thiserror::Error, Debug)]
pub enum StrataError {
    /// A caller broke a documented precondition (sizes, bounds, indices).
    #[error("precondition violated: {0}")]
    Precondition(String),

    /// Backing memory for a pixel buffer could not be reserved.
    #[error("allocation failed: {0}")]
    Allocation(String),

    /// The named object was torn down before this call.
    #[error("{0} has been disposed")]
    Disposed(&'static str),

    /// More than one render slice failed during a parallel update.
    #[error("{} render slices failed; first: {}", .0.len(), first_message(.0))]
    Workers(Vec<StrataError>),

    /// Option or configuration value rejected at construction time.
    #[error("validation error: {0}")]
    Validation(String),

    /// Anything else, usually from an outer collaborator.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl StrataError {
    /// Build a [`StrataError::Precondition`].
    pub fn precondition(msg: impl Into<String>) -> Self {
        Self::Precondition(msg.into())
    }

    /// Build a [`StrataError::Allocation`].
    pub fn allocation(msg: impl Into<String>) -> Self {
        Self::Allocation(msg.into())
    }

    /// Build a [`StrataError::Disposed`] for the named object kind.
    pub fn disposed(what: &'static str) -> Self {
        Self::Disposed(what)
    }

    /// Build a [`StrataError::Validation`].
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Collapse per-slice failures into one error.
    ///
    /// Returns `None` when `failures` is empty.
    pub(crate) fn aggregate(mut failures: Vec<StrataError>) -> Option<Self> {
        match failures.len() {
            0 => None,
            1 => failures.pop(),
            _ => Some(Self::Workers(failures)),
        }
    }
}

fn first_message(errs: &[StrataError]) -> String {
    errs.first().map(ToString::to_string).unwrap_or_default()
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
