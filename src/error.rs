//! Error types for collection views.

use futures::task::SpawnError;
use thiserror::Error;

use crate::types::Record;

/// Failure reported by a single child view's render.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct RenderError {
    message: String,
}

impl RenderError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// A child whose render rejected during a joint render.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChildRenderFailure {
    pub record: Record,
    pub error: RenderError,
}

/// Errors raised by [`CollectionView`](crate::CollectionView) operations.
#[derive(Debug, Error)]
pub enum ViewError {
    /// Neither the instance options nor the configuration name a child view type.
    #[error("a child view type must be specified")]
    MissingChildView,

    /// One or more children failed to render. Every child was allowed to settle.
    #[error("{} child view(s) failed to render", .0.len())]
    ChildRenders(Vec<ChildRenderFailure>),

    /// A newer render started before this one settled.
    #[error("render superseded by a newer render")]
    Superseded,

    /// The view was closed.
    #[error("collection view is closed")]
    Closed,

    /// The executor dropped the render task before it completed.
    #[error("render task was dropped before completion")]
    Abandoned,

    #[error("failed to spawn render task: {0}")]
    Spawn(#[from] SpawnError),
}

impl ViewError {
    /// Child failures carried by this error, if any.
    pub fn failures(&self) -> &[ChildRenderFailure] {
        match self {
            ViewError::ChildRenders(failures) => failures,
            _ => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_child_view_message() {
        assert_eq!(
            ViewError::MissingChildView.to_string(),
            "a child view type must be specified"
        );
    }

    #[test]
    fn test_child_renders_counts_failures() {
        let failure = ChildRenderFailure {
            record: Record::anonymous(),
            error: RenderError::new("boom"),
        };
        let err = ViewError::ChildRenders(vec![failure.clone(), failure]);
        assert_eq!(err.to_string(), "2 child view(s) failed to render");
        assert_eq!(err.failures().len(), 2);
        assert!(ViewError::Closed.failures().is_empty());
    }
}
