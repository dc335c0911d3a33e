//! Pipeline-specific error types.

use crate::pipeline::engine::EngineError;
use crate::pipeline::id::{EdgeId, NodeId};
use crate::types::DatasetKind;
use thiserror::Error;

/// Errors that can occur within the pipeline system.
///
/// `Configuration` and `Engine` are recoverable: the failing node keeps its
/// previous outputs and the rest of the pipeline stays interactive.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    #[error("{node}: this filter does not support {kind} objects")]
    Configuration { node: String, kind: DatasetKind },

    #[error("{node}: engine operation failed: {source}")]
    Engine { node: String, source: EngineError },

    #[error("{node}: output of kind {kind} does not match the declared output capabilities")]
    OutputMismatch { node: String, kind: DatasetKind },

    #[error("Cannot connect '{from}' to '{to}': incompatible capabilities")]
    Incompatible { from: String, to: String },

    #[error("Invalid node: {0:?}")]
    InvalidNode(NodeId),

    #[error("Invalid edge {0:?}")]
    InvalidEdge(EdgeId),

    #[error("Cannot connect a node to itself: {0:?}")]
    SelfLoop(NodeId),

    #[error("Cycle detected in pipeline graph")]
    CycleDetected,

    #[error("{node} has no upstream input")]
    MissingInput { node: String },

    #[error("Snapshot error: {0}")]
    Snapshot(String),
}

impl PipelineError {
    pub fn engine(node: impl Into<String>, source: EngineError) -> Self {
        PipelineError::Engine {
            node: node.into(),
            source,
        }
    }

    /// Whether the error is recoverable within one update cycle.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            PipelineError::Configuration { .. } | PipelineError::Engine { .. }
        )
    }
}

pub type PipelineResult<T> = std::result::Result<T, PipelineError>;
