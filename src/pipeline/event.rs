//! Change notifications emitted by nodes and published by the pipeline.

use crate::pipeline::id::{EdgeId, HandleId, NodeId};

/// Notification a node queues for the pipeline to drain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeEvent {
    /// `outputs` was replaced or structurally modified. Downstream rebuilds.
    PipelineChanged,
    /// Values changed, shape preserved. Downstream may refresh cheaply.
    DataChanged,
    /// The computed active engine object of a module changed.
    ActiveFilterChanged { old: HandleId, new: HandleId },
}

impl NodeEvent {
    pub fn is_pipeline_changed(&self) -> bool {
        matches!(self, NodeEvent::PipelineChanged)
    }

    pub fn is_data_changed(&self) -> bool {
        matches!(self, NodeEvent::DataChanged)
    }
}

/// Messages published to pipeline observers.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineMessage {
    /// A node emitted an event.
    Node { node: NodeId, event: NodeEvent },

    /// A node failed to update; it keeps its previous outputs.
    Error { node: NodeId, message: String },

    NodeAdded(NodeId),
    NodeRemoved(NodeId),
    EdgeAdded {
        edge: EdgeId,
        from: NodeId,
        to: NodeId,
    },
    EdgeRemoved(EdgeId),

    /// All live nodes were started.
    Started,
    /// All live nodes were stopped.
    Stopped,
}
