//! Persistable pipeline state.
//!
//! Every persisted field is listed explicitly per node type. Outputs, actors,
//! widgets, the running flag and anything re-derivable from upstream data
//! (extraction bounds, axis limits) are never stored; they come back by
//! replaying construction, connection and `start()`.

use crate::pipeline::engine::ParamValue;
use crate::pipeline::id::NodeId;
use crate::pipeline::nodes::{ActorProperties, OutlineMode};
use crate::types::{DatasetKind, Extent};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Current snapshot format version.
pub const SNAPSHOT_VERSION: u32 = 1;

pub type ParamMap = BTreeMap<String, ParamValue>;

/// Allow-listed state of one built-in node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NodeState {
    Source {
        source_id: String,
        #[serde(default)]
        file_path: Option<PathBuf>,
        #[serde(default)]
        kind: Option<DatasetKind>,
        #[serde(default)]
        extent: Extent,
    },
    #[serde(rename = "delaunay2d")]
    Delaunay2D { params: ParamMap },
    TriangleFilter { params: ParamMap },
    ExtractGrid,
    Outline {
        mode: OutlineMode,
        full: ParamMap,
        cornered: ParamMap,
        #[serde(default)]
        actor: ActorProperties,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub id: NodeId,
    pub name: String,
    #[serde(default = "default_visible")]
    pub visible: bool,
    pub state: NodeState,
}

fn default_visible() -> bool {
    true
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeRecord {
    pub from: NodeId,
    pub to: NodeId,
}

/// Structural snapshot of a whole pipeline. Nodes are in topological order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineSnapshot {
    pub version: u32,
    pub saved_at: DateTime<Utc>,
    pub nodes: Vec<NodeRecord>,
    pub edges: Vec<EdgeRecord>,
}

impl PipelineSnapshot {
    pub fn empty() -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            saved_at: Utc::now(),
            nodes: Vec::new(),
            edges: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> Option<&NodeRecord> {
        self.nodes.iter().find(|n| n.id == id)
    }
}

impl Default for PipelineSnapshot {
    fn default() -> Self {
        Self::empty()
    }
}
