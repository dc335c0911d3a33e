//! Node type enumeration for dynamic node creation.
//!
//! Every built-in node kind the [`NodeFactory`](crate::pipeline::NodeFactory)
//! can instantiate. Plugin nodes have no entry here.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeType {
    // Sources
    /// Dataset-producing root node (reader or procedural source).
    Source,

    // Filters
    /// 2D Delaunay triangulation of a point set.
    Delaunay2D,
    /// Converts polygons and strips to triangles.
    TriangleFilter,
    /// Extracts a sub-volume of a structured dataset.
    ExtractGrid,

    // Modules
    /// Bounding box display, full or cornered.
    Outline,
}

impl NodeType {
    /// Get the display name for this node type.
    pub fn display_name(&self) -> &'static str {
        match self {
            NodeType::Source => "Source",
            NodeType::Delaunay2D => "Delaunay 2D",
            NodeType::TriangleFilter => "Triangle Filter",
            NodeType::ExtractGrid => "Extract Grid",
            NodeType::Outline => "Outline",
        }
    }

    /// Get all available node types.
    pub fn all() -> &'static [NodeType] {
        &[
            NodeType::Source,
            NodeType::Delaunay2D,
            NodeType::TriangleFilter,
            NodeType::ExtractGrid,
            NodeType::Outline,
        ]
    }

    pub fn is_source(&self) -> bool {
        matches!(self, NodeType::Source)
    }

    pub fn is_filter(&self) -> bool {
        matches!(
            self,
            NodeType::Delaunay2D | NodeType::TriangleFilter | NodeType::ExtractGrid
        )
    }

    pub fn is_module(&self) -> bool {
        matches!(self, NodeType::Outline)
    }

    /// Get a detailed description of what this node does.
    pub fn description(&self) -> &'static str {
        match self {
            NodeType::Source =>
                "Produces a dataset from a file reader or a procedural source.\n\
                 Declares the dataset kinds it can emit.",

            NodeType::Delaunay2D =>
                "Triangulates a point set in the x-y plane.\n\
                 Accepts structured grids, poly data and unstructured grids.",

            NodeType::TriangleFilter =>
                "Converts input polygons and triangle strips to triangles.",

            NodeType::ExtractGrid =>
                "Selects a sub-volume of a structured dataset with per-axis bounds\n\
                 and sampling ratios. The extraction algorithm is chosen from the\n\
                 input kind.",

            NodeType::Outline =>
                "Draws the bounding box of its input.\n\
                 Can switch between a full box and cornered outline.",
        }
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categories_are_disjoint() {
        for ty in NodeType::all() {
            let count = [ty.is_source(), ty.is_filter(), ty.is_module()]
                .iter()
                .filter(|b| **b)
                .count();
            assert_eq!(count, 1, "{ty} must be in exactly one category");
        }
    }

    #[test]
    fn test_serde_uses_variant_names() {
        let json = serde_json::to_string(&NodeType::ExtractGrid).unwrap();
        assert_eq!(json, "\"ExtractGrid\"");
    }
}
