//! Test data builders for sources and pipelines

use std::rc::Rc;
use vizpipe::pipeline::{
    NodeFactory, NodeId, NodeType, Pipeline, ReferenceEngine, SceneRef, SourceNode,
};
use vizpipe::types::{DatasetKind, Extent};

/// Builder for creating test sources
pub struct SourceBuilder {
    source_id: String,
    kind: Option<DatasetKind>,
    extent: Extent,
}

impl SourceBuilder {
    pub fn new(source_id: &str) -> Self {
        Self {
            source_id: source_id.to_string(),
            kind: None,
            extent: Extent::EMPTY,
        }
    }

    /// A PLOT3D reader holding a structured grid.
    pub fn structured_grid() -> Self {
        Self::new("PLOT3DFile")
            .kind(DatasetKind::StructuredGrid)
            .extent(Extent::new((0, 19), (0, 9), (0, 4)))
    }

    /// A VTK reader holding an unstructured point cloud.
    pub fn point_cloud() -> Self {
        Self::new("VTKFile")
            .kind(DatasetKind::UnstructuredGrid)
            .extent(Extent::new((0, 99), (0, 0), (0, 0)))
    }

    pub fn kind(mut self, kind: DatasetKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn extent(mut self, extent: Extent) -> Self {
        self.extent = extent;
        self
    }

    pub fn build(self) -> SourceNode {
        let mut source = SourceNode::from_id(&self.source_id).unwrap();
        if let Some(kind) = self.kind {
            source.set_dataset(kind, self.extent).unwrap();
        }
        source
    }
}

/// A pipeline over the reference engine with handles kept for assertions.
pub struct TestPipeline {
    pub engine: Rc<ReferenceEngine>,
    pub factory: NodeFactory,
    pub pipeline: Pipeline,
}

impl TestPipeline {
    pub fn new(scene: Option<SceneRef>) -> Self {
        let engine = Rc::new(ReferenceEngine::new());
        let mut pipeline = Pipeline::new();
        pipeline.set_scene(scene);
        Self {
            factory: NodeFactory::new(engine.clone()),
            engine,
            pipeline,
        }
    }

    pub fn add(&mut self, node_type: NodeType) -> NodeId {
        let node = self.factory.create(node_type).unwrap();
        self.pipeline.add_node(node)
    }

    pub fn add_source(&mut self, source: SourceBuilder) -> NodeId {
        self.pipeline.add_node(source.build())
    }

    /// Add `types` and connect them one after another behind `upstream`.
    pub fn chain(&mut self, upstream: NodeId, types: &[NodeType]) -> Vec<NodeId> {
        let mut previous = upstream;
        let mut ids = Vec::with_capacity(types.len());
        for &node_type in types {
            let id = self.add(node_type);
            self.pipeline.connect(previous, id).unwrap();
            ids.push(id);
            previous = id;
        }
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_builder() {
        let source = SourceBuilder::structured_grid().build();
        let dataset = source.dataset().unwrap();
        assert_eq!(dataset.kind(), DatasetKind::StructuredGrid);
        assert_eq!(dataset.extent().dimensions(), [20, 10, 5]);
    }
}
