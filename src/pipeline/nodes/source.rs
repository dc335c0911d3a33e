//! SourceNode — the root of every pipeline chain.
//!
//! Owns the dataset it produces. Replacing the dataset is a topology change
//! (`PipelineChanged`); touching it in place is a value change
//! (`DataChanged`).

use crate::pipeline::error::{PipelineError, PipelineResult};
use crate::pipeline::info::PipelineInfo;
use crate::pipeline::node::{NodeContext, NodeCore, NodePlugin};
use crate::pipeline::persist::NodeState;
use crate::pipeline::registry::{self, SourceMetadata};
use crate::types::{Dataset, DatasetKind, Extent};
use std::path::{Path, PathBuf};

pub struct SourceNode {
    core: NodeCore,
    metadata: &'static SourceMetadata,
    file_path: Option<PathBuf>,
}

impl SourceNode {
    pub fn new(metadata: &'static SourceMetadata) -> Self {
        Self {
            core: NodeCore::new(metadata.class_name, PipelineInfo::none(), metadata.output_info()),
            metadata,
            file_path: None,
        }
    }

    /// Construct from a registry id.
    pub fn from_id(source_id: &str) -> PipelineResult<Self> {
        registry::find_by_id(source_id)
            .map(Self::new)
            .ok_or_else(|| PipelineError::Snapshot(format!("Unknown source id '{}'", source_id)))
    }

    /// Construct a reader for `path`, picked by its extension.
    pub fn for_path(path: impl Into<PathBuf>) -> Option<Self> {
        let path = path.into();
        let metadata = registry::find_for_path(&path)?;
        let mut node = Self::new(metadata);
        node.file_path = Some(path);
        Some(node)
    }

    pub fn metadata(&self) -> &'static SourceMetadata {
        self.metadata
    }

    pub fn file_path(&self) -> Option<&Path> {
        self.file_path.as_deref()
    }

    pub fn set_file_path(&mut self, path: Option<PathBuf>) {
        self.file_path = path;
    }

    pub fn dataset(&self) -> Option<&Dataset> {
        self.core.outputs().first()
    }

    /// Replace the produced dataset. Fires `PipelineChanged`.
    pub fn set_dataset(&mut self, kind: DatasetKind, extent: Extent) -> PipelineResult<Dataset> {
        if !kind.is_concrete() {
            return Err(PipelineError::OutputMismatch {
                node: self.core.name().to_string(),
                kind,
            });
        }
        let dataset = Dataset::new(kind, extent);
        self.core.set_outputs(vec![dataset.clone()])?;
        tracing::debug!("{}: new {} dataset {:?}", self.core.name(), kind, extent);
        Ok(dataset)
    }

    /// Change the values in place (same shape). Fires `DataChanged`.
    pub fn touch(&mut self) {
        for output in self.core.outputs() {
            output.touch();
        }
        self.core.notify_data_changed();
    }

    /// Resize the dataset in place (same kind, new extent). Fires `DataChanged`.
    pub fn modify(&mut self, extent: Extent) -> bool {
        match self.dataset() {
            Some(ds) => {
                ds.modify(extent);
                self.core.notify_data_changed();
                true
            }
            None => false,
        }
    }
}

impl NodePlugin for SourceNode {
    fn core(&self) -> &NodeCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut NodeCore {
        &mut self.core
    }

    /// Sources have no upstream; re-announce the current outputs.
    fn update_pipeline(&mut self, _ctx: &NodeContext) -> PipelineResult<()> {
        if !self.core.outputs().is_empty() {
            self.core.notify_pipeline_changed();
        }
        Ok(())
    }

    fn update_data(&mut self, _ctx: &NodeContext) -> PipelineResult<()> {
        self.touch();
        Ok(())
    }

    fn snapshot(&self) -> Option<NodeState> {
        let dataset = self.dataset();
        Some(NodeState::Source {
            source_id: self.metadata.id.to_string(),
            file_path: self.file_path.clone(),
            kind: dataset.map(Dataset::kind),
            extent: dataset.map(Dataset::extent).unwrap_or_default(),
        })
    }
}
