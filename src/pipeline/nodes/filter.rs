//! SimpleFilter — a filter node wrapping exactly one engine object.
//!
//! Covers the filters whose behavior is entirely "feed the upstream dataset
//! to the engine object, recompute, publish its output": Delaunay
//! triangulation and triangle conversion. Parameters are forwarded to the
//! engine object by name.

use crate::pipeline::engine::{Engine, EngineClass, EngineError, EngineHandle, ParamValue};
use crate::pipeline::error::{PipelineError, PipelineResult};
use crate::pipeline::info::PipelineInfo;
use crate::pipeline::node::{NodeContext, NodeCore, NodePlugin};
use crate::pipeline::node_type::NodeType;
use crate::pipeline::persist::{NodeState, ParamMap};
use crate::pipeline::scene::SceneLink;
use crate::types::DatasetKind;
use serde::{Deserialize, Serialize};

/// Which single-object filter this is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SimpleFilterKind {
    /// 2D Delaunay triangulation of a point set.
    Delaunay2D,
    /// Convert input polygons and strips to triangles.
    TriangleFilter,
}

impl SimpleFilterKind {
    pub fn name(&self) -> &'static str {
        match self {
            SimpleFilterKind::Delaunay2D => "Delaunay2D",
            SimpleFilterKind::TriangleFilter => "TriangleFilter",
        }
    }

    pub fn engine_class(&self) -> EngineClass {
        match self {
            SimpleFilterKind::Delaunay2D => EngineClass::Delaunay2D,
            SimpleFilterKind::TriangleFilter => EngineClass::TriangleFilter,
        }
    }

    pub fn node_type(&self) -> NodeType {
        match self {
            SimpleFilterKind::Delaunay2D => NodeType::Delaunay2D,
            SimpleFilterKind::TriangleFilter => NodeType::TriangleFilter,
        }
    }

    pub fn input_info(&self) -> PipelineInfo {
        match self {
            SimpleFilterKind::Delaunay2D => PipelineInfo::new(&[
                DatasetKind::StructuredGrid,
                DatasetKind::PolyData,
                DatasetKind::UnstructuredGrid,
            ]),
            SimpleFilterKind::TriangleFilter => PipelineInfo::any(),
        }
    }

    pub fn output_info(&self) -> PipelineInfo {
        match self {
            SimpleFilterKind::Delaunay2D => PipelineInfo::new(&[DatasetKind::PolyData]),
            SimpleFilterKind::TriangleFilter => {
                PipelineInfo::new(&[DatasetKind::PolyData, DatasetKind::UnstructuredGrid])
            }
        }
    }
}

/// Subscribe `handle` so that any parameter edit requests a redraw of
/// whatever scene `link` currently points at.
pub(crate) fn render_on_change(handle: &EngineHandle, link: &SceneLink) {
    let link = link.clone();
    handle.subscribe(Box::new(move |_name| link.render()));
}

pub struct SimpleFilter {
    core: NodeCore,
    kind: SimpleFilterKind,
    filter: EngineHandle,
}

impl SimpleFilter {
    pub fn new(kind: SimpleFilterKind, engine: &dyn Engine) -> PipelineResult<Self> {
        let filter = engine
            .create(kind.engine_class())
            .map_err(|e| PipelineError::engine(kind.name(), e))?;
        let core = NodeCore::new(kind.name(), kind.input_info(), kind.output_info());
        render_on_change(&filter, core.scene().scene_link());
        Ok(Self { core, kind, filter })
    }

    pub fn delaunay_2d(engine: &dyn Engine) -> PipelineResult<Self> {
        Self::new(SimpleFilterKind::Delaunay2D, engine)
    }

    pub fn triangle_filter(engine: &dyn Engine) -> PipelineResult<Self> {
        Self::new(SimpleFilterKind::TriangleFilter, engine)
    }

    pub fn kind(&self) -> SimpleFilterKind {
        self.kind
    }

    pub fn filter(&self) -> &EngineHandle {
        &self.filter
    }

    pub fn param(&self, name: &str) -> Option<ParamValue> {
        self.filter.param(name)
    }

    /// Forward a parameter to the engine object. With an input attached the
    /// filter recomputes and fires `DataChanged`.
    pub fn set_param(&mut self, name: &str, value: ParamValue) -> PipelineResult<()> {
        self.filter
            .set_param(name, value)
            .map_err(|e| PipelineError::engine(self.kind.name(), e))?;
        if self.filter.input().is_some() {
            self.recompute()?;
            self.core.notify_data_changed();
        }
        Ok(())
    }

    /// Restore persisted parameters.
    pub fn apply_params(&mut self, params: &ParamMap) -> PipelineResult<()> {
        self.filter
            .apply_params(params)
            .map_err(|e| PipelineError::engine(self.kind.name(), e))
    }

    fn recompute(&self) -> PipelineResult<()> {
        self.filter
            .update()
            .map_err(|e| PipelineError::engine(self.kind.name(), e))
    }
}

impl NodePlugin for SimpleFilter {
    fn core(&self) -> &NodeCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut NodeCore {
        &mut self.core
    }

    fn update_pipeline(&mut self, ctx: &NodeContext) -> PipelineResult<()> {
        let Some(input) = ctx.first_input() else {
            return Ok(());
        };
        if !self.core.input_info().accepts(input.kind()) {
            return Err(PipelineError::Configuration {
                node: self.kind.name().to_string(),
                kind: input.kind(),
            });
        }

        self.filter.set_input(input.clone());
        self.recompute()?;
        let output = self.filter.output().ok_or_else(|| {
            PipelineError::engine(
                self.kind.name(),
                EngineError::Execution("no output produced".into()),
            )
        })?;
        self.core.set_outputs(vec![output])
    }

    fn update_data(&mut self, _ctx: &NodeContext) -> PipelineResult<()> {
        if self.filter.input().is_some() {
            self.recompute()?;
        }
        self.core.notify_data_changed();
        Ok(())
    }

    fn snapshot(&self) -> Option<NodeState> {
        let params = self.filter.params();
        Some(match self.kind {
            SimpleFilterKind::Delaunay2D => NodeState::Delaunay2D { params },
            SimpleFilterKind::TriangleFilter => NodeState::TriangleFilter { params },
        })
    }
}
