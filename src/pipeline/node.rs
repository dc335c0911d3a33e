//! Node abstraction for the pipeline.
//!
//! Two-layer design:
//! - **`NodePlugin` trait** — the shared capability set every node exposes
//!   (`start`, `stop`, `update_pipeline`, `update_data`, outputs, actors,
//!   widgets). User-defined nodes implement it directly.
//! - **`BuiltinNode` enum** — all built-in nodes, dispatched by `match`.
//!
//! `AnyNode` wraps either variant so the pipeline can handle both uniformly.
//!
//! Every node composes a [`NodeCore`]: declared capabilities, current outputs,
//! the [`SceneSync`] lifecycle helper and an outbox of [`NodeEvent`]s that the
//! pipeline drains and propagates after each call.

use crate::pipeline::error::{PipelineError, PipelineResult};
use crate::pipeline::event::NodeEvent;
use crate::pipeline::info::PipelineInfo;
use crate::pipeline::lifecycle::SceneSync;
use crate::pipeline::node_type::NodeType;
use crate::pipeline::nodes::{ExtractGridNode, ModuleManager, OutlineModule, SimpleFilter, SourceNode};
use crate::pipeline::persist::NodeState;
use crate::pipeline::scene::{ActorRef, SceneRef, WidgetRef};
use crate::types::Dataset;

/// State shared by every node: capabilities, outputs, scene sync and events.
#[derive(Debug)]
pub struct NodeCore {
    name: String,
    input_info: PipelineInfo,
    output_info: PipelineInfo,
    outputs: Vec<Dataset>,
    scene: SceneSync,
    events: Vec<NodeEvent>,
}

impl NodeCore {
    pub fn new(name: impl Into<String>, input_info: PipelineInfo, output_info: PipelineInfo) -> Self {
        Self {
            name: name.into(),
            input_info,
            output_info,
            outputs: Vec::new(),
            scene: SceneSync::new(),
            events: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn input_info(&self) -> &PipelineInfo {
        &self.input_info
    }

    pub fn output_info(&self) -> &PipelineInfo {
        &self.output_info
    }

    pub fn outputs(&self) -> &[Dataset] {
        &self.outputs
    }

    pub fn scene(&self) -> &SceneSync {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut SceneSync {
        &mut self.scene
    }

    pub fn is_running(&self) -> bool {
        self.scene.is_running()
    }

    pub fn is_visible(&self) -> bool {
        self.scene.is_visible()
    }

    // ── Outputs ──

    /// Replace the outputs wholesale. Fires exactly one `PipelineChanged`.
    pub fn set_outputs(&mut self, outputs: Vec<Dataset>) -> PipelineResult<()> {
        self.check_outputs(&outputs)?;
        self.outputs = outputs;
        self.emit(NodeEvent::PipelineChanged);
        Ok(())
    }

    pub fn push_output(&mut self, output: Dataset) -> PipelineResult<()> {
        self.check_outputs(std::slice::from_ref(&output))?;
        self.outputs.push(output);
        self.emit(NodeEvent::PipelineChanged);
        Ok(())
    }

    pub fn remove_output(&mut self, index: usize) -> Option<Dataset> {
        if index >= self.outputs.len() {
            return None;
        }
        let removed = self.outputs.remove(index);
        self.emit(NodeEvent::PipelineChanged);
        Some(removed)
    }

    fn check_outputs(&self, outputs: &[Dataset]) -> PipelineResult<()> {
        match outputs.iter().find(|d| !self.output_info.accepts(d.kind())) {
            Some(bad) => Err(PipelineError::OutputMismatch {
                node: self.name.clone(),
                kind: bad.kind(),
            }),
            None => Ok(()),
        }
    }

    // ── Events ──

    pub fn notify_pipeline_changed(&mut self) {
        self.emit(NodeEvent::PipelineChanged);
    }

    pub fn notify_data_changed(&mut self) {
        self.emit(NodeEvent::DataChanged);
    }

    pub fn emit(&mut self, event: NodeEvent) {
        tracing::trace!("{}: {:?}", self.name, event);
        self.events.push(event);
    }

    /// Hand queued events to the caller.
    pub fn take_events(&mut self) -> Vec<NodeEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn pending_events(&self) -> &[NodeEvent] {
        &self.events
    }
}

/// Read-only view of upstream outputs passed to update hooks.
pub struct NodeContext<'a> {
    /// Outputs of each upstream node, in edge order.
    pub inputs: &'a [Vec<Dataset>],
}

impl<'a> NodeContext<'a> {
    pub fn new(inputs: &'a [Vec<Dataset>]) -> Self {
        Self { inputs }
    }

    /// Context with no upstream nodes.
    pub fn empty() -> NodeContext<'static> {
        NodeContext { inputs: &[] }
    }

    /// First output of the first upstream node.
    pub fn first_input(&self) -> Option<&Dataset> {
        self.inputs.first().and_then(|outputs| outputs.first())
    }

    /// All outputs of the first upstream node.
    pub fn first_outputs(&self) -> &[Dataset] {
        self.inputs.first().map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Capability set shared by every pipeline node.
pub trait NodePlugin {
    fn core(&self) -> &NodeCore;

    fn core_mut(&mut self) -> &mut NodeCore;

    /// Human-readable name of this node.
    fn name(&self) -> &str {
        self.core().name()
    }

    /// Register actors and widgets with the scene. No-op if running.
    fn start(&mut self) -> bool {
        self.core_mut().scene_mut().start()
    }

    /// Deregister actors and widgets. No-op if stopped.
    fn stop(&mut self) -> bool {
        self.core_mut().scene_mut().stop()
    }

    fn set_visible(&mut self, visible: bool) -> bool {
        self.core_mut().scene_mut().set_visible(visible)
    }

    fn set_scene(&mut self, scene: Option<&SceneRef>) {
        self.core_mut().scene_mut().set_scene(scene);
    }

    /// Rebuild outputs after an upstream topology change.
    fn update_pipeline(&mut self, ctx: &NodeContext) -> PipelineResult<()>;

    /// Refresh after an upstream value-only change.
    fn update_data(&mut self, ctx: &NodeContext) -> PipelineResult<()>;

    /// Render-facing leaves return `true`; the pipeline then attaches a
    /// module manager when they are connected.
    fn is_module(&self) -> bool {
        false
    }

    fn set_module_manager(&mut self, _manager: Option<ModuleManager>) {}

    /// Persistable state, or `None` if this node cannot be saved.
    fn snapshot(&self) -> Option<NodeState> {
        None
    }
}

/// Enum dispatch for built-in nodes.
pub enum BuiltinNode {
    Source(SourceNode),
    Filter(SimpleFilter),
    ExtractGrid(ExtractGridNode),
    Outline(OutlineModule),
}

macro_rules! dispatch {
    ($self:expr, $n:ident => $body:expr) => {
        match $self {
            BuiltinNode::Source($n) => $body,
            BuiltinNode::Filter($n) => $body,
            BuiltinNode::ExtractGrid($n) => $body,
            BuiltinNode::Outline($n) => $body,
        }
    };
}

impl BuiltinNode {
    pub fn node_type(&self) -> NodeType {
        match self {
            BuiltinNode::Source(_) => NodeType::Source,
            BuiltinNode::Filter(n) => n.kind().node_type(),
            BuiltinNode::ExtractGrid(_) => NodeType::ExtractGrid,
            BuiltinNode::Outline(_) => NodeType::Outline,
        }
    }
}

impl NodePlugin for BuiltinNode {
    fn core(&self) -> &NodeCore {
        dispatch!(self, n => n.core())
    }

    fn core_mut(&mut self) -> &mut NodeCore {
        dispatch!(self, n => n.core_mut())
    }

    fn start(&mut self) -> bool {
        dispatch!(self, n => n.start())
    }

    fn stop(&mut self) -> bool {
        dispatch!(self, n => n.stop())
    }

    fn set_visible(&mut self, visible: bool) -> bool {
        dispatch!(self, n => n.set_visible(visible))
    }

    fn set_scene(&mut self, scene: Option<&SceneRef>) {
        dispatch!(self, n => n.set_scene(scene))
    }

    fn update_pipeline(&mut self, ctx: &NodeContext) -> PipelineResult<()> {
        dispatch!(self, n => n.update_pipeline(ctx))
    }

    fn update_data(&mut self, ctx: &NodeContext) -> PipelineResult<()> {
        dispatch!(self, n => n.update_data(ctx))
    }

    fn is_module(&self) -> bool {
        dispatch!(self, n => n.is_module())
    }

    fn set_module_manager(&mut self, manager: Option<ModuleManager>) {
        dispatch!(self, n => n.set_module_manager(manager))
    }

    fn snapshot(&self) -> Option<NodeState> {
        dispatch!(self, n => n.snapshot())
    }
}

/// Wrapper that holds either a built-in node (enum dispatch) or a plugin (trait object).
pub enum AnyNode {
    Builtin(BuiltinNode),
    Plugin(Box<dyn NodePlugin>),
}

impl AnyNode {
    pub fn as_node(&self) -> &dyn NodePlugin {
        match self {
            AnyNode::Builtin(n) => n,
            AnyNode::Plugin(n) => n.as_ref(),
        }
    }

    pub fn as_node_mut(&mut self) -> &mut dyn NodePlugin {
        match self {
            AnyNode::Builtin(n) => n,
            AnyNode::Plugin(n) => n.as_mut(),
        }
    }

    /// Built-in type, `None` for plugins.
    pub fn node_type(&self) -> Option<NodeType> {
        match self {
            AnyNode::Builtin(n) => Some(n.node_type()),
            AnyNode::Plugin(_) => None,
        }
    }

    pub fn name(&self) -> &str {
        self.as_node().name()
    }

    pub fn outputs(&self) -> &[Dataset] {
        self.as_node().core().outputs()
    }

    pub fn actors(&self) -> &[ActorRef] {
        self.as_node().core().scene().actors()
    }

    pub fn widgets(&self) -> &[WidgetRef] {
        self.as_node().core().scene().widgets()
    }

    pub fn is_running(&self) -> bool {
        self.as_node().core().is_running()
    }

    pub fn is_visible(&self) -> bool {
        self.as_node().core().is_visible()
    }

    pub fn take_events(&mut self) -> Vec<NodeEvent> {
        self.as_node_mut().core_mut().take_events()
    }

    pub fn as_source(&self) -> Option<&SourceNode> {
        match self {
            AnyNode::Builtin(BuiltinNode::Source(n)) => Some(n),
            _ => None,
        }
    }

    pub fn as_source_mut(&mut self) -> Option<&mut SourceNode> {
        match self {
            AnyNode::Builtin(BuiltinNode::Source(n)) => Some(n),
            _ => None,
        }
    }

    pub fn as_filter(&self) -> Option<&SimpleFilter> {
        match self {
            AnyNode::Builtin(BuiltinNode::Filter(n)) => Some(n),
            _ => None,
        }
    }

    pub fn as_filter_mut(&mut self) -> Option<&mut SimpleFilter> {
        match self {
            AnyNode::Builtin(BuiltinNode::Filter(n)) => Some(n),
            _ => None,
        }
    }

    pub fn as_extract_grid(&self) -> Option<&ExtractGridNode> {
        match self {
            AnyNode::Builtin(BuiltinNode::ExtractGrid(n)) => Some(n),
            _ => None,
        }
    }

    pub fn as_extract_grid_mut(&mut self) -> Option<&mut ExtractGridNode> {
        match self {
            AnyNode::Builtin(BuiltinNode::ExtractGrid(n)) => Some(n),
            _ => None,
        }
    }

    pub fn as_outline(&self) -> Option<&OutlineModule> {
        match self {
            AnyNode::Builtin(BuiltinNode::Outline(n)) => Some(n),
            _ => None,
        }
    }

    pub fn as_outline_mut(&mut self) -> Option<&mut OutlineModule> {
        match self {
            AnyNode::Builtin(BuiltinNode::Outline(n)) => Some(n),
            _ => None,
        }
    }
}

impl From<BuiltinNode> for AnyNode {
    fn from(node: BuiltinNode) -> Self {
        AnyNode::Builtin(node)
    }
}

impl From<SourceNode> for AnyNode {
    fn from(node: SourceNode) -> Self {
        AnyNode::Builtin(BuiltinNode::Source(node))
    }
}

impl From<SimpleFilter> for AnyNode {
    fn from(node: SimpleFilter) -> Self {
        AnyNode::Builtin(BuiltinNode::Filter(node))
    }
}

impl From<ExtractGridNode> for AnyNode {
    fn from(node: ExtractGridNode) -> Self {
        AnyNode::Builtin(BuiltinNode::ExtractGrid(node))
    }
}

impl From<OutlineModule> for AnyNode {
    fn from(node: OutlineModule) -> Self {
        AnyNode::Builtin(BuiltinNode::Outline(node))
    }
}
