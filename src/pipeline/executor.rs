//! Pipeline executor — the node graph and its change propagation.
//!
//! All work happens synchronously on the caller's thread. After every call
//! into a node the pipeline drains the node's queued events and:
//! 1. Publishes them to every subscribed [`PipelineBridge`].
//! 2. On `PipelineChanged`, runs `update_pipeline` on each direct downstream
//!    node (edge order).
//! 3. On `DataChanged`, runs `update_data` on each direct downstream node.
//!
//! Recursion is depth-first, so the whole cascade completes before the
//! triggering call returns. A node that fails keeps its previous outputs and
//! its own downstream is left alone.

use crate::pipeline::bridge::{PipelineBridge, Subscribers, MSG_CHANNEL_CAPACITY};
use crate::pipeline::engine::EngineRef;
use crate::pipeline::error::{PipelineError, PipelineResult};
use crate::pipeline::event::{NodeEvent, PipelineMessage};
use crate::pipeline::id::{EdgeId, NodeId};
use crate::pipeline::node::{AnyNode, BuiltinNode, NodeContext};
use crate::pipeline::node_type::NodeType;
use crate::pipeline::nodes::{
    ExtractGridNode, ModuleManager, OutlineModule, SimpleFilter, SimpleFilterKind, SourceNode,
};
use crate::pipeline::persist::{
    EdgeRecord, NodeRecord, NodeState, PipelineSnapshot, SNAPSHOT_VERSION,
};
use crate::pipeline::scene::SceneRef;
use crate::types::Dataset;
use chrono::Utc;
use std::collections::{HashMap, HashSet};

/// Source used when a generic `NodeType::Source` is requested.
pub const DEFAULT_SOURCE_ID: &str = "VTKFile";

/// An edge feeding the outputs of one node into another.
#[derive(Debug, Clone)]
pub struct Edge {
    pub id: EdgeId,
    pub from_node: NodeId,
    pub to_node: NodeId,
}

/// A slot holding a node and the outcome of its last update.
pub struct NodeSlot {
    pub node: AnyNode,
    /// Whether this node has been deleted (slot is empty).
    pub deleted: bool,
    pub last_error: Option<PipelineError>,
}

impl NodeSlot {
    pub fn new(node: AnyNode) -> Self {
        Self {
            node,
            deleted: false,
            last_error: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UpdateKind {
    Pipeline,
    Data,
}

/// The pipeline graph.
pub struct Pipeline {
    nodes: Vec<NodeSlot>,
    edges: Vec<Edge>,
    next_edge: u32,
    /// Topological order (indices into `nodes`). Recomputed on graph change.
    execution_order: Vec<usize>,
    /// True when execution_order needs recomputing (deferred topo sort).
    execution_order_dirty: bool,
    scene: Option<SceneRef>,
    running: bool,
    subscribers: Subscribers,
    message_capacity: usize,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl Pipeline {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            edges: Vec::new(),
            next_edge: 0,
            execution_order: Vec::new(),
            execution_order_dirty: false,
            scene: None,
            running: false,
            subscribers: Subscribers::default(),
            message_capacity: MSG_CHANNEL_CAPACITY,
        }
    }

    pub fn with_scene(scene: SceneRef) -> Self {
        let mut pipeline = Self::new();
        pipeline.scene = Some(scene);
        pipeline
    }

    /// Capacity of channels handed out by [`subscribe`](Self::subscribe).
    pub fn with_message_capacity(mut self, capacity: usize) -> Self {
        self.message_capacity = capacity.max(1);
        self
    }

    // ── Graph building ──

    /// Add a node. It joins the pipeline's scene and is started if the
    /// pipeline is running.
    pub fn add_node(&mut self, node: impl Into<AnyNode>) -> NodeId {
        let mut node = node.into();
        node.as_node_mut().set_scene(self.scene.as_ref());
        if self.running {
            node.as_node_mut().start();
        }

        let id = NodeId(self.nodes.len() as u32);
        tracing::info!("Added node {:?} ({})", id, node.name());
        self.nodes.push(NodeSlot::new(node));
        self.execution_order_dirty = true;
        self.subscribers.publish(&PipelineMessage::NodeAdded(id));
        // Events queued during construction have no downstream yet.
        self.propagate(id, true);
        id
    }

    /// Stop a node, drop its edges and mark its slot deleted.
    pub fn remove_node(&mut self, id: NodeId) -> PipelineResult<()> {
        self.check_node(id)?;
        let slot = &mut self.nodes[id.index()];
        slot.node.as_node_mut().stop();
        slot.deleted = true;

        let (removed, kept): (Vec<Edge>, Vec<Edge>) = std::mem::take(&mut self.edges)
            .into_iter()
            .partition(|e| e.from_node == id || e.to_node == id);
        self.edges = kept;
        for edge in &removed {
            self.subscribers.publish(&PipelineMessage::EdgeRemoved(edge.id));
            if edge.from_node == id {
                self.detach_orphaned_module(edge.to_node);
            }
        }

        self.execution_order_dirty = true;
        self.subscribers.publish(&PipelineMessage::NodeRemoved(id));
        tracing::info!("Removed node {:?} ({} edges dropped)", id, removed.len());
        Ok(())
    }

    /// Feed the outputs of `from` into `to`, then update `to` and everything
    /// downstream of it.
    ///
    /// Graph errors are returned. A failing update of `to` is not: the edge
    /// stays, the failure is recorded in [`last_error`](Self::last_error) and
    /// published.
    pub fn connect(&mut self, from: NodeId, to: NodeId) -> PipelineResult<EdgeId> {
        self.check_node(from)?;
        self.check_node(to)?;
        if from == to {
            return Err(PipelineError::SelfLoop(from));
        }
        if let Some(edge) = self
            .edges
            .iter()
            .find(|e| e.from_node == from && e.to_node == to)
        {
            return Ok(edge.id);
        }
        if self.would_create_cycle(from, to) {
            return Err(PipelineError::CycleDetected);
        }

        let from_core = self.nodes[from.index()].node.as_node().core();
        let to_core = self.nodes[to.index()].node.as_node().core();
        if !from_core.output_info().is_compatible_with(to_core.input_info()) {
            return Err(PipelineError::Incompatible {
                from: from_core.name().to_string(),
                to: to_core.name().to_string(),
            });
        }

        let id = EdgeId(self.next_edge);
        self.next_edge += 1;
        self.edges.push(Edge {
            id,
            from_node: from,
            to_node: to,
        });
        self.execution_order_dirty = true;
        self.subscribers
            .publish(&PipelineMessage::EdgeAdded { edge: id, from, to });
        tracing::info!("Added edge {:?}: {:?} -> {:?}", id, from, to);

        if self.nodes[to.index()].node.as_node().is_module() {
            let outputs = self.nodes[from.index()].node.outputs().to_vec();
            self.nodes[to.index()]
                .node
                .as_node_mut()
                .set_module_manager(Some(ModuleManager::new(outputs)));
        }

        let _ = self.run_update(to, UpdateKind::Pipeline);
        Ok(id)
    }

    pub fn disconnect(&mut self, edge_id: EdgeId) -> PipelineResult<()> {
        let idx = self
            .edges
            .iter()
            .position(|e| e.id == edge_id)
            .ok_or(PipelineError::InvalidEdge(edge_id))?;
        let edge = self.edges.remove(idx);
        self.execution_order_dirty = true;
        self.detach_orphaned_module(edge.to_node);
        self.subscribers
            .publish(&PipelineMessage::EdgeRemoved(edge_id));
        tracing::info!("Removed edge {:?}", edge_id);
        Ok(())
    }

    /// A module with no remaining inbound edge loses its manager.
    fn detach_orphaned_module(&mut self, id: NodeId) {
        if self.edges.iter().any(|e| e.to_node == id) {
            return;
        }
        let node = self.nodes[id.index()].node.as_node_mut();
        if node.is_module() {
            node.set_module_manager(None);
            tracing::debug!("Detached module manager from {:?}", id);
        }
    }

    fn would_create_cycle(&self, from: NodeId, to: NodeId) -> bool {
        // If `to` can reach `from` through existing edges, adding from->to creates a cycle.
        let mut visited = vec![false; self.nodes.len()];
        let mut stack = vec![to];

        while let Some(current) = stack.pop() {
            if current == from {
                return true;
            }
            let idx = current.index();
            if idx >= self.nodes.len() || visited[idx] {
                continue;
            }
            visited[idx] = true;

            for edge in &self.edges {
                if edge.from_node == current && !self.nodes[edge.to_node.index()].deleted {
                    stack.push(edge.to_node);
                }
            }
        }
        false
    }

    fn check_node(&self, id: NodeId) -> PipelineResult<()> {
        match self.nodes.get(id.index()) {
            Some(slot) if !slot.deleted => Ok(()),
            _ => Err(PipelineError::InvalidNode(id)),
        }
    }

    /// Recompute the topological order now instead of on next use.
    pub fn flush_execution_order(&mut self) {
        if self.execution_order_dirty {
            self.recompute_execution_order();
            self.execution_order_dirty = false;
        }
    }

    fn recompute_execution_order(&mut self) {
        let n = self.nodes.len();
        let mut in_degree = vec![0u32; n];
        let mut adj: Vec<Vec<usize>> = vec![Vec::new(); n];

        for edge in &self.edges {
            let from = edge.from_node.index();
            let to = edge.to_node.index();
            if from < n && to < n {
                adj[from].push(to);
                in_degree[to] += 1;
            }
        }

        // Kahn's algorithm; reversed so that lower ids pop first.
        let mut queue: Vec<usize> = (0..n)
            .rev()
            .filter(|&i| in_degree[i] == 0 && !self.nodes[i].deleted)
            .collect();
        let mut order = Vec::with_capacity(n);

        while let Some(node) = queue.pop() {
            order.push(node);
            for &next in adj[node].iter().rev() {
                in_degree[next] -= 1;
                if in_degree[next] == 0 {
                    queue.push(next);
                }
            }
        }

        let live = self.nodes.iter().filter(|s| !s.deleted).count();
        if order.len() != live {
            tracing::warn!(
                "Pipeline graph has a cycle! Only {} of {} nodes scheduled.",
                order.len(),
                live
            );
        }

        self.execution_order = order;
    }

    // ── Lifecycle ──

    /// Start every live node in topological order. Returns `false` if
    /// already running.
    pub fn start(&mut self) -> bool {
        if self.running {
            return false;
        }
        self.flush_execution_order();
        for &idx in &self.execution_order {
            self.nodes[idx].node.as_node_mut().start();
        }
        self.running = true;
        self.subscribers.publish(&PipelineMessage::Started);
        tracing::info!("Pipeline started ({} nodes)", self.execution_order.len());
        true
    }

    /// Stop every live node. Returns `false` if already stopped.
    pub fn stop(&mut self) -> bool {
        if !self.running {
            return false;
        }
        self.flush_execution_order();
        for &idx in &self.execution_order {
            self.nodes[idx].node.as_node_mut().stop();
        }
        self.running = false;
        self.subscribers.publish(&PipelineMessage::Stopped);
        tracing::info!("Pipeline stopped");
        true
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn scene(&self) -> Option<&SceneRef> {
        self.scene.as_ref()
    }

    /// Move every node to another scene.
    pub fn set_scene(&mut self, scene: Option<SceneRef>) {
        self.scene = scene;
        for slot in self.nodes.iter_mut().filter(|s| !s.deleted) {
            slot.node.as_node_mut().set_scene(self.scene.as_ref());
        }
        tracing::debug!("Scene reassigned (present: {})", self.scene.is_some());
    }

    /// Observe node events, errors and topology changes.
    pub fn subscribe(&mut self) -> PipelineBridge {
        let (bridge, tx) = PipelineBridge::new(self.message_capacity);
        self.subscribers.add(tx);
        bridge
    }

    // ── Updates ──

    /// Rebuild `id` from its upstream outputs and propagate.
    pub fn update(&mut self, id: NodeId) -> PipelineResult<()> {
        self.check_node(id)?;
        self.run_update(id, UpdateKind::Pipeline)
    }

    /// Refresh `id` after a value-only change and propagate.
    pub fn refresh(&mut self, id: NodeId) -> PipelineResult<()> {
        self.check_node(id)?;
        self.run_update(id, UpdateKind::Data)
    }

    /// Mutate a node, then propagate whatever it emitted.
    pub fn modify<R>(&mut self, id: NodeId, f: impl FnOnce(&mut AnyNode) -> R) -> PipelineResult<R> {
        self.check_node(id)?;
        let result = f(&mut self.nodes[id.index()].node);
        self.propagate(id, true);
        Ok(result)
    }

    fn run_update(&mut self, id: NodeId, kind: UpdateKind) -> PipelineResult<()> {
        let inputs = self.inputs_of(id);
        let ctx = NodeContext::new(&inputs);
        let slot = &mut self.nodes[id.index()];
        let result = match kind {
            UpdateKind::Pipeline => slot.node.as_node_mut().update_pipeline(&ctx),
            UpdateKind::Data => slot.node.as_node_mut().update_data(&ctx),
        };

        match &result {
            Ok(()) => slot.last_error = None,
            Err(e) => {
                tracing::warn!("Node {:?} ({}) failed to update: {}", id, slot.node.name(), e);
                slot.last_error = Some(e.clone());
                self.subscribers.publish(&PipelineMessage::Error {
                    node: id,
                    message: e.to_string(),
                });
            }
        }
        self.propagate(id, result.is_ok());
        result
    }

    fn propagate(&mut self, id: NodeId, cascade: bool) {
        let events = self.nodes[id.index()].node.take_events();
        for event in events {
            self.subscribers
                .publish(&PipelineMessage::Node { node: id, event });
            if !cascade {
                continue;
            }
            let kind = match event {
                NodeEvent::PipelineChanged => UpdateKind::Pipeline,
                NodeEvent::DataChanged => UpdateKind::Data,
                NodeEvent::ActiveFilterChanged { .. } => continue,
            };
            for next in self.downstream(id) {
                // Failures are recorded and published by run_update.
                let _ = self.run_update(next, kind);
            }
        }
    }

    // ── Queries ──

    pub fn node(&self, id: NodeId) -> Option<&AnyNode> {
        self.nodes
            .get(id.index())
            .filter(|s| !s.deleted)
            .map(|s| &s.node)
    }

    /// Error of the node's most recent update, cleared on success.
    pub fn last_error(&self, id: NodeId) -> Option<&PipelineError> {
        self.nodes
            .get(id.index())
            .and_then(|s| s.last_error.as_ref())
    }

    /// Ids of all live nodes, in insertion order.
    pub fn node_ids(&self) -> Vec<NodeId> {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, s)| !s.deleted)
            .map(|(i, _)| NodeId(i as u32))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.nodes.iter().filter(|s| !s.deleted).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Live nodes in topological order.
    pub fn execution_order(&mut self) -> Vec<NodeId> {
        self.flush_execution_order();
        self.execution_order
            .iter()
            .map(|&i| NodeId(i as u32))
            .collect()
    }

    /// Direct downstream nodes in edge order.
    pub fn downstream(&self, id: NodeId) -> Vec<NodeId> {
        self.edges
            .iter()
            .filter(|e| e.from_node == id)
            .map(|e| e.to_node)
            .collect()
    }

    /// Direct upstream nodes in edge order.
    pub fn upstream(&self, id: NodeId) -> Vec<NodeId> {
        self.edges
            .iter()
            .filter(|e| e.to_node == id)
            .map(|e| e.from_node)
            .collect()
    }

    /// Outputs of each upstream node, in edge order.
    pub fn inputs_of(&self, id: NodeId) -> Vec<Vec<Dataset>> {
        self.upstream(id)
            .into_iter()
            .map(|up| self.nodes[up.index()].node.outputs().to_vec())
            .collect()
    }

    // ── Persistence ──

    /// Structural snapshot of every persistable node, in topological order.
    /// Plugin nodes and their edges are skipped.
    pub fn snapshot(&mut self) -> PipelineSnapshot {
        self.flush_execution_order();
        let mut nodes = Vec::with_capacity(self.execution_order.len());
        for &idx in &self.execution_order {
            let slot = &self.nodes[idx];
            let id = NodeId(idx as u32);
            match slot.node.as_node().snapshot() {
                Some(state) => nodes.push(NodeRecord {
                    id,
                    name: slot.node.name().to_string(),
                    visible: slot.node.is_visible(),
                    state,
                }),
                None => tracing::warn!(
                    "Node {:?} ({}) is not persistable, skipping",
                    id,
                    slot.node.name()
                ),
            }
        }

        let saved: HashSet<NodeId> = nodes.iter().map(|n| n.id).collect();
        let edges = self
            .edges
            .iter()
            .filter(|e| saved.contains(&e.from_node) && saved.contains(&e.to_node))
            .map(|e| EdgeRecord {
                from: e.from_node,
                to: e.to_node,
            })
            .collect::<Vec<_>>();

        tracing::info!("Saved snapshot: {} nodes, {} edges", nodes.len(), edges.len());
        PipelineSnapshot {
            version: SNAPSHOT_VERSION,
            saved_at: Utc::now(),
            nodes,
            edges,
        }
    }

    /// Rebuild a pipeline: construct every node, add it, connect edges in
    /// topological order of their targets (each connect updates the target),
    /// then start.
    pub fn restore(
        snapshot: &PipelineSnapshot,
        engine: EngineRef,
        scene: Option<SceneRef>,
    ) -> PipelineResult<Pipeline> {
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(PipelineError::Snapshot(format!(
                "Unsupported snapshot version {} (expected {})",
                snapshot.version, SNAPSHOT_VERSION
            )));
        }

        let factory = NodeFactory::new(engine);
        let mut pipeline = Pipeline::new();
        pipeline.set_scene(scene);

        let mut ids: HashMap<NodeId, NodeId> = HashMap::new();
        for record in &snapshot.nodes {
            let mut node = factory.restore(&record.state)?;
            node.as_node_mut().set_visible(record.visible);
            let id = pipeline.add_node(node);
            ids.insert(record.id, id);
        }

        let position = |id: NodeId| snapshot.nodes.iter().position(|n| n.id == id);
        let mut edges = snapshot.edges.clone();
        edges.sort_by_key(|e| position(e.to));
        for edge in edges {
            let lookup = |id: NodeId| {
                ids.get(&id)
                    .copied()
                    .ok_or_else(|| PipelineError::Snapshot(format!("Edge references unknown node {:?}", id)))
            };
            pipeline.connect(lookup(edge.from)?, lookup(edge.to)?)?;
        }

        pipeline.start();
        tracing::info!(
            "Restored snapshot: {} nodes, {} edges",
            snapshot.nodes.len(),
            snapshot.edges.len()
        );
        Ok(pipeline)
    }
}

/// Creates built-in nodes against an engine.
pub struct NodeFactory {
    engine: EngineRef,
}

impl NodeFactory {
    pub fn new(engine: EngineRef) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &EngineRef {
        &self.engine
    }

    /// Create a node of the given type with default settings.
    pub fn create(&self, node_type: NodeType) -> PipelineResult<AnyNode> {
        Ok(match node_type {
            NodeType::Source => return self.create_source(DEFAULT_SOURCE_ID),
            NodeType::Delaunay2D => {
                SimpleFilter::new(SimpleFilterKind::Delaunay2D, self.engine.as_ref())?.into()
            }
            NodeType::TriangleFilter => {
                SimpleFilter::new(SimpleFilterKind::TriangleFilter, self.engine.as_ref())?.into()
            }
            NodeType::ExtractGrid => ExtractGridNode::new(self.engine.clone())?.into(),
            NodeType::Outline => OutlineModule::new(self.engine.as_ref())?.into(),
        })
    }

    /// Create a source from its registry id.
    pub fn create_source(&self, source_id: &str) -> PipelineResult<AnyNode> {
        Ok(AnyNode::Builtin(BuiltinNode::Source(SourceNode::from_id(source_id)?)))
    }

    /// Reconstruct a node from its persisted state.
    pub fn restore(&self, state: &NodeState) -> PipelineResult<AnyNode> {
        match state {
            NodeState::Source {
                source_id,
                file_path,
                kind,
                extent,
            } => {
                let mut node = SourceNode::from_id(source_id)?;
                node.set_file_path(file_path.clone());
                if let Some(kind) = kind {
                    node.set_dataset(*kind, *extent)?;
                }
                Ok(node.into())
            }
            NodeState::Delaunay2D { params } => {
                let mut node = SimpleFilter::new(SimpleFilterKind::Delaunay2D, self.engine.as_ref())?;
                node.apply_params(params)?;
                Ok(node.into())
            }
            NodeState::TriangleFilter { params } => {
                let mut node =
                    SimpleFilter::new(SimpleFilterKind::TriangleFilter, self.engine.as_ref())?;
                node.apply_params(params)?;
                Ok(node.into())
            }
            NodeState::ExtractGrid => Ok(ExtractGridNode::new(self.engine.clone())?.into()),
            NodeState::Outline {
                mode,
                full,
                cornered,
                actor,
            } => {
                let mut node = OutlineModule::new(self.engine.as_ref())?;
                node.apply_params(full, cornered)?;
                node.set_mode(*mode)?;
                node.actor_mut().set_properties(actor.clone());
                Ok(node.into())
            }
        }
    }
}
