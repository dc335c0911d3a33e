//! Visualization pipeline: nodes, their scene synchronization and change
//! propagation.
//!
//! Datasets flow from sources through filters into modules, which own the
//! actors shown in the scene:
//!
//! ```text
//! [Source] ──► [ExtractGrid] ──► [Outline] ──► scene
//!          └─► [Delaunay2D] ──► [TriangleFilter]
//! ```
//!
//! # Design
//!
//! - **Enum dispatch** — `BuiltinNode` enum for all built-in nodes,
//!   `NodePlugin` trait objects for user nodes.
//! - **Two change signals** — `PipelineChanged` (outputs replaced) and
//!   `DataChanged` (values only) are queued by nodes and propagated depth-first
//!   by the [`Pipeline`].
//! - **Shared lifecycle helper** — every node composes a [`SceneSync`] that
//!   keeps actors and widgets registered exactly while the node is started.
//! - **Narrow engine contract** — filters hold [`EngineHandle`]s and never see
//!   a concrete geometry engine.
//! - **Single-threaded** — all mutation happens on the caller's thread;
//!   observers receive [`PipelineMessage`]s over crossbeam channels.

pub mod bridge;
pub mod engine;
pub mod error;
pub mod event;
pub mod executor;
pub mod id;
pub mod info;
pub mod lifecycle;
pub mod node;
pub mod node_type;
pub mod nodes;
pub mod persist;
pub mod reference_engine;
pub mod registry;
pub mod scene;

pub use bridge::{PipelineBridge, MSG_CHANNEL_CAPACITY};
pub use engine::{
    ChangeCallback, Engine, EngineClass, EngineError, EngineHandle, EngineObject, EngineRef,
    EngineResult, ParamValue,
};
pub use error::{PipelineError, PipelineResult};
pub use event::{NodeEvent, PipelineMessage};
pub use executor::{Edge, NodeFactory, Pipeline, DEFAULT_SOURCE_ID};
pub use id::{ActorId, DatasetId, EdgeId, HandleId, NodeId, WidgetId};
pub use info::PipelineInfo;
pub use lifecycle::SceneSync;
pub use node::{AnyNode, BuiltinNode, NodeContext, NodeCore, NodePlugin};
pub use node_type::NodeType;
pub use nodes::{
    ActorBundle, ActorProperties, ExtractGridNode, ModuleManager, OutlineMode, OutlineModule,
    Representation, SimpleFilter, SimpleFilterKind, SourceNode,
};
pub use persist::{EdgeRecord, NodeRecord, NodeState, PipelineSnapshot, SNAPSHOT_VERSION};
pub use reference_engine::ReferenceEngine;
pub use registry::SourceMetadata;
pub use scene::{Actor, ActorRef, RecordingScene, Scene, SceneLink, SceneRef, Widget, WidgetRef};
