//! # vizpipe: visualization pipeline core
//!
//! Sources, filters and rendering modules composed into a directed acyclic
//! graph. Nodes exchange typed datasets, declare capability descriptors that
//! are checked on connection, and keep their actors and widgets in sync with
//! a shared scene as they start, stop, show and hide.
//!
//! ## Architecture
//!
//! - **Pipeline**: node graph with depth-first propagation of the two change
//!   signals (`PipelineChanged`, `DataChanged`)
//! - **Nodes**: sources, engine-backed filters and render-facing modules
//! - **Engine**: narrow contract to an external geometry engine, with an
//!   in-crate reference implementation
//! - **Persistence**: allow-listed snapshots saved in project files
//!
//! ## Example
//!
//! ```
//! use std::rc::Rc;
//! use vizpipe::pipeline::{
//!     NodeFactory, NodeType, Pipeline, RecordingScene, ReferenceEngine, SourceNode,
//! };
//! use vizpipe::types::{DatasetKind, Extent};
//!
//! let scene = RecordingScene::shared();
//! let factory = NodeFactory::new(Rc::new(ReferenceEngine::new()));
//! let mut pipeline = Pipeline::with_scene(scene.clone());
//!
//! let mut source = SourceNode::from_id("PLOT3DFile")?;
//! source.set_dataset(DatasetKind::StructuredGrid, Extent::new((0, 9), (0, 9), (0, 9)))?;
//! let source = pipeline.add_node(source);
//! let outline = pipeline.add_node(factory.create(NodeType::Outline)?);
//! pipeline.connect(source, outline)?;
//! pipeline.start();
//!
//! assert_eq!(scene.borrow().actors().len(), 1);
//! # Ok::<(), vizpipe::pipeline::PipelineError>(())
//! ```

pub mod config;
pub mod error;
pub mod pipeline;
pub mod types;

// Re-export commonly used types
pub use config::{AppConfig, ProjectFile};
pub use error::{Result, ResultExt, VizError};
pub use pipeline::{Pipeline, PipelineError, PipelineSnapshot};
pub use types::{Dataset, DatasetKind, Extent};
