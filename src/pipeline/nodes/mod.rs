//! Built-in pipeline node implementations.

pub mod extract_grid;
pub mod filter;
pub mod module;
pub mod outline;
pub mod source;

pub use extract_grid::ExtractGridNode;
pub use filter::{SimpleFilter, SimpleFilterKind};
pub use module::{ActorBundle, ActorProperties, ModuleManager, Representation};
pub use outline::{OutlineMode, OutlineModule};
pub use source::SourceNode;
