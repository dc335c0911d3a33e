//! Contract with the external geometry/rendering engine.
//!
//! Nodes never run numerical algorithms themselves. Each filter or module
//! holds one or more [`EngineHandle`]s to engine-native processing objects
//! and only drives them through [`EngineObject`]: set the input, set named
//! parameters, update, read the output.

use crate::pipeline::id::HandleId;
use crate::types::{Dataset, DatasetKind, Extent};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;
use thiserror::Error;

/// Engine processing classes the built-in nodes know how to drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EngineClass {
    Delaunay2D,
    TriangleFilter,
    ExtractVoi,
    ExtractGrid,
    ExtractRectilinearGrid,
    OutlineFilter,
    OutlineCornerFilter,
}

impl EngineClass {
    pub fn name(&self) -> &'static str {
        match self {
            EngineClass::Delaunay2D => "Delaunay2D",
            EngineClass::TriangleFilter => "TriangleFilter",
            EngineClass::ExtractVoi => "ExtractVOI",
            EngineClass::ExtractGrid => "ExtractGrid",
            EngineClass::ExtractRectilinearGrid => "ExtractRectilinearGrid",
            EngineClass::OutlineFilter => "OutlineFilter",
            EngineClass::OutlineCornerFilter => "OutlineCornerFilter",
        }
    }
}

impl fmt::Display for EngineClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Errors raised by the wrapped engine.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("{class} has no parameter '{name}'")]
    UnknownParameter { class: EngineClass, name: String },

    #[error("Invalid value for '{name}': {message}")]
    InvalidValue { name: String, message: String },

    #[error("{class} has no input")]
    MissingInput { class: EngineClass },

    #[error("{class} cannot process {kind} input")]
    UnsupportedInput { class: EngineClass, kind: DatasetKind },

    #[error("Execution failed: {0}")]
    Execution(String),
}

pub type EngineResult<T> = std::result::Result<T, EngineError>;

/// Named parameter values passed to engine objects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Extent(Extent),
    Triple([i32; 3]),
}

impl ParamValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParamValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            ParamValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            ParamValue::Float(v) => Some(*v),
            ParamValue::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::String(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_extent(&self) -> Option<Extent> {
        match self {
            ParamValue::Extent(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_triple(&self) -> Option<[i32; 3]> {
        match self {
            ParamValue::Triple(v) => Some(*v),
            _ => None,
        }
    }

    /// Whether `other` can replace `self` without changing the value type.
    pub fn same_type(&self, other: &ParamValue) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }
}

/// Invoked with the parameter name whenever an engine object's parameters change.
pub type ChangeCallback = Box<dyn FnMut(&str)>;

/// Operations the core needs from an engine-native processing object.
#[cfg_attr(test, mockall::automock)]
pub trait EngineObject {
    fn class(&self) -> EngineClass;

    fn set_input(&mut self, input: Dataset);

    fn input(&self) -> Option<Dataset>;

    fn set_param(&mut self, name: &str, value: ParamValue) -> EngineResult<()>;

    fn param(&self, name: &str) -> Option<ParamValue>;

    /// All parameters with their current values.
    fn params(&self) -> BTreeMap<String, ParamValue>;

    /// Recompute the output from the current input and parameters.
    fn update(&mut self) -> EngineResult<()>;

    fn output(&self) -> Option<Dataset>;

    /// Whole extent of the current input, if any.
    fn input_extent(&self) -> Option<Extent>;

    fn subscribe(&mut self, callback: ChangeCallback);
}

/// Shared, identity-carrying handle to an engine object.
#[derive(Clone)]
pub struct EngineHandle {
    id: HandleId,
    object: Rc<RefCell<dyn EngineObject>>,
}

impl EngineHandle {
    pub fn new<T: EngineObject + 'static>(object: T) -> Self {
        Self {
            id: HandleId::next(),
            object: Rc::new(RefCell::new(object)),
        }
    }

    pub fn id(&self) -> HandleId {
        self.id
    }

    pub fn class(&self) -> EngineClass {
        self.object.borrow().class()
    }

    pub fn set_input(&self, input: Dataset) {
        self.object.borrow_mut().set_input(input);
    }

    pub fn input(&self) -> Option<Dataset> {
        self.object.borrow().input()
    }

    pub fn set_param(&self, name: &str, value: ParamValue) -> EngineResult<()> {
        self.object.borrow_mut().set_param(name, value)
    }

    pub fn param(&self, name: &str) -> Option<ParamValue> {
        self.object.borrow().param(name)
    }

    pub fn params(&self) -> BTreeMap<String, ParamValue> {
        self.object.borrow().params()
    }

    /// Apply a set of parameters, stopping at the first rejected one.
    pub fn apply_params(&self, params: &BTreeMap<String, ParamValue>) -> EngineResult<()> {
        for (name, value) in params {
            self.set_param(name, value.clone())?;
        }
        Ok(())
    }

    pub fn update(&self) -> EngineResult<()> {
        self.object.borrow_mut().update()
    }

    pub fn output(&self) -> Option<Dataset> {
        self.object.borrow().output()
    }

    pub fn input_extent(&self) -> Option<Extent> {
        self.object.borrow().input_extent()
    }

    pub fn subscribe(&self, callback: ChangeCallback) {
        self.object.borrow_mut().subscribe(callback);
    }

    pub fn ptr_eq(&self, other: &EngineHandle) -> bool {
        self.id == other.id
    }
}

impl fmt::Debug for EngineHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineHandle")
            .field("id", &self.id)
            .field("class", &self.class())
            .finish()
    }
}

/// Factory for engine objects.
pub trait Engine {
    fn create(&self, class: EngineClass) -> EngineResult<EngineHandle>;
}

pub type EngineRef = Rc<dyn Engine>;
