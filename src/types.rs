//! Core data types for vizpipe
//!
//! This module contains the dataset model shared by every pipeline node:
//! dataset and attribute kinds, structured extents and the live `Dataset`
//! handle that flows between nodes.

use crate::pipeline::id::DatasetId;
use serde::{Deserialize, Serialize};
use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

/// Kind of dataset exchanged between nodes.
///
/// `Any` and `None` only appear in capability descriptors: `Any` matches every
/// concrete kind, `None` means "no dataset required/produced".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatasetKind {
    Any,
    None,
    ImageData,
    RectilinearGrid,
    StructuredGrid,
    PolyData,
    UnstructuredGrid,
}

impl DatasetKind {
    /// Concrete dataset kinds (everything except the `Any`/`None` sentinels).
    pub const CONCRETE: [DatasetKind; 5] = [
        DatasetKind::ImageData,
        DatasetKind::RectilinearGrid,
        DatasetKind::StructuredGrid,
        DatasetKind::PolyData,
        DatasetKind::UnstructuredGrid,
    ];

    /// Stable lower-case name, as used in descriptors and messages.
    pub fn name(&self) -> &'static str {
        match self {
            DatasetKind::Any => "any",
            DatasetKind::None => "none",
            DatasetKind::ImageData => "image_data",
            DatasetKind::RectilinearGrid => "rectilinear_grid",
            DatasetKind::StructuredGrid => "structured_grid",
            DatasetKind::PolyData => "poly_data",
            DatasetKind::UnstructuredGrid => "unstructured_grid",
        }
    }

    /// Engine class name used for runtime kind tests.
    pub fn class_name(&self) -> &'static str {
        match self {
            DatasetKind::Any => "vtkDataObject",
            DatasetKind::None => "vtkObject",
            DatasetKind::ImageData => "vtkImageData",
            DatasetKind::RectilinearGrid => "vtkRectilinearGrid",
            DatasetKind::StructuredGrid => "vtkStructuredGrid",
            DatasetKind::PolyData => "vtkPolyData",
            DatasetKind::UnstructuredGrid => "vtkUnstructuredGrid",
        }
    }

    /// Whether this is a real dataset kind rather than a descriptor sentinel.
    pub fn is_concrete(&self) -> bool {
        !matches!(self, DatasetKind::Any | DatasetKind::None)
    }

    /// Whether the kind carries an implicit (i, j, k) topology.
    pub fn is_structured(&self) -> bool {
        matches!(
            self,
            DatasetKind::ImageData | DatasetKind::RectilinearGrid | DatasetKind::StructuredGrid
        )
    }

    fn is_point_set(&self) -> bool {
        matches!(
            self,
            DatasetKind::StructuredGrid | DatasetKind::PolyData | DatasetKind::UnstructuredGrid
        )
    }
}

impl fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Kind of point/cell attribute a node consumes or produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeKind {
    Any,
    Scalars,
    Vectors,
    Tensors,
}

/// Spatial axis of a structured extent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    #[inline]
    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Axis::X => "x",
            Axis::Y => "y",
            Axis::Z => "z",
        }
    }
}

/// Structured index extent `(x_lo, x_hi, y_lo, y_hi, z_lo, z_hi)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Extent(pub [i32; 6]);

impl Extent {
    pub const EMPTY: Extent = Extent([0; 6]);

    pub fn new(x: (i32, i32), y: (i32, i32), z: (i32, i32)) -> Self {
        Self([x.0, x.1, y.0, y.1, z.0, z.1])
    }

    /// `(lo, hi)` along one axis.
    #[inline]
    pub fn axis(&self, axis: Axis) -> (i32, i32) {
        let i = axis.index() * 2;
        (self.0[i], self.0[i + 1])
    }

    pub fn set_axis(&mut self, axis: Axis, lo: i32, hi: i32) {
        let i = axis.index() * 2;
        self.0[i] = lo;
        self.0[i + 1] = hi;
    }

    /// Number of points along each axis (0 when inverted).
    pub fn dimensions(&self) -> [i32; 3] {
        Axis::ALL.map(|a| {
            let (lo, hi) = self.axis(a);
            if hi < lo {
                0
            } else {
                hi - lo + 1
            }
        })
    }

    /// Intersection with `other`, per axis. An inverted axis of `other`
    /// collapses to its lower end.
    pub fn clamp_to(&self, other: &Extent) -> Extent {
        let mut out = *self;
        for axis in Axis::ALL {
            let (lo, hi) = self.axis(axis);
            let (olo, ohi) = other.axis(axis);
            let ohi = ohi.max(olo);
            out.set_axis(axis, lo.max(olo).min(ohi), hi.max(olo).min(ohi));
        }
        out
    }
}

struct DatasetInner {
    id: DatasetId,
    kind: DatasetKind,
    extent: Cell<Extent>,
    generation: Cell<u64>,
}

/// Live handle to a dataset produced by a source or an engine object.
///
/// Cloning shares the handle. Value-only updates (`modify`, `touch`) keep the
/// same identity and bump the generation; a shape change replaces the handle.
#[derive(Clone)]
pub struct Dataset(Rc<DatasetInner>);

impl Dataset {
    /// Create a new dataset of a concrete kind.
    pub fn new(kind: DatasetKind, extent: Extent) -> Self {
        debug_assert!(kind.is_concrete(), "datasets must have a concrete kind");
        Self(Rc::new(DatasetInner {
            id: DatasetId::next(),
            kind,
            extent: Cell::new(extent),
            generation: Cell::new(0),
        }))
    }

    pub fn id(&self) -> DatasetId {
        self.0.id
    }

    pub fn kind(&self) -> DatasetKind {
        self.0.kind
    }

    pub fn extent(&self) -> Extent {
        self.0.extent.get()
    }

    pub fn generation(&self) -> u64 {
        self.0.generation.get()
    }

    /// Runtime kind test against an engine class name, honouring the class
    /// hierarchy (`vtkDataSet`, `vtkPointSet`, ...).
    pub fn is_a(&self, class_name: &str) -> bool {
        let kind = self.0.kind;
        class_name == kind.class_name()
            || class_name == "vtkDataObject"
            || class_name == "vtkDataSet"
            || (class_name == "vtkPointSet" && kind.is_point_set())
    }

    /// Replace the values in place (same shape, new extent).
    pub fn modify(&self, extent: Extent) {
        self.0.extent.set(extent);
        self.touch();
    }

    /// Mark the values as changed without altering the extent.
    pub fn touch(&self) {
        self.0.generation.set(self.0.generation.get() + 1);
    }

    pub fn ptr_eq(&self, other: &Dataset) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl PartialEq for Dataset {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl fmt::Debug for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dataset")
            .field("id", &self.0.id)
            .field("kind", &self.0.kind)
            .field("extent", &self.extent())
            .field("generation", &self.generation())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_names() {
        assert_eq!(DatasetKind::StructuredGrid.to_string(), "structured_grid");
        assert_eq!(DatasetKind::ImageData.class_name(), "vtkImageData");
        assert!(!DatasetKind::Any.is_concrete());
        assert!(DatasetKind::PolyData.is_concrete());
    }

    #[test]
    fn test_kind_serde_snake_case() {
        let json = serde_json::to_string(&DatasetKind::RectilinearGrid).unwrap();
        assert_eq!(json, "\"rectilinear_grid\"");
        let back: DatasetKind = serde_json::from_str("\"poly_data\"").unwrap();
        assert_eq!(back, DatasetKind::PolyData);
    }

    #[test]
    fn test_extent_axis_and_dimensions() {
        let mut e = Extent::new((0, 9), (0, 4), (0, 0));
        assert_eq!(e.axis(Axis::Y), (0, 4));
        assert_eq!(e.dimensions(), [10, 5, 1]);
        e.set_axis(Axis::Z, 2, 1);
        assert_eq!(e.dimensions()[2], 0);
    }

    #[test]
    fn test_extent_clamp() {
        let whole = Extent::new((0, 10), (0, 10), (0, 10));
        let voi = Extent::new((-5, 3), (4, 50), (0, 10000));
        assert_eq!(voi.clamp_to(&whole), Extent::new((0, 3), (4, 10), (0, 10)));
    }

    #[test]
    fn test_extent_clamp_to_empty() {
        let empty = Extent::new((0, -1), (0, -1), (5, 2));
        let voi = Extent::new((0, 10), (-3, 4), (0, 10));
        assert_eq!(voi.clamp_to(&empty), Extent::new((0, 0), (0, 0), (5, 5)));
    }

    #[test]
    fn test_dataset_is_a() {
        let grid = Dataset::new(DatasetKind::StructuredGrid, Extent::EMPTY);
        assert!(grid.is_a("vtkStructuredGrid"));
        assert!(grid.is_a("vtkPointSet"));
        assert!(grid.is_a("vtkDataSet"));
        assert!(!grid.is_a("vtkRectilinearGrid"));

        let image = Dataset::new(DatasetKind::ImageData, Extent::EMPTY);
        assert!(!image.is_a("vtkPointSet"));
    }

    #[test]
    fn test_dataset_modify_keeps_identity() {
        let ds = Dataset::new(DatasetKind::ImageData, Extent::new((0, 1), (0, 1), (0, 1)));
        let alias = ds.clone();
        ds.modify(Extent::new((0, 5), (0, 5), (0, 5)));
        assert!(alias.ptr_eq(&ds));
        assert_eq!(alias.generation(), 1);
        assert_eq!(alias.extent().axis(Axis::X), (0, 5));
    }
}
