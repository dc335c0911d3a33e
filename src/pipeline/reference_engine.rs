//! Headless reference implementation of the engine contract.
//!
//! Performs no geometry. Output kinds follow each class's declared output,
//! extract classes apply VOI/sample-rate arithmetic to the input extent, and
//! parameter edits notify subscribers. Used by tests, benchmarks and the
//! `vizpipe` binary.

use crate::pipeline::engine::{
    ChangeCallback, Engine, EngineClass, EngineError, EngineHandle, EngineObject, EngineResult,
    ParamValue,
};
use crate::types::{Axis, Dataset, DatasetKind, Extent};
use std::cell::Cell;
use std::collections::BTreeMap;
use std::rc::Rc;

/// VOI default: everything.
const WHOLE_VOI: Extent = Extent([0, i32::MAX, 0, i32::MAX, 0, i32::MAX]);

#[derive(Debug, Default)]
struct EngineStats {
    updates: Cell<u64>,
    pending_failures: Cell<u32>,
}

/// Engine whose objects compute only output kinds and extents.
#[derive(Debug, Default, Clone)]
pub struct ReferenceEngine {
    stats: Rc<EngineStats>,
}

impl ReferenceEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of `update()` calls that reached any object of this engine.
    pub fn update_count(&self) -> u64 {
        self.stats.updates.get()
    }

    /// Make the next `count` updates (on any object) fail.
    pub fn fail_next_updates(&self, count: u32) {
        self.stats.pending_failures.set(count);
    }
}

impl Engine for ReferenceEngine {
    fn create(&self, class: EngineClass) -> EngineResult<EngineHandle> {
        Ok(EngineHandle::new(ReferenceObject::new(
            class,
            Rc::clone(&self.stats),
        )))
    }
}

fn default_params(class: EngineClass) -> BTreeMap<String, ParamValue> {
    let entries: Vec<(&str, ParamValue)> = match class {
        EngineClass::Delaunay2D => vec![
            ("alpha", ParamValue::Float(0.0)),
            ("tolerance", ParamValue::Float(1e-5)),
            ("offset", ParamValue::Float(1.0)),
            ("bounding_triangulation", ParamValue::Bool(false)),
        ],
        EngineClass::TriangleFilter => vec![
            ("pass_verts", ParamValue::Bool(true)),
            ("pass_lines", ParamValue::Bool(true)),
        ],
        EngineClass::ExtractVoi | EngineClass::ExtractGrid | EngineClass::ExtractRectilinearGrid => {
            vec![
                ("voi", ParamValue::Extent(WHOLE_VOI)),
                ("sample_rate", ParamValue::Triple([1, 1, 1])),
                ("include_boundary", ParamValue::Bool(false)),
            ]
        }
        EngineClass::OutlineFilter => vec![("generate_faces", ParamValue::Bool(false))],
        EngineClass::OutlineCornerFilter => vec![("corner_factor", ParamValue::Float(0.2))],
    };
    entries
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}

struct ReferenceObject {
    class: EngineClass,
    params: BTreeMap<String, ParamValue>,
    input: Option<Dataset>,
    output: Option<Dataset>,
    subscribers: Vec<ChangeCallback>,
    stats: Rc<EngineStats>,
}

impl ReferenceObject {
    fn new(class: EngineClass, stats: Rc<EngineStats>) -> Self {
        Self {
            class,
            params: default_params(class),
            input: None,
            output: None,
            subscribers: Vec::new(),
            stats,
        }
    }

    fn validate(&self, name: &str, value: &ParamValue) -> EngineResult<()> {
        let invalid = |message: &str| EngineError::InvalidValue {
            name: name.to_string(),
            message: message.to_string(),
        };
        match (name, value) {
            ("corner_factor", ParamValue::Float(f)) if !(0.001..=0.5).contains(f) => {
                Err(invalid("must be within [0.001, 0.5]"))
            }
            ("sample_rate", ParamValue::Triple(rate)) if rate.iter().any(|&r| r < 1) => {
                Err(invalid("sample rates must be at least 1"))
            }
            ("tolerance", ParamValue::Float(f)) if !(0.0..=1.0).contains(f) => {
                Err(invalid("must be within [0, 1]"))
            }
            _ => Ok(()),
        }
    }

    fn output_kind(&self, input: DatasetKind) -> EngineResult<DatasetKind> {
        let accepted = match self.class {
            EngineClass::Delaunay2D => matches!(
                input,
                DatasetKind::StructuredGrid | DatasetKind::PolyData | DatasetKind::UnstructuredGrid
            ),
            EngineClass::ExtractVoi => input == DatasetKind::ImageData,
            EngineClass::ExtractGrid => input == DatasetKind::StructuredGrid,
            EngineClass::ExtractRectilinearGrid => input == DatasetKind::RectilinearGrid,
            EngineClass::TriangleFilter
            | EngineClass::OutlineFilter
            | EngineClass::OutlineCornerFilter => true,
        };
        if !accepted {
            return Err(EngineError::UnsupportedInput {
                class: self.class,
                kind: input,
            });
        }
        Ok(match self.class {
            EngineClass::ExtractVoi
            | EngineClass::ExtractGrid
            | EngineClass::ExtractRectilinearGrid => input,
            _ => DatasetKind::PolyData,
        })
    }

    fn output_extent(&self, input: &Dataset) -> Extent {
        match self.class {
            EngineClass::ExtractVoi
            | EngineClass::ExtractGrid
            | EngineClass::ExtractRectilinearGrid => {
                let voi = self
                    .params
                    .get("voi")
                    .and_then(ParamValue::as_extent)
                    .unwrap_or(WHOLE_VOI)
                    .clamp_to(&input.extent());
                let rate = self
                    .params
                    .get("sample_rate")
                    .and_then(ParamValue::as_triple)
                    .unwrap_or([1, 1, 1]);
                let mut out = Extent::EMPTY;
                for axis in Axis::ALL {
                    let (lo, hi) = voi.axis(axis);
                    let r = rate[axis.index()].max(1);
                    out.set_axis(axis, 0, (hi - lo) / r);
                }
                out
            }
            _ => Extent::EMPTY,
        }
    }
}

impl EngineObject for ReferenceObject {
    fn class(&self) -> EngineClass {
        self.class
    }

    fn set_input(&mut self, input: Dataset) {
        self.input = Some(input);
    }

    fn input(&self) -> Option<Dataset> {
        self.input.clone()
    }

    fn set_param(&mut self, name: &str, value: ParamValue) -> EngineResult<()> {
        let current = self
            .params
            .get(name)
            .ok_or_else(|| EngineError::UnknownParameter {
                class: self.class,
                name: name.to_string(),
            })?;
        if !current.same_type(&value) {
            return Err(EngineError::InvalidValue {
                name: name.to_string(),
                message: format!("expected a value like {:?}", current),
            });
        }
        self.validate(name, &value)?;
        if *current == value {
            return Ok(());
        }
        self.params.insert(name.to_string(), value);
        for callback in &mut self.subscribers {
            callback(name);
        }
        Ok(())
    }

    fn param(&self, name: &str) -> Option<ParamValue> {
        self.params.get(name).cloned()
    }

    fn params(&self) -> BTreeMap<String, ParamValue> {
        self.params.clone()
    }

    fn update(&mut self) -> EngineResult<()> {
        self.stats.updates.set(self.stats.updates.get() + 1);
        let pending = self.stats.pending_failures.get();
        if pending > 0 {
            self.stats.pending_failures.set(pending - 1);
            return Err(EngineError::Execution(format!(
                "{} update failed",
                self.class
            )));
        }

        let input = self
            .input
            .clone()
            .ok_or(EngineError::MissingInput { class: self.class })?;
        let kind = self.output_kind(input.kind())?;
        let extent = self.output_extent(&input);

        match &self.output {
            Some(out) if out.kind() == kind => out.modify(extent),
            _ => self.output = Some(Dataset::new(kind, extent)),
        }
        Ok(())
    }

    fn output(&self) -> Option<Dataset> {
        self.output.clone()
    }

    fn input_extent(&self) -> Option<Extent> {
        self.input.as_ref().map(Dataset::extent)
    }

    fn subscribe(&mut self, callback: ChangeCallback) {
        self.subscribers.push(callback);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    fn grid(kind: DatasetKind) -> Dataset {
        Dataset::new(kind, Extent::new((0, 20), (0, 10), (0, 4)))
    }

    #[test]
    fn test_extract_voi_arithmetic() {
        let engine = ReferenceEngine::new();
        let voi = engine.create(EngineClass::ExtractVoi).unwrap();
        voi.set_input(grid(DatasetKind::ImageData));
        voi.set_param("voi", ParamValue::Extent(Extent::new((2, 12), (0, 100), (1, 1))))
            .unwrap();
        voi.set_param("sample_rate", ParamValue::Triple([2, 1, 1])).unwrap();
        voi.update().unwrap();

        let out = voi.output().unwrap();
        assert_eq!(out.kind(), DatasetKind::ImageData);
        assert_eq!(out.extent(), Extent::new((0, 5), (0, 10), (0, 0)));
        assert_eq!(engine.update_count(), 1);
    }

    #[test]
    fn test_update_keeps_output_identity() {
        let engine = ReferenceEngine::new();
        let tri = engine.create(EngineClass::TriangleFilter).unwrap();
        tri.set_input(grid(DatasetKind::UnstructuredGrid));
        tri.update().unwrap();
        let first = tri.output().unwrap();
        tri.update().unwrap();
        let second = tri.output().unwrap();
        assert!(first.ptr_eq(&second));
        assert_eq!(second.generation(), 1);
    }

    #[test]
    fn test_unsupported_input() {
        let engine = ReferenceEngine::new();
        let extract = engine.create(EngineClass::ExtractGrid).unwrap();
        extract.set_input(grid(DatasetKind::ImageData));
        assert_eq!(
            extract.update(),
            Err(EngineError::UnsupportedInput {
                class: EngineClass::ExtractGrid,
                kind: DatasetKind::ImageData,
            })
        );
    }

    #[test]
    fn test_missing_input_and_injected_failure() {
        let engine = ReferenceEngine::new();
        let outline = engine.create(EngineClass::OutlineFilter).unwrap();
        assert!(matches!(
            outline.update(),
            Err(EngineError::MissingInput { .. })
        ));

        outline.set_input(grid(DatasetKind::PolyData));
        engine.fail_next_updates(1);
        assert!(matches!(outline.update(), Err(EngineError::Execution(_))));
        assert!(outline.update().is_ok());
    }

    #[test]
    fn test_param_validation_and_notification() {
        let engine = ReferenceEngine::new();
        let corner = engine.create(EngineClass::OutlineCornerFilter).unwrap();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        corner.subscribe(Box::new(move |name| sink.borrow_mut().push(name.to_string())));

        assert!(corner.set_param("corner_factor", ParamValue::Float(0.9)).is_err());
        assert!(corner.set_param("corner_factor", ParamValue::Int(1)).is_err());
        assert!(corner.set_param("bogus", ParamValue::Int(1)).is_err());
        corner.set_param("corner_factor", ParamValue::Float(0.3)).unwrap();
        // Unchanged value: no notification.
        corner.set_param("corner_factor", ParamValue::Float(0.3)).unwrap();

        assert_eq!(*seen.borrow(), vec!["corner_factor".to_string()]);
        assert_eq!(
            corner.param("corner_factor"),
            Some(ParamValue::Float(0.3))
        );
    }
}
