//! ExtractGridNode — select a sub-volume of, or subsample, a structured
//! dataset.
//!
//! The engine object is chosen from the upstream dataset's class on every
//! pipeline update: structured grids, rectilinear grids and image data each
//! have their own extraction class. Per-axis `min`/`max` bounds and sample
//! ratios are coupled and clamped to the limits of the input extent.

use crate::pipeline::engine::{Engine, EngineClass, EngineError, EngineHandle, EngineRef, ParamValue};
use crate::pipeline::error::{PipelineError, PipelineResult};
use crate::pipeline::info::PipelineInfo;
use crate::pipeline::node::{NodeContext, NodeCore, NodePlugin};
use crate::pipeline::nodes::filter::render_on_change;
use crate::pipeline::persist::NodeState;
use crate::types::{Axis, Dataset, DatasetKind, Extent};

const NAME: &str = "ExtractGrid";

/// Limits and bounds before any input has been seen.
const DEFAULT_HIGH: i32 = 10_000;

/// Upstream class → extraction engine class, checked in order.
const ENGINE_MAPPING: [(&str, EngineClass); 3] = [
    ("vtkStructuredGrid", EngineClass::ExtractGrid),
    ("vtkRectilinearGrid", EngineClass::ExtractRectilinearGrid),
    ("vtkImageData", EngineClass::ExtractVoi),
];

const STRUCTURED: [DatasetKind; 3] = [
    DatasetKind::ImageData,
    DatasetKind::RectilinearGrid,
    DatasetKind::StructuredGrid,
];

/// Engine class able to extract from `input`, if any.
pub fn engine_class_for(input: &Dataset) -> Option<EngineClass> {
    ENGINE_MAPPING
        .iter()
        .find(|(class_name, _)| input.is_a(class_name))
        .map(|(_, class)| *class)
}

/// `v` clamped into `[lo, hi]`; an inverted range collapses to `lo`.
fn clamp_into(v: i32, lo: i32, hi: i32) -> i32 {
    v.max(lo).min(hi.max(lo))
}

pub struct ExtractGridNode {
    core: NodeCore,
    engine: EngineRef,
    filter: EngineHandle,
    /// Selected volume of interest, `(min, max)` per axis.
    voi: Extent,
    ratios: [i32; 3],
    /// Whole extent of the current input.
    limits: Extent,
    /// Bounds are reset to the full input extent on the first successful
    /// update.
    initialized: bool,
}

impl ExtractGridNode {
    pub fn new(engine: EngineRef) -> PipelineResult<Self> {
        let filter = engine
            .create(EngineClass::ExtractVoi)
            .map_err(|e| PipelineError::engine(NAME, e))?;
        let core = NodeCore::new(
            NAME,
            PipelineInfo::new(&STRUCTURED),
            PipelineInfo::new(&STRUCTURED),
        );
        render_on_change(&filter, core.scene().scene_link());
        let whole = Extent::new((0, DEFAULT_HIGH), (0, DEFAULT_HIGH), (0, DEFAULT_HIGH));
        Ok(Self {
            core,
            engine,
            filter,
            voi: whole,
            ratios: [1, 1, 1],
            limits: whole,
            initialized: false,
        })
    }

    /// The active engine object.
    pub fn filter(&self) -> &EngineHandle {
        &self.filter
    }

    pub fn voi(&self) -> Extent {
        self.voi
    }

    pub fn limits(&self) -> Extent {
        self.limits
    }

    pub fn min(&self, axis: Axis) -> i32 {
        self.voi.axis(axis).0
    }

    pub fn max(&self, axis: Axis) -> i32 {
        self.voi.axis(axis).1
    }

    pub fn ratio(&self, axis: Axis) -> i32 {
        self.ratios[axis.index()]
    }

    pub fn ratios(&self) -> [i32; 3] {
        self.ratios
    }

    // ── Coupled parameters ──

    /// Set the lower bound. A value above the current upper bound raises the
    /// upper bound to match; otherwise the VOI is recomputed once.
    pub fn set_min(&mut self, axis: Axis, value: i32) -> PipelineResult<()> {
        let (lo, hi) = self.limits.axis(axis);
        let value = clamp_into(value, lo, hi);
        let (min, max) = self.voi.axis(axis);
        if value == min {
            return Ok(());
        }
        self.voi.set_axis(axis, value, max);
        if value > max {
            self.set_max(axis, value)
        } else {
            self.update_voi()
        }
    }

    /// Set the upper bound. A value below the current lower bound lowers the
    /// lower bound to match; otherwise the VOI is recomputed once.
    pub fn set_max(&mut self, axis: Axis, value: i32) -> PipelineResult<()> {
        let (lo, hi) = self.limits.axis(axis);
        let value = clamp_into(value, lo, hi);
        let (min, max) = self.voi.axis(axis);
        if value == max {
            return Ok(());
        }
        self.voi.set_axis(axis, min, value);
        if value < min {
            self.set_min(axis, value)
        } else {
            self.update_voi()
        }
    }

    /// Set the sample ratio, clamped to `[1, max(1, high - low)]`.
    pub fn set_ratio(&mut self, axis: Axis, value: i32) -> PipelineResult<()> {
        let (lo, hi) = self.limits.axis(axis);
        let value = value.clamp(1, (hi - lo).max(1));
        if value == self.ratios[axis.index()] {
            return Ok(());
        }
        self.ratios[axis.index()] = value;
        self.update_sample_rate()
    }

    fn update_voi(&mut self) -> PipelineResult<()> {
        self.filter
            .set_param("voi", ParamValue::Extent(self.voi))
            .map_err(|e| PipelineError::engine(NAME, e))?;
        self.recompute_in_place()
    }

    fn update_sample_rate(&mut self) -> PipelineResult<()> {
        self.filter
            .set_param("sample_rate", ParamValue::Triple(self.ratios))
            .map_err(|e| PipelineError::engine(NAME, e))?;
        self.recompute_in_place()
    }

    /// Recompute with an attached input. The output handle is unchanged, so
    /// downstream only needs a data refresh.
    fn recompute_in_place(&mut self) -> PipelineResult<()> {
        if self.filter.input().is_none() {
            return Ok(());
        }
        self.filter
            .update()
            .map_err(|e| PipelineError::engine(NAME, e))?;
        self.core.notify_data_changed();
        Ok(())
    }

    /// Keep bounds and ratios inside the current limits.
    fn clamp_to_limits(&mut self) {
        for axis in Axis::ALL {
            let (lo, hi) = self.limits.axis(axis);
            let (min, max) = self.voi.axis(axis);
            let min = clamp_into(min, lo, hi);
            let max = clamp_into(max, lo, hi).max(min);
            self.voi.set_axis(axis, min, max);
            let i = axis.index();
            self.ratios[i] = self.ratios[i].clamp(1, (hi - lo).max(1));
        }
    }

    /// Point the active engine object back at `input` with the current
    /// bounds after a failed pipeline update. Without a previous input the
    /// object is replaced by an unwired one of the same class.
    fn rewire(&mut self, input: Option<Dataset>) {
        match input {
            Some(input) => {
                self.filter.set_input(input);
                if let Err(e) = self.configure(&self.filter) {
                    tracing::warn!("{}: could not restore engine settings: {}", NAME, e);
                }
            }
            None => match self.engine.create(self.filter.class()) {
                Ok(filter) => {
                    render_on_change(&filter, self.core.scene().scene_link());
                    self.filter = filter;
                }
                Err(e) => tracing::warn!("{}: could not reset engine object: {}", NAME, e),
            },
        }
    }

    fn configure(&self, filter: &EngineHandle) -> PipelineResult<()> {
        filter
            .set_param("voi", ParamValue::Extent(self.voi))
            .and_then(|_| filter.set_param("sample_rate", ParamValue::Triple(self.ratios)))
            .map_err(|e| PipelineError::engine(NAME, e))
    }
}

impl NodePlugin for ExtractGridNode {
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
        let class = engine_class_for(input).ok_or_else(|| PipelineError::Configuration {
            node: NAME.to_string(),
            kind: input.kind(),
        })?;

        let filter = if self.filter.class() == class {
            self.filter.clone()
        } else {
            let filter = self
                .engine
                .create(class)
                .map_err(|e| PipelineError::engine(NAME, e))?;
            render_on_change(&filter, self.core.scene().scene_link());
            filter
        };

        let previous = (self.voi, self.ratios, self.limits);
        self.limits = input.extent();
        if self.initialized {
            self.clamp_to_limits();
        } else {
            self.voi = self.limits;
            self.ratios = [1, 1, 1];
        }

        let previous_input = filter.input();
        filter.set_input(input.clone());
        let result = self.configure(&filter).and_then(|_| {
            filter
                .update()
                .map_err(|e| PipelineError::engine(NAME, e))?;
            filter.output().ok_or_else(|| {
                PipelineError::engine(NAME, EngineError::Execution("no output produced".into()))
            })
        });
        let output = match result {
            Ok(output) => output,
            Err(e) => {
                (self.voi, self.ratios, self.limits) = previous;
                if filter.ptr_eq(&self.filter) {
                    self.rewire(previous_input);
                }
                return Err(e);
            }
        };

        if !filter.ptr_eq(&self.filter) {
            tracing::debug!("{}: switched engine {} -> {}", NAME, self.filter.class(), class);
            self.filter = filter;
        }
        self.initialized = true;
        self.core.set_outputs(vec![output])
    }

    fn update_data(&mut self, _ctx: &NodeContext) -> PipelineResult<()> {
        if let Some(extent) = self.filter.input_extent() {
            self.limits = extent;
            self.clamp_to_limits();
            self.configure(&self.filter)?;
            self.filter
                .update()
                .map_err(|e| PipelineError::engine(NAME, e))?;
        }
        self.core.notify_data_changed();
        Ok(())
    }

    fn snapshot(&self) -> Option<NodeState> {
        Some(NodeState::ExtractGrid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::event::NodeEvent;
    use crate::pipeline::reference_engine::ReferenceEngine;
    use proptest::prelude::*;
    use std::rc::Rc;

    fn grid(kind: DatasetKind) -> Dataset {
        Dataset::new(kind, Extent::new((0, 20), (0, 10), (0, 5)))
    }

    fn connected(kind: DatasetKind) -> (ReferenceEngine, ExtractGridNode) {
        let engine = ReferenceEngine::new();
        let mut node = ExtractGridNode::new(Rc::new(engine.clone())).unwrap();
        let inputs = vec![vec![grid(kind)]];
        node.update_pipeline(&NodeContext::new(&inputs)).unwrap();
        node.core_mut().take_events();
        (engine, node)
    }

    #[test]
    fn test_engine_selection_by_input_class() {
        for (kind, class) in [
            (DatasetKind::StructuredGrid, EngineClass::ExtractGrid),
            (DatasetKind::RectilinearGrid, EngineClass::ExtractRectilinearGrid),
            (DatasetKind::ImageData, EngineClass::ExtractVoi),
        ] {
            let (_engine, node) = connected(kind);
            assert_eq!(node.filter().class(), class);
            assert_eq!(node.core().outputs()[0].kind(), kind);
        }
        assert_eq!(
            engine_class_for(&Dataset::new(DatasetKind::PolyData, Extent::EMPTY)),
            None
        );
    }

    #[test]
    fn test_first_update_selects_full_extent() {
        let (_engine, node) = connected(DatasetKind::ImageData);
        assert_eq!(node.voi(), Extent::new((0, 20), (0, 10), (0, 5)));
        assert_eq!(node.limits(), node.voi());
        assert_eq!(node.ratios(), [1, 1, 1]);
    }

    #[test]
    fn test_unsupported_kind_keeps_outputs() {
        let (engine, mut node) = connected(DatasetKind::RectilinearGrid);
        let before = node.core().outputs().to_vec();
        let filter_before = node.filter().id();
        let updates = engine.update_count();

        let poly = vec![vec![Dataset::new(DatasetKind::PolyData, Extent::EMPTY)]];
        let err = node.update_pipeline(&NodeContext::new(&poly)).unwrap_err();
        assert_eq!(
            err,
            PipelineError::Configuration {
                node: "ExtractGrid".into(),
                kind: DatasetKind::PolyData,
            }
        );
        assert_eq!(node.core().outputs(), before.as_slice());
        assert_eq!(node.filter().id(), filter_before);
        assert_eq!(engine.update_count(), updates);
        assert!(node.core_mut().take_events().is_empty());
    }

    #[test]
    fn test_engine_failure_restores_bounds() {
        let (engine, mut node) = connected(DatasetKind::ImageData);
        node.set_min(Axis::X, 4).unwrap();
        node.core_mut().take_events();
        let voi = node.voi();

        engine.fail_next_updates(1);
        let smaller = vec![vec![Dataset::new(
            DatasetKind::ImageData,
            Extent::new((0, 2), (0, 2), (0, 2)),
        )]];
        assert!(node.update_pipeline(&NodeContext::new(&smaller)).is_err());
        assert_eq!(node.voi(), voi);
    }

    #[test]
    fn test_engine_failure_keeps_engine_on_previous_input() {
        let engine = ReferenceEngine::new();
        let mut node = ExtractGridNode::new(Rc::new(engine.clone())).unwrap();
        let whole = Extent::new((0, 20), (0, 20), (0, 20));
        let large = vec![vec![Dataset::new(DatasetKind::ImageData, whole)]];
        node.update_pipeline(&NodeContext::new(&large)).unwrap();
        let kept = node.core().outputs()[0].clone();

        engine.fail_next_updates(1);
        let small = vec![vec![Dataset::new(
            DatasetKind::ImageData,
            Extent::new((0, 4), (0, 4), (0, 4)),
        )]];
        assert!(node.update_pipeline(&NodeContext::new(&small)).is_err());
        assert_eq!(node.filter().input_extent(), Some(whole));
        assert_eq!(node.filter().param("voi"), Some(ParamValue::Extent(whole)));

        // Later edits still work against the last good input.
        node.set_min(Axis::X, 10).unwrap();
        assert!(node.core().outputs()[0].ptr_eq(&kept));
        assert_eq!(kept.extent(), Extent::new((0, 10), (0, 20), (0, 20)));
        assert_eq!(node.limits(), whole);
    }

    #[test]
    fn test_failed_first_update_leaves_no_wired_input() {
        let engine = ReferenceEngine::new();
        let mut node = ExtractGridNode::new(Rc::new(engine.clone())).unwrap();
        engine.fail_next_updates(1);
        let inputs = vec![vec![grid(DatasetKind::ImageData)]];
        assert!(node.update_pipeline(&NodeContext::new(&inputs)).is_err());
        assert!(node.filter().input().is_none());

        let updates = engine.update_count();
        node.set_min(Axis::X, 3).unwrap();
        assert_eq!(engine.update_count(), updates);
        assert!(node.core().outputs().is_empty());
    }

    #[test]
    fn test_empty_input_extent_is_accepted() {
        let engine = ReferenceEngine::new();
        let mut node = ExtractGridNode::new(Rc::new(engine)).unwrap();
        let empty = vec![vec![Dataset::new(
            DatasetKind::ImageData,
            Extent::new((0, -1), (0, -1), (0, -1)),
        )]];
        node.update_pipeline(&NodeContext::new(&empty)).unwrap();
        assert_eq!(node.core().outputs().len(), 1);
        node.set_ratio(Axis::X, 4).unwrap();
        assert_eq!(node.ratio(Axis::X), 1);
    }

    #[test]
    fn test_min_above_max_raises_max() {
        let (engine, mut node) = connected(DatasetKind::StructuredGrid);
        node.set_max(Axis::X, 8).unwrap();
        let updates = engine.update_count();

        node.set_min(Axis::X, 12).unwrap();
        assert_eq!(node.min(Axis::X), 12);
        assert_eq!(node.max(Axis::X), 12);
        assert_eq!(engine.update_count(), updates + 1);
    }

    #[test]
    fn test_min_below_max_recomputes_once() {
        let (engine, mut node) = connected(DatasetKind::StructuredGrid);
        let updates = engine.update_count();
        node.set_min(Axis::Y, 3).unwrap();
        assert_eq!(node.max(Axis::Y), 10);
        assert_eq!(engine.update_count(), updates + 1);
        assert_eq!(node.core_mut().take_events(), vec![NodeEvent::DataChanged]);
        assert_eq!(
            node.filter().param("voi"),
            Some(ParamValue::Extent(Extent::new((0, 20), (3, 10), (0, 5))))
        );
    }

    #[test]
    fn test_max_below_min_lowers_min() {
        let (_engine, mut node) = connected(DatasetKind::StructuredGrid);
        node.set_min(Axis::Z, 4).unwrap();
        node.set_max(Axis::Z, 1).unwrap();
        assert_eq!((node.min(Axis::Z), node.max(Axis::Z)), (1, 1));
    }

    #[test]
    fn test_writes_are_clamped_to_limits() {
        let (engine, mut node) = connected(DatasetKind::ImageData);
        let updates = engine.update_count();
        node.set_max(Axis::X, 500).unwrap();
        assert_eq!(node.max(Axis::X), 20);
        // Clamped to the current value: no recompute.
        assert_eq!(engine.update_count(), updates);

        node.set_ratio(Axis::Z, 99).unwrap();
        assert_eq!(node.ratio(Axis::Z), 5);
        node.set_ratio(Axis::Z, 0).unwrap();
        assert_eq!(node.ratio(Axis::Z), 1);
    }

    #[test]
    fn test_writes_before_connection_do_not_recompute() {
        let engine = ReferenceEngine::new();
        let mut node = ExtractGridNode::new(Rc::new(engine.clone())).unwrap();
        node.set_min(Axis::X, 5).unwrap();
        assert_eq!(engine.update_count(), 0);
        assert!(node.core_mut().take_events().is_empty());
    }

    #[test]
    fn test_update_data_reclamps_and_fires_data_changed() {
        let engine = ReferenceEngine::new();
        let mut node = ExtractGridNode::new(Rc::new(engine.clone())).unwrap();
        let input = grid(DatasetKind::ImageData);
        let inputs = vec![vec![input.clone()]];
        node.update_pipeline(&NodeContext::new(&inputs)).unwrap();
        node.core_mut().take_events();

        input.modify(Extent::new((0, 10), (0, 10), (0, 5)));
        node.update_data(&NodeContext::new(&inputs)).unwrap();
        assert_eq!(node.max(Axis::X), 10);
        assert_eq!(node.core_mut().take_events(), vec![NodeEvent::DataChanged]);
    }

    proptest! {
        #[test]
        fn test_bounds_stay_ordered_and_within_limits(
            writes in prop::collection::vec((0usize..3, any::<bool>(), -5i32..30), 1..40)
        ) {
            let (_engine, mut node) = connected(DatasetKind::StructuredGrid);
            for (axis, is_min, value) in writes {
                let axis = Axis::ALL[axis];
                if is_min {
                    node.set_min(axis, value).unwrap();
                } else {
                    node.set_max(axis, value).unwrap();
                }
            }
            for axis in Axis::ALL {
                let (lo, hi) = node.limits().axis(axis);
                prop_assert!(node.min(axis) <= node.max(axis));
                prop_assert!(lo <= node.min(axis) && node.max(axis) <= hi);
            }
        }

        #[test]
        fn test_lower_write_raises_upper_only_when_needed(value in 0i32..=20, start_max in 0i32..=20) {
            let (engine, mut node) = connected(DatasetKind::StructuredGrid);
            node.set_min(Axis::X, 0).unwrap();
            node.set_max(Axis::X, start_max).unwrap();
            let before = engine.update_count();
            let old_min = node.min(Axis::X);

            node.set_min(Axis::X, value).unwrap();
            if value > start_max {
                prop_assert_eq!(node.max(Axis::X), value);
            } else {
                prop_assert_eq!(node.max(Axis::X), start_max);
            }
            let expected = if value == old_min { 0 } else { 1 };
            prop_assert_eq!(engine.update_count() - before, expected);
        }
    }
}
