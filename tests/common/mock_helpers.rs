//! Mock construction helpers

use std::cell::Cell;
use std::rc::Rc;
use vizpipe::pipeline::{
    Actor, ActorRef, NodeContext, NodeCore, NodePlugin, PipelineInfo, PipelineResult, Widget,
    WidgetRef,
};

/// Call counters shared between a [`PassThroughNode`] and the test.
#[derive(Debug, Default)]
pub struct CallCounts {
    pub update_pipeline: Cell<usize>,
    pub update_data: Cell<usize>,
}

/// User-defined node that forwards its first input and owns actors/widgets.
pub struct PassThroughNode {
    core: NodeCore,
    counts: Rc<CallCounts>,
}

impl PassThroughNode {
    pub fn new(name: &str) -> (Self, Rc<CallCounts>) {
        let counts = Rc::new(CallCounts::default());
        let node = Self {
            core: NodeCore::new(name, PipelineInfo::any(), PipelineInfo::any()),
            counts: counts.clone(),
        };
        (node, counts)
    }

    pub fn with_actors(mut self, count: usize) -> Self {
        for i in 0..count {
            self.core.scene_mut().push_actor(Actor::new(format!("actor-{i}")));
        }
        self
    }

    pub fn with_widgets(mut self, count: usize) -> Self {
        for i in 0..count {
            self.core.scene_mut().push_widget(Widget::new(format!("widget-{i}")));
        }
        self
    }

    pub fn actors(&self) -> Vec<ActorRef> {
        self.core.scene().actors().to_vec()
    }

    pub fn widgets(&self) -> Vec<WidgetRef> {
        self.core.scene().widgets().to_vec()
    }
}

impl NodePlugin for PassThroughNode {
    fn core(&self) -> &NodeCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut NodeCore {
        &mut self.core
    }

    fn update_pipeline(&mut self, ctx: &NodeContext) -> PipelineResult<()> {
        self.counts
            .update_pipeline
            .set(self.counts.update_pipeline.get() + 1);
        self.core.set_outputs(ctx.first_outputs().to_vec())
    }

    fn update_data(&mut self, _ctx: &NodeContext) -> PipelineResult<()> {
        self.counts.update_data.set(self.counts.update_data.get() + 1);
        self.core.notify_data_changed();
        Ok(())
    }
}
