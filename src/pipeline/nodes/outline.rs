//! OutlineModule — displays the bounding box of its input, either as a full
//! box or as its corners.
//!
//! Both engine variants are created up front and kept, so per-variant
//! settings survive mode switches. The active one is always derived from the
//! mode, never stored.

use crate::pipeline::engine::{Engine, EngineClass, EngineError, EngineHandle, ParamValue};
use crate::pipeline::error::{PipelineError, PipelineResult};
use crate::pipeline::event::NodeEvent;
use crate::pipeline::info::PipelineInfo;
use crate::pipeline::node::{NodeContext, NodeCore, NodePlugin};
use crate::pipeline::nodes::filter::render_on_change;
use crate::pipeline::nodes::module::{ActorBundle, ModuleManager};
use crate::pipeline::persist::{NodeState, ParamMap};
use crate::pipeline::scene::SceneRef;
use crate::types::DatasetKind;
use serde::{Deserialize, Serialize};

const NAME: &str = "Outline";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutlineMode {
    #[default]
    Full,
    Cornered,
}

pub struct OutlineModule {
    core: NodeCore,
    mode: OutlineMode,
    full: EngineHandle,
    cornered: EngineHandle,
    actor: ActorBundle,
    manager: Option<ModuleManager>,
}

impl OutlineModule {
    pub fn new(engine: &dyn Engine) -> PipelineResult<Self> {
        let create = |class| engine.create(class).map_err(|e| PipelineError::engine(NAME, e));
        let full = create(EngineClass::OutlineFilter)?;
        let cornered = create(EngineClass::OutlineCornerFilter)?;

        let core = NodeCore::new(
            NAME,
            PipelineInfo::any(),
            PipelineInfo::new(&[DatasetKind::PolyData]),
        );
        render_on_change(&full, core.scene().scene_link());
        render_on_change(&cornered, core.scene().scene_link());

        Ok(Self {
            core,
            mode: OutlineMode::Full,
            full,
            cornered,
            actor: ActorBundle::new(NAME),
            manager: None,
        })
    }

    pub fn mode(&self) -> OutlineMode {
        self.mode
    }

    /// Engine object for the current mode.
    pub fn outline_filter(&self) -> &EngineHandle {
        match self.mode {
            OutlineMode::Full => &self.full,
            OutlineMode::Cornered => &self.cornered,
        }
    }

    pub fn filter_for(&self, mode: OutlineMode) -> &EngineHandle {
        match mode {
            OutlineMode::Full => &self.full,
            OutlineMode::Cornered => &self.cornered,
        }
    }

    pub fn actor(&self) -> &ActorBundle {
        &self.actor
    }

    pub fn actor_mut(&mut self) -> &mut ActorBundle {
        &mut self.actor
    }

    pub fn module_manager(&self) -> Option<&ModuleManager> {
        self.manager.as_ref()
    }

    /// Switch mode. Emits `ActiveFilterChanged` with the old and new engine
    /// objects; when attached to a module manager the new variant is wired to
    /// the upstream output and the outputs are replaced.
    pub fn set_mode(&mut self, mode: OutlineMode) -> PipelineResult<()> {
        if mode == self.mode {
            return Ok(());
        }
        let old = self.outline_filter().id();
        self.mode = mode;
        let new = self.outline_filter().id();
        self.core.emit(NodeEvent::ActiveFilterChanged { old, new });
        tracing::debug!("{}: mode -> {:?}", NAME, mode);
        self.apply_mode()
    }

    /// Set a parameter on one variant's engine object. Editing the active
    /// variant while it has an input recomputes it and fires `DataChanged`.
    pub fn set_param(&mut self, mode: OutlineMode, name: &str, value: ParamValue) -> PipelineResult<()> {
        let filter = self.filter_for(mode).clone();
        filter
            .set_param(name, value)
            .map_err(|e| PipelineError::engine(NAME, e))?;
        if mode != self.mode || filter.input().is_none() {
            return Ok(());
        }
        filter.update().map_err(|e| PipelineError::engine(NAME, e))?;
        self.core.notify_data_changed();
        self.actor.render();
        Ok(())
    }

    /// Restore persisted per-variant parameters.
    pub fn apply_params(&mut self, full: &ParamMap, cornered: &ParamMap) -> PipelineResult<()> {
        self.full
            .apply_params(full)
            .and_then(|_| self.cornered.apply_params(cornered))
            .map_err(|e| PipelineError::engine(NAME, e))
    }

    /// Replace the actor bundle. The new bundle is wired to this module's
    /// scene and outputs and adopts its running/visibility state; the
    /// previous bundle is stopped and returned.
    pub fn set_actor(&mut self, mut bundle: ActorBundle) -> ActorBundle {
        bundle.set_scene(self.core.scene().scene().as_ref());
        bundle.set_input(self.core.outputs().first().cloned());
        bundle.set_visible(self.core.is_visible());
        if self.core.is_running() {
            bundle.start();
        }
        let mut old = std::mem::replace(&mut self.actor, bundle);
        old.stop();
        old
    }

    fn apply_mode(&mut self) -> PipelineResult<()> {
        let Some(input) = self.manager.as_ref().and_then(|m| m.source_output()).cloned() else {
            return Ok(());
        };
        let filter = self.outline_filter().clone();
        filter.set_input(input);
        filter
            .update()
            .map_err(|e| PipelineError::engine(NAME, e))?;
        let output = filter.output().ok_or_else(|| {
            PipelineError::engine(NAME, EngineError::Execution("no output produced".into()))
        })?;
        self.core.set_outputs(vec![output.clone()])?;
        self.actor.set_input(Some(output));
        Ok(())
    }
}

impl NodePlugin for OutlineModule {
    fn core(&self) -> &NodeCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut NodeCore {
        &mut self.core
    }

    fn start(&mut self) -> bool {
        let started = self.core.scene_mut().start();
        self.actor.start();
        started
    }

    fn stop(&mut self) -> bool {
        self.actor.stop();
        self.core.scene_mut().stop()
    }

    fn set_visible(&mut self, visible: bool) -> bool {
        self.actor.set_visible(visible);
        self.core.scene_mut().set_visible(visible)
    }

    fn set_scene(&mut self, scene: Option<&SceneRef>) {
        self.core.scene_mut().set_scene(scene);
        self.actor.set_scene(scene);
    }

    fn update_pipeline(&mut self, ctx: &NodeContext) -> PipelineResult<()> {
        let Some(manager) = self.manager.as_mut() else {
            return Ok(());
        };
        if !ctx.first_outputs().is_empty() {
            manager.set_source_outputs(ctx.first_outputs().to_vec());
        }
        self.apply_mode()
    }

    fn update_data(&mut self, _ctx: &NodeContext) -> PipelineResult<()> {
        self.core.notify_data_changed();
        self.actor.render();
        Ok(())
    }

    fn is_module(&self) -> bool {
        true
    }

    fn set_module_manager(&mut self, manager: Option<ModuleManager>) {
        self.manager = manager;
    }

    fn snapshot(&self) -> Option<NodeState> {
        Some(NodeState::Outline {
            mode: self.mode,
            full: self.full.params(),
            cornered: self.cornered.params(),
            actor: self.actor.properties().clone(),
        })
    }
}
