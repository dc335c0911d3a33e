//! Building blocks of render-facing modules.
//!
//! A [`ModuleManager`] is what a module hangs off once it is connected: it
//! exposes the upstream source outputs the module renders. An
//! [`ActorBundle`] pairs one scene actor with its display properties and has
//! its own [`SceneSync`], so the owning module starts, stops, shows and hides
//! it together with itself.

use crate::pipeline::lifecycle::SceneSync;
use crate::pipeline::scene::{Actor, ActorRef, SceneRef};
use crate::types::Dataset;
use serde::{Deserialize, Serialize};

/// Upstream context of a connected module.
#[derive(Debug, Clone, Default)]
pub struct ModuleManager {
    source_outputs: Vec<Dataset>,
}

impl ModuleManager {
    pub fn new(source_outputs: Vec<Dataset>) -> Self {
        Self { source_outputs }
    }

    /// First output of the upstream source.
    pub fn source_output(&self) -> Option<&Dataset> {
        self.source_outputs.first()
    }

    pub fn source_outputs(&self) -> &[Dataset] {
        &self.source_outputs
    }

    pub fn set_source_outputs(&mut self, outputs: Vec<Dataset>) {
        self.source_outputs = outputs;
    }
}

/// How surfaces are drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Representation {
    Points,
    Wireframe,
    #[default]
    Surface,
}

/// Display properties of an actor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActorProperties {
    /// RGB, each in `[0, 1]`.
    pub color: [f32; 3],
    pub opacity: f32,
    pub line_width: f32,
    pub representation: Representation,
}

impl Default for ActorProperties {
    fn default() -> Self {
        Self {
            color: [1.0, 1.0, 1.0],
            opacity: 1.0,
            line_width: 2.0,
            representation: Representation::Surface,
        }
    }
}

impl ActorProperties {
    /// Clamp every field into its valid range.
    pub fn clamped(mut self) -> Self {
        for c in &mut self.color {
            *c = c.clamp(0.0, 1.0);
        }
        self.opacity = self.opacity.clamp(0.0, 1.0);
        self.line_width = self.line_width.max(0.0);
        self
    }
}

/// One actor plus its display properties.
#[derive(Debug)]
pub struct ActorBundle {
    actor: ActorRef,
    properties: ActorProperties,
    sync: SceneSync,
}

impl ActorBundle {
    pub fn new(label: impl Into<String>) -> Self {
        let actor = Actor::new(label);
        let mut sync = SceneSync::new();
        sync.set_actors(vec![actor.clone()]);
        Self {
            actor,
            properties: ActorProperties::default(),
            sync,
        }
    }

    pub fn actor(&self) -> &ActorRef {
        &self.actor
    }

    pub fn properties(&self) -> &ActorProperties {
        &self.properties
    }

    pub fn set_properties(&mut self, properties: ActorProperties) {
        let properties = properties.clamped();
        if properties == self.properties {
            return;
        }
        self.properties = properties;
        self.sync.render();
    }

    pub fn set_color(&mut self, color: [f32; 3]) {
        self.set_properties(ActorProperties {
            color,
            ..self.properties.clone()
        });
    }

    pub fn set_opacity(&mut self, opacity: f32) {
        self.set_properties(ActorProperties {
            opacity,
            ..self.properties.clone()
        });
    }

    pub fn set_representation(&mut self, representation: Representation) {
        self.set_properties(ActorProperties {
            representation,
            ..self.properties.clone()
        });
    }

    /// Point the actor at the module's output.
    pub fn set_input(&mut self, input: Option<Dataset>) {
        self.actor.set_input(input);
        self.sync.render();
    }

    pub fn sync(&self) -> &SceneSync {
        &self.sync
    }

    pub fn is_running(&self) -> bool {
        self.sync.is_running()
    }

    pub fn start(&mut self) -> bool {
        self.sync.start()
    }

    pub fn stop(&mut self) -> bool {
        self.sync.stop()
    }

    pub fn set_visible(&mut self, visible: bool) -> bool {
        self.sync.set_visible(visible)
    }

    pub fn set_scene(&mut self, scene: Option<&SceneRef>) {
        self.sync.set_scene(scene);
    }

    pub fn render(&self) {
        self.sync.render();
    }
}
