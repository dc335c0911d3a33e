//! Scene collaborator contract and the scene objects nodes own.
//!
//! The scene is external: nodes never own it, they only hold a weak
//! [`SceneLink`] and ask it to change membership or redraw. Actors and widgets
//! are shared handles so the scene and the owning node see the same
//! visibility/enabled flags.

use crate::pipeline::id::{ActorId, WidgetId};
use crate::types::Dataset;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

/// A renderable primitive.
pub struct Actor {
    id: ActorId,
    label: String,
    visible: Cell<bool>,
    input: RefCell<Option<Dataset>>,
}

pub type ActorRef = Rc<Actor>;

impl Actor {
    pub fn new(label: impl Into<String>) -> ActorRef {
        Rc::new(Self {
            id: ActorId::next(),
            label: label.into(),
            visible: Cell::new(true),
            input: RefCell::new(None),
        })
    }

    pub fn id(&self) -> ActorId {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn is_visible(&self) -> bool {
        self.visible.get()
    }

    pub fn set_visible(&self, visible: bool) {
        self.visible.set(visible);
    }

    /// Dataset currently mapped by this actor.
    pub fn input(&self) -> Option<Dataset> {
        self.input.borrow().clone()
    }

    pub fn set_input(&self, input: Option<Dataset>) {
        *self.input.borrow_mut() = input;
    }
}

impl fmt::Debug for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Actor")
            .field("id", &self.id)
            .field("label", &self.label)
            .field("visible", &self.visible.get())
            .finish()
    }
}

/// An interactive on-screen control.
pub struct Widget {
    id: WidgetId,
    label: String,
    enabled: Cell<bool>,
}

pub type WidgetRef = Rc<Widget>;

impl Widget {
    pub fn new(label: impl Into<String>) -> WidgetRef {
        Rc::new(Self {
            id: WidgetId::next(),
            label: label.into(),
            enabled: Cell::new(true),
        })
    }

    pub fn id(&self) -> WidgetId {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.get()
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.set(enabled);
    }
}

impl fmt::Debug for Widget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Widget")
            .field("id", &self.id)
            .field("label", &self.label)
            .field("enabled", &self.enabled.get())
            .finish()
    }
}

/// The external container of actors and widgets that performs rendering.
#[cfg_attr(test, mockall::automock)]
pub trait Scene {
    fn add_actors(&mut self, actors: &[ActorRef]);
    fn remove_actors(&mut self, actors: &[ActorRef]);
    fn add_widgets(&mut self, widgets: &[WidgetRef]);
    fn remove_widgets(&mut self, widgets: &[WidgetRef]);
    /// Request a redraw. Cheap and idempotent.
    fn render(&mut self);
}

pub type SceneRef = Rc<RefCell<dyn Scene>>;

/// Shared weak back-reference to the scene.
///
/// Cloned into engine change callbacks so they always render the scene the
/// node is currently attached to.
#[derive(Clone, Default)]
pub struct SceneLink(Rc<RefCell<Option<Weak<RefCell<dyn Scene>>>>>);

impl SceneLink {
    pub fn new() -> Self {
        Self::default()
    }

    /// The scene, if one is set and still alive.
    pub fn get(&self) -> Option<SceneRef> {
        self.0.borrow().as_ref().and_then(Weak::upgrade)
    }

    pub fn set(&self, scene: Option<&SceneRef>) {
        *self.0.borrow_mut() = scene.map(Rc::downgrade);
    }

    pub fn is_set(&self) -> bool {
        self.get().is_some()
    }

    pub fn render(&self) {
        if let Some(scene) = self.get() {
            scene.borrow_mut().render();
        }
    }

    pub fn same_scene(&self, other: Option<&SceneRef>) -> bool {
        match (self.get(), other) {
            (Some(a), Some(b)) => Rc::ptr_eq(&a, b),
            (None, None) => true,
            _ => false,
        }
    }
}

impl fmt::Debug for SceneLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SceneLink(set: {})", self.is_set())
    }
}

/// Headless scene that records membership and render requests.
#[derive(Debug, Default)]
pub struct RecordingScene {
    actors: Vec<ActorRef>,
    widgets: Vec<WidgetRef>,
    render_count: usize,
}

impl RecordingScene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a scene already wrapped for sharing with nodes.
    pub fn shared() -> Rc<RefCell<RecordingScene>> {
        Rc::new(RefCell::new(Self::new()))
    }

    pub fn actors(&self) -> &[ActorRef] {
        &self.actors
    }

    pub fn widgets(&self) -> &[WidgetRef] {
        &self.widgets
    }

    pub fn actor_ids(&self) -> Vec<ActorId> {
        self.actors.iter().map(|a| a.id()).collect()
    }

    pub fn widget_ids(&self) -> Vec<WidgetId> {
        self.widgets.iter().map(|w| w.id()).collect()
    }

    pub fn contains_actor(&self, id: ActorId) -> bool {
        self.actors.iter().any(|a| a.id() == id)
    }

    pub fn contains_widget(&self, id: WidgetId) -> bool {
        self.widgets.iter().any(|w| w.id() == id)
    }

    pub fn render_count(&self) -> usize {
        self.render_count
    }
}

impl Scene for RecordingScene {
    fn add_actors(&mut self, actors: &[ActorRef]) {
        for actor in actors {
            if !self.contains_actor(actor.id()) {
                self.actors.push(Rc::clone(actor));
            }
        }
    }

    fn remove_actors(&mut self, actors: &[ActorRef]) {
        self.actors
            .retain(|a| !actors.iter().any(|r| r.id() == a.id()));
    }

    fn add_widgets(&mut self, widgets: &[WidgetRef]) {
        for widget in widgets {
            if !self.contains_widget(widget.id()) {
                self.widgets.push(Rc::clone(widget));
            }
        }
    }

    fn remove_widgets(&mut self, widgets: &[WidgetRef]) {
        self.widgets
            .retain(|w| !widgets.iter().any(|r| r.id() == w.id()));
    }

    fn render(&mut self) {
        self.render_count += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_scene_membership() {
        let mut scene = RecordingScene::new();
        let a = Actor::new("a");
        let b = Actor::new("b");
        scene.add_actors(&[a.clone(), b.clone()]);
        scene.add_actors(&[a.clone()]);
        assert_eq!(scene.actor_ids(), vec![a.id(), b.id()]);

        scene.remove_actors(&[a.clone()]);
        assert_eq!(scene.actor_ids(), vec![b.id()]);

        let w = Widget::new("w");
        scene.add_widgets(&[w.clone()]);
        assert!(scene.contains_widget(w.id()));
        scene.remove_widgets(&[w]);
        assert!(scene.widgets().is_empty());
    }

    #[test]
    fn test_scene_link_is_weak() {
        let link = SceneLink::new();
        assert!(!link.is_set());
        {
            let scene: SceneRef = RecordingScene::shared();
            link.set(Some(&scene));
            assert!(link.is_set());
            assert!(link.same_scene(Some(&scene)));
        }
        // The node does not keep the scene alive.
        assert!(!link.is_set());
        link.render();
    }

    #[test]
    fn test_scene_link_render() {
        let scene = RecordingScene::shared();
        let shared: SceneRef = scene.clone();
        let link = SceneLink::new();
        link.set(Some(&shared));
        link.clone().render();
        assert_eq!(scene.borrow().render_count(), 1);
    }
}
