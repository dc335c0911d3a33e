//! Lifecycle and scene synchronization shared by every node.
//!
//! `SceneSync` owns a node's actors and widgets and keeps the scene in step
//! with them:
//!
//! - actors/widgets are registered with the scene iff the node is running
//! - replacing or editing the actor/widget lists only touches the delta
//! - hiding a node backs up widget enabled flags, showing it restores them
//!
//! Nodes compose this helper instead of inheriting from a base class.

use crate::pipeline::id::{ActorId, WidgetId};
use crate::pipeline::scene::{ActorRef, SceneLink, SceneRef, WidgetRef};
use std::ops::Range;

/// Actor/widget ownership plus scene registration state for one node.
#[derive(Debug)]
pub struct SceneSync {
    actors: Vec<ActorRef>,
    widgets: Vec<WidgetRef>,
    scene: SceneLink,
    running: bool,
    visible: bool,
    /// Enabled flags captured when the node was hidden, in widget order.
    widget_state: Vec<bool>,
}

impl SceneSync {
    pub fn new() -> Self {
        Self {
            actors: Vec::new(),
            widgets: Vec::new(),
            scene: SceneLink::new(),
            running: false,
            visible: true,
            widget_state: Vec::new(),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn actors(&self) -> &[ActorRef] {
        &self.actors
    }

    pub fn widgets(&self) -> &[WidgetRef] {
        &self.widgets
    }

    pub fn scene(&self) -> Option<SceneRef> {
        self.scene.get()
    }

    /// Shared link, for callbacks that must render whatever scene is current.
    pub fn scene_link(&self) -> &SceneLink {
        &self.scene
    }

    pub fn render(&self) {
        self.scene.render();
    }

    // ── Lifecycle ──

    /// Register actors and widgets with the scene. Returns `false` if the
    /// node was already running.
    pub fn start(&mut self) -> bool {
        if self.running {
            return false;
        }
        if let Some(scene) = self.scene.get() {
            register(&scene, &self.actors, &self.widgets);
        }
        self.apply_widget_visibility(&self.widgets);
        self.running = true;
        tracing::debug!(
            "Started: {} actors, {} widgets registered",
            self.actors.len(),
            self.widgets.len()
        );
        true
    }

    /// Deregister actors and widgets. Returns `false` if not running.
    pub fn stop(&mut self) -> bool {
        if !self.running {
            return false;
        }
        if let Some(scene) = self.scene.get() {
            deregister(&scene, &self.actors, &self.widgets);
        }
        self.running = false;
        tracing::debug!("Stopped: {} actors deregistered", self.actors.len());
        true
    }

    // ── Actors ──

    /// Replace the whole actor list. Returns the previous list.
    pub fn set_actors(&mut self, actors: Vec<ActorRef>) -> Vec<ActorRef> {
        let old = std::mem::replace(&mut self.actors, actors);
        self.apply_actor_visibility(0);
        let added = self.actors.clone();
        self.actors_changed(&old, &added);
        old
    }

    pub fn push_actor(&mut self, actor: ActorRef) {
        let end = self.actors.len();
        self.splice_actors(end..end, vec![actor]);
    }

    pub fn insert_actor(&mut self, index: usize, actor: ActorRef) {
        let index = index.min(self.actors.len());
        self.splice_actors(index..index, vec![actor]);
    }

    pub fn remove_actor(&mut self, id: ActorId) -> Option<ActorRef> {
        let index = self.actors.iter().position(|a| a.id() == id)?;
        self.splice_actors(index..index + 1, Vec::new()).pop()
    }

    /// Replace `range` with `replacement`; only the delta reaches the scene.
    /// A range past the end is clamped, so it appends. Returns the removed actors.
    pub fn splice_actors(
        &mut self,
        range: Range<usize>,
        replacement: Vec<ActorRef>,
    ) -> Vec<ActorRef> {
        let range = clamp_range(range, self.actors.len());
        let start = range.start;
        let added_len = replacement.len();
        let removed: Vec<ActorRef> = self.actors.splice(range, replacement).collect();
        self.apply_actor_visibility(start);
        let added: Vec<ActorRef> = self.actors[start..start + added_len].to_vec();
        self.actors_changed(&removed, &added);
        removed
    }

    fn actors_changed(&self, removed: &[ActorRef], added: &[ActorRef]) {
        if !self.running || (removed.is_empty() && added.is_empty()) {
            return;
        }
        if let Some(scene) = self.scene.get() {
            let mut scene = scene.borrow_mut();
            if !removed.is_empty() {
                scene.remove_actors(removed);
            }
            if !added.is_empty() {
                scene.add_actors(added);
            }
            scene.render();
        }
    }

    /// Hidden nodes keep newly added actors hidden.
    fn apply_actor_visibility(&self, from: usize) {
        if self.visible {
            return;
        }
        for actor in &self.actors[from.min(self.actors.len())..] {
            actor.set_visible(false);
        }
    }

    // ── Widgets ──

    /// Replace the whole widget list. Returns the previous list.
    pub fn set_widgets(&mut self, widgets: Vec<WidgetRef>) -> Vec<WidgetRef> {
        let old = std::mem::replace(&mut self.widgets, widgets);
        let added = self.widgets.clone();
        self.widgets_changed(&old, &added);
        old
    }

    pub fn push_widget(&mut self, widget: WidgetRef) {
        let end = self.widgets.len();
        self.splice_widgets(end..end, vec![widget]);
    }

    pub fn remove_widget(&mut self, id: WidgetId) -> Option<WidgetRef> {
        let index = self.widgets.iter().position(|w| w.id() == id)?;
        self.splice_widgets(index..index + 1, Vec::new()).pop()
    }

    /// Replace `range` with `replacement`; only the delta reaches the scene.
    /// A range past the end is clamped, so it appends. Returns the removed widgets.
    pub fn splice_widgets(
        &mut self,
        range: Range<usize>,
        replacement: Vec<WidgetRef>,
    ) -> Vec<WidgetRef> {
        let range = clamp_range(range, self.widgets.len());
        let start = range.start;
        let added_len = replacement.len();
        let removed: Vec<WidgetRef> = self.widgets.splice(range, replacement).collect();
        let added: Vec<WidgetRef> = self.widgets[start..start + added_len].to_vec();
        self.widgets_changed(&removed, &added);
        removed
    }

    fn widgets_changed(&self, removed: &[WidgetRef], added: &[WidgetRef]) {
        if self.running {
            if let Some(scene) = self.scene.get() {
                let mut scene = scene.borrow_mut();
                if !removed.is_empty() {
                    scene.remove_widgets(removed);
                }
                if !added.is_empty() {
                    scene.add_widgets(added);
                }
            }
        }
        self.apply_widget_visibility(added);
    }

    // ── Scene ──

    /// Point the node at another scene (or none). While running, membership
    /// moves from the old scene to the new one.
    pub fn set_scene(&mut self, scene: Option<&SceneRef>) {
        if self.scene.same_scene(scene) {
            return;
        }
        if !self.running {
            self.scene.set(scene);
            return;
        }
        if let Some(old) = self.scene.get() {
            deregister(&old, &self.actors, &self.widgets);
        }
        self.scene.set(scene);
        if let Some(new) = scene {
            register(new, &self.actors, &self.widgets);
        }
        self.apply_widget_visibility(&self.widgets);
    }

    // ── Visibility ──

    /// Show or hide the node. Returns `false` if nothing changed.
    pub fn set_visible(&mut self, visible: bool) -> bool {
        if self.visible == visible {
            return false;
        }
        self.visible = visible;
        if visible {
            self.restore_widget_state();
        } else {
            self.backup_widget_state();
            self.apply_widget_visibility(&self.widgets);
        }
        for actor in &self.actors {
            actor.set_visible(visible);
        }
        self.scene.render();
        true
    }

    fn backup_widget_state(&mut self) {
        self.widget_state = self.widgets.iter().map(|w| w.is_enabled()).collect();
    }

    fn restore_widget_state(&mut self) {
        if self.widget_state.len() != self.widgets.len() {
            tracing::debug!(
                "Widget set changed while hidden ({} backed up, {} now); enabling all",
                self.widget_state.len(),
                self.widgets.len()
            );
            for widget in &self.widgets {
                widget.set_enabled(true);
            }
        } else {
            for (widget, &enabled) in self.widgets.iter().zip(&self.widget_state) {
                widget.set_enabled(enabled);
            }
        }
    }

    fn apply_widget_visibility(&self, widgets: &[WidgetRef]) {
        if !self.visible {
            for widget in widgets {
                widget.set_enabled(false);
            }
        }
    }
}

impl Default for SceneSync {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for SceneSync {
    fn drop(&mut self) {
        // Never leave actors registered behind a destroyed node.
        self.stop();
    }
}

fn register(scene: &SceneRef, actors: &[ActorRef], widgets: &[WidgetRef]) {
    let mut scene = scene.borrow_mut();
    if !actors.is_empty() {
        scene.add_actors(actors);
    }
    if !widgets.is_empty() {
        scene.add_widgets(widgets);
    }
}

fn deregister(scene: &SceneRef, actors: &[ActorRef], widgets: &[WidgetRef]) {
    let mut scene = scene.borrow_mut();
    if !actors.is_empty() {
        scene.remove_actors(actors);
    }
    if !widgets.is_empty() {
        scene.remove_widgets(widgets);
    }
}

/// Clamp to `0..=len`; an inverted range becomes empty at its clamped end.
fn clamp_range(range: Range<usize>, len: usize) -> Range<usize> {
    let end = range.end.min(len);
    range.start.min(end)..end
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::scene::{Actor, MockScene, RecordingScene, Scene, Widget};
    use proptest::prelude::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn recording() -> (Rc<RefCell<RecordingScene>>, SceneRef) {
        let scene = RecordingScene::shared();
        let shared: SceneRef = scene.clone();
        (scene, shared)
    }

    fn sync_with(actors: usize, widgets: usize, scene: &SceneRef) -> SceneSync {
        let mut sync = SceneSync::new();
        sync.set_scene(Some(scene));
        sync.set_actors((0..actors).map(|i| Actor::new(format!("a{i}"))).collect());
        sync.set_widgets((0..widgets).map(|i| Widget::new(format!("w{i}"))).collect());
        sync
    }

    #[test]
    fn test_start_registers_and_stop_deregisters() {
        let (scene, shared) = recording();
        let mut sync = sync_with(2, 1, &shared);
        assert!(scene.borrow().actors().is_empty());

        assert!(sync.start());
        assert_eq!(scene.borrow().actors().len(), 2);
        assert_eq!(scene.borrow().widgets().len(), 1);

        assert!(sync.stop());
        assert!(scene.borrow().actors().is_empty());
        assert!(scene.borrow().widgets().is_empty());
    }

    #[test]
    fn test_start_and_stop_are_idempotent() {
        let mut scene = MockScene::new();
        scene.expect_add_actors().times(1).return_const(());
        scene.expect_remove_actors().times(1).return_const(());
        let shared: SceneRef = Rc::new(RefCell::new(scene));

        let mut sync = SceneSync::new();
        sync.set_scene(Some(&shared));
        sync.push_actor(Actor::new("a"));

        assert!(sync.start());
        assert!(!sync.start());
        assert!(sync.stop());
        assert!(!sync.stop());
    }

    #[test]
    fn test_append_touches_only_the_delta() {
        let mut scene = MockScene::new();
        scene
            .expect_add_actors()
            .withf(|actors| actors.len() == 100)
            .times(1)
            .return_const(());
        scene
            .expect_add_actors()
            .withf(|actors| actors.len() == 1 && actors[0].label() == "extra")
            .times(1)
            .return_const(());
        scene
            .expect_remove_actors()
            .withf(|actors| actors.len() == 101)
            .times(1)
            .return_const(());
        scene.expect_render().times(1).return_const(());
        let shared: SceneRef = Rc::new(RefCell::new(scene));

        let mut sync = SceneSync::new();
        sync.set_scene(Some(&shared));
        sync.set_actors((0..100).map(|i| Actor::new(format!("a{i}"))).collect());
        sync.start();

        sync.push_actor(Actor::new("extra"));
        assert_eq!(sync.actors().len(), 101);
        sync.stop();
    }

    #[test]
    fn test_remove_actor_touches_only_the_delta() {
        let (scene, shared) = recording();
        let mut sync = sync_with(3, 0, &shared);
        sync.start();
        let victim = sync.actors()[1].id();
        let renders = scene.borrow().render_count();

        let removed = sync.remove_actor(victim);
        assert_eq!(removed.map(|a| a.id()), Some(victim));
        assert!(!scene.borrow().contains_actor(victim));
        assert_eq!(scene.borrow().actors().len(), 2);
        assert_eq!(scene.borrow().render_count(), renders + 1);
    }

    #[test]
    fn test_out_of_range_splice_is_clamped() {
        let (scene, shared) = recording();
        let mut sync = sync_with(2, 1, &shared);
        sync.start();

        let removed = sync.splice_actors(5..9, vec![Actor::new("late")]);
        assert!(removed.is_empty());
        assert_eq!(sync.actors().len(), 3);
        assert_eq!(sync.actors()[2].label(), "late");
        assert_eq!(scene.borrow().actor_ids().last(), Some(&sync.actors()[2].id()));

        // Inverted range: nothing to remove.
        #[allow(clippy::reversed_empty_ranges)]
        let removed = sync.splice_widgets(4..1, Vec::new());
        assert!(removed.is_empty());
        assert_eq!(sync.widgets().len(), 1);

        let removed = sync.splice_widgets(0..10, Vec::new());
        assert_eq!(removed.len(), 1);
        assert!(scene.borrow().widgets().is_empty());
    }

    #[test]
    fn test_replace_actors_while_stopped_leaves_scene_alone() {
        let (scene, shared) = recording();
        let mut sync = sync_with(2, 0, &shared);
        sync.set_actors(vec![Actor::new("x")]);
        assert!(scene.borrow().actors().is_empty());
        assert_eq!(scene.borrow().render_count(), 0);
    }

    #[test]
    fn test_replace_actors_while_running() {
        let (scene, shared) = recording();
        let mut sync = sync_with(2, 0, &shared);
        sync.start();
        let replacement = Actor::new("x");
        let old = sync.set_actors(vec![replacement.clone()]);
        assert_eq!(old.len(), 2);
        assert_eq!(scene.borrow().actor_ids(), vec![replacement.id()]);
        assert_eq!(scene.borrow().render_count(), 1);
    }

    #[test]
    fn test_scene_reassignment_moves_membership() {
        let (old_scene, old_shared) = recording();
        let (new_scene, new_shared) = recording();
        let mut sync = sync_with(1, 1, &old_shared);
        sync.start();

        sync.set_scene(Some(&new_shared));
        assert!(old_scene.borrow().actors().is_empty());
        assert!(old_scene.borrow().widgets().is_empty());
        assert_eq!(new_scene.borrow().actors().len(), 1);
        assert_eq!(new_scene.borrow().widgets().len(), 1);
    }

    #[test]
    fn test_scene_reassignment_while_stopped_only_updates_link() {
        let (old_scene, old_shared) = recording();
        let (new_scene, new_shared) = recording();
        let mut sync = sync_with(1, 0, &old_shared);
        sync.set_scene(Some(&new_shared));
        assert!(old_scene.borrow().actors().is_empty());
        assert!(new_scene.borrow().actors().is_empty());
        sync.start();
        assert_eq!(new_scene.borrow().actors().len(), 1);
    }

    #[test]
    fn test_no_scene_suppresses_registration() {
        let mut sync = SceneSync::new();
        sync.push_actor(Actor::new("a"));
        assert!(sync.start());
        assert!(sync.is_running());

        let (scene, shared) = recording();
        sync.set_scene(Some(&shared));
        assert_eq!(scene.borrow().actors().len(), 1);

        sync.set_scene(None);
        assert!(scene.borrow().actors().is_empty());
    }

    #[test]
    fn test_hide_disables_widgets_and_actors() {
        let (scene, shared) = recording();
        let mut sync = sync_with(2, 2, &shared);
        sync.start();

        assert!(sync.set_visible(false));
        assert!(sync.widgets().iter().all(|w| !w.is_enabled()));
        assert!(sync.actors().iter().all(|a| !a.is_visible()));
        assert_eq!(scene.borrow().render_count(), 1);
        assert!(!sync.set_visible(false));
    }

    #[test]
    fn test_widgets_added_while_hidden_are_disabled() {
        let (_scene, shared) = recording();
        let mut sync = sync_with(0, 1, &shared);
        sync.start();
        sync.set_visible(false);

        let late = Widget::new("late");
        sync.push_widget(late.clone());
        assert!(!late.is_enabled());
    }

    #[test]
    fn test_widget_shape_change_while_hidden_enables_all() {
        let (_scene, shared) = recording();
        let mut sync = sync_with(0, 3, &shared);
        sync.widgets()[0].set_enabled(false);
        sync.widgets()[2].set_enabled(false);
        sync.start();

        sync.set_visible(false);
        let first = sync.widgets()[0].id();
        sync.remove_widget(first);
        sync.set_visible(true);
        assert!(sync.widgets().iter().all(|w| w.is_enabled()));
    }

    #[test]
    fn test_drop_deregisters() {
        let (scene, shared) = recording();
        {
            let mut sync = sync_with(2, 1, &shared);
            sync.start();
            assert_eq!(scene.borrow().actors().len(), 2);
        }
        assert!(scene.borrow().actors().is_empty());
        assert!(scene.borrow().widgets().is_empty());
    }

    #[test]
    fn test_mock_scene_visibility_render() {
        let mut scene = MockScene::new();
        scene.expect_render().times(2).return_const(());
        scene.expect_add_widgets().times(1).return_const(());
        scene.expect_remove_widgets().return_const(());
        let shared: SceneRef = Rc::new(RefCell::new(scene));

        let mut sync = SceneSync::new();
        sync.set_scene(Some(&shared));
        sync.push_widget(Widget::new("w"));
        sync.start();
        sync.set_visible(false);
        sync.set_visible(true);
    }

    proptest! {
        #[test]
        fn test_visibility_round_trip_restores_flags(
            flags in prop::collection::vec(any::<bool>(), 0..20)
        ) {
            let (_scene, shared) = recording();
            let mut sync = SceneSync::new();
            sync.set_scene(Some(&shared));
            let widgets: Vec<WidgetRef> = flags.iter().map(|_| Widget::new("w")).collect();
            sync.set_widgets(widgets);
            for (w, &f) in sync.widgets().iter().zip(&flags) {
                w.set_enabled(f);
            }
            sync.start();

            sync.set_visible(false);
            prop_assert!(sync.widgets().iter().all(|w| !w.is_enabled()));
            sync.set_visible(true);

            let after: Vec<bool> = sync.widgets().iter().map(|w| w.is_enabled()).collect();
            prop_assert_eq!(after, flags);
        }

        #[test]
        fn test_start_stop_round_trip(
            preexisting in 0usize..10,
            actors in 0usize..30,
            widgets in 0usize..10,
            double_start in any::<bool>()
        ) {
            let (scene, shared) = recording();
            let foreign: Vec<ActorRef> = (0..preexisting).map(|_| Actor::new("foreign")).collect();
            scene.borrow_mut().add_actors(&foreign);
            let before_actors = scene.borrow().actor_ids();
            let before_widgets = scene.borrow().widget_ids();

            let mut sync = sync_with(actors, widgets, &shared);
            sync.start();
            let once = scene.borrow().actor_ids();
            if double_start {
                sync.start();
                prop_assert_eq!(scene.borrow().actor_ids(), once);
            }
            sync.stop();

            prop_assert_eq!(scene.borrow().actor_ids(), before_actors);
            prop_assert_eq!(scene.borrow().widget_ids(), before_widgets);
        }
    }
}
