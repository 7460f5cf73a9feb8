//! # History
//!
//! Undo and redo over whole-scene checkpoints. Each entry is the persisted description of the
//! scene minus objects tagged `excludeFromHistory`. Entries are compared as text, so committing an
//! unchanged scene is a no-op.
//!
//! The undo stack always holds the current state on top: undo is possible only with more than one
//! entry, and moves that top entry to the redo stack.

use crate::config::{HistoryConfig, Roles};
use crate::host::{facts, FactValue, HostBridge};
use crate::scene::{Scene, SceneError};
use std::collections::VecDeque;

#[derive(thiserror::Error, Debug)]
pub enum HistoryError {
    #[error("checkpoint could not be serialized or restored: {0}")]
    Scene(#[from] SceneError),
}

#[derive(Copy, Clone, PartialEq, Eq, Debug, strum::AsRefStr)]
pub enum CommitOutcome {
    Pushed,
    /// Identical to the current top. Redo is still dropped.
    Duplicate,
    /// A history load is in progress.
    Suppressed,
}

pub struct History {
    max_depth: usize,
    undo: VecDeque<String>,
    redo: Vec<String>,
    loading: bool,
}
impl History {
    #[must_use]
    pub fn new(config: &HistoryConfig) -> Self {
        Self {
            max_depth: config.max_depth.max(1),
            undo: VecDeque::new(),
            redo: Vec::new(),
            loading: false,
        }
    }
    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.undo.len() > 1
    }
    #[must_use]
    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }
    #[must_use]
    pub fn depth(&self) -> usize {
        self.undo.len()
    }
    #[must_use]
    pub fn redo_depth(&self) -> usize {
        self.redo.len()
    }
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.loading
    }
    /// The entry describing the current state.
    #[must_use]
    pub fn current(&self) -> Option<&str> {
        self.undo.back().map(String::as_str)
    }

    pub fn commit(&mut self, scene: &Scene, label: &str) -> Result<CommitOutcome, HistoryError> {
        if self.loading {
            return Ok(CommitOutcome::Suppressed);
        }
        let state = scene.describe_filtered(|object| !object.tags.exclude_from_history)?;
        self.redo.clear();
        if self.undo.back() == Some(&state) {
            log::trace!("commit {label}: unchanged");
            return Ok(CommitOutcome::Duplicate);
        }
        self.undo.push_back(state);
        while self.undo.len() > self.max_depth {
            self.undo.pop_front();
        }
        log::debug!("commit {label}: depth {}", self.undo.len());
        Ok(CommitOutcome::Pushed)
    }
    /// Drop both stacks and make the current scene the only entry.
    pub fn reset(&mut self, scene: &Scene, label: &str) -> Result<CommitOutcome, HistoryError> {
        self.undo.clear();
        self.redo.clear();
        self.commit(scene, label)
    }
    /// Move the current entry to the redo stack and return the entry to load.
    pub fn step_back(&mut self) -> Option<String> {
        if !self.can_undo() {
            return None;
        }
        let current = self.undo.pop_back()?;
        self.redo.push(current);
        self.undo.back().cloned()
    }
    /// Move the latest undone entry back and return it for loading.
    pub fn step_forward(&mut self) -> Option<String> {
        let state = self.redo.pop()?;
        self.undo.push_back(state.clone());
        Some(state)
    }
    /// Commits are suppressed until [`Self::end_load`].
    pub fn begin_load(&mut self) {
        self.loading = true;
    }
    pub fn end_load(&mut self) {
        self.loading = false;
    }
    pub fn publish_availability(&self, host: &dyn HostBridge) {
        host.publish(facts::CAN_UNDO, FactValue::Bool(self.can_undo()));
        host.publish(facts::CAN_REDO, FactValue::Bool(self.can_redo()));
    }
}

/// Rebuild a scene from a history entry.
///
/// Objects excluded from history are carried over from `current` on top of the restored ones,
/// interactivity follows `clientSelectable`, and the background is locked at the bottom.
pub fn restore(entry: &str, current: &Scene, roles: &Roles) -> Result<Scene, HistoryError> {
    let mut scene = Scene::from_json(entry)?;
    for object in &mut scene.objects {
        match object.tags.client_selectable {
            Some(true) => object.interaction.selectable = true,
            Some(false) => object.interaction.lock(),
            None => (),
        }
        object.mark_dirty();
    }
    scene.objects.extend(
        current
            .objects
            .iter()
            .filter(|object| object.tags.exclude_from_history)
            .cloned(),
    );
    if scene.ensure_background_first(&roles.background) {
        if let Some(background) = scene.background_mut(&roles.background) {
            background.interaction.lock();
        }
    }
    Ok(scene)
}

#[cfg(test)]
mod test {
    use super::{restore, CommitOutcome, History};
    use crate::config::{HistoryConfig, Roles};
    use crate::host::{facts, FactValue, RecordingHost};
    use crate::scene::{DrawableObject, Scene};

    fn scene_at(left: f64) -> Scene {
        let mut background = DrawableObject::rect(100.0, 100.0).named("bgRect").with_id("bg");
        background.interaction.lock();
        Scene::new(vec![
            background,
            DrawableObject::rect(10.0, 10.0).with_id("box").at(left, 0.0),
        ])
    }

    #[test]
    fn duplicates_do_not_grow() {
        let mut history = History::new(&HistoryConfig::default());
        assert_eq!(history.commit(&scene_at(1.0), "a").unwrap(), CommitOutcome::Pushed);
        assert_eq!(history.commit(&scene_at(1.0), "a").unwrap(), CommitOutcome::Duplicate);
        assert_eq!(history.depth(), 1);
        assert!(!history.can_undo());
    }
    #[test]
    fn depth_is_bounded() {
        let mut history = History::new(&HistoryConfig { max_depth: 50 });
        for step in 0..120 {
            history.commit(&scene_at(f64::from(step)), "move").unwrap();
            assert!(history.depth() <= 50);
            assert!(history.depth() >= 1);
        }
        assert_eq!(history.depth(), 50);
        // Oldest entries went first.
        let oldest = history.undo.front().unwrap();
        assert_eq!(oldest, &scene_at(70.0).to_json().unwrap());
    }
    #[test]
    fn undo_redo_round_trip() {
        let mut history = History::new(&HistoryConfig::default());
        history.commit(&scene_at(1.0), "a").unwrap();
        history.commit(&scene_at(2.0), "b").unwrap();
        let latest = history.current().unwrap().to_owned();

        let previous = history.step_back().unwrap();
        assert_eq!(previous, scene_at(1.0).to_json().unwrap());
        assert!(history.can_redo());
        let restored = restore(&previous, &scene_at(2.0), &Roles::default()).unwrap();
        // Loads never record.
        history.begin_load();
        assert_eq!(history.commit(&restored, "load").unwrap(), CommitOutcome::Suppressed);
        history.end_load();

        let again = history.step_forward().unwrap();
        assert_eq!(again, latest);
        let restored = restore(&again, &restored, &Roles::default()).unwrap();
        assert_eq!(restored.to_json().unwrap(), latest);
        assert!(!history.can_redo());
        assert!(history.step_forward().is_none());
    }
    #[test]
    fn new_commit_clears_redo() {
        let mut history = History::new(&HistoryConfig::default());
        history.commit(&scene_at(1.0), "a").unwrap();
        history.commit(&scene_at(2.0), "b").unwrap();
        history.step_back();
        history.commit(&scene_at(3.0), "c").unwrap();
        assert!(!history.can_redo());
    }
    #[test]
    fn unchanged_commit_still_drops_redo() {
        let mut history = History::new(&HistoryConfig::default());
        history.commit(&scene_at(1.0), "a").unwrap();
        history.commit(&scene_at(2.0), "b").unwrap();
        history.step_back();
        assert!(history.can_redo());
        assert_eq!(
            history.commit(&scene_at(1.0), "same").unwrap(),
            CommitOutcome::Duplicate
        );
        assert!(!history.can_redo());
        assert_eq!(history.depth(), 1);
    }
    #[test]
    fn reset_leaves_single_baseline() {
        let mut history = History::new(&HistoryConfig::default());
        for step in 0..4 {
            history.commit(&scene_at(f64::from(step)), "move").unwrap();
        }
        history.step_back();
        history.reset(&scene_at(9.0), "baseline").unwrap();
        assert_eq!(history.depth(), 1);
        assert!(!history.can_undo());
        assert!(!history.can_redo());

        let host = RecordingHost::new();
        history.publish_availability(&host);
        assert_eq!(host.fact(facts::CAN_UNDO), Some(FactValue::Bool(false)));
        assert_eq!(host.fact(facts::CAN_REDO), Some(FactValue::Bool(false)));
    }
    #[test]
    fn excluded_objects_are_stripped_and_reattached() {
        let mut watermark = DrawableObject::image("wm.png", 10.0, 10.0)
            .named("watermark")
            .with_id("wm");
        watermark.tags.exclude_from_history = true;
        let mut scene = scene_at(1.0);
        scene.add(watermark);

        let mut history = History::new(&HistoryConfig::default());
        history.commit(&scene, "a").unwrap();
        let entry = history.current().unwrap().to_owned();
        assert!(!entry.contains("wm.png"));

        let mut locked = DrawableObject::rect(1.0, 1.0).with_id("locked");
        locked.tags.client_selectable = Some(false);
        let mut stored = Scene::from_json(&entry).unwrap();
        stored.objects.insert(0, locked);
        let restored = restore(&stored.to_json().unwrap(), &scene, &Roles::default()).unwrap();
        assert!(restored.objects[0].has_name("bgRect"));
        assert!(!restored.objects[0].interaction.selectable);
        assert!(restored.objects.last().unwrap().has_name("watermark"));
        let locked = restored.find_by_id(&"locked".into()).unwrap();
        assert!(locked.interaction.lock_movement_x);
    }
}
