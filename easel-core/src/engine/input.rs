//! Keyboard, wheel and pointer handling on top of the surface's own object events.

use super::Engine;
use crate::clock::Timestamp;
use crate::interaction::MotionKind;
use crate::scene::ObjectId;
use crate::surface::SurfaceSettings;

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Key {
    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,
    /// Platform delete. Hosts map Backspace to this where that is the convention.
    Delete,
    Escape,
    Space,
    Char(char),
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct KeyPress {
    pub key: Key,
    pub shift: bool,
    /// Ctrl, or Cmd on macOS.
    pub command: bool,
}
impl KeyPress {
    #[must_use]
    pub fn plain(key: Key) -> Self {
        Self {
            key,
            shift: false,
            command: false,
        }
    }
    #[must_use]
    pub fn shifted(key: Key) -> Self {
        Self {
            shift: true,
            ..Self::plain(key)
        }
    }
    #[must_use]
    pub fn command(key: Key) -> Self {
        Self {
            command: true,
            ..Self::plain(key)
        }
    }
}

impl Engine {
    pub(super) fn object_moving(
        &mut self,
        id: &ObjectId,
        position: [f64; 2],
        shift: bool,
        now: Timestamp,
    ) {
        let position = self.axis_lock.constrain(shift, position);
        if let Some(object) = self.surface.scene_mut().find_by_id_mut(id) {
            object.placement.left = position[0];
            object.placement.top = position[1];
        }
        self.on_motion(MotionKind::PointerDrag, now);
    }

    pub(super) fn key_down(&mut self, press: KeyPress, now: Timestamp) {
        if self.host.is_typing() {
            return;
        }
        let KeyPress {
            key,
            shift,
            command,
        } = press;
        match key {
            Key::ArrowUp | Key::ArrowDown | Key::ArrowLeft | Key::ArrowRight => {
                self.nudge(key, shift, now);
            }
            Key::Delete => self.delete_active(),
            Key::Escape => self.discard_selection(),
            Key::Space => self.begin_pan(),
            Key::Char(c) if command => match c.to_ascii_lowercase() {
                'z' if shift => {
                    self.redo();
                }
                'z' => {
                    self.undo();
                }
                'y' => {
                    self.redo();
                }
                'c' => self.copy(),
                'v' => self.paste(),
                _ => (),
            },
            Key::Char(_) => (),
        }
    }
    pub(super) fn key_up(&mut self, press: KeyPress) {
        if press.key == Key::Space && self.pan.active {
            self.pan.active = false;
            self.pan.last = None;
            let settings = if self.tracker.moving() {
                SurfaceSettings::performance()
            } else {
                SurfaceSettings::interactive()
            };
            self.surface.set_settings(settings);
        }
    }

    /// Move the active object by one step, or a large step with shift.
    fn nudge(&mut self, key: Key, shift: bool, now: Timestamp) {
        let Some(id) = self.selection.first().cloned() else {
            return;
        };
        let step = if shift {
            self.config.interaction.nudge_step_shift
        } else {
            self.config.interaction.nudge_step
        };
        let delta = match key {
            Key::ArrowUp => [0.0, -step],
            Key::ArrowDown => [0.0, step],
            Key::ArrowLeft => [-step, 0.0],
            Key::ArrowRight => [step, 0.0],
            _ => return,
        };
        let Some(object) = self.surface.scene_mut().find_by_id_mut(&id) else {
            return;
        };
        if !object.interaction.is_movable() {
            return;
        }
        object.placement.left += delta[0];
        object.placement.top += delta[1];
        self.on_motion(MotionKind::KeyboardNudge, now);
        self.surface.request_render();
        self.request_layer_sync(true, "keyboard-move");
        self.save_state("arrow-move");
    }
    fn delete_active(&mut self) {
        let Some(id) = self.selection.first().cloned() else {
            return;
        };
        let scene = self.surface.scene_mut();
        if scene
            .find_by_id_mut(&id)
            .is_some_and(|object| !object.interaction.is_movable())
        {
            log::debug!("{} is locked, not deleting", id.as_str());
            return;
        }
        if let Err(e) = scene.remove(&id) {
            log::debug!("nothing to delete: {e}");
            return;
        }
        self.discard_selection();
        self.request_layer_sync(true, "delete");
        self.save_state("delete");
    }
    fn copy(&mut self) {
        if let Some(active) = self.active_object() {
            self.clipboard = Some(active.clone());
        }
    }
    fn paste(&mut self) {
        if self.editing_text && self.active_object().is_some_and(|object| object.is_text()) {
            // The host pastes into the text being edited.
            return;
        }
        let Some(mut copy) = self.clipboard.clone() else {
            return;
        };
        let offset = self.config.interaction.paste_offset;
        let scene = self.surface.scene_mut();
        let id = scene.unique_id();
        copy.tags.id = Some(id.clone());
        copy.placement.left += offset;
        copy.placement.top += offset;
        scene.add(copy);
        self.surface.request_render();
        self.select(vec![id]);
        self.save_state("paste");
        self.request_layer_sync(true, "paste");
    }

    /// Shift+wheel zooms around the pointer.
    pub(super) fn wheel(&mut self, position: [f64; 2], delta_y: f64, shift: bool) {
        if !shift {
            return;
        }
        let config = &self.config.interaction;
        let mut viewport = self.surface.viewport();
        let zoom = (viewport.zoom * config.zoom_base.powf(delta_y))
            .clamp(config.min_zoom, config.max_zoom);
        viewport.zoom_to_point(position, zoom);
        if zoom <= 1.0 {
            viewport.pan = [0.0; 2];
        }
        self.surface.set_viewport(viewport);
        self.request_layer_sync(true, "zoom");
        self.surface.request_render();
    }

    fn begin_pan(&mut self) {
        if self.pan.active {
            return;
        }
        self.pan.active = true;
        let mut settings = self.surface.settings();
        settings.selection = false;
        settings.skip_target_find = true;
        self.surface.set_settings(settings);
    }
    pub(super) fn pointer_down(&mut self, position: [f64; 2]) {
        if self.pan.active {
            self.pan.last = Some(position);
        }
    }
    pub(super) fn pointer_move(&mut self, position: [f64; 2], buttons: bool) {
        if !self.pan.active || !buttons {
            return;
        }
        let Some(last) = self.pan.last.replace(position) else {
            return;
        };
        let mut viewport = self.surface.viewport();
        viewport.pan_by([position[0] - last[0], position[1] - last[1]]);
        self.surface.set_viewport(viewport);
        self.surface.request_render();
    }
    pub(super) fn pointer_up(&mut self) {
        self.pan.last = None;
        self.axis_lock.reset();
        if !self.tracker.moving() {
            self.restore_settings();
        }
    }
}
