//! # Engine
//!
//! The coordinator that owns a surface and everything deciding when it renders, exports,
//! checkpoints, and tells the host about it.
//!
//! Nothing here blocks or spawns. The host drives an engine through three entry points:
//! * [`Engine::dispatch`] for everything the surface and the user do,
//! * [`Engine::on_animation_frame`] whenever [`Engine::wants_animation_frame`] says so,
//! * [`Engine::poll_timers`] at or after [`Engine::next_deadline`].
//!
//! Reactions to one event always happen in the same order: history first, then layer sync, then
//! render scheduling.

mod input;
mod resize;

pub use input::{Key, KeyPress};
pub use resize::{ResizeDecision, ResizeDetector};

use crate::clock::{Clock, Timers, Timestamp};
use crate::config::EngineConfig;
use crate::frame::{self, FramePass, FrameScheduler, Job, Priority};
use crate::history::{self, CommitOutcome, History};
use crate::host::{facts, FactValue, HostBridge};
use crate::interaction::{AxisLock, InteractionTracker, MotionKind};
use crate::layers::{LayerError, LayerSync, SyncPlan};
use crate::scene::{DrawableObject, ObjectId, Scene, SceneError};
use crate::selection;
use crate::snapshot::{CaptureRequest, Snapshot, SnapshotGenerator};
use crate::surface::{Surface, SurfaceSettings};
use std::sync::Arc;
use std::time::Duration;

/// Render work queued on the frame scheduler.
pub type RenderJob = Job<Engine>;
/// Run once a loaded scene has settled.
pub type LoadCallback = Box<dyn FnOnce(&mut Engine) + Send>;

#[derive(Copy, Clone, PartialEq, Eq, Debug, strum::AsRefStr)]
pub enum TimerKind {
    /// Debounced layer sync.
    LayerSync,
    /// The user stopped moving things.
    MotionIdle,
    /// Debounced canvas resize.
    Resize,
    /// A scene load waiting for a layer sync to finish.
    DeferredLoad,
    /// A scheduled snapshot.
    Snapshot,
}

/// Something that happened on the surface or in the input devices over it.
#[derive(Clone, Debug)]
pub enum SurfaceEvent {
    /// An object is being dragged. `position` is where the drag would put its origin.
    ObjectMoving {
        id: ObjectId,
        position: [f64; 2],
        shift: bool,
    },
    /// An object is being scaled or rotated.
    ObjectTransforming { id: ObjectId },
    /// A drag, scale or rotation finished.
    ObjectModified { id: ObjectId },
    ObjectAdded { id: ObjectId },
    ObjectRemoved { id: ObjectId },
    /// Selection created or changed, active object first.
    SelectionChanged { ids: Vec<ObjectId> },
    SelectionCleared,
    /// A multi-touch gesture step.
    Pinch { touches: u32 },
    TouchDrag,
    PointerDown { position: [f64; 2] },
    PointerMove { position: [f64; 2], buttons: bool },
    PointerUp,
    Wheel {
        position: [f64; 2],
        delta_y: f64,
        shift: bool,
    },
    KeyDown(KeyPress),
    KeyUp(KeyPress),
    /// A text object entered or left in-place editing.
    TextEditing { editing: bool },
    /// The surface finished a render the engine did not ask for.
    AfterRender,
    /// Sizes the host can observe for the surface's container and element.
    ContainerResized {
        container: [f64; 2],
        element: [f64; 2],
    },
}

/// Rate limit for reacting to completed renders.
#[derive(Default)]
struct AfterRenderGate {
    last: Option<Timestamp>,
    queued: bool,
}

/// Space-drag viewport panning.
#[derive(Default)]
struct PanState {
    active: bool,
    last: Option<[f64; 2]>,
}

struct PendingLoad {
    scene: Scene,
    on_loaded: Option<LoadCallback>,
}

pub struct Engine {
    config: EngineConfig,
    clock: Arc<dyn Clock>,
    surface: Box<dyn Surface>,
    host: Box<dyn HostBridge>,
    frames: FrameScheduler<RenderJob>,
    tracker: InteractionTracker,
    axis_lock: AxisLock,
    layers: LayerSync,
    snapshots: SnapshotGenerator,
    history: History,
    timers: Timers<TimerKind>,
    /// An immediate layer sync waits for the next animation frame.
    sync_next_frame: bool,
    pending_snapshot: Option<CaptureRequest>,
    /// Selected ids, active object first.
    selection: Vec<ObjectId>,
    clipboard: Option<DrawableObject>,
    editing_text: bool,
    pan: PanState,
    resize: ResizeDetector,
    pending_load: Option<PendingLoad>,
    after_render: AfterRenderGate,
}

impl Engine {
    /// Take over a surface. The current scene becomes the history baseline and a layer sync is
    /// scheduled for the first frame.
    pub fn new(
        config: EngineConfig,
        surface: Box<dyn Surface>,
        host: Box<dyn HostBridge>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let mut engine = Self {
            frames: FrameScheduler::new(config.frame.clone()),
            tracker: InteractionTracker::new(config.interaction.clone()),
            axis_lock: AxisLock::new(&config.interaction),
            layers: LayerSync::new(config.layers.clone()),
            snapshots: SnapshotGenerator::new(config.snapshot.clone()),
            history: History::new(&config.history),
            resize: ResizeDetector::new(config.resize.clone()),
            timers: Timers::default(),
            sync_next_frame: false,
            pending_snapshot: None,
            selection: Vec::new(),
            clipboard: None,
            editing_text: false,
            pan: PanState::default(),
            pending_load: None,
            after_render: AfterRenderGate::default(),
            config,
            clock,
            surface,
            host,
        };
        engine.save_state("initial");
        engine.request_layer_sync(true, "initial");
        engine
    }

    #[must_use]
    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
    #[must_use]
    pub fn surface(&self) -> &dyn Surface {
        &*self.surface
    }
    pub fn surface_mut(&mut self) -> &mut dyn Surface {
        &mut *self.surface
    }
    #[must_use]
    pub fn host(&self) -> &dyn HostBridge {
        &*self.host
    }
    #[must_use]
    pub fn scene(&self) -> &Scene {
        self.surface.scene()
    }
    #[must_use]
    pub fn history(&self) -> &History {
        &self.history
    }
    #[must_use]
    pub fn is_moving(&self) -> bool {
        self.tracker.moving()
    }
    /// Selected ids, active object first.
    #[must_use]
    pub fn selection(&self) -> &[ObjectId] {
        &self.selection
    }
    #[must_use]
    pub fn active_object(&self) -> Option<&DrawableObject> {
        self.scene().find_by_id(self.selection.first()?)
    }

    // ---- Driving ----

    #[must_use]
    pub fn wants_animation_frame(&self) -> bool {
        self.frames.is_running() || self.sync_next_frame || self.surface.render_pending()
    }
    /// One animation frame: a batch of render jobs, any requested render, and the layer sync
    /// that was waiting for this frame.
    pub fn on_animation_frame(&mut self) {
        let now = self.now();
        let sync_due = std::mem::take(&mut self.sync_next_frame);
        match self.frames.begin_frame(now, self.tracker.moving()) {
            FramePass::Deferred => (),
            FramePass::Run(batch) => {
                frame::run_batch(self, now, batch);
                self.frames.end_frame();
            }
        }
        if self.surface.render_pending() {
            self.render_now(now);
        }
        if sync_due {
            self.execute_layer_sync();
        }
    }
    #[must_use]
    pub fn next_deadline(&self) -> Option<Timestamp> {
        self.timers.next_deadline()
    }
    /// Fire every timer that is due.
    pub fn poll_timers(&mut self) {
        let now = self.now();
        for kind in self.timers.take_expired(now) {
            log::trace!("timer {} fired", kind.as_ref());
            match kind {
                TimerKind::LayerSync => self.execute_layer_sync(),
                TimerKind::MotionIdle => self.settle_motion(now),
                TimerKind::Resize => {
                    if let Some(size) = self.resize.take_pending() {
                        self.apply_resize(size, now);
                    }
                }
                TimerKind::DeferredLoad => self.retry_load(now),
                TimerKind::Snapshot => {
                    if let Some(request) = self.pending_snapshot.take() {
                        self.capture(request, now);
                    }
                }
            }
        }
    }
    /// Queue render work for upcoming animation frames.
    pub fn schedule(&mut self, job: RenderJob, priority: Priority) {
        self.frames.submit(job, priority);
    }

    pub fn dispatch(&mut self, event: SurfaceEvent) {
        let now = self.now();
        match event {
            SurfaceEvent::ObjectMoving {
                id,
                position,
                shift,
            } => self.object_moving(&id, position, shift, now),
            SurfaceEvent::ObjectTransforming { .. } => self.on_motion(MotionKind::PointerDrag, now),
            SurfaceEvent::ObjectModified { .. } => self.scene_changed("object:modified"),
            SurfaceEvent::ObjectAdded { .. } => self.scene_changed("object:added"),
            SurfaceEvent::ObjectRemoved { id } => {
                if self.selection.contains(&id) {
                    self.selection.retain(|selected| selected != &id);
                    if self.selection.is_empty() {
                        selection::publish_cleared(&*self.host);
                    }
                }
                self.scene_changed("object:removed");
            }
            SurfaceEvent::SelectionChanged { ids } => self.select(ids),
            SurfaceEvent::SelectionCleared => {
                self.selection.clear();
                selection::publish_cleared(&*self.host);
            }
            SurfaceEvent::Pinch { touches } => self.on_motion(MotionKind::Pinch { touches }, now),
            SurfaceEvent::TouchDrag => self.on_motion(MotionKind::TouchDrag, now),
            SurfaceEvent::PointerDown { position } => self.pointer_down(position),
            SurfaceEvent::PointerMove { position, buttons } => self.pointer_move(position, buttons),
            SurfaceEvent::PointerUp => self.pointer_up(),
            SurfaceEvent::Wheel {
                position,
                delta_y,
                shift,
            } => self.wheel(position, delta_y, shift),
            SurfaceEvent::KeyDown(press) => self.key_down(press, now),
            SurfaceEvent::KeyUp(press) => self.key_up(press),
            SurfaceEvent::TextEditing { editing } => self.editing_text = editing,
            SurfaceEvent::AfterRender => self.after_render(now),
            SurfaceEvent::ContainerResized { container, element } => {
                self.check_resize(container, element, now);
            }
        }
    }

    // ---- Rendering and export ----

    /// Render synchronously and react to it.
    pub(crate) fn render_now(&mut self, now: Timestamp) {
        self.surface.render_all();
        self.after_render(now);
    }
    /// Throttled: republish the active object and, when nothing else is going on, refresh the
    /// export.
    fn after_render(&mut self, now: Timestamp) {
        let gate = &mut self.after_render;
        if gate.queued {
            return;
        }
        let throttle = Duration::from_millis(self.config.frame.after_render_throttle_ms);
        if gate.last.is_some_and(|last| now.since(last) < throttle) {
            return;
        }
        gate.last = Some(now);
        gate.queued = true;
        self.frames.submit(
            Box::new(|engine: &mut Engine, now: Timestamp| -> anyhow::Result<()> {
                engine.after_render.queued = false;
                if let Some(active) = engine.active_object() {
                    let json = serde_json::to_string(active)?;
                    engine.host.publish(facts::SELECTED, FactValue::Json(json));
                }
                if !engine.tracker.moving()
                    && !engine.snapshots.is_busy()
                    && engine.pending_snapshot.is_none()
                {
                    engine.capture(
                        CaptureRequest {
                            force: false,
                            high_quality: true,
                        },
                        now,
                    );
                }
                Ok(())
            }),
            Priority::Normal,
        );
    }
    /// Clear the frame queue, including a queued after-render job.
    fn drop_render_work(&mut self) {
        self.frames.clear();
        self.after_render.queued = false;
    }
    fn capture(&mut self, request: CaptureRequest, now: Timestamp) -> Option<Snapshot> {
        self.snapshots.capture(
            request,
            &self.tracker,
            now,
            &mut *self.surface,
            &*self.host,
        )
    }
    /// Capture an export right now, subject to throttling unless forced.
    pub fn request_snapshot(&mut self, request: CaptureRequest) -> Option<Snapshot> {
        let now = self.now();
        self.capture(request, now)
    }
    /// Capture at the next timer poll. Requests made before then are merged.
    fn schedule_snapshot(&mut self, request: CaptureRequest) {
        let merged = match self.pending_snapshot {
            Some(pending) => CaptureRequest {
                force: pending.force || request.force,
                high_quality: pending.high_quality || request.high_quality,
            },
            None => request,
        };
        self.pending_snapshot = Some(merged);
        let now = self.now();
        self.timers.arm(TimerKind::Snapshot, now);
    }

    // ---- Layer sync ----

    /// Ask for the layer facts to be republished. Replaces any pending debounced request.
    pub fn request_layer_sync(&mut self, immediate: bool, source: &str) {
        self.timers.cancel(TimerKind::LayerSync);
        let plan = self.layers.plan(
            immediate,
            self.tracker.moving(),
            self.tracker.counter(),
            source,
        );
        match plan {
            SyncPlan::NextFrame => self.sync_next_frame = true,
            SyncPlan::Debounce(delay) => {
                let at = self.now().after(delay);
                self.timers.arm(TimerKind::LayerSync, at);
            }
        }
    }
    fn execute_layer_sync(&mut self) {
        let result = self.layers.execute(
            self.surface.scene_mut(),
            &self.config.roles,
            &*self.host,
        );
        match result {
            Ok(()) => self.schedule_snapshot(CaptureRequest::FINAL),
            Err(LayerError::Busy) => log::trace!("layer sync skipped, one is running"),
            // Already logged.
            Err(_) => (),
        }
    }

    // ---- Motion ----

    fn on_motion(&mut self, kind: MotionKind, now: Timestamp) {
        let response = self.tracker.on_motion(kind, now);
        if response.entered_moving {
            self.surface.set_settings(SurfaceSettings::performance());
        }
        if let Some(at) = response.idle_at {
            self.timers.arm(TimerKind::MotionIdle, at);
        }
        if response.request_sync {
            self.request_layer_sync(false, kind.as_ref());
        }
    }
    /// Motion stopped: back to normal settings, then one full-quality sync and export.
    fn settle_motion(&mut self, now: Timestamp) {
        if !self.tracker.go_idle() {
            return;
        }
        self.restore_settings();
        self.request_layer_sync(true, "motion-end");
        self.capture(CaptureRequest::FINAL, now);
    }
    /// Drop motion state without the follow-up work of settling.
    fn suspend_motion(&mut self) {
        self.tracker.go_idle();
        self.timers.cancel(TimerKind::MotionIdle);
        self.restore_settings();
    }
    /// The settings the surface should have outside of motion and panning.
    pub(crate) fn restore_settings(&mut self) {
        if !self.pan.active {
            self.surface.set_settings(SurfaceSettings::interactive());
        }
    }

    // ---- History ----

    /// Checkpoint the current scene.
    pub fn save_state(&mut self, label: &str) {
        match self.history.commit(self.surface.scene(), label) {
            Ok(CommitOutcome::Pushed | CommitOutcome::Duplicate) => {
                self.history.publish_availability(&*self.host);
            }
            Ok(_) => (),
            Err(e) => log::warn!("could not checkpoint {label}: {e}"),
        }
    }
    /// Make the current scene the only checkpoint.
    pub fn reset_history(&mut self, label: &str) {
        if let Err(e) = self.history.reset(self.surface.scene(), label) {
            log::warn!("could not reset history: {e}");
        }
        self.history.publish_availability(&*self.host);
    }
    pub fn undo(&mut self) -> bool {
        let Some(entry) = self.history.step_back() else {
            return false;
        };
        self.load_history_entry(&entry);
        true
    }
    pub fn redo(&mut self) -> bool {
        let Some(entry) = self.history.step_forward() else {
            return false;
        };
        self.load_history_entry(&entry);
        true
    }
    fn load_history_entry(&mut self, entry: &str) {
        self.history.begin_load();
        match history::restore(entry, self.surface.scene(), &self.config.roles) {
            Ok(scene) => {
                let now = self.now();
                self.replace_scene(scene);
                self.render_now(now);
                self.request_layer_sync(true, "history");
            }
            Err(e) => log::warn!("could not load checkpoint: {e}"),
        }
        self.history.end_load();
        self.history.publish_availability(&*self.host);
    }

    // ---- Scene ----

    fn replace_scene(&mut self, scene: Scene) {
        self.surface.replace_scene(scene);
        if !self.selection.is_empty() {
            self.selection.clear();
            selection::publish_cleared(&*self.host);
        }
    }
    /// Something structural changed on the surface.
    fn scene_changed(&mut self, label: &str) {
        self.save_state(label);
        self.request_layer_sync(false, label);
    }
    /// Replace the scene with a persisted description.
    ///
    /// Motion and queued render work are dropped. Malformed descriptions are rejected before
    /// anything changes. `on_loaded` runs once the new scene has been rendered, synced, and
    /// exported.
    pub fn load_scene(
        &mut self,
        description: &str,
        on_loaded: Option<LoadCallback>,
    ) -> Result<(), SceneError> {
        let scene = Scene::from_json(description)?;
        self.suspend_motion();
        self.drop_render_work();
        self.timers.cancel(TimerKind::LayerSync);
        let pending = PendingLoad { scene, on_loaded };
        if self.layers.is_busy() {
            self.defer_load(pending);
        } else {
            self.finish_load(pending);
        }
        Ok(())
    }
    fn defer_load(&mut self, pending: PendingLoad) {
        log::debug!("layer sync running, deferring scene load");
        self.pending_load = Some(pending);
        let at = self
            .now()
            .after(Duration::from_millis(self.config.layers.load_retry_ms));
        self.timers.arm(TimerKind::DeferredLoad, at);
    }
    fn retry_load(&mut self, _now: Timestamp) {
        let Some(pending) = self.pending_load.take() else {
            return;
        };
        if self.layers.is_busy() {
            self.defer_load(pending);
        } else {
            self.finish_load(pending);
        }
    }
    fn finish_load(&mut self, PendingLoad { scene, on_loaded }: PendingLoad) {
        let now = self.now();
        self.replace_scene(scene);
        self.render_now(now);
        self.reset_history("json-loaded-baseline");
        self.frames.submit(
            Box::new(move |engine: &mut Engine, now: Timestamp| -> anyhow::Result<()> {
                engine.surface.request_render();
                engine.request_layer_sync(true, "load");
                engine.capture(CaptureRequest::FINAL, now);
                if let Some(on_loaded) = on_loaded {
                    on_loaded(engine);
                }
                Ok(())
            }),
            Priority::High,
        );
    }

    // ---- Selection ----

    fn select(&mut self, ids: Vec<ObjectId>) {
        let scene = self.surface.scene();
        let background = &self.config.roles.background;
        let objects: Vec<&DrawableObject> =
            ids.iter().filter_map(|id| scene.find_by_id(id)).collect();
        let discard =
            objects.is_empty() || objects.iter().any(|object| object.has_name(background));
        if !discard {
            selection::publish_selected(&*self.host, &objects);
        }
        if discard {
            self.discard_selection();
        } else {
            self.selection = ids;
        }
    }
    /// Deselect everything.
    pub fn discard_selection(&mut self) {
        self.selection.clear();
        selection::publish_cleared(&*self.host);
        self.surface.request_render();
    }
    /// Replace the active group with its children, keeping them where they are on screen.
    pub fn ungroup_selection(&mut self) -> bool {
        let Some(id) = self.selection.first().cloned() else {
            return false;
        };
        let scene = self.surface.scene_mut();
        let Some(index) = scene.position(&id) else {
            return false;
        };
        if !scene.objects[index].is_group() {
            return false;
        }
        let group = scene.objects.remove(index);
        for (offset, mut child) in crate::pipeline::flatten_group(group).into_iter().enumerate() {
            if child.tags.id.is_none() {
                child.tags.id = Some(scene.unique_id());
            }
            scene.insert_at(index + offset, child);
        }
        self.discard_selection();
        self.save_state("ungroup");
        true
    }

    // ---- Resize ----

    fn check_resize(&mut self, container: [f64; 2], element: [f64; 2], now: Timestamp) {
        let current = self.surface.size();
        match self.resize.check(now, container, element, current) {
            ResizeDecision::Ignore => (),
            ResizeDecision::Apply(size) => self.apply_resize(size, now),
            ResizeDecision::Debounce(_, delay) => {
                self.timers.arm(TimerKind::Resize, now.after(delay));
            }
        }
    }
    /// Resize the canvas, stretch the background with it, and refresh everything derived.
    fn apply_resize(&mut self, size: [f64; 2], now: Timestamp) {
        log::debug!("resizing canvas to {}x{}", size[0], size[1]);
        self.resize.applied(now);
        self.surface.set_size(size);
        if let Some(background) = self
            .surface
            .scene_mut()
            .background_mut(&self.config.roles.background)
        {
            background.width = size[0];
            background.height = size[1];
        }
        self.render_now(now);
        self.request_layer_sync(true, "canvas-resize");
        self.capture(CaptureRequest::FINAL, now);
    }
}
