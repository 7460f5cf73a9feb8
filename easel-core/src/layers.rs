//! # Layer synchronization
//!
//! Projects the scene into the layer panel model the host displays, plus the flat lists of
//! editable texts and images the host builds its forms from. Requests are debounced, with longer
//! delays while the user is moving things; immediate requests run at the next animation frame.

use crate::config::{LayerConfig, Roles};
use crate::host::{facts, FactValue, HostBridge};
use crate::scene::{ColorRole, DrawableObject, ObjectKind, Paint, Scene, SceneError};
use std::time::Duration;

#[derive(thiserror::Error, Debug)]
pub enum LayerError {
    #[error("a layer sync is already running")]
    Busy,
    #[error(transparent)]
    Scene(#[from] SceneError),
    #[error("failed to encode layer list: {0}")]
    Encode(#[from] serde_json::Error),
}

/// When a requested sync should run.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum SyncPlan {
    /// At the next animation frame.
    NextFrame,
    /// After this delay, unless another request replaces it.
    Debounce(Duration),
}

/// One row of the layer panel.
#[derive(Clone, PartialEq, Debug, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerEntry {
    pub id: Option<String>,
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub label: String,
    pub fill: Option<Paint>,
    pub change_to_color: Option<ColorRole>,
    pub change_to_color2: Option<ColorRole>,
    pub gradient_angle_linear: Option<f64>,
    pub is_gradient: bool,
    pub client_selectable: bool,
    pub text: Option<String>,
    pub selected_width: f64,
    pub selected_height: f64,
    pub x: f64,
    pub y: f64,
    pub layer_name: String,
    pub selectable: bool,
}

/// Editable content the host offers forms for. Ids are `""` where an object has none.
#[derive(Clone, PartialEq, Debug, Default)]
pub struct DerivedLists {
    pub text_ids: Vec<String>,
    pub texts: Vec<String>,
    pub text_fonts: Vec<String>,
    pub image_ids: Vec<String>,
    pub image_srcs: Vec<String>,
    pub dynamic_image_ids: Vec<String>,
    pub dynamic_image_srcs: Vec<String>,
}

/// Everything one sync pass publishes besides the raw scene.
#[derive(Clone, PartialEq, Debug, Default)]
pub struct Projection {
    /// Topmost first.
    pub layers: Vec<LayerEntry>,
    pub lists: DerivedLists,
    /// Text and id of the call-to-action text, if the scene has one.
    pub text_cta: Option<(String, String)>,
}

/// Panel label for an object.
#[must_use]
pub fn label(object: &DrawableObject, roles: &Roles) -> &'static str {
    if object.has_name(&roles.background) {
        return "Background";
    }
    match object.kind {
        ObjectKind::Rect { .. } => "Rectangle",
        ObjectKind::Circle { .. } => "Circle",
        ObjectKind::Triangle {} => "Triangle",
        ObjectKind::Line { .. } => "Line",
        ObjectKind::Image { .. } => "Image",
        ObjectKind::IText(_) => "Text",
        ObjectKind::Textbox(_) => "Text Box",
        ObjectKind::Group { .. } => object.type_name(),
    }
}

/// Walk the top-level objects once.
#[must_use]
pub fn project(scene: &Scene, roles: &Roles) -> Projection {
    let mut projection = Projection::default();
    let lists = &mut projection.lists;
    for object in &scene.objects {
        let id = object.id().map(ToString::to_string);
        let label = label(object, roles);
        let client_selectable = object.tags.client_selectable.unwrap_or(true);
        let text = object.text().map(|body| body.text.clone());

        projection.layers.push(LayerEntry {
            id: id.clone(),
            name: object.tags.name.clone(),
            label: label.to_owned(),
            fill: object.fill.clone(),
            change_to_color: object.tags.change_to_color,
            change_to_color2: object.tags.change_to_color2,
            gradient_angle_linear: object.tags.gradient_angle_linear,
            is_gradient: object.tags.is_gradient.unwrap_or(false),
            client_selectable,
            text: text.clone(),
            selected_width: object.width,
            selected_height: object.height,
            x: object.placement.left,
            y: object.placement.top,
            layer_name: object
                .tags
                .layer_name
                .clone()
                .unwrap_or_else(|| label.to_owned()),
            selectable: object.interaction.selectable,
        });

        let id = id.unwrap_or_default();
        let name = object.name();
        if let Some(body) = object.text() {
            if client_selectable && !roles.is_ignored_text(name) {
                lists.text_ids.push(id.clone());
                lists.texts.push(body.text.clone());
                lists.text_fonts.push(body.font_family.clone());
            }
        }
        if let Some(src) = object.image_src() {
            if client_selectable && !roles.is_ignored_image(name) {
                lists.image_ids.push(id.clone());
                lists.image_srcs.push(src.to_owned());
                if roles.is_dynamic_image(name) {
                    lists.dynamic_image_ids.push(id.clone());
                    lists.dynamic_image_srcs.push(src.to_owned());
                }
            }
        }
        if name == Some(roles.text_cta.as_str()) {
            projection.text_cta = Some((text.unwrap_or_default(), id));
        }
    }
    projection.layers.reverse();
    projection
}

pub struct LayerSync {
    config: LayerConfig,
    busy: bool,
}
impl LayerSync {
    #[must_use]
    pub fn new(config: LayerConfig) -> Self {
        Self {
            config,
            busy: false,
        }
    }
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.busy
    }
    /// Debounce delay. While moving it grows with the motion counter, up to a cap.
    #[must_use]
    pub fn delay(&self, moving: bool, counter: u32) -> Duration {
        if moving {
            let factor = (2.0 + f64::from(counter) / 10.0).min(self.config.max_moving_factor);
            Duration::from_secs_f64(self.config.moving_delay_ms as f64 * factor / 1000.0)
        } else {
            Duration::from_millis(self.config.idle_delay_ms)
        }
    }
    /// Decide when a request runs. The caller cancels any pending debounce first.
    #[must_use]
    pub fn plan(&self, immediate: bool, moving: bool, counter: u32, source: &str) -> SyncPlan {
        let plan = if immediate && !self.busy {
            SyncPlan::NextFrame
        } else {
            SyncPlan::Debounce(self.delay(moving && !immediate, counter))
        };
        log::trace!("layer sync from {source}: {plan:?}");
        plan
    }
    /// Run one sync pass: keep the watermark on top, then publish the scene, the layer list, and
    /// the derived lists. The busy flag is always released.
    pub fn execute(
        &mut self,
        scene: &mut Scene,
        roles: &Roles,
        host: &dyn HostBridge,
    ) -> Result<(), LayerError> {
        if self.busy {
            return Err(LayerError::Busy);
        }
        self.busy = true;
        let result = Self::publish(scene, roles, host);
        self.busy = false;
        if let Err(e) = &result {
            log::warn!("layer sync failed: {e}");
        }
        result
    }
    fn publish(scene: &mut Scene, roles: &Roles, host: &dyn HostBridge) -> Result<(), LayerError> {
        scene.ensure_on_top(&roles.watermark);
        host.publish(facts::JSON_LAYERS, FactValue::Json(scene.to_json()?));

        let projection = project(scene, roles);
        let layers = serde_json::to_string(&projection.layers)?;
        host.publish(facts::ALL_LAYERS_INFO, FactValue::Json(layers));
        let lists = projection.lists;
        host.publish(facts::TEXT_IDS, lists.text_ids.into());
        host.publish(facts::TEXTS, lists.texts.into());
        host.publish(facts::TEXT_FONTS, lists.text_fonts.into());
        host.publish(facts::IMAGE_IDS, lists.image_ids.into());
        host.publish(facts::IMAGE_SRCS, lists.image_srcs.into());
        host.publish(facts::DYNAMIC_IMAGE_IDS, lists.dynamic_image_ids.into());
        host.publish(facts::DYNAMIC_IMAGE_SRCS, lists.dynamic_image_srcs.into());
        if let Some((text, id)) = projection.text_cta {
            host.publish(facts::TEXT_CTA_TEXT, text.into());
            host.publish(facts::TEXT_CTA_ID, id.into());
        }
        log::debug!("layer sync published {} layers", projection.layers.len());
        Ok(())
    }
}
