//! # Template pipeline
//!
//! Turns a stored template into a personalized scene: groups are dissolved, the template is
//! stretched to the canvas, colors, logo, texts and profile photo are swapped in, and the result
//! becomes the new history baseline.
//!
//! Stages run strictly in order, each one finishing (or deciding there is nothing to do) before
//! the next starts. Only image loads suspend. A stage that fails stops the run where it is,
//! without undoing earlier stages.

mod fit;
mod loader;
mod stages;

pub use fit::{fit_image, flatten_group, group_objects, recolor, refit_text};
pub use loader::{ImageLoader, LoadError, LoadedImage, MemoryImageLoader};

use crate::color::Color;
use crate::engine::Engine;
use crate::host::{facts, status};
use crate::scene::{ObjectId, SceneError};
use std::time::Duration;

/// Missing template payload, the host has probably not delivered it yet.
const PAYLOAD_RETRY: Duration = Duration::from_millis(300);
/// Canvas without area, the surface has probably not been laid out yet.
const SURFACE_RETRY: Duration = Duration::from_millis(1000);

const BLANK_PROFILE: &str = "https://s3.amazonaws.com/appforest_uf/f1674857905873x207865835916353200/blank-profile-picture-973460_1280.webp";

/// The free-plan overlay.
#[derive(serde::Deserialize, Clone, Debug)]
pub struct Watermark {
    pub src: String,
    /// Longest side of the placed watermark.
    pub max: f64,
    #[serde(default)]
    pub left: f64,
    #[serde(default)]
    pub top: f64,
    #[serde(default)]
    pub angle: f64,
    /// Role name, the configured watermark role when absent.
    #[serde(default)]
    pub name: Option<String>,
}

/// Everything a template application is personalized with.
#[derive(serde::Deserialize, Clone, Debug)]
#[serde(default)]
pub struct TemplateParams {
    /// The stored template, `{"objects": [..]}`.
    pub json: Option<String>,
    pub primary_color: Option<Color>,
    pub secondary_color: Option<Color>,
    pub logo_src: Option<String>,
    pub profile_photo_src: String,
    pub name_text: String,
    pub whats_text: String,
    pub address_text: String,
    pub free_plan: bool,
    pub watermark: Option<Watermark>,
    /// Make every image outside the dynamic allow-list inert.
    pub lock_images_not_dynamic: bool,
}
impl Default for TemplateParams {
    fn default() -> Self {
        Self {
            json: None,
            primary_color: None,
            secondary_color: None,
            logo_src: None,
            profile_photo_src: BLANK_PROFILE.to_owned(),
            name_text: "Seu Nome Aqui".to_owned(),
            whats_text: "(00) 0 0000-0000".to_owned(),
            address_text: "Seu Endereço Aqui".to_owned(),
            free_plan: false,
            watermark: None,
            lock_images_not_dynamic: false,
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Scene(#[from] SceneError),
}

#[derive(Debug)]
pub enum PipelineOutcome {
    Finished,
    /// A stage failed. Earlier stages stay applied.
    Aborted(PipelineError),
    /// Preconditions are not met yet, try again after the delay.
    Retry(Duration),
}

/// State handed from one stage to the next.
pub(crate) struct PipelineContext<'a> {
    pub params: &'a TemplateParams,
    pub loader: &'a dyn ImageLoader,
    pub canvas: [f64; 2],
    /// The replacement logo, once placed.
    pub logo: Option<LoadedImage>,
    pub logo_id: Option<ObjectId>,
    pub backdrop_id: Option<ObjectId>,
}

/// Apply a template to the engine's surface, replacing whatever scene it shows.
pub async fn apply_template(
    engine: &mut Engine,
    params: &TemplateParams,
    loader: &dyn ImageLoader,
) -> PipelineOutcome {
    let Some(json) = params.json.as_deref().filter(|json| !json.trim().is_empty()) else {
        log::debug!("no template payload yet");
        return PipelineOutcome::Retry(PAYLOAD_RETRY);
    };
    let canvas = engine.surface().size();
    if canvas[0] < 1.0 || canvas[1] < 1.0 {
        log::debug!("surface not laid out yet");
        return PipelineOutcome::Retry(SURFACE_RETRY);
    }
    engine.host().publish(facts::STATUS, status::PROCESSING.into());
    let context = PipelineContext {
        params,
        loader,
        canvas,
        logo: None,
        logo_id: None,
        backdrop_id: None,
    };
    match stages::run(context, engine, json).await {
        Ok(()) => PipelineOutcome::Finished,
        Err(e) => {
            log::warn!("template pipeline stopped: {e}");
            engine.host().publish(facts::STATUS, status::FINISHED.into());
            PipelineOutcome::Aborted(e)
        }
    }
}
