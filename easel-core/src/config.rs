//! # Configuration
//!
//! Every throttle window, debounce delay and role name the engine relies on. All fields have
//! defaults, so a settings file only needs to mention what it overrides.

use std::time::Duration;

#[derive(serde::Deserialize, serde::Serialize, Clone, Debug, Default)]
#[serde(default)]
pub struct EngineConfig {
    pub frame: FrameConfig,
    pub interaction: InteractionConfig,
    pub layers: LayerConfig,
    pub snapshot: SnapshotConfig,
    pub history: HistoryConfig,
    pub resize: ResizeConfig,
    pub roles: Roles,
}

#[derive(serde::Deserialize, serde::Serialize, Clone, Debug)]
#[serde(default)]
pub struct FrameConfig {
    /// Minimum time between two processing passes while the user is moving something.
    pub moving_interval_ms: u64,
    pub moving_jobs_per_frame: usize,
    pub idle_jobs_per_frame: usize,
    /// Minimum time between two after-render reactions.
    pub after_render_throttle_ms: u64,
}
impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            moving_interval_ms: 67,
            moving_jobs_per_frame: 2,
            idle_jobs_per_frame: 5,
            after_render_throttle_ms: 250,
        }
    }
}
impl FrameConfig {
    #[must_use]
    pub fn moving_interval(&self) -> Duration {
        Duration::from_millis(self.moving_interval_ms)
    }
    #[must_use]
    pub fn jobs_per_frame(&self, moving: bool) -> usize {
        if moving {
            self.moving_jobs_per_frame
        } else {
            self.idle_jobs_per_frame
        }
    }
}

#[derive(serde::Deserialize, serde::Serialize, Clone, Debug)]
#[serde(default)]
pub struct InteractionConfig {
    pub pinch_idle_ms: u64,
    pub touch_idle_ms: u64,
    pub pointer_idle_ms: u64,
    /// Above this many consecutive motion events, snapshots are skipped until idle.
    pub continuous_threshold: u32,
    /// A touch drag further than this from the previous one starts a new burst.
    pub touch_burst_gap_ms: u64,
    /// Touch drags in a burst before the surface counts as moving.
    pub touch_moving_after: u32,
    /// Every n-th touch drag in a burst requests a layer sync.
    pub touch_sync_every: u32,
    pub nudge_step: f64,
    pub nudge_step_shift: f64,
    pub paste_offset: f64,
    pub axis_lock_threshold: f64,
    pub axis_lock_grid: f64,
    pub min_zoom: f64,
    pub max_zoom: f64,
    /// Zoom factor per unit of wheel delta.
    pub zoom_base: f64,
}
impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            pinch_idle_ms: 500,
            touch_idle_ms: 700,
            pointer_idle_ms: 300,
            continuous_threshold: 5,
            touch_burst_gap_ms: 1000,
            touch_moving_after: 2,
            touch_sync_every: 15,
            nudge_step: 1.0,
            nudge_step_shift: 10.0,
            paste_offset: 15.0,
            axis_lock_threshold: 5.0,
            axis_lock_grid: 20.0,
            min_zoom: 1.0,
            max_zoom: 4.0,
            zoom_base: 0.999,
        }
    }
}

#[derive(serde::Deserialize, serde::Serialize, Clone, Debug)]
#[serde(default)]
pub struct LayerConfig {
    pub idle_delay_ms: u64,
    pub moving_delay_ms: u64,
    /// Cap of the moving delay multiplier `2 + counter / 10`.
    pub max_moving_factor: f64,
    /// Retry delay of a scene load that arrives while a sync is executing.
    pub load_retry_ms: u64,
}
impl Default for LayerConfig {
    fn default() -> Self {
        Self {
            idle_delay_ms: 1000,
            moving_delay_ms: 2000,
            max_moving_factor: 4.0,
            load_retry_ms: 100,
        }
    }
}

#[derive(serde::Deserialize, serde::Serialize, Clone, Debug)]
#[serde(default)]
pub struct SnapshotConfig {
    pub idle_throttle_ms: u64,
    pub moving_throttle_ms: u64,
    pub high_quality: u8,
    pub normal_quality: u8,
}
impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            idle_throttle_ms: 1500,
            moving_throttle_ms: 3000,
            high_quality: 95,
            normal_quality: 70,
        }
    }
}

#[derive(serde::Deserialize, serde::Serialize, Clone, Debug)]
#[serde(default)]
pub struct HistoryConfig {
    pub max_depth: usize,
}
impl Default for HistoryConfig {
    fn default() -> Self {
        Self { max_depth: 50 }
    }
}

#[derive(serde::Deserialize, serde::Serialize, Clone, Debug)]
#[serde(default)]
pub struct ResizeConfig {
    pub throttle_ms: u64,
    pub min_size: f64,
    pub tolerance: f64,
    /// Changes larger than this (summed over both axes) apply without debounce.
    pub large_change: f64,
    pub debounce_ms: u64,
}
impl Default for ResizeConfig {
    fn default() -> Self {
        Self {
            throttle_ms: 200,
            min_size: 50.0,
            tolerance: 10.0,
            large_change: 100.0,
            debounce_ms: 50,
        }
    }
}

/// Role names carried in the `name` tag of template objects, and the lists derived from them.
#[derive(serde::Deserialize, serde::Serialize, Clone, Debug)]
#[serde(default)]
pub struct Roles {
    pub background: String,
    pub watermark: String,
    pub text_cta: String,
    pub shape_cta: String,
    pub logo: String,
    pub logo_backdrop: String,
    pub grouped_logo: String,
    pub edit_name: String,
    pub edit_whats: String,
    pub edit_address: String,
    pub profile_photo: String,
    pub background_photo: String,
    pub product_photo: String,
    /// Text roles left out of the published text lists.
    pub text_ignore: Vec<String>,
    /// Image roles left out of the published image lists.
    pub image_ignore: Vec<String>,
    /// Image roles the host may replace.
    pub dynamic_images: Vec<String>,
}
impl Default for Roles {
    fn default() -> Self {
        Self {
            background: "bgRect".into(),
            watermark: "watermark".into(),
            text_cta: "textcta".into(),
            shape_cta: "shapecta".into(),
            logo: "logo".into(),
            logo_backdrop: "shapelogo".into(),
            grouped_logo: "logoagrupado".into(),
            edit_name: "editname".into(),
            edit_whats: "editwhats".into(),
            edit_address: "editendereco".into(),
            profile_photo: "editfotoperfil".into(),
            background_photo: "editfotofundo".into(),
            product_photo: "editfotoproduto".into(),
            text_ignore: Vec::new(),
            image_ignore: vec!["logo".into()],
            dynamic_images: vec![
                "editfotoperfil".into(),
                "editfotofundo".into(),
                "editfotoproduto".into(),
            ],
        }
    }
}
impl Roles {
    #[must_use]
    pub fn is_dynamic_image(&self, name: Option<&str>) -> bool {
        name.is_some_and(|name| self.dynamic_images.iter().any(|d| d == name))
    }
    #[must_use]
    pub fn is_ignored_text(&self, name: Option<&str>) -> bool {
        name.is_some_and(|name| self.text_ignore.iter().any(|d| d == name))
    }
    #[must_use]
    pub fn is_ignored_image(&self, name: Option<&str>) -> bool {
        name.is_some_and(|name| self.image_ignore.iter().any(|d| d == name))
    }
}
