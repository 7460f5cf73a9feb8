//! # Snapshots
//!
//! Raster exports of the whole scene, published to the host as a JPEG data URL. Captures are
//! throttled, more aggressively while the user is moving things, and skipped altogether during
//! long continuous motion. A forced capture bypasses both.

use crate::clock::Timestamp;
use crate::config::SnapshotConfig;
use crate::host::{facts, FactValue, HostBridge};
use crate::interaction::InteractionTracker;
use crate::surface::{Surface, SurfaceError};
use base64::Engine as _;
use std::time::Duration;

const DATA_URL_PREFIX: &str = "data:image/jpeg;base64,";

#[derive(thiserror::Error, Debug)]
pub enum SnapshotError {
    #[error("rasterization failed: {0}")]
    Surface(#[from] SurfaceError),
    #[error("encoding failed: {0}")]
    Encode(#[from] image::ImageError),
}

/// Why a capture was not taken.
#[derive(Copy, Clone, PartialEq, Eq, Debug, strum::AsRefStr)]
pub enum Rejection {
    Throttled,
    ContinuousMotion,
    Busy,
}

#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
pub struct CaptureRequest {
    /// Ignore throttling and continuous-motion skipping.
    pub force: bool,
    /// Double resolution and higher JPEG quality.
    pub high_quality: bool,
}
impl CaptureRequest {
    /// Forced, high quality. What settles after motion or a structural change ask for.
    pub const FINAL: Self = Self {
        force: true,
        high_quality: true,
    };
}

#[derive(Clone, Debug)]
pub struct Snapshot {
    pub jpeg: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub data_url: String,
}

pub struct SnapshotGenerator {
    config: SnapshotConfig,
    busy: bool,
    last: Option<Timestamp>,
}
impl SnapshotGenerator {
    #[must_use]
    pub fn new(config: SnapshotConfig) -> Self {
        Self {
            config,
            busy: false,
            last: None,
        }
    }
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.busy
    }
    #[must_use]
    pub fn last_capture(&self) -> Option<Timestamp> {
        self.last
    }
    /// Whether a capture requested now would be taken.
    pub fn check(
        &self,
        request: CaptureRequest,
        tracker: &InteractionTracker,
        now: Timestamp,
    ) -> Result<(), Rejection> {
        if self.busy {
            return Err(Rejection::Busy);
        }
        if request.force {
            return Ok(());
        }
        let window = Duration::from_millis(if tracker.moving() {
            self.config.moving_throttle_ms
        } else {
            self.config.idle_throttle_ms
        });
        if self.last.is_some_and(|last| now.since(last) < window) {
            return Err(Rejection::Throttled);
        }
        if tracker.skip_snapshots() {
            return Err(Rejection::ContinuousMotion);
        }
        Ok(())
    }
    /// Capture and publish `imageExport`, unless rejected. Failures are logged and yield `None`.
    pub fn capture(
        &mut self,
        request: CaptureRequest,
        tracker: &InteractionTracker,
        now: Timestamp,
        surface: &mut dyn Surface,
        host: &dyn HostBridge,
    ) -> Option<Snapshot> {
        if let Err(rejection) = self.check(request, tracker, now) {
            log::trace!("snapshot rejected: {}", rejection.as_ref());
            return None;
        }
        self.busy = true;
        self.last = Some(now);
        let result = self.render(request, surface);
        self.busy = false;
        match result {
            Ok(snapshot) => {
                log::debug!(
                    "snapshot {}x{}, {} bytes",
                    snapshot.width,
                    snapshot.height,
                    snapshot.jpeg.len()
                );
                host.publish(
                    facts::IMAGE_EXPORT,
                    FactValue::Text(snapshot.data_url.clone()),
                );
                Some(snapshot)
            }
            Err(e) => {
                log::warn!("snapshot failed: {e}");
                None
            }
        }
    }
    fn render(
        &self,
        request: CaptureRequest,
        surface: &mut dyn Surface,
    ) -> Result<Snapshot, SnapshotError> {
        let base = if request.high_quality { 2.0 } else { 1.0 };
        let multiplier = base * surface.device_pixel_ratio();
        let raster = surface.rasterize(multiplier)?;
        let quality = if request.high_quality {
            self.config.high_quality
        } else {
            self.config.normal_quality
        };
        let jpeg = encode_jpeg(raster, quality)?;
        let data_url = format!(
            "{DATA_URL_PREFIX}{}",
            base64::engine::general_purpose::STANDARD.encode(&jpeg.0)
        );
        Ok(Snapshot {
            jpeg: jpeg.0,
            width: jpeg.1,
            height: jpeg.2,
            data_url,
        })
    }
}

/// JPEG has no alpha, so the raster is flattened to RGB first.
fn encode_jpeg(raster: image::RgbaImage, quality: u8) -> Result<(Vec<u8>, u32, u32), image::ImageError> {
    let (width, height) = raster.dimensions();
    let rgb = image::DynamicImage::ImageRgba8(raster).to_rgb8();
    let mut jpeg = Vec::new();
    let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut jpeg, quality);
    rgb.write_with_encoder(encoder)?;
    Ok((jpeg, width, height))
}

/// Decode the JPEG bytes out of a snapshot data URL.
pub fn decode_data_url(url: &str) -> Option<Vec<u8>> {
    let payload = url.strip_prefix(DATA_URL_PREFIX)?;
    base64::engine::general_purpose::STANDARD.decode(payload).ok()
}

#[cfg(test)]
mod test {
    use super::{decode_data_url, CaptureRequest, Rejection, SnapshotGenerator};
    use crate::clock::Timestamp;
    use crate::config::{InteractionConfig, SnapshotConfig};
    use crate::host::{facts, RecordingHost};
    use crate::interaction::{InteractionTracker, MotionKind};
    use crate::scene::{DrawableObject, Scene};
    use crate::surface::MemorySurface;

    const NORMAL: CaptureRequest = CaptureRequest {
        force: false,
        high_quality: false,
    };

    fn surface() -> MemorySurface {
        MemorySurface::new(40.0, 30.0)
            .with_device_pixel_ratio(1.5)
            .with_scene(Scene::new(vec![DrawableObject::rect(40.0, 30.0)
                .filled(crate::color::Color::rgb(10, 20, 200))]))
    }

    #[test]
    fn idle_throttle_and_force() {
        let mut snapshots = SnapshotGenerator::new(SnapshotConfig::default());
        let tracker = InteractionTracker::new(InteractionConfig::default());
        let host = RecordingHost::new();
        let mut surface = surface();

        let first = snapshots
            .capture(NORMAL, &tracker, Timestamp(0), &mut surface, &host)
            .unwrap();
        assert_eq!((first.width, first.height), (60, 45));
        assert_eq!(
            snapshots.check(NORMAL, &tracker, Timestamp(1_499)),
            Err(Rejection::Throttled)
        );
        assert!(snapshots
            .capture(NORMAL, &tracker, Timestamp(1_499), &mut surface, &host)
            .is_none());
        assert!(snapshots
            .check(CaptureRequest::FINAL, &tracker, Timestamp(1_499))
            .is_ok());
        assert!(snapshots.check(NORMAL, &tracker, Timestamp(1_500)).is_ok());
        assert_eq!(host.publish_count(facts::IMAGE_EXPORT), 1);

        let high = snapshots
            .capture(CaptureRequest::FINAL, &tracker, Timestamp(1_600), &mut surface, &host)
            .unwrap();
        assert_eq!((high.width, high.height), (120, 90));
        let decoded = image::load_from_memory(&decode_data_url(&high.data_url).unwrap()).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (120, 90));
    }
    #[test]
    fn moving_throttle_and_continuous_skip() {
        let snapshots_config = SnapshotConfig::default();
        let mut snapshots = SnapshotGenerator::new(snapshots_config);
        let mut tracker = InteractionTracker::new(InteractionConfig::default());
        let host = RecordingHost::new();
        let mut surface = surface();
        tracker.on_motion(MotionKind::PointerDrag, Timestamp(0));

        assert!(snapshots
            .capture(NORMAL, &tracker, Timestamp(0), &mut surface, &host)
            .is_some());
        assert_eq!(
            snapshots.check(NORMAL, &tracker, Timestamp(2_999)),
            Err(Rejection::Throttled)
        );
        assert!(snapshots.check(NORMAL, &tracker, Timestamp(3_000)).is_ok());
        for step in 0..5 {
            tracker.on_motion(MotionKind::PointerDrag, Timestamp(3_000 + step));
        }
        assert_eq!(
            snapshots.check(NORMAL, &tracker, Timestamp(3_000)),
            Err(Rejection::ContinuousMotion)
        );
        assert!(snapshots
            .check(CaptureRequest::FINAL, &tracker, Timestamp(3_000))
            .is_ok());
    }
    #[test]
    fn failed_raster_yields_none() {
        let mut snapshots = SnapshotGenerator::new(SnapshotConfig::default());
        let tracker = InteractionTracker::new(InteractionConfig::default());
        let host = RecordingHost::new();
        let mut surface = MemorySurface::new(0.0, 0.0);
        assert!(snapshots
            .capture(CaptureRequest::FINAL, &tracker, Timestamp(0), &mut surface, &host)
            .is_none());
        assert!(!snapshots.is_busy());
        assert_eq!(host.publish_count(facts::IMAGE_EXPORT), 0);
    }
}
