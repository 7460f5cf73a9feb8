use super::{Surface, SurfaceError, SurfaceSettings, Viewport};
use crate::color::Color;
use crate::scene::{DrawableObject, Matrix, ObjectKind, Scene, TextBody};

/// Largest raster side we agree to allocate.
const MAX_RASTER_SIDE: u32 = 16_384;
/// Average glyph advance, as a fraction of the font size.
const GLYPH_ADVANCE: f64 = 0.6;
/// Stand-in for image content.
const IMAGE_PLACEHOLDER: Color = Color::rgb(200, 200, 200);

/// A surface that keeps the scene in memory and draws every object as its filled bounding box.
///
/// Text is measured with a fixed per-glyph advance. This is enough to drive layout decisions and
/// produce a recognizable export without a font stack.
pub struct MemorySurface {
    scene: Scene,
    settings: SurfaceSettings,
    viewport: Viewport,
    size: [f64; 2],
    device_pixel_ratio: f64,
    render_pending: bool,
    renders: u64,
}
impl MemorySurface {
    #[must_use]
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            scene: Scene::default(),
            settings: SurfaceSettings::interactive(),
            viewport: Viewport::default(),
            size: [width, height],
            device_pixel_ratio: 1.0,
            render_pending: false,
            renders: 0,
        }
    }
    #[must_use]
    pub fn with_device_pixel_ratio(mut self, ratio: f64) -> Self {
        self.device_pixel_ratio = ratio;
        self
    }
    #[must_use]
    pub fn with_scene(mut self, scene: Scene) -> Self {
        self.scene = scene;
        self
    }
    /// Number of completed renders.
    #[must_use]
    pub fn renders(&self) -> u64 {
        self.renders
    }

    fn paint_object(
        raster: &mut image::RgbaImage,
        parent: &Matrix,
        object: &DrawableObject,
        opacity: f64,
    ) {
        let matrix = parent.then(&object.matrix());
        let opacity = opacity * object.opacity.clamp(0.0, 1.0);
        let color = match &object.kind {
            ObjectKind::Group { objects } => {
                for child in objects {
                    Self::paint_object(raster, &matrix, child, opacity);
                }
                return;
            }
            ObjectKind::Image { .. } => Some(IMAGE_PLACEHOLDER),
            ObjectKind::Line { .. } => object.stroke,
            _ => object.fill.as_ref().and_then(|fill| fill.representative()),
        };
        let Some(color) = color else {
            return;
        };
        let [hw, hh] = [object.width / 2.0, object.height / 2.0];
        let mut bounds = [f64::INFINITY, f64::INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY];
        for corner in [[-hw, -hh], [hw, -hh], [hw, hh], [-hw, hh]] {
            let [x, y] = matrix.apply(corner);
            bounds[0] = bounds[0].min(x);
            bounds[1] = bounds[1].min(y);
            bounds[2] = bounds[2].max(x);
            bounds[3] = bounds[3].max(y);
        }
        let clamp_x = |v: f64| v.round().clamp(0.0, f64::from(raster.width())) as u32;
        let clamp_y = |v: f64| v.round().clamp(0.0, f64::from(raster.height())) as u32;
        let (x0, x1) = (clamp_x(bounds[0]), clamp_x(bounds[2]));
        let (y0, y1) = (clamp_y(bounds[1]), clamp_y(bounds[3]));
        let alpha = f64::from(color.a) / 255.0 * opacity;
        for y in y0..y1 {
            for x in x0..x1 {
                let pixel = raster.get_pixel_mut(x, y);
                for (dst, src) in pixel.0.iter_mut().zip([color.r, color.g, color.b]) {
                    let blended = f64::from(src) * alpha + f64::from(*dst) * (1.0 - alpha);
                    *dst = blended.round().clamp(0.0, 255.0) as u8;
                }
            }
        }
    }
}

impl Surface for MemorySurface {
    fn scene(&self) -> &Scene {
        &self.scene
    }
    fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }
    fn replace_scene(&mut self, scene: Scene) {
        self.scene = scene;
        if self.settings.render_on_add_remove {
            self.render_pending = true;
        }
    }
    fn settings(&self) -> SurfaceSettings {
        self.settings
    }
    fn set_settings(&mut self, settings: SurfaceSettings) {
        self.settings = settings;
    }
    fn viewport(&self) -> Viewport {
        self.viewport
    }
    fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }
    fn size(&self) -> [f64; 2] {
        self.size
    }
    fn set_size(&mut self, size: [f64; 2]) {
        self.size = size;
    }
    fn device_pixel_ratio(&self) -> f64 {
        self.device_pixel_ratio
    }
    fn render_all(&mut self) {
        self.renders += 1;
        self.render_pending = false;
        self.scene.visit_mut(&mut |object| object.dirty = false);
    }
    fn request_render(&mut self) {
        self.render_pending = true;
    }
    fn render_pending(&self) -> bool {
        self.render_pending
    }
    fn measure_text(&self, body: &TextBody) -> [f64; 2] {
        let lines = body.text.split('\n');
        let (count, widest) = lines.fold((0usize, 0usize), |(count, widest), line| {
            (count + 1, widest.max(line.chars().count()))
        });
        [
            widest as f64 * body.font_size * GLYPH_ADVANCE,
            count as f64 * body.font_size * body.line_height,
        ]
    }
    fn rasterize(&mut self, multiplier: f64) -> Result<image::RgbaImage, SurfaceError> {
        let width = (self.size[0] * multiplier).round();
        let height = (self.size[1] * multiplier).round();
        if width < 1.0 || height < 1.0 {
            return Err(SurfaceError::Empty);
        }
        let (width, height) = (width as u32, height as u32);
        if width > MAX_RASTER_SIDE || height > MAX_RASTER_SIDE {
            return Err(SurfaceError::TooLarge(width, height));
        }
        self.render_all();
        let mut raster = image::RgbaImage::from_pixel(width, height, Color::WHITE.into());
        let scale = Matrix::from_parts([0.0; 2], 0.0, [multiplier, multiplier]);
        for object in &self.scene.objects {
            Self::paint_object(&mut raster, &scale, object, 1.0);
        }
        Ok(raster)
    }
}
