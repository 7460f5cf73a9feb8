use super::paint::Paint;
use super::transform::{Matrix, Placement};
use super::ObjectId;
use crate::color::Color;

/// Which of the two template colors an object follows.
#[derive(Copy, Clone, PartialEq, Eq, Debug, serde::Serialize, strum::AsRefStr)]
pub enum ColorRole {
    #[serde(rename = "Primária")]
    #[strum(serialize = "Primária")]
    Primary,
    #[serde(rename = "Secundária")]
    #[strum(serialize = "Secundária")]
    Secondary,
}
impl ColorRole {
    fn parse(value: &str) -> Option<Self> {
        match value {
            "Primária" | "primary" => Some(Self::Primary),
            "Secundária" | "secondary" => Some(Self::Secondary),
            _ => None,
        }
    }
}
/// Unknown directive strings are treated as no directive at all.
fn lenient_role<'de, D>(deserializer: D) -> Result<Option<ColorRole>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value: Option<String> = serde::Deserialize::deserialize(deserializer)?;
    Ok(value.as_deref().and_then(ColorRole::parse))
}

/// Semantic tags a template author attaches to objects. Serialized with every object, `null`
/// when unset.
#[derive(Clone, PartialEq, Debug, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tags {
    #[serde(default)]
    pub id: Option<ObjectId>,
    /// Role name.
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub layer_name: Option<String>,
    #[serde(default)]
    pub client_selectable: Option<bool>,
    #[serde(default, deserialize_with = "lenient_role")]
    pub change_to_color: Option<ColorRole>,
    #[serde(default, deserialize_with = "lenient_role")]
    pub change_to_color2: Option<ColorRole>,
    #[serde(default)]
    pub is_gradient: Option<bool>,
    #[serde(default)]
    pub gradient_angle_linear: Option<f64>,
    #[serde(default)]
    pub selected_width: Option<f64>,
    #[serde(default)]
    pub selected_height: Option<f64>,
    #[serde(default, alias = "excludeFromExport")]
    pub exclude_from_history: bool,
}

fn yes() -> bool {
    true
}
fn one() -> f64 {
    1.0
}

/// How the user may interact with an object on the surface.
#[derive(Clone, PartialEq, Eq, Debug, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Interactivity {
    #[serde(default = "yes")]
    pub selectable: bool,
    #[serde(default = "yes")]
    pub evented: bool,
    #[serde(default = "yes")]
    pub has_controls: bool,
    #[serde(default = "yes")]
    pub has_borders: bool,
    #[serde(default)]
    pub lock_movement_x: bool,
    #[serde(default)]
    pub lock_movement_y: bool,
    #[serde(default)]
    pub lock_scaling_x: bool,
    #[serde(default)]
    pub lock_scaling_y: bool,
    #[serde(default)]
    pub lock_rotation: bool,
    #[serde(default)]
    pub hover_cursor: Option<String>,
}
impl Default for Interactivity {
    fn default() -> Self {
        Self {
            selectable: true,
            evented: true,
            has_controls: true,
            has_borders: true,
            lock_movement_x: false,
            lock_movement_y: false,
            lock_scaling_x: false,
            lock_scaling_y: false,
            lock_rotation: false,
            hover_cursor: None,
        }
    }
}
impl Interactivity {
    pub fn lock(&mut self) {
        *self = Self {
            selectable: false,
            evented: false,
            has_controls: false,
            has_borders: false,
            lock_movement_x: true,
            lock_movement_y: true,
            lock_scaling_x: true,
            lock_scaling_y: true,
            lock_rotation: true,
            hover_cursor: Some("default".to_owned()),
        };
    }
    pub fn unlock(&mut self) {
        let hover_cursor = self.hover_cursor.take();
        *self = Self {
            hover_cursor,
            ..Self::default()
        };
    }
    #[must_use]
    pub fn is_movable(&self) -> bool {
        self.selectable && !(self.lock_movement_x && self.lock_movement_y)
    }
}

/// Numeric or named CSS font weight.
#[derive(Clone, PartialEq, Debug, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum FontWeight {
    Numeric(u16),
    Named(String),
}
impl Default for FontWeight {
    fn default() -> Self {
        Self::Named("normal".to_owned())
    }
}
impl std::fmt::Display for FontWeight {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Numeric(weight) => write!(f, "{weight}"),
            Self::Named(name) => f.write_str(name),
        }
    }
}

fn default_font_family() -> String {
    "Arial".to_owned()
}
fn default_font_size() -> f64 {
    40.0
}
fn default_font_style() -> String {
    "normal".to_owned()
}
fn default_line_height() -> f64 {
    1.16
}

#[derive(Clone, PartialEq, Debug, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextBody {
    #[serde(default)]
    pub text: String,
    #[serde(default = "default_font_family")]
    pub font_family: String,
    #[serde(default = "default_font_size")]
    pub font_size: f64,
    #[serde(default)]
    pub font_weight: FontWeight,
    #[serde(default = "default_font_style")]
    pub font_style: String,
    #[serde(default)]
    pub underline: bool,
    #[serde(default = "default_line_height")]
    pub line_height: f64,
}
impl TextBody {
    #[must_use]
    pub fn new(text: impl Into<String>, font_size: f64) -> Self {
        Self {
            text: text.into(),
            font_family: default_font_family(),
            font_size,
            font_weight: FontWeight::default(),
            font_style: default_font_style(),
            underline: false,
            line_height: default_line_height(),
        }
    }
    #[must_use]
    pub fn is_italic(&self) -> bool {
        self.font_style == "italic"
    }
}

/// The variant-specific part of an object, tagged by `type` in the persisted form.
#[derive(Clone, PartialEq, Debug, serde::Serialize, serde::Deserialize, strum::IntoStaticStr)]
#[serde(tag = "type")]
pub enum ObjectKind {
    #[serde(rename = "rect")]
    #[strum(serialize = "rect")]
    Rect {
        #[serde(default)]
        rx: f64,
        #[serde(default)]
        ry: f64,
    },
    #[serde(rename = "circle")]
    #[strum(serialize = "circle")]
    Circle {
        #[serde(default)]
        radius: f64,
    },
    #[serde(rename = "triangle")]
    #[strum(serialize = "triangle")]
    Triangle {},
    #[serde(rename = "line")]
    #[strum(serialize = "line")]
    Line {
        #[serde(default)]
        x1: f64,
        #[serde(default)]
        y1: f64,
        #[serde(default)]
        x2: f64,
        #[serde(default)]
        y2: f64,
    },
    #[serde(rename = "image")]
    #[strum(serialize = "image")]
    Image {
        #[serde(default)]
        src: String,
        #[serde(default, rename = "clipPath")]
        clip_path: Option<Box<DrawableObject>>,
    },
    /// Single-line text that keeps its box when its content changes.
    #[serde(rename = "i-text")]
    #[strum(serialize = "i-text")]
    IText(TextBody),
    /// Wrapping text with a fixed width.
    #[serde(rename = "textbox")]
    #[strum(serialize = "textbox")]
    Textbox(TextBody),
    #[serde(rename = "group")]
    #[strum(serialize = "group")]
    Group {
        #[serde(default)]
        objects: Vec<DrawableObject>,
    },
}

/// One object in a scene.
#[derive(Clone, PartialEq, Debug, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawableObject {
    #[serde(flatten)]
    pub kind: ObjectKind,
    #[serde(flatten)]
    pub tags: Tags,
    #[serde(flatten)]
    pub placement: Placement,
    #[serde(default)]
    pub width: f64,
    #[serde(default)]
    pub height: f64,
    #[serde(default)]
    pub fill: Option<Paint>,
    #[serde(default)]
    pub stroke: Option<Color>,
    #[serde(default = "one")]
    pub stroke_width: f64,
    #[serde(default = "one")]
    pub opacity: f64,
    #[serde(flatten)]
    pub interaction: Interactivity,
    /// Set when the object's cached appearance must be redrawn.
    #[serde(skip)]
    pub dirty: bool,
}

impl DrawableObject {
    #[must_use]
    pub fn new(kind: ObjectKind, width: f64, height: f64) -> Self {
        Self {
            kind,
            tags: Tags::default(),
            placement: Placement::default(),
            width,
            height,
            fill: None,
            stroke: None,
            stroke_width: 1.0,
            opacity: 1.0,
            interaction: Interactivity::default(),
            dirty: false,
        }
    }
    #[must_use]
    pub fn rect(width: f64, height: f64) -> Self {
        Self::new(ObjectKind::Rect { rx: 0.0, ry: 0.0 }, width, height)
    }
    #[must_use]
    pub fn image(src: impl Into<String>, width: f64, height: f64) -> Self {
        Self::new(
            ObjectKind::Image {
                src: src.into(),
                clip_path: None,
            },
            width,
            height,
        )
    }
    #[must_use]
    pub fn group(objects: Vec<DrawableObject>, width: f64, height: f64) -> Self {
        Self::new(ObjectKind::Group { objects }, width, height)
    }
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.tags.name = Some(name.into());
        self
    }
    #[must_use]
    pub fn with_id(mut self, id: impl Into<ObjectId>) -> Self {
        self.tags.id = Some(id.into());
        self
    }
    #[must_use]
    pub fn at(mut self, left: f64, top: f64) -> Self {
        self.placement.left = left;
        self.placement.top = top;
        self
    }
    #[must_use]
    pub fn filled(mut self, paint: impl Into<Paint>) -> Self {
        self.fill = Some(paint.into());
        self
    }

    /// The persisted `type` string.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        (&self.kind).into()
    }
    #[must_use]
    pub fn id(&self) -> Option<&ObjectId> {
        self.tags.id.as_ref()
    }
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.tags.name.as_deref()
    }
    #[must_use]
    pub fn has_name(&self, name: &str) -> bool {
        self.name() == Some(name)
    }
    #[must_use]
    pub fn text(&self) -> Option<&TextBody> {
        match &self.kind {
            ObjectKind::IText(body) | ObjectKind::Textbox(body) => Some(body),
            _ => None,
        }
    }
    #[must_use]
    pub fn text_mut(&mut self) -> Option<&mut TextBody> {
        match &mut self.kind {
            ObjectKind::IText(body) | ObjectKind::Textbox(body) => Some(body),
            _ => None,
        }
    }
    #[must_use]
    pub fn image_src(&self) -> Option<&str> {
        match &self.kind {
            ObjectKind::Image { src, .. } => Some(src),
            _ => None,
        }
    }
    #[must_use]
    pub fn clip_path(&self) -> Option<&DrawableObject> {
        match &self.kind {
            ObjectKind::Image { clip_path, .. } => clip_path.as_deref(),
            _ => None,
        }
    }
    #[must_use]
    pub fn is_text(&self) -> bool {
        self.text().is_some()
    }
    #[must_use]
    pub fn is_image(&self) -> bool {
        matches!(self.kind, ObjectKind::Image { .. })
    }
    #[must_use]
    pub fn is_line(&self) -> bool {
        matches!(self.kind, ObjectKind::Line { .. })
    }
    #[must_use]
    pub fn is_group(&self) -> bool {
        matches!(self.kind, ObjectKind::Group { .. })
    }
    #[must_use]
    pub fn children(&self) -> &[DrawableObject] {
        match &self.kind {
            ObjectKind::Group { objects } => objects,
            _ => &[],
        }
    }
    #[must_use]
    pub fn children_mut(&mut self) -> Option<&mut Vec<DrawableObject>> {
        match &mut self.kind {
            ObjectKind::Group { objects } => Some(objects),
            _ => None,
        }
    }

    /// Intrinsic size times scale.
    #[must_use]
    pub fn scaled_size(&self) -> [f64; 2] {
        [
            self.width * self.placement.scale_x,
            self.height * self.placement.scale_y,
        ]
    }
    #[must_use]
    pub fn center(&self) -> [f64; 2] {
        self.placement.center(self.width, self.height)
    }
    /// Matrix from box-centred local space into the parent's space.
    #[must_use]
    pub fn matrix(&self) -> Matrix {
        self.placement.matrix(self.width, self.height)
    }
    /// Axis-aligned `[min_x, min_y, max_x, max_y]` of the rotated box in the parent's space.
    #[must_use]
    pub fn bounds(&self) -> [f64; 4] {
        let matrix = self.matrix();
        let [hw, hh] = [self.width / 2.0, self.height / 2.0];
        let mut bounds = [f64::INFINITY, f64::INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY];
        for corner in [[-hw, -hh], [hw, -hh], [hw, hh], [-hw, hh]] {
            let [x, y] = matrix.apply(corner);
            bounds[0] = bounds[0].min(x);
            bounds[1] = bounds[1].min(y);
            bounds[2] = bounds[2].max(x);
            bounds[3] = bounds[3].max(y);
        }
        bounds
    }

    /// Depth-first, self before children.
    pub fn visit<'a>(&'a self, f: &mut impl FnMut(&'a DrawableObject)) {
        f(self);
        for child in self.children() {
            child.visit(f);
        }
    }
    pub fn visit_mut(&mut self, f: &mut impl FnMut(&mut DrawableObject)) {
        f(self);
        if let Some(children) = self.children_mut() {
            for child in children {
                child.visit_mut(f);
            }
        }
    }
    /// Depth-first search of self and descendants.
    #[must_use]
    pub fn find(&self, predicate: &impl Fn(&DrawableObject) -> bool) -> Option<&DrawableObject> {
        if predicate(self) {
            return Some(self);
        }
        self.children().iter().find_map(|child| child.find(predicate))
    }
    pub fn find_mut(
        &mut self,
        predicate: &impl Fn(&DrawableObject) -> bool,
    ) -> Option<&mut DrawableObject> {
        if predicate(self) {
            return Some(self);
        }
        self.children_mut()?
            .iter_mut()
            .find_map(|child| child.find_mut(predicate))
    }
    /// Mark self and any clip path for redraw.
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
        if let ObjectKind::Image {
            clip_path: Some(clip),
            ..
        } = &mut self.kind
        {
            clip.dirty = true;
        }
    }
}
