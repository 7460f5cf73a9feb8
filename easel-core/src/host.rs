//! # Host bridge
//!
//! Everything the engine learns is pushed out to the host as named facts, and notable moments are
//! announced as signals. Both are fire-and-forget.

/// A value the host can store under a fact key.
#[derive(Clone, PartialEq, Debug)]
pub enum FactValue {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
    /// Pre-serialized JSON.
    Json(String),
    List(Vec<String>),
}
impl From<bool> for FactValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}
impl From<f64> for FactValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}
impl From<&str> for FactValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}
impl From<String> for FactValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}
impl From<Vec<String>> for FactValue {
    fn from(value: Vec<String>) -> Self {
        Self::List(value)
    }
}
impl<T: Into<FactValue>> From<Option<T>> for FactValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}
impl std::fmt::Display for FactValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(value) => write!(f, "{value}"),
            Self::Number(value) => write!(f, "{value}"),
            Self::Text(value) | Self::Json(value) => f.write_str(value),
            Self::List(values) => write!(f, "[{}]", values.join(", ")),
        }
    }
}

pub trait HostBridge: Send {
    fn publish(&self, key: &str, value: FactValue);
    fn trigger(&self, signal: &str);
    /// Whether the user is typing into a host text field, in which case keyboard shortcuts
    /// belong to the host.
    fn is_typing(&self) -> bool {
        false
    }
}

/// Fact keys.
pub mod facts {
    pub const JSON_LAYERS: &str = "jsonLayers";
    pub const ALL_LAYERS_INFO: &str = "allLayersInfo";
    pub const TEXT_IDS: &str = "textIdsList";
    pub const TEXTS: &str = "textList";
    pub const TEXT_FONTS: &str = "textFontsList";
    pub const IMAGE_IDS: &str = "imageIdsList";
    pub const IMAGE_SRCS: &str = "imageSrcsList";
    pub const DYNAMIC_IMAGE_IDS: &str = "imageIdsListDynamics";
    pub const DYNAMIC_IMAGE_SRCS: &str = "imageSrcsListDynamics";
    pub const TEXT_CTA_TEXT: &str = "textCtaText";
    pub const TEXT_CTA_ID: &str = "textCtaId";
    pub const IMAGE_EXPORT: &str = "imageExport";
    pub const CAN_UNDO: &str = "canUndo";
    pub const CAN_REDO: &str = "canRedo";
    pub const STATUS: &str = "status";

    pub const SELECTION_COUNT: &str = "selectionCount";
    pub const SELECTION_TYPE: &str = "selectionType";
    pub const SELECTION_GROUP: &str = "selectionGroup";
    pub const SELECTED: &str = "selected";
    pub const TYPE: &str = "type";
    pub const FILL: &str = "fill";
    pub const IS_GRADIENT: &str = "isGradient";
    pub const BORDER_RADIUS: &str = "borderRadius";
    pub const OPACITY: &str = "opacity";
    pub const SELECTED_WIDTH: &str = "selectedWidth";
    pub const SELECTED_HEIGHT: &str = "selectedHeight";
    pub const POS_X: &str = "posX";
    pub const POS_Y: &str = "posY";
    pub const FONT_SIZE: &str = "fontSize";
    pub const FONT_WEIGHT: &str = "fontWeight";
    pub const FONT_STYLE: &str = "fontStyle";
    pub const FONT_UNDERLINE: &str = "fontUnderline";
    pub const FONT_FAMILY: &str = "fontFamily";
    pub const TEXT_CONTENT: &str = "textContent";
    pub const IMAGE_SRC: &str = "imageSrc";
    pub const IMAGE_MASK_CLIP_PATH: &str = "imageMaskClipPath";
    pub const IMAGE_MASK_SRC: &str = "imageMaskSrc";

    /// Everything the selection publisher sets, in the order it nulls them.
    pub const SELECTION: &[&str] = &[
        SELECTION_TYPE,
        SELECTION_GROUP,
        SELECTED,
        TYPE,
        FILL,
        IS_GRADIENT,
        BORDER_RADIUS,
        OPACITY,
        SELECTED_WIDTH,
        SELECTED_HEIGHT,
        POS_X,
        POS_Y,
        FONT_SIZE,
        FONT_WEIGHT,
        FONT_STYLE,
        FONT_UNDERLINE,
        FONT_FAMILY,
        TEXT_CONTENT,
        IMAGE_SRC,
        IMAGE_MASK_CLIP_PATH,
        IMAGE_MASK_SRC,
    ];

    pub const TEXT_CTA_ID_ROLE: &str = "textCTAID";
    pub const SHAPE_CTA_ID: &str = "shapeCTAID";
    pub const LOGO_ID: &str = "logoID";
    pub const SHAPE_LOGO_ID: &str = "shapeLogoID";
    pub const EDIT_NAME_ID: &str = "editNameID";
    pub const EDIT_WHATS_ID: &str = "editWhatsID";
    pub const EDIT_PROFILE_PHOTO_ID: &str = "editFotoPerfilID";
    pub const EDIT_ADDRESS_ID: &str = "editEnderecoID";
    pub const EDIT_BACKGROUND_PHOTO_ID: &str = "editFotoFundoID";
    pub const EDIT_PRODUCT_PHOTO_ID: &str = "editFotoProdutoID";
}

/// Signal names.
pub mod signals {
    pub const SELECTION_MODIFIED: &str = "selectionModified";
    pub const SELECTION_CLEARED: &str = "selectionCleared";
    pub const TRANSFORMED: &str = "transformed";
}

/// Status fact values.
pub mod status {
    pub const PROCESSING: &str = "processing";
    pub const FINISHED: &str = "finished";
}

#[derive(Default)]
struct Recorded {
    facts: hashbrown::HashMap<String, FactValue>,
    publishes: Vec<(String, FactValue)>,
    signals: Vec<String>,
    typing: bool,
}

/// A host that remembers everything it is told. Clones share the same record.
#[derive(Clone, Default)]
pub struct RecordingHost {
    inner: std::sync::Arc<parking_lot::Mutex<Recorded>>,
}
impl RecordingHost {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
    /// Latest value of a fact.
    #[must_use]
    pub fn fact(&self, key: &str) -> Option<FactValue> {
        self.inner.lock().facts.get(key).cloned()
    }
    /// All current facts, sorted by key.
    #[must_use]
    pub fn facts(&self) -> Vec<(String, FactValue)> {
        let mut facts: Vec<_> = self
            .inner
            .lock()
            .facts
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        facts.sort_by(|a, b| a.0.cmp(&b.0));
        facts
    }
    /// How many times `key` was published since the last [`Self::clear_log`].
    #[must_use]
    pub fn publish_count(&self, key: &str) -> usize {
        self.inner
            .lock()
            .publishes
            .iter()
            .filter(|(published, _)| published == key)
            .count()
    }
    #[must_use]
    pub fn signals(&self) -> Vec<String> {
        self.inner.lock().signals.clone()
    }
    /// Forget the publish and signal logs, keeping current fact values.
    pub fn clear_log(&self) {
        let mut inner = self.inner.lock();
        inner.publishes.clear();
        inner.signals.clear();
    }
    pub fn set_typing(&self, typing: bool) {
        self.inner.lock().typing = typing;
    }
}
impl HostBridge for RecordingHost {
    fn publish(&self, key: &str, value: FactValue) {
        log::trace!("fact {key} = {value}");
        let mut inner = self.inner.lock();
        inner.publishes.push((key.to_owned(), value.clone()));
        inner.facts.insert(key.to_owned(), value);
    }
    fn trigger(&self, signal: &str) {
        log::trace!("signal {signal}");
        self.inner.lock().signals.push(signal.to_owned());
    }
    fn is_typing(&self) -> bool {
        self.inner.lock().typing
    }
}

#[cfg(test)]
mod test {
    use super::{FactValue, HostBridge, RecordingHost};

    #[test]
    fn records_latest_and_counts() {
        let host = RecordingHost::new();
        let view = host.clone();
        host.publish("a", FactValue::Number(1.0));
        host.publish("a", FactValue::from(Some("x")));
        host.publish("b", FactValue::from(None::<bool>));
        host.trigger("done");
        assert_eq!(view.fact("a"), Some(FactValue::Text("x".into())));
        assert_eq!(view.fact("b"), Some(FactValue::Null));
        assert_eq!(view.publish_count("a"), 2);
        assert_eq!(view.signals(), ["done"]);
        view.clear_log();
        assert_eq!(view.publish_count("a"), 0);
        assert!(view.fact("a").is_some());
    }
}
