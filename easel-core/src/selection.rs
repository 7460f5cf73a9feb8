//! # Selection publishing
//!
//! Mirrors the active selection into host facts so the host can show property editors for it.

use crate::host::{facts, signals, FactValue, HostBridge};
use crate::scene::{DrawableObject, ObjectKind, Paint};

/// Kind name shown by the host's property editor.
#[must_use]
pub fn kind_label(object: &DrawableObject) -> &'static str {
    match object.kind {
        ObjectKind::Rect { .. } => "rectangle",
        ObjectKind::Circle { .. } => "circle",
        ObjectKind::Triangle {} => "triangle",
        ObjectKind::Line { .. } => "line",
        ObjectKind::Image { .. } => "image",
        ObjectKind::IText(_) | ObjectKind::Textbox(_) => "text",
        ObjectKind::Group { .. } => "group",
    }
}

fn finite_or(value: f64, fallback: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        fallback
    }
}

fn json(value: &impl serde::Serialize) -> FactValue {
    match serde_json::to_string(value) {
        Ok(json) => FactValue::Json(json),
        Err(e) => {
            log::warn!("failed to serialize selection fact: {e}");
            FactValue::Null
        }
    }
}

/// Publish facts for a new or changed selection. The first object is the one described.
pub fn publish_selected(host: &dyn HostBridge, selected: &[&DrawableObject]) {
    let Some(object) = selected.first() else {
        publish_cleared(host);
        return;
    };
    host.publish(facts::SELECTION_COUNT, FactValue::Number(selected.len() as f64));
    host.publish(facts::SELECTION_TYPE, object.type_name().into());
    host.publish(facts::SELECTION_GROUP, object.is_group().into());

    host.publish(facts::SELECTED, json(object));
    host.publish(facts::TYPE, kind_label(object).into());
    match &object.fill {
        Some(Paint::Solid(color)) if color.is_opaque() => {
            host.publish(facts::FILL, color.to_hex().into());
            host.publish(facts::IS_GRADIENT, false.into());
        }
        Some(Paint::Gradient(gradient)) => {
            host.publish(facts::FILL, json(gradient));
            host.publish(facts::IS_GRADIENT, true.into());
        }
        _ => {
            host.publish(facts::FILL, "#000000".into());
            host.publish(facts::IS_GRADIENT, false.into());
        }
    }

    let radius = match object.kind {
        ObjectKind::Rect { rx, .. } => rx,
        _ => 0.0,
    };
    let declared_width = object.tags.selected_width.unwrap_or(object.width);
    let declared_height = object.tags.selected_height.unwrap_or(object.height);
    let numbers = [
        (facts::BORDER_RADIUS, finite_or(radius, 0.0)),
        (facts::OPACITY, finite_or(object.opacity, 1.0)),
        (
            facts::SELECTED_WIDTH,
            finite_or(declared_width * object.placement.scale_x, 0.0),
        ),
        (
            facts::SELECTED_HEIGHT,
            finite_or(declared_height * object.placement.scale_y, 0.0),
        ),
        (facts::POS_X, finite_or(object.placement.left, 0.0)),
        (facts::POS_Y, finite_or(object.placement.top, 0.0)),
    ];
    for (key, value) in numbers {
        host.publish(key, FactValue::Number(value));
    }

    let text = object.text();
    let font_size = text.map_or(12.0, |body| finite_or(body.font_size, 12.0));
    host.publish(facts::FONT_SIZE, font_size.to_string().into());
    host.publish(
        facts::FONT_WEIGHT,
        text.map_or_else(|| "normal".to_owned(), |body| body.font_weight.to_string())
            .into(),
    );
    host.publish(
        facts::FONT_STYLE,
        text.is_some_and(|body| body.is_italic()).into(),
    );
    host.publish(
        facts::FONT_UNDERLINE,
        text.is_some_and(|body| body.underline).into(),
    );
    let family = text
        .map(|body| body.font_family.as_str())
        .filter(|family| !family.is_empty())
        .unwrap_or("Arial");
    host.publish(facts::FONT_FAMILY, family.into());
    host.publish(
        facts::TEXT_CONTENT,
        text.map_or("", |body| body.text.as_str()).into(),
    );

    host.publish(facts::IMAGE_SRC, object.image_src().unwrap_or("").into());
    let clip = object.clip_path();
    host.publish(
        facts::IMAGE_MASK_CLIP_PATH,
        clip.map_or_else(|| FactValue::Json("null".to_owned()), json),
    );
    host.publish(
        facts::IMAGE_MASK_SRC,
        clip.and_then(DrawableObject::image_src).unwrap_or("").into(),
    );

    host.trigger(signals::SELECTION_MODIFIED);
}

/// Null every selection fact.
pub fn publish_cleared(host: &dyn HostBridge) {
    for key in facts::SELECTION {
        host.publish(key, FactValue::Null);
    }
    host.publish(facts::SELECTION_COUNT, FactValue::Number(0.0));
    host.trigger(signals::SELECTION_CLEARED);
}

#[cfg(test)]
mod test {
    use super::{publish_cleared, publish_selected};
    use crate::color::Color;
    use crate::host::{facts, signals, FactValue, RecordingHost};
    use crate::scene::{DrawableObject, Gradient, ObjectKind, TextBody};

    #[test]
    fn text_selection_facts() {
        let host = RecordingHost::new();
        let mut text = DrawableObject::new(ObjectKind::IText(TextBody::new("Oi", 32.0)), 50.0, 37.0)
            .at(5.0, 6.0)
            .filled(Color::rgb(0x11, 0x22, 0x33));
        text.tags.selected_width = Some(40.0);
        text.placement.scale_x = 2.0;
        publish_selected(&host, &[&text]);

        assert_eq!(host.fact(facts::SELECTION_COUNT), Some(FactValue::Number(1.0)));
        assert_eq!(host.fact(facts::SELECTION_TYPE), Some("i-text".into()));
        assert_eq!(host.fact(facts::TYPE), Some("text".into()));
        assert_eq!(host.fact(facts::FILL), Some("#112233".into()));
        assert_eq!(host.fact(facts::SELECTED_WIDTH), Some(FactValue::Number(80.0)));
        assert_eq!(host.fact(facts::SELECTED_HEIGHT), Some(FactValue::Number(37.0)));
        assert_eq!(host.fact(facts::FONT_SIZE), Some("32".into()));
        assert_eq!(host.fact(facts::FONT_WEIGHT), Some("normal".into()));
        assert_eq!(host.fact(facts::TEXT_CONTENT), Some("Oi".into()));
        assert_eq!(host.fact(facts::IMAGE_SRC), Some("".into()));
        assert_eq!(host.signals(), [signals::SELECTION_MODIFIED]);
    }
    #[test]
    fn gradient_and_fallback_fill() {
        let host = RecordingHost::new();
        let gradient = DrawableObject::rect(1.0, 1.0)
            .filled(crate::scene::Paint::Gradient(Gradient::linear(Color::WHITE, Color::BLACK)));
        publish_selected(&host, &[&gradient]);
        assert_eq!(host.fact(facts::IS_GRADIENT), Some(FactValue::Bool(true)));
        assert!(matches!(host.fact(facts::FILL), Some(FactValue::Json(_))));

        let image = DrawableObject::image("a.png", 1.0, 1.0);
        publish_selected(&host, &[&image, &gradient]);
        assert_eq!(host.fact(facts::SELECTION_COUNT), Some(FactValue::Number(2.0)));
        assert_eq!(host.fact(facts::FILL), Some("#000000".into()));
        assert_eq!(host.fact(facts::IMAGE_SRC), Some("a.png".into()));
        assert_eq!(host.fact(facts::FONT_SIZE), Some("12".into()));
        assert_eq!(
            host.fact(facts::IMAGE_MASK_CLIP_PATH),
            Some(FactValue::Json("null".into()))
        );
    }
    #[test]
    fn cleared_nulls_everything() {
        let host = RecordingHost::new();
        publish_selected(&host, &[&DrawableObject::rect(1.0, 1.0)]);
        publish_cleared(&host);
        assert_eq!(host.fact(facts::SELECTION_COUNT), Some(FactValue::Number(0.0)));
        for key in facts::SELECTION {
            assert_eq!(host.fact(key), Some(FactValue::Null), "{key}");
        }
        assert_eq!(host.signals().last().map(String::as_str), Some(signals::SELECTION_CLEARED));
    }
}
