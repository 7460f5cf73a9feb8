//! Geometry and paint rewrites applied to individual template objects.

use super::loader::LoadedImage;
use crate::color::Color;
use crate::scene::{ColorRole, DrawableObject, GradientKind, ObjectKind, Paint, TextBody};

/// Side of the box a tiny logo is normalized into.
const LOGO_BOX: f64 = 300.0;
/// Logos authored below this scale are normalized instead of fitted.
const TINY_SCALE: f64 = 0.1;

/// Resolve an object's recolor directives. Returns whether anything changed.
///
/// Linear gradients keep their shape: stop 0 follows a primary directive, stop 1 follows the
/// second directive. Everything else takes one solid color, on the stroke for lines.
pub fn recolor(object: &mut DrawableObject, primary: Option<Color>, secondary: Option<Color>) -> bool {
    let first = object.tags.change_to_color;
    let second = object.tags.change_to_color2;
    if first.is_none() && second.is_none() {
        return false;
    }
    let pick = |role: ColorRole| match role {
        ColorRole::Primary => primary,
        ColorRole::Secondary => secondary,
    };
    if let Some(Paint::Gradient(gradient)) = &mut object.fill {
        if gradient.kind == GradientKind::Linear {
            let mut changed = false;
            if first == Some(ColorRole::Primary) {
                if let Some(color) = primary {
                    changed |= gradient.set_stop(0, color);
                }
            }
            if let Some(color) = second.and_then(pick) {
                changed |= gradient.set_stop(1, color);
            }
            return changed;
        }
    }
    let Some(color) = first.or(second).and_then(pick) else {
        return false;
    };
    if object.is_line() {
        object.stroke = Some(color);
    } else {
        object.fill = Some(Paint::Solid(color));
    }
    true
}

/// Put new text into a text field.
///
/// `i-text` fields keep the box they were authored with: the new text is scaled uniformly until
/// it fits inside the old box and centered in it. `textbox` fields wrap, so only the text changes.
pub fn refit_text(
    object: &mut DrawableObject,
    text: &str,
    measure: impl Fn(&TextBody) -> [f64; 2],
) -> bool {
    let [original_width, original_height] = object.scaled_size();
    let [original_left, original_top] = [object.placement.left, object.placement.top];
    let size = match &mut object.kind {
        ObjectKind::IText(body) => {
            body.text = text.to_owned();
            measure(body)
        }
        ObjectKind::Textbox(body) => {
            body.text = text.to_owned();
            return true;
        }
        _ => return false,
    };
    let [width, height] = size;
    object.width = width;
    object.height = height;
    if width <= 0.0 || height <= 0.0 {
        return true;
    }

    let scale = if width * object.placement.scale_x > original_width {
        let scale = original_width / width;
        if height * scale > original_height {
            original_height / height
        } else {
            scale
        }
    } else {
        let scale = original_height / height;
        if width * scale > original_width {
            original_width / width
        } else {
            scale
        }
    };
    let placement = &mut object.placement;
    placement.scale_x = scale;
    placement.scale_y = scale;
    placement.left = (original_width - width * scale) / 2.0 + original_left;
    placement.top = (original_height - height * scale) / 2.0 + original_top;
    true
}

/// Swap the picture of an image object, fitting the new one into the old box and centering it.
///
/// With `normalize_tiny`, a target authored at a tiny scale gets a fixed intrinsic box instead,
/// so that the host's later edits work with sane numbers.
pub fn fit_image(
    target: &mut DrawableObject,
    src: &str,
    image: &LoadedImage,
    normalize_tiny: bool,
) -> bool {
    if image.is_empty() {
        log::warn!("image {src} has no area, keeping the old one");
        return false;
    }
    let ObjectKind::Image { src: current, .. } = &mut target.kind else {
        return false;
    };
    *current = src.to_owned();

    let [original_width, original_height] = target.scaled_size();
    let natural = [f64::from(image.width), f64::from(image.height)];
    let placement = &mut target.placement;
    let ([width, height], [scale_x, scale_y]) =
        if normalize_tiny && (placement.scale_x < TINY_SCALE || placement.scale_y < TINY_SCALE) {
            (
                [LOGO_BOX, LOGO_BOX],
                [
                    natural[0] * placement.scale_x / LOGO_BOX,
                    natural[1] * placement.scale_y / LOGO_BOX,
                ],
            )
        } else {
            let scale = original_width.max(original_height) / natural[0].max(natural[1]);
            (natural, [scale, scale])
        };
    placement.left += (original_width - width * scale_x) / 2.0;
    placement.top += (original_height - height * scale_y) / 2.0;
    placement.scale_x = scale_x;
    placement.scale_y = scale_y;
    target.width = width;
    target.height = height;
    target.mark_dirty();
    true
}

/// Dissolve a group into its children, each keeping its on-screen transform.
///
/// Children lacking a role name or `clientSelectable` take the group's. The first child lacking
/// an id takes the group's id; later ones are left for the scene to assign.
#[must_use]
pub fn flatten_group(group: DrawableObject) -> Vec<DrawableObject> {
    let matrix = group.matrix();
    let DrawableObject { kind, tags, .. } = group;
    let ObjectKind::Group { objects } = kind else {
        log::warn!("tried to flatten a non-group");
        return Vec::new();
    };
    let mut id = tags.id;
    objects
        .into_iter()
        .map(|mut child| {
            let world = matrix.then(&child.matrix());
            child.placement.set_matrix(child.width, child.height, &world);
            if child.tags.name.is_none() {
                child.tags.name.clone_from(&tags.name);
            }
            if child.tags.id.is_none() {
                child.tags.id = id.take();
            }
            if child.tags.client_selectable.is_none() {
                child.tags.client_selectable = tags.client_selectable;
            }
            child
        })
        .collect()
}

/// Wrap objects in a new group sized to their combined bounds. Children are re-expressed
/// relative to the group centre, so nothing moves on screen.
#[must_use]
pub fn group_objects(mut members: Vec<DrawableObject>) -> DrawableObject {
    let mut bounds = [f64::INFINITY, f64::INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY];
    for member in &members {
        let [x0, y0, x1, y1] = member.bounds();
        bounds[0] = bounds[0].min(x0);
        bounds[1] = bounds[1].min(y0);
        bounds[2] = bounds[2].max(x1);
        bounds[3] = bounds[3].max(y1);
    }
    if members.is_empty() {
        bounds = [0.0; 4];
    }
    let size = [bounds[2] - bounds[0], bounds[3] - bounds[1]];
    let center = [bounds[0] + size[0] / 2.0, bounds[1] + size[1] / 2.0];
    for member in &mut members {
        let [cx, cy] = member.center();
        let (width, height) = (member.width, member.height);
        member
            .placement
            .set_center(width, height, [cx - center[0], cy - center[1]]);
    }
    DrawableObject::group(members, size[0], size[1]).at(bounds[0], bounds[1])
}

#[cfg(test)]
mod test {
    use super::{fit_image, flatten_group, group_objects, recolor, refit_text};
    use crate::color::Color;
    use crate::pipeline::LoadedImage;
    use crate::scene::{ColorRole, DrawableObject, Gradient, ObjectKind, Paint, TextBody};

    const PRIMARY: Color = Color::rgb(0xaa, 0, 0);
    const SECONDARY: Color = Color::rgb(0, 0, 0xbb);

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }
    /// Same heuristic as the memory surface: 0.6 em per glyph.
    fn measure(body: &TextBody) -> [f64; 2] {
        [
            body.text.chars().count() as f64 * body.font_size * 0.6,
            body.font_size * body.line_height,
        ]
    }

    #[test]
    fn recolor_solid_line_and_gradient() {
        let mut solid = DrawableObject::rect(1.0, 1.0).filled(Color::WHITE);
        solid.tags.change_to_color = Some(ColorRole::Primary);
        assert!(recolor(&mut solid, Some(PRIMARY), Some(SECONDARY)));
        assert_eq!(solid.fill, Some(Paint::Solid(PRIMARY)));

        let mut line = DrawableObject::new(
            ObjectKind::Line {
                x1: 0.0,
                y1: 0.0,
                x2: 10.0,
                y2: 0.0,
            },
            10.0,
            0.0,
        );
        line.tags.change_to_color2 = Some(ColorRole::Secondary);
        assert!(recolor(&mut line, Some(PRIMARY), Some(SECONDARY)));
        assert_eq!(line.stroke, Some(SECONDARY));
        assert_eq!(line.fill, None);

        let mut gradient = DrawableObject::rect(1.0, 1.0)
            .filled(Paint::Gradient(Gradient::linear(Color::WHITE, Color::BLACK)));
        gradient.tags.change_to_color = Some(ColorRole::Primary);
        assert!(recolor(&mut gradient, Some(PRIMARY), Some(SECONDARY)));
        let Some(Paint::Gradient(g)) = &gradient.fill else {
            panic!("gradient lost");
        };
        assert_eq!(g.color_stops[0].color, PRIMARY);
        assert_eq!(g.color_stops[1].color, Color::BLACK);

        let mut untagged = DrawableObject::rect(1.0, 1.0).filled(Color::WHITE);
        assert!(!recolor(&mut untagged, Some(PRIMARY), Some(SECONDARY)));
    }
    #[test]
    fn long_text_shrinks_into_box() {
        let mut field = DrawableObject::new(
            ObjectKind::IText(TextBody::new("Seu Nome Aqui", 40.0)),
            200.0,
            46.4,
        )
        .at(100.0, 300.0);
        assert!(refit_text(&mut field, "Maria Silva", measure));
        // 11 glyphs at 24px each.
        assert!(close(field.width, 264.0));
        let [width, height] = field.scaled_size();
        assert!(width <= 200.0 + 1e-9);
        assert!(close(width, 200.0));
        assert!(close(field.placement.scale_x, 200.0 / 264.0));
        assert!(close(field.placement.left, 100.0));
        assert!(close(field.placement.top, 300.0 + (46.4 - height) / 2.0));
    }
    #[test]
    fn short_text_fills_height_and_centres() {
        let mut field =
            DrawableObject::new(ObjectKind::IText(TextBody::new("x", 40.0)), 200.0, 46.4).at(0.0, 0.0);
        refit_text(&mut field, "Oi", measure);
        // Height-limited: scale 1, 48px wide, centred horizontally.
        assert!(close(field.placement.scale_x, 1.0));
        assert!(close(field.placement.left, (200.0 - 48.0) / 2.0));
        assert!(close(field.placement.top, 0.0));

        let mut textbox =
            DrawableObject::new(ObjectKind::Textbox(TextBody::new("x", 40.0)), 200.0, 46.4);
        refit_text(&mut textbox, "Maria Silva", measure);
        assert_eq!(textbox.text().unwrap().text, "Maria Silva");
        assert_eq!(textbox.width, 200.0);
    }
    #[test]
    fn image_fits_longest_side() {
        let mut target = DrawableObject::image("old.png", 100.0, 50.0).at(10.0, 10.0);
        assert!(fit_image(&mut target, "new.png", &LoadedImage::sized(400, 400), false));
        assert_eq!(target.image_src(), Some("new.png"));
        assert!(close(target.placement.scale_x, 0.25));
        let [width, height] = target.scaled_size();
        assert!(close(width, 100.0) && close(height, 100.0));
        // Centred on the old 100x50 box.
        assert!(close(target.placement.left, 10.0));
        assert!(close(target.placement.top, 10.0 - 25.0));
        assert!(!fit_image(&mut target, "none.png", &LoadedImage::sized(0, 10), false));
    }
    #[test]
    fn tiny_logo_is_normalized() {
        let mut logo = DrawableObject::image("old.png", 1000.0, 1000.0);
        logo.placement.scale_x = 0.05;
        logo.placement.scale_y = 0.05;
        fit_image(&mut logo, "new.png", &LoadedImage::sized(600, 300), true);
        assert_eq!((logo.width, logo.height), (300.0, 300.0));
        assert!(close(logo.placement.scale_x, 0.1));
        assert!(close(logo.placement.scale_y, 0.05));
    }
    #[test]
    fn flatten_then_group_keeps_positions() {
        let mut group = DrawableObject::group(
            vec![
                DrawableObject::rect(10.0, 10.0).at(-10.0, -5.0),
                DrawableObject::rect(10.0, 10.0).at(0.0, -5.0).with_id("own"),
                DrawableObject::rect(4.0, 4.0).at(-2.0, -2.0),
            ],
            20.0,
            10.0,
        )
        .named("cluster")
        .with_id("g")
        .at(100.0, 100.0);
        group.placement.scale_x = 2.0;
        group.placement.scale_y = 2.0;
        group.tags.client_selectable = Some(false);

        let children = flatten_group(group);
        assert_eq!(children.len(), 3);
        // Group centre is (120, 110); first child centre is (-5, 0) in group space.
        let [cx, cy] = children[0].center();
        assert!(close(cx, 110.0) && close(cy, 110.0), "{cx} {cy}");
        assert!(close(children[0].placement.scale_x, 2.0));
        assert!(children.iter().all(|c| c.has_name("cluster")));
        assert!(children.iter().all(|c| c.tags.client_selectable == Some(false)));
        let ids: Vec<_> = children.iter().map(|c| c.id().map(|id| id.to_string())).collect();
        assert_eq!(ids, [Some("g".to_owned()), Some("own".to_owned()), None]);

        let centres: Vec<_> = children.iter().map(DrawableObject::center).collect();
        let regrouped = group_objects(children);
        assert_eq!(regrouped.children().len(), 3);
        assert!(close(regrouped.width, 40.0) && close(regrouped.height, 20.0));
        let flattened = flatten_group(regrouped);
        for (child, centre) in flattened.iter().zip(centres) {
            let [x, y] = child.center();
            assert!(close(x, centre[0]) && close(y, centre[1]));
        }
    }
}
