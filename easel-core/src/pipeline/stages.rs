//! The template stages, in the order they run.

use super::fit::{fit_image, flatten_group, group_objects, recolor, refit_text};
use super::{PipelineContext, PipelineError};
use crate::color::Color;
use crate::config::Roles;
use crate::engine::Engine;
use crate::host::{facts, signals, status, FactValue};
use crate::scene::{DrawableObject, ObjectKind, Scene, SceneError, TextBody};
use crate::surface::SurfaceSettings;

const WATERMARK_OPACITY: f64 = 0.6;
const WATERMARK_LAYER: &str = "Marca D'água";

type StageResult<'a> = Result<PipelineContext<'a>, PipelineError>;

pub(super) async fn run(
    context: PipelineContext<'_>,
    engine: &mut Engine,
    json: &str,
) -> Result<(), PipelineError> {
    let roles = engine.config().roles.clone();
    let context = flatten(context, engine, &roles, json)?;
    let context = rescale(context, engine, &roles);
    let context = apply_locks(context, engine, &roles);
    let context = apply_colors(context, engine);
    let context = replace_logo(context, engine, &roles).await;
    let context = fill_backdrop(context, engine, &roles);
    let context = group_logo(context, engine, &roles);
    let context = add_watermark(context, engine, &roles).await;
    let context = replace_texts(context, engine, &roles);
    let context = replace_profile_photo(context, engine, &roles).await;
    let context = final_render(context, engine);
    finish(context, engine);
    Ok(())
}

/// 1. Parse the template and dissolve every top-level group but the grouped logo.
fn flatten<'a>(
    context: PipelineContext<'a>,
    engine: &mut Engine,
    roles: &Roles,
    json: &str,
) -> StageResult<'a> {
    // Parsed without id assignment, children inherit the group's id first.
    let raw: Scene = serde_json::from_str(json).map_err(SceneError::from)?;
    let mut objects = Vec::with_capacity(raw.objects.len());
    for object in raw.objects {
        if object.is_group() && !object.has_name(&roles.grouped_logo) {
            objects.extend(flatten_group(object));
        } else {
            objects.push(object);
        }
    }
    log::debug!("template has {} top-level objects", objects.len());
    engine.surface_mut().replace_scene(Scene::new(objects));
    Ok(context)
}

/// 2. Stretch the template so its background covers the canvas.
fn rescale<'a>(context: PipelineContext<'a>, engine: &mut Engine, roles: &Roles) -> PipelineContext<'a> {
    let scene = engine.surface_mut().scene_mut();
    let reference = scene
        .objects
        .first()
        .filter(|object| matches!(object.kind, ObjectKind::Rect { .. }))
        .map(DrawableObject::scaled_size);
    let Some([width, height]) = reference.filter(|[w, h]| *w > 0.0 && *h > 0.0) else {
        log::warn!("template has no {} rectangle to measure, not rescaling", roles.background);
        return context;
    };
    let factor = [context.canvas[0] / width, context.canvas[1] / height];
    for object in &mut scene.objects {
        let placement = &mut object.placement;
        placement.left *= factor[0];
        placement.top *= factor[1];
        placement.scale_x *= factor[0];
        placement.scale_y *= factor[1];
        object.mark_dirty();
    }
    context
}

/// 3. Interactivity from tags and roles, then the role ids for the host.
fn apply_locks<'a>(
    context: PipelineContext<'a>,
    engine: &mut Engine,
    roles: &Roles,
) -> PipelineContext<'a> {
    let lock_images = context.params.lock_images_not_dynamic;
    for object in &mut engine.surface_mut().scene_mut().objects {
        let locked_role = object.has_name(&roles.background) || object.has_name(&roles.watermark);
        match object.tags.client_selectable {
            Some(false) => object.interaction.lock(),
            _ if locked_role => object.interaction.lock(),
            Some(true) => object.interaction.unlock(),
            None => (),
        }
        if lock_images && object.is_image() && !roles.is_dynamic_image(object.name()) {
            let interaction = &mut object.interaction;
            interaction.selectable = false;
            interaction.evented = false;
            interaction.has_controls = false;
            interaction.has_borders = false;
        }
    }

    let scene = engine.scene();
    let keys = [
        (facts::TEXT_CTA_ID_ROLE, &roles.text_cta),
        (facts::SHAPE_CTA_ID, &roles.shape_cta),
        (facts::LOGO_ID, &roles.logo),
        (facts::SHAPE_LOGO_ID, &roles.logo_backdrop),
        (facts::EDIT_NAME_ID, &roles.edit_name),
        (facts::EDIT_WHATS_ID, &roles.edit_whats),
        (facts::EDIT_PROFILE_PHOTO_ID, &roles.profile_photo),
        (facts::EDIT_ADDRESS_ID, &roles.edit_address),
        (facts::EDIT_BACKGROUND_PHOTO_ID, &roles.background_photo),
        (facts::EDIT_PRODUCT_PHOTO_ID, &roles.product_photo),
    ];
    let ids: Vec<(&str, FactValue)> = keys
        .into_iter()
        .map(|(key, role)| {
            let id = scene
                .find_by_name(role)
                .and_then(DrawableObject::id)
                .map(ToString::to_string);
            (key, id.into())
        })
        .collect();
    for (key, id) in ids {
        engine.host().publish(key, id);
    }
    context
}

/// 4. Primary and secondary colors.
fn apply_colors<'a>(context: PipelineContext<'a>, engine: &mut Engine) -> PipelineContext<'a> {
    let (primary, secondary) = (context.params.primary_color, context.params.secondary_color);
    if primary.is_none() && secondary.is_none() {
        return context;
    }
    let mut changed = 0usize;
    for object in &mut engine.surface_mut().scene_mut().objects {
        if recolor(object, primary, secondary) {
            object.mark_dirty();
            changed += 1;
        }
    }
    log::debug!("recolored {changed} objects");
    engine.surface_mut().request_render();
    context
}

/// 5. The user's logo in place of the template's.
async fn replace_logo<'a>(
    mut context: PipelineContext<'a>,
    engine: &mut Engine,
    roles: &Roles,
) -> PipelineContext<'a> {
    let Some(src) = context.params.logo_src.as_deref().filter(|src| !src.is_empty()) else {
        return context;
    };
    let image = match context.loader.load(src).await {
        Ok(image) => image,
        Err(e) => {
            log::warn!("logo not replaced: {e}");
            return context;
        }
    };
    let target = engine
        .surface_mut()
        .scene_mut()
        .find_by_name_mut(&roles.logo)
        .filter(|object| object.is_image());
    let Some(target) = target else {
        log::debug!("template has no {} image", roles.logo);
        return context;
    };
    if fit_image(target, src, &image, true) {
        context.logo_id = target.id().cloned();
        context.logo = Some(image);
    }
    context
}

/// 6. Paint the logo backdrop with the logo's corner color, white when that is translucent.
fn fill_backdrop<'a>(
    mut context: PipelineContext<'a>,
    engine: &mut Engine,
    roles: &Roles,
) -> PipelineContext<'a> {
    let Some(corner) = context.logo.as_ref().and_then(|logo| logo.top_left()) else {
        return context;
    };
    let fill = if corner.is_opaque() {
        Color::rgb(corner.r, corner.g, corner.b)
    } else {
        Color::WHITE
    };
    if let Some(backdrop) = engine
        .surface_mut()
        .scene_mut()
        .find_by_name_mut(&roles.logo_backdrop)
    {
        backdrop.fill = Some(fill.into());
        backdrop.mark_dirty();
        context.backdrop_id = backdrop.id().cloned();
    }
    context
}

/// 7. Logo and backdrop become one group, where the lower of the two was.
fn group_logo<'a>(context: PipelineContext<'a>, engine: &mut Engine, roles: &Roles) -> PipelineContext<'a> {
    let scene = engine.surface_mut().scene_mut();
    let Some(logo) = scene.position_by_name(&roles.logo) else {
        return context;
    };
    let mut indices = vec![logo];
    if let Some(backdrop) = scene.position_by_name(&roles.logo_backdrop) {
        indices.push(backdrop);
    }
    indices.sort_unstable();
    let id = scene.unique_id();
    let insert_at = indices[0];
    let mut members: Vec<DrawableObject> = indices
        .iter()
        .rev()
        .map(|&index| scene.objects.remove(index))
        .collect();
    members.reverse();
    let group = group_objects(members)
        .with_id(id)
        .named(roles.grouped_logo.as_str());
    scene.insert_at(insert_at, group);
    context
}

/// 8. Free-plan watermark on top of everything, invisible to history.
async fn add_watermark<'a>(
    context: PipelineContext<'a>,
    engine: &mut Engine,
    roles: &Roles,
) -> PipelineContext<'a> {
    let Some(watermark) = context.params.watermark.as_ref().filter(|_| context.params.free_plan) else {
        return context;
    };
    let image = match context.loader.load(&watermark.src).await {
        Ok(image) if !image.is_empty() => image,
        Ok(_) => {
            log::warn!("watermark {} has no area", watermark.src);
            return context;
        }
        Err(e) => {
            log::warn!("watermark not added: {e}");
            return context;
        }
    };
    let [width, height] = [f64::from(image.width), f64::from(image.height)];
    let scale = (watermark.max / width).min(watermark.max / height);
    let name = watermark.name.as_deref().unwrap_or(&roles.watermark);
    let mut object = DrawableObject::image(watermark.src.as_str(), width, height)
        .named(name)
        .at(watermark.left, watermark.top);
    object.placement.scale_x = scale;
    object.placement.scale_y = scale;
    object.placement.angle = watermark.angle;
    object.opacity = WATERMARK_OPACITY;
    object.interaction.lock();
    object.tags.client_selectable = Some(false);
    object.tags.exclude_from_history = true;
    object.tags.layer_name = Some(WATERMARK_LAYER.to_owned());

    let scene = engine.surface_mut().scene_mut();
    object.tags.id = Some(scene.unique_id());
    scene.add(object);
    context
}

/// 9. Name, phone and address texts.
fn replace_texts<'a>(context: PipelineContext<'a>, engine: &mut Engine, roles: &Roles) -> PipelineContext<'a> {
    let params = context.params;
    let fields = [
        (&roles.edit_name, &params.name_text),
        (&roles.edit_whats, &params.whats_text),
        (&roles.edit_address, &params.address_text),
    ];
    for (role, text) in fields {
        let Some(index) = engine.scene().position_by_name(role) else {
            continue;
        };
        let mut field = engine.scene().objects[index].clone();
        if !field.is_text() {
            continue;
        }
        let surface = engine.surface();
        refit_text(&mut field, text, |body: &TextBody| surface.measure_text(body));
        field.mark_dirty();
        engine.surface_mut().scene_mut().objects[index] = field;
    }
    context
}

/// 10. The user's profile photo.
async fn replace_profile_photo<'a>(
    context: PipelineContext<'a>,
    engine: &mut Engine,
    roles: &Roles,
) -> PipelineContext<'a> {
    let src = context.params.profile_photo_src.as_str();
    if src.is_empty() {
        return context;
    }
    let image = match context.loader.load(src).await {
        Ok(image) => image,
        Err(e) => {
            log::warn!("profile photo not replaced: {e}");
            return context;
        }
    };
    if let Some(target) = engine
        .surface_mut()
        .scene_mut()
        .find_by_name_mut(&roles.profile_photo)
        .filter(|object| object.is_image())
    {
        fit_image(target, src, &image, false);
    }
    context
}

/// 11. One full render with clip masks invalidated.
fn final_render<'a>(context: PipelineContext<'a>, engine: &mut Engine) -> PipelineContext<'a> {
    engine.surface_mut().set_settings(SurfaceSettings::performance());
    let scene = engine.surface_mut().scene_mut();
    if let Some(masked) = scene.objects.iter_mut().find(|object| object.clip_path().is_some()) {
        masked.mark_dirty();
        if let ObjectKind::Image {
            clip_path: Some(clip),
            ..
        } = &mut masked.kind
        {
            clip.mark_dirty();
        }
    }
    let now = engine.now();
    engine.render_now(now);
    engine.restore_settings();
    context
}

/// 12. The personalized scene becomes the baseline.
fn finish(context: PipelineContext<'_>, engine: &mut Engine) {
    engine.surface_mut().request_render();
    engine.reset_history("template");
    engine.request_layer_sync(true, "template");
    log::debug!(
        "template applied, logo {:?}, backdrop {:?}",
        context.logo_id,
        context.backdrop_id
    );
    engine.host().trigger(signals::TRANSFORMED);
    engine.host().publish(facts::STATUS, status::FINISHED.into());
}

#[cfg(test)]
mod test {
    use crate::pipeline::{
        apply_template, LoadedImage, MemoryImageLoader, PipelineOutcome, TemplateParams, Watermark,
    };
    use crate::clock::ManualClock;
    use crate::color::Color;
    use crate::config::EngineConfig;
    use crate::engine::{Engine, Key, KeyPress, SurfaceEvent};
    use crate::host::{facts, signals, FactValue, RecordingHost};
    use crate::scene::{ColorRole, DrawableObject, Gradient, ObjectKind, Paint, Scene, TextBody};
    use crate::surface::{MemorySurface, SurfaceSettings};
    use std::sync::Arc;
    use std::time::Duration;

    fn engine(width: f64, height: f64) -> (Engine, RecordingHost) {
        let host = RecordingHost::new();
        let engine = Engine::new(
            EngineConfig::default(),
            Box::new(MemorySurface::new(width, height)),
            Box::new(host.clone()),
            Arc::new(ManualClock::starting_at(0)),
        );
        (engine, host)
    }
    fn background(width: f64, height: f64) -> DrawableObject {
        DrawableObject::rect(width, height)
            .named("bgRect")
            .filled(Color::WHITE)
    }
    fn params_for(objects: Vec<DrawableObject>) -> TemplateParams {
        TemplateParams {
            json: Some(Scene { objects }.to_json().unwrap()),
            profile_photo_src: String::new(),
            ..TemplateParams::default()
        }
    }
    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    #[tokio::test]
    async fn waits_for_payload_and_layout() {
        let (mut ready, _) = engine(1000.0, 1000.0);
        let loader = MemoryImageLoader::new();
        let outcome = apply_template(&mut ready, &TemplateParams::default(), &loader).await;
        assert!(matches!(outcome, PipelineOutcome::Retry(delay) if delay == Duration::from_millis(300)));

        let (mut unlaid, host) = engine(0.0, 0.0);
        let params = params_for(vec![background(10.0, 10.0)]);
        let outcome = apply_template(&mut unlaid, &params, &loader).await;
        assert!(matches!(outcome, PipelineOutcome::Retry(delay) if delay == Duration::from_millis(1000)));
        assert_eq!(host.fact(facts::STATUS), None);
    }
    #[tokio::test]
    async fn malformed_template_finishes_without_changes() {
        let (mut engine, host) = engine(1000.0, 1000.0);
        let params = TemplateParams {
            json: Some("{\"objects\": 3}".to_owned()),
            ..TemplateParams::default()
        };
        let outcome = apply_template(&mut engine, &params, &MemoryImageLoader::new()).await;
        assert!(matches!(outcome, PipelineOutcome::Aborted(_)));
        assert_eq!(host.fact(facts::STATUS), Some("finished".into()));
        assert!(!host.signals().iter().any(|signal| signal == signals::TRANSFORMED));
        assert!(engine.scene().objects.is_empty());
    }
    #[tokio::test]
    async fn long_name_shrinks_into_its_box() {
        let (mut engine, host) = engine(1000.0, 1000.0);
        let name = DrawableObject::new(
            ObjectKind::IText(TextBody::new("Seu Nome Aqui", 40.0)),
            200.0,
            46.4,
        )
        .named("editname")
        .at(100.0, 300.0);
        let mut params = params_for(vec![background(1000.0, 1000.0), name]);
        params.name_text = "Maria Silva".to_owned();

        let outcome = apply_template(&mut engine, &params, &MemoryImageLoader::new()).await;
        assert!(matches!(outcome, PipelineOutcome::Finished));

        let field = engine.scene().find_by_name("editname").unwrap();
        assert_eq!(field.text().unwrap().text, "Maria Silva");
        let [width, _] = field.scaled_size();
        assert!(width <= 200.0 + 1e-9);
        assert!(close(field.placement.left, 100.0));
        // Ids are assigned and published.
        let id = field.id().unwrap().to_string();
        assert_eq!(host.fact(facts::EDIT_NAME_ID), Some(FactValue::Text(id)));
        assert_eq!(host.fact(facts::LOGO_ID), Some(FactValue::Null));

        assert_eq!(host.fact(facts::STATUS), Some("finished".into()));
        assert!(host.signals().iter().any(|signal| signal == signals::TRANSFORMED));
        assert_eq!(engine.history().depth(), 1);
        assert!(engine.wants_animation_frame());
    }
    #[tokio::test]
    async fn held_pan_outlives_the_final_render() {
        let (mut engine, _) = engine(500.0, 500.0);
        engine.dispatch(SurfaceEvent::KeyDown(KeyPress::plain(Key::Space)));
        let params = params_for(vec![background(500.0, 500.0)]);
        let outcome = apply_template(&mut engine, &params, &MemoryImageLoader::new()).await;
        assert!(matches!(outcome, PipelineOutcome::Finished));
        let settings = engine.surface().settings();
        assert!(!settings.selection);
        assert!(settings.skip_target_find);

        engine.dispatch(SurfaceEvent::KeyUp(KeyPress::plain(Key::Space)));
        assert_eq!(engine.surface().settings(), SurfaceSettings::interactive());
    }
    #[tokio::test]
    async fn primary_color_reaches_solids_and_first_gradient_stop() {
        let (mut engine, _) = engine(500.0, 500.0);
        let primary = Color::rgb(0xaa, 0x10, 0x10);
        let mut solid = DrawableObject::rect(10.0, 10.0).named("solid").filled(Color::BLACK);
        solid.tags.change_to_color = Some(ColorRole::Primary);
        let mut gradient = DrawableObject::rect(10.0, 10.0)
            .named("gradient")
            .filled(Paint::Gradient(Gradient::linear(Color::WHITE, Color::BLACK)));
        gradient.tags.change_to_color = Some(ColorRole::Primary);
        let mut params = params_for(vec![background(500.0, 500.0), solid, gradient]);
        params.primary_color = Some(primary);
        params.secondary_color = Some(Color::rgb(0, 0, 0xff));

        apply_template(&mut engine, &params, &MemoryImageLoader::new()).await;
        let scene = engine.scene();
        assert_eq!(scene.find_by_name("solid").unwrap().fill, Some(Paint::Solid(primary)));
        let Some(Paint::Gradient(gradient)) = &scene.find_by_name("gradient").unwrap().fill else {
            panic!("gradient lost");
        };
        assert_eq!(gradient.color_stops[0].color, primary);
        assert_eq!(gradient.color_stops[1].color, Color::BLACK);
    }
    #[tokio::test]
    async fn template_is_stretched_and_groups_dissolved() {
        let (mut engine, _) = engine(1000.0, 500.0);
        let group = DrawableObject::group(
            vec![
                DrawableObject::rect(10.0, 10.0).at(-10.0, -5.0),
                DrawableObject::rect(10.0, 10.0).at(0.0, -5.0),
            ],
            20.0,
            10.0,
        )
        .named("pair")
        .with_id("pair-id")
        .at(40.0, 40.0);
        let mut locked = DrawableObject::rect(5.0, 5.0).named("fixed");
        locked.tags.client_selectable = Some(false);
        let params = params_for(vec![background(500.0, 500.0), group, locked]);

        apply_template(&mut engine, &params, &MemoryImageLoader::new()).await;
        let scene = engine.scene();
        assert_eq!(scene.objects.len(), 4);
        let [width, height] = scene.objects[0].scaled_size();
        assert!(close(width, 1000.0) && close(height, 500.0));
        assert!(!scene.objects[0].interaction.selectable);
        let children: Vec<_> = scene.objects.iter().filter(|object| object.has_name("pair")).collect();
        assert_eq!(children.len(), 2);
        assert_eq!(children[0].id().map(|id| id.as_str()), Some("pair-id"));
        assert_ne!(children[1].id(), children[0].id());
        assert!(!scene.find_by_name("fixed").unwrap().interaction.selectable);
    }
    #[tokio::test]
    async fn logo_backdrop_group_and_watermark() {
        let (mut engine, _) = engine(1000.0, 1000.0);
        let logo = DrawableObject::image("old-logo.png", 100.0, 100.0)
            .named("logo")
            .at(10.0, 10.0);
        let backdrop = DrawableObject::rect(120.0, 120.0)
            .named("shapelogo")
            .at(0.0, 0.0)
            .filled(Color::BLACK);
        let mut params = params_for(vec![
            background(1000.0, 1000.0),
            backdrop,
            logo,
            DrawableObject::rect(5.0, 5.0).named("other"),
        ]);
        params.logo_src = Some("logo.png".to_owned());
        params.free_plan = true;
        params.watermark = Some(Watermark {
            src: "mark.png".to_owned(),
            max: 100.0,
            left: 5.0,
            top: 6.0,
            angle: 0.0,
            name: None,
        });
        let red = image::RgbaImage::from_pixel(60, 30, image::Rgba([200, 0, 0, 255]));
        let loader = MemoryImageLoader::new()
            .with("logo.png", LoadedImage::from_pixels(red))
            .with("mark.png", LoadedImage::sized(400, 200));

        apply_template(&mut engine, &params, &loader).await;
        let scene = engine.scene();
        // Background, grouped logo, the other object, watermark.
        assert_eq!(scene.objects.len(), 4);
        let group = &scene.objects[1];
        assert!(group.has_name("logoagrupado"));
        assert_eq!(group.children().len(), 2);
        assert!(scene.position_by_name("logo").is_none());

        let backdrop = scene.find_by_name("shapelogo").unwrap();
        assert_eq!(backdrop.fill, Some(Paint::Solid(Color::rgb(200, 0, 0))));
        let logo = scene.find_by_name("logo").unwrap();
        assert_eq!(logo.image_src(), Some("logo.png"));
        assert_eq!([logo.width, logo.height], [60.0, 30.0]);

        let watermark = scene.objects.last().unwrap();
        assert!(watermark.has_name("watermark"));
        assert!(watermark.tags.exclude_from_history);
        assert!(!watermark.interaction.selectable);
        assert!(close(watermark.placement.scale_x, 0.25));
        assert!(close(watermark.opacity, 0.6));
        // The watermark never enters history.
        assert!(!engine
            .history()
            .current()
            .unwrap()
            .contains("mark.png"));
    }
}
