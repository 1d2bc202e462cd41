//! Integration tests: template instantiation, variations, backgrounds and
//! image swaps through the editing controller.

use base64::Engine as _;
use pretty_assertions::assert_eq;
use signcraft_core::geometry::Bounds;
use signcraft_core::css;
use signcraft_core::model::{ImageFilter, ObjectKind, Paint};
use signcraft_core::{EditorConfig, ObjectId, Project, Template, TemplateStore};
use signcraft_editor::{CanvasEditor, EditorError, ImagePurpose, UploadedFile};
use signcraft_render::{DecodedImage, InstanceId, InstanceKind};
use std::cell::Cell;
use std::rc::Rc;

const RED_PIXEL_B64: &str =
    "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mP8z8DwHwAFBQIAX8jx0gAAAABJRU5ErkJggg==";

fn store() -> TemplateStore {
    TemplateStore::builtin().unwrap()
}

fn template(id: &str) -> Template {
    store().by_id(id).unwrap().clone()
}

fn editor_with(id: &str) -> CanvasEditor {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut ed = CanvasEditor::new(EditorConfig::default());
    ed.init_canvas(800.0, 600.0);
    ed.load_template(&template(id), true).unwrap();
    ed
}

fn find(ed: &CanvasEditor, object_id: &str) -> InstanceId {
    ed.adapter()
        .find_by_object_id(ed.surface().unwrap(), ObjectId::intern(object_id))
        .unwrap_or_else(|| panic!("no instance for {object_id}"))
}

fn red_png() -> Vec<u8> {
    base64::engine::general_purpose::STANDARD
        .decode(RED_PIXEL_B64)
        .unwrap()
}

fn close(a: Bounds, b: Bounds) -> bool {
    (a.x - b.x).abs() < 1e-3
        && (a.y - b.y).abs() < 1e-3
        && (a.width - b.width).abs() < 1e-3
        && (a.height - b.height).abs() < 1e-3
}

fn fill_of(ed: &CanvasEditor, id: InstanceId) -> Option<Paint> {
    ed.surface().unwrap().get(id).unwrap().paint.fill.clone()
}

// ─── Instantiation ──────────────────────────────────────────────────────

#[test]
fn template_is_scaled_and_centered() {
    let ed = editor_with("open-closed-sign");
    let surface = ed.surface().unwrap();
    let bg = surface.bounds(find(&ed, "background")).unwrap();
    assert!(close(bg, Bounds::new(240.0, 220.0, 320.0, 160.0)), "{bg:?}");
    let border = surface.bounds(find(&ed, "border")).unwrap();
    assert!(close(border, Bounds::new(248.0, 228.0, 304.0, 144.0)), "{border:?}");
}

#[test]
fn every_template_object_joins_back_to_its_id() {
    for t in store().all() {
        let ed = editor_with(&t.id);
        for obj in &t.objects {
            let id = find(&ed, obj.id.as_str());
            let back = ed.adapter().read_back(ed.surface().unwrap(), id).unwrap();
            assert_eq!(back.id, obj.id, "template {}", t.id);
            assert_eq!(back.template_role, obj.template_role);
            assert_eq!(back.is_required, obj.is_required);
        }
    }
}

#[test]
fn loading_twice_with_clear_is_idempotent() {
    let mut ed = editor_with("open-closed-sign");
    let first = ed.surface().unwrap().len();
    ed.load_template(&template("open-closed-sign"), true).unwrap();
    assert_eq!(ed.surface().unwrap().len(), first);
    assert_eq!(first, 4);
}

#[test]
fn texts_paint_above_shapes() {
    let ed = editor_with("open-closed-sign");
    let surface = ed.surface().unwrap();
    let border = surface.position(find(&ed, "border")).unwrap();
    let status = surface.position(find(&ed, "status-text")).unwrap();
    assert!(status > border);
}

// ─── Variations ─────────────────────────────────────────────────────────

#[test]
fn color_and_text_variations_apply_by_object_id() {
    let mut ed = editor_with("open-closed-sign");
    assert!(ed.apply_color_variation("red").unwrap());
    assert!(ed.apply_text_variation("closed").unwrap());

    let red = css::parse_color("#C62828").unwrap();
    assert_eq!(fill_of(&ed, find(&ed, "background")), Some(Paint::Solid(red)));
    let status = find(&ed, "status-text");
    let text = ed.surface().unwrap().get(status).unwrap().text().unwrap();
    assert_eq!(text.text, "CLOSED");
}

#[test]
fn unknown_variation_changes_nothing() {
    let mut ed = editor_with("open-closed-sign");
    let before = ed.surface().unwrap().snapshot();
    assert!(!ed.apply_color_variation("does-not-exist").unwrap());
    assert!(!ed.apply_text_variation("does-not-exist").unwrap());
    assert_eq!(ed.surface().unwrap().snapshot(), before);
}

// ─── Backgrounds ────────────────────────────────────────────────────────

#[test]
fn backgrounds_are_scoped_to_their_region() {
    let mut ed = editor_with("open-closed-sign");
    let s = store();
    let border = find(&ed, "border");
    let status = find(&ed, "status-text");

    ed.select(&[border]);
    let ocean_bg = ed.apply_background_preset(s.background_preset("ocean").unwrap()).unwrap();
    ed.select(&[status]);
    let white_bg = ed.apply_background_preset(s.background_preset("white").unwrap()).unwrap();

    ed.select(&[border]);
    assert_eq!(ed.remove_background().unwrap(), 1);
    let surface = ed.surface().unwrap();
    assert!(!surface.contains(ocean_bg));
    assert!(surface.contains(white_bg));
}

#[test]
fn background_without_selection_is_rejected() {
    let mut ed = editor_with("open-closed-sign");
    let before = ed.surface().unwrap().snapshot();
    let preset = store().background_preset("ocean").unwrap().clone();
    assert_eq!(ed.apply_background_preset(&preset), Err(EditorError::NoSelection));
    assert_eq!(ed.surface().unwrap().snapshot(), before);
}

#[test]
fn deleting_a_region_takes_its_background_along() {
    let mut ed = editor_with("open-closed-sign");
    let border = find(&ed, "border");
    ed.select(&[border]);
    let bg = ed
        .apply_background_preset(store().background_preset("ocean").unwrap())
        .unwrap();
    ed.select(&[border]);
    assert_eq!(ed.delete_selected().unwrap(), 1);
    assert!(!ed.surface().unwrap().contains(bg));
    assert!(ed.adapter().all_backgrounds().is_empty());
}

#[test]
fn required_objects_survive_delete() {
    let mut ed = editor_with("open-closed-sign");
    let bg = find(&ed, "background");
    ed.select(&[bg]);
    assert_eq!(
        ed.delete_selected(),
        Err(EditorError::RequiredObject(ObjectId::intern("background")))
    );
    assert!(ed.surface().unwrap().contains(bg));
}

#[test]
fn group_holding_a_required_object_survives_delete() {
    let mut ed = editor_with("open-closed-sign");
    let status = find(&ed, "status-text");
    let subtitle = find(&ed, "subtitle-text");
    let border = find(&ed, "border");
    ed.select(&[status, subtitle]);
    let group = ed.group_selected().unwrap();

    ed.select(&[group]);
    assert_eq!(
        ed.delete_selected(),
        Err(EditorError::RequiredObject(ObjectId::intern("status-text")))
    );
    assert!(ed.surface().unwrap().contains(group));
    assert!(ed.surface().unwrap().contains(status));

    ed.select(&[group, border]);
    assert_eq!(ed.delete_selected(), Ok(1));
    assert!(!ed.surface().unwrap().contains(border));
    assert!(ed.surface().unwrap().contains(status));
    assert!(ed.surface().unwrap().contains(subtitle));
}

// ─── Images ─────────────────────────────────────────────────────────────

#[test]
fn template_image_keeps_identity_after_load() {
    let mut ed = editor_with("parking-reserved");
    let logo = find(&ed, "company-logo");
    let requests = ed.drain_image_requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].target, logo);
    assert_eq!(requests[0].purpose, ImagePurpose::TemplateImage);

    let image = DecodedImage::decode(&red_png()).unwrap();
    assert!(ed.complete_image_load(requests[0].ticket, Ok(image)));

    assert_eq!(find(&ed, "company-logo"), logo);
    let inst = ed.surface().unwrap().get(logo).unwrap();
    assert!(matches!(inst.kind, InstanceKind::Image(_)));
    let back = ed.adapter().read_back(ed.surface().unwrap(), logo).unwrap();
    assert_eq!(back.id, ObjectId::intern("company-logo"));
}

#[test]
fn failed_template_image_keeps_placeholder() {
    let mut ed = editor_with("parking-reserved");
    let logo = find(&ed, "company-logo");
    let ticket = ed.drain_image_requests()[0].ticket;
    assert!(!ed.complete_image_load(ticket, Err("404".into())));
    let inst = ed.surface().unwrap().get(logo).unwrap();
    assert!(matches!(inst.kind, InstanceKind::Rect));
}

#[test]
fn late_load_for_deleted_target_is_ignored() {
    let mut ed = editor_with("parking-reserved");
    let logo = find(&ed, "company-logo");
    let ticket = ed.drain_image_requests()[0].ticket;
    ed.select(&[logo]);
    ed.delete_selected().unwrap();
    let image = DecodedImage::decode(&red_png()).unwrap();
    assert!(!ed.complete_image_load(ticket, Ok(image)));
}

#[test]
fn replace_image_fits_the_old_box() {
    let mut ed = editor_with("parking-reserved");
    let logo = find(&ed, "company-logo");
    let before = ed.surface().unwrap().bounds(logo).unwrap();
    let file = UploadedFile::new("logo.png", "image/png", red_png());
    let id = ed.replace_image(ObjectId::intern("company-logo"), &file).unwrap();
    assert_eq!(id, logo);

    let after = ed.surface().unwrap().bounds(logo).unwrap();
    assert!(close(before, after), "{before:?} vs {after:?}");
    let meta = ed.adapter().metadata(logo).unwrap();
    assert_eq!(meta.placeholder.as_deref(), Some("Company logo"));
    assert_eq!(meta.pending_src, None);
}

#[test]
fn replace_image_rejects_bad_input_without_changes() {
    let mut ed = editor_with("parking-reserved");
    let before = ed.surface().unwrap().snapshot();
    let pdf = UploadedFile::new("logo.pdf", "application/pdf", vec![1, 2, 3]);
    assert_eq!(
        ed.replace_image(ObjectId::intern("company-logo"), &pdf),
        Err(EditorError::InvalidFileType("logo.pdf".into()))
    );
    let png = UploadedFile::new("logo.png", "image/png", red_png());
    assert_eq!(
        ed.replace_image(ObjectId::intern("missing"), &png),
        Err(EditorError::ObjectNotFound(ObjectId::intern("missing")))
    );
    assert_eq!(ed.surface().unwrap().snapshot(), before);
}

fn grayscale_logo_template() -> Template {
    let mut t = template("parking-reserved");
    for obj in &mut t.objects {
        if obj.id.as_str() == "company-logo"
            && let ObjectKind::Image(img) = &mut obj.kind
        {
            img.filters.push(ImageFilter::Grayscale);
        }
    }
    t
}

fn live_filters(ed: &CanvasEditor, id: InstanceId) -> Vec<ImageFilter> {
    match &ed.surface().unwrap().get(id).unwrap().kind {
        InstanceKind::Image(c) => c.filters.to_vec(),
        other => panic!("expected an image, got {other:?}"),
    }
}

#[test]
fn template_image_filters_survive_load() {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut ed = CanvasEditor::new(EditorConfig::default());
    ed.init_canvas(800.0, 600.0);
    ed.load_template(&grayscale_logo_template(), true).unwrap();
    let logo = find(&ed, "company-logo");

    // Saved while still loading.
    let pending = ed.adapter().read_back(ed.surface().unwrap(), logo).unwrap();
    assert_eq!(pending.image().unwrap().filters.to_vec(), vec![ImageFilter::Grayscale]);

    let ticket = ed.drain_image_requests()[0].ticket;
    let image = DecodedImage::decode(&red_png()).unwrap();
    assert!(ed.complete_image_load(ticket, Ok(image)));
    assert_eq!(live_filters(&ed, logo), vec![ImageFilter::Grayscale]);
    let back = ed.adapter().read_back(ed.surface().unwrap(), logo).unwrap();
    assert_eq!(back.image().unwrap().filters.to_vec(), vec![ImageFilter::Grayscale]);
}

#[test]
fn replace_image_keeps_template_filters() {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut ed = CanvasEditor::new(EditorConfig::default());
    ed.init_canvas(800.0, 600.0);
    ed.load_template(&grayscale_logo_template(), true).unwrap();
    let logo = find(&ed, "company-logo");
    let file = UploadedFile::new("logo.png", "image/png", red_png());

    // Before the template image arrives, then again after.
    ed.replace_image(ObjectId::intern("company-logo"), &file).unwrap();
    assert_eq!(live_filters(&ed, logo), vec![ImageFilter::Grayscale]);
    ed.replace_image(ObjectId::intern("company-logo"), &file).unwrap();
    assert_eq!(live_filters(&ed, logo), vec![ImageFilter::Grayscale]);
}

#[test]
fn late_template_load_does_not_undo_a_replacement() {
    let mut ed = editor_with("parking-reserved");
    let logo = find(&ed, "company-logo");
    let ticket = ed.drain_image_requests()[0].ticket;
    let file = UploadedFile::new("logo.png", "image/png", red_png());
    ed.replace_image(ObjectId::intern("company-logo"), &file).unwrap();

    let image = DecodedImage::decode(&red_png()).unwrap();
    assert!(!ed.complete_image_load(ticket, Ok(image)));
    match &ed.surface().unwrap().get(logo).unwrap().kind {
        InstanceKind::Image(c) => assert_eq!(c.src, file.data_uri()),
        other => panic!("expected an image, got {other:?}"),
    }
}

#[test]
fn replace_image_on_a_group_is_rejected() {
    let mut ed = editor_with("open-closed-sign");
    let status = find(&ed, "status-text");
    let subtitle = find(&ed, "subtitle-text");
    ed.select(&[status, subtitle]);
    let group = ed.group_selected().unwrap();
    let group_id = ed.adapter().metadata(group).unwrap().object_id;
    let before = ed.surface().unwrap().snapshot();

    let file = UploadedFile::new("logo.png", "image/png", red_png());
    assert_eq!(
        ed.replace_image(group_id, &file),
        Err(EditorError::ObjectNotFound(group_id))
    );
    assert_eq!(ed.surface().unwrap().snapshot(), before);
    assert!(ed.surface().unwrap().get(group).unwrap().is_group());
}

#[test]
fn exported_png_shows_text() {
    if signcraft_render::face_count() == 0 {
        return;
    }
    let mut ed = editor_with("open-closed-sign");
    let with_text = ed.export_png().unwrap();
    let status = find(&ed, "status-text");
    let subtitle = find(&ed, "subtitle-text");
    ed.select(&[status, subtitle]);
    ed.set_text("").unwrap();
    let without_text = ed.export_png().unwrap();
    assert_ne!(with_text, without_text);
}

// ─── End to end ─────────────────────────────────────────────────────────

#[test]
fn open_closed_sign_end_to_end() {
    let mut ed = editor_with("open-closed-sign");
    ed.apply_text_variation("closed").unwrap();
    ed.apply_color_variation("navy").unwrap();
    let url = ed.export_png().unwrap();
    assert!(url.starts_with("data:image/png;base64,"));

    let saves = Rc::new(Cell::new(0));
    let counter = Rc::clone(&saves);
    ed.set_project_info("p1", "Shop door", 10);
    ed.set_on_save(Box::new(move |_| counter.set(counter.get() + 1)));
    let project = ed.save(20).unwrap();
    assert_eq!(saves.get(), 1);
    assert_eq!(project.template_id.as_deref(), Some("open-closed-sign"));
    assert_eq!(project.objects.len(), 4);
    assert_eq!(project.updated_at, 20);

    // Round-trip through JSON into a fresh editor.
    let json = project.to_json().unwrap();
    let loaded = Project::from_json(&json).unwrap();
    let mut fresh = CanvasEditor::new(EditorConfig::default());
    fresh.init_canvas(800.0, 600.0);
    let placed = fresh
        .restore_project(&loaded, Some(&template("open-closed-sign")))
        .unwrap();
    assert_eq!(placed, 4);
    let status = find(&fresh, "status-text");
    let text = fresh.surface().unwrap().get(status).unwrap().text().unwrap();
    assert_eq!(text.text, "CLOSED");

    // Variations keep working on the restored scene.
    assert!(fresh.apply_text_variation("open").unwrap());
    let text = fresh.surface().unwrap().get(status).unwrap().text().unwrap();
    assert_eq!(text.text, "OPEN");
}
