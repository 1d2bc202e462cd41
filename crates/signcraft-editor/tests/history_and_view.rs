//! Integration tests: undo/redo, layers, zoom and keyboard shortcuts
//! through the editing controller.

use pretty_assertions::assert_eq;
use signcraft_core::css;
use signcraft_core::model::{Color, Paint};
use signcraft_core::{EditorConfig, ObjectId, TemplateStore};
use signcraft_editor::{
    CanvasEditor, EditorState, InputEvent, LayerCategory, LayerFilter, LayerKind, Modifiers,
    ShortcutAction, ToolKind,
};
use signcraft_render::InstanceId;

fn editor() -> CanvasEditor {
    let _ = env_logger::builder().is_test(true).try_init();
    let store = TemplateStore::builtin().unwrap();
    let mut ed = CanvasEditor::new(EditorConfig::default());
    ed.init_canvas(800.0, 600.0);
    ed.load_template(store.by_id("open-closed-sign").unwrap(), true)
        .unwrap();
    ed
}

fn find(ed: &CanvasEditor, object_id: &str) -> InstanceId {
    ed.adapter()
        .find_by_object_id(ed.surface().unwrap(), ObjectId::intern(object_id))
        .unwrap()
}

fn key(ed: &mut CanvasEditor, k: &str, modifiers: Modifiers) -> Option<ShortcutAction> {
    ed.handle_input(
        &InputEvent::KeyDown {
            key: k.into(),
            modifiers,
            in_text_field: false,
        },
        0,
    )
}

const CTRL: Modifiers = Modifiers {
    ctrl: true,
    ..Modifiers::NONE
};

// ─── Undo / redo ────────────────────────────────────────────────────────

#[test]
fn variation_undo_and_redo() {
    let mut ed = editor();
    let bg = find(&ed, "background");
    let green = Paint::Solid(css::parse_color("#1A7F37").unwrap());
    let red = Paint::Solid(css::parse_color("#C62828").unwrap());

    ed.apply_color_variation("red").unwrap();
    assert_eq!(ed.surface().unwrap().get(bg).unwrap().paint.fill, Some(red.clone()));
    assert!(ed.undo());
    assert_eq!(ed.surface().unwrap().get(bg).unwrap().paint.fill, Some(green));
    assert!(ed.redo());
    assert_eq!(ed.surface().unwrap().get(bg).unwrap().paint.fill, Some(red));
}

#[test]
fn undo_brings_back_deleted_object_with_its_metadata() {
    let mut ed = editor();
    let border = find(&ed, "border");
    ed.select(&[border]);
    ed.delete_selected().unwrap();
    assert!(
        ed.adapter()
            .find_by_object_id(ed.surface().unwrap(), ObjectId::intern("border"))
            .is_none()
    );
    assert!(ed.undo());
    assert_eq!(find(&ed, "border"), border);
    // Template still attached, so variations keep working.
    assert!(ed.apply_text_variation("closed").unwrap());
}

#[test]
fn new_edit_clears_redo() {
    let mut ed = editor();
    ed.add_rectangle().unwrap();
    assert!(ed.undo());
    assert!(ed.can_redo());
    ed.add_circle().unwrap();
    assert!(!ed.can_redo());
}

#[test]
fn undo_with_nothing_recorded_is_a_no_op() {
    let mut ed = CanvasEditor::new(EditorConfig::default());
    ed.init_canvas(800.0, 600.0);
    assert!(!ed.undo());
    assert!(!ed.redo());
}

// ─── Editing ────────────────────────────────────────────────────────────

#[test]
fn style_edits_need_a_selection() {
    let mut ed = editor();
    ed.clear_selection();
    assert_eq!(ed.state(), EditorState::Idle);
    assert_eq!(
        ed.set_fill(Color::BLACK),
        Err(signcraft_editor::EditorError::NoSelection)
    );
    let border = find(&ed, "border");
    ed.select(&[border]);
    ed.set_opacity(2.0).unwrap();
    assert_eq!(ed.surface().unwrap().get(border).unwrap().paint.opacity, 1.0);
}

#[test]
fn group_then_ungroup() {
    let mut ed = editor();
    let a = ed.add_rectangle().unwrap();
    let b = ed.add_circle().unwrap();
    ed.select(&[a, b]);
    let group = ed.group_selected().unwrap();
    assert_eq!(ed.selection(), &[group]);
    assert_eq!(ed.surface().unwrap().parent(a), Some(group));

    let freed = ed.ungroup_selected().unwrap();
    assert_eq!(freed.len(), 2);
    assert!(!ed.surface().unwrap().contains(group));
    assert_eq!(ed.surface().unwrap().parent(a), None);
}

#[test]
fn bring_to_front_and_send_to_back() {
    let mut ed = editor();
    let bg = find(&ed, "background");
    ed.select(&[bg]);
    ed.bring_to_front().unwrap();
    let order = ed.surface().unwrap().paint_order();
    assert_eq!(order.last(), Some(&bg));
    ed.send_to_back().unwrap();
    let order = ed.surface().unwrap().paint_order();
    assert_eq!(order.first(), Some(&bg));
}

// ─── Layers ─────────────────────────────────────────────────────────────

#[test]
fn layers_list_topmost_first() {
    let ed = editor();
    let layers = ed.layers();
    assert_eq!(layers.len(), 4);
    assert_eq!(layers[0].name, "Text: Come in, we're open");
    assert_eq!(layers[0].kind, LayerKind::Text);
    assert_eq!(layers[3].id, find(&ed, "background"));

    let texts = ed.filtered_layers(&LayerFilter {
        category: LayerCategory::Text,
        ..LayerFilter::default()
    });
    assert_eq!(texts.len(), 2);
}

#[test]
fn reordering_a_layer_moves_it_on_the_surface() {
    let mut ed = editor();
    let bg = find(&ed, "background");
    assert!(ed.reorder_layer(bg, None, 0).unwrap());
    assert_eq!(ed.surface().unwrap().paint_order().last(), Some(&bg));
    assert_eq!(ed.layers()[0].id, bg);
    assert!(ed.undo());
    assert_eq!(ed.surface().unwrap().paint_order().first(), Some(&bg));
}

#[test]
fn locking_a_layer_drops_it_from_selection() {
    let mut ed = editor();
    let border = find(&ed, "border");
    ed.select(&[border]);
    assert!(ed.set_layer_locked(border, true).unwrap());
    assert!(ed.selection().is_empty());
    ed.select(&[border]);
    assert!(ed.selection().is_empty());
}

// ─── Zoom ───────────────────────────────────────────────────────────────

#[test]
fn zoom_is_clamped() {
    let mut ed = editor();
    for _ in 0..40 {
        ed.zoom_in();
    }
    assert_eq!(ed.zoom(), 5.0);
    for _ in 0..60 {
        ed.zoom_out();
    }
    assert_eq!(ed.zoom(), 0.1);
    ed.reset_zoom();
    assert_eq!(ed.zoom(), 1.0);
}

#[test]
fn fit_to_canvas_centers_content() {
    let mut ed = editor();
    assert!(ed.fit_to_canvas());
    let vp = ed.viewport();
    // Content center (400, 300) lands on the view center.
    let (sx, sy) = vp.canvas_to_screen(400.0, 300.0);
    assert!((sx - 400.0).abs() < 1e-2 && (sy - 300.0).abs() < 1e-2, "{sx}, {sy}");
    assert!(ed.zoom() > 1.0);
}

// ─── Shortcuts ──────────────────────────────────────────────────────────

#[test]
fn keyboard_undo_redo_and_tools() {
    let mut ed = editor();
    ed.add_rectangle().unwrap();
    let count = ed.surface().unwrap().len();

    assert_eq!(key(&mut ed, "z", CTRL), Some(ShortcutAction::Undo));
    assert_eq!(ed.surface().unwrap().len(), count - 1);
    assert_eq!(key(&mut ed, "y", CTRL), Some(ShortcutAction::Redo));
    assert_eq!(ed.surface().unwrap().len(), count);

    assert_eq!(
        key(&mut ed, "t", Modifiers::NONE),
        Some(ShortcutAction::Tool(ToolKind::Text))
    );
    assert_eq!(ed.tool(), ToolKind::Text);
}

#[test]
fn shortcuts_are_ignored_in_text_fields() {
    let mut ed = editor();
    let border = find(&ed, "border");
    ed.select(&[border]);
    let fired = ed.handle_input(
        &InputEvent::KeyDown {
            key: "Delete".into(),
            modifiers: Modifiers::NONE,
            in_text_field: true,
        },
        0,
    );
    assert_eq!(fired, None);
    assert!(ed.surface().unwrap().contains(border));
}
