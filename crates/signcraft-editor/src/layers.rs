//! Layer panel model.
//!
//! A tree view of the surface, topmost first. Filtering and reordering work
//! on the tree and return new trees; `apply_layer_order` commits a tree back
//! to the surface.

use signcraft_render::{Instance, InstanceId, InstanceKind, Locks, Surface};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerKind {
    Text,
    Rectangle,
    Circle,
    Triangle,
    Line,
    Image,
    Group,
}

impl LayerKind {
    fn of(kind: &InstanceKind) -> Self {
        match kind {
            InstanceKind::Text(_) => LayerKind::Text,
            InstanceKind::Rect => LayerKind::Rectangle,
            InstanceKind::Circle { .. } => LayerKind::Circle,
            InstanceKind::Triangle => LayerKind::Triangle,
            InstanceKind::Line => LayerKind::Line,
            InstanceKind::Image(_) => LayerKind::Image,
            InstanceKind::Group => LayerKind::Group,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LayerKind::Text => "text",
            LayerKind::Rectangle => "rectangle",
            LayerKind::Circle => "circle",
            LayerKind::Triangle => "triangle",
            LayerKind::Line => "line",
            LayerKind::Image => "image",
            LayerKind::Group => "group",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LayerNode {
    pub id: InstanceId,
    pub name: String,
    pub kind: LayerKind,
    pub visible: bool,
    pub locked: bool,
    /// Position among siblings, bottom = 0.
    pub z_index: usize,
    /// Topmost first.
    pub children: Vec<LayerNode>,
}

const NAME_PREVIEW: usize = 20;

fn layer_name(inst: &Instance, child_count: usize) -> String {
    match &inst.kind {
        InstanceKind::Text(t) => {
            let preview: String = t.text.chars().take(NAME_PREVIEW).collect();
            if t.text.chars().count() > NAME_PREVIEW {
                format!("Text: {preview}…")
            } else {
                format!("Text: {preview}")
            }
        }
        InstanceKind::Rect => "Rectangle".into(),
        InstanceKind::Circle { .. } => "Circle".into(),
        InstanceKind::Triangle => "Triangle".into(),
        InstanceKind::Line => "Line".into(),
        InstanceKind::Image(_) => "Image".into(),
        InstanceKind::Group => format!("Group ({child_count} items)"),
    }
}

/// Layer tree of the surface, topmost first at every level.
pub fn objects_to_layers(surface: &Surface) -> Vec<LayerNode> {
    layers_under(surface, None)
}

fn layers_under(surface: &Surface, parent: Option<InstanceId>) -> Vec<LayerNode> {
    let ids = surface.children(parent);
    ids.iter()
        .enumerate()
        .rev()
        .filter_map(|(z, &id)| {
            let inst = surface.get(id)?;
            let children = if inst.is_group() {
                layers_under(surface, Some(id))
            } else {
                Vec::new()
            };
            Some(LayerNode {
                id,
                name: layer_name(inst, children.len()),
                kind: LayerKind::of(&inst.kind),
                visible: inst.paint.visible,
                locked: !inst.selectable,
                z_index: z,
                children,
            })
        })
        .collect()
}

// ─── Filtering ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LayerCategory {
    #[default]
    All,
    Text,
    Shapes,
    Images,
    Groups,
}

impl LayerCategory {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "all" => Some(LayerCategory::All),
            "text" => Some(LayerCategory::Text),
            "shapes" => Some(LayerCategory::Shapes),
            "images" => Some(LayerCategory::Images),
            "groups" => Some(LayerCategory::Groups),
            _ => None,
        }
    }

    fn admits(self, kind: LayerKind) -> bool {
        match self {
            LayerCategory::All => true,
            LayerCategory::Text => kind == LayerKind::Text,
            LayerCategory::Shapes => matches!(
                kind,
                LayerKind::Rectangle | LayerKind::Circle | LayerKind::Triangle | LayerKind::Line
            ),
            LayerCategory::Images => kind == LayerKind::Image,
            LayerCategory::Groups => kind == LayerKind::Group,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LayerFilter {
    pub search: String,
    pub category: LayerCategory,
    pub show_hidden: bool,
}

impl LayerFilter {
    fn admits(&self, node: &LayerNode) -> bool {
        let needle = self.search.trim().to_lowercase();
        let text_ok = needle.is_empty()
            || node.name.to_lowercase().contains(&needle)
            || node.kind.as_str().contains(&needle);
        text_ok && self.category.admits(node.kind)
    }
}

/// Nodes passing search, category and visibility. A group survives when it
/// passes itself or any of its children do.
pub fn filter_layers(layers: &[LayerNode], filter: &LayerFilter) -> Vec<LayerNode> {
    layers
        .iter()
        .filter(|n| n.visible || filter.show_hidden)
        .filter_map(|n| {
            let children = filter_layers(&n.children, filter);
            (filter.admits(n) || !children.is_empty()).then(|| LayerNode {
                children,
                ..n.clone()
            })
        })
        .collect()
}

// ─── Reordering ──────────────────────────────────────────────────────────

fn take_node(layers: &mut Vec<LayerNode>, id: InstanceId) -> Option<LayerNode> {
    if let Some(pos) = layers.iter().position(|n| n.id == id) {
        return Some(layers.remove(pos));
    }
    layers.iter_mut().find_map(|n| take_node(&mut n.children, id))
}

fn children_of(layers: &mut Vec<LayerNode>, parent: InstanceId) -> Option<&mut Vec<LayerNode>> {
    for node in layers.iter_mut() {
        if node.id == parent {
            return (node.kind == LayerKind::Group).then_some(&mut node.children);
        }
        if let Some(found) = children_of(&mut node.children, parent) {
            return Some(found);
        }
    }
    None
}

/// Move `id` to `index` (topmost first) under `parent`, or the top level for
/// `None`. `None` if `id` is unknown or the destination is not a group
/// outside the moved subtree.
pub fn reorder_layers(
    layers: &[LayerNode],
    id: InstanceId,
    parent: Option<InstanceId>,
    index: usize,
) -> Option<Vec<LayerNode>> {
    let mut tree = layers.to_vec();
    let node = take_node(&mut tree, id)?;
    let siblings = match parent {
        None => &mut tree,
        Some(p) => children_of(&mut tree, p)?,
    };
    let at = index.min(siblings.len());
    siblings.insert(at, node);
    renumber(&mut tree);
    Some(tree)
}

fn renumber(layers: &mut [LayerNode]) {
    let n = layers.len();
    for (i, node) in layers.iter_mut().enumerate() {
        node.z_index = n - 1 - i;
        renumber(&mut node.children);
    }
}

/// Commit a layer tree's order and nesting to the surface.
pub fn apply_layer_order(surface: &mut Surface, layers: &[LayerNode]) {
    apply_level(surface, None, layers);
}

fn apply_level(surface: &mut Surface, parent: Option<InstanceId>, layers: &[LayerNode]) {
    for (i, node) in layers.iter().rev().enumerate() {
        surface.reparent(node.id, parent, i);
    }
    for node in layers {
        if node.kind == LayerKind::Group {
            apply_level(surface, Some(node.id), &node.children);
        }
    }
    if let Some(p) = parent {
        surface.refresh_group_bounds(p);
    }
}

pub fn set_layer_visible(surface: &mut Surface, id: InstanceId, visible: bool) -> bool {
    let Some(inst) = surface.get_mut(id) else {
        return false;
    };
    inst.paint.visible = visible;
    true
}

pub fn set_layer_locked(surface: &mut Surface, id: InstanceId, locked: bool) -> bool {
    let Some(inst) = surface.get_mut(id) else {
        return false;
    };
    inst.selectable = !locked;
    inst.evented = !locked;
    inst.locks = if locked { Locks::ALL } else { Locks::default() };
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use signcraft_core::model::{Geometry, TextPayload};

    fn scene() -> (Surface, [InstanceId; 3]) {
        let mut s = Surface::new(800.0, 600.0);
        let rect = s.add(Instance::new(InstanceKind::Rect, Geometry::new(0.0, 0.0, 10.0, 10.0)));
        let text = s.add(Instance::new(
            InstanceKind::Text(TextPayload::new("A very long headline for the sign")),
            Geometry::new(0.0, 0.0, 10.0, 10.0),
        ));
        let circle = s.add(Instance::new(
            InstanceKind::Circle { radius: 5.0 },
            Geometry::new(20.0, 20.0, 10.0, 10.0),
        ));
        (s, [rect, text, circle])
    }

    fn ids(layers: &[LayerNode]) -> Vec<InstanceId> {
        layers.iter().map(|n| n.id).collect()
    }

    #[test]
    fn topmost_first_with_names() {
        let (s, [rect, text, circle]) = scene();
        let layers = objects_to_layers(&s);
        assert_eq!(ids(&layers), vec![circle, text, rect]);
        assert_eq!(layers[1].name, "Text: A very long headline…");
        assert_eq!(layers[2].name, "Rectangle");
        assert_eq!(layers[0].z_index, 2);
    }

    #[test]
    fn group_names_count_children() {
        let (mut s, [rect, _, circle]) = scene();
        let g = s.group(&[rect, circle]).unwrap();
        let layers = objects_to_layers(&s);
        let group = layers.iter().find(|n| n.id == g).unwrap();
        assert_eq!(group.name, "Group (2 items)");
        assert_eq!(ids(&group.children), vec![circle, rect]);
    }

    #[test]
    fn filter_by_category_search_and_visibility() {
        let (mut s, [rect, text, circle]) = scene();
        set_layer_visible(&mut s, circle, false);
        let layers = objects_to_layers(&s);

        let shapes = LayerFilter {
            category: LayerCategory::Shapes,
            ..Default::default()
        };
        assert_eq!(ids(&filter_layers(&layers, &shapes)), vec![rect]);
        let with_hidden = LayerFilter {
            show_hidden: true,
            ..shapes
        };
        assert_eq!(ids(&filter_layers(&layers, &with_hidden)), vec![circle, rect]);

        let search = LayerFilter {
            search: "HEADLINE".into(),
            ..Default::default()
        };
        assert_eq!(ids(&filter_layers(&layers, &search)), vec![text]);
    }

    #[test]
    fn filter_keeps_groups_with_matching_children() {
        let (mut s, [rect, text, _]) = scene();
        let g = s.group(&[rect, text]).unwrap();
        let layers = objects_to_layers(&s);
        let only_text = LayerFilter {
            category: LayerCategory::Text,
            ..Default::default()
        };
        let out = filter_layers(&layers, &only_text);
        assert_eq!(ids(&out), vec![g]);
        assert_eq!(ids(&out[0].children), vec![text]);
    }

    #[test]
    fn reorder_and_apply() {
        let (mut s, [rect, text, circle]) = scene();
        let layers = objects_to_layers(&s);
        // Move the rectangle to the top.
        let moved = reorder_layers(&layers, rect, None, 0).unwrap();
        assert_eq!(ids(&moved), vec![rect, circle, text]);
        assert_eq!(moved[0].z_index, 2);
        apply_layer_order(&mut s, &moved);
        assert_eq!(s.top_level(), vec![text, circle, rect]);
        assert!(reorder_layers(&layers, InstanceId::from_raw(999), None, 0).is_none());
        // A non-group cannot be a parent.
        assert!(reorder_layers(&layers, rect, Some(text), 0).is_none());
    }

    #[test]
    fn reorder_into_group() {
        let (mut s, [rect, text, circle]) = scene();
        let g = s.group(&[rect, text]).unwrap();
        let layers = objects_to_layers(&s);
        let moved = reorder_layers(&layers, circle, Some(g), 0).unwrap();
        apply_layer_order(&mut s, &moved);
        assert_eq!(s.children(Some(g)), vec![rect, text, circle]);
        assert_eq!(s.top_level(), vec![g]);
    }

    #[test]
    fn locking_toggles_interaction() {
        let (mut s, [rect, ..]) = scene();
        assert!(set_layer_locked(&mut s, rect, true));
        assert!(objects_to_layers(&s)[2].locked);
        assert!(set_layer_locked(&mut s, rect, false));
        assert!(s.get(rect).unwrap().evented);
    }
}
