//! Retained drawing surface.
//!
//! Holds live instances in a `petgraph` `StableDiGraph` under a hidden root.
//! Parent → child edges carry membership; paint order per parent is an
//! explicit ordered list (bottom first). Instances are addressed by
//! `InstanceId`, which is allocated monotonically and never reused.

use crate::bitmap::DecodedImage;
use kurbo::{Affine, Point, Rect};
use petgraph::Direction;
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use serde::{Deserialize, Serialize};
use signcraft_core::geometry::Bounds;
use signcraft_core::model::{Color, Geometry, ImageFilter, PaintStyle, TextPayload};
use smallvec::SmallVec;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

// ─── Identity ────────────────────────────────────────────────────────────

/// Stable identity of a live instance.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InstanceId(u64);

impl InstanceId {
    /// Reserved for the hidden root; never handed out.
    const ROOT: InstanceId = InstanceId(0);

    pub fn raw(self) -> u64 {
        self.0
    }

    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Debug for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "i{}", self.0)
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ─── Instances ───────────────────────────────────────────────────────────

/// A loaded image as drawn by an instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageContent {
    pub src: String,
    pub natural_width: u32,
    pub natural_height: u32,
    pub filters: SmallVec<[ImageFilter; 2]>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InstanceKind {
    Rect,
    Circle { radius: f32 },
    Triangle,
    Line,
    Text(TextPayload),
    Image(ImageContent),
    /// Children are stored in canvas coordinates; the group's geometry is
    /// the union of its children.
    Group,
}

impl InstanceKind {
    pub fn name(&self) -> &'static str {
        match self {
            InstanceKind::Rect => "rect",
            InstanceKind::Circle { .. } => "circle",
            InstanceKind::Triangle => "triangle",
            InstanceKind::Line => "line",
            InstanceKind::Text(_) => "text",
            InstanceKind::Image(_) => "image",
            InstanceKind::Group => "group",
        }
    }
}

/// Transform locks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Locks {
    pub movement: bool,
    pub scaling: bool,
    pub rotation: bool,
}

impl Locks {
    pub const ALL: Locks = Locks {
        movement: true,
        scaling: true,
        rotation: true,
    };

    pub fn any(&self) -> bool {
        self.movement || self.scaling || self.rotation
    }
}

/// Selection border and corner handle styling.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ControlStyle {
    pub border_color: Color,
    pub corner_color: Color,
    pub corner_size: f32,
    pub transparent_corners: bool,
}

impl Default for ControlStyle {
    fn default() -> Self {
        Self {
            border_color: Color::rgb8(0x21, 0x96, 0xF3),
            corner_color: Color::WHITE,
            corner_size: 10.0,
            transparent_corners: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instance {
    /// Assigned by the surface on insertion.
    pub id: InstanceId,
    pub kind: InstanceKind,
    pub geometry: Geometry,
    pub paint: PaintStyle,
    pub selectable: bool,
    pub evented: bool,
    pub locks: Locks,
    pub controls: ControlStyle,
}

impl Instance {
    pub fn new(kind: InstanceKind, geometry: Geometry) -> Self {
        Self {
            id: InstanceId::ROOT,
            kind,
            geometry,
            paint: PaintStyle::default(),
            selectable: true,
            evented: true,
            locks: Locks::default(),
            controls: ControlStyle::default(),
        }
    }

    #[must_use]
    pub fn with_paint(mut self, paint: PaintStyle) -> Self {
        self.paint = paint;
        self
    }

    pub fn is_group(&self) -> bool {
        matches!(self.kind, InstanceKind::Group)
    }

    pub fn is_text(&self) -> bool {
        matches!(self.kind, InstanceKind::Text(_))
    }

    pub fn text(&self) -> Option<&TextPayload> {
        match &self.kind {
            InstanceKind::Text(t) => Some(t),
            _ => None,
        }
    }

    /// Unrotated box, scale applied.
    pub fn local_bounds(&self) -> Bounds {
        let g = &self.geometry;
        Bounds::new(g.left, g.top, g.scaled_width(), g.scaled_height())
    }

    /// Rotation about the box center.
    pub fn transform(&self) -> Affine {
        let b = self.local_bounds();
        let (cx, cy) = b.center();
        Affine::rotate_about(
            (self.geometry.angle as f64).to_radians(),
            Point::new(cx as f64, cy as f64),
        )
    }

    /// Axis-aligned bounds of the rotated box.
    pub fn bounds(&self) -> Bounds {
        let b = self.local_bounds();
        if self.geometry.angle == 0.0 {
            return b;
        }
        let rect = Rect::new(
            b.x as f64,
            b.y as f64,
            b.right() as f64,
            b.bottom() as f64,
        );
        let t = self.transform();
        let corners = [
            t * Point::new(rect.x0, rect.y0),
            t * Point::new(rect.x1, rect.y0),
            t * Point::new(rect.x1, rect.y1),
            t * Point::new(rect.x0, rect.y1),
        ];
        let (mut x0, mut y0, mut x1, mut y1) = (f64::MAX, f64::MAX, f64::MIN, f64::MIN);
        for p in corners {
            x0 = x0.min(p.x);
            y0 = y0.min(p.y);
            x1 = x1.max(p.x);
            y1 = y1.max(p.y);
        }
        Bounds::new(x0 as f32, y0 as f32, (x1 - x0) as f32, (y1 - y0) as f32)
    }

    /// Point containment in the instance's rotated frame.
    pub fn contains_point(&self, x: f32, y: f32) -> bool {
        let local = self.transform().inverse() * Point::new(x as f64, y as f64);
        self.local_bounds().contains(local.x as f32, local.y as f32)
    }
}

// ─── Snapshot ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotNode {
    pub instance: Instance,
    pub children: Vec<SnapshotNode>,
}

/// Serializable copy of the surface. The image cache is not included.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurfaceSnapshot {
    pub width: f32,
    pub height: f32,
    pub background: Color,
    pub nodes: Vec<SnapshotNode>,
    pub next_id: u64,
}

// ─── Surface ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Surface {
    graph: StableDiGraph<Instance, ()>,
    root: NodeIndex,
    index: HashMap<InstanceId, NodeIndex>,
    /// Per-parent paint order, bottom first.
    order: HashMap<NodeIndex, Vec<NodeIndex>>,
    next_id: u64,
    width: f32,
    height: f32,
    background: Color,
    images: HashMap<String, Arc<DecodedImage>>,
}

impl Surface {
    #[must_use]
    pub fn new(width: f32, height: f32) -> Self {
        let mut graph = StableDiGraph::new();
        let root = graph.add_node(Instance::new(InstanceKind::Group, Geometry::new(0.0, 0.0, width, height)));
        let mut order = HashMap::new();
        order.insert(root, Vec::new());
        Self {
            graph,
            root,
            index: HashMap::new(),
            order,
            next_id: 1,
            width,
            height,
            background: Color::WHITE,
            images: HashMap::new(),
        }
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn height(&self) -> f32 {
        self.height
    }

    pub fn set_size(&mut self, width: f32, height: f32) {
        self.width = width;
        self.height = height;
    }

    pub fn background(&self) -> Color {
        self.background
    }

    pub fn set_background(&mut self, color: Color) {
        self.background = color;
    }

    /// Number of live instances, groups included.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn contains(&self, id: InstanceId) -> bool {
        self.index.contains_key(&id)
    }

    pub fn get(&self, id: InstanceId) -> Option<&Instance> {
        self.index.get(&id).map(|idx| &self.graph[*idx])
    }

    pub fn get_mut(&mut self, id: InstanceId) -> Option<&mut Instance> {
        self.index.get(&id).copied().map(|idx| &mut self.graph[idx])
    }

    fn node(&self, parent: Option<InstanceId>) -> Option<NodeIndex> {
        match parent {
            None => Some(self.root),
            Some(id) => self.index.get(&id).copied(),
        }
    }

    fn parent_node(&self, idx: NodeIndex) -> Option<NodeIndex> {
        self.graph.neighbors_directed(idx, Direction::Incoming).next()
    }

    fn id_of(&self, idx: NodeIndex) -> Option<InstanceId> {
        (idx != self.root).then(|| self.graph[idx].id)
    }

    // ─── Insertion ───────────────────────────────────────────────────────

    /// Append on top of the top-level stack.
    pub fn add(&mut self, instance: Instance) -> InstanceId {
        let root = self.root;
        self.attach(root, usize::MAX, instance)
    }

    /// Insert at `index` in the top-level stack (clamped).
    pub fn insert_at(&mut self, index: usize, instance: Instance) -> InstanceId {
        let root = self.root;
        self.attach(root, index, instance)
    }

    /// Insert under `parent` (a group) at `index`. `None` parent is top level.
    pub fn insert_into(
        &mut self,
        parent: Option<InstanceId>,
        index: usize,
        instance: Instance,
    ) -> Option<InstanceId> {
        let p = self.node(parent)?;
        if !self.graph[p].is_group() {
            return None;
        }
        Some(self.attach(p, index, instance))
    }

    /// Insert directly below `target`, in the same parent.
    pub fn insert_below(&mut self, target: InstanceId, instance: Instance) -> Option<InstanceId> {
        let t = *self.index.get(&target)?;
        let p = self.parent_node(t)?;
        let pos = self.order.get(&p)?.iter().position(|&c| c == t)?;
        Some(self.attach(p, pos, instance))
    }

    fn attach(&mut self, parent: NodeIndex, index: usize, mut instance: Instance) -> InstanceId {
        let id = InstanceId(self.next_id);
        self.next_id += 1;
        instance.id = id;
        let is_group = instance.is_group();
        let idx = self.graph.add_node(instance);
        self.graph.add_edge(parent, idx, ());
        self.index.insert(id, idx);
        if is_group {
            self.order.insert(idx, Vec::new());
        }
        let siblings = self.order.entry(parent).or_default();
        let at = index.min(siblings.len());
        siblings.insert(at, idx);
        log::trace!("surface: attached {id:?} at {at}");
        id
    }

    // ─── Removal / replacement ───────────────────────────────────────────

    /// Remove an instance (and, for groups, everything inside it).
    pub fn remove(&mut self, id: InstanceId) -> Option<Instance> {
        let idx = *self.index.get(&id)?;
        if let Some(p) = self.parent_node(idx)
            && let Some(siblings) = self.order.get_mut(&p)
        {
            siblings.retain(|&c| c != idx);
        }
        self.remove_subtree(idx)
    }

    fn remove_subtree(&mut self, idx: NodeIndex) -> Option<Instance> {
        if let Some(children) = self.order.remove(&idx) {
            for child in children {
                self.remove_subtree(child);
            }
        }
        let removed = self.graph.remove_node(idx)?;
        self.index.remove(&removed.id);
        Some(removed)
    }

    /// Remove every instance. Ids keep counting up.
    pub fn clear(&mut self) {
        let top: Vec<NodeIndex> = self.order.get(&self.root).cloned().unwrap_or_default();
        for idx in top {
            self.remove_subtree(idx);
        }
        self.order.insert(self.root, Vec::new());
    }

    /// Swap the content of `id` in place, keeping identity and z-position.
    /// Groups cannot be replaced.
    pub fn replace(&mut self, id: InstanceId, mut instance: Instance) -> bool {
        let Some(&idx) = self.index.get(&id) else {
            return false;
        };
        if self.graph[idx].is_group() || instance.is_group() {
            return false;
        }
        instance.id = id;
        self.graph[idx] = instance;
        true
    }

    // ─── Structure queries ───────────────────────────────────────────────

    /// `None` for top-level instances and unknown ids.
    pub fn parent(&self, id: InstanceId) -> Option<InstanceId> {
        let idx = *self.index.get(&id)?;
        self.parent_node(idx).and_then(|p| self.id_of(p))
    }

    /// Children of a group, or the top-level stack for `None`. Bottom first.
    pub fn children(&self, parent: Option<InstanceId>) -> Vec<InstanceId> {
        self.node(parent)
            .and_then(|p| self.order.get(&p))
            .map(|c| c.iter().map(|&i| self.graph[i].id).collect())
            .unwrap_or_default()
    }

    pub fn top_level(&self) -> Vec<InstanceId> {
        self.children(None)
    }

    /// Every instance in paint order: a group precedes its children.
    pub fn paint_order(&self) -> Vec<InstanceId> {
        let mut out = Vec::with_capacity(self.index.len());
        self.collect_order(self.root, &mut out);
        out
    }

    fn collect_order(&self, idx: NodeIndex, out: &mut Vec<InstanceId>) {
        if let Some(children) = self.order.get(&idx) {
            for &c in children {
                out.push(self.graph[c].id);
                self.collect_order(c, out);
            }
        }
    }

    /// Position among siblings, bottom = 0.
    pub fn position(&self, id: InstanceId) -> Option<usize> {
        let idx = *self.index.get(&id)?;
        let p = self.parent_node(idx)?;
        self.order.get(&p)?.iter().position(|&c| c == idx)
    }

    /// True if `ancestor` is `id` or contains it.
    pub fn is_within(&self, id: InstanceId, ancestor: InstanceId) -> bool {
        let mut cur = Some(id);
        while let Some(c) = cur {
            if c == ancestor {
                return true;
            }
            cur = self.parent(c);
        }
        false
    }

    // ─── Z-order ─────────────────────────────────────────────────────────

    /// Move within the current parent to `index` (clamped).
    pub fn move_to(&mut self, id: InstanceId, index: usize) -> bool {
        let Some(&idx) = self.index.get(&id) else {
            return false;
        };
        let Some(p) = self.parent_node(idx) else {
            return false;
        };
        let Some(siblings) = self.order.get_mut(&p) else {
            return false;
        };
        let Some(from) = siblings.iter().position(|&c| c == idx) else {
            return false;
        };
        let to = index.min(siblings.len() - 1);
        if from == to {
            return false;
        }
        let child = siblings.remove(from);
        siblings.insert(to, child);
        true
    }

    pub fn bring_forward(&mut self, id: InstanceId) -> bool {
        self.position(id).is_some_and(|p| self.move_to(id, p + 1))
    }

    pub fn send_backward(&mut self, id: InstanceId) -> bool {
        match self.position(id) {
            Some(p) if p > 0 => self.move_to(id, p - 1),
            _ => false,
        }
    }

    pub fn bring_to_front(&mut self, id: InstanceId) -> bool {
        self.move_to(id, usize::MAX)
    }

    pub fn send_to_back(&mut self, id: InstanceId) -> bool {
        self.move_to(id, 0)
    }

    /// Move `id` under `new_parent` (a group, or top level for `None`) at
    /// `index`. Refuses to move a group into itself.
    pub fn reparent(&mut self, id: InstanceId, new_parent: Option<InstanceId>, index: usize) -> bool {
        if let Some(np) = new_parent
            && self.is_within(np, id)
        {
            return false;
        }
        let Some(&idx) = self.index.get(&id) else {
            return false;
        };
        let Some(np_idx) = self.node(new_parent) else {
            return false;
        };
        if !self.graph[np_idx].is_group() {
            return false;
        }
        if let Some(old) = self.parent_node(idx) {
            if let Some(edge) = self.graph.find_edge(old, idx) {
                self.graph.remove_edge(edge);
            }
            if let Some(siblings) = self.order.get_mut(&old) {
                siblings.retain(|&c| c != idx);
            }
        }
        self.graph.add_edge(np_idx, idx, ());
        let siblings = self.order.entry(np_idx).or_default();
        let at = index.min(siblings.len());
        siblings.insert(at, idx);
        true
    }

    // ─── Grouping ────────────────────────────────────────────────────────

    /// Group siblings into a new group placed where the topmost member was.
    /// Members keep their relative order. Needs at least two members sharing
    /// a parent.
    pub fn group(&mut self, ids: &[InstanceId]) -> Option<InstanceId> {
        if ids.len() < 2 {
            return None;
        }
        let parent = self.parent(ids[0]);
        if ids.iter().any(|&id| !self.contains(id) || self.parent(id) != parent) {
            return None;
        }
        let mut members: Vec<(usize, InstanceId)> = ids
            .iter()
            .filter_map(|&id| self.position(id).map(|p| (p, id)))
            .collect();
        members.sort();
        members.dedup();
        let top_pos = members.last().map(|(p, _)| *p)?;

        let group = Instance::new(InstanceKind::Group, Geometry::new(0.0, 0.0, 0.0, 0.0));
        let p_idx = self.node(parent)?;
        let gid = self.attach(p_idx, top_pos + 1, group);
        for (i, (_, id)) in members.iter().enumerate() {
            self.reparent(*id, Some(gid), i);
        }
        self.refresh_group_bounds(gid);
        log::debug!("surface: grouped {} instances into {gid:?}", members.len());
        Some(gid)
    }

    /// Dissolve a group, putting its children where it was.
    pub fn ungroup(&mut self, id: InstanceId) -> Vec<InstanceId> {
        let Some(g) = self.get(id) else {
            return Vec::new();
        };
        if !g.is_group() {
            return Vec::new();
        }
        let parent = self.parent(id);
        let Some(pos) = self.position(id) else {
            return Vec::new();
        };
        let children = self.children(Some(id));
        for (i, &child) in children.iter().enumerate() {
            self.reparent(child, parent, pos + 1 + i);
        }
        self.remove(id);
        children
    }

    /// Reset a group's geometry to the union of its children.
    pub fn refresh_group_bounds(&mut self, id: InstanceId) {
        let children = self.children(Some(id));
        let union = Bounds::union_all(children.iter().filter_map(|&c| self.bounds(c)));
        if let Some(u) = union
            && let Some(g) = self.get_mut(id)
        {
            g.geometry = Geometry::new(u.x, u.y, u.width, u.height);
        }
    }

    // ─── Geometry ────────────────────────────────────────────────────────

    /// Canvas-space axis-aligned bounding box, rotation included.
    pub fn bounds(&self, id: InstanceId) -> Option<Bounds> {
        let inst = self.get(id)?;
        if inst.is_group() {
            let children = self.children(Some(id));
            if let Some(u) = Bounds::union_all(children.iter().filter_map(|&c| self.bounds(c))) {
                return Some(u);
            }
        }
        Some(inst.bounds())
    }

    /// Translate an instance; groups carry their children.
    pub fn translate(&mut self, id: InstanceId, dx: f32, dy: f32) -> bool {
        let Some(inst) = self.get_mut(id) else {
            return false;
        };
        inst.geometry.left += dx;
        inst.geometry.top += dy;
        if inst.is_group() {
            for child in self.children(Some(id)) {
                self.translate(child, dx, dy);
            }
        }
        true
    }

    // ─── Image cache ─────────────────────────────────────────────────────

    pub fn cache_image(&mut self, src: impl Into<String>, image: Arc<DecodedImage>) {
        self.images.insert(src.into(), image);
    }

    pub fn cached_image(&self, src: &str) -> Option<Arc<DecodedImage>> {
        self.images.get(src).cloned()
    }

    // ─── Snapshots ───────────────────────────────────────────────────────

    #[must_use]
    pub fn snapshot(&self) -> SurfaceSnapshot {
        SurfaceSnapshot {
            width: self.width,
            height: self.height,
            background: self.background,
            nodes: self.snapshot_children(self.root),
            next_id: self.next_id,
        }
    }

    fn snapshot_children(&self, idx: NodeIndex) -> Vec<SnapshotNode> {
        self.order
            .get(&idx)
            .map(|children| {
                children
                    .iter()
                    .map(|&c| SnapshotNode {
                        instance: self.graph[c].clone(),
                        children: self.snapshot_children(c),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Replace the scene with a snapshot, keeping instance ids. The id
    /// counter never moves backwards, and the image cache is kept.
    pub fn restore(&mut self, snapshot: &SurfaceSnapshot) {
        self.clear();
        self.width = snapshot.width;
        self.height = snapshot.height;
        self.background = snapshot.background;
        let root = self.root;
        for node in &snapshot.nodes {
            self.restore_node(root, node);
        }
        self.next_id = self.next_id.max(snapshot.next_id);
    }

    fn restore_node(&mut self, parent: NodeIndex, node: &SnapshotNode) {
        let instance = node.instance.clone();
        let id = instance.id;
        let is_group = instance.is_group();
        let idx = self.graph.add_node(instance);
        self.graph.add_edge(parent, idx, ());
        self.index.insert(id, idx);
        self.order.entry(parent).or_default().push(idx);
        if is_group {
            self.order.insert(idx, Vec::new());
        }
        self.next_id = self.next_id.max(id.0 + 1);
        for child in &node.children {
            self.restore_node(idx, child);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn rect(x: f32, y: f32, w: f32, h: f32) -> Instance {
        Instance::new(InstanceKind::Rect, Geometry::new(x, y, w, h))
    }

    #[test]
    fn ids_are_never_reused() {
        let mut s = Surface::new(800.0, 600.0);
        let a = s.add(rect(0.0, 0.0, 10.0, 10.0));
        s.remove(a);
        let b = s.add(rect(0.0, 0.0, 10.0, 10.0));
        assert_ne!(a, b);
        s.clear();
        let c = s.add(rect(0.0, 0.0, 10.0, 10.0));
        assert!(c > b);
    }

    #[test]
    fn insert_below_and_z_order() {
        let mut s = Surface::new(800.0, 600.0);
        let a = s.add(rect(0.0, 0.0, 10.0, 10.0));
        let b = s.add(rect(0.0, 0.0, 10.0, 10.0));
        let under_b = s.insert_below(b, rect(0.0, 0.0, 10.0, 10.0)).unwrap();
        assert_eq!(s.top_level(), vec![a, under_b, b]);

        assert!(s.bring_to_front(a));
        assert_eq!(s.top_level(), vec![under_b, b, a]);
        assert!(s.send_backward(a));
        assert_eq!(s.top_level(), vec![under_b, a, b]);
        assert!(!s.send_to_back(under_b));
        assert!(!s.bring_forward(b));
    }

    #[test]
    fn replace_keeps_identity_and_position() {
        let mut s = Surface::new(800.0, 600.0);
        let a = s.add(rect(0.0, 0.0, 10.0, 10.0));
        let b = s.add(rect(5.0, 5.0, 10.0, 10.0));
        assert!(s.replace(a, Instance::new(InstanceKind::Triangle, Geometry::new(1.0, 1.0, 4.0, 4.0))));
        assert_eq!(s.top_level(), vec![a, b]);
        assert_eq!(s.get(a).unwrap().kind, InstanceKind::Triangle);
        assert_eq!(s.get(a).unwrap().id, a);
    }

    #[test]
    fn rotated_bounds_grow() {
        let mut inst = rect(0.0, 0.0, 100.0, 100.0);
        inst.geometry.angle = 45.0;
        let b = inst.bounds();
        let diag = 100.0 * std::f32::consts::SQRT_2;
        assert!((b.width - diag).abs() < 0.01);
        assert!((b.center().0 - 50.0).abs() < 0.01);
        assert!(inst.contains_point(50.0, -15.0));
        assert!(!inst.contains_point(2.0, 2.0));
    }

    #[test]
    fn group_and_ungroup() {
        let mut s = Surface::new(800.0, 600.0);
        let a = s.add(rect(0.0, 0.0, 10.0, 10.0));
        let b = s.add(rect(20.0, 20.0, 10.0, 10.0));
        let c = s.add(rect(50.0, 50.0, 10.0, 10.0));
        let g = s.group(&[b, a]).unwrap();
        assert_eq!(s.top_level(), vec![g, c]);
        assert_eq!(s.children(Some(g)), vec![a, b]);
        assert_eq!(s.bounds(g), Some(Bounds::new(0.0, 0.0, 30.0, 30.0)));
        assert_eq!(s.parent(a), Some(g));

        s.translate(g, 5.0, 5.0);
        assert_eq!(s.get(a).unwrap().geometry.left, 5.0);

        let freed = s.ungroup(g);
        assert_eq!(freed, vec![a, b]);
        assert_eq!(s.top_level(), vec![a, b, c]);
        assert!(!s.contains(g));
    }

    #[test]
    fn reparent_refuses_cycles() {
        let mut s = Surface::new(800.0, 600.0);
        let a = s.add(rect(0.0, 0.0, 10.0, 10.0));
        let b = s.add(rect(0.0, 0.0, 10.0, 10.0));
        let g = s.group(&[a, b]).unwrap();
        assert!(!s.reparent(g, Some(g), 0));
        assert!(!s.reparent(a, Some(b), 0));
    }

    #[test]
    fn snapshot_restore_roundtrip() {
        let mut s = Surface::new(800.0, 600.0);
        let a = s.add(rect(0.0, 0.0, 10.0, 10.0));
        let b = s.add(rect(20.0, 0.0, 10.0, 10.0));
        let g = s.group(&[a, b]).unwrap();
        s.set_background(Color::BLACK);
        let snap = s.snapshot();

        s.remove(g);
        s.set_background(Color::WHITE);
        let later = s.add(rect(0.0, 0.0, 1.0, 1.0));

        s.restore(&snap);
        assert_eq!(s.snapshot().nodes, snap.nodes);
        assert_eq!(s.background(), Color::BLACK);
        assert!(!s.contains(later));
        // The counter stays ahead of everything handed out before restore.
        let next = s.add(rect(0.0, 0.0, 1.0, 1.0));
        assert!(next > later);
    }
}
