//! Hit testing: point → instance lookup.
//!
//! Reverse-walks the top-level stack (front-to-back). A hit anywhere inside
//! a group resolves to the group itself.

use crate::surface::{InstanceId, Surface};
use signcraft_core::geometry::Bounds;

/// Topmost evented, visible instance at (px, py).
/// Returns `None` if only the background is hit.
pub fn hit_test(surface: &Surface, px: f32, py: f32) -> Option<InstanceId> {
    surface
        .top_level()
        .into_iter()
        .rev()
        .find(|&id| hits(surface, id, px, py))
}

fn hits(surface: &Surface, id: InstanceId, px: f32, py: f32) -> bool {
    let Some(inst) = surface.get(id) else {
        return false;
    };
    if !inst.paint.visible || !inst.evented {
        return false;
    }
    if inst.is_group() {
        return surface
            .children(Some(id))
            .into_iter()
            .rev()
            .any(|c| hits(surface, c, px, py));
    }
    inst.contains_point(px, py)
}

/// Top-level selectable instances whose bounds intersect `rect`.
/// Used for marquee (box) selection.
pub fn hit_test_rect(surface: &Surface, rect: Bounds) -> Vec<InstanceId> {
    surface
        .top_level()
        .into_iter()
        .filter(|&id| {
            surface.get(id).is_some_and(|i| i.selectable && i.paint.visible)
                && surface.bounds(id).is_some_and(|b| b.intersects(&rect))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::{Instance, InstanceKind};
    use signcraft_core::model::Geometry;

    fn rect(x: f32, y: f32, w: f32, h: f32) -> Instance {
        Instance::new(InstanceKind::Rect, Geometry::new(x, y, w, h))
    }

    #[test]
    fn topmost_wins() {
        let mut s = Surface::new(800.0, 600.0);
        let a = s.add(rect(10.0, 10.0, 100.0, 100.0));
        let b = s.add(rect(50.0, 50.0, 100.0, 100.0));
        assert_eq!(hit_test(&s, 60.0, 60.0), Some(b));
        assert_eq!(hit_test(&s, 20.0, 20.0), Some(a));
        assert_eq!(hit_test(&s, 500.0, 500.0), None);
    }

    #[test]
    fn non_evented_and_hidden_are_transparent() {
        let mut s = Surface::new(800.0, 600.0);
        let below = s.add(rect(0.0, 0.0, 100.0, 100.0));
        let mut ghost = rect(0.0, 0.0, 100.0, 100.0);
        ghost.evented = false;
        s.add(ghost);
        let mut hidden = rect(0.0, 0.0, 100.0, 100.0);
        hidden.paint.visible = false;
        s.add(hidden);
        assert_eq!(hit_test(&s, 50.0, 50.0), Some(below));
    }

    #[test]
    fn group_members_resolve_to_group() {
        let mut s = Surface::new(800.0, 600.0);
        let a = s.add(rect(0.0, 0.0, 10.0, 10.0));
        let b = s.add(rect(100.0, 100.0, 10.0, 10.0));
        let g = s.group(&[a, b]).unwrap();
        assert_eq!(hit_test(&s, 5.0, 5.0), Some(g));
        // Inside the group's box but outside both members.
        assert_eq!(hit_test(&s, 50.0, 50.0), None);
    }

    #[test]
    fn marquee_selection() {
        let mut s = Surface::new(800.0, 600.0);
        let a = s.add(rect(0.0, 0.0, 10.0, 10.0));
        let _far = s.add(rect(300.0, 300.0, 10.0, 10.0));
        let mut locked = rect(5.0, 5.0, 10.0, 10.0);
        locked.selectable = false;
        s.add(locked);
        assert_eq!(hit_test_rect(&s, Bounds::new(0.0, 0.0, 50.0, 50.0)), vec![a]);
    }
}
