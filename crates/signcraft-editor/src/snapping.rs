//! Rotation snapping and alignment guides.

use signcraft_core::geometry::{Bounds, Size};

/// Snap `angle` to the nearest multiple of `step` when it is strictly
/// closer than `tolerance`. Degrees in, degrees out.
pub fn snap_rotation(angle: f32, step: f32, tolerance: f32) -> f32 {
    if step <= 0.0 {
        return angle;
    }
    let nearest = (angle / step).round() * step;
    if (angle - nearest).abs() < tolerance {
        nearest
    } else {
        angle
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuideAxis {
    /// A vertical line at some x.
    Vertical,
    /// A horizontal line at some y.
    Horizontal,
}

/// A transient alignment guide spanning the whole canvas. Not part of the
/// scene, never hit-tested, drawn dashed by the host.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Guide {
    pub axis: GuideAxis,
    pub position: f32,
    pub start: f32,
    pub end: f32,
}

/// Left/center/right and top/middle/bottom of `moving` against every box in
/// `others`. A guide is emitted at the other box's edge when the two lines
/// are within `tolerance`. Duplicates are collapsed.
pub fn alignment_guides(moving: Bounds, others: &[Bounds], canvas: Size, tolerance: f32) -> Vec<Guide> {
    let xs = |b: &Bounds| [b.x, b.x + b.width / 2.0, b.right()];
    let ys = |b: &Bounds| [b.y, b.y + b.height / 2.0, b.bottom()];

    let mut guides: Vec<Guide> = Vec::new();
    let mut push = |axis: GuideAxis, position: f32| {
        if guides
            .iter()
            .any(|g| g.axis == axis && (g.position - position).abs() < f32::EPSILON)
        {
            return;
        }
        let end = match axis {
            GuideAxis::Vertical => canvas.height,
            GuideAxis::Horizontal => canvas.width,
        };
        guides.push(Guide {
            axis,
            position,
            start: 0.0,
            end,
        });
    };

    for other in others {
        for mx in xs(&moving) {
            for ox in xs(other) {
                if (mx - ox).abs() < tolerance {
                    push(GuideAxis::Vertical, ox);
                }
            }
        }
        for my in ys(&moving) {
            for oy in ys(other) {
                if (my - oy).abs() < tolerance {
                    push(GuideAxis::Horizontal, oy);
                }
            }
        }
    }
    guides
}
