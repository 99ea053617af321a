//! Rectangle edge parametrisation shared by the generators.
//!
//! Edges are walked clockwise on screen (y down): top left to right, right
//! top to bottom, bottom right to left, left bottom to top.

use glam::Vec2;
use voltframe_platform::FrameRect;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    Top,
    Right,
    Bottom,
    Left,
}

impl Edge {
    pub const ALL: [Edge; 4] = [Edge::Top, Edge::Right, Edge::Bottom, Edge::Left];

    /// Wraps modulo 4.
    pub fn from_index(index: usize) -> Self {
        Self::ALL[index % 4]
    }

    pub fn index(self) -> usize {
        match self {
            Edge::Top => 0,
            Edge::Right => 1,
            Edge::Bottom => 2,
            Edge::Left => 3,
        }
    }

    /// Unit normal pointing away from the rect.
    pub fn outward_normal(self) -> Vec2 {
        match self {
            Edge::Top => Vec2::new(0.0, -1.0),
            Edge::Right => Vec2::new(1.0, 0.0),
            Edge::Bottom => Vec2::new(0.0, 1.0),
            Edge::Left => Vec2::new(-1.0, 0.0),
        }
    }

    /// Unit tangent in the clockwise walking direction.
    pub fn tangent(self) -> Vec2 {
        match self {
            Edge::Top => Vec2::new(1.0, 0.0),
            Edge::Right => Vec2::new(0.0, 1.0),
            Edge::Bottom => Vec2::new(-1.0, 0.0),
            Edge::Left => Vec2::new(0.0, -1.0),
        }
    }

    /// Point at parameter `t` in `[0, 1]` along this edge of `rect`.
    pub fn point(self, rect: &FrameRect, t: f32) -> Vec2 {
        let (x0, y0, x1, y1) = (rect.x, rect.y, rect.right(), rect.bottom());
        match self {
            Edge::Top => Vec2::new(x0 + (x1 - x0) * t, y0),
            Edge::Right => Vec2::new(x1, y0 + (y1 - y0) * t),
            Edge::Bottom => Vec2::new(x1 - (x1 - x0) * t, y1),
            Edge::Left => Vec2::new(x0, y1 - (y1 - y0) * t),
        }
    }
}

/// Distance from `p` to the boundary of `rect`: 0 on it, Euclidean distance
/// outside, nearest-edge distance inside.
pub fn distance_to_perimeter(p: Vec2, rect: &FrameRect) -> f32 {
    let (x0, y0, x1, y1) = (rect.x, rect.y, rect.right(), rect.bottom());
    if rect.contains(p) {
        let dx = (p.x - x0).min(x1 - p.x);
        let dy = (p.y - y0).min(y1 - p.y);
        dx.min(dy)
    } else {
        let dx = if p.x < x0 {
            x0 - p.x
        } else if p.x > x1 {
            p.x - x1
        } else {
            0.0
        };
        let dy = if p.y < y0 {
            y0 - p.y
        } else if p.y > y1 {
            p.y - y1
        } else {
            0.0
        };
        dx.hypot(dy)
    }
}

/// `v` rotated +90° and normalised; zero when `v` is zero.
pub fn perpendicular(v: Vec2) -> Vec2 {
    let len = v.length();
    let len = if len > 0.0 { len } else { 1.0 };
    Vec2::new(-v.y / len, v.x / len)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect() -> FrameRect {
        FrameRect::new(0.0, 0.0, 100.0, 50.0)
    }

    #[test]
    fn edges_walk_clockwise_and_join_up() {
        let r = rect();
        for edge in Edge::ALL {
            let end = edge.point(&r, 1.0);
            let next_start = Edge::from_index(edge.index() + 1).point(&r, 0.0);
            assert!((end - next_start).length() < 1e-4, "{edge:?}");
        }
    }

    #[test]
    fn normals_point_away_from_center() {
        let r = rect();
        for edge in Edge::ALL {
            let p = edge.point(&r, 0.5);
            let outward = (p - r.center()).dot(edge.outward_normal());
            assert!(outward > 0.0, "{edge:?}");
            assert!(edge.tangent().dot(edge.outward_normal()).abs() < 1e-6);
        }
    }

    #[test]
    fn distance_is_zero_on_boundary() {
        let r = rect();
        assert_eq!(distance_to_perimeter(Vec2::new(0.0, 25.0), &r), 0.0);
        assert_eq!(distance_to_perimeter(Vec2::new(100.0, 50.0), &r), 0.0);
    }

    #[test]
    fn distance_inside_is_nearest_edge() {
        let r = rect();
        assert!((distance_to_perimeter(Vec2::new(10.0, 25.0), &r) - 10.0).abs() < 1e-5);
        assert!((distance_to_perimeter(Vec2::new(50.0, 45.0), &r) - 5.0).abs() < 1e-5);
    }

    #[test]
    fn distance_outside_corner_is_euclidean() {
        let r = rect();
        let d = distance_to_perimeter(Vec2::new(103.0, 54.0), &r);
        assert!((d - 5.0).abs() < 1e-5);
        let side = distance_to_perimeter(Vec2::new(50.0, -7.0), &r);
        assert!((side - 7.0).abs() < 1e-5);
    }

    #[test]
    fn perpendicular_of_zero_is_finite() {
        let p = perpendicular(Vec2::ZERO);
        assert!(p.x.is_finite() && p.y.is_finite());
        assert_eq!(perpendicular(Vec2::new(2.0, 0.0)), Vec2::new(0.0, 1.0));
    }
}
