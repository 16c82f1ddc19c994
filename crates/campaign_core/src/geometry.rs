//! Planar segment tests used while building connections.
//!
//! Orientation signs are computed exactly on the raw fixed-point bits in
//! 128-bit integers, so collinearity is decided without rounding. The bounding
//! box check for collinear touching uses a small tolerance.

use crate::math::{Fixed, Vec2Fixed};

/// Tolerance for the collinear on-segment check, about 0.01 world units.
pub const SEGMENT_TOLERANCE: Fixed = Fixed::from_bits(0x028F_5C29);

/// A planar segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    /// Start point.
    pub start: Vec2Fixed,
    /// End point.
    pub end: Vec2Fixed,
}

impl Segment {
    /// Create a segment.
    #[must_use]
    pub const fn new(start: Vec2Fixed, end: Vec2Fixed) -> Self {
        Self { start, end }
    }

    /// Whether both endpoints coincide.
    #[must_use]
    pub fn is_degenerate(&self) -> bool {
        self.start == self.end
    }
}

fn orientation(a: Vec2Fixed, b: Vec2Fixed, c: Vec2Fixed) -> i8 {
    let abx = i128::from(b.x.to_bits()) - i128::from(a.x.to_bits());
    let aby = i128::from(b.y.to_bits()) - i128::from(a.y.to_bits());
    let acx = i128::from(c.x.to_bits()) - i128::from(a.x.to_bits());
    let acy = i128::from(c.y.to_bits()) - i128::from(a.y.to_bits());
    let cross = abx
        .saturating_mul(acy)
        .saturating_sub(aby.saturating_mul(acx));
    cross.signum() as i8
}

fn on_segment(segment: Segment, point: Vec2Fixed) -> bool {
    let min_x = segment.start.x.min(segment.end.x).saturating_sub(SEGMENT_TOLERANCE);
    let max_x = segment.start.x.max(segment.end.x).saturating_add(SEGMENT_TOLERANCE);
    let min_y = segment.start.y.min(segment.end.y).saturating_sub(SEGMENT_TOLERANCE);
    let max_y = segment.start.y.max(segment.end.y).saturating_add(SEGMENT_TOLERANCE);
    (min_x..=max_x).contains(&point.x) && (min_y..=max_y).contains(&point.y)
}

/// Whether two segments intersect, including collinear overlap and touching.
#[must_use]
pub fn segments_intersect(first: Segment, second: Segment) -> bool {
    let o1 = orientation(first.start, first.end, second.start);
    let o2 = orientation(first.start, first.end, second.end);
    let o3 = orientation(second.start, second.end, first.start);
    let o4 = orientation(second.start, second.end, first.end);

    if o1 * o2 < 0 && o3 * o4 < 0 {
        return true;
    }

    (o1 == 0 && on_segment(first, second.start))
        || (o2 == 0 && on_segment(first, second.end))
        || (o3 == 0 && on_segment(second, first.start))
        || (o4 == 0 && on_segment(second, first.end))
}

/// Whether `point` lies on the segment, excluding its endpoints.
#[must_use]
pub fn passes_through(segment: Segment, point: Vec2Fixed) -> bool {
    if point == segment.start || point == segment.end {
        return false;
    }
    orientation(segment.start, segment.end, point) == 0 && on_segment(segment, point)
}

/// Fractional bits dropped before the projection products, so they fit in
/// 128 bits for any positions inside [`crate::math::MAX_COORDINATE`].
const PROJECTION_SHIFT: u32 = 16;

/// Project `point` onto the segment, clamped to its endpoints.
///
/// Returns `None` for a degenerate segment.
#[must_use]
pub fn project_onto_segment(segment: Segment, point: Vec2Fixed) -> Option<Vec2Fixed> {
    if segment.is_degenerate() {
        return None;
    }
    let coarse = |value: Fixed| i128::from(value.to_bits()) >> PROJECTION_SHIFT;
    let dx = coarse(segment.end.x) - coarse(segment.start.x);
    let dy = coarse(segment.end.y) - coarse(segment.start.y);
    let px = coarse(point.x) - coarse(segment.start.x);
    let py = coarse(point.y) - coarse(segment.start.y);

    let length_squared = dx * dx + dy * dy;
    if length_squared == 0 {
        return None;
    }
    let dot = px * dx + py * dy;
    if dot <= 0 {
        return Some(segment.start);
    }
    if dot >= length_squared {
        return Some(segment.end);
    }

    // t = dot / length_squared with as many fractional bits as fit.
    let precision = (dot.leading_zeros() - 1).clamp(1, 62);
    let t = (dot << precision) / length_squared;
    let along = |from: Fixed, to: Fixed| {
        let delta = i128::from(to.to_bits()) - i128::from(from.to_bits());
        let offset = (delta * t + (1 << (precision - 1))) >> precision;
        Fixed::from_bits(from.to_bits().saturating_add(i64::try_from(offset).unwrap_or(0)))
    };
    Some(Vec2Fixed::new(
        along(segment.start.x, segment.end.x),
        along(segment.start.y, segment.end.y),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(ax: i32, ay: i32, bx: i32, by: i32) -> Segment {
        Segment::new(Vec2Fixed::from_units(ax, ay), Vec2Fixed::from_units(bx, by))
    }

    #[test]
    fn test_crossing_segments_intersect() {
        assert!(segments_intersect(seg(0, 0, 10, 10), seg(0, 10, 10, 0)));
    }

    #[test]
    fn test_parallel_segments_do_not_intersect() {
        assert!(!segments_intersect(seg(0, 0, 10, 0), seg(0, 5, 10, 5)));
    }

    #[test]
    fn test_collinear_disjoint_segments_do_not_intersect() {
        assert!(!segments_intersect(seg(0, 0, 1, 0), seg(2, 0, 3, 0)));
    }

    #[test]
    fn test_collinear_overlap_intersects() {
        assert!(segments_intersect(seg(0, 0, 5, 0), seg(3, 0, 8, 0)));
    }

    #[test]
    fn test_touching_endpoint_counts() {
        assert!(segments_intersect(seg(0, 0, 5, 0), seg(5, 0, 5, 5)));
    }

    #[test]
    fn test_passes_through_interior_only() {
        let s = seg(0, 0, 10, 0);
        assert!(passes_through(s, Vec2Fixed::from_units(4, 0)));
        assert!(!passes_through(s, Vec2Fixed::from_units(10, 0)));
        assert!(!passes_through(s, Vec2Fixed::from_units(4, 1)));
        assert!(!passes_through(s, Vec2Fixed::from_units(11, 0)));
    }

    #[test]
    fn test_projection_clamps() {
        let s = seg(0, 0, 10, 0);
        assert_eq!(
            project_onto_segment(s, Vec2Fixed::from_units(4, 7)),
            Some(Vec2Fixed::from_units(4, 0))
        );
        assert_eq!(
            project_onto_segment(s, Vec2Fixed::from_units(-5, 3)),
            Some(Vec2Fixed::from_units(0, 0))
        );
        assert_eq!(
            project_onto_segment(s, Vec2Fixed::from_units(20, -3)),
            Some(Vec2Fixed::from_units(10, 0))
        );
        assert_eq!(project_onto_segment(seg(1, 1, 1, 1), Vec2Fixed::ZERO), None);
    }
}
