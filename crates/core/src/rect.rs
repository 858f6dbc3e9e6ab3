//! Inclusive integer rectangles used for map bounds and observation windows.
//! This module exists so bound arithmetic has one normalized representation.
//! It does not own cell storage or coordinate translation into arrays beyond `index_of`.

use crate::types::Pos;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct IntRect {
    pub xmin: i32,
    pub ymin: i32,
    pub xmax: i32,
    pub ymax: i32,
}

impl Default for IntRect {
    fn default() -> Self {
        IntRect::EMPTY
    }
}

impl IntRect {
    /// Canonical empty rectangle. Every empty result is normalized to this value.
    pub const EMPTY: IntRect = IntRect { xmin: 0, ymin: 0, xmax: -1, ymax: -1 };

    pub fn new(xmin: i32, ymin: i32, xmax: i32, ymax: i32) -> Self {
        IntRect { xmin, ymin, xmax, ymax }.normalized()
    }

    pub fn point(p: Pos) -> Self {
        IntRect { xmin: p.x, ymin: p.y, xmax: p.x, ymax: p.y }
    }

    /// Square of side `2 * radius + 1`, clipped to the coordinate range.
    pub fn around(center: Pos, radius: i32) -> Self {
        IntRect::new(
            center.x.saturating_sub(radius),
            center.y.saturating_sub(radius),
            center.x.saturating_add(radius),
            center.y.saturating_add(radius),
        )
    }

    pub fn is_empty(&self) -> bool {
        self.xmin > self.xmax || self.ymin > self.ymax
    }

    /// Saturates at `i32::MAX` for rectangles spanning the whole axis.
    pub fn width(&self) -> i32 {
        if self.is_empty() { 0 } else { span(self.xmin, self.xmax) }
    }

    pub fn height(&self) -> i32 {
        if self.is_empty() { 0 } else { span(self.ymin, self.ymax) }
    }

    pub fn area(&self) -> usize {
        self.width() as usize * self.height() as usize
    }

    pub fn min(&self) -> Pos {
        Pos { y: self.ymin, x: self.xmin }
    }

    /// Smallest rectangle containing both. An empty operand is the identity.
    pub fn union(&self, other: &IntRect) -> IntRect {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        IntRect {
            xmin: self.xmin.min(other.xmin),
            ymin: self.ymin.min(other.ymin),
            xmax: self.xmax.max(other.xmax),
            ymax: self.ymax.max(other.ymax),
        }
    }

    pub fn intersection(&self, other: &IntRect) -> IntRect {
        IntRect {
            xmin: self.xmin.max(other.xmin),
            ymin: self.ymin.max(other.ymin),
            xmax: self.xmax.min(other.xmax),
            ymax: self.ymax.min(other.ymax),
        }
        .normalized()
    }

    pub fn contains(&self, p: Pos) -> bool {
        p.x >= self.xmin && p.x <= self.xmax && p.y >= self.ymin && p.y <= self.ymax
    }

    /// Every rectangle contains the empty rectangle.
    pub fn contains_rect(&self, other: &IntRect) -> bool {
        other.is_empty()
            || (!self.is_empty()
                && other.xmin >= self.xmin
                && other.xmax <= self.xmax
                && other.ymin >= self.ymin
                && other.ymax <= self.ymax)
    }

    pub fn offset(&self, delta: Pos) -> IntRect {
        if self.is_empty() {
            return IntRect::EMPTY;
        }
        IntRect {
            xmin: self.xmin + delta.x,
            ymin: self.ymin + delta.y,
            xmax: self.xmax + delta.x,
            ymax: self.ymax + delta.y,
        }
    }

    /// Grows every side by `margin`; a negative margin shrinks and may empty the rectangle.
    pub fn expand(&self, margin: i32) -> IntRect {
        if self.is_empty() {
            return IntRect::EMPTY;
        }
        IntRect::new(self.xmin - margin, self.ymin - margin, self.xmax + margin, self.ymax + margin)
    }

    /// Row-major array index of `p`, or `None` outside the rectangle.
    pub fn index_of(&self, p: Pos) -> Option<usize> {
        if !self.contains(p) {
            return None;
        }
        let col = (p.x - self.xmin) as usize;
        let row = (p.y - self.ymin) as usize;
        Some(row * self.width() as usize + col)
    }

    /// Positions in row-major order (y outer, x inner).
    pub fn positions(&self) -> impl Iterator<Item = Pos> + use<> {
        let IntRect { xmin, ymin, xmax, ymax } = *self;
        (ymin..=ymax).flat_map(move |y| (xmin..=xmax).map(move |x| Pos { y, x }))
    }

    fn normalized(self) -> IntRect {
        if self.is_empty() { IntRect::EMPTY } else { self }
    }
}

fn span(min: i32, max: i32) -> i32 {
    i32::try_from(i64::from(max) - i64::from(min) + 1).unwrap_or(i32::MAX)
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn rect_strategy() -> impl Strategy<Value = IntRect> {
        (-20i32..20, -20i32..20, -2i32..12, -2i32..12)
            .prop_map(|(x, y, w, h)| IntRect::new(x, y, x + w - 1, y + h - 1))
    }

    #[test]
    fn empty_union_is_identity() {
        let r = IntRect::new(2, 3, 5, 7);
        assert_eq!(IntRect::EMPTY.union(&r), r);
        assert_eq!(r.union(&IntRect::EMPTY), r);
        assert!(IntRect::EMPTY.union(&IntRect::EMPTY).is_empty());
    }

    #[test]
    fn negative_expand_can_empty_a_rect() {
        let r = IntRect::new(0, 0, 2, 2);
        assert_eq!(r.expand(-1), IntRect::new(1, 1, 1, 1));
        assert!(r.expand(-2).is_empty());
        assert_eq!(r.expand(2), IntRect::new(-2, -2, 4, 4));
    }

    #[test]
    fn index_of_is_row_major() {
        let r = IntRect::new(-1, 10, 1, 11);
        let indices: Vec<usize> = r.positions().filter_map(|p| r.index_of(p)).collect();
        assert_eq!(indices, (0..6).collect::<Vec<_>>());
        assert_eq!(r.index_of(Pos::new(2, 10)), None);
    }

    #[test]
    fn huge_radius_clips_to_the_coordinate_range() {
        let r = IntRect::around(Pos::new(5, -5), i32::MAX);
        assert_eq!((r.xmin, r.xmax), (i32::MIN + 6, i32::MAX));
        assert_eq!((r.ymin, r.ymax), (i32::MIN, i32::MAX - 5));
        assert_eq!(r.height(), i32::MAX);
        assert!(r.contains(Pos::new(0, 0)));
    }

    proptest! {
        #[test]
        fn union_contains_both(a in rect_strategy(), b in rect_strategy()) {
            let u = a.union(&b);
            prop_assert!(u.contains_rect(&a));
            prop_assert!(u.contains_rect(&b));
            prop_assert_eq!(a.union(&a), a);
        }

        #[test]
        fn intersection_is_inside_both(a in rect_strategy(), b in rect_strategy()) {
            let i = a.intersection(&b);
            prop_assert!(a.contains_rect(&i));
            prop_assert!(b.contains_rect(&i));
            let overlap = a.positions().any(|p| b.contains(p));
            prop_assert_eq!(i.is_empty(), !overlap);
        }

        #[test]
        fn offset_preserves_shape(a in rect_strategy(), dx in -50i32..50, dy in -50i32..50) {
            let delta = Pos::new(dx, dy);
            let moved = a.offset(delta);
            prop_assert_eq!(moved.width(), a.width());
            prop_assert_eq!(moved.height(), a.height());
            prop_assert_eq!(moved.offset(delta.negate()), a);
        }
    }
}
