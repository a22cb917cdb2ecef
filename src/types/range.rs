//! Inclusive integer ranges and interval sets

use serde::{Deserialize, Serialize};
use std::fmt;

/// An inclusive range `[minimum, maximum]` of unsigned integers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IntegerRange {
    pub minimum: u128,
    pub maximum: u128,
}

impl IntegerRange {
    pub fn new(minimum: u128, maximum: u128) -> Self {
        debug_assert!(minimum <= maximum);
        Self { minimum, maximum }
    }

    /// The range holding exactly one value
    pub fn single(value: u128) -> Self {
        Self::new(value, value)
    }

    pub fn full() -> Self {
        Self::new(0, u128::MAX)
    }

    pub fn contains_integer(&self, value: u128) -> bool {
        (self.minimum..=self.maximum).contains(&value)
    }

    /// True if every value of `other` is inside `self`
    pub fn contains(&self, other: &IntegerRange) -> bool {
        self.minimum <= other.minimum && other.maximum <= self.maximum
    }

    /// Number of values, `None` when it does not fit into a `u128`
    pub fn size(&self) -> Option<u128> {
        (self.maximum - self.minimum).checked_add(1)
    }

    /// Smallest range containing both operands
    pub fn combine(&self, other: &IntegerRange) -> IntegerRange {
        IntegerRange::new(
            self.minimum.min(other.minimum),
            self.maximum.max(other.maximum),
        )
    }

    /// Range of `a + b`; `None` if the maximum overflows
    pub fn add(&self, other: &IntegerRange) -> Option<IntegerRange> {
        let maximum = self.maximum.checked_add(other.maximum)?;
        Some(IntegerRange::new(self.minimum + other.minimum, maximum))
    }

    /// Range of `a - b`; only defined when the result can never be negative
    pub fn subtract(&self, other: &IntegerRange) -> Option<IntegerRange> {
        if self.minimum < other.maximum {
            return None;
        }
        Some(IntegerRange::new(
            self.minimum - other.maximum,
            self.maximum - other.minimum,
        ))
    }
}

impl fmt::Display for IntegerRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "int({}, {})", self.minimum, self.maximum)
    }
}

/// A set of integers stored as sorted, disjoint, non-adjacent ranges
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IntervalSet {
    ranges: Vec<IntegerRange>,
}

impl IntervalSet {
    pub fn new(initial: IntegerRange) -> Self {
        Self {
            ranges: vec![initial],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn ranges(&self) -> &[IntegerRange] {
        &self.ranges
    }

    pub fn contains(&self, value: u128) -> bool {
        self.find(value).is_some()
    }

    fn find(&self, value: u128) -> Option<usize> {
        let index = self.ranges.partition_point(|range| range.maximum < value);
        match self.ranges.get(index) {
            Some(range) if range.contains_integer(value) => Some(index),
            _ => None,
        }
    }

    /// Removes every value of `removed`; returns false, leaving the set
    /// unchanged, unless all of them were in the set
    pub fn remove(&mut self, removed: IntegerRange) -> bool {
        let Some(index) = self.find(removed.minimum) else {
            return false;
        };
        let range = self.ranges[index];
        if !range.contains(&removed) {
            return false;
        }
        match (range.minimum == removed.minimum, range.maximum == removed.maximum) {
            (true, true) => {
                self.ranges.remove(index);
            }
            (true, false) => self.ranges[index].minimum = removed.maximum + 1,
            (false, true) => self.ranges[index].maximum = removed.minimum - 1,
            (false, false) => {
                self.ranges[index].maximum = removed.minimum - 1;
                self.ranges
                    .insert(index + 1, IntegerRange::new(removed.maximum + 1, range.maximum));
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn full_range_has_no_size() {
        assert_eq!(IntegerRange::full().size(), None);
        assert_eq!(IntegerRange::new(0, 2).size(), Some(3));
    }

    #[test]
    fn subtraction_requires_non_negative_result() {
        let a = IntegerRange::new(5, 10);
        assert_eq!(a.subtract(&IntegerRange::new(0, 5)), Some(IntegerRange::new(0, 10)));
        assert_eq!(a.subtract(&IntegerRange::new(0, 6)), None);
    }

    #[test]
    fn removing_twice_fails() {
        let mut set = IntervalSet::new(IntegerRange::new(0, 2));
        assert!(set.remove(IntegerRange::single(1)));
        assert!(!set.remove(IntegerRange::single(1)));
        assert!(set.remove(IntegerRange::single(0)));
        assert!(set.remove(IntegerRange::single(2)));
        assert!(set.is_empty());
    }

    #[test]
    fn removing_a_partly_removed_range_fails() {
        let mut set = IntervalSet::new(IntegerRange::new(0, 9));
        assert!(set.remove(IntegerRange::new(3, 5)));
        assert!(!set.remove(IntegerRange::new(2, 3)));
        assert!(!set.remove(IntegerRange::new(2, 6)));
        assert_eq!(
            set.ranges(),
            &[IntegerRange::new(0, 2), IntegerRange::new(6, 9)]
        );
        assert!(set.remove(IntegerRange::new(0, 2)));
        assert!(set.remove(IntegerRange::new(6, 9)));
        assert!(set.is_empty());
    }

    fn range() -> impl Strategy<Value = IntegerRange> {
        (any::<u128>(), any::<u128>()).prop_map(|(a, b)| IntegerRange::new(a.min(b), a.max(b)))
    }

    proptest! {
        #[test]
        fn combine_contains_both(a in range(), b in range()) {
            let combined = a.combine(&b);
            prop_assert!(combined.contains(&a));
            prop_assert!(combined.contains(&b));
        }

        #[test]
        fn add_bounds_every_sum(a in 0u128..1000, b in 0u128..1000, c in 0u128..1000, d in 0u128..1000) {
            let left = IntegerRange::new(a.min(b), a.max(b));
            let right = IntegerRange::new(c.min(d), c.max(d));
            let sum = left.add(&right).expect("small ranges cannot overflow");
            prop_assert!(sum.contains_integer(left.minimum + right.minimum));
            prop_assert!(sum.contains_integer(left.maximum + right.maximum));
        }

        #[test]
        fn removed_values_are_gone(values in proptest::collection::vec(0u128..64, 0..40)) {
            let mut set = IntervalSet::new(IntegerRange::new(0, 63));
            let mut removed = std::collections::BTreeSet::new();
            for value in values {
                prop_assert_eq!(set.remove(IntegerRange::single(value)), removed.insert(value));
            }
            for value in 0u128..64 {
                prop_assert_eq!(set.contains(value), !removed.contains(&value));
            }
            for pair in set.ranges().windows(2) {
                prop_assert!(pair[0].maximum + 1 < pair[1].minimum);
            }
        }
    }
}
