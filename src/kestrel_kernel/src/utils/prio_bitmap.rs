//! Fixed-size bitmap tracking which priority levels are occupied.

/// A set of priority levels with O(1) find-first-set. One bit per level,
/// bit 0 being the most urgent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct PrioBitmap(u16);

impl PrioBitmap {
    pub(crate) const fn new() -> Self {
        Self(0)
    }

    pub(crate) fn set(&mut self, level: usize) {
        debug_assert!(level < u16::BITS as usize);
        self.0 |= 1 << level;
    }

    pub(crate) fn clear(&mut self, level: usize) {
        debug_assert!(level < u16::BITS as usize);
        self.0 &= !(1 << level);
    }

    /// The lowest set bit, i.e. the most urgent occupied level.
    pub(crate) fn find_set(&self) -> Option<usize> {
        if self.0 == 0 {
            None
        } else {
            Some(self.0.trailing_zeros() as usize)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn find_set_returns_most_urgent() {
        let mut bitmap = PrioBitmap::new();
        assert_eq!(bitmap.find_set(), None);
        bitmap.set(9);
        bitmap.set(3);
        bitmap.set(14);
        assert_eq!(bitmap.find_set(), Some(3));
        bitmap.clear(3);
        assert_eq!(bitmap.find_set(), Some(9));
        bitmap.clear(9);
        assert_eq!(bitmap.find_set(), Some(14));
    }
}
