//! Binary heap with a contextful comparator and position tracking
//!
//! The implementation is mostly based on the Rust standard library's
//! `BinaryHeap`, with the hole optimization replaced by plain swaps.
use arrayvec::ArrayVec;

/// Context type for [`BinaryHeap`]'s operations.
pub trait BinaryHeapCtx<Element> {
    /// Return `true` iff `x < y`.
    fn lt(&mut self, x: &Element, y: &Element) -> bool;

    /// Called when the element `e` is moved to the new position `new_index`.
    fn on_move(&mut self, e: &mut Element, new_index: usize) {
        let _ = (e, new_index);
    }
}

impl<T: Ord> BinaryHeapCtx<T> for () {
    fn lt(&mut self, x: &T, y: &T) -> bool {
        *x < *y
    }
}

/// Min-heap.
pub trait BinaryHeap {
    type Element;

    /// Remove the least item from the heap and return it.
    fn heap_pop(&mut self, ctx: impl BinaryHeapCtx<Self::Element>) -> Option<Self::Element>;

    /// Remove the item at the specified position and return it.
    fn heap_remove(
        &mut self,
        i: usize,
        ctx: impl BinaryHeapCtx<Self::Element>,
    ) -> Option<Self::Element>;

    /// Push an item onto the heap and return its position.
    fn heap_push(&mut self, item: Self::Element, ctx: impl BinaryHeapCtx<Self::Element>) -> usize;
}

impl<T, const N: usize> BinaryHeap for ArrayVec<T, N> {
    type Element = T;

    fn heap_pop(&mut self, ctx: impl BinaryHeapCtx<T>) -> Option<T> {
        self.heap_remove(0, ctx)
    }

    fn heap_remove(&mut self, i: usize, mut ctx: impl BinaryHeapCtx<T>) -> Option<T> {
        if i >= self.len() {
            return None;
        }

        if let Some(mut item) = self.pop() {
            let slice = &mut self[..];
            if i < slice.len() {
                // Swap the last item with the item at `i`
                core::mem::swap(&mut slice[i], &mut item);
                ctx.on_move(&mut slice[i], i);

                let should_sift_up = i > 0 && ctx.lt(&slice[i], &slice[(i - 1) / 2]);

                // Sift the item at `i` down or up, restoring the invariant
                if should_sift_up {
                    sift_up(slice, 0, i, ctx);
                } else {
                    sift_down(slice, i, ctx);
                }
            }
            Some(item)
        } else {
            debug_assert!(false);
            None
        }
    }

    fn heap_push(&mut self, item: T, ctx: impl BinaryHeapCtx<T>) -> usize {
        let i = self.len();
        self.push(item);

        let slice = &mut self[..];
        sift_up(slice, 0, i, ctx)
    }
}

/// Move the element at `pos` up toward `start` while it is smaller than its
/// parent. Returns the final position.
fn sift_up<Element>(
    this: &mut [Element],
    start: usize,
    mut pos: usize,
    mut ctx: impl BinaryHeapCtx<Element>,
) -> usize {
    while pos > start {
        let parent = (pos - 1) / 2;
        if !ctx.lt(&this[pos], &this[parent]) {
            break;
        }

        this.swap(pos, parent);

        // `[pos]` is now filled with the element moved from `[parent]`
        ctx.on_move(&mut this[pos], pos);
        pos = parent;
    }

    // Report the final position of the newly-inserted element
    ctx.on_move(&mut this[pos], pos);
    pos
}

/// Take an element at `pos` and move it down the heap,
/// while its children are smaller.
fn sift_down<Element>(this: &mut [Element], mut pos: usize, mut ctx: impl BinaryHeapCtx<Element>) {
    let end = this.len();
    loop {
        let mut child = 2 * pos + 1;
        if child >= end {
            break;
        }

        let right = child + 1;
        // compare with the lesser of the two children
        if right < end && !ctx.lt(&this[child], &this[right]) {
            child = right;
        }

        // if we are already in order, stop.
        if !ctx.lt(&this[child], &this[pos]) {
            break;
        }

        this.swap(pos, child);

        // `[pos]` is now filled with the element moved from `[child]`
        ctx.on_move(&mut this[pos], pos);
        pos = child;
    }

    ctx.on_move(&mut this[pos], pos);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pop_returns_sorted_order() {
        let mut heap: ArrayVec<u32, 16> = ArrayVec::new();
        for &x in &[7, 3, 9, 1, 5, 8, 2, 6, 4, 0] {
            heap.heap_push(x, ());
        }
        let mut out = Vec::new();
        while let Some(x) = heap.heap_pop(()) {
            out.push(x);
        }
        assert_eq!(out, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn remove_preserves_heap_property() {
        let mut heap: ArrayVec<u32, 16> = ArrayVec::new();
        for &x in &[4, 1, 3, 2, 5] {
            heap.heap_push(x, ());
        }
        // remove an interior element
        let i = heap.iter().position(|&x| x == 3).unwrap();
        assert_eq!(heap.heap_remove(i, ()), Some(3));
        let mut out = Vec::new();
        while let Some(x) = heap.heap_pop(()) {
            out.push(x);
        }
        assert_eq!(out, vec![1, 2, 4, 5]);
    }

    /// Heap elements carrying their own position, maintained by `on_move`.
    #[derive(Debug, PartialEq)]
    struct Tracked {
        key: u32,
        pos: usize,
    }

    struct TrackCtx;

    impl BinaryHeapCtx<Tracked> for TrackCtx {
        fn lt(&mut self, x: &Tracked, y: &Tracked) -> bool {
            x.key < y.key
        }

        fn on_move(&mut self, e: &mut Tracked, new_index: usize) {
            e.pos = new_index;
        }
    }

    #[test]
    fn positions_track_moves() {
        let mut heap: ArrayVec<Tracked, 16> = ArrayVec::new();
        for key in [9, 2, 7, 4, 8, 1, 3] {
            heap.heap_push(Tracked { key, pos: usize::MAX }, TrackCtx);
        }
        for (i, e) in heap.iter().enumerate() {
            assert_eq!(e.pos, i, "{e:?} has a stale position");
        }
        heap.heap_remove(2, TrackCtx);
        heap.heap_pop(TrackCtx);
        for (i, e) in heap.iter().enumerate() {
            assert_eq!(e.pos, i, "{e:?} has a stale position");
        }
    }
}
