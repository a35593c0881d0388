mod binary_heap;
mod prio_bitmap;

pub(crate) use self::{binary_heap::*, prio_bitmap::*};
