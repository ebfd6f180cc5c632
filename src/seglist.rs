//! Size-class index and per-bucket free lists.
//!
//! Each bucket owns the head of one circular doubly-linked list whose
//! nodes are the free blocks themselves (links stored in their payload
//! bytes, see [`crate::block`]). Bucket coverage with the default ten
//! classes:
//!
//! ```text
//!   0: size <= 2^7        5: 2^11 < size <= 2^12
//!   1: 2^7  < size <= 2^8 6: 2^12 < size <= 2^13
//!   2: 2^8  < size <= 2^9 7: 2^13 < size <= 2^14
//!   3: 2^9  < size <= 2^10 8: 2^14 < size <= 2^15
//!   4: 2^10 < size <= 2^11 9: size > 2^15 (catch-all)
//! ```
//!
//! A store built with a single class degenerates to one unbucketed free
//! list, which is how the simple first-fit policy is expressed.

use crate::block::BlockPtr;

/// Number of buckets in the segregated configuration.
pub const NUM_SIZE_CLASSES: usize = 10;

/// Base exponent: the smallest bucket covers everything up to `2^BASE_SHIFT`.
const BASE_SHIFT: usize = 7;

pub struct SegList {
  heads: [Option<BlockPtr>; NUM_SIZE_CLASSES],
  classes: usize,
}

impl SegList {
  pub fn new(classes: usize) -> Self {
    debug_assert!(classes >= 1 && classes <= NUM_SIZE_CLASSES);

    Self { heads: [None; NUM_SIZE_CLASSES], classes }
  }

  pub fn classes(&self) -> usize {
    self.classes
  }

  pub fn head(
    &self,
    index: usize,
  ) -> Option<BlockPtr> {
    self.heads[index]
  }

  /// Maps a block size to its bucket. Monotonic: a larger size never maps
  /// to a smaller index. The shift is bounded by the bucket count, so any
  /// size up to `usize::MAX` lands in the catch-all bucket.
  pub fn bucket_of(
    &self,
    size: usize,
  ) -> usize {
    let mut index = 0;
    while index < self.classes - 1 && size > (1usize << (BASE_SHIFT + index)) {
      index += 1;
    }

    index
  }

  /// Splices a free block into the bucket matching its current size and
  /// makes it the new head, so the most recently freed block of a class
  /// is the first fit candidate.
  ///
  /// # Safety
  ///
  /// `bp` must be a free block with valid tags, not currently enrolled in
  /// any list, and its size must already be final (post split/coalesce).
  pub unsafe fn insert(
    &mut self,
    bp: BlockPtr,
  ) {
    unsafe {
      let index = self.bucket_of(bp.size());

      match self.heads[index] {
        None => {
          bp.set_next_free(bp);
          bp.set_prev_free(bp);
        }
        Some(head) => {
          bp.set_next_free(head);
          bp.set_prev_free(head.prev_free());
          bp.prev_free().set_next_free(bp);
          bp.next_free().set_prev_free(bp);
        }
      }

      self.heads[index] = Some(bp);
    }
  }

  /// Unlinks a free block from its bucket.
  ///
  /// # Safety
  ///
  /// `bp` must be enrolled in the list of the bucket its current size
  /// maps to.
  pub unsafe fn remove(
    &mut self,
    bp: BlockPtr,
  ) {
    unsafe {
      let index = self.bucket_of(bp.size());

      if bp.next_free() == bp {
        self.heads[index] = None;
      } else {
        bp.prev_free().set_next_free(bp.next_free());
        bp.next_free().set_prev_free(bp.prev_free());

        if self.heads[index] == Some(bp) {
          self.heads[index] = Some(bp.next_free());
        }
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    align::{DSIZE, MIN_BLOCK, WSIZE},
    tag::Tag,
  };

  fn arena() -> Vec<usize> {
    vec![0usize; 256]
  }

  unsafe fn free_block(
    base: *mut u8,
    offset: usize,
    size: usize,
  ) -> BlockPtr {
    unsafe {
      let bp = BlockPtr::from_payload(base.add(offset + WSIZE));

      bp.set_header(Tag::new(size, false));
      bp.set_footer(Tag::new(size, false));

      bp
    }
  }

  unsafe fn collect(
    lists: &SegList,
    index: usize,
  ) -> Vec<BlockPtr> {
    unsafe {
      let mut out = Vec::new();

      if let Some(head) = lists.head(index) {
        let mut curr = head;
        loop {
          out.push(curr);
          curr = curr.next_free();
          if curr == head {
            break;
          }
        }
      }

      out
    }
  }

  #[test]
  fn test_bucket_of_thresholds() {
    let lists = SegList::new(NUM_SIZE_CLASSES);

    assert_eq!(0, lists.bucket_of(MIN_BLOCK));
    assert_eq!(0, lists.bucket_of(128));
    assert_eq!(1, lists.bucket_of(128 + DSIZE));
    assert_eq!(1, lists.bucket_of(256));
    assert_eq!(2, lists.bucket_of(256 + DSIZE));
    assert_eq!(8, lists.bucket_of(1 << 15));
    assert_eq!(9, lists.bucket_of((1 << 15) + DSIZE));
    assert_eq!(9, lists.bucket_of(1 << 20));
  }

  #[test]
  fn test_bucket_of_monotonic() {
    let lists = SegList::new(NUM_SIZE_CLASSES);

    let mut last = 0;
    for size in (MIN_BLOCK..(1 << 16)).step_by(DSIZE) {
      let index = lists.bucket_of(size);

      assert!(index >= last);
      last = index;
    }
  }

  #[test]
  fn test_single_class_collapses_index() {
    let lists = SegList::new(1);

    assert_eq!(0, lists.bucket_of(MIN_BLOCK));
    assert_eq!(0, lists.bucket_of(1 << 20));
  }

  #[test]
  fn test_bucket_of_huge_sizes_hit_the_catch_all() {
    let lists = SegList::new(NUM_SIZE_CLASSES);

    assert_eq!(NUM_SIZE_CLASSES - 1, lists.bucket_of(usize::MAX / 2));
    assert_eq!(NUM_SIZE_CLASSES - 1, lists.bucket_of(usize::MAX));

    let single = SegList::new(1);
    assert_eq!(0, single.bucket_of(usize::MAX));
  }

  #[test]
  fn test_insert_singleton_is_self_referential() {
    let mut mem = arena();
    let base = mem.as_mut_ptr() as *mut u8;
    let mut lists = SegList::new(NUM_SIZE_CLASSES);

    unsafe {
      let bp = free_block(base, 0, MIN_BLOCK);

      lists.insert(bp);

      assert_eq!(Some(bp), lists.head(0));
      assert_eq!(bp, bp.next_free());
      assert_eq!(bp, bp.prev_free());
    }
  }

  #[test]
  fn test_insert_makes_newest_block_the_head() {
    let mut mem = arena();
    let base = mem.as_mut_ptr() as *mut u8;
    let mut lists = SegList::new(NUM_SIZE_CLASSES);

    unsafe {
      let a = free_block(base, 0, MIN_BLOCK);
      let b = free_block(base, MIN_BLOCK, MIN_BLOCK);
      let c = free_block(base, 2 * MIN_BLOCK, MIN_BLOCK);

      lists.insert(a);
      lists.insert(b);
      lists.insert(c);

      assert_eq!(Some(c), lists.head(0));
      assert_eq!(vec![c, b, a], collect(&lists, 0));
    }
  }

  #[test]
  fn test_blocks_route_to_their_own_buckets() {
    let mut mem = arena();
    let base = mem.as_mut_ptr() as *mut u8;
    let mut lists = SegList::new(NUM_SIZE_CLASSES);

    unsafe {
      let small = free_block(base, 0, MIN_BLOCK);
      let large = free_block(base, MIN_BLOCK, 160);

      lists.insert(small);
      lists.insert(large);

      assert_eq!(vec![small], collect(&lists, 0));
      assert_eq!(vec![large], collect(&lists, 1));
    }
  }

  #[test]
  fn test_remove_singleton_empties_bucket() {
    let mut mem = arena();
    let base = mem.as_mut_ptr() as *mut u8;
    let mut lists = SegList::new(NUM_SIZE_CLASSES);

    unsafe {
      let bp = free_block(base, 0, MIN_BLOCK);

      lists.insert(bp);
      lists.remove(bp);

      assert_eq!(None, lists.head(0));
    }
  }

  #[test]
  fn test_remove_head_moves_head_forward() {
    let mut mem = arena();
    let base = mem.as_mut_ptr() as *mut u8;
    let mut lists = SegList::new(NUM_SIZE_CLASSES);

    unsafe {
      let a = free_block(base, 0, MIN_BLOCK);
      let b = free_block(base, MIN_BLOCK, MIN_BLOCK);
      let c = free_block(base, 2 * MIN_BLOCK, MIN_BLOCK);

      lists.insert(a);
      lists.insert(b);
      lists.insert(c);

      lists.remove(c);

      assert_eq!(Some(b), lists.head(0));
      assert_eq!(vec![b, a], collect(&lists, 0));
    }
  }

  #[test]
  fn test_remove_interior_node() {
    let mut mem = arena();
    let base = mem.as_mut_ptr() as *mut u8;
    let mut lists = SegList::new(NUM_SIZE_CLASSES);

    unsafe {
      let a = free_block(base, 0, MIN_BLOCK);
      let b = free_block(base, MIN_BLOCK, MIN_BLOCK);
      let c = free_block(base, 2 * MIN_BLOCK, MIN_BLOCK);

      lists.insert(a);
      lists.insert(b);
      lists.insert(c);

      lists.remove(b);

      assert_eq!(vec![c, a], collect(&lists, 0));
      assert_eq!(a, c.next_free());
      assert_eq!(c, a.next_free());
    }
  }
}
