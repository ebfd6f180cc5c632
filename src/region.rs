//! The growth primitive the allocator sits on.
//!
//! [`Region`] is the seam to the backing memory: a monotonically growing
//! byte range in the spirit of `sbrk`. Two implementations ship with the
//! crate: [`Sbrk`], which really moves the program break, and
//! [`ArenaRegion`], a fixed-capacity simulation the tests run against so
//! they stay deterministic and independent of the process heap.

use std::{alloc, mem, ptr::NonNull};

use libc::{c_void, intptr_t, sbrk};

use crate::{align, align::DSIZE};

/// A monotonically growing memory region.
///
/// Each successful call extends the region by `incr` bytes and returns the
/// address of the newly added span. Spans are contiguous: the span returned
/// by one call ends exactly where the next call's span begins. The region
/// never shrinks.
pub trait Region {
  /// Extends the region, returning the start of the new span, or `None`
  /// once the backing memory is exhausted.
  fn extend(
    &mut self,
    incr: usize,
  ) -> Option<NonNull<u8>>;
}

/// Growth primitive over the real program break.
///
/// The first extension pads the break up to the double-word unit so every
/// span the allocator formats is properly aligned; subsequent extensions
/// keep that alignment because the allocator only requests aligned sizes.
pub struct Sbrk;

impl Region for Sbrk {
  fn extend(
    &mut self,
    incr: usize,
  ) -> Option<NonNull<u8>> {
    unsafe {
      let brk = sbrk(0);

      if brk == usize::MAX as *mut c_void {
        return None;
      }

      let pad = align!(brk as usize) - brk as usize;

      let address = sbrk((pad + incr) as intptr_t);

      if address == usize::MAX as *mut c_void {
        return None;
      }

      NonNull::new((address as *mut u8).add(pad))
    }
  }
}

/// Fixed-capacity in-process region, the test double for [`Sbrk`].
///
/// Plays the role of a trace harness's memory simulator: one aligned
/// buffer obtained up front, handed out span by span, failing cleanly when
/// the capacity runs out.
pub struct ArenaRegion {
  base: *mut u8,
  capacity: usize,
  used: usize,
}

impl ArenaRegion {
  pub fn new(capacity: usize) -> Self {
    let capacity = align!(capacity.max(DSIZE));
    let layout = alloc::Layout::from_size_align(capacity, DSIZE)
      .expect("the double word is a power of two");

    let base = unsafe { alloc::alloc(layout) };
    if base.is_null() {
      alloc::handle_alloc_error(layout);
    }

    Self { base, capacity, used: 0 }
  }

  pub fn capacity(&self) -> usize {
    self.capacity
  }

  pub fn used(&self) -> usize {
    self.used
  }
}

impl Region for ArenaRegion {
  fn extend(
    &mut self,
    incr: usize,
  ) -> Option<NonNull<u8>> {
    if incr > self.capacity - self.used {
      log::debug!(
        "arena exhausted: {incr} bytes requested, {} of {} left",
        self.capacity - self.used,
        self.capacity
      );
      return None;
    }

    let span = unsafe { self.base.add(self.used) };
    self.used += incr;

    NonNull::new(span)
  }
}

impl Drop for ArenaRegion {
  fn drop(&mut self) {
    unsafe {
      let layout = alloc::Layout::from_size_align_unchecked(self.capacity, DSIZE);

      alloc::dealloc(self.base, layout);
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_arena_spans_are_aligned_and_contiguous() {
    let mut region = ArenaRegion::new(1024);

    let first = region.extend(4 * DSIZE).unwrap();
    let second = region.extend(2 * DSIZE).unwrap();

    assert_eq!(0, first.as_ptr() as usize % DSIZE);
    assert_eq!(
      unsafe { first.as_ptr().add(4 * DSIZE) },
      second.as_ptr()
    );
    assert_eq!(6 * DSIZE, region.used());
  }

  #[test]
  fn test_arena_exhaustion_returns_none() {
    let mut region = ArenaRegion::new(4 * DSIZE);

    assert!(region.extend(4 * DSIZE).is_some());
    assert!(region.extend(DSIZE).is_none());

    // Exhaustion is not sticky for smaller requests that still fit.
    let mut partial = ArenaRegion::new(4 * DSIZE);
    assert!(partial.extend(2 * DSIZE).is_some());
    assert!(partial.extend(4 * DSIZE).is_none());
    assert!(partial.extend(2 * DSIZE).is_some());
  }

  #[test]
  fn test_arena_rounds_capacity_up() {
    let region = ArenaRegion::new(DSIZE + 1);

    assert_eq!(2 * DSIZE, region.capacity());
  }
}
