//! The allocator proper: segregated-fit free-space management over a
//! [`Region`].
//!
//! A [`Heap`] owns the whole allocator state (region handle, bucket
//! heads, heap bounds), so independent instances coexist and tests stay
//! isolated. The heap region is bracketed by a two-word allocated
//! prologue and a zero-size allocated epilogue header, so coalescing and
//! the address-order walk never step outside the formatted range:
//!
//! ```text
//!   ┌─────┬──────────┬──────────┬───────────────────────┬──────────┐
//!   │ pad │ prologue │ prologue │ real blocks ...       │ epilogue │
//!   │     │ header   │ footer   │                       │ header   │
//!   └─────┴──────────┴──────────┴───────────────────────┴──────────┘
//! ```

use std::{
  cmp, fmt,
  ptr::{self, NonNull},
};

use crate::{
  align::{CHUNKSIZE, DSIZE, MIN_BLOCK, WSIZE, adjust_request},
  block::BlockPtr,
  region::{Region, Sbrk},
  seglist::{NUM_SIZE_CLASSES, SegList},
  tag::Tag,
};

/// Free-space management policy, fixed at construction.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum FitPolicy {
  /// Ten size-class buckets; a located block is split when the remainder
  /// could satisfy another request of the same size. This remainder rule
  /// is deliberately stricter than "remainder fits a minimum block": the
  /// fragment left behind is always immediately useful, at the cost of
  /// some internal slack.
  #[default]
  Segregated,
  /// One unbucketed free list, first fit, never splits. Simpler
  /// bookkeeping, weaker space utilization.
  SingleList,
}

impl FitPolicy {
  fn classes(self) -> usize {
    match self {
      Self::Segregated => NUM_SIZE_CLASSES,
      Self::SingleList => 1,
    }
  }

  fn splits(self) -> bool {
    matches!(self, Self::Segregated)
  }
}

/// Failure to obtain backing memory while formatting the initial heap.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum HeapError {
  RegionExhausted,
}

impl fmt::Display for HeapError {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    match self {
      Self::RegionExhausted => write!(f, "growth primitive exhausted"),
    }
  }
}

impl std::error::Error for HeapError {}

/// A dynamic memory allocator over a monotonically growing region.
pub struct Heap<R: Region = Sbrk> {
  region: R,
  /// The prologue block; the address-order walk starts here.
  base: BlockPtr,
  /// Total bytes obtained from the region, initial formatting included.
  heap_size: usize,
  lists: SegList,
  policy: FitPolicy,
}

impl<R: Region> Heap<R> {
  /// Initializes an allocator with the default segregated-fit policy.
  pub fn new(region: R) -> Result<Self, HeapError> {
    Self::with_policy(region, FitPolicy::default())
  }

  /// Initializes an allocator: obtains four words from the region and
  /// formats the padding word, the prologue and the epilogue.
  pub fn with_policy(
    mut region: R,
    policy: FitPolicy,
  ) -> Result<Self, HeapError> {
    let start = region
      .extend(4 * WSIZE)
      .ok_or(HeapError::RegionExhausted)?
      .as_ptr();

    let base = unsafe {
      ptr::write(start as *mut usize, 0); // alignment padding
      ptr::write(start.add(WSIZE) as *mut usize, Tag::new(DSIZE, true).raw()); // prologue header
      ptr::write(start.add(2 * WSIZE) as *mut usize, Tag::new(DSIZE, true).raw()); // prologue footer
      ptr::write(start.add(3 * WSIZE) as *mut usize, Tag::new(0, true).raw()); // epilogue header

      BlockPtr::from_payload(start.add(DSIZE))
    };

    Ok(Self {
      region,
      base,
      heap_size: 4 * WSIZE,
      lists: SegList::new(policy.classes()),
      policy,
    })
  }

  pub fn policy(&self) -> FitPolicy {
    self.policy
  }

  /// Total bytes obtained from the growth primitive so far.
  pub fn total_size(&self) -> usize {
    self.heap_size
  }

  /// Allocates `size` bytes of double-word aligned memory.
  ///
  /// Returns `None` for a zero-size request, for a request so large that
  /// adding the block overhead overflows, or when the region is
  /// exhausted; no case is retried.
  pub fn allocate(
    &mut self,
    size: usize,
  ) -> Option<NonNull<u8>> {
    if size == 0 {
      return None;
    }

    let asize = adjust_request(size)?;

    unsafe {
      if let Some(bp) = self.find_fit(asize) {
        self.place(bp, asize);
        return NonNull::new(bp.payload());
      }

      let bp = self.extend(cmp::max(asize, CHUNKSIZE) / WSIZE)?;
      self.place(bp, asize);

      NonNull::new(bp.payload())
    }
  }

  /// Releases an allocation: marks it free, merges it with any free
  /// neighbor and enrolls the result in its bucket. A `None` pointer is
  /// a no-op.
  ///
  /// # Safety
  ///
  /// `ptr` must be `None` or a currently-live pointer returned by
  /// [`allocate`](Self::allocate) or [`reallocate`](Self::reallocate) on
  /// this very heap; anything else is undefined behavior, exactly as for
  /// the classic allocators.
  pub unsafe fn free(
    &mut self,
    ptr: Option<NonNull<u8>>,
  ) {
    let Some(p) = ptr else {
      return;
    };

    unsafe {
      let bp = BlockPtr::from_payload(p.as_ptr());
      let size = bp.size();

      bp.set_header(Tag::new(size, false));
      bp.set_footer(Tag::new(size, false));

      let merged = self.coalesce(bp);
      self.lists.insert(merged);
    }
  }

  /// Resizes an allocation.
  ///
  /// `None` behaves as [`allocate`](Self::allocate); size zero behaves as
  /// [`free`](Self::free) and yields `None`. An unchanged adjusted size
  /// returns the pointer as is; a shrink that leaves at least a
  /// minimum-size remainder splits in place and frees the tail. Any other
  /// case allocates fresh memory, copies the lesser of the old and new
  /// payload sizes and frees the old block; growing in place by merging
  /// with a free successor is deliberately not attempted. A request whose
  /// block overhead overflows yields `None` and leaves the block live.
  ///
  /// # Safety
  ///
  /// Same contract as [`free`](Self::free).
  pub unsafe fn reallocate(
    &mut self,
    ptr: Option<NonNull<u8>>,
    size: usize,
  ) -> Option<NonNull<u8>> {
    unsafe {
      if size == 0 {
        self.free(ptr);
        return None;
      }

      let Some(p) = ptr else {
        return self.allocate(size);
      };

      let bp = BlockPtr::from_payload(p.as_ptr());
      let new_asize = adjust_request(size)?;
      let old_asize = bp.size();

      if new_asize == old_asize {
        return Some(p);
      }

      if new_asize < old_asize {
        let rsize = old_asize - new_asize;

        if rsize >= MIN_BLOCK {
          bp.set_header(Tag::new(new_asize, true));
          bp.set_footer(Tag::new(new_asize, true));

          let rp = BlockPtr::from_payload(bp.payload().add(new_asize));
          rp.set_header(Tag::new(rsize, false));
          rp.set_footer(Tag::new(rsize, false));

          let merged = self.coalesce(rp);
          self.lists.insert(merged);
        }

        return Some(p);
      }

      let new = self.allocate(size)?;
      let copy = cmp::min(size, old_asize - DSIZE);

      ptr::copy_nonoverlapping(p.as_ptr(), new.as_ptr(), copy);
      self.free(Some(p));

      Some(new)
    }
  }

  /// Scans buckets from the request's size class upward and takes the
  /// first adequately sized block, removing it from its list.
  unsafe fn find_fit(
    &mut self,
    asize: usize,
  ) -> Option<BlockPtr> {
    unsafe {
      for index in self.lists.bucket_of(asize)..self.lists.classes() {
        let Some(head) = self.lists.head(index) else {
          continue;
        };

        let mut curr = head;
        loop {
          if curr.size() >= asize {
            self.lists.remove(curr);
            return Some(curr);
          }

          curr = curr.next_free();
          if curr == head {
            break;
          }
        }
      }

      None
    }
  }

  /// Commits a block (not enrolled in any list) to an allocation of
  /// `asize` bytes. Under a splitting policy the high part becomes a new
  /// free block when the remainder could serve another `asize` request.
  unsafe fn place(
    &mut self,
    bp: BlockPtr,
    asize: usize,
  ) {
    unsafe {
      let bsize = bp.size();
      let rsize = bsize - asize;

      if self.policy.splits() && rsize >= asize {
        bp.set_header(Tag::new(asize, true));
        bp.set_footer(Tag::new(asize, true));

        let rp = BlockPtr::from_payload(bp.payload().add(asize));
        rp.set_header(Tag::new(rsize, false));
        rp.set_footer(Tag::new(rsize, false));
        self.lists.insert(rp);
      } else {
        bp.set_header(Tag::new(bsize, true));
        bp.set_footer(Tag::new(bsize, true));
      }
    }
  }

  /// Merges a free block with its free address-order neighbors, removing
  /// absorbed neighbors from their buckets. Returns the merged block
  /// without enrolling it; that is the caller's job once the size is
  /// final. One pass suffices: only one block changes state at a time, so
  /// the result never has a free neighbor.
  unsafe fn coalesce(
    &mut self,
    bp: BlockPtr,
  ) -> BlockPtr {
    unsafe {
      let prev = bp.prev();
      let next = bp.next();
      // The previous neighbor is reached through its footer, the next one
      // through its header; tags at both ends always agree.
      let prev_alloc = prev.footer().is_alloc();
      let next_alloc = next.is_alloc();
      let size = bp.size();

      match (prev_alloc, next_alloc) {
        (true, true) => bp,
        (true, false) => {
          self.lists.remove(next);

          let size = size + next.size();
          bp.set_header(Tag::new(size, false));
          bp.set_footer(Tag::new(size, false));

          bp
        }
        (false, true) => {
          self.lists.remove(prev);

          let size = size + prev.size();
          // Footer first: its position still follows from bp's old header.
          bp.set_footer(Tag::new(size, false));
          prev.set_header(Tag::new(size, false));

          prev
        }
        (false, false) => {
          self.lists.remove(prev);
          self.lists.remove(next);

          let size = size + prev.size() + next.size();
          next.set_footer(Tag::new(size, false));
          prev.set_header(Tag::new(size, false));

          prev
        }
      }
    }
  }

  /// Grows the heap by `words` words (rounded up to an even count),
  /// formats the new span as one free block followed by a fresh epilogue
  /// and merges it with a trailing free neighbor. The result is not
  /// enrolled in any list.
  unsafe fn extend(
    &mut self,
    words: usize,
  ) -> Option<BlockPtr> {
    let size = if words % 2 == 1 { (words + 1) * WSIZE } else { words * WSIZE };

    let start = self.region.extend(size)?;
    self.heap_size += size;

    log::trace!("heap grown by {size} bytes to {} total", self.heap_size);

    unsafe {
      // The new span starts right after the old epilogue header, which
      // now becomes this block's header.
      let bp = BlockPtr::from_payload(start.as_ptr());

      bp.set_header(Tag::new(size, false));
      bp.set_footer(Tag::new(size, false));
      bp.next().set_header(Tag::new(0, true)); // new epilogue

      Some(self.coalesce(bp))
    }
  }

  /// Walks every bucket list and the whole block sequence, confirming
  /// tag/list coherence. Diagnostic hook for development and tests, not
  /// part of normal operation; violations are logged.
  pub fn check(&self) -> bool {
    unsafe {
      self.enrolled_blocks_are_free()
        && self.free_blocks_are_enrolled()
        && self.enrolled_blocks_are_in_bounds()
    }
  }

  unsafe fn enrolled_blocks_are_free(&self) -> bool {
    unsafe {
      for index in 0..self.lists.classes() {
        let Some(head) = self.lists.head(index) else {
          continue;
        };

        let mut curr = head;
        loop {
          if curr.is_alloc() {
            log::error!(
              "consistency check failed: allocated block {:p} enrolled in bucket {index}",
              curr.payload()
            );
            return false;
          }

          curr = curr.next_free();
          if curr == head {
            break;
          }
        }
      }

      true
    }
  }

  unsafe fn free_blocks_are_enrolled(&self) -> bool {
    unsafe {
      let mut bp = self.base;

      while bp.size() > 0 {
        if !bp.is_alloc() && !self.is_enrolled(bp) {
          log::error!(
            "consistency check failed: free block {:p} not reachable from any bucket",
            bp.payload()
          );
          return false;
        }

        bp = bp.next();
      }

      true
    }
  }

  unsafe fn is_enrolled(
    &self,
    bp: BlockPtr,
  ) -> bool {
    unsafe {
      for index in self.lists.bucket_of(bp.size())..self.lists.classes() {
        let Some(head) = self.lists.head(index) else {
          continue;
        };

        let mut curr = head;
        loop {
          if curr == bp {
            return true;
          }

          curr = curr.next_free();
          if curr == head {
            break;
          }
        }
      }

      false
    }
  }

  unsafe fn enrolled_blocks_are_in_bounds(&self) -> bool {
    unsafe {
      let lo = self.base.payload() as usize;
      let hi = lo + self.heap_size;

      for index in 0..self.lists.classes() {
        let Some(head) = self.lists.head(index) else {
          continue;
        };

        let mut curr = head;
        loop {
          let addr = curr.payload() as usize;

          if addr < lo || addr > hi {
            log::error!(
              "consistency check failed: enrolled block {:p} outside heap bounds",
              curr.payload()
            );
            return false;
          }

          curr = curr.next_free();
          if curr == head {
            break;
          }
        }
      }

      true
    }
  }
}
