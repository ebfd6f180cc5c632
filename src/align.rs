use std::mem;

/// Machine word size in bytes. One boundary tag occupies one word.
pub const WSIZE: usize = mem::size_of::<usize>();

/// Double word size in bytes. Every block size is a multiple of this, and
/// every payload pointer handed to the caller is aligned to it.
pub const DSIZE: usize = 2 * WSIZE;

/// Minimum number of bytes requested from the region when the heap grows.
pub const CHUNKSIZE: usize = 1 << 7;

/// Smallest legal block: header + footer + the two free-list link words a
/// block needs while it sits on a free list.
pub const MIN_BLOCK: usize = 2 * DSIZE;

/// Rounds the given size up to the double-word alignment unit.
///
/// # Examples
///
/// ```rust
/// use std::mem;
/// use segalloc::align;
///
/// match mem::size_of::<usize>() {
///   8 => assert_eq!(align!(17), 32), // 64 bit machine.
///   4 => assert_eq!(align!(11), 16), // 32 bit machine.
///   _ => {},
/// };
/// ```
#[macro_export]
macro_rules! align {
  ($value:expr) => {
    ($value + 2 * mem::size_of::<usize>() - 1) & !(2 * mem::size_of::<usize>() - 1)
  };
}

/// Converts a caller-requested payload size into an adjusted block size:
/// payload plus one word of header, one word of footer, rounded up to the
/// double word, and never below [`MIN_BLOCK`] so a freed block can always
/// hold its own list links.
///
/// Returns `None` when adding the overhead would overflow; such a request
/// can never be satisfied, so the allocator treats it as a failure rather
/// than letting the size wrap to a tiny block.
pub fn adjust_request(size: usize) -> Option<usize> {
  if size <= DSIZE {
    Some(MIN_BLOCK)
  } else {
    let padded = size.checked_add(2 * DSIZE - 1)?;

    Some(DSIZE * (padded / DSIZE))
  }
}

#[cfg(test)]
mod tests {
  use std::mem;

  use super::*;

  #[test]
  fn test_align() {
    let unit = 2 * mem::size_of::<usize>();

    let mut alignments = Vec::new();

    for i in 0..10 {
      let sizes = (unit * i + 1)..=(unit * (i + 1));

      let expected_alignment = unit * (i + 1);

      alignments.push((sizes, expected_alignment));
    }

    for (sizes, expected) in alignments {
      for size in sizes {
        assert_eq!(expected, align!(size));
      }
    }
  }

  #[test]
  fn test_adjust_request_minimum() {
    for size in 1..=DSIZE {
      assert_eq!(Some(MIN_BLOCK), adjust_request(size));
    }
  }

  #[test]
  fn test_adjust_request_overhead_and_alignment() {
    for size in (DSIZE + 1)..(8 * DSIZE) {
      let asize = adjust_request(size).unwrap();

      // Room for the payload plus both tags.
      assert!(asize >= size + DSIZE);
      // Aligned, and never wasting a full extra alignment unit.
      assert_eq!(0, asize % DSIZE);
      assert!(asize < size + 2 * DSIZE);
    }
  }

  #[test]
  fn test_adjust_request_overflow_is_rejected() {
    assert_eq!(None, adjust_request(usize::MAX));
    assert_eq!(None, adjust_request(usize::MAX - DSIZE));
    assert_eq!(None, adjust_request(usize::MAX - (2 * DSIZE - 2)));

    // The largest request whose overhead still fits is accepted.
    let largest = usize::MAX - (2 * DSIZE - 1);
    assert_eq!(Some(DSIZE * (usize::MAX / DSIZE)), adjust_request(largest));
  }
}
