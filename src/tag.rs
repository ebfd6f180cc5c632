//! Boundary tag: one machine word holding a block's size and its
//! allocated flag.
//!
//! The flag lives in the low bit. That bit is always free for the taking
//! because block sizes are multiples of [`DSIZE`], which is at least 2; the
//! constructor asserts the invariant in debug builds rather than relying on
//! it silently.

use crate::align::DSIZE;

/// A packed `(size, allocated)` word, written at both ends of every block.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Tag(usize);

impl Tag {
  pub fn new(
    size: usize,
    alloc: bool,
  ) -> Self {
    debug_assert!(
      size % DSIZE == 0,
      "block size {size} is not a multiple of the alignment unit"
    );

    Self(size | alloc as usize)
  }

  pub fn from_raw(raw: usize) -> Self {
    Self(raw)
  }

  pub fn raw(self) -> usize {
    self.0
  }

  /// The block size, header and footer included.
  pub fn size(self) -> usize {
    self.0 & !(DSIZE - 1)
  }

  pub fn is_alloc(self) -> bool {
    self.0 & 0x1 != 0
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_pack_round_trip() {
    for words in 0..64 {
      let size = words * DSIZE;

      for alloc in [false, true] {
        let tag = Tag::new(size, alloc);

        assert_eq!(size, tag.size());
        assert_eq!(alloc, tag.is_alloc());
      }
    }
  }

  #[test]
  fn test_flag_does_not_disturb_size() {
    let free = Tag::new(6 * DSIZE, false);
    let alloc = Tag::new(6 * DSIZE, true);

    assert_eq!(free.size(), alloc.size());
    assert_eq!(free.raw() | 0x1, alloc.raw());
  }

  #[test]
  fn test_epilogue_tag() {
    // The epilogue is a zero-size allocated header.
    let tag = Tag::new(0, true);

    assert_eq!(0, tag.size());
    assert!(tag.is_alloc());
  }

  #[test]
  fn test_raw_round_trip() {
    let tag = Tag::new(4 * DSIZE, true);

    assert_eq!(tag, Tag::from_raw(tag.raw()));
  }
}
