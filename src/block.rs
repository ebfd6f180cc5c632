//! Typed view over a raw block inside the heap region.
//!
//! A [`BlockPtr`] wraps the block's *payload* address. The header sits one
//! word below it, the footer one word before the block's end:
//!
//! ```text
//!             payload pointer (double-word aligned)
//!             │
//!   ┌─────────▼────────────────────────────────────┬──────────┐
//!   │ header  │ payload                            │ footer   │
//!   │ size|a  │ (free: prev/next links live here)  │ size|a   │
//!   └─────────┴────────────────────────────────────┴──────────┘
//!   ◄──────────────────── size ─────────────────────────────►
//! ```
//!
//! While a block is free, the first two payload words hold its circular
//! free-list links (`prev` then `next`). The moment the block is marked
//! allocated those bytes belong to the caller, so the link accessors must
//! not be used past that transition.

use std::ptr;

use crate::{align::DSIZE, align::WSIZE, tag::Tag};

/// Handle to one block, identified by its payload address.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct BlockPtr(*mut u8);

impl BlockPtr {
  /// Wraps a payload pointer obtained from the heap.
  ///
  /// # Safety
  ///
  /// `payload` must point one word past a valid boundary-tag header inside
  /// a formatted heap region.
  pub unsafe fn from_payload(payload: *mut u8) -> Self {
    Self(payload)
  }

  pub fn payload(self) -> *mut u8 {
    self.0
  }

  unsafe fn header_ptr(self) -> *mut usize {
    unsafe { self.0.sub(WSIZE) as *mut usize }
  }

  unsafe fn footer_ptr(self) -> *mut usize {
    // The footer position follows from the size currently in the header.
    unsafe { self.0.add(self.size()).sub(DSIZE) as *mut usize }
  }

  pub unsafe fn header(self) -> Tag {
    unsafe { Tag::from_raw(ptr::read(self.header_ptr())) }
  }

  pub unsafe fn set_header(
    self,
    tag: Tag,
  ) {
    unsafe { ptr::write(self.header_ptr(), tag.raw()) }
  }

  pub unsafe fn footer(self) -> Tag {
    unsafe { Tag::from_raw(ptr::read(self.footer_ptr())) }
  }

  /// Writes the footer at the position implied by the *current* header
  /// size. Callers that change both tags must therefore write the footer
  /// first, or write the header last, depending on which end moves.
  pub unsafe fn set_footer(
    self,
    tag: Tag,
  ) {
    unsafe { ptr::write(self.footer_ptr(), tag.raw()) }
  }

  pub unsafe fn size(self) -> usize {
    unsafe { self.header().size() }
  }

  pub unsafe fn is_alloc(self) -> bool {
    unsafe { self.header().is_alloc() }
  }

  /// The next block in address order.
  pub unsafe fn next(self) -> Self {
    unsafe { Self(self.0.add(self.size())) }
  }

  /// The previous block in address order, located through its footer,
  /// which sits immediately below this block's header.
  pub unsafe fn prev(self) -> Self {
    unsafe {
      let prev_footer = Tag::from_raw(ptr::read(self.0.sub(DSIZE) as *const usize));

      Self(self.0.sub(prev_footer.size()))
    }
  }

  unsafe fn link_prev_ptr(self) -> *mut *mut u8 {
    self.0 as *mut *mut u8
  }

  unsafe fn link_next_ptr(self) -> *mut *mut u8 {
    unsafe { self.0.add(WSIZE) as *mut *mut u8 }
  }

  /// Reads the previous-free link. Only meaningful while the block is
  /// free and enrolled in a bucket list.
  pub unsafe fn prev_free(self) -> Self {
    unsafe { Self(ptr::read(self.link_prev_ptr())) }
  }

  pub unsafe fn next_free(self) -> Self {
    unsafe { Self(ptr::read(self.link_next_ptr())) }
  }

  pub unsafe fn set_prev_free(
    self,
    bp: Self,
  ) {
    unsafe { ptr::write(self.link_prev_ptr(), bp.0) }
  }

  pub unsafe fn set_next_free(
    self,
    bp: Self,
  ) {
    unsafe { ptr::write(self.link_next_ptr(), bp.0) }
  }
}
