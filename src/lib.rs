//! # segalloc - A Segregated-Fit Memory Allocator Library
//!
//! This crate provides a general-purpose **segregated-fit allocator** with
//! boundary tags, built on an `sbrk`-style heap-growth primitive.
//!
//! ## Overview
//!
//! Free space is managed through size-class buckets, each holding one
//! circular doubly-linked list of free blocks:
//!
//! ```text
//!   Segregated Fit Concept:
//!
//!   ┌──────────────────────────────────────────────────────────────────────┐
//!   │                         HEAP REGION                                  │
//!   │                                                                      │
//!   │   ┌──────┬──────┬──────┬──────┬──────┬──────┬──────┬──────────────┐  │
//!   │   │ PRO  │  A1  │ free │  A2  │ free │  A3  │ free │   EPILOGUE   │  │
//!   │   └──────┴──────┴──▲───┴──────┴──▲───┴──────┴──▲───┴──────────────┘  │
//!   │                    │             │             │                     │
//!   │      buckets:      │             │             │                     │
//!   │      [ <=128 ]─────┘             │             │                     │
//!   │      [ <=256 ]───────────────────┘             │                     │
//!   │      [ ...   ]                                 │                     │
//!   │      [ large ]─────────────────────────────────┘                     │
//!   │                                                                      │
//!   └──────────────────────────────────────────────────────────────────────┘
//!
//!   Allocation scans buckets from the request's size class upward.
//!   Freed blocks merge with free neighbors before they are re-enrolled.
//! ```
//!
//! ## Crate Structure
//!
//! ```text
//!   segalloc
//!   ├── align      - Alignment constants, align! macro, request adjustment
//!   ├── tag        - Boundary tag word (size | allocated flag) (internal)
//!   ├── block      - Typed view over a raw block (internal)
//!   ├── seglist    - Size-class index and bucket free lists (internal)
//!   ├── region     - Growth primitive: Region trait, Sbrk, ArenaRegion
//!   └── heap       - Heap: allocate / free / reallocate / check
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use segalloc::{ArenaRegion, Heap};
//!
//! let mut heap = Heap::new(ArenaRegion::new(4096)).unwrap();
//!
//! // Allocate 100 bytes.
//! let ptr = heap.allocate(100).unwrap();
//!
//! // Use the memory...
//!
//! unsafe {
//!     // Free the memory.
//!     heap.free(Some(ptr));
//! }
//!
//! assert!(heap.check());
//! ```
//!
//! Swap [`ArenaRegion`] for [`Sbrk`] to run against the real program
//! break.
//!
//! ## How It Works
//!
//! Every block carries its size and allocated flag in a tagged word at
//! both ends, so the block sequence can be walked in either direction:
//!
//! ```text
//!   Single Block:
//!   ┌──────────┬─────────────────────────────────────────────┬──────────┐
//!   │ header   │                payload                      │ footer   │
//!   │ size | a │  (free blocks keep prev/next links here)    │ size | a │
//!   └──────────┴─────────────────────────────────────────────┴──────────┘
//!              ▲
//!              └── Pointer returned to user (double-word aligned)
//! ```
//!
//! Freeing a block merges it immediately with any free neighbor, found
//! through the neighbor's boundary tags, then enrolls the merged block in
//! the bucket matching its final size. When no free block fits a request,
//! the heap grows by at least 128 bytes and the new span merges with a
//! trailing free block before it is committed.
//!
//! ## Features
//!
//! - **Segregated free lists**: bucket lookup bounds fit-search cost
//! - **Immediate coalescing**: no two adjacent free blocks ever persist
//! - **Split on allocation**: oversized fits shed a reusable remainder
//! - **Pluggable fit policy**: a single-list, never-splitting variant via
//!   [`FitPolicy::SingleList`]
//! - **Heap validator**: [`Heap::check`] audits tag/list coherence
//!
//! ## Limitations
//!
//! - **Single-threaded only**: no synchronization primitives
//! - **No heap shrinkage**: the region grows monotonically
//! - **No in-place realloc growth**: growing always copies, even when the
//!   next block is free
//! - **No invalid-pointer defense**: freeing a pointer this allocator
//!   never returned is undefined behavior
//!
//! ## Safety
//!
//! Allocation itself is safe; releasing or resizing memory requires
//! `unsafe` because the allocator cannot verify that a pointer is a live
//! allocation of this heap.

pub mod align;
mod block;
mod heap;
pub mod region;
mod seglist;
mod tag;

pub use heap::{FitPolicy, Heap, HeapError};
pub use region::{ArenaRegion, Region, Sbrk};
