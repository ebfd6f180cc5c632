use segalloc::{Heap, Sbrk};

use libc::sbrk;

/// Prints the current program break using `sbrk(0)`.
/// The program break is the upper boundary of the heap managed via brk/sbrk;
/// watching it move shows when the allocator really grows the region.
unsafe fn print_program_break(label: &str) {
  println!(
    "[{}] PID = {}, program break (sbrk(0)) = {:?}",
    label,
    std::process::id(),
    unsafe { sbrk(0) },
  );
}

fn main() {
  // Our allocator over the real program break. It keeps:
  // - a prologue/epilogue bracketing the formatted region
  // - ten size-class buckets of circular free lists
  // - a running total of bytes obtained from sbrk
  let mut heap = match Heap::new(Sbrk) {
    Ok(heap) => heap,
    Err(err) => {
      eprintln!("failed to initialize the heap: {err}");
      return;
    }
  };

  unsafe {
    // Initial heap state: just the prologue and epilogue.
    print_program_break("start");
    println!("[start] formatted region = {} bytes", heap.total_size());

    // --------------------------------------------------------------------
    // 1) Allocate 100 bytes. No free block exists yet, so the heap grows
    //    by at least the 128-byte minimum chunk.
    // --------------------------------------------------------------------
    let first = heap.allocate(100).unwrap();
    println!("\n[1] Allocate 100 bytes at {:?}", first);
    print_program_break("after first alloc");

    // Write something into the allocated memory to show it's usable.
    let first_ptr = first.as_ptr() as *mut u32;
    first_ptr.write(0xDEADBEEF);
    println!("[1] Value written to first block = 0x{:X}", first_ptr.read());

    // --------------------------------------------------------------------
    // 2) Allocate a second block, then free the first. The freed block
    //    lands in the bucket matching its size.
    // --------------------------------------------------------------------
    let second = heap.allocate(100).unwrap();
    println!("\n[2] Allocate 100 more bytes at {:?}", second);

    heap.free(Some(first));
    println!("[2] Freed the first block");
    println!("[2] Heap consistent? {}", heap.check());

    // --------------------------------------------------------------------
    // 3) Allocate the same size again: the freed block is reused, so the
    //    program break does not move.
    // --------------------------------------------------------------------
    let third = heap.allocate(100).unwrap();
    println!("\n[3] Allocate 100 bytes again at {:?}", third);
    println!(
      "[3] third == first? {}",
      if third == first {
        "Yes, it reused the freed block"
      } else {
        "No, it allocated somewhere else"
      }
    );
    print_program_break("after reuse");

    // --------------------------------------------------------------------
    // 4) Shrink the second block in place; the tail is split off and
    //    freed without moving any data.
    // --------------------------------------------------------------------
    let shrunk = heap.reallocate(Some(second), 16).unwrap();
    println!("\n[4] Shrink second block to 16 bytes");
    println!(
      "[4] shrunk == second? {}",
      if shrunk == second { "Yes, resized in place" } else { "No" }
    );

    // --------------------------------------------------------------------
    // 5) Grow the third block. Growth always moves: a fresh block is
    //    allocated, the payload copied, the old block freed.
    // --------------------------------------------------------------------
    let grown = heap.reallocate(Some(third), 1000).unwrap();
    println!("\n[5] Grow third block to 1000 bytes, now at {:?}", grown);
    println!("[5] Payload survived? 0x{:X}", (grown.as_ptr() as *mut u32).read());
    print_program_break("after grow");

    // --------------------------------------------------------------------
    // 6) Free everything and audit the heap. Adjacent free blocks have
    //    merged, and every free block sits in its proper bucket.
    // --------------------------------------------------------------------
    heap.free(Some(shrunk));
    heap.free(Some(grown));
    println!("\n[6] Freed all blocks, heap consistent? {}", heap.check());
    println!(
      "[6] Total bytes ever obtained from sbrk: {} (policy: {:?})",
      heap.total_size(),
      heap.policy(),
    );

    // The region never shrinks; the OS reclaims it all when the process
    // exits.
    print_program_break("end");
  }
}
