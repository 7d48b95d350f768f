use std::{io::Read, ptr};

use brkalloc::{Heap, ProgramBreak, SystemBreak};

/// Waits until the user presses ENTER.
/// Useful when you want to inspect memory state with tools like `pmap`, `htop`,
/// `gdb`, or just visually track how allocations change the program break.
fn block_until_enter_pressed() {
  println!("\n>>> Press ENTER to continue...");
  let _ = std::io::stdin().bytes().next();
}

/// Prints the current program break.
fn print_program_break(label: &str) {
  println!(
    "[{}] PID = {}, program break = {:?}",
    label,
    std::process::id(),
    unsafe { SystemBreak.brk(ptr::null_mut()) },
  );
}

fn print_alloc(
  size: usize,
  addr: *mut u8,
) {
  println!(
    "Allocated {} bytes, address = {:?}, program break = {:?}",
    size,
    addr,
    unsafe { SystemBreak.brk(ptr::null_mut()) }
  );
}

fn print_blocks(heap: &Heap) {
  for (n, block) in heap.blocks().enumerate() {
    println!(
      "    #{} header = {:?}, size = {}, free = {}",
      n, block.header, block.size, block.is_free
    );
  }
}

fn main() {
  env_logger::init();
  brkalloc::enable_logging();

  let mut heap = Heap::system();

  unsafe {
    print_program_break("start");
    block_until_enter_pressed();

    // --------------------------------------------------------------------
    // 1) Allocate 100 bytes and store an int at the front.
    // --------------------------------------------------------------------
    let first_block = heap.allocate(100).map_or(ptr::null_mut(), |p| p.as_ptr());
    println!("\n[1] Allocate 100 bytes");
    print_alloc(100, first_block);

    let first_ptr = first_block as *mut i32;
    first_ptr.write_unaligned(42);
    println!("[1] Value written = {}", first_ptr.read_unaligned());

    block_until_enter_pressed();

    // --------------------------------------------------------------------
    // 2) Allocate 12 bytes. Headers follow payloads byte for byte, so the
    //    next header lands wherever the previous payload ends.
    // --------------------------------------------------------------------
    let second_block = heap.allocate(12).map_or(ptr::null_mut(), |p| p.as_ptr());
    println!("\n[2] Allocate 12 bytes");
    print_alloc(12, second_block);
    ptr::write_bytes(second_block, 0xAB, 12);
    print_blocks(&heap);

    block_until_enter_pressed();

    // --------------------------------------------------------------------
    // 3) Release the first block. Its bytes are zeroed, the record stays.
    // --------------------------------------------------------------------
    heap.deallocate(first_block);
    println!("\n[3] Released first_block at {:?}", first_block);
    print_blocks(&heap);

    block_until_enter_pressed();

    // --------------------------------------------------------------------
    // 4) Allocate 50 bytes: first fit hands back the 100-byte record.
    // --------------------------------------------------------------------
    let third_block = heap.allocate(50).map_or(ptr::null_mut(), |p| p.as_ptr());
    println!("\n[4] Allocate 50 bytes (check reuse of released block)");
    print_alloc(50, third_block);

    println!(
      "[4] third_block == first_block? {}, first int = {}",
      if third_block == first_block { "Yes" } else { "No" },
      (third_block as *const i32).read_unaligned()
    );
    print_blocks(&heap);

    block_until_enter_pressed();

    // --------------------------------------------------------------------
    // 5) Grow the 12-byte block; its contents move to a new record.
    // --------------------------------------------------------------------
    let moved = heap.reallocate(second_block, 64).map_or(ptr::null_mut(), |p| p.as_ptr());
    println!("\n[5] Reallocate 12 -> 64 bytes, {:?} -> {:?}", second_block, moved);
    println!("[5] First byte = 0x{:X}", *moved);
    print_blocks(&heap);

    block_until_enter_pressed();

    // --------------------------------------------------------------------
    // 6) Allocate a large block to observe heap growth.
    // --------------------------------------------------------------------
    print_program_break("before large alloc");

    let big_block = heap
      .allocate_zeroed(64, 1024)
      .map_or(ptr::null_mut(), |p| p.as_ptr());
    println!("\n[6] Allocate zeroed 64 KiB block");
    print_alloc(64 * 1024, big_block);

    print_program_break("after large alloc");
    block_until_enter_pressed();

    // --------------------------------------------------------------------
    // 7) End of demo. The break never moves back; the OS reclaims
    //    everything when the process exits.
    // --------------------------------------------------------------------
    println!("\n[7] End of example. {} records in the heap.", heap.block_count());
  }
}
