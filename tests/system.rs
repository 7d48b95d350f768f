use std::{ptr, slice};

use brkalloc::{BRK_FAILED, HEADER_SIZE, Heap, ProgramBreak, SystemBreak};
use libc::{c_void, size_t};
use serial_test::serial;

// Declared the way `include/brkalloc.h` does, so these resolve against the
// exported symbols rather than the Rust items.
unsafe extern "C" {
  fn _mm_brk(addr: *mut c_void) -> *mut c_void;
  fn _mm_alloca(size: size_t) -> *mut c_void;
  fn _mm_malloc(size: size_t) -> *mut c_void;
  fn _mm_free(ptr: *mut c_void);
  fn _mm_calloc(
    num: size_t,
    size: size_t,
  ) -> *mut c_void;
  fn _mm_realloc(
    ptr: *mut c_void,
    size: size_t,
  ) -> *mut c_void;
}

fn init() {
  let _ = env_logger::builder().is_test(true).try_init();
  brkalloc::enable_logging();
}

fn current_break() -> *mut u8 {
  unsafe { SystemBreak.brk(ptr::null_mut()) }
}

#[test]
#[serial]
fn heap_grows_the_program_break() {
  init();
  let mut heap = Heap::system();

  unsafe {
    let before = current_break();
    let address = heap.allocate(100).unwrap().as_ptr();
    let after = current_break();

    assert_ne!(after, BRK_FAILED);
    assert!(address >= before.wrapping_add(HEADER_SIZE));
    assert!(address.wrapping_add(100) <= after);

    for i in 0..100 {
      *address.add(i) = i as u8;
    }
    for i in 0..100 {
      assert_eq!(*address.add(i), i as u8);
    }

    // Releasing never gives memory back.
    heap.deallocate(address);
    assert!(current_break() >= after);
  }
}

#[test]
#[serial]
fn heap_reuses_released_block() {
  init();
  let mut heap = Heap::system();

  unsafe {
    let address = heap.allocate(100).unwrap().as_ptr();
    (address as *mut i32).write_unaligned(42);
    heap.deallocate(address);

    let again = heap.allocate(50).unwrap().as_ptr();

    assert_eq!(again, address);
    assert!(slice::from_raw_parts(again, 100).iter().all(|&b| b == 0));
  }

  assert_eq!(heap.block_count(), 1);
}

#[test]
#[serial]
fn c_abi_operations() {
  init();

  unsafe {
    assert!(_mm_malloc(0).is_null());
    _mm_free(ptr::null_mut());

    let numbers = _mm_calloc(10, 4) as *mut i32;
    assert!(!numbers.is_null());
    for i in 0..10 {
      assert_eq!(numbers.add(i).read_unaligned(), 0);
    }
    _mm_free(numbers.cast());

    let value = _mm_malloc(100) as *mut i32;
    assert!(!value.is_null());
    value.write_unaligned(42);

    let moved = _mm_realloc(value.cast(), 200) as *mut i32;
    assert!(!moved.is_null());
    assert_eq!(moved.read_unaligned(), 42);

    assert_eq!(_mm_realloc(moved.cast(), 150), moved.cast());
    assert!(_mm_realloc(moved.cast(), 0).is_null());
  }
}

#[test]
#[serial]
fn c_abi_break_and_alloca() {
  init();

  unsafe {
    let current = _mm_brk(ptr::null_mut());
    assert_ne!(current, BRK_FAILED.cast());
    assert_eq!(_mm_brk(ptr::null_mut()), current);

    assert!(_mm_alloca(0).is_null());

    let buffer = _mm_alloca(256);
    assert_eq!(buffer, current.cast::<u8>().wrapping_sub(256).cast());
    assert_eq!(_mm_brk(ptr::null_mut()), current);

    // Setting the break to where it already is succeeds and moves nothing.
    assert_eq!(_mm_brk(current), current);
    assert_eq!(_mm_brk(ptr::null_mut()), current);
  }
}
