//! Exposition of the heap via a C ABI.
//!
//! All functions share one process-wide [`Heap`] over the program break.
//! Symbols are exported with a leading underscore (`_mm_malloc`, ...) to
//! match `include/brkalloc.h`.
//! Calls are serialized by a mutex; empty results come back as NULL.

use std::{
  ptr,
  ptr::NonNull,
  sync::{Mutex, MutexGuard, PoisonError},
};

use libc::{c_void, size_t};

use crate::{
  brk::{ProgramBreak, SystemBreak},
  heap::Heap,
};

static HEAP: Mutex<Heap<SystemBreak>> = Mutex::new(Heap::system());

// A panic cannot leave a record half written, so a poisoned heap is usable.
fn heap() -> MutexGuard<'static, Heap<SystemBreak>> {
  HEAP.lock().unwrap_or_else(PoisonError::into_inner)
}

fn to_c(address: Option<NonNull<u8>>) -> *mut c_void {
  address.map_or(ptr::null_mut(), |address| address.as_ptr().cast())
}

/// Sets the program break to `addr`, or returns the current break if `addr`
/// is NULL.
///
/// Returns `(void *)-1` on failure.
///
/// #   Safety
///
/// -   Moving the break below memory handed out by `_mm_malloc` invalidates it.
#[unsafe(export_name = "_mm_brk")]
pub unsafe extern "C" fn mm_brk(addr: *mut c_void) -> *mut c_void {
  let _heap = heap();

  unsafe { SystemBreak.brk(addr.cast()).cast() }
}

/// Allocates `size` bytes of uninitialized memory.
///
/// Returns NULL if `size` is 0 or the heap cannot grow.
#[unsafe(export_name = "_mm_malloc")]
pub extern "C" fn mm_malloc(size: size_t) -> *mut c_void {
  //  Safety:
  //  -   The heap is the only user of the break it grows.
  to_c(unsafe { heap().allocate(size) })
}

/// Zeroes and releases the memory located at `ptr`. NULL is ignored.
///
/// #   Safety
///
/// -   Assumes `ptr` is NULL or was returned by a prior call to `_mm_malloc`,
///     `_mm_calloc` or `_mm_realloc`, and not released since.
#[unsafe(export_name = "_mm_free")]
pub unsafe extern "C" fn mm_free(ptr: *mut c_void) {
  unsafe { heap().deallocate(ptr.cast()) }
}

/// Allocates `num * size` zeroed bytes.
///
/// Returns NULL if the product is 0, overflows, or the heap cannot grow.
#[unsafe(export_name = "_mm_calloc")]
pub extern "C" fn mm_calloc(
  num: size_t,
  size: size_t,
) -> *mut c_void {
  to_c(unsafe { heap().allocate_zeroed(num, size) })
}

/// Resizes the memory located at `ptr` to `size` bytes.
///
/// Behaves as `_mm_malloc` if `ptr` is NULL and as `_mm_free` if `size` is 0.
/// On failure NULL is returned and `ptr` stays valid.
///
/// #   Safety
///
/// -   Assumes `ptr` is NULL or a live allocation of this heap.
#[unsafe(export_name = "_mm_realloc")]
pub unsafe extern "C" fn mm_realloc(
  ptr: *mut c_void,
  size: size_t,
) -> *mut c_void {
  to_c(unsafe { heap().reallocate(ptr.cast(), size) })
}

/// Returns the address `size` bytes below the current program break.
///
/// Nothing is reserved: the break does not move.
///
/// #   Safety
///
/// -   The returned memory is not owned by the caller; using it is only sound
///     if nothing else lives there.
#[unsafe(export_name = "_mm_alloca")]
pub unsafe extern "C" fn mm_alloca(size: size_t) -> *mut c_void {
  to_c(unsafe { heap().allocate_stack(size) })
}
