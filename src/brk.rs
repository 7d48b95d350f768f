//! Program break accessors.
//!
//! The heap only ever needs two things from its environment: the current end
//! of the managed range, and a way to move that end forward. Both are served
//! by [`ProgramBreak::brk`].

use std::ptr;

use libc::{brk, c_void, sbrk};

/// Returned by [`ProgramBreak::brk`] when the break cannot be moved.
pub const BRK_FAILED: *mut u8 = usize::MAX as *mut u8;

/// Access to the boundary of a growable address range.
pub trait ProgramBreak {
  /// Sets the break to `addr` and returns it, or returns the current break
  /// untouched when `addr` is null. Returns [`BRK_FAILED`] when the request
  /// cannot be satisfied.
  ///
  /// # Safety
  ///
  /// Moving the break invalidates any memory above the new boundary.
  unsafe fn brk(
    &mut self,
    addr: *mut u8,
  ) -> *mut u8;
}

/// The process program break, via `sbrk(2)`/`brk(2)`.
///
/// Going through libc's wrappers rather than the bare syscall keeps libc's
/// own cached break in sync, so the system allocator and this one can share
/// the process.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemBreak;

impl ProgramBreak for SystemBreak {
  unsafe fn brk(
    &mut self,
    addr: *mut u8,
  ) -> *mut u8 {
    unsafe {
      if addr.is_null() {
        let current = sbrk(0);

        if current == usize::MAX as *mut c_void {
          return BRK_FAILED;
        }

        return current as *mut u8;
      }

      if brk(addr as *mut c_void) != 0 {
        awarn!("brk({:?}) refused by the kernel", addr);
        return BRK_FAILED;
      }

      addr
    }
  }
}

/// A fixed-capacity region standing in for the process break.
///
/// The break starts at [`ArenaBreak::base`] and may be moved anywhere within
/// `base..=base + capacity`. Each arena is independent, so several heaps can
/// live side by side in one process.
pub struct ArenaBreak {
  base: *mut u8,
  capacity: usize,
  used: usize,
}

impl ArenaBreak {
  pub fn new(capacity: usize) -> Self {
    Self::filled(capacity, 0)
  }

  /// An arena whose bytes all start out as `byte`.
  pub fn filled(
    capacity: usize,
    byte: u8,
  ) -> Self {
    let memory: Box<[u8]> = vec![byte; capacity].into_boxed_slice();

    Self {
      base: Box::into_raw(memory) as *mut u8,
      capacity,
      used: 0,
    }
  }

  pub fn base(&self) -> *const u8 {
    self.base
  }

  pub fn capacity(&self) -> usize {
    self.capacity
  }

  /// Distance between the base and the current break.
  pub fn used(&self) -> usize {
    self.used
  }
}

// The arena exclusively owns its memory.
unsafe impl Send for ArenaBreak {}

impl Drop for ArenaBreak {
  fn drop(&mut self) {
    // Reassembles the box leaked in `filled`.
    unsafe {
      drop(Box::from_raw(ptr::slice_from_raw_parts_mut(
        self.base,
        self.capacity,
      )));
    }
  }
}

impl std::fmt::Debug for ArenaBreak {
  fn fmt(
    &self,
    f: &mut std::fmt::Formatter<'_>,
  ) -> std::fmt::Result {
    f.debug_struct("ArenaBreak")
      .field("base", &self.base)
      .field("capacity", &self.capacity)
      .field("used", &self.used)
      .finish()
  }
}

impl ProgramBreak for ArenaBreak {
  unsafe fn brk(
    &mut self,
    addr: *mut u8,
  ) -> *mut u8 {
    if addr.is_null() {
      return self.base.wrapping_add(self.used);
    }

    let offset = (addr as usize).wrapping_sub(self.base as usize);

    if addr < self.base || offset > self.capacity {
      return BRK_FAILED;
    }

    self.used = offset;
    self.base.wrapping_add(offset)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_arena_query_does_not_move() {
    let mut arena = ArenaBreak::new(64);

    unsafe {
      let start = arena.brk(ptr::null_mut());

      assert_eq!(start as *const u8, arena.base());
      assert_eq!(arena.brk(ptr::null_mut()), start);
      assert_eq!(arena.used(), 0);
    }
  }

  #[test]
  fn test_arena_bounds() {
    let mut arena = ArenaBreak::new(64);

    unsafe {
      let start = arena.brk(ptr::null_mut());

      assert_eq!(arena.brk(start.add(64)), start.add(64));
      assert_eq!(arena.used(), 64);

      assert_eq!(arena.brk(start.wrapping_add(65)), BRK_FAILED);
      assert_eq!(arena.used(), 64);

      assert_eq!(arena.brk(start.wrapping_sub(1)), BRK_FAILED);

      assert_eq!(arena.brk(start.add(10)), start.add(10));
      assert_eq!(arena.brk(ptr::null_mut()), start.add(10));
    }
  }

  #[test]
  fn test_system_query() {
    let mut system = SystemBreak;

    let current = unsafe { system.brk(ptr::null_mut()) };

    assert!(!current.is_null());
    assert_ne!(current, BRK_FAILED);
  }
}
