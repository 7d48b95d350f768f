use std::{mem, ptr};

/// Size of the header written in front of every payload.
pub const HEADER_SIZE: usize = mem::size_of::<Block>();

/// Allocation record, stored inline right before its payload.
///
/// Payload sizes are arbitrary, so a header may sit at any byte address.
/// Every access goes through [`Block::read`] and [`Block::write`], which
/// tolerate misaligned addresses.
#[derive(Debug, Clone, Copy)]
#[repr(C)]
pub struct Block {
  pub size: usize,
  pub next: *mut Block,
  pub is_free: bool,
}

impl Block {
  pub fn new(
    size: usize,
    is_free: bool,
    next: *mut Block,
  ) -> Self {
    Self { size, is_free, next }
  }

  /// # Safety
  ///
  /// `at` must point to `HEADER_SIZE` readable bytes holding a record.
  pub unsafe fn read(at: *const Block) -> Block {
    unsafe { ptr::read_unaligned(at) }
  }

  /// # Safety
  ///
  /// `at` must point to `HEADER_SIZE` writable bytes.
  pub unsafe fn write(
    self,
    at: *mut Block,
  ) {
    unsafe { ptr::write_unaligned(at, self) }
  }

  /// # Safety
  ///
  /// `at` must point to a record written by [`Block::write`].
  pub unsafe fn set_free(
    at: *mut Block,
    is_free: bool,
  ) {
    unsafe {
      let mut block = Block::read(at);
      block.is_free = is_free;
      block.write(at);
    }
  }

  /// # Safety
  ///
  /// `at` must point to a record written by [`Block::write`].
  pub unsafe fn set_next(
    at: *mut Block,
    next: *mut Block,
  ) {
    unsafe {
      let mut block = Block::read(at);
      block.next = next;
      block.write(at);
    }
  }

  /// Address of the payload that follows the header at `at`.
  pub fn payload(at: *mut Block) -> *mut u8 {
    (at as *mut u8).wrapping_add(HEADER_SIZE)
  }

  /// Address of the header in front of `payload`.
  pub fn from_payload(payload: *mut u8) -> *mut Block {
    payload.wrapping_sub(HEADER_SIZE) as *mut Block
  }
}
