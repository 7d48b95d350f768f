use std::{fmt, marker::PhantomData, ptr, ptr::NonNull};

use crate::{
  block::{Block, HEADER_SIZE},
  brk::{BRK_FAILED, ProgramBreak, SystemBreak},
};

/// A first-fit heap carved out of a program break.
///
/// Every allocation is preceded by a [`Block`] header. Headers form a
/// singly-linked list in creation order which only ever grows: released
/// blocks are flagged free and handed out again to any later request that
/// fits, but never split, merged or returned to the break.
pub struct Heap<B: ProgramBreak = SystemBreak> {
  first: *mut Block,
  last: *mut Block,
  brk: B,
}

// The heap exclusively owns every record reachable from `first`.
unsafe impl<B: ProgramBreak + Send> Send for Heap<B> {}

impl Heap<SystemBreak> {
  /// A heap growing the process program break.
  pub const fn system() -> Self {
    Self::new(SystemBreak)
  }
}

impl<B: ProgramBreak> Heap<B> {
  pub const fn new(brk: B) -> Self {
    Self {
      first: ptr::null_mut(),
      last: ptr::null_mut(),
      brk,
    }
  }

  pub fn program_break(&self) -> &B {
    &self.brk
  }

  unsafe fn find_free_block(
    &self,
    size: usize,
  ) -> *mut Block {
    unsafe {
      let mut current: *mut Block = self.first;

      while !current.is_null() {
        let block = Block::read(current);

        if block.is_free && block.size >= size {
          return current;
        }
        current = block.next;
      }

      ptr::null_mut()
    }
  }

  /// Moves the break forward by one header plus `size` bytes and writes a
  /// busy, unlinked record at the old break.
  unsafe fn grow(
    &mut self,
    size: usize,
  ) -> *mut Block {
    unsafe {
      let Some(total_size) = size.checked_add(HEADER_SIZE) else {
        awarn!("growth of {} bytes overflows", size);
        return ptr::null_mut();
      };

      let address = self.brk.brk(ptr::null_mut());

      if address == BRK_FAILED || (address as usize).checked_add(total_size).is_none() {
        awarn!("cannot grow past {:?} by {} bytes", address, total_size);
        return ptr::null_mut();
      }

      if self.brk.brk(address.wrapping_add(total_size)) == BRK_FAILED {
        awarn!("out of memory growing {:?} by {} bytes", address, total_size);
        return ptr::null_mut();
      }

      adebug!(
        "grew heap by {} bytes, header = {:?}, program break = {:?}",
        total_size,
        address,
        address.wrapping_add(total_size)
      );

      let block = address as *mut Block;
      Block::new(size, false, ptr::null_mut()).write(block);

      block
    }
  }

  /// Allocates `size` bytes.
  ///
  /// The first free record large enough is reused as is; otherwise the break
  /// is moved forward. Fresh memory is not zeroed. Returns `None` for a zero
  /// size or when the break cannot grow.
  ///
  /// # Safety
  ///
  /// The program break must not have been moved backwards over memory this
  /// heap handed out.
  pub unsafe fn allocate(
    &mut self,
    size: usize,
  ) -> Option<NonNull<u8>> {
    unsafe {
      if size == 0 {
        return None;
      }

      let free_block = self.find_free_block(size);

      if !free_block.is_null() {
        Block::set_free(free_block, false);
        atrace!("reused {:?} for {} bytes", free_block, size);

        return NonNull::new(Block::payload(free_block));
      }

      let block = self.grow(size);

      if block.is_null() {
        return None;
      }

      if self.first.is_null() {
        self.first = block;
        self.last = block;
      } else {
        Block::set_next(self.last, block);
        self.last = block;
      }

      NonNull::new(Block::payload(block))
    }
  }

  /// Zeroes the whole payload of the record behind `address` and marks it
  /// free. Null is ignored.
  ///
  /// # Safety
  ///
  /// `address` must be null or a live payload returned by this heap.
  pub unsafe fn deallocate(
    &mut self,
    address: *mut u8,
  ) {
    unsafe {
      if address.is_null() {
        return;
      }

      let block = self.find_block(address);
      let size = Block::read(block).size;

      ptr::write_bytes(address, 0, size);
      Block::set_free(block, true);

      atrace!("released {:?} ({} bytes)", block, size);
    }
  }

  /// Allocates `count * size` bytes, all zero.
  ///
  /// A product that overflows `usize` fails like an exhausted heap.
  ///
  /// # Safety
  ///
  /// See [`Heap::allocate`].
  pub unsafe fn allocate_zeroed(
    &mut self,
    count: usize,
    size: usize,
  ) -> Option<NonNull<u8>> {
    unsafe {
      let Some(total_size) = count.checked_mul(size) else {
        awarn!("zeroed allocation of {} x {} bytes overflows", count, size);
        return None;
      };

      let address = self.allocate(total_size)?;
      ptr::write_bytes(address.as_ptr(), 0, total_size);

      Some(address)
    }
  }

  /// Resizes the allocation at `address` to `size` bytes.
  ///
  /// A null `address` allocates, a zero `size` releases and returns `None`.
  /// If the record already holds `size` bytes the same address comes back.
  /// Otherwise the contents move to a new allocation and the old one is
  /// released; if that allocation fails the old one is left untouched.
  ///
  /// # Safety
  ///
  /// `address` must be null or a live payload returned by this heap.
  pub unsafe fn reallocate(
    &mut self,
    address: *mut u8,
    size: usize,
  ) -> Option<NonNull<u8>> {
    unsafe {
      if address.is_null() {
        return self.allocate(size);
      }

      if size == 0 {
        self.deallocate(address);
        return None;
      }

      let old_size = Block::read(self.find_block(address)).size;

      if old_size >= size {
        return NonNull::new(address);
      }

      let new_address = self.allocate(size)?;

      ptr::copy_nonoverlapping(address, new_address.as_ptr(), old_size.min(size));
      self.deallocate(address);

      Some(new_address)
    }
  }

  /// Returns the address `size` bytes below the current break.
  ///
  /// The break is not moved and nothing is recorded, so the bytes belong to
  /// whatever already lives there and a later growth of the heap does not
  /// avoid them.
  ///
  /// # Safety
  ///
  /// The returned region is not reserved; the caller must know it is safe
  /// to use.
  pub unsafe fn allocate_stack(
    &mut self,
    size: usize,
  ) -> Option<NonNull<u8>> {
    unsafe {
      if size == 0 {
        return None;
      }

      let current = self.brk.brk(ptr::null_mut());

      if current == BRK_FAILED {
        return None;
      }

      NonNull::new(current.wrapping_sub(size))
    }
  }

  fn find_block(
    &self,
    address: *mut u8,
  ) -> *mut Block {
    Block::from_payload(address)
  }

  /// Records in creation order.
  pub fn blocks(&self) -> Blocks<'_> {
    Blocks {
      current: self.first,
      _heap: PhantomData,
    }
  }

  pub fn block_count(&self) -> usize {
    self.blocks().count()
  }

  /// Whether nothing was ever allocated.
  pub fn is_empty(&self) -> bool {
    self.first.is_null()
  }
}

impl<B: ProgramBreak> fmt::Debug for Heap<B> {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    f.debug_struct("Heap")
      .field("first", &self.first)
      .field("last", &self.last)
      .field("blocks", &self.blocks().collect::<Vec<_>>())
      .finish()
  }
}

/// Snapshot of one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockInfo {
  pub header: *const u8,
  pub payload: *mut u8,
  pub size: usize,
  pub is_free: bool,
}

pub struct Blocks<'a> {
  current: *mut Block,
  _heap: PhantomData<&'a ()>,
}

impl Iterator for Blocks<'_> {
  type Item = BlockInfo;

  fn next(&mut self) -> Option<BlockInfo> {
    if self.current.is_null() {
      return None;
    }

    // Records reachable from a borrowed heap stay valid for the borrow.
    let block = unsafe { Block::read(self.current) };
    let info = BlockInfo {
      header: self.current as *const u8,
      payload: Block::payload(self.current),
      size: block.size,
      is_free: block.is_free,
    };

    self.current = block.next;
    Some(info)
  }
}
