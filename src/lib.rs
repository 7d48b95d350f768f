//! # brkalloc - A Program Break Heap
//!
//! This crate provides a small **first-fit heap** that manages memory directly
//! on top of the program break (`brk`/`sbrk`), with its own bookkeeping and a
//! C-style `malloc`/`free`/`calloc`/`realloc`/`alloca` surface.
//!
//! ## Overview
//!
//! ```text
//!   Heap Layout:
//!
//!   ┌──────────────────────────────────────────────────────────────────────┐
//!   │                         HEAP MEMORY                                  │
//!   │                                                                      │
//!   │   ┌────┬──────┬────┬────────────┬────┬────┬──────────────────────┐   │
//!   │   │ H1 │  P1  │ H2 │     P2     │ H3 │ P3 │      Unmapped        │   │
//!   │   └────┴──────┴────┴────────────┴────┴────┴──────────────────────┘   │
//!   │     │          ▲ │                ▲        ▲                         │
//!   │     └──next────┘ └──────next──────┘        │                         │
//!   │                                         Program                      │
//!   │                                          Break                       │
//!   └──────────────────────────────────────────────────────────────────────┘
//!
//!   Each allocation moves the break forward by one header plus payload.
//! ```
//!
//! ## Crate Structure
//!
//! ```text
//!   brkalloc
//!   ├── block      - Allocation record written in front of each payload
//!   ├── brk        - ProgramBreak trait, SystemBreak and ArenaBreak
//!   ├── heap       - Heap implementation
//!   └── ffi        - C ABI over a process-wide heap
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use brkalloc::Heap;
//!
//! let mut heap = Heap::system();
//!
//! unsafe {
//!     // Allocate memory for a u64
//!     let ptr = heap.allocate(8).unwrap().as_ptr() as *mut u64;
//!
//!     // Use the memory
//!     ptr.write_unaligned(42);
//!     println!("Value: {}", ptr.read_unaligned());
//!
//!     // Free the memory
//!     heap.deallocate(ptr as *mut u8);
//! }
//! ```
//!
//! ## How It Works
//!
//! Each allocation creates a record with metadata:
//!
//! ```text
//!   Single Allocation:
//!   ┌───────────────────────┬────────────────────────────────┐
//!   │    Block Header       │         User Data              │
//!   │  ┌─────────────────┐  │                                │
//!   │  │ size: N         │  │  ┌──────────────────────────┐  │
//!   │  │ next: null/ptr  │  │  │                          │  │
//!   │  │ is_free: false  │  │  │     N bytes usable       │  │
//!   │  └─────────────────┘  │  │                          │  │
//!   │      24 bytes         │  └──────────────────────────┘  │
//!   └───────────────────────┴────────────────────────────────┘
//!                           ▲
//!                           └── Pointer returned to user
//! ```
//!
//! Freeing zeroes the payload and flags the record free. The next request
//! that fits in it takes it over whole, without changing its size.
//!
//! ## Limitations
//!
//! - **Single-threaded**: a `Heap` needs `&mut` for everything; the C ABI
//!   serializes callers with a mutex
//! - **No coalescing or splitting**: records keep the size they were
//!   created with forever
//! - **No shrinking**: the break only moves forward
//! - **No alignment guarantees**: payloads follow headers byte for byte
//! - **Unix-only**: requires `libc`'s `brk` and `sbrk`
//!
//! ## Logging
//!
//! Allocator events are reported through the `log` facade once
//! [`enable_logging`] has been called.

use std::sync::atomic::{AtomicBool, Ordering};

#[macro_use]
mod alog;

mod block;
pub mod brk;
pub mod ffi;
mod heap;

pub use block::HEADER_SIZE;
pub use brk::{ArenaBreak, BRK_FAILED, ProgramBreak, SystemBreak};
pub use heap::{BlockInfo, Blocks, Heap};

static ALLOC_LOG: AtomicBool = AtomicBool::new(false);

/// Enables logging for the allocator.
pub fn enable_logging() {
  ALLOC_LOG.store(true, Ordering::Relaxed);
}

/// Disables logging for the allocator.
pub fn disable_logging() {
  ALLOC_LOG.store(false, Ordering::Relaxed);
}

pub(crate) fn should_log() -> bool {
  ALLOC_LOG.load(Ordering::Relaxed)
}
