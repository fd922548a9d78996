//! Receive ring buffer.
//!
//! [`RingBuffer`] is a fixed-capacity circular byte buffer with two
//! free-running cursors. The producer (interrupt handler or DMA engine)
//! only ever advances `head`; the consumer (reading task) only ever
//! advances `tail`. The number of stored bytes is `head - tail` in
//! wrapping arithmetic, so no lock is needed between exactly one producer
//! and one consumer.
//!
//! Capacity is rounded up to a power of two so a cursor maps onto the
//! storage with a mask.
//!
//! # Examples
//!
//! ```
//! use armino_uart::fifo::RingBuffer;
//!
//! let fifo = RingBuffer::new(8);
//! assert_eq!(fifo.put(b"abc"), 3);
//!
//! let mut out = [0u8; 2];
//! assert_eq!(fifo.get(&mut out), 2);
//! assert_eq!(&out, b"ab");
//! assert_eq!(fifo.len(), 1);
//! ```

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::cell::UnsafeCell;
use core::ptr;
use core::sync::atomic::{AtomicUsize, Ordering};

/// Fixed-capacity single-producer/single-consumer byte FIFO.
pub struct RingBuffer {
    storage: Box<[UnsafeCell<u8>]>,
    mask: usize,
    /// Write cursor, advanced by the producer only.
    head: AtomicUsize,
    /// Read cursor, advanced by the consumer only.
    tail: AtomicUsize,
}

// Safety: the producer writes only bytes in [head, tail + capacity) and the
// consumer reads only bytes in [tail, head). Cursor publication uses
// release/acquire, so the two sides never touch the same byte concurrently.
unsafe impl Sync for RingBuffer {}

impl RingBuffer {
    /// Creates an empty buffer holding at least `size` bytes.
    pub fn new(size: usize) -> Self {
        let capacity = size.max(2).next_power_of_two();
        let storage: Vec<UnsafeCell<u8>> = (0..capacity).map(|_| UnsafeCell::new(0)).collect();
        Self {
            storage: storage.into_boxed_slice(),
            mask: capacity - 1,
            head: AtomicUsize::new(0),
            tail: AtomicUsize::new(0),
        }
    }

    /// Total number of bytes the buffer can hold.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.mask + 1
    }

    /// Number of bytes stored.
    #[inline]
    pub fn len(&self) -> usize {
        let tail = self.tail.load(Ordering::Acquire);
        let head = self.head.load(Ordering::Acquire);
        head.wrapping_sub(tail)
    }

    /// Returns true if no bytes are stored.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of free bytes.
    #[inline]
    pub fn unused(&self) -> usize {
        self.capacity().saturating_sub(self.len())
    }

    /// Copies as much of `data` as fits and returns the count stored.
    ///
    /// Producer side. Never blocks; the caller sees truncation in the
    /// return value.
    pub fn put(&self, data: &[u8]) -> usize {
        let head = self.head.load(Ordering::Relaxed);
        let tail = self.tail.load(Ordering::Acquire);
        let free = self.capacity().saturating_sub(head.wrapping_sub(tail));
        let n = data.len().min(free);
        if n == 0 {
            return 0;
        }

        let start = head & self.mask;
        let first = n.min(self.capacity() - start);
        // SAFETY: [start, start + first) and [0, n - first) lie inside the
        // storage and inside the free region, which the consumer does not read.
        unsafe {
            ptr::copy_nonoverlapping(data.as_ptr(), self.as_mut_ptr().add(start), first);
            ptr::copy_nonoverlapping(data.as_ptr().add(first), self.as_mut_ptr(), n - first);
        }
        self.head.store(head.wrapping_add(n), Ordering::Release);
        n
    }

    /// Moves up to `buf.len()` stored bytes into `buf` and returns the count.
    ///
    /// Consumer side.
    pub fn get(&self, buf: &mut [u8]) -> usize {
        let tail = self.tail.load(Ordering::Relaxed);
        let head = self.head.load(Ordering::Acquire);
        let available = head.wrapping_sub(tail).min(self.capacity());
        let n = buf.len().min(available);
        if n == 0 {
            return 0;
        }

        let start = tail & self.mask;
        let first = n.min(self.capacity() - start);
        // SAFETY: the bytes read were published by the producer's release
        // store of `head` and stay untouched until `tail` moves past them.
        unsafe {
            ptr::copy_nonoverlapping(self.as_mut_ptr().add(start), buf.as_mut_ptr(), first);
            ptr::copy_nonoverlapping(self.as_mut_ptr(), buf.as_mut_ptr().add(first), n - first);
        }
        self.tail.store(tail.wrapping_add(n), Ordering::Release);
        n
    }

    /// Publishes `n` bytes that were already written into the storage by an
    /// external agent (the DMA engine).
    ///
    /// Producer side.
    pub fn advance_head(&self, n: usize) {
        self.head.fetch_add(n, Ordering::Release);
    }

    /// Drops every stored byte by moving the read cursor onto the write
    /// cursor. Returns the number of bytes dropped.
    ///
    /// Moves the consumer's cursor, so the caller must serialize it with
    /// [`RingBuffer::get`]. The write cursor is left where it is, which keeps
    /// it aligned with a DMA engine writing into the storage.
    pub fn discard(&self) -> usize {
        let head = self.head.load(Ordering::Acquire);
        let tail = self.tail.swap(head, Ordering::AcqRel);
        head.wrapping_sub(tail)
    }

    /// Start of the backing storage, for use as a DMA destination.
    ///
    /// The region is `capacity()` bytes long and lives as long as `self`.
    #[inline]
    pub fn as_mut_ptr(&self) -> *mut u8 {
        UnsafeCell::raw_get(self.storage.as_ptr())
    }
}

impl core::fmt::Debug for RingBuffer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RingBuffer")
            .field("capacity", &self.capacity())
            .field("head", &self.head.load(Ordering::Relaxed))
            .field("tail", &self.tail.load(Ordering::Relaxed))
            .finish()
    }
}
