//! Fixed-size linear ring buffer with a pre-base slack region (C1).
//!
//! Used both for the DMA ring and for each per-DDC ring. The buffer never
//! moves memory proportional to the live+residue region on the fast path;
//! `compact()` only copies the (small) unconsumed residue down to just
//! before `base`, so the active region always starts at `base` again.

use crate::error::{PipelineError, Result};

/// A linear byte buffer with `base ≤ read ≤ head ≤ capacity`.
pub struct RingBuffer {
    buf: Box<[u8]>,
    base: usize,
    read: usize,
    head: usize,
}

impl RingBuffer {
    /// Allocate a zeroed ring of `capacity` bytes with logical zero at
    /// `base`. `base` must leave enough slack before it to hold the largest
    /// residue the caller will ever carry across a `compact()`.
    ///
    /// Allocation is attempted with `try_reserve_exact` rather than the
    /// infallible `vec!` macro, so a buffer too large for available memory
    /// surfaces as `PipelineError::Alloc` instead of aborting the process.
    pub fn new(capacity: usize, base: usize) -> Result<Self> {
        assert!(base <= capacity, "ring base must fit within capacity");
        let mut buf: Vec<u8> = Vec::new();
        buf.try_reserve_exact(capacity).map_err(|source| {
            PipelineError::Alloc(format!(
                "ring buffer of {capacity} bytes: {source}"
            ))
        })?;
        buf.resize(capacity, 0u8);
        Ok(Self {
            buf: buf.into_boxed_slice(),
            base,
            read: base,
            head: base,
        })
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    #[inline]
    pub fn base(&self) -> usize {
        self.base
    }

    /// Number of unconsumed, live bytes.
    #[inline]
    pub fn readable_len(&self) -> usize {
        self.head - self.read
    }

    /// The writable region `[head, capacity)`.
    pub fn writable_span(&mut self) -> &mut [u8] {
        let head = self.head;
        &mut self.buf[head..]
    }

    /// Advance `head` by `n`, claiming bytes just written into
    /// `writable_span()` as live. Fails if that would run past capacity.
    pub fn advance_head(&mut self, n: usize) -> Result<()> {
        let capacity = self.buf.len();
        if self.head + n > capacity {
            return Err(PipelineError::RingOverrun {
                requested: self.head + n,
                capacity,
            });
        }
        self.head += n;
        Ok(())
    }

    /// Mark `n` live bytes as consumed.
    pub fn consume(&mut self, n: usize) {
        debug_assert!(self.read + n <= self.head, "consume past head");
        self.read += n;
    }

    /// Read-only view of `len` live bytes starting `offset` bytes past
    /// `read`, without consuming them.
    pub fn peek(&self, offset: usize, len: usize) -> &[u8] {
        let start = self.read + offset;
        &self.buf[start..start + len]
    }

    /// Append bytes directly at `head`, advancing it. A convenience used by
    /// the frame parser when writing 6-byte samples into a per-DDC ring.
    pub fn push(&mut self, bytes: &[u8]) -> Result<()> {
        self.writable_span()
            .get_mut(..bytes.len())
            .ok_or(PipelineError::RingOverrun {
                requested: self.head + bytes.len(),
                capacity: self.buf.len(),
            })?
            .copy_from_slice(bytes);
        self.advance_head(bytes.len())
    }

    /// Slide the live residue (if any) down to end at `base`, so the next
    /// burst can be written starting at `base` again.
    pub fn compact(&mut self) {
        let residue = self.head - self.read;
        if residue == 0 {
            self.read = self.base;
            self.head = self.base;
            return;
        }
        if self.read > self.base {
            let new_read = self.base - residue;
            self.buf.copy_within(self.read..self.head, new_read);
            self.read = new_read;
            self.head = self.base;
        }
    }

    #[cfg(test)]
    pub(crate) fn invariant_holds(&self) -> bool {
        self.base <= self.read && self.read <= self.head && self.head <= self.buf.len()
    }
}
