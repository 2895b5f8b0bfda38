use super::types::*;
use log::trace;

// ─── WriteBuffer ────────────────────────────────────────────────────────────

/// Zero-filled, growable output region for one encode.
///
/// All writes go through `&mut self`, so nothing can hold a view of the old
/// allocation across a call to [`WriteBuffer::ensure`]. Positions are absolute
/// byte offsets from the start of the output.
#[derive(Debug)]
pub struct WriteBuffer {
    bytes: Vec<u8>,
    record_reserve: usize,
}

impl WriteBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        Self::from_vec(Vec::new(), capacity)
    }

    /// Reuse `bytes` as backing storage. Existing contents are discarded.
    pub fn from_vec(mut bytes: Vec<u8>, capacity: usize) -> Self {
        bytes.clear();
        bytes.resize(capacity.max(MIN_INITIAL_CAPACITY), 0);
        Self {
            bytes,
            record_reserve: DEFAULT_RECORD_RESERVE,
        }
    }

    pub fn with_record_reserve(mut self, record_reserve: usize) -> Self {
        self.record_reserve = record_reserve;
        self
    }

    /// Scratch window a compiled record reserves before writing its fields.
    #[inline]
    pub fn record_reserve(&self) -> usize {
        self.record_reserve
    }

    /// Current size of the backing region.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.bytes.len()
    }

    /// Make room for `size` bytes at `cursor` (plus one spare byte), doubling
    /// the region as often as needed. Returns `size` so call sites can
    /// reserve and advance in one step.
    #[inline]
    pub fn ensure(&mut self, cursor: usize, size: usize) -> usize {
        let needed = cursor + size;
        if needed >= self.bytes.len() {
            self.grow(needed);
        }
        size
    }

    #[cold]
    fn grow(&mut self, needed: usize) {
        let old = self.bytes.len();
        let mut len = old;
        while needed >= len {
            len *= 2;
        }
        trace!("growing write buffer {} -> {} bytes", old, len);
        self.bytes.resize(len, 0);
    }

    #[inline]
    pub fn write<const N: usize>(&mut self, at: usize, bytes: [u8; N]) {
        self.bytes[at..at + N].copy_from_slice(&bytes);
    }

    #[inline]
    pub fn write_u32(&mut self, at: usize, value: u32) {
        self.write(at, value.to_le_bytes());
    }

    #[inline]
    pub fn write_slice(&mut self, at: usize, src: &[u8]) {
        self.bytes[at..at + src.len()].copy_from_slice(src);
    }

    #[inline]
    pub fn write_byte(&mut self, at: usize, byte: u8) {
        self.bytes[at] = byte;
    }

    #[inline]
    pub fn or_byte(&mut self, at: usize, mask: u8) {
        self.bytes[at] |= mask;
    }

    /// Set bit `index` of the bitmap starting at `base`.
    #[inline]
    pub fn set_bit(&mut self, base: usize, index: usize) {
        self.or_byte(base + (index >> 3), 1 << (index & 7));
    }

    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    /// Hand back the first `len` bytes; the spare tail is dropped.
    pub fn into_written(mut self, len: usize) -> Vec<u8> {
        self.bytes.truncate(len);
        self.bytes
    }
}
