//! Shared input buffer owned by the host.

use std::cell::RefCell;

/// Initial capacity of the shared buffer.
pub const IO_BUFFER_CAPACITY: usize = 16_000;

/// Reusable byte buffer for reading script input.
///
/// Readers check the storage out with [`IoBuffer::take`] and hand it back
/// with [`IoBuffer::restore`], so no `RefCell` borrow is held across an
/// await point.
#[derive(Debug)]
pub struct IoBuffer {
    buf: RefCell<Vec<u8>>,
}

impl IoBuffer {
    pub fn new() -> Self {
        Self {
            buf: RefCell::new(Vec::with_capacity(IO_BUFFER_CAPACITY)),
        }
    }

    /// Check out the storage, emptied.
    pub fn take(&self) -> Vec<u8> {
        let mut buf = std::mem::take(&mut *self.buf.borrow_mut());
        buf.clear();
        buf
    }

    /// Return storage checked out with [`IoBuffer::take`].
    pub fn restore(&self, mut buf: Vec<u8>) {
        buf.clear();
        *self.buf.borrow_mut() = buf;
    }

    pub fn capacity(&self) -> usize {
        self.buf.borrow().capacity()
    }
}

impl Default for IoBuffer {
    fn default() -> Self {
        Self::new()
    }
}
