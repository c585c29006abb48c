//! Caller-side memory the device copies into and out of.
//!
//! The copy mechanism may move fewer bytes than asked for (an unmapped page in
//! the caller's region, a short user buffer). Each method reports how many
//! bytes actually moved; the manager turns a short count into a partial result
//! rather than an error.

/// Destination for bytes leaving the device (the read path).
pub trait UserSink {
    /// Copy a prefix of `src` out; returns how many bytes were copied.
    fn copy_out(&mut self, src: &[u8]) -> usize;
}

/// Origin of bytes entering the device (the write path).
pub trait UserSource {
    /// Fill a prefix of `dst`; returns how many bytes were copied.
    fn copy_in(&mut self, dst: &mut [u8]) -> usize;
}

impl UserSink for [u8] {
    fn copy_out(&mut self, src: &[u8]) -> usize {
        let n = src.len().min(self.len());
        self[..n].copy_from_slice(&src[..n]);
        n
    }
}

impl UserSink for Vec<u8> {
    fn copy_out(&mut self, src: &[u8]) -> usize {
        self.as_mut_slice().copy_out(src)
    }
}

fn fill_from(src: &[u8], dst: &mut [u8]) -> usize {
    let n = dst.len().min(src.len());
    dst[..n].copy_from_slice(&src[..n]);
    n
}

impl UserSource for [u8] {
    fn copy_in(&mut self, dst: &mut [u8]) -> usize {
        fill_from(self, dst)
    }
}

impl UserSource for &[u8] {
    fn copy_in(&mut self, dst: &mut [u8]) -> usize {
        fill_from(self, dst)
    }
}

impl UserSource for Vec<u8> {
    fn copy_in(&mut self, dst: &mut [u8]) -> usize {
        fill_from(self, dst)
    }
}

/// Caps how many bytes a copy may move, as if the region became inaccessible
/// after `limit` bytes.
#[derive(Debug)]
pub struct Limited<T> {
    inner: T,
    limit: usize,
}

impl<T> Limited<T> {
    pub fn new(inner: T, limit: usize) -> Self {
        Self { inner, limit }
    }
}

impl<T: UserSink + ?Sized> UserSink for Limited<&mut T> {
    fn copy_out(&mut self, src: &[u8]) -> usize {
        let n = src.len().min(self.limit);
        self.inner.copy_out(&src[..n])
    }
}

impl<T: UserSource + ?Sized> UserSource for Limited<&mut T> {
    fn copy_in(&mut self, dst: &mut [u8]) -> usize {
        let n = dst.len().min(self.limit);
        self.inner.copy_in(&mut dst[..n])
    }
}

/// Fixed-width argument slot for the command path.
///
/// Values travel in native byte order, matching a plain `unsigned int` in the
/// caller's address space.
pub trait UserWord {
    /// `None` when the slot cannot be read.
    fn read_word(&self) -> Option<u32>;
    /// `false` when the slot cannot be written.
    fn write_word(&mut self, value: u32) -> bool;
}

impl UserWord for [u8; 4] {
    fn read_word(&self) -> Option<u32> {
        Some(u32::from_ne_bytes(*self))
    }

    fn write_word(&mut self, value: u32) -> bool {
        *self = value.to_ne_bytes();
        true
    }
}

impl UserWord for [u8] {
    fn read_word(&self) -> Option<u32> {
        let bytes: [u8; 4] = self.get(..4)?.try_into().ok()?;
        Some(u32::from_ne_bytes(bytes))
    }

    fn write_word(&mut self, value: u32) -> bool {
        match self.get_mut(..4) {
            Some(slot) => {
                slot.copy_from_slice(&value.to_ne_bytes());
                true
            }
            None => false,
        }
    }
}

impl UserWord for u32 {
    fn read_word(&self) -> Option<u32> {
        Some(*self)
    }

    fn write_word(&mut self, value: u32) -> bool {
        *self = value;
        true
    }
}

/// A location that can be neither read nor written.
#[derive(Debug, Clone, Copy, Default)]
pub struct BadAddress;

impl UserWord for BadAddress {
    fn read_word(&self) -> Option<u32> {
        None
    }

    fn write_word(&mut self, _value: u32) -> bool {
        false
    }
}

impl UserSink for BadAddress {
    fn copy_out(&mut self, _src: &[u8]) -> usize {
        0
    }
}

impl UserSource for BadAddress {
    fn copy_in(&mut self, _dst: &mut [u8]) -> usize {
        0
    }
}
