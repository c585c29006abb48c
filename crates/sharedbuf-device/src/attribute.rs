//! Textual size property.
//!
//! Reads render the capacity as `"<decimal>\n"`. Writes accept the same
//! integer syntax as the kernel's `kstrtouint(buf, 0, ..)`: optional `+`,
//! `0x` for hex, a leading `0` for octal, one optional trailing newline.

use std::sync::Arc;

use sharedbuf_core::error::DeviceError;

use crate::log::dev_debug;
use crate::manager::BufferManager;

#[derive(Debug, Clone)]
pub struct SizeAttribute {
    name: String,
    manager: Arc<BufferManager>,
}

impl SizeAttribute {
    pub fn new(name: impl Into<String>, manager: Arc<BufferManager>) -> Self {
        Self {
            name: name.into(),
            manager,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn show(&self) -> String {
        format!("{}\n", self.manager.get_size())
    }

    /// Parse `input` and resize. Returns the number of input bytes consumed,
    /// which is always all of them.
    ///
    /// Zero is rejected here even though the command path allows it.
    pub fn store(&self, input: &[u8]) -> Result<usize, DeviceError> {
        let new_size = parse_uint(input).ok_or(DeviceError::InvalidArgument)?;
        if new_size == 0 {
            return Err(DeviceError::InvalidArgument);
        }
        dev_debug!(attribute = %self.name, new_size, "store");
        self.manager.set_size(new_size)?;
        Ok(input.len())
    }
}

/// `kstrtouint` with base auto-detection. `None` on any syntax error or
/// overflow.
pub fn parse_uint(input: &[u8]) -> Option<u32> {
    let text = std::str::from_utf8(input).ok()?;
    let text = text.strip_suffix('\n').unwrap_or(text);
    let text = text.strip_prefix('+').unwrap_or(text);

    let (digits, radix) = if let Some(hex) = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
    {
        (hex, 16)
    } else if text.len() > 1 && text.starts_with('0') {
        (&text[1..], 8)
    } else {
        (text, 10)
    };

    if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
        return None;
    }
    u32::from_str_radix(digits, radix).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use sharedbuf_mem::ByteBudget;

    fn attr(capacity: u32) -> SizeAttribute {
        let m = BufferManager::with_budget(capacity, ByteBudget::new(4096)).unwrap();
        SizeAttribute::new("buffer_size", Arc::new(m))
    }

    #[test]
    fn show_is_decimal_with_newline() {
        assert_eq!(attr(64).show(), "64\n");
    }

    #[test]
    fn store_resizes_and_consumes_all_input() {
        let a = attr(64);
        assert_eq!(a.store(b"128\n").unwrap(), 4);
        assert_eq!(a.show(), "128\n");
    }

    #[test]
    fn store_rejects_zero_and_garbage() {
        let a = attr(64);
        for bad in [&b"0"[..], b"0\n", b"", b"\n", b"abc", b"-5", b"12 ", b"0x", b"99999999999"] {
            assert_eq!(a.store(bad), Err(DeviceError::InvalidArgument), "{:?}", bad);
        }
        assert_eq!(a.show(), "64\n");
    }

    #[test]
    fn store_propagates_out_of_memory() {
        let a = attr(64);
        assert_eq!(
            a.store(b"5000"),
            Err(DeviceError::OutOfMemory { requested: 5000 })
        );
        assert_eq!(a.show(), "64\n");
    }

    #[test]
    fn parse_handles_bases() {
        assert_eq!(parse_uint(b"42"), Some(42));
        assert_eq!(parse_uint(b"+42\n"), Some(42));
        assert_eq!(parse_uint(b"0x20"), Some(32));
        assert_eq!(parse_uint(b"0X1f"), Some(31));
        assert_eq!(parse_uint(b"010"), Some(8));
        assert_eq!(parse_uint(b"0"), Some(0));
        assert_eq!(parse_uint(b"08"), None);
        assert_eq!(parse_uint(b"4294967295"), Some(u32::MAX));
        assert_eq!(parse_uint(b"4294967296"), None);
        assert_eq!(parse_uint(b"1\n\n"), None);
    }
}
