//! `argon-binparse` --- bounds-checked reads of binary structures.
//!
//! Firmware hands the kernel byte ranges that must be reinterpreted as typed
//! structures (ACPI tables, descriptor headers, pointer arrays). Doing that
//! by casting raw memory invites out-of-bounds reads and alignment faults,
//! so this crate funnels every such read through [`FromBytes`]: the length
//! is checked against the slice first, and the value is then read unaligned.
//!
//! Multi-byte integers are read as little-endian, which matches every
//! firmware structure Argon consumes and every target it runs on.
//!
//! Structs opt in with `#[derive(FromBytes)]` (re-exported from
//! `argon-binparse-macros`), which verifies `#[repr(C)]` layout and that all
//! field types implement `FromBytes`.

#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]

pub use argon_binparse_macros::FromBytes;

/// Types that can be read from a byte slice at any alignment.
///
/// # Safety
///
/// Implementors must guarantee that every bit pattern of
/// `size_of::<Self>()` bytes is a valid value of `Self`. This holds for
/// primitive integers, byte arrays, and `#[repr(C)]` structs composed of
/// such fields (use the derive rather than implementing by hand).
pub unsafe trait FromBytes: Sized + Copy {
    /// Reads a value from the start of `data`.
    ///
    /// Returns `None` if `data` is shorter than `size_of::<Self>()`.
    #[must_use]
    fn read_from(data: &[u8]) -> Option<Self> {
        if data.len() < size_of::<Self>() {
            return None;
        }
        // SAFETY: the length was checked above, the read is unaligned, and
        // the implementor guarantees any bit pattern is a valid Self.
        Some(unsafe { core::ptr::read_unaligned(data.as_ptr().cast::<Self>()) })
    }

    /// Reads a value starting at `offset` bytes into `data`.
    ///
    /// Returns `None` if `[offset, offset + size_of::<Self>())` does not fit
    /// within `data`.
    #[must_use]
    fn read_at(data: &[u8], offset: usize) -> Option<Self> {
        Self::read_from(data.get(offset..)?)
    }
}

// SAFETY: any byte is a valid u8.
unsafe impl FromBytes for u8 {}

// SAFETY: any 2-byte pattern is a valid u16.
unsafe impl FromBytes for u16 {
    fn read_from(data: &[u8]) -> Option<Self> {
        Some(Self::from_le_bytes(data.get(..2)?.try_into().ok()?))
    }
}

// SAFETY: any 4-byte pattern is a valid u32.
unsafe impl FromBytes for u32 {
    fn read_from(data: &[u8]) -> Option<Self> {
        Some(Self::from_le_bytes(data.get(..4)?.try_into().ok()?))
    }
}

// SAFETY: any 8-byte pattern is a valid u64.
unsafe impl FromBytes for u64 {
    fn read_from(data: &[u8]) -> Option<Self> {
        Some(Self::from_le_bytes(data.get(..8)?.try_into().ok()?))
    }
}

// SAFETY: any N-byte pattern is a valid [u8; N].
unsafe impl<const N: usize> FromBytes for [u8; N] {
    fn read_from(data: &[u8]) -> Option<Self> {
        data.get(..N)?.try_into().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn u8_read() {
        assert_eq!(u8::read_from(&[0xAB, 0xCD]), Some(0xAB));
        assert_eq!(u8::read_from(&[]), None);
    }

    #[test]
    fn u16_reads_little_endian() {
        assert_eq!(u16::read_from(&[0x34, 0x12]), Some(0x1234));
        assert_eq!(u16::read_from(&[0x34]), None);
    }

    #[test]
    fn u32_reads_little_endian() {
        assert_eq!(u32::read_from(&[0x78, 0x56, 0x34, 0x12]), Some(0x1234_5678));
        assert_eq!(u32::read_from(&[0x78, 0x56, 0x34]), None);
    }

    #[test]
    fn u64_reads_little_endian() {
        let data = [0x88, 0x77, 0x66, 0x55, 0x44, 0x33, 0x22, 0x11];
        assert_eq!(u64::read_from(&data), Some(0x1122_3344_5566_7788));
        assert_eq!(u64::read_from(&data[..7]), None);
    }

    #[test]
    fn byte_array_read() {
        assert_eq!(<[u8; 4]>::read_from(b"RSDTxyz"), Some(*b"RSDT"));
        assert_eq!(<[u8; 8]>::read_from(b"short"), None);
    }

    #[test]
    fn read_at_offsets() {
        let data = [0xFF, 0xFF, 0x34, 0x12];
        assert_eq!(u16::read_at(&data, 2), Some(0x1234));
        assert_eq!(u16::read_at(&data, 3), None);
        assert_eq!(u16::read_at(&data, 5), None);
    }

    #[test]
    fn trailing_bytes_are_ignored() {
        assert_eq!(u16::read_from(&[0x01, 0x00, 0xEE, 0xEE]), Some(1));
    }
}
