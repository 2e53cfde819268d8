//! System Description Table header, checksum validation, and table mapping.
//!
//! Every ACPI table starts with the same 36-byte header. Mapping a table is
//! a two-step dance: map enough to read the header, learn the table's real
//! length from it, then extend the mapping to cover the whole table before
//! the checksum can be verified.

use argon_binparse::FromBytes;
use argon_core::addr::PhysAddr;
use argon_mm::PageMapper;

use crate::reservation::ReservationSet;
use crate::AcpiError;

/// Common header shared by all ACPI description tables.
#[derive(Debug, Clone, Copy, FromBytes)]
#[repr(C, packed)]
pub struct SdtHeader {
    /// 4-byte ASCII signature identifying the table type.
    pub signature: [u8; 4],
    /// Total length of the table in bytes, header included.
    pub length: u32,
    /// Revision of the table structure.
    pub revision: u8,
    /// Checksum byte; the whole table must sum to zero.
    pub checksum: u8,
    /// OEM-supplied identification string.
    pub oem_id: [u8; 6],
    /// OEM-supplied table identification string.
    pub oem_table_id: [u8; 8],
    /// OEM-supplied revision number.
    pub oem_revision: u32,
    /// Vendor ID of the utility that created the table.
    pub creator_id: u32,
    /// Revision of the utility that created the table.
    pub creator_revision: u32,
}

impl SdtHeader {
    /// Size of the header in bytes.
    pub const SIZE: usize = 36;

    /// Returns the 4-byte table signature.
    #[must_use]
    pub fn signature(&self) -> [u8; 4] {
        self.signature
    }

    /// Returns the total table length in bytes, header included.
    #[must_use]
    pub fn length(&self) -> u32 {
        self.length
    }
}

const _: () = assert!(size_of::<SdtHeader>() == SdtHeader::SIZE);

/// Validates the checksum of a byte range.
///
/// ACPI structures are laid out so that all their bytes sum to zero
/// (mod 256); a checksum byte inside the structure absorbs the remainder.
/// Returns `true` when the sum is zero. An invalid checksum is a data
/// condition, not a fault, so this never fails.
#[must_use]
pub fn validate_checksum(data: &[u8]) -> bool {
    let mut sum: u8 = 0;
    for &byte in data {
        sum = sum.wrapping_add(byte);
    }
    sum == 0
}

/// Maps and validates the ACPI table starting at `addr`.
///
/// Reserves pages for the header, reads the declared length, idempotently
/// extends the reservation to the full table, and validates the checksum
/// over the whole range. On success returns a snapshot of the header plus
/// the header size, which callers use to locate the payload.
///
/// # Errors
///
/// [`AcpiError::ChecksumMismatch`] if the table does not sum to zero or
/// declares a length shorter than its own header (the caller decides whether
/// that is fatal); [`AcpiError::Mapping`] if the mapping primitive fails.
pub fn map_table(
    mapper: &mut dyn PageMapper,
    reservations: &mut ReservationSet,
    addr: PhysAddr,
) -> Result<(SdtHeader, usize), AcpiError> {
    // First map enough pages to read the header.
    reservations.reserve(mapper, addr, SdtHeader::SIZE as u64)?;

    // SAFETY: the pages covering the header range were reserved above.
    let header_bytes = unsafe { crate::phys_bytes(addr, SdtHeader::SIZE) };
    // The slice is exactly header-sized, so the read itself cannot fail.
    let header = SdtHeader::read_from(header_bytes).ok_or(AcpiError::ChecksumMismatch)?;

    // A table shorter than its own header cannot checksum; treat it as
    // corrupt rather than reading out of bounds.
    let length = header.length() as usize;
    if length < SdtHeader::SIZE {
        return Err(AcpiError::ChecksumMismatch);
    }

    // Expand the mapping to cover the table contents.
    reservations.reserve(mapper, addr, length as u64)?;

    // SAFETY: the pages covering [addr, addr + length) were reserved above.
    let table_bytes = unsafe { crate::phys_bytes(addr, length) };
    if !validate_checksum(table_bytes) {
        return Err(AcpiError::ChecksumMismatch);
    }

    Ok((header, SdtHeader::SIZE))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{MockMapper, PhysImage, write_sdt};

    #[test]
    fn zero_sum_buffer_validates() {
        assert!(validate_checksum(&[]));
        assert!(validate_checksum(&[0, 0, 0]));
        assert!(validate_checksum(&[0x80, 0x80]));
        assert!(validate_checksum(&[0xFF, 0x01]));
    }

    #[test]
    fn any_single_byte_flip_invalidates() {
        let mut data = [0x12, 0x34, 0x56, 0x64];
        let fixup = data.iter().fold(0u8, |a, &b| a.wrapping_add(b));
        data[3] = data[3].wrapping_sub(fixup);
        assert!(validate_checksum(&data));

        for i in 0..data.len() {
            let mut corrupted = data;
            corrupted[i] ^= 0x40;
            assert!(!validate_checksum(&corrupted), "flip at {i} went undetected");
        }
    }

    #[test]
    fn map_table_returns_validated_header() {
        let mut image = PhysImage::new();
        write_sdt(&mut image, 0, b"APIC", &[0xAB; 20]);
        let addr = image.addr_of(0);

        let mut mapper = MockMapper::new();
        let mut reservations = ReservationSet::new();
        let (header, header_size) = map_table(&mut mapper, &mut reservations, addr).unwrap();

        assert_eq!(header.signature(), *b"APIC");
        assert_eq!(header.length(), (SdtHeader::SIZE + 20) as u32);
        assert_eq!(header_size, SdtHeader::SIZE);
        assert_eq!(reservations.page_count(), 1);
    }

    #[test]
    fn map_table_expands_mapping_to_declared_length() {
        let mut image = PhysImage::new();
        // Header fits in the first page, contents spill into the second.
        let offset = 4000;
        write_sdt(&mut image, offset, b"SSDT", &[0x5A; 300]);
        let addr = image.addr_of(offset);

        let mut mapper = MockMapper::new();
        let mut reservations = ReservationSet::new();
        map_table(&mut mapper, &mut reservations, addr).unwrap();

        // One page for the header pass, a second one for the expansion.
        assert_eq!(reservations.page_count(), 2);
    }

    #[test]
    fn map_table_rejects_corrupt_checksum() {
        let mut image = PhysImage::new();
        write_sdt(&mut image, 0, b"HPET", &[0; 8]);
        // Corrupt one payload byte after the checksum was fixed up.
        let corrupt_at = SdtHeader::SIZE + 3;
        image.0[corrupt_at] ^= 0xFF;

        let mut mapper = MockMapper::new();
        let mut reservations = ReservationSet::new();
        let err = map_table(&mut mapper, &mut reservations, image.addr_of(0)).unwrap_err();
        assert_eq!(err, AcpiError::ChecksumMismatch);
    }

    #[test]
    fn map_table_rejects_length_shorter_than_header() {
        let mut image = PhysImage::new();
        write_sdt(&mut image, 0, b"FACP", &[]);
        // Overwrite the length field with a value below the header size.
        image.write(4, &8u32.to_le_bytes());

        let mut mapper = MockMapper::new();
        let mut reservations = ReservationSet::new();
        let err = map_table(&mut mapper, &mut reservations, image.addr_of(0)).unwrap_err();
        assert_eq!(err, AcpiError::ChecksumMismatch);
    }

    #[test]
    fn map_table_propagates_mapping_failure() {
        let mut image = PhysImage::new();
        write_sdt(&mut image, 0, b"APIC", &[]);
        let addr = image.addr_of(0);

        let mut mapper = MockMapper::new();
        mapper.fail_map_on = Some(crate::reservation::page_for(addr));
        let mut reservations = ReservationSet::new();
        let err = map_table(&mut mapper, &mut reservations, addr).unwrap_err();
        assert!(matches!(err, AcpiError::Mapping(_)));
        assert_eq!(reservations.page_count(), 0);
    }
}
