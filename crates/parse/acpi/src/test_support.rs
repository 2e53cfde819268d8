//! Shared fixtures for the discovery tests.
//!
//! Tests fake physical memory with a page-aligned buffer and use its host
//! addresses as "physical" addresses. Since the discovery code assumes
//! identity mappings, reads through those addresses hit the buffer directly
//! and the mock mapper only has to record calls, not build page tables.

use argon_core::addr::PhysAddr;
use argon_core::paging::{Page, PhysFrame};
use argon_mm::{FrameReclaimer, MapError, MapFlags, PageMapper, UnmapError};

use crate::sdt::SdtHeader;

/// Number of bytes in a [`PhysImage`]: four pages.
pub(crate) const PHYS_IMAGE_SIZE: usize = 4 * 4096;

/// Page-aligned fake physical memory image.
#[repr(C, align(4096))]
pub(crate) struct PhysImage(pub [u8; PHYS_IMAGE_SIZE]);

impl PhysImage {
    pub(crate) fn new() -> Box<Self> {
        Box::new(Self([0; PHYS_IMAGE_SIZE]))
    }

    /// "Physical" address of the byte at `offset`.
    pub(crate) fn addr_of(&self, offset: usize) -> PhysAddr {
        PhysAddr::new(core::ptr::from_ref(&self.0[offset]) as u64)
    }

    pub(crate) fn write(&mut self, offset: usize, bytes: &[u8]) {
        self.0[offset..offset + bytes.len()].copy_from_slice(bytes);
    }
}

/// Sets the byte at `checksum_offset` so `[start, start + len)` sums to zero.
fn fix_checksum(image: &mut PhysImage, start: usize, len: usize, checksum_offset: usize) {
    image.0[checksum_offset] = 0;
    let sum = image.0[start..start + len]
        .iter()
        .fold(0u8, |a, &b| a.wrapping_add(b));
    image.0[checksum_offset] = 0u8.wrapping_sub(sum);
}

/// Writes a valid description table at `offset` and returns its length.
pub(crate) fn write_sdt(
    image: &mut PhysImage,
    offset: usize,
    signature: &[u8; 4],
    payload: &[u8],
) -> usize {
    let length = SdtHeader::SIZE + payload.len();

    image.write(offset, signature);
    image.write(offset + 4, &(length as u32).to_le_bytes());
    image.0[offset + 8] = 1; // revision
    image.0[offset + 9] = 0; // checksum, fixed up below
    image.write(offset + 10, b"ARGON ");
    image.write(offset + 16, b"ARGONTBL");
    image.write(offset + 24, &1u32.to_le_bytes()); // oem_revision
    image.write(offset + 28, &0x4E47_5241_u32.to_le_bytes()); // creator_id
    image.write(offset + 32, &1u32.to_le_bytes()); // creator_revision
    image.write(offset + SdtHeader::SIZE, payload);

    fix_checksum(image, offset, length, offset + 9);
    length
}

/// Writes an XSDT at `offset` whose payload lists the given table addresses.
pub(crate) fn write_xsdt(image: &mut PhysImage, offset: usize, entries: &[PhysAddr]) {
    let mut payload = Vec::new();
    for entry in entries {
        payload.extend_from_slice(&entry.as_u64().to_le_bytes());
    }
    write_sdt(image, offset, b"XSDT", &payload);
}

/// Writes a valid ACPI 1.0 RSDP at `offset`.
pub(crate) fn write_rsdp_v1(image: &mut PhysImage, offset: usize, rsdt_addr: u32) {
    image.write(offset, b"RSD PTR ");
    image.0[offset + 8] = 0; // checksum, fixed up below
    image.write(offset + 9, b"ARGON ");
    image.0[offset + 15] = 0; // revision
    image.write(offset + 16, &rsdt_addr.to_le_bytes());
    fix_checksum(image, offset, 20, offset + 8);
}

/// Writes a valid ACPI 2.0 RSDP at `offset`.
pub(crate) fn write_rsdp_v2(image: &mut PhysImage, offset: usize, xsdt_addr: u64) {
    image.write(offset, b"RSD PTR ");
    image.0[offset + 8] = 0;
    image.write(offset + 9, b"ARGON ");
    image.0[offset + 15] = 2; // revision
    image.write(offset + 16, &0u32.to_le_bytes()); // legacy rsdt address unused
    image.write(offset + 20, &36u32.to_le_bytes()); // declared length
    image.write(offset + 24, &xsdt_addr.to_le_bytes());
    image.0[offset + 32] = 0; // extended checksum, fixed up below
    image.write(offset + 33, &[0; 3]);
    // The 1.0 checksum byte participates in the 36-byte sum, so fix it
    // first, then absorb the remainder into the extended checksum.
    fix_checksum(image, offset, 20, offset + 8);
    fix_checksum(image, offset, 36, offset + 32);
}

/// [`PageMapper`] that records calls and optionally fails on chosen pages.
pub(crate) struct MockMapper {
    pub map_calls: Vec<(Page, PhysFrame, MapFlags)>,
    pub unmap_calls: Vec<Page>,
    pub fail_map_on: Option<Page>,
    pub fail_unmap_on: Option<Page>,
}

impl MockMapper {
    pub(crate) fn new() -> Self {
        Self {
            map_calls: Vec::new(),
            unmap_calls: Vec::new(),
            fail_map_on: None,
            fail_unmap_on: None,
        }
    }
}

impl PageMapper for MockMapper {
    fn map(&mut self, page: Page, frame: PhysFrame, flags: MapFlags) -> Result<(), MapError> {
        if self.fail_map_on == Some(page) {
            return Err(MapError::FrameAllocationFailed);
        }
        self.map_calls.push((page, frame, flags));
        Ok(())
    }

    fn unmap(&mut self, page: Page) -> Result<(), UnmapError> {
        if self.fail_unmap_on == Some(page) {
            return Err(UnmapError::NotMapped);
        }
        self.unmap_calls.push(page);
        Ok(())
    }
}

/// [`FrameReclaimer`] that counts reclamation requests.
pub(crate) struct MockReclaimer {
    pub reclaim_calls: usize,
}

impl MockReclaimer {
    pub(crate) fn new() -> Self {
        Self { reclaim_calls: 0 }
    }
}

impl FrameReclaimer for MockReclaimer {
    fn reclaim_regions(&mut self) {
        self.reclaim_calls += 1;
    }
}
