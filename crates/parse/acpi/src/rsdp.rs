//! Root System Description Pointer location and validation.
//!
//! The RSDP is the entry point into the ACPI table hierarchy. Legacy BIOS
//! firmware places it somewhere in `[0xE0000, 0xFFFFF]` on a 16-byte
//! boundary, so it has to be found by scanning for its signature. ACPI 1.0
//! defines a 20-byte structure ([`Rsdp`]) pointing at the RSDT; revisions
//! above zero extend it to 36 bytes ([`Rsdp2`]) with a 64-bit XSDT address.

use argon_binparse::FromBytes;
use argon_core::addr::PhysAddr;
use argon_core::paging::Page;
use argon_mm::{MapError, MapFlags, PageMapper};

use crate::reservation::{identity_frame, page_for};
use crate::sdt::validate_checksum;
use crate::AcpiError;

/// First byte of the BIOS area scanned for the RSDP.
pub const RSDP_SCAN_START: PhysAddr = PhysAddr::new(0xE_0000);

/// Last byte (inclusive) of the BIOS area scanned for the RSDP.
pub const RSDP_SCAN_END: PhysAddr = PhysAddr::new(0xF_FFFF);

/// Expected RSDP signature (note the trailing space).
pub const RSDP_SIGNATURE: &[u8; 8] = b"RSD PTR ";

/// The RSDP is aligned to a 16-byte boundary.
const RSDP_ALIGN: usize = 16;

/// Revision byte value for ACPI 1.0.
const RSDP_REVISION_ACPI1: u8 = 0;

/// ACPI 1.0 Root System Description Pointer --- 20 bytes.
#[derive(Debug, Clone, Copy, FromBytes)]
#[repr(C, packed)]
pub struct Rsdp {
    /// Must equal [`RSDP_SIGNATURE`].
    pub signature: [u8; 8],
    /// Checksum absorbing the first 20 bytes to zero.
    pub checksum: u8,
    /// OEM identification string.
    pub oem_id: [u8; 6],
    /// ACPI revision: 0 for ACPI 1.0, 2 for ACPI 2.0 and later.
    pub revision: u8,
    /// Physical address of the RSDT (32-bit).
    pub rsdt_address: u32,
}

impl Rsdp {
    /// Size of the ACPI 1.0 structure in bytes.
    pub const SIZE: usize = 20;
}

const _: () = assert!(size_of::<Rsdp>() == Rsdp::SIZE);

/// ACPI 2.0+ extension of the RSDP --- 36 bytes total.
///
/// Overlays the same memory as [`Rsdp`]; the extra fields follow the 1.0
/// portion directly.
#[derive(Debug, Clone, Copy, FromBytes)]
#[repr(C, packed)]
pub struct Rsdp2 {
    /// The ACPI 1.0 portion.
    pub v1: Rsdp,
    /// Total length of this structure in bytes.
    pub length: u32,
    /// Physical address of the XSDT (64-bit).
    pub xsdt_address: u64,
    /// Checksum absorbing the whole structure to zero.
    pub extended_checksum: u8,
    /// Reserved padding.
    pub reserved: [u8; 3],
}

impl Rsdp2 {
    /// Size of the ACPI 2.0 structure in bytes.
    pub const SIZE: usize = 36;
}

const _: () = assert!(size_of::<Rsdp2>() == Rsdp2::SIZE);

/// Location and flavor of the root description table.
///
/// The flavor decides the width of the pointer entries in the table's
/// payload: 4 bytes for the RSDT, 8 for the XSDT.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RootTable {
    /// ACPI 1.0 Root System Description Table, 32-bit entries.
    Rsdt(PhysAddr),
    /// ACPI 2.0+ Extended System Description Table, 64-bit entries.
    Xsdt(PhysAddr),
}

impl RootTable {
    /// Physical address of the root table.
    #[must_use]
    pub const fn address(self) -> PhysAddr {
        match self {
            Self::Rsdt(addr) | Self::Xsdt(addr) => addr,
        }
    }

    /// Width in bytes of one pointer entry in the root table's payload.
    #[must_use]
    pub const fn entry_size(self) -> usize {
        match self {
            Self::Rsdt(_) => 4,
            Self::Xsdt(_) => 8,
        }
    }

    /// Conventional name of the table flavor.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Rsdt(_) => "RSDT",
            Self::Xsdt(_) => "XSDT",
        }
    }
}

/// Temporary identity mapping of the RSDP scan window.
///
/// Dropping the guard unmaps the whole window, so the pages are released on
/// every exit path, found or not. Unmap failures leave nothing actionable
/// during early boot and are ignored.
struct ScanWindow<'m> {
    mapper: &'m mut dyn PageMapper,
    first: Page,
    last: Page,
}

impl ScanWindow<'_> {
    fn map_all(&mut self) -> Result<(), MapError> {
        for page in Page::range_inclusive(self.first, self.last) {
            self.mapper.map(page, identity_frame(page), MapFlags::PRESENT)?;
        }
        Ok(())
    }
}

impl Drop for ScanWindow<'_> {
    fn drop(&mut self) {
        for page in Page::range_inclusive(self.first, self.last) {
            let _ = self.mapper.unmap(page);
        }
    }
}

/// Scans the BIOS area for the RSDP and returns the root table it points at.
///
/// # Errors
///
/// [`AcpiError::MissingRootPointer`] if no candidate in the window carries a
/// valid signature and checksum; [`AcpiError::Mapping`] if the scan window
/// cannot be mapped.
pub fn locate_root_table(mapper: &mut dyn PageMapper) -> Result<RootTable, AcpiError> {
    scan_for_root_table(mapper, RSDP_SCAN_START, RSDP_SCAN_END)
}

/// Scans `[start, end]` for a valid RSDP.
///
/// Split out from [`locate_root_table`] so tests can point the scan at a
/// fixture instead of the real BIOS area.
pub(crate) fn scan_for_root_table(
    mapper: &mut dyn PageMapper,
    start: PhysAddr,
    end: PhysAddr,
) -> Result<RootTable, AcpiError> {
    let mut window = ScanWindow {
        mapper,
        first: page_for(start),
        last: page_for(end),
    };
    window.map_all()?;

    let window_len = (end.as_u64() - start.as_u64() + 1) as usize;
    // SAFETY: the window pages were mapped above and stay mapped until the
    // guard drops at the end of this function.
    let window_bytes = unsafe { crate::phys_bytes(start, window_len) };

    let mut offset = 0;
    while offset + Rsdp::SIZE <= window_len {
        if let Some(root) = parse_candidate(&window_bytes[offset..]) {
            return Ok(root);
        }
        offset += RSDP_ALIGN;
    }

    Err(AcpiError::MissingRootPointer)
}

/// Validates one 16-byte-aligned scan position.
///
/// A signature match alone is not enough --- stray copies of the signature
/// string do occur in the BIOS area, so a candidate only counts once its
/// checksum holds. Returns `None` to let the caller keep scanning.
fn parse_candidate(candidate: &[u8]) -> Option<RootTable> {
    let rsdp = Rsdp::read_from(candidate)?;
    if rsdp.signature != *RSDP_SIGNATURE {
        return None;
    }

    if rsdp.revision == RSDP_REVISION_ACPI1 {
        if !validate_checksum(&candidate[..Rsdp::SIZE]) {
            return None;
        }
        return Some(RootTable::Rsdt(PhysAddr::new(u64::from(rsdp.rsdt_address))));
    }

    // Revision above zero: the extended structure overlays the same bytes
    // and its checksum covers the self-declared length. A declared length
    // that cannot hold the structure, or that runs past the scan window,
    // disqualifies the candidate.
    let rsdp2 = Rsdp2::read_from(candidate)?;
    let declared_len = rsdp2.length as usize;
    if declared_len < Rsdp2::SIZE || declared_len > candidate.len() {
        return None;
    }
    if !validate_checksum(&candidate[..declared_len]) {
        return None;
    }

    Some(RootTable::Xsdt(PhysAddr::new_truncate(rsdp2.xsdt_address)))
}
