//! `argon-acpi` --- early-boot ACPI table discovery.
//!
//! During device probing the kernel needs to know which firmware description
//! tables exist and where they live. This crate finds out: it scans the BIOS
//! area for the Root System Description Pointer (RSDP), follows it to the
//! RSDT or XSDT, and maps and checksum-validates every table the root table
//! points at, reporting each one to the caller. Table payloads are not
//! interpreted here; consumers receive the raw signature, physical address,
//! and length of each table and read the mapped memory themselves.
//!
//! Physical memory is touched strictly on demand. Every page mapped during a
//! discovery session is tracked by a [`ReservationSet`] and released when the
//! session ends, after which the backing boot memory is handed back to the
//! frame allocator --- but only if every unmap succeeded.
//!
//! The page-mapping primitive and the frame allocator are consumed through
//! the [`argon_mm`] traits, so the whole crate is testable on the host with
//! mock implementations.

#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]

pub mod driver;
pub mod reservation;
pub mod rsdp;
pub mod rsdt;
pub mod sdt;

#[cfg(test)]
pub(crate) mod test_support;

pub use driver::{AcpiDriver, probe};
pub use reservation::ReservationSet;
pub use rsdp::{RootTable, Rsdp, Rsdp2, locate_root_table};
pub use rsdt::{DiscoveredTable, DiscoveredTables, walk_root_table};
pub use sdt::{SdtHeader, map_table, validate_checksum};

use core::fmt;

use argon_core::addr::PhysAddr;
use argon_mm::MapError;

/// Errors produced by ACPI table discovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcpiError {
    /// No valid RSDP was found in the BIOS scan window. The machine has no
    /// (reachable) ACPI support; probing yields no driver.
    MissingRootPointer,
    /// A table's byte sum over its declared length was not zero. Recoverable
    /// for tables referenced by the root table (the entry is skipped), fatal
    /// for the root table itself.
    ChecksumMismatch,
    /// The mapping primitive failed. Fatal; carries the primitive's error
    /// unchanged.
    Mapping(MapError),
    /// A fixed-capacity collection of the discovery session overflowed.
    /// Firmware within specification never comes close to the limits.
    CapacityExceeded,
}

impl From<MapError> for AcpiError {
    fn from(err: MapError) -> Self {
        Self::Mapping(err)
    }
}

impl fmt::Display for AcpiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingRootPointer => f.write_str("could not locate ACPI RSDP"),
            Self::ChecksumMismatch => f.write_str("checksum mismatch while validating ACPI table"),
            Self::Mapping(err) => write!(f, "failed to map ACPI table memory: {err}"),
            Self::CapacityExceeded => {
                f.write_str("discovery session exceeded its fixed capacity")
            }
        }
    }
}

impl core::error::Error for AcpiError {
    fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
        match self {
            Self::Mapping(err) => Some(err),
            _ => None,
        }
    }
}

/// Builds a byte slice over identity-mapped physical memory.
///
/// # Safety
///
/// Every page covering `[addr, addr + len)` must currently be identity-mapped
/// and readable. The returned slice is only valid while those mappings exist.
pub(crate) unsafe fn phys_bytes<'a>(addr: PhysAddr, len: usize) -> &'a [u8] {
    // SAFETY: forwarded to the caller; identity mapping makes the physical
    // address usable as a virtual one.
    unsafe { core::slice::from_raw_parts(addr.as_u64() as usize as *const u8, len) }
}
