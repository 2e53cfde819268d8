//! Root table enumeration.
//!
//! The payload of the RSDT/XSDT is a packed array of physical addresses, one
//! per description table present on the system. Walking it means mapping and
//! validating every referenced table; a corrupt entry is skipped so that one
//! bad table cannot hide all the others.

use core::fmt;
use core::fmt::Write as _;

use argon_binparse::FromBytes;
use argon_core::addr::PhysAddr;
use argon_core::kwarn;
use argon_mm::PageMapper;
use planck_noalloc::vec::ArrayVec;

use crate::reservation::ReservationSet;
use crate::rsdp::RootTable;
use crate::sdt::{SdtHeader, map_table};
use crate::AcpiError;

/// Upper bound on tables one root table may reference.
///
/// Real firmware stays well below this; the bound only exists because the
/// discovery session allocates nothing.
pub const MAX_TABLES: usize = 64;

/// One table discovered behind the root table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiscoveredTable {
    /// 4-byte ASCII signature identifying the table type.
    pub signature: [u8; 4],
    /// Physical address of the table.
    pub address: PhysAddr,
    /// Total length of the table in bytes, header included.
    pub length: u32,
}

impl fmt::Display for DiscoveredTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &byte in &self.signature {
            let printable = byte.is_ascii_graphic() || byte == b' ';
            f.write_char(if printable { byte as char } else { '?' })?;
        }
        write!(f, " at {:#018x}, len: {:6}", self.address.as_u64(), self.length)
    }
}

/// Ordered list of the tables a discovery session found.
///
/// Ephemeral: the list borrows nothing and copies no table data, it only
/// records where each table lives. The mappings behind those addresses are
/// torn down at session end, so consumers that want the contents must map
/// the tables again themselves.
#[derive(Debug)]
pub struct DiscoveredTables {
    tables: ArrayVec<DiscoveredTable, MAX_TABLES>,
}

impl DiscoveredTables {
    /// Creates an empty list.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            tables: ArrayVec::new(),
        }
    }

    /// Number of discovered tables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// Returns `true` if nothing was discovered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Iterates over the discovered tables in discovery order.
    pub fn iter(&self) -> core::slice::Iter<'_, DiscoveredTable> {
        self.tables.iter()
    }

    /// Returns the first table carrying the given signature.
    #[must_use]
    pub fn find(&self, signature: &[u8; 4]) -> Option<&DiscoveredTable> {
        self.iter().find(|table| &table.signature == signature)
    }

    pub(crate) fn push(&mut self, table: DiscoveredTable) -> Result<(), AcpiError> {
        self.tables
            .try_push(table)
            .map_err(|_| AcpiError::CapacityExceeded)
    }
}

impl Default for DiscoveredTables {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> IntoIterator for &'a DiscoveredTables {
    type Item = &'a DiscoveredTable;
    type IntoIter = core::slice::Iter<'a, DiscoveredTable>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over the pointer entries of a mapped root table payload.
///
/// Entry width depends on the root table flavor; 32-bit entries are widened
/// to [`PhysAddr`] on the way out. A trailing partial entry (a truncated
/// payload) is ignored.
pub(crate) struct EntryIter<'a> {
    payload: &'a [u8],
    offset: usize,
    entry_size: usize,
}

impl<'a> EntryIter<'a> {
    pub(crate) fn new(payload: &'a [u8], entry_size: usize) -> Self {
        Self {
            payload,
            offset: 0,
            entry_size,
        }
    }
}

impl Iterator for EntryIter<'_> {
    type Item = PhysAddr;

    fn next(&mut self) -> Option<Self::Item> {
        if self.offset + self.entry_size > self.payload.len() {
            return None;
        }

        let addr = if self.entry_size == 8 {
            u64::read_at(self.payload, self.offset)?
        } else {
            u64::from(u32::read_at(self.payload, self.offset)?)
        };
        self.offset += self.entry_size;
        Some(PhysAddr::new_truncate(addr))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.payload.len() - self.offset) / self.entry_size;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for EntryIter<'_> {}

/// Maps the root table and discovers every table it references.
///
/// Each referenced table is mapped and checksum-validated via [`map_table`].
/// Valid tables are reported to `sink` as they are found (so partial
/// progress stays visible if a later step fails) and collected into the
/// returned list. A table failing its checksum is skipped; whether it is
/// corrupt or merely unhandled firmware oddity cannot be told apart here.
///
/// # Errors
///
/// [`AcpiError::ChecksumMismatch`] if the root table itself fails
/// validation (there is nothing to enumerate from); [`AcpiError::Mapping`]
/// if any mapping fails; [`AcpiError::CapacityExceeded`] on list overflow.
pub fn walk_root_table(
    mapper: &mut dyn PageMapper,
    reservations: &mut ReservationSet,
    root: RootTable,
    sink: &mut dyn fmt::Write,
) -> Result<DiscoveredTables, AcpiError> {
    let (root_header, header_size) = map_table(mapper, reservations, root.address())?;

    let payload_len = root_header.length() as usize - header_size;
    let payload_addr = root.address() + header_size as u64;
    // SAFETY: map_table reserved [address, address + length), which covers
    // the payload range.
    let payload = unsafe { crate::phys_bytes(payload_addr, payload_len) };

    let mut tables = DiscoveredTables::new();
    for entry_addr in EntryIter::new(payload, root.entry_size()) {
        let entry_header = match map_table(mapper, reservations, entry_addr) {
            Ok((header, _)) => header,
            Err(AcpiError::ChecksumMismatch) => {
                // A corrupt optional table must not abort discovery of the
                // remaining ones.
                kwarn!("acpi: checksum mismatch for table at {entry_addr}, skipping");
                continue;
            }
            Err(err) => return Err(err),
        };

        let table = DiscoveredTable {
            signature: entry_header.signature(),
            address: entry_addr,
            length: entry_header.length(),
        };
        let _ = writeln!(sink, "found {table}");
        tables.push(table)?;
    }

    Ok(tables)
}
