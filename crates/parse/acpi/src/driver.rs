//! The ACPI discovery driver and its probe entry point.
//!
//! Probing scans the BIOS area once; if a valid RSDP turns up, the returned
//! [`AcpiDriver`] carries the root table location and the two collaborators
//! (mapper and reclaimer) it needs for the discovery session that
//! [`Driver::init`] later runs.

use core::fmt;

use argon_core::{kdebug, kinfo, kwarn};
use argon_driver_api::{Driver, DriverError};
use argon_mm::{FrameReclaimer, PageMapper};

use crate::reservation::ReservationSet;
use crate::rsdp::{self, RootTable};
use crate::rsdt::{self, DiscoveredTables};
use crate::AcpiError;

impl From<AcpiError> for DriverError {
    fn from(err: AcpiError) -> Self {
        let message = match err {
            AcpiError::MissingRootPointer => "could not locate ACPI RSDP",
            AcpiError::ChecksumMismatch => {
                "detected checksum mismatch while parsing ACPI table header"
            }
            AcpiError::Mapping(_) => "failed to map ACPI table memory",
            AcpiError::CapacityExceeded => "ACPI discovery exceeded its fixed capacity",
        };
        Self {
            module: "acpi",
            message,
        }
    }
}

/// Driver that enumerates the firmware's ACPI tables during boot.
///
/// One instance owns one discovery session: the pages it reserves are
/// released as a group when the session ends, whichever way it ends.
pub struct AcpiDriver<'m> {
    mapper: &'m mut dyn PageMapper,
    reclaimer: &'m mut dyn FrameReclaimer,
    reservations: ReservationSet,
    root: RootTable,
}

impl<'m> AcpiDriver<'m> {
    /// Creates a driver for an already-located root table.
    ///
    /// Normally [`probe`] does the locating; this constructor serves setups
    /// where the boot protocol hands the kernel the root table directly.
    pub fn new(
        root: RootTable,
        mapper: &'m mut dyn PageMapper,
        reclaimer: &'m mut dyn FrameReclaimer,
    ) -> Self {
        Self {
            mapper,
            reclaimer,
            reservations: ReservationSet::new(),
            root,
        }
    }

    /// The root table this driver will enumerate from.
    #[must_use]
    pub fn root_table(&self) -> RootTable {
        self.root
    }

    /// Runs a full discovery session and returns the tables found.
    ///
    /// Every page reserved during the walk is released before this returns,
    /// on the error path exactly as on the success path; boot memory is
    /// reclaimed only if every release succeeded.
    ///
    /// # Errors
    ///
    /// See [`rsdt::walk_root_table`]; errors pass through unchanged.
    pub fn discover_tables(
        &mut self,
        sink: &mut dyn fmt::Write,
    ) -> Result<DiscoveredTables, AcpiError> {
        kinfo!(
            "acpi: enumerating tables from {} at {}",
            self.root.name(),
            self.root.address()
        );

        let result =
            rsdt::walk_root_table(&mut *self.mapper, &mut self.reservations, self.root, sink);

        let reserved_pages = self.reservations.page_count();
        if self.reservations.release_all(&mut *self.mapper) {
            self.reclaimer.reclaim_regions();
            kdebug!("acpi: released {reserved_pages} reserved pages, boot memory reclaimed");
        } else {
            kwarn!("acpi: failed to release some reserved pages, boot memory not reclaimed");
        }

        result
    }
}

impl Driver for AcpiDriver<'_> {
    fn name(&self) -> &'static str {
        "acpi"
    }

    fn version(&self) -> (u16, u16, u16) {
        (0, 0, 1)
    }

    fn init(&mut self, sink: &mut dyn fmt::Write) -> Result<(), DriverError> {
        self.discover_tables(sink).map(|_| ()).map_err(DriverError::from)
    }
}

/// Probes for ACPI support.
///
/// Scans the BIOS area for the RSDP and returns a ready-to-init driver
/// carrying the root table location, or `None` when the machine exposes no
/// (locatable) ACPI tables.
pub fn probe<'m>(
    mapper: &'m mut dyn PageMapper,
    reclaimer: &'m mut dyn FrameReclaimer,
) -> Option<AcpiDriver<'m>> {
    match rsdp::locate_root_table(&mut *mapper) {
        Ok(root) => Some(AcpiDriver::new(root, mapper, reclaimer)),
        Err(AcpiError::MissingRootPointer) => None,
        Err(err) => {
            kwarn!("acpi: probe failed: {err}");
            None
        }
    }
}
