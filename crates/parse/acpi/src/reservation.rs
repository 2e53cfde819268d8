//! Page reservation tracking for a discovery session.
//!
//! Firmware tables live wherever the vendor put them, so discovery maps
//! pages on demand. [`ReservationSet`] remembers every page it mapped and
//! releases them as a group at the end of the session; without that record,
//! pages mapped for one table could never be safely torn down, because a
//! neighbouring table may share them.

use argon_core::addr::{PhysAddr, VirtAddr};
use argon_core::paging::{Page, PhysFrame};
use argon_mm::{MapFlags, PageMapper};
use planck_noalloc::vec::ArrayVec;

use crate::AcpiError;

/// Upper bound on distinct pages one discovery session can hold mapped.
///
/// Covers 1 MiB of table memory; the tables referenced by a root table sum
/// to a few dozen KiB on real firmware.
pub const RESERVATION_CAPACITY: usize = 256;

/// Returns the page containing a physical address under identity mapping.
pub(crate) fn page_for(addr: PhysAddr) -> Page {
    Page::containing_address(VirtAddr::new(addr.as_u64()))
}

/// Returns the frame with the same number as `page` (identity mapping).
pub(crate) fn identity_frame(page: Page) -> PhysFrame {
    PhysFrame::containing_address(PhysAddr::new(page.start_address().as_u64()))
}

/// Set of pages identity-mapped on behalf of one discovery session.
///
/// Reservation is idempotent: re-reserving a page that is already tracked is
/// a no-op, so overlapping ranges are safe and cheap. The set is drained
/// exactly once via [`release_all`](Self::release_all).
pub struct ReservationSet {
    pages: ArrayVec<Page, RESERVATION_CAPACITY>,
}

impl ReservationSet {
    /// Creates an empty reservation set.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            pages: ArrayVec::new(),
        }
    }

    /// Number of pages currently tracked.
    #[must_use]
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Returns `true` if no pages are tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Ensures identity mappings exist for every page covering
    /// `[start, start + size)`.
    ///
    /// Pages already tracked are skipped. Newly mapped pages are recorded so
    /// [`release_all`](Self::release_all) can tear them down.
    ///
    /// # Errors
    ///
    /// [`AcpiError::Mapping`] if the primitive refuses a mapping --- fatal
    /// for the session, since the memory cannot be read without it.
    /// [`AcpiError::CapacityExceeded`] if the set is full; the page mapped
    /// for the failing slot is unmapped again before returning.
    pub fn reserve(
        &mut self,
        mapper: &mut dyn PageMapper,
        start: PhysAddr,
        size: u64,
    ) -> Result<(), AcpiError> {
        if size == 0 {
            return Ok(());
        }

        let first = page_for(start);
        let last = page_for(start + (size - 1));
        for page in Page::range_inclusive(first, last) {
            if self.pages.contains(&page) {
                continue;
            }

            mapper.map(page, identity_frame(page), MapFlags::PRESENT)?;

            if self.pages.try_push(page).is_err() {
                // Do not leave an untracked live mapping behind.
                let _ = mapper.unmap(page);
                return Err(AcpiError::CapacityExceeded);
            }
        }

        Ok(())
    }

    /// Unmaps every tracked page exactly once and empties the set.
    ///
    /// Returns `true` if every unmap succeeded. Callers gate boot-memory
    /// reclamation on that: frames that may still be mapped must not be
    /// handed back to the allocator.
    pub fn release_all(&mut self, mapper: &mut dyn PageMapper) -> bool {
        let mut fully_released = true;
        for page in &self.pages {
            if mapper.unmap(*page).is_err() {
                fully_released = false;
            }
        }
        self.pages.clear();
        fully_released
    }
}

impl Default for ReservationSet {
    fn default() -> Self {
        Self::new()
    }
}
