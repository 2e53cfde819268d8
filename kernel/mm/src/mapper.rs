//! Page mapping and boot-memory reclamation interfaces.
//!
//! [`PageMapper`] is the single-page mapping primitive consumed by boot-time
//! code: one 4 KiB virtual page to one physical frame, no huge pages. The
//! architecture layer implements it over the real page tables;
//! [`FrameReclaimer`] is implemented by the physical allocator and signals
//! that boot-only regions may be returned to general use.

use core::fmt;

use argon_core::paging::{Page, PhysFrame};

bitflags::bitflags! {
    /// Page mapping attribute flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct MapFlags: u64 {
        /// Entry is present; translations through it are valid.
        const PRESENT       = 1 << 0;
        /// Page is writable.
        const WRITABLE      = 1 << 1;
        /// Page is accessible from user mode.
        const USER          = 1 << 2;
        /// Caching disabled for this page.
        const CACHE_DISABLE = 1 << 3;
    }
}

/// Error returned by [`PageMapper::map`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapError {
    /// A page-table frame could not be allocated.
    FrameAllocationFailed,
    /// The page is already mapped to a different frame.
    AlreadyMapped,
}

impl fmt::Display for MapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FrameAllocationFailed => f.write_str("page-table frame allocation failed"),
            Self::AlreadyMapped => f.write_str("page is already mapped to a different frame"),
        }
    }
}

impl core::error::Error for MapError {}

/// Error returned by [`PageMapper::unmap`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnmapError {
    /// The page is not mapped.
    NotMapped,
}

impl fmt::Display for UnmapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotMapped => f.write_str("page is not mapped"),
        }
    }
}

impl core::error::Error for UnmapError {}

/// Single-page mapping primitive.
///
/// Implementations must make the page's memory accessible before `map`
/// returns (including any TLB maintenance) and inaccessible after `unmap`
/// returns. Boot-time callers additionally rely on identity mappings, i.e.
/// they pass a frame whose number equals the page's number; the trait itself
/// does not require that.
pub trait PageMapper {
    /// Maps `page` to `frame` with the given flags.
    ///
    /// # Errors
    ///
    /// Returns a [`MapError`] if the mapping cannot be established; the page
    /// is left unmapped in that case.
    fn map(&mut self, page: Page, frame: PhysFrame, flags: MapFlags) -> Result<(), MapError>;

    /// Removes the mapping for `page`.
    ///
    /// # Errors
    ///
    /// Returns [`UnmapError::NotMapped`] if no mapping exists.
    fn unmap(&mut self, page: Page) -> Result<(), UnmapError>;
}

/// Boot-memory reclamation hook.
///
/// Implemented by the physical frame allocator. Called once all boot-time
/// mappings over a firmware region have been torn down, allowing the
/// allocator to hand the region's frames to general use. Reclaiming while a
/// mapping still exists would hand out frames that are still readable
/// through stale translations, so callers must only invoke this after every
/// unmap has succeeded.
pub trait FrameReclaimer {
    /// Returns reclaimable boot regions to the general allocator.
    fn reclaim_regions(&mut self);
}
