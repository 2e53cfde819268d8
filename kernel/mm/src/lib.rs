//! Memory-management contracts for the Argon kernel.
//!
//! The actual page-table walker and the physical frame allocator live in the
//! kernel's architecture layer; this crate defines the interfaces through
//! which boot-time code (such as firmware table discovery) manipulates
//! mappings without depending on either. Host tests substitute mock
//! implementations.

#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]

pub mod mapper;

pub use argon_core::paging::PAGE_SIZE;
pub use mapper::{FrameReclaimer, MapError, MapFlags, PageMapper, UnmapError};
