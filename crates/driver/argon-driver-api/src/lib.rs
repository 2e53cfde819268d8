//! Driver contract for the Argon kernel.
//!
//! The driver registry (which lives in the kernel proper) discovers devices
//! by calling per-subsystem probe functions; a probe inspects the hardware
//! and hands back a [`Driver`] instance when its device is present. The
//! registry then calls [`Driver::init`], passing a diagnostic sink that the
//! driver writes human-readable progress lines to.
//!
//! This crate only defines the contract, so driver crates do not depend on
//! kernel internals.

#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]

use core::fmt;

/// Error raised by a driver during probe or initialization.
///
/// Carries the subsystem name alongside a static message so the registry can
/// attribute failures without knowing each driver's internal error type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriverError {
    /// Subsystem that raised the error (e.g. `"acpi"`).
    pub module: &'static str,
    /// Human-readable description of the failure.
    pub message: &'static str,
}

impl fmt::Display for DriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.module, self.message)
    }
}

impl core::error::Error for DriverError {}

/// Base trait implemented by every Argon driver.
pub trait Driver {
    /// Short name of this driver (e.g. `"acpi"`).
    fn name(&self) -> &'static str;

    /// Driver version as `(major, minor, patch)`.
    fn version(&self) -> (u16, u16, u16);

    /// Initializes the driver.
    ///
    /// Progress and discovery results are reported as formatted lines to
    /// `sink`; the registry decides where those lines end up (early serial,
    /// the kernel log, or nowhere).
    ///
    /// # Errors
    ///
    /// Returns a [`DriverError`] if initialization cannot complete. The
    /// registry marks the driver as failed and continues with the next one.
    fn init(&mut self, sink: &mut dyn fmt::Write) -> Result<(), DriverError>;
}
