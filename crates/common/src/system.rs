//! Capability traits for the OS-level side effects the supervisor drives
//!
//! The supervisor never talks to systemd or sysfs directly; it goes through
//! these two seams. Production implementations live in the supervisor crate,
//! recording fakes in [`crate::test_utils`].
//!
//! Both capabilities are fast local operations, so the traits are
//! synchronous and object-safe; callers hold them as trait objects.

use crate::Result;

/// Masks and unmasks the system's sleep/suspend/hibernate transitions
pub trait SleepInhibitor: Send + Sync {
    /// Disable sleep system-wide. Idempotent.
    fn inhibit(&self) -> Result<()>;

    /// Re-enable sleep. Idempotent.
    fn allow(&self) -> Result<()>;
}

/// Raw access to the display brightness device
///
/// Values are opaque strings written back verbatim; the snapshot/restore
/// discipline lives above this seam, in the supervisor's system state.
pub trait DisplayDimmer: Send + Sync {
    /// Read the current brightness value.
    fn read(&self) -> Result<String>;

    /// Write a brightness value.
    fn write(&self, value: &str) -> Result<()>;
}
