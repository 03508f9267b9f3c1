//! Driver for the on-chip flash of RX65x microcontrollers
//!
//! This is a driver for the Flash Control Unit (FCU) found on RX65x
//! parts: block erase, blank check and programming of both the code-flash
//! and data-flash regions, plus the control-plane commands (access window,
//! lock bits, startup-area swap, ROM cache, non-cached ranges, flash clock
//! notification and dual-bank selection).
//!
//! All operations run through a single [`flash::Flash`] driver which owns a
//! [`fcu::Sequencer`] backend. On hardware that backend is [`fcu::Fcu`],
//! the memory-mapped FCU itself. Operations either block until the FCU
//! reports completion or, when background operation (BGO) is enabled, start
//! the command and complete later through the flash-ready interrupt; the
//! user's handler calls [`flash::Flash::on_interrupt`] which finishes the
//! operation and invokes the registered callback.
//!
//! ## Example usage:
//! ```ignore
//! let mut flash = Flash::new(unsafe { Fcu::take() });
//! flash.open(Config::default().fclk_hz(60_000_000))?;
//!
//! // Erase the first data-flash block and program it.
//! flash.erase(geometry::DF_BLOCK_0, 1)?;
//! flash.write(&data, geometry::DF_BLOCK_0)?;
//! ```

#![deny(missing_docs)]
#![cfg_attr(not(test), no_std)]

pub mod control;
pub mod fcu;
pub mod flash;
pub mod geometry;
pub(crate) mod params;
pub mod state;

pub use crate::flash::{BlankCheck, Config, Event, Flash};
pub use crate::geometry::FlashType;

/// Flash operation result
pub type Result<T> = core::result::Result<T, Error>;

/// Flash driver error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// Another operation is in flight, or the driver is not open
    Busy,
    /// `open()` called twice without an intermediate `close()`
    AlreadyOpen,
    /// Address is not a valid code-flash or data-flash address, or is
    /// misaligned for the requested operation
    Address,
    /// Block count is zero or runs past the end of the flash region
    Blocks,
    /// Byte count is zero, misaligned, or runs past the end of the region
    Bytes,
    /// Hardware or sequencer failure; the FCU was reset
    Failure,
    /// The FCU latched an illegal command sequence and entered the
    /// command-locked state; a forced stop was issued to recover
    CmdLocked,
    /// Operation rejected because the target block's lock bit is set
    LockBitSet,
    /// Access window violation, or invalid access-window bounds
    AccessWindow,
    /// The FCU did not complete within the staged worst-case wait count
    Timeout,
    /// Invalid control command argument
    Param,
    /// Flash clock out of the legal range
    Frequency,
}

/// Driver version, major
pub const VERSION_MAJOR: u32 = 0;
/// Driver version, minor
pub const VERSION_MINOR: u32 = 2;

/// Returns the driver version encoded as `major << 16 | minor`
pub fn version() -> u32 {
    (VERSION_MAJOR << 16) | VERSION_MINOR
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_encodes_major_minor() {
        assert_eq!(version(), (VERSION_MAJOR << 16) | VERSION_MINOR);
    }
}
