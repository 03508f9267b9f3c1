//! Control-plane commands and their configuration types
//!
//! Auxiliary operations that are not erase/write/blank-check go through
//! [`crate::flash::Flash::control`] as a [`Command`]. Commands that read
//! hardware state take `&mut` out-parameters; validation of every
//! configuration type happens here, before anything touches a register.

use crate::flash::Event;
use crate::geometry::{CF_BLOCK_END, CF_LO_ADDR, ROM_SIZE_BYTES};
use crate::{Error, Result};

/// Access-window addresses are encoded with this granularity; the low
/// bits of both bounds must be zero.
pub const ACCESS_WINDOW_GRANULARITY: u32 = 8 * 1024;

/// Non-cached range: exclude instruction fetches from the ROM cache
pub const NC_INSTRUCTION_FETCH: u8 = 1 << 1;
/// Non-cached range: exclude operand accesses from the ROM cache
pub const NC_OPERAND_ACCESS: u8 = 1 << 2;
/// Non-cached range: exclude DMA accesses from the ROM cache
pub const NC_DMA: u8 = 1 << 3;

const NC_MASK_ALL: u8 = NC_INSTRUCTION_FETCH | NC_OPERAND_ACCESS | NC_DMA;

/// Control command
///
/// Commands that mutate hardware require the driver to be open and idle;
/// the exceptions are [`Command::Reset`] (allowed from any state, for
/// recovery), [`Command::StatusGet`] (the BGO poll) and
/// [`Command::ConfigClock`] (additionally allowed while opening).
#[non_exhaustive]
pub enum Command<'a> {
    /// Force the sequencer to idle and the driver back to ready.
    Reset,
    /// Poll the driver state; `Busy` while an operation is in flight.
    StatusGet,
    /// Register the BGO completion callback and its interrupt priority.
    SetBgoCallback(InterruptConfig),
    /// Enable the ROM cache.
    RomCacheEnable,
    /// Disable the ROM cache.
    RomCacheDisable,
    /// Read whether the ROM cache is enabled.
    RomCacheStatus(&'a mut bool),
    /// Program non-cached range 0.
    SetNonCachedRange0(NonCachedRange),
    /// Program non-cached range 1.
    SetNonCachedRange1(NonCachedRange),
    /// Read non-cached range 0.
    GetNonCachedRange0(&'a mut NonCachedRange),
    /// Read non-cached range 1.
    GetNonCachedRange1(&'a mut NonCachedRange),
    /// Read the temporary startup-area select.
    SwapStateGet(&'a mut SwapState),
    /// Write the temporary startup-area select.
    SwapStateSet(SwapState),
    /// Read the permanent startup-area flag.
    SwapFlagGet(&'a mut StartupArea),
    /// Toggle the permanent startup-area flag.
    SwapFlagToggle,
    /// Read the current access window.
    AccessWindowGet(&'a mut AccessWindow),
    /// Program a new access window.
    AccessWindowSet(AccessWindow),
    /// Enable lock-bit protection for subsequent erasures.
    LockBitEnable,
    /// Disable lock-bit protection for subsequent erasures.
    LockBitDisable,
    /// Read the lock bit of the block containing `block_address`.
    LockBitRead {
        /// Any address inside the block of interest
        block_address: u32,
        /// Receives the lock-bit state
        result: &'a mut LockBitStatus,
    },
    /// Set the lock bit of the block containing `block_address`.
    LockBitWrite {
        /// Any address inside the block of interest
        block_address: u32,
    },
    /// Notify the driver of the flash clock frequency in Hz.
    ConfigClock(u32),
    /// Swap the active code-flash bank; takes effect on the next reset.
    #[cfg(feature = "dual-bank")]
    BankToggle,
    /// Read the currently active code-flash bank.
    #[cfg(feature = "dual-bank")]
    BankGet(&'a mut Bank),
}

/// BGO completion callback registration
#[derive(Clone, Copy)]
pub struct InterruptConfig {
    /// Flash-ready interrupt priority, 1 through 15
    pub priority: u8,
    /// Invoked from interrupt context with the completion event
    pub callback: fn(Event),
}

impl InterruptConfig {
    pub(crate) fn validate(&self) -> Result<()> {
        if self.priority < 1 || self.priority > 15 {
            return Err(Error::Param);
        }
        Ok(())
    }
}

/// Code-flash access window bounds
///
/// Erase and program requests outside `[start_addr, end_addr)` are
/// rejected by the hardware. `CF_BLOCK_END` as the end address means the
/// window extends to the end of flash.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessWindow {
    /// First address inside the window
    pub start_addr: u32,
    /// First address past the window, or the end-of-flash sentinel
    pub end_addr: u32,
}

impl AccessWindow {
    pub(crate) fn validate(&self) -> Result<()> {
        if self.start_addr > self.end_addr || self.start_addr < CF_LO_ADDR {
            return Err(Error::AccessWindow);
        }
        if self.start_addr & (ACCESS_WINDOW_GRANULARITY - 1) != 0 {
            return Err(Error::AccessWindow);
        }
        // the sentinel is exempt from the granularity rule
        if self.end_addr != CF_BLOCK_END && self.end_addr & (ACCESS_WINDOW_GRANULARITY - 1) != 0 {
            return Err(Error::AccessWindow);
        }
        Ok(())
    }
}

/// A ROM range excluded from the ROM cache
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NonCachedRange {
    /// Start address, 16-byte aligned, inside ROM
    pub start_addr: u32,
    /// Size in bytes, a power of two no smaller than 16
    pub size: u32,
    /// Which access kinds bypass the cache, a mask of the `NC_*` bits
    pub type_mask: u8,
}

impl NonCachedRange {
    pub(crate) fn validate(&self) -> Result<()> {
        if self.start_addr & 0xF != 0 {
            return Err(Error::Param);
        }
        if self.start_addr & 0xFFC0_0000 != 0xFFC0_0000 {
            return Err(Error::Param);
        }
        if !self.size.is_power_of_two() || self.size < 16 || self.size > ROM_SIZE_BYTES {
            return Err(Error::Param);
        }
        if self.start_addr as u64 + self.size as u64 > 0x1_0000_0000 {
            return Err(Error::Param);
        }
        if self.type_mask & !NC_MASK_ALL != 0 {
            return Err(Error::Param);
        }
        Ok(())
    }
}

/// Temporary startup-area select (SAS)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SwapState {
    /// Startup area follows the permanent flag
    FollowStartupFlag = 0,
    /// Startup area forced to the default block
    Default = 2,
    /// Startup area forced to the alternate block
    Alternate = 3,
    /// Keep the current selection latched
    Current = 4,
}

impl SwapState {
    pub(crate) fn from_raw(raw: u8) -> Option<SwapState> {
        match raw {
            0 => Some(SwapState::FollowStartupFlag),
            2 => Some(SwapState::Default),
            3 => Some(SwapState::Alternate),
            4 => Some(SwapState::Current),
            _ => None,
        }
    }
}

/// Permanent startup-area flag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartupArea {
    /// Boot from the default block
    Default,
    /// Boot from the alternate block
    Alternate,
}

/// Per-block lock-bit state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockBitStatus {
    /// The block is protected
    Locked,
    /// The block is not protected
    Unlocked,
}

/// Code-flash bank selection
#[cfg(feature = "dual-bank")]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bank {
    /// Bank 0 mapped to the startup addresses
    Bank0,
    /// Bank 1 mapped to the startup addresses
    Bank1,
}
