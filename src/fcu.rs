//! FCU register access and the hardware sequencer interface
//!
//! [`Sequencer`] is the capability boundary between the operation
//! executors and the hardware: P/E mode entry and exit, FACI command
//! issue, completion classification and the control-plane registers all
//! go through it. [`Fcu`] implements it over the memory-mapped Flash
//! Control Unit of the RX65x.
//!
//! The FACI command-issue paths carry `#[link_section = ".data"]` so they
//! execute from RAM. Code flash cannot be read while it is being
//! programmed or erased, so nothing on those paths may fetch instructions
//! from it.

use vcell::VolatileCell;

use crate::control::{AccessWindow, LockBitStatus, NonCachedRange, StartupArea, SwapState};
#[cfg(feature = "dual-bank")]
use crate::control::Bank;
use crate::geometry::{self, FlashType};
use crate::{Error, Result};

/// FCU peripheral register base
const FCU_BASE: usize = 0x007F_E000;
/// FACI command-issuing area; commands and program data are written here
const FACI_CMD_AREA: usize = 0x007E_0000;
/// ROM cache and non-cached range registers
const CACHE_BASE: usize = 0x0008_1000;
/// Flash write/erase protect register
const FWEPROR: usize = 0x0008_C296;
/// Configuration area address for access window and startup area
const CONFIG_ACCESS_STARTUP: u32 = 0x0000_A160;
/// Configuration area address for the bank-mode select
#[cfg(feature = "dual-bank")]
const CONFIG_BANK_MODE: u32 = 0x0000_A190;
/// Option memory holding the current bank-swap setting
#[cfg(feature = "dual-bank")]
const BANKSEL: usize = 0xFE7F_5D20;

// FACI command bytes
const CMD_PROGRAM: u8 = 0xE8;
const CMD_BLOCK_ERASE: u8 = 0x20;
const CMD_BLANK_CHECK: u8 = 0x71;
const CMD_LOCK_BIT_PROGRAM: u8 = 0x77;
const CMD_CONFIG_SET: u8 = 0x40;
const CMD_FINAL: u8 = 0xD0;
const CMD_STATUS_CLEAR: u8 = 0x50;
const CMD_FORCED_STOP: u8 = 0xB3;

// FENTRYR key plus mode bits
const FENTRYR_KEY: u16 = 0xAA00;
const FENTRYR_CODE_FLASH: u16 = 0x0001;
const FENTRYR_DATA_FLASH: u16 = 0x0080;

// FPCKAR key; low byte carries FCLK in MHz
const FPCKAR_KEY: u16 = 0x1E00;
// FSUACR key; low bits carry the startup-area select
const FSUACR_KEY: u16 = 0x6600;

// FSTATR bits
const FSTATR_FRDY: u32 = 1 << 15;
const FSTATR_ILGLERR: u32 = 1 << 14;
const FSTATR_ERSERR: u32 = 1 << 13;
const FSTATR_PRGERR: u32 = 1 << 12;
const FSTATR_DBFULL: u32 = 1 << 10;

// FASTAT bits
const FASTAT_CFAE: u8 = 1 << 7;
const FASTAT_DFAE: u8 = 1 << 3;

// FPESTAT error code for a lock-bit protected block
const FPESTAT_LOCK_BIT: u16 = 0x0002;

// Bounded spin counts for register handshakes that complete in a few
// peripheral clocks; operation completion uses the staged wait counts
// instead.
const PE_MODE_RETRIES: u32 = 4;
const HANDSHAKE_SPIN: u32 = 0x0010_0000;

/// Completion classification of the last FCU command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// Command finished without error
    Ok,
    /// Illegal command sequence; the FCU is command-locked until a forced
    /// stop is issued
    CommandLocked,
    /// Erasure failed
    EraseFailed,
    /// Programming failed (typically a non-blank target)
    ProgramFailed,
    /// The target block's lock bit is set
    LockBitViolation,
    /// The target lies outside the access window
    AccessWindowViolation,
}

/// Hardware sequencer capability interface
///
/// The executors in [`crate::flash`] drive every operation through this
/// trait; the MMIO implementation is [`Fcu`]. Command issue is split from
/// completion: `issue_*` starts a command, the caller polls [`busy`] (or
/// waits for the flash-ready interrupt) and then classifies the outcome
/// with [`consume_status`].
///
/// [`busy`]: Sequencer::busy
/// [`consume_status`]: Sequencer::consume_status
pub trait Sequencer {
    /// Brings the sequencer to a known idle state and programs the flash
    /// clock notification.
    fn init(&mut self, fclk_hz: u32) -> Result<()>;

    /// Reprograms the flash clock notification. The frequency has already
    /// been validated against the legal FCLK range.
    fn set_clock(&mut self, fclk_hz: u32);

    /// Enters P/E mode for the given region.
    fn enter_pe(&mut self, flash_type: FlashType) -> Result<()>;

    /// Leaves P/E mode. On failure the hardware is in an undefined state
    /// until the next [`reset`](Sequencer::reset).
    fn exit_pe(&mut self) -> Result<()>;

    /// Forces the sequencer back to idle and leaves P/E mode.
    fn reset(&mut self);

    /// Issues the forced-stop command, clearing a command-locked state.
    fn forced_stop(&mut self);

    /// True while a command is executing.
    fn busy(&self) -> bool;

    /// Classifies and clears the completion status of the last command.
    fn consume_status(&mut self) -> Completion;

    /// Starts erasure of the block containing `block_addr`.
    fn issue_erase(&mut self, block_addr: u32) -> Result<()>;

    /// Starts a blank check over `num_bytes` at `addr`.
    fn issue_blank_check(&mut self, addr: u32, num_bytes: u32) -> Result<()>;

    /// Result of the last blank check; true if the range was blank.
    fn blank_result(&self) -> bool;

    /// Programs one minimum-program-size unit at `dest`.
    ///
    /// When `dest` is code flash the source must be RAM resident.
    fn issue_program(&mut self, src: &[u8], dest: u32) -> Result<()>;

    /// Reads the current access window.
    fn access_window(&self) -> AccessWindow;

    /// Starts the configuration write for a new access window. Requires
    /// code-flash P/E mode; completion is polled like any other command.
    fn issue_access_window(&mut self, window: &AccessWindow) -> Result<()>;

    /// Enables or disables lock-bit protection for subsequent erasures.
    fn set_lock_bit_protection(&mut self, enable: bool);

    /// Starts a lock-bit read for the block containing `block_addr`.
    fn issue_lock_bit_read(&mut self, block_addr: u32) -> Result<()>;

    /// Result of the last lock-bit read.
    fn lock_bit_result(&self) -> LockBitStatus;

    /// Starts a lock-bit program for the block containing `block_addr`.
    fn issue_lock_bit_write(&mut self, block_addr: u32) -> Result<()>;

    /// Reads the temporary startup-area select.
    fn swap_state(&self) -> SwapState;

    /// Writes the temporary startup-area select.
    fn set_swap_state(&mut self, state: SwapState);

    /// Reads the permanent startup-area flag.
    fn startup_area(&self) -> StartupArea;

    /// Starts the configuration write toggling the permanent startup-area
    /// flag. Requires code-flash P/E mode.
    fn issue_startup_area_toggle(&mut self) -> Result<()>;

    /// Enables the ROM cache, invalidating it first.
    fn rom_cache_enable(&mut self) -> Result<()>;

    /// Disables the ROM cache.
    fn rom_cache_disable(&mut self);

    /// True if the ROM cache is enabled.
    fn rom_cache_enabled(&self) -> bool;

    /// Programs one of the two non-cached ranges. The range has already
    /// been validated.
    fn set_non_cached_range(&mut self, index: u8, range: &NonCachedRange);

    /// Reads one of the two non-cached ranges.
    fn non_cached_range(&self, index: u8) -> NonCachedRange;

    /// Unmasks the flash-ready completion interrupt.
    fn enable_ready_interrupt(&mut self, priority: u8);

    /// Masks the flash-ready completion interrupt.
    fn disable_ready_interrupt(&mut self);

    /// Reads the currently selected bank.
    #[cfg(feature = "dual-bank")]
    fn bank(&self) -> Bank;

    /// Starts the configuration write swapping the active bank. Requires
    /// code-flash P/E mode; takes effect on the next reset.
    #[cfg(feature = "dual-bank")]
    fn issue_bank_toggle(&mut self) -> Result<()>;
}

/// FCU peripheral registers
#[repr(C)]
pub struct RegisterBlock {
    _reserved0: [u8; 0x410],
    /// Flash access status
    pub fastat: VolatileCell<u8>,
    /// Flash access error interrupt enable
    pub faeint: VolatileCell<u8>,
    /// Flash ready interrupt enable
    pub frdyie: VolatileCell<u8>,
    _reserved1: [u8; 0x1D],
    /// Command start address
    pub fsaddr: VolatileCell<u32>,
    /// Command end address
    pub feaddr: VolatileCell<u32>,
    _reserved2: [u8; 0x48],
    /// Flash status
    pub fstatr: VolatileCell<u32>,
    /// P/E mode entry
    pub fentryr: VolatileCell<u16>,
    _reserved3: [u8; 6],
    /// Sequencer setup initialization
    pub fsuinitr: VolatileCell<u16>,
    _reserved4: [u8; 0x12],
    /// Command monitor
    pub fcmdr: VolatileCell<u16>,
    _reserved5: [u8; 0xE],
    /// Lock-bit read result
    pub flkstat: VolatileCell<u8>,
    _reserved6: [u8; 0xF],
    /// P/E error status
    pub fpestat: VolatileCell<u16>,
    _reserved7: [u8; 0xE],
    /// Blank-check control
    pub fbccnt: VolatileCell<u8>,
    _reserved8: [u8; 3],
    /// Blank-check result
    pub fbcstat: VolatileCell<u8>,
    _reserved9: [u8; 3],
    /// Programmed-area start address
    pub fpsaddr: VolatileCell<u32>,
    /// Access-window monitor
    pub fawmon: VolatileCell<u32>,
    /// Erasure suspension priority
    pub fcpsr: VolatileCell<u16>,
    _reserved10: [u8; 2],
    /// Flash clock notification
    pub fpckar: VolatileCell<u16>,
    _reserved11: [u8; 2],
    /// Startup-area control
    pub fsuacr: VolatileCell<u16>,
    _reserved12: [u8; 2],
    /// Lock-bit protection control
    pub fprotr: VolatileCell<u16>,
}

/// ROM cache and non-cached range registers
#[repr(C)]
pub struct CacheRegisterBlock {
    /// ROM cache enable
    pub romce: VolatileCell<u16>,
    _reserved0: [u8; 2],
    /// ROM cache invalidation
    pub romciv: VolatileCell<u16>,
    _reserved1: [u8; 0x3A],
    /// Non-cached range 0 start address
    pub ncrg0: VolatileCell<u32>,
    /// Non-cached range 0 size and attributes
    pub ncrc0: VolatileCell<u32>,
    /// Non-cached range 1 start address
    pub ncrg1: VolatileCell<u32>,
    /// Non-cached range 1 size and attributes
    pub ncrc1: VolatileCell<u32>,
}

/// Classifies a raw status-register snapshot.
pub(crate) fn classify_status(fstatr: u32, fastat: u8, fpestat: u16) -> Completion {
    if fstatr & FSTATR_ILGLERR != 0 {
        if fastat & (FASTAT_CFAE | FASTAT_DFAE) != 0 {
            return Completion::AccessWindowViolation;
        }
        return Completion::CommandLocked;
    }
    if fstatr & (FSTATR_ERSERR | FSTATR_PRGERR) != 0 {
        if fpestat == FPESTAT_LOCK_BIT {
            return Completion::LockBitViolation;
        }
        return if fstatr & FSTATR_ERSERR != 0 {
            Completion::EraseFailed
        } else {
            Completion::ProgramFailed
        };
    }
    Completion::Ok
}

/// Encodes an access window (plus the startup flag) into FAWMON layout.
pub(crate) fn encode_faw(window: &AccessWindow, btflg_default: bool) -> u32 {
    let faws = (window.start_addr >> 13) & 0x0FFF;
    let fawe = (window.end_addr >> 13) & 0x0FFF;
    let btflg = if btflg_default { 1u32 << 31 } else { 0 };
    btflg | (fawe << 16) | faws
}

/// Decodes the FAWMON register into window bounds.
pub(crate) fn decode_faw(fawmon: u32) -> AccessWindow {
    let faws = fawmon & 0x0FFF;
    let fawe = (fawmon >> 16) & 0x0FFF;
    AccessWindow {
        start_addr: 0xFF00_0000 | (faws << 13),
        end_addr: 0xFF00_0000 | (fawe << 13),
    }
}

// FACI command writes. These run from RAM so code-flash self-programming
// does not fetch instructions from the region being modified.

#[link_section = ".data"]
#[inline(never)]
fn faci_cmd(cmd: u8) {
    // NOTE(unsafe) byte store to the command-issuing area; the target is
    // selected through FSADDR, not through this address
    unsafe { core::ptr::write_volatile(FACI_CMD_AREA as *mut u8, cmd) }
}

#[link_section = ".data"]
#[inline(never)]
fn faci_data(word: u16) {
    // NOTE(unsafe) program data is fed to the same area as 16-bit stores
    unsafe { core::ptr::write_volatile(FACI_CMD_AREA as *mut u16, word) }
}

/// The memory-mapped Flash Control Unit
///
/// There is exactly one FCU; [`Fcu::take`] is unsafe because the caller
/// asserts sole ownership of it.
pub struct Fcu {
    _private: (),
}

impl Fcu {
    /// Claims the FCU.
    ///
    /// # Safety
    ///
    /// Only one `Fcu` may exist. Constructing a second one aliases the
    /// command sequencer and breaks the mutual-exclusion guarantees of
    /// the driver built on top.
    pub unsafe fn take() -> Fcu {
        Fcu { _private: () }
    }

    fn regs(&self) -> &RegisterBlock {
        // NOTE(unsafe) owning `Fcu` grants access to the register block
        unsafe { &*(FCU_BASE as *const RegisterBlock) }
    }

    fn cache_regs(&self) -> &CacheRegisterBlock {
        // NOTE(unsafe) same ownership argument as `regs`
        unsafe { &*(CACHE_BASE as *const CacheRegisterBlock) }
    }

    fn set_write_protect(&mut self, protect: bool) {
        let v: u8 = if protect { 0x02 } else { 0x01 };
        // NOTE(unsafe) FWEPROR sits outside the FCU block proper
        unsafe { core::ptr::write_volatile(FWEPROR as *mut u8, v) }
    }

    /// Spins until FRDY or the handshake bound runs out.
    fn wait_frdy(&self) -> Result<()> {
        for _ in 0..HANDSHAKE_SPIN {
            if !self.busy() {
                return Ok(());
            }
        }
        Err(Error::Timeout)
    }

    /// Issues a configuration-set command: 16 bytes of configuration data
    /// written to the given configuration-area address.
    fn issue_config_set(&mut self, config_addr: u32, words: &[u16; 8]) -> Result<()> {
        let regs = self.regs();
        regs.fsaddr.set(config_addr);
        faci_cmd(CMD_CONFIG_SET);
        faci_cmd(0x08);
        for &w in words.iter() {
            faci_data(w);
            // the data buffer is two words deep
            let mut spin = 0;
            while regs.fstatr.get() & FSTATR_DBFULL != 0 {
                spin += 1;
                if spin > HANDSHAKE_SPIN {
                    return Err(Error::Timeout);
                }
            }
        }
        faci_cmd(CMD_FINAL);
        Ok(())
    }
}

impl Sequencer for Fcu {
    fn init(&mut self, fclk_hz: u32) -> Result<()> {
        self.forced_stop();
        self.wait_frdy()?;
        self.set_clock(fclk_hz);
        self.regs().fentryr.set(FENTRYR_KEY);
        // completion interrupts stay masked until a callback is registered
        self.regs().frdyie.set(0x00);
        Ok(())
    }

    fn set_clock(&mut self, fclk_hz: u32) {
        // round up so the wait states stay conservative
        let mhz = (fclk_hz + 999_999) / 1_000_000;
        self.regs().fpckar.set(FPCKAR_KEY | mhz as u16);
    }

    fn enter_pe(&mut self, flash_type: FlashType) -> Result<()> {
        self.set_write_protect(false);
        let mode = match flash_type {
            FlashType::CodeFlash => FENTRYR_KEY | FENTRYR_CODE_FLASH,
            FlashType::DataFlash => FENTRYR_KEY | FENTRYR_DATA_FLASH,
        };
        let expect = mode & 0x00FF;
        for _ in 0..PE_MODE_RETRIES {
            self.regs().fentryr.set(mode);
            if self.regs().fentryr.get() == expect {
                return Ok(());
            }
        }
        Err(Error::Failure)
    }

    fn exit_pe(&mut self) -> Result<()> {
        for _ in 0..PE_MODE_RETRIES {
            self.regs().fentryr.set(FENTRYR_KEY);
            if self.regs().fentryr.get() == 0x0000 {
                self.set_write_protect(true);
                return Ok(());
            }
        }
        Err(Error::Failure)
    }

    fn reset(&mut self) {
        self.forced_stop();
        // bounded wait; a dead sequencer cannot be helped further here
        let _ = self.wait_frdy();
        self.regs().fentryr.set(FENTRYR_KEY);
        self.set_write_protect(true);
    }

    fn forced_stop(&mut self) {
        faci_cmd(CMD_FORCED_STOP);
    }

    fn busy(&self) -> bool {
        self.regs().fstatr.get() & FSTATR_FRDY == 0
    }

    fn consume_status(&mut self) -> Completion {
        let regs = self.regs();
        let completion = classify_status(regs.fstatr.get(), regs.fastat.get(), regs.fpestat.get());
        if completion != Completion::Ok && completion != Completion::CommandLocked {
            // error bits latch until a status clear; a command lock needs
            // the forced stop issued by the recovery path instead
            faci_cmd(CMD_STATUS_CLEAR);
        }
        completion
    }

    fn issue_erase(&mut self, block_addr: u32) -> Result<()> {
        let regs = self.regs();
        regs.fcpsr.set(0x0001);
        regs.fsaddr.set(block_addr);
        faci_cmd(CMD_BLOCK_ERASE);
        faci_cmd(CMD_FINAL);
        Ok(())
    }

    fn issue_blank_check(&mut self, addr: u32, num_bytes: u32) -> Result<()> {
        let regs = self.regs();
        regs.fbccnt.set(0x00);
        regs.fsaddr.set(addr);
        regs.feaddr.set(addr + num_bytes - 1);
        faci_cmd(CMD_BLANK_CHECK);
        faci_cmd(CMD_FINAL);
        Ok(())
    }

    fn blank_result(&self) -> bool {
        // BCST = 1 flags a non-blank unit
        self.regs().fbcstat.get() & 0x01 == 0
    }

    #[link_section = ".data"]
    #[inline(never)]
    fn issue_program(&mut self, src: &[u8], dest: u32) -> Result<()> {
        if geometry::is_cf_addr(dest) && !geometry::is_ram_addr(src.as_ptr() as usize) {
            return Err(Error::Address);
        }
        let regs = self.regs();
        regs.fsaddr.set(dest);
        faci_cmd(CMD_PROGRAM);
        faci_cmd((src.len() / 2) as u8);
        for pair in src.chunks_exact(2) {
            faci_data(u16::from_le_bytes([pair[0], pair[1]]));
            let mut spin = 0;
            while regs.fstatr.get() & FSTATR_DBFULL != 0 {
                spin += 1;
                if spin > HANDSHAKE_SPIN {
                    return Err(Error::Timeout);
                }
            }
        }
        faci_cmd(CMD_FINAL);
        Ok(())
    }

    fn access_window(&self) -> AccessWindow {
        decode_faw(self.regs().fawmon.get())
    }

    fn issue_access_window(&mut self, window: &AccessWindow) -> Result<()> {
        let faw = encode_faw(window, self.startup_area() == StartupArea::Default);
        let words = [
            (faw >> 16) as u16 | 0x8000,
            faw as u16,
            0xFFFF,
            0xFFFF,
            0xFFFF,
            0xFFFF,
            0xFFFF,
            0xFFFF,
        ];
        self.issue_config_set(CONFIG_ACCESS_STARTUP, &words)
    }

    fn set_lock_bit_protection(&mut self, enable: bool) {
        let v = 0x5500 | if enable { 0x0001 } else { 0x0000 };
        self.regs().fprotr.set(v);
    }

    fn issue_lock_bit_read(&mut self, block_addr: u32) -> Result<()> {
        let regs = self.regs();
        // BCDIR selects lock-bit read mode for the blank-check command
        regs.fbccnt.set(0x01);
        regs.fsaddr.set(block_addr);
        faci_cmd(CMD_BLANK_CHECK);
        faci_cmd(CMD_FINAL);
        Ok(())
    }

    fn lock_bit_result(&self) -> LockBitStatus {
        if self.regs().flkstat.get() & 0x01 == 0 {
            LockBitStatus::Locked
        } else {
            LockBitStatus::Unlocked
        }
    }

    fn issue_lock_bit_write(&mut self, block_addr: u32) -> Result<()> {
        self.regs().fsaddr.set(block_addr);
        faci_cmd(CMD_LOCK_BIT_PROGRAM);
        faci_cmd(CMD_FINAL);
        Ok(())
    }

    fn swap_state(&self) -> SwapState {
        SwapState::from_raw((self.regs().fsuacr.get() & 0x0007) as u8)
            .unwrap_or(SwapState::FollowStartupFlag)
    }

    fn set_swap_state(&mut self, state: SwapState) {
        self.regs().fsuacr.set(FSUACR_KEY | state as u16);
    }

    fn startup_area(&self) -> StartupArea {
        if self.regs().fawmon.get() & (1 << 31) != 0 {
            StartupArea::Default
        } else {
            StartupArea::Alternate
        }
    }

    fn issue_startup_area_toggle(&mut self) -> Result<()> {
        let window = self.access_window();
        let toggled = self.startup_area() != StartupArea::Default;
        let faw = encode_faw(&window, toggled);
        let words = [
            (faw >> 16) as u16 | 0x8000,
            faw as u16,
            0xFFFF,
            0xFFFF,
            0xFFFF,
            0xFFFF,
            0xFFFF,
            0xFFFF,
        ];
        self.issue_config_set(CONFIG_ACCESS_STARTUP, &words)
    }

    fn rom_cache_enable(&mut self) -> Result<()> {
        let regs = self.cache_regs();
        regs.romciv.set(0x0001);
        let mut spin = 0;
        while regs.romciv.get() & 0x0001 != 0 {
            spin += 1;
            if spin > HANDSHAKE_SPIN {
                return Err(Error::Timeout);
            }
        }
        regs.romce.set(0x0001);
        Ok(())
    }

    fn rom_cache_disable(&mut self) {
        self.cache_regs().romce.set(0x0000);
    }

    fn rom_cache_enabled(&self) -> bool {
        self.cache_regs().romce.get() & 0x0001 != 0
    }

    fn set_non_cached_range(&mut self, index: u8, range: &NonCachedRange) {
        let regs = self.cache_regs();
        let ncrc = (range.size - 16) | range.type_mask as u32;
        if index == 0 {
            regs.ncrg0.set(range.start_addr);
            regs.ncrc0.set(ncrc);
        } else {
            regs.ncrg1.set(range.start_addr);
            regs.ncrc1.set(ncrc);
        }
    }

    fn non_cached_range(&self, index: u8) -> NonCachedRange {
        let regs = self.cache_regs();
        let (ncrg, ncrc) = if index == 0 {
            (regs.ncrg0.get(), regs.ncrc0.get())
        } else {
            (regs.ncrg1.get(), regs.ncrc1.get())
        };
        NonCachedRange {
            start_addr: ncrg,
            size: (ncrc & !0x0000_000F) + 16,
            type_mask: (ncrc & 0x0000_000E) as u8,
        }
    }

    fn enable_ready_interrupt(&mut self, _priority: u8) {
        // the priority itself is programmed into the ICU by board support
        // code; the FCU side only unmasks FRDYI
        self.regs().frdyie.set(0x01);
    }

    fn disable_ready_interrupt(&mut self) {
        self.regs().frdyie.set(0x00);
    }

    #[cfg(feature = "dual-bank")]
    fn bank(&self) -> Bank {
        // NOTE(unsafe) read of the option-setting memory
        let banksel = unsafe { core::ptr::read_volatile(BANKSEL as *const u32) };
        if banksel & 0x0000_0007 == 0x0000_0007 {
            Bank::Bank0
        } else {
            Bank::Bank1
        }
    }

    #[cfg(feature = "dual-bank")]
    fn issue_bank_toggle(&mut self) -> Result<()> {
        let swapped = self.bank() == Bank::Bank0;
        let w0 = if swapped { 0xFFF8 } else { 0xFFFF };
        let words = [w0, 0xFFFF, 0xFFFF, 0xFFFF, 0xFFFF, 0xFFFF, 0xFFFF, 0xFFFF];
        self.issue_config_set(CONFIG_BANK_MODE, &words)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_classification() {
        assert_eq!(classify_status(FSTATR_FRDY, 0, 0), Completion::Ok);
        assert_eq!(
            classify_status(FSTATR_FRDY | FSTATR_ILGLERR, 0, 0),
            Completion::CommandLocked
        );
        assert_eq!(
            classify_status(FSTATR_FRDY | FSTATR_ILGLERR, FASTAT_DFAE, 0),
            Completion::AccessWindowViolation
        );
        assert_eq!(
            classify_status(FSTATR_FRDY | FSTATR_ERSERR, 0, 0),
            Completion::EraseFailed
        );
        assert_eq!(
            classify_status(FSTATR_FRDY | FSTATR_PRGERR, 0, 0),
            Completion::ProgramFailed
        );
        assert_eq!(
            classify_status(FSTATR_FRDY | FSTATR_PRGERR, 0, FPESTAT_LOCK_BIT),
            Completion::LockBitViolation
        );
    }

    #[test]
    fn access_window_encoding_round_trips() {
        let window = AccessWindow {
            start_addr: 0xFFE0_0000,
            end_addr: 0xFFF0_0000,
        };
        let decoded = decode_faw(encode_faw(&window, true));
        assert_eq!(decoded.start_addr, window.start_addr);
        assert_eq!(decoded.end_addr, window.end_addr);
    }

    #[test]
    fn startup_flag_lives_in_bit_31() {
        let window = AccessWindow {
            start_addr: 0xFFE0_0000,
            end_addr: 0xFFE0_0000,
        };
        assert_ne!(encode_faw(&window, true) & (1 << 31), 0);
        assert_eq!(encode_faw(&window, false) & (1 << 31), 0);
    }
}
