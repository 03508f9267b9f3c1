//! Flash driver facade and operation executors
//!
//! [`Flash`] owns a [`Sequencer`] backend and runs every operation through
//! the same protocol: take the driver lock with the operation's state tag,
//! classify and validate the target, stage the operation descriptor, enter
//! P/E mode, issue the command. Foreground operations then poll the
//! sequencer inside the staged worst-case budget; background (BGO)
//! operations return immediately and complete through
//! [`Flash::on_interrupt`], which advances multi-step operations and
//! delivers an [`Event`] to the registered callback.
//!
//! Any hardware-level failure resets the sequencer before the lock is
//! released, so the driver is usable again as soon as the error is
//! reported.

use crate::control::Command;
#[cfg(feature = "dual-bank")]
use crate::control::Bank;
use crate::fcu::{Completion, Sequencer};
use crate::geometry::{self, FlashType};
use crate::params::{CurrentOperation, CurrentParameters};
use crate::state::{DriverLock, OpState};
use crate::{Error, Result};

/// Lowest legal flash clock frequency in Hz
pub const FCLK_MIN_HZ: u32 = 4_000_000;
/// Highest legal flash clock frequency in Hz
pub const FCLK_MAX_HZ: u32 = 60_000_000;

/// Completion event delivered to the BGO callback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum Event {
    /// Initial value before any operation has completed
    Initialized,
    /// An erase run finished
    EraseComplete,
    /// A write finished
    WriteComplete,
    /// A blank check found the range blank
    Blank,
    /// A blank check found programmed data
    NotBlank,
    /// A new access window was programmed
    AccessWindowSet,
    /// The permanent startup-area flag was toggled
    StartupAreaToggled,
    /// The active bank was swapped; takes effect on the next reset
    #[cfg(feature = "dual-bank")]
    ToggleBank,
    /// Illegal data-flash access
    ErrDfAccess,
    /// Illegal code-flash access
    ErrCfAccess,
    /// Lock-bit or protection violation
    ErrSecurity,
    /// The sequencer latched an illegal command sequence
    ErrCmdLocked,
    /// Generic hardware failure; the sequencer was reset
    ErrFailure,
}

/// Result of a foreground blank check, or a marker that a background one
/// was started
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlankCheck {
    /// The whole range is erased
    Blank,
    /// At least one programmed unit was found
    NotBlank,
    /// A background check was started; the result arrives as an [`Event`]
    InProgress,
}

/// Driver configuration passed to [`Flash::open`]
#[derive(Debug, Clone, Copy)]
pub struct Config {
    fclk_hz: u32,
    code_flash_bgo: bool,
    data_flash_bgo: bool,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            fclk_hz: 0,
            code_flash_bgo: false,
            data_flash_bgo: false,
        }
    }
}

impl Config {
    /// Sets the flash clock frequency in Hz. Mandatory; [`Flash::open`]
    /// rejects frequencies outside 4 to 60 MHz.
    pub fn fclk_hz(mut self, hz: u32) -> Self {
        self.fclk_hz = hz;
        self
    }

    /// Completes code-flash operations in the background.
    pub fn code_flash_bgo(mut self, enabled: bool) -> Self {
        self.code_flash_bgo = enabled;
        self
    }

    /// Completes data-flash operations in the background.
    pub fn data_flash_bgo(mut self, enabled: bool) -> Self {
        self.data_flash_bgo = enabled;
        self
    }
}

/// Start address of the block erased after the one at `block_addr`.
///
/// Data-flash runs ascend; code-flash runs walk toward lower addresses
/// following the block numbering.
fn next_erase_block(flash_type: FlashType, block_addr: u32) -> u32 {
    match flash_type {
        FlashType::DataFlash => block_addr + geometry::DF_BLOCK_SIZE,
        FlashType::CodeFlash => geometry::cf_prev_block_start(block_addr),
    }
}

fn completion_error(completion: Completion) -> Error {
    match completion {
        Completion::Ok => Error::Failure,
        Completion::CommandLocked => Error::CmdLocked,
        Completion::EraseFailed | Completion::ProgramFailed => Error::Failure,
        Completion::LockBitViolation => Error::LockBitSet,
        Completion::AccessWindowViolation => Error::AccessWindow,
    }
}

fn completion_event(completion: Completion, flash_type: Option<FlashType>) -> Event {
    match completion {
        Completion::Ok => Event::Initialized,
        Completion::CommandLocked => Event::ErrCmdLocked,
        Completion::LockBitViolation => Event::ErrSecurity,
        Completion::AccessWindowViolation => match flash_type {
            Some(FlashType::DataFlash) => Event::ErrDfAccess,
            _ => Event::ErrCfAccess,
        },
        Completion::EraseFailed | Completion::ProgramFailed => Event::ErrFailure,
    }
}

/// On-chip flash driver
///
/// Generic over the [`Sequencer`] backend; on hardware that is
/// [`crate::fcu::Fcu`].
pub struct Flash<S: Sequencer> {
    seq: S,
    lock: DriverLock,
    params: CurrentParameters,
    callback: Option<fn(Event)>,
    bgo_src: Option<&'static [u8]>,
    control_event: Option<Event>,
}

impl<S: Sequencer> Flash<S> {
    /// Wraps a sequencer backend. The driver starts closed; call
    /// [`open`](Flash::open) before any operation.
    pub fn new(seq: S) -> Flash<S> {
        Flash {
            seq,
            lock: DriverLock::new(),
            params: CurrentParameters::new(),
            callback: None,
            bgo_src: None,
            control_event: None,
        }
    }

    /// Releases the sequencer backend.
    pub fn free(self) -> S {
        self.seq
    }

    /// Initializes the sequencer and marks the driver ready.
    pub fn open(&mut self, config: Config) -> Result<()> {
        if config.fclk_hz < FCLK_MIN_HZ || config.fclk_hz > FCLK_MAX_HZ {
            return Err(Error::Frequency);
        }
        if self.lock.state() != OpState::Uninitialized {
            return Err(Error::AlreadyOpen);
        }
        self.lock.acquire(OpState::Initializing)?;
        self.params.fclk_hz = config.fclk_hz;
        self.params.bgo_enabled_cf = config.code_flash_bgo;
        self.params.bgo_enabled_df = config.data_flash_bgo;
        if let Err(e) = self.seq.init(config.fclk_hz) {
            self.lock.release_closed();
            return Err(e);
        }
        self.lock.release();
        Ok(())
    }

    /// Disables completion interrupts and marks the driver closed.
    pub fn close(&mut self) -> Result<()> {
        self.lock.acquire(OpState::Uninitialized)?;
        self.seq.disable_ready_interrupt();
        self.callback = None;
        self.bgo_src = None;
        self.control_event = None;
        self.params.operation = CurrentOperation::Idle;
        self.lock.release_closed();
        Ok(())
    }

    /// Erases `num_blocks` blocks starting at `block_start_address`.
    ///
    /// The address must be a block start. Code-flash runs proceed in
    /// ascending block-number order, i.e. toward lower addresses. With BGO
    /// enabled for the target region the call returns once the first block
    /// erase is started; completion arrives as [`Event::EraseComplete`].
    pub fn erase(&mut self, block_start_address: u32, num_blocks: u32) -> Result<()> {
        self.require_open()?;
        self.lock.acquire(OpState::Erasing)?;
        let flash_type = match geometry::erase_flash_type(block_start_address, num_blocks) {
            Ok(t) => t,
            Err(e) => {
                self.lock.release();
                return Err(e);
            }
        };
        if let Err(e) = self.params.set_erase_params(
            block_start_address,
            num_blocks,
            flash_type,
            self.callback.is_some(),
        ) {
            self.lock.release();
            return Err(e);
        }
        if self.seq.enter_pe(flash_type).is_err() {
            return Err(self.fail_unwind(Error::Failure));
        }
        let background = self.params.operation.is_background();
        loop {
            if let Err(e) = self.seq.issue_erase(self.params.dest_addr) {
                return Err(self.fail_unwind(e));
            }
            if background {
                return Ok(());
            }
            if let Err(e) = self.wait_for_completion() {
                return Err(self.fail_unwind(e));
            }
            self.params.current_count += 1;
            if self.params.current_count >= self.params.total_count {
                break;
            }
            self.params.dest_addr = next_erase_block(flash_type, self.params.dest_addr);
        }
        self.finish_blocking()
    }

    /// Checks whether `num_bytes` starting at `address` are erased.
    ///
    /// With BGO enabled for the target region the call returns
    /// [`BlankCheck::InProgress`]; the verdict arrives as
    /// [`Event::Blank`] or [`Event::NotBlank`].
    pub fn blank_check(&mut self, address: u32, num_bytes: u32) -> Result<BlankCheck> {
        self.require_open()?;
        self.lock.acquire(OpState::BlankChecking)?;
        let flash_type = match geometry::rw_flash_type(address, num_bytes, true) {
            Ok(t) => t,
            Err(e) => {
                self.lock.release();
                return Err(e);
            }
        };
        if let Err(e) =
            self.params
                .set_blankcheck_params(address, num_bytes, flash_type, self.callback.is_some())
        {
            self.lock.release();
            return Err(e);
        }
        if self.seq.enter_pe(flash_type).is_err() {
            return Err(self.fail_unwind(Error::Failure));
        }
        if let Err(e) = self.seq.issue_blank_check(address, num_bytes) {
            return Err(self.fail_unwind(e));
        }
        if self.params.operation.is_background() {
            return Ok(BlankCheck::InProgress);
        }
        if let Err(e) = self.wait_for_completion() {
            return Err(self.fail_unwind(e));
        }
        let blank = self.seq.blank_result();
        self.finish_blocking()?;
        Ok(if blank {
            BlankCheck::Blank
        } else {
            BlankCheck::NotBlank
        })
    }

    /// Programs `src` to `dest_address`, blocking until done.
    ///
    /// Length and destination must be multiples of the region's minimum
    /// program size, and the target must be blank. Code-flash sources must
    /// be RAM resident.
    pub fn write(&mut self, src: &[u8], dest_address: u32) -> Result<()> {
        self.require_open()?;
        if src.len() > geometry::RAM_SIZE_BYTES as usize {
            return Err(Error::Bytes);
        }
        self.lock.acquire(OpState::Writing)?;
        let num_bytes = src.len() as u32;
        let flash_type = match geometry::rw_flash_type(dest_address, num_bytes, false) {
            Ok(t) => t,
            Err(e) => {
                self.lock.release();
                return Err(e);
            }
        };
        if flash_type == FlashType::CodeFlash && !geometry::is_ram_addr(src.as_ptr() as usize) {
            self.lock.release();
            return Err(Error::Address);
        }
        if let Err(e) = self.params.set_write_params(
            dest_address,
            num_bytes,
            flash_type,
            false,
            self.callback.is_some(),
        ) {
            self.lock.release();
            return Err(e);
        }
        if self.seq.enter_pe(flash_type).is_err() {
            return Err(self.fail_unwind(Error::Failure));
        }
        let min = self.params.min_pgm_size as usize;
        let mut offset = 0usize;
        while offset < src.len() {
            let chunk = &src[offset..offset + min];
            if let Err(e) = self.seq.issue_program(chunk, self.params.dest_addr) {
                return Err(self.fail_unwind(e));
            }
            if let Err(e) = self.wait_for_completion() {
                return Err(self.fail_unwind(e));
            }
            offset += min;
            self.params.dest_addr += min as u32;
            self.params.current_count += min as u32;
        }
        self.finish_blocking()
    }

    /// Programs `src` to `dest_address` in the background.
    ///
    /// Only data flash supports background writes. The source must live
    /// for the whole operation, hence `'static`; completion arrives as
    /// [`Event::WriteComplete`].
    pub fn write_background(&mut self, src: &'static [u8], dest_address: u32) -> Result<()> {
        self.require_open()?;
        if src.len() > geometry::RAM_SIZE_BYTES as usize {
            return Err(Error::Bytes);
        }
        self.lock.acquire(OpState::Writing)?;
        let num_bytes = src.len() as u32;
        let flash_type = match geometry::rw_flash_type(dest_address, num_bytes, false) {
            Ok(t) => t,
            Err(e) => {
                self.lock.release();
                return Err(e);
            }
        };
        if let Err(e) = self.params.set_write_params(
            dest_address,
            num_bytes,
            flash_type,
            true,
            self.callback.is_some(),
        ) {
            self.lock.release();
            return Err(e);
        }
        if self.seq.enter_pe(flash_type).is_err() {
            return Err(self.fail_unwind(Error::Failure));
        }
        self.bgo_src = Some(src);
        let min = self.params.min_pgm_size as usize;
        if let Err(e) = self.seq.issue_program(&src[..min], self.params.dest_addr) {
            return Err(self.fail_unwind(e));
        }
        Ok(())
    }

    /// Non-blocking poll of an in-flight background operation.
    ///
    /// Returns `WouldBlock` while any operation holds the driver lock, so
    /// callers can `nb::block!` on BGO completion.
    pub fn status(&self) -> nb::Result<(), Error> {
        if self.lock.is_locked() {
            return Err(nb::Error::WouldBlock);
        }
        Ok(())
    }

    /// Executes a control-plane command.
    ///
    /// [`Command::StatusGet`] is allowed at any time and reports `Busy`
    /// while an operation is in flight. [`Command::Reset`] forces the
    /// sequencer to idle from any state and is meant for recovery; calling
    /// it abandons a genuinely running operation and leaves the affected
    /// region undefined. Everything else requires the driver to be open
    /// and idle.
    pub fn control(&mut self, command: Command<'_>) -> Result<()> {
        match command {
            Command::Reset => {
                self.seq.reset();
                self.params.operation = CurrentOperation::Idle;
                self.bgo_src = None;
                self.control_event = None;
                if self.lock.state() != OpState::Uninitialized {
                    self.lock.release();
                }
                Ok(())
            }
            Command::StatusGet => {
                if self.lock.is_locked() {
                    Err(Error::Busy)
                } else {
                    Ok(())
                }
            }
            Command::SetBgoCallback(config) => {
                config.validate()?;
                self.require_open()?;
                self.lock.acquire(OpState::GettingStatus)?;
                self.callback = Some(config.callback);
                self.seq.enable_ready_interrupt(config.priority);
                self.lock.release();
                Ok(())
            }
            Command::ConfigClock(fclk_hz) => {
                if fclk_hz < FCLK_MIN_HZ || fclk_hz > FCLK_MAX_HZ {
                    return Err(Error::Frequency);
                }
                self.require_open()?;
                self.lock.acquire(OpState::Initializing)?;
                self.params.fclk_hz = fclk_hz;
                self.seq.set_clock(fclk_hz);
                self.lock.release();
                Ok(())
            }
            Command::RomCacheEnable => {
                self.with_lock(OpState::GettingStatus, |seq| seq.rom_cache_enable())?
            }
            Command::RomCacheDisable => {
                self.with_lock(OpState::GettingStatus, |seq| seq.rom_cache_disable())
            }
            Command::RomCacheStatus(out) => {
                *out = self.with_lock(OpState::GettingStatus, |seq| seq.rom_cache_enabled())?;
                Ok(())
            }
            Command::SetNonCachedRange0(range) => {
                range.validate()?;
                self.with_lock(OpState::GettingStatus, |seq| {
                    seq.set_non_cached_range(0, &range)
                })
            }
            Command::SetNonCachedRange1(range) => {
                range.validate()?;
                self.with_lock(OpState::GettingStatus, |seq| {
                    seq.set_non_cached_range(1, &range)
                })
            }
            Command::GetNonCachedRange0(out) => {
                *out = self.with_lock(OpState::GettingStatus, |seq| seq.non_cached_range(0))?;
                Ok(())
            }
            Command::GetNonCachedRange1(out) => {
                *out = self.with_lock(OpState::GettingStatus, |seq| seq.non_cached_range(1))?;
                Ok(())
            }
            Command::SwapStateGet(out) => {
                *out = self.with_lock(OpState::GettingStatus, |seq| seq.swap_state())?;
                Ok(())
            }
            Command::SwapStateSet(state) => {
                self.with_lock(OpState::GettingStatus, |seq| seq.set_swap_state(state))
            }
            Command::SwapFlagGet(out) => {
                *out = self.with_lock(OpState::GettingStatus, |seq| seq.startup_area())?;
                Ok(())
            }
            Command::SwapFlagToggle => self.run_config_write(
                OpState::Writing,
                Event::StartupAreaToggled,
                |seq| seq.issue_startup_area_toggle(),
            ),
            Command::AccessWindowGet(out) => {
                *out = self.with_lock(OpState::GettingStatus, |seq| seq.access_window())?;
                Ok(())
            }
            Command::AccessWindowSet(window) => {
                window.validate()?;
                self.run_config_write(OpState::Writing, Event::AccessWindowSet, move |seq| {
                    seq.issue_access_window(&window)
                })
            }
            Command::LockBitEnable => self.with_lock(OpState::LockBit, |seq| {
                seq.set_lock_bit_protection(true)
            }),
            Command::LockBitDisable => self.with_lock(OpState::LockBit, |seq| {
                seq.set_lock_bit_protection(false)
            }),
            Command::LockBitRead {
                block_address,
                result,
            } => {
                if !geometry::is_cf_addr(block_address) {
                    return Err(Error::Address);
                }
                self.run_blocking_cf(OpState::LockBit, |seq| {
                    seq.issue_lock_bit_read(block_address)
                })?;
                *result = self.seq.lock_bit_result();
                Ok(())
            }
            Command::LockBitWrite { block_address } => {
                if !geometry::is_cf_addr(block_address) {
                    return Err(Error::Address);
                }
                self.run_blocking_cf(OpState::LockBit, |seq| {
                    seq.issue_lock_bit_write(block_address)
                })
            }
            #[cfg(feature = "dual-bank")]
            Command::BankToggle => {
                self.run_config_write(OpState::Writing, Event::ToggleBank, |seq| {
                    seq.issue_bank_toggle()
                })
            }
            #[cfg(feature = "dual-bank")]
            Command::BankGet(out) => {
                *out = self.with_lock(OpState::GettingStatus, |seq| seq.bank())?;
                Ok(())
            }
        }
    }

    /// Completion bridge for background operations.
    ///
    /// Call from the flash-ready interrupt handler. Advances multi-step
    /// operations; on the final step or on any error it leaves P/E mode,
    /// releases the driver lock and invokes the registered callback.
    pub fn on_interrupt(&mut self) {
        if self.seq.busy() {
            return;
        }
        let op = self.params.operation;
        if !op.is_background() {
            return;
        }
        let completion = self.seq.consume_status();
        if completion != Completion::Ok {
            let event = completion_event(completion, op.flash_type());
            self.finish_background_err(event);
            return;
        }
        match op {
            CurrentOperation::CfBgoErase | CurrentOperation::DfBgoErase => {
                self.params.current_count += 1;
                if self.params.current_count < self.params.total_count {
                    let flash_type = match op.flash_type() {
                        Some(t) => t,
                        None => return,
                    };
                    self.params.dest_addr = next_erase_block(flash_type, self.params.dest_addr);
                    if self.seq.issue_erase(self.params.dest_addr).is_err() {
                        self.finish_background_err(Event::ErrFailure);
                    }
                    return;
                }
                self.finish_background_ok(Event::EraseComplete);
            }
            CurrentOperation::CfBgoBlankCheck | CurrentOperation::DfBgoBlankCheck => {
                let event = if self.seq.blank_result() {
                    Event::Blank
                } else {
                    Event::NotBlank
                };
                self.finish_background_ok(event);
            }
            CurrentOperation::DfBgoWrite => {
                let min = self.params.min_pgm_size;
                self.params.current_count += min;
                self.params.dest_addr += min;
                if self.params.current_count < self.params.total_count {
                    let src = match self.bgo_src {
                        Some(s) => s,
                        None => {
                            self.finish_background_err(Event::ErrFailure);
                            return;
                        }
                    };
                    let offset = self.params.current_count as usize;
                    let chunk = &src[offset..offset + min as usize];
                    if self.seq.issue_program(chunk, self.params.dest_addr).is_err() {
                        self.finish_background_err(Event::ErrFailure);
                    }
                    return;
                }
                self.bgo_src = None;
                self.finish_background_ok(Event::WriteComplete);
            }
            CurrentOperation::CfBgoControl => {
                let event = self.control_event.take().unwrap_or(Event::ErrFailure);
                self.finish_background_ok(event);
            }
            _ => {}
        }
    }

    fn require_open(&self) -> Result<()> {
        if self.lock.state() == OpState::Uninitialized {
            return Err(Error::Busy);
        }
        Ok(())
    }

    /// Register access under the lock, for control commands that do not
    /// issue FACI commands.
    fn with_lock<T>(&mut self, state: OpState, f: impl FnOnce(&mut S) -> T) -> Result<T> {
        self.require_open()?;
        self.lock.acquire(state)?;
        let out = f(&mut self.seq);
        self.lock.release();
        Ok(out)
    }

    /// Runs a configuration-area write, in the background when code-flash
    /// BGO is enabled.
    fn run_config_write<F>(&mut self, state: OpState, event: Event, issue: F) -> Result<()>
    where
        F: FnOnce(&mut S) -> Result<()>,
    {
        self.require_open()?;
        self.lock.acquire(state)?;
        let background = self.params.bgo_enabled_cf;
        if background && self.callback.is_none() {
            self.lock.release();
            return Err(Error::Failure);
        }
        self.params.set_control_params(background);
        if self.seq.enter_pe(FlashType::CodeFlash).is_err() {
            return Err(self.fail_unwind(Error::Failure));
        }
        if let Err(e) = issue(&mut self.seq) {
            return Err(self.fail_unwind(e));
        }
        if self.params.operation.is_background() {
            self.control_event = Some(event);
            return Ok(());
        }
        if let Err(e) = self.wait_for_completion() {
            return Err(self.fail_unwind(e));
        }
        self.finish_blocking()
    }

    /// Runs a code-flash command that must complete synchronously, such as
    /// a lock-bit access whose result is read back.
    fn run_blocking_cf<F>(&mut self, state: OpState, issue: F) -> Result<()>
    where
        F: FnOnce(&mut S) -> Result<()>,
    {
        self.require_open()?;
        self.lock.acquire(state)?;
        self.params.set_control_params(false);
        if self.seq.enter_pe(FlashType::CodeFlash).is_err() {
            return Err(self.fail_unwind(Error::Failure));
        }
        if let Err(e) = issue(&mut self.seq) {
            return Err(self.fail_unwind(e));
        }
        if let Err(e) = self.wait_for_completion() {
            return Err(self.fail_unwind(e));
        }
        self.finish_blocking()
    }

    /// Bounded busy-poll of the sequencer followed by completion
    /// classification. A timeout gets a forced stop so the sequencer does
    /// not keep driving the array.
    fn wait_for_completion(&mut self) -> Result<()> {
        let mut budget = self.params.wait_cnt;
        while self.seq.busy() {
            if budget == 0 {
                self.seq.forced_stop();
                return Err(Error::Timeout);
            }
            budget -= 1;
        }
        match self.seq.consume_status() {
            Completion::Ok => Ok(()),
            completion => Err(completion_error(completion)),
        }
    }

    /// Error unwind: reset the sequencer first, then release the lock.
    fn fail_unwind(&mut self, err: Error) -> Error {
        self.params.operation = CurrentOperation::Idle;
        self.bgo_src = None;
        self.control_event = None;
        self.seq.reset();
        self.lock.release();
        err
    }

    /// Success path of a blocking operation: leave P/E mode, release.
    fn finish_blocking(&mut self) -> Result<()> {
        self.params.operation = CurrentOperation::Idle;
        if self.seq.exit_pe().is_err() {
            self.seq.reset();
            self.lock.release();
            return Err(Error::Failure);
        }
        self.lock.release();
        Ok(())
    }

    fn finish_background_ok(&mut self, event: Event) {
        self.params.operation = CurrentOperation::Idle;
        let event = if self.seq.exit_pe().is_err() {
            self.seq.reset();
            Event::ErrFailure
        } else {
            event
        };
        self.lock.release();
        if let Some(callback) = self.callback {
            callback(event);
        }
    }

    fn finish_background_err(&mut self, event: Event) {
        self.params.operation = CurrentOperation::Idle;
        self.bgo_src = None;
        self.control_event = None;
        self.seq.reset();
        self.lock.release();
        if let Some(callback) = self.callback {
            callback(event);
        }
    }
}

#[cfg(feature = "embedded-storage")]
mod nor_flash {
    use embedded_storage::nor_flash::{
        ErrorType, NorFlash, NorFlashError, NorFlashErrorKind, ReadNorFlash,
    };

    use super::{Flash, Sequencer};
    use crate::geometry::{self, DF_BLOCK_0, DF_BLOCK_INVALID, DF_BLOCK_SIZE, DF_MIN_PGM_SIZE};
    use crate::Error;

    impl NorFlashError for Error {
        fn kind(&self) -> NorFlashErrorKind {
            match self {
                Error::Address | Error::Blocks => NorFlashErrorKind::OutOfBounds,
                Error::Bytes => NorFlashErrorKind::NotAligned,
                _ => NorFlashErrorKind::Other,
            }
        }
    }

    impl<S: Sequencer> ErrorType for Flash<S> {
        type Error = Error;
    }

    /// The data-flash region exposed as a NOR flash, addressed by offsets
    /// from its base.
    impl<S: Sequencer> ReadNorFlash for Flash<S> {
        const READ_SIZE: usize = 1;

        fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), Error> {
            let start = DF_BLOCK_0.checked_add(offset).ok_or(Error::Address)?;
            if !geometry::is_df_addr(start)
                || start as u64 + bytes.len() as u64 > DF_BLOCK_INVALID as u64
            {
                return Err(Error::Address);
            }
            // NOTE(unsafe) bounds checked above; data flash is memory
            // mapped and readable outside P/E mode
            unsafe {
                core::ptr::copy_nonoverlapping(
                    start as usize as *const u8,
                    bytes.as_mut_ptr(),
                    bytes.len(),
                );
            }
            Ok(())
        }

        fn capacity(&self) -> usize {
            (DF_BLOCK_INVALID - DF_BLOCK_0) as usize
        }
    }

    impl<S: Sequencer> NorFlash for Flash<S> {
        const WRITE_SIZE: usize = DF_MIN_PGM_SIZE as usize;
        const ERASE_SIZE: usize = DF_BLOCK_SIZE as usize;

        fn erase(&mut self, from: u32, to: u32) -> Result<(), Error> {
            if to <= from || (to - from) % DF_BLOCK_SIZE != 0 {
                return Err(Error::Blocks);
            }
            let start = DF_BLOCK_0.checked_add(from).ok_or(Error::Address)?;
            Flash::erase(self, start, (to - from) / DF_BLOCK_SIZE)
        }

        fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), Error> {
            let dest = DF_BLOCK_0.checked_add(offset).ok_or(Error::Address)?;
            Flash::write(self, bytes, dest)
        }
    }
}
