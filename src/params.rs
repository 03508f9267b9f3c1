//! Staging of the current-operation descriptor
//!
//! Before an operation commits, its parameters are loaded into a single
//! descriptor that the executor and, for background operations, the
//! interrupt path both read. Staging also computes the worst-case wait
//! count used to detect flash degradation: the budget depends on the
//! operation, the block size tier and the flash clock.

use crate::geometry::{self, FlashType};
use crate::{Error, Result};

// Worst-case operation times, microseconds. Erase budgets are per block,
// write budgets per minimum program unit, blank check per minimum unit of
// the checked range.
const ERASE_DF_BLOCK_US: u32 = 10_000;
const ERASE_CF_SMALL_US: u32 = 120_000;
const ERASE_CF_MEDIUM_US: u32 = 480_000;
const WRITE_DF_UNIT_US: u32 = 2_000;
const WRITE_CF_UNIT_US: u32 = 16_000;
const BLANK_CHECK_UNIT_US: u32 = 30;

/// The operation currently committed to the FCU, if any.
///
/// Background (BGO) variants are distinct because the completion interrupt
/// must know whether to keep feeding the sequencer and who releases the
/// driver lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CurrentOperation {
    Idle,
    CfErase,
    CfBgoErase,
    DfErase,
    DfBgoErase,
    CfBlankCheck,
    CfBgoBlankCheck,
    DfBlankCheck,
    DfBgoBlankCheck,
    CfWrite,
    DfWrite,
    DfBgoWrite,
    /// A control-plane register write (access window, startup area)
    /// completing through the flash-ready interrupt
    CfBgoControl,
}

impl CurrentOperation {
    pub fn is_background(self) -> bool {
        match self {
            CurrentOperation::CfBgoErase
            | CurrentOperation::DfBgoErase
            | CurrentOperation::CfBgoBlankCheck
            | CurrentOperation::DfBgoBlankCheck
            | CurrentOperation::DfBgoWrite
            | CurrentOperation::CfBgoControl => true,
            _ => false,
        }
    }

    pub fn flash_type(self) -> Option<FlashType> {
        match self {
            CurrentOperation::CfErase
            | CurrentOperation::CfBgoErase
            | CurrentOperation::CfBlankCheck
            | CurrentOperation::CfBgoBlankCheck
            | CurrentOperation::CfWrite
            | CurrentOperation::CfBgoControl => Some(FlashType::CodeFlash),
            CurrentOperation::DfErase
            | CurrentOperation::DfBgoErase
            | CurrentOperation::DfBlankCheck
            | CurrentOperation::DfBgoBlankCheck
            | CurrentOperation::DfWrite
            | CurrentOperation::DfBgoWrite => Some(FlashType::DataFlash),
            CurrentOperation::Idle => None,
        }
    }
}

/// Parameters of the operation in flight
///
/// Mutated only by the staging methods below, which are called with the
/// driver lock held; read by the executor and the interrupt path.
pub struct CurrentParameters {
    /// Target address of the current step
    pub dest_addr: u32,
    /// Total blocks (erase) or bytes (write, blank check)
    pub total_count: u32,
    /// Blocks erased / bytes programmed so far
    pub current_count: u32,
    pub operation: CurrentOperation,
    /// Minimum program size of the target region
    pub min_pgm_size: u32,
    /// Worst-case wait count for one step of the operation
    pub wait_cnt: u32,
    /// Background operation enabled for code flash
    pub bgo_enabled_cf: bool,
    /// Background operation enabled for data flash
    pub bgo_enabled_df: bool,
    /// Flash clock, Hz; set at open and by the clock-config command
    pub fclk_hz: u32,
}

impl CurrentParameters {
    pub const fn new() -> Self {
        CurrentParameters {
            dest_addr: 0,
            total_count: 0,
            current_count: 0,
            operation: CurrentOperation::Idle,
            min_pgm_size: 0,
            wait_cnt: 0,
            bgo_enabled_cf: false,
            bgo_enabled_df: false,
            fclk_hz: 0,
        }
    }

    /// Flash clock in MHz, rounded up.
    fn fclk_mhz(&self) -> u32 {
        (self.fclk_hz + 999_999) / 1_000_000
    }

    fn bgo_enabled(&self, flash_type: FlashType) -> bool {
        match flash_type {
            FlashType::CodeFlash => self.bgo_enabled_cf,
            FlashType::DataFlash => self.bgo_enabled_df,
        }
    }

    /// A background operation without a registered completion callback
    /// would never release the driver lock; refuse it before any hardware
    /// state changes.
    fn check_bgo_callback(&self, flash_type: FlashType, callback_set: bool) -> Result<()> {
        if self.bgo_enabled(flash_type) && !callback_set {
            return Err(Error::Failure);
        }
        Ok(())
    }

    /// Stages an erase of `num_blocks` starting at `block_start_address`.
    pub fn set_erase_params(
        &mut self,
        block_start_address: u32,
        num_blocks: u32,
        flash_type: FlashType,
        callback_set: bool,
    ) -> Result<()> {
        self.check_bgo_callback(flash_type, callback_set)?;

        self.dest_addr = block_start_address;
        self.total_count = num_blocks;
        self.current_count = 0;

        match flash_type {
            FlashType::DataFlash => {
                self.operation = if self.bgo_enabled_df {
                    CurrentOperation::DfBgoErase
                } else {
                    CurrentOperation::DfErase
                };
                self.wait_cnt = ERASE_DF_BLOCK_US.saturating_mul(self.fclk_mhz());
            }
            FlashType::CodeFlash => {
                self.operation = if self.bgo_enabled_cf {
                    CurrentOperation::CfBgoErase
                } else {
                    CurrentOperation::CfErase
                };
                // the small-block budget is only safe if the whole run
                // stays in the small tier
                let info = geometry::cf_addr_info(block_start_address);
                let small_run = block_start_address >= info.size_boundary
                    && num_blocks
                        <= (block_start_address - info.size_boundary)
                            / geometry::CF_SMALL_BLOCK_SIZE
                            + 1;
                let us = if small_run {
                    ERASE_CF_SMALL_US
                } else {
                    ERASE_CF_MEDIUM_US
                };
                self.wait_cnt = us.saturating_mul(self.fclk_mhz());
            }
        }

        Ok(())
    }

    /// Stages a blank check of `num_bytes` starting at `address`.
    pub fn set_blankcheck_params(
        &mut self,
        address: u32,
        num_bytes: u32,
        flash_type: FlashType,
        callback_set: bool,
    ) -> Result<()> {
        self.check_bgo_callback(flash_type, callback_set)?;

        self.dest_addr = address;
        self.total_count = num_bytes;
        self.current_count = 0;

        let (min, op_blocking, op_bgo) = match flash_type {
            FlashType::DataFlash => (
                geometry::DF_MIN_PGM_SIZE,
                CurrentOperation::DfBlankCheck,
                CurrentOperation::DfBgoBlankCheck,
            ),
            FlashType::CodeFlash => (
                geometry::CF_MIN_PGM_SIZE,
                CurrentOperation::CfBlankCheck,
                CurrentOperation::CfBgoBlankCheck,
            ),
        };

        self.min_pgm_size = min;
        self.operation = if self.bgo_enabled(flash_type) {
            op_bgo
        } else {
            op_blocking
        };
        // the whole range is checked by a single command
        self.wait_cnt = BLANK_CHECK_UNIT_US
            .saturating_mul(num_bytes / min)
            .saturating_mul(self.fclk_mhz());

        Ok(())
    }

    /// Stages a configuration-area write issued by a control command.
    ///
    /// Configuration writes always target code flash. The caller decides
    /// whether the write completes in the background.
    pub fn set_control_params(&mut self, background: bool) {
        self.dest_addr = 0;
        self.total_count = 0;
        self.current_count = 0;
        self.operation = if background {
            CurrentOperation::CfBgoControl
        } else {
            CurrentOperation::Idle
        };
        self.wait_cnt = WRITE_CF_UNIT_US.saturating_mul(self.fclk_mhz());
    }

    /// Stages a write of `num_bytes` to `address`.
    ///
    /// `background` selects the BGO variant; it requires BGO to be enabled
    /// for the target region and is only supported for data flash.
    pub fn set_write_params(
        &mut self,
        address: u32,
        num_bytes: u32,
        flash_type: FlashType,
        background: bool,
        callback_set: bool,
    ) -> Result<()> {
        if background {
            if !self.bgo_enabled(flash_type) {
                return Err(Error::Failure);
            }
            self.check_bgo_callback(flash_type, callback_set)?;
        }

        self.dest_addr = address;
        self.total_count = num_bytes;
        self.current_count = 0;

        match flash_type {
            FlashType::DataFlash => {
                self.min_pgm_size = geometry::DF_MIN_PGM_SIZE;
                self.operation = if background {
                    CurrentOperation::DfBgoWrite
                } else {
                    CurrentOperation::DfWrite
                };
                self.wait_cnt = WRITE_DF_UNIT_US.saturating_mul(self.fclk_mhz());
            }
            FlashType::CodeFlash => {
                if background {
                    // code flash cannot be written in the background: the
                    // interrupt path would have to execute from the region
                    // being programmed
                    return Err(Error::Failure);
                }
                self.min_pgm_size = geometry::CF_MIN_PGM_SIZE;
                self.operation = CurrentOperation::CfWrite;
                self.wait_cnt = WRITE_CF_UNIT_US.saturating_mul(self.fclk_mhz());
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{CF_BLOCK_7, CF_MEDIUM_BLOCK_SIZE, DF_BLOCK_0};

    fn params(fclk_hz: u32) -> CurrentParameters {
        let mut p = CurrentParameters::new();
        p.fclk_hz = fclk_hz;
        p
    }

    #[test]
    fn erase_variant_follows_bgo_flag() {
        let mut p = params(4_000_000);
        p.set_erase_params(DF_BLOCK_0, 1, FlashType::DataFlash, false)
            .unwrap();
        assert_eq!(p.operation, CurrentOperation::DfErase);

        p.bgo_enabled_df = true;
        p.set_erase_params(DF_BLOCK_0, 1, FlashType::DataFlash, true)
            .unwrap();
        assert_eq!(p.operation, CurrentOperation::DfBgoErase);
    }

    #[test]
    fn background_without_callback_is_refused() {
        let mut p = params(4_000_000);
        p.bgo_enabled_df = true;
        assert_eq!(
            p.set_erase_params(DF_BLOCK_0, 1, FlashType::DataFlash, false),
            Err(Error::Failure)
        );
        assert_eq!(p.operation, CurrentOperation::Idle);

        assert_eq!(
            p.set_write_params(DF_BLOCK_0, 4, FlashType::DataFlash, true, false),
            Err(Error::Failure)
        );
    }

    #[test]
    fn background_write_needs_bgo_enabled() {
        let mut p = params(4_000_000);
        assert_eq!(
            p.set_write_params(DF_BLOCK_0, 4, FlashType::DataFlash, true, true),
            Err(Error::Failure)
        );
    }

    #[test]
    fn code_flash_background_write_unsupported() {
        let mut p = params(4_000_000);
        p.bgo_enabled_cf = true;
        assert_eq!(
            p.set_write_params(0xFFFF_0000, 128, FlashType::CodeFlash, true, true),
            Err(Error::Failure)
        );
    }

    #[test]
    fn erase_wait_scales_with_clock_and_tier() {
        let mut slow = params(4_000_000);
        let mut fast = params(60_000_000);
        slow.set_erase_params(DF_BLOCK_0, 1, FlashType::DataFlash, false)
            .unwrap();
        fast.set_erase_params(DF_BLOCK_0, 1, FlashType::DataFlash, false)
            .unwrap();
        assert_eq!(fast.wait_cnt, slow.wait_cnt * 15);

        let mut small = params(60_000_000);
        let mut medium = params(60_000_000);
        small
            .set_erase_params(CF_BLOCK_7, 1, FlashType::CodeFlash, false)
            .unwrap();
        medium
            .set_erase_params(CF_BLOCK_7 - CF_MEDIUM_BLOCK_SIZE, 1, FlashType::CodeFlash, false)
            .unwrap();
        assert!(medium.wait_cnt > small.wait_cnt);

        // a run crossing into the medium tier gets the medium budget
        let mut crossing = params(60_000_000);
        crossing
            .set_erase_params(CF_BLOCK_7, 3, FlashType::CodeFlash, false)
            .unwrap();
        assert_eq!(crossing.wait_cnt, medium.wait_cnt);
    }

    #[test]
    fn blank_check_wait_covers_whole_range() {
        let mut one = params(60_000_000);
        let mut four = params(60_000_000);
        one.set_blankcheck_params(DF_BLOCK_0, 4, FlashType::DataFlash, false)
            .unwrap();
        four.set_blankcheck_params(DF_BLOCK_0, 16, FlashType::DataFlash, false)
            .unwrap();
        assert_eq!(four.wait_cnt, one.wait_cnt * 4);
    }

    #[test]
    fn write_staging_sets_min_pgm_size() {
        let mut p = params(60_000_000);
        p.set_write_params(DF_BLOCK_0, 16, FlashType::DataFlash, false, false)
            .unwrap();
        assert_eq!(p.operation, CurrentOperation::DfWrite);
        assert_eq!(p.min_pgm_size, 4);

        p.set_write_params(0xFFFF_0000, 256, FlashType::CodeFlash, false, false)
            .unwrap();
        assert_eq!(p.operation, CurrentOperation::CfWrite);
        assert_eq!(p.min_pgm_size, 128);
    }
}
