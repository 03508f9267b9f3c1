//! Flash address map and target classification
//!
//! Everything in this module is pure address arithmetic: the classifiers
//! decide whether a request targets code flash or data flash and validate
//! alignment, block counts and range bounds before anything touches the
//! FCU. Code-flash blocks are numbered from the top of memory downward;
//! blocks 0-7 are 8 KiB "small" blocks, everything below them is a 32 KiB
//! "medium" block, so erase runs walk toward *lower* addresses.

use crate::{Error, Result};

/// Highest valid code-flash address
pub const CF_BLOCK_END: u32 = 0xFFFF_FFFF;
/// Lowest valid code-flash address
pub const CF_LO_ADDR: u32 = 0xFFE0_0000;
/// One below the lowest valid code-flash address
pub const CF_BLOCK_INVALID: u32 = CF_LO_ADDR - 1;
/// Size of code-flash blocks 0-7
pub const CF_SMALL_BLOCK_SIZE: u32 = 8 * 1024;
/// Size of code-flash blocks 8 and up
pub const CF_MEDIUM_BLOCK_SIZE: u32 = 32 * 1024;
/// Start address of block 7, the lowest small block
pub const CF_BLOCK_7: u32 = 0xFFFF_0000;
/// Minimum code-flash programming size in bytes
pub const CF_MIN_PGM_SIZE: u32 = 128;
/// Code flash (ROM) size in bytes
pub const ROM_SIZE_BYTES: u32 = 2 * 1024 * 1024;
/// Blank check on code flash may not cross this boundary, measured from
/// the bottom of the region
pub const CF_BLANKCHECK_SPAN: u32 = 256 * 1024;

/// Number of code-flash blocks (per bank in dual-bank mode)
#[cfg(not(feature = "dual-bank"))]
pub const NUM_BLOCKS_CF: u32 = 8 + (ROM_SIZE_BYTES - 8 * CF_SMALL_BLOCK_SIZE) / CF_MEDIUM_BLOCK_SIZE;
/// Number of code-flash blocks (per bank in dual-bank mode)
#[cfg(feature = "dual-bank")]
pub const NUM_BLOCKS_CF: u32 =
    8 + (ROM_SIZE_BYTES / 2 - 8 * CF_SMALL_BLOCK_SIZE) / CF_MEDIUM_BLOCK_SIZE;

/// Lowest address of the high bank (dual-bank mode)
#[cfg(feature = "dual-bank")]
pub const CF_HI_BANK_LO_ADDR: u32 = 0xFFF0_0000;
/// Highest address of the high bank (dual-bank mode)
#[cfg(feature = "dual-bank")]
pub const CF_HI_BANK_HI_ADDR: u32 = 0xFFFF_FFFF;
/// Lowest address of the low bank (dual-bank mode)
#[cfg(feature = "dual-bank")]
pub const CF_LO_BANK_LO_ADDR: u32 = 0xFFE0_0000;
/// Highest address of the low bank (dual-bank mode)
#[cfg(feature = "dual-bank")]
pub const CF_LO_BANK_HI_ADDR: u32 = 0xFFEF_FFFF;
/// Start address of the low bank's lowest small block (dual-bank mode)
#[cfg(feature = "dual-bank")]
pub const CF_LO_BANK_SMALL_BLOCK_ADDR: u32 = 0xFFEF_0000;

/// Lowest valid data-flash address (block 0)
pub const DF_BLOCK_0: u32 = 0x0010_0000;
/// One past the highest valid data-flash address
pub const DF_BLOCK_INVALID: u32 = 0x0010_8000;
/// Data-flash block size in bytes
pub const DF_BLOCK_SIZE: u32 = 64;
/// Number of data-flash blocks
pub const NUM_BLOCKS_DF: u32 = (DF_BLOCK_INVALID - DF_BLOCK_0) / DF_BLOCK_SIZE;
/// Minimum data-flash programming size in bytes
pub const DF_MIN_PGM_SIZE: u32 = 4;

/// RAM start address
pub const RAM_LO_ADDR: u32 = 0x0000_0000;
/// RAM size in bytes; also the per-call write limit
pub const RAM_SIZE_BYTES: u32 = 256 * 1024;

/// Which flash region an address belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlashType {
    /// Code flash (ROM)
    CodeFlash,
    /// Data flash
    DataFlash,
}

/// Characteristics of the code-flash area an address falls in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CfAddrInfo {
    /// Lowest small-block start address for this bank
    pub size_boundary: u32,
    /// Lowest valid address for this bank
    pub low_addr: u32,
    /// Size of the block the address is located in
    pub block_size: u32,
    /// Whether the address sits on a block boundary
    pub on_block_boundary: bool,
}

/// Returns true if `addr` is a valid code-flash address.
pub fn is_cf_addr(addr: u32) -> bool {
    #[cfg(feature = "dual-bank")]
    return (addr >= CF_HI_BANK_LO_ADDR && addr <= CF_HI_BANK_HI_ADDR)
        || (addr >= CF_LO_BANK_LO_ADDR && addr <= CF_LO_BANK_HI_ADDR);
    #[cfg(not(feature = "dual-bank"))]
    return addr > CF_BLOCK_INVALID && addr <= CF_BLOCK_END;
}

/// Returns true if `addr` is within a data-flash block.
pub fn is_df_addr(addr: u32) -> bool {
    addr >= DF_BLOCK_0 && addr < DF_BLOCK_INVALID
}

/// Returns true if `ptr_addr` lies within on-chip RAM.
///
/// Code-flash programming sources must be RAM resident since code flash
/// cannot be read while it is being written.
pub fn is_ram_addr(ptr_addr: usize) -> bool {
    // RAM starts at address zero, so only the upper bound matters
    ptr_addr < (RAM_LO_ADDR + RAM_SIZE_BYTES) as usize
}

/// Loads the bank layout metadata for a known-good code-flash address.
pub fn cf_addr_info(addr: u32) -> CfAddrInfo {
    #[cfg(feature = "dual-bank")]
    let (size_boundary, low_addr) = if addr >= CF_HI_BANK_LO_ADDR {
        (CF_BLOCK_7, CF_HI_BANK_LO_ADDR)
    } else {
        (CF_LO_BANK_SMALL_BLOCK_ADDR, CF_LO_BANK_LO_ADDR)
    };
    #[cfg(not(feature = "dual-bank"))]
    let (size_boundary, low_addr) = (CF_BLOCK_7, CF_LO_ADDR);

    let block_size = if addr >= size_boundary {
        CF_SMALL_BLOCK_SIZE
    } else {
        CF_MEDIUM_BLOCK_SIZE
    };

    CfAddrInfo {
        size_boundary,
        low_addr,
        block_size,
        on_block_boundary: addr & (block_size - 1) == 0,
    }
}

/// Size of the code-flash block containing `addr`.
pub fn cf_block_size_at(addr: u32) -> u32 {
    cf_addr_info(addr).block_size
}

/// Start address of the code-flash block below the one starting at `addr`.
///
/// Erase and lock-bit runs proceed in ascending block-number order, i.e.
/// toward lower addresses; the caller is responsible for not walking past
/// the bottom of the bank.
pub fn cf_prev_block_start(addr: u32) -> u32 {
    addr - cf_block_size_at(addr - 1)
}

/// Returns true if `num_bytes` starting at the valid code-flash address
/// `addr` runs out of the legal code-flash range (including wrap-around).
fn is_cf_overflow(addr: u32, num_bytes: u32) -> bool {
    if num_bytes > ROM_SIZE_BYTES {
        return true;
    }
    let end = addr as u64 + num_bytes as u64 - 1;

    #[cfg(feature = "dual-bank")]
    return if addr >= CF_HI_BANK_LO_ADDR {
        end > CF_HI_BANK_HI_ADDR as u64
    } else {
        end > CF_LO_BANK_HI_ADDR as u64
    };
    #[cfg(not(feature = "dual-bank"))]
    return end > CF_BLOCK_END as u64;
}

/// Checks that a code-flash erase (or lock-bit) run of `num_blocks`
/// starting at `start` stays inside the bank and starts on a block
/// boundary. Block sizes are not uniform, so the run is walked tier by
/// tier: small blocks down to the size boundary, medium blocks below it.
fn check_cf_block_run(start: u32, num_blocks: u32) -> Result<()> {
    let info = cf_addr_info(start);

    if !info.on_block_boundary {
        return Err(Error::Address);
    }

    let mut blocks = num_blocks;
    let mut start = start;
    if start >= info.size_boundary {
        let small_avail = (start - info.size_boundary) / CF_SMALL_BLOCK_SIZE + 1;
        blocks -= blocks.min(small_avail);
        if blocks == 0 {
            return Ok(());
        }
        start = info.size_boundary - CF_MEDIUM_BLOCK_SIZE;
    }

    // `start` is now the highest medium block in the run
    let span = (blocks as u64 - 1) * CF_MEDIUM_BLOCK_SIZE as u64;
    if (start as u64) < info.low_addr as u64 + span {
        return Err(Error::Blocks);
    }

    Ok(())
}

/// Classifies and validates an erase request.
///
/// Data-flash erases must start on a block boundary and stay inside the
/// region; code-flash erases additionally honor the tiered block layout.
pub fn erase_flash_type(block_start_address: u32, num_blocks: u32) -> Result<FlashType> {
    if is_df_addr(block_start_address) {
        if block_start_address & (DF_BLOCK_SIZE - 1) != 0 {
            return Err(Error::Address);
        }
        if num_blocks == 0 || num_blocks > NUM_BLOCKS_DF {
            return Err(Error::Blocks);
        }
        let end = block_start_address as u64 + num_blocks as u64 * DF_BLOCK_SIZE as u64 - 1;
        if end >= DF_BLOCK_INVALID as u64 {
            return Err(Error::Blocks);
        }
        return Ok(FlashType::DataFlash);
    }

    if is_cf_addr(block_start_address) {
        if num_blocks == 0 || num_blocks > NUM_BLOCKS_CF {
            return Err(Error::Blocks);
        }
        check_cf_block_run(block_start_address, num_blocks)?;
        return Ok(FlashType::CodeFlash);
    }

    Err(Error::Address)
}

/// Classifies and validates a byte-oriented (write or blank-check)
/// request.
///
/// Addresses and byte counts must be multiples of the region's minimum
/// program size; counts may not be zero, exceed RAM size, or run past the
/// region (wrap-around included). A code-flash blank check additionally
/// may not straddle a 256 KiB boundary.
pub fn rw_flash_type(address: u32, num_bytes: u32, blank_check: bool) -> Result<FlashType> {
    if is_df_addr(address) {
        let end = address as u64 + num_bytes as u64 - 1;
        if num_bytes == 0
            || num_bytes > RAM_SIZE_BYTES
            || end >= DF_BLOCK_INVALID as u64
            || address & (DF_MIN_PGM_SIZE - 1) != 0
            || num_bytes & (DF_MIN_PGM_SIZE - 1) != 0
        {
            return Err(Error::Bytes);
        }
        return Ok(FlashType::DataFlash);
    }

    if is_cf_addr(address) {
        if blank_check {
            // erase/blank check cannot cross a 256K boundary
            let end = address as u64 + num_bytes as u64 - 1;
            let base = cf_addr_info(address).low_addr as u64;
            if num_bytes != 0 && (address as u64 - base) / CF_BLANKCHECK_SPAN as u64
                != (end - base) / CF_BLANKCHECK_SPAN as u64
            {
                return Err(Error::Address);
            }
        }
        if num_bytes == 0
            || is_cf_overflow(address, num_bytes)
            || address & (CF_MIN_PGM_SIZE - 1) != 0
            || num_bytes & (CF_MIN_PGM_SIZE - 1) != 0
        {
            return Err(Error::Bytes);
        }
        return Ok(FlashType::CodeFlash);
    }

    Err(Error::Address)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_df_and_cf_addresses() {
        assert_eq!(erase_flash_type(DF_BLOCK_0, 1), Ok(FlashType::DataFlash));
        assert_eq!(
            erase_flash_type(CF_BLOCK_END - CF_SMALL_BLOCK_SIZE + 1, 1),
            Ok(FlashType::CodeFlash)
        );
        // one byte past the data-flash region
        assert_eq!(erase_flash_type(DF_BLOCK_INVALID, 1), Err(Error::Address));
        // one byte below code flash
        assert_eq!(erase_flash_type(CF_BLOCK_INVALID, 1), Err(Error::Address));
        assert_eq!(erase_flash_type(0x2000_0000, 1), Err(Error::Address));
    }

    #[test]
    fn df_erase_bounds() {
        assert_eq!(erase_flash_type(DF_BLOCK_0, 0), Err(Error::Blocks));
        assert_eq!(
            erase_flash_type(DF_BLOCK_0, NUM_BLOCKS_DF + 1),
            Err(Error::Blocks)
        );
        assert_eq!(
            erase_flash_type(DF_BLOCK_0 + DF_BLOCK_SIZE, NUM_BLOCKS_DF),
            Err(Error::Blocks)
        );
        assert_eq!(erase_flash_type(DF_BLOCK_0 + 1, 1), Err(Error::Address));
        assert_eq!(
            erase_flash_type(DF_BLOCK_0, NUM_BLOCKS_DF),
            Ok(FlashType::DataFlash)
        );
    }

    #[test]
    fn cf_erase_block_runs() {
        // whole small tier from block 0
        assert_eq!(
            erase_flash_type(CF_BLOCK_END - CF_SMALL_BLOCK_SIZE + 1, 8),
            Ok(FlashType::CodeFlash)
        );
        // run crossing from small into medium blocks
        assert_eq!(erase_flash_type(CF_BLOCK_7, 3), Ok(FlashType::CodeFlash));
        // full device
        assert_eq!(
            erase_flash_type(CF_BLOCK_END - CF_SMALL_BLOCK_SIZE + 1, NUM_BLOCKS_CF),
            Ok(FlashType::CodeFlash)
        );
        // one block too many
        assert_eq!(
            erase_flash_type(CF_BLOCK_7, NUM_BLOCKS_CF - 6),
            Err(Error::Blocks)
        );
        // medium-tier address on a small-block boundary only
        assert_eq!(
            erase_flash_type(CF_BLOCK_7 - CF_SMALL_BLOCK_SIZE, 1),
            Err(Error::Address)
        );
        assert_eq!(erase_flash_type(CF_BLOCK_END, 1), Err(Error::Address));
    }

    #[test]
    fn cf_addr_info_tiers() {
        let small = cf_addr_info(CF_BLOCK_7);
        assert_eq!(small.block_size, CF_SMALL_BLOCK_SIZE);
        assert!(small.on_block_boundary);

        let medium = cf_addr_info(CF_BLOCK_7 - CF_MEDIUM_BLOCK_SIZE);
        assert_eq!(medium.block_size, CF_MEDIUM_BLOCK_SIZE);
        assert!(medium.on_block_boundary);
        assert_eq!(medium.size_boundary, CF_BLOCK_7);
    }

    #[test]
    fn prev_block_walks_down_through_tiers() {
        let b6 = CF_BLOCK_7 + CF_SMALL_BLOCK_SIZE;
        assert_eq!(cf_prev_block_start(b6), CF_BLOCK_7);
        // stepping below block 7 lands on a medium block
        assert_eq!(
            cf_prev_block_start(CF_BLOCK_7),
            CF_BLOCK_7 - CF_MEDIUM_BLOCK_SIZE
        );
    }

    #[test]
    fn rw_validation_df() {
        assert_eq!(
            rw_flash_type(DF_BLOCK_0, DF_MIN_PGM_SIZE, false),
            Ok(FlashType::DataFlash)
        );
        assert_eq!(rw_flash_type(DF_BLOCK_0, 0, false), Err(Error::Bytes));
        assert_eq!(
            rw_flash_type(DF_BLOCK_0, DF_MIN_PGM_SIZE - 1, false),
            Err(Error::Bytes)
        );
        assert_eq!(rw_flash_type(DF_BLOCK_0 + 2, 4, false), Err(Error::Bytes));
        // runs past the end of the region
        assert_eq!(
            rw_flash_type(DF_BLOCK_INVALID - 4, 8, false),
            Err(Error::Bytes)
        );
    }

    #[test]
    fn rw_validation_cf() {
        assert_eq!(
            rw_flash_type(CF_LO_ADDR, CF_MIN_PGM_SIZE, false),
            Ok(FlashType::CodeFlash)
        );
        assert_eq!(
            rw_flash_type(CF_LO_ADDR + 4, CF_MIN_PGM_SIZE, false),
            Err(Error::Bytes)
        );
        assert_eq!(rw_flash_type(CF_LO_ADDR, 64, false), Err(Error::Bytes));
        // wrap-around past the top of memory
        assert_eq!(
            rw_flash_type(CF_BLOCK_END - CF_MIN_PGM_SIZE + 1, CF_MIN_PGM_SIZE * 2, false),
            Err(Error::Bytes)
        );
    }

    #[test]
    fn cf_blank_check_may_not_straddle_256k() {
        let boundary = CF_LO_ADDR + CF_BLANKCHECK_SPAN;
        assert_eq!(
            rw_flash_type(boundary - CF_MIN_PGM_SIZE, CF_MIN_PGM_SIZE * 2, true),
            Err(Error::Address)
        );
        assert_eq!(
            rw_flash_type(boundary - CF_MIN_PGM_SIZE, CF_MIN_PGM_SIZE, true),
            Ok(FlashType::CodeFlash)
        );
        assert_eq!(
            rw_flash_type(boundary, CF_MIN_PGM_SIZE, true),
            Ok(FlashType::CodeFlash)
        );
    }

    #[test]
    fn ram_addresses() {
        assert!(is_ram_addr(0x100));
        assert!(!is_ram_addr((RAM_LO_ADDR + RAM_SIZE_BYTES) as usize));
    }
}
