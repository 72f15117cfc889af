//! Fixed memory map of the target SoC.
//!
//! Instruction memory is 64 KiB, partitioned into three non-overlapping
//! regions; data memory is a separate 64 KiB space addressed from zero.

pub const BIOS_BASE: u32 = 0x0000_0000;
pub const BIOS_SIZE: u32 = 0x0000_0800;

pub const USER_BASE: u32 = 0x0000_0800;
pub const USER_SIZE: u32 = 0x0000_E800;

pub const INT_BASE: u32 = 0x0000_F000;
pub const INT_SIZE: u32 = 0x0000_1000;

pub const TOTAL_MEM_SIZE: u32 = 0x0001_0000;

pub const DATA_BASE: u32 = 0x0000_0000;
pub const DATA_LIMIT: u32 = 0x0001_0000;

pub const WORD_BYTES: u32 = 4;

/// User-program region capacity in instruction words.
pub const fn user_capacity_words() -> usize {
    (USER_SIZE / WORD_BYTES) as usize
}
