use once_cell::sync::Lazy;

use arch::inst::NOP_WORD;
use arch::layout::{BIOS_SIZE, INT_SIZE, WORD_BYTES};

/// Word offset of the documented BIOS patch slot.
pub const PATCH_SLOT: usize = 0;

/// `jal x0, 0` — the BIOS safety loop taken when no `main` was linked in.
const SPIN_WORD: u32 = 0x0000_006F;

/// Preassembled BIOS image. The patch slot ships as no-op filler; the linker
/// overwrites it with the jump to `main`.
pub static BIOS_IMAGE: Lazy<Vec<u32>> = Lazy::new(|| {
    let mut words = vec![0u32; (BIOS_SIZE / WORD_BYTES) as usize];
    words[PATCH_SLOT] = NOP_WORD;
    words[PATCH_SLOT + 1] = SPIN_WORD;
    words
});

/// Preassembled interrupt-handler stub: an 8-word no-op entry sequence.
pub static INT_IMAGE: Lazy<Vec<u32>> = Lazy::new(|| {
    let mut words = vec![0u32; (INT_SIZE / WORD_BYTES) as usize];
    for w in words.iter_mut().take(8) {
        *w = NOP_WORD;
    }
    words
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bios_patch_slot_holds_filler() {
        assert_eq!(BIOS_IMAGE.len() * 4, BIOS_SIZE as usize);
        assert_eq!(BIOS_IMAGE[PATCH_SLOT], NOP_WORD);
        assert_eq!(BIOS_IMAGE[PATCH_SLOT + 1], SPIN_WORD);
    }

    #[test]
    fn handler_fills_its_region() {
        assert_eq!(INT_IMAGE.len() * 4, INT_SIZE as usize);
        assert_eq!(INT_IMAGE[0], NOP_WORD);
    }
}
