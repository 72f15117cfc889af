use bimap::BiMap;

use arch::inst::Inst;
use arch::isa::{rv32i, Kind};
use arch::layout::{BIOS_BASE, BIOS_SIZE, INT_BASE, INT_SIZE, TOTAL_MEM_SIZE, USER_BASE, USER_SIZE, WORD_BYTES};
use arch::reg::Reg;

use crate::assemble::Program;
use crate::bios::PATCH_SLOT;
use crate::error::Error;

/// The flat instruction-memory image plus the data image. Built once per
/// run and handed straight to the emitters.
pub struct LinkedImage {
    pub text: Vec<u32>,
    pub data: Vec<u8>,
}

/// Place BIOS, user program and interrupt handler at their fixed bases and
/// patch the BIOS jump slot when the program defines `main`.
pub fn link(program: &Program, bios: &[u32], handler: &[u32]) -> Result<LinkedImage, Error> {
    let user_bytes = program.text.len() * WORD_BYTES as usize;
    if user_bytes > USER_SIZE as usize {
        return Err(Error::RegionOverflow(user_bytes, USER_SIZE as usize));
    }

    let mut mem = vec![0u32; (TOTAL_MEM_SIZE / WORD_BYTES) as usize];
    for (i, word) in bios.iter().take((BIOS_SIZE / WORD_BYTES) as usize).enumerate() {
        mem[i] = *word;
    }
    let user_index = (USER_BASE / WORD_BYTES) as usize;
    for (i, encoded) in program.text.iter().enumerate() {
        mem[user_index + i] = encoded.word;
    }
    let int_index = (INT_BASE / WORD_BYTES) as usize;
    for (i, word) in handler.iter().take((INT_SIZE / WORD_BYTES) as usize).enumerate() {
        mem[int_index + i] = *word;
    }

    if let Some(main) = program.symbols.text_addr("main") {
        let slot_addr = BIOS_BASE + PATCH_SLOT as u32 * WORD_BYTES;
        let target = USER_BASE + main;
        let jal = Inst::J { kind: Kind::JAL, rd: Reg::X1, imm: (target - slot_addr) as i32 };
        mem[PATCH_SLOT] = jal.to_bin(rv32i()).expect("patch jal is always encodable");
    }

    Ok(LinkedImage { text: mem, data: program.data.bytes().to_vec() })
}

/// Symbol ↔ absolute address maps for the debug listing: program memory and
/// data memory.
pub fn memory_maps(program: &Program) -> (BiMap<String, u32>, BiMap<String, u32>) {
    let mut pmmap = BiMap::new();
    let mut dmmap = BiMap::new();
    for (name, addr) in program.symbols.text_symbols() {
        pmmap.insert(name.to_string(), USER_BASE + addr);
    }
    for (name, addr) in program.symbols.data_symbols() {
        dmmap.insert(name.to_string(), addr);
    }
    (pmmap, dmmap)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assemble::assemble;
    use crate::bios::{BIOS_IMAGE, INT_IMAGE};
    use arch::inst::NOP_WORD;

    #[test]
    fn placement_at_fixed_bases() {
        let program = assemble(".text\nmain: li a0, 5\necall\n").unwrap();
        let image = link(&program, &BIOS_IMAGE, &INT_IMAGE).unwrap();
        assert_eq!(image.text.len(), (TOTAL_MEM_SIZE / WORD_BYTES) as usize);
        let user = (USER_BASE / WORD_BYTES) as usize;
        assert_eq!(image.text[user], 0x0050_0513);
        assert_eq!(image.text[user + 1], 0x0000_0073);
        let int = (INT_BASE / WORD_BYTES) as usize;
        assert_eq!(image.text[int], NOP_WORD);
    }

    #[test]
    fn bios_patch_jumps_to_main() {
        let program = assemble(".text\nnop\nnop\nmain: nop\n").unwrap();
        let image = link(&program, &BIOS_IMAGE, &INT_IMAGE).unwrap();
        // main at user offset 8: jal ra, 0x808
        assert_eq!(image.text[PATCH_SLOT], 0x0090_00EF);
    }

    #[test]
    fn no_main_leaves_the_filler() {
        let program = assemble(".text\nnop\n").unwrap();
        let image = link(&program, &BIOS_IMAGE, &INT_IMAGE).unwrap();
        assert_eq!(image.text[PATCH_SLOT], NOP_WORD);
        assert_eq!(image.text[PATCH_SLOT + 1], 0x0000_006F);
    }

    #[test]
    fn exact_fit_succeeds_one_more_overflows() {
        let mut program = assemble(".text\nnop\n").unwrap();
        let capacity = (USER_SIZE / WORD_BYTES) as usize;
        let nop = program.text[0].clone();
        program.text = vec![nop.clone(); capacity];
        assert!(link(&program, &BIOS_IMAGE, &INT_IMAGE).is_ok());
        program.text.push(nop);
        assert!(matches!(
            link(&program, &BIOS_IMAGE, &INT_IMAGE),
            Err(Error::RegionOverflow(size, cap))
                if size == (capacity + 1) * 4 && cap == USER_SIZE as usize
        ));
    }

    #[test]
    fn memory_maps_are_bidirectional() {
        let program = assemble(".data\nx: .word 1\n.text\nmain: nop\n").unwrap();
        let (pmmap, dmmap) = memory_maps(&program);
        assert_eq!(pmmap.get_by_left("main"), Some(&USER_BASE));
        assert_eq!(pmmap.get_by_right(&USER_BASE), Some(&"main".to_string()));
        assert_eq!(dmmap.get_by_left("x"), Some(&0));
    }
}
