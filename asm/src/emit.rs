use std::fmt::Write as _;
use std::path::Path;

use crate::error::Error;

/// Handshake marker opening the program byte stream.
pub const PROGRAM_MARK: &str = "03020000";
/// Handshake marker separating program bytes from data bytes.
pub const DATA_MARK: &str = "03030000";

/// COE memory-initialization text: radix header, then one word per line.
pub fn coe_string(words: &[u32]) -> String {
    let mut out =
        String::from("memory_initialization_radix=16;\nmemory_initialization_vector=\n");
    if words.is_empty() {
        out.push_str("00000000;\n");
        return out;
    }
    for (i, word) in words.iter().enumerate() {
        let terminator = if i + 1 == words.len() { ';' } else { ',' };
        writeln!(out, "{word:08x}{terminator}").unwrap();
    }
    out
}

/// UART bootload stream: program marker, every program word split into
/// big-endian bytes one per line, data marker, then the data bytes.
pub fn serial_string(program_words: &[u32], data: &[u8]) -> String {
    let mut out = String::new();
    writeln!(out, "{PROGRAM_MARK}").unwrap();
    for word in program_words {
        for shift in [24, 16, 8, 0] {
            writeln!(out, "{:02x}", (word >> shift) & 0xFF).unwrap();
        }
    }
    writeln!(out, "{DATA_MARK}").unwrap();
    for byte in data {
        writeln!(out, "{byte:02x}").unwrap();
    }
    out
}

pub fn write_file(path: &Path, content: &str) -> Result<(), Error> {
    std::fs::write(path, content)
        .map_err(|e| Error::FileWrite(path.display().to_string(), e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coe_format() {
        let coe = coe_string(&[0x00500513, 0x00000073]);
        assert_eq!(
            coe,
            "memory_initialization_radix=16;\n\
             memory_initialization_vector=\n\
             00500513,\n\
             00000073;\n"
        );
    }

    #[test]
    fn empty_coe_gets_a_zero_word() {
        assert!(coe_string(&[]).ends_with("00000000;\n"));
    }

    #[test]
    fn serial_stream_for_a_lone_nop() {
        let serial = serial_string(&[0x00000013], &[]);
        let lines: Vec<&str> = serial.lines().collect();
        assert_eq!(lines, vec!["03020000", "00", "00", "00", "13", "03030000"]);
    }

    #[test]
    fn serial_stream_with_data() {
        let serial = serial_string(&[0x00500513], &[0, 0, 0, 42]);
        let lines: Vec<&str> = serial.lines().collect();
        assert_eq!(
            lines,
            vec!["03020000", "00", "50", "05", "13", "03030000", "00", "00", "00", "2a"]
        );
    }
}
