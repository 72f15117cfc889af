use arch::layout;

use crate::error::Error;
use crate::parser::{DataKind, DataValue};

/// The data-memory image. Multi-byte values are laid out big-endian within
/// the image, matching the hardware's initialization convention.
#[derive(Debug, Default)]
pub struct DataSeg {
    bytes: Vec<u8>,
}

impl DataSeg {
    /// Next free data-space address.
    pub fn cursor(&self) -> u32 {
        self.bytes.len() as u32
    }

    pub fn push(&mut self, line: usize, kind: DataKind, values: &[DataValue]) -> Result<(), Error> {
        for value in values {
            match (kind, value) {
                (DataKind::Byte, DataValue::Int(v)) => {
                    if !(-128..=255).contains(v) {
                        return Err(Error::OperandOutOfRange(
                            line,
                            format!("byte value {v} out of range"),
                        ));
                    }
                    self.bytes.push(*v as u8);
                }
                (DataKind::Half, DataValue::Int(v)) => {
                    if !(-32768..=65535).contains(v) {
                        return Err(Error::OperandOutOfRange(
                            line,
                            format!("half value {v} out of range"),
                        ));
                    }
                    let v = *v as u16;
                    self.bytes.extend_from_slice(&v.to_be_bytes());
                }
                (DataKind::Word, DataValue::Int(v)) => {
                    if !(-(1 << 31)..=(1 << 32) - 1).contains(v) {
                        return Err(Error::OperandOutOfRange(
                            line,
                            format!("word value {v} out of range"),
                        ));
                    }
                    let v = *v as u32;
                    self.bytes.extend_from_slice(&v.to_be_bytes());
                }
                (DataKind::Asciiz, DataValue::Str(s)) => {
                    for c in s.chars() {
                        if !c.is_ascii() {
                            return Err(Error::OperandOutOfRange(
                                line,
                                format!("non-ASCII character `{c}` in string"),
                            ));
                        }
                        self.bytes.push(c as u8);
                    }
                    self.bytes.push(0);
                }
                (DataKind::Space, DataValue::Int(n)) => {
                    self.bytes.resize(self.bytes.len() + *n as usize, 0);
                }
                _ => {
                    return Err(Error::Syntax(line, "mismatched data directive value".to_string()))
                }
            }
        }
        if self.bytes.len() > layout::DATA_LIMIT as usize {
            return Err(Error::RegionOverflow(self.bytes.len(), layout::DATA_LIMIT as usize));
        }
        Ok(())
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Big-endian packed words for memory initialization, zero-padded.
    pub fn words(&self) -> Vec<u32> {
        self.bytes
            .chunks(4)
            .map(|chunk| {
                let mut word = 0u32;
                for (i, b) in chunk.iter().enumerate() {
                    word |= (*b as u32) << ((3 - i) * 8);
                }
                word
            })
            .collect()
    }
}
