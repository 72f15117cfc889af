use indexmap::IndexMap;

use arch::layout;

use crate::error::Error;
use crate::parser::Space;

/// Label addresses, one namespace per address space. Written during pass 1,
/// read-only during pass 2 and linking.
#[derive(Debug, Default)]
pub struct SymbolTable {
    text: IndexMap<String, u32>,
    data: IndexMap<String, u32>,
}

impl SymbolTable {
    pub fn define(&mut self, space: Space, name: &str, addr: u32) -> Result<(), Error> {
        let map = match space {
            Space::Text => &mut self.text,
            Space::Data => &mut self.data,
        };
        if map.contains_key(name) {
            return Err(Error::DuplicateSymbol(name.to_string()));
        }
        map.insert(name.to_string(), addr);
        Ok(())
    }

    /// User-region-relative address of a text label.
    pub fn text_addr(&self, name: &str) -> Option<u32> {
        self.text.get(name).copied()
    }

    /// Data-space address of a data label.
    pub fn data_addr(&self, name: &str) -> Option<u32> {
        self.data.get(name).copied()
    }

    /// Absolute address for `%hi`/`%lo` resolution: data symbols as-is, text
    /// symbols rebased onto the user region.
    pub fn absolute(&self, name: &str) -> Option<u32> {
        self.data_addr(name)
            .map(|a| layout::DATA_BASE + a)
            .or_else(|| self.text_addr(name).map(|a| layout::USER_BASE + a))
    }

    pub fn text_symbols(&self) -> impl Iterator<Item = (&str, u32)> {
        self.text.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn data_symbols(&self) -> impl Iterator<Item = (&str, u32)> {
        self.data.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.text.len() + self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty() && self.data.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spaces_are_separate_namespaces() {
        let mut table = SymbolTable::default();
        table.define(Space::Text, "x", 8).unwrap();
        table.define(Space::Data, "x", 4).unwrap();
        assert_eq!(table.text_addr("x"), Some(8));
        assert_eq!(table.data_addr("x"), Some(4));
    }

    #[test]
    fn duplicate_in_one_space_fails() {
        let mut table = SymbolTable::default();
        table.define(Space::Text, "loop", 0).unwrap();
        assert!(matches!(
            table.define(Space::Text, "loop", 4),
            Err(Error::DuplicateSymbol(name)) if name == "loop"
        ));
    }

    #[test]
    fn absolute_prefers_data_then_rebases_text() {
        let mut table = SymbolTable::default();
        table.define(Space::Data, "buf", 16).unwrap();
        table.define(Space::Text, "main", 8).unwrap();
        assert_eq!(table.absolute("buf"), Some(16));
        assert_eq!(table.absolute("main"), Some(layout::USER_BASE + 8));
        assert_eq!(table.absolute("nope"), None);
    }
}
