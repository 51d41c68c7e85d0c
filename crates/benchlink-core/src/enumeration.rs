//! Bidirectional label/code enumerations.
//!
//! Every symbolic option set an instrument exposes (valve override state,
//! signal type, measurement unit, gas type, ...) is a closed, order-stable
//! mapping between a human label and a protocol-native code. A [`BiMap`] is
//! built once from a single literal list of `(label, code)` pairs, so the two
//! lookup directions can never drift apart.
//!
//! # Example
//!
//! ```
//! use benchlink_core::BiMap;
//!
//! let vor = BiMap::new("valve override", &[("Normal", 0u8), ("Closed", 1), ("Open", 2)]);
//! assert_eq!(vor.code("Open").unwrap(), 2);
//! assert_eq!(vor.label(1).unwrap(), "Closed");
//! assert!(vor.code("Ajar").is_err());
//! ```

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

use crate::error::{Error, Result};

/// A total, injective mapping between labels and protocol codes.
#[derive(Debug)]
pub struct BiMap<C: 'static> {
    name: &'static str,
    pairs: &'static [(&'static str, C)],
    by_label: HashMap<&'static str, C>,
    by_code: HashMap<C, &'static str>,
}

impl<C> BiMap<C>
where
    C: Copy + Eq + Hash + Debug + 'static,
{
    /// Build a map from a literal pair list.
    ///
    /// # Panics
    ///
    /// Panics if a label or a code appears twice. Tables are build-time
    /// constants, so a duplicate is a programming error.
    pub fn new(name: &'static str, pairs: &'static [(&'static str, C)]) -> Self {
        let mut by_label = HashMap::with_capacity(pairs.len());
        let mut by_code = HashMap::with_capacity(pairs.len());
        for &(label, code) in pairs {
            assert!(
                by_label.insert(label, code).is_none(),
                "duplicate label {label:?} in {name} table"
            );
            assert!(
                by_code.insert(code, label).is_none(),
                "duplicate code {code:?} in {name} table"
            );
        }
        BiMap {
            name,
            pairs,
            by_label,
            by_code,
        }
    }

    /// Name of the table, used in error messages.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Look up the code for `label`.
    pub fn code(&self, label: &str) -> Result<C> {
        self.by_label
            .get(label)
            .copied()
            .ok_or_else(|| Error::UnknownEnumValue {
                table: self.name,
                value: label.to_string(),
            })
    }

    /// Look up the label for `code`.
    pub fn label(&self, code: C) -> Result<&'static str> {
        self.by_code
            .get(&code)
            .copied()
            .ok_or_else(|| Error::UnknownEnumValue {
                table: self.name,
                value: format!("{code:?}"),
            })
    }

    /// Labels in declaration order (suitable for populating a selector).
    pub fn labels(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.pairs.iter().map(|(label, _)| *label)
    }

    /// `(label, code)` pairs in declaration order.
    pub fn pairs(&self) -> &'static [(&'static str, C)] {
        self.pairs
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static PORT_TYPES: &[(&str, char)] = &[("Off", '0'), ("0-20mA", '7'), ("2-10V", ':')];

    #[test]
    fn lookup_both_directions() {
        let map = BiMap::new("signal type", PORT_TYPES);
        assert_eq!(map.code("2-10V").unwrap(), ':');
        assert_eq!(map.label('7').unwrap(), "0-20mA");
    }

    #[test]
    fn unknown_label_is_error() {
        let map = BiMap::new("signal type", PORT_TYPES);
        match map.code("4-20mA") {
            Err(Error::UnknownEnumValue { table, value }) => {
                assert_eq!(table, "signal type");
                assert_eq!(value, "4-20mA");
            }
            other => panic!("expected UnknownEnumValue, got {other:?}"),
        }
    }

    #[test]
    fn unknown_code_is_error() {
        let map = BiMap::new("signal type", PORT_TYPES);
        assert!(matches!(map.label('x'), Err(Error::UnknownEnumValue { .. })));
    }

    #[test]
    fn labels_keep_declaration_order() {
        let map = BiMap::new("signal type", PORT_TYPES);
        assert_eq!(map.labels().collect::<Vec<_>>(), vec!["Off", "0-20mA", "2-10V"]);
        assert_eq!(map.len(), 3);
    }

    #[test]
    fn bijection_law() {
        let map = BiMap::new("signal type", PORT_TYPES);
        for &(label, code) in map.pairs() {
            assert_eq!(map.label(map.code(label).unwrap()).unwrap(), label);
            assert_eq!(map.code(map.label(code).unwrap()).unwrap(), code);
        }
    }

    #[test]
    #[should_panic(expected = "duplicate code")]
    fn duplicate_code_panics() {
        static BAD: &[(&str, u8)] = &[("a", 1), ("b", 1)];
        let _ = BiMap::new("bad", BAD);
    }

    #[test]
    #[should_panic(expected = "duplicate label")]
    fn duplicate_label_panics() {
        static BAD: &[(&str, u8)] = &[("a", 1), ("a", 2)];
        let _ = BiMap::new("bad", BAD);
    }
}
