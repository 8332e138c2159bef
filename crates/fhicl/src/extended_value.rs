//! parser-side value tree
//!
//! An [ExtendedValue] is what the document parser builds: a tagged value plus the bookkeeping
//! needed while a document is being assembled (prolog membership, provenance and the protection
//! of the binding that holds it).
use crate::canonical;
use indexmap::IndexMap;

/// Override resistance of a binding, strongest wins
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Protection {
    #[default]
    None,
    ProtectIgnore,
    ProtectError,
}

impl std::fmt::Display for Protection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Protection::None => "NONE",
            Protection::ProtectIgnore => "PROTECT_IGNORE",
            Protection::ProtectError => "PROTECT_ERROR",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueTag {
    Unknown,
    Nil,
    Bool,
    Number,
    Complex,
    String,
    Sequence,
    Table,
    TableId,
}

impl std::fmt::Display for ValueTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            ValueTag::Unknown => "unknown",
            ValueTag::Nil => "nil",
            ValueTag::Bool => "bool",
            ValueTag::Number => "number",
            ValueTag::Complex => "complex",
            ValueTag::String => "string",
            ValueTag::Sequence => "sequence",
            ValueTag::Table => "table",
            ValueTag::TableId => "table id",
        })
    }
}

pub type Sequence = Vec<ExtendedValue>;
pub type Table = IndexMap<String, ExtendedValue>;

/// Tagged payload, atoms are held in canonical form
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Payload {
    #[default]
    Unknown,
    Nil,
    Bool(bool),
    /// canonical number
    Number(String),
    /// canonical numbers of the real and imaginary part
    Complex(String, String),
    /// canonical (quoted) string
    String(String),
    Sequence(Sequence),
    Table(Table),
    /// 40 hex digit id of a registered table
    TableId(String),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtendedValue {
    pub in_prolog: bool,
    pub payload: Payload,
    /// `file:line` where the value was bound
    pub src_info: String,
    /// protection of the binding holding this value
    pub protection: Protection,
}

impl ExtendedValue {
    pub fn new(in_prolog: bool, payload: Payload) -> Self {
        Self {
            in_prolog,
            payload,
            ..Default::default()
        }
    }

    pub fn with_src_info(mut self, src_info: impl Into<String>) -> Self {
        self.src_info = src_info.into();
        self
    }

    pub fn nil() -> Self {
        Self::new(false, Payload::Nil)
    }

    pub fn empty_table() -> Self {
        Self::new(false, Payload::Table(Table::new()))
    }

    pub fn empty_sequence() -> Self {
        Self::new(false, Payload::Sequence(Sequence::new()))
    }

    pub fn tag(&self) -> ValueTag {
        match &self.payload {
            Payload::Unknown => ValueTag::Unknown,
            Payload::Nil => ValueTag::Nil,
            Payload::Bool(_) => ValueTag::Bool,
            Payload::Number(_) => ValueTag::Number,
            Payload::Complex(_, _) => ValueTag::Complex,
            Payload::String(_) => ValueTag::String,
            Payload::Sequence(_) => ValueTag::Sequence,
            Payload::Table(_) => ValueTag::Table,
            Payload::TableId(_) => ValueTag::TableId,
        }
    }

    pub fn is_a(&self, tag: ValueTag) -> bool {
        self.tag() == tag
    }

    pub fn as_table(&self) -> Option<&Table> {
        match &self.payload {
            Payload::Table(table) => Some(table),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&Sequence> {
        match &self.payload {
            Payload::Sequence(sequence) => Some(sequence),
            _ => None,
        }
    }

    /// Set prolog membership of this value and everything nested in it
    pub fn set_prolog(&mut self, in_prolog: bool) {
        self.in_prolog = in_prolog;
        match &mut self.payload {
            Payload::Sequence(sequence) => sequence
                .iter_mut()
                .for_each(|element| element.set_prolog(in_prolog)),
            Payload::Table(table) => table
                .values_mut()
                .for_each(|element| element.set_prolog(in_prolog)),
            _ => {}
        }
    }

    pub fn set_src_info(&mut self, src_info: impl Into<String>) {
        self.src_info = src_info.into();
    }

    /// Protection belongs to the binding, a copied value starts out unprotected
    pub fn reset_protection(&mut self) {
        self.protection = Protection::None;
    }

    pub fn pretty_src_info(&self) -> &str {
        if self.src_info.is_empty() {
            "<unknown location>"
        } else {
            &self.src_info
        }
    }
}

/// FHiCL text of the value
impl std::fmt::Display for ExtendedValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.payload {
            Payload::Unknown => f.write_str("<unknown>"),
            Payload::Nil => f.write_str(canonical::NIL_TOKEN),
            Payload::Bool(value) => write!(f, "{value}"),
            Payload::Number(number) => f.write_str(number),
            Payload::Complex(re, im) => f.write_str(&canonical::canonical_complex(re, im)),
            Payload::String(string) => f.write_str(string),
            Payload::TableId(id) => write!(f, "@id::{id}"),
            Payload::Sequence(sequence) => {
                f.write_str("[")?;
                for (index, element) in sequence.iter().enumerate() {
                    if index > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{element}")?;
                }
                f.write_str("]")
            }
            Payload::Table(table) => {
                f.write_str("{")?;
                for (index, (name, element)) in table.iter().enumerate() {
                    if index > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{name}:{element}")?;
                }
                f.write_str("}")
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    fn number(n: &str) -> ExtendedValue {
        ExtendedValue::new(false, Payload::Number(n.into()))
    }

    #[test]
    fn protection_order() {
        assert!(Protection::None < Protection::ProtectIgnore);
        assert!(Protection::ProtectIgnore < Protection::ProtectError);
        assert_eq!(Protection::ProtectIgnore.to_string(), "PROTECT_IGNORE");
    }

    #[test]
    fn set_prolog_is_recursive() {
        let mut table = Table::new();
        table.insert(
            "s".into(),
            ExtendedValue::new(true, Payload::Sequence(vec![number("1")])),
        );
        let mut value = ExtendedValue::new(true, Payload::Table(table));

        value.set_prolog(false);
        let s = &value.as_table().unwrap()["s"];
        assert!(!s.in_prolog);
        assert!(!s.as_sequence().unwrap()[0].in_prolog);
    }

    #[test]
    fn display_renders_fhicl() {
        let mut table = Table::new();
        table.insert("a".into(), number("1"));
        table.insert(
            "b".into(),
            ExtendedValue::new(
                false,
                Payload::Sequence(vec![ExtendedValue::nil(), number("2")]),
            ),
        );
        let value = ExtendedValue::new(false, Payload::Table(table));

        assert_eq!(value.to_string(), "{a:1 b:[@nil,2]}");
        assert_eq!(value.tag(), ValueTag::Table);
    }
}
