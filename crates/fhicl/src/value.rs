//! type-erased parameter values
//!
//! A [ParameterSet](crate::ParameterSet) stores each parameter as a [Value]:
//! - an atom: the canonical string form of a scalar (number, bool, string, complex or nil)
//! - a sequence of values (elements may differ in kind)
//! - a table, held by the id of a registered parameter set
//!
//! Tables are never stored inline. Equal sub-tables share one registry entry.
//!
//! For output (JSON/YAML) atoms get a native type back:
//! - nil becomes `null`
//! - `true`/`false` become booleans
//! - numbers become integers when they are integral and fit into 64 bits, floats otherwise
//! - strings are unquoted
//! - complex numbers stay strings such as `(1,2)`
use crate::canonical;
use crate::id::ParameterSetId;
use crate::registry::ParameterSetRegistry;
use crate::ParameterSet;
use serde::{
    ser::{Error as _, SerializeMap, SerializeSeq},
    Serializer,
};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Value {
    Atom(String),
    Sequence(Vec<Value>),
    Table(ParameterSetId),
}

impl Value {
    pub fn nil() -> Self {
        Value::Atom(canonical::NIL.to_string())
    }

    pub fn is_atom(&self) -> bool {
        matches!(self, Value::Atom(_))
    }

    pub fn is_sequence(&self) -> bool {
        matches!(self, Value::Sequence(_))
    }

    pub fn is_table(&self) -> bool {
        matches!(self, Value::Table(_))
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Atom(atom) if canonical::is_nil(atom))
    }

    pub fn as_atom(&self) -> Option<&str> {
        match self {
            Value::Atom(atom) => Some(atom),
            _ => None,
        }
    }

    /// Kind name used in diagnostics
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Atom(_) if self.is_nil() => "nil",
            Value::Atom(_) => "atom",
            Value::Sequence(_) => "sequence",
            Value::Table(_) => "table",
        }
    }
}

/// Raw FHiCL text, tables are written as `@id::` references
impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Atom(atom) if canonical::is_nil(atom) => f.write_str(canonical::NIL_TOKEN),
            Value::Atom(atom) => f.write_str(atom),
            Value::Table(id) => write!(f, "@id::{id}"),
            Value::Sequence(elements) => {
                f.write_str("[")?;
                for (index, element) in elements.iter().enumerate() {
                    if index > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{element}")?;
                }
                f.write_str("]")
            }
        }
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Atom(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Atom(value.to_string())
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Value::Sequence(value)
    }
}

impl From<ParameterSetId> for Value {
    fn from(value: ParameterSetId) -> Self {
        Value::Table(value)
    }
}

fn serialize_atom<S>(atom: &str, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    if canonical::is_nil(atom) {
        return serializer.serialize_unit();
    }

    match atom {
        "true" => return serializer.serialize_bool(true),
        "false" => return serializer.serialize_bool(false),
        "+infinity" => return serializer.serialize_f64(f64::INFINITY),
        "-infinity" => return serializer.serialize_f64(f64::NEG_INFINITY),
        _ => {}
    }

    if atom.starts_with('"') {
        let text = canonical::atom_text(atom)
            .ok_or_else(|| S::Error::custom(format!("malformed string atom {atom}")))?;
        return serializer.serialize_str(&text);
    }

    if let Ok(integer) = atom.parse::<i64>() {
        return serializer.serialize_i64(integer);
    }
    if let Ok(integer) = atom.parse::<u64>() {
        return serializer.serialize_u64(integer);
    }
    if canonical::canonical_number(atom).is_some() {
        if let Ok(float) = atom.parse::<f64>() {
            return serializer.serialize_f64(float);
        }
    }

    serializer.serialize_str(atom)
}

impl serde::ser::Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Value::Atom(atom) => serialize_atom(atom, serializer),
            Value::Sequence(value) => {
                let mut ser = serializer.serialize_seq(Some(value.len()))?;
                for element in value {
                    ser.serialize_element(element)?;
                }
                ser.end()
            }
            Value::Table(id) => {
                let pset = ParameterSetRegistry::global()
                    .get(id)
                    .map_err(S::Error::custom)?;
                pset.serialize(serializer)
            }
        }
    }
}

impl serde::ser::Serialize for ParameterSet {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut ser = serializer.serialize_map(Some(self.len()))?;
        for (element_key, element_value) in self.iter() {
            ser.serialize_entry(element_key, element_value)?;
        }
        ser.end()
    }
}
