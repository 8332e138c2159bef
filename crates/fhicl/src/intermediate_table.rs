//! mutable parse-time tree
//!
//! The document parser assembles an [IntermediateTable] binding by binding. Keys are paths such
//! as `a.b[2].c`; walking a path for insertion creates missing tables and sequences on the way.
//! Protection is enforced here:
//! - a `PROTECT_ERROR` binding anywhere along the path rejects the insertion with an error
//! - a `PROTECT_IGNORE` binding anywhere along the path silently drops the insertion
//! - a binding can not be re-bound with a higher protection than it already has
use crate::coding::Decode;
use crate::error::{Error, Result};
use crate::extended_value::{ExtendedValue, Payload, Protection, Table, ValueTag};

/// How keys are split into path components
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum KeyMode {
    /// `.`, `[` and `]` separate components
    #[default]
    Dotted,
    /// only brackets separate components, dots are part of names
    Snippet,
}

/// Sequences are never padded beyond this many elements by an insertion
const MAX_SEQUENCE_LENGTH: usize = 1 << 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Part<'k> {
    Name(&'k str),
    Index(usize),
}

impl std::fmt::Display for Part<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Part::Name(name) => f.write_str(name),
            Part::Index(index) => write!(f, "{index}"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct IntermediateTable {
    root: ExtendedValue,
    mode: KeyMode,
}

impl Default for IntermediateTable {
    fn default() -> Self {
        Self::with_mode(KeyMode::default())
    }
}

/// What an insertion would run into, found without modifying the tree
struct Probe {
    ignored: bool,
    /// protection and provenance of an existing non-nil target
    target: Option<(Protection, String)>,
}

impl IntermediateTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mode(mode: KeyMode) -> Self {
        Self {
            root: ExtendedValue::empty_table(),
            mode,
        }
    }

    pub fn mode(&self) -> KeyMode {
        self.mode
    }

    fn table(&self) -> &Table {
        match &self.root.payload {
            Payload::Table(table) => table,
            _ => unreachable!("root of an intermediate table is always a table"),
        }
    }

    fn table_mut(&mut self) -> &mut Table {
        match &mut self.root.payload {
            Payload::Table(table) => table,
            _ => unreachable!("root of an intermediate table is always a table"),
        }
    }

    /// No bindings at all, prolog bindings included
    pub fn is_empty(&self) -> bool {
        self.table().is_empty()
    }

    /// Top level bindings in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &ExtendedValue)> {
        self.table().iter()
    }

    pub fn root(&self) -> &ExtendedValue {
        &self.root
    }

    fn split<'k>(&self, key: &'k str) -> Result<Vec<Part<'k>>> {
        let separators: &[char] = match self.mode {
            KeyMode::Dotted => &['.', '[', ']'],
            KeyMode::Snippet => &['[', ']'],
        };

        key.split(separators)
            .filter(|part| !part.is_empty())
            .map(|part| {
                if !part.starts_with(|c: char| c.is_ascii_digit()) {
                    return Ok(Part::Name(part));
                }
                let digits = part
                    .find(|c: char| !c.is_ascii_digit())
                    .map_or(part, |end| &part[..end]);
                digits.parse().map(Part::Index).map_err(|_| {
                    let context = format!("-- index out of range (at part \"{digits}\")");
                    Error::cant_find_at(key, context)
                })
            })
            .collect()
    }

    /// Value at `key`
    pub fn find(&self, key: &str) -> Result<&ExtendedValue> {
        let mut node = &self.root;
        for part in self.split(key)? {
            node = match (part, &node.payload) {
                (Part::Index(index), Payload::Sequence(sequence)) => sequence
                    .get(index)
                    .ok_or_else(|| Error::cant_find_at(key, format!("(at part \"{part}\")")))?,
                (Part::Index(_), _) => {
                    return Err(Error::cant_find_at(
                        key,
                        format!("-- not a sequence (at part \"{part}\")"),
                    ))
                }
                (Part::Name(name), Payload::Table(table)) => table
                    .get(name)
                    .ok_or_else(|| Error::cant_find_at(key, format!("(at part \"{part}\")")))?,
                (Part::Name(_), _) => {
                    return Err(Error::cant_find_at(
                        key,
                        format!("-- not a table (at part \"{part}\")"),
                    ))
                }
            };
        }
        Ok(node)
    }

    pub fn exists(&self, key: &str) -> bool {
        self.find(key).is_ok()
    }

    /// Decode the value at `key`
    pub fn get<T: Decode>(&self, key: &str) -> Result<T> {
        let value = crate::coding::encode_extended(self.find(key)?)?;
        T::decode(&value)
    }

    /// Bind `value` at `key`
    ///
    /// Returns `false` when the insertion was dropped because of `PROTECT_IGNORE`.
    #[tracing::instrument(level = "trace", skip(self, value))]
    pub fn insert(&mut self, key: &str, value: ExtendedValue) -> Result<bool> {
        let parts = self
            .split(key)
            .map_err(|_| Error::CantInsert(format!("\"{key}\" has an index that is out of range")))?;
        let Some(first) = parts.first().copied() else {
            return Err(Error::cant_find_at(key, "-- vacuous key"));
        };
        if let Some(Part::Index(index)) = parts
            .iter()
            .find(|part| matches!(part, Part::Index(index) if *index >= MAX_SEQUENCE_LENGTH))
        {
            return Err(Error::CantInsert(format!(
                "\"{key}\": index {index} exceeds the largest sequence length of {MAX_SEQUENCE_LENGTH}"
            )));
        }

        // a binding outside of the prolog replaces a prolog binding of the same name
        if !value.in_prolog {
            if let Part::Name(name) = first {
                let table = self.table_mut();
                if table.get(name).is_some_and(|existing| existing.in_prolog) {
                    table.shift_remove(name);
                }
            }
        }

        let probe = self.probe(key, &parts)?;

        if let Some((existing, src_info)) = &probe.target {
            if value.protection > *existing {
                return Err(Error::ProtectionViolation(format!(
                    "\"{key}\" cannot be assigned with increased protection\n(previous definition on {src_info})"
                )));
            }
        }

        if probe.ignored {
            tracing::debug!(key, "binding is protected, ignoring assignment");
            return Ok(false);
        }

        let slot = self.locate(key, &parts, value.in_prolog)?;
        *slot = value;
        Ok(true)
    }

    fn probe(&self, key: &str, parts: &[Part]) -> Result<Probe> {
        let mut ignored = false;
        let mut node = &self.root;

        for part in parts {
            let next = match (part, &node.payload) {
                (_, Payload::Nil) => None,
                (Part::Index(index), Payload::Sequence(sequence)) => sequence.get(*index),
                (Part::Name(name), Payload::Table(table)) => table.get(*name),
                (Part::Index(_), _) => {
                    return Err(Error::cant_find_at(
                        key,
                        format!("-- not a sequence (at part \"{part}\")"),
                    ))
                }
                (Part::Name(_), _) => {
                    return Err(Error::cant_find_at(
                        key,
                        format!("-- not a table (at part \"{part}\")"),
                    ))
                }
            };

            let Some(next) = next else {
                return Ok(Probe {
                    ignored,
                    target: None,
                });
            };

            match next.protection {
                Protection::ProtectError => {
                    let prefix = if part.to_string() != key {
                        format!("Part \"{part}\" of specification to be overwritten\n")
                    } else {
                        String::new()
                    };
                    return Err(Error::ProtectionViolation(format!(
                        "{prefix}\"{key}\" is protected on {}",
                        next.pretty_src_info()
                    )));
                }
                Protection::ProtectIgnore => ignored = true,
                Protection::None => {}
            }

            node = next;
        }

        let target = (!node.is_a(ValueTag::Nil))
            .then(|| (node.protection, node.pretty_src_info().to_string()));
        Ok(Probe { ignored, target })
    }

    /// Walk to `parts`, creating tables, sequences and nil placeholders as needed
    fn locate(&mut self, key: &str, parts: &[Part], in_prolog: bool) -> Result<&mut ExtendedValue> {
        let mut node = &mut self.root;

        for part in parts {
            match *part {
                Part::Index(index) => {
                    if node.is_a(ValueTag::Nil) {
                        node.payload = Payload::Sequence(Vec::new());
                    }
                    node.set_prolog(in_prolog);
                    let Payload::Sequence(sequence) = &mut node.payload else {
                        return Err(Error::cant_find_at(
                            key,
                            format!("-- not a sequence (at part \"{part}\")"),
                        ));
                    };
                    let Some(length) = index.checked_add(1) else {
                        return Err(Error::CantInsert(format!("\"{key}\": index {index} is out of range")));
                    };
                    if sequence.len() < length {
                        sequence.resize_with(length, ExtendedValue::nil);
                    }
                    node = &mut sequence[index];
                }
                Part::Name(name) => {
                    if node.is_a(ValueTag::Nil) {
                        node.payload = Payload::Table(Table::new());
                        node.set_prolog(in_prolog);
                    }
                    let Payload::Table(table) = &mut node.payload else {
                        return Err(Error::cant_find_at(
                            key,
                            format!("-- not a table (at part \"{part}\")"),
                        ));
                    };
                    node = table
                        .entry(name.to_string())
                        .or_insert_with(ExtendedValue::nil);
                    node.set_prolog(in_prolog);
                }
            }
        }

        Ok(node)
    }

    /// Remove the binding at `key`
    ///
    /// Missing bindings are ignored, as are bindings protected with `PROTECT_IGNORE`. Outside of
    /// a prolog, prolog bindings are never erased.
    #[tracing::instrument(level = "trace", skip(self))]
    pub fn erase(&mut self, key: &str, in_prolog: bool) -> Result<()> {
        // an index that does not fit names nothing to erase
        let Ok(parts) = self.split(key) else {
            return Ok(());
        };
        let Some(first) = parts.first().copied() else {
            return Ok(());
        };

        if !in_prolog {
            let erasable = match first {
                Part::Name(name) => self
                    .table()
                    .get(name)
                    .is_some_and(|existing| !existing.in_prolog),
                Part::Index(_) => false,
            };
            if !erasable {
                return Ok(());
            }
        }

        let mut node = &self.root;
        let mut at_sequence = false;
        for part in &parts {
            match (part, &node.payload) {
                (Part::Index(index), Payload::Sequence(sequence)) => {
                    let Some(next) = sequence.get(*index) else {
                        return Ok(());
                    };
                    node = next;
                    at_sequence = true;
                }
                (Part::Index(_), _) => {
                    return Err(Error::cant_find_at(
                        key,
                        format!("-- not a sequence (at part \"{part}\")"),
                    ))
                }
                (Part::Name(name), Payload::Table(table)) => {
                    at_sequence = false;
                    let Some(next) = table.get(*name) else {
                        return Ok(());
                    };
                    match next.protection {
                        Protection::ProtectError => {
                            let prefix = if *name != key {
                                format!("Part \"{name}\" of specification to be erased\n")
                            } else {
                                String::new()
                            };
                            return Err(Error::ProtectionViolation(format!(
                                "{prefix}\"{name}\" is protected on {}",
                                next.pretty_src_info()
                            )));
                        }
                        Protection::ProtectIgnore => {
                            tracing::debug!(key, "binding is protected, ignoring erase");
                            return Ok(());
                        }
                        Protection::None => {}
                    }
                    node = next;
                }
                (Part::Name(_), _) => {
                    return Err(Error::cant_find_at(
                        key,
                        format!("-- not a table (at part \"{part}\")"),
                    ))
                }
            }
        }

        if at_sequence {
            return Err(Error::Unimplemented("erase sequence member".into()));
        }

        let Some((Part::Name(last), parents)) = parts.split_last() else {
            return Ok(());
        };

        let mut node = &mut self.root;
        for part in parents {
            node = match (part, &mut node.payload) {
                (Part::Index(index), Payload::Sequence(sequence)) => &mut sequence[*index],
                (Part::Name(name), Payload::Table(table)) => match table.get_mut(*name) {
                    Some(next) => next,
                    None => return Ok(()),
                },
                _ => return Ok(()),
            };
        }
        if let Payload::Table(table) = &mut node.payload {
            table.shift_remove(*last);
        }

        Ok(())
    }
}

impl<'t> IntoIterator for &'t IntermediateTable {
    type Item = (&'t String, &'t ExtendedValue);
    type IntoIter = indexmap::map::Iter<'t, String, ExtendedValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.table().iter()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::error::ErrorCategory;
    use pretty_assertions::assert_eq;

    fn number(n: &str) -> ExtendedValue {
        ExtendedValue::new(false, Payload::Number(n.into()))
    }

    fn protected(n: &str, protection: Protection) -> ExtendedValue {
        ExtendedValue {
            protection,
            ..number(n)
        }
    }

    #[test]
    fn insert_creates_intermediate_tables_and_sequences() {
        let mut table = IntermediateTable::new();
        assert!(table.insert("a.b[2].c", number("1")).unwrap());

        assert!(table.exists("a.b"));
        assert_eq!(table.find("a.b").unwrap().tag(), ValueTag::Sequence);
        assert_eq!(table.find("a.b[0]").unwrap().tag(), ValueTag::Nil);
        assert_eq!(table.find("a.b[2].c").unwrap(), &number("1"));
        assert!(!table.exists("a.b[3]"));
    }

    #[test]
    fn find_reports_wrong_shapes() {
        let mut table = IntermediateTable::new();
        table.insert("a", number("1")).unwrap();

        let error = table.find("a.b").unwrap_err();
        assert_eq!(error.category(), ErrorCategory::CantFind);
        assert!(error.to_string().contains("not a table"));

        let error = table.find("a[0]").unwrap_err();
        assert!(error.to_string().contains("not a sequence"));
        assert!(!table.exists("a[0]"));
    }

    #[test]
    fn protect_ignore_drops_assignment() {
        let mut table = IntermediateTable::new();
        table
            .insert("x", protected("29", Protection::ProtectIgnore))
            .unwrap();
        assert!(!table.insert("x", number("33")).unwrap());
        assert_eq!(table.find("x").unwrap().payload, Payload::Number("29".into()));
    }

    #[test]
    fn protect_ignore_on_enclosing_table() {
        let mut table = IntermediateTable::new();
        let mut inner = Table::new();
        inner.insert("x".into(), number("29"));
        table
            .insert(
                "a",
                ExtendedValue {
                    protection: Protection::ProtectIgnore,
                    ..ExtendedValue::new(false, Payload::Table(inner))
                },
            )
            .unwrap();

        assert!(!table.insert("a.x", number("33")).unwrap());
        assert!(!table.insert("a.y", number("1")).unwrap());
        assert!(!table.exists("a.y"));
    }

    #[test]
    fn protect_error_rejects_assignment() {
        let mut table = IntermediateTable::new();
        table
            .insert("x", protected("29", Protection::ProtectError))
            .unwrap();
        let error = table.insert("x", number("33")).unwrap_err();
        assert_eq!(error.category(), ErrorCategory::ProtectionViolation);
    }

    #[test]
    fn increasing_protection_is_rejected() {
        let mut table = IntermediateTable::new();
        table.insert("x", number("29")).unwrap();
        let error = table
            .insert("x", protected("33", Protection::ProtectIgnore))
            .unwrap_err();
        assert_eq!(error.category(), ErrorCategory::ProtectionViolation);
    }

    #[test]
    fn body_binding_replaces_prolog_binding() {
        let mut table = IntermediateTable::new();
        let mut prolog = protected("29", Protection::ProtectError);
        prolog.in_prolog = true;
        table.insert("x", prolog).unwrap();

        assert!(table.insert("x", number("33")).unwrap());
        assert!(!table.find("x").unwrap().in_prolog);
    }

    #[test]
    fn erase() {
        let mut table = IntermediateTable::new();
        table.insert("a.x", number("1")).unwrap();
        table.insert("a.y", number("2")).unwrap();

        table.erase("a.x", false).unwrap();
        assert!(!table.exists("a.x"));
        assert!(table.exists("a.y"));

        // missing keys are fine
        table.erase("a.z", false).unwrap();
        table.erase("nothing.here", false).unwrap();

        table.insert("x", number("29")).unwrap();
        table.erase("x", false).unwrap();
        table.erase("a", false).unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn erase_respects_protection_and_prolog() {
        let mut table = IntermediateTable::new();
        table
            .insert("i", protected("1", Protection::ProtectIgnore))
            .unwrap();
        table
            .insert("e", protected("2", Protection::ProtectError))
            .unwrap();
        let mut prolog = number("3");
        prolog.in_prolog = true;
        table.insert("p", prolog).unwrap();

        table.erase("i", false).unwrap();
        assert!(table.exists("i"));

        let error = table.erase("e", false).unwrap_err();
        assert_eq!(error.category(), ErrorCategory::ProtectionViolation);

        table.erase("p", false).unwrap();
        assert!(table.exists("p"));
        table.erase("p", true).unwrap();
        assert!(!table.exists("p"));
    }

    #[test]
    fn erase_sequence_member_is_unimplemented() {
        let mut table = IntermediateTable::new();
        table.insert("s[1]", number("1")).unwrap();
        let error = table.erase("s[1]", false).unwrap_err();
        assert_eq!(error.category(), ErrorCategory::Unimplemented);
        // out of range is a no-op
        table.erase("s[5]", false).unwrap();
    }

    #[test]
    fn huge_indices_are_rejected() {
        let mut table = IntermediateTable::new();
        for key in [
            "a[18446744073709551615]",
            "a[99999999999999999999999]",
            "a[99999999999999]",
        ] {
            let error = table.insert(key, number("1")).unwrap_err();
            assert_eq!(error.category(), ErrorCategory::CantInsert, "{key}");
            assert!(!table.exists(key));
        }
        assert!(table.is_empty());

        assert!(table.insert("a[3]", number("1")).unwrap());
        let error = table.find("a[99999999999999999999999]").unwrap_err();
        assert_eq!(error.category(), ErrorCategory::CantFind);
        table.erase("a[99999999999999999999999]", false).unwrap();
    }

    #[test]
    fn snippet_mode_keeps_dots_in_names() {
        let mut table = IntermediateTable::with_mode(KeyMode::Snippet);
        table.insert("a.b[1]", number("1")).unwrap();

        assert_eq!(table.iter().map(|(k, _)| k.as_str()).collect::<Vec<_>>(), ["a.b"]);
        assert!(table.exists("a.b[1]"));
    }

    #[test]
    fn typed_get() {
        let mut table = IntermediateTable::new();
        table.insert("a.x", number("29")).unwrap();
        assert_eq!(table.get::<u64>("a.x").unwrap(), 29);
        assert_eq!(table.get::<String>("a.x").unwrap(), "29");
    }
}
