//! materialized, queryable parameter sets
//!
//! A [ParameterSet] maps local names to [Value]s in lexicographic order. Nested tables are held
//! by id, lookups through a dotted key resolve them in the global
//! [ParameterSetRegistry](crate::ParameterSetRegistry).
//!
//! The content id is the hash of [ParameterSet::to_compact_string]; it is computed on demand and
//! forgotten on every mutation. Two parameter sets are equal when their ids are.
use crate::coding::{Decode, Encode, Nil};
use crate::document;
use crate::error::{Error, Result};
use crate::extended_value::{ExtendedValue, Payload};
use crate::id::ParameterSetId;
use crate::intermediate_table::IntermediateTable;
use crate::keys;
use crate::registry::ParameterSetRegistry;
use crate::source::SourceResolver;
use crate::value::Value;
use crate::visit::{KeyAssembler, ParameterSetWalker, Prettifier, PrintMode};
use once_cell::sync::OnceCell;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Nested tables in a compact string are replaced by their id when their inline form is longer
const COMPACT_LIMIT: usize = 5 + ParameterSetId::STR_LEN;

#[derive(Debug, Clone, Default)]
pub struct ParameterSet {
    mapping: BTreeMap<String, Value>,
    /// `file:line` of every key and sequence element that came from a document
    src_info: BTreeMap<String, String>,
    id: OnceCell<ParameterSetId>,
}

/// The parameter set a key is looked up in
enum Owner<'p> {
    This(&'p ParameterSet),
    Registered(Arc<ParameterSet>),
}

impl std::ops::Deref for Owner<'_> {
    type Target = ParameterSet;

    fn deref(&self) -> &ParameterSet {
        match self {
            Owner::This(pset) => pset,
            Owner::Registered(pset) => pset,
        }
    }
}

fn fill_src_info(value: &ExtendedValue, key: &str, src_info: &mut BTreeMap<String, String>) {
    src_info.insert(key.to_string(), value.src_info.clone());
    if let Payload::Sequence(elements) = &value.payload {
        for (index, element) in elements.iter().enumerate() {
            fill_src_info(element, &format!("{key}[{index}]"), src_info);
        }
    }
}

fn check_local_key(key: &str) -> Result<()> {
    if key.contains('.') {
        return Err(Error::Unimplemented(format!(
            "put for nested key \"{key}\""
        )));
    }
    Ok(())
}

fn find_in_sequence<'v>(mut value: &'v Value, indices: &[usize]) -> Option<&'v Value> {
    for index in indices {
        match value {
            Value::Sequence(elements) => value = elements.get(*index)?,
            _ => return None,
        }
    }
    Some(value)
}

impl ParameterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse document text
    pub fn make(text: &str) -> Result<Self> {
        Self::make_from_table(&document::parse_document(text)?)
    }

    /// Parse the document `name` as found by `resolver`
    pub fn make_from_file(name: &str, resolver: &dyn SourceResolver) -> Result<Self> {
        Self::make_from_table(&document::parse_document_file(name, resolver)?)
    }

    /// Every binding of `table` outside of the prolog
    pub fn make_from_table(table: &IntermediateTable) -> Result<Self> {
        let mut result = Self::new();
        for (key, value) in table {
            if !value.in_prolog {
                result.put_extended(key, value)?;
            }
        }
        Ok(result)
    }

    /// Members of a table value that are not part of the prolog
    pub fn make_from_extended(value: &ExtendedValue) -> Result<Self> {
        let Payload::Table(table) = &value.payload else {
            return Err(Error::type_mismatch("extended value not a table"));
        };

        let mut result = Self::new();
        for (key, value) in table {
            if !value.in_prolog {
                result.put_extended(key, value)?;
            }
        }
        Ok(result)
    }

    fn put_extended(&mut self, key: &str, value: &ExtendedValue) -> Result<()> {
        self.put(key, value)?;
        fill_src_info(value, key, &mut self.src_info);
        Ok(())
    }

    /// Content id, see [ParameterSetId]
    pub fn id(&self) -> ParameterSetId {
        *self
            .id
            .get_or_init(|| ParameterSetId::from_canonical(&self.to_compact_string()))
    }

    fn invalidate(&mut self) {
        self.id.take();
    }

    pub fn len(&self) -> usize {
        self.mapping.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mapping.is_empty()
    }

    /// Local names and their values, in order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.mapping.iter()
    }

    /// Ids of the tables directly nested in this one, sequence elements included
    pub(crate) fn table_ids(&self) -> Vec<ParameterSetId> {
        fn collect(value: &Value, ids: &mut Vec<ParameterSetId>) {
            match value {
                Value::Atom(_) => {}
                Value::Sequence(elements) => elements.iter().for_each(|e| collect(e, ids)),
                Value::Table(id) => ids.push(*id),
            }
        }

        let mut ids = Vec::new();
        self.mapping.values().for_each(|value| collect(value, &mut ids));
        ids
    }

    // ---- lookup

    /// Value of a local name, possibly indexed: `name[1][2]`
    fn find_one(&self, simple_key: &str) -> Result<Option<&Value>> {
        let key = keys::sequence_indices(simple_key)?;
        Ok(self
            .mapping
            .get(key.name)
            .and_then(|value| find_in_sequence(value, &key.indices)))
    }

    /// Follow table names, `None` when one of them is not a table
    fn descend(&self, tables: &[&str]) -> Result<Option<Owner<'_>>> {
        let mut owner = Owner::This(self);
        for name in tables {
            let Some(Value::Table(id)) = owner.find_one(name)? else {
                return Ok(None);
            };
            let nested = ParameterSetRegistry::global().get(id)?;
            owner = Owner::Registered(nested);
        }
        Ok(Some(owner))
    }

    /// Decode a local name, `None` when the name is missing
    fn get_one<T: Decode>(&self, simple_key: &str) -> Result<Option<T>> {
        let decoded = (|| {
            let key = keys::sequence_indices(simple_key)?;
            let Some(value) = self.mapping.get(key.name) else {
                return Ok(None);
            };
            let Some(value) = find_in_sequence(value, &key.indices) else {
                return Err(Error::cant_find_at(simple_key, "-- no such sequence element"));
            };
            T::decode(value).map(Some)
        })();

        decoded.map_err(|e| {
            Error::type_mismatch_caused_by(
                format!(
                    "\nUnsuccessful attempt to convert FHiCL parameter '{simple_key}' to type '{}'.\n\n[Specific error:]",
                    std::any::type_name::<T>()
                ),
                e,
            )
        })
    }

    /// Decoded value at `key`, `None` when there is nothing at `key`
    ///
    /// A value that can't be decoded is still an error.
    pub fn get_if_present<T: Decode>(&self, key: &str) -> Result<Option<T>> {
        let keys = keys::split_key(key)?;
        match self.descend(&keys.tables)? {
            Some(owner) => owner.get_one(keys.last),
            None => Ok(None),
        }
    }

    /// Decoded value at `key`
    ///
    /// ```
    /// let pset = fhicl::ParameterSet::make("m1: { val: 3 name: boo }").unwrap();
    /// assert_eq!(pset.get::<i32>("m1.val").unwrap(), 3);
    /// assert_eq!(pset.get::<String>("m1.name").unwrap(), "boo");
    /// assert!(pset.get::<i32>("m1.name").is_err());
    /// ```
    pub fn get<T: Decode>(&self, key: &str) -> Result<T> {
        self.get_if_present(key)?
            .ok_or_else(|| Error::cant_find(key))
    }

    /// Decoded value at `key` or `default` when there is nothing at `key`
    pub fn get_or<T: Decode>(&self, key: &str, default: T) -> Result<T> {
        Ok(self.get_if_present(key)?.unwrap_or(default))
    }

    /// Decode as `Via`, then convert
    pub fn get_if_present_via<T, Via: Decode>(
        &self,
        key: &str,
        convert: impl FnOnce(Via) -> T,
    ) -> Result<Option<T>> {
        Ok(self.get_if_present::<Via>(key)?.map(convert))
    }

    pub fn get_via<T, Via: Decode>(&self, key: &str, convert: impl FnOnce(Via) -> T) -> Result<T> {
        self.get_if_present_via(key, convert)?
            .ok_or_else(|| Error::cant_find(key))
    }

    /// Whether anything is found at `key`
    pub fn has_key(&self, key: &str) -> bool {
        let Ok(keys) = keys::split_key(key) else {
            return false;
        };
        match self.descend(&keys.tables) {
            Ok(Some(owner)) => matches!(owner.find_one(keys.last), Ok(Some(_))),
            _ => false,
        }
    }

    fn key_is(&self, key: &str, predicate: impl FnOnce(&Value) -> bool) -> Result<bool> {
        let keys = keys::split_key(key)?;
        let owner = self.descend(&keys.tables)?.ok_or_else(|| Error::cant_find(key))?;
        let value = owner.find_one(keys.last)?.ok_or_else(|| Error::cant_find(key))?;
        Ok(predicate(value))
    }

    pub fn is_key_to_table(&self, key: &str) -> Result<bool> {
        self.key_is(key, Value::is_table)
    }

    pub fn is_key_to_sequence(&self, key: &str) -> Result<bool> {
        self.key_is(key, Value::is_sequence)
    }

    pub fn is_key_to_atom(&self, key: &str) -> Result<bool> {
        self.key_is(key, Value::is_atom)
    }

    /// Local names
    pub fn get_names(&self) -> Vec<String> {
        self.mapping.keys().cloned().collect()
    }

    /// Local names of nested tables
    pub fn get_pset_names(&self) -> Vec<String> {
        self.mapping
            .iter()
            .filter(|(_, value)| value.is_table())
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// Every key reachable from this set, nested tables and sequence elements included
    pub fn get_all_keys(&self) -> Result<Vec<String>> {
        let mut assembler = KeyAssembler::default();
        self.walk(&mut assembler)?;
        Ok(assembler.into_keys())
    }

    /// `file:line` where `key` was bound, empty when unknown
    pub fn get_src_info(&self, key: &str) -> &str {
        self.src_info.get(key).map_or("", String::as_str)
    }

    // ---- mutation

    /// Bind a new local name
    pub fn put(&mut self, key: &str, value: impl Encode) -> Result<()> {
        check_local_key(key)?;
        if self.mapping.contains_key(key) {
            return Err(Error::CantInsert(format!("key {key} already exists.")));
        }
        let value = value.encode()?;
        self.mapping.insert(key.to_string(), value);
        self.invalidate();
        Ok(())
    }

    pub fn put_nil(&mut self, key: &str) -> Result<()> {
        self.put(key, Nil)
    }

    fn forget_src_info(&mut self, key: &str) {
        let element_prefix = format!("{key}[");
        self.src_info
            .retain(|name, _| name != key && !name.starts_with(&element_prefix));
    }

    /// Bind a local name, replacing whatever was there
    pub fn put_or_replace(&mut self, key: &str, value: impl Encode) -> Result<()> {
        check_local_key(key)?;
        let value = value.encode()?;
        self.mapping.insert(key.to_string(), value);
        self.forget_src_info(key);
        self.invalidate();
        Ok(())
    }

    pub fn put_or_replace_nil(&mut self, key: &str) -> Result<()> {
        self.put_or_replace(key, Nil)
    }

    /// Like [ParameterSet::put_or_replace], but the new value must have the shape of the old one
    ///
    /// Nil replaces anything and anything replaces nil.
    pub fn put_or_replace_compatible(&mut self, key: &str, value: impl Encode) -> Result<()> {
        check_local_key(key)?;
        let value = value.encode()?;

        if let Some(existing) = self.mapping.get(key) {
            if !value.is_nil() {
                let non_nil_atom = |v: &Value| v.is_atom() && !v.is_nil();
                if existing.is_sequence() && !value.is_sequence() {
                    return Err(Error::CantInsert(
                        "can't use non-sequence to replace sequence.".into(),
                    ));
                }
                if existing.is_table() && !value.is_table() {
                    return Err(Error::CantInsert(
                        "can't use non-table to replace table.".into(),
                    ));
                }
                if non_nil_atom(existing) && !value.is_atom() {
                    return Err(Error::CantInsert(
                        "can't use non-atom to replace non-nil atom.".into(),
                    ));
                }
            }
        }

        self.mapping.insert(key.to_string(), value);
        self.forget_src_info(key);
        self.invalidate();
        Ok(())
    }

    /// Remove a local name, returns whether it was there
    pub fn erase(&mut self, key: &str) -> bool {
        let erased = self.mapping.remove(key).is_some();
        self.forget_src_info(key);
        self.invalidate();
        erased
    }

    // ---- printing

    fn stringify(value: &Value, compact: bool) -> String {
        match value {
            Value::Table(id) => match ParameterSetRegistry::global().get(id) {
                Ok(nested) => {
                    let inline = format!("{{{nested}}}");
                    if compact && inline.len() > COMPACT_LIMIT {
                        format!("@id::{id}")
                    } else {
                        inline
                    }
                }
                Err(e) => {
                    tracing::warn!(%id, error=%e, "table is not registered, printing its id");
                    format!("@id::{id}")
                }
            },
            Value::Sequence(elements) => {
                let elements: Vec<_> = elements
                    .iter()
                    .map(|element| Self::stringify(element, compact))
                    .collect();
                format!("[{}]", elements.join(","))
            }
            atom => atom.to_string(),
        }
    }

    fn render(&self, compact: bool) -> String {
        self.mapping
            .iter()
            .map(|(key, value)| format!("{key}:{}", Self::stringify(value, compact)))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Single line form where larger nested tables are written as `@id::` references
    ///
    /// This is the canonical form the id is computed from.
    pub fn to_compact_string(&self) -> String {
        self.render(true)
    }

    /// One binding per line
    pub fn to_indented_string(&self, initial_indent: usize) -> Result<String> {
        self.to_indented_string_with(initial_indent, PrintMode::Raw)
    }

    pub fn to_indented_string_with(&self, initial_indent: usize, mode: PrintMode) -> Result<String> {
        let mut prettifier = Prettifier::new(initial_indent, mode);
        self.walk(&mut prettifier)?;
        Ok(prettifier.into_string())
    }

    // ---- traversal

    /// Depth first walk over every binding
    ///
    /// Nested tables are looked up in the registry, sequence elements are visited with keys
    /// like `name[3]`.
    pub fn walk(&self, walker: &mut dyn ParameterSetWalker) -> Result<()> {
        self.mapping
            .iter()
            .try_for_each(|(key, value)| self.walk_element(key, value, walker))
    }

    fn walk_element(
        &self,
        key: &str,
        value: &Value,
        walker: &mut dyn ParameterSetWalker,
    ) -> Result<()> {
        walker.before_action(key, value, self);

        match value {
            Value::Table(id) => {
                let nested = ParameterSetRegistry::global().get(id)?;
                walker.enter_table(key, &nested);
                nested.walk(walker)?;
                walker.exit_table(key, &nested);
            }
            Value::Sequence(elements) => {
                walker.enter_sequence(key, elements);
                for (index, element) in elements.iter().enumerate() {
                    self.walk_element(&format!("{key}[{index}]"), element, walker)?;
                }
                walker.exit_sequence(key, elements);
            }
            Value::Atom(atom) => walker.atom(key, atom),
        }

        walker.after_action(key);
        Ok(())
    }
}

/// Raw single line form, nested tables inlined
impl std::fmt::Display for ParameterSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.render(false))
    }
}

impl PartialEq for ParameterSet {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for ParameterSet {}

#[cfg(test)]
mod test {
    use super::*;
    use crate::error::ErrorCategory;
    use pretty_assertions::assert_eq;

    #[test]
    fn leading_zeros_are_the_same_value() {
        let a = ParameterSet::make("x: 5").unwrap();
        let b = ParameterSet::make("x: 005").unwrap();
        assert_eq!(a, b);
        assert_eq!(b.get::<i32>("x").unwrap(), 5);
    }

    #[test]
    fn nested_paths() {
        let pset = ParameterSet::make("m1: { val: 3 name: boo } s: [ { a: 1 }, [2, 3] ]").unwrap();
        assert!(pset.has_key("m1.val"));
        assert!(!pset.has_key("m1.val.three"));
        assert!(!pset.has_key("m2"));
        assert_eq!(pset.get::<i32>("s[0].a").unwrap(), 1);
        assert_eq!(pset.get::<u8>("s[1][1]").unwrap(), 3);
        assert!(pset.is_key_to_table("s[0]").unwrap());
        assert!(pset.is_key_to_sequence("s[1]").unwrap());
        assert!(pset.is_key_to_atom("m1.name").unwrap());
        assert_eq!(
            pset.is_key_to_atom("m1.nothing").unwrap_err().category(),
            ErrorCategory::CantFind
        );
    }

    #[test]
    fn missing_and_mistyped() {
        let pset = ParameterSet::make("a: 1 b: nil s: [1]").unwrap();

        assert_eq!(pset.get::<i32>("z").unwrap_err().category(), ErrorCategory::CantFind);
        assert_eq!(pset.get_or("z", 7).unwrap(), 7);
        assert_eq!(pset.get_if_present::<i32>("z").unwrap(), None);

        let mistyped = pset.get_or("b", 7.0).unwrap_err();
        assert_eq!(mistyped.category(), ErrorCategory::TypeMismatch);
        assert!(std::error::Error::source(&mistyped).is_some());

        assert_eq!(
            pset.get::<i32>("s[4]").unwrap_err().category(),
            ErrorCategory::TypeMismatch
        );
        assert_eq!(pset.get::<Option<String>>("b").unwrap(), None);
    }

    #[test]
    fn sequences_of_sequences() {
        let pset = ParameterSet::make("v1: [[ ],[ 1],[-1, 2,3]]").unwrap();
        assert_eq!(
            pset.get::<Vec<Vec<i32>>>("v1").unwrap(),
            vec![vec![], vec![1], vec![-1, 2, 3]]
        );
    }

    #[test]
    fn conversions() {
        let pset = ParameterSet::make("n: 12").unwrap();
        assert_eq!(pset.get_via("n", |n: u32| n * 2).unwrap(), 24);
        assert_eq!(pset.get_if_present_via("m", |n: u32| n * 2).unwrap(), None);
    }

    #[test]
    fn put_contracts() {
        let mut pset = ParameterSet::new();
        pset.put("a", 1).unwrap();
        assert_eq!(
            pset.put("a", 2).unwrap_err().category(),
            ErrorCategory::CantInsert
        );
        assert_eq!(
            pset.put("a.b", 2).unwrap_err().category(),
            ErrorCategory::Unimplemented
        );

        pset.put_or_replace("a", "text").unwrap();
        assert_eq!(pset.get::<String>("a").unwrap(), "text");

        pset.put("s", vec![1, 2]).unwrap();
        let table = ParameterSet::make("x: 1").unwrap();
        assert_eq!(
            pset.put_or_replace_compatible("s", &table).unwrap_err().category(),
            ErrorCategory::CantInsert
        );
        pset.put_or_replace_compatible("s", vec![3]).unwrap();
        pset.put_or_replace_compatible("s", Nil).unwrap();
        pset.put_or_replace_compatible("s", &table).unwrap();
        assert_eq!(pset.get::<i32>("s.x").unwrap(), 1);

        pset.put_nil("n").unwrap();
        pset.put_or_replace_nil("a").unwrap();
        assert!(pset.get::<Option<i32>>("a").unwrap().is_none());

        assert!(pset.erase("n"));
        assert!(!pset.erase("n"));
    }

    #[test]
    fn mutation_changes_the_id() {
        let mut pset = ParameterSet::make("a: 1").unwrap();
        let before = pset.id();
        pset.put("b", 2).unwrap();
        assert_ne!(pset.id(), before);
        pset.erase("b");
        assert_eq!(pset.id(), before);
    }

    #[test]
    fn names() {
        let pset = ParameterSet::make("b: { x: 1 } a: 2 c: [ { y: 3 } ]").unwrap();
        assert_eq!(pset.get_names(), ["a", "b", "c"]);
        assert_eq!(pset.get_pset_names(), ["b"]);
        assert_eq!(
            pset.get_all_keys().unwrap(),
            ["a", "b", "b.x", "c", "c[0]", "c[0].y"]
        );
    }

    #[test]
    fn prolog_bindings_are_left_out() {
        let pset = ParameterSet::make("BEGIN_PROLOG\np: 1\nq: 2\nEND_PROLOG\na: @local::p\n")
            .unwrap();
        assert_eq!(pset.get_names(), ["a"]);
    }

    #[test]
    fn strings_round_trip() {
        let text = "a: 1 b: { c: [1, 2, { d: \"x y\" }] e: {} } f: @nil g: (1,2) h: 'q'\n\
                    long: { first: \"some long text\" second: \"and some more text\" }";
        let pset = ParameterSet::make(text).unwrap();

        let raw = pset.to_string();
        assert_eq!(ParameterSet::make(&raw).unwrap(), pset);

        let compact = pset.to_compact_string();
        assert!(compact.contains("@id::"));
        assert!(compact.contains("b:{c:[1,2,{d:\"x y\"}] e:{}}"));
        assert_eq!(ParameterSet::make(&compact).unwrap(), pset);
        assert_eq!(pset.id(), ParameterSetId::from_canonical(&compact));
    }

    #[test]
    fn src_info() {
        let mut pset = ParameterSet::make("a: 1\ns: [\n  1,\n  2\n]\n").unwrap();
        assert_eq!(pset.get_src_info("a"), "-:1");
        assert_eq!(pset.get_src_info("s"), "-:2");
        assert_eq!(pset.get_src_info("s[1]"), "-:4");
        assert_eq!(pset.get_src_info("z"), "");

        pset.put_or_replace("s", vec![5]).unwrap();
        assert_eq!(pset.get_src_info("s"), "");
        assert_eq!(pset.get_src_info("s[1]"), "");
    }
}
