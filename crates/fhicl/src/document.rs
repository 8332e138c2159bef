//! semantic pass: from parsed documents to intermediate tables
//!
//! Walks the tree produced by [crate::syntax] statement by statement, in document order:
//! - prolog bindings are marked as such, body bindings replace prolog bindings of the same name
//! - `@local::`, `@table::` and `@sequence::` copy what has been bound so far
//! - protections are checked for every insertion and erasure
//!
//! Failures of a statement are reported as parse errors at the statement, the underlying error
//! is kept as the cause.
use crate::error::{Error, Result};
use crate::extended_value::{ExtendedValue, Payload, Protection, Sequence, Table};
use crate::intermediate_table::{IntermediateTable, KeyMode};
use crate::source::{Included, Includer, Location, SearchPath, SourceResolver};
use crate::syntax::{self, SequenceItem, Statement, SyntaxError, ValueKind, ValueNode};
use std::path::PathBuf;

/// Parse document text, `#include` names are taken relative to the current directory
pub fn parse_document(text: &str) -> Result<IntermediateTable> {
    parse_document_in_mode(text, KeyMode::default())
}

pub fn parse_document_in_mode(text: &str, mode: KeyMode) -> Result<IntermediateTable> {
    let resolver = SearchPath::new([PathBuf::from(".")]);
    let included = Includer::new(&resolver).expand_text(text)?;
    parse_included(&included, mode)
}

/// Parse the document `name` as found by `resolver`
pub fn parse_document_file(
    name: &str,
    resolver: &dyn SourceResolver,
) -> Result<IntermediateTable> {
    let included = Includer::new(resolver).expand_named(name)?;
    parse_included(&included, KeyMode::default())
}

/// Parse already expanded text
#[tracing::instrument(level = "trace", skip_all)]
pub fn parse_included(included: &Included, mode: KeyMode) -> Result<IntermediateTable> {
    let document =
        syntax::parse_document(included.text()).map_err(|e| syntax_error(included, e))?;

    let mut builder = Builder {
        included,
        table: IntermediateTable::with_mode(mode),
        in_prolog: true,
        standalone: false,
    };

    for prolog in &document.prologs {
        tracing::trace!(src = %included.src_info(prolog.pos), "entering prolog");
        for statement in &prolog.statements {
            builder.statement(statement)?;
        }
    }

    builder.in_prolog = false;
    for statement in &document.body {
        builder.statement(statement)?;
    }

    Ok(builder.table)
}

/// Parse a single value, returns it with the text following it
///
/// References can not be resolved without a document and are rejected.
pub fn parse_value_prefix(text: &str) -> Result<(ExtendedValue, &str)> {
    let included = Included::anonymous(text);
    let (node, end) = syntax::parse_value(text).map_err(|e| syntax_error(&included, e))?;

    let builder = Builder {
        included: &included,
        table: IntermediateTable::new(),
        in_prolog: false,
        standalone: true,
    };
    Ok((builder.value(&node)?, &text[end..]))
}

/// Parse text that consists of exactly one value
pub fn parse_value_string(text: &str) -> Result<ExtendedValue> {
    let (value, unparsed) = parse_value_prefix(text)?;
    if !unparsed.is_empty() {
        let offset = text.len() - unparsed.len();
        return Err(Error::parse(
            format!("unexpected text after value: {unparsed}"),
            Included::anonymous(text).locate(offset),
        ));
    }
    Ok(value)
}

fn syntax_error(included: &Included, error: SyntaxError) -> Error {
    Error::parse(error.message, included.locate(error.offset))
}

/// Apply a binding modifier, nested items must not be protected weaker than their container
///
/// Only the value itself gets the protection, nested items keep theirs.
fn set_protection(name: &str, modifier: Protection, value: &mut ExtendedValue) -> Result<()> {
    if modifier == Protection::None {
        return Ok(());
    }
    value.protection = modifier;
    check_nested_protection(name, modifier, value)
}

fn check_nested_protection(
    name: &str,
    enclosing: Protection,
    value: &ExtendedValue,
) -> Result<()> {
    let check = |child_name: String, child: &ExtendedValue| {
        if child.protection != Protection::None && child.protection < enclosing {
            let on = if child.src_info.is_empty() {
                String::new()
            } else {
                format!(" on {}", child.pretty_src_info())
            };
            return Err(Error::ProtectionViolation(format!(
                "Nested item {child_name} has protection {}{on}, which is incompatible with an enclosing item's protection of {enclosing}",
                child.protection
            )));
        }
        check_nested_protection(&child_name, enclosing.max(child.protection), child)
    };

    match &value.payload {
        Payload::Sequence(sequence) => sequence
            .iter()
            .enumerate()
            .try_for_each(|(index, child)| check(format!("{name}[{index}]"), child)),
        Payload::Table(table) => table
            .iter()
            .try_for_each(|(key, child)| check(format!("{name}.{key}"), child)),
        _ => Ok(()),
    }
}

/// Bind `name` inside a table literal
fn map_insert(
    name: &str,
    modifier: Protection,
    mut value: ExtendedValue,
    table: &mut Table,
) -> Result<()> {
    set_protection(name, modifier, &mut value)?;

    if let Some(existing) = table.get(name) {
        if value.protection > existing.protection {
            return Err(Error::ProtectionViolation(format!(
                "Inserting name {name} would increase protection from {} to {}\n(previous definition on {})",
                existing.protection,
                value.protection,
                existing.pretty_src_info()
            )));
        }
        match existing.protection {
            Protection::None => {}
            Protection::ProtectIgnore => return Ok(()),
            Protection::ProtectError => {
                return Err(Error::ProtectionViolation(format!(
                    "\"{name}\" is protected on {}",
                    existing.pretty_src_info()
                )))
            }
        }
    }

    table.insert(name.to_string(), value);
    Ok(())
}

/// Erase `name` inside a table literal
fn map_erase(name: &str, table: &mut Table) -> Result<()> {
    let Some(existing) = table.get(name) else {
        return Ok(());
    };
    match existing.protection {
        Protection::None => {
            table.shift_remove(name);
            Ok(())
        }
        Protection::ProtectIgnore => Ok(()),
        Protection::ProtectError => Err(Error::ProtectionViolation(format!(
            "Unable to erase {name} due to protection."
        ))),
    }
}

struct Builder<'i> {
    included: &'i Included,
    table: IntermediateTable,
    in_prolog: bool,
    /// a value parsed on its own, nothing to look up
    standalone: bool,
}

impl Builder<'_> {
    fn locate(&self, pos: usize) -> Location {
        self.included.locate(pos)
    }

    fn src_info(&self, pos: usize) -> String {
        if self.standalone {
            String::new()
        } else {
            self.included.src_info(pos)
        }
    }

    fn wrap(&self, message: &str, pos: usize) -> impl FnOnce(Error) -> Error + '_ {
        let message = message.to_string();
        move |e| Error::parse_caused_by(message, self.locate(pos), e)
    }

    fn statement(&mut self, statement: &Statement) -> Result<()> {
        match statement {
            Statement::Assign {
                name,
                modifier,
                value,
                pos,
            } => {
                let mut value = self.value(value)?;
                let inserted = set_protection(name, *modifier, &mut value)
                    .and_then(|()| self.table.insert(name, value));
                inserted
                    .map(|_| ())
                    .map_err(|e| Error::parse_caused_by("Error in assignment:", self.locate(*pos), e))
            }
            Statement::Erase { name, pos } => self
                .table
                .erase(name, self.in_prolog)
                .map_err(|e| Error::parse_caused_by("Error in erase attempt:", self.locate(*pos), e)),
            Statement::Splice { name, pos } => {
                let incoming = self.table_lookup(name, *pos)?;
                let src_info = self.src_info(*pos);
                for (key, mut element) in incoming {
                    element.set_prolog(self.in_prolog);
                    element.set_src_info(src_info.clone());
                    self.table.insert(&key, element).map_err(|e| {
                        Error::parse_caused_by("Error in assignment:", self.locate(*pos), e)
                    })?;
                }
                Ok(())
            }
        }
    }

    fn value(&self, node: &ValueNode) -> Result<ExtendedValue> {
        let payload = match &node.kind {
            ValueKind::Nil => Payload::Nil,
            ValueKind::Bool(value) => Payload::Bool(*value),
            ValueKind::Number(number) => Payload::Number(number.clone()),
            ValueKind::Complex(re, im) => Payload::Complex(re.clone(), im.clone()),
            ValueKind::String(string) => Payload::String(string.clone()),
            ValueKind::Id(id) => Payload::TableId(id.clone()),
            ValueKind::LocalRef(name) => return self.local_lookup(name, node.pos),
            ValueKind::DbRef(_) => {
                return Err(Error::Unimplemented(format!(
                    "Database lookup error at {}\ndatabase lookup is not available",
                    self.locate(node.pos)
                )))
            }
            ValueKind::Sequence(items) => Payload::Sequence(self.sequence(items)?),
            ValueKind::Table(statements) => Payload::Table(self.table_literal(statements)?),
        };

        Ok(ExtendedValue::new(self.in_prolog, payload).with_src_info(self.src_info(node.pos)))
    }

    fn sequence(&self, items: &[SequenceItem]) -> Result<Sequence> {
        let mut sequence = Sequence::new();
        for item in items {
            match item {
                SequenceItem::Value(node) => {
                    let mut element = self.value(node)?;
                    element.reset_protection();
                    sequence.push(element);
                }
                SequenceItem::Splice { name, pos } => {
                    let incoming = self.sequence_lookup(name, *pos)?;
                    let src_info = self.src_info(*pos);
                    sequence.extend(incoming.into_iter().map(|mut element| {
                        element.reset_protection();
                        element.set_prolog(self.in_prolog);
                        element.set_src_info(src_info.clone());
                        element
                    }));
                }
            }
        }
        Ok(sequence)
    }

    fn table_literal(&self, statements: &[Statement]) -> Result<Table> {
        let mut table = Table::new();
        for statement in statements {
            match statement {
                Statement::Assign {
                    name,
                    modifier,
                    value,
                    pos,
                } => {
                    let value = self.value(value)?;
                    map_insert(name, *modifier, value, &mut table)
                        .map_err(self.wrap("Error in assignment:", *pos))?;
                }
                Statement::Erase { name, pos } => {
                    map_erase(name, &mut table).map_err(self.wrap("Error in erase attempt:", *pos))?;
                }
                Statement::Splice { name, pos } => {
                    let incoming = self.table_lookup(name, *pos)?;
                    let src_info = self.src_info(*pos);
                    for (key, element) in incoming {
                        self.splice_member(&key, element, &mut table, &src_info)
                            .map_err(self.wrap("Error in @table:: expansion:", *pos))?;
                    }
                }
            }
        }
        Ok(table)
    }

    /// Insert a member of a `@table::` expansion into a table literal
    fn splice_member(
        &self,
        key: &str,
        mut element: ExtendedValue,
        table: &mut Table,
        src_info: &str,
    ) -> Result<()> {
        if let Some(existing) = table.get(key) {
            if element.protection > existing.protection {
                return Err(Error::ProtectionViolation(format!(
                    "@table::{key}: inserting name {key} would increase protection from {} to {}\n(previous definition on {})",
                    existing.protection,
                    element.protection,
                    existing.pretty_src_info()
                )));
            }
            match existing.protection {
                Protection::None => {}
                Protection::ProtectIgnore => return Ok(()),
                Protection::ProtectError => {
                    return Err(Error::ProtectionViolation(format!(
                        "@table::{key}: inserting name {key} would violate protection on existing item\n(previous definition on {})",
                        existing.pretty_src_info()
                    )))
                }
            }
        }

        element.set_prolog(self.in_prolog);
        element.set_src_info(src_info);
        table.insert(key.to_string(), element);
        Ok(())
    }

    /// Copy of what is bound to `name`, as seen from `pos`
    fn local_lookup(&self, name: &str, pos: usize) -> Result<ExtendedValue> {
        if self.standalone {
            return Err(Error::parse(
                format!("can't resolve reference to \"{name}\" outside of a document"),
                self.locate(pos),
            ));
        }

        let mut result = self
            .table
            .find(name)
            .map_err(|e| Error::parse_caused_by("Local lookup error", self.locate(pos), e))?
            .clone();
        result.set_prolog(self.in_prolog);
        result.set_src_info(self.src_info(pos));
        result.reset_protection();
        Ok(result)
    }

    fn table_lookup(&self, name: &str, pos: usize) -> Result<Table> {
        match self.local_lookup(name, pos)?.payload {
            Payload::Table(table) => Ok(table),
            _ => Err(Error::parse_caused_by(
                "Error in @table:: expansion:",
                self.locate(pos),
                Error::type_mismatch(format!("key \"{name}\" does not refer to a table")),
            )),
        }
    }

    fn sequence_lookup(&self, name: &str, pos: usize) -> Result<Sequence> {
        match self.local_lookup(name, pos)?.payload {
            Payload::Sequence(sequence) => Ok(sequence),
            _ => Err(Error::parse_caused_by(
                "Error in @sequence:: expansion:",
                self.locate(pos),
                Error::type_mismatch(format!("key \"{name}\" does not refer to a sequence")),
            )),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::error::ErrorCategory;
    use crate::source::MemoryResolver;
    use pretty_assertions::assert_eq;

    fn protection_violation(doc: &str) -> bool {
        let error = parse_document(doc).unwrap_err();
        error.category() == ErrorCategory::ParseError
            && error.root_cause().category() == ErrorCategory::ProtectionViolation
    }

    fn x(doc: &str, key: &str) -> u64 {
        parse_document(doc).unwrap().get::<u64>(key).unwrap()
    }

    #[test]
    fn empty_document() {
        assert!(parse_document("").unwrap().is_empty());
        assert!(parse_document("  # just a comment\n").unwrap().is_empty());
    }

    #[test]
    fn nested_keys() {
        let tbl = parse_document("x.a: 1\nx.b: 2\n").unwrap();
        assert_eq!(tbl.get::<i32>("x.a").unwrap(), 1);
        assert_eq!(tbl.get::<String>("x.b").unwrap(), "2");
    }

    #[test]
    fn overrides() {
        let doc = "a: 1\nb: 2\na: 3\nc: 4\nb: 5\na: 6\nt: { a: 1 b: 2 a: 3 }\n";
        let tbl = parse_document(doc).unwrap();
        assert_eq!(tbl.get::<i32>("a").unwrap(), 6);
        assert_eq!(tbl.get::<i32>("b").unwrap(), 5);
        assert_eq!(tbl.get::<i32>("c").unwrap(), 4);
        assert_eq!(tbl.get::<i32>("t.a").unwrap(), 3);
        let names: Vec<_> = tbl.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(names, ["a", "b", "c", "t"]);
    }

    #[test]
    fn prolog_is_overridden_by_body() {
        let doc = "BEGIN_PROLOG\n  a: 1\n  t: { a: 11\n       b: 12\n     }\nEND_PROLOG\na: 2\nt.a: @local::t.b\n";
        let tbl = parse_document(doc).unwrap();
        assert_eq!(tbl.get::<i32>("a").unwrap(), 2);
        assert_eq!(tbl.get::<i32>("t.a").unwrap(), 12);
        assert!(!tbl.exists("t.b"));
        assert!(!tbl.find("a").unwrap().in_prolog);
    }

    #[test]
    fn contiguous_prologs() {
        let doc = "BEGIN_PROLOG\na: 1\nEND_PROLOG\nBEGIN_PROLOG\nc: 47\nEND_PROLOG\n";
        let tbl = parse_document(doc).unwrap();
        assert!(tbl.exists("c"));
        assert!(tbl.find("c").unwrap().in_prolog);
    }

    #[test]
    fn noncontiguous_prolog() {
        let doc = "BEGIN_PROLOG\na: 1\nEND_PROLOG\nd: 27\nBEGIN_PROLOG\nc: 47\nEND_PROLOG\n";
        let error = parse_document(doc).unwrap_err();
        assert_eq!(error.position(), Some((4, 1)));
        assert!(error
            .to_string()
            .contains("PROLOG blocks must be both contiguous and not nested."));
    }

    #[test]
    fn parse_error_positions() {
        let cases = [
            ("x: 26\na 36\n", (2, 1)),
            ("BEGIN_PROLOG\nx: 26\na: 36\nEND_PROLOG\ny: 26\nb 36\n", (6, 1)),
            ("BEGIN_PROLOG\nx: 26\na 36\nEND_PROLOG\n", (3, 1)),
        ];
        for (doc, position) in cases {
            let error = parse_document(doc).unwrap_err();
            assert_eq!(error.category(), ErrorCategory::ParseError, "{doc}");
            assert_eq!(error.position(), Some(position), "{doc}");
        }
    }

    #[test]
    fn nil_and_strings() {
        let doc = "a: @nil\nb: nil\nc: \"@nil\"\nd: \"nil\"\nt: { a: @nil b: nil }\n";
        let tbl = parse_document(doc).unwrap();
        assert!(tbl.find("a").unwrap().is_a(crate::extended_value::ValueTag::Nil));
        assert!(tbl.find("t.a").unwrap().is_a(crate::extended_value::ValueTag::Nil));
        assert!(tbl.get::<String>("a").is_err());
        assert_eq!(tbl.get::<String>("b").unwrap(), "nil");
        assert_eq!(tbl.get::<String>("c").unwrap(), "@nil");
        assert_eq!(tbl.get::<String>("d").unwrap(), "nil");
        assert_eq!(tbl.get::<String>("t.b").unwrap(), "nil");
    }

    #[test]
    fn erase_values() {
        let doc = "BEGIN_PROLOG\nx: 27\nz: 43\nz: @erase\nEND_PROLOG\na: 27\nb: { x: 7 y: 12 }\nc: { x: 7 y: 12 x: @erase }\na: @erase\nb.x: @erase\n";
        let tbl = parse_document(doc).unwrap();
        assert!(tbl.exists("x"));
        assert!(!tbl.exists("z"));
        assert!(!tbl.exists("a"));
        assert!(tbl.exists("b"));
        assert!(!tbl.exists("b.x"));
        assert!(tbl.exists("b.y"));
        assert!(!tbl.exists("c.x"));
        assert!(tbl.exists("c.y"));

        assert!(parse_document("x: 29\nx: @erase").unwrap().is_empty());
        assert!(parse_document("BEGIN_PROLOG\nx: 29\nx: @eraseEND_PROLOG\n")
            .unwrap()
            .is_empty());
    }

    #[test]
    fn erase_and_protection() {
        assert_eq!(x("x @protect_ignore: 29\nx: @erase", "x"), 29);
        assert!(protection_violation("x @protect_error: 29\nx: @erase"));
        assert!(parse_document("a: { b @protect_ignore: { x: 29 } }\na: @erase\n")
            .unwrap()
            .is_empty());
        assert_eq!(x("a: { b @protect_ignore: { x: 29 } }\na.b: @erase\n", "a.b.x"), 29);
        assert_eq!(x("a: { b @protect_ignore: { x: 29 } }\na.b.x: @erase\n", "a.b.x"), 29);
        assert_eq!(
            x("a: { b @protect_ignore: { c: { x: 29 } } }\na.b.c: @erase\n", "a.b.c.x"),
            29
        );
        assert!(protection_violation("a: { b @protect_error: { c: { x: 29 } } }\na.b.c: @erase\n"));
        assert!(protection_violation("a: { b @protect_error: { c: { x: 29 } } }\na.b: @erase\n"));
        assert!(parse_document("a: { b @protect_error: { x: 29 } }\na: @erase\n")
            .unwrap()
            .is_empty());
    }

    #[test]
    fn expand_tables() {
        let doc = "BEGIN_PROLOG\nfred: { bill: twelve charlie: 27 }\ny: { @table::fred bill: \"one dozen\" }\nEND_PROLOG\nx: { ethel: 14 bill: 12 @table::fred }\n@table::fred\ny: @local::y\n";
        let tbl = parse_document(doc).unwrap();
        assert!(tbl.exists("x.ethel"));
        assert!(tbl.exists("x.charlie"));
        assert!(tbl.exists("bill"));
        assert!(tbl.exists("charlie"));
        assert!(tbl.exists("y.charlie"));
        assert_eq!(tbl.get::<String>("x.bill").unwrap(), "twelve");
        assert_eq!(tbl.get::<String>("bill").unwrap(), "twelve");
        assert_eq!(tbl.get::<String>("y.bill").unwrap(), "one dozen");
    }

    #[test]
    fn expand_nested_tables() {
        let doc = "BEGIN_PROLOG\nA: { B: { x: foo } }\nEND_PROLOG\nmodules: {\n   A: {\n      @table::A\n      B:{ @table::A.B x:bar }\n   }\n}\n";
        let tbl = parse_document(doc).unwrap();
        assert_eq!(tbl.get::<String>("modules.A.B.x").unwrap(), "bar");
    }

    #[test]
    fn expand_sequences() {
        let doc = "BEGIN_PROLOG\nfred: [ three, four, five ]\nEND_PROLOG\nbill: [ one, two, @sequence::fred, six ]\ncharlie: @local::fred\nethel: [ @sequence::fred, six ]\n";
        let tbl = parse_document(doc).unwrap();
        assert_eq!(
            tbl.get::<Vec<String>>("bill").unwrap(),
            ["one", "two", "three", "four", "five", "six"]
        );
        assert_eq!(tbl.get::<Vec<String>>("charlie").unwrap().len(), 3);
        assert_eq!(
            tbl.get::<Vec<String>>("ethel").unwrap(),
            ["three", "four", "five", "six"]
        );
        assert!(!tbl.find("charlie").unwrap().in_prolog);
    }

    #[test]
    fn bad_references() {
        let lookup = parse_document("x: @local::dead\n").unwrap_err();
        assert_eq!(lookup.root_cause().category(), ErrorCategory::CantFind);
        assert_eq!(lookup.position(), Some((1, 4)));

        let table = parse_document("BEGIN_PROLOG\nbad: John\nEND_PROLOG\n@table::bad\n").unwrap_err();
        assert_eq!(table.root_cause().category(), ErrorCategory::TypeMismatch);

        let sequence =
            parse_document("BEGIN_PROLOG\nbad: John\nEND_PROLOG\nf: [ @sequence::bad ]\n").unwrap_err();
        assert_eq!(sequence.root_cause().category(), ErrorCategory::TypeMismatch);

        let db = parse_document("x: @db::anything\n").unwrap_err();
        assert_eq!(db.category(), ErrorCategory::Unimplemented);
    }

    #[test]
    fn string_escaping() {
        assert!(parse_document(r#"x: "$\d+^""#).is_err());
        assert!(parse_document(r#"x: "$\\d+^""#).is_ok());
        assert!(parse_document(r#"x: '$\d+^'"#).is_ok());
    }

    #[test]
    fn colon_spacing() {
        let prolog = "BEGIN_PROLOG\nt: { a: 7 b: 6}\ns: [ 7, 6, 7 ]\nEND_PROLOG\n";
        let references = [
            "t1: @local::t\n",
            "@table::t\n",
            "s2: [ 1, 2, @sequence::s ]\n",
            "a: @id::0001020304050607080910111213141516171819\n",
            "t1: { t2: @local::t }\n",
            "t1: { @table::t }\n",
            "t1: { s1: [ 1, 2, 3, @sequence::s ] }\n",
            "t1: { a: @id::0001020304050607080910111213141516171819 }\n",
        ];
        for reference in references {
            assert!(parse_document(&format!("{prolog}{reference}")).is_ok(), "{reference}");
            let colons = reference.find("::").unwrap();
            for at in [colons, colons + 2] {
                let mut bad = reference.to_string();
                bad.insert(at, ' ');
                assert!(parse_document(&format!("{prolog}{bad}")).is_err(), "{bad}");
            }
        }
    }

    #[test]
    fn protect_ignore() {
        assert_eq!(x("x @protect_ignore: 29\nx: 33\nx: 37\n", "x"), 29);
        assert_eq!(x("BEGIN_PROLOG\nx @protect_ignore: 29\nx: 33\nEND_PROLOG\nx: 37\n", "x"), 37);
        assert_eq!(
            x("BEGIN_PROLOG\nx @protect_ignore: 29\nEND_PROLOG\nx @protect_ignore: 33\nx: 37\n", "x"),
            33
        );
        assert_eq!(x("x @protect_ignore: 29\nx @protect_ignore: 33\n", "x"), 29);
        assert_eq!(x("a: { x @protect_ignore: 29 }\na.x: 33\na.x: 37\n", "a.x"), 29);
        assert_eq!(
            x("BEGIN_PROLOG\na: { x @protect_ignore: 29 } \nEND_PROLOG\na.x @protect_ignore: 33\na.x: 37\n", "a.x"),
            33
        );
        assert_eq!(x("a @protect_ignore: { x: 29 }\na.x: 33\na.x: 37\n", "a.x"), 29);
        assert_eq!(x("a: { b @protect_ignore: { x: 29 } }\na.b.x: 33\na.b.x: 37\n", "a.b.x"), 29);
        assert_eq!(
            x("BEGIN_PROLOG\na: { b @protect_ignore: { x: 29 } }\na.b.x: 33\nEND_PROLOG\na: { b @protect_ignore: { x: 37 } }\na.b.x: 41\n", "a.b.x"),
            37
        );
        assert_eq!(x("a: { b @protect_ignore: { x: 29 } }\na: { b @protect_ignore: { x: 33 } }\n", "a.b.x"), 33);
        assert!(protection_violation("a: { x: 29 }\na.x @protect_ignore: 33\n"));
        assert!(protection_violation("BEGIN_PROLOG\na: { x: 29 }\na.x @protect_ignore: 33\nEND_PROLOG\n"));
    }

    #[test]
    fn protect_ignore_prolog_replaced() {
        let tbl = parse_document(
            "BEGIN_PROLOG\na: { x @protect_ignore: 29 }\na.x: 33\nEND_PROLOG\na.x: 37\n",
        )
        .unwrap();
        assert_eq!(tbl.get::<u64>("a.x").unwrap(), 37);
        assert_eq!(tbl.find("a.x").unwrap().protection, Protection::None);
    }

    #[test]
    fn nested_items_keep_their_protection() {
        let tbl = parse_document("a @protect_ignore: { x: 29 }\na.x: 33").unwrap();
        assert_eq!(tbl.get::<u64>("a.x").unwrap(), 29);
        assert_eq!(tbl.find("a").unwrap().protection, Protection::ProtectIgnore);
        assert_eq!(tbl.find("a.x").unwrap().protection, Protection::None);

        assert!(protection_violation("a @protect_error: { x @protect_ignore: 1 }\n"));
    }

    #[test]
    fn protect_error() {
        assert!(protection_violation("BEGIN_PROLOG\nx @protect_error: 29\nx: 37\nEND_PROLOG\n"));
        assert_eq!(x("BEGIN_PROLOG\nx @protect_error: 29\nEND_PROLOG\nx: 33\n", "x"), 33);
        assert!(protection_violation(
            "BEGIN_PROLOG\nx @protect_error: 29\nEND_PROLOG\nx @protect_error: 33\nx: 37\n"
        ));
        assert!(protection_violation("BEGIN_PROLOG\nx @protect_ignore: 29\nx @protect_error: 33\nEND_PROLOG\n"));
        assert!(protection_violation("x @protect_ignore: 29\nx @protect_error: 33\n"));
        assert_eq!(x("a: { x @protect_error: 29 }\na: { x @protect_error: 33 }\n", "a.x"), 33);
        assert!(protection_violation("a: { x @protect_error: 29 }\na.x: 33\n"));
        assert!(protection_violation("BEGIN_PROLOG\na: { b: { x @protect_error: 29 } } \na.b.x: 33\nEND_PROLOG\n"));
        assert!(protection_violation("BEGIN_PROLOG\na: { b @protect_error: { x: 29 } }\na.b: { x: 33 }\nEND_PROLOG\n"));
        assert!(protection_violation("t: { x @protect_error: 1 x: 2 }\n"));
    }

    #[test]
    fn local_copies_are_unprotected() {
        let tbl = parse_document("a @protect_ignore: 42\nb: @local::a\n").unwrap();
        assert_eq!(tbl.find("b").unwrap().protection, Protection::None);

        assert_eq!(x("a @protect_error: 42\nb: 43\nb: @local::a\n", "b"), 42);
        assert_eq!(x("a @protect_ignore: 42\nb: @local::a\nb: @erase\nb: 43\n", "b"), 43);
        assert_eq!(x("a @protect_error: 42\nb: @local::a\nb: 43\n", "b"), 43);

        let prolog = "BEGIN_PROLOG\nx @protect_ignore: 27\na: { b: { x: @local::x } }\nEND_PROLOG\n";
        let tbl = parse_document(&format!("{prolog}a: @local::a\na.b.x: 29\n")).unwrap();
        assert_eq!(tbl.get::<u64>("a.b.x").unwrap(), 29);
        assert_eq!(tbl.find("a.b.x").unwrap().protection, Protection::None);

        assert!(protection_violation(&format!("{prolog}a @protect_error: @local::a\na.b.x: 29\n")));

        let tbl = parse_document(&format!("{prolog}a @protect_ignore: @local::a\na.b.x: 29\n")).unwrap();
        assert_eq!(tbl.get::<u64>("a.b.x").unwrap(), 27);
        assert_eq!(tbl.find("a").unwrap().protection, Protection::ProtectIgnore);
    }

    #[test]
    fn src_info_of_references() {
        let resolver = MemoryResolver::default()
            .with("main.fcl", "#include \"defs.fcl\"\n\nb: @local::a\n")
            .with("defs.fcl", "BEGIN_PROLOG\na: 1\nEND_PROLOG\n");
        let tbl = parse_document_file("main.fcl", &resolver).unwrap();
        assert_eq!(tbl.find("a").unwrap().src_info, "defs.fcl:2");
        assert_eq!(tbl.find("b").unwrap().src_info, "main.fcl:3");
    }

    #[test]
    fn values_on_their_own() {
        let value = parse_value_string("[1, { a: x }, 'q']").unwrap();
        assert_eq!(value.to_string(), "[1,{a:\"x\"},\"q\"]");
        assert!(value.src_info.is_empty());

        let (value, rest) = parse_value_prefix("12 more").unwrap();
        assert_eq!(value.to_string(), "12");
        assert_eq!(rest, "more");

        assert!(parse_value_string("12 more").is_err());
        assert!(parse_value_string("@local::a").is_err());
    }
}
