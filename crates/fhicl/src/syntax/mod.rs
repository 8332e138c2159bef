//! context-free FHiCL grammar
//!
//! Parsing happens in two phases. This module is the first one: it turns text into a plain
//! [Document] tree without looking anything up. Atoms are canonicalized here already, references
//! (`@local::`, `@table::`, `@sequence::`, `@db::`) are kept as names. The semantic pass in
//! [crate::document] resolves references, applies prolog and protection rules and builds the
//! [IntermediateTable](crate::IntermediateTable).
//!
//! ```text
//! document   := prolog* binding*
//! prolog     := "BEGIN_PROLOG" binding* "END_PROLOG"
//! binding    := qualname mod? ":" value
//!             | qualname ":" "@erase"
//!             | "@table::" qualname
//! mod        := "@protect_ignore" | "@protect_error"
//! value      := nil | bool | number | complex | string
//!             | "@local::" qualname | "@db::" qualname | "@id::" hexid
//!             | sequence | table | catchall
//! sequence   := "[" (item ("," item)* ","?)? "]"
//! item       := value | "@sequence::" qualname
//! table      := "{" binding* "}"          (names only, no dotted keys)
//! qualname   := name ("." name | "[" uint "]")*
//! ```
//!
//! Positions are byte offsets into the parsed text.
mod cursor;
mod statement;
mod value;

use crate::extended_value::Protection;
use cursor::Cursor;

#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub prologs: Vec<Prolog>,
    pub body: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Prolog {
    pub statements: Vec<Statement>,
    /// offset of `BEGIN_PROLOG`
    pub pos: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// `name modifier: value`
    Assign {
        name: String,
        modifier: Protection,
        value: ValueNode,
        pos: usize,
    },
    /// `name: @erase`
    Erase { name: String, pos: usize },
    /// `@table::name`
    Splice { name: String, pos: usize },
}

impl Statement {
    pub fn pos(&self) -> usize {
        match self {
            Statement::Assign { pos, .. }
            | Statement::Erase { pos, .. }
            | Statement::Splice { pos, .. } => *pos,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValueNode {
    pub pos: usize,
    pub kind: ValueKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ValueKind {
    Nil,
    Bool(bool),
    /// canonical number
    Number(String),
    /// canonical numbers
    Complex(String, String),
    /// canonical (quoted) string
    String(String),
    /// lowercase hex id
    Id(String),
    LocalRef(String),
    DbRef(String),
    Sequence(Vec<SequenceItem>),
    Table(Vec<Statement>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum SequenceItem {
    Value(ValueNode),
    /// `@sequence::name`
    Splice { name: String, pos: usize },
}

/// Text that does not follow the grammar
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxError {
    pub offset: usize,
    pub message: String,
}

impl SyntaxError {
    fn new(offset: usize, message: impl Into<String>) -> Self {
        Self {
            offset,
            message: message.into(),
        }
    }
}

/// Why a rule did not match
#[derive(Debug)]
enum Failure {
    /// the rule does not apply here, try something else
    Soft,
    /// the rule applies but the text is malformed, give up
    Hard(SyntaxError),
}

impl Failure {
    fn hard(offset: usize, message: impl Into<String>) -> Self {
        Failure::Hard(SyntaxError::new(offset, message))
    }
}

type Parsed<T> = Result<T, Failure>;

const BEGIN_PROLOG: &str = "BEGIN_PROLOG";
const END_PROLOG: &str = "END_PROLOG";

/// Parse a whole document
#[tracing::instrument(level = "trace", skip_all)]
pub fn parse_document(text: &str) -> Result<Document, SyntaxError> {
    let mut cursor = Cursor::new(text);

    let mut prologs = Vec::new();
    loop {
        cursor.skip_whitespace();
        let pos = cursor.offset();
        if !cursor.eat_keyword(BEGIN_PROLOG) {
            break;
        }

        let mut statements = Vec::new();
        loop {
            cursor.skip_whitespace();
            if cursor.eat_keyword(END_PROLOG) {
                break;
            }
            match statement::statement(&mut cursor, statement::Names::Qualified) {
                Ok(statement) => statements.push(statement),
                Err(Failure::Soft) => {
                    return Err(SyntaxError::new(
                        cursor.offset(),
                        "expected a binding or END_PROLOG",
                    ))
                }
                Err(Failure::Hard(e)) => return Err(e),
            }
        }
        prologs.push(Prolog { statements, pos });
    }

    let mut body = Vec::new();
    loop {
        cursor.skip_whitespace();
        if cursor.is_at_end() {
            break;
        }
        match statement::statement(&mut cursor, statement::Names::Qualified) {
            Ok(statement) => body.push(statement),
            Err(Failure::Soft) => {
                let mut message = String::from("expected a binding");
                if cursor.rest().starts_with(BEGIN_PROLOG) {
                    message.push_str("\nPROLOG blocks must be both contiguous and not nested.");
                }
                return Err(SyntaxError::new(cursor.offset(), message));
            }
            Err(Failure::Hard(e)) => return Err(e),
        }
    }

    Ok(Document { prologs, body })
}

/// Parse one value at the start of `text`
///
/// Returns the value and the offset of the first character after it (trailing whitespace and
/// comments skipped).
pub fn parse_value(text: &str) -> Result<(ValueNode, usize), SyntaxError> {
    let mut cursor = Cursor::new(text);
    match value::value(&mut cursor) {
        Ok(node) => {
            cursor.skip_whitespace();
            Ok((node, cursor.offset()))
        }
        Err(Failure::Soft) => Err(SyntaxError::new(cursor.offset(), "expected a value")),
        Err(Failure::Hard(e)) => Err(e),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    fn number(pos: usize, n: &str) -> ValueNode {
        ValueNode {
            pos,
            kind: ValueKind::Number(n.into()),
        }
    }

    #[test]
    fn prologs_then_body() {
        let document = parse_document(
            "BEGIN_PROLOG\na: 1\nEND_PROLOG\nBEGIN_PROLOG\nEND_PROLOG\nb @protect_error: 2\n",
        )
        .unwrap();

        assert_eq!(document.prologs.len(), 2);
        assert_eq!(
            document.prologs[0].statements,
            vec![Statement::Assign {
                name: "a".into(),
                modifier: Protection::None,
                value: number(16, "1"),
                pos: 13,
            }]
        );
        assert!(document.prologs[1].statements.is_empty());
        assert_eq!(
            document.body,
            vec![Statement::Assign {
                name: "b".into(),
                modifier: Protection::ProtectError,
                value: number(71, "2"),
                pos: 53,
            }]
        );
    }

    #[test]
    fn erase_and_splice() {
        let document = parse_document("x: @erase\n@table::t.u[2]\n").unwrap();
        assert_eq!(
            document.body,
            vec![
                Statement::Erase {
                    name: "x".into(),
                    pos: 0
                },
                Statement::Splice {
                    name: "t.u[2]".into(),
                    pos: 10
                },
            ]
        );
    }

    #[test]
    fn erase_may_touch_end_prolog() {
        let document = parse_document("BEGIN_PROLOG\nx: 29\nx: @eraseEND_PROLOG\n").unwrap();
        assert_eq!(document.prologs[0].statements.len(), 2);
    }

    #[test]
    fn qualified_names_allow_spacing() {
        let document = parse_document("a . b [ 01 ] .c: 1").unwrap();
        let Statement::Assign { name, .. } = &document.body[0] else {
            panic!("expected an assignment");
        };
        assert_eq!(name, "a.b[1].c");
    }

    #[test]
    fn error_at_failed_statement() {
        let error = parse_document("x: 26\na 36\n").unwrap_err();
        assert_eq!(error.offset, 6);
        assert_eq!(error.message, "expected a binding");
    }

    #[test]
    fn misplaced_prolog_hint() {
        let error = parse_document("d: 27\nBEGIN_PROLOG\nc: 47\nEND_PROLOG\n").unwrap_err();
        assert_eq!(error.offset, 6);
        assert!(error.message.contains("PROLOG blocks must be both contiguous and not nested."));
    }

    #[test]
    fn unterminated_prolog() {
        let error = parse_document("BEGIN_PROLOG\nx: 26\na 36\nEND_PROLOG\n").unwrap_err();
        assert_eq!(error.offset, 19);
    }

    #[test]
    fn dotted_names_are_not_allowed_in_tables() {
        assert!(parse_document("{ x.a: 1\n  x.b: 2\n}\n").is_err());
        assert!(parse_document("t: { x.a: 1 }").is_err());
    }

    #[test]
    fn standalone_value() {
        let (node, end) = parse_value(" [1, 2] # done\n rest").unwrap();
        assert_eq!(end, 16);
        assert!(matches!(node.kind, ValueKind::Sequence(ref items) if items.len() == 2));
        assert!(parse_value("").is_err());
    }
}
