//! value grammar
use super::cursor::Cursor;
use super::statement::{self, Names};
use super::{Failure, Parsed, SequenceItem, ValueKind, ValueNode};
use crate::canonical;
use crate::id::ParameterSetId;

type Rule = for<'t> fn(&mut Cursor<'t>) -> Parsed<ValueKind>;

/// Tried in order, the first rule that matches wins
const RULES: [Rule; 11] = [
    nil, boolean, number, complex, string, local_ref, db_ref, id, sequence, table, catchall,
];

pub(super) fn value(cursor: &mut Cursor) -> Parsed<ValueNode> {
    cursor.skip_whitespace();
    let pos = cursor.offset();

    for rule in RULES {
        let mut attempt = *cursor;
        match rule(&mut attempt) {
            Ok(kind) => {
                *cursor = attempt;
                return Ok(ValueNode { pos, kind });
            }
            Err(Failure::Soft) => continue,
            Err(hard) => return Err(hard),
        }
    }
    Err(Failure::Soft)
}

/// Whether an atom may end here: end of text, a non-graphic character or `,`, `]`, `}`
fn at_atom_end(cursor: &Cursor) -> bool {
    match cursor.peek() {
        None => true,
        Some(c) => !c.is_ascii_graphic() || matches!(c, ',' | ']' | '}'),
    }
}

/// Like [at_atom_end], numbers may also be followed by `)`
fn at_number_end(cursor: &Cursor) -> bool {
    at_atom_end(cursor) || cursor.peek() == Some(')')
}

fn keyword(cursor: &mut Cursor, keyword: &str) -> bool {
    cursor.eat(keyword) && at_atom_end(cursor)
}

fn nil(cursor: &mut Cursor) -> Parsed<ValueKind> {
    if keyword(cursor, canonical::NIL_TOKEN) {
        Ok(ValueKind::Nil)
    } else {
        Err(Failure::Soft)
    }
}

fn boolean(cursor: &mut Cursor) -> Parsed<ValueKind> {
    for (word, value) in [("true", true), ("false", false)] {
        let mut attempt = *cursor;
        if keyword(&mut attempt, word) {
            *cursor = attempt;
            return Ok(ValueKind::Bool(value));
        }
    }
    Err(Failure::Soft)
}

/// Canonical form of a number token at the cursor
fn number_token(cursor: &mut Cursor) -> Option<String> {
    let mut attempt = *cursor;
    let token = attempt.take_while(|c| c.is_ascii_graphic() && !matches!(c, ',' | ']' | '}' | ')'));
    let canonical = canonical::canonical_number(token)
        .or_else(|| canonical::canonical_radix_number(token))?;
    if !at_number_end(&attempt) {
        return None;
    }
    *cursor = attempt;
    Some(canonical)
}

fn number(cursor: &mut Cursor) -> Parsed<ValueKind> {
    number_token(cursor)
        .map(ValueKind::Number)
        .ok_or(Failure::Soft)
}

fn expect_number(cursor: &mut Cursor) -> Parsed<String> {
    cursor.skip_whitespace();
    number_token(cursor).ok_or_else(|| Failure::hard(cursor.offset(), "expected a number"))
}

fn expect(cursor: &mut Cursor, literal: &str) -> Parsed<()> {
    cursor.skip_whitespace();
    if cursor.eat(literal) {
        Ok(())
    } else {
        Err(Failure::hard(
            cursor.offset(),
            format!("expected '{literal}'"),
        ))
    }
}

fn complex(cursor: &mut Cursor) -> Parsed<ValueKind> {
    if !cursor.eat("(") {
        return Err(Failure::Soft);
    }
    let re = expect_number(cursor)?;
    expect(cursor, ",")?;
    let im = expect_number(cursor)?;
    expect(cursor, ")")?;
    Ok(ValueKind::Complex(re, im))
}

/// Quoted token including its quotes, escapes are skipped but not validated
fn quoted<'t>(cursor: &mut Cursor<'t>, quote: char) -> Option<&'t str> {
    let rest = cursor.rest();
    if !rest.starts_with(quote) {
        return None;
    }

    let mut escaped = false;
    for (index, c) in rest.char_indices().skip(1) {
        if escaped {
            escaped = false;
        } else if c == '\\' && quote == '"' {
            escaped = true;
        } else if c == quote {
            let token = &rest[..index + 1];
            cursor.eat(token);
            return Some(token);
        }
    }
    None
}

fn string(cursor: &mut Cursor) -> Parsed<ValueKind> {
    let pos = cursor.offset();

    let token = match cursor.peek() {
        Some('\'') => quoted(cursor, '\''),
        Some('"') => quoted(cursor, '"'),
        // a name, or a word starting with a digit that is not a number
        Some(c) if super::cursor::is_name_char(c) => {
            Some(cursor.take_while(super::cursor::is_name_char))
        }
        _ => None,
    };

    let Some(token) = token.filter(|_| at_atom_end(cursor)) else {
        return Err(Failure::Soft);
    };

    canonical::canonical_string(token)
        .map(ValueKind::String)
        .ok_or_else(|| {
            Failure::hard(
                pos,
                format!(
                    "The string {token} is not representable as a canonical string.\n\
                     It is likely you have an unescaped (or incorrectly escaped) character."
                ),
            )
        })
}

/// Name after `@local::` and friends, no whitespace allowed after the `::`
pub(super) fn reference_name(cursor: &mut Cursor, after: &str) -> Parsed<String> {
    match statement::qualname_noskip(cursor) {
        Err(Failure::Soft) => Err(Failure::hard(
            cursor.offset(),
            format!("expected a name after {after}"),
        )),
        parsed => parsed,
    }
}

fn local_ref(cursor: &mut Cursor) -> Parsed<ValueKind> {
    if !cursor.eat("@local::") {
        return Err(Failure::Soft);
    }
    reference_name(cursor, "@local::").map(ValueKind::LocalRef)
}

fn db_ref(cursor: &mut Cursor) -> Parsed<ValueKind> {
    if !cursor.eat("@db::") {
        return Err(Failure::Soft);
    }
    reference_name(cursor, "@db::").map(ValueKind::DbRef)
}

fn id(cursor: &mut Cursor) -> Parsed<ValueKind> {
    if !cursor.eat("@id::") {
        return Err(Failure::Soft);
    }
    let pos = cursor.offset();
    let digits = cursor.take_while(|c| c.is_ascii_hexdigit());
    if !ParameterSetId::is_valid_str(digits) || !at_atom_end(cursor) {
        return Err(Failure::hard(
            pos,
            format!(
                "expected a parameter set id of {} hex digits after @id::",
                ParameterSetId::STR_LEN
            ),
        ));
    }
    Ok(ValueKind::Id(digits.to_ascii_lowercase()))
}

const SEQUENCE_SPLICE: &str = "@sequence::";

fn sequence_item(cursor: &mut Cursor) -> Parsed<SequenceItem> {
    cursor.skip_whitespace();
    let pos = cursor.offset();
    if cursor.eat(SEQUENCE_SPLICE) {
        let name = reference_name(cursor, SEQUENCE_SPLICE)?;
        return Ok(SequenceItem::Splice { name, pos });
    }

    match value(cursor) {
        Ok(node) => Ok(SequenceItem::Value(node)),
        Err(Failure::Soft) => Err(Failure::hard(pos, "expected a sequence element")),
        Err(hard) => Err(hard),
    }
}

fn sequence(cursor: &mut Cursor) -> Parsed<ValueKind> {
    if !cursor.eat("[") {
        return Err(Failure::Soft);
    }

    let mut items = Vec::new();
    cursor.skip_whitespace();
    if cursor.eat("]") {
        return Ok(ValueKind::Sequence(items));
    }

    loop {
        items.push(sequence_item(cursor)?);

        cursor.skip_whitespace();
        if cursor.eat("]") {
            break;
        }
        if !cursor.eat(",") {
            return Err(Failure::hard(cursor.offset(), "expected ',' or ']'"));
        }
        // trailing comma
        cursor.skip_whitespace();
        if cursor.eat("]") {
            break;
        }
    }

    Ok(ValueKind::Sequence(items))
}

fn table(cursor: &mut Cursor) -> Parsed<ValueKind> {
    if !cursor.eat("{") {
        return Err(Failure::Soft);
    }

    let mut statements = Vec::new();
    loop {
        cursor.skip_whitespace();
        if cursor.eat("}") {
            break;
        }
        match statement::statement(cursor, Names::Simple) {
            Ok(statement) => statements.push(statement),
            Err(Failure::Soft) => {
                return Err(Failure::hard(cursor.offset(), "expected a binding or '}'"))
            }
            Err(hard) => return Err(hard),
        }
    }

    Ok(ValueKind::Table(statements))
}

/// Any other word, up to whitespace or a delimiter
fn catchall(cursor: &mut Cursor) -> Parsed<ValueKind> {
    if matches!(cursor.peek(), None | Some('@' | '"' | '\'')) {
        return Err(Failure::Soft);
    }
    let token = cursor.take_while(|c| !c.is_whitespace() && !matches!(c, ',' | '[' | ']' | '{' | '}'));
    if token.is_empty() {
        return Err(Failure::Soft);
    }
    Ok(ValueKind::String(canonical::quote(token)))
}
