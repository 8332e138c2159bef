//! bindings and names
use super::cursor::Cursor;
use super::value::{reference_name, value};
use super::{Failure, Parsed, Statement};
use crate::extended_value::Protection;

/// Which names a binding may have
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Names {
    /// `a.b[1]`, document level
    Qualified,
    /// `a`, inside table literals
    Simple,
}

const TABLE_SPLICE: &str = "@table::";
const ERASE: &str = "@erase";

/// `name modifier: value`, `name: @erase` or `@table::name`
///
/// On a soft failure the cursor is left untouched.
pub(super) fn statement(cursor: &mut Cursor, names: Names) -> Parsed<Statement> {
    let mut attempt = *cursor;
    let statement = binding(&mut attempt, names)?;
    *cursor = attempt;
    Ok(statement)
}

fn binding(cursor: &mut Cursor, names: Names) -> Parsed<Statement> {
    cursor.skip_whitespace();
    let pos = cursor.offset();

    if cursor.eat(TABLE_SPLICE) {
        let name = reference_name(cursor, TABLE_SPLICE)?;
        return Ok(Statement::Splice { name, pos });
    }

    let name = match names {
        Names::Qualified => qualname(cursor)?,
        Names::Simple => cursor.name().ok_or(Failure::Soft)?.to_string(),
    };

    cursor.skip_whitespace();
    let modifier = if cursor.eat("@protect_ignore") {
        Protection::ProtectIgnore
    } else if cursor.eat("@protect_error") {
        Protection::ProtectError
    } else {
        Protection::None
    };

    cursor.skip_whitespace();
    if !cursor.eat(":") {
        return Err(Failure::Soft);
    }

    let after_colon = *cursor;
    match value(cursor) {
        Ok(value) => Ok(Statement::Assign {
            name,
            modifier,
            value,
            pos,
        }),
        // there is no erase with a modifier
        Err(Failure::Soft) if modifier != Protection::None => Err(Failure::Soft),
        Err(Failure::Soft) => {
            *cursor = after_colon;
            cursor.skip_whitespace();
            if cursor.eat(ERASE) {
                Ok(Statement::Erase { name, pos })
            } else {
                Err(Failure::hard(cursor.offset(), "expected a value or @erase"))
            }
        }
        Err(hard) => Err(hard),
    }
}

/// `name ("." name | "[" uint "]")*`, whitespace is allowed around the delimiters
///
/// Soft failure when there is no name at the cursor. The result is the normalized key, e.g.
/// `a.b[1]`.
pub(super) fn qualname_noskip(cursor: &mut Cursor) -> Parsed<String> {
    let mut key = cursor.name().ok_or(Failure::Soft)?.to_string();

    loop {
        let mut attempt = *cursor;
        attempt.skip_whitespace();

        if attempt.eat(".") {
            attempt.skip_whitespace();
            let name = attempt
                .name()
                .ok_or_else(|| Failure::hard(attempt.offset(), "expected a name after '.'"))?;
            key.push('.');
            key.push_str(name);
        } else if attempt.eat("[") {
            attempt.skip_whitespace();
            let digits = attempt.take_while(|c| c.is_ascii_digit());
            if digits.is_empty() {
                return Err(Failure::hard(attempt.offset(), "expected an index after '['"));
            }
            let index: usize = digits
                .parse()
                .map_err(|_| Failure::hard(attempt.offset(), "index out of range"))?;
            attempt.skip_whitespace();
            if !attempt.eat("]") {
                return Err(Failure::hard(attempt.offset(), "expected ']'"));
            }
            key.push_str(&format!("[{index}]"));
        } else {
            return Ok(key);
        }

        *cursor = attempt;
    }
}

/// [qualname_noskip] after skipping whitespace
pub(super) fn qualname(cursor: &mut Cursor) -> Parsed<String> {
    cursor.skip_whitespace();
    qualname_noskip(cursor)
}
