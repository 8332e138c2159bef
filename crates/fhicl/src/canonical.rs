//! canonical atom encodings
//!
//! Atoms are stored as strings. Two atoms that denote the same value must be spelled the same
//! way, otherwise content ids would differ for equal configurations. The functions here produce
//! that single spelling.
//!
//! | kind    | written               | canonical                        |
//! |---------|-----------------------|----------------------------------|
//! | nil     | `@nil`                | 9 NUL bytes ([NIL])              |
//! | number  | `005`, `+1.50e1`      | `5`, `15`                        |
//! | number  | `0xF`, `0b101`        | `15`, `5`                        |
//! | number  | `infinity`            | `+infinity`                      |
//! | string  | `abc`, `'abc'`        | `"abc"`                          |
//! | complex | `( 1.0 , 2 )`         | `(1,2)`                          |

/// Stored form of the nil value
pub const NIL: &str = "\0\0\0\0\0\0\0\0\0";

/// Printed form of the nil value
pub const NIL_TOKEN: &str = "@nil";

pub fn is_nil(atom: &str) -> bool {
    atom == NIL
}

/// Largest decimal exponent still printed as a plain integer
const MAX_INTEGER_EXPONENT: i64 = 19;
/// Smallest decimal exponent still printed in positional notation
const MIN_POSITIONAL_EXPONENT: i64 = -5;

/// Canonical decimal spelling of a number literal
///
/// Accepts `[+-]? digits [. digits]? ([eE] [+-]? digits)?` (at least one digit in the mantissa)
/// and the infinity spellings. Returns `None` for anything else.
pub fn canonical_number(text: &str) -> Option<String> {
    let (negative, unsigned) = match text.as_bytes().first()? {
        b'+' => (false, &text[1..]),
        b'-' => (true, &text[1..]),
        _ => (false, text),
    };

    if unsigned == "infinity" {
        return Some(if negative { "-infinity" } else { "+infinity" }.to_string());
    }

    let (mantissa, exponent) = match unsigned.find(['e', 'E']) {
        Some(at) => (&unsigned[..at], parse_exponent(&unsigned[at + 1..])?),
        None => (unsigned, Some(0)),
    };

    let (whole, fraction) = match mantissa.find('.') {
        Some(at) => (&mantissa[..at], &mantissa[at + 1..]),
        None => (mantissa, ""),
    };

    if whole.is_empty() && fraction.is_empty() {
        return None;
    }
    if !whole.bytes().chain(fraction.bytes()).all(|b| b.is_ascii_digit()) {
        return None;
    }

    let digits: String = whole.chars().chain(fraction.chars()).collect();
    let sign = if negative { "-" } else { "" };
    match exponent.and_then(|exponent| positional(digits, whole.len(), exponent)) {
        Some(body) if body == "0" => Some(body),
        Some(body) => Some(format!("{sign}{body}")),
        // the decimal point is out of i64 range, the value saturates
        None => canonical_float(text.parse().ok()?),
    }
}

/// Unsigned canonical spelling of `digits` with the decimal point after `whole` digits, shifted
/// by `exponent`
///
/// Returns `None` when the position of the point does not fit an `i64`.
fn positional(mut digits: String, whole: usize, exponent: i64) -> Option<String> {
    let leading_zeros = digits.len() - digits.trim_start_matches('0').len();
    digits.drain(..leading_zeros);
    let significant = digits.trim_end_matches('0').len();
    digits.truncate(significant);

    if digits.is_empty() {
        return Some("0".to_string());
    }

    let point = i64::try_from(whole)
        .ok()?
        .checked_add(exponent)?
        .checked_sub(i64::try_from(leading_zeros).ok()?)?;
    let magnitude = point.checked_sub(1)?;
    let length = i64::try_from(digits.len()).ok()?;
    let integral = length <= point;

    let body = if integral && magnitude <= MAX_INTEGER_EXPONENT {
        let padding = (point - length) as usize;
        format!("{digits}{}", "0".repeat(padding))
    } else if !integral && (MIN_POSITIONAL_EXPONENT..=MAX_INTEGER_EXPONENT).contains(&magnitude) {
        if point <= 0 {
            format!("0.{}{digits}", "0".repeat((-point) as usize))
        } else {
            let (int_part, frac_part) = digits.split_at(point as usize);
            format!("{int_part}.{frac_part}")
        }
    } else {
        let (first, rest) = digits.split_at(1);
        if rest.is_empty() {
            format!("{first}e{magnitude}")
        } else {
            format!("{first}.{rest}e{magnitude}")
        }
    };

    Some(body)
}

/// Exponent of a number literal, `Some(None)` when it does not fit an `i64`
fn parse_exponent(text: &str) -> Option<Option<i64>> {
    let digits = text.strip_prefix(['+', '-']).unwrap_or(text);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(text.parse().ok())
}

/// Canonical spelling of a hexadecimal (`0x`) or binary (`0b`) literal
pub fn canonical_radix_number(text: &str) -> Option<String> {
    let (radix, digits) = match text.get(..2)? {
        "0x" | "0X" => (16, &text[2..]),
        "0b" | "0B" => (2, &text[2..]),
        _ => return None,
    };

    if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
        return None;
    }

    match u128::from_str_radix(digits, radix) {
        Ok(value) => canonical_number(&value.to_string()),
        Err(_) => {
            // wider than 128 bits, approximate
            let mut value = 0f64;
            for c in digits.chars() {
                value = value * radix as f64 + c.to_digit(radix)? as f64;
            }
            canonical_float(value)
        }
    }
}

/// Canonical spelling of a floating point value
pub fn canonical_float(value: f64) -> Option<String> {
    if value.is_nan() {
        return None;
    }
    if value.is_infinite() {
        return Some(if value > 0.0 { "+infinity" } else { "-infinity" }.to_string());
    }
    canonical_number(&format!("{value:e}"))
}

/// Escape and double-quote a string
pub fn quote(raw: &str) -> String {
    let mut result = String::with_capacity(raw.len() + 2);
    result.push('"');
    for c in raw.chars() {
        match c {
            '"' => result.push_str("\\\""),
            '\\' => result.push_str("\\\\"),
            '\n' => result.push_str("\\n"),
            '\t' => result.push_str("\\t"),
            c => result.push(c),
        }
    }
    result.push('"');
    result
}

/// Resolve the escapes of double-quoted string content
///
/// Returns `None` on an unknown or dangling escape.
pub fn unescape(content: &str) -> Option<String> {
    let mut result = String::with_capacity(content.len());
    let mut chars = content.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            result.push(c);
            continue;
        }
        match chars.next()? {
            '"' => result.push('"'),
            '\'' => result.push('\''),
            '\\' => result.push('\\'),
            'n' => result.push('\n'),
            't' => result.push('\t'),
            _ => return None,
        }
    }
    Some(result)
}

/// Canonical spelling of a string token as written in a document
///
/// Double-quoted tokens have their escapes resolved, single-quoted tokens are taken verbatim,
/// anything else is an unquoted word.
pub fn canonical_string(token: &str) -> Option<String> {
    if let Some(content) = strip_quotes(token, '"') {
        return unescape(content).map(|raw| quote(&raw));
    }
    if let Some(content) = strip_quotes(token, '\'') {
        return Some(quote(content));
    }
    Some(quote(token))
}

fn strip_quotes(token: &str, quote: char) -> Option<&str> {
    if token.len() >= 2 && token.starts_with(quote) && token.ends_with(quote) {
        Some(&token[1..token.len() - 1])
    } else {
        None
    }
}

/// Raw text of an atom: quoted atoms are unescaped, everything else is returned as-is
pub fn atom_text(atom: &str) -> Option<String> {
    match strip_quotes(atom, '"') {
        Some(content) => unescape(content),
        None => Some(atom.to_string()),
    }
}

/// Canonical spelling of a complex pair
pub fn canonical_complex(re: &str, im: &str) -> String {
    format!("({re},{im})")
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn numbers() {
        let cases = [
            ("5", "5"),
            ("005", "5"),
            ("-0", "0"),
            ("+12", "12"),
            ("1.50", "1.5"),
            ("1.5e1", "15"),
            ("-1.5E-1", "-0.15"),
            ("234.6", "234.6"),
            ("0.000012", "0.000012"),
            ("0.0000012", "1.2e-6"),
            ("18446744073709551615", "18446744073709551615"),
            ("100000000000000000000", "1e20"),
            ("1e300", "1e300"),
            (".5", "0.5"),
            ("3.", "3"),
        ];

        for (written, canonical) in cases {
            assert_eq!(
                canonical_number(written).as_deref(),
                Some(canonical),
                "{written}"
            );
        }
    }

    #[test]
    fn extreme_exponents_saturate() {
        let cases = [
            ("1e9223372036854775807", "+infinity"),
            ("-1e9223372036854775807", "-infinity"),
            ("1e99999999999999999999", "+infinity"),
            ("0.1e-9223372036854775808", "0"),
            ("-5e-99999999999999999999", "0"),
            ("-5e-9223372036854775808", "-5e-9223372036854775808"),
            ("0e9223372036854775807", "0"),
            ("10e9223372036854775806", "+infinity"),
        ];

        for (written, canonical) in cases {
            assert_eq!(
                canonical_number(written).as_deref(),
                Some(canonical),
                "{written}"
            );
        }
    }

    #[test]
    fn not_numbers() {
        for text in ["", ".", "1.2.3", "e5", "1e", "abc", "1x", "--1"] {
            assert_eq!(canonical_number(text), None, "{text}");
        }
    }

    #[test]
    fn infinities() {
        assert_eq!(canonical_number("infinity").unwrap(), "+infinity");
        assert_eq!(canonical_number("-infinity").unwrap(), "-infinity");
        assert_eq!(canonical_float(f64::NEG_INFINITY).unwrap(), "-infinity");
    }

    #[test]
    fn radix_numbers() {
        assert_eq!(canonical_radix_number("0xF").unwrap(), "15");
        assert_eq!(canonical_radix_number("0X1000").unwrap(), "4096");
        assert_eq!(canonical_radix_number("0b01010101").unwrap(), "85");
        assert_eq!(
            canonical_radix_number("0xabcdefabcdefabcdef").unwrap(),
            "3.169232504802520059375e21"
        );
        assert_eq!(canonical_radix_number("0x"), None);
        assert_eq!(canonical_radix_number("0b012"), None);
        assert_eq!(canonical_radix_number("0x+5"), None);
        assert_eq!(canonical_radix_number("0b-1"), None);
    }

    #[test]
    fn floats() {
        assert_eq!(canonical_float(234.6).unwrap(), "234.6");
        assert_eq!(canonical_float(0.1).unwrap(), "0.1");
        assert_eq!(canonical_float(2.0).unwrap(), "2");
        assert_eq!(canonical_float(-1.25e-9).unwrap(), "-1.25e-9");
        assert_eq!(canonical_float(f64::NAN), None);
    }

    #[test]
    fn strings() {
        assert_eq!(canonical_string("abc").unwrap(), "\"abc\"");
        assert_eq!(canonical_string("'a\\d'").unwrap(), "\"a\\\\d\"");
        assert_eq!(canonical_string("\"a\\\"b\"").unwrap(), "\"a\\\"b\"");
        assert_eq!(canonical_string("\"a\\db\""), None);
        assert_eq!(atom_text("\"a\\nb\"").unwrap(), "a\nb");
        assert_eq!(atom_text("32").unwrap(), "32");
    }
}
