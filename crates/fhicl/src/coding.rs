//! conversion between native values and [Value]s
//!
//! [Encode] turns a native value into its type-erased form, [Decode] goes the other way. Decoding
//! is strict: a value that does not fit the target type (a fractional number into an integer,
//! an out of range integer, a sequence of the wrong length, ...) is a `type_mismatch` error and
//! never silently truncated.
//!
//! Integers and floats are decoded through the widest native type (`i128`/`u128`, `f64`) and then
//! narrowed with a checked conversion.
//!
//! A sequence target also accepts a string atom whose text is itself a sequence literal, e.g.
//! the string `"[1, 2]"` decodes as `Vec<u32>`.
//!
//! Types without an implementation of their own can go through [Lexical], which uses
//! [Display](std::fmt::Display) and [FromStr](std::str::FromStr).
use crate::canonical;
use crate::error::{Error, Result};
use crate::extended_value::{ExtendedValue, Payload};
use crate::id::ParameterSetId;
use crate::registry::ParameterSetRegistry;
use crate::value::Value;
use crate::ParameterSet;
use num_complex::Complex;

pub trait Encode {
    fn encode(&self) -> Result<Value>;
}

pub trait Decode: Sized {
    fn decode(value: &Value) -> Result<Self>;
}

/// The nil value
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Nil;

/// Encode via [Display](std::fmt::Display), decode via [FromStr](std::str::FromStr)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Lexical<T>(pub T);

fn expect_atom<'v>(value: &'v Value, target: &str) -> Result<&'v str> {
    match value {
        Value::Atom(atom) => Ok(atom),
        other => Err(Error::type_mismatch(format!(
            "can't convert a {} to {target}",
            other.kind()
        ))),
    }
}

fn expect_non_nil_atom<'v>(value: &'v Value, target: &str) -> Result<&'v str> {
    let atom = expect_atom(value, target)?;
    if canonical::is_nil(atom) {
        return Err(Error::type_mismatch(format!("can't convert nil to {target}")));
    }
    Ok(atom)
}

impl<T: Encode + ?Sized> Encode for &T {
    fn encode(&self) -> Result<Value> {
        (**self).encode()
    }
}

impl Encode for Value {
    fn encode(&self) -> Result<Value> {
        Ok(self.clone())
    }
}

impl Decode for Value {
    fn decode(value: &Value) -> Result<Self> {
        Ok(value.clone())
    }
}

impl Encode for Nil {
    fn encode(&self) -> Result<Value> {
        Ok(Value::nil())
    }
}

impl Decode for Nil {
    fn decode(value: &Value) -> Result<Self> {
        if value.is_nil() {
            Ok(Nil)
        } else {
            Err(Error::type_mismatch(format!("{value} is not nil")))
        }
    }
}

impl<T: Encode> Encode for Option<T> {
    fn encode(&self) -> Result<Value> {
        match self {
            Some(value) => value.encode(),
            None => Ok(Value::nil()),
        }
    }
}

/// nil decodes as `None`
impl<T: Decode> Decode for Option<T> {
    fn decode(value: &Value) -> Result<Self> {
        if value.is_nil() {
            Ok(None)
        } else {
            T::decode(value).map(Some)
        }
    }
}

impl Encode for str {
    fn encode(&self) -> Result<Value> {
        Ok(Value::Atom(canonical::quote(self)))
    }
}

impl Encode for String {
    fn encode(&self) -> Result<Value> {
        self.as_str().encode()
    }
}

impl Encode for char {
    fn encode(&self) -> Result<Value> {
        self.to_string().encode()
    }
}

impl Decode for String {
    fn decode(value: &Value) -> Result<Self> {
        let atom = expect_non_nil_atom(value, "string")?;
        canonical::atom_text(atom)
            .ok_or_else(|| Error::type_mismatch(format!("malformed string atom {atom}")))
    }
}

impl Decode for char {
    fn decode(value: &Value) -> Result<Self> {
        let text = String::decode(value)?;
        let mut chars = text.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Ok(c),
            _ => Err(Error::type_mismatch(format!(
                "\"{text}\" is not a single character"
            ))),
        }
    }
}

impl Encode for bool {
    fn encode(&self) -> Result<Value> {
        Ok(Value::Atom(self.to_string()))
    }
}

impl Decode for bool {
    fn decode(value: &Value) -> Result<Self> {
        match expect_non_nil_atom(value, "bool")? {
            "true" => Ok(true),
            "false" => Ok(false),
            other => Err(Error::type_mismatch(format!("{other} is not a boolean"))),
        }
    }
}

/// Integer value before narrowing
enum Wide {
    Signed(i128),
    Unsigned(u128),
}

fn wide_integer(atom: &str) -> Result<Wide> {
    if let Ok(value) = atom.parse::<i128>() {
        return Ok(Wide::Signed(value));
    }
    if let Ok(value) = atom.parse::<u128>() {
        return Ok(Wide::Unsigned(value));
    }

    let float = canonical::canonical_number(atom)
        .and_then(|_| atom.parse::<f64>().ok())
        .ok_or_else(|| Error::type_mismatch(format!("{atom} is not a number")))?;

    if !float.is_finite() || float.fract() != 0.0 {
        return Err(Error::type_mismatch(format!("{atom} is not an integer")));
    }
    if float >= 0.0 && float <= u128::MAX as f64 {
        Ok(Wide::Unsigned(float as u128))
    } else if float >= i128::MIN as f64 {
        Ok(Wide::Signed(float as i128))
    } else {
        Err(Error::type_mismatch(format!("{atom} is out of range")))
    }
}

macro_rules! integer_coding {
    ($($t:ty),*) => {
        $(
            impl Encode for $t {
                fn encode(&self) -> Result<Value> {
                    Ok(Value::Atom(self.to_string()))
                }
            }

            impl Decode for $t {
                fn decode(value: &Value) -> Result<Self> {
                    let atom = expect_non_nil_atom(value, stringify!($t))?;
                    let narrowed = match wide_integer(atom)? {
                        Wide::Signed(wide) => <$t>::try_from(wide).ok(),
                        Wide::Unsigned(wide) => <$t>::try_from(wide).ok(),
                    };
                    narrowed.ok_or_else(|| {
                        Error::type_mismatch(format!(
                            "{atom} is out of range for {}",
                            stringify!($t)
                        ))
                    })
                }
            }
        )*
    };
}

integer_coding!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);

fn decode_float(atom: &str) -> Result<f64> {
    match atom {
        "+infinity" | "infinity" => return Ok(f64::INFINITY),
        "-infinity" => return Ok(f64::NEG_INFINITY),
        _ => {}
    }
    canonical::canonical_number(atom)
        .and_then(|_| atom.parse::<f64>().ok())
        .ok_or_else(|| Error::type_mismatch(format!("{atom} is not a number")))
}

impl Encode for f64 {
    fn encode(&self) -> Result<Value> {
        canonical::canonical_float(*self)
            .map(Value::Atom)
            .ok_or_else(|| Error::type_mismatch("NaN has no FHiCL representation"))
    }
}

impl Decode for f64 {
    fn decode(value: &Value) -> Result<Self> {
        decode_float(expect_non_nil_atom(value, "f64")?)
    }
}

impl Encode for f32 {
    fn encode(&self) -> Result<Value> {
        // shortest representation of the f32, not of its widened value
        if self.is_finite() {
            canonical::canonical_number(&format!("{self:e}"))
                .map(Value::Atom)
                .ok_or_else(|| Error::type_mismatch(format!("{self} has no FHiCL representation")))
        } else {
            f64::from(*self).encode()
        }
    }
}

impl Decode for f32 {
    fn decode(value: &Value) -> Result<Self> {
        let wide = f64::decode(value)?;
        if wide.is_finite() && wide.abs() > f32::MAX as f64 {
            return Err(Error::type_mismatch(format!("{wide} is out of range for f32")));
        }
        Ok(wide as f32)
    }
}

impl<T: Encode> Encode for Complex<T> {
    fn encode(&self) -> Result<Value> {
        let part = |value: &T| match value.encode()? {
            Value::Atom(atom) => Ok(atom),
            other => Err(Error::type_mismatch(format!(
                "complex part must be a number, not a {}",
                other.kind()
            ))),
        };
        Ok(Value::Atom(canonical::canonical_complex(
            &part(&self.re)?,
            &part(&self.im)?,
        )))
    }
}

impl<T: Decode> Decode for Complex<T> {
    fn decode(value: &Value) -> Result<Self> {
        let atom = expect_non_nil_atom(value, "complex")?;
        let (re, im) = atom
            .strip_prefix('(')
            .and_then(|rest| rest.strip_suffix(')'))
            .and_then(|rest| rest.split_once(','))
            .ok_or_else(|| Error::type_mismatch(format!("{atom} is not a complex number")))?;
        Ok(Complex::new(
            T::decode(&Value::Atom(re.trim().to_string()))?,
            T::decode(&Value::Atom(im.trim().to_string()))?,
        ))
    }
}

impl<T: Encode> Encode for [T] {
    fn encode(&self) -> Result<Value> {
        self.iter()
            .map(Encode::encode)
            .collect::<Result<Vec<_>>>()
            .map(Value::Sequence)
    }
}

impl<T: Encode> Encode for Vec<T> {
    fn encode(&self) -> Result<Value> {
        self.as_slice().encode()
    }
}

impl<T: Encode, const N: usize> Encode for [T; N] {
    fn encode(&self) -> Result<Value> {
        self.as_slice().encode()
    }
}

/// Elements of a sequence, or of a string atom holding a sequence literal
fn sequence_elements(value: &Value) -> Result<std::borrow::Cow<'_, [Value]>> {
    match value {
        Value::Sequence(elements) => Ok(std::borrow::Cow::Borrowed(elements.as_slice())),
        Value::Table(_) => Err(Error::type_mismatch("can't convert a table to a sequence")),
        Value::Atom(atom) => {
            let text = canonical::atom_text(atom).unwrap_or_else(|| atom.clone());
            let parsed = crate::document::parse_value_string(&text)
                .ok()
                .filter(|parsed| matches!(parsed.payload, Payload::Sequence(_)))
                .ok_or_else(|| Error::type_mismatch(format!("error in sequence string:\n{text}")))?;
            match encode_extended(&parsed)? {
                Value::Sequence(elements) => Ok(std::borrow::Cow::Owned(elements)),
                _ => Err(Error::type_mismatch(format!("error in sequence string:\n{text}"))),
            }
        }
    }
}

impl<T: Decode> Decode for Vec<T> {
    fn decode(value: &Value) -> Result<Self> {
        sequence_elements(value)?.iter().map(T::decode).collect()
    }
}

fn check_length(elements: &[Value], expected: usize) -> Result<()> {
    if elements.len() == expected {
        return Ok(());
    }
    let listed: Vec<String> = elements.iter().map(ToString::to_string).collect();
    Err(Error::type_mismatch(format!(
        "Number of expected arguments ({expected}) does not match number of FHiCL sequence entries ({}): [ {} ]",
        elements.len(),
        listed.join(", ")
    )))
}

impl<T: Decode, const N: usize> Decode for [T; N] {
    fn decode(value: &Value) -> Result<Self> {
        let elements = sequence_elements(value)?;
        check_length(&elements, N)?;
        let decoded = elements.iter().map(T::decode).collect::<Result<Vec<T>>>()?;
        decoded
            .try_into()
            .map_err(|_| Error::type_mismatch(format!("expected {N} elements")))
    }
}

macro_rules! tuple_coding {
    ($len:expr => $($name:ident : $index:tt),+) => {
        impl<$($name: Encode),+> Encode for ($($name,)+) {
            fn encode(&self) -> Result<Value> {
                Ok(Value::Sequence(vec![$(self.$index.encode()?),+]))
            }
        }

        impl<$($name: Decode),+> Decode for ($($name,)+) {
            fn decode(value: &Value) -> Result<Self> {
                let elements = sequence_elements(value)?;
                check_length(&elements, $len)?;
                Ok(($($name::decode(&elements[$index])?,)+))
            }
        }
    };
}

tuple_coding!(1 => A: 0);
tuple_coding!(2 => A: 0, B: 1);
tuple_coding!(3 => A: 0, B: 1, C: 2);
tuple_coding!(4 => A: 0, B: 1, C: 2, D: 3);
tuple_coding!(5 => A: 0, B: 1, C: 2, D: 3, E: 4);
tuple_coding!(6 => A: 0, B: 1, C: 2, D: 3, E: 4, F: 5);

/// Registers the parameter set in the global registry
impl Encode for ParameterSet {
    fn encode(&self) -> Result<Value> {
        Ok(Value::Table(
            ParameterSetRegistry::global().put(self.clone()),
        ))
    }
}

impl Decode for ParameterSet {
    fn decode(value: &Value) -> Result<Self> {
        match value {
            Value::Table(id) => Ok(ParameterSetRegistry::global().get(id)?.as_ref().clone()),
            other => Err(Error::type_mismatch(format!(
                "can't convert a {} to a parameter set",
                other.kind()
            ))),
        }
    }
}

impl Encode for ExtendedValue {
    fn encode(&self) -> Result<Value> {
        encode_extended(self)
    }
}

impl<T: std::fmt::Display> Encode for Lexical<T> {
    fn encode(&self) -> Result<Value> {
        self.0.to_string().encode()
    }
}

impl<T> Decode for Lexical<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    fn decode(value: &Value) -> Result<Self> {
        let text = String::decode(value)?;
        text.parse()
            .map(Lexical)
            .map_err(|e| Error::type_mismatch(format!("can't parse \"{text}\": {e}")))
    }
}

/// Type-erased form of a parse-time value
///
/// Tables are turned into parameter sets (without their prolog members) and registered.
pub fn encode_extended(value: &ExtendedValue) -> Result<Value> {
    Ok(match &value.payload {
        Payload::Nil => Value::nil(),
        Payload::Bool(b) => Value::Atom(b.to_string()),
        Payload::Number(number) => Value::Atom(number.clone()),
        Payload::Complex(re, im) => Value::Atom(canonical::canonical_complex(re, im)),
        Payload::String(string) => Value::Atom(string.clone()),
        Payload::Sequence(elements) => Value::Sequence(
            elements
                .iter()
                .map(encode_extended)
                .collect::<Result<Vec<_>>>()?,
        ),
        Payload::Table(_) => {
            let pset = ParameterSet::make_from_extended(value)?;
            Value::Table(ParameterSetRegistry::global().put(pset))
        }
        Payload::TableId(id) => Value::Table(id.parse::<ParameterSetId>()?),
        Payload::Unknown => {
            return Err(Error::type_mismatch(
                "unknown extended value can't be converted",
            ))
        }
    })
}
