//! checking parameter sets against declarations
use super::{AtomKind, NameStack, Presence, Shape, Table};
use crate::coding::Decode;
use crate::document;
use crate::error::{Error, Result};
use crate::value::Value;
use crate::visit::KeyAssembler;
use crate::ParameterSet;
use indexmap::IndexMap;

/// Whether `key` is `prefix` or below it
fn is_below(key: &str, prefix: &str) -> bool {
    key.strip_prefix(prefix)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with(['.', '[']))
}

fn atom_fits(kind: AtomKind, value: &Value) -> bool {
    match kind {
        AtomKind::Bool => bool::decode(value).is_ok(),
        AtomKind::Int => i128::decode(value).is_ok(),
        AtomKind::UInt => u128::decode(value).is_ok(),
        AtomKind::Float => f64::decode(value).is_ok(),
        AtomKind::String => String::decode(value).is_ok(),
        AtomKind::Any => value.is_atom(),
    }
}

fn describe(value: &Value) -> String {
    match value {
        Value::Atom(_) => value.to_string(),
        other => format!("a {}", other.kind()),
    }
}

struct Validation<'p> {
    pset: &'p ParameterSet,
    /// keys no declaration has claimed yet, with their provenance
    unclaimed: IndexMap<String, String>,
    missing: Vec<String>,
    mistyped: Vec<String>,
}

impl Validation<'_> {
    fn table(&mut self, table: &Table, names: &mut NameStack) -> Result<()> {
        for member in table.members() {
            let mut guard = names.push(member.name.as_str());
            let key = guard.full_key();
            match self.pset.get_if_present::<Value>(&key)? {
                Some(value) => self.value(&key, &value, &member.shape, &mut guard)?,
                None if member.presence == Presence::Required => self.missing.push(key),
                None => {}
            }
        }
        Ok(())
    }

    fn value(
        &mut self,
        key: &str,
        value: &Value,
        shape: &Shape,
        names: &mut NameStack,
    ) -> Result<()> {
        self.unclaimed.shift_remove(key);

        match shape {
            Shape::Atom(kind) => {
                if !atom_fits(*kind, value) {
                    self.mistyped
                        .push(format!("{key}: expected {kind}, found {}", describe(value)));
                }
            }
            Shape::Sequence { element, length } => {
                let Value::Sequence(elements) = value else {
                    self.mistyped
                        .push(format!("{key}: expected a sequence, found {}", describe(value)));
                    return Ok(());
                };
                if let Some(length) = length {
                    if elements.len() != *length {
                        self.mistyped.push(format!(
                            "{key}: expected {length} elements, found {}",
                            elements.len()
                        ));
                    }
                }
                for (index, item) in elements.iter().enumerate() {
                    let mut guard = names.push(format!("[{index}]"));
                    let item_key = guard.full_key();
                    self.value(&item_key, item, element, &mut guard)?;
                }
            }
            Shape::Tuple(shapes) => {
                let Value::Sequence(elements) = value else {
                    self.mistyped
                        .push(format!("{key}: expected a tuple, found {}", describe(value)));
                    return Ok(());
                };
                if elements.len() != shapes.len() {
                    self.mistyped.push(format!(
                        "{key}: expected {} elements, found {}",
                        shapes.len(),
                        elements.len()
                    ));
                }
                for (index, (item, shape)) in elements.iter().zip(shapes).enumerate() {
                    let mut guard = names.push(format!("[{index}]"));
                    let item_key = guard.full_key();
                    self.value(&item_key, item, shape, &mut guard)?;
                }
            }
            Shape::Table(table) => {
                if !value.is_table() {
                    self.mistyped
                        .push(format!("{key}: expected a table, found {}", describe(value)));
                    return Ok(());
                }
                self.table(table, names)?;
            }
            Shape::Delegated => self.unclaimed.retain(|name, _| !is_below(name, key)),
        }
        Ok(())
    }

    fn finish(self) -> Result<()> {
        if self.missing.is_empty() && self.unclaimed.is_empty() && self.mistyped.is_empty() {
            return Ok(());
        }

        let mut message = String::from(
            "Any parameters prefaced with '#' are missing, any prefaced with '+' are not supported \
             and any prefaced with '!' have the wrong type.\n",
        );
        if !self.missing.is_empty() {
            message.push_str("\nMissing parameters:\n");
            for key in &self.missing {
                message.push_str(&format!("  # {key}\n"));
            }
        }
        if !self.unclaimed.is_empty() {
            message.push_str("\nUnsupported parameters:\n");
            for (key, src_info) in &self.unclaimed {
                message.push_str(&match src_info.is_empty() {
                    true => format!("  + {key}\n"),
                    false => format!("  + {key} [{src_info}]\n"),
                });
            }
        }
        if !self.mistyped.is_empty() {
            message.push_str("\nMistyped parameters:\n");
            for problem in &self.mistyped {
                message.push_str(&format!("  ! {problem}\n"));
            }
        }

        tracing::debug!(
            missing = self.missing.len(),
            unsupported = self.unclaimed.len(),
            mistyped = self.mistyped.len(),
            "configuration rejected"
        );
        Err(Error::Validation(message))
    }
}

/// Check `pset` against `schema`
///
/// Keys in `keys_to_ignore` (and everything below them) may be present without being declared.
#[tracing::instrument(level = "trace", skip_all)]
pub fn validate(pset: &ParameterSet, schema: &Table, keys_to_ignore: &[&str]) -> Result<()> {
    let mut assembler = KeyAssembler::default();
    pset.walk(&mut assembler)?;
    let unclaimed = assembler
        .into_keys_with_src_info()
        .into_iter()
        .filter(|(key, _)| !keys_to_ignore.iter().any(|ignored| is_below(key, ignored)))
        .collect();

    let mut validation = Validation {
        pset,
        unclaimed,
        missing: Vec::new(),
        mistyped: Vec::new(),
    };
    validation.table(schema, &mut NameStack::default())?;
    validation.finish()
}

/// Copy of `pset` with the declared defaults of missing parameters filled in
pub fn complete(pset: &ParameterSet, schema: &Table) -> Result<ParameterSet> {
    let mut result = pset.clone();

    for member in schema.members() {
        let present = pset.get_if_present::<Value>(&member.name)?;
        match (&member.presence, &member.shape, present) {
            (Presence::Default(text), _, None) => {
                let value = document::parse_value_string(text)?;
                result.put(&member.name, &value)?;
            }
            (_, Shape::Table(nested), Some(Value::Table(_))) => {
                let nested_pset: ParameterSet = pset.get(&member.name)?;
                let completed = complete(&nested_pset, nested)?;
                result.put_or_replace(&member.name, &completed)?;
            }
            _ => {}
        }
    }

    Ok(result)
}
