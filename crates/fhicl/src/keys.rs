//! key paths of parameter sets
//!
//! A key such as `a.b[1][2].c` is split at the dots into table names (`a`, `b[1][2]`) and the
//! last name (`c`). Each name may carry sequence indices.
use crate::error::{Error, Result};

/// Table names along a key and its last name
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Keys<'k> {
    pub tables: Vec<&'k str>,
    pub last: &'k str,
}

pub(crate) fn split_key(key: &str) -> Result<Keys<'_>> {
    let mut names: Vec<&str> = key.split('.').filter(|name| !name.is_empty()).collect();
    let Some(last) = names.pop() else {
        return Err(Error::cant_find_at(key, "-- vacuous key"));
    };
    Ok(Keys {
        tables: names,
        last,
    })
}

/// `name[0][5]` as name and indices
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SequenceKey<'k> {
    pub name: &'k str,
    pub indices: Vec<usize>,
}

pub(crate) fn sequence_indices(key: &str) -> Result<SequenceKey<'_>> {
    let (name, mut rest) = match key.find('[') {
        Some(start) => (&key[..start], &key[start..]),
        None => (key, ""),
    };

    let mut indices = Vec::new();
    while !rest.is_empty() {
        let index = rest
            .strip_prefix('[')
            .and_then(|inner| inner.split_once(']'))
            .and_then(|(digits, tail)| Some((digits.trim().parse::<usize>().ok()?, tail)));
        let Some((index, tail)) = index else {
            return Err(Error::cant_find_at(
                key,
                format!("-- malformed sequence index \"{rest}\""),
            ));
        };
        indices.push(index);
        rest = tail;
    }

    Ok(SequenceKey { name, indices })
}

pub(crate) fn is_sequence_element(key: &str) -> bool {
    index_of_sequence_element(key).is_some()
}

/// Last index of a key like `s[1][2]`
pub(crate) fn index_of_sequence_element(key: &str) -> Option<usize> {
    let inner = key.strip_suffix(']')?;
    let start = inner.rfind('[')?;
    inner[start + 1..].parse().ok()
}
