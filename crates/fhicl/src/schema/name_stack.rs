//! full keys of nested declarations
use std::ops::{Deref, DerefMut};

/// Names from the outermost table to the parameter being looked at
///
/// ```
/// use fhicl::schema::NameStack;
///
/// let mut names = NameStack::default();
/// let mut table = names.push("t");
/// {
///     let element = table.push("[2]");
///     assert_eq!(element.full_key(), "t[2]");
/// }
/// assert_eq!(table.full_key(), "t");
/// ```
#[derive(Debug, Default)]
pub struct NameStack {
    names: Vec<String>,
}

impl NameStack {
    /// Push `name`, it is popped again when the guard is dropped
    ///
    /// Sequence element names (`[i]`) are attached without a dot.
    pub fn push(&mut self, name: impl Into<String>) -> NameGuard<'_> {
        self.names.push(name.into());
        NameGuard { stack: self }
    }

    pub fn full_key(&self) -> String {
        let mut key = String::new();
        for name in &self.names {
            if !key.is_empty() && !name.starts_with('[') {
                key.push('.');
            }
            key.push_str(name);
        }
        key
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Scope of one pushed name
#[derive(Debug)]
pub struct NameGuard<'s> {
    stack: &'s mut NameStack,
}

impl Deref for NameGuard<'_> {
    type Target = NameStack;

    fn deref(&self) -> &NameStack {
        self.stack
    }
}

impl DerefMut for NameGuard<'_> {
    fn deref_mut(&mut self) -> &mut NameStack {
        self.stack
    }
}

impl Drop for NameGuard<'_> {
    fn drop(&mut self) {
        self.stack.names.pop();
    }
}
