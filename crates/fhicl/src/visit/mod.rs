//! walker pattern helpers
mod key_assembler;
mod prettifier;
pub use key_assembler::KeyAssembler;
pub use prettifier::{Prettifier, PrintMode};

use crate::value::Value;
use crate::ParameterSet;

/// Callbacks of [ParameterSet::walk]
///
/// For every binding `before_action` comes first and `after_action` last. In between, tables
/// and sequences get an enter and an exit call around their members, atoms a single call.
/// Every callback does nothing by default.
pub trait ParameterSetWalker {
    /// `owner` holds `key`, for sequence elements it is the set holding the sequence
    fn before_action(&mut self, _key: &str, _value: &Value, _owner: &ParameterSet) {}
    fn enter_table(&mut self, _key: &str, _table: &ParameterSet) {}
    fn exit_table(&mut self, _key: &str, _table: &ParameterSet) {}
    fn enter_sequence(&mut self, _key: &str, _elements: &[Value]) {}
    fn exit_sequence(&mut self, _key: &str, _elements: &[Value]) {}
    fn atom(&mut self, _key: &str, _atom: &str) {}
    fn after_action(&mut self, _key: &str) {}
}

// blanket impl for FnMut, called once per binding
impl<F> ParameterSetWalker for F
where
    F: FnMut(&str, &Value),
{
    fn before_action(&mut self, key: &str, value: &Value, _owner: &ParameterSet) {
        self(key, value)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn closures_see_every_binding() {
        let pset = ParameterSet::make("a: [1, { b: 2 }] c: 3").unwrap();
        let mut seen = Vec::new();
        pset.walk(&mut |key: &str, value: &Value| seen.push(format!("{key} {}", value.kind())))
            .unwrap();
        assert_eq!(
            seen,
            ["a sequence", "a[0] atom", "a[1] table", "b atom", "c atom"]
        );
    }
}
