use super::ParameterSetWalker;
use crate::ParameterSet;
use crate::value::Value;

/// Collects the full key of every binding: `a`, `a.b`, `a.s[0]`, ...
#[derive(Debug, Default)]
pub struct KeyAssembler {
    keys: Vec<String>,
    /// `file:line` of each key
    src_info: Vec<String>,
    /// keys of the tables being walked
    tables: Vec<String>,
    pending_src_info: String,
}

impl KeyAssembler {
    fn full_key(&self, key: &str) -> String {
        match self.tables.last() {
            Some(table) => format!("{table}.{key}"),
            None => key.to_string(),
        }
    }

    fn push(&mut self, full_key: String) {
        self.keys.push(full_key);
        self.src_info.push(std::mem::take(&mut self.pending_src_info));
    }

    pub fn into_keys(self) -> Vec<String> {
        self.keys
    }

    /// Full keys with the `file:line` they were bound at, empty when unknown
    pub fn into_keys_with_src_info(self) -> Vec<(String, String)> {
        self.keys.into_iter().zip(self.src_info).collect()
    }
}

impl ParameterSetWalker for KeyAssembler {
    fn before_action(&mut self, key: &str, _value: &Value, owner: &ParameterSet) {
        self.pending_src_info = owner.get_src_info(key).to_string();
    }

    fn enter_table(&mut self, key: &str, _table: &ParameterSet) {
        let full_key = self.full_key(key);
        self.push(full_key.clone());
        self.tables.push(full_key);
    }

    fn exit_table(&mut self, _key: &str, _table: &ParameterSet) {
        self.tables.pop();
    }

    fn enter_sequence(&mut self, key: &str, _elements: &[Value]) {
        let full_key = self.full_key(key);
        self.push(full_key);
    }

    fn atom(&mut self, key: &str, _atom: &str) {
        let full_key = self.full_key(key);
        self.push(full_key);
    }
}
