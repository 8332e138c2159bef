//! indented printing of parameter sets
//!
//! One binding per line, members indented by three spaces per level, `,` after every sequence
//! element but the last. Empty tables and sequences are printed as `{}` and `[]`.
//!
//! The annotated modes add where a binding came from:
//! - [PrintMode::Annotated] appends `  # file:line`, or `  # ""` when it is the same as the
//!   previous annotation
//! - [PrintMode::PrefixAnnotated] puts a `#SRC|file:line|` comment line before each binding
use super::ParameterSetWalker;
use crate::canonical;
use crate::keys;
use crate::value::Value;
use crate::ParameterSet;

const INDENT: &str = "   ";

/// Provenance of bindings made from anonymous text
const UNKNOWN_SRC: &str = "-:1";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PrintMode {
    #[default]
    Raw,
    Annotated,
    PrefixAnnotated,
}

fn allowed_info(info: &str) -> bool {
    !info.is_empty() && info != UNKNOWN_SRC
}

#[derive(Debug)]
pub struct Prettifier {
    mode: PrintMode,
    buffer: String,
    level: usize,
    /// sizes of the sequences being printed, innermost last
    sequence_sizes: Vec<usize>,
    /// provenance of the binding being printed
    info: String,
    /// last provenance that was printed
    cached_info: String,
}

impl Prettifier {
    pub fn new(initial_indent: usize, mode: PrintMode) -> Self {
        Self {
            mode,
            buffer: String::new(),
            level: initial_indent,
            sequence_sizes: Vec::new(),
            info: String::new(),
            cached_info: String::new(),
        }
    }

    pub fn into_string(self) -> String {
        self.buffer
    }

    fn indent(&mut self) {
        for _ in 0..self.level {
            self.buffer.push_str(INDENT);
        }
    }

    /// Start the line of a binding
    fn begin(&mut self, key: &str) {
        if self.mode == PrintMode::PrefixAnnotated {
            let info = if allowed_info(&self.info) { self.info.as_str() } else { "" };
            self.buffer.push_str(&format!("#SRC|{info}|\n"));
        }
        self.indent();
        if !keys::is_sequence_element(key) {
            self.buffer.push_str(key);
            self.buffer.push_str(": ");
        }
    }

    /// Finish the line of a binding
    fn end(&mut self) {
        if self.mode == PrintMode::Annotated && allowed_info(&self.info) {
            let printed = if self.info == self.cached_info {
                "\"\""
            } else {
                self.info.as_str()
            };
            self.buffer.push_str("  # ");
            self.buffer.push_str(printed);
            self.cached_info = self.info.clone();
        }
        self.buffer.push('\n');
    }

    /// `,` for all but the last element of the innermost sequence
    fn suffix(&mut self, key: &str) {
        let (Some(index), Some(size)) = (
            keys::index_of_sequence_element(key),
            self.sequence_sizes.last(),
        ) else {
            return;
        };
        if index + 1 != *size {
            self.buffer.push(',');
        }
    }

    fn open(&mut self, key: &str, braces: &str, empty: bool) {
        self.begin(key);
        if empty {
            self.buffer.push_str(braces);
            self.suffix(key);
        } else {
            self.buffer.push_str(&braces[..1]);
            self.level += 1;
        }
        self.end();
    }

    fn close(&mut self, key: &str, braces: &str, empty: bool) {
        if empty {
            return;
        }
        self.level -= 1;
        self.indent();
        self.buffer.push_str(&braces[1..]);
        self.suffix(key);
        self.buffer.push('\n');
    }
}

impl ParameterSetWalker for Prettifier {
    fn before_action(&mut self, key: &str, _value: &Value, owner: &ParameterSet) {
        self.info = owner.get_src_info(key).to_string();
    }

    fn enter_table(&mut self, key: &str, table: &ParameterSet) {
        self.open(key, "{}", table.is_empty());
    }

    fn exit_table(&mut self, key: &str, table: &ParameterSet) {
        self.close(key, "{}", table.is_empty());
    }

    fn enter_sequence(&mut self, key: &str, elements: &[Value]) {
        self.open(key, "[]", elements.is_empty());
        self.sequence_sizes.push(elements.len());
    }

    fn exit_sequence(&mut self, key: &str, elements: &[Value]) {
        self.sequence_sizes.pop();
        self.close(key, "[]", elements.is_empty());
    }

    fn atom(&mut self, key: &str, atom: &str) {
        self.begin(key);
        if canonical::is_nil(atom) {
            self.buffer.push_str(canonical::NIL_TOKEN);
        } else {
            self.buffer.push_str(atom);
        }
        self.suffix(key);
        self.end();
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::source::MemoryResolver;
    use pretty_assertions::assert_eq;

    #[test]
    fn raw() {
        let pset = ParameterSet::make("a: 1 t: { b: [1, [], { c: @nil }] e: {} } s: [[2, 3], 4]")
            .unwrap();
        let expected = "\
a: 1
s: [
   [
      2,
      3
   ],
   4
]
t: {
   b: [
      1,
      [],
      {
         c: @nil
      }
   ]
   e: {}
}
";
        assert_eq!(pset.to_indented_string(0).unwrap(), expected);
    }

    #[test]
    fn initial_indent() {
        let pset = ParameterSet::make("a: { b: 1 }").unwrap();
        assert_eq!(
            pset.to_indented_string(1).unwrap(),
            "   a: {\n      b: 1\n   }\n"
        );
    }

    #[test]
    fn annotated() {
        let resolver = MemoryResolver::default().with("main.fcl", "a: 1\nb: 2 c: [\n  3\n]\n");
        let pset = ParameterSet::make_from_file("main.fcl", &resolver).unwrap();

        let annotated = pset
            .to_indented_string_with(0, PrintMode::Annotated)
            .unwrap();
        assert_eq!(
            annotated,
            "a: 1  # main.fcl:1\nb: 2  # main.fcl:2\nc: [  # \"\"\n   3  # main.fcl:3\n]\n"
        );

        let prefixed = pset
            .to_indented_string_with(0, PrintMode::PrefixAnnotated)
            .unwrap();
        assert_eq!(
            prefixed,
            "#SRC|main.fcl:1|\na: 1\n#SRC|main.fcl:2|\nb: 2\n#SRC|main.fcl:2|\nc: [\n#SRC|main.fcl:3|\n   3\n]\n"
        );
        assert_eq!(ParameterSet::make(&prefixed).unwrap(), pset);
    }
}
