//! declared configuration shapes
//!
//! A [Table] lists the parameters a consumer of a [ParameterSet](crate::ParameterSet) accepts.
//! [validate] checks a parameter set against it and reports, in one error, every missing,
//! unsupported and mistyped key. [complete] fills in declared defaults.
//!
//! ```
//! use fhicl::schema::{AtomKind, Parameter, Shape, Table};
//!
//! let schema = Table::new()
//!     .member(Parameter::atom("threshold", AtomKind::Float))
//!     .member(Parameter::sequence("labels", Shape::Atom(AtomKind::String)).optional())
//!     .member(Parameter::atom("verbose", AtomKind::Bool).with_default("false"));
//!
//! let pset = fhicl::ParameterSet::make("threshold: 0.5 labels: [a, b]").unwrap();
//! fhicl::schema::validate(&pset, &schema, &[]).unwrap();
//!
//! let complete = fhicl::schema::complete(&pset, &schema).unwrap();
//! assert!(!complete.get::<bool>("verbose").unwrap());
//! ```
mod name_stack;
mod validate;

pub use name_stack::{NameGuard, NameStack};
pub use validate::{complete, validate};

use std::fmt;

/// Kinds of atoms a parameter can require
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AtomKind {
    Bool,
    Int,
    UInt,
    Float,
    String,
    /// any atom, nil included
    Any,
}

impl std::fmt::Display for AtomKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            AtomKind::Bool => "<bool>",
            AtomKind::Int => "<int>",
            AtomKind::UInt => "<unsigned int>",
            AtomKind::Float => "<float>",
            AtomKind::String => "<string>",
            AtomKind::Any => "<any>",
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Atom(AtomKind),
    /// elements of one shape, `length` fixes their number
    Sequence {
        element: Box<Shape>,
        length: Option<usize>,
    },
    /// one shape per position
    Tuple(Vec<Shape>),
    Table(Table),
    /// not checked, whatever is below is left to its consumer
    Delegated,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Presence {
    #[default]
    Required,
    Optional,
    /// FHiCL text of the value used when the parameter is missing
    Default(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub shape: Shape,
    pub presence: Presence,
    pub comment: Option<String>,
}

impl Parameter {
    pub fn new(name: impl Into<String>, shape: Shape) -> Self {
        Self {
            name: name.into(),
            shape,
            presence: Presence::Required,
            comment: None,
        }
    }

    pub fn atom(name: impl Into<String>, kind: AtomKind) -> Self {
        Self::new(name, Shape::Atom(kind))
    }

    pub fn sequence(name: impl Into<String>, element: Shape) -> Self {
        Self::new(
            name,
            Shape::Sequence {
                element: Box::new(element),
                length: None,
            },
        )
    }

    pub fn fixed_sequence(name: impl Into<String>, element: Shape, length: usize) -> Self {
        Self::new(
            name,
            Shape::Sequence {
                element: Box::new(element),
                length: Some(length),
            },
        )
    }

    pub fn tuple(name: impl Into<String>, elements: Vec<Shape>) -> Self {
        Self::new(name, Shape::Tuple(elements))
    }

    pub fn table(name: impl Into<String>, table: Table) -> Self {
        Self::new(name, Shape::Table(table))
    }

    pub fn delegated(name: impl Into<String>) -> Self {
        Self::new(name, Shape::Delegated)
    }

    pub fn optional(mut self) -> Self {
        self.presence = Presence::Optional;
        self
    }

    pub fn with_default(mut self, fhicl_text: impl Into<String>) -> Self {
        self.presence = Presence::Default(fhicl_text.into());
        self
    }

    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    members: Vec<Parameter>,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn member(mut self, parameter: Parameter) -> Self {
        self.members.push(parameter);
        self
    }

    pub fn members(&self) -> &[Parameter] {
        &self.members
    }

    fn describe(&self, f: &mut fmt::Formatter<'_>, level: usize) -> fmt::Result {
        let indent = "   ".repeat(level);
        for member in &self.members {
            if let Some(comment) = &member.comment {
                for line in comment.lines() {
                    writeln!(f, "{indent}## {line}")?;
                }
            }

            write!(f, "{indent}{}: ", member.name)?;
            describe_shape(&member.shape, f, level)?;
            match &member.presence {
                Presence::Required => {}
                Presence::Optional => f.write_str("  # optional")?,
                Presence::Default(text) => write!(f, "  # default: {text}")?,
            }
            f.write_str("\n")?;
        }
        Ok(())
    }
}

fn describe_shape(shape: &Shape, f: &mut fmt::Formatter<'_>, level: usize) -> fmt::Result {
    match shape {
        Shape::Atom(kind) => write!(f, "{kind}"),
        Shape::Sequence {
            element,
            length: None,
        } => {
            f.write_str("[ ")?;
            describe_shape(element, f, level)?;
            f.write_str(", ... ]")
        }
        Shape::Sequence {
            element,
            length: Some(length),
        } => {
            f.write_str("[")?;
            for index in 0..*length {
                f.write_str(if index == 0 { " " } else { ", " })?;
                describe_shape(element, f, level)?;
            }
            f.write_str(" ]")
        }
        Shape::Tuple(elements) => {
            f.write_str("[")?;
            for (index, element) in elements.iter().enumerate() {
                f.write_str(if index == 0 { " " } else { ", " })?;
                describe_shape(element, f, level)?;
            }
            f.write_str(" ]")
        }
        Shape::Table(table) if table.members.is_empty() => f.write_str("{}"),
        Shape::Table(table) => {
            f.write_str("{\n")?;
            table.describe(f, level + 1)?;
            write!(f, "{}}}", "   ".repeat(level))
        }
        Shape::Delegated => f.write_str("<delegated>"),
    }
}

/// Allowed configuration, one parameter per line
impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.describe(f, 0)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn description() {
        let schema = Table::new()
            .member(Parameter::atom("a", AtomKind::Int).comment("how many"))
            .member(Parameter::fixed_sequence("xyz", Shape::Atom(AtomKind::Float), 3))
            .member(Parameter::tuple(
                "pair",
                vec![Shape::Atom(AtomKind::String), Shape::Atom(AtomKind::UInt)],
            ))
            .member(
                Parameter::table(
                    "t",
                    Table::new().member(Parameter::atom("on", AtomKind::Bool).with_default("true")),
                )
                .optional(),
            )
            .member(Parameter::sequence("s", Shape::Table(Table::new())))
            .member(Parameter::delegated("tool"));

        let expected = "\
## how many
a: <int>
xyz: [ <float>, <float>, <float> ]
pair: [ <string>, <unsigned int> ]
t: {
   on: <bool>  # default: true
}  # optional
s: [ {}, ... ]
tool: <delegated>
";
        assert_eq!(schema.to_string(), expected);
    }
}
