//! # fhicl - the FHiCL configuration language
//!
//! Parse FHiCL documents into parameter sets, query them with typed getters and share them
//! through a deduplicating registry.
//!
//! ## Introduction for developers
//!
//! Read this to understand how `fhicl` works internally.
//!
//! ### FHiCL Terms
//!
//! - a document is an optional `prolog` followed by a list of `statements`
//! - the prolog is one or more `BEGIN_PROLOG ... END_PROLOG` blocks, its bindings can be
//!   referenced but are not part of the result
//! - a statement binds a `key` to a `value` (`key: value`), or erases a key (`key: @erase`)
//! - values are `atoms` (nil, booleans, numbers, complex numbers, strings), `sequences`
//!   (`[1, 2]`) and `tables` (`{ a: 1 }`)
//! - `@local::key` copies an earlier binding, `@table::key` and `@sequence::key` splice one in
//! - `@protect_ignore:` and `@protect_error:` protect a binding against being overridden
//!
//! This is a valid document:
//! ```fhicl
//! #include "defaults.fcl"
//!
//! BEGIN_PROLOG
//! common: { verbose: false }
//! END_PROLOG
//!
//! tool: {
//!   @table::common
//!   threshold: 2.5e-3
//!   labels: [ "a", b, @sequence::extra_labels ]
//! }
//! tool.verbose: true
//! ```
//!
//! ### Loading documents
//!
//! `#include "name"` lines are expanded textually before parsing (see [source::Includer]).
//! Names are resolved by a [source::SourceResolver], usually a [source::SearchPath] built from
//! `FHICL_FILE_PATH`. The expanded text remembers which file and line each character came from,
//! errors and the `src_info` of every binding point back to the original file.
//!
//! ### Parsing
//!
//! Parsing happens in two passes:
//!
//! 1. [syntax] turns the text into a syntax tree. Nothing is looked up at this point, the only
//!    failures are malformed text.
//! 2. [document] executes the statements in order against an [IntermediateTable]. References
//!    are resolved against what has been bound so far, protections are checked and the prolog
//!    is dropped at the end.
//!
//! The [IntermediateTable] keeps [extended_value::ExtendedValue]s: values that still know where
//! they were defined, whether they are protected and whether they came from the prolog.
//!
//! ### Parameter sets
//!
//! [ParameterSet::make_from_table] converts the intermediate table into the immutable form most
//! code works with. Atoms are stored in their canonical spelling (see [canonical]), nested tables
//! are registered in the [ParameterSetRegistry] and referenced by [ParameterSetId], the
//! SHA-256 derived hash of their compact text.
//!
//! Typed access goes through [Encode] and [Decode]:
//!
//! ```
//! let pset = fhicl::ParameterSet::make("a: { b: [1, 2, 3] } c: \"some text\"").unwrap();
//! assert_eq!(pset.get::<Vec<u8>>("a.b").unwrap(), vec![1, 2, 3]);
//! assert_eq!(pset.get::<String>("c").unwrap(), "some text");
//! assert_eq!(pset.get_or::<i32>("d", -1).unwrap(), -1);
//! ```
//!
//! ### Output
//!
//! Parameter sets print as FHiCL again: compact ([ParameterSet::to_compact_string]) or one
//! binding per line ([ParameterSet::to_indented_string_with], optionally annotated with the
//! origin of each binding). They also implement [serde::Serialize].
//!
pub mod canonical;
pub mod coding;
pub mod document;
pub mod error;
pub mod extended_value;
pub mod id;
pub mod intermediate_table;
mod keys;
pub mod parameter_set;
pub mod registry;
pub mod schema;
pub mod source;
pub mod store;
pub mod syntax;
pub mod value;
pub mod visit;

pub use coding::{Decode, Encode, Lexical, Nil};
pub use document::{parse_document, parse_document_file, parse_value_string};
pub use error::{Error, ErrorCategory, Result};
pub use id::ParameterSetId;
pub use intermediate_table::{IntermediateTable, KeyMode};
pub use parameter_set::ParameterSet;
pub use registry::ParameterSetRegistry;
pub use value::Value;
pub use visit::{ParameterSetWalker, PrintMode};
