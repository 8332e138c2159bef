//! document sources and `#include` expansion
//!
//! The parser works on a single expanded text. [Includer] produces that text by replacing every
//! `#include "name"` line with the contents of the named source (recursively) and remembers
//! where each stretch of the expanded text came from, so positions can be mapped back to
//! `file:line` for diagnostics and provenance.
//!
//! Where a name is looked up is up to a [SourceResolver]:
//! - [MemoryResolver] serves named texts held in memory
//! - [SearchPath] looks for files in an ordered list of directories (usually `FHICL_FILE_PATH`)
use crate::error::{Error, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Name used for text that did not come from a named source
pub const ANONYMOUS: &str = "-";

/// Resolved source text
#[derive(Debug, Clone, derive_new::new)]
pub struct Source {
    /// Display name, used in diagnostics and `file:line` provenance
    pub name: String,
    pub text: String,
}

/// Capability to turn a source name into text
pub trait SourceResolver {
    fn resolve(&self, name: &str) -> Result<Source>;
}

/// Named texts held in memory
#[derive(Debug, Default, Clone)]
pub struct MemoryResolver {
    sources: HashMap<String, String>,
}

impl MemoryResolver {
    pub fn insert(&mut self, name: impl Into<String>, text: impl Into<String>) {
        self.sources.insert(name.into(), text.into());
    }

    pub fn with(mut self, name: impl Into<String>, text: impl Into<String>) -> Self {
        self.insert(name, text);
        self
    }
}

impl SourceResolver for MemoryResolver {
    fn resolve(&self, name: &str) -> Result<Source> {
        self.sources
            .get(name)
            .map(|text| Source::new(name.to_string(), text.clone()))
            .ok_or_else(|| Error::Other(format!("unable to locate \"{name}\"")))
    }
}

/// Ordered list of directories to look up relative names in
#[derive(Debug, Default, Clone)]
pub struct SearchPath {
    directories: Vec<PathBuf>,
}

impl SearchPath {
    pub fn new(directories: impl IntoIterator<Item = PathBuf>) -> Self {
        Self {
            directories: directories.into_iter().collect(),
        }
    }

    /// Colon separated list of directories, empty entries are skipped
    pub fn parse(list: &str) -> Self {
        Self::new(
            list.split(':')
                .filter(|entry| !entry.is_empty())
                .map(PathBuf::from),
        )
    }

    /// Read the directory list from an environment variable
    ///
    /// Falls back to the current directory when the variable is unset or empty.
    pub fn from_env(variable: &str) -> Self {
        match std::env::var(variable) {
            Ok(list) if !list.trim().is_empty() => Self::parse(&list),
            _ => {
                tracing::debug!(variable, "search path variable not set, using \".\"");
                Self::new([PathBuf::from(".")])
            }
        }
    }

    pub fn directories(&self) -> &[PathBuf] {
        &self.directories
    }

    fn locate(&self, name: &str) -> Option<PathBuf> {
        let path = Path::new(name);
        if path.is_absolute() || name.starts_with("./") || name.starts_with("../") {
            return path.is_file().then(|| path.to_path_buf());
        }

        self.directories
            .iter()
            .map(|directory| directory.join(name))
            .find(|candidate| candidate.is_file())
    }
}

impl SourceResolver for SearchPath {
    fn resolve(&self, name: &str) -> Result<Source> {
        let Some(path) = self.locate(name) else {
            return Err(Error::Other(format!(
                "unable to locate \"{name}\" in search path {:?}",
                self.directories
            )));
        };

        tracing::info!(path=%path.display(), "loading file");
        let text = std::fs::read_to_string(&path)
            .map_err(|e| Error::Other(format!("unable to read \"{}\": {e}", path.display())))?;

        Ok(Source::new(path.display().to_string(), text))
    }
}

/// Position in a source, 1-based
#[derive(Debug, Clone, PartialEq, Eq, derive_new::new)]
pub struct Location {
    pub line: usize,
    pub column: usize,
    #[new(default)]
    pub file: Option<String>,
}

impl Location {
    /// `file:line` form used as provenance
    pub fn src_info(&self) -> String {
        format!(
            "{}:{}",
            self.file.as_deref().unwrap_or(ANONYMOUS),
            self.line
        )
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {}, character {}", self.line, self.column)?;
        if let Some(file) = &self.file {
            write!(f, " of file \"{file}\"")?;
        }
        Ok(())
    }
}

/// Stretch of expanded text that comes from one file, starting at `line`
#[derive(Debug, Clone)]
struct Segment {
    offset: usize,
    file: String,
    line: usize,
}

/// Expanded document text and where it came from
#[derive(Debug, Clone)]
pub struct Included {
    text: String,
    segments: Vec<Segment>,
}

impl Included {
    /// Text without includes, as if it came from an anonymous source
    pub fn anonymous(text: &str) -> Self {
        Self {
            text: text.to_string(),
            segments: vec![Segment {
                offset: 0,
                file: ANONYMOUS.to_string(),
                line: 1,
            }],
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Map a byte offset of the expanded text back to its source
    pub fn locate(&self, offset: usize) -> Location {
        let offset = offset.min(self.text.len());
        let segment = self
            .segments
            .iter()
            .rev()
            .find(|segment| segment.offset <= offset)
            .or(self.segments.first());

        let (file, first_line, start) = match segment {
            Some(segment) => (segment.file.as_str(), segment.line, segment.offset),
            None => (ANONYMOUS, 1, 0),
        };

        let before = &self.text[start..offset];
        let line = first_line + before.matches('\n').count();
        let line_start = self.text[..offset].rfind('\n').map(|at| at + 1).unwrap_or(0);
        let column = self.text[line_start..offset].chars().count() + 1;

        Location {
            line,
            column,
            file: (file != ANONYMOUS).then(|| file.to_string()),
        }
    }

    /// `file:line` of a byte offset
    pub fn src_info(&self, offset: usize) -> String {
        self.locate(offset).src_info()
    }
}

/// Expands `#include` directives
#[derive(derive_new::new)]
pub struct Includer<'r> {
    resolver: &'r dyn SourceResolver,
    #[new(default)]
    stack: Vec<String>,
    #[new(default)]
    text: String,
    #[new(default)]
    segments: Vec<Segment>,
}

const INCLUDE: &str = "#include";

impl<'r> Includer<'r> {
    /// Resolve `name` and expand it
    pub fn expand_named(mut self, name: &str) -> Result<Included> {
        let source = self.resolver.resolve(name)?;
        self.expand_source(&source)?;
        Ok(self.finish())
    }

    /// Expand text that does not have a name of its own
    pub fn expand_text(mut self, text: &str) -> Result<Included> {
        self.expand_source(&Source::new(ANONYMOUS.to_string(), text.to_string()))?;
        Ok(self.finish())
    }

    fn finish(self) -> Included {
        Included {
            text: self.text,
            segments: self.segments,
        }
    }

    #[tracing::instrument(level = "trace", skip_all, fields(name = %source.name))]
    fn expand_source(&mut self, source: &Source) -> Result<()> {
        if self.stack.contains(&source.name) {
            return Err(Error::Other(format!(
                "#include cycle detected: {} -> {}",
                self.stack.join(" -> "),
                source.name
            )));
        }
        self.stack.push(source.name.clone());
        self.begin_segment(&source.name, 1);

        for (index, line) in source.text.split_inclusive('\n').enumerate() {
            let line_number = index + 1;
            if !line.starts_with(INCLUDE) {
                self.text.push_str(line);
                continue;
            }

            let location = Location {
                line: line_number,
                column: 1,
                file: (source.name != ANONYMOUS).then(|| source.name.clone()),
            };

            let name = include_target(line).ok_or_else(|| {
                Error::parse(
                    format!("malformed #include directive: {}", line.trim_end()),
                    location.clone(),
                )
            })?;

            let included = self
                .resolver
                .resolve(name)
                .and_then(|included| self.expand_source(&included));
            if let Err(e) = included {
                return Err(Error::parse_caused_by("Error in #include:", location, e));
            }

            if !self.text.ends_with('\n') {
                self.text.push('\n');
            }
            self.begin_segment(&source.name, line_number + 1);
        }

        self.stack.pop();
        Ok(())
    }

    fn begin_segment(&mut self, file: &str, line: usize) {
        self.segments.push(Segment {
            offset: self.text.len(),
            file: file.to_string(),
            line,
        });
    }
}

/// `name` of a `#include "name"` line
fn include_target(line: &str) -> Option<&str> {
    let rest = line.strip_prefix(INCLUDE)?;
    if !rest.starts_with([' ', '\t']) {
        return None;
    }
    let rest = rest.trim();
    let name = rest.strip_prefix('"')?.strip_suffix('"')?;
    (!name.is_empty() && !name.contains('"')).then_some(name)
}

/// Utility macro to create a [ParameterSet](crate::ParameterSet) from text
///
/// Create from a single document
/// ```
/// # use fhicl::pset;
/// let pset = pset!("answer: 42");
/// assert_eq!(pset.get::<u32>("answer").unwrap(), 42);
/// ```
///
/// Create from multiple named sources, the first one is the document (the others can be included)
/// ```
/// # use fhicl::pset;
/// let pset = pset! {
///   "main.fcl" => "#include \"defaults.fcl\"\nanswer: @local::default_answer",
///   "defaults.fcl" => "BEGIN_PROLOG\ndefault_answer: 42\nEND_PROLOG"
/// };
/// assert_eq!(pset.get::<u32>("answer").unwrap(), 42);
/// ```
///
/// # Panic
/// Panics on invalid input
///
/// ```should_panic
/// # use fhicl::pset;
/// pset!("not: valid: fhicl");
/// ```
#[macro_export]
macro_rules! pset {
    // single document without source
    { $expr:expr } => {
        $crate::ParameterSet::make($expr).expect("document must parse")
    };
    // multi document with names
    { $main:expr => $main_text:expr $(, $name:expr => $text:expr)* $(,)? } => {{
        let resolver = $crate::source::MemoryResolver::default()
            .with($main, $main_text)
            $(.with($name, $text))*;
        $crate::ParameterSet::make_from_file($main, &resolver).expect("document must parse")
    }};
}
