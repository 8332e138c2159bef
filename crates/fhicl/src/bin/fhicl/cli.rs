//! fhicl cli interface

use clap::{ArgGroup, Parser, Subcommand, ValueEnum};
use std::fmt::Formatter;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Change the work directory
    ///
    /// Can be specified multiple times. Note that all
    /// paths on the way to the final path must exist.
    ///
    /// This is equivalent to running { cd <directory>; fhicl ... }
    #[clap(short = 'C', long = "directory", global(true))]
    pub directory: Vec<PathBuf>,

    /// Colon separated directories to look up documents and includes in
    ///
    /// Defaults to the value of FHICL_FILE_PATH, or the work directory when that is unset.
    #[clap(short = 'L', long = "lookup-path", global(true))]
    pub lookup_path: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the value of one key
    ///
    /// Usage: fhicl get <--atom-as T | --sequence-of T | --names-in> [KEY] <FILE>
    Get(GetCommand),

    /// Print a whole document
    ///
    /// Reads the document from stdin unless a file is given
    Dump(DumpCommand),
}

#[derive(Parser, Debug)]
#[clap(group(ArgGroup::new("query").required(true).args(["atom_as", "sequence_of", "names_in"])))]
pub struct GetCommand {
    /// Print the value as an atom of this type
    #[clap(long = "atom-as", value_name = "TYPE")]
    pub atom_as: Option<AtomType>,

    /// Print the value as a sequence of this type, one element per line
    #[clap(long = "sequence-of", value_name = "TYPE")]
    pub sequence_of: Option<AtomType>,

    /// Print the names of the table, the top level when no key is given
    #[clap(long = "names-in")]
    pub names_in: bool,

    /// Print nothing when the key does not exist
    #[clap(long = "allow-missing")]
    pub allow_missing: bool,

    /// Key to look up, followed by the document
    #[clap(value_name = "KEY", num_args = 1..=2, required = true)]
    pub arguments: Vec<String>,
}

impl GetCommand {
    /// Key (if any) and file name
    pub fn key_and_file(&self) -> anyhow::Result<(Option<&str>, &str)> {
        match self.arguments.as_slice() {
            [key, file] => Ok((Some(key.as_str()), file.as_str())),
            [file] => Ok((None, file.as_str())),
            _ => anyhow::bail!("expected [KEY] <FILE>"),
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum AtomType {
    Bool,
    Int,
    Uint,
    Float,
    String,
}

#[derive(Parser, Debug)]
pub struct DumpCommand {
    #[arg(short = 'm', long = "mode", default_value_t)]
    pub mode: DumpMode,

    #[arg(short = 'F', long = "output-format", default_value_t)]
    pub format: OutputFormat,

    /// Document to load, looked up in the lookup path
    pub file: Option<String>,
}

#[derive(ValueEnum, Clone, Copy, Default, Debug)]
pub enum DumpMode {
    /// Single line, nested tables inline
    Raw,
    /// Single line, large nested tables as @id references
    Compact,
    /// One binding per line
    #[default]
    Indented,
    /// One binding per line with the file:line it was set at
    Annotated,
    /// One binding per line, each preceded by a #SRC comment
    Prefix,
}

impl std::fmt::Display for DumpMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            DumpMode::Raw => f.write_str("raw"),
            DumpMode::Compact => f.write_str("compact"),
            DumpMode::Indented => f.write_str("indented"),
            DumpMode::Annotated => f.write_str("annotated"),
            DumpMode::Prefix => f.write_str("prefix"),
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Default, Debug)]
pub enum OutputFormat {
    #[default]
    Fhicl,
    Json,
    Yaml,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Fhicl => f.write_str("fhicl"),
            OutputFormat::Json => f.write_str("json"),
            OutputFormat::Yaml => f.write_str("yaml"),
        }
    }
}
