mod cli;

use fhicl::source::{Includer, SearchPath};
use fhicl::{Decode, KeyMode, ParameterSet, PrintMode};
use std::fmt::Display;

fn main() {
    use clap::Parser;
    let cli = cli::Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_env("FHICL_LOG"))
        .with_writer(std::io::stderr)
        .init();

    for new_path in cli.directory.iter() {
        match new_path.canonicalize() {
            Err(e) => {
                eprintln!(
                    "Failed to resolve path for -C/--directory {}\n{}",
                    new_path.display(),
                    e
                );
                std::process::exit(1);
            }
            Ok(cwd) => {
                if let Err(err) = std::env::set_current_dir(&cwd) {
                    eprintln!("Failed to set work directory to {}\n{}", cwd.display(), err,);
                    std::process::exit(1);
                }

                tracing::info!(directory=%cwd.display(), "Changed working directory");
            }
        }
    }

    let search_path = match &cli.lookup_path {
        Some(list) => SearchPath::parse(list),
        None => SearchPath::from_env("FHICL_FILE_PATH"),
    };
    tracing::debug!(directories=?search_path.directories(), "lookup path");

    let command_result = match cli.command {
        cli::Command::Get(get_cli) => get(get_cli, &search_path),
        cli::Command::Dump(dump_cli) => dump(dump_cli, &search_path),
    };

    if let Err(e) = command_result {
        for error in e.chain() {
            eprintln!("{error}")
        }
        std::process::exit(1);
    }
}

fn load(file: Option<&str>, search_path: &SearchPath) -> anyhow::Result<ParameterSet> {
    let Some(file) = file else {
        let stdin = std::io::read_to_string(std::io::stdin())?;
        let included = Includer::new(search_path).expand_text(&stdin)?;
        let table = fhicl::document::parse_included(&included, KeyMode::Dotted)?;
        return Ok(ParameterSet::make_from_table(&table)?);
    };

    Ok(ParameterSet::make_from_file(file, search_path)?)
}

fn atom<T: Decode + Display>(pset: &ParameterSet, key: &str) -> fhicl::Result<Vec<String>> {
    Ok(vec![pset.get::<T>(key)?.to_string()])
}

fn sequence<T: Decode + Display>(pset: &ParameterSet, key: &str) -> fhicl::Result<Vec<String>> {
    Ok(pset
        .get::<Vec<T>>(key)?
        .iter()
        .map(ToString::to_string)
        .collect())
}

/// Lines `fhicl get` prints
fn query(
    cli: &cli::GetCommand,
    pset: &ParameterSet,
    key: Option<&str>,
) -> anyhow::Result<Vec<String>> {
    use cli::AtomType::*;

    if cli.names_in {
        return Ok(match key {
            None => pset.get_names(),
            Some(key) => pset.get::<ParameterSet>(key)?.get_names(),
        });
    }

    let Some(key) = key else {
        anyhow::bail!("--atom-as and --sequence-of need a key");
    };

    let lines = match (cli.atom_as, cli.sequence_of) {
        (Some(Bool), _) => atom::<bool>(pset, key)?,
        (Some(Int), _) => atom::<i64>(pset, key)?,
        (Some(Uint), _) => atom::<u64>(pset, key)?,
        (Some(Float), _) => atom::<f64>(pset, key)?,
        (Some(String), _) => atom::<std::string::String>(pset, key)?,
        (None, Some(Bool)) => sequence::<bool>(pset, key)?,
        (None, Some(Int)) => sequence::<i64>(pset, key)?,
        (None, Some(Uint)) => sequence::<u64>(pset, key)?,
        (None, Some(Float)) => sequence::<f64>(pset, key)?,
        (None, Some(String)) => sequence::<std::string::String>(pset, key)?,
        (None, None) => anyhow::bail!("one of --atom-as, --sequence-of or --names-in is needed"),
    };
    Ok(lines)
}

pub fn get(cli: cli::GetCommand, search_path: &SearchPath) -> anyhow::Result<()> {
    let (key, file) = cli.key_and_file()?;
    let pset = load(Some(file), search_path)?;

    if let Some(key) = key {
        if cli.allow_missing && !pset.has_key(key) {
            tracing::debug!(key, "key not present, nothing to print");
            return Ok(());
        }
    }

    for line in query(&cli, &pset, key)? {
        println!("{line}");
    }
    Ok(())
}

pub fn dump(cli: cli::DumpCommand, search_path: &SearchPath) -> anyhow::Result<()> {
    use cli::DumpMode::*;

    let pset = load(cli.file.as_deref(), search_path)?;

    match cli.format {
        cli::OutputFormat::Fhicl => match cli.mode {
            Raw => println!("{pset}"),
            Compact => println!("{}", pset.to_compact_string()),
            Indented => print!("{}", pset.to_indented_string(0)?),
            Annotated => print!("{}", pset.to_indented_string_with(0, PrintMode::Annotated)?),
            Prefix => print!(
                "{}",
                pset.to_indented_string_with(0, PrintMode::PrefixAnnotated)?
            ),
        },
        cli::OutputFormat::Yaml => serde_yaml::to_writer(std::io::stdout(), &pset)?,
        cli::OutputFormat::Json => {
            serde_json::to_writer_pretty(std::io::stdout(), &pset)?;
            println!();
        }
    };

    Ok(())
}
