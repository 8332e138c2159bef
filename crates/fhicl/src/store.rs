//! persistent blob store for registered parameter sets
//!
//! Parameter sets are persisted as rows of a two column table `ParameterSets(ID, PSetBlob)`,
//! where `ID` is the 40 hex digit content id and `PSetBlob` the compact string form.
use crate::error::{Error, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

/// Key to blob storage used by the registry for import and export
pub trait BlobStore {
    /// Create the table if it does not exist yet
    fn ensure_schema(&self) -> Result<()>;

    /// Drop all rows (and the table), then create it again
    fn recreate(&self) -> Result<()>;

    /// All `(id, blob)` rows
    fn rows(&self) -> Result<Vec<(String, String)>>;

    fn blob(&self, id: &str) -> Result<Option<String>>;

    /// Insert rows, keeping existing rows with the same id
    fn insert_or_ignore(&self, rows: &[(String, String)]) -> Result<()>;
}

const CREATE: &str = "CREATE TABLE IF NOT EXISTS ParameterSets(ID PRIMARY KEY, PSetBlob)";

impl BlobStore for Connection {
    fn ensure_schema(&self) -> Result<()> {
        self.execute_batch(CREATE)?;
        Ok(())
    }

    fn recreate(&self) -> Result<()> {
        self.execute_batch("DROP TABLE IF EXISTS ParameterSets")?;
        self.ensure_schema()
    }

    fn rows(&self) -> Result<Vec<(String, String)>> {
        self.ensure_schema()?;
        let mut statement = self.prepare("SELECT ID, PSetBlob FROM ParameterSets")?;
        let rows = statement
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<Result<Vec<(String, String)>, _>>()?;
        Ok(rows)
    }

    fn blob(&self, id: &str) -> Result<Option<String>> {
        self.ensure_schema()?;
        let blob = self
            .query_row(
                "SELECT PSetBlob FROM ParameterSets WHERE ID = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(blob)
    }

    fn insert_or_ignore(&self, rows: &[(String, String)]) -> Result<()> {
        self.ensure_schema()?;
        let transaction = self.unchecked_transaction()?;
        {
            let mut statement = transaction
                .prepare("INSERT OR IGNORE INTO ParameterSets(ID, PSetBlob) VALUES (?1, ?2)")?;
            for (id, blob) in rows {
                statement.execute(params![id, blob])?;
            }
        }
        transaction.commit()?;
        Ok(())
    }
}

/// Open (or create) a store file
pub fn open(path: impl AsRef<Path>) -> Result<Connection> {
    let path = path.as_ref();
    tracing::debug!(path=%path.display(), "opening parameter set store");
    Connection::open(path)
        .map_err(|e| Error::CantOpenDb(format!("{}: {e}", path.display())))
}

/// Private in-memory store
pub fn open_in_memory() -> Result<Connection> {
    Connection::open_in_memory().map_err(|e| Error::CantOpenDb(format!("in-memory store: {e}")))
}
