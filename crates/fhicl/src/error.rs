//! error taxonomy
//!
//! Every failure surfaced by this crate is an [Error]. The variants map onto a flat set of
//! categories ([ErrorCategory]) so callers can branch on the kind of failure without matching on
//! messages. Wrapping errors keep their cause reachable through [std::error::Error::source].

/// Flat error category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    ParseError,
    CantFind,
    CantInsert,
    TypeMismatch,
    ProtectionViolation,
    CantOpenDb,
    SqlError,
    Unimplemented,
    Other,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            ErrorCategory::ParseError => "parse_error",
            ErrorCategory::CantFind => "cant_find",
            ErrorCategory::CantInsert => "cant_insert",
            ErrorCategory::TypeMismatch => "type_mismatch",
            ErrorCategory::ProtectionViolation => "protection_violation",
            ErrorCategory::CantOpenDb => "cant_open_db",
            ErrorCategory::SqlError => "sql_error",
            ErrorCategory::Unimplemented => "unimplemented",
            ErrorCategory::Other => "other",
        })
    }
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("{message}\ndetected at or near line {line}, character {column}{}", in_file(.file))]
    Parse {
        message: String,
        line: usize,
        column: usize,
        file: Option<String>,
        #[source]
        cause: Option<Box<Error>>,
    },
    #[error("can't find key \"{key}\"{}", with_detail(.detail))]
    CantFind { key: String, detail: String },
    #[error("can't insert: {0}")]
    CantInsert(String),
    #[error("type mismatch: {message}")]
    TypeMismatch {
        message: String,
        #[source]
        cause: Option<Box<Error>>,
    },
    #[error("protection violation: {0}")]
    ProtectionViolation(String),
    #[error("can't open database: {0}")]
    CantOpenDb(String),
    #[error("sql error")]
    Sql(#[from] rusqlite::Error),
    #[error("unimplemented: {0}")]
    Unimplemented(String),
    #[error("{0}")]
    Other(String),
    #[error("invalid configuration:\n{0}")]
    Validation(String),
}

fn in_file(file: &Option<String>) -> String {
    file.as_ref()
        .map(|file| format!(" of file \"{file}\""))
        .unwrap_or_default()
}

fn with_detail(detail: &str) -> String {
    if detail.is_empty() {
        String::new()
    } else {
        format!(" {detail}")
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Parse { .. } => ErrorCategory::ParseError,
            Error::CantFind { .. } => ErrorCategory::CantFind,
            Error::CantInsert(_) => ErrorCategory::CantInsert,
            Error::TypeMismatch { .. } => ErrorCategory::TypeMismatch,
            Error::ProtectionViolation(_) => ErrorCategory::ProtectionViolation,
            Error::CantOpenDb(_) => ErrorCategory::CantOpenDb,
            Error::Sql(_) => ErrorCategory::SqlError,
            Error::Unimplemented(_) => ErrorCategory::Unimplemented,
            Error::Other(_) | Error::Validation(_) => ErrorCategory::Other,
        }
    }

    /// Innermost error of this crate in the cause chain
    pub fn root_cause(&self) -> &Error {
        let mut current = self;
        loop {
            match current {
                Error::Parse {
                    cause: Some(cause), ..
                }
                | Error::TypeMismatch {
                    cause: Some(cause), ..
                } => current = cause,
                _ => return current,
            }
        }
    }

    pub fn cant_find(key: impl Into<String>) -> Self {
        Error::CantFind {
            key: key.into(),
            detail: String::new(),
        }
    }

    pub fn cant_find_at(key: impl Into<String>, detail: impl Into<String>) -> Self {
        Error::CantFind {
            key: key.into(),
            detail: detail.into(),
        }
    }

    pub fn type_mismatch(message: impl Into<String>) -> Self {
        Error::TypeMismatch {
            message: message.into(),
            cause: None,
        }
    }

    pub fn type_mismatch_caused_by(message: impl Into<String>, cause: Error) -> Self {
        Error::TypeMismatch {
            message: message.into(),
            cause: Some(Box::new(cause)),
        }
    }

    /// Wrap a failure that happened while processing text at `line`/`column`
    pub(crate) fn parse_caused_by(
        message: impl Into<String>,
        location: crate::source::Location,
        cause: Error,
    ) -> Self {
        Error::Parse {
            message: message.into(),
            line: location.line,
            column: location.column,
            file: location.file,
            cause: Some(Box::new(cause)),
        }
    }

    pub(crate) fn parse(message: impl Into<String>, location: crate::source::Location) -> Self {
        Error::Parse {
            message: message.into(),
            line: location.line,
            column: location.column,
            file: location.file,
            cause: None,
        }
    }

    /// `(line, column)` of a parse error
    pub fn position(&self) -> Option<(usize, usize)> {
        match self {
            Error::Parse { line, column, .. } => Some((*line, *column)),
            _ => None,
        }
    }
}
