use mitmcheck_types::ParseError;

/// Errors from loading a record database.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("unable to parse record on line {line}: '{record}': {source}")]
    Parse {
        line: usize,
        record: String,
        source: ParseError,
    },
}
