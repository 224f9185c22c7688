/// Errors produced while parsing fingerprint and signature text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("bad field count in '{input}': expected {expected}, got {actual}")]
    FieldCount {
        input: String,
        expected: usize,
        actual: usize,
    },
    #[error("empty element in list '{0}'")]
    EmptyElement(String),
    #[error("invalid hex value '{0}'")]
    InvalidHex(String),
    #[error("invalid integer '{0}'")]
    InvalidInt(String),
    #[error("invalid version '{0}'")]
    InvalidVersion(String),
    #[error("version signature: {0}")]
    VersionOrder(&'static str),
    #[error("invalid mitm info '{0}'")]
    InvalidMitmInfo(String),
}
