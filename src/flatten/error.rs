use thiserror::Error;

/// Failures that leave the array stream in an unknown position.
///
/// Any of these ends the run.
#[derive(Debug, Error)]
pub enum StreamError {
    #[error("failed to read input")]
    Io(#[from] std::io::Error),

    #[error("input is empty, expected a JSON array")]
    Empty,

    #[error("expected '[' at start of input, found byte {found:#04x}")]
    MissingArrayStart { found: u8 },

    #[error("expected ',' or ']' after element {index}, found byte {found:#04x}")]
    MissingSeparator { index: u64, found: u8 },

    #[error("failed to decode element {index}")]
    Decode {
        index: u64,
        #[source]
        source: serde_json::Error,
    },

    #[error("expected ']' to close the array, found byte {found:#04x}")]
    MissingArrayEnd { found: u8 },
}

/// Failures confined to a single record; the record is skipped and the run continues
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("failed to parse {field} {value:?}: {source}")]
    Timestamp {
        field: &'static str,
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("failed to encode output record: {0}")]
    Encode(#[source] serde_json::Error),
}
