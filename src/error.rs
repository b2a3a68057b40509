use thiserror::Error;

use crate::document::AttributeKind;

#[derive(Error, Debug)]
pub enum EditorError {
    /// A formatting write carried a value the attribute cannot hold.
    #[error("invalid value for {attribute}: {value}")]
    InvalidAttributeValue {
        attribute: AttributeKind,
        value: String,
    },

    #[error("malformed input: {0}")]
    MalformedUserInput(String),

    #[error("speech recognition unavailable: {0}")]
    RecognitionUnavailable(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, EditorError>;
