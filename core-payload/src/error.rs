use thiserror::Error;

#[derive(Error, Debug)]
pub enum PayloadError {
    #[error("Malformed export payload: {0}")]
    Malformed(String),

    #[error("Payload serialization failed: {0}")]
    Write(String),
}

pub type Result<T> = std::result::Result<T, PayloadError>;
