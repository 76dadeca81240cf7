use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Malformed stream message: {0}")]
    Malformed(#[from] serde_json::Error),
}
