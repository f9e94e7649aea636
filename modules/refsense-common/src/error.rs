use thiserror::Error;

#[derive(Error, Debug)]
pub enum RefSenseError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unknown social post URL type: {0}")]
    UnknownUrlType(String),

    #[error("Post unavailable: {0}")]
    PostUnavailable(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}
