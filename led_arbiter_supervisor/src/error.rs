use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Core(#[from] led_arbiter_core::Error),

    #[error("unrecognised input: {line:?}")]
    Parse { line: String },

    #[error("failed to initialise logging: {0}")]
    Logging(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn parse(line: impl Into<String>) -> Self {
        Self::Parse { line: line.into() }
    }
}
