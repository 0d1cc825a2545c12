use std::result;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Type system error: {0}")]
    TypeSystem(String),
    #[error("Ambiguous type: {0}")]
    AmbiguousType(String),
    #[error("Unexpected type: {0}")]
    UnexpectedType(String),
    #[error("Wrong type: {0}")]
    WrongType(String),
    #[error("Object graph construction error: {0}")]
    Construction(String),
    #[error("Selector parse error: {0}")]
    SelectorParse(String),
    #[error("Selector error: {0}")]
    Selector(String),
    #[error("Not implemented by this backend: {0}")]
    Unimplemented(String),
    #[error("Generic error: {0}")]
    Generic(String),
}

pub type Result<T> = result::Result<T, Error>;

impl From<eyre::Report> for Error {
    fn from(err: eyre::Report) -> Self {
        Error::Generic(err.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Generic(err.to_string())
    }
}

impl From<String> for Error {
    fn from(msg: String) -> Self {
        Error::Generic(msg)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Generic(err.to_string())
    }
}
