//! Definition of errors.

use std::error::Error;
use std::fmt;

pub type Result<T, E = SaplingError> = std::result::Result<T, E>;

#[derive(Debug)]
pub enum SaplingError {
    NoParseFound(NoParseFoundError),
    MalformedProduction(MalformedProductionError),
    InvalidArgument(InvalidArgumentError),
    InvalidTree(InvalidTreeError),
    InvalidModel(InvalidModelError),
    DecodeError(bincode::error::DecodeError),
    EncodeError(bincode::error::EncodeError),
    IOError(std::io::Error),
}

impl SaplingError {
    pub(crate) fn no_parse_found<S>(root: S, n_words: usize) -> Self
    where
        S: Into<String>,
    {
        Self::NoParseFound(NoParseFoundError {
            root: root.into(),
            n_words,
        })
    }

    pub(crate) fn malformed_production<S>(production: S, arity: usize) -> Self
    where
        S: Into<String>,
    {
        Self::MalformedProduction(MalformedProductionError {
            production: production.into(),
            arity,
        })
    }

    pub(crate) fn invalid_argument<S>(arg: &'static str, msg: S) -> Self
    where
        S: Into<String>,
    {
        Self::InvalidArgument(InvalidArgumentError {
            arg,
            msg: msg.into(),
        })
    }

    pub(crate) fn invalid_tree<S>(msg: S) -> Self
    where
        S: Into<String>,
    {
        Self::InvalidTree(InvalidTreeError { msg: msg.into() })
    }

    pub(crate) fn invalid_model<S>(msg: S) -> Self
    where
        S: Into<String>,
    {
        Self::InvalidModel(InvalidModelError { msg: msg.into() })
    }

    /// Returns `true` if the error only concerns a single sentence, so the caller may skip it and
    /// continue with the next one.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::NoParseFound(_))
    }
}

impl fmt::Display for SaplingError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::NoParseFound(e) => e.fmt(f),
            Self::MalformedProduction(e) => e.fmt(f),
            Self::InvalidArgument(e) => e.fmt(f),
            Self::InvalidTree(e) => e.fmt(f),
            Self::InvalidModel(e) => e.fmt(f),
            Self::DecodeError(e) => e.fmt(f),
            Self::EncodeError(e) => e.fmt(f),
            Self::IOError(e) => e.fmt(f),
        }
    }
}

impl Error for SaplingError {}

/// Error used when the root symbol cannot be derived over the whole sentence.
#[derive(Debug)]
pub struct NoParseFoundError {
    /// Requested root symbol.
    pub(crate) root: String,

    /// Length of the sentence.
    pub(crate) n_words: usize,
}

impl fmt::Display for NoParseFoundError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "NoParseFoundError: `{}` is not derivable over {} words",
            self.root, self.n_words
        )
    }
}

impl Error for NoParseFoundError {}

/// Error used when a binarized production has neither one nor two children.
#[derive(Debug)]
pub struct MalformedProductionError {
    /// Text of the production.
    pub(crate) production: String,

    /// Number of children.
    pub(crate) arity: usize,
}

impl fmt::Display for MalformedProductionError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "MalformedProductionError: {} has {} children",
            self.production, self.arity
        )
    }
}

impl Error for MalformedProductionError {}

/// Error used when the argument is invalid.
#[derive(Debug)]
pub struct InvalidArgumentError {
    /// Name of the argument.
    pub(crate) arg: &'static str,

    /// Error message.
    pub(crate) msg: String,
}

impl fmt::Display for InvalidArgumentError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "InvalidArgumentError: {}: {}", self.arg, self.msg)
    }
}

impl Error for InvalidArgumentError {}

/// Error used when bracketed text cannot be read as a tree.
#[derive(Debug)]
pub struct InvalidTreeError {
    /// Error message.
    pub(crate) msg: String,
}

impl fmt::Display for InvalidTreeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "InvalidTreeError: {}", self.msg)
    }
}

impl Error for InvalidTreeError {}

/// Error used when the model is invalid.
#[derive(Debug)]
pub struct InvalidModelError {
    /// Error message.
    pub(crate) msg: String,
}

impl fmt::Display for InvalidModelError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "InvalidModelError: {}", self.msg)
    }
}

impl Error for InvalidModelError {}

impl From<bincode::error::DecodeError> for SaplingError {
    fn from(error: bincode::error::DecodeError) -> Self {
        Self::DecodeError(error)
    }
}

impl From<bincode::error::EncodeError> for SaplingError {
    fn from(error: bincode::error::EncodeError) -> Self {
        Self::EncodeError(error)
    }
}

impl From<std::io::Error> for SaplingError {
    fn from(error: std::io::Error) -> Self {
        Self::IOError(error)
    }
}
