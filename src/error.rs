use core::fmt;

/// Result alias for `cobweb-cuts`.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by clustering, selection and statistics primitives.
///
/// All of these are argument-validation failures: they are raised before any
/// work is done, so no tree is ever left partially modified.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// Input was empty.
    EmptyInput,

    /// Invalid parameter value.
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Error message.
        message: &'static str,
    },

    /// Requested cluster count is below what the tree can express.
    InvalidClusterCount {
        /// Requested count.
        requested: usize,
        /// Smallest count accepted.
        minimum: usize,
    },

    /// Sample size too small for a bias correction.
    InvalidSampleSize {
        /// Offending sample size.
        n: usize,
    },

    /// A weighted choice received a negative weight.
    NegativeWeight,

    /// No clustering in the split range could be selected.
    NoClustering {
        /// First split count that was requested.
        minsplit: usize,
    },

    /// Generic error with message.
    Other(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::EmptyInput => write!(f, "empty input provided"),
            Error::InvalidParameter { name, message } => {
                write!(f, "invalid parameter '{name}': {message}")
            }
            Error::InvalidClusterCount { requested, minimum } => {
                write!(f, "cannot cut {requested} clusters, need at least {minimum}")
            }
            Error::InvalidSampleSize { n } => {
                write!(f, "cannot apply correction for a sample size of {n}")
            }
            Error::NegativeWeight => write!(f, "all weights must be greater than or equal to 0"),
            Error::NoClustering { minsplit } => {
                write!(f, "no usable clustering at or after {minsplit} splits")
            }
            Error::Other(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for Error {}
