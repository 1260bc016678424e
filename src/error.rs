use std::fmt;

/// Result alias for `vmfcacg`.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by the mixture model, its trainer and the component fitters.
///
/// Numeric degeneracies (zero-norm vectors, empty classes, vanishing
/// denominators) are never reported here; they are stabilized in place.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// Input was empty.
    EmptyInput,

    /// A single axis length disagrees (usize).
    DimensionMismatch {
        /// Expected dimension.
        expected: usize,
        /// Found dimension.
        found: usize,
    },

    /// Shape mismatch (string description).
    ShapeMismatch {
        /// Expected shape description.
        expected: String,
        /// Actual shape description.
        actual: String,
    },

    /// Exactly one of `initialization` and `num_classes` must be supplied.
    AmbiguousInitialization {
        /// Whether an initial affiliation was supplied.
        initialization: bool,
        /// Whether a class count was supplied.
        num_classes: bool,
    },

    /// Invalid parameter value.
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Error message.
        message: &'static str,
    },

    /// The Hermitian eigen solver failed.
    Decomposition(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::EmptyInput => write!(f, "empty input provided"),
            Error::DimensionMismatch { expected, found } => {
                write!(f, "dimension mismatch: expected {expected}, found {found}")
            }
            Error::ShapeMismatch { expected, actual } => {
                write!(f, "shape mismatch: expected {expected}, actual {actual}")
            }
            Error::AmbiguousInitialization {
                initialization,
                num_classes,
            } => write!(
                f,
                "incompatible input combination: exactly one of initialization and \
                 num_classes has to be given (initialization given: {initialization}, \
                 num_classes given: {num_classes})"
            ),
            Error::InvalidParameter { name, message } => {
                write!(f, "invalid parameter '{name}': {message}")
            }
            Error::Decomposition(msg) => write!(f, "eigendecomposition failed: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_both_flags() {
        let err = Error::AmbiguousInitialization {
            initialization: true,
            num_classes: true,
        };
        let msg = err.to_string();
        assert!(msg.contains("initialization given: true"));
        assert!(msg.contains("num_classes given: true"));
    }

    #[test]
    fn display_shape_mismatch() {
        let err = Error::ShapeMismatch {
            expected: "(2, 3)".into(),
            actual: "(2, 4)".into(),
        };
        assert_eq!(err.to_string(), "shape mismatch: expected (2, 3), actual (2, 4)");
    }

    #[test]
    fn boxes_as_std_error() {
        let err: Box<dyn std::error::Error> = Box::new(Error::DimensionMismatch {
            expected: 2,
            found: 3,
        });
        assert_eq!(err.to_string(), "dimension mismatch: expected 2, found 3");
    }
}
