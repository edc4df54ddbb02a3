//! Error types and result utilities for toolbox operations.

use std::path::PathBuf;

use thiserror::Error;

use crate::savebox::SaveMode;

/// Convenience type alias for results that may contain ToolboxError
pub type ToolboxResult<T> = Result<T, ToolboxError>;

/// Error types that can occur while plotting, saving, loading or logging.
#[derive(Error, Debug)]
pub enum ToolboxError {
    /// A kernel array has more dimensions than the plotting routine supports.
    ///
    /// The order of a kernel is its number of dimensions.
    #[error(
        "Shape mismatch: the kernel is of order {order} (array has {order} dimensions), should be less or equal to {max}."
    )]
    OrderMismatch {
        /// Order (number of dimensions) of the array that was given.
        order: usize,
        /// Highest order supported by the routine.
        max: usize,
    },

    /// Error that occurs when array dimensions don't match expected values.
    ///
    /// This happens when a signal has too many dimensions, or when a signal
    /// and its axis vector have different lengths.
    #[error("Dimension mismatch error: {0}")]
    DimensionMismatch(String),

    /// The data handed to a save routine cannot be written in the requested mode.
    #[error("Wrong data type when using saving mode {mode} (given type is {given})")]
    WrongDataType {
        /// Mode that was requested.
        mode: SaveMode,
        /// Description of the data actually received.
        given: String,
    },

    /// None of the candidate files for a load request exist.
    #[error("No such file: '{}'", .0.display())]
    FileNotFound(PathBuf),

    /// The path specification cannot be turned into a directory.
    #[error("Invalid path specification: {0}")]
    InvalidPath(String),

    /// Error that occurs when invalid parameters are provided to an operation.
    #[error("Invalid parameter error: {0}")]
    InvalidParameter(String),

    /// A process stream is already owned by an active duplication.
    #[error("The {0} stream is already duplicated to a log file")]
    StreamBusy(&'static str),

    /// A figure or animation was asked to render into a format it cannot produce.
    #[error("Unsupported format: '{extension}' cannot be used for {target}")]
    UnsupportedFormat {
        /// File extension that was requested (without the dot).
        extension: String,
        /// What was being exported, e.g. "figure".
        target: &'static str,
    },

    /// Underlying I/O failure.
    #[error("I/O error while {operation}: {source}")]
    Io {
        /// What was being done when the failure happened.
        operation: String,
        /// The original error.
        #[source]
        source: std::io::Error,
    },

    /// Encoding or decoding of a persisted file failed.
    #[error("Serialization error ({format}): {details}")]
    Serialization {
        /// Name of the encoding involved.
        format: &'static str,
        /// Human readable description of the failure.
        details: String,
    },

    /// The rendering backend reported a failure.
    #[error("Plotting error: {0}")]
    Plotting(String),
}

impl ToolboxError {
    /// Create an I/O error with a description of the operation that failed.
    pub fn io<S: Into<String>>(operation: S, source: std::io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            source,
        }
    }

    /// Create a serialization error for the given format.
    pub fn serialization<S: Into<String>>(format: &'static str, details: S) -> Self {
        Self::Serialization {
            format,
            details: details.into(),
        }
    }

    /// Create a type mismatch error for a save mode.
    pub fn wrong_data_type<S: Into<String>>(mode: SaveMode, given: S) -> Self {
        Self::WrongDataType {
            mode,
            given: given.into(),
        }
    }

    /// Wrap a rendering backend error.
    pub fn plotting<E: std::fmt::Display>(err: E) -> Self {
        Self::Plotting(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_mismatch_message_names_order_and_bound() {
        let err = ToolboxError::OrderMismatch { order: 4, max: 3 };
        assert_eq!(
            err.to_string(),
            "Shape mismatch: the kernel is of order 4 (array has 4 dimensions), should be less or equal to 3."
        );
    }

    #[test]
    fn test_wrong_data_type_names_mode_and_type() {
        let err = ToolboxError::wrong_data_type(SaveMode::Npy, "mapping");
        let msg = err.to_string();
        assert!(msg.contains("npy"));
        assert!(msg.contains("mapping"));
    }

    #[test]
    fn test_io_error_keeps_source() {
        use std::error::Error as _;

        let err = ToolboxError::io(
            "opening log file",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(err.source().is_some());
        assert!(err.to_string().starts_with("I/O error while opening log file"));
    }
}
