//! Error types shared by every tensor operation

use thiserror::Error;

/// Errors that can occur during tensor operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TensorError {
    /// Operand shapes are incompatible for the requested operation
    #[error("Shape mismatch [{code}]: {message}\nOperation: {operation}\nLeft shape: {left_shape}\nRight shape: {right_shape}\nSuggestion: {suggestion}")]
    ShapeMismatch {
        /// Error code for programmatic handling
        code: &'static str,
        /// Human-readable error message
        message: String,
        /// The operation that failed
        operation: String,
        /// String representation of the left operand shape
        left_shape: String,
        /// String representation of the right operand shape
        right_shape: String,
        /// Suggested fix for the error
        suggestion: String,
    },

    /// Shapes could not be aligned under the broadcasting rule
    #[error("Broadcast error [{code}]: {message}\nOperation: {operation}\nAxis: {axis}\nSuggestion: {suggestion}")]
    Broadcast {
        /// Error code for programmatic handling
        code: &'static str,
        /// Human-readable error message, in NumPy's wording
        message: String,
        /// The operation that failed
        operation: String,
        /// Original (unaligned) left shape
        left_shape: Vec<usize>,
        /// Original (unaligned) right shape
        right_shape: Vec<usize>,
        /// Right-aligned axis position where the sizes disagree
        axis: usize,
        /// Suggested fix for the error
        suggestion: String,
    },

    /// An integer coordinate, axis or advanced-index entry is out of bounds
    #[error("Index out of range [{code}]: {message}\nIndex: {index}, Axis: {axis}, Size: {size}\nOperation: {operation}\nSuggestion: {suggestion}")]
    IndexOutOfRange {
        /// Error code for programmatic handling
        code: &'static str,
        /// Human-readable error message
        message: String,
        /// The offending index
        index: usize,
        /// The axis it was applied to
        axis: usize,
        /// The size of that axis
        size: usize,
        /// The operation that failed
        operation: String,
        /// Suggested fix for the error
        suggestion: String,
    },

    /// Structurally invalid parameters
    #[error("Invalid argument [{code}]: {message}\nOperation: {operation}\nSuggestion: {suggestion}")]
    InvalidArgument {
        /// Error code for programmatic handling
        code: &'static str,
        /// Human-readable error message
        message: String,
        /// The operation that failed
        operation: String,
        /// Suggested fix for the error
        suggestion: String,
    },

    /// Storage allocation failed
    #[error("Allocation failure [{code}]: {message}\nRequested: {requested} elements\nSuggestion: {suggestion}")]
    AllocationFailure {
        /// Error code for programmatic handling
        code: &'static str,
        /// Human-readable error message
        message: String,
        /// Number of elements requested
        requested: usize,
        /// Suggested fix for the error
        suggestion: String,
    },
}

/// Coarse classification of a [`TensorError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// See [`TensorError::ShapeMismatch`]
    ShapeMismatch,
    /// See [`TensorError::Broadcast`]
    Broadcast,
    /// See [`TensorError::IndexOutOfRange`]
    IndexOutOfRange,
    /// See [`TensorError::InvalidArgument`]
    InvalidArgument,
    /// See [`TensorError::AllocationFailure`]
    AllocationFailure,
}

/// Convenient result type for tensor operations
pub type Result<T> = std::result::Result<T, TensorError>;

impl TensorError {
    /// Create a shape mismatch error
    pub fn shape_mismatch<S1, S2, S3, S4, S5>(
        code: &'static str,
        message: S1,
        operation: S2,
        left_shape: S3,
        right_shape: S4,
        suggestion: S5,
    ) -> Self
    where
        S1: Into<String>,
        S2: Into<String>,
        S3: Into<String>,
        S4: Into<String>,
        S5: Into<String>,
    {
        Self::ShapeMismatch {
            code,
            message: message.into(),
            operation: operation.into(),
            left_shape: left_shape.into(),
            right_shape: right_shape.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Create a broadcast error
    pub fn broadcast<S1, S2, S3>(
        code: &'static str,
        message: S1,
        operation: S2,
        left_shape: &[usize],
        right_shape: &[usize],
        axis: usize,
        suggestion: S3,
    ) -> Self
    where
        S1: Into<String>,
        S2: Into<String>,
        S3: Into<String>,
    {
        Self::Broadcast {
            code,
            message: message.into(),
            operation: operation.into(),
            left_shape: left_shape.to_vec(),
            right_shape: right_shape.to_vec(),
            axis,
            suggestion: suggestion.into(),
        }
    }

    /// Create an index out of range error
    pub fn out_of_range<S1, S2, S3>(
        code: &'static str,
        message: S1,
        index: usize,
        axis: usize,
        size: usize,
        operation: S2,
        suggestion: S3,
    ) -> Self
    where
        S1: Into<String>,
        S2: Into<String>,
        S3: Into<String>,
    {
        Self::IndexOutOfRange {
            code,
            message: message.into(),
            index,
            axis,
            size,
            operation: operation.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Create an invalid argument error
    pub fn invalid_argument<S1, S2, S3>(
        code: &'static str,
        message: S1,
        operation: S2,
        suggestion: S3,
    ) -> Self
    where
        S1: Into<String>,
        S2: Into<String>,
        S3: Into<String>,
    {
        Self::InvalidArgument {
            code,
            message: message.into(),
            operation: operation.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Create an allocation failure error
    pub fn allocation_failure<S1, S2>(
        code: &'static str,
        message: S1,
        requested: usize,
        suggestion: S2,
    ) -> Self
    where
        S1: Into<String>,
        S2: Into<String>,
    {
        Self::AllocationFailure {
            code,
            message: message.into(),
            requested,
            suggestion: suggestion.into(),
        }
    }

    /// Returns the stable error code
    pub fn code(&self) -> &'static str {
        match self {
            Self::ShapeMismatch { code, .. }
            | Self::Broadcast { code, .. }
            | Self::IndexOutOfRange { code, .. }
            | Self::InvalidArgument { code, .. }
            | Self::AllocationFailure { code, .. } => *code,
        }
    }

    /// Returns the error kind
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ShapeMismatch { .. } => ErrorKind::ShapeMismatch,
            Self::Broadcast { .. } => ErrorKind::Broadcast,
            Self::IndexOutOfRange { .. } => ErrorKind::IndexOutOfRange,
            Self::InvalidArgument { .. } => ErrorKind::InvalidArgument,
            Self::AllocationFailure { .. } => ErrorKind::AllocationFailure,
        }
    }

    /// Returns whether this error reports incompatible shapes.
    ///
    /// Broadcast errors are a specialization of shape mismatches, so both
    /// kinds answer `true`.
    pub fn is_shape_mismatch(&self) -> bool {
        matches!(self.kind(), ErrorKind::ShapeMismatch | ErrorKind::Broadcast)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_and_kinds() {
        let err = TensorError::out_of_range(
            "TEST_OOR",
            "index 5 is out of bounds for axis 0 with size 3",
            5,
            0,
            3,
            "element access",
            "Use an index below the axis size",
        );
        assert_eq!(err.code(), "TEST_OOR");
        assert_eq!(err.kind(), ErrorKind::IndexOutOfRange);
        assert!(err.to_string().contains("Index: 5, Axis: 0, Size: 3"));
        assert!(!err.is_shape_mismatch());
    }

    #[test]
    fn test_broadcast_is_shape_mismatch() {
        let err = TensorError::broadcast(
            "TEST_BCAST",
            "operands could not be broadcast together with shapes (4, 3) (3, 4)",
            "add",
            &[4, 3],
            &[3, 4],
            1,
            "Align the shapes",
        );
        assert!(err.is_shape_mismatch());
        assert!(err.to_string().contains("(4, 3) (3, 4)"));
    }
}
