//! Custom error types for onnx-classify.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the onnx-classify library.
///
/// Every variant is fatal to a single classification run; nothing is retried.
#[derive(Error, Debug)]
pub enum Error {
    /// Failed to open or decode an image file.
    #[error("failed to load image from {path}: {source}")]
    ImageLoad {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// Decoded image size differs from the model's fixed input size.
    #[error(
        "image is {width}x{height}, model expects {expected_width}x{expected_height}"
    )]
    DimensionMismatch {
        expected_width: u32,
        expected_height: u32,
        width: u32,
        height: u32,
    },

    /// Failed to download a model.
    #[error("failed to download model {name}: {source}")]
    ModelDownload {
        name: String,
        #[source]
        source: reqwest::Error,
    },

    /// Failed to create an ONNX session from a model file.
    #[error("failed to load ONNX model {path}: {source}")]
    ModelLoad {
        path: PathBuf,
        #[source]
        source: ort::Error,
    },

    /// The inference engine reported a failure.
    #[error("model inference failed: {source}")]
    Inference {
        #[source]
        source: ort::Error,
    },

    /// The engine did not return a tensor under the requested name.
    #[error("inference engine returned no output named {name:?}")]
    MissingOutput { name: String },

    /// Shape mismatch in tensor operations.
    #[error("tensor shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch { expected: String, actual: String },

    /// Label lookup past the end of the label table.
    #[error("class index {index} out of range for label table of {len} entries")]
    IndexOutOfRange { index: usize, len: usize },

    /// Failed to read a label file.
    #[error("failed to read labels from {path}: {source}")]
    LabelLoad {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Softmax or arg-max over zero scores.
    #[error("model produced an empty score vector")]
    EmptyScores,

    /// Failed to create cache directory.
    #[error("failed to create cache directory {path}: {source}")]
    CacheDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Invalid parameter value.
    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter { name: String, reason: String },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn invalid_parameter(name: &str, reason: &str) -> Self {
        Self::InvalidParameter {
            name: name.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Result type alias for onnx-classify operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimension_mismatch_message() {
        let err = Error::DimensionMismatch {
            expected_width: 224,
            expected_height: 224,
            width: 300,
            height: 300,
        };
        assert_eq!(err.to_string(), "image is 300x300, model expects 224x224");
    }

    #[test]
    fn test_index_out_of_range_message() {
        let err = Error::IndexOutOfRange { index: 5, len: 3 };
        assert!(err.to_string().contains("index 5"));
        assert!(err.to_string().contains("3 entries"));
    }
}
