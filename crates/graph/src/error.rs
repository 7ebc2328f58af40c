//! Error types for dependency graph operations.

use miette::Diagnostic;
use thiserror::Error;

/// Result type for dependency graph operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building or tagging a dependency graph.
#[derive(Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
pub enum Error {
    /// The coordinate triples do not describe a lower-triangular matrix.
    #[error("Invalid matrix input: {message}")]
    #[diagnostic(
        code(amsla::graph::input_shape),
        help(
            "Row, column and weight sequences must have equal length, use 1-based indices and satisfy row >= column"
        )
    )]
    InputShape {
        /// Description of the offending input.
        message: String,
    },

    /// A single batch assigned two different values to the same key.
    #[error("Ambiguous assignment in the {layer} layer for key {key}")]
    #[diagnostic(
        code(amsla::graph::ambiguous_assignment),
        help("Each node or edge may receive at most one value per batch")
    )]
    AmbiguousAssignment {
        /// Name of the tag layer being written.
        layer: &'static str,
        /// Index of the node or edge that was assigned twice.
        key: usize,
    },

    /// A query referenced a node that is not part of the graph.
    #[error("Node {index} is not part of the graph")]
    #[diagnostic(code(amsla::graph::unknown_node))]
    UnknownNode {
        /// 1-based index that was requested.
        index: usize,
    },
}

impl Error {
    /// Create an input shape error.
    #[must_use]
    pub fn input_shape(message: impl Into<String>) -> Self {
        Self::InputShape {
            message: message.into(),
        }
    }
}
