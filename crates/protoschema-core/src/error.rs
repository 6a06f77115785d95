//! Error types for schema synthesis.

use thiserror::Error;

/// Errors that abort synthesis for a compilation unit.
///
/// All of these are deterministic structural faults in the input; none are
/// retried.
#[derive(Debug, Error)]
pub enum SynthesisError {
    /// Field kind outside the closed protobuf set
    #[error("Unsupported field kind {kind} on {type_name}.{field}")]
    UnsupportedFieldKind {
        type_name: String,
        field: String,
        kind: String,
    },

    /// A referenced type was not selected or is unknown to the descriptor pool
    #[error("Unresolved reference to {target} from {type_name}{}", field.as_deref().map(|f| format!(".{f}")).unwrap_or_default())]
    UnresolvedReference {
        type_name: String,
        field: Option<String>,
        target: String,
    },

    /// An option overlay value that cannot be interpreted
    #[error("Malformed option on {scope}: {message}")]
    MalformedOption { scope: String, message: String },

    /// Synthesis was requested for a type the pool does not know
    #[error("Unknown message type: {0}")]
    UnknownType(String),

    /// Emitting a schema document failed
    #[error("Failed to serialize schema for {type_name}: {source}")]
    Serialize {
        type_name: String,
        #[source]
        source: serde_json::Error,
    },
}

impl SynthesisError {
    pub(crate) fn malformed(scope: impl Into<String>, message: impl Into<String>) -> Self {
        SynthesisError::MalformedOption {
            scope: scope.into(),
            message: message.into(),
        }
    }
}

/// Result type for synthesis operations.
pub type SynthResult<T> = Result<T, SynthesisError>;
