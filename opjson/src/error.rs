//! Error types for JSON encoding.

use core::fmt::{self, Display};

use opjson_core::BoxError;

/// Error returned when a value cannot be encoded.
#[derive(Debug)]
pub enum EncodeError {
    /// The value has no JSON form: NaN or infinite floats, or a reference
    /// cycle.
    UnsupportedValue {
        /// Type of the offending value
        type_name: &'static str,
        /// What was wrong with it
        message: String,
    },
    /// A [`MarshalJson`](opjson_core::MarshalJson) or
    /// [`MarshalText`](opjson_core::MarshalText) hook failed.
    MarshalerError {
        /// Type whose hook failed
        type_name: &'static str,
        /// The hook's error
        source: BoxError,
    },
    /// A JSON hook returned no bytes.
    EmptyMarshalResult {
        /// Type whose hook returned nothing
        type_name: &'static str,
    },
    /// A JSON hook returned bytes that are not a single JSON value.
    InvalidMarshalOutput {
        /// Type whose hook misbehaved
        type_name: &'static str,
        /// What was wrong with the output
        message: String,
    },
    /// The type has no JSON form.
    UnsupportedType {
        /// The offending type
        type_name: &'static str,
        /// Why it cannot be encoded
        reason: &'static str,
    },
    /// The encoded output is not valid UTF-8. Only reachable through a bug
    /// in the encoder.
    Utf8(std::string::FromUtf8Error),
    /// Writing the output failed.
    Io(std::io::Error),
}

impl EncodeError {
    /// Get an error code for this kind of error.
    pub const fn code(&self) -> &'static str {
        match self {
            EncodeError::UnsupportedValue { .. } => "json::unsupported_value",
            EncodeError::MarshalerError { .. } => "json::marshaler",
            EncodeError::EmptyMarshalResult { .. } => "json::empty_marshal_result",
            EncodeError::InvalidMarshalOutput { .. } => "json::invalid_marshal_output",
            EncodeError::UnsupportedType { .. } => "json::unsupported_type",
            EncodeError::Utf8(_) => "json::utf8",
            EncodeError::Io(_) => "json::io",
        }
    }

    pub(crate) fn unsupported_value(type_name: &'static str, message: impl Into<String>) -> Self {
        EncodeError::UnsupportedValue {
            type_name,
            message: message.into(),
        }
    }
}

impl Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EncodeError::UnsupportedValue { type_name, message } => {
                write!(f, "unsupported value of type {type_name}: {message}")
            }
            EncodeError::MarshalerError { type_name, source } => {
                write!(f, "error calling marshal hook for type {type_name}: {source}")
            }
            EncodeError::EmptyMarshalResult { type_name } => {
                write!(f, "marshal hook for type {type_name} returned no output")
            }
            EncodeError::InvalidMarshalOutput { type_name, message } => {
                write!(f, "marshal hook for type {type_name} returned invalid JSON: {message}")
            }
            EncodeError::UnsupportedType { type_name, reason } => {
                write!(f, "unsupported type {type_name}: {reason}")
            }
            EncodeError::Utf8(e) => write!(f, "encoded output is not valid UTF-8: {e}"),
            EncodeError::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl std::error::Error for EncodeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EncodeError::MarshalerError { source, .. } => Some(&**source),
            EncodeError::Utf8(e) => Some(e),
            EncodeError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for EncodeError {
    fn from(e: std::io::Error) -> Self {
        EncodeError::Io(e)
    }
}

/// Result type for JSON encoding
pub type Result<T> = core::result::Result<T, EncodeError>;

impl From<std::string::FromUtf8Error> for EncodeError {
    fn from(e: std::string::FromUtf8Error) -> Self {
        EncodeError::Utf8(e)
    }
}
