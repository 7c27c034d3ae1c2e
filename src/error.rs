//! Error types for document reconciliation and view building.

use thiserror::Error;

/// Errors raised by the reconciliation engine and the node view builder.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Merge recursion reached the nesting limit without bottoming out.
    #[error("the level of json exceeds the max limit ({max}) at '{path}'")]
    DepthExceeded { max: usize, path: String },

    /// A capacity or usage string is not a valid resource quantity.
    #[error("invalid quantity '{input}': {reason}")]
    Quantity { input: String, reason: String },

    /// A document fragment does not match the shape expected for its key.
    #[error("failed to decode {what}: {source}")]
    Decode {
        what: String,
        #[source]
        source: serde_json::Error,
    },

    /// A typed value failed to serialize into (or out of) a document.
    #[error("serialization error during {op}: {source}")]
    Serialization {
        op: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

impl Error {
    pub(crate) fn quantity(input: &str, reason: impl Into<String>) -> Self {
        Self::Quantity {
            input: input.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn decode(what: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Decode {
            what: what.into(),
            source,
        }
    }

    pub(crate) fn serialization(op: &'static str, source: serde_json::Error) -> Self {
        Self::Serialization { op, source }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn depth_exceeded_names_limit_and_path() {
        let err = Error::DepthExceeded {
            max: 5,
            path: "a.b.c.d.e".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("(5)"));
        assert!(msg.contains("a.b.c.d.e"));
    }

    #[test]
    fn decode_keeps_source() {
        let source = serde_json::from_str::<u32>("\"x\"").unwrap_err();
        let err = Error::decode("report.apps", source);
        assert!(err.to_string().starts_with("failed to decode report.apps"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn quantity_error_message() {
        let err = Error::quantity("12Q", "unknown suffix 'Q'");
        assert_eq!(err.to_string(), "invalid quantity '12Q': unknown suffix 'Q'");
    }
}
