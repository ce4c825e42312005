use thiserror::Error;

use crate::relay::protocol::MessageType;

/// Malformed location data. Raised eagerly when an annotation is built; it
/// points at a bug upstream, not at the current page state.
#[derive(Debug, Error, PartialEq)]
pub enum LocationError {
    #[error("offset {axis}={value} is outside [0, 1]")]
    OffsetOutOfRange { axis: &'static str, value: f64 },

    #[error("element identifier is present but empty")]
    EmptyIdentifier,

    #[error("tree location is missing additionalTargetData.reactTree.key")]
    MissingTreeKey,

    #[error("{kind} location has an empty selector")]
    EmptySelector { kind: &'static str },

    #[error("highlighted text location has no text to match")]
    EmptyHighlightedText,

    #[error("chart location is missing {field}")]
    IncompleteChart { field: &'static str },
}

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("no response to {kind:?} request {id} within {timeout_ms}ms")]
    Timeout {
        id: String,
        kind: MessageType,
        timeout_ms: u64,
    },

    #[error("malformed relay frame: {0}")]
    Malformed(#[source] serde_json::Error),

    #[error("failed to encode {context}: {source}")]
    Encode {
        context: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to decode {kind:?} payload: {source}")]
    Decode {
        kind: MessageType,
        #[source]
        source: serde_json::Error,
    },

    #[error("no handler registered for {0:?}")]
    NoHandler(MessageType),

    #[error("response channel for {0} closed before a result arrived")]
    Closed(String),
}

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("could not read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("could not parse {context}: {source}")]
    Parse {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("node {node} references unknown parent {parent}")]
    UnknownParent { node: u64, parent: u64 },

    #[error("node {0} is its own ancestor")]
    ParentCycle(u64),

    #[error("duplicate node id {0}")]
    DuplicateNode(u64),

    #[error("frame id {0} is used more than once")]
    DuplicateFrame(String),

    #[error("{owner} references unknown element {node}")]
    UnknownElement { owner: String, node: u64 },
}
