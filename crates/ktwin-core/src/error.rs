//! Unified error types for the KTWIN core.
//!
//! Every failure surfaced by the codec, the graph layer, the dispatchers and
//! the gateways is a [`KtwinError`]. Handlers return the same type, so the
//! dispatchers can propagate their errors without wrapping them.

use thiserror::Error;

// =============================================================================
// Core Errors
// =============================================================================

/// Errors that can occur while routing twin events.
#[derive(Debug, Clone, Error)]
pub enum KtwinError {
    /// The wire type or attributes of an inbound message are invalid.
    #[error("malformed envelope '{event_type}': {reason}")]
    MalformedEnvelope {
        /// The offending type string (may be empty).
        event_type: String,
        /// Why the envelope was rejected.
        reason: String,
    },

    /// The payload does not have the shape the caller asked for.
    #[error("failed to decode payload: {0}")]
    PayloadDecode(String),

    /// The payload could not be serialized to JSON.
    #[error("failed to encode payload: {0}")]
    PayloadEncode(String),

    /// A graph fragment could not be fetched or parsed.
    #[error("failed to load twin graph for '{instance}': {reason}")]
    GraphLoad {
        /// The seed instance being loaded.
        instance: String,
        /// Reason for failure.
        reason: String,
    },

    /// The source instance has no relationship with the given name.
    #[error("relationship {relationship} not found in twin instance {instance}")]
    RelationshipNotFound {
        /// Relationship name that was looked up.
        relationship: String,
        /// Source twin instance.
        instance: String,
    },

    /// No relationship in the graph points at the command's interface.
    #[error("twin instance {instance} does not have a relation with the target interface: {interface}")]
    NoRouteFound {
        /// Instance the command was addressed to.
        instance: String,
        /// Interface of the command.
        interface: String,
    },

    /// The event store rejected or failed a request.
    #[error("event store unavailable: {0}")]
    StoreUnavailable(String),

    /// The broker rejected or failed a publish.
    #[error("broker unavailable: {0}")]
    BrokerUnavailable(String),

    /// A command-only operation was given a non-command envelope.
    #[error("envelope '{event_type}' is not a command")]
    NotACommand {
        /// Wire type of the envelope.
        event_type: String,
    },

    /// Failure raised by a domain handler.
    #[error("{0}")]
    Handler(String),
}

impl KtwinError {
    /// Creates a malformed envelope error.
    pub fn malformed(event_type: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedEnvelope {
            event_type: event_type.into(),
            reason: reason.into(),
        }
    }

    /// Creates a graph load error.
    pub fn graph_load(instance: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::GraphLoad {
            instance: instance.into(),
            reason: reason.into(),
        }
    }

    /// Creates a handler error.
    pub fn handler(msg: impl Into<String>) -> Self {
        Self::Handler(msg.into())
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for core operations.
pub type KtwinResult<T> = Result<T, KtwinError>;
