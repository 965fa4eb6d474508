//! Parsing of the wire type string.
//!
//! Every envelope travels with a type of the form
//! `<namespace>.<kind>.<interface>[.<command>]`:
//!
//! ```text
//! ktwin.real.ngsi-ld-city-offstreetparkingspot
//! ktwin.virtual.ngsi-ld-city-airqualityobserved
//! ktwin.command.ngsi-ld-city-offstreetparking.updatevehiclecount
//! ktwin.store.ngsi-ld-city-offstreetparking
//! ```
//!
//! [`EventType`] is the validated form; it is produced once at the boundary
//! and never re-split afterwards.

use std::fmt;
use std::str::FromStr;

use crate::error::{KtwinError, KtwinResult};

/// Default namespace of every KTWIN type string.
pub const DEFAULT_NAMESPACE: &str = "ktwin";

// ============================================================================
// Envelope Kind
// ============================================================================

/// Category of an envelope.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EnvelopeKind {
    /// Observation produced by a real device (`real`).
    Observation,
    /// Event derived by a virtual twin (`virtual`).
    Derived,
    /// Command addressed to a twin (`command`).
    Command {
        /// Command name as carried on the wire.
        name: String,
    },
    /// State echoed by the event store (`store`).
    Stored,
}

impl EnvelopeKind {
    /// Creates a command kind.
    pub fn command(name: impl Into<String>) -> Self {
        Self::Command { name: name.into() }
    }

    /// Returns the token used for this kind in the type string.
    pub fn wire_token(&self) -> &'static str {
        match self {
            Self::Observation => "real",
            Self::Derived => "virtual",
            Self::Command { .. } => "command",
            Self::Stored => "store",
        }
    }

    /// Returns the command name, if this is a command.
    pub fn command_name(&self) -> Option<&str> {
        match self {
            Self::Command { name } => Some(name),
            _ => None,
        }
    }

    /// Returns `true` for [`EnvelopeKind::Command`].
    pub fn is_command(&self) -> bool {
        matches!(self, Self::Command { .. })
    }
}

// ============================================================================
// Event Type
// ============================================================================

/// A validated wire type string.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EventType {
    namespace: String,
    kind: EnvelopeKind,
    interface: String,
}

impl EventType {
    /// Creates an event type from its parts.
    ///
    /// Fails if the namespace, interface or command name is empty or contains
    /// a dot, since the result could not be parsed back.
    pub fn new(
        namespace: impl Into<String>,
        kind: EnvelopeKind,
        interface: impl Into<String>,
    ) -> KtwinResult<Self> {
        let event_type = Self {
            namespace: namespace.into(),
            kind,
            interface: interface.into(),
        };

        let mut parts = vec![event_type.namespace.as_str(), event_type.interface.as_str()];
        if let Some(name) = event_type.kind.command_name() {
            parts.push(name);
        }
        if parts.iter().any(|p| p.is_empty() || p.contains('.')) {
            return Err(KtwinError::malformed(
                event_type.to_string(),
                "type segments must be non-empty and must not contain '.'",
            ));
        }

        Ok(event_type)
    }

    /// Returns the namespace segment.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Returns the envelope kind.
    pub fn kind(&self) -> &EnvelopeKind {
        &self.kind
    }

    /// Returns the twin interface segment.
    pub fn interface(&self) -> &str {
        &self.interface
    }

    /// Splits this type into its kind and interface.
    pub(crate) fn into_parts(self) -> (EnvelopeKind, String) {
        (self.kind, self.interface)
    }

    /// Returns a copy of this type with another kind.
    pub fn with_kind(&self, kind: EnvelopeKind) -> KtwinResult<Self> {
        Self::new(self.namespace.clone(), kind, self.interface.clone())
    }
}

impl FromStr for EventType {
    type Err = KtwinError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let segments: Vec<&str> = s.split('.').collect();

        if segments.len() < 3 {
            return Err(KtwinError::malformed(
                s,
                format!("expected at least 3 segments, got {}", segments.len()),
            ));
        }
        if segments.len() > 4 {
            return Err(KtwinError::malformed(
                s,
                format!("expected at most 4 segments, got {}", segments.len()),
            ));
        }
        if segments.iter().any(|seg| seg.is_empty()) {
            return Err(KtwinError::malformed(s, "empty type segment"));
        }

        let kind = match (segments[1], segments.get(3)) {
            ("command", Some(name)) => EnvelopeKind::command(*name),
            ("command", None) => {
                return Err(KtwinError::malformed(s, "command name not found"));
            }
            (_, Some(_)) => {
                return Err(KtwinError::malformed(
                    s,
                    "only command types carry a fourth segment",
                ));
            }
            ("real", None) => EnvelopeKind::Observation,
            ("virtual", None) => EnvelopeKind::Derived,
            ("store", None) => EnvelopeKind::Stored,
            (other, None) => {
                return Err(KtwinError::malformed(
                    s,
                    format!("unknown event kind '{other}'"),
                ));
            }
        };

        Ok(Self {
            namespace: segments[0].to_string(),
            kind,
            interface: segments[2].to_string(),
        })
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{}",
            self.namespace,
            self.kind.wire_token(),
            self.interface
        )?;
        if let Some(name) = self.kind.command_name() {
            write!(f, ".{name}")?;
        }
        Ok(())
    }
}
