//! Foundation layer - the envelope model and its wire form.
//!
//! This module contains the types every service handles:
//! - Type strings parsed into a tagged kind
//! - The decoded envelope with an opaque JSON payload
//! - The CloudEvents-shaped wire message
//! - The codec and its injectable clock and id source

pub mod clock;
pub mod envelope;
pub mod event_type;
pub mod wire;

pub use clock::{Clock, FixedClock, FixedId, IdSource, SystemClock, UuidSource};
pub use envelope::{Envelope, EnvelopeCodec};
pub use event_type::{DEFAULT_NAMESPACE, EnvelopeKind, EventType};
pub use wire::{CONTENT_TYPE_JSON, CONTENT_TYPE_STRUCTURED, SPEC_VERSION, WireMessage};
