//! The generic event envelope and its codec.
//!
//! An [`Envelope`] is what handlers see: the kind, the twin it concerns and an
//! opaque JSON payload. The [`EnvelopeCodec`] converts between envelopes and
//! [`WireMessage`]s:
//!
//! ```text
//! WireMessage { type: "ktwin.command.<iface>.<cmd>", source: "<instance>" }
//!        │ decode                                     ▲ encode / to_wire
//!        ▼                                            │
//! Envelope { kind: Command { name }, interface, instance_id, payload }
//! ```

use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;

use super::clock::{Clock, IdSource, SystemClock, UuidSource};
use super::event_type::{DEFAULT_NAMESPACE, EnvelopeKind, EventType};
use super::wire::{CONTENT_TYPE_JSON, SPEC_VERSION, WireMessage};
use crate::error::{KtwinError, KtwinResult};

// ============================================================================
// Envelope
// ============================================================================

/// A decoded twin event.
///
/// Identity fields are fixed at creation. Only the payload can be replaced,
/// which is how handlers update the latest stored state before persisting it
/// again.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    id: String,
    kind: EnvelopeKind,
    interface: String,
    instance_id: String,
    timestamp: DateTime<Utc>,
    subject: Option<String>,
    payload: Vec<u8>,
}

impl Envelope {
    /// Returns the event id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the envelope kind.
    pub fn kind(&self) -> &EnvelopeKind {
        &self.kind
    }

    /// Returns the twin interface name.
    pub fn interface(&self) -> &str {
        &self.interface
    }

    /// Returns the twin instance id.
    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    /// Returns the event timestamp.
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Returns the subject attribute, if any.
    pub fn subject(&self) -> Option<&str> {
        self.subject.as_deref()
    }

    /// Returns the command name, if this is a command.
    pub fn command_name(&self) -> Option<&str> {
        self.kind.command_name()
    }

    /// Returns the command name or fails with [`KtwinError::NotACommand`].
    pub fn require_command(&self) -> KtwinResult<&str> {
        self.kind
            .command_name()
            .ok_or_else(|| KtwinError::NotACommand {
                event_type: format!("{}.{}", self.kind.wire_token(), self.interface),
            })
    }

    /// Returns the raw payload bytes.
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Deserializes the payload into `T`.
    pub fn decode_payload<T: DeserializeOwned>(&self) -> KtwinResult<T> {
        serde_json::from_slice(&self.payload).map_err(|e| {
            KtwinError::PayloadDecode(format!(
                "{} payload of {}: {e}",
                self.interface, self.instance_id
            ))
        })
    }

    /// Replaces the payload with the JSON form of `value`.
    pub fn set_payload<T: Serialize>(&mut self, value: &T) -> KtwinResult<()> {
        self.payload =
            serde_json::to_vec(value).map_err(|e| KtwinError::PayloadEncode(e.to_string()))?;
        Ok(())
    }
}

// ============================================================================
// Codec
// ============================================================================

/// Converts envelopes to and from wire messages.
///
/// The codec is pure: time and ids come from the injected [`Clock`] and
/// [`IdSource`].
#[derive(Debug, Clone)]
pub struct EnvelopeCodec {
    namespace: String,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdSource>,
}

impl Default for EnvelopeCodec {
    fn default() -> Self {
        Self::new(DEFAULT_NAMESPACE)
    }
}

impl EnvelopeCodec {
    /// Creates a codec for the given namespace using the system clock.
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            clock: Arc::new(SystemClock),
            ids: Arc::new(UuidSource),
        }
    }

    /// Replaces the clock.
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Replaces the id source.
    pub fn with_ids(mut self, ids: impl IdSource + 'static) -> Self {
        self.ids = Arc::new(ids);
        self
    }

    /// Returns the namespace written on encode.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Decodes a wire message into an envelope.
    pub fn decode(&self, msg: &WireMessage) -> KtwinResult<Envelope> {
        let event_type: EventType = msg.event_type.parse()?;

        if msg.source.is_empty() {
            return Err(KtwinError::malformed(&msg.event_type, "missing source"));
        }

        let timestamp = match msg.time.as_deref() {
            Some(raw) if !raw.is_empty() => DateTime::parse_from_rfc3339(raw)
                .map(|t| t.with_timezone(&Utc))
                .map_err(|e| {
                    KtwinError::malformed(&msg.event_type, format!("invalid time '{raw}': {e}"))
                })?,
            _ => self.clock.now(),
        };

        let id = if msg.id.is_empty() {
            self.ids.next_id()
        } else {
            msg.id.clone()
        };

        let (kind, interface) = event_type.into_parts();

        Ok(Envelope {
            id,
            kind,
            interface,
            instance_id: msg.source.clone(),
            timestamp,
            subject: msg.subject.clone(),
            payload: msg.data.clone(),
        })
    }

    /// Builds a new envelope with a fresh id and the current time.
    pub fn build<T: Serialize>(
        &self,
        interface: &str,
        instance_id: &str,
        kind: EnvelopeKind,
        payload: &T,
    ) -> KtwinResult<Envelope> {
        let event_type = EventType::new(self.namespace.clone(), kind, interface)?;
        if instance_id.is_empty() {
            return Err(KtwinError::malformed(event_type.to_string(), "missing source"));
        }

        let payload =
            serde_json::to_vec(payload).map_err(|e| KtwinError::PayloadEncode(e.to_string()))?;

        let (kind, interface) = event_type.into_parts();

        Ok(Envelope {
            id: self.ids.next_id(),
            kind,
            subject: Some(interface.clone()),
            interface,
            instance_id: instance_id.to_string(),
            timestamp: self.clock.now(),
            payload,
        })
    }

    /// Builds a wire message for a new event.
    pub fn encode<T: Serialize>(
        &self,
        interface: &str,
        instance_id: &str,
        kind: EnvelopeKind,
        payload: &T,
    ) -> KtwinResult<WireMessage> {
        let envelope = self.build(interface, instance_id, kind, payload)?;
        self.to_wire(&envelope)
    }

    /// Renders an envelope, keeping its id and timestamp.
    pub fn to_wire(&self, envelope: &Envelope) -> KtwinResult<WireMessage> {
        self.to_wire_as(envelope, envelope.kind.clone())
    }

    /// Renders an envelope under another kind.
    pub fn to_wire_as(&self, envelope: &Envelope, kind: EnvelopeKind) -> KtwinResult<WireMessage> {
        let event_type = EventType::new(self.namespace.clone(), kind, envelope.interface.clone())?;

        Ok(WireMessage {
            id: envelope.id.clone(),
            spec_version: SPEC_VERSION.to_string(),
            source: envelope.instance_id.clone(),
            event_type: event_type.to_string(),
            subject: Some(
                envelope
                    .subject
                    .clone()
                    .unwrap_or_else(|| envelope.interface.clone()),
            ),
            time: Some(
                envelope
                    .timestamp
                    .to_rfc3339_opts(SecondsFormat::Secs, true),
            ),
            content_type: Some(CONTENT_TYPE_JSON.to_string()),
            data: envelope.payload.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use serde::Deserialize;
    use serde_json::json;

    use super::*;
    use crate::foundation::clock::{FixedClock, FixedId};

    fn codec() -> EnvelopeCodec {
        EnvelopeCodec::default()
            .with_clock(FixedClock(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()))
            .with_ids(FixedId("e8e126f6-62fb-40fd-a7cd-8264ca8600d0".into()))
    }

    #[test]
    fn test_encode_decode_identity() {
        let codec = codec();
        let kinds = [
            EnvelopeKind::Observation,
            EnvelopeKind::Derived,
            EnvelopeKind::command("updatevehiclecount"),
        ];

        for kind in kinds {
            let wire = codec
                .encode("ngsi-ld-city-offstreetparking", "ofp0005", kind.clone(), &json!({}))
                .unwrap();
            let envelope = codec.decode(&wire).unwrap();

            assert_eq!(envelope.kind(), &kind);
            assert_eq!(envelope.interface(), "ngsi-ld-city-offstreetparking");
            assert_eq!(envelope.instance_id(), "ofp0005");
            assert_eq!(envelope.command_name(), kind.command_name());
        }
    }

    #[test]
    fn test_encode_attributes() {
        let wire = codec()
            .encode(
                "ngsi-ld-city-streetlight",
                "sl-01",
                EnvelopeKind::Derived,
                &json!({"powerState": "on"}),
            )
            .unwrap();

        assert_eq!(wire.event_type, "ktwin.virtual.ngsi-ld-city-streetlight");
        assert_eq!(wire.source, "sl-01");
        assert_eq!(wire.subject.as_deref(), Some("ngsi-ld-city-streetlight"));
        assert_eq!(wire.time.as_deref(), Some("2024-01-01T00:00:00Z"));
        assert_eq!(wire.id, "e8e126f6-62fb-40fd-a7cd-8264ca8600d0");
        assert_eq!(wire.spec_version, "1.0");
        assert_eq!(wire.content_type.as_deref(), Some("application/json"));
    }

    #[test]
    fn test_decode_rejects_short_type() {
        let msg = WireMessage {
            source: "x".into(),
            event_type: "ktwin.real".into(),
            ..Default::default()
        };
        assert!(matches!(
            codec().decode(&msg),
            Err(KtwinError::MalformedEnvelope { .. })
        ));
    }

    #[test]
    fn test_decode_rejects_missing_source_and_bad_time() {
        let mut msg = WireMessage {
            event_type: "ktwin.real.pole".into(),
            ..Default::default()
        };
        assert!(codec().decode(&msg).is_err());

        msg.source = "pole-1".into();
        msg.time = Some("yesterday".into());
        assert!(codec().decode(&msg).is_err());
    }

    #[test]
    fn test_decode_defaults_time_from_clock() {
        let msg = WireMessage {
            source: "pole-1".into(),
            event_type: "ktwin.real.pole".into(),
            ..Default::default()
        };
        let envelope = codec().decode(&msg).unwrap();
        assert_eq!(
            envelope.timestamp(),
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
        );
    }

    #[derive(Debug, Deserialize, PartialEq)]
    #[serde(rename_all = "camelCase")]
    struct Crowd {
        people_count: u32,
    }

    #[test]
    fn test_payload_decode_on_demand() {
        let codec = codec();
        let mut envelope = codec
            .build("crowd", "c-1", EnvelopeKind::Observation, &json!({"peopleCount": 7}))
            .unwrap();
        assert_eq!(
            envelope.decode_payload::<Crowd>().unwrap(),
            Crowd { people_count: 7 }
        );

        envelope.set_payload(&json!({"peopleCount": "many"})).unwrap();
        assert!(matches!(
            envelope.decode_payload::<Crowd>(),
            Err(KtwinError::PayloadDecode(_))
        ));
    }

    #[test]
    fn test_to_wire_as_store_keeps_identity() {
        let codec = codec();
        let envelope = codec
            .build(
                "ngsi-ld-city-offstreetparking",
                "ofp0005",
                EnvelopeKind::command("updatevehiclecount"),
                &json!({"occupiedSpotNumber": 1}),
            )
            .unwrap();

        let wire = codec.to_wire_as(&envelope, EnvelopeKind::Stored).unwrap();
        assert_eq!(wire.event_type, "ktwin.store.ngsi-ld-city-offstreetparking");
        assert_eq!(wire.source, "ofp0005");
        assert_eq!(wire.id, envelope.id());
    }

    #[test]
    fn test_require_command() {
        let codec = codec();
        let event = codec
            .build("pole", "p-1", EnvelopeKind::Observation, &json!({}))
            .unwrap();
        assert!(matches!(
            event.require_command(),
            Err(KtwinError::NotACommand { .. })
        ));
    }
}
