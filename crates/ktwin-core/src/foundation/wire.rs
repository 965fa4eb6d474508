//! Transport form of an envelope.
//!
//! [`WireMessage`] carries the CloudEvents attributes the brokers and the
//! event store understand. Transports map it to HTTP headers (binary mode) or
//! to a JSON document (structured mode); the codec maps it to and from
//! [`Envelope`](super::envelope::Envelope).

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{KtwinError, KtwinResult};

/// CloudEvents spec version written on every outbound message.
pub const SPEC_VERSION: &str = "1.0";

/// Content type of every payload.
pub const CONTENT_TYPE_JSON: &str = "application/json";

/// Content type of structured-mode messages.
pub const CONTENT_TYPE_STRUCTURED: &str = "application/cloudevents+json";

/// A CloudEvent as moved over the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WireMessage {
    /// Event id (`ce-id`).
    pub id: String,
    /// Spec version (`ce-specversion`).
    pub spec_version: String,
    /// Event source, the twin instance id (`ce-source`).
    pub source: String,
    /// Wire type string (`ce-type`).
    pub event_type: String,
    /// Optional subject (`ce-subject`).
    pub subject: Option<String>,
    /// RFC3339 timestamp (`ce-time`).
    pub time: Option<String>,
    /// Content type of `data`.
    pub content_type: Option<String>,
    /// Raw payload bytes.
    pub data: Vec<u8>,
}

/// Structured-mode JSON document.
#[derive(Debug, Serialize, Deserialize)]
struct StructuredEvent {
    #[serde(default)]
    specversion: Option<String>,
    #[serde(default)]
    id: Option<String>,
    source: String,
    #[serde(rename = "type")]
    event_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    subject: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    datacontenttype: Option<String>,
    #[serde(default)]
    data: Option<Value>,
}

impl WireMessage {
    /// Parses a structured-mode (`application/cloudevents+json`) document.
    pub fn from_structured(body: &[u8]) -> KtwinResult<Self> {
        let doc: StructuredEvent = serde_json::from_slice(body).map_err(|e| {
            KtwinError::malformed("", format!("invalid structured cloud event: {e}"))
        })?;

        let data = match doc.data {
            Some(value) => serde_json::to_vec(&value)
                .map_err(|e| KtwinError::PayloadDecode(e.to_string()))?,
            None => Vec::new(),
        };

        Ok(Self {
            id: doc.id.unwrap_or_default(),
            spec_version: doc.specversion.unwrap_or_else(|| SPEC_VERSION.to_string()),
            source: doc.source,
            event_type: doc.event_type,
            subject: doc.subject,
            time: doc.time,
            content_type: doc.datacontenttype,
            data,
        })
    }

    /// Renders this message as a structured-mode document.
    ///
    /// A payload that is not valid JSON is rejected.
    pub fn to_structured(&self) -> KtwinResult<Vec<u8>> {
        let data = if self.data.is_empty() {
            None
        } else {
            Some(
                serde_json::from_slice(&self.data)
                    .map_err(|e| KtwinError::PayloadDecode(e.to_string()))?,
            )
        };

        let doc = StructuredEvent {
            specversion: Some(self.spec_version.clone()),
            id: Some(self.id.clone()),
            source: self.source.clone(),
            event_type: self.event_type.clone(),
            subject: self.subject.clone(),
            time: self.time.clone(),
            datacontenttype: self.content_type.clone(),
            data,
        };
        serde_json::to_vec(&doc).map_err(|e| KtwinError::PayloadEncode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structured_parse() {
        let body = br#"{
            "specversion": "1.0",
            "id": "abc",
            "source": "ngsi-ld-city-offstreetparking-nb001-ofp0005",
            "type": "ktwin.command.ngsi-ld-city-offstreetparking.updatevehiclecount",
            "time": "2024-01-01T00:00:00Z",
            "data": {"vehicleEntranceCount": 1}
        }"#;

        let msg = WireMessage::from_structured(body).unwrap();
        assert_eq!(msg.id, "abc");
        assert_eq!(msg.source, "ngsi-ld-city-offstreetparking-nb001-ofp0005");
        assert_eq!(msg.time.as_deref(), Some("2024-01-01T00:00:00Z"));

        let data: Value = serde_json::from_slice(&msg.data).unwrap();
        assert_eq!(data["vehicleEntranceCount"], 1);
    }

    #[test]
    fn test_structured_missing_type() {
        let err = WireMessage::from_structured(br#"{"source": "x"}"#).unwrap_err();
        assert!(matches!(err, KtwinError::MalformedEnvelope { .. }));
    }

    #[test]
    fn test_structured_output_keeps_payload() {
        let msg = WireMessage {
            id: "1".into(),
            spec_version: SPEC_VERSION.into(),
            source: "pole-01".into(),
            event_type: "ktwin.real.pole".into(),
            data: br#"{"lux":12}"#.to_vec(),
            ..Default::default()
        };

        let doc: Value = serde_json::from_slice(&msg.to_structured().unwrap()).unwrap();
        assert_eq!(doc["type"], "ktwin.real.pole");
        assert_eq!(doc["data"]["lux"], 12);
    }
}
