//! CloudEvents HTTP protocol binding.
//!
//! Outbound messages use binary mode: attributes in `ce-*` headers and the
//! payload as the body. Inbound requests and store responses may use either
//! binary or structured mode; the mode is chosen from the content type.

use http::header::CONTENT_TYPE;
use http::{HeaderMap, HeaderName, HeaderValue};

use ktwin_core::{
    CONTENT_TYPE_STRUCTURED, KtwinError, KtwinResult, SPEC_VERSION, WireMessage,
};

/// Header carrying the event id.
pub const CE_ID: HeaderName = HeaderName::from_static("ce-id");
/// Header carrying the spec version.
pub const CE_SPECVERSION: HeaderName = HeaderName::from_static("ce-specversion");
/// Header carrying the event source.
pub const CE_SOURCE: HeaderName = HeaderName::from_static("ce-source");
/// Header carrying the wire type string.
pub const CE_TYPE: HeaderName = HeaderName::from_static("ce-type");
/// Header carrying the subject.
pub const CE_SUBJECT: HeaderName = HeaderName::from_static("ce-subject");
/// Header carrying the RFC3339 timestamp.
pub const CE_TIME: HeaderName = HeaderName::from_static("ce-time");

/// Renders `msg` as binary-mode headers.
///
/// The body is `msg.data` unchanged.
pub fn to_headers(msg: &WireMessage) -> KtwinResult<HeaderMap> {
    let mut headers = HeaderMap::new();

    insert(&mut headers, CE_ID, &msg.id, msg)?;
    insert(&mut headers, CE_SPECVERSION, &msg.spec_version, msg)?;
    insert(&mut headers, CE_SOURCE, &msg.source, msg)?;
    insert(&mut headers, CE_TYPE, &msg.event_type, msg)?;
    if let Some(subject) = &msg.subject {
        insert(&mut headers, CE_SUBJECT, subject, msg)?;
    }
    if let Some(time) = &msg.time {
        insert(&mut headers, CE_TIME, time, msg)?;
    }
    if let Some(content_type) = &msg.content_type {
        insert(&mut headers, CONTENT_TYPE, content_type, msg)?;
    }

    Ok(headers)
}

fn insert(
    headers: &mut HeaderMap,
    name: HeaderName,
    value: &str,
    msg: &WireMessage,
) -> KtwinResult<()> {
    let value = HeaderValue::from_str(value).map_err(|_| {
        KtwinError::malformed(
            &msg.event_type,
            format!("attribute {name} is not a valid header value"),
        )
    })?;
    headers.insert(name, value);
    Ok(())
}

/// Returns `true` if the content type announces a structured-mode body.
pub fn is_structured(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with(CONTENT_TYPE_STRUCTURED))
}

/// Reads a binary-mode message.
///
/// `ce-type` is required; the codec validates everything else.
pub fn from_binary(headers: &HeaderMap, body: &[u8]) -> KtwinResult<WireMessage> {
    let event_type = header(headers, &CE_TYPE)?
        .ok_or_else(|| KtwinError::malformed("", "missing ce-type header"))?;

    Ok(WireMessage {
        id: header(headers, &CE_ID)?.unwrap_or_default(),
        spec_version: header(headers, &CE_SPECVERSION)?
            .unwrap_or_else(|| SPEC_VERSION.to_string()),
        source: header(headers, &CE_SOURCE)?.unwrap_or_default(),
        subject: header(headers, &CE_SUBJECT)?,
        time: header(headers, &CE_TIME)?,
        content_type: header(headers, &CONTENT_TYPE)?,
        data: body.to_vec(),
        event_type,
    })
}

/// Reads a message in whichever mode the content type announces.
pub fn from_http(headers: &HeaderMap, body: &[u8]) -> KtwinResult<WireMessage> {
    if is_structured(headers) {
        WireMessage::from_structured(body)
    } else {
        from_binary(headers, body)
    }
}

fn header(headers: &HeaderMap, name: &HeaderName) -> KtwinResult<Option<String>> {
    headers
        .get(name)
        .map(|v| {
            v.to_str()
                .map(str::to_string)
                .map_err(|_| KtwinError::malformed("", format!("header {name} is not valid text")))
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message() -> WireMessage {
        WireMessage {
            id: "e8e126f6-62fb-40fd-a7cd-8264ca8600d0".into(),
            spec_version: SPEC_VERSION.into(),
            source: "ngsi-ld-city-offstreetparking-nb001-ofp0005".into(),
            event_type: "ktwin.command.ngsi-ld-city-offstreetparking.updatevehiclecount".into(),
            subject: Some("ngsi-ld-city-offstreetparking".into()),
            time: Some("2024-01-01T00:00:00Z".into()),
            content_type: Some("application/json".into()),
            data: br#"{"vehicleEntranceCount":1}"#.to_vec(),
        }
    }

    #[test]
    fn test_binary_headers() {
        let headers = to_headers(&message()).unwrap();

        assert_eq!(headers["ce-id"], "e8e126f6-62fb-40fd-a7cd-8264ca8600d0");
        assert_eq!(headers["ce-specversion"], "1.0");
        assert_eq!(
            headers["ce-source"],
            "ngsi-ld-city-offstreetparking-nb001-ofp0005"
        );
        assert_eq!(
            headers["ce-type"],
            "ktwin.command.ngsi-ld-city-offstreetparking.updatevehiclecount"
        );
        assert_eq!(headers["ce-subject"], "ngsi-ld-city-offstreetparking");
        assert_eq!(headers["ce-time"], "2024-01-01T00:00:00Z");
        assert_eq!(headers["content-type"], "application/json");
    }

    #[test]
    fn test_binary_read_back() {
        let msg = message();
        let headers = to_headers(&msg).unwrap();
        assert_eq!(from_http(&headers, &msg.data).unwrap(), msg);
    }

    #[test]
    fn test_binary_requires_type() {
        let mut headers = to_headers(&message()).unwrap();
        headers.remove(CE_TYPE);
        assert!(matches!(
            from_binary(&headers, b"{}"),
            Err(KtwinError::MalformedEnvelope { .. })
        ));
    }

    #[test]
    fn test_structured_detected_from_content_type() {
        let mut headers = HeaderMap::new();
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("application/cloudevents+json; charset=utf-8"),
        );
        let body = br#"{"specversion":"1.0","id":"1","source":"pole-1","type":"ktwin.real.pole","data":{"lux":3}}"#;

        let msg = from_http(&headers, body).unwrap();
        assert_eq!(msg.event_type, "ktwin.real.pole");
        assert_eq!(msg.source, "pole-1");
        assert_eq!(msg.data, br#"{"lux":3}"#);
    }
}
