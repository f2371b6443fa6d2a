//! Maps raw HTTP responses onto the error taxonomy and typed bodies.

use reqwest::StatusCode;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::{Error, Response, Result};
use crate::transport::RawResponse;
use crate::utils::date_format::xero_datetime_format_option;

/// A decoded body: JSON mapped onto a type, or document bytes left untouched.
#[derive(Debug)]
pub enum Decoded<T> {
    Json(T),
    Binary(Vec<u8>),
}

/// Whether a `Content-Type` header value declares a JSON body.
#[must_use]
pub fn is_json(content_type: Option<&str>) -> bool {
    let Some(content_type) = content_type else {
        return false;
    };
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    essence == "application/json" || essence == "text/json" || essence.ends_with("+json")
}

/// Turns non-success statuses into errors. `entity` names the resource for `NotFound`.
pub fn check_status(response: RawResponse, entity: &str) -> Result<RawResponse> {
    let status = response.status;
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text();
    match status {
        StatusCode::NOT_FOUND => Err(Error::NotFound {
            entity: entity.to_string(),
            url: response.url,
            status_code: status,
            response_body: Some(text),
        }),
        StatusCode::UNAUTHORIZED => Err(Error::Unauthorized {
            url: response.url,
            response_body: Some(text),
        }),
        StatusCode::FORBIDDEN => Err(Error::Forbidden {
            url: response.url,
            response_body: Some(text),
        }),
        _ => match serde_json::from_str::<Response>(&text) {
            Ok(api_error) => {
                error!("API error for {}: {}", entity, api_error);
                Err(api_error.into())
            }
            Err(_) => {
                error!("Unexpected status code: {}", status);
                Err(Error::UnexpectedStatus {
                    status_code: status,
                    url: response.url,
                    response_body: Some(text),
                })
            }
        },
    }
}

/// Decodes a successful response according to its declared media type.
pub fn decode<T: DeserializeOwned>(response: RawResponse, entity: &str) -> Result<Decoded<T>> {
    let response = check_status(response, entity)?;
    if is_json(response.content_type.as_deref()) {
        parse_json(&response).map(Decoded::Json)
    } else {
        Ok(Decoded::Binary(response.body))
    }
}

/// Decodes a response that must carry JSON.
pub fn decode_json<T: DeserializeOwned>(response: RawResponse, entity: &str) -> Result<T> {
    let url = response.url.clone();
    let content_type = response.content_type.clone();
    match decode(response, entity)? {
        Decoded::Json(value) => Ok(value),
        Decoded::Binary(_) => Err(Error::UnexpectedContentType {
            expected: "JSON",
            content_type,
            url,
        }),
    }
}

/// Decodes a response that must carry a document, e.g. a PDF.
pub fn decode_binary(response: RawResponse, entity: &str) -> Result<Vec<u8>> {
    let response = check_status(response, entity)?;
    if is_json(response.content_type.as_deref()) {
        return Err(Error::UnexpectedContentType {
            expected: "binary",
            content_type: response.content_type,
            url: response.url,
        });
    }
    Ok(response.body)
}

fn parse_json<T: DeserializeOwned>(response: &RawResponse) -> Result<T> {
    serde_json::from_slice(&response.body).map_err(|e| {
        let text = response.text();
        error!(
            "Deserialization error: {}, near line {} column {} - response text around that position: {}",
            e,
            e.line(),
            e.column(),
            text.chars()
                .skip(e.column().saturating_sub(30))
                .take(100)
                .collect::<String>()
        );
        Error::DeserializationError(e, Some(text))
    })
}

/// Page metadata some collections report alongside their elements.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub page_count: Option<u32>,
    pub item_count: Option<u64>,
}

/// The wrapper every accounting response arrives in.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Envelope {
    pub id: Uuid,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub provider_name: Option<String>,
    #[serde(rename = "DateTimeUTC", default, with = "xero_datetime_format_option")]
    pub date_time_utc: Option<OffsetDateTime>,
    #[serde(rename = "pagination", default)]
    pub pagination: Option<Pagination>,
    /// The remaining keys, including the collection array.
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

impl Envelope {
    /// Removes and returns the elements stored under `collection`.
    pub fn take_elements(&mut self, collection: &str) -> Result<Vec<Value>> {
        match self.rest.remove(collection) {
            Some(Value::Array(elements)) => Ok(elements),
            Some(Value::Null) | None => {
                warn!(collection, "response carried no elements");
                Ok(Vec::new())
            }
            Some(other) => Err(Error::DeserializationError(
                serde::de::Error::custom(format!("expected an array under {collection}")),
                Some(other.to_string()),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(status: u16, content_type: Option<&str>, body: &[u8]) -> RawResponse {
        RawResponse {
            status: StatusCode::from_u16(status).unwrap(),
            url: "https://api.test/Invoices".to_string(),
            content_type: content_type.map(String::from),
            body: body.to_vec(),
            rate_limit: Default::default(),
        }
    }

    #[test]
    fn recognises_json_media_types() {
        assert!(is_json(Some("application/json; charset=utf-8")));
        assert!(is_json(Some("application/problem+json")));
        assert!(is_json(Some("Text/JSON")));
        assert!(!is_json(Some("application/pdf")));
        assert!(!is_json(None));
    }

    #[test]
    fn binary_bodies_are_passed_through_verbatim() {
        let bytes = b"%PDF-1.4\n\x00\xff binary";
        let decoded: Decoded<Value> =
            decode(raw(200, Some("application/pdf"), bytes), "Invoice").unwrap();
        match decoded {
            Decoded::Binary(body) => assert_eq!(body, bytes),
            Decoded::Json(_) => panic!("expected binary"),
        }
    }

    #[test]
    fn malformed_json_is_a_decode_error_with_body() {
        let err = decode_json::<Value>(raw(200, Some("application/json"), b"{\"Id\": "), "Invoice")
            .unwrap_err();
        match err {
            Error::DeserializationError(_, Some(body)) => assert_eq!(body, "{\"Id\": "),
            other => panic!("expected DeserializationError, got {other:?}"),
        }
    }

    #[test]
    fn json_where_document_expected_is_rejected() {
        let err = decode_binary(raw(200, Some("application/json"), b"{}"), "Invoice").unwrap_err();
        assert!(matches!(err, Error::UnexpectedContentType { expected: "binary", .. }));
    }

    #[test]
    fn document_where_json_expected_reports_its_media_type() {
        let err = decode_json::<Value>(raw(200, Some("text/html; charset=utf-8"), b"<html/>"), "Invoice")
            .unwrap_err();
        match err {
            Error::UnexpectedContentType {
                expected: "JSON",
                content_type,
                ..
            } => assert_eq!(content_type.as_deref(), Some("text/html; charset=utf-8")),
            other => panic!("expected UnexpectedContentType, got {other:?}"),
        }
    }

    #[test]
    fn statuses_map_to_taxonomy() {
        assert!(matches!(
            check_status(raw(404, Some("text/html"), b"gone"), "Invoice"),
            Err(Error::NotFound { ref entity, .. }) if entity == "Invoice"
        ));
        assert!(matches!(
            check_status(raw(403, None, b""), "Invoice"),
            Err(Error::Forbidden { .. })
        ));

        let body = json!({
            "ErrorNumber": 14,
            "Type": "PostDataInvalidException",
            "Message": "JSON for post data was invalid"
        })
        .to_string();
        let err = check_status(raw(400, Some("application/json"), body.as_bytes()), "Invoice")
            .unwrap_err();
        assert_eq!(err.api_response().unwrap().error_number, 14);

        assert!(matches!(
            check_status(raw(418, None, b"teapot"), "Invoice"),
            Err(Error::UnexpectedStatus { .. })
        ));
    }

    #[test]
    fn envelope_exposes_collection_and_metadata() {
        let id = Uuid::new_v4();
        let mut envelope: Envelope = serde_json::from_value(json!({
            "Id": id,
            "Status": "OK",
            "ProviderName": "demo",
            "DateTimeUTC": "/Date(1529443543581)/",
            "pagination": { "page": 1, "pageSize": 100, "pageCount": 3, "itemCount": 250 },
            "Invoices": [{ "InvoiceID": Uuid::new_v4() }]
        }))
        .unwrap();

        assert_eq!(envelope.id, id);
        assert!(envelope.date_time_utc.is_some());
        assert_eq!(envelope.pagination.unwrap().page_count, Some(3));
        assert_eq!(envelope.take_elements("Invoices").unwrap().len(), 1);
        assert!(envelope.take_elements("Invoices").unwrap().is_empty());
    }
}
