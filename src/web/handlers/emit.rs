// POST /emit — admit one label assertion and forward it to the label authority.
//
// Checks run in a fixed order and stop at the first failure:
//   bearer token (403) -> uri (400) -> label present (400) -> label allowed (400)
// Only a request that passes all four reaches the authority, exactly once.
// The body is read as raw bytes so an unauthenticated caller gets 403 even
// when the payload is garbage.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::authority::LabelAssertion;
use crate::labels::LabelSet;
use crate::web::{api_error, auth, AppState};

/// Wire shape of an emit request. Both fields are optional so that a missing
/// field is reported as a validation error rather than a parse failure.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmitRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// Why a well-formed request was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    MissingUri,
    MissingLabel,
    InvalidLabel,
}

impl Rejection {
    pub fn message(self) -> &'static str {
        match self {
            Rejection::MissingUri => "must supply uri",
            Rejection::MissingLabel => "must supply label",
            Rejection::InvalidLabel => "invalid label supplied",
        }
    }
}

impl EmitRequest {
    /// Parse a request body. An empty body counts as `{}`.
    pub fn parse(body: &[u8]) -> serde_json::Result<Self> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        serde_json::from_slice(body)
    }

    /// Turn the request into an assertion, or say which check failed.
    pub fn validate(self, labels: &LabelSet) -> Result<LabelAssertion, Rejection> {
        let uri = self
            .uri
            .filter(|u| !u.is_empty())
            .ok_or(Rejection::MissingUri)?;
        let label = self
            .label
            .filter(|l| !l.is_empty())
            .ok_or(Rejection::MissingLabel)?;
        if !labels.contains(&label) {
            return Err(Rejection::InvalidLabel);
        }
        Ok(LabelAssertion { uri, label })
    }
}

pub async fn emit_label(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    if !auth::is_authorized(&headers, &state.emit_label_key) {
        warn!("Rejected emit request with missing or invalid bearer token");
        return api_error(StatusCode::FORBIDDEN, "unauthorized");
    }

    let request = match EmitRequest::parse(&body) {
        Ok(request) => request,
        Err(e) => {
            warn!(error = %e, "Rejected emit request with malformed body");
            return api_error(StatusCode::BAD_REQUEST, "invalid request body");
        }
    };

    let assertion = match request.validate(&state.labels) {
        Ok(assertion) => assertion,
        Err(rejection) => {
            warn!(reason = rejection.message(), "Rejected emit request");
            return api_error(StatusCode::BAD_REQUEST, rejection.message());
        }
    };

    if let Err(e) = state.authority.create_label(&assertion).await {
        error!(
            uri = %assertion.uri,
            label = %assertion.label,
            error = %e,
            "Label authority failed to create label"
        );
        return api_error(StatusCode::BAD_GATEWAY, "label authority unavailable");
    }

    info!(uri = %assertion.uri, label = %assertion.label, "Emitted label");
    StatusCode::OK.into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(uri: Option<&str>, label: Option<&str>) -> EmitRequest {
        EmitRequest {
            uri: uri.map(String::from),
            label: label.map(String::from),
        }
    }

    #[test]
    fn empty_body_parses_as_empty_request() {
        assert_eq!(EmitRequest::parse(b"").unwrap(), EmitRequest::default());
        assert_eq!(EmitRequest::parse(b"  \n").unwrap(), EmitRequest::default());
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let parsed = EmitRequest::parse(br#"{"uri":"at://x/y","label":"funny","extra":1}"#).unwrap();
        assert_eq!(parsed, request(Some("at://x/y"), Some("funny")));
    }

    #[test]
    fn non_object_bodies_fail_to_parse() {
        assert!(EmitRequest::parse(b"not json").is_err());
        assert!(EmitRequest::parse(b"[]").is_err());
        assert!(EmitRequest::parse(br#"{"uri": 42}"#).is_err());
    }

    #[test]
    fn uri_is_checked_before_label() {
        let labels = LabelSet::default();
        assert_eq!(
            request(None, Some("nonsense")).validate(&labels),
            Err(Rejection::MissingUri)
        );
        assert_eq!(
            request(Some(""), Some("funny")).validate(&labels),
            Err(Rejection::MissingUri)
        );
    }

    #[test]
    fn missing_or_empty_label_is_rejected() {
        let labels = LabelSet::default();
        assert_eq!(
            request(Some("at://x/y"), None).validate(&labels),
            Err(Rejection::MissingLabel)
        );
        assert_eq!(
            request(Some("at://x/y"), Some("")).validate(&labels),
            Err(Rejection::MissingLabel)
        );
    }

    #[test]
    fn label_outside_allow_list_is_rejected() {
        let labels = LabelSet::default();
        for label in ["spam", "FUNNY", "bad faith", "off-topic "] {
            assert_eq!(
                request(Some("at://x/y"), Some(label)).validate(&labels),
                Err(Rejection::InvalidLabel),
                "{label:?} should be rejected"
            );
        }
    }

    #[test]
    fn valid_request_becomes_assertion() {
        let assertion = request(Some("at://x/y"), Some("funny"))
            .validate(&LabelSet::default())
            .unwrap();
        assert_eq!(
            assertion,
            LabelAssertion {
                uri: "at://x/y".to_string(),
                label: "funny".to_string(),
            }
        );
    }
}
