//! Signup-form webhook handler.
//!
//! The form platform has posted submissions in several shapes over time:
//! contact details nested under `contact`, flattened into `field:*` keys, a
//! labelled `submissions` array, and all of the above wrapped in a `data`
//! envelope. The extractor tries each in turn, oldest shape last.

use std::sync::Arc;

use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::Value;
use tracing::{info, warn};

use crate::clients::{ClientService, NewClient};

/// Shared state for intake routes.
#[derive(Clone)]
pub struct IntakeRouteState {
    pub service: Arc<ClientService>,
}

/// Build the intake webhook routes.
pub fn intake_routes(service: Arc<ClientService>) -> Router {
    Router::new()
        .route("/api/webhooks/signup-form", post(handle_signup_form))
        .with_state(IntakeRouteState { service })
}

async fn handle_signup_form(
    State(state): State<IntakeRouteState>,
    body: Result<Json<Value>, JsonRejection>,
) -> impl IntoResponse {
    let Json(payload) = match body {
        Ok(json) => json,
        Err(rejection) => {
            return failure(
                StatusCode::BAD_REQUEST,
                format!("Invalid webhook payload: {rejection}"),
            );
        }
    };

    let new = extract_submission(&payload);
    if new.email.is_empty() && new.phone.is_empty() {
        warn!("Signup form submission carries no contact details");
        return failure(
            StatusCode::BAD_REQUEST,
            "Submission has no email or phone.",
        );
    }

    // Re-submissions for a known email update the existing record instead
    // of creating a duplicate.
    if !new.email.is_empty() {
        match state.service.find_by_email(&new.email).await {
            Ok(Some(existing)) => {
                return match state.service.update_contact(existing.id, &new).await {
                    Ok(()) => {
                        info!(client_id = %existing.id, "Signup form matched existing client");
                        (
                            StatusCode::OK,
                            Json(serde_json::json!({
                                "success": true,
                                "clientId": existing.id,
                                "created": false,
                            })),
                        )
                    }
                    Err(e) => failure(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
                };
            }
            Ok(None) => {}
            Err(e) => return failure(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
        }
    }

    match state.service.create(&new).await {
        Ok(client) => {
            info!(client_id = %client.id, "Client created from signup form");
            (
                StatusCode::CREATED,
                Json(serde_json::json!({
                    "success": true,
                    "clientId": client.id,
                    "created": true,
                })),
            )
        }
        Err(e) => failure(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

fn failure(code: StatusCode, message: impl Into<String>) -> (StatusCode, Json<Value>) {
    (
        code,
        Json(serde_json::json!({ "success": false, "message": message.into() })),
    )
}

// ── Payload extraction ──────────────────────────────────────────────────

/// Pull contact fields out of a submission payload.
fn extract_submission(payload: &Value) -> NewClient {
    // Newer submissions wrap everything in a `data` envelope.
    let data = payload.get("data").unwrap_or(payload);

    let first_name = data
        .pointer("/contact/name/first")
        .and_then(Value::as_str)
        .or_else(|| first_str(data, &["field:first_name_13c3", "field:firstName_1", "firstName"]))
        .or_else(|| submission_value(data, "First name"))
        .unwrap_or_default();

    let last_name = data
        .pointer("/contact/name/last")
        .and_then(Value::as_str)
        .or_else(|| first_str(data, &["field:last_name_7aa5", "field:lastName_1", "lastName"]))
        .or_else(|| submission_value(data, "Last name"))
        .unwrap_or_default();

    let email = data
        .pointer("/contact/email")
        .and_then(Value::as_str)
        .or_else(|| first_str(data, &["field:email_65e2", "field:email_1", "email"]))
        .or_else(|| submission_value(data, "Email"))
        .unwrap_or_default();

    let phone = data
        .pointer("/contact/phone")
        .and_then(Value::as_str)
        .or_else(|| first_str(data, &["field:phone_bd01", "field:phone_1", "phone"]))
        .or_else(|| submission_value(data, "Phone"))
        .unwrap_or_default();

    let referral_source = first_str(
        data,
        &["field:who_asked_you_to_take_this_class", "referralSource"],
    )
    .or_else(|| submission_value(data, "Who asked you to take this class?"))
    .unwrap_or_default();

    NewClient {
        first_name: first_name.trim().to_string(),
        last_name: last_name.trim().to_string(),
        email: email.trim().to_string(),
        phone: phone.trim().to_string(),
        referral_source: referral_source.trim().to_string(),
    }
}

/// First non-empty string among the given top-level keys.
fn first_str<'a>(data: &'a Value, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .filter_map(|key| data.get(*key).and_then(Value::as_str))
        .find(|s| !s.trim().is_empty())
}

/// Look a label up in the `submissions` array shape.
fn submission_value<'a>(data: &'a Value, label: &str) -> Option<&'a str> {
    data.get("submissions")?
        .as_array()?
        .iter()
        .find(|entry| entry.get("label").and_then(Value::as_str) == Some(label))
        .and_then(|entry| entry.get("value").and_then(Value::as_str))
        .filter(|s| !s.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_nested_contact_shape() {
        let payload = serde_json::json!({
            "formName": "Class Signup",
            "contact": {
                "name": { "first": "Mary", "last": "Shelley" },
                "email": "mary@example.com",
                "phone": "555-0188"
            }
        });
        let new = extract_submission(&payload);
        assert_eq!(new.first_name, "Mary");
        assert_eq!(new.last_name, "Shelley");
        assert_eq!(new.email, "mary@example.com");
        assert_eq!(new.phone, "555-0188");
    }

    #[test]
    fn extracts_flat_field_keys_inside_data_envelope() {
        let payload = serde_json::json!({
            "data": {
                "field:first_name_13c3": "Bram",
                "field:last_name_7aa5": "Stoker",
                "field:email_65e2": "bram@example.com",
                "field:who_asked_you_to_take_this_class": "A friend"
            }
        });
        let new = extract_submission(&payload);
        assert_eq!(new.first_name, "Bram");
        assert_eq!(new.last_name, "Stoker");
        assert_eq!(new.email, "bram@example.com");
        assert_eq!(new.referral_source, "A friend");
    }

    #[test]
    fn extracts_labelled_submissions_array() {
        let payload = serde_json::json!({
            "data": {
                "submissions": [
                    { "label": "First name", "value": "Emily" },
                    { "label": "Email", "value": "emily@example.com" },
                    { "label": "Phone", "value": "555-0123" }
                ]
            }
        });
        let new = extract_submission(&payload);
        assert_eq!(new.first_name, "Emily");
        assert_eq!(new.email, "emily@example.com");
        assert_eq!(new.phone, "555-0123");
    }

    #[test]
    fn empty_strings_fall_through_to_later_shapes() {
        let payload = serde_json::json!({
            "field:email_65e2": "  ",
            "email": "real@example.com"
        });
        let new = extract_submission(&payload);
        assert_eq!(new.email, "real@example.com");
    }

    #[test]
    fn missing_fields_default_to_empty() {
        let new = extract_submission(&serde_json::json!({}));
        assert!(new.first_name.is_empty());
        assert!(new.email.is_empty());
    }
}
