//! Client data model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use uuid::Uuid;

use crate::followup::{FollowUpField, OnboardingStatus};

/// A client record as stored.
///
/// Contact fields are free-form pass-through from intake; the state machine
/// only ever touches `follow_up` and `onboarding_status`, and always as a
/// pair.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub referral_source: String,
    /// Class the client is assigned to, once they reach that step.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class_id: Option<String>,
    /// Current follow-up task label; `null` when unset or complete.
    #[serde(serialize_with = "follow_up_label")]
    pub follow_up: FollowUpField,
    pub onboarding_status: OnboardingStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn follow_up_label<S: Serializer>(field: &FollowUpField, serializer: S) -> Result<S::Ok, S::Error> {
    field.display_label().serialize(serializer)
}

/// Contact fields accepted when creating a client.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewClient {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub referral_source: String,
}

/// Which operation wrote a follow-up change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventOperation {
    Created,
    TaskCompleted,
    TaskOverridden,
}

impl EventOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::TaskCompleted => "task_completed",
            Self::TaskOverridden => "task_overridden",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "created" => Some(Self::Created),
            "task_completed" => Some(Self::TaskCompleted),
            "task_overridden" => Some(Self::TaskOverridden),
            _ => None,
        }
    }
}

/// One entry in a client's follow-up audit trail.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientEvent {
    pub id: Uuid,
    pub client_id: Uuid,
    pub operation: EventOperation,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_follow_up: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_follow_up: Option<String>,
    pub recorded_at: DateTime<Utc>,
}
