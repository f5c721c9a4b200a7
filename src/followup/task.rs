//! Follow-up task enumeration and successor table.

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::status::OnboardingStatus;

/// Column value that marks onboarding as finished.
///
/// The dashboard's override dropdown uses the same sentinel, so it round
/// trips through storage and transport unchanged.
pub const DONE_SENTINEL: &str = "None";

/// A concrete outstanding follow-up task.
///
/// Labels are the exact strings stored and shown on the dashboard. The two
/// `🤖`-prefixed tasks are resolved by automation watching for payment and
/// documentation events, not by a staff member checking them off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FollowUpTask {
    #[serde(rename = "Call Client for Onboarding")]
    CallClientForOnboarding,
    #[serde(rename = "Send Valent Sign-Up SMS")]
    SendValentSignupSms,
    #[serde(rename = "Confirm Valent Signup")]
    ConfirmValentSignup,
    #[serde(rename = "Send Payment Link SMS")]
    SendPaymentLinkSms,
    #[serde(rename = "🤖 Confirm Payment")]
    ConfirmPayment,
    #[serde(rename = "Send DocSign Link SMS")]
    SendDocSignLinkSms,
    #[serde(rename = "🤖 Confirm Documentation")]
    ConfirmDocumentation,
    #[serde(rename = "Assign to Class")]
    AssignToClass,
    #[serde(rename = "Admin Call")]
    AdminCall,
}

impl FollowUpTask {
    /// All tasks, in pipeline order.
    pub const ALL: [FollowUpTask; 9] = [
        Self::CallClientForOnboarding,
        Self::SendValentSignupSms,
        Self::ConfirmValentSignup,
        Self::SendPaymentLinkSms,
        Self::ConfirmPayment,
        Self::SendDocSignLinkSms,
        Self::ConfirmDocumentation,
        Self::AssignToClass,
        Self::AdminCall,
    ];

    /// The stored/displayed label for this task.
    pub fn label(&self) -> &'static str {
        match self {
            Self::CallClientForOnboarding => "Call Client for Onboarding",
            Self::SendValentSignupSms => "Send Valent Sign-Up SMS",
            Self::ConfirmValentSignup => "Confirm Valent Signup",
            Self::SendPaymentLinkSms => "Send Payment Link SMS",
            Self::ConfirmPayment => "🤖 Confirm Payment",
            Self::SendDocSignLinkSms => "Send DocSign Link SMS",
            Self::ConfirmDocumentation => "🤖 Confirm Documentation",
            Self::AssignToClass => "Assign to Class",
            Self::AdminCall => "Admin Call",
        }
    }

    /// Parse a stored label.
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|task| task.label() == label)
    }

    /// Automatic tasks wait on an external process and cannot be completed
    /// by hand.
    pub fn is_automatic(&self) -> bool {
        matches!(self, Self::ConfirmPayment | Self::ConfirmDocumentation)
    }
}

impl std::fmt::Display for FollowUpTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// A client's follow-up position: a concrete task, or done.
///
/// Serializes as the task label, with `null` as the terminal sentinel on the
/// wire. This is the closed set of values the override endpoint accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FollowUp {
    Task(FollowUpTask),
    Done,
}

impl FollowUp {
    /// Successor position in the onboarding pipeline.
    ///
    /// Total: every position has a successor and `Done` is a fixed point.
    /// The two automatic tasks only reach here when the manual completion
    /// path was invoked on them — automation normally resolves them — so
    /// those arms emit a diagnostic before falling through to the next
    /// manual step.
    pub fn next(self) -> FollowUp {
        use FollowUpTask::*;
        match self {
            FollowUp::Task(task) => match task {
                CallClientForOnboarding => FollowUp::Task(SendValentSignupSms),
                SendValentSignupSms => FollowUp::Task(ConfirmValentSignup),
                ConfirmValentSignup => FollowUp::Task(SendPaymentLinkSms),
                SendPaymentLinkSms => FollowUp::Task(ConfirmPayment),
                ConfirmPayment => {
                    warn!(task = %task, "manual completion of an automatic task");
                    FollowUp::Task(SendDocSignLinkSms)
                }
                SendDocSignLinkSms => FollowUp::Task(ConfirmDocumentation),
                ConfirmDocumentation => {
                    warn!(task = %task, "manual completion of an automatic task");
                    FollowUp::Task(AssignToClass)
                }
                AssignToClass => FollowUp::Task(AdminCall),
                AdminCall => FollowUp::Done,
            },
            FollowUp::Done => FollowUp::Done,
        }
    }

    /// Derived coarse status for this position.
    pub fn status(self) -> OnboardingStatus {
        use FollowUpTask::*;
        match self {
            FollowUp::Task(task) => match task {
                CallClientForOnboarding | SendValentSignupSms | ConfirmValentSignup => {
                    OnboardingStatus::Initiation
                }
                SendPaymentLinkSms | ConfirmPayment => OnboardingStatus::PaymentPending,
                SendDocSignLinkSms | ConfirmDocumentation => {
                    OnboardingStatus::DocumentationPending
                }
                AssignToClass | AdminCall => OnboardingStatus::ReadyForClass,
            },
            FollowUp::Done => OnboardingStatus::Complete,
        }
    }

    /// Whether onboarding is finished.
    pub fn is_done(self) -> bool {
        matches!(self, FollowUp::Done)
    }

    /// Task label; `None` for the terminal state.
    pub fn label(self) -> Option<&'static str> {
        match self {
            FollowUp::Task(task) => Some(task.label()),
            FollowUp::Done => None,
        }
    }
}

/// The follow-up column as found on a stored client row.
///
/// Rows created by intake have no task assigned yet, and rows written before
/// the pipeline existed can carry labels the enumeration no longer knows.
/// Both still have a well-defined successor via [`next_task`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FollowUpField {
    /// No task has ever been assigned.
    Unset,
    /// A recognized pipeline position.
    Current(FollowUp),
    /// A label outside the closed enumeration, kept verbatim.
    Unrecognized(String),
}

impl FollowUpField {
    /// Interpret a raw column value.
    pub fn from_stored(raw: Option<&str>) -> Self {
        match raw {
            None => Self::Unset,
            Some(DONE_SENTINEL) => Self::Current(FollowUp::Done),
            Some(label) => match FollowUpTask::from_label(label) {
                Some(task) => Self::Current(FollowUp::Task(task)),
                None => Self::Unrecognized(label.to_string()),
            },
        }
    }

    /// The column value for this field.
    pub fn stored_label(&self) -> Option<&str> {
        match self {
            Self::Unset => None,
            Self::Current(FollowUp::Done) => Some(DONE_SENTINEL),
            Self::Current(FollowUp::Task(task)) => Some(task.label()),
            Self::Unrecognized(label) => Some(label),
        }
    }

    /// What the dashboard shows: the task label, or `null` for rows that are
    /// unset or complete (the status column distinguishes the two).
    pub fn display_label(&self) -> Option<&str> {
        match self {
            Self::Unset | Self::Current(FollowUp::Done) => None,
            Self::Current(FollowUp::Task(task)) => Some(task.label()),
            Self::Unrecognized(label) => Some(label),
        }
    }
}

impl From<FollowUp> for FollowUpField {
    fn from(follow_up: FollowUp) -> Self {
        Self::Current(follow_up)
    }
}

/// Labels that predate the pipeline; old rows stored the coarse status in
/// the follow-up column.
const LEGACY_STATUS_LABELS: [&str; 2] = ["Initial Contact", "Form Submitted"];

/// Successor for a stored follow-up value.
///
/// Total over anything the column can hold: unset rows and the legacy status
/// strings start the pipeline, and an unrecognized label falls back to the
/// pipeline start rather than wedging the workflow.
pub fn next_task(current: &FollowUpField) -> FollowUp {
    match current {
        FollowUpField::Unset => FollowUp::Task(FollowUpTask::CallClientForOnboarding),
        FollowUpField::Current(follow_up) => follow_up.next(),
        FollowUpField::Unrecognized(label) => {
            if !LEGACY_STATUS_LABELS.contains(&label.as_str()) {
                warn!(label = %label, "unrecognized follow-up label, restarting pipeline");
            }
            FollowUp::Task(FollowUpTask::CallClientForOnboarding)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_walks_whole_pipeline() {
        use FollowUpTask::*;
        let expected = [
            SendValentSignupSms,
            ConfirmValentSignup,
            SendPaymentLinkSms,
            ConfirmPayment,
            SendDocSignLinkSms,
            ConfirmDocumentation,
            AssignToClass,
            AdminCall,
        ];
        let mut current = FollowUp::Task(CallClientForOnboarding);
        for task in expected {
            current = current.next();
            assert_eq!(current, FollowUp::Task(task));
        }
        assert_eq!(current.next(), FollowUp::Done);
    }

    #[test]
    fn done_is_a_fixed_point() {
        assert_eq!(FollowUp::Done.next(), FollowUp::Done);
    }

    #[test]
    fn unset_and_legacy_labels_start_the_pipeline() {
        let start = FollowUp::Task(FollowUpTask::CallClientForOnboarding);
        assert_eq!(next_task(&FollowUpField::Unset), start);
        assert_eq!(
            next_task(&FollowUpField::Unrecognized("Initial Contact".into())),
            start
        );
        assert_eq!(
            next_task(&FollowUpField::Unrecognized("Form Submitted".into())),
            start
        );
    }

    #[test]
    fn unknown_label_falls_back_to_pipeline_start() {
        let field = FollowUpField::Unrecognized("Send Carrier Pigeon".into());
        assert_eq!(
            next_task(&field),
            FollowUp::Task(FollowUpTask::CallClientForOnboarding)
        );
    }

    #[test]
    fn automatic_tasks_fall_through_with_a_successor() {
        assert_eq!(
            FollowUp::Task(FollowUpTask::ConfirmPayment).next(),
            FollowUp::Task(FollowUpTask::SendDocSignLinkSms)
        );
        assert_eq!(
            FollowUp::Task(FollowUpTask::ConfirmDocumentation).next(),
            FollowUp::Task(FollowUpTask::AssignToClass)
        );
    }

    #[test]
    fn every_position_has_a_status() {
        // The derivation must cover the whole range of next().
        for task in FollowUpTask::ALL {
            let _ = FollowUp::Task(task).status();
            let _ = FollowUp::Task(task).next().status();
        }
        assert_eq!(FollowUp::Done.status(), OnboardingStatus::Complete);
    }

    #[test]
    fn status_buckets() {
        use FollowUpTask::*;
        let cases = [
            (CallClientForOnboarding, OnboardingStatus::Initiation),
            (SendValentSignupSms, OnboardingStatus::Initiation),
            (ConfirmValentSignup, OnboardingStatus::Initiation),
            (SendPaymentLinkSms, OnboardingStatus::PaymentPending),
            (ConfirmPayment, OnboardingStatus::PaymentPending),
            (SendDocSignLinkSms, OnboardingStatus::DocumentationPending),
            (ConfirmDocumentation, OnboardingStatus::DocumentationPending),
            (AssignToClass, OnboardingStatus::ReadyForClass),
            (AdminCall, OnboardingStatus::ReadyForClass),
        ];
        for (task, status) in cases {
            assert_eq!(FollowUp::Task(task).status(), status, "{task}");
        }
    }

    #[test]
    fn only_the_robot_tasks_are_automatic() {
        for task in FollowUpTask::ALL {
            assert_eq!(task.is_automatic(), task.label().starts_with("🤖"));
        }
    }

    #[test]
    fn labels_round_trip() {
        for task in FollowUpTask::ALL {
            assert_eq!(FollowUpTask::from_label(task.label()), Some(task));
        }
        assert_eq!(FollowUpTask::from_label("No Such Task"), None);
    }

    #[test]
    fn display_matches_serde() {
        for task in FollowUpTask::ALL {
            let json = serde_json::to_string(&task).unwrap();
            assert_eq!(json, format!("\"{task}\""));
        }
    }

    #[test]
    fn follow_up_serializes_done_as_null() {
        assert_eq!(serde_json::to_value(FollowUp::Done).unwrap(), serde_json::Value::Null);
        assert_eq!(
            serde_json::to_value(FollowUp::Task(FollowUpTask::AdminCall)).unwrap(),
            serde_json::json!("Admin Call")
        );
    }

    #[test]
    fn follow_up_deserializes_labels_and_null() {
        let task: FollowUp = serde_json::from_str("\"🤖 Confirm Payment\"").unwrap();
        assert_eq!(task, FollowUp::Task(FollowUpTask::ConfirmPayment));

        let done: FollowUp = serde_json::from_str("null").unwrap();
        assert_eq!(done, FollowUp::Done);

        assert!(serde_json::from_str::<FollowUp>("\"Paint the Fence\"").is_err());
    }

    #[test]
    fn from_stored_covers_all_column_shapes() {
        assert_eq!(FollowUpField::from_stored(None), FollowUpField::Unset);
        assert_eq!(
            FollowUpField::from_stored(Some("None")),
            FollowUpField::Current(FollowUp::Done)
        );
        assert_eq!(
            FollowUpField::from_stored(Some("Admin Call")),
            FollowUpField::Current(FollowUp::Task(FollowUpTask::AdminCall))
        );
        assert_eq!(
            FollowUpField::from_stored(Some("Initial Contact")),
            FollowUpField::Unrecognized("Initial Contact".into())
        );
    }

    #[test]
    fn stored_label_round_trips() {
        let fields = [
            FollowUpField::Unset,
            FollowUpField::Current(FollowUp::Done),
            FollowUpField::Current(FollowUp::Task(FollowUpTask::SendPaymentLinkSms)),
            FollowUpField::Unrecognized("Initial Contact".into()),
        ];
        for field in fields {
            assert_eq!(FollowUpField::from_stored(field.stored_label()), field);
        }
    }
}
