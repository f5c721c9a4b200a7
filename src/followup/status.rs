//! Coarse onboarding status, derived from the follow-up position.

use serde::{Deserialize, Serialize};

/// Summary bucket shown on the dashboard.
///
/// Always derived from the follow-up position via [`FollowUp::status`];
/// never written independently.
///
/// [`FollowUp::status`]: super::FollowUp::status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OnboardingStatus {
    #[default]
    #[serde(rename = "Initiation")]
    Initiation,
    #[serde(rename = "Payment Pending")]
    PaymentPending,
    #[serde(rename = "Documentation Pending")]
    DocumentationPending,
    #[serde(rename = "Ready for Class")]
    ReadyForClass,
    #[serde(rename = "Complete")]
    Complete,
}

impl OnboardingStatus {
    /// The stored/displayed label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Initiation => "Initiation",
            Self::PaymentPending => "Payment Pending",
            Self::DocumentationPending => "Documentation Pending",
            Self::ReadyForClass => "Ready for Class",
            Self::Complete => "Complete",
        }
    }

    /// Parse a stored label.
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "Initiation" => Some(Self::Initiation),
            "Payment Pending" => Some(Self::PaymentPending),
            "Documentation Pending" => Some(Self::DocumentationPending),
            "Ready for Class" => Some(Self::ReadyForClass),
            "Complete" => Some(Self::Complete),
            _ => None,
        }
    }
}

impl std::fmt::Display for OnboardingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [OnboardingStatus; 5] = [
        OnboardingStatus::Initiation,
        OnboardingStatus::PaymentPending,
        OnboardingStatus::DocumentationPending,
        OnboardingStatus::ReadyForClass,
        OnboardingStatus::Complete,
    ];

    #[test]
    fn labels_round_trip() {
        for status in ALL {
            assert_eq!(OnboardingStatus::from_label(status.label()), Some(status));
        }
        assert_eq!(OnboardingStatus::from_label("Enrolled"), None);
    }

    #[test]
    fn display_matches_serde() {
        for status in ALL {
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{status}\""));
        }
    }

    #[test]
    fn default_is_initiation() {
        assert_eq!(OnboardingStatus::default(), OnboardingStatus::Initiation);
    }
}
