use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Identifier wrapper for admission requests.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AdmissionId(pub String);

/// Form fields captured for a prospective student. Every text field is required.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdmissionSubmission {
    pub student_name: String,
    pub father_name: String,
    pub mother_name: String,
    pub address: String,
    pub class: String,
    pub parent_mobile: String,
    pub registration_fee: Decimal,
}

/// Lifecycle of an admission request. `Pending` is the only non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdmissionStatus {
    Pending,
    Approved,
    Rejected,
}

impl AdmissionStatus {
    pub const fn label(self) -> &'static str {
        match self {
            AdmissionStatus::Pending => "Pending",
            AdmissionStatus::Approved => "Approved",
            AdmissionStatus::Rejected => "Rejected",
        }
    }

    pub const fn is_terminal(self) -> bool {
        !matches!(self, AdmissionStatus::Pending)
    }
}

/// Stored admission request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdmissionRequest {
    pub id: AdmissionId,
    pub submitted_at: NaiveDateTime,
    #[serde(flatten)]
    pub fields: AdmissionSubmission,
    pub status: AdmissionStatus,
    pub admin_comment: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdmissionAction {
    Approve,
    Reject,
}

impl AdmissionAction {
    pub const fn resulting_status(self) -> AdmissionStatus {
        match self {
            AdmissionAction::Approve => AdmissionStatus::Approved,
            AdmissionAction::Reject => AdmissionStatus::Rejected,
        }
    }
}

/// Operator decision on one pending request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdmissionDecision {
    pub action: AdmissionAction,
    #[serde(default)]
    pub comment: Option<String>,
}

/// Sanitized view returned by the HTTP surface.
#[derive(Debug, Clone, Serialize)]
pub struct AdmissionView {
    pub id: AdmissionId,
    pub submitted_at: String,
    pub student_name: String,
    pub class: String,
    pub registration_fee: Decimal,
    pub status: &'static str,
    pub admin_comment: String,
}

impl AdmissionRequest {
    pub fn view(&self) -> AdmissionView {
        AdmissionView {
            id: self.id.clone(),
            submitted_at: self.submitted_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            student_name: self.fields.student_name.clone(),
            class: self.fields.class.clone(),
            registration_fee: self.fields.registration_fee,
            status: self.status.label(),
            admin_comment: self.admin_comment.clone(),
        }
    }
}
