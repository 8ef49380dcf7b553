use chrono::NaiveDateTime;
use serde::Serialize;

use crate::workflows::fees::RecordId;

use super::templates::TemplateKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EmailStatus {
    Success,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SmsStatus {
    Success,
    Failed,
    NotAttempted,
}

impl EmailStatus {
    pub fn label(self) -> &'static str {
        match self {
            EmailStatus::Success => "Success",
            EmailStatus::Failed => "Failed",
        }
    }
}

impl SmsStatus {
    pub fn label(self) -> &'static str {
        match self {
            SmsStatus::Success => "Success",
            SmsStatus::Failed => "Failed",
            SmsStatus::NotAttempted => "",
        }
    }
}

/// Result of one record's turn in a dispatch run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationOutcome {
    pub timestamp: NaiveDateTime,
    pub record_id: RecordId,
    pub student_name: String,
    pub parent_email: String,
    pub parent_phone: Option<String>,
    pub template: TemplateKind,
    pub email_status: EmailStatus,
    pub email_error: Option<String>,
    pub sms_status: SmsStatus,
    pub sms_error: Option<String>,
}

const LOG_HEADERS: [&str; 8] = [
    "Date-Time",
    "Status",
    "Student Name",
    "Parent Email",
    "Parent Phone",
    "SMS Status",
    "SMS Error",
    "Error",
];

/// Outcomes of the latest dispatch run in this session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotificationLog {
    entries: Vec<NotificationOutcome>,
}

impl NotificationLog {
    /// A new run discards the previous run's entries.
    pub fn replace(&mut self, outcomes: Vec<NotificationOutcome>) {
        self.entries = outcomes;
    }

    pub fn entries(&self) -> &[NotificationOutcome] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn for_record<'a>(
        &'a self,
        id: &'a RecordId,
    ) -> impl Iterator<Item = &'a NotificationOutcome> + 'a {
        self.entries.iter().filter(move |entry| &entry.record_id == id)
    }

    pub fn to_csv(&self) -> Result<Vec<u8>, csv::Error> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(LOG_HEADERS)?;
        for entry in &self.entries {
            let timestamp = entry.timestamp.format("%Y-%m-%d %H:%M:%S").to_string();
            writer.write_record([
                timestamp.as_str(),
                entry.email_status.label(),
                entry.student_name.as_str(),
                entry.parent_email.as_str(),
                entry.parent_phone.as_deref().unwrap_or(""),
                entry.sms_status.label(),
                entry.sms_error.as_deref().unwrap_or(""),
                entry.email_error.as_deref().unwrap_or(""),
            ])?;
        }
        writer
            .into_inner()
            .map_err(|err| csv::Error::from(err.into_error()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn outcome(id: &str, email_status: EmailStatus) -> NotificationOutcome {
        NotificationOutcome {
            timestamp: NaiveDate::from_ymd_opt(2024, 6, 1)
                .and_then(|date| date.and_hms_opt(9, 30, 0))
                .expect("valid timestamp"),
            record_id: RecordId(id.to_string()),
            student_name: id.to_uppercase(),
            parent_email: format!("{id}@x.com"),
            parent_phone: Some("9876543210".to_string()),
            template: TemplateKind::StandardReminder,
            email_status,
            email_error: (email_status == EmailStatus::Failed).then(|| "mailbox full".to_string()),
            sms_status: SmsStatus::NotAttempted,
            sms_error: None,
        }
    }

    #[test]
    fn replace_discards_previous_run() {
        let mut log = NotificationLog::default();
        log.replace(vec![outcome("a", EmailStatus::Success)]);
        log.replace(vec![outcome("b", EmailStatus::Failed)]);
        assert_eq!(log.entries().len(), 1);
        assert_eq!(log.for_record(&RecordId("a".to_string())).count(), 0);
        assert_eq!(log.for_record(&RecordId("b".to_string())).count(), 1);
    }

    #[test]
    fn csv_uses_operator_columns() {
        let mut log = NotificationLog::default();
        log.replace(vec![outcome("a", EmailStatus::Failed)]);
        let csv = String::from_utf8(log.to_csv().expect("csv")).expect("utf8");
        let mut lines = csv.lines();
        assert_eq!(
            lines.next(),
            Some("Date-Time,Status,Student Name,Parent Email,Parent Phone,SMS Status,SMS Error,Error")
        );
        assert_eq!(
            lines.next(),
            Some("2024-06-01 09:30:00,Failed,A,a@x.com,9876543210,,,mailbox full")
        );
    }
}
