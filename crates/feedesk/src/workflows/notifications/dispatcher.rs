use std::sync::Arc;

use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::DEFAULT_SCHOOL_NAME;
use crate::workflows::fees::FeeRecord;

use super::log::{EmailStatus, NotificationOutcome, SmsStatus};
use super::phone::normalize_phone;
use super::templates::{
    render_template, template, Language, TemplateKind, TemplateSelector, TemplateValues,
    DEFAULT_SMS_TEMPLATE,
};
use super::transport::{MailAttachment, MailTransport, OutgoingMail, SmsGateway, TransportError};

pub const QR_ATTACHMENT_NAME: &str = "payment_qr.png";

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("sender e-mail and app password are required before sending reminders")]
    MissingCredentials,
    #[error("mail transport could not be prepared: {0}")]
    MailSetup(#[from] TransportError),
}

/// Operator choices for one dispatch run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchSettings {
    pub language: Language,
    pub operator_template: TemplateKind,
    pub bracket_override: bool,
    pub send_sms: bool,
    pub sms_template: String,
    pub school_name: String,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            language: Language::default(),
            operator_template: TemplateKind::default(),
            bracket_override: true,
            send_sms: false,
            sms_template: DEFAULT_SMS_TEMPLATE.to_string(),
            school_name: DEFAULT_SCHOOL_NAME.to_string(),
        }
    }
}

/// Rendered reminder for one record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessagePreview {
    pub record_id: String,
    pub template: TemplateKind,
    pub subject: String,
    pub body: String,
    pub sms: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispatchReport {
    pub outcomes: Vec<NotificationOutcome>,
    pub emails_sent: usize,
    pub sms_sent: usize,
    /// Records in the working set that were skipped because nothing is owed.
    pub skipped: usize,
}

/// Sends reminders to every due record of a working set, one record at a time.
pub struct NotificationDispatcher {
    settings: DispatchSettings,
    mail: Option<Arc<dyn MailTransport>>,
    sms: Option<Arc<dyn SmsGateway>>,
    clock: fn() -> NaiveDateTime,
}

impl NotificationDispatcher {
    pub fn new(settings: DispatchSettings) -> Self {
        Self {
            settings,
            mail: None,
            sms: None,
            clock: local_now,
        }
    }

    pub fn with_mail(mut self, mail: Arc<dyn MailTransport>) -> Self {
        self.mail = Some(mail);
        self
    }

    pub fn with_sms(mut self, sms: Arc<dyn SmsGateway>) -> Self {
        self.sms = Some(sms);
        self
    }

    pub fn with_clock(mut self, clock: fn() -> NaiveDateTime) -> Self {
        self.clock = clock;
        self
    }

    pub fn settings(&self) -> &DispatchSettings {
        &self.settings
    }

    /// Subject, body and SMS text the first due record would receive.
    pub fn preview<'a, I>(&self, records: I) -> Option<MessagePreview>
    where
        I: IntoIterator<Item = &'a FeeRecord>,
    {
        let record = records.into_iter().find(|record| record.is_due())?;
        let message = self.render(record);
        Some(MessagePreview {
            record_id: record.id.0.clone(),
            template: message.template,
            subject: message.subject,
            body: message.body,
            sms: message.sms,
        })
    }

    /// Failures are recorded per record and never stop the run. Zero-balance records are
    /// skipped without any send.
    pub fn dispatch<'a, I>(&self, records: I) -> Result<DispatchReport, DispatchError>
    where
        I: IntoIterator<Item = &'a FeeRecord>,
    {
        let mail = self.mail.as_ref().ok_or(DispatchError::MissingCredentials)?;

        let mut outcomes = Vec::new();
        let mut skipped = 0;
        for record in records {
            if !record.is_due() {
                skipped += 1;
                continue;
            }
            outcomes.push(self.notify(mail.as_ref(), record));
        }

        let report = DispatchReport {
            emails_sent: outcomes
                .iter()
                .filter(|outcome| outcome.email_status == EmailStatus::Success)
                .count(),
            sms_sent: outcomes
                .iter()
                .filter(|outcome| outcome.sms_status == SmsStatus::Success)
                .count(),
            skipped,
            outcomes,
        };

        info!(
            attempted = report.outcomes.len(),
            emails_sent = report.emails_sent,
            sms_sent = report.sms_sent,
            skipped = report.skipped,
            "dispatch run finished"
        );
        Ok(report)
    }

    fn notify(&self, mail: &dyn MailTransport, record: &FeeRecord) -> NotificationOutcome {
        let message = self.render(record);

        let outgoing = OutgoingMail {
            to: record.email.clone(),
            subject: message.subject,
            body: message.body,
            attachment: qr_attachment(record),
        };
        let (email_status, email_error) = match mail.send(&outgoing) {
            Ok(()) => (EmailStatus::Success, None),
            Err(err) => {
                warn!(record = %record.id, email = %record.email, error = %err, "reminder e-mail failed");
                (EmailStatus::Failed, Some(err.to_string()))
            }
        };

        let (sms_status, sms_error) = self.send_sms(record, &message.sms);

        NotificationOutcome {
            timestamp: (self.clock)(),
            record_id: record.id.clone(),
            student_name: record.name.clone(),
            parent_email: record.email.clone(),
            parent_phone: record.phone.clone(),
            template: message.template,
            email_status,
            email_error,
            sms_status,
            sms_error,
        }
    }

    fn send_sms(&self, record: &FeeRecord, text: &str) -> (SmsStatus, Option<String>) {
        if !self.settings.send_sms {
            return (SmsStatus::NotAttempted, None);
        }
        let Some(raw) = record.phone.as_deref() else {
            return (
                SmsStatus::NotAttempted,
                Some("no phone number on record".to_string()),
            );
        };
        let phone = match normalize_phone(raw) {
            Ok(phone) => phone,
            Err(err) => return (SmsStatus::NotAttempted, Some(err.to_string())),
        };
        let Some(gateway) = &self.sms else {
            return (
                SmsStatus::NotAttempted,
                Some("SMS gateway is not configured".to_string()),
            );
        };

        match gateway.send(&phone, text) {
            Ok(()) => (SmsStatus::Success, None),
            Err(err) => {
                warn!(record = %record.id, phone = %phone, error = %err, "reminder SMS failed");
                (SmsStatus::Failed, Some(err.to_string()))
            }
        }
    }

    fn render(&self, record: &FeeRecord) -> RenderedMessage {
        let selector =
            TemplateSelector::new(self.settings.operator_template, self.settings.bracket_override);
        let kind = selector.resolve(record.class_label());
        let chosen = template(self.settings.language, kind);

        let due_amount = record.dues_display();
        let values = TemplateValues {
            student_name: &record.name,
            student_class: record.class_label(),
            due_amount: &due_amount,
            school_name: &self.settings.school_name,
        };

        let mut body = render_template(chosen.body, &values);
        if !record.payment_link.is_empty() {
            body.push_str(&format!("\n\n[Click here to pay now]({})", record.payment_link));
        }

        RenderedMessage {
            template: kind,
            subject: render_template(chosen.subject, &values),
            body,
            sms: render_template(&self.settings.sms_template, &values),
        }
    }
}

struct RenderedMessage {
    template: TemplateKind,
    subject: String,
    body: String,
    sms: String,
}

fn local_now() -> NaiveDateTime {
    Local::now().naive_local()
}

/// An undecodable QR is dropped and the reminder goes out as plain text.
fn qr_attachment(record: &FeeRecord) -> Option<MailAttachment> {
    let qr = record.payment_qr.as_ref()?;
    match qr.png_bytes() {
        Ok(bytes) => Some(MailAttachment::png(QR_ATTACHMENT_NAME, bytes)),
        Err(err) => {
            warn!(record = %record.id, error = %err, "payment QR could not be attached");
            None
        }
    }
}
