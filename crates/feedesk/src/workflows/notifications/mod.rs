//! Reminder e-mail and SMS dispatch over the due records of a working set.

mod dispatcher;
mod fast2sms;
mod log;
mod phone;
mod smtp;
pub mod templates;
mod transport;

pub use dispatcher::{
    DispatchError, DispatchReport, DispatchSettings, MessagePreview, NotificationDispatcher,
    QR_ATTACHMENT_NAME,
};
pub use fast2sms::Fast2SmsGateway;
pub use log::{EmailStatus, NotificationLog, NotificationOutcome, SmsStatus};
pub use phone::{normalize_phone, PhoneError};
pub use smtp::SmtpMailTransport;
pub use templates::{
    render_template, template, ClassBracket, Language, MessageTemplate, TemplateKind,
    TemplateSelector, TemplateValues, DEFAULT_SMS_TEMPLATE,
};
pub use transport::{MailAttachment, MailTransport, OutgoingMail, SmsGateway, TransportError};

use crate::workflows::fees::FeeRecord;

pub const RECEIPT_ATTACHMENT_NAME: &str = "fee_receipt.pdf";

/// Mail carrying a record's PDF receipt to the parent.
pub fn receipt_mail(record: &FeeRecord, receipt_pdf: Vec<u8>, school_name: &str) -> OutgoingMail {
    OutgoingMail {
        to: record.email.clone(),
        subject: format!("{school_name} - Fee Receipt for {}", record.name),
        body: format!(
            "Dear Parent,\n\nPlease find attached the fee receipt for {}.\n\nThank you for your payment!\n\nRegards,\n{school_name}",
            record.name
        ),
        attachment: Some(MailAttachment::pdf(RECEIPT_ATTACHMENT_NAME, receipt_pdf)),
    }
}
