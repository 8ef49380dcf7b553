/// A file carried alongside a reminder or receipt mail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailAttachment {
    pub file_name: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

impl MailAttachment {
    pub fn png(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: "image/png",
            bytes,
        }
    }

    pub fn pdf(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: "application/pdf",
            bytes,
        }
    }
}

/// Plain-text mail with at most one attachment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub to: String,
    pub subject: String,
    pub body: String,
    pub attachment: Option<MailAttachment>,
}

/// Mail submission boundary so dispatch can be exercised without a mail server.
pub trait MailTransport: Send + Sync {
    fn send(&self, mail: &OutgoingMail) -> Result<(), TransportError>;
}

/// Bulk SMS boundary. `phone` is already normalized to ten digits.
pub trait SmsGateway: Send + Sync {
    fn send(&self, phone: &str, message: &str) -> Result<(), TransportError>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("invalid address '{address}': {reason}")]
    InvalidAddress { address: String, reason: String },
    #[error("could not build message: {0}")]
    Message(String),
    #[error("mail server error: {0}")]
    Smtp(String),
    #[error("SMS request failed: {0}")]
    Http(String),
    #[error("SMS gateway rejected the message (status {status}): {body}")]
    Rejected { status: u16, body: String },
}
