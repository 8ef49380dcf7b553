use std::fmt;

use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};

use crate::config::{MailConfig, MailCredentials};

use super::transport::{MailTransport, OutgoingMail, TransportError};

/// Port that negotiates TLS with STARTTLS instead of wrapping the connection.
const SUBMISSION_PORT: u16 = 587;

/// Authenticated, encrypted mail submission through lettre's blocking SMTP client.
pub struct SmtpMailTransport {
    mailer: SmtpTransport,
    from: Mailbox,
}

impl SmtpMailTransport {
    /// The sender address doubles as the login, the way Gmail app passwords work.
    pub fn new(config: &MailConfig, credentials: &MailCredentials) -> Result<Self, TransportError> {
        let from = parse_mailbox(&credentials.username)?;

        let builder = if config.port == SUBMISSION_PORT {
            SmtpTransport::starttls_relay(&config.host)
        } else {
            SmtpTransport::relay(&config.host)
        }
        .map_err(|err| TransportError::Smtp(err.to_string()))?;

        let mailer = builder
            .port(config.port)
            .credentials(Credentials::new(
                credentials.username.clone(),
                credentials.password.clone(),
            ))
            .build();

        Ok(Self { mailer, from })
    }

    fn build_message(&self, mail: &OutgoingMail) -> Result<Message, TransportError> {
        let builder = Message::builder()
            .from(self.from.clone())
            .to(parse_mailbox(&mail.to)?)
            .subject(mail.subject.clone());

        let message = match &mail.attachment {
            Some(attachment) => {
                let content_type = ContentType::parse(attachment.content_type)
                    .map_err(|err| TransportError::Message(err.to_string()))?;
                builder.multipart(
                    MultiPart::mixed()
                        .singlepart(SinglePart::plain(mail.body.clone()))
                        .singlepart(
                            Attachment::new(attachment.file_name.clone())
                                .body(attachment.bytes.clone(), content_type),
                        ),
                )
            }
            None => builder
                .header(ContentType::TEXT_PLAIN)
                .body(mail.body.clone()),
        };

        message.map_err(|err| TransportError::Message(err.to_string()))
    }
}

impl MailTransport for SmtpMailTransport {
    fn send(&self, mail: &OutgoingMail) -> Result<(), TransportError> {
        let message = self.build_message(mail)?;
        self.mailer
            .send(&message)
            .map(|_| ())
            .map_err(|err| TransportError::Smtp(err.to_string()))
    }
}

impl fmt::Debug for SmtpMailTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmtpMailTransport")
            .field("from", &self.from.to_string())
            .finish_non_exhaustive()
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox, TransportError> {
    address
        .trim()
        .parse::<Mailbox>()
        .map_err(|err| TransportError::InvalidAddress {
            address: address.to_string(),
            reason: err.to_string(),
        })
}
