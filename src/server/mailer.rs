//! Outgoing mail.

use std::sync::Mutex;

use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::{Message, SendmailTransport, Transport};

use super::RelayError;

/// One HTML message to one recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailMessage {
    /// Recipient address
    pub to: String,
    /// Sender address, also used for Reply-To
    pub from: String,
    /// Subject line
    pub subject: String,
    /// HTML body
    pub html: String,
}

impl MailMessage {
    /// Assemble the RFC 5322 message.
    pub fn to_message(&self) -> Result<Message, RelayError> {
        let from: Mailbox = self.from.parse()?;
        Ok(Message::builder()
            .from(from.clone())
            .reply_to(from)
            .to(self.to.parse()?)
            .subject(&self.subject)
            .header(ContentType::TEXT_HTML)
            .body(self.html.clone())?)
    }
}

/// Delivers messages. Implementations block; callers run them off the
/// async runtime.
pub trait Mailer: Send + Sync {
    /// Deliver one message.
    fn send(&self, message: &MailMessage) -> Result<(), RelayError>;
}

/// Hands messages to the local `sendmail` program.
#[derive(Debug)]
pub struct SendmailMailer {
    transport: SendmailTransport,
}

impl SendmailMailer {
    /// Use `sendmail` from `PATH`.
    pub fn new() -> Self {
        Self { transport: SendmailTransport::new() }
    }
}

impl Default for SendmailMailer {
    fn default() -> Self {
        Self::new()
    }
}

impl Mailer for SendmailMailer {
    fn send(&self, message: &MailMessage) -> Result<(), RelayError> {
        let email = message.to_message()?;
        self.transport.send(&email)?;
        Ok(())
    }
}

/// Keeps every message in memory.
#[derive(Debug, Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<MailMessage>>,
}

impl RecordingMailer {
    /// Create an empty mailbox.
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages sent so far.
    pub fn sent(&self) -> Vec<MailMessage> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

impl Mailer for RecordingMailer {
    fn send(&self, message: &MailMessage) -> Result<(), RelayError> {
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(message.clone());
        }
        Ok(())
    }
}
