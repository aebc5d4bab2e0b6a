use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::{Address, AsyncSendmailTransport, AsyncTransport, Message, Tokio1Executor};
use relay_logging::{relay_debug, relay_warn};

pub const SUBJECT: &str = "cwop-relay error";

/// Mails error reports through the local sendmail binary.
pub struct ErrorMailer {
    mailbox: Mailbox,
    transport: AsyncSendmailTransport<Tokio1Executor>,
}

impl ErrorMailer {
    pub fn new(address: &str) -> anyhow::Result<Self> {
        let address: Address = address.trim().parse()?;
        Ok(Self {
            mailbox: Mailbox::new(Some("cwop-relay".to_string()), address),
            transport: AsyncSendmailTransport::<Tokio1Executor>::new(),
        })
    }

    /// Best effort. A failure here is logged and otherwise ignored.
    pub async fn report(&self, body: &str) {
        if let Err(err) = self.send(body).await {
            relay_warn!("Could not mail error report to {}: {:#}", self.mailbox, err);
        }
    }

    async fn send(&self, body: &str) -> anyhow::Result<()> {
        let message = build_message(&self.mailbox, body)?;
        self.transport.send(message).await?;
        relay_debug!("Error report mailed to {}", self.mailbox);
        Ok(())
    }
}

fn build_message(mailbox: &Mailbox, body: &str) -> anyhow::Result<Message> {
    let message = Message::builder()
        .from(mailbox.clone())
        .to(mailbox.clone())
        .subject(SUBJECT)
        .header(ContentType::TEXT_PLAIN)
        .body(body.to_string())?;
    Ok(message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_malformed_address() {
        assert!(ErrorMailer::new("not an address").is_err());
        assert!(ErrorMailer::new(" ops@example.com ").is_ok());
    }

    #[test]
    fn message_carries_subject_and_body() {
        let mailbox: Mailbox = "cwop-relay <ops@example.com>".parse().unwrap();
        let message = build_message(&mailbox, "fetch failed (timeout)").unwrap();
        let raw = String::from_utf8(message.formatted()).unwrap();

        assert!(raw.contains("Subject: cwop-relay error"));
        assert!(raw.contains("ops@example.com"));
        assert!(raw.contains("fetch failed (timeout)"));
    }
}
