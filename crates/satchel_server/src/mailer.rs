use lettre::{
    message::{header::ContentType, Mailbox, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use satchel_common::errors::SatchelError;
use satchel_common::RESET_TOKEN_TTL_MINUTES;
use std::env;

/// Outbound mail over SMTP. Built once at startup and handed to rocket as
/// managed state.
pub struct Mailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl Mailer {
    /**
     * Builds the transport from EMAIL_HOST / EMAIL_USER / EMAIL_PASSWORD,
     * sending as EMAIL_FROM (defaults to EMAIL_USER)
     */
    pub fn from_env() -> Result<Self, SatchelError> {
        let host = env::var("EMAIL_HOST").unwrap_or_else(|_| String::from("smtp.gmail.com"));
        let user = env::var("EMAIL_USER").unwrap_or_default();
        let password = env::var("EMAIL_PASSWORD").unwrap_or_default();
        let from_address = match env::var("EMAIL_FROM") {
            Ok(from_address) => from_address,
            Err(_) if !user.is_empty() => user.clone(),
            Err(_) => String::from("no-reply@satchel.app"),
        };
        Self::new(&host, user, password, &from_address)
    }

    pub fn new(
        host: &str,
        user: String,
        password: String,
        from_address: &str,
    ) -> Result<Self, SatchelError> {
        let from = from_address
            .parse::<Mailbox>()
            .map_err(|e| SatchelError::MailError(format!("invalid sender address: {}", e)))?;
        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(host)
            .map_err(|e| SatchelError::MailError(format!("SMTP relay error: {}", e)))?
            .credentials(Credentials::new(user, password))
            .build();
        Ok(Self { transport, from })
    }

    /**
     * Sends the password reset email, plain text plus an html alternative
     *
     * @param to - recipient address
     * @param reset_url - SPA link embedding the raw reset token
     */
    pub async fn send_password_reset(&self, to: &str, reset_url: &str) -> Result<(), SatchelError> {
        let to = to
            .parse::<Mailbox>()
            .map_err(|e| SatchelError::MailError(format!("invalid recipient address: {}", e)))?;
        let text = format!(
            "You requested a password reset.\n\n\
             Open the link below within {} minutes to choose a new password:\n{}\n\n\
             If you did not request this, you can ignore this email.",
            RESET_TOKEN_TTL_MINUTES, reset_url
        );
        let html = format!(
            "<p>You requested a password reset.</p>\
             <p><a href=\"{}\">Choose a new password</a> (the link is valid for {} minutes).</p>\
             <p>If you did not request this, you can ignore this email.</p>",
            reset_url, RESET_TOKEN_TTL_MINUTES
        );
        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject("Reset your password")
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(text),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(html),
                    ),
            )
            .map_err(|e| SatchelError::MailError(format!("failed to build email: {}", e)))?;
        self.transport
            .send(message)
            .await
            .map_err(|e| SatchelError::MailError(e.to_string()))?;
        tracing::info!("password reset email sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mailer_builds_with_explicit_config() {
        let mailer = Mailer::new(
            "smtp.example.com",
            String::from("mailer@example.com"),
            String::from("hunter2"),
            "Satchel <no-reply@example.com>",
        );
        assert!(mailer.is_ok());
    }

    #[test]
    fn test_mailer_rejects_bad_sender() {
        let mailer = Mailer::new(
            "smtp.example.com",
            String::new(),
            String::new(),
            "not an address",
        );
        assert!(mailer.is_err());
    }
}
