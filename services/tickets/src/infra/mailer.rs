use std::time::Duration;

use anyhow::Context as _;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Tokio1Executor,
    message::{Attachment, Mailbox, Message, MultiPart, SinglePart, header::ContentType},
    transport::smtp::authentication::Credentials,
};

use crate::domain::repository::Mailer;
use crate::domain::types::ReceiptEmail;
use crate::error::TicketsServiceError;

pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from: String,
    pub timeout: Duration,
}

#[derive(Clone)]
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    /// Port 465 uses implicit TLS, 1025 is a local plaintext catcher, anything
    /// else upgrades with STARTTLS.
    pub fn new(settings: SmtpSettings) -> anyhow::Result<Self> {
        let mut builder = match settings.port {
            1025 => AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&settings.host),
            465 => AsyncSmtpTransport::<Tokio1Executor>::relay(&settings.host)
                .context("configure smtps relay")?,
            _ => AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.host)
                .context("configure starttls relay")?,
        }
        .port(settings.port)
        .timeout(Some(settings.timeout));
        if let (Some(user), Some(password)) = (settings.username, settings.password) {
            builder = builder.credentials(Credentials::new(user, password));
        }

        let from = settings
            .from
            .parse::<Mailbox>()
            .with_context(|| format!("invalid MAIL_FROM {:?}", settings.from))?;
        Ok(Self {
            transport: builder.build(),
            from,
        })
    }
}

pub fn receipt_subject(order_id: i64) -> String {
    format!("Your tickets, order #{order_id}")
}

pub fn receipt_text(email: &ReceiptEmail) -> String {
    format!(
        "Hello {name},\n\n\
         Thank you for your purchase. Your tickets for order #{order} are attached.\n\n\
         Payment method: {method}\n\
         Total: ${total}\n\n\
         Show the QR code on each ticket at the entrance.\n",
        name = email.to_name,
        order = email.order_id,
        method = email.payment_method.display_name(),
        total = email.total,
    )
}

fn receipt_html(email: &ReceiptEmail) -> String {
    format!(
        r#"<html><body style="font-family: sans-serif">
<h2>Hello {name},</h2>
<p>Thank you for your purchase. Your tickets for order <strong>#{order}</strong> are attached.</p>
<table>
<tr><td>Payment method</td><td>{method}</td></tr>
<tr><td>Total</td><td>${total}</td></tr>
</table>
<p>Show the QR code on each ticket at the entrance.</p>
</body></html>"#,
        name = html_escape(&email.to_name),
        order = email.order_id,
        method = email.payment_method.display_name(),
        total = email.total,
    )
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

impl Mailer for SmtpMailer {
    async fn send_receipt(&self, email: &ReceiptEmail) -> Result<(), TicketsServiceError> {
        let to = email
            .to_email
            .parse::<lettre::Address>()
            .map(|address| Mailbox::new(Some(email.to_name.clone()), address))
            .map_err(|e| TicketsServiceError::validation("to_email", e.to_string()))?;

        let pdf = Attachment::new(format!("order-{}.pdf", email.order_id)).body(
            email.pdf.clone(),
            ContentType::parse("application/pdf").context("pdf content type")?,
        );
        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(receipt_subject(email.order_id))
            .multipart(
                MultiPart::mixed()
                    .multipart(
                        MultiPart::alternative()
                            .singlepart(SinglePart::plain(receipt_text(email)))
                            .singlepart(SinglePart::html(receipt_html(email))),
                    )
                    .singlepart(pdf),
            )
            .context("build receipt email")?;

        self.transport
            .send(message)
            .await
            .with_context(|| format!("send receipt for order {}", email.order_id))
            .map_err(TicketsServiceError::upstream)?;
        tracing::debug!(order_id = email.order_id, "receipt email sent");
        Ok(())
    }
}
