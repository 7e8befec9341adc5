use std::fmt;
use std::time::Duration;

use crate::infra::gateway::MercadoPagoSettings;
use crate::infra::mailer::SmtpSettings;

/// Tickets service configuration loaded from environment variables.
pub struct TicketsConfig {
    /// PostgreSQL connection URL.
    pub database_url: String,
    /// TCP port for the HTTP server (default 3001). Env var: `TICKETS_PORT`.
    pub tickets_port: u16,
    /// Public URL of this service; the gateway posts notifications under it.
    pub public_base_url: String,
    pub mercadopago_base_url: String,
    pub mercadopago_access_token: String,
    pub checkout_success_url: String,
    pub checkout_failure_url: String,
    pub s3_bucket: String,
    /// Base of the URLs handed out for stored PDFs.
    pub s3_public_base_url: String,
    pub s3_tickets_prefix: String,
    pub s3_orders_prefix: String,
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_user: Option<String>,
    pub smtp_password: Option<String>,
    pub mail_from: String,
    /// Bound on every gateway, storage and mail call.
    pub upstream_timeout: Duration,
    /// How often the receipt worker looks for due outbox rows.
    pub outbox_poll_interval: Duration,
    /// Name printed on every ticket.
    pub venue_name: String,
}

fn var_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_owned())
}

fn parsed_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl TicketsConfig {
    pub fn from_env() -> Self {
        let s3_bucket = std::env::var("S3_BUCKET").expect("S3_BUCKET");
        Self {
            database_url: std::env::var("DATABASE_URL").expect("DATABASE_URL"),
            tickets_port: parsed_or("TICKETS_PORT", 3001),
            public_base_url: std::env::var("PUBLIC_BASE_URL").expect("PUBLIC_BASE_URL"),
            mercadopago_base_url: var_or("MERCADOPAGO_BASE_URL", "https://api.mercadopago.com"),
            mercadopago_access_token: std::env::var("MERCADOPAGO_ACCESS_TOKEN")
                .expect("MERCADOPAGO_ACCESS_TOKEN"),
            checkout_success_url: std::env::var("CHECKOUT_SUCCESS_URL")
                .expect("CHECKOUT_SUCCESS_URL"),
            checkout_failure_url: std::env::var("CHECKOUT_FAILURE_URL")
                .expect("CHECKOUT_FAILURE_URL"),
            s3_public_base_url: var_or(
                "S3_PUBLIC_BASE_URL",
                &format!("https://{s3_bucket}.s3.amazonaws.com"),
            ),
            s3_bucket,
            s3_tickets_prefix: var_or("S3_TICKETS_PREFIX", "tickets"),
            s3_orders_prefix: var_or("S3_ORDERS_PREFIX", "orders"),
            smtp_host: std::env::var("SMTP_HOST").expect("SMTP_HOST"),
            smtp_port: parsed_or("SMTP_PORT", 587),
            smtp_user: std::env::var("SMTP_USER").ok().filter(|v| !v.is_empty()),
            smtp_password: std::env::var("SMTP_PASSWORD").ok().filter(|v| !v.is_empty()),
            mail_from: std::env::var("MAIL_FROM").expect("MAIL_FROM"),
            upstream_timeout: Duration::from_secs(parsed_or("UPSTREAM_TIMEOUT_SECS", 10)),
            outbox_poll_interval: Duration::from_secs(parsed_or("OUTBOX_POLL_SECS", 5)),
            venue_name: var_or("VENUE_NAME", "Oasis Park"),
        }
    }

    pub fn gateway_settings(&self) -> MercadoPagoSettings {
        MercadoPagoSettings {
            base_url: self.mercadopago_base_url.clone(),
            access_token: self.mercadopago_access_token.clone(),
            public_base_url: self.public_base_url.clone(),
            success_url: self.checkout_success_url.clone(),
            failure_url: self.checkout_failure_url.clone(),
            timeout: self.upstream_timeout,
        }
    }

    pub fn smtp_settings(&self) -> SmtpSettings {
        SmtpSettings {
            host: self.smtp_host.clone(),
            port: self.smtp_port,
            username: self.smtp_user.clone(),
            password: self.smtp_password.clone(),
            from: self.mail_from.clone(),
            timeout: self.upstream_timeout,
        }
    }
}

impl fmt::Debug for TicketsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TicketsConfig")
            .field("database_url", &"[REDACTED]")
            .field("tickets_port", &self.tickets_port)
            .field("public_base_url", &self.public_base_url)
            .field("mercadopago_base_url", &self.mercadopago_base_url)
            .field("mercadopago_access_token", &"[REDACTED]")
            .field("s3_bucket", &self.s3_bucket)
            .field("s3_public_base_url", &self.s3_public_base_url)
            .field("smtp_host", &self.smtp_host)
            .field("smtp_port", &self.smtp_port)
            .field("smtp_user", &self.smtp_user)
            .field("smtp_password", &self.smtp_password.as_ref().map(|_| "[REDACTED]"))
            .field("mail_from", &self.mail_from)
            .field("upstream_timeout", &self.upstream_timeout)
            .field("outbox_poll_interval", &self.outbox_poll_interval)
            .finish_non_exhaustive()
    }
}
