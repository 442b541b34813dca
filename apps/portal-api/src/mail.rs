//! Outgoing mail.
//!
//! Mail is a side channel: [`Mailer::send`] never fails, it reports a
//! [`MailOutcome`] the caller records and moves on.

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::{info, warn};

use crate::config::SmtpConfig;

/// Delivery result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailOutcome {
    pub success: bool,
    pub message: String,
}

impl MailOutcome {
    pub fn sent(to: &str) -> Self {
        MailOutcome {
            success: true,
            message: format!("Email sent successfully to {to}"),
        }
    }

    pub fn failed(to: &str, reason: impl std::fmt::Display) -> Self {
        MailOutcome {
            success: false,
            message: format!("Failed to send email to {to}: {reason}"),
        }
    }
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, html: &str) -> MailOutcome;
}

/// Errors building the SMTP transport.
#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("SMTP transport: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),

    #[error("Invalid sender address: {0}")]
    Address(#[from] lettre::address::AddressError),
}

/// STARTTLS relay with username/password authentication.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(config: &SmtpConfig) -> Result<Self, MailError> {
        let from: Mailbox = config.from.parse()?;
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)?
            .port(config.port)
            .credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ))
            .build();

        Ok(SmtpMailer { transport, from })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, to: &str, subject: &str, html: &str) -> MailOutcome {
        let recipient: Mailbox = match to.parse() {
            Ok(mailbox) => mailbox,
            Err(e) => return MailOutcome::failed(to, e),
        };

        let message = match Message::builder()
            .from(self.from.clone())
            .to(recipient)
            .subject(subject)
            .header(ContentType::TEXT_HTML)
            .body(html.to_string())
        {
            Ok(message) => message,
            Err(e) => return MailOutcome::failed(to, e),
        };

        match self.transport.send(message).await {
            Ok(_) => {
                info!(to = %to, subject = %subject, "Email sent");
                MailOutcome::sent(to)
            }
            Err(e) => {
                warn!(to = %to, error = %e, "Email delivery failed");
                MailOutcome::failed(to, e)
            }
        }
    }
}

/// Logs mail instead of sending it. Used when SMTP is not configured.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, to: &str, subject: &str, html: &str) -> MailOutcome {
        info!(to = %to, subject = %subject, bytes = html.len(), "SMTP not configured, email logged only");
        MailOutcome {
            success: false,
            message: "Email transport not configured".to_string(),
        }
    }
}

// =============================================================================
// Templates
// =============================================================================

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// "You've got coins" email carrying a redemption code.
pub fn redemption_code_email(
    employee_name: &str,
    code: &str,
    coin_amount: i64,
    company_name: &str,
    ttl_days: i64,
    app_url: &str,
) -> String {
    let name = escape(employee_name);
    let company = escape(company_name);
    let url = escape(app_url);
    format!(
        r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto; padding: 20px;">
  <div style="background: #4f46e5; padding: 30px; border-radius: 10px; text-align: center;">
    <h1 style="color: white; margin: 0;">You've Got Coins!</h1>
    <p style="color: #e0e7ff; margin: 10px 0 0 0;">From {company}</p>
  </div>
  <p>Hello {name},</p>
  <p>You have received <strong>{coin_amount} coins</strong> from <strong>{company}</strong>.
     Spend them on vouchers in the marketplace.</p>
  <div style="background: #2563eb; padding: 20px; border-radius: 8px; text-align: center;">
    <div style="background: white; padding: 15px; border-radius: 6px; font-size: 28px; font-weight: bold; letter-spacing: 4px; font-family: monospace; color: #2563eb;">{code}</div>
    <p style="color: #e0e7ff;">Worth {coin_amount} coins. Expires in {ttl_days} days and can be used once.</p>
  </div>
  <ol>
    <li>Sign in at <a href="{url}/login">{url}</a></li>
    <li>Open "Redeem Code"</li>
    <li>Enter <strong>{code}</strong></li>
  </ol>
  <p style="color: #6b7280; font-size: 14px;">PerkHub</p>
</div>"#
    )
}

/// Confirmation sent after a voucher purchase.
pub fn purchase_confirmation_email(
    employee_name: &str,
    voucher_title: &str,
    coin_value: i64,
    new_balance: i64,
    app_url: &str,
) -> String {
    let name = escape(employee_name);
    let title = escape(voucher_title);
    let url = escape(app_url);
    format!(
        r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto; padding: 20px;">
  <h2 style="color: #333;">Voucher purchased</h2>
  <p>Hello {name},</p>
  <p>You bought <strong>{title}</strong> for <strong>{coin_value} coins</strong>.
     Your remaining balance is {new_balance} coins.</p>
  <p>Find it under <a href="{url}/employee/vouchers">My Vouchers</a> and show it at the point of sale.</p>
  <p style="color: #6b7280; font-size: 14px;">PerkHub</p>
</div>"#
    )
}
