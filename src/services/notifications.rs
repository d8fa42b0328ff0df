//! Booking notifications (confirmation, reschedule, cancellation, reminders)

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use lettre::{
    message::{header::ContentType, Mailbox, Message, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    SmtpTransport, Transport,
};
use std::str::FromStr;

use crate::{
    config::EmailConfig,
    error::{AppError, AppResult},
    models::{booking::Booking, booking_link::BookingLink, reminder::Reminder},
};

/// Outbound notification channel. Callers treat every send as best-effort.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_confirmation(&self, link: &BookingLink, booking: &Booking) -> AppResult<()>;

    /// `previous_start` is the slot the booking moved away from
    async fn send_reschedule(
        &self,
        link: &BookingLink,
        booking: &Booking,
        previous_start: DateTime<Utc>,
    ) -> AppResult<()>;

    async fn send_cancellation(&self, link: &BookingLink, booking: &Booking) -> AppResult<()>;

    async fn send_reminder(&self, booking: &Booking, reminder: &Reminder) -> AppResult<()>;
}

/// Render an instant in the invitee's timezone
fn display_time(instant: DateTime<Utc>, timezone: &str) -> String {
    match timezone.parse::<Tz>() {
        Ok(tz) => instant
            .with_timezone(&tz)
            .format("%A %d %B %Y at %H:%M (%Z)")
            .to_string(),
        Err(_) => instant.format("%A %d %B %Y at %H:%M UTC").to_string(),
    }
}

/// Sends notifications over SMTP
#[derive(Clone)]
pub struct EmailNotifier {
    config: EmailConfig,
}

impl EmailNotifier {
    pub fn new(config: EmailConfig) -> Self {
        Self { config }
    }

    fn build_message(&self, to: &str, subject: &str, body: &str) -> AppResult<Message> {
        let from_name = self
            .config
            .smtp_from_name
            .as_deref()
            .unwrap_or("Meetlink");
        let from_mailbox = Mailbox::from_str(&format!("{} <{}>", from_name, self.config.smtp_from))
            .map_err(|e| AppError::Email(format!("Invalid from address: {}", e)))?;

        let to_mailbox = Mailbox::from_str(to)
            .map_err(|e| AppError::Email(format!("Invalid to address: {}", e)))?;

        Message::builder()
            .from(from_mailbox)
            .to(to_mailbox)
            .subject(subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(body.to_string()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(format!(
                                r#"<html><body><pre>{}</pre></body></html>"#,
                                body.replace('\n', "<br>")
                            )),
                    ),
            )
            .map_err(|e| AppError::Email(format!("Failed to build email: {}", e)))
    }

    fn mailer(&self) -> AppResult<SmtpTransport> {
        let builder = if self.config.smtp_use_tls {
            SmtpTransport::starttls_relay(&self.config.smtp_host)
                .map_err(|e| AppError::Email(format!("Failed to create SMTP transport: {}", e)))?
        } else {
            SmtpTransport::builder_dangerous(&self.config.smtp_host)
        }
        .port(self.config.smtp_port);

        let builder = match (&self.config.smtp_username, &self.config.smtp_password) {
            (Some(username), Some(password)) => {
                builder.credentials(Credentials::new(username.clone(), password.clone()))
            }
            _ => builder,
        };

        Ok(builder.build())
    }

    async fn send_email(&self, to: &str, subject: &str, body: &str) -> AppResult<()> {
        let email = self.build_message(to, subject, body)?;
        let mailer = self.mailer()?;

        // The SMTP transport blocks; keep it off the async workers
        tokio::task::spawn_blocking(move || mailer.send(&email))
            .await
            .map_err(|e| AppError::Internal(format!("Email task failed: {}", e)))?
            .map_err(|e| AppError::Email(format!("Failed to send email: {}", e)))?;

        tracing::debug!(to, subject, "email sent");
        Ok(())
    }
}

#[async_trait]
impl Notifier for EmailNotifier {
    async fn send_confirmation(&self, link: &BookingLink, booking: &Booking) -> AppResult<()> {
        let subject = format!("Confirmed: {}", link.name);
        let body = format!(
            r#"
Hello {name},

Your meeting "{title}" is confirmed for {when}.

It lasts {duration} minutes.
"#,
            name = booking.invitee_name,
            title = link.name,
            when = display_time(booking.scheduled_start, &booking.timezone),
            duration = link.duration_minutes,
        );

        self.send_email(&booking.invitee_email, &subject, &body).await
    }

    async fn send_reschedule(
        &self,
        link: &BookingLink,
        booking: &Booking,
        previous_start: DateTime<Utc>,
    ) -> AppResult<()> {
        let subject = format!("Rescheduled: {}", link.name);
        let body = format!(
            r#"
Hello {name},

Your meeting "{title}" has moved.

Previously: {before}
Now: {after}
"#,
            name = booking.invitee_name,
            title = link.name,
            before = display_time(previous_start, &booking.timezone),
            after = display_time(booking.scheduled_start, &booking.timezone),
        );

        self.send_email(&booking.invitee_email, &subject, &body).await
    }

    async fn send_cancellation(&self, link: &BookingLink, booking: &Booking) -> AppResult<()> {
        let subject = format!("Cancelled: {}", link.name);
        let reason = booking
            .cancellation_reason
            .as_deref()
            .map(|r| format!("\nReason: {}\n", r))
            .unwrap_or_default();
        let body = format!(
            r#"
Hello {name},

Your meeting "{title}" on {when} has been cancelled.
{reason}"#,
            name = booking.invitee_name,
            title = link.name,
            when = display_time(booking.scheduled_start, &booking.timezone),
            reason = reason,
        );

        self.send_email(&booking.invitee_email, &subject, &body).await
    }

    async fn send_reminder(&self, booking: &Booking, reminder: &Reminder) -> AppResult<()> {
        let subject = "Reminder: upcoming meeting";
        let body = format!(
            r#"
Hello {name},

This is a reminder of your meeting on {when}.
"#,
            name = booking.invitee_name,
            when = display_time(booking.scheduled_start, &booking.timezone),
        );

        tracing::debug!(reminder_id = %reminder.id, offset = reminder.offset_minutes, "sending reminder");
        self.send_email(&booking.invitee_email, subject, &body).await
    }
}

/// Logs notifications instead of delivering them (email disabled)
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send_confirmation(&self, link: &BookingLink, booking: &Booking) -> AppResult<()> {
        tracing::info!(booking_id = %booking.id, link = %link.slug, to = %booking.invitee_email, "confirmation");
        Ok(())
    }

    async fn send_reschedule(
        &self,
        link: &BookingLink,
        booking: &Booking,
        previous_start: DateTime<Utc>,
    ) -> AppResult<()> {
        tracing::info!(
            booking_id = %booking.id,
            link = %link.slug,
            from = %previous_start,
            to = %booking.scheduled_start,
            "reschedule notice"
        );
        Ok(())
    }

    async fn send_cancellation(&self, link: &BookingLink, booking: &Booking) -> AppResult<()> {
        tracing::info!(booking_id = %booking.id, link = %link.slug, "cancellation notice");
        Ok(())
    }

    async fn send_reminder(&self, booking: &Booking, reminder: &Reminder) -> AppResult<()> {
        tracing::info!(booking_id = %booking.id, reminder_id = %reminder.id, "reminder");
        Ok(())
    }
}
