//! Booking notifications sent to hosts, guests and admins

use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox, Message},
    transport::smtp::authentication::Credentials,
    SmtpTransport, Transport,
};
use serde::Serialize;
use serde_json::Value;
use std::{str::FromStr, sync::Arc};

use crate::{
    config::EmailConfig,
    error::{AppError, AppResult},
    models::enums::Lang,
    repository::BookingStore,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationTemplate {
    /// New request awaiting the host
    BookingRequested,
    /// Host accepted the request
    BookingConfirmed,
    /// Payment captured, stay is reserved
    BookingApproved,
    BookingRejected,
    BookingCancelled,
    ReviewRequest,
}

impl NotificationTemplate {
    pub fn id(self) -> &'static str {
        match self {
            NotificationTemplate::BookingRequested => "booking_requested",
            NotificationTemplate::BookingConfirmed => "booking_confirmed",
            NotificationTemplate::BookingApproved => "booking_approved",
            NotificationTemplate::BookingRejected => "booking_rejected",
            NotificationTemplate::BookingCancelled => "booking_cancelled",
            NotificationTemplate::ReviewRequest => "review_request",
        }
    }

    pub fn subject(self, lang: Lang) -> &'static str {
        match (self, lang) {
            (NotificationTemplate::BookingRequested, Lang::En) => "New booking request",
            (NotificationTemplate::BookingRequested, Lang::Fr) => "Nouvelle demande de réservation",
            (NotificationTemplate::BookingConfirmed, Lang::En) => "Your booking was accepted",
            (NotificationTemplate::BookingConfirmed, Lang::Fr) => "Votre réservation a été acceptée",
            (NotificationTemplate::BookingApproved, Lang::En) => "Your booking is confirmed",
            (NotificationTemplate::BookingApproved, Lang::Fr) => "Votre réservation est confirmée",
            (NotificationTemplate::BookingRejected, Lang::En) => "Your booking request was declined",
            (NotificationTemplate::BookingRejected, Lang::Fr) => "Votre demande de réservation a été refusée",
            (NotificationTemplate::BookingCancelled, Lang::En) => "Your booking was cancelled",
            (NotificationTemplate::BookingCancelled, Lang::Fr) => "Votre réservation a été annulée",
            (NotificationTemplate::ReviewRequest, Lang::En) => "How was your stay?",
            (NotificationTemplate::ReviewRequest, Lang::Fr) => "Comment s'est passé votre séjour ?",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recipient {
    User(i32),
    Admins,
}

/// Fire-and-forget delivery; callers go through [`notify_quietly`]
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotificationService: Send + Sync {
    async fn send(
        &self,
        template: NotificationTemplate,
        recipient: Recipient,
        data: Value,
    ) -> AppResult<()>;
}

/// Send a notification, logging instead of propagating any failure
pub async fn notify_quietly(
    service: &dyn NotificationService,
    template: NotificationTemplate,
    recipient: Recipient,
    data: Value,
) {
    if let Err(e) = service.send(template, recipient.clone(), data).await {
        tracing::warn!(
            "Notification {} to {:?} failed: {}",
            template.id(),
            recipient,
            e
        );
    }
}

/// SMTP delivery of notification templates
#[derive(Clone)]
pub struct EmailNotificationService {
    config: EmailConfig,
    lang: Lang,
    store: Arc<dyn BookingStore>,
}

impl EmailNotificationService {
    pub fn new(config: EmailConfig, lang: Lang, store: Arc<dyn BookingStore>) -> Self {
        Self { config, lang, store }
    }

    async fn address_of(&self, recipient: &Recipient) -> AppResult<String> {
        match recipient {
            Recipient::Admins => Ok(self.config.admin_address.clone()),
            Recipient::User(user_id) => self
                .store
                .find_user_email(*user_id)
                .await?
                .ok_or_else(|| AppError::Internal(format!("No email address for user {}", user_id))),
        }
    }

    fn mailer(&self) -> AppResult<SmtpTransport> {
        let builder = if self.config.smtp_use_tls {
            SmtpTransport::starttls_relay(&self.config.smtp_host)
                .map_err(|e| AppError::Internal(format!("Failed to create SMTP transport: {}", e)))?
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
}

/// Plain-text body: the subject followed by the template data as key/value lines
pub fn render_body(subject: &str, data: &Value) -> String {
    let mut body = format!("{}\n\n", subject);
    if let Value::Object(fields) = data {
        for (name, value) in fields {
            let value = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            body.push_str(&format!("{}: {}\n", name, value));
        }
    }
    body
}

#[async_trait]
impl NotificationService for EmailNotificationService {
    async fn send(
        &self,
        template: NotificationTemplate,
        recipient: Recipient,
        data: Value,
    ) -> AppResult<()> {
        let to = self.address_of(&recipient).await?;
        let subject = template.subject(self.lang);

        let from_name = self.config.smtp_from_name.as_deref().unwrap_or("Rentals");
        let from_mailbox = Mailbox::from_str(&format!("{} <{}>", from_name, self.config.smtp_from))
            .map_err(|e| AppError::Internal(format!("Invalid from address: {}", e)))?;
        let to_mailbox = Mailbox::from_str(&to)
            .map_err(|e| AppError::Internal(format!("Invalid to address: {}", e)))?;

        let email = Message::builder()
            .from(from_mailbox)
            .to(to_mailbox)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(render_body(subject, &data))
            .map_err(|e| AppError::Internal(format!("Failed to build email: {}", e)))?;

        let mailer = self.mailer()?;
        tokio::task::spawn_blocking(move || mailer.send(&email))
            .await
            .map_err(|e| AppError::Internal(format!("Email task failed: {}", e)))?
            .map_err(|e| AppError::Internal(format!("Failed to send email: {}", e)))?;

        tracing::debug!("Sent {} notification to {:?}", template.id(), recipient);
        Ok(())
    }
}
