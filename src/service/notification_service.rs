// service/notification_service.rs
//
// Fire-and-forget signal to the delivery collaborator: a notification row is
// stored and the event is logged; actual push/email fan-out happens outside
// this engine. Failures are logged and swallowed, never propagated into the
// operation that triggered them. Callers dispatch only after their own
// transaction has committed.
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    db::db::DBClient,
    models::discoverymodel::MatchRecord,
    models::gigmodel::{Booking, GigApplication},
};

#[derive(Debug, Clone)]
pub struct NotificationService {
    db_client: Arc<DBClient>,
}

impl NotificationService {
    pub fn new(db_client: Arc<DBClient>) -> Self {
        Self { db_client }
    }

    pub async fn notify(
        &self,
        recipient_id: Uuid,
        notification_type: &str,
        title: &str,
        body: &str,
        deep_link: Option<String>,
    ) {
        if let Err(e) = self
            .store_notification(recipient_id, notification_type, title, body, deep_link, None)
            .await
        {
            tracing::warn!(
                "failed to store {} notification for {}: {}",
                notification_type,
                recipient_id,
                e
            );
        }
    }

    pub async fn notify_match_created(&self, record: &MatchRecord) {
        tracing::info!(
            "match {} created between performer {} and venue {}",
            record.id,
            record.performer_id,
            record.venue_id
        );

        futures::future::join_all([record.performer_id, record.venue_id].map(|recipient| {
            self.notify(
                recipient,
                "match_created",
                "It's a match!",
                "You have a new match. Start the conversation.",
                Some(format!("/matches/{}", record.id)),
            )
        }))
        .await;
    }

    pub async fn notify_application_accepted(&self, application: &GigApplication, booking: &Booking) {
        self.notify(
            application.performer_id,
            "application_accepted",
            "Application accepted",
            "Your application was accepted and a booking was created. Confirm to proceed.",
            Some(format!("/bookings/{}", booking.id)),
        )
        .await;
    }

    pub async fn notify_booking_confirmed(&self, booking: &Booking) {
        for recipient in [booking.performer_id, booking.venue_id] {
            self.notify(
                recipient,
                "booking_confirmed",
                "Booking confirmed",
                "Both parties confirmed the booking.",
                Some(format!("/bookings/{}", booking.id)),
            )
            .await;
        }
    }

    pub async fn notify_payment_received(&self, booking: &Booking, phase: &str) {
        self.notify(
            booking.performer_id,
            "payment_received",
            "Payment received",
            &format!("The {} payment for your booking has been confirmed.", phase),
            Some(format!("/bookings/{}", booking.id)),
        )
        .await;
    }

    /// Completion signals downstream review prompts for both sides.
    pub async fn notify_booking_completed(&self, booking: &Booking) {
        for recipient in [booking.performer_id, booking.venue_id] {
            self.notify(
                recipient,
                "booking_completed",
                "Booking completed",
                "The engagement is complete. Leave a review for your counterpart.",
                Some(format!("/bookings/{}/review", booking.id)),
            )
            .await;
        }
    }

    pub async fn notify_booking_cancelled(&self, booking: &Booking, cancelled_by: Uuid) {
        let other = if cancelled_by == booking.performer_id {
            booking.venue_id
        } else {
            booking.performer_id
        };
        self.notify(
            other,
            "booking_cancelled",
            "Booking cancelled",
            "Your booking was cancelled by the other party.",
            Some(format!("/bookings/{}", booking.id)),
        )
        .await;
    }

    async fn store_notification(
        &self,
        recipient_id: Uuid,
        notification_type: &str,
        title: &str,
        body: &str,
        deep_link: Option<String>,
        payload: Option<serde_json::Value>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO notifications (recipient_id, notification_type, title, body, deep_link, payload)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(recipient_id)
        .bind(notification_type)
        .bind(title)
        .bind(body)
        .bind(deep_link)
        .bind(payload)
        .execute(&self.db_client.pool)
        .await?;

        Ok(())
    }
}
