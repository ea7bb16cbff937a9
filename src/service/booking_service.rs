// service/booking_service.rs
//
// The booking lifecycle state machine. Authorization runs before any state
// guard; state guards run before any mutation; transition legality itself is
// the pure `BookingStatus::can_transition_to`. Notifications always fire
// after the data has committed.
use chrono::Utc;
use num_traits::ToPrimitive;
use sqlx::types::BigDecimal;
use sqlx::Error as SqlxError;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    db::{
        db::DBClient,
        gigdb::{GigExt, GUARD_APPLICATION_NOT_PENDING, GUARD_GIG_NOT_OPEN},
        matchdb::MatchExt,
    },
    dtos::bookingdtos::{CreateBookingFromMatchDto, PaymentIntentDto},
    dtos::gigdtos::AcceptApplicationDto,
    models::actormodel::ActorProfile,
    models::discoverymodel::MatchStatus,
    models::gigmodel::{ApplicationStatus, Booking, BookingParty, BookingStatus},
    service::{
        error::ServiceError, notification_service::NotificationService,
        payment_provider::PaymentProviderService,
    },
};

const DEFAULT_CURRENCY: &str = "USD";
const DEFAULT_DEPOSIT_PERCENTAGE: i32 = 25;

#[derive(Debug, Clone)]
pub struct BookingService {
    db_client: Arc<DBClient>,
    payment_provider: Arc<PaymentProviderService>,
    notification_service: Arc<NotificationService>,
}

impl BookingService {
    pub fn new(
        db_client: Arc<DBClient>,
        payment_provider: Arc<PaymentProviderService>,
        notification_service: Arc<NotificationService>,
    ) -> Self {
        Self {
            db_client,
            payment_provider,
            notification_service,
        }
    }

    pub(crate) fn compute_deposit(agreed: &BigDecimal, percentage: i32) -> BigDecimal {
        (agreed * BigDecimal::from(percentage)) / BigDecimal::from(100)
    }

    /// Accept a pending application and create the booking, transactionally.
    /// The venue's side of the booking arrives pre-confirmed.
    pub async fn accept_application(
        &self,
        venue: &ActorProfile,
        application_id: Uuid,
        body: AcceptApplicationDto,
    ) -> Result<Booking, ServiceError> {
        let application = self
            .db_client
            .get_application_by_id(application_id)
            .await?
            .ok_or(ServiceError::ApplicationNotFound(application_id))?;

        let gig = self
            .db_client
            .get_gig_by_id(application.gig_id)
            .await?
            .ok_or(ServiceError::GigNotFound(application.gig_id))?;

        if gig.venue_id != venue.id {
            return Err(ServiceError::Forbidden(venue.id, application_id));
        }

        // Cheap pre-checks; the transaction re-validates under row locks.
        if application.status != ApplicationStatus::Pending {
            return Err(ServiceError::InvalidState(
                "application is not pending".to_string(),
            ));
        }
        if !gig.accepts_applications() {
            return Err(ServiceError::InvalidState(
                "gig is no longer open".to_string(),
            ));
        }
        if gig.roster_full() {
            return Err(ServiceError::InvalidState(
                "gig roster is already full".to_string(),
            ));
        }

        let agreed = match body.agreed_amount {
            Some(amount) => BigDecimal::try_from(amount)
                .map_err(|_| ServiceError::Validation("Invalid agreed amount".to_string()))?,
            None => application.proposed_rate.clone(),
        };
        let deposit = Self::compute_deposit(&agreed, gig.deposit_percentage);
        let currency = body.currency.unwrap_or_else(|| DEFAULT_CURRENCY.to_string());

        let (accepted, _gig, booking) = self
            .db_client
            .accept_application_and_create_booking(application_id, agreed, deposit, currency)
            .await
            .map_err(Self::map_acceptance_error)?;

        tracing::info!(
            "application {} accepted, booking {} created",
            accepted.id,
            booking.id
        );

        let notifications = self.notification_service.clone();
        let booking_for_notify = booking.clone();
        tokio::spawn(async move {
            notifications
                .notify_application_accepted(&accepted, &booking_for_notify)
                .await;
        });

        Ok(booking)
    }

    fn map_acceptance_error(error: SqlxError) -> ServiceError {
        match &error {
            SqlxError::RowNotFound => {
                ServiceError::InvalidState("application or gig disappeared mid-flight".to_string())
            }
            SqlxError::Protocol(msg) if msg == GUARD_APPLICATION_NOT_PENDING => {
                ServiceError::InvalidState("application is not pending".to_string())
            }
            SqlxError::Protocol(msg) if msg == GUARD_GIG_NOT_OPEN => {
                ServiceError::InvalidState("gig is no longer open".to_string())
            }
            _ => ServiceError::Database(error),
        }
    }

    /// Promote an active match into a booking offer from the venue side.
    pub async fn create_booking_from_match(
        &self,
        venue: &ActorProfile,
        body: CreateBookingFromMatchDto,
    ) -> Result<Booking, ServiceError> {
        let record = self
            .db_client
            .get_match_by_id(body.match_id)
            .await?
            .ok_or(ServiceError::MatchNotFound(body.match_id))?;

        if record.venue_id != venue.id {
            return Err(ServiceError::Forbidden(venue.id, body.match_id));
        }
        if record.status != MatchStatus::Active {
            return Err(ServiceError::InvalidState(format!(
                "match is {:?}, not active",
                record.status
            )));
        }

        let agreed = BigDecimal::try_from(body.agreed_amount)
            .map_err(|_| ServiceError::Validation("Invalid agreed amount".to_string()))?;
        let deposit = Self::compute_deposit(
            &agreed,
            body.deposit_percentage.unwrap_or(DEFAULT_DEPOSIT_PERCENTAGE),
        );
        let currency = body.currency.unwrap_or_else(|| DEFAULT_CURRENCY.to_string());

        let booking = self
            .db_client
            .create_booking_from_match(
                record.id,
                record.performer_id,
                record.venue_id,
                body.event_date,
                agreed,
                deposit,
                currency,
            )
            .await?;

        let notifications = self.notification_service.clone();
        let booking_for_notify = booking.clone();
        tokio::spawn(async move {
            notifications
                .notify(
                    booking_for_notify.performer_id,
                    "booking_offered",
                    "New booking offer",
                    "A venue you matched with sent you a booking offer.",
                    Some(format!("/bookings/{}", booking_for_notify.id)),
                )
                .await;
        });

        Ok(booking)
    }

    pub async fn get_booking_for_actor(
        &self,
        actor: &ActorProfile,
        booking_id: Uuid,
    ) -> Result<Booking, ServiceError> {
        let booking = self.fetch(booking_id).await?;
        self.ensure_party(actor, &booking)?;
        Ok(booking)
    }

    /// Set the caller's confirmation flag. Both flags flip the status to
    /// `confirmed`; confirming twice is a no-op, not an error.
    pub async fn confirm(
        &self,
        actor: &ActorProfile,
        booking_id: Uuid,
    ) -> Result<Booking, ServiceError> {
        let booking = self.fetch(booking_id).await?;
        let party = self.ensure_party(actor, &booking)?;

        if booking.status.is_terminal() {
            return Err(ServiceError::InvalidState(format!(
                "booking is {:?}",
                booking.status
            )));
        }

        let already_confirmed = match party {
            BookingParty::Performer => booking.performer_confirmed,
            BookingParty::Venue => booking.venue_confirmed,
        };
        if already_confirmed {
            return Ok(booking);
        }

        let updated = self
            .db_client
            .confirm_booking_party(
                booking.id,
                party == BookingParty::Performer,
                Utc::now(),
            )
            .await?;

        if updated.both_confirmed() && booking.status == BookingStatus::Pending {
            let notifications = self.notification_service.clone();
            let booking_for_notify = updated.clone();
            tokio::spawn(async move {
                notifications.notify_booking_confirmed(&booking_for_notify).await;
            });
        }

        Ok(updated)
    }

    /// Create the deposit payment intent. Only valid once both parties have
    /// confirmed.
    pub async fn initiate_deposit(
        &self,
        actor: &ActorProfile,
        booking_id: Uuid,
    ) -> Result<PaymentIntentDto, ServiceError> {
        let booking = self.fetch(booking_id).await?;
        self.ensure_party(actor, &booking)?;

        if booking.status != BookingStatus::Confirmed {
            return Err(ServiceError::InvalidState(format!(
                "deposit can only be initiated from confirmed, booking is {:?}",
                booking.status
            )));
        }

        let amount = booking
            .deposit_amount
            .to_f64()
            .filter(|a| *a > 0.0)
            .ok_or_else(|| ServiceError::InvalidState("booking has no deposit".to_string()))?;

        let intent = self
            .payment_provider
            .create_payment_intent(
                amount,
                &booking.currency,
                serde_json::json!({ "booking_id": booking.id, "phase": "deposit" }),
            )
            .await?;

        let updated = self.db_client.set_deposit_intent(booking.id, &intent.id).await?;

        Ok(PaymentIntentDto {
            intent_ref: intent.id,
            client_secret: intent.client_secret,
            amount,
            currency: updated.currency.clone(),
            booking: updated,
        })
    }

    /// Client-driven deposit confirmation: the submitted reference must match
    /// the stored one (replay protection) and the gateway must agree the
    /// intent succeeded.
    pub async fn confirm_deposit(
        &self,
        actor: &ActorProfile,
        booking_id: Uuid,
        intent_ref: &str,
    ) -> Result<Booking, ServiceError> {
        let booking = self.fetch(booking_id).await?;
        self.ensure_party(actor, &booking)?;
        self.guard_deposit_confirmable(&booking, intent_ref)?;

        let status = self.payment_provider.confirm(intent_ref).await?;
        if status != "succeeded" {
            return Err(ServiceError::Payment(format!(
                "gateway reported intent status {}",
                status
            )));
        }

        self.apply_deposit_paid(&booking).await
    }

    pub async fn initiate_final_payment(
        &self,
        actor: &ActorProfile,
        booking_id: Uuid,
    ) -> Result<PaymentIntentDto, ServiceError> {
        let booking = self.fetch(booking_id).await?;
        self.ensure_party(actor, &booking)?;

        if !matches!(
            booking.status,
            BookingStatus::DepositPaid | BookingStatus::Confirmed
        ) {
            return Err(ServiceError::InvalidState(format!(
                "final payment can only be initiated from deposit_paid or confirmed, booking is {:?}",
                booking.status
            )));
        }

        let amount = booking
            .remaining_amount()
            .to_f64()
            .filter(|a| *a > 0.0)
            .ok_or_else(|| ServiceError::InvalidState("nothing left to pay".to_string()))?;

        let intent = self
            .payment_provider
            .create_payment_intent(
                amount,
                &booking.currency,
                serde_json::json!({ "booking_id": booking.id, "phase": "final" }),
            )
            .await?;

        let updated = self.db_client.set_final_intent(booking.id, &intent.id).await?;

        Ok(PaymentIntentDto {
            intent_ref: intent.id,
            client_secret: intent.client_secret,
            amount,
            currency: updated.currency.clone(),
            booking: updated,
        })
    }

    pub async fn confirm_final_payment(
        &self,
        actor: &ActorProfile,
        booking_id: Uuid,
        intent_ref: &str,
    ) -> Result<Booking, ServiceError> {
        let booking = self.fetch(booking_id).await?;
        self.ensure_party(actor, &booking)?;
        self.guard_final_confirmable(&booking, intent_ref)?;

        let status = self.payment_provider.confirm(intent_ref).await?;
        if status != "succeeded" {
            return Err(ServiceError::Payment(format!(
                "gateway reported intent status {}",
                status
            )));
        }

        self.apply_final_paid(&booking).await
    }

    /// Gateway webhook entry point: resolve the booking through the stored
    /// intent reference and apply the matching milestone. The handler has
    /// already verified the webhook signature.
    pub async fn apply_gateway_event(
        &self,
        event: &str,
        intent_ref: &str,
    ) -> Result<(), ServiceError> {
        if event != "payment_intent.succeeded" {
            tracing::debug!("ignoring gateway event {}", event);
            return Ok(());
        }

        let Some(booking) = self.db_client.find_booking_by_intent_ref(intent_ref).await? else {
            tracing::warn!("webhook for unknown intent {}", intent_ref);
            return Ok(());
        };

        if booking.deposit_intent_ref.as_deref() == Some(intent_ref) {
            self.guard_deposit_confirmable(&booking, intent_ref)?;
            self.apply_deposit_paid(&booking).await?;
        } else {
            self.guard_final_confirmable(&booking, intent_ref)?;
            self.apply_final_paid(&booking).await?;
        }

        Ok(())
    }

    fn guard_deposit_confirmable(
        &self,
        booking: &Booking,
        intent_ref: &str,
    ) -> Result<(), ServiceError> {
        if booking.status != BookingStatus::Confirmed {
            return Err(ServiceError::InvalidState(format!(
                "deposit cannot be confirmed while booking is {:?}",
                booking.status
            )));
        }
        if booking.deposit_intent_ref.as_deref() != Some(intent_ref) {
            return Err(ServiceError::InvalidState(
                "payment reference does not match the recorded intent".to_string(),
            ));
        }
        Ok(())
    }

    fn guard_final_confirmable(
        &self,
        booking: &Booking,
        intent_ref: &str,
    ) -> Result<(), ServiceError> {
        if !matches!(
            booking.status,
            BookingStatus::DepositPaid | BookingStatus::Confirmed
        ) {
            return Err(ServiceError::InvalidState(format!(
                "final payment cannot be confirmed while booking is {:?}",
                booking.status
            )));
        }
        if booking.final_intent_ref.as_deref() != Some(intent_ref) {
            return Err(ServiceError::InvalidState(
                "payment reference does not match the recorded intent".to_string(),
            ));
        }
        Ok(())
    }

    async fn apply_deposit_paid(&self, booking: &Booking) -> Result<Booking, ServiceError> {
        let updated = self
            .db_client
            .confirm_deposit_payment(booking.id, Utc::now())
            .await?;

        let notifications = self.notification_service.clone();
        let booking_for_notify = updated.clone();
        tokio::spawn(async move {
            notifications
                .notify_payment_received(&booking_for_notify, "deposit")
                .await;
        });

        Ok(updated)
    }

    async fn apply_final_paid(&self, booking: &Booking) -> Result<Booking, ServiceError> {
        let updated = self
            .db_client
            .confirm_final_payment(booking.id, Utc::now())
            .await?;

        let notifications = self.notification_service.clone();
        let booking_for_notify = updated.clone();
        tokio::spawn(async move {
            notifications
                .notify_payment_received(&booking_for_notify, "final")
                .await;
        });

        Ok(updated)
    }

    /// Read-only gateway status poll for either payment phase; the one
    /// payment call that is safe to retry.
    pub async fn payment_status(
        &self,
        actor: &ActorProfile,
        booking_id: Uuid,
        phase: &str,
    ) -> Result<String, ServiceError> {
        let booking = self.fetch(booking_id).await?;
        self.ensure_party(actor, &booking)?;

        let intent_ref = match phase {
            "deposit" => booking.deposit_intent_ref.clone(),
            "final" => booking.final_intent_ref.clone(),
            _ => {
                return Err(ServiceError::Validation(format!(
                    "unknown payment phase {}",
                    phase
                )))
            }
        }
        .ok_or_else(|| {
            ServiceError::InvalidState(format!("no {} payment has been initiated", phase))
        })?;

        self.payment_provider.get_intent_status(&intent_ref).await
    }

    /// Either party flags the engagement as underway.
    pub async fn start(
        &self,
        actor: &ActorProfile,
        booking_id: Uuid,
    ) -> Result<Booking, ServiceError> {
        let booking = self.fetch(booking_id).await?;
        self.ensure_party(actor, &booking)?;

        if !booking.status.can_transition_to(BookingStatus::InProgress) {
            return Err(ServiceError::InvalidState(format!(
                "cannot start a booking that is {:?}",
                booking.status
            )));
        }

        Ok(self
            .db_client
            .update_booking_status(booking.id, BookingStatus::InProgress)
            .await?)
    }

    /// Set the caller's completion flag; both flags complete the booking and
    /// trigger the review prompt signal.
    pub async fn complete(
        &self,
        actor: &ActorProfile,
        booking_id: Uuid,
    ) -> Result<Booking, ServiceError> {
        let booking = self.fetch(booking_id).await?;
        let party = self.ensure_party(actor, &booking)?;

        if !matches!(
            booking.status,
            BookingStatus::DepositPaid | BookingStatus::Paid | BookingStatus::InProgress
        ) {
            return Err(ServiceError::InvalidState(format!(
                "cannot complete a booking that is {:?}",
                booking.status
            )));
        }

        let already_completed = match party {
            BookingParty::Performer => booking.performer_completed,
            BookingParty::Venue => booking.venue_completed,
        };
        if already_completed {
            return Ok(booking);
        }

        let updated = self
            .db_client
            .complete_booking_party(booking.id, party == BookingParty::Performer, Utc::now())
            .await?;

        if updated.both_completed() {
            let notifications = self.notification_service.clone();
            let booking_for_notify = updated.clone();
            tokio::spawn(async move {
                notifications.notify_booking_completed(&booking_for_notify).await;
            });
        }

        Ok(updated)
    }

    /// Cancel from any non-terminal state. A paid deposit flags a refund as
    /// owed; executing the refund belongs to the payment collaborator, never
    /// to this call.
    pub async fn cancel(
        &self,
        actor: &ActorProfile,
        booking_id: Uuid,
        reason: String,
    ) -> Result<Booking, ServiceError> {
        let booking = self.fetch(booking_id).await?;
        self.ensure_party(actor, &booking)?;

        if !booking.status.can_transition_to(BookingStatus::Cancelled) {
            return Err(ServiceError::InvalidState(format!(
                "cannot cancel a booking that is {:?}",
                booking.status
            )));
        }

        let refund_owed = booking.deposit_paid;
        let refund_amount = refund_owed.then(|| booking.deposit_amount.clone());

        let updated = self
            .db_client
            .cancel_booking(
                booking.id,
                actor.id,
                reason,
                Utc::now(),
                refund_owed,
                refund_amount,
            )
            .await?;

        let notifications = self.notification_service.clone();
        let booking_for_notify = updated.clone();
        let cancelled_by = actor.id;
        tokio::spawn(async move {
            notifications
                .notify_booking_cancelled(&booking_for_notify, cancelled_by)
                .await;
        });

        Ok(updated)
    }

    pub async fn upload_contract(
        &self,
        actor: &ActorProfile,
        booking_id: Uuid,
        contract_url: String,
    ) -> Result<Booking, ServiceError> {
        let booking = self.fetch(booking_id).await?;
        self.ensure_party(actor, &booking)?;

        Ok(self
            .db_client
            .set_contract_url(booking.id, &contract_url)
            .await?)
    }

    /// Contract signatures are a side channel: they never gate the payment
    /// or status transitions.
    pub async fn sign_contract(
        &self,
        actor: &ActorProfile,
        booking_id: Uuid,
    ) -> Result<Booking, ServiceError> {
        let booking = self.fetch(booking_id).await?;
        let party = self.ensure_party(actor, &booking)?;

        if booking.contract_url.is_none() {
            return Err(ServiceError::InvalidState(
                "no contract has been uploaded".to_string(),
            ));
        }

        let updated = self
            .db_client
            .sign_contract_party(booking.id, party == BookingParty::Performer, Utc::now())
            .await?;

        if updated.both_signed() {
            tracing::info!("contract fully signed for booking {}", updated.id);
        }

        Ok(updated)
    }

    async fn fetch(&self, booking_id: Uuid) -> Result<Booking, ServiceError> {
        self.db_client
            .get_booking_by_id(booking_id)
            .await?
            .ok_or(ServiceError::BookingNotFound(booking_id))
    }

    fn ensure_party(
        &self,
        actor: &ActorProfile,
        booking: &Booking,
    ) -> Result<BookingParty, ServiceError> {
        booking
            .party_of(actor.id)
            .ok_or(ServiceError::Forbidden(actor.id, booking.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn deposit_is_a_percentage_of_the_agreed_amount() {
        let agreed = BigDecimal::from_str("1000").unwrap();
        assert_eq!(
            BookingService::compute_deposit(&agreed, 25),
            BigDecimal::from_str("250").unwrap()
        );
        assert_eq!(
            BookingService::compute_deposit(&agreed, 0),
            BigDecimal::from_str("0").unwrap()
        );
        assert_eq!(
            BookingService::compute_deposit(&agreed, 100),
            BigDecimal::from_str("1000").unwrap()
        );
    }

    #[test]
    fn deposit_plus_remainder_covers_the_budget_scenario() {
        // budget 1000 at 25% deposit: 250 up front, 750 on the final payment
        let agreed = BigDecimal::from_str("1000").unwrap();
        let deposit = BookingService::compute_deposit(&agreed, 25);
        let remainder = &agreed - &deposit;
        assert_eq!(deposit, BigDecimal::from_str("250").unwrap());
        assert_eq!(remainder, BigDecimal::from_str("750").unwrap());
    }
}
