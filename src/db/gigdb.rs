// db/gigdb.rs
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::BigDecimal;
use sqlx::Error;
use sqlx::Error as SqlxError;
use uuid::Uuid;

use super::db::DBClient;
use crate::models::gigmodel::*;

/// Guard strings surfaced out of transactional functions as
/// `sqlx::Error::Protocol`; the service layer maps them to `InvalidState`.
pub const GUARD_APPLICATION_NOT_PENDING: &str = "application_not_pending";
pub const GUARD_GIG_NOT_OPEN: &str = "gig_not_open";

#[async_trait]
pub trait GigExt {
    async fn create_gig(
        &self,
        venue_id: Uuid,
        title: String,
        description: String,
        genres: Vec<String>,
        event_date: DateTime<Utc>,
        budget: f64,
        deposit_percentage: i32,
        required_performers: i32,
        latitude: Option<f64>,
        longitude: Option<f64>,
    ) -> Result<Gig, Error>;

    async fn get_gig_by_id(&self, gig_id: Uuid) -> Result<Option<Gig>, Error>;

    async fn list_gigs_by_venue(&self, venue_id: Uuid) -> Result<Vec<Gig>, Error>;

    /// Soonest open gig per venue, used to give feed candidates an
    /// opportunity context for scoring.
    async fn get_open_gigs_for_venues(&self, venue_ids: &[Uuid]) -> Result<Vec<Gig>, Error>;

    /// Insert an application. Returns `None` when a non-withdrawn application
    /// already exists for the (gig, performer) pair; the partial unique index
    /// is the duplicate guard.
    async fn create_application(
        &self,
        gig_id: Uuid,
        performer_id: Uuid,
        proposed_rate: f64,
    ) -> Result<Option<GigApplication>, Error>;

    async fn get_application_by_id(
        &self,
        application_id: Uuid,
    ) -> Result<Option<GigApplication>, Error>;

    async fn list_applications_for_gig(&self, gig_id: Uuid) -> Result<Vec<GigApplication>, Error>;

    async fn update_application_status(
        &self,
        application_id: Uuid,
        status: ApplicationStatus,
    ) -> Result<GigApplication, Error>;

    /// The acceptance transaction: lock application and gig, mark accepted,
    /// append the performer to the roster (closing the gig at headcount) and
    /// create the booking in `pending` with venue confirmation pre-set. All
    /// writes commit together or not at all; notification dispatch stays
    /// outside.
    async fn accept_application_and_create_booking(
        &self,
        application_id: Uuid,
        agreed_amount: BigDecimal,
        deposit_amount: BigDecimal,
        currency: String,
    ) -> Result<(GigApplication, Gig, Booking), Error>;

    /// Promote a match directly into a booking, flipping the match to
    /// `converted_to_booking` in the same transaction.
    async fn create_booking_from_match(
        &self,
        match_id: Uuid,
        performer_id: Uuid,
        venue_id: Uuid,
        event_date: DateTime<Utc>,
        agreed_amount: BigDecimal,
        deposit_amount: BigDecimal,
        currency: String,
    ) -> Result<Booking, Error>;

    async fn get_booking_by_id(&self, booking_id: Uuid) -> Result<Option<Booking>, Error>;

    /// Resolve a booking from a gateway intent reference, whichever payment
    /// phase it belongs to. Used by the webhook path.
    async fn find_booking_by_intent_ref(&self, intent_ref: &str)
        -> Result<Option<Booking>, Error>;

    async fn list_bookings_for_actor(
        &self,
        actor_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Booking>, Error>;

    /// Apply one party's confirmation. The status flip to `confirmed` happens
    /// in the same statement so two concurrent opposite-party confirmations
    /// cannot both miss the "both flags set" condition.
    async fn confirm_booking_party(
        &self,
        booking_id: Uuid,
        is_performer: bool,
        now: DateTime<Utc>,
    ) -> Result<Booking, Error>;

    async fn set_deposit_intent(&self, booking_id: Uuid, intent_ref: &str)
        -> Result<Booking, Error>;

    async fn confirm_deposit_payment(
        &self,
        booking_id: Uuid,
        paid_at: DateTime<Utc>,
    ) -> Result<Booking, Error>;

    async fn set_final_intent(&self, booking_id: Uuid, intent_ref: &str) -> Result<Booking, Error>;

    async fn confirm_final_payment(
        &self,
        booking_id: Uuid,
        paid_at: DateTime<Utc>,
    ) -> Result<Booking, Error>;

    async fn update_booking_status(
        &self,
        booking_id: Uuid,
        status: BookingStatus,
    ) -> Result<Booking, Error>;

    async fn complete_booking_party(
        &self,
        booking_id: Uuid,
        is_performer: bool,
        now: DateTime<Utc>,
    ) -> Result<Booking, Error>;

    async fn cancel_booking(
        &self,
        booking_id: Uuid,
        cancelled_by: Uuid,
        reason: String,
        now: DateTime<Utc>,
        refund_owed: bool,
        refund_amount: Option<BigDecimal>,
    ) -> Result<Booking, Error>;

    async fn set_contract_url(&self, booking_id: Uuid, url: &str) -> Result<Booking, Error>;

    async fn sign_contract_party(
        &self,
        booking_id: Uuid,
        is_performer: bool,
        now: DateTime<Utc>,
    ) -> Result<Booking, Error>;
}

#[async_trait]
impl GigExt for DBClient {
    async fn create_gig(
        &self,
        venue_id: Uuid,
        title: String,
        description: String,
        genres: Vec<String>,
        event_date: DateTime<Utc>,
        budget: f64,
        deposit_percentage: i32,
        required_performers: i32,
        latitude: Option<f64>,
        longitude: Option<f64>,
    ) -> Result<Gig, Error> {
        let budget_bd = BigDecimal::try_from(budget)
            .map_err(|_| SqlxError::Decode("Invalid budget".into()))?;

        sqlx::query_as::<_, Gig>(
            r#"
            INSERT INTO gigs
            (venue_id, title, description, genres, event_date, budget, deposit_percentage,
             required_performers, latitude, longitude)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING id, venue_id, title, description, genres, event_date, budget,
                      deposit_percentage, required_performers, booked_performer_ids, status,
                      latitude, longitude, created_at, updated_at
            "#,
        )
        .bind(venue_id)
        .bind(title)
        .bind(description)
        .bind(genres)
        .bind(event_date)
        .bind(budget_bd)
        .bind(deposit_percentage)
        .bind(required_performers)
        .bind(latitude)
        .bind(longitude)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_gig_by_id(&self, gig_id: Uuid) -> Result<Option<Gig>, Error> {
        sqlx::query_as::<_, Gig>(
            r#"
            SELECT id, venue_id, title, description, genres, event_date, budget,
                   deposit_percentage, required_performers, booked_performer_ids, status,
                   latitude, longitude, created_at, updated_at
            FROM gigs
            WHERE id = $1
            "#,
        )
        .bind(gig_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn list_gigs_by_venue(&self, venue_id: Uuid) -> Result<Vec<Gig>, Error> {
        sqlx::query_as::<_, Gig>(
            r#"
            SELECT id, venue_id, title, description, genres, event_date, budget,
                   deposit_percentage, required_performers, booked_performer_ids, status,
                   latitude, longitude, created_at, updated_at
            FROM gigs
            WHERE venue_id = $1
            ORDER BY event_date ASC
            "#,
        )
        .bind(venue_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn get_open_gigs_for_venues(&self, venue_ids: &[Uuid]) -> Result<Vec<Gig>, Error> {
        sqlx::query_as::<_, Gig>(
            r#"
            SELECT DISTINCT ON (venue_id)
                   id, venue_id, title, description, genres, event_date, budget,
                   deposit_percentage, required_performers, booked_performer_ids, status,
                   latitude, longitude, created_at, updated_at
            FROM gigs
            WHERE venue_id = ANY($1) AND status = 'open'
            ORDER BY venue_id, event_date ASC
            "#,
        )
        .bind(venue_ids)
        .fetch_all(&self.pool)
        .await
    }

    async fn create_application(
        &self,
        gig_id: Uuid,
        performer_id: Uuid,
        proposed_rate: f64,
    ) -> Result<Option<GigApplication>, Error> {
        let rate_bd = BigDecimal::try_from(proposed_rate)
            .map_err(|_| SqlxError::Decode("Invalid proposed rate".into()))?;

        sqlx::query_as::<_, GigApplication>(
            r#"
            INSERT INTO gig_applications (gig_id, performer_id, proposed_rate)
            VALUES ($1, $2, $3)
            ON CONFLICT (gig_id, performer_id) WHERE status <> 'withdrawn' DO NOTHING
            RETURNING id, gig_id, performer_id, proposed_rate, status, applied_at
            "#,
        )
        .bind(gig_id)
        .bind(performer_id)
        .bind(rate_bd)
        .fetch_optional(&self.pool)
        .await
    }

    async fn get_application_by_id(
        &self,
        application_id: Uuid,
    ) -> Result<Option<GigApplication>, Error> {
        sqlx::query_as::<_, GigApplication>(
            r#"
            SELECT id, gig_id, performer_id, proposed_rate, status, applied_at
            FROM gig_applications
            WHERE id = $1
            "#,
        )
        .bind(application_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn list_applications_for_gig(&self, gig_id: Uuid) -> Result<Vec<GigApplication>, Error> {
        sqlx::query_as::<_, GigApplication>(
            r#"
            SELECT id, gig_id, performer_id, proposed_rate, status, applied_at
            FROM gig_applications
            WHERE gig_id = $1
            ORDER BY applied_at ASC
            "#,
        )
        .bind(gig_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn update_application_status(
        &self,
        application_id: Uuid,
        status: ApplicationStatus,
    ) -> Result<GigApplication, Error> {
        sqlx::query_as::<_, GigApplication>(
            r#"
            UPDATE gig_applications
            SET status = $2
            WHERE id = $1
            RETURNING id, gig_id, performer_id, proposed_rate, status, applied_at
            "#,
        )
        .bind(application_id)
        .bind(status)
        .fetch_one(&self.pool)
        .await
    }

    async fn accept_application_and_create_booking(
        &self,
        application_id: Uuid,
        agreed_amount: BigDecimal,
        deposit_amount: BigDecimal,
        currency: String,
    ) -> Result<(GigApplication, Gig, Booking), Error> {
        let mut tx = self.pool.begin().await?;

        let application = sqlx::query_as::<_, GigApplication>(
            r#"
            SELECT id, gig_id, performer_id, proposed_rate, status, applied_at
            FROM gig_applications
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(application_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(SqlxError::RowNotFound)?;

        if application.status != ApplicationStatus::Pending {
            return Err(SqlxError::Protocol(GUARD_APPLICATION_NOT_PENDING.into()));
        }

        let gig = sqlx::query_as::<_, Gig>(
            r#"
            SELECT id, venue_id, title, description, genres, event_date, budget,
                   deposit_percentage, required_performers, booked_performer_ids, status,
                   latitude, longitude, created_at, updated_at
            FROM gigs
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(application.gig_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(SqlxError::RowNotFound)?;

        if gig.status != GigStatus::Open {
            return Err(SqlxError::Protocol(GUARD_GIG_NOT_OPEN.into()));
        }

        let accepted = sqlx::query_as::<_, GigApplication>(
            r#"
            UPDATE gig_applications
            SET status = 'accepted'
            WHERE id = $1
            RETURNING id, gig_id, performer_id, proposed_rate, status, applied_at
            "#,
        )
        .bind(application_id)
        .fetch_one(&mut *tx)
        .await?;

        // Roster append closes the gig once the headcount is met.
        let updated_gig = sqlx::query_as::<_, Gig>(
            r#"
            UPDATE gigs
            SET booked_performer_ids = array_append(booked_performer_ids, $2),
                status = CASE
                    WHEN cardinality(booked_performer_ids) + 1 >= required_performers
                    THEN 'filled'::gig_status
                    ELSE status
                END,
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, venue_id, title, description, genres, event_date, budget,
                      deposit_percentage, required_performers, booked_performer_ids, status,
                      latitude, longitude, created_at, updated_at
            "#,
        )
        .bind(gig.id)
        .bind(accepted.performer_id)
        .fetch_one(&mut *tx)
        .await?;

        // The accepting venue implicitly confirms its side.
        let booking = sqlx::query_as::<_, Booking>(
            r#"
            INSERT INTO bookings
            (gig_id, performer_id, venue_id, event_date, agreed_amount, currency,
             deposit_amount, venue_confirmed, venue_confirmed_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, TRUE, NOW())
            RETURNING *
            "#,
        )
        .bind(gig.id)
        .bind(accepted.performer_id)
        .bind(gig.venue_id)
        .bind(gig.event_date)
        .bind(agreed_amount)
        .bind(currency)
        .bind(deposit_amount)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok((accepted, updated_gig, booking))
    }

    async fn create_booking_from_match(
        &self,
        match_id: Uuid,
        performer_id: Uuid,
        venue_id: Uuid,
        event_date: DateTime<Utc>,
        agreed_amount: BigDecimal,
        deposit_amount: BigDecimal,
        currency: String,
    ) -> Result<Booking, Error> {
        let mut tx = self.pool.begin().await?;

        let booking = sqlx::query_as::<_, Booking>(
            r#"
            INSERT INTO bookings
            (match_id, performer_id, venue_id, event_date, agreed_amount, currency,
             deposit_amount, venue_confirmed, venue_confirmed_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, TRUE, NOW())
            RETURNING *
            "#,
        )
        .bind(match_id)
        .bind(performer_id)
        .bind(venue_id)
        .bind(event_date)
        .bind(agreed_amount)
        .bind(currency)
        .bind(deposit_amount)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            UPDATE matches
            SET status = 'converted_to_booking', last_activity_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(match_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(booking)
    }

    async fn get_booking_by_id(&self, booking_id: Uuid) -> Result<Option<Booking>, Error> {
        sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE id = $1")
            .bind(booking_id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn find_booking_by_intent_ref(
        &self,
        intent_ref: &str,
    ) -> Result<Option<Booking>, Error> {
        sqlx::query_as::<_, Booking>(
            r#"
            SELECT * FROM bookings
            WHERE deposit_intent_ref = $1 OR final_intent_ref = $1
            "#,
        )
        .bind(intent_ref)
        .fetch_optional(&self.pool)
        .await
    }

    async fn list_bookings_for_actor(
        &self,
        actor_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Booking>, Error> {
        sqlx::query_as::<_, Booking>(
            r#"
            SELECT * FROM bookings
            WHERE performer_id = $1 OR venue_id = $1
            ORDER BY event_date DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(actor_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
    }

    async fn confirm_booking_party(
        &self,
        booking_id: Uuid,
        is_performer: bool,
        now: DateTime<Utc>,
    ) -> Result<Booking, Error> {
        sqlx::query_as::<_, Booking>(
            r#"
            UPDATE bookings
            SET performer_confirmed = performer_confirmed OR $2,
                performer_confirmed_at = CASE
                    WHEN $2 AND performer_confirmed_at IS NULL THEN $3
                    ELSE performer_confirmed_at
                END,
                venue_confirmed = venue_confirmed OR NOT $2,
                venue_confirmed_at = CASE
                    WHEN NOT $2 AND venue_confirmed_at IS NULL THEN $3
                    ELSE venue_confirmed_at
                END,
                status = CASE
                    WHEN status = 'pending'
                         AND (performer_confirmed OR $2)
                         AND (venue_confirmed OR NOT $2)
                    THEN 'confirmed'::booking_status
                    ELSE status
                END,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(booking_id)
        .bind(is_performer)
        .bind(now)
        .fetch_one(&self.pool)
        .await
    }

    async fn set_deposit_intent(
        &self,
        booking_id: Uuid,
        intent_ref: &str,
    ) -> Result<Booking, Error> {
        sqlx::query_as::<_, Booking>(
            r#"
            UPDATE bookings
            SET deposit_intent_ref = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(booking_id)
        .bind(intent_ref)
        .fetch_one(&self.pool)
        .await
    }

    async fn confirm_deposit_payment(
        &self,
        booking_id: Uuid,
        paid_at: DateTime<Utc>,
    ) -> Result<Booking, Error> {
        sqlx::query_as::<_, Booking>(
            r#"
            UPDATE bookings
            SET deposit_paid = TRUE,
                deposit_paid_at = $2,
                status = 'deposit_paid',
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(booking_id)
        .bind(paid_at)
        .fetch_one(&self.pool)
        .await
    }

    async fn set_final_intent(&self, booking_id: Uuid, intent_ref: &str) -> Result<Booking, Error> {
        sqlx::query_as::<_, Booking>(
            r#"
            UPDATE bookings
            SET final_intent_ref = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(booking_id)
        .bind(intent_ref)
        .fetch_one(&self.pool)
        .await
    }

    async fn confirm_final_payment(
        &self,
        booking_id: Uuid,
        paid_at: DateTime<Utc>,
    ) -> Result<Booking, Error> {
        sqlx::query_as::<_, Booking>(
            r#"
            UPDATE bookings
            SET final_paid = TRUE,
                final_paid_at = $2,
                status = 'paid',
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(booking_id)
        .bind(paid_at)
        .fetch_one(&self.pool)
        .await
    }

    async fn update_booking_status(
        &self,
        booking_id: Uuid,
        status: BookingStatus,
    ) -> Result<Booking, Error> {
        sqlx::query_as::<_, Booking>(
            r#"
            UPDATE bookings
            SET status = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(booking_id)
        .bind(status)
        .fetch_one(&self.pool)
        .await
    }

    async fn complete_booking_party(
        &self,
        booking_id: Uuid,
        is_performer: bool,
        now: DateTime<Utc>,
    ) -> Result<Booking, Error> {
        sqlx::query_as::<_, Booking>(
            r#"
            UPDATE bookings
            SET performer_completed = performer_completed OR $2,
                performer_completed_at = CASE
                    WHEN $2 AND performer_completed_at IS NULL THEN $3
                    ELSE performer_completed_at
                END,
                venue_completed = venue_completed OR NOT $2,
                venue_completed_at = CASE
                    WHEN NOT $2 AND venue_completed_at IS NULL THEN $3
                    ELSE venue_completed_at
                END,
                status = CASE
                    WHEN status IN ('deposit_paid', 'paid', 'in_progress')
                         AND (performer_completed OR $2)
                         AND (venue_completed OR NOT $2)
                    THEN 'completed'::booking_status
                    ELSE status
                END,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(booking_id)
        .bind(is_performer)
        .bind(now)
        .fetch_one(&self.pool)
        .await
    }

    async fn cancel_booking(
        &self,
        booking_id: Uuid,
        cancelled_by: Uuid,
        reason: String,
        now: DateTime<Utc>,
        refund_owed: bool,
        refund_amount: Option<BigDecimal>,
    ) -> Result<Booking, Error> {
        sqlx::query_as::<_, Booking>(
            r#"
            UPDATE bookings
            SET status = 'cancelled',
                cancelled_by = $2,
                cancellation_reason = $3,
                cancelled_at = $4,
                refund_owed = $5,
                refund_amount = $6,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(booking_id)
        .bind(cancelled_by)
        .bind(reason)
        .bind(now)
        .bind(refund_owed)
        .bind(refund_amount)
        .fetch_one(&self.pool)
        .await
    }

    async fn set_contract_url(&self, booking_id: Uuid, url: &str) -> Result<Booking, Error> {
        sqlx::query_as::<_, Booking>(
            r#"
            UPDATE bookings
            SET contract_url = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(booking_id)
        .bind(url)
        .fetch_one(&self.pool)
        .await
    }

    async fn sign_contract_party(
        &self,
        booking_id: Uuid,
        is_performer: bool,
        now: DateTime<Utc>,
    ) -> Result<Booking, Error> {
        sqlx::query_as::<_, Booking>(
            r#"
            UPDATE bookings
            SET performer_signed = performer_signed OR $2,
                performer_signed_at = CASE
                    WHEN $2 AND performer_signed_at IS NULL THEN $3
                    ELSE performer_signed_at
                END,
                venue_signed = venue_signed OR NOT $2,
                venue_signed_at = CASE
                    WHEN NOT $2 AND venue_signed_at IS NULL THEN $3
                    ELSE venue_signed_at
                END,
                contract_signed = (performer_signed OR $2) AND (venue_signed OR NOT $2),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(booking_id)
        .bind(is_performer)
        .bind(now)
        .fetch_one(&self.pool)
        .await
    }
}
