use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::BigDecimal;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "gig_status", rename_all = "snake_case")]
pub enum GigStatus {
    Open,
    Filled,
    Cancelled,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "application_status", rename_all = "snake_case")]
pub enum ApplicationStatus {
    Pending,
    Accepted,
    Rejected,
    Withdrawn,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Gig {
    pub id: Uuid,
    pub venue_id: Uuid,
    pub title: String,
    pub description: String,
    pub genres: Vec<String>,
    pub event_date: DateTime<Utc>,
    pub budget: BigDecimal,
    pub deposit_percentage: i32,
    pub required_performers: i32,
    pub booked_performer_ids: Vec<Uuid>,
    pub status: GigStatus,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Gig {
    pub fn accepts_applications(&self) -> bool {
        self.status == GigStatus::Open
    }

    pub fn roster_full(&self) -> bool {
        self.booked_performer_ids.len() as i32 >= self.required_performers
    }
}

/// A performer's request to play a specific gig. At most one non-withdrawn
/// row per (gig, performer), enforced by a partial unique index.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct GigApplication {
    pub id: Uuid,
    pub gig_id: Uuid,
    pub performer_id: Uuid,
    pub proposed_rate: BigDecimal,
    pub status: ApplicationStatus,
    pub applied_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "booking_status", rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    DepositPaid,
    Paid,
    InProgress,
    Completed,
    Cancelled,
    Disputed,
}

impl BookingStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            BookingStatus::Completed | BookingStatus::Cancelled | BookingStatus::Disputed
        )
    }

    /// Position along the forward chain, used to assert monotonicity.
    pub fn rank(&self) -> u8 {
        match self {
            BookingStatus::Pending => 0,
            BookingStatus::Confirmed => 1,
            BookingStatus::DepositPaid => 2,
            BookingStatus::Paid => 3,
            BookingStatus::InProgress => 4,
            BookingStatus::Completed => 5,
            BookingStatus::Cancelled | BookingStatus::Disputed => 6,
        }
    }

    pub fn can_transition_to(&self, to: BookingStatus) -> bool {
        use BookingStatus::*;
        // Cancellation and disputes absorb from any non-terminal state.
        if matches!(to, Cancelled | Disputed) {
            return !self.is_terminal();
        }
        match (self, to) {
            (Pending, Confirmed) => true,
            (Confirmed, DepositPaid) => true,
            // Final payment may run without a deposit phase.
            (Confirmed, Paid) => true,
            (DepositPaid, Paid) => true,
            (DepositPaid, InProgress) => true,
            (Paid, InProgress) => true,
            (DepositPaid, Completed) => true,
            (Paid, Completed) => true,
            (InProgress, Completed) => true,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingParty {
    Performer,
    Venue,
}

/// The committed engagement derived from an accepted application or a match.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct Booking {
    pub id: Uuid,
    pub gig_id: Option<Uuid>,
    pub match_id: Option<Uuid>,
    pub performer_id: Uuid,
    pub venue_id: Uuid,
    pub event_date: DateTime<Utc>,
    pub agreed_amount: BigDecimal,
    pub currency: String,
    pub deposit_amount: BigDecimal,
    pub deposit_paid: bool,
    pub deposit_paid_at: Option<DateTime<Utc>>,
    pub deposit_intent_ref: Option<String>,
    pub final_paid: bool,
    pub final_paid_at: Option<DateTime<Utc>>,
    pub final_intent_ref: Option<String>,
    pub status: BookingStatus,
    pub performer_confirmed: bool,
    pub performer_confirmed_at: Option<DateTime<Utc>>,
    pub venue_confirmed: bool,
    pub venue_confirmed_at: Option<DateTime<Utc>>,
    pub performer_completed: bool,
    pub performer_completed_at: Option<DateTime<Utc>>,
    pub venue_completed: bool,
    pub venue_completed_at: Option<DateTime<Utc>>,
    pub cancelled_by: Option<Uuid>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancellation_reason: Option<String>,
    pub refund_owed: bool,
    pub refund_amount: Option<BigDecimal>,
    pub contract_url: Option<String>,
    pub performer_signed: bool,
    pub performer_signed_at: Option<DateTime<Utc>>,
    pub venue_signed: bool,
    pub venue_signed_at: Option<DateTime<Utc>>,
    pub contract_signed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    pub fn party_of(&self, actor_id: Uuid) -> Option<BookingParty> {
        if actor_id == self.performer_id {
            Some(BookingParty::Performer)
        } else if actor_id == self.venue_id {
            Some(BookingParty::Venue)
        } else {
            None
        }
    }

    pub fn both_confirmed(&self) -> bool {
        self.performer_confirmed && self.venue_confirmed
    }

    pub fn both_completed(&self) -> bool {
        self.performer_completed && self.venue_completed
    }

    pub fn both_signed(&self) -> bool {
        self.performer_signed && self.venue_signed
    }

    /// Amount still owed for the final payment. The deposit only reduces the
    /// remainder once it has actually been paid.
    pub fn remaining_amount(&self) -> BigDecimal {
        if self.deposit_paid {
            &self.agreed_amount - &self.deposit_amount
        } else {
            self.agreed_amount.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn booking_status_forward_chain() {
        use BookingStatus::*;
        assert!(Pending.can_transition_to(Confirmed));
        assert!(Confirmed.can_transition_to(DepositPaid));
        assert!(DepositPaid.can_transition_to(Paid));
        assert!(Paid.can_transition_to(InProgress));
        assert!(InProgress.can_transition_to(Completed));
        // Never backwards.
        assert!(!Confirmed.can_transition_to(Pending));
        assert!(!Paid.can_transition_to(DepositPaid));
        assert!(!DepositPaid.can_transition_to(Confirmed));
    }

    #[test]
    fn booking_status_only_advances() {
        use BookingStatus::*;
        let all = [Pending, Confirmed, DepositPaid, Paid, InProgress, Completed, Cancelled, Disputed];
        for from in all {
            for to in all {
                if from.can_transition_to(to) {
                    assert!(to.rank() > from.rank(), "{:?} -> {:?} regresses", from, to);
                }
            }
        }
    }

    #[test]
    fn terminal_states_absorb() {
        use BookingStatus::*;
        for terminal in [Completed, Cancelled, Disputed] {
            for to in [Pending, Confirmed, DepositPaid, Paid, InProgress, Completed, Cancelled, Disputed] {
                assert!(!terminal.can_transition_to(to));
            }
        }
        // But any live state can be cancelled or disputed.
        for live in [Pending, Confirmed, DepositPaid, Paid, InProgress] {
            assert!(live.can_transition_to(Cancelled));
            assert!(live.can_transition_to(Disputed));
        }
    }

    fn booking_with_amounts(agreed: &str, deposit: &str, deposit_paid: bool) -> Booking {
        let now = Utc::now();
        Booking {
            id: Uuid::new_v4(),
            gig_id: None,
            match_id: None,
            performer_id: Uuid::new_v4(),
            venue_id: Uuid::new_v4(),
            event_date: now,
            agreed_amount: BigDecimal::from_str(agreed).unwrap(),
            currency: "USD".to_string(),
            deposit_amount: BigDecimal::from_str(deposit).unwrap(),
            deposit_paid,
            deposit_paid_at: None,
            deposit_intent_ref: None,
            final_paid: false,
            final_paid_at: None,
            final_intent_ref: None,
            status: BookingStatus::Confirmed,
            performer_confirmed: false,
            performer_confirmed_at: None,
            venue_confirmed: true,
            venue_confirmed_at: Some(now),
            performer_completed: false,
            performer_completed_at: None,
            venue_completed: false,
            venue_completed_at: None,
            cancelled_by: None,
            cancelled_at: None,
            cancellation_reason: None,
            refund_owed: false,
            refund_amount: None,
            contract_url: None,
            performer_signed: false,
            performer_signed_at: None,
            venue_signed: false,
            venue_signed_at: None,
            contract_signed: false,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn remaining_amount_subtracts_paid_deposit_only() {
        let paid = booking_with_amounts("1000", "250", true);
        assert_eq!(paid.remaining_amount(), BigDecimal::from_str("750").unwrap());

        let unpaid = booking_with_amounts("1000", "250", false);
        assert_eq!(unpaid.remaining_amount(), BigDecimal::from_str("1000").unwrap());
    }

    #[test]
    fn party_resolution() {
        let booking = booking_with_amounts("500", "125", false);
        assert_eq!(booking.party_of(booking.performer_id), Some(BookingParty::Performer));
        assert_eq!(booking.party_of(booking.venue_id), Some(BookingParty::Venue));
        assert_eq!(booking.party_of(Uuid::new_v4()), None);
    }
}
