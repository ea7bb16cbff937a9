use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::gigmodel::Booking;

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CreateBookingFromMatchDto {
    pub match_id: Uuid,

    pub event_date: DateTime<Utc>,

    #[validate(range(min = 0.0, message = "Agreed amount must be positive"))]
    pub agreed_amount: f64,

    #[validate(range(min = 0, max = 100, message = "Deposit percentage must be between 0 and 100"))]
    pub deposit_percentage: Option<i32>,

    #[validate(length(min = 3, max = 3, message = "Currency must be a 3-letter code"))]
    pub currency: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CancelBookingDto {
    #[validate(length(min = 1, max = 500, message = "Reason must be between 1 and 500 characters"))]
    pub reason: String,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct ConfirmPaymentDto {
    #[validate(length(min = 1, message = "Payment reference is required"))]
    pub intent_ref: String,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct UploadContractDto {
    #[validate(url(message = "Invalid contract URL"))]
    pub contract_url: String,
}

/// What the client needs to drive the gateway's payment sheet.
#[derive(Debug, Serialize, Deserialize)]
pub struct PaymentIntentDto {
    pub booking: Booking,
    pub intent_ref: String,
    pub client_secret: String,
    pub amount: f64,
    pub currency: String,
}

/// Gateway webhook body: the event kind plus the intent it refers to. The
/// booking is resolved through the stored intent reference.
#[derive(Debug, Serialize, Deserialize)]
pub struct PaymentWebhookDto {
    pub event: String,
    pub intent_ref: String,
}
