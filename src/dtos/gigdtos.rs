use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

//Gig DTOs
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CreateGigDto {
    #[validate(length(min = 1, max = 120, message = "Title must be between 1 and 120 characters"))]
    pub title: String,

    #[validate(length(max = 2000, message = "Description must be at most 2000 characters"))]
    pub description: String,

    pub genres: Vec<String>,

    pub event_date: DateTime<Utc>,

    #[validate(range(min = 0.0, message = "Budget must be positive"))]
    pub budget: f64,

    #[validate(range(min = 0, max = 100, message = "Deposit percentage must be between 0 and 100"))]
    pub deposit_percentage: Option<i32>,

    #[validate(range(min = 1, max = 50, message = "Required performers must be between 1 and 50"))]
    pub required_performers: Option<i32>,

    #[validate(range(min = -90.0, max = 90.0, message = "Latitude out of range"))]
    pub latitude: Option<f64>,

    #[validate(range(min = -180.0, max = 180.0, message = "Longitude out of range"))]
    pub longitude: Option<f64>,
}

//Application DTOs
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct ApplyToGigDto {
    #[validate(range(min = 0.0, message = "Proposed rate must be positive"))]
    pub proposed_rate: f64,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct AcceptApplicationDto {
    // Defaults to the application's proposed rate when omitted
    #[validate(range(min = 0.0, message = "Agreed amount must be positive"))]
    pub agreed_amount: Option<f64>,

    #[validate(length(min = 3, max = 3, message = "Currency must be a 3-letter code"))]
    pub currency: Option<String>,
}
